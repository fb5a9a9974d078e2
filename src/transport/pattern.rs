use super::{TransportError, TransportResult};
use regex::{Regex, RegexBuilder};

/// Upper bound on the compiled size of a pattern
const PATTERN_SIZE_LIMIT: usize = 1 << 20;

/// Filename filter used by the shipped transports when listing
///
/// `*` matches any run of characters, `?` matches one character and
/// everything else is literal. An empty pattern matches every name.
#[derive(Debug, Clone)]
pub struct FilePattern {
    regex: Option<Regex>,
}

impl FilePattern {
    pub fn new(pattern: &str) -> TransportResult<Self> {
        if pattern.is_empty() || pattern == "*" {
            return Ok(Self { regex: None });
        }

        let mut source = String::with_capacity(pattern.len() + 8);
        source.push('^');
        for c in pattern.chars() {
            match c {
                '*' => source.push_str(".*"),
                '?' => source.push('.'),
                _ => source.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
            }
        }
        source.push('$');

        let regex = RegexBuilder::new(&source)
            .size_limit(PATTERN_SIZE_LIMIT)
            .build()
            .map_err(|e| TransportError::Other(format!("invalid pattern: {e}")))?;

        Ok(Self { regex: Some(regex) })
    }

    pub fn matches(&self, name: &str) -> bool {
        self.regex.as_ref().map_or(true, |re| re.is_match(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_star_suffix() {
        let pattern = FilePattern::new("*.txt").unwrap();
        assert!(pattern.matches("file1.txt"));
        assert!(pattern.matches(".txt"));
        assert!(!pattern.matches("file1.txt.bak"));
        assert!(!pattern.matches("file1.csv"));
    }

    #[test]
    fn test_question_mark() {
        let pattern = FilePattern::new("log?.gz").unwrap();
        assert!(pattern.matches("log1.gz"));
        assert!(!pattern.matches("log12.gz"));
    }

    #[test]
    fn test_literal_characters_are_escaped() {
        let pattern = FilePattern::new("a+b(1).txt").unwrap();
        assert!(pattern.matches("a+b(1).txt"));
        assert!(!pattern.matches("aab(1)xtxt"));
    }

    #[test]
    fn test_empty_and_star_match_everything() {
        assert!(FilePattern::new("").unwrap().matches("anything"));
        assert!(FilePattern::new("*").unwrap().matches(""));
    }

    #[test]
    fn test_oversized_pattern_is_rejected() {
        let result = FilePattern::new(&"?".repeat(200_000));
        assert!(matches!(result, Err(TransportError::Other(ref m)) if m.starts_with("invalid pattern")));
    }
}
