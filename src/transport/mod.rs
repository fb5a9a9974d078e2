use crate::options::ConnectOptions;
use async_trait::async_trait;

pub mod memory;
pub mod pattern;
pub mod ssh;

pub use memory::MemoryTransport;
pub use pattern::FilePattern;
pub use ssh::SshTransport;

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// Errors raised by a transport
///
/// The client facade hands these back to its callers untouched.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Not connected")]
    NotConnected,
    #[error("No such file: {0}")]
    NotFound(String),
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("Authentication rejected for user '{0}'")]
    AuthRejected(String),
    #[error("Host key mismatch: {0}")]
    HostKeyMismatch(String),
    #[error("SSH error: {0}")]
    Ssh(String),
    #[error("SFTP error: {0}")]
    Sftp(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Other(String),
}

/// Kind of a remote directory entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
    Other,
}

impl EntryKind {
    /// ls-style type character
    pub fn as_char(self) -> char {
        match self {
            EntryKind::File => '-',
            EntryKind::Directory => 'd',
            EntryKind::Symlink => 'l',
            EntryKind::Other => '?',
        }
    }
}

/// One item of a remote directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub name: String,
    pub kind: EntryKind,
    pub size: u64,
    /// Seconds since the Unix epoch
    pub modify_time: u32,
}

impl RemoteEntry {
    pub fn file(name: impl Into<String>, size: u64, modify_time: u32) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
            size,
            modify_time,
        }
    }

    pub fn directory(name: impl Into<String>, modify_time: u32) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Directory,
            size: 0,
            modify_time,
        }
    }
}

/// Capability set of an SFTP session
///
/// Implement this trait to plug a different session library behind
/// [`SftpClient`](crate::SftpClient). Implementations track their own
/// connected state; `end` must succeed when no session is open.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Open the session described by `options`
    async fn connect(&self, options: &ConnectOptions) -> TransportResult<()>;

    /// Close the session, if any
    async fn end(&self) -> TransportResult<()>;

    /// List `remote_dir`, keeping entries whose name matches `pattern`
    ///
    /// `.` and `..` are never returned.
    async fn list(&self, remote_dir: &str, pattern: &str) -> TransportResult<Vec<RemoteEntry>>;

    /// Copy a local file to the remote side
    async fn put(&self, local_path: &str, remote_path: &str) -> TransportResult<()>;

    /// Copy a remote file to the local side
    async fn get(&self, remote_path: &str, local_path: &str) -> TransportResult<()>;

    /// Remove a remote file
    async fn delete(&self, remote_path: &str) -> TransportResult<()>;
}

/// Normalize a remote path: trim leading/trailing slashes, handle empty as root
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() || trimmed == "." {
        String::new()
    } else {
        trimmed.to_string()
    }
}

/// Get current Unix timestamp
pub fn current_timestamp() -> u32 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0)
}
