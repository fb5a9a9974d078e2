use super::{
    current_timestamp, normalize_path, FilePattern, RemoteEntry, Transport, TransportError,
    TransportResult,
};
use crate::options::{ConnectOptions, Credentials};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

const KEEP_MARKER: &str = ".keep";

/// File data stored in memory
#[derive(Debug, Clone)]
struct FileData {
    content: Bytes,
    mtime: u32,
}

#[derive(Default)]
struct State {
    connected: bool,
    files: BTreeMap<String, FileData>,
}

/// In-memory transport for testing and development
///
/// Remote files live in a map keyed by normalized path. Directories exist
/// implicitly through the paths below them.
pub struct MemoryTransport {
    state: RwLock<State>,
    users: Option<HashMap<String, String>>,
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::default()),
            users: None,
        }
    }

    /// Create with pre-populated remote files
    pub fn with_files(files: HashMap<String, Vec<u8>>) -> Self {
        let mtime = current_timestamp();
        let files = files
            .into_iter()
            .map(|(k, content)| {
                (
                    normalize_path(&k),
                    FileData {
                        content: Bytes::from(content),
                        mtime,
                    },
                )
            })
            .collect();
        Self {
            state: RwLock::new(State {
                connected: false,
                files,
            }),
            users: None,
        }
    }

    /// Require password authentication for `username`
    pub fn with_user(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.users
            .get_or_insert_with(HashMap::new)
            .insert(username.into(), password.into());
        self
    }

    /// Create an empty remote directory
    pub fn make_dir(&self, path: &str) {
        let key = format!("{}/{}", normalize_path(path), KEEP_MARKER);
        self.state.write().files.insert(
            key,
            FileData {
                content: Bytes::new(),
                mtime: current_timestamp(),
            },
        );
    }

    /// Contents of a remote file, regardless of connection state
    pub fn file(&self, path: &str) -> Option<Bytes> {
        self.state
            .read()
            .files
            .get(&normalize_path(path))
            .map(|d| d.content.clone())
    }

    pub fn is_connected(&self) -> bool {
        self.state.read().connected
    }

    fn ensure_connected(&self) -> TransportResult<()> {
        if self.state.read().connected {
            Ok(())
        } else {
            Err(TransportError::NotConnected)
        }
    }

    fn authenticate(&self, options: &ConnectOptions) -> TransportResult<()> {
        let Some(users) = &self.users else {
            return Ok(());
        };

        let accepted = match &options.credentials {
            Credentials::Password(password) => users
                .get(&options.username)
                .is_some_and(|expected| expected == password),
            _ => false,
        };

        if accepted {
            Ok(())
        } else {
            Err(TransportError::AuthRejected(options.username.clone()))
        }
    }

    fn list_entries(&self, dir: &str, pattern: &FilePattern) -> TransportResult<Vec<RemoteEntry>> {
        let prefix = if dir.is_empty() {
            String::new()
        } else {
            format!("{}/", dir)
        };

        let state = self.state.read();
        if !dir.is_empty() && !state.files.keys().any(|k| k.starts_with(&prefix)) {
            return Err(TransportError::NotFound(dir.to_string()));
        }

        let mut entries: Vec<RemoteEntry> = Vec::new();
        for (key, data) in state.files.range(prefix.clone()..) {
            let Some(relative) = key.strip_prefix(&prefix) else {
                break;
            };

            // First path component
            let (name, is_dir) = match relative.split_once('/') {
                Some((name, _)) => (name, true),
                None => (relative, false),
            };

            if name.is_empty() || name == KEEP_MARKER || !pattern.matches(name) {
                continue;
            }

            // Keys are ordered, so a repeated directory name is always the last entry.
            if entries.last().is_some_and(|e| e.name == name) {
                continue;
            }

            entries.push(if is_dir {
                RemoteEntry::directory(name, data.mtime)
            } else {
                RemoteEntry::file(name, data.content.len() as u64, data.mtime)
            });
        }

        Ok(entries)
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn connect(&self, options: &ConnectOptions) -> TransportResult<()> {
        self.authenticate(options)?;
        self.state.write().connected = true;
        info!(host = %options.host, port = options.port, user = %options.username, "Memory session opened");
        Ok(())
    }

    async fn end(&self) -> TransportResult<()> {
        let mut state = self.state.write();
        if state.connected {
            state.connected = false;
            info!("Memory session closed");
        }
        Ok(())
    }

    async fn list(&self, remote_dir: &str, pattern: &str) -> TransportResult<Vec<RemoteEntry>> {
        self.ensure_connected()?;
        debug!(remote_dir, pattern, "Listing memory directory");
        self.list_entries(&normalize_path(remote_dir), &FilePattern::new(pattern)?)
    }

    async fn put(&self, local_path: &str, remote_path: &str) -> TransportResult<()> {
        self.ensure_connected()?;
        let content = tokio::fs::read(local_path).await?;
        debug!(local_path, remote_path, len = content.len(), "Storing file");

        self.state.write().files.insert(
            normalize_path(remote_path),
            FileData {
                content: Bytes::from(content),
                mtime: current_timestamp(),
            },
        );
        Ok(())
    }

    async fn get(&self, remote_path: &str, local_path: &str) -> TransportResult<()> {
        self.ensure_connected()?;
        let content = self
            .file(remote_path)
            .ok_or_else(|| TransportError::NotFound(remote_path.to_string()))?;
        debug!(remote_path, local_path, len = content.len(), "Fetching file");

        tokio::fs::write(local_path, &content).await?;
        Ok(())
    }

    async fn delete(&self, remote_path: &str) -> TransportResult<()> {
        self.ensure_connected()?;
        debug!(remote_path, "Deleting file");
        self.state
            .write()
            .files
            .remove(&normalize_path(remote_path))
            .map(|_| ())
            .ok_or_else(|| TransportError::NotFound(remote_path.to_string()))
    }
}
