use super::{EntryKind, FilePattern, RemoteEntry, Transport, TransportError, TransportResult};
use crate::options::{ConnectOptions, Credentials};
use async_trait::async_trait;
use russh::client::{self, AuthResult, Config, Handle};
use russh::keys::ssh_key::HashAlg;
use russh::keys::{PrivateKeyWithHashAlg, PublicKey};
use russh::Disconnect;
use russh_sftp::client::error::Error as SftpError;
use russh_sftp::client::SftpSession;
use russh_sftp::protocol::StatusCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Inactivity timeout for established SSH sessions
const INACTIVITY_TIMEOUT: Duration = Duration::from_secs(300);

impl From<russh::Error> for TransportError {
    fn from(err: russh::Error) -> Self {
        TransportError::Ssh(err.to_string())
    }
}

impl From<russh::keys::Error> for TransportError {
    fn from(err: russh::keys::Error) -> Self {
        TransportError::Ssh(format!("invalid private key: {err}"))
    }
}

fn map_sftp_error(err: SftpError, path: &str) -> TransportError {
    match err {
        SftpError::Status(status) => match status.status_code {
            StatusCode::NoSuchFile => TransportError::NotFound(path.to_string()),
            StatusCode::PermissionDenied => TransportError::PermissionDenied(path.to_string()),
            _ => TransportError::Sftp(format!("{}: {}", path, status.error_message)),
        },
        other => TransportError::Sftp(format!("{path}: {other}")),
    }
}

fn to_entry(name: String, attrs: &russh_sftp::protocol::FileAttributes) -> RemoteEntry {
    let kind = if attrs.is_dir() {
        EntryKind::Directory
    } else if attrs.is_symlink() {
        EntryKind::Symlink
    } else if attrs.is_regular() {
        EntryKind::File
    } else {
        EntryKind::Other
    };

    RemoteEntry {
        name,
        kind,
        size: attrs.size.unwrap_or(0),
        modify_time: attrs.mtime.unwrap_or(0),
    }
}

/// SSH client handler that checks the server key against an optional pin
struct ClientHandler {
    host: String,
    expected_fingerprint: Option<String>,
}

impl client::Handler for ClientHandler {
    type Error = TransportError;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        let fingerprint = server_public_key.fingerprint(HashAlg::Sha256).to_string();

        match &self.expected_fingerprint {
            Some(expected) if *expected != fingerprint => {
                warn!(host = %self.host, %fingerprint, %expected, "Server host key does not match");
                Err(TransportError::HostKeyMismatch(format!(
                    "{} presented {}, expected {}",
                    self.host, fingerprint, expected
                )))
            }
            Some(_) => {
                debug!(host = %self.host, %fingerprint, "Server host key matches pin");
                Ok(true)
            }
            None => {
                debug!(host = %self.host, %fingerprint, "Accepting server host key");
                Ok(true)
            }
        }
    }
}

/// An established SSH + SFTP connection
struct Connection {
    sftp: SftpSession,
    handle: Handle<ClientHandler>,
}

/// Transport backed by a russh client and a russh-sftp session
pub struct SshTransport {
    config: Arc<Config>,
    conn: RwLock<Option<Connection>>,
}

impl Default for SshTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl SshTransport {
    pub fn new() -> Self {
        Self::with_config(Config {
            inactivity_timeout: Some(INACTIVITY_TIMEOUT),
            ..Default::default()
        })
    }

    /// Use a custom russh client configuration
    pub fn with_config(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            conn: RwLock::new(None),
        }
    }

    async fn authenticate(
        handle: &mut Handle<ClientHandler>,
        options: &ConnectOptions,
    ) -> TransportResult<()> {
        let user = options.username.as_str();
        let result = match &options.credentials {
            Credentials::None => handle.authenticate_none(user).await?,
            Credentials::Password(password) => {
                handle.authenticate_password(user, password.as_str()).await?
            }
            Credentials::PrivateKey { key, passphrase } => {
                let key = russh::keys::decode_secret_key(key, passphrase.as_deref())?;
                let key = PrivateKeyWithHashAlg::new(Arc::new(key), None);
                handle.authenticate_publickey(user, key).await?
            }
        };

        match result {
            AuthResult::Success => Ok(()),
            AuthResult::Failure {
                remaining_methods, ..
            } => {
                debug!(user, ?remaining_methods, "Authentication rejected");
                Err(TransportError::AuthRejected(user.to_string()))
            }
        }
    }

    async fn open(&self, options: &ConnectOptions) -> TransportResult<Connection> {
        let handler = ClientHandler {
            host: options.host.clone(),
            expected_fingerprint: options.host_key_fingerprint.clone(),
        };

        let mut handle = client::connect(
            self.config.clone(),
            (options.host.as_str(), options.port),
            handler,
        )
        .await?;
        debug!(host = %options.host, port = options.port, "SSH handshake completed");

        Self::authenticate(&mut handle, options).await?;
        debug!(user = %options.username, method = ?options.credentials, "Authenticated");

        let channel = handle.channel_open_session().await?;
        channel.request_subsystem(true, "sftp").await?;
        let sftp = SftpSession::new(channel.into_stream())
            .await
            .map_err(|e| TransportError::Sftp(format!("failed to start session: {e}")))?;

        Ok(Connection { sftp, handle })
    }

    async fn close(conn: Connection) -> TransportResult<()> {
        // Session task already gone: nothing left to shut down.
        if conn.handle.is_closed() {
            debug!("SSH session already closed by peer");
            return Ok(());
        }

        // The server may already have dropped the channel.
        if let Err(e) = conn.sftp.close().await {
            debug!(error = %e, "SFTP session close failed");
        }
        conn.handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Transport for SshTransport {
    async fn connect(&self, options: &ConnectOptions) -> TransportResult<()> {
        let conn = self.open(options).await?;

        let previous = self.conn.write().await.replace(conn);
        if let Some(previous) = previous {
            debug!("Replacing existing session");
            // The new session is already installed, so this stays out of the result.
            if let Err(e) = Self::close(previous).await {
                debug!(error = %e, "Previous session close failed");
            }
        }

        info!(host = %options.host, port = options.port, user = %options.username, "SFTP session established");
        Ok(())
    }

    async fn end(&self) -> TransportResult<()> {
        let conn = self.conn.write().await.take();
        match conn {
            Some(conn) => {
                Self::close(conn).await?;
                info!("SFTP session closed");
                Ok(())
            }
            None => Ok(()),
        }
    }

    async fn list(&self, remote_dir: &str, pattern: &str) -> TransportResult<Vec<RemoteEntry>> {
        let guard = self.conn.read().await;
        let conn = guard.as_ref().ok_or(TransportError::NotConnected)?;
        debug!(remote_dir, pattern, "Listing remote directory");

        let pattern = FilePattern::new(pattern)?;
        let read_dir = conn
            .sftp
            .read_dir(remote_dir)
            .await
            .map_err(|e| map_sftp_error(e, remote_dir))?;

        Ok(read_dir
            .filter_map(|entry| {
                let name = entry.file_name();
                if name == "." || name == ".." || !pattern.matches(&name) {
                    return None;
                }
                Some(to_entry(name, &entry.metadata()))
            })
            .collect())
    }

    async fn put(&self, local_path: &str, remote_path: &str) -> TransportResult<()> {
        let guard = self.conn.read().await;
        let conn = guard.as_ref().ok_or(TransportError::NotConnected)?;

        let mut local = tokio::fs::File::open(local_path).await?;
        let mut remote = conn
            .sftp
            .create(remote_path)
            .await
            .map_err(|e| map_sftp_error(e, remote_path))?;

        let copied = tokio::io::copy(&mut local, &mut remote)
            .await
            .map_err(|e| TransportError::Sftp(format!("{remote_path}: {e}")))?;
        remote
            .shutdown()
            .await
            .map_err(|e| TransportError::Sftp(format!("{remote_path}: {e}")))?;

        debug!(local_path, remote_path, bytes = copied, "Uploaded file");
        Ok(())
    }

    async fn get(&self, remote_path: &str, local_path: &str) -> TransportResult<()> {
        let guard = self.conn.read().await;
        let conn = guard.as_ref().ok_or(TransportError::NotConnected)?;

        let mut remote = conn
            .sftp
            .open(remote_path)
            .await
            .map_err(|e| map_sftp_error(e, remote_path))?;
        let mut local = tokio::fs::File::create(local_path).await?;

        let copied = async {
            let copied = tokio::io::copy(&mut remote, &mut local).await?;
            local.flush().await?;
            Ok::<_, std::io::Error>(copied)
        }
        .await;
        let copied = match copied {
            Ok(copied) => copied,
            Err(e) => {
                drop(local);
                // Leave no truncated download behind
                if let Err(remove_err) = tokio::fs::remove_file(local_path).await {
                    debug!(local_path, error = %remove_err, "Could not remove partial download");
                }
                return Err(e.into());
            }
        };

        debug!(remote_path, local_path, bytes = copied, "Downloaded file");
        Ok(())
    }

    async fn delete(&self, remote_path: &str) -> TransportResult<()> {
        let guard = self.conn.read().await;
        let conn = guard.as_ref().ok_or(TransportError::NotConnected)?;
        debug!(remote_path, "Removing remote file");

        conn.sftp
            .remove_file(remote_path)
            .await
            .map_err(|e| map_sftp_error(e, remote_path))
    }
}
