use crate::options::ConnectOptions;
use crate::transport::{Transport, TransportResult};
use tracing::debug;

/// SFTP client facade over a single transport
///
/// Every operation is one call on the transport with the arguments passed
/// through unchanged. Transport failures come back as-is. Connection state
/// lives in the transport; the facade never checks it.
pub struct SftpClient<T: Transport> {
    transport: T,
}

impl<T: Transport> SftpClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Open the session
    pub async fn connect(&self, options: &ConnectOptions) -> TransportResult<()> {
        debug!(host = %options.host, port = options.port, user = %options.username, "Connecting");
        self.transport.connect(options).await
    }

    /// Close the session; safe to call in any state the transport accepts
    pub async fn disconnect(&self) -> TransportResult<()> {
        debug!("Disconnecting");
        self.transport.end().await
    }

    /// Names of the entries in `remote_dir` matching `file_glob`, in transport order
    pub async fn list_files(
        &self,
        remote_dir: &str,
        file_glob: &str,
    ) -> TransportResult<Vec<String>> {
        debug!(remote_dir, file_glob, "Listing files");
        let entries = self.transport.list(remote_dir, file_glob).await?;
        Ok(entries.into_iter().map(|entry| entry.name).collect())
    }

    pub async fn upload_file(&self, local_path: &str, remote_path: &str) -> TransportResult<()> {
        debug!(local_path, remote_path, "Uploading file");
        self.transport.put(local_path, remote_path).await
    }

    pub async fn download_file(&self, remote_path: &str, local_path: &str) -> TransportResult<()> {
        debug!(remote_path, local_path, "Downloading file");
        self.transport.get(remote_path, local_path).await
    }

    pub async fn delete_file(&self, remote_path: &str) -> TransportResult<()> {
        debug!(remote_path, "Deleting file");
        self.transport.delete(remote_path).await
    }
}
