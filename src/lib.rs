//! # sftp-facade
//!
//! A small async SFTP client facade over a pluggable transport.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sftp_facade::{ConnectOptions, SftpClient, SshTransport};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let client = SftpClient::new(SshTransport::new());
//!     let options = ConnectOptions::new("example.com")
//!         .port(22)
//!         .username("user")
//!         .password("pass");
//!
//!     client.connect(&options).await?;
//!     for name in client.list_files("/incoming", "*.csv").await? {
//!         client
//!             .download_file(&format!("/incoming/{name}"), &name)
//!             .await?;
//!     }
//!     client.disconnect().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Custom Transport
//!
//! Implement the `Transport` trait to put another session library behind
//! the facade:
//!
//! ```rust,ignore
//! use sftp_facade::transport::{RemoteEntry, Transport, TransportResult};
//! use sftp_facade::ConnectOptions;
//! use async_trait::async_trait;
//!
//! struct MyTransport;
//!
//! #[async_trait]
//! impl Transport for MyTransport {
//!     async fn connect(&self, options: &ConnectOptions) -> TransportResult<()> {
//!         // Implementation
//!         todo!()
//!     }
//!     // ... other methods
//! }
//! ```

pub mod client;
pub mod error;
pub mod options;
pub mod transport;

// Re-exports for convenience
pub use client::SftpClient;
pub use options::{ConnectOptions, Credentials};
pub use transport::{
    EntryKind, MemoryTransport, RemoteEntry, SshTransport, Transport, TransportError,
    TransportResult,
};

pub use error::Error;
