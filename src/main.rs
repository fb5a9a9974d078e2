//! Command-line SFTP client built on the facade

use clap::{Parser, Subcommand};
use sftp_facade::{ConnectOptions, Credentials, SftpClient, SshTransport, TransportResult};
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sftp-facade")]
#[command(about = "Connect, run one SFTP operation, disconnect", long_about = None)]
struct Cli {
    /// Server to connect to, as [user@]host[:port]
    #[arg(long, env = "SFTP_HOST")]
    host: String,

    /// Port, overriding the one in --host
    #[arg(short, long, env = "SFTP_PORT")]
    port: Option<u16>,

    /// Username, overriding the one in --host
    #[arg(short, long, env = "SFTP_USER")]
    user: Option<String>,

    /// Password for password authentication
    #[arg(long, env = "SFTP_PASSWORD", hide_env_values = true, conflicts_with = "identity")]
    password: Option<String>,

    /// Private key file (OpenSSH/PEM) for public key authentication
    #[arg(short, long, env = "SFTP_IDENTITY")]
    identity: Option<PathBuf>,

    /// Passphrase for the private key
    #[arg(long, env = "SFTP_PASSPHRASE", hide_env_values = true)]
    passphrase: Option<String>,

    /// Expected server key fingerprint (SHA256:...)
    #[arg(long, env = "SFTP_HOST_KEY_FINGERPRINT")]
    host_key_fingerprint: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List file names in a remote directory
    Ls {
        remote_dir: String,
        /// Filename pattern (`*` and `?` wildcards)
        #[arg(default_value = "*")]
        pattern: String,
    },
    /// Upload a local file
    Put { local: String, remote: String },
    /// Download a remote file
    Get { remote: String, local: String },
    /// Delete a remote file
    Rm { remote: String },
}

/// Assemble connection options from the command line
fn connect_options(cli: &Cli) -> sftp_facade::error::Result<ConnectOptions> {
    let mut options = ConnectOptions::parse_target(&cli.host)?;

    if let Some(port) = cli.port {
        options = options.port(port);
    }
    if let Some(ref user) = cli.user {
        options = options.username(user.as_str());
    }
    if options.username.is_empty() {
        return Err(sftp_facade::Error::Config(
            "no username given; use --user or user@host".to_string(),
        ));
    }

    if let Some(ref path) = cli.identity {
        let credentials = Credentials::private_key_file(path, cli.passphrase.clone())?;
        // Fail on an unreadable key before opening a connection
        if let Credentials::PrivateKey {
            ref key,
            ref passphrase,
        } = credentials
        {
            russh::keys::decode_secret_key(key, passphrase.as_deref())?;
        }
        options = options.credentials(credentials);
    } else if let Some(ref password) = cli.password {
        options = options.password(password.as_str());
    }

    if let Some(ref fingerprint) = cli.host_key_fingerprint {
        options = options.host_key_fingerprint(fingerprint.as_str());
    }

    Ok(options)
}

async fn run_command(client: &SftpClient<SshTransport>, command: Command) -> TransportResult<()> {
    match command {
        Command::Ls {
            remote_dir,
            pattern,
        } => {
            for name in client.list_files(&remote_dir, &pattern).await? {
                println!("{}", name);
            }
        }
        Command::Put { local, remote } => {
            client.upload_file(&local, &remote).await?;
            eprintln!("Uploaded {} -> {}", local, remote);
        }
        Command::Get { remote, local } => {
            client.download_file(&remote, &local).await?;
            eprintln!("Downloaded {} -> {}", remote, local);
        }
        Command::Rm { remote } => {
            client.delete_file(&remote).await?;
            eprintln!("Deleted {}", remote);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive("sftp_facade=info".parse()?))
        .init();

    let options = connect_options(&cli)?;
    if matches!(options.credentials, Credentials::None) {
        eprintln!("Warning: No credentials configured!");
        eprintln!("         Use --password or --identity path");
    }

    let client = SftpClient::new(SshTransport::new());
    client.connect(&options).await?;

    let result = run_command(&client, cli.command).await;

    // Always close the session, but report the operation's failure first
    if let Err(e) = client.disconnect().await {
        warn!(error = %e, "Disconnect failed");
    }

    result?;
    Ok(())
}
