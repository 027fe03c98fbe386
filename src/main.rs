use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lancast::config::{get_config_path, Config};
use lancast::server::stun::start_stun_server;
use lancast::{cert, LancastServer};

#[derive(Parser)]
#[command(name = "lancast")]
#[command(about = "Share your screen with every browser on the local network", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the lancast server
    Start {
        /// Interface to bind (overrides the config file)
        #[arg(long)]
        bind: Option<String>,
        /// Port for the main listener (overrides the config file)
        #[arg(long)]
        port: Option<u16>,
        /// Serve plain HTTP instead of TLS (browsers allow screen capture
        /// on plain HTTP for localhost only)
        #[arg(long)]
        no_tls: bool,
    },
    /// Generate the self-signed certificate for the TLS listener
    GenCert {
        /// Replace an existing certificate
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("lancast=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Start { bind, port, no_tls } => {
            let mut config = Config::load()?;
            if let Some(bind) = bind {
                config.server.bind_address = bind;
            }
            if let Some(port) = port {
                config.server.https_port = port;
            }
            if no_tls {
                config.tls.enabled = false;
            }

            if config.tls.enabled {
                let generated = cert::ensure_certificate(&config.tls.cert_file, &config.tls.key_file)
                    .context("Failed to prepare the TLS certificate")?;
                if generated {
                    println!("Generated self-signed certificate: {}", config.tls.cert_file.display());
                }
            }

            // Start STUN server if configured
            let stun_handle = if config.server.stun_port > 0 {
                let stun_addr: std::net::SocketAddr =
                    format!("{}:{}", config.server.bind_address, config.server.stun_port)
                        .parse()
                        .context("Invalid STUN bind address")?;
                Some(
                    start_stun_server(stun_addr)
                        .await
                        .context("Failed to start STUN server")?,
                )
            } else {
                None
            };

            let scheme = if config.tls.enabled { "https" } else { "http" };
            let shown_port = match (scheme, config.server.https_port) {
                ("https", 443) | ("http", 80) => String::new(),
                (_, port) => format!(":{}", port),
            };

            // Print startup info
            println!(
                "Starting lancast on {}://{}:{}",
                scheme, config.server.bind_address, config.server.https_port
            );
            println!("Config: {}", get_config_path().display());
            if let Some(ref handle) = stun_handle {
                println!("STUN server: {}", handle.addr);
            }
            if config.tls.enabled && config.server.http_port > 0 {
                println!("HTTP redirect: port {}", config.server.http_port);
            }
            println!();
            println!(
                "Open {}://<this machine's address>{}/ on every device that should share or watch.",
                scheme, shown_port
            );

            let server = LancastServer::new(config);
            server.run().await?;

            // Shutdown STUN server
            if let Some(handle) = stun_handle {
                handle.shutdown();
            }
        }
        Commands::GenCert { force } => {
            let config = Config::load()?;

            if !force && config.tls.cert_file.exists() && config.tls.key_file.exists() {
                println!(
                    "Certificate already exists at {} (use --force to replace it)",
                    config.tls.cert_file.display()
                );
            } else {
                cert::generate_certificate(&config.tls.cert_file, &config.tls.key_file)
                    .context("Failed to generate certificate")?;
                println!("Certificate: {}", config.tls.cert_file.display());
                println!("Private key: {}", config.tls.key_file.display());
            }
        }
    }

    Ok(())
}
