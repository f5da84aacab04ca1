use clap::{Parser, Subcommand};
use snaplink::config::Config;
use snaplink::error::AppResult;
use snaplink::server;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// snaplink - A minimal, fast URL shortener
#[derive(Parser, Debug)]
#[command(name = "snaplink")]
#[command(version = "0.1.0")]
#[command(about = "A minimal, fast URL shortener", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the web server
    Server {
        /// Host to bind to (overrides SERVER_HOST env var)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (overrides SERVER_PORT env var)
        #[arg(long)]
        port: Option<u16>,

        /// Run migrations on startup
        #[arg(long, default_value_t = true)]
        migrate: bool,
    },

    /// Purge expired links once and exit
    Sweep,
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string())),
        )
        .init();

    // Load configuration
    let config = Config::from_env()?;

    match cli.command {
        Commands::Server {
            host,
            port,
            migrate,
        } => {
            // Override config with CLI args if provided
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            let addr = format!("{}:{}", host, port);

            // Re-compute base_url after CLI overrides
            let mut config = config;
            config.url.base_url = format!("http://{}:{}", host, port);

            server::run_server(config, addr, migrate).await
        }
        Commands::Sweep => server::run_sweep(config).await,
    }
}
