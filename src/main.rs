//! Initializer service main entry point

use anyhow::Result;
use clap::Parser;
use initializer::{web, Config};
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing::info;

#[derive(Parser)]
struct Args {
    #[clap(long, default_value = "127.0.0.1")]
    /// The address to listen on
    listen_address: std::net::IpAddr,

    #[clap(long, default_value = "8080")]
    /// The port to listen on
    port: u16,

    #[clap(long)]
    /// The path to the configuration file
    config: Option<PathBuf>,

    #[clap(flatten)]
    logging: initializer::logging::LoggingArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    args.logging.init();

    let config = Config::load(args.config.as_deref())?;
    info!(
        templates = %config.templates_path.display(),
        manifest = %config.manifest_path.display(),
        "configuration loaded"
    );

    let state = web::AppState::from_config(&config)?;
    let app = web::app(state);

    let addr = std::net::SocketAddr::new(args.listen_address, args.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
