//! SceneLink reference host — entry point.
//!
//! ```text
//! scenelink-host                  Serve the configured command port
//! scenelink-host --port <p>       Override the command port
//! scenelink-host --config <path>  Load a custom config TOML
//! scenelink-host --gen-config     Write default config to stdout
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use scenelink_core::{CommandServer, Endpoint};
use tracing::info;
use tracing_subscriber::EnvFilter;

use scenelink_host::config::HostConfig;
use scenelink_host::router::SceneRouter;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "scenelink-host",
    about = "SceneLink reference host (in-memory scene server)"
)]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "scenelink-host.toml")]
    config: PathBuf,

    /// Override the configured command port.
    #[arg(short, long)]
    port: Option<u16>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // --gen-config: dump defaults and exit.
    if cli.gen_config {
        let text = toml::to_string_pretty(&HostConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    // Load config.
    let mut config = HostConfig::load(&cli.config);
    if let Some(port) = cli.port {
        config.network.command_port = port;
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("scenelink-host v{}", env!("CARGO_PKG_VERSION"));
    info!("command port: {}", config.network.command_port);
    info!(
        "viewport: {}x{}",
        config.viewport.width, config.viewport.height
    );

    let router = Arc::new(SceneRouter::new(config.to_renderer()));
    let endpoint = Endpoint::new(&config.network.bind_host, config.network.command_port);
    let server = CommandServer::bind(&endpoint, router).await?;
    let stop = server.stop_handle();

    // Ctrl-C handler.
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Ctrl-C received — shutting down");
        stop.store(false, std::sync::atomic::Ordering::SeqCst);
    });

    server.run().await?;

    Ok(())
}
