//! SceneLink controller — entry point.
//!
//! ```text
//! scenelink-ctl probe                      Is a host listening?
//! scenelink-ctl install --plugin <path>    Copy a plugin into the host
//! scenelink-ctl launch [args…]             Start the host, wait for the port
//! scenelink-ctl attach                     Connection smoke test
//! scenelink-ctl scene-info                 Print the scene inventory
//! scenelink-ctl create-object --kind CUBE  Add an object
//! scenelink-ctl metrics                    Print scene statistics
//! scenelink-ctl snapshot --out view.png    Save a viewport capture
//! scenelink-ctl preview --frames 10        Record preview frames
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use scenelink_core::{
    DEFAULT_COMMAND_PORT, DEFAULT_HOST, DEFAULT_PREVIEW_PORT, Endpoint, PortProbe, StartupWaiter,
};
use scenelink_ctl::install::install_plugin;
use scenelink_ctl::launch::HostLauncher;
use scenelink_ctl::locate::HostLocator;
use scenelink_ctl::ops::{Controller, parse_vec3};

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "scenelink-ctl",
    about = "SceneLink controller: drive a scene host over TCP"
)]
struct Cli {
    /// Host address the command channel connects to.
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,

    /// Command port.
    #[arg(short, long, default_value_t = DEFAULT_COMMAND_PORT)]
    port: u16,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Report whether anything is listening on the command port.
    Probe,

    /// Locate the host install and copy a plugin into its addons dir.
    Install {
        /// Plugin file or directory to install.
        #[arg(long)]
        plugin: PathBuf,
        /// Host application name to locate.
        #[arg(long, default_value = "scenelink-host")]
        app: String,
        /// Explicit install root or executable (skips the search).
        #[arg(long)]
        root: Option<PathBuf>,
    },

    /// Launch the host and wait for its command port to open.
    Launch {
        /// Host executable (default: locate by app name).
        #[arg(long)]
        executable: Option<PathBuf>,
        /// Host application name to locate.
        #[arg(long, default_value = "scenelink-host")]
        app: String,
        /// Explicit install root or executable (skips the search).
        #[arg(long)]
        root: Option<PathBuf>,
        /// Seconds to wait for the command port.
        #[arg(long, default_value_t = 30)]
        wait_secs: u32,
        /// Arguments passed through to the host.
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Connection smoke test: scene info plus a test sphere.
    Attach,

    /// Print the scene inventory.
    SceneInfo,

    /// Create an object in the scene.
    CreateObject {
        /// Object kind: CUBE, SPHERE, PLANE, LIGHT or CAMERA.
        #[arg(long)]
        kind: String,
        /// Object name (host auto-names when omitted).
        #[arg(long)]
        name: Option<String>,
        /// Location as x,y,z.
        #[arg(long, value_parser = parse_vec3)]
        location: Option<[f64; 3]>,
        /// Scale as x,y,z.
        #[arg(long, value_parser = parse_vec3)]
        scale: Option<[f64; 3]>,
    },

    /// Print scene statistics.
    Metrics,

    /// Save a viewport capture to disk.
    Snapshot {
        #[arg(long)]
        width: Option<u32>,
        #[arg(long)]
        height: Option<u32>,
        /// Image format: PNG or JPEG.
        #[arg(long)]
        format: Option<String>,
        #[arg(long, default_value = "viewport.png")]
        out: PathBuf,
    },

    /// Record live preview frames to disk.
    Preview {
        /// Frames to save before stopping the session.
        #[arg(long, default_value_t = 10)]
        frames: usize,
        /// Target frame rate to request.
        #[arg(long, default_value_t = 5)]
        fps: u8,
        /// Preview port to suggest to the host (0 = let it pick).
        #[arg(long, default_value_t = DEFAULT_PREVIEW_PORT)]
        preview_port: u16,
        #[arg(long, default_value = "preview")]
        out_dir: PathBuf,
    },
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let endpoint = Endpoint::new(&cli.host, cli.port);

    match cli.command {
        Commands::Probe => {
            if PortProbe::is_free(&endpoint).await {
                println!("{endpoint}: nothing listening");
            } else {
                println!("{endpoint}: port taken — a host is likely running");
            }
        }

        Commands::Install { plugin, app, root } => {
            let mut locator = HostLocator::new(&app);
            if let Some(root) = root {
                locator = locator.with_root(root);
            }
            let install = locator.locate()?;
            println!("host found at {}", install.root.display());
            let dest = install_plugin(&install, &plugin)?;
            println!("plugin installed to {}", dest.display());
        }

        Commands::Launch {
            executable,
            app,
            root,
            wait_secs,
            args,
        } => {
            let executable = match executable {
                Some(path) => path,
                None => {
                    let mut locator = HostLocator::new(&app);
                    if let Some(root) = root {
                        locator = locator.with_root(root);
                    }
                    locator.locate()?.executable
                }
            };
            let waiter = StartupWaiter::new(Duration::from_secs(1), wait_secs);
            let running = HostLauncher::new(executable)
                .args(args)
                .with_waiter(waiter)
                .launch(&endpoint)
                .await?;
            println!("host is listening on {}", running.endpoint);
        }

        Commands::Attach => {
            let mut controller = Controller::connect(&endpoint).await?;
            let report = controller.attach().await?;
            println!("scene has {} objects", report.object_count);
            if report.above_cube {
                println!("created {} two units above the cube", report.created);
            } else {
                println!("no cube found; created {} at the origin", report.created);
            }
        }

        Commands::SceneInfo => {
            let mut controller = Controller::connect(&endpoint).await?;
            let info = controller.scene_info().await?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }

        Commands::CreateObject {
            kind,
            name,
            location,
            scale,
        } => {
            let mut controller = Controller::connect(&endpoint).await?;
            let result = controller
                .create_object(&kind, name.as_deref(), location, scale)
                .await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }

        Commands::Metrics => {
            let mut controller = Controller::connect(&endpoint).await?;
            let metrics = controller.metrics().await?;
            println!("{}", serde_json::to_string_pretty(&metrics)?);
        }

        Commands::Snapshot {
            width,
            height,
            format,
            out,
        } => {
            let mut controller = Controller::connect(&endpoint).await?;
            let path = controller
                .snapshot(width, height, format.as_deref(), &out)
                .await?;
            println!("snapshot written to {}", path.display());
        }

        Commands::Preview {
            frames,
            fps,
            preview_port,
            out_dir,
        } => {
            let mut controller = Controller::connect(&endpoint).await?;
            let saved = controller
                .watch_preview(preview_port, fps, frames, &out_dir)
                .await?;
            println!("saved {} frames to {}", saved.len(), out_dir.display());
        }
    }

    Ok(())
}
