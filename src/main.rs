// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand, ValueEnum};
use effect_cam::backends::camera::{CameraBackendType, SystemBackend};
use effect_cam::config::Config;
use effect_cam::constants;
use std::fs::File;
use std::sync::Mutex;

mod cli;

#[derive(Parser)]
#[command(name = "effect-cam")]
#[command(about = "Live camera preview with selectable video effects")]
#[command(version = env!("GIT_VERSION"))]
#[command(subcommand_required = false)]
struct Cli {
    /// Camera backend (overrides the configuration file)
    #[arg(short, long, global = true, value_enum)]
    backend: Option<BackendArg>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, ValueEnum)]
enum BackendArg {
    /// Video4Linux2 devices
    V4l2,
    /// Generated test pattern
    Synthetic,
}

impl From<BackendArg> for CameraBackendType {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::V4l2 => CameraBackendType::V4l2,
            BackendArg::Synthetic => CameraBackendType::Synthetic,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run in terminal mode (default)
    Terminal,

    /// List available cameras
    List,

    /// List available effects
    Effects,

    /// Preview without a UI and print frame statistics
    Preview {
        /// Effect to apply (from 'effect-cam effects')
        #[arg(short, long)]
        effect: Option<String>,

        /// Effect parameter value (clamped to the effect's range)
        #[arg(short, long, requires = "effect")]
        value: Option<f32>,

        /// Preview duration in seconds
        #[arg(short, long, default_value = "10")]
        duration: u64,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let terminal_mode = matches!(cli.command, None | Some(Commands::Terminal));

    init_logging(terminal_mode);

    let mut config = Config::load();
    if let Some(backend) = cli.backend {
        config.backend = backend.into();
    }
    let backend = SystemBackend::from_config(&config);

    match cli.command {
        None | Some(Commands::Terminal) => effect_cam::terminal::run(backend, config),
        Some(Commands::List) => cli::list_cameras(backend),
        Some(Commands::Effects) => cli::list_effects(),
        Some(Commands::Preview {
            effect,
            value,
            duration,
        }) => cli::run_preview(backend, effect, value, duration).map_err(Into::into),
    }
}

/// Initialize logging
///
/// Set RUST_LOG environment variable to control log level.
/// Examples: RUST_LOG=debug, RUST_LOG=effect_cam=debug, RUST_LOG=info
fn init_logging(terminal_mode: bool) {
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
    };

    // The terminal UI owns stdout/stderr, so log to a file instead
    if terminal_mode && let Some(file) = open_terminal_log() {
        tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .with_target(true)
            .with_level(true)
            .init();
        return;
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_target(true)
        .with_level(true)
        .init();
}

fn open_terminal_log() -> Option<File> {
    let dir = dirs::cache_dir()?.join(constants::APP_DIR_NAME);
    std::fs::create_dir_all(&dir).ok()?;
    File::create(dir.join(constants::TERMINAL_LOG_FILE_NAME)).ok()
}
