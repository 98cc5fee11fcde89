use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use mecanum_drive_runtime::config::DriveConfig;
use mecanum_drive_runtime::drive::MotionIntent;
use mecanum_drive_runtime::hal::Wheel;
use mecanum_drive_runtime::runtime::{self, OpMode, RuntimeOptions};

#[derive(Parser)]
#[command(version, about = "Four-wheel mecanum drive runtime")]
struct Cli {
    /// JSON drive config (calibration, power, timeouts)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Drive simulated motors instead of the zenoh wheel bridge
    #[arg(long, global = true)]
    sim: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Gamepad driving
    Teleop,
    /// Run discrete moves, e.g. --step drive:10 --step turn:90
    Auto {
        #[arg(long = "step", default_value = "drive:10")]
        steps: Vec<MotionIntent>,
    },
    /// Drive one wheel from the left stick to check wiring
    WheelTest {
        #[arg(long, value_enum, default_value_t = WheelArg::FrontLeft)]
        wheel: WheelArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum WheelArg {
    FrontLeft,
    FrontRight,
    BackLeft,
    BackRight,
}

impl From<WheelArg> for Wheel {
    fn from(arg: WheelArg) -> Self {
        match arg {
            WheelArg::FrontLeft => Wheel::FrontLeft,
            WheelArg::FrontRight => Wheel::FrontRight,
            WheelArg::BackLeft => Wheel::BackLeft,
            WheelArg::BackRight => Wheel::BackRight,
        }
    }
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=debug for per-cycle detail)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => DriveConfig::load(path),
        None => Ok(DriveConfig::default()),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Config error: {}", e);
            std::process::exit(1);
        }
    };

    let op_mode = match cli.command {
        Command::Teleop => OpMode::Teleop,
        Command::Auto { steps } => OpMode::Auto { steps },
        Command::WheelTest { wheel } => OpMode::WheelTest {
            wheel: wheel.into(),
        },
    };

    let options = RuntimeOptions {
        op_mode,
        config,
        sim: cli.sim,
    };
    if let Err(e) = runtime::run(options).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
