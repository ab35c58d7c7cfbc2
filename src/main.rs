use clap::Parser;
use tracing_subscriber::EnvFilter;

use swerve_teleop_runtime::config::{DriveConfig, LOOP_HZ, ZeroSpeedAnglePolicy};

/// Swerve teleop runtime: joystick axes in, module states out
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Control loop rate
    #[arg(long, default_value_t = LOOP_HZ, value_parser = clap::value_parser!(u64).range(1..=1000))]
    loop_hz: u64,

    /// Module angle when its commanded speed is zero
    #[arg(long, value_enum, default_value_t = ZeroSpeedAnglePolicy::HoldLast)]
    zero_speed_angle: ZeroSpeedAnglePolicy,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init(); // installs the subscriber globally

    let config = DriveConfig {
        zero_speed_policy: args.zero_speed_angle,
        ..DriveConfig::default()
    };

    if let Err(e) = swerve_teleop_runtime::runtime::run(config, args.loop_hz).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
