// Keyboard teleop: WASD move, Z/X rotate, R/V stick throw, F field-relative toggle, Q quit
//
// Usage: cargo run --example axis_publisher
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use std::time::{Duration, Instant};
use tracing::info;

use swerve_teleop_runtime::config::TOPIC_CMD_AXES;
use swerve_teleop_runtime::messages::AxisCommand;

const THROWS: [f64; 3] = [0.25, 0.5, 1.0]; // fraction of full stick deflection
const INPUT_TIMEOUT_MS: u64 = 100; // Release the sticks after this much time with no input

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;
    let publisher = session.declare_publisher(TOPIC_CMD_AXES).await?;

    info!("Controls: WASD=move, Z/X=rotate, R/V=throw, F=field-relative, Q=quit");
    print_throw(0);

    enable_raw_mode()?;
    let result = run_teleop(&publisher).await;
    disable_raw_mode()?;

    result
}

async fn run_teleop(
    publisher: &zenoh::pubsub::Publisher<'_>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut throw_idx: usize = 0;
    let mut cmd = AxisCommand {
        x: 0.0,
        y: 0.0,
        rotation: 0.0,
        field_relative: false,
    };
    let mut last_movement_input = Instant::now();

    loop {
        // Poll for key with 20ms timeout (50Hz effective rate)
        if event::poll(Duration::from_millis(20))? {
            if let Event::Key(KeyEvent { code, kind, .. }) = event::read()? {
                let pressed = kind == KeyEventKind::Press || kind == KeyEventKind::Repeat;
                let throw = THROWS[throw_idx];

                match code {
                    KeyCode::Char('w') if pressed => cmd.x = throw,
                    KeyCode::Char('s') if pressed => cmd.x = -throw,
                    KeyCode::Char('a') if pressed => cmd.y = throw,
                    KeyCode::Char('d') if pressed => cmd.y = -throw,
                    KeyCode::Char('z') if pressed => cmd.rotation = throw,
                    KeyCode::Char('x') if pressed => cmd.rotation = -throw,

                    KeyCode::Char('r') if pressed => {
                        throw_idx = (throw_idx + 1).min(THROWS.len() - 1);
                        print_throw(throw_idx);
                    }
                    KeyCode::Char('v') if pressed => {
                        throw_idx = throw_idx.saturating_sub(1);
                        print_throw(throw_idx);
                    }
                    KeyCode::Char('f') if pressed => {
                        cmd.field_relative = !cmd.field_relative;
                        info!("Field-relative: {}", cmd.field_relative);
                    }

                    // Quit
                    KeyCode::Char('q') | KeyCode::Esc if pressed => break,

                    _ => {}
                }

                if pressed && matches!(code, KeyCode::Char('w' | 's' | 'a' | 'd' | 'z' | 'x')) {
                    last_movement_input = Instant::now();
                }
            }
        }

        // Sticks spring back to center when nothing is held
        if last_movement_input.elapsed() > Duration::from_millis(INPUT_TIMEOUT_MS) {
            cmd.x = 0.0;
            cmd.y = 0.0;
            cmd.rotation = 0.0;
        }

        // Always publish at ~50Hz so the runtime watchdog stays fed
        publisher.put(serde_json::to_string(&cmd)?).await?;
    }

    Ok(())
}

fn print_throw(idx: usize) {
    info!("Stick throw: {:.0}%", THROWS[idx] * 100.0);
}
