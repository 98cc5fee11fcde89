// Keyboard teleop: WASD move/strafe, Z/X rotate, R/F speed, Q quit
// Publishes gamepad stick state for the runtime's teleop op-mode.
//
// Usage: cargo run --example gamepad_publisher
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use mecanum_drive_runtime::config::TOPIC_CMD_GAMEPAD;
use mecanum_drive_runtime::messages::GamepadState;
use std::time::{Duration, Instant};
use tracing::info;

const STICK_LEVELS: [f64; 3] = [0.25, 0.5, 1.0]; // stick deflection per speed level
const INPUT_TIMEOUT_MS: u64 = 100; // Release sticks after this much time with no input

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;
    let publisher = session.declare_publisher(TOPIC_CMD_GAMEPAD).await?;

    info!("Controls: W/S=forward/back, A/D=strafe, Z/X=rotate, R/F=speed, Q=quit");
    print_speed(0);

    enable_raw_mode()?;
    let result = run_teleop(&publisher).await;
    disable_raw_mode()?;

    result
}

async fn run_teleop(
    publisher: &zenoh::pubsub::Publisher<'_>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut speed_idx: usize = 0;

    // Persistent stick state
    let mut pad = GamepadState::neutral();
    let mut last_movement_input = Instant::now();

    loop {
        // Poll for key with 20ms timeout (50Hz effective rate)
        if event::poll(Duration::from_millis(20))? {
            if let Event::Key(KeyEvent { code, kind, .. }) = event::read()? {
                let pressed = kind == KeyEventKind::Press || kind == KeyEventKind::Repeat;
                let level = STICK_LEVELS[speed_idx];

                match code {
                    // Pushing the stick forward reads negative
                    KeyCode::Char('w') if pressed => {
                        pad.left_stick_y = -level;
                        last_movement_input = Instant::now();
                    }
                    KeyCode::Char('s') if pressed => {
                        pad.left_stick_y = level;
                        last_movement_input = Instant::now();
                    }
                    KeyCode::Char('a') if pressed => {
                        pad.left_stick_x = -level;
                        last_movement_input = Instant::now();
                    }
                    KeyCode::Char('d') if pressed => {
                        pad.left_stick_x = level;
                        last_movement_input = Instant::now();
                    }

                    // Rotation, positive = clockwise
                    KeyCode::Char('z') if pressed => {
                        pad.right_stick_x = -level;
                        last_movement_input = Instant::now();
                    }
                    KeyCode::Char('x') if pressed => {
                        pad.right_stick_x = level;
                        last_movement_input = Instant::now();
                    }

                    // Speed control
                    KeyCode::Char('r') if pressed => {
                        speed_idx = (speed_idx + 1).min(2);
                        print_speed(speed_idx);
                    }
                    KeyCode::Char('f') if pressed => {
                        speed_idx = speed_idx.saturating_sub(1);
                        print_speed(speed_idx);
                    }

                    // Quit
                    KeyCode::Char('q') | KeyCode::Esc if pressed => break,

                    _ => {}
                }
            }
        }

        // Release sticks if no movement input for INPUT_TIMEOUT_MS
        if last_movement_input.elapsed() > Duration::from_millis(INPUT_TIMEOUT_MS) {
            pad = GamepadState::neutral();
        }

        // Always publish at ~50Hz
        publisher.put(serde_json::to_string(&pad)?).await?;
    }

    // Leave the robot stopped
    publisher
        .put(serde_json::to_string(&GamepadState::neutral())?)
        .await?;
    Ok(())
}

fn print_speed(idx: usize) {
    let label = ["LOW", "MED", "HIGH"][idx];
    info!("Speed: {}", label);
}
