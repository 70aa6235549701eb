// Keyboard teleop: W/S motor A, I/K motor B, SPACE stop, R/F speed, P status, Q quit
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use serde_json::json;
use std::time::Duration;
use tracing::info;

use hbridge_zenoh_runtime::config::{TOPIC_CMD_MOTOR, TOPIC_ERROR, TOPIC_STATUS};

const SPEEDS: [f64; 3] = [35.0, 60.0, 90.0]; // percent
const RAMP_SECS: f64 = 0.5;

type ReplySubscriber =
    zenoh::pubsub::Subscriber<zenoh::handlers::FifoChannelHandler<zenoh::sample::Sample>>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;
    let publisher = session.declare_publisher(TOPIC_CMD_MOTOR).await?;
    let status_sub = session.declare_subscriber(TOPIC_STATUS).await?;
    let error_sub = session.declare_subscriber(TOPIC_ERROR).await?;

    info!("Controls: W/S=motor A, I/K=motor B, SPACE=stop, R/F=speed, P=status, Q=quit");
    info!("Speed: LOW");

    enable_raw_mode()?;
    let result = run_teleop(&publisher, &status_sub, &error_sub).await;
    disable_raw_mode()?;

    result
}

async fn run_teleop(
    publisher: &zenoh::pubsub::Publisher<'_>,
    status_sub: &ReplySubscriber,
    error_sub: &ReplySubscriber,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut speed_idx: usize = 0;

    loop {
        // Poll for key with 20ms timeout
        if event::poll(Duration::from_millis(20))? {
            if let Event::Key(KeyEvent { code, kind, .. }) = event::read()? {
                if kind != KeyEventKind::Press {
                    continue;
                }

                let speed = SPEEDS[speed_idx];
                let cmd = match code {
                    KeyCode::Char('w') => Some(ramp("motor_a", speed)),
                    KeyCode::Char('s') => Some(ramp("motor_a", -speed)),
                    KeyCode::Char('i') => Some(ramp("motor_b", speed)),
                    KeyCode::Char('k') => Some(ramp("motor_b", -speed)),

                    KeyCode::Char(' ') => {
                        for motor in ["motor_a", "motor_b"] {
                            let stop = json!({ "motor": motor, "command": "stop" });
                            publisher.put(stop.to_string()).await?;
                        }
                        None
                    }

                    KeyCode::Char('p') => {
                        for motor in ["motor_a", "motor_b"] {
                            let query = json!({ "motor": motor, "command": "get_status" });
                            publisher.put(query.to_string()).await?;
                        }
                        None
                    }

                    // Speed control
                    KeyCode::Char('r') => {
                        speed_idx = (speed_idx + 1).min(2);
                        print_speed(speed_idx);
                        None
                    }
                    KeyCode::Char('f') => {
                        speed_idx = speed_idx.saturating_sub(1);
                        print_speed(speed_idx);
                        None
                    }

                    // Quit
                    KeyCode::Char('q') | KeyCode::Esc => break,

                    _ => None,
                };

                if let Some(cmd) = cmd {
                    publisher.put(cmd.to_string()).await?;
                }
            }
        }

        // Show replies from the runtime
        while let Ok(Some(sample)) = status_sub.try_recv() {
            info!("Status: {}", String::from_utf8_lossy(&sample.payload().to_bytes()));
        }
        while let Ok(Some(sample)) = error_sub.try_recv() {
            info!("Error: {}", String::from_utf8_lossy(&sample.payload().to_bytes()));
        }
    }

    Ok(())
}

fn ramp(motor: &str, speed: f64) -> serde_json::Value {
    json!({
        "motor": motor,
        "command": "ramp_to_speed",
        "speed": speed,
        "duration": RAMP_SECS,
        "curve": "ease_in_out"
    })
}

fn print_speed(idx: usize) {
    let label = ["LOW", "MED", "HIGH"][idx];
    info!("Speed: {}", label);
}
