// Motor test: drives both channels through a short scripted sequence
//
// Usage: cargo run --example motor_test             (simulated bridges)
//        cargo run --example motor_test --features gpio-hardware -- --hardware
//
// Make sure wheels are OFF THE GROUND before running on hardware.

use std::thread::sleep;
use std::time::Duration;

use tracing::info;

use hbridge_zenoh_runtime::motor::{Curve, DriveTuning, MotorId};
use hbridge_zenoh_runtime::runtime::{Runtime, RuntimeConfig};

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Setup logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("info".parse().unwrap()),
        )
        .init();

    let hardware = std::env::args().any(|a| a == "--hardware");
    let config = RuntimeConfig {
        simulate: !hardware,
        tuning: DriveTuning::default(),
        status_hz: 0,
    };
    let mut runtime = Runtime::open(&config)?;
    let motors = runtime.dispatcher();
    let motor_a = motors.executor(MotorId::A);
    let motor_b = motors.executor(MotorId::B);

    info!("Testing motor control");
    motor_a.set_speed(50.0);
    motor_b.ramp_to_speed(80.0, Duration::from_secs(2), Curve::EaseInOut);
    sleep(Duration::from_secs(1));
    info!("A: {:?}, B (mid-ramp): {:?}", motor_a.get_status(), motor_b.get_status());

    motor_a.ramp_to_speed(-50.0, Duration::from_secs(1), Curve::Linear);
    motor_b.ramp_to_speed(-80.0, Duration::from_secs(2), Curve::EaseInOut);
    sleep(Duration::from_secs(3));
    info!("A: {:?}, B: {:?}", motor_a.get_status(), motor_b.get_status());

    motor_a.stop();
    motor_b.stop();
    sleep(Duration::from_millis(100));

    info!("Stopping motors...");
    runtime.shutdown();
    Ok(())
}
