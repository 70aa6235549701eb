use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use hbridge_zenoh_runtime::config::{
    KICKSTART_DUTY, KICKSTART_TIME, MAX_DUTY, MIN_DUTY, MOTOR_ENABLED, STATUS_HZ,
};
use hbridge_zenoh_runtime::motor::DriveTuning;
use hbridge_zenoh_runtime::runtime::{self, RuntimeConfig};

/// Two-motor H-bridge runtime controlled over Zenoh
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// Use simulated bridges instead of GPIO/PWM hardware
    #[arg(long, default_value_t = !MOTOR_ENABLED)]
    simulate: bool,

    /// Lowest sustained duty (%) for a nonzero speed
    #[arg(long, default_value_t = MIN_DUTY)]
    min_duty: f32,

    /// Highest sustained duty (%)
    #[arg(long, default_value_t = MAX_DUTY)]
    max_duty: f32,

    /// Duty (%) of the pulse applied when starting from rest
    #[arg(long, default_value_t = KICKSTART_DUTY)]
    kickstart_duty: f32,

    /// Length of the kickstart pulse in milliseconds
    #[arg(long, default_value_t = KICKSTART_TIME.as_millis() as u64)]
    kickstart_ms: u64,

    /// Rate of motor telemetry on the state topic
    #[arg(long, default_value_t = STATUS_HZ)]
    status_hz: u64,
}

impl Args {
    fn into_config(self) -> Result<RuntimeConfig, String> {
        let duty_ok = |d: f32| (0.0..=100.0).contains(&d);
        if !(duty_ok(self.min_duty) && duty_ok(self.max_duty) && duty_ok(self.kickstart_duty)) {
            return Err("duty values must be within 0..=100".to_string());
        }
        if self.min_duty > self.max_duty {
            return Err(format!(
                "--min-duty ({}) must not exceed --max-duty ({})",
                self.min_duty, self.max_duty
            ));
        }

        Ok(RuntimeConfig {
            simulate: self.simulate,
            tuning: DriveTuning {
                min_duty: self.min_duty,
                max_duty: self.max_duty,
                kickstart_duty: self.kickstart_duty,
                kickstart_time: Duration::from_millis(self.kickstart_ms),
                ..DriveTuning::default()
            },
            status_hz: self.status_hz,
        })
    }
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    let config = match Args::parse().into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid arguments: {}", e);
            std::process::exit(2);
        }
    };

    if let Err(e) = runtime::run(config).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
