// Timeouts, topics, pins and drive tuning
use std::time::Duration;

// Runtime loop frequency (command drain)
pub const LOOP_HZ: u64 = 50;

// Default rate for periodic motor telemetry
pub const STATUS_HZ: u64 = 10;

// Zenoh topics
pub const TOPIC_CMD_MOTOR: &str = "hbridge/cmd/motor"; // commands
pub const TOPIC_STATUS: &str = "hbridge/state/status"; // get_status replies
pub const TOPIC_ERROR: &str = "hbridge/state/error"; // rejected commands
pub const TOPIC_MOTORS: &str = "hbridge/state/motors"; // periodic telemetry

// Pin mapping (BCM numbering), TB6612FNG style driver
pub const AIN1: u8 = 26;
pub const AIN2: u8 = 16;
pub const PWMA: u8 = 13;
pub const BIN1: u8 = 5;
pub const BIN2: u8 = 6;
pub const PWMB: u8 = 12;
pub const STBY: u8 = 19;

pub const PWM_FREQUENCY_HZ: f64 = 1000.0;

// Drive tuning (duty values are percentages)
pub const MIN_DUTY: f32 = 30.0; // lowest duty that reliably spins the motor
pub const MAX_DUTY: f32 = 100.0;
pub const KICKSTART_DUTY: f32 = 65.0;
pub const KICKSTART_TIME: Duration = Duration::from_millis(10);

// Ramp resolution
pub const RAMP_STEPS_PER_SEC: f32 = 100.0;

// Worker wait when the queue is empty
pub const IDLE_POLL: Duration = Duration::from_millis(10);

// Drive real hardware by default (set to false for simulation/testing)
pub const MOTOR_ENABLED: bool = cfg!(feature = "gpio-hardware");
