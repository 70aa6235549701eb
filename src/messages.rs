// Define message types for the runtime
//
// Commands arrive as JSON objects, e.g.
//   {"motor": "motor_a", "command": "ramp_to_speed", "speed": 80, "duration": 2.0, "curve": "ease_in_out"}
// and are validated here before anything reaches a motor executor.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::motor::curve::Curve;
use crate::motor::dispatcher::{MotorId, UnknownMotor};
use crate::motor::executor::{MotorStatus, Operation, SPEED_LIMIT};

/// Default ramp duration in seconds when the field is omitted
pub const DEFAULT_RAMP_SECS: f32 = 1.0;

fn default_duration() -> f32 {
    DEFAULT_RAMP_SECS
}

// Raw command from teleop/scripts -> runtime, before range checks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum WireCommand {
    SetSpeed {
        motor: String,
        speed: f32,
    },
    RampToSpeed {
        motor: String,
        speed: f32,
        #[serde(default = "default_duration")]
        duration: f32,
        #[serde(default)]
        curve: Curve,
    },
    Stop {
        motor: String,
    },
    GetStatus {
        motor: String,
    },
}

/// What the selected motor is asked to do
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Request {
    Execute(Operation),
    GetStatus,
}

/// A validated command, ready for the dispatcher
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotorCommand {
    pub motor: MotorId,
    pub request: Request,
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Malformed command: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error(transparent)]
    UnknownMotor(#[from] UnknownMotor),

    #[error("Speed {0} out of range [-100, 100]")]
    SpeedOutOfRange(f32),

    #[error("Duration {0} must be a positive number of seconds")]
    InvalidDuration(f32),
}

fn check_speed(speed: f32) -> Result<f32, CommandError> {
    if speed.is_finite() && speed.abs() <= SPEED_LIMIT {
        Ok(speed)
    } else {
        Err(CommandError::SpeedOutOfRange(speed))
    }
}

fn check_duration(secs: f32) -> Result<Duration, CommandError> {
    if !(secs.is_finite() && secs > 0.0) {
        return Err(CommandError::InvalidDuration(secs));
    }
    match Duration::try_from_secs_f32(secs) {
        Ok(d) if !d.is_zero() => Ok(d),
        _ => Err(CommandError::InvalidDuration(secs)),
    }
}

impl TryFrom<WireCommand> for MotorCommand {
    type Error = CommandError;

    fn try_from(wire: WireCommand) -> Result<Self, Self::Error> {
        let (motor, request) = match wire {
            WireCommand::SetSpeed { motor, speed } => (
                motor,
                Request::Execute(Operation::SetSpeed(check_speed(speed)?)),
            ),
            WireCommand::RampToSpeed {
                motor,
                speed,
                duration,
                curve,
            } => (
                motor,
                Request::Execute(Operation::RampToSpeed {
                    target: check_speed(speed)?,
                    duration: check_duration(duration)?,
                    curve,
                }),
            ),
            WireCommand::Stop { motor } => (motor, Request::Execute(Operation::Stop)),
            WireCommand::GetStatus { motor } => (motor, Request::GetStatus),
        };

        Ok(MotorCommand {
            motor: motor.parse()?,
            request,
        })
    }
}

/// Parse and validate one JSON command payload
pub fn parse_command(payload: &[u8]) -> Result<MotorCommand, CommandError> {
    let wire: WireCommand = serde_json::from_slice(payload)?;
    MotorCommand::try_from(wire)
}

/// Reply to `get_status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReply {
    pub motor: MotorId,
    #[serde(flatten)]
    pub status: MotorStatus,
}

/// Published when a command is rejected
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReply {
    pub error: String,
}

impl From<&CommandError> for ErrorReply {
    fn from(e: &CommandError) -> Self {
        Self {
            error: e.to_string(),
        }
    }
}

/// Periodic telemetry for both motors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MotorsTelemetry {
    pub motor_a: MotorStatus,
    pub motor_b: MotorStatus,
}
