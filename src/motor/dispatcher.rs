// Routes validated commands to the executor of the selected motor

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::executor::{MotorExecutor, MotorStatus};
use super::hbridge::HBridge;
use crate::messages::{MotorCommand, Request};

/// The two motors on the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MotorId {
    #[serde(rename = "motor_a", alias = "motor_l")]
    A,
    #[serde(rename = "motor_b", alias = "motor_r")]
    B,
}

impl MotorId {
    pub const ALL: [MotorId; 2] = [MotorId::A, MotorId::B];

    pub fn as_str(self) -> &'static str {
        match self {
            MotorId::A => "motor_a",
            MotorId::B => "motor_b",
        }
    }

    fn index(self) -> usize {
        match self {
            MotorId::A => 0,
            MotorId::B => 1,
        }
    }
}

impl fmt::Display for MotorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown motor: {0}")]
pub struct UnknownMotor(pub String);

impl FromStr for MotorId {
    type Err = UnknownMotor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "motor_a" | "motor_l" => Ok(MotorId::A),
            "motor_b" | "motor_r" => Ok(MotorId::B),
            other => Err(UnknownMotor(other.to_string())),
        }
    }
}

/// Lookup table of the two motor executors
pub struct Dispatcher<H: HBridge + Send + 'static> {
    executors: [MotorExecutor<H>; 2],
}

impl<H: HBridge + Send + 'static> Dispatcher<H> {
    pub fn new(motor_a: MotorExecutor<H>, motor_b: MotorExecutor<H>) -> Self {
        Self {
            executors: [motor_a, motor_b],
        }
    }

    pub fn executor(&self, motor: MotorId) -> &MotorExecutor<H> {
        &self.executors[motor.index()]
    }

    /// Forward a command. Only status queries produce a result.
    pub fn route(&self, cmd: &MotorCommand) -> Option<MotorStatus> {
        let executor = self.executor(cmd.motor);
        match cmd.request {
            Request::Execute(op) => {
                debug!("Routing {:?} to {}", op, cmd.motor);
                executor.enqueue(op);
                None
            }
            Request::GetStatus => Some(executor.get_status()),
        }
    }

    pub fn status(&self, motor: MotorId) -> MotorStatus {
        self.executor(motor).get_status()
    }

    /// Status of every motor, in [`MotorId::ALL`] order
    pub fn statuses(&self) -> [(MotorId, MotorStatus); 2] {
        MotorId::ALL.map(|id| (id, self.status(id)))
    }

    /// Shut down both executors. Workers are signalled together so one long
    /// ramp does not delay the other motor's exit.
    pub fn shutdown(&mut self) {
        info!("Shutting down motor executors");
        for executor in &self.executors {
            executor.signal_shutdown();
        }
        for executor in &mut self.executors {
            executor.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motor::curve::Curve;
    use crate::motor::executor::{Direction, DriveTuning, Operation};
    use crate::motor::hbridge::{BridgeLog, SimulatedBridge};
    use std::thread;
    use std::time::Duration;

    fn dispatcher() -> (Dispatcher<SimulatedBridge>, BridgeLog, BridgeLog) {
        let tuning = DriveTuning {
            kickstart_time: Duration::from_millis(1),
            idle_poll: Duration::from_millis(1),
            ..DriveTuning::default()
        };
        let (hw_a, log_a) = SimulatedBridge::recording("a");
        let (hw_b, log_b) = SimulatedBridge::recording("b");
        let a = MotorExecutor::new("a", hw_a, tuning).unwrap();
        let b = MotorExecutor::new("b", hw_b, tuning).unwrap();
        (Dispatcher::new(a, b), log_a, log_b)
    }

    fn cmd(motor: MotorId, request: Request) -> MotorCommand {
        MotorCommand { motor, request }
    }

    #[test]
    fn test_motor_id_names() {
        assert_eq!("motor_a".parse::<MotorId>().unwrap(), MotorId::A);
        assert_eq!("motor_l".parse::<MotorId>().unwrap(), MotorId::A);
        assert_eq!("motor_r".parse::<MotorId>().unwrap(), MotorId::B);
        assert_eq!(
            "motor_c".parse::<MotorId>(),
            Err(UnknownMotor("motor_c".to_string()))
        );
        assert_eq!(MotorId::B.to_string(), "motor_b");
        assert_eq!(serde_json::to_string(&MotorId::A).unwrap(), "\"motor_a\"");
    }

    #[test]
    fn test_route_to_selected_motor() {
        let (d, log_a, log_b) = dispatcher();

        assert_eq!(
            d.route(&cmd(MotorId::B, Request::Execute(Operation::SetSpeed(-40.0)))),
            None
        );
        thread::sleep(Duration::from_millis(50));

        assert_eq!(d.status(MotorId::B).speed, -40.0);
        assert_eq!(d.status(MotorId::A).speed, 0.0);
        assert!(log_a.events().is_empty());
        assert!(!log_b.events().is_empty());
    }

    #[test]
    fn test_get_status_is_not_queued() {
        let (d, _log_a, _log_b) = dispatcher();
        d.route(&cmd(
            MotorId::A,
            Request::Execute(Operation::RampToSpeed {
                target: 60.0,
                duration: Duration::from_millis(400),
                curve: Curve::Linear,
            }),
        ));
        thread::sleep(Duration::from_millis(150));

        // answered while the ramp still runs
        let status = d.route(&cmd(MotorId::A, Request::GetStatus)).unwrap();
        assert!(status.speed > 0.0 && status.speed < 60.0);
        assert_eq!(status.direction, Direction::Forward);
    }

    #[test]
    fn test_shutdown_releases_both() {
        let (mut d, log_a, log_b) = dispatcher();
        d.route(&cmd(MotorId::A, Request::Execute(Operation::SetSpeed(30.0))));
        d.route(&cmd(MotorId::B, Request::Execute(Operation::Stop)));
        thread::sleep(Duration::from_millis(50));

        d.shutdown();
        assert_eq!(log_a.release_count(), 1);
        assert_eq!(log_b.release_count(), 1);

        drop(d);
        assert_eq!(log_a.release_count(), 1);
        assert_eq!(log_b.release_count(), 1);
    }

    #[test]
    fn test_statuses_order() {
        let (d, _log_a, _log_b) = dispatcher();
        d.route(&cmd(MotorId::A, Request::Execute(Operation::SetSpeed(70.0))));
        thread::sleep(Duration::from_millis(50));

        let [(id_a, a), (id_b, b)] = d.statuses();
        assert_eq!((id_a, id_b), (MotorId::A, MotorId::B));
        assert_eq!(a.speed, 70.0);
        assert_eq!(b.direction, Direction::Stopped);
    }
}
