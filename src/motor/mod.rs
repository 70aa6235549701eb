// Motor control module for a two-channel H-bridge driver
//
// Provides:
// - Hardware handle trait with simulated and Raspberry Pi backends
// - Easing curves for speed ramps
// - Per-motor command executor (queue + worker thread)
// - Dispatcher routing commands to the two executors

pub mod curve;
pub mod dispatcher;
pub mod executor;
pub mod hbridge;
#[cfg(feature = "gpio-hardware")]
pub mod rpi;

pub use curve::Curve;
pub use dispatcher::{Dispatcher, MotorId, UnknownMotor};
pub use executor::{Direction, DriveTuning, MotorExecutor, MotorStatus, Operation};
pub use hbridge::{BoxedBridge, BridgeEvent, BridgeLog, HBridge, HardwareError, SimulatedBridge};
