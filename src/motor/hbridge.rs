// Hardware handle for one H-bridge channel
//
// An H-bridge channel is two direction lines (IN1/IN2) plus one duty-capable
// line. The executor only talks to this trait; backends live in sibling modules.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

/// Error types for hardware writes
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    #[cfg(feature = "gpio-hardware")]
    #[error("GPIO error: {0}")]
    Gpio(#[from] rppal::gpio::Error),

    #[cfg(feature = "gpio-hardware")]
    #[error("PWM error: {0}")]
    Pwm(#[from] rppal::pwm::Error),

    #[error("PWM pin {pin} has no hardware channel (use 12, 13, 18 or 19)")]
    InvalidPwmPin { pin: u8 },

    #[error("Channel already released")]
    Released,

    #[error("Hardware write failed: {0}")]
    Write(String),
}

pub type Result<T> = std::result::Result<T, HardwareError>;

/// Interface the motor executor needs from one bridge channel
pub trait HBridge {
    /// Drive the two direction lines. Callers never assert both.
    fn set_direction(&mut self, forward: bool, reverse: bool) -> Result<()>;

    /// Set the duty cycle as a percentage in `0.0..=100.0`.
    fn set_duty(&mut self, percent: f32) -> Result<()>;

    /// Stop output and de-energize the lines. Must be idempotent.
    fn release(&mut self) -> Result<()>;
}

/// Backend chosen at startup (simulated or real)
pub type BoxedBridge = Box<dyn HBridge + Send>;

impl<T: HBridge + ?Sized> HBridge for Box<T> {
    fn set_direction(&mut self, forward: bool, reverse: bool) -> Result<()> {
        (**self).set_direction(forward, reverse)
    }

    fn set_duty(&mut self, percent: f32) -> Result<()> {
        (**self).set_duty(percent)
    }

    fn release(&mut self) -> Result<()> {
        (**self).release()
    }
}

/// A single write observed by a [`SimulatedBridge`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BridgeEvent {
    Direction { forward: bool, reverse: bool },
    Duty(f32),
    Release,
}

/// Shared view of the writes a recording bridge has seen
#[derive(Debug, Clone, Default)]
pub struct BridgeLog {
    events: Arc<Mutex<Vec<BridgeEvent>>>,
}

impl BridgeLog {
    fn push(&self, event: BridgeEvent) {
        self.events.lock().push(event);
    }

    /// Snapshot of all recorded events, oldest first
    pub fn events(&self) -> Vec<BridgeEvent> {
        self.events.lock().clone()
    }

    /// Duty writes only, in order
    pub fn duties(&self) -> Vec<f32> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                BridgeEvent::Duty(d) => Some(*d),
                _ => None,
            })
            .collect()
    }

    pub fn release_count(&self) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| matches!(e, BridgeEvent::Release))
            .count()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

/// Bridge without hardware behind it. Used for `--simulate` and in tests.
pub struct SimulatedBridge {
    name: &'static str,
    log: Option<BridgeLog>,
    released: bool,
}

impl SimulatedBridge {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            log: None,
            released: false,
        }
    }

    /// Create a bridge that records every write into the returned log
    pub fn recording(name: &'static str) -> (Self, BridgeLog) {
        let log = BridgeLog::default();
        let bridge = Self {
            name,
            log: Some(log.clone()),
            released: false,
        };
        (bridge, log)
    }

    fn record(&self, event: BridgeEvent) {
        if let Some(log) = &self.log {
            log.push(event);
        }
    }
}

impl HBridge for SimulatedBridge {
    fn set_direction(&mut self, forward: bool, reverse: bool) -> Result<()> {
        if self.released {
            return Err(HardwareError::Released);
        }
        debug!("[{}] direction: fwd={} rev={}", self.name, forward, reverse);
        self.record(BridgeEvent::Direction { forward, reverse });
        Ok(())
    }

    fn set_duty(&mut self, percent: f32) -> Result<()> {
        if self.released {
            return Err(HardwareError::Released);
        }
        debug!("[{}] duty: {:.1}%", self.name, percent);
        self.record(BridgeEvent::Duty(percent));
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        debug!("[{}] released", self.name);
        self.released = true;
        self.record(BridgeEvent::Release);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_bridge_logs_writes() {
        let (mut bridge, log) = SimulatedBridge::recording("test");
        bridge.set_direction(true, false).unwrap();
        bridge.set_duty(42.0).unwrap();

        assert_eq!(
            log.events(),
            vec![
                BridgeEvent::Direction {
                    forward: true,
                    reverse: false
                },
                BridgeEvent::Duty(42.0),
            ]
        );
        assert_eq!(log.duties(), vec![42.0]);
    }

    #[test]
    fn test_release_is_idempotent() {
        let (mut bridge, log) = SimulatedBridge::recording("test");
        bridge.release().unwrap();
        bridge.release().unwrap();
        assert_eq!(log.release_count(), 1);
    }

    #[test]
    fn test_writes_after_release_fail() {
        let mut bridge = SimulatedBridge::new("test");
        bridge.release().unwrap();
        assert!(matches!(bridge.set_duty(10.0), Err(HardwareError::Released)));
        assert!(matches!(
            bridge.set_direction(false, false),
            Err(HardwareError::Released)
        ));
    }
}
