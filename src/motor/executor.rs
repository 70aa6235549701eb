// Per-motor command executor
//
// Each motor owns a FIFO of operations drained by one dedicated worker
// thread. The worker is the only writer of the hardware lines and of the
// current speed, so at most one operation is ever in flight per motor.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::curve::Curve;
use super::hbridge::{self, HBridge};
use crate::config::{
    IDLE_POLL, KICKSTART_DUTY, KICKSTART_TIME, MAX_DUTY, MIN_DUTY, RAMP_STEPS_PER_SEC,
};

/// Speed limit in percent, both directions
pub const SPEED_LIMIT: f32 = 100.0;

/// A unit of work for one motor's queue
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operation {
    SetSpeed(f32),
    RampToSpeed {
        target: f32,
        duration: Duration,
        curve: Curve,
    },
    Stop,
}

impl Operation {
    /// Whether the parameters are inside the executor's contract
    pub fn is_valid(&self) -> bool {
        let in_range = |s: f32| s.is_finite() && s.abs() <= SPEED_LIMIT;
        match *self {
            Operation::SetSpeed(speed) => in_range(speed),
            Operation::RampToSpeed {
                target, duration, ..
            } => in_range(target) && !duration.is_zero(),
            Operation::Stop => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Forward,
    Backward,
    Stopped,
}

impl Direction {
    pub fn from_speed(speed: f32) -> Self {
        if speed > 0.0 {
            Direction::Forward
        } else if speed < 0.0 {
            Direction::Backward
        } else {
            Direction::Stopped
        }
    }
}

/// Snapshot returned by status queries
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotorStatus {
    pub speed: f32,
    pub direction: Direction,
}

impl MotorStatus {
    pub fn from_speed(speed: f32) -> Self {
        Self {
            speed,
            direction: Direction::from_speed(speed),
        }
    }
}

/// Duty and timing parameters for one motor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriveTuning {
    pub min_duty: f32,
    pub max_duty: f32,
    pub kickstart_duty: f32,
    pub kickstart_time: Duration,
    pub ramp_steps_per_sec: f32,
    pub idle_poll: Duration,
}

impl Default for DriveTuning {
    fn default() -> Self {
        Self {
            min_duty: MIN_DUTY,
            max_duty: MAX_DUTY,
            kickstart_duty: KICKSTART_DUTY,
            kickstart_time: KICKSTART_TIME,
            ramp_steps_per_sec: RAMP_STEPS_PER_SEC,
            idle_poll: IDLE_POLL,
        }
    }
}

impl DriveTuning {
    /// Sustained duty for a signed speed. Zero speed always means zero duty.
    pub fn duty_for(&self, speed: f32) -> f32 {
        if speed == 0.0 {
            return 0.0;
        }
        speed.abs().min(self.max_duty).max(self.min_duty)
    }

    /// Number of sub-steps a ramp of `duration` is split into
    pub fn ramp_steps(&self, duration: Duration) -> u32 {
        (duration.as_secs_f32() * self.ramp_steps_per_sec).round() as u32
    }
}

/// Current speed stored as f32 bits so readers never lock
#[derive(Debug, Default)]
struct SpeedCell(AtomicU32);

impl SpeedCell {
    fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Acquire))
    }

    fn store(&self, speed: f32) {
        self.0.store(speed.to_bits(), Ordering::Release);
    }
}

#[derive(Debug)]
struct Shared {
    running: AtomicBool,
    speed: SpeedCell,
}

/// Owns one motor: its queue, its worker thread and (through the worker)
/// its hardware handle.
pub struct MotorExecutor<H: HBridge + Send + 'static> {
    name: &'static str,
    queue: Sender<Operation>,
    shared: Arc<Shared>,
    worker: Option<JoinHandle<H>>,
}

impl<H: HBridge + Send + 'static> MotorExecutor<H> {
    /// Bind a hardware handle and start the worker thread
    pub fn new(name: &'static str, hw: H, tuning: DriveTuning) -> std::io::Result<Self> {
        let (queue, rx) = crossbeam_channel::unbounded();
        let shared = Arc::new(Shared {
            running: AtomicBool::new(true),
            speed: SpeedCell::default(),
        });

        let worker = Worker {
            name,
            hw,
            shared: shared.clone(),
            tuning,
        };
        let handle = thread::Builder::new()
            .name(format!("motor-{}", name))
            .spawn(move || worker.run(rx))?;

        info!("[{}] executor started", name);
        Ok(Self {
            name,
            queue,
            shared,
            worker: Some(handle),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Append an operation to the tail of the queue. Never blocks.
    pub fn enqueue(&self, op: Operation) {
        debug_assert!(op.is_valid(), "invalid operation {:?}", op);
        debug!("[{}] enqueue {:?}", self.name, op);
        if self.queue.send(op).is_err() {
            warn!("[{}] executor is shut down, dropping {:?}", self.name, op);
        }
    }

    pub fn set_speed(&self, speed: f32) {
        self.enqueue(Operation::SetSpeed(speed));
    }

    pub fn ramp_to_speed(&self, target: f32, duration: Duration, curve: Curve) {
        self.enqueue(Operation::RampToSpeed {
            target,
            duration,
            curve,
        });
    }

    pub fn stop(&self) {
        self.enqueue(Operation::Stop);
    }

    /// Latest committed speed; may be mid-ramp
    pub fn get_status(&self) -> MotorStatus {
        MotorStatus::from_speed(self.shared.speed.load())
    }

    /// Ask the worker to exit after its current operation, without waiting
    pub(crate) fn signal_shutdown(&self) {
        self.shared.running.store(false, Ordering::Release);
    }

    /// Stop the worker and release the hardware handle.
    ///
    /// The worker finishes the operation it is executing, then exits; operations
    /// still queued are discarded. Calling this more than once is a no-op.
    pub fn shutdown(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };

        info!("[{}] shutting down", self.name);
        self.signal_shutdown();

        match worker.join() {
            Ok(mut hw) => {
                if let Err(e) = hw.release() {
                    warn!("[{}] failed to release hardware: {}", self.name, e);
                }
            }
            Err(_) => error!("[{}] worker thread panicked", self.name),
        }
        info!("[{}] executor stopped", self.name);
    }
}

impl<H: HBridge + Send + 'static> Drop for MotorExecutor<H> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// The worker side: sole caller of hardware writes for its motor
struct Worker<H> {
    name: &'static str,
    hw: H,
    shared: Arc<Shared>,
    tuning: DriveTuning,
}

impl<H: HBridge> Worker<H> {
    /// Drain the queue until shutdown, then hand the hardware back
    fn run(mut self, queue: Receiver<Operation>) -> H {
        while self.shared.running.load(Ordering::Acquire) {
            match queue.recv_timeout(self.tuning.idle_poll) {
                Ok(op) => self.execute(op),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        let discarded = queue.len();
        if discarded > 0 {
            info!("[{}] discarding {} queued operations", self.name, discarded);
        }
        self.hw
    }

    fn execute(&mut self, op: Operation) {
        debug!("[{}] executing {:?}", self.name, op);
        match op {
            Operation::SetSpeed(speed) => self.apply_speed(speed),
            Operation::RampToSpeed {
                target,
                duration,
                curve,
            } => self.ramp(target, duration, curve),
            Operation::Stop => self.apply_speed(0.0),
        }
    }

    fn speed(&self) -> f32 {
        self.shared.speed.load()
    }

    /// Log a failed hardware write and carry on
    fn check(&self, what: &str, result: hbridge::Result<()>) {
        if let Err(e) = result {
            warn!("[{}] {} write failed: {}", self.name, what, e);
        }
    }

    fn apply_speed(&mut self, target: f32) {
        // Normalizes -0.0 as well
        let target = if target == 0.0 {
            0.0
        } else {
            target.clamp(-SPEED_LIMIT, SPEED_LIMIT)
        };

        let (forward, reverse) = match Direction::from_speed(target) {
            Direction::Forward => (true, false),
            Direction::Backward => (false, true),
            Direction::Stopped => (false, false),
        };
        let result = self.hw.set_direction(forward, reverse);
        self.check("direction", result);

        // Starting from rest needs a short pulse to overcome static friction
        if self.speed() == 0.0 && target != 0.0 {
            debug!(
                "[{}] kickstart {}% for {:?}",
                self.name, self.tuning.kickstart_duty, self.tuning.kickstart_time
            );
            let result = self.hw.set_duty(self.tuning.kickstart_duty);
            self.check("kickstart duty", result);
            spin_sleep::sleep(self.tuning.kickstart_time);
        }

        let duty = self.tuning.duty_for(target);
        let result = self.hw.set_duty(duty);
        self.check("duty", result);

        self.shared.speed.store(target);
    }

    fn ramp(&mut self, target: f32, duration: Duration, curve: Curve) {
        let start = self.speed();
        let steps = self.tuning.ramp_steps(duration);
        if steps < 1 {
            self.apply_speed(target);
            return;
        }

        let step_time = duration / steps;
        info!(
            "[{}] ramp {} -> {} over {:?} ({:?}, {} steps)",
            self.name, start, target, duration, curve, steps
        );

        for i in 1..=steps {
            // Last step lands exactly on target, free of rounding error
            let speed = if i == steps {
                target
            } else {
                let progress = curve.apply(i as f32 / steps as f32);
                start + (target - start) * progress
            };
            self.apply_speed(speed);
            spin_sleep::sleep(step_time);
        }
    }
}
