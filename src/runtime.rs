// Zenoh front-end for the motor executors
//
// Commands arrive as JSON on TOPIC_CMD_MOTOR and are drained every loop tick.
// Status replies, rejections and periodic telemetry are published back.
// Motor work itself never runs on the async runtime: each motor has its own
// worker thread, so a multi-second ramp never stalls this loop.

use std::time::Duration;

use tokio::time::interval;
use tracing::{info, warn};

use crate::config::{
    LOOP_HZ, TOPIC_CMD_MOTOR, TOPIC_ERROR, TOPIC_MOTORS, TOPIC_STATUS,
};
use crate::messages::{parse_command, ErrorReply, MotorsTelemetry, StatusReply};
use crate::motor::{BoxedBridge, Dispatcher, DriveTuning, MotorExecutor, MotorId, SimulatedBridge};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Settings resolved from the command line
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub simulate: bool,
    pub tuning: DriveTuning,
    pub status_hz: u64,
}

/// Outcome of one command that has to be published
#[derive(Debug, Clone)]
pub enum Reply {
    Status(StatusReply),
    Error(ErrorReply),
}

pub struct Runtime {
    dispatcher: Dispatcher<BoxedBridge>,
    // Declared after the dispatcher so the channels are released first
    #[cfg(feature = "gpio-hardware")]
    standby: Option<crate::motor::rpi::StandbyLine>,
}

impl Runtime {
    /// Runtime over an already built dispatcher (no standby line)
    pub fn with_dispatcher(dispatcher: Dispatcher<BoxedBridge>) -> Self {
        Self {
            dispatcher,
            #[cfg(feature = "gpio-hardware")]
            standby: None,
        }
    }

    /// Bind both motors to simulated bridges
    pub fn simulated(tuning: DriveTuning) -> std::io::Result<Self> {
        info!("Motor hardware disabled, using simulated bridges");
        let motor_a: BoxedBridge = Box::new(SimulatedBridge::new("motor_a"));
        let motor_b: BoxedBridge = Box::new(SimulatedBridge::new("motor_b"));
        let dispatcher = Dispatcher::new(
            MotorExecutor::new("a", motor_a, tuning)?,
            MotorExecutor::new("b", motor_b, tuning)?,
        );
        Ok(Self::with_dispatcher(dispatcher))
    }

    /// Enable the driver and bind both motors to the Raspberry Pi pins
    #[cfg(feature = "gpio-hardware")]
    pub fn hardware(tuning: DriveTuning) -> Result<Self, BoxError> {
        use crate::config::{AIN1, AIN2, BIN1, BIN2, PWM_FREQUENCY_HZ, PWMA, PWMB, STBY};
        use crate::motor::rpi::{BridgePins, RpiBridge, StandbyLine};

        let gpio = rppal::gpio::Gpio::new()?;
        let standby = StandbyLine::enable(&gpio, STBY)?;

        let pins_a = BridgePins {
            in1: AIN1,
            in2: AIN2,
            pwm: PWMA,
        };
        let pins_b = BridgePins {
            in1: BIN1,
            in2: BIN2,
            pwm: PWMB,
        };
        let motor_a: BoxedBridge = Box::new(RpiBridge::open(&gpio, pins_a, PWM_FREQUENCY_HZ)?);
        let motor_b: BoxedBridge = Box::new(RpiBridge::open(&gpio, pins_b, PWM_FREQUENCY_HZ)?);

        let dispatcher = Dispatcher::new(
            MotorExecutor::new("a", motor_a, tuning)?,
            MotorExecutor::new("b", motor_b, tuning)?,
        );
        Ok(Self {
            dispatcher,
            standby: Some(standby),
        })
    }

    pub fn open(config: &RuntimeConfig) -> Result<Self, BoxError> {
        if config.simulate {
            return Ok(Self::simulated(config.tuning)?);
        }

        #[cfg(feature = "gpio-hardware")]
        {
            Self::hardware(config.tuning)
        }
        #[cfg(not(feature = "gpio-hardware"))]
        {
            Err("built without the `gpio-hardware` feature, run with --simulate".into())
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher<BoxedBridge> {
        &self.dispatcher
    }

    /// Parse, validate and route one command payload
    pub fn on_command(&self, payload: &[u8]) -> Option<Reply> {
        match parse_command(payload) {
            Ok(cmd) => {
                info!("Received command: {:?}", cmd);
                self.dispatcher
                    .route(&cmd)
                    .map(|status| {
                        Reply::Status(StatusReply {
                            motor: cmd.motor,
                            status,
                        })
                    })
            }
            Err(e) => {
                warn!("Rejected command: {}", e);
                Some(Reply::Error(ErrorReply::from(&e)))
            }
        }
    }

    pub fn telemetry(&self) -> MotorsTelemetry {
        MotorsTelemetry {
            motor_a: self.dispatcher.status(MotorId::A),
            motor_b: self.dispatcher.status(MotorId::B),
        }
    }

    /// Stop both workers, release the channels, then drop the standby line
    pub fn shutdown(&mut self) {
        self.dispatcher.shutdown();
        #[cfg(feature = "gpio-hardware")]
        drop(self.standby.take());
    }
}

pub async fn run(config: RuntimeConfig) -> Result<(), BoxError> {
    let mut runtime = Runtime::open(&config)?;

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    info!("Setting up publishers and subscribers...");
    let subscriber = session.declare_subscriber(TOPIC_CMD_MOTOR).await?;
    let pub_status = session.declare_publisher(TOPIC_STATUS).await?;
    let pub_error = session.declare_publisher(TOPIC_ERROR).await?;
    let pub_motors = session.declare_publisher(TOPIC_MOTORS).await?;

    let mut tick = interval(Duration::from_millis(1000 / LOOP_HZ));
    let mut telemetry = interval(Duration::from_millis(1000 / config.status_hz.max(1)));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    info!(
        "Runtime started: {}Hz loop, {}Hz telemetry",
        LOOP_HZ, config.status_hz
    );
    info!("Subscribed to: {}", TOPIC_CMD_MOTOR);
    info!(
        "Publishing to: {}, {}, {}",
        TOPIC_STATUS, TOPIC_ERROR, TOPIC_MOTORS
    );

    let result: Result<(), BoxError> = loop {
        tokio::select! {
            _ = tick.tick() => {
                // Drain all pending commands (non-blocking)
                while let Ok(Some(sample)) = subscriber.try_recv() {
                    let payload = sample.payload().to_bytes();
                    let (publisher, json) = match runtime.on_command(&payload) {
                        None => continue,
                        Some(Reply::Status(reply)) => (&pub_status, serde_json::to_string(&reply)?),
                        Some(Reply::Error(reply)) => (&pub_error, serde_json::to_string(&reply)?),
                    };
                    if let Err(e) = publisher.put(json).await {
                        warn!("Failed to publish reply: {}", e);
                    }
                }
            }
            _ = telemetry.tick() => {
                let json = serde_json::to_string(&runtime.telemetry())?;
                if let Err(e) = pub_motors.put(json).await {
                    break Err(e);
                }
            }
            signal = &mut ctrl_c => {
                if let Err(e) = signal {
                    break Err(e.into());
                }
                info!("Ctrl-C received, stopping motors...");
                break Ok(());
            }
        }
    };

    // Workers may be finishing a ramp, wait for them off the async threads
    tokio::task::spawn_blocking(move || runtime.shutdown()).await?;
    info!("Runtime stopped");
    result
}
