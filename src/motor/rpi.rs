// Raspberry Pi backend for one H-bridge channel
//
// Direction lines are plain GPIO outputs. The duty line must be one of the
// hardware PWM pins: GPIO 12 & 18 = PWM0, GPIO 13 & 19 = PWM1.

use rppal::gpio::{Gpio, OutputPin};
use rppal::pwm::{Channel, Polarity, Pwm};
use tracing::{debug, info};

use super::hbridge::{HBridge, HardwareError, Result};

/// Pins of one bridge channel (BCM numbering)
#[derive(Debug, Clone, Copy)]
pub struct BridgePins {
    pub in1: u8,
    pub in2: u8,
    pub pwm: u8,
}

fn pwm_channel(pin: u8) -> Result<Channel> {
    match pin {
        12 | 18 => Ok(Channel::Pwm0),
        13 | 19 => Ok(Channel::Pwm1),
        _ => Err(HardwareError::InvalidPwmPin { pin }),
    }
}

fn drive(pin: &mut OutputPin, high: bool) {
    if high {
        pin.set_high();
    } else {
        pin.set_low();
    }
}

pub struct RpiBridge {
    in1: OutputPin,
    in2: OutputPin,
    pwm: Pwm,
    released: bool,
}

impl RpiBridge {
    /// Claim the pins and start PWM at 0% duty
    pub fn open(gpio: &Gpio, pins: BridgePins, frequency_hz: f64) -> Result<Self> {
        let channel = pwm_channel(pins.pwm)?;
        let in1 = gpio.get(pins.in1)?.into_output_low();
        let in2 = gpio.get(pins.in2)?.into_output_low();
        let pwm = Pwm::with_frequency(channel, frequency_hz, 0.0, Polarity::Normal, true)?;

        info!(
            "Opened bridge channel: IN1={} IN2={} PWM=GPIO{} ({:?}, {} Hz)",
            pins.in1, pins.in2, pins.pwm, channel, frequency_hz
        );
        Ok(Self {
            in1,
            in2,
            pwm,
            released: false,
        })
    }
}

impl HBridge for RpiBridge {
    fn set_direction(&mut self, forward: bool, reverse: bool) -> Result<()> {
        if self.released {
            return Err(HardwareError::Released);
        }
        drive(&mut self.in1, forward);
        drive(&mut self.in2, reverse);
        Ok(())
    }

    fn set_duty(&mut self, percent: f32) -> Result<()> {
        if self.released {
            return Err(HardwareError::Released);
        }
        // rppal takes a fraction in 0.0..=1.0
        let fraction = (f64::from(percent) / 100.0).clamp(0.0, 1.0);
        self.pwm.set_duty_cycle(fraction)?;
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        self.in1.set_low();
        self.in2.set_low();
        self.pwm.set_duty_cycle(0.0)?;
        self.pwm.disable()?;
        debug!("Bridge channel released");
        Ok(())
    }
}

impl Drop for RpiBridge {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            tracing::warn!("Failed to release bridge channel on drop: {}", e);
        }
    }
}

/// Driver standby line. High while alive, pulled low when dropped.
pub struct StandbyLine {
    pin: OutputPin,
}

impl StandbyLine {
    pub fn enable(gpio: &Gpio, pin: u8) -> Result<Self> {
        let mut pin = gpio.get(pin)?.into_output_low();
        pin.set_high();
        info!("Driver standby line GPIO{} enabled", pin.pin());
        Ok(Self { pin })
    }
}

impl Drop for StandbyLine {
    fn drop(&mut self) {
        self.pin.set_low();
        info!("Driver standby line GPIO{} disabled", self.pin.pin());
    }
}
