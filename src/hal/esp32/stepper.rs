//! Stepper driver outputs on ESP32 GPIO.
//!
//! A TMC22xx-style driver in standalone mode needs four lines per axis:
//! STEP, DIR and the two microstep-select inputs CFG1/CFG2.

use esp_idf_hal::gpio::{AnyOutputPin, Output, PinDriver};
use esp_idf_hal::sys::EspError;

use crate::hal::GpioStepper;

/// One GPIO output line.
pub type Esp32OutputPin<'d> = PinDriver<'d, AnyOutputPin, Output>;

/// Stepper driver on four ESP32 output pins.
pub type Esp32Stepper<'d> =
    GpioStepper<Esp32OutputPin<'d>, Esp32OutputPin<'d>, Esp32OutputPin<'d>, Esp32OutputPin<'d>>;

/// Configures four pins as outputs and wraps them as a stepper driver.
///
/// # Example
///
/// ```ignore
/// let peripherals = Peripherals::take()?;
/// let ax1 = esp32_stepper(
///     peripherals.pins.gpio25.into(),
///     peripherals.pins.gpio26.into(),
///     peripherals.pins.gpio18.into(),
///     peripherals.pins.gpio27.into(),
/// )?;
/// ```
///
/// # Errors
///
/// Returns an error if any pin cannot be configured as an output.
pub fn esp32_stepper(
    step: AnyOutputPin,
    dir: AnyOutputPin,
    cfg1: AnyOutputPin,
    cfg2: AnyOutputPin,
) -> Result<Esp32Stepper<'static>, EspError> {
    Ok(GpioStepper::new(
        PinDriver::output(step)?,
        PinDriver::output(dir)?,
        PinDriver::output(cfg1)?,
        PinDriver::output(cfg2)?,
    ))
}
