//! Stepper driver over four `embedded-hal` output pins.
//!
//! Works with any HAL that implements [`OutputPin`]: the ESP32 build
//! wraps `esp-idf-hal` pin drivers, tests use [`MockPin`](super::MockPin).

use embedded_hal::digital::OutputPin;

use crate::traits::{StepDirection, StepperPins};

/// Step/dir stepper driver with two microstep-select lines.
///
/// All four pins must share one error type.
///
/// # Example
///
/// ```rust
/// use esp_mount::hal::{GpioStepper, MockPin};
/// use esp_mount::traits::{StepDirection, StepperPins};
///
/// let mut stepper = GpioStepper::new(MockPin::new(), MockPin::new(), MockPin::new(), MockPin::new());
/// stepper.set_direction(StepDirection::Forward).unwrap();
/// stepper.pulse_step().unwrap();
///
/// let (step, dir, _, _) = stepper.release();
/// assert_eq!(step.rising_edges, 1);
/// assert!(!step.high);
/// assert!(dir.high);
/// ```
pub struct GpioStepper<S, D, C1, C2> {
    step: S,
    dir: D,
    cfg1: C1,
    cfg2: C2,
}

impl<S, D, C1, C2> GpioStepper<S, D, C1, C2>
where
    S: OutputPin,
    D: OutputPin<Error = S::Error>,
    C1: OutputPin<Error = S::Error>,
    C2: OutputPin<Error = S::Error>,
{
    /// Wraps the step, direction, CFG1 and CFG2 pins.
    pub fn new(step: S, dir: D, cfg1: C1, cfg2: C2) -> Self {
        Self {
            step,
            dir,
            cfg1,
            cfg2,
        }
    }

    /// Returns the pins.
    pub fn release(self) -> (S, D, C1, C2) {
        (self.step, self.dir, self.cfg1, self.cfg2)
    }
}

fn write<P: OutputPin>(pin: &mut P, high: bool) -> Result<(), P::Error> {
    if high {
        pin.set_high()
    } else {
        pin.set_low()
    }
}

impl<S, D, C1, C2> StepperPins for GpioStepper<S, D, C1, C2>
where
    S: OutputPin,
    D: OutputPin<Error = S::Error>,
    C1: OutputPin<Error = S::Error>,
    C2: OutputPin<Error = S::Error>,
{
    type Error = S::Error;

    fn pulse_step(&mut self) -> Result<(), S::Error> {
        self.step.set_high()?;
        self.step.set_low()
    }

    fn set_direction(&mut self, dir: StepDirection) -> Result<(), S::Error> {
        write(&mut self.dir, dir.is_high())
    }

    fn set_microstep_pins(&mut self, cfg1: bool, cfg2: bool) -> Result<(), S::Error> {
        write(&mut self.cfg1, cfg1)?;
        write(&mut self.cfg2, cfg2)
    }
}
