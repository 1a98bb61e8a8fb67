//! Mock implementations for testing without hardware.
//!
//! These doubles let the whole mount core (kinematics, tracking, protocol
//! and both tasks) run on a desktop host.
//!
//! # Available Mocks
//!
//! | Mock | Trait | Purpose |
//! |------|-------|---------|
//! | [`MockClock`] | [`Clock`] | Controllable microsecond time source |
//! | [`MockStepper`] | [`StepperPins`] | Counts steps, records DIR and CFG lines |
//! | [`MockPin`] | [`OutputPin`] | Single output line for [`GpioStepper`] |
//! | [`MockSerial`] | [`SerialTransport`] | Queued input bytes, captured output |
//!
//! # Example
//!
//! ```rust
//! use esp_mount::hal::MockSerial;
//! use esp_mount::traits::SerialTransport;
//!
//! let mut serial = MockSerial::new();
//! serial.queue_line("+gp");
//! assert_eq!(serial.bytes_available(), 4);
//!
//! serial.write_bytes(b"+gp 0 0\n").unwrap();
//! assert_eq!(serial.take_output(), "+gp 0 0\n");
//! ```
//!
//! [`Clock`]: crate::traits::Clock
//! [`StepperPins`]: crate::traits::StepperPins
//! [`SerialTransport`]: crate::traits::SerialTransport
//! [`OutputPin`]: embedded_hal::digital::OutputPin
//! [`GpioStepper`]: crate::hal::GpioStepper

use std::collections::VecDeque;
use std::convert::Infallible;

use embedded_hal::digital::{ErrorType, OutputPin};

use crate::traits::{Clock, SerialTransport, StepDirection, StepperPins};

// ============================================================================
// Time
// ============================================================================

/// Mock clock for testing.
///
/// # Example
///
/// ```rust
/// use esp_mount::hal::MockClock;
/// use esp_mount::traits::Clock;
///
/// let mut clock = MockClock::new();
/// clock.set_us(1_000);
/// clock.advance_us(500);
/// assert_eq!(clock.now_us(), 1_500);
/// ```
#[derive(Debug, Default)]
pub struct MockClock {
    current_us: i64,
}

impl MockClock {
    /// Creates a clock reading zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the current time in microseconds.
    pub fn set_us(&mut self, us: i64) {
        self.current_us = us;
    }

    /// Advances the clock.
    pub fn advance_us(&mut self, us: i64) {
        self.current_us += us;
    }
}

impl Clock for MockClock {
    fn now_us(&self) -> i64 {
        self.current_us
    }
}

// ============================================================================
// Stepper
// ============================================================================

/// Mock stepper driver.
///
/// Use the public fields to inspect what the engine did.
#[derive(Debug, Default)]
pub struct MockStepper {
    /// Step pulses emitted
    pub steps: u64,
    /// Current DIR setting
    pub direction: StepDirection,
    /// Number of DIR changes
    pub direction_changes: u32,
    /// CFG1 line level
    pub cfg1: bool,
    /// CFG2 line level
    pub cfg2: bool,
    /// Number of microstep pattern writes
    pub pattern_changes: u32,
}

impl MockStepper {
    /// Creates a driver with all lines low.
    pub fn new() -> Self {
        Self::default()
    }
}

impl StepperPins for MockStepper {
    type Error = Infallible;

    fn pulse_step(&mut self) -> Result<(), Infallible> {
        self.steps += 1;
        Ok(())
    }

    fn set_direction(&mut self, dir: StepDirection) -> Result<(), Infallible> {
        if dir != self.direction {
            self.direction_changes += 1;
        }
        self.direction = dir;
        Ok(())
    }

    fn set_microstep_pins(&mut self, cfg1: bool, cfg2: bool) -> Result<(), Infallible> {
        self.cfg1 = cfg1;
        self.cfg2 = cfg2;
        self.pattern_changes += 1;
        Ok(())
    }
}

/// Mock digital output line.
///
/// # Example
///
/// ```rust
/// use embedded_hal::digital::OutputPin;
/// use esp_mount::hal::MockPin;
///
/// let mut pin = MockPin::new();
/// pin.set_high().unwrap();
/// pin.set_low().unwrap();
/// pin.set_high().unwrap();
///
/// assert!(pin.high);
/// assert_eq!(pin.rising_edges, 2);
/// ```
#[derive(Debug, Default)]
pub struct MockPin {
    /// Current level
    pub high: bool,
    /// Low-to-high transitions seen
    pub rising_edges: u32,
}

impl MockPin {
    /// Creates a low pin.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ErrorType for MockPin {
    type Error = Infallible;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        if !self.high {
            self.rising_edges += 1;
        }
        self.high = true;
        Ok(())
    }
}

// ============================================================================
// Serial
// ============================================================================

/// Error returned by [`MockSerial`] when writes are set to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockSerialError;

/// Mock serial link.
///
/// Bytes queued with [`queue_bytes`](Self::queue_bytes) are what the
/// firmware "receives"; everything it writes is captured for
/// [`take_output`](Self::take_output). Waiting never sleeps: the queue
/// either already holds enough bytes or never will.
#[derive(Debug, Default)]
pub struct MockSerial {
    rx: VecDeque<u8>,
    tx: Vec<u8>,
    /// Make every write fail
    pub fail_writes: bool,
    /// Number of input flushes
    pub flushes: u32,
}

impl MockSerial {
    /// Creates an empty link.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues raw received bytes.
    pub fn queue_bytes(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes);
    }

    /// Queues a line and its `\n` terminator.
    pub fn queue_line(&mut self, line: &str) {
        self.queue_bytes(line.as_bytes());
        self.rx.push_back(b'\n');
    }

    /// Bytes received but not yet read.
    pub fn rx_len(&self) -> usize {
        self.rx.len()
    }

    /// Returns and clears everything written so far.
    pub fn take_output(&mut self) -> String {
        let out = String::from_utf8_lossy(&self.tx).into_owned();
        self.tx.clear();
        out
    }
}

impl SerialTransport for MockSerial {
    type Error = MockSerialError;

    fn bytes_available(&mut self) -> usize {
        self.rx.len()
    }

    fn read_byte(&mut self) -> Option<u8> {
        self.rx.pop_front()
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), MockSerialError> {
        if self.fail_writes {
            return Err(MockSerialError);
        }
        self.tx.extend_from_slice(bytes);
        Ok(())
    }

    fn flush_input(&mut self) {
        self.rx.clear();
        self.flushes += 1;
    }

    fn wait_for_bytes(&mut self, min: usize, _timeout_ms: u32) -> bool {
        self.rx.len() >= min
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stepper_counts_changes() {
        let mut stepper = MockStepper::new();
        stepper.set_direction(StepDirection::Forward).unwrap();
        stepper.set_direction(StepDirection::Backward).unwrap();
        stepper.pulse_step().unwrap();
        stepper.set_microstep_pins(true, false).unwrap();

        assert_eq!(stepper.direction_changes, 1);
        assert_eq!(stepper.steps, 1);
        assert_eq!((stepper.cfg1, stepper.cfg2), (true, false));
        assert_eq!(stepper.pattern_changes, 1);
    }

    #[test]
    fn serial_read_in_order() {
        let mut serial = MockSerial::new();
        serial.queue_bytes(b"ab");
        assert!(serial.wait_for_bytes(2, 0));
        assert!(!serial.wait_for_bytes(3, 0));
        assert_eq!(serial.read_byte(), Some(b'a'));
        assert_eq!(serial.read_byte(), Some(b'b'));
        assert_eq!(serial.read_byte(), None);
    }

    #[test]
    fn serial_flush_and_fail() {
        let mut serial = MockSerial::new();
        serial.queue_line("junk");
        serial.flush_input();
        assert_eq!(serial.bytes_available(), 0);
        assert_eq!(serial.flushes, 1);

        serial.fail_writes = true;
        assert_eq!(serial.write_bytes(b"x"), Err(MockSerialError));
        assert!(serial.take_output().is_empty());
    }

    #[test]
    fn clock_set_and_advance() {
        let mut clock = MockClock::new();
        clock.set_us(10);
        clock.advance_us(5);
        assert_eq!(clock.now_us(), 15);
        assert_eq!(clock.now_ms(), 0);
    }
}
