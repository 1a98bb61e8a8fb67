//! Hardware abstraction traits for stepper outputs and timekeeping.
//!
//! The kinematics engine never touches a GPIO register or a timer directly.
//! It drives a [`StepperPins`] implementation and receives time as a plain
//! microsecond value read from a [`Clock`].
//!
//! # Key Traits
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`StepperPins`] | Step pulse, direction and two microstep-select lines |
//! | [`Clock`] | Monotonic microsecond time source |
//!
//! # Implementation
//!
//! For testing and desktop development, use the mock implementations
//! from [`crate::hal::mock`]. Any four `embedded-hal` output pins can be
//! combined with [`crate::hal::GpioStepper`]; the ESP32 build does exactly
//! that (requires the `esp32` feature).
//!
//! # Example
//!
//! ```rust
//! use esp_mount::traits::{StepDirection, StepperPins};
//! use esp_mount::hal::MockStepper;
//!
//! let mut pins = MockStepper::new();
//! pins.set_direction(StepDirection::Backward).unwrap();
//! pins.pulse_step().unwrap();
//!
//! assert_eq!(pins.direction, StepDirection::Backward);
//! assert_eq!(pins.steps, 1);
//! ```

/// Rotation direction of a stepper axis.
///
/// `Forward` increases the step counter, `Backward` decreases it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum StepDirection {
    /// Positive step direction (DIR line high).
    #[default]
    Forward,
    /// Negative step direction (DIR line low).
    Backward,
}

impl StepDirection {
    /// Returns `+1` for forward and `-1` for backward.
    #[inline]
    pub const fn sign(self) -> i64 {
        match self {
            StepDirection::Forward => 1,
            StepDirection::Backward => -1,
        }
    }

    /// Direction implied by a signed velocity.
    ///
    /// Zero velocity has no direction and returns `None`.
    pub fn from_velocity(velocity: f32) -> Option<Self> {
        if velocity > 0.0 {
            Some(StepDirection::Forward)
        } else if velocity < 0.0 {
            Some(StepDirection::Backward)
        } else {
            None
        }
    }

    /// Logic level of the DIR line for this direction.
    #[inline]
    pub const fn is_high(self) -> bool {
        matches!(self, StepDirection::Forward)
    }
}

/// Output lines of one stepper driver (step, direction, CFG1, CFG2).
///
/// # Implementation Notes
///
/// - `pulse_step()` must produce one complete rising and falling edge
/// - Microstep lines are only changed between steps, never during a pulse
/// - Errors are hardware write failures; the engine propagates them
pub trait StepperPins {
    /// Error type for output writes.
    type Error: core::fmt::Debug;

    /// Emits one step pulse.
    fn pulse_step(&mut self) -> Result<(), Self::Error>;

    /// Sets the DIR line.
    fn set_direction(&mut self, dir: StepDirection) -> Result<(), Self::Error>;

    /// Sets the two microstep-select lines (CFG1, CFG2).
    fn set_microstep_pins(&mut self, cfg1: bool, cfg2: bool) -> Result<(), Self::Error>;
}

/// Monotonic time source with microsecond resolution.
///
/// Must never go backwards and must not follow wall-clock adjustments;
/// wall-clock time is derived from it with an offset kept in
/// [`MountState`](crate::services::MountState).
///
/// # Example
///
/// ```rust
/// use esp_mount::traits::Clock;
/// use esp_mount::hal::MockClock;
///
/// let mut clock = MockClock::new();
/// assert_eq!(clock.now_us(), 0);
///
/// clock.advance_us(1_500);
/// assert_eq!(clock.now_us(), 1_500);
/// ```
pub trait Clock {
    /// Returns microseconds since an arbitrary epoch (usually boot).
    fn now_us(&self) -> i64;

    /// Returns the same instant in whole milliseconds.
    fn now_ms(&self) -> i64 {
        self.now_us() / 1000
    }
}
