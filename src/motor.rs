//! Motor kinematics engine.
//!
//! One [`Motor`] drives one stepper axis. It owns the axis position, picks
//! a velocity for the current [`MotorMode`] and emits step pulses at the
//! matching interval, switching the driver's microstep resolution as the
//! speed changes.
//!
//! Time is never read internally: every call takes the current monotonic
//! time in microseconds, so the engine is fully deterministic under test.
//!
//! # Example
//!
//! ```rust
//! use esp_mount::config::MotorConfig;
//! use esp_mount::hal::MockStepper;
//! use esp_mount::motor::{Motor, MotorMode};
//!
//! let mut motor = Motor::new(MotorConfig::default(), MockStepper::new()).unwrap();
//! motor.goto(200);
//!
//! // Call run() as often as possible; here every 50µs for 5 seconds.
//! let mut now = 0;
//! while now < 5_000_000 {
//!     motor.run(now).unwrap();
//!     now += 50;
//! }
//!
//! assert_eq!(motor.position(), 200);
//! assert_eq!(motor.mode(), MotorMode::Stopped);
//! ```
//!
//! # Modes
//!
//! | Mode | Velocity rule |
//! |------|---------------|
//! | `Stopped` | Zero, no steps |
//! | `Goto` | Accelerate toward max velocity in the direction of the target |
//! | `Braking` | Decelerate so the target is reached at the floor velocity |
//! | `Tracking` | Follow the active [`TrackSegment`] |

use log::debug;

use crate::config::{MotorConfig, MICROSTEP_LEVELS};
use crate::tracking::TrackSegment;
use crate::traits::{StepDirection, StepperPins};

/// Updates never integrate over more than this many parameter periods.
const MAX_UPDATE_PERIODS: i64 = 10;

/// Shortest tracking correction window in seconds.
const MIN_CORRECTION_WINDOW_S: f32 = 0.05;

/// Motion mode of one axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum MotorMode {
    /// Not moving
    #[default]
    Stopped,
    /// Moving toward a fixed target
    Goto,
    /// Following a time-parameterized segment
    Tracking,
    /// Decelerating toward a goto target
    Braking,
}

/// Complete kinematic state of one axis.
///
/// Owned by the motor task. Other tasks only ever see copies of
/// individual fields taken through the shared mount state.
#[derive(Clone, Debug, PartialEq)]
pub struct MotorState {
    /// Current position in finest microsteps
    pub position: i64,
    /// Goto target (or last segment target while tracking)
    pub target_position: i64,
    /// Signed velocity in finest microsteps per second
    pub velocity: f32,
    /// Active tracking segment
    pub segment: TrackSegment,
    /// Time of the last emitted step
    pub last_step_us: i64,
    /// Time of the last velocity recomputation
    pub last_param_update_us: i64,
    /// Current DIR line setting
    pub direction: StepDirection,
    /// Index into the microstep table
    pub microstep_index: usize,
    /// Current mode
    pub mode: MotorMode,
    /// Tuning
    pub config: MotorConfig,
}

impl MotorState {
    fn new(config: MotorConfig) -> Self {
        Self {
            position: 0,
            target_position: 0,
            velocity: 0.0,
            segment: TrackSegment::default(),
            last_step_us: 0,
            last_param_update_us: 0,
            direction: StepDirection::Forward,
            microstep_index: 0,
            mode: MotorMode::Stopped,
            config,
        }
    }

    /// Position change per step pulse at the current resolution.
    pub fn multiplier(&self) -> i64 {
        self.config.microsteps[self.microstep_index].multiplier as i64
    }
}

/// Kinematics engine for one stepper axis.
///
/// # Type Parameter
///
/// - `P`: The driver's output lines ([`StepperPins`] trait)
pub struct Motor<P: StepperPins> {
    state: MotorState,
    pins: P,
}

impl<P: StepperPins> Motor<P> {
    /// Creates a stopped motor and drives the outputs to a safe state:
    /// DIR forward and the finest microstep setting.
    pub fn new(config: MotorConfig, mut pins: P) -> Result<Self, P::Error> {
        let finest = config.microsteps[0];
        pins.set_direction(StepDirection::Forward)?;
        pins.set_microstep_pins(finest.cfg1, finest.cfg2)?;
        Ok(Self {
            state: MotorState::new(config),
            pins,
        })
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Moves to `target`, keeping the current velocity.
    pub fn goto(&mut self, target: i64) {
        self.state.target_position = target;
        self.state.mode = MotorMode::Goto;
    }

    /// Follows the segment from `start_position` at `start_us` to
    /// `target_position` at `target_us`.
    ///
    /// A segment that does not move forward in time degenerates into a
    /// goto to its target.
    pub fn track(&mut self, start_position: i64, target_position: i64, start_us: i64, target_us: i64) {
        if target_us <= start_us {
            self.goto(target_position);
            return;
        }
        self.state.segment = TrackSegment {
            start_position,
            target_position,
            start_time_us: start_us,
            target_time_us: target_us,
            start_velocity: self.state.velocity,
        };
        self.state.target_position = target_position;
        self.state.mode = MotorMode::Tracking;
    }

    /// Stops the axis.
    ///
    /// `instant` zeroes the velocity at once. Otherwise the axis re-targets
    /// to its current position and decelerates like any goto, which can
    /// bring it back to where the stop was issued.
    pub fn stop(&mut self, instant: bool) {
        if instant {
            self.state.velocity = 0.0;
            self.state.mode = MotorMode::Stopped;
            self.state.target_position = self.state.position;
        } else {
            self.goto(self.state.position);
        }
    }

    /// Redefines the current position without moving.
    pub fn set_position(&mut self, position: i64) {
        self.state.position = position;
        if self.state.mode == MotorMode::Stopped {
            self.state.target_position = position;
        }
    }

    // ========================================================================
    // Stepping
    // ========================================================================

    /// Advances the engine to `now_us`.
    ///
    /// Recomputes the velocity once per parameter period. Otherwise emits
    /// the step if one is due, then refreshes the velocity and microstep
    /// resolution for the new position. Returns `true` if a step pulse was
    /// emitted.
    pub fn run(&mut self, now_us: i64) -> Result<bool, P::Error> {
        let since_update = now_us.saturating_sub(self.state.last_param_update_us);
        if since_update >= self.state.config.param_update_period_us {
            self.update_parameters(now_us)?;
            return Ok(false);
        }

        let Some(interval) = self.step_interval_us() else {
            return Ok(false);
        };
        let since_step = now_us.saturating_sub(self.state.last_step_us) as f32;
        if since_step < interval {
            return Ok(false);
        }

        self.pins.pulse_step()?;
        self.state.position += self.state.direction.sign() * self.state.multiplier();
        self.state.last_step_us = now_us;
        self.update_parameters(now_us)?;
        self.adjust_microsteps()?;
        Ok(true)
    }

    /// Microseconds between step pulses at the current velocity and
    /// resolution, or `None` while not moving.
    pub fn step_interval_us(&self) -> Option<f32> {
        let speed = self.state.velocity.abs();
        if speed == 0.0 {
            return None;
        }
        Some(1_000_000.0 / speed * self.state.multiplier() as f32)
    }

    fn update_parameters(&mut self, now_us: i64) -> Result<(), P::Error> {
        let period = self.state.config.param_update_period_us;
        let dt_us = now_us
            .saturating_sub(self.state.last_param_update_us)
            .clamp(0, period * MAX_UPDATE_PERIODS);
        let dt = dt_us as f32 / 1_000_000.0;
        self.state.last_param_update_us = now_us;

        match self.state.mode {
            MotorMode::Stopped => self.state.velocity = 0.0,
            MotorMode::Goto | MotorMode::Braking => self.adjust_goto(dt),
            MotorMode::Tracking => self.adjust_tracking(now_us, dt),
        }
        self.apply_velocity()
    }

    fn adjust_goto(&mut self, dt: f32) {
        let config = &self.state.config;
        let offset = self.state.target_position - self.state.position;
        let v = self.state.velocity;
        let floor = config.goto_min_velocity;

        if offset == 0 && v.abs() <= floor {
            self.state.mode = MotorMode::Stopped;
            self.state.velocity = 0.0;
            return;
        }

        let needed = match offset.signum() {
            1 => 1.0,
            -1 => -1.0,
            _ => v.signum(),
        };

        if v == 0.0 {
            self.state.mode = MotorMode::Goto;
            self.state.velocity = needed * floor;
            return;
        }

        let distance = offset.unsigned_abs() as f32;
        let braking_distance = v * v / (2.0 * config.brake_acceleration) + config.braking_margin_steps;

        if v.signum() == needed {
            if distance > braking_distance {
                self.state.mode = MotorMode::Goto;
                self.state.velocity = needed * (v.abs() + config.max_acceleration * dt).min(config.max_velocity);
            } else {
                self.state.mode = MotorMode::Braking;
                self.state.velocity = needed * (v.abs() - config.brake_acceleration * dt).max(floor);
            }
        } else {
            // Heading away from the target: brake, then turn around at the floor.
            self.state.mode = MotorMode::Braking;
            let slowed = v.abs() - config.brake_acceleration * dt;
            self.state.velocity = if slowed > floor {
                v.signum() * slowed
            } else {
                needed * floor
            };
        }
    }

    fn adjust_tracking(&mut self, now_us: i64, dt: f32) {
        let segment = self.state.segment;
        if now_us >= segment.target_time_us {
            self.goto(segment.target_position);
            self.adjust_goto(dt);
            return;
        }

        let config = &self.state.config;
        let v = self.state.velocity;
        let error = (self.state.position as f64 - segment.ideal_position(now_us)) as f32;
        let ideal_v = segment.average_velocity() as f32;

        // Distance covered beyond the ideal path while matching its velocity.
        let gap = v - ideal_v;
        let drift = gap * gap.abs() / (2.0 * config.max_acceleration);
        let projected = error + drift;

        let window = (segment.remaining_s(now_us) as f32 / config.tracking_correction_divisor)
            .max(MIN_CORRECTION_WINDOW_S);
        let command = (ideal_v - projected / window).clamp(-config.max_velocity, config.max_velocity);

        let accel = if projected.abs() > config.braking_margin_steps {
            config.max_acceleration
        } else {
            (error.abs() * config.position_gain)
                .max(config.position_gain)
                .min(config.max_acceleration)
        };

        self.state.velocity = approach(v, command, accel * dt);
    }

    fn apply_velocity(&mut self) -> Result<(), P::Error> {
        let max = self.state.config.max_velocity;
        self.state.velocity = self.state.velocity.clamp(-max, max);

        if let Some(dir) = StepDirection::from_velocity(self.state.velocity) {
            if dir != self.state.direction {
                self.pins.set_direction(dir)?;
                self.state.direction = dir;
            }
        } else if self.state.microstep_index != 0 {
            self.select_microsteps(0)?;
        }
        Ok(())
    }

    fn adjust_microsteps(&mut self) -> Result<(), P::Error> {
        let speed = self.state.velocity.abs();
        if speed == 0.0 {
            return Ok(());
        }
        let base = 1_000_000.0 / speed;
        let min = self.state.config.min_step_interval_us;
        let table = &self.state.config.microsteps;
        let index = self.state.microstep_index;

        if index + 1 < MICROSTEP_LEVELS && base * (table[index].multiplier as f32) < min {
            self.select_microsteps(index + 1)
        } else if index > 0 && base * (table[index - 1].multiplier as f32) > min {
            self.select_microsteps(index - 1)
        } else {
            Ok(())
        }
    }

    fn select_microsteps(&mut self, index: usize) -> Result<(), P::Error> {
        let setting = self.state.config.microsteps[index];
        self.pins.set_microstep_pins(setting.cfg1, setting.cfg2)?;
        self.state.microstep_index = index;
        debug!("microstep multiplier -> {}", setting.multiplier);
        Ok(())
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Deviation from the ideal tracking position, in whole steps.
    ///
    /// Only defined while tracking.
    pub fn position_offset(&self, now_us: i64) -> Option<i64> {
        if self.state.mode != MotorMode::Tracking {
            return None;
        }
        Some((self.state.position as f64 - self.state.segment.ideal_position(now_us)).round() as i64)
    }

    /// Current position.
    pub fn position(&self) -> i64 {
        self.state.position
    }

    /// Current goto target.
    pub fn target_position(&self) -> i64 {
        self.state.target_position
    }

    /// Current signed velocity.
    pub fn velocity(&self) -> f32 {
        self.state.velocity
    }

    /// Current mode.
    pub fn mode(&self) -> MotorMode {
        self.state.mode
    }

    /// Full kinematic state.
    pub fn state(&self) -> &MotorState {
        &self.state
    }

    /// Output lines.
    pub fn pins(&self) -> &P {
        &self.pins
    }
}

/// Moves `current` toward `target` by at most `max_delta`.
fn approach(current: f32, target: f32, max_delta: f32) -> f32 {
    if (target - current).abs() <= max_delta {
        target
    } else if target > current {
        current + max_delta
    } else {
        current - max_delta
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::MockStepper;

    fn motor() -> Motor<MockStepper> {
        Motor::new(MotorConfig::default(), MockStepper::new()).unwrap()
    }

    // =========================================================================
    // Construction and Commands
    // =========================================================================

    #[test]
    fn new_motor_is_safe() {
        let m = motor();
        assert_eq!(m.mode(), MotorMode::Stopped);
        assert_eq!(m.velocity(), 0.0);
        assert_eq!(m.state().microstep_index, 0);
        assert_eq!(m.pins().direction, StepDirection::Forward);
        assert_eq!(
            (m.pins().cfg1, m.pins().cfg2),
            (DEFAULT_FINEST.cfg1, DEFAULT_FINEST.cfg2)
        );
    }

    const DEFAULT_FINEST: crate::config::MicrostepSetting = crate::config::DEFAULT_MICROSTEPS[0];

    #[test]
    fn goto_keeps_velocity() {
        let mut m = motor();
        m.state.velocity = 500.0;
        m.goto(-1000);
        assert_eq!(m.mode(), MotorMode::Goto);
        assert_eq!(m.target_position(), -1000);
        assert_eq!(m.velocity(), 500.0);
    }

    #[test]
    fn track_records_start_velocity() {
        let mut m = motor();
        m.state.velocity = 120.0;
        m.track(0, 100, 0, 1_000_000);
        assert_eq!(m.mode(), MotorMode::Tracking);
        assert_eq!(m.state().segment.start_velocity, 120.0);
        assert_eq!(m.target_position(), 100);
    }

    #[test]
    fn zero_length_track_falls_back_to_goto() {
        let mut m = motor();
        m.track(0, 300, 5_000, 5_000);
        assert_eq!(m.mode(), MotorMode::Goto);
        assert_eq!(m.target_position(), 300);
    }

    #[test]
    fn soft_stop_retargets_current_position() {
        let mut m = motor();
        m.state.position = 42;
        m.state.velocity = 800.0;
        m.goto(10_000);
        m.stop(false);
        assert_eq!(m.mode(), MotorMode::Goto);
        assert_eq!(m.target_position(), 42);
        assert_eq!(m.velocity(), 800.0);
    }

    #[test]
    fn set_position_while_stopped_moves_target() {
        let mut m = motor();
        m.set_position(777);
        assert_eq!(m.position(), 777);
        assert_eq!(m.target_position(), 777);

        m.goto(1000);
        m.set_position(0);
        assert_eq!(m.target_position(), 1000);
    }

    // =========================================================================
    // Goto Adjuster
    // =========================================================================

    #[test]
    fn goto_starts_at_floor_velocity() {
        let mut m = motor();
        m.goto(-500);
        m.run(1_000).unwrap();
        assert_eq!(m.velocity(), -100.0);
        assert_eq!(m.pins().direction, StepDirection::Backward);
    }

    #[test]
    fn goto_accelerates_when_far() {
        let mut m = motor();
        m.goto(1_000_000);
        m.state.velocity = 1000.0;
        m.run(1_000).unwrap();
        // 2500 steps/s² over 1ms
        assert!((m.velocity() - 1002.5).abs() < 1e-3);
        assert_eq!(m.mode(), MotorMode::Goto);
    }

    #[test]
    fn goto_brakes_inside_braking_distance() {
        let mut m = motor();
        m.goto(100);
        m.state.velocity = 2000.0;
        m.run(1_000).unwrap();
        assert_eq!(m.mode(), MotorMode::Braking);
        assert!(m.velocity() < 2000.0);
    }

    #[test]
    fn goto_reverses_after_overshoot() {
        let mut m = motor();
        m.state.position = 100;
        m.goto(0);
        m.state.velocity = 110.0;
        m.run(10_000).unwrap();
        assert_eq!(m.mode(), MotorMode::Braking);
        assert_eq!(m.velocity(), -100.0);
    }

    #[test]
    fn goto_at_target_stops() {
        let mut m = motor();
        m.goto(0);
        m.state.velocity = 100.0;
        m.run(1_000).unwrap();
        assert_eq!(m.mode(), MotorMode::Stopped);
        assert_eq!(m.velocity(), 0.0);
    }

    #[test]
    fn large_time_gap_is_clamped() {
        let mut m = motor();
        m.goto(10_000_000);
        m.state.velocity = 1000.0;
        m.run(60_000_000).unwrap();
        // At most ten periods (10ms) of acceleration are applied.
        assert!(m.velocity() <= 1000.0 + 2500.0 * 0.010 + 1e-3);
    }

    // =========================================================================
    // Stepping
    // =========================================================================

    #[test]
    fn step_interval_guarded_at_zero_velocity() {
        let m = motor();
        assert_eq!(m.step_interval_us(), None);
    }

    #[test]
    fn step_advances_position_by_multiplier() {
        let mut m = motor();
        m.goto(1_000_000);
        m.run(1_000).unwrap();
        assert_eq!(m.velocity(), 100.0);
        m.run(10_000).unwrap();
        assert!(m.run(10_001).unwrap());
        assert_eq!(m.position(), 1);
        assert_eq!(m.pins().steps, 1);
    }

    #[test]
    fn parameter_update_and_step_never_share_a_call() {
        let mut m = motor();
        m.goto(1_000_000);
        assert!(!m.run(1_000).unwrap());
        assert_eq!(m.position(), 0);
    }

    #[test]
    fn microsteps_coarsen_at_high_speed() {
        let mut m = motor();
        m.goto(100_000_000);
        m.state.velocity = 5000.0;
        let changes = m.pins().pattern_changes;
        assert!(m.run(500).unwrap());
        // 200µs interval at multiplier 1 is below the 700µs minimum.
        assert_eq!(m.state().microstep_index, 1);
        assert_eq!(m.pins().pattern_changes, changes + 1);
    }

    #[test]
    fn microsteps_reset_when_velocity_reaches_zero() {
        let mut m = motor();
        m.state.microstep_index = 3;
        m.run(1_000).unwrap();
        assert_eq!(m.state().microstep_index, 0);
    }

    // =========================================================================
    // Tracking
    // =========================================================================

    #[test]
    fn position_offset_only_while_tracking() {
        let mut m = motor();
        assert_eq!(m.position_offset(0), None);
        m.track(0, 1000, 0, 1_000_000);
        m.state.position = 600;
        // Half-way along the segment the ideal position is 500.
        assert_eq!(m.position_offset(500_000), Some(100));
    }

    #[test]
    fn on_path_tracking_holds_segment_rate() {
        let mut m = motor();
        m.state.velocity = 27.0;
        m.track(0, 27, 0, 1_000_000);
        m.run(1_000).unwrap();
        // On the line and at its rate: no correction needed.
        assert!((m.velocity() - 27.0).abs() < 0.1, "velocity {}", m.velocity());
    }

    #[test]
    fn tracking_past_segment_end_becomes_goto() {
        let mut m = motor();
        m.track(0, 50, 0, 1_000);
        m.run(2_000).unwrap();
        assert_ne!(m.mode(), MotorMode::Tracking);
        assert_eq!(m.target_position(), 50);
    }

    #[test]
    fn approach_limits_delta() {
        assert_eq!(approach(0.0, 10.0, 3.0), 3.0);
        assert_eq!(approach(0.0, -10.0, 3.0), -3.0);
        assert_eq!(approach(9.0, 10.0, 3.0), 10.0);
    }
}
