//! Mount configuration: motor tuning, axis geometry, task timing and the
//! serial link.
//!
//! Every struct carries the reference tuning in its `Default` impl and
//! `with_*` builder setters for overrides.
//!
//! # Example
//!
//! ```rust
//! use esp_mount::config::{MountConfig, MotorConfig, TaskConfig};
//!
//! // Use defaults
//! let config = MountConfig::default();
//! assert_eq!(config.axis1.cpr, esp_mount::config::CPR_AX1);
//!
//! // Or customize
//! let config = MountConfig::default()
//!     .with_motors(MotorConfig::default().with_max_velocity(8_000.0))
//!     .with_tasks(TaskConfig::default().with_lock_timeout_ms(50));
//! assert_eq!(config.axis2.motor.max_velocity, 8_000.0);
//! ```

use crate::axis::AxisPair;

/// Microsteps per full revolution of the first axis.
pub const CPR_AX1: i64 = 2_304_000;

/// Microsteps per full revolution of the second axis.
pub const CPR_AX2: i64 = 2_304_000;

/// Wire protocol version reported by `+gpv`.
pub const PROTOCOL_VERSION: u32 = 1;

/// Number of track points the track buffer can hold.
pub const TRACK_BUFFER_CAPACITY: usize = 6000;

/// Number of selectable microstep multipliers.
pub const MICROSTEP_LEVELS: usize = 4;

// ============================================================================
// Main Config
// ============================================================================

/// Complete mount configuration
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MountConfig {
    /// First axis (right ascension)
    pub axis1: AxisConfig,
    /// Second axis (declination)
    pub axis2: AxisConfig,
    /// Motor and protocol task timing
    pub tasks: TaskConfig,
    /// Serial link configuration
    pub comm: CommConfig,
}

impl Default for MountConfig {
    fn default() -> Self {
        Self {
            axis1: AxisConfig::new(CPR_AX1),
            axis2: AxisConfig::new(CPR_AX2),
            tasks: TaskConfig::default(),
            comm: CommConfig::default(),
        }
    }
}

impl MountConfig {
    /// Set the first axis configuration
    pub fn with_axis1(mut self, axis: AxisConfig) -> Self {
        self.axis1 = axis;
        self
    }

    /// Set the second axis configuration
    pub fn with_axis2(mut self, axis: AxisConfig) -> Self {
        self.axis2 = axis;
        self
    }

    /// Use the same motor tuning on both axes
    pub fn with_motors(mut self, motor: MotorConfig) -> Self {
        self.axis1.motor = motor.clone();
        self.axis2.motor = motor;
        self
    }

    /// Set task timing
    pub fn with_tasks(mut self, tasks: TaskConfig) -> Self {
        self.tasks = tasks;
        self
    }

    /// Set the serial link configuration
    pub fn with_comm(mut self, comm: CommConfig) -> Self {
        self.comm = comm;
        self
    }

    /// Counts per revolution of both axes.
    pub fn cpr(&self) -> AxisPair<i64> {
        AxisPair::new(self.axis1.cpr, self.axis2.cpr)
    }

    /// Motor tuning of both axes.
    pub fn motors(&self) -> AxisPair<MotorConfig> {
        AxisPair::new(self.axis1.motor.clone(), self.axis2.motor.clone())
    }
}

// ============================================================================
// Axis Config
// ============================================================================

/// Per-axis geometry and motor tuning
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AxisConfig {
    /// Microsteps per full revolution
    pub cpr: i64,
    /// Motor tuning
    pub motor: MotorConfig,
}

impl AxisConfig {
    /// Axis with the given CPR and default motor tuning
    pub fn new(cpr: i64) -> Self {
        Self {
            cpr,
            motor: MotorConfig::default(),
        }
    }

    /// Set the motor tuning
    pub fn with_motor(mut self, motor: MotorConfig) -> Self {
        self.motor = motor;
        self
    }
}

// ============================================================================
// Motor Config
// ============================================================================

/// One entry of the microstep table.
///
/// A single step pulse moves the axis by `multiplier` finest microsteps
/// once the driver's CFG1/CFG2 lines are set to `cfg1`/`cfg2`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MicrostepSetting {
    /// Position change per step pulse
    pub multiplier: u8,
    /// CFG1 line level
    pub cfg1: bool,
    /// CFG2 line level
    pub cfg2: bool,
}

impl MicrostepSetting {
    /// Creates a table entry.
    pub const fn new(multiplier: u8, cfg1: bool, cfg2: bool) -> Self {
        Self {
            multiplier,
            cfg1,
            cfg2,
        }
    }
}

/// Default microstep table for a TMC22xx driver in standalone mode:
/// 64, 32, 16 and 8 microsteps per full step.
pub const DEFAULT_MICROSTEPS: [MicrostepSetting; MICROSTEP_LEVELS] = [
    MicrostepSetting::new(1, false, true),
    MicrostepSetting::new(2, true, false),
    MicrostepSetting::new(4, true, true),
    MicrostepSetting::new(8, false, false),
];

/// Stepper kinematics tuning.
///
/// Velocities are in microsteps per second, accelerations in microsteps
/// per second squared, all at the finest resolution (multiplier 1).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MotorConfig {
    /// Maximum acceleration
    pub max_acceleration: f32,
    /// Maximum velocity magnitude
    pub max_velocity: f32,
    /// Deceleration used when braking toward a goto target
    pub brake_acceleration: f32,
    /// Tracking acceleration per step of position error
    pub position_gain: f32,
    /// Goto floor velocity (safe to stop from here)
    pub goto_min_velocity: f32,
    /// Step interval below which a coarser multiplier is selected (µs)
    pub min_step_interval_us: f32,
    /// Interval between parameter recomputations when not stepping (µs)
    pub param_update_period_us: i64,
    /// Extra steps added to the braking distance
    pub braking_margin_steps: f32,
    /// Divides the remaining segment time into the tracking correction window
    pub tracking_correction_divisor: f32,
    /// Microstep table, finest first
    pub microsteps: [MicrostepSetting; MICROSTEP_LEVELS],
}

impl Default for MotorConfig {
    fn default() -> Self {
        Self {
            max_acceleration: 2500.0,
            max_velocity: 13_000.0,
            brake_acceleration: 2500.0,
            position_gain: 50.0,
            goto_min_velocity: 100.0,
            min_step_interval_us: 700.0,
            param_update_period_us: 1000,
            braking_margin_steps: 50.0,
            tracking_correction_divisor: 10.0,
            microsteps: DEFAULT_MICROSTEPS,
        }
    }
}

impl MotorConfig {
    /// Set the maximum acceleration
    pub fn with_max_acceleration(mut self, a: f32) -> Self {
        self.max_acceleration = a.abs();
        self
    }

    /// Set the maximum velocity
    pub fn with_max_velocity(mut self, v: f32) -> Self {
        self.max_velocity = v.abs();
        self
    }

    /// Set the braking deceleration
    pub fn with_brake_acceleration(mut self, a: f32) -> Self {
        self.brake_acceleration = a.abs();
        self
    }

    /// Set the tracking position gain
    pub fn with_position_gain(mut self, k: f32) -> Self {
        self.position_gain = k.abs();
        self
    }

    /// Set the goto floor velocity
    pub fn with_goto_min_velocity(mut self, v: f32) -> Self {
        self.goto_min_velocity = v.abs();
        self
    }

    /// Set the minimum step interval
    pub fn with_min_step_interval_us(mut self, us: f32) -> Self {
        self.min_step_interval_us = us;
        self
    }

    /// Set the parameter update period
    pub fn with_param_update_period_us(mut self, us: i64) -> Self {
        self.param_update_period_us = us.max(1);
        self
    }

    /// Set the braking distance margin
    pub fn with_braking_margin_steps(mut self, steps: f32) -> Self {
        self.braking_margin_steps = steps.max(0.0);
        self
    }

    /// Set the tracking correction divisor
    pub fn with_tracking_correction_divisor(mut self, divisor: f32) -> Self {
        self.tracking_correction_divisor = divisor.max(1.0);
        self
    }

    /// Set the microstep table
    pub fn with_microsteps(mut self, table: [MicrostepSetting; MICROSTEP_LEVELS]) -> Self {
        self.microsteps = table;
        self
    }
}

// ============================================================================
// Task Config
// ============================================================================

/// Motor task and shared-state timing
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TaskConfig {
    /// Period of the motor task's slow slice (command drain, tracking, snapshot)
    pub motor_update_period_us: i64,
    /// Capacity of the dispatcher → motor task command queue
    pub motor_queue_capacity: usize,
    /// Maximum wait for a shared-state lock
    pub lock_timeout_ms: u32,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            motor_update_period_us: 200_000,
            motor_queue_capacity: 16,
            lock_timeout_ms: 100,
        }
    }
}

impl TaskConfig {
    /// Set the motor task slow-slice period
    pub fn with_motor_update_period_us(mut self, us: i64) -> Self {
        self.motor_update_period_us = us.max(1);
        self
    }

    /// Set the motor command queue capacity
    pub fn with_motor_queue_capacity(mut self, capacity: usize) -> Self {
        self.motor_queue_capacity = capacity.max(1);
        self
    }

    /// Set the shared-state lock timeout
    pub fn with_lock_timeout_ms(mut self, ms: u32) -> Self {
        self.lock_timeout_ms = ms;
        self
    }
}

// ============================================================================
// Comm Config
// ============================================================================

/// Serial link configuration
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CommConfig {
    /// UART baud rate
    pub baud_rate: u32,
    /// Protocol task polling period in milliseconds
    pub poll_period_ms: u32,
    /// Maximum wait for the next byte of a started line
    pub byte_timeout_ms: u32,
}

impl Default for CommConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            poll_period_ms: 10,
            byte_timeout_ms: 10,
        }
    }
}

impl CommConfig {
    /// Set the baud rate
    pub fn with_baud_rate(mut self, baud: u32) -> Self {
        self.baud_rate = baud;
        self
    }

    /// Set the polling period
    pub fn with_poll_period_ms(mut self, ms: u32) -> Self {
        self.poll_period_ms = ms.max(1);
        self
    }

    /// Set the per-byte timeout
    pub fn with_byte_timeout_ms(mut self, ms: u32) -> Self {
        self.byte_timeout_ms = ms;
        self
    }
}

// ============================================================================
// Tests
// ============================================================================
