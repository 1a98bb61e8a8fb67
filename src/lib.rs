//! # esp-mount
//!
//! Firmware core for a two-axis motorized telescope mount: stepper
//! kinematics with microstep switching, time-indexed sky tracking, and a
//! line-oriented serial command protocol.
//!
//! ## Features
//!
//! - **Motor kinematics**: acceleration-limited gotos, braking, and
//!   position+time tracking with drift correction
//! - **Microstep switching**: coarser microsteps at high speed, finest when
//!   slow or idle
//! - **Track buffer**: fixed-capacity FIFO of `(ax1, ax2, timestamp)`
//!   points, streamed by the host ahead of time
//! - **Serial protocol**: `+`-prefixed ASCII commands with space-separated
//!   arguments, `!`-prefixed error replies
//!
//! ## Architecture
//!
//! Everything hardware-specific sits behind the traits in [`traits`], so the
//! whole control path runs on a desktop with [`hal::mock`] doubles:
//!
//! - `motor` - Per-axis kinematic engine
//! - `tracking` - Track points, segments, ring buffer, scheduler
//! - `messages` / `parsing` - Protocol types, encoder and line parser
//! - `services` - Shared state, dispatcher, motor task, protocol task
//! - `hal` - Concrete implementations (mock for testing, esp32 for hardware)
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use esp_mount::{
//!     config::MountConfig,
//!     commands::motor_channel,
//!     hal::MockSerial,
//!     services::{CommTask, Dispatcher, MountState},
//! };
//!
//! let config = MountConfig::default();
//! let state = Arc::new(MountState::new(&config.tasks));
//! let (tx, _rx) = motor_channel(config.tasks.motor_queue_capacity);
//! let dispatcher = Dispatcher::new(Arc::clone(&state), tx, config.cpr());
//!
//! let mut serial = MockSerial::new();
//! serial.queue_line("+gpv");
//! let mut comm = CommTask::new(serial, dispatcher, &config.comm);
//!
//! comm.poll(0).unwrap();
//! assert_eq!(comm.transport_mut().take_output(), "+gpv 1\n");
//! ```

#![warn(missing_docs)]

/// Axis identifiers and per-axis value pairs.
pub mod axis;
/// Commands queued from the protocol side to the motor task.
pub mod commands;
/// Mount, motor, task and link configuration.
pub mod config;
/// Error types.
pub mod error;
/// Hardware abstraction layer with mock implementations for testing.
pub mod hal;
/// Protocol messages and response encoding.
pub mod messages;
/// Per-axis stepper kinematics.
pub mod motor;
/// Serial line parser.
pub mod parsing;
/// Shared state, command dispatcher and the two runtime tasks.
pub mod services;
/// Track points, the track buffer and the tracking scheduler.
pub mod tracking;
/// Core traits for hardware abstraction.
pub mod traits;

// Re-exports for convenience
pub use axis::{Axis, AxisPair};
pub use commands::{motor_channel, MotorCommand, MotorCommandReceiver, MotorCommandSender};
pub use config::{AxisConfig, CommConfig, MicrostepSetting, MotorConfig, MountConfig, TaskConfig};
pub use error::{MountError, ProtocolError};
pub use messages::{CommandKind, MountMsg, Response};
pub use motor::{Motor, MotorMode, MotorState};
pub use services::{CommTask, Dispatcher, MotorTask, MountState, MountStatus};
pub use tracking::{PushOutcome, TrackBuffer, TrackPoint, TrackSegment, TrackingScheduler};
pub use traits::{Clock, SerialTransport, StepDirection, StepperPins};
