//! Runtime services: shared state, command dispatch and the two tasks.
//!
//! The mount runs two concurrent tasks that only meet through
//! [`MountState`] (behind an `Arc`) and the bounded motor command queue:
//!
//! - [`CommTask`]: polls the serial link and runs each line through the
//!   [`Dispatcher`]
//! - [`MotorTask`]: spins the step loop and, on its periodic slice, drains
//!   motor commands, advances tracking and publishes a position snapshot
//!
//! ```ignore
//! use std::sync::Arc;
//! use esp_mount::services::{CommTask, Dispatcher, MotorTask, MountState};
//!
//! let state = Arc::new(MountState::new(&config.tasks));
//! let (tx, rx) = motor_channel(config.tasks.motor_queue_capacity);
//!
//! let mut motor_task = MotorTask::new(motors, rx, Arc::clone(&state), &config.tasks);
//! let dispatcher = Dispatcher::new(Arc::clone(&state), tx, config.cpr());
//! let mut comm_task = CommTask::new(uart, dispatcher, &config.comm);
//! ```

pub mod comm_task;
pub mod dispatch;
pub mod motor_task;
pub mod shared;

pub use comm_task::CommTask;
pub use dispatch::Dispatcher;
pub use motor_task::MotorTask;
pub use shared::{MountState, MountStatus};
