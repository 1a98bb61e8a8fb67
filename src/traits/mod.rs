//! Trait definitions for hardware abstraction.
//!
//! This module defines the seams that let esp-mount:
//! - Run on the ESP32 with real stepper drivers and a UART
//! - Run the whole core on a desktop host against mocks
//!
//! # Submodules
//!
//! - `hardware`: Stepper output lines and the monotonic clock
//! - `serial`: Byte transport for the command protocol

pub mod hardware;
pub mod serial;

pub use hardware::*;
pub use serial::*;
