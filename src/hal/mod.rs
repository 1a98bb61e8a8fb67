//! Hardware Abstraction Layer implementations.
//!
//! This module contains concrete implementations of the traits
//! defined in [`crate::traits`] for various platforms.
//!
//! # Available Implementations
//!
//! - `mock`: Test implementations for desktop development
//! - `gpio`: Stepper driver over any `embedded-hal` output pins
//! - `esp32`: ESP32 stepper pins, UART and clock (requires `esp32` feature)

pub mod gpio;
pub mod mock;

#[cfg(feature = "esp32")]
pub mod esp32;

pub use gpio::GpioStepper;
pub use mock::*;

#[cfg(feature = "esp32")]
pub use esp32::*;
