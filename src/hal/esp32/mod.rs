//! ESP32 hardware abstraction layer for the telescope mount.
//!
//! # Hardware Configuration
//!
//! - **MCU**: ESP32 (dual core Xtensa, 240MHz)
//! - **Stepper drivers**: two TMC22xx in standalone step/dir mode
//! - **Host link**: UART2 at 115200 baud
//!
//! # Pin Assignments
//!
//! | Signal | Axis 1 (RA) | Axis 2 (Dec) |
//! |--------|-------------|--------------|
//! | STEP   | GPIO25      | GPIO19       |
//! | DIR    | GPIO26      | GPIO21       |
//! | CFG1   | GPIO18      | GPIO22       |
//! | CFG2   | GPIO27      | GPIO23       |
//!
//! Host UART2: TX on GPIO12, RX on GPIO13.

mod clock;
mod stepper;
mod uart;

pub use clock::Esp32Clock;
pub use stepper::{esp32_stepper, Esp32OutputPin, Esp32Stepper};
pub use uart::Esp32Uart;
