//! UART transport for the command protocol.

use std::time::{Duration, Instant};

use esp_idf_hal::delay::{FreeRtos, NON_BLOCK};
use esp_idf_hal::gpio::{AnyIOPin, InputPin, OutputPin};
use esp_idf_hal::peripheral::Peripheral;
use esp_idf_hal::sys::EspError;
use esp_idf_hal::uart::{config::Config, Uart, UartDriver};
use esp_idf_hal::units::Hertz;
use log::warn;

use crate::config::CommConfig;
use crate::traits::SerialTransport;

/// Command link on an ESP32 UART, no flow control.
///
/// # Example
///
/// ```ignore
/// let peripherals = Peripherals::take()?;
/// let uart = Esp32Uart::new(
///     peripherals.uart2,
///     peripherals.pins.gpio12,
///     peripherals.pins.gpio13,
///     &CommConfig::default(),
/// )?;
/// ```
pub struct Esp32Uart<'d> {
    uart: UartDriver<'d>,
}

impl<'d> Esp32Uart<'d> {
    /// Installs the UART driver on the given port and pins.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver cannot be installed.
    pub fn new(
        uart: impl Peripheral<P = impl Uart> + 'd,
        tx: impl Peripheral<P = impl OutputPin> + 'd,
        rx: impl Peripheral<P = impl InputPin> + 'd,
        config: &CommConfig,
    ) -> Result<Self, EspError> {
        let uart_config = Config::default().baudrate(Hertz(config.baud_rate));
        let uart = UartDriver::new(
            uart,
            tx,
            rx,
            Option::<AnyIOPin>::None,
            Option::<AnyIOPin>::None,
            &uart_config,
        )?;
        Ok(Self { uart })
    }
}

impl SerialTransport for Esp32Uart<'_> {
    type Error = EspError;

    fn bytes_available(&mut self) -> usize {
        self.uart.remaining_read().unwrap_or(0)
    }

    fn read_byte(&mut self) -> Option<u8> {
        let mut byte = [0u8; 1];
        match self.uart.read(&mut byte, NON_BLOCK) {
            Ok(1) => Some(byte[0]),
            _ => None,
        }
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), EspError> {
        let mut rest = bytes;
        while !rest.is_empty() {
            let written = self.uart.write(rest)?;
            rest = &rest[written..];
        }
        Ok(())
    }

    fn flush_input(&mut self) {
        if let Err(err) = self.uart.clear_rx() {
            warn!("uart rx flush failed: {err}");
        }
    }

    fn wait_for_bytes(&mut self, min: usize, timeout_ms: u32) -> bool {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms as u64);
        loop {
            if self.bytes_available() >= min {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            FreeRtos::delay_ms(1);
        }
    }
}
