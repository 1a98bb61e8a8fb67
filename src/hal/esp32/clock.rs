//! ESP32 clock implementation using the ESP-IDF high-resolution timer.

use crate::traits::Clock;

/// ESP32 monotonic clock.
///
/// Reads `esp_timer_get_time()`, which counts microseconds since boot and
/// is unaffected by wall-clock changes.
///
/// # Example
///
/// ```ignore
/// use esp_mount::hal::esp32::Esp32Clock;
/// use esp_mount::traits::Clock;
///
/// let clock = Esp32Clock::new();
/// let start = clock.now_us();
/// // ... do work ...
/// let elapsed_us = clock.now_us() - start;
/// ```
#[derive(Clone, Copy, Debug)]
pub struct Esp32Clock;

impl Esp32Clock {
    /// Creates a new ESP32 clock instance.
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Default for Esp32Clock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for Esp32Clock {
    #[inline]
    fn now_us(&self) -> i64 {
        // Safe: plain read of the hardware timer, no side effects
        unsafe { esp_idf_hal::sys::esp_timer_get_time() }
    }
}
