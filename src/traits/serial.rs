//! Byte transport used by the command protocol.
//!
//! The protocol task never blocks indefinitely: every wait for input is a
//! bounded poll through [`SerialTransport::wait_for_bytes`].

/// Byte-oriented serial link (UART on hardware, a queue in tests).
///
/// # Implementation Notes
///
/// - `bytes_available()` reports bytes already buffered by the driver
/// - `read_byte()` never blocks; it returns `None` when nothing is buffered
/// - `wait_for_bytes()` blocks at most `timeout_ms`
/// - `flush_input()` discards everything buffered on the receive side
pub trait SerialTransport {
    /// Error type for writes.
    type Error: core::fmt::Debug;

    /// Number of received bytes ready to be read.
    fn bytes_available(&mut self) -> usize;

    /// Reads one buffered byte.
    fn read_byte(&mut self) -> Option<u8>;

    /// Writes all of `bytes` to the link.
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Drops all buffered input.
    fn flush_input(&mut self);

    /// Waits until at least `min` bytes are buffered or `timeout_ms` passes.
    ///
    /// Returns `true` when the bytes are available.
    fn wait_for_bytes(&mut self, min: usize, timeout_ms: u32) -> bool;
}
