//! Protocol task: poll the serial link, dispatch, reply.
//!
//! Runs at a fixed period. Each period it handles every complete line
//! already buffered, then sleeps. It never blocks on input beyond the
//! per-byte timeout used while a line is being read.

use std::time::Duration;

use log::{info, warn};

use crate::config::CommConfig;
use crate::parsing::read_message;
use crate::traits::{Clock, SerialTransport};

use super::dispatch::Dispatcher;

/// Serial front end of the dispatcher.
pub struct CommTask<T: SerialTransport> {
    transport: T,
    dispatcher: Dispatcher,
    byte_timeout_ms: u32,
    poll_period: Duration,
}

impl<T: SerialTransport> CommTask<T> {
    /// Creates the task over a transport.
    pub fn new(transport: T, dispatcher: Dispatcher, config: &CommConfig) -> Self {
        Self {
            transport,
            dispatcher,
            byte_timeout_ms: config.byte_timeout_ms,
            poll_period: Duration::from_millis(config.poll_period_ms as u64),
        }
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutable access to the transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Handles at most one line. Returns `true` if a reply was written.
    pub fn poll(&mut self, now_us: i64) -> Result<bool, T::Error> {
        let Some(msg) = read_message(&mut self.transport, self.byte_timeout_ms) else {
            return Ok(false);
        };
        match self.dispatcher.handle(msg, now_us) {
            Ok(line) => {
                self.transport.write_bytes(line.as_bytes())?;
                Ok(true)
            }
            Err(_) => {
                warn!("reply to {msg:?} does not fit in one line");
                Ok(false)
            }
        }
    }

    /// Handles every buffered line. Returns the number of replies written.
    pub fn poll_all<C: Clock>(&mut self, clock: &C) -> Result<usize, T::Error> {
        let mut replies = 0;
        while self.transport.bytes_available() > 0 {
            if self.poll(clock.now_us())? {
                replies += 1;
            }
        }
        Ok(replies)
    }

    /// Runs the task forever.
    pub fn run<C: Clock>(&mut self, clock: &C) -> ! {
        info!("protocol task running, poll period {:?}", self.poll_period);
        loop {
            if let Err(err) = self.poll_all(clock) {
                warn!("serial write failed: {err:?}");
            }
            std::thread::sleep(self.poll_period);
        }
    }
}
