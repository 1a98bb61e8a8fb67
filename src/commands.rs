//! Motor commands and the queue that carries them to the motor task.
//!
//! The dispatcher never touches a [`Motor`](crate::motor::Motor) directly.
//! It sends a [`MotorCommand`] through a bounded queue and the motor task
//! applies it on its next periodic slice.
//!
//! Sends never block. Every command states the latest intent ("be at this
//! target", "stop now"), so when the queue is full the new command is
//! dropped with a warning instead of stalling the protocol task.
//!
//! # Example
//!
//! ```rust
//! use esp_mount::commands::{motor_channel, MotorCommand};
//!
//! let (tx, rx) = motor_channel(4);
//! assert!(tx.send(MotorCommand::Goto(100, 200)));
//! assert!(tx.send(MotorCommand::Stop { instant: true }));
//!
//! let drained: Vec<_> = rx.drain().collect();
//! assert_eq!(
//!     drained,
//!     vec![MotorCommand::Goto(100, 200), MotorCommand::Stop { instant: true }]
//! );
//! ```

use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TryRecvError, TrySendError};

use log::warn;

/// Operation requested of both motor axes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MotorCommand {
    /// Redefine both axis positions
    PositionUpdate(i64, i64),
    /// Move both axes to a target
    Goto(i64, i64),
    /// Stop both axes
    Stop {
        /// Zero velocity immediately instead of decelerating
        instant: bool,
    },
    /// Start following the track buffer
    TrackBegin,
    /// Stop following the track buffer
    TrackStop,
}

/// Creates a bounded single-producer/single-consumer motor command queue.
pub fn motor_channel(capacity: usize) -> (MotorCommandSender, MotorCommandReceiver) {
    let (tx, rx) = sync_channel(capacity);
    (MotorCommandSender { tx }, MotorCommandReceiver { rx })
}

/// Sending half, held by the dispatcher.
#[derive(Clone, Debug)]
pub struct MotorCommandSender {
    tx: SyncSender<MotorCommand>,
}

impl MotorCommandSender {
    /// Queues a command without blocking.
    ///
    /// Returns `false` if the command was dropped because the queue is full
    /// or the motor task is gone.
    pub fn send(&self, cmd: MotorCommand) -> bool {
        match self.tx.try_send(cmd) {
            Ok(()) => true,
            Err(TrySendError::Full(cmd)) => {
                warn!("motor command queue full, dropping {cmd:?}");
                false
            }
            Err(TrySendError::Disconnected(cmd)) => {
                warn!("motor task not running, dropping {cmd:?}");
                false
            }
        }
    }
}

/// Receiving half, owned by the motor task.
#[derive(Debug)]
pub struct MotorCommandReceiver {
    rx: Receiver<MotorCommand>,
}

impl MotorCommandReceiver {
    /// Takes the next queued command, if any.
    pub fn try_recv(&self) -> Option<MotorCommand> {
        match self.rx.try_recv() {
            Ok(cmd) => Some(cmd),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Iterates over every command queued right now.
    pub fn drain(&self) -> impl Iterator<Item = MotorCommand> + '_ {
        std::iter::from_fn(move || self.try_recv())
    }
}
