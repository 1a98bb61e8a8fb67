//! Command dispatcher: decoded message in, one reply out.
//!
//! The dispatcher is stateless between messages. Queries read
//! [`MountState`]; mutating commands write it and/or queue a
//! [`MotorCommand`] for the motor task. Every message yields exactly one
//! [`Response`] or [`ProtocolError`].
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use esp_mount::commands::{motor_channel, MotorCommand};
//! use esp_mount::config::MountConfig;
//! use esp_mount::messages::{MountMsg, Response};
//! use esp_mount::services::{Dispatcher, MountState};
//!
//! let config = MountConfig::default();
//! let state = Arc::new(MountState::new(&config.tasks));
//! let (tx, rx) = motor_channel(config.tasks.motor_queue_capacity);
//! let dispatcher = Dispatcher::new(state, tx, config.cpr());
//!
//! let reply = dispatcher.dispatch(MountMsg::Goto { ax1: 5, ax2: 6, time: None }, 0);
//! assert_eq!(reply, Ok(Response::Goto { ax1: 5, ax2: 6, time: None }));
//! assert_eq!(rx.try_recv(), Some(MotorCommand::Goto(5, 6)));
//! ```

use std::sync::Arc;

use log::{info, warn};

use crate::axis::{Axis, AxisPair};
use crate::commands::{MotorCommand, MotorCommandSender};
use crate::config::PROTOCOL_VERSION;
use crate::error::ProtocolError;
use crate::messages::{encode_error, Line, MountMsg, Response};
use crate::tracking::PushOutcome;

use super::shared::MountState;

/// Maps decoded messages to state changes, motor commands and replies.
pub struct Dispatcher {
    state: Arc<MountState>,
    motors: MotorCommandSender,
    cpr: AxisPair<i64>,
    protocol_version: u32,
}

impl Dispatcher {
    /// Creates a dispatcher reporting the given CPR values.
    pub fn new(state: Arc<MountState>, motors: MotorCommandSender, cpr: AxisPair<i64>) -> Self {
        Self {
            state,
            motors,
            cpr,
            protocol_version: PROTOCOL_VERSION,
        }
    }

    /// Override the reported protocol version.
    pub fn with_protocol_version(mut self, version: u32) -> Self {
        self.protocol_version = version;
        self
    }

    /// Shared state this dispatcher works on.
    pub fn state(&self) -> &Arc<MountState> {
        &self.state
    }

    /// Executes one message at local time `now_us`.
    pub fn dispatch(&self, msg: MountMsg, now_us: i64) -> Result<Response, ProtocolError> {
        let state = &self.state;
        Ok(match msg {
            MountMsg::TimeSync(mount_ms) => {
                state.set_time(mount_ms, now_us)?;
                info!("time synchronized to {mount_ms} ms");
                Response::TimeSync(state.time_ms(now_us)?)
            }
            MountMsg::SetPosition { ax1, ax2 } => {
                state.set_position(AxisPair::new(ax1, ax2))?;
                self.motors.send(MotorCommand::PositionUpdate(ax1, ax2));
                info!("position set to ({ax1}, {ax2})");
                Response::SetPosition { ax1, ax2 }
            }
            MountMsg::GetPosition => {
                let position = state.position()?;
                Response::Position {
                    ax1: position[Axis::Ax1],
                    ax2: position[Axis::Ax2],
                }
            }
            MountMsg::GetTime => Response::Time(state.time_ms(now_us)?),
            MountMsg::Goto { ax1, ax2, time } => {
                self.motors.send(MotorCommand::Goto(ax1, ax2));
                info!("goto ({ax1}, {ax2})");
                Response::Goto { ax1, ax2, time }
            }
            MountMsg::Stop { instant } => {
                self.motors.send(MotorCommand::Stop { instant });
                info!("stop (instant: {instant})");
                Response::Stop { instant }
            }
            MountMsg::GetCpr => Response::Cpr {
                ax1: self.cpr[Axis::Ax1],
                ax2: self.cpr[Axis::Ax2],
            },
            MountMsg::GetStatus => Response::Status(state.status()?),
            MountMsg::GetProtocolVersion => Response::ProtocolVersion(self.protocol_version),
            MountMsg::GetTrackBufferFreeSpace => Response::TrackBufferFreeSpace(state.track_free_space()?),
            MountMsg::GetTrackBufferSize => Response::TrackBufferSize(state.track_capacity()?),
            MountMsg::ClearTrackBuffer => {
                state.clear_track_buffer()?;
                Response::TrackBufferCleared
            }
            MountMsg::AddTrackPoint(point) => {
                let outcome = state.push_track_point(point).unwrap_or(PushOutcome::LockFailed);
                if outcome == PushOutcome::Full {
                    warn!("track buffer full, point at {} rejected", point.timestamp_ms);
                }
                Response::TrackPointAdded(outcome)
            }
            MountMsg::BeginTracking => {
                self.motors.send(MotorCommand::TrackBegin);
                info!("tracking requested");
                Response::TrackingBegun
            }
            MountMsg::StopTracking => {
                self.motors.send(MotorCommand::TrackStop);
                info!("tracking stop requested");
                Response::TrackingStopped
            }
            MountMsg::Error(err) => return Err(err),
        })
    }

    /// Executes one message and encodes the reply line.
    pub fn handle(&self, msg: MountMsg, now_us: i64) -> Result<Line, core::fmt::Error> {
        match self.dispatch(msg, now_us) {
            Ok(response) => response.encode(),
            Err(err) => {
                warn!("command failed: {err}");
                encode_error(&err)
            }
        }
    }
}
