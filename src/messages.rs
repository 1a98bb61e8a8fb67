//! Wire message types and the response line encoder.
//!
//! Requests are `+<cmd> <arg>...\n` lines, replies mirror them as
//! `+<cmd> <value>...\n`, and errors are `! <code> <message>\n`.
//!
//! Lines are encoded into a fixed-capacity [`Line`] so the protocol task
//! never allocates per reply.
//!
//! # Example
//!
//! ```
//! use esp_mount::messages::{encode_error, Response};
//! use esp_mount::error::ProtocolError;
//!
//! let line = Response::SetPosition { ax1: 5, ax2: -7 }.encode().unwrap();
//! assert_eq!(line.as_str(), "+p 5 -7\n");
//!
//! let line = encode_error(&ProtocolError::UnknownCommand).unwrap();
//! assert_eq!(line.as_str(), "! 3 Unknown command received\n");
//! ```

use core::fmt::Write;

use crate::error::ProtocolError;
use crate::services::MountStatus;
use crate::tracking::{PushOutcome, TrackPoint};

/// Maximum encoded line length, terminator included.
pub const MAX_LINE_LEN: usize = 128;

/// One encoded protocol line.
pub type Line = heapless::String<MAX_LINE_LEN>;

/// First byte of every request and response line.
pub const COMMAND_SENTINEL: u8 = b'+';

/// First byte of every error line.
pub const ERROR_SENTINEL: u8 = b'!';

// ============================================================================
// Command Names
// ============================================================================

/// Every command the protocol knows, by wire name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandKind {
    /// `t`: synchronize mount time
    TimeSync,
    /// `p`: redefine axis positions
    SetPosition,
    /// `gp`: read axis positions
    GetPosition,
    /// `gt`: read mount time
    GetTime,
    /// `g`: goto
    Goto,
    /// `s`: stop
    Stop,
    /// `gc`: counts per revolution
    GetCpr,
    /// `gs`: mount status
    GetStatus,
    /// `gpv`: protocol version
    GetProtocolVersion,
    /// `gtbf`: track buffer free space
    GetTrackBufferFreeSpace,
    /// `gtbs`: track buffer size
    GetTrackBufferSize,
    /// `tbc`: clear the track buffer
    ClearTrackBuffer,
    /// `tp`: queue a track point
    AddTrackPoint,
    /// `tb`: begin tracking
    BeginTracking,
    /// `ts`: stop tracking
    StopTracking,
}

impl CommandKind {
    /// All commands.
    pub const ALL: [CommandKind; 15] = [
        CommandKind::TimeSync,
        CommandKind::SetPosition,
        CommandKind::GetPosition,
        CommandKind::GetTime,
        CommandKind::Goto,
        CommandKind::Stop,
        CommandKind::GetCpr,
        CommandKind::GetStatus,
        CommandKind::GetProtocolVersion,
        CommandKind::GetTrackBufferFreeSpace,
        CommandKind::GetTrackBufferSize,
        CommandKind::ClearTrackBuffer,
        CommandKind::AddTrackPoint,
        CommandKind::BeginTracking,
        CommandKind::StopTracking,
    ];

    /// Wire name without the sentinel.
    pub const fn name(self) -> &'static str {
        match self {
            CommandKind::TimeSync => "t",
            CommandKind::SetPosition => "p",
            CommandKind::GetPosition => "gp",
            CommandKind::GetTime => "gt",
            CommandKind::Goto => "g",
            CommandKind::Stop => "s",
            CommandKind::GetCpr => "gc",
            CommandKind::GetStatus => "gs",
            CommandKind::GetProtocolVersion => "gpv",
            CommandKind::GetTrackBufferFreeSpace => "gtbf",
            CommandKind::GetTrackBufferSize => "gtbs",
            CommandKind::ClearTrackBuffer => "tbc",
            CommandKind::AddTrackPoint => "tp",
            CommandKind::BeginTracking => "tb",
            CommandKind::StopTracking => "ts",
        }
    }

    /// Looks a command up by wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

// ============================================================================
// Decoded Requests
// ============================================================================

/// A decoded request line, or the error that decoding produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MountMsg {
    /// Mount time in milliseconds
    TimeSync(u64),
    /// New axis positions
    SetPosition {
        /// First axis
        ax1: i64,
        /// Second axis
        ax2: i64,
    },
    /// Position query
    GetPosition,
    /// Time query
    GetTime,
    /// Move both axes to a target
    Goto {
        /// First axis target
        ax1: i64,
        /// Second axis target
        ax2: i64,
        /// Optional mount time, echoed back
        time: Option<u64>,
    },
    /// Stop both axes
    Stop {
        /// Zero velocity immediately instead of decelerating
        instant: bool,
    },
    /// CPR query
    GetCpr,
    /// Status query
    GetStatus,
    /// Protocol version query
    GetProtocolVersion,
    /// Track buffer free space query
    GetTrackBufferFreeSpace,
    /// Track buffer size query
    GetTrackBufferSize,
    /// Empty the track buffer
    ClearTrackBuffer,
    /// Queue a track point
    AddTrackPoint(TrackPoint),
    /// Start following the track buffer
    BeginTracking,
    /// Stop following the track buffer
    StopTracking,
    /// The line could not be decoded
    Error(ProtocolError),
}

// ============================================================================
// Responses
// ============================================================================

/// A successful reply.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Response {
    /// `+t <ms>`: synchronized mount time
    TimeSync(i64),
    /// `+p <ax1> <ax2>`
    SetPosition {
        /// First axis
        ax1: i64,
        /// Second axis
        ax2: i64,
    },
    /// `+gp <ax1> <ax2>`
    Position {
        /// First axis
        ax1: i64,
        /// Second axis
        ax2: i64,
    },
    /// `+gt <ms>`
    Time(i64),
    /// `+g <ax1> <ax2> [<ms>]`
    Goto {
        /// First axis target
        ax1: i64,
        /// Second axis target
        ax2: i64,
        /// Echoed time, if the request had one
        time: Option<u64>,
    },
    /// `+s <0|1>`
    Stop {
        /// Echoed instant flag
        instant: bool,
    },
    /// `+gc <cpr1> <cpr2>`
    Cpr {
        /// First axis
        ax1: i64,
        /// Second axis
        ax2: i64,
    },
    /// `+gs <code>`
    Status(MountStatus),
    /// `+gpv <version>`
    ProtocolVersion(u32),
    /// `+gtbf <slots>`
    TrackBufferFreeSpace(usize),
    /// `+gtbs <slots>`
    TrackBufferSize(usize),
    /// `+tbc`
    TrackBufferCleared,
    /// `+tp <code>`
    TrackPointAdded(PushOutcome),
    /// `+tb`
    TrackingBegun,
    /// `+ts`
    TrackingStopped,
}

impl Response {
    /// Command this response answers.
    pub const fn kind(&self) -> CommandKind {
        match self {
            Response::TimeSync(_) => CommandKind::TimeSync,
            Response::SetPosition { .. } => CommandKind::SetPosition,
            Response::Position { .. } => CommandKind::GetPosition,
            Response::Time(_) => CommandKind::GetTime,
            Response::Goto { .. } => CommandKind::Goto,
            Response::Stop { .. } => CommandKind::Stop,
            Response::Cpr { .. } => CommandKind::GetCpr,
            Response::Status(_) => CommandKind::GetStatus,
            Response::ProtocolVersion(_) => CommandKind::GetProtocolVersion,
            Response::TrackBufferFreeSpace(_) => CommandKind::GetTrackBufferFreeSpace,
            Response::TrackBufferSize(_) => CommandKind::GetTrackBufferSize,
            Response::TrackBufferCleared => CommandKind::ClearTrackBuffer,
            Response::TrackPointAdded(_) => CommandKind::AddTrackPoint,
            Response::TrackingBegun => CommandKind::BeginTracking,
            Response::TrackingStopped => CommandKind::StopTracking,
        }
    }

    /// Encodes the response as one terminated line.
    pub fn encode(&self) -> Result<Line, core::fmt::Error> {
        let mut line = Line::new();
        write!(line, "+{}", self.kind().name())?;
        match *self {
            Response::TimeSync(ms) | Response::Time(ms) => write!(line, " {ms}")?,
            Response::SetPosition { ax1, ax2 }
            | Response::Position { ax1, ax2 }
            | Response::Cpr { ax1, ax2 } => write!(line, " {ax1} {ax2}")?,
            Response::Goto { ax1, ax2, time } => {
                write!(line, " {ax1} {ax2}")?;
                if let Some(time) = time {
                    write!(line, " {time}")?;
                }
            }
            Response::Stop { instant } => write!(line, " {}", u8::from(instant))?,
            Response::Status(status) => write!(line, " {}", status.code())?,
            Response::ProtocolVersion(version) => write!(line, " {version}")?,
            Response::TrackBufferFreeSpace(n) | Response::TrackBufferSize(n) => write!(line, " {n}")?,
            Response::TrackPointAdded(outcome) => write!(line, " {}", outcome.code())?,
            Response::TrackBufferCleared | Response::TrackingBegun | Response::TrackingStopped => {}
        }
        line.push('\n').map_err(|_| core::fmt::Error)?;
        Ok(line)
    }
}

/// Encodes an error line: `! <code> <message>\n`.
pub fn encode_error(err: &ProtocolError) -> Result<Line, core::fmt::Error> {
    let mut line = Line::new();
    writeln!(line, "! {} {}", err.code(), err)?;
    Ok(line)
}
