//! Request line parser.
//!
//! Reads one `+<cmd> <arg>...` line from a [`SerialTransport`] and turns it
//! into a [`MountMsg`]. Parsing is a small state machine: the sentinel,
//! the command name, then positional tokens until the terminator. An end
//! flag records whether the terminator has been consumed, so commands with
//! optional trailing arguments can tell "no more tokens" from "bad token".
//!
//! # Example
//!
//! ```rust
//! use esp_mount::hal::MockSerial;
//! use esp_mount::messages::MountMsg;
//! use esp_mount::parsing::read_message;
//!
//! let mut serial = MockSerial::new();
//! serial.queue_line("+p 5 -7");
//!
//! let msg = read_message(&mut serial, 10);
//! assert_eq!(msg, Some(MountMsg::SetPosition { ax1: 5, ax2: -7 }));
//! ```

use core::str::FromStr;

use log::warn;

use crate::error::ProtocolError;
use crate::messages::{CommandKind, MountMsg, COMMAND_SENTINEL};
use crate::tracking::TrackPoint;
use crate::traits::SerialTransport;

/// Longest accepted token (command name or argument).
pub const MAX_TOKEN_LEN: usize = 24;

/// One whitespace-delimited token.
pub type Token = heapless::String<MAX_TOKEN_LEN>;

/// Token reader for the remainder of one line.
pub struct LineParser<'a, T: SerialTransport> {
    transport: &'a mut T,
    byte_timeout_ms: u32,
    end: bool,
}

impl<'a, T: SerialTransport> LineParser<'a, T> {
    /// Starts reading right after the sentinel byte.
    pub fn new(transport: &'a mut T, byte_timeout_ms: u32) -> Self {
        Self {
            transport,
            byte_timeout_ms,
            end: false,
        }
    }

    /// True once the terminator has been consumed (or input timed out).
    pub fn at_end(&self) -> bool {
        self.end
    }

    fn next_byte(&mut self) -> Option<u8> {
        if self.transport.bytes_available() == 0
            && !self.transport.wait_for_bytes(1, self.byte_timeout_ms)
        {
            return None;
        }
        self.transport.read_byte()
    }

    /// Reads the next token.
    ///
    /// Returns `Ok(None)` when the line has no more tokens. A token longer
    /// than [`MAX_TOKEN_LEN`] is an invalid parameter.
    pub fn next_token(&mut self) -> Result<Option<Token>, ProtocolError> {
        let mut token = Token::new();
        while !self.end {
            let Some(byte) = self.next_byte() else {
                self.end = true;
                break;
            };
            match byte {
                b'\r' => {}
                b'\n' => self.end = true,
                b' ' if token.is_empty() => {}
                b' ' => break,
                other => token
                    .push(other as char)
                    .map_err(|_| ProtocolError::InvalidParameter)?,
            }
        }
        Ok((!token.is_empty()).then_some(token))
    }

    /// Fails with an invalid command if any token remains on the line.
    pub fn expect_end(&mut self) -> Result<(), ProtocolError> {
        match self.next_token()? {
            None => Ok(()),
            Some(_) => Err(ProtocolError::InvalidCommand),
        }
    }

    /// Drops whatever is left of the line.
    pub fn discard_line(&mut self) {
        while !self.end {
            match self.next_byte() {
                None | Some(b'\n') => self.end = true,
                Some(_) => {}
            }
        }
    }

    fn required<V: FromStr>(&mut self) -> Result<V, ProtocolError> {
        let token = self.next_token()?.ok_or(ProtocolError::InvalidParameter)?;
        token.parse().map_err(|_| ProtocolError::InvalidParameter)
    }

    /// Reads a signed decimal integer.
    pub fn parse_i64(&mut self) -> Result<i64, ProtocolError> {
        self.required()
    }

    /// Reads an unsigned decimal integer.
    pub fn parse_u64(&mut self) -> Result<u64, ProtocolError> {
        self.required()
    }

    /// Reads an unsigned integer if one is present.
    pub fn parse_optional_u64(&mut self) -> Result<Option<u64>, ProtocolError> {
        match self.next_token()? {
            None => Ok(None),
            Some(token) => token
                .parse()
                .map(Some)
                .map_err(|_| ProtocolError::InvalidParameter),
        }
    }

    /// Reads a flag: any positive integer is `true`, anything else `false`.
    pub fn parse_bool(&mut self) -> Result<bool, ProtocolError> {
        let token = self.next_token()?.ok_or(ProtocolError::InvalidParameter)?;
        Ok(token.parse::<i64>().is_ok_and(|value| value > 0))
    }
}

/// Reads and decodes one request line.
///
/// Returns `None` when nothing is buffered or the next line is empty.
/// Malformed input yields `Some(MountMsg::Error(..))` and never leaves a
/// partial line behind: a missing sentinel flushes the input, any other
/// failure discards the rest of the line.
pub fn read_message<T: SerialTransport>(transport: &mut T, byte_timeout_ms: u32) -> Option<MountMsg> {
    if transport.bytes_available() == 0 {
        return None;
    }
    let first = transport.read_byte()?;
    if first == b'\n' || first == b'\r' {
        return None;
    }
    if first != COMMAND_SENTINEL {
        warn!("line does not start with '+' (0x{first:02x}), flushing input");
        transport.flush_input();
        return Some(MountMsg::Error(ProtocolError::InvalidCommand));
    }

    let mut parser = LineParser::new(transport, byte_timeout_ms);
    let result = parser
        .next_token()
        .map_err(|_| ProtocolError::UnknownCommand)
        .and_then(|name| {
            let name = name.ok_or(ProtocolError::UnknownCommand)?;
            CommandKind::from_name(&name).ok_or_else(|| {
                warn!("unknown command '{name}'");
                ProtocolError::UnknownCommand
            })
        })
        .and_then(|kind| parse_arguments(kind, &mut parser))
        .and_then(|msg| parser.expect_end().map(|()| msg));

    match result {
        Ok(msg) => Some(msg),
        Err(err) => {
            parser.discard_line();
            Some(MountMsg::Error(err))
        }
    }
}

fn parse_arguments<T: SerialTransport>(
    kind: CommandKind,
    parser: &mut LineParser<'_, T>,
) -> Result<MountMsg, ProtocolError> {
    Ok(match kind {
        CommandKind::TimeSync => MountMsg::TimeSync(parser.parse_u64()?),
        CommandKind::SetPosition => MountMsg::SetPosition {
            ax1: parser.parse_i64()?,
            ax2: parser.parse_i64()?,
        },
        CommandKind::GetPosition => MountMsg::GetPosition,
        CommandKind::GetTime => MountMsg::GetTime,
        CommandKind::Goto => MountMsg::Goto {
            ax1: parser.parse_i64()?,
            ax2: parser.parse_i64()?,
            time: parser.parse_optional_u64()?,
        },
        CommandKind::Stop => MountMsg::Stop {
            instant: parser.parse_bool()?,
        },
        CommandKind::GetCpr => MountMsg::GetCpr,
        CommandKind::GetStatus => MountMsg::GetStatus,
        CommandKind::GetProtocolVersion => MountMsg::GetProtocolVersion,
        CommandKind::GetTrackBufferFreeSpace => MountMsg::GetTrackBufferFreeSpace,
        CommandKind::GetTrackBufferSize => MountMsg::GetTrackBufferSize,
        CommandKind::ClearTrackBuffer => MountMsg::ClearTrackBuffer,
        CommandKind::AddTrackPoint => MountMsg::AddTrackPoint(TrackPoint::new(
            parser.parse_i64()?,
            parser.parse_i64()?,
            parser.parse_u64()?,
        )),
        CommandKind::BeginTracking => MountMsg::BeginTracking,
        CommandKind::StopTracking => MountMsg::StopTracking,
    })
}
