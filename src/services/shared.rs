//! Shared mount state for the protocol and motor tasks.
//!
//! `MountState` holds everything both tasks need to see: the offset that
//! turns local monotonic time into synchronized mount time, the last
//! position and status snapshot taken by the motor task, and the track
//! buffer.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use esp_mount::axis::AxisPair;
//! use esp_mount::config::TaskConfig;
//! use esp_mount::services::MountState;
//!
//! let state = Arc::new(MountState::new(&TaskConfig::default()));
//!
//! // Protocol task: synchronize the clock at local time 2s
//! state.set_time(1_700_000_000_000, 2_000_000).unwrap();
//! assert_eq!(state.time_ms(3_000_000).unwrap(), 1_700_000_001_000);
//!
//! // Motor task: publish a position snapshot
//! state.set_position(AxisPair::new(10, -10)).unwrap();
//! assert_eq!(state.position().unwrap(), AxisPair::new(10, -10));
//! ```

use std::sync::{Mutex, MutexGuard, TryLockError};
use std::time::{Duration, Instant};

use log::warn;

use crate::axis::AxisPair;
use crate::config::TaskConfig;
use crate::error::MountError;
use crate::motor::MotorMode;
use crate::tracking::{PushOutcome, TrackBuffer, TrackPoint};

// ============================================================================
// Mount Status
// ============================================================================

/// Mount-level motion status reported by `+gs`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum MountStatus {
    /// Both axes idle
    #[default]
    Stopped = 0,
    /// Slewing to a target
    Goto = 1,
    /// Following track points
    Tracking = 2,
    /// Decelerating toward a target
    Braking = 3,
}

impl MountStatus {
    /// Wire code of this status.
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Combines the modes of both axes.
    ///
    /// An active tracking scheduler wins; otherwise the busiest axis
    /// decides (braking, then goto, then tracking).
    pub fn from_modes(modes: AxisPair<MotorMode>, tracking_active: bool) -> Self {
        if tracking_active {
            return MountStatus::Tracking;
        }
        let any = |mode: MotorMode| modes.iter().any(|(_, m)| *m == mode);
        if any(MotorMode::Braking) {
            MountStatus::Braking
        } else if any(MotorMode::Goto) {
            MountStatus::Goto
        } else if any(MotorMode::Tracking) {
            MountStatus::Tracking
        } else {
            MountStatus::Stopped
        }
    }
}

/// Position and status as last published by the motor task.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct MotionSnapshot {
    position: AxisPair<i64>,
    status: MountStatus,
}

// ============================================================================
// Mount State
// ============================================================================

/// Thread-safe mount state shared through an `Arc`.
///
/// # Thread Safety
///
/// - One `Mutex` per field group (time, motion snapshot, track buffer), so
///   the motor task's snapshot never waits on a track buffer operation.
/// - Every acquisition gives up after the configured lock timeout and
///   returns [`MountError::LockTimeout`]; callers skip the operation and
///   retry on their next cycle.
/// - A poisoned lock is recovered; the protected data is plain values that
///   stay consistent even if a holder panicked.
pub struct MountState {
    /// Mount time minus local monotonic time, in milliseconds
    time_offset_ms: Mutex<i64>,
    motion: Mutex<MotionSnapshot>,
    track_buffer: Mutex<TrackBuffer>,
    lock_timeout: Duration,
}

impl MountState {
    /// Creates state with an unsynchronized clock and an empty track buffer.
    pub fn new(config: &TaskConfig) -> Self {
        Self {
            time_offset_ms: Mutex::new(0),
            motion: Mutex::new(MotionSnapshot::default()),
            track_buffer: Mutex::new(TrackBuffer::new()),
            lock_timeout: Duration::from_millis(config.lock_timeout_ms as u64),
        }
    }

    fn lock<'a, T>(&self, mutex: &'a Mutex<T>, what: &'static str) -> Result<MutexGuard<'a, T>, MountError> {
        let deadline = Instant::now() + self.lock_timeout;
        loop {
            match mutex.try_lock() {
                Ok(guard) => return Ok(guard),
                Err(TryLockError::Poisoned(poisoned)) => return Ok(poisoned.into_inner()),
                Err(TryLockError::WouldBlock) => {
                    if Instant::now() >= deadline {
                        warn!("{what} lock not acquired within {:?}", self.lock_timeout);
                        return Err(MountError::LockTimeout(what));
                    }
                    std::thread::yield_now();
                }
            }
        }
    }

    // ========================================================================
    // Time
    // ========================================================================

    /// Synchronized mount time at local time `now_us`.
    pub fn time_ms(&self, now_us: i64) -> Result<i64, MountError> {
        let offset = *self.lock(&self.time_offset_ms, "time")?;
        Ok(now_us / 1000 + offset)
    }

    /// Declares that the mount time is `mount_ms` at local time `now_us`.
    pub fn set_time(&self, mount_ms: u64, now_us: i64) -> Result<(), MountError> {
        let mount_ms = i64::try_from(mount_ms).unwrap_or(i64::MAX);
        let mut offset = self.lock(&self.time_offset_ms, "time")?;
        *offset = mount_ms.saturating_sub(now_us / 1000);
        Ok(())
    }

    // ========================================================================
    // Motion Snapshot
    // ========================================================================

    /// Last published axis positions.
    pub fn position(&self) -> Result<AxisPair<i64>, MountError> {
        Ok(self.lock(&self.motion, "position")?.position)
    }

    /// Publishes axis positions.
    pub fn set_position(&self, position: AxisPair<i64>) -> Result<(), MountError> {
        self.lock(&self.motion, "position")?.position = position;
        Ok(())
    }

    /// Last published mount status.
    pub fn status(&self) -> Result<MountStatus, MountError> {
        Ok(self.lock(&self.motion, "position")?.status)
    }

    /// Publishes positions and status under one lock.
    pub fn publish_motion(&self, position: AxisPair<i64>, status: MountStatus) -> Result<(), MountError> {
        let mut motion = self.lock(&self.motion, "position")?;
        motion.position = position;
        motion.status = status;
        Ok(())
    }

    // ========================================================================
    // Track Buffer
    // ========================================================================

    /// Queues a track point.
    pub fn push_track_point(&self, point: TrackPoint) -> Result<PushOutcome, MountError> {
        Ok(self.lock(&self.track_buffer, "track buffer")?.push(point))
    }

    /// Takes the oldest queued track point.
    pub fn pull_track_point(&self) -> Result<Option<TrackPoint>, MountError> {
        Ok(self.lock(&self.track_buffer, "track buffer")?.pull())
    }

    /// Slots still available in the track buffer.
    pub fn track_free_space(&self) -> Result<usize, MountError> {
        Ok(self.lock(&self.track_buffer, "track buffer")?.free_space())
    }

    /// Total track buffer slots.
    pub fn track_capacity(&self) -> Result<usize, MountError> {
        Ok(self.lock(&self.track_buffer, "track buffer")?.capacity())
    }

    /// Drops every queued track point.
    pub fn clear_track_buffer(&self) -> Result<(), MountError> {
        self.lock(&self.track_buffer, "track buffer")?.clear();
        Ok(())
    }
}
