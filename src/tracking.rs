//! Track points, the track buffer and the tracking scheduler.
//!
//! The external controller precomputes where the mount should be at
//! future instants and streams them as [`TrackPoint`]s. They queue up in
//! a [`TrackBuffer`] until the [`TrackingScheduler`] turns each pair of
//! consecutive points into a [`TrackSegment`] for both motors.
//!
//! # Example
//!
//! ```rust
//! use esp_mount::tracking::{PushOutcome, TrackBuffer, TrackPoint};
//!
//! let mut buffer: TrackBuffer<2> = TrackBuffer::new();
//! assert_eq!(buffer.push(TrackPoint::new(1, 2, 1_000)), PushOutcome::Accepted);
//! assert_eq!(buffer.push(TrackPoint::new(3, 4, 2_000)), PushOutcome::Accepted);
//! assert_eq!(buffer.push(TrackPoint::new(5, 6, 3_000)), PushOutcome::Full);
//!
//! assert_eq!(buffer.pull(), Some(TrackPoint::new(1, 2, 1_000)));
//! assert_eq!(buffer.free_space(), 1);
//! ```

use log::{info, warn};

use crate::axis::{Axis, AxisPair};
use crate::config::TRACK_BUFFER_CAPACITY;
use crate::error::MountError;
use crate::motor::Motor;
use crate::services::MountState;
use crate::traits::StepperPins;

// ============================================================================
// Track Point
// ============================================================================

/// Target position of both axes at an external wall-clock instant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrackPoint {
    /// First axis target in microsteps
    pub ax1: i64,
    /// Second axis target in microsteps
    pub ax2: i64,
    /// Synchronized mount time in milliseconds
    pub timestamp_ms: u64,
}

impl TrackPoint {
    /// Creates a track point.
    pub const fn new(ax1: i64, ax2: i64, timestamp_ms: u64) -> Self {
        Self {
            ax1,
            ax2,
            timestamp_ms,
        }
    }

    /// Target of one axis.
    pub const fn position(&self, axis: Axis) -> i64 {
        match axis {
            Axis::Ax1 => self.ax1,
            Axis::Ax2 => self.ax2,
        }
    }
}

// ============================================================================
// Track Segment
// ============================================================================

/// Time-parameterized move of one axis between two positions.
///
/// The ideal trajectory is the straight line from `start_position` at
/// `start_time_us` to `target_position` at `target_time_us`. Consecutive
/// segments of a constant-rate track join into one line, so the ideal
/// velocity never jumps between them. The axis velocity at the start is
/// kept for diagnostics; the engine's acceleration limit carries it onto
/// the segment rate.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TrackSegment {
    /// Position at `start_time_us`
    pub start_position: i64,
    /// Position at `target_time_us`
    pub target_position: i64,
    /// Local monotonic start time (µs)
    pub start_time_us: i64,
    /// Local monotonic end time (µs)
    pub target_time_us: i64,
    /// Axis velocity when the segment was issued (steps/s)
    pub start_velocity: f32,
}

impl TrackSegment {
    /// Segment duration in seconds; zero for degenerate segments.
    pub fn duration_s(&self) -> f64 {
        let span = self.target_time_us.saturating_sub(self.start_time_us);
        if span <= 0 {
            0.0
        } else {
            span as f64 / 1_000_000.0
        }
    }

    /// Constant velocity that would cover the segment exactly.
    pub fn average_velocity(&self) -> f64 {
        let duration = self.duration_s();
        if duration <= 0.0 {
            return 0.0;
        }
        (self.target_position - self.start_position) as f64 / duration
    }

    fn elapsed_s(&self, now_us: i64) -> f64 {
        let elapsed = now_us.saturating_sub(self.start_time_us).max(0) as f64 / 1_000_000.0;
        elapsed.min(self.duration_s())
    }

    /// Seconds left until the segment ends (never negative).
    pub fn remaining_s(&self, now_us: i64) -> f64 {
        (self.duration_s() - self.elapsed_s(now_us)).max(0.0)
    }

    /// Where the axis should be at `now_us`.
    ///
    /// Clamped to the segment: before the start it is the start position,
    /// after the end (or for a zero-length segment) the target position.
    pub fn ideal_position(&self, now_us: i64) -> f64 {
        if self.duration_s() <= 0.0 || now_us >= self.target_time_us {
            return self.target_position as f64;
        }
        self.start_position as f64 + self.average_velocity() * self.elapsed_s(now_us)
    }
}

// ============================================================================
// Track Buffer
// ============================================================================

/// Result of pushing a track point.
///
/// The discriminant is the code sent in the `+tp` response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PushOutcome {
    /// The point was queued
    Accepted = 0,
    /// Every slot holds an unread point
    Full = 1,
    /// The buffer lock could not be acquired in time
    LockFailed = 2,
}

impl PushOutcome {
    /// Wire code of this outcome.
    pub const fn code(self) -> u8 {
        self as u8
    }
}

/// Fixed-capacity FIFO ring of track points.
///
/// All `N` slots are usable: a push only fails when every slot holds an
/// unread point. Storage lives on the heap so that a 6000-point buffer
/// never passes through a task stack.
#[derive(Debug)]
pub struct TrackBuffer<const N: usize = TRACK_BUFFER_CAPACITY> {
    slots: Box<[TrackPoint]>,
    head: usize,
    tail: usize,
    len: usize,
}

impl<const N: usize> TrackBuffer<N> {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self {
            slots: vec![TrackPoint::default(); N].into_boxed_slice(),
            head: 0,
            tail: 0,
            len: 0,
        }
    }

    /// Appends a point at the head.
    pub fn push(&mut self, point: TrackPoint) -> PushOutcome {
        if self.len == N {
            return PushOutcome::Full;
        }
        self.slots[self.head] = point;
        self.head = (self.head + 1) % N;
        self.len += 1;
        PushOutcome::Accepted
    }

    /// Removes the oldest point.
    pub fn pull(&mut self) -> Option<TrackPoint> {
        if self.len == 0 {
            return None;
        }
        let point = self.slots[self.tail];
        self.tail = (self.tail + 1) % N;
        self.len -= 1;
        Some(point)
    }

    /// Number of unread points.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when no point is queued.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of points that can still be pushed.
    pub fn free_space(&self) -> usize {
        N - self.len
    }

    /// Total number of slots.
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Drops every queued point and rewinds both indices.
    pub fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.len = 0;
    }
}

impl<const N: usize> Default for TrackBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tracking Scheduler
// ============================================================================

/// Feeds consecutive track points to both motors in lockstep.
///
/// Runs inside the motor task's periodic slice. The scheduler holds the
/// point the motors are currently heading for; once the mount clock
/// passes that point's timestamp, it pulls the next one and issues a
/// segment spanning the two.
#[derive(Debug, Default)]
pub struct TrackingScheduler {
    active: bool,
    current: Option<TrackPoint>,
}

impl TrackingScheduler {
    /// Creates an idle scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// True while points are being fed to the motors.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Point the motors are currently heading for.
    pub fn current(&self) -> Option<TrackPoint> {
        self.current
    }

    /// Starts tracking with a goto to the first queued point.
    ///
    /// With an empty buffer both axes get a controlled stop and the
    /// scheduler stays idle.
    pub fn begin<P: StepperPins>(
        &mut self,
        motors: &mut AxisPair<Motor<P>>,
        state: &MountState,
    ) -> Result<(), MountError> {
        match state.pull_track_point()? {
            Some(point) => {
                for (axis, motor) in motors.iter_mut() {
                    motor.goto(point.position(axis));
                }
                self.current = Some(point);
                self.active = true;
                info!(
                    "tracking started at ({}, {}) t={}",
                    point.ax1, point.ax2, point.timestamp_ms
                );
            }
            None => {
                warn!("tracking requested with an empty track buffer");
                for (_, motor) in motors.iter_mut() {
                    motor.stop(false);
                }
                self.current = None;
                self.active = false;
            }
        }
        Ok(())
    }

    /// Stops feeding points. Motors keep their current command.
    pub fn cancel(&mut self) {
        if self.active {
            info!("tracking stopped");
        }
        self.active = false;
        self.current = None;
    }

    /// Advances to the next segment once the current point is due.
    ///
    /// Points whose timestamps have already passed are skipped until the
    /// newest one; the segment then starts at the last skipped point.
    /// When the buffer runs dry the motors hold the last target and the
    /// scheduler goes idle.
    pub fn update<P: StepperPins>(
        &mut self,
        now_us: i64,
        motors: &mut AxisPair<Motor<P>>,
        state: &MountState,
    ) -> Result<(), MountError> {
        if !self.active {
            return Ok(());
        }
        let Some(current) = self.current else {
            self.active = false;
            return Ok(());
        };

        let mount_ms = state.time_ms(now_us)?;
        if !has_passed(current.timestamp_ms, mount_ms) {
            return Ok(());
        }

        let Some(mut next) = state.pull_track_point()? else {
            warn!("track buffer exhausted, holding last target");
            for (axis, motor) in motors.iter_mut() {
                motor.goto(current.position(axis));
            }
            self.cancel();
            return Ok(());
        };

        let mut from = current;
        while has_passed(next.timestamp_ms, mount_ms) {
            match state.pull_track_point() {
                Ok(Some(point)) => {
                    from = next;
                    next = point;
                }
                Ok(None) => break,
                Err(err) => {
                    warn!("stale track point skip interrupted: {err}");
                    break;
                }
            }
        }

        let start_us = to_local_us(from.timestamp_ms, mount_ms, now_us);
        let target_us = to_local_us(next.timestamp_ms, mount_ms, now_us);
        for (axis, motor) in motors.iter_mut() {
            motor.track(from.position(axis), next.position(axis), start_us, target_us);
        }
        self.current = Some(next);
        Ok(())
    }
}

fn has_passed(timestamp_ms: u64, mount_ms: i64) -> bool {
    u64::try_from(mount_ms).is_ok_and(|now| now >= timestamp_ms)
}

/// Converts a mount timestamp to local monotonic time anchored at `now_us`.
fn to_local_us(timestamp_ms: u64, mount_ms: i64, now_us: i64) -> i64 {
    let timestamp = i64::try_from(timestamp_ms).unwrap_or(i64::MAX);
    now_us.saturating_add(timestamp.saturating_sub(mount_ms).saturating_mul(1000))
}

// ============================================================================
// Tests
// ============================================================================
