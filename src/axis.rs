//! Axis identifiers and the two-slot per-axis arena.
//!
//! Everything that exists once per axis (motor engines, positions, CPR
//! values) lives in an [`AxisPair`] indexed by [`Axis`], so there is never
//! any doubt about which slot belongs to which motor.
//!
//! # Example
//!
//! ```rust
//! use esp_mount::axis::{Axis, AxisPair};
//!
//! let mut positions = AxisPair::new(100_i64, -20);
//! positions[Axis::Ax2] += 5;
//!
//! assert_eq!(positions[Axis::Ax1], 100);
//! assert_eq!(positions[Axis::Ax2], -15);
//! assert_eq!(positions.map(|p| p * 2).into_array(), [200, -30]);
//! ```

use core::ops::{Index, IndexMut};

/// One of the two independently driven mount axes.
///
/// On an equatorial mount `Ax1` is right ascension and `Ax2` is
/// declination.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Axis {
    /// First axis (right ascension).
    Ax1 = 0,
    /// Second axis (declination).
    Ax2 = 1,
}

impl Axis {
    /// Both axes in index order.
    pub const ALL: [Axis; 2] = [Axis::Ax1, Axis::Ax2];

    /// Slot index of this axis inside an [`AxisPair`].
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Short name used in log lines.
    pub const fn as_str(self) -> &'static str {
        match self {
            Axis::Ax1 => "ax1",
            Axis::Ax2 => "ax2",
        }
    }
}

/// A value per axis, stored inline as a two-element array.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AxisPair<T> {
    slots: [T; 2],
}

impl<T> AxisPair<T> {
    /// Creates a pair from the first and second axis values.
    pub fn new(ax1: T, ax2: T) -> Self {
        Self { slots: [ax1, ax2] }
    }

    /// Builds a pair by calling `f` once per axis.
    pub fn from_fn(mut f: impl FnMut(Axis) -> T) -> Self {
        Self::new(f(Axis::Ax1), f(Axis::Ax2))
    }

    /// Applies `f` to both slots.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> AxisPair<U> {
        AxisPair {
            slots: self.slots.map(f),
        }
    }

    /// Iterates `(axis, &value)` in axis order.
    pub fn iter(&self) -> impl Iterator<Item = (Axis, &T)> {
        Axis::ALL.into_iter().zip(self.slots.iter())
    }

    /// Iterates `(axis, &mut value)` in axis order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Axis, &mut T)> {
        Axis::ALL.into_iter().zip(self.slots.iter_mut())
    }

    /// Consumes the pair, returning `[ax1, ax2]`.
    pub fn into_array(self) -> [T; 2] {
        self.slots
    }
}

impl<T: Copy> AxisPair<T> {
    /// Creates a pair with the same value on both axes.
    pub fn splat(value: T) -> Self {
        Self::new(value, value)
    }
}

impl<T> Index<Axis> for AxisPair<T> {
    type Output = T;

    fn index(&self, axis: Axis) -> &T {
        &self.slots[axis.index()]
    }
}

impl<T> IndexMut<Axis> for AxisPair<T> {
    fn index_mut(&mut self, axis: Axis) -> &mut T {
        &mut self.slots[axis.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_indices_are_stable() {
        assert_eq!(Axis::Ax1.index(), 0);
        assert_eq!(Axis::Ax2.index(), 1);
        assert_eq!(Axis::ALL, [Axis::Ax1, Axis::Ax2]);
    }

    #[test]
    fn pair_indexing_by_axis() {
        let mut pair = AxisPair::new('a', 'b');
        assert_eq!(pair[Axis::Ax1], 'a');
        pair[Axis::Ax2] = 'z';
        assert_eq!(pair.into_array(), ['a', 'z']);
    }

    #[test]
    fn pair_from_fn_visits_axes_in_order() {
        let mut seen = Vec::new();
        let pair = AxisPair::from_fn(|axis| {
            seen.push(axis);
            axis.index() * 10
        });
        assert_eq!(seen, vec![Axis::Ax1, Axis::Ax2]);
        assert_eq!(pair, AxisPair::new(0, 10));
    }

    #[test]
    fn pair_iter_mut_updates_both() {
        let mut pair = AxisPair::splat(1_i64);
        for (axis, value) in pair.iter_mut() {
            *value += axis.index() as i64;
        }
        assert_eq!(pair, AxisPair::new(1, 2));
    }
}
