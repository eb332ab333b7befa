//! Coordinate primitives shared by every layer.
//!
//! Positions are dense, 0-based coordinates local to one layer. A [`Range`]
//! is a half-open run of positions, a [`Rectangle`] a 2D block of them, and a
//! [`PositionCoordinate`] pins a single cell to the frame of a specific layer.
//!
//! # Example
//!
//! ```
//! use lattice_grid_core::Range;
//!
//! let visible = Range::new(2, 8);
//! assert!(visible.contains(5));
//! assert_eq!(visible.intersection(&Range::new(6, 12)), Some(Range::new(6, 8)));
//!
//! let runs = lattice_grid_core::ranges_from_positions([4, 1, 2, 7, 3]);
//! assert_eq!(runs, vec![Range::new(1, 5), Range::new(7, 8)]);
//! ```

use std::fmt;
use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{GridError, Result};

/// Orientation of an axis of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    /// Columns (x axis).
    Horizontal,
    /// Rows (y axis).
    Vertical,
}

impl Orientation {
    /// Returns the other axis.
    pub fn flip(self) -> Self {
        match self {
            Self::Horizontal => Self::Vertical,
            Self::Vertical => Self::Horizontal,
        }
    }
}

/// Unique identity of a layer instance.
///
/// Events and coordinates carry a `LayerId` to name the frame their positions
/// are currently expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(NonZeroU64);

static NEXT_LAYER_ID: AtomicU64 = AtomicU64::new(1);

impl LayerId {
    /// Allocates a fresh identifier.
    pub fn next() -> Self {
        let raw = NEXT_LAYER_ID.fetch_add(1, Ordering::Relaxed);
        // The counter starts at 1 and would need 2^64 layers to wrap.
        Self(NonZeroU64::new(raw).unwrap_or(NonZeroU64::MIN))
    }

    /// Returns the raw value of this identifier.
    pub fn as_u64(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "layer#{}", self.0)
    }
}

/// A half-open interval of positions `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Range {
    /// First position in the range.
    pub start: usize,
    /// One past the last position in the range.
    pub end: usize,
}

impl Range {
    /// Creates a range, clamping an inverted interval to an empty range at `start`.
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    /// Creates a range, rejecting `start > end`.
    pub fn try_new(start: usize, end: usize) -> Result<Self> {
        if start > end {
            return Err(GridError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Creates a range covering a single position.
    pub fn single(position: usize) -> Self {
        Self {
            start: position,
            end: position + 1,
        }
    }

    /// Creates an empty range anchored at `position`.
    pub fn empty_at(position: usize) -> Self {
        Self {
            start: position,
            end: position,
        }
    }

    /// Number of positions covered.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Returns `true` if the range covers no position.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Returns `true` if `position` lies inside the range.
    pub fn contains(&self, position: usize) -> bool {
        position >= self.start && position < self.end
    }

    /// Returns `true` if `other` lies entirely inside this range.
    pub fn contains_range(&self, other: &Range) -> bool {
        other.start >= self.start && other.end <= self.end
    }

    /// Returns `true` if the two ranges share at least one position.
    pub fn overlaps(&self, other: &Range) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Returns the positions shared by both ranges.
    pub fn intersection(&self, other: &Range) -> Option<Range> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start < end).then_some(Range { start, end })
    }

    /// Returns this range moved by `delta` positions, or `None` if it would
    /// move below position 0.
    pub fn shifted(&self, delta: isize) -> Option<Range> {
        let start = self.start.checked_add_signed(delta)?;
        let end = self.end.checked_add_signed(delta)?;
        Some(Range { start, end })
    }

    /// Removes `other` from this range, returning the zero, one or two
    /// remaining pieces in ascending order.
    pub fn subtract(&self, other: &Range) -> Vec<Range> {
        if !self.overlaps(other) {
            return if self.is_empty() { Vec::new() } else { vec![*self] };
        }
        let mut pieces = Vec::with_capacity(2);
        if self.start < other.start {
            pieces.push(Range::new(self.start, other.start));
        }
        if other.end < self.end {
            pieces.push(Range::new(other.end, self.end));
        }
        pieces
    }

    /// Iterates over the positions of the range.
    pub fn positions(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }

    /// Sorts the ranges and merges overlapping or touching neighbours,
    /// dropping empty ones.
    pub fn normalize(ranges: impl IntoIterator<Item = Range>) -> Vec<Range> {
        let mut sorted: Vec<Range> = ranges.into_iter().filter(|r| !r.is_empty()).collect();
        sorted.sort_unstable();

        let mut merged: Vec<Range> = Vec::with_capacity(sorted.len());
        for range in sorted {
            match merged.last_mut() {
                Some(last) if range.start <= last.end => last.end = last.end.max(range.end),
                _ => merged.push(range),
            }
        }
        merged
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

impl From<std::ops::Range<usize>> for Range {
    fn from(range: std::ops::Range<usize>) -> Self {
        Range::new(range.start, range.end)
    }
}

/// Groups positions into sorted, contiguous ranges. Duplicates are ignored.
pub fn ranges_from_positions(positions: impl IntoIterator<Item = usize>) -> Vec<Range> {
    let mut sorted: Vec<usize> = positions.into_iter().collect();
    sorted.sort_unstable();
    sorted.dedup();

    let mut ranges: Vec<Range> = Vec::new();
    for position in sorted {
        match ranges.last_mut() {
            Some(last) if last.end == position => last.end += 1,
            _ => ranges.push(Range::single(position)),
        }
    }
    ranges
}

/// A rectangular block of cell positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rectangle {
    /// First column position.
    pub x: usize,
    /// First row position.
    pub y: usize,
    /// Number of columns.
    pub width: usize,
    /// Number of rows.
    pub height: usize,
}

impl Rectangle {
    /// Creates a rectangle.
    pub fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The column positions covered.
    pub fn columns(&self) -> Range {
        Range::new(self.x, self.x + self.width)
    }

    /// The row positions covered.
    pub fn rows(&self) -> Range {
        Range::new(self.y, self.y + self.height)
    }

    /// Returns `true` if the rectangle covers no cell.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Returns `true` if the cell lies inside the rectangle.
    pub fn contains(&self, column_position: usize, row_position: usize) -> bool {
        self.columns().contains(column_position) && self.rows().contains(row_position)
    }

    /// Returns the overlapping block, if any.
    pub fn intersection(&self, other: &Rectangle) -> Option<Rectangle> {
        let columns = self.columns().intersection(&other.columns())?;
        let rows = self.rows().intersection(&other.rows())?;
        Some(Rectangle::new(
            columns.start,
            rows.start,
            columns.len(),
            rows.len(),
        ))
    }
}

/// A cell coordinate expressed in the frame of a particular layer.
///
/// Fields are public and mutated in place by layers that keep a coordinate
/// pinned across structural changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PositionCoordinate {
    /// The layer whose frame the positions belong to.
    pub layer: LayerId,
    /// Column position in that layer.
    pub column_position: usize,
    /// Row position in that layer.
    pub row_position: usize,
}

impl PositionCoordinate {
    /// Creates a coordinate.
    pub fn new(layer: LayerId, column_position: usize, row_position: usize) -> Self {
        Self {
            layer,
            column_position,
            row_position,
        }
    }

    /// Returns the position along `orientation`.
    pub fn position(&self, orientation: Orientation) -> usize {
        match orientation {
            Orientation::Horizontal => self.column_position,
            Orientation::Vertical => self.row_position,
        }
    }

    /// Sets the position along `orientation`.
    pub fn set_position(&mut self, orientation: Orientation, position: usize) {
        match orientation {
            Orientation::Horizontal => self.column_position = position,
            Orientation::Vertical => self.row_position = position,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_clamps_inverted_bounds() {
        let range = Range::new(5, 2);
        assert!(range.is_empty());
        assert_eq!(range.start, 5);
        assert!(Range::try_new(5, 2).is_err());
        assert_eq!(Range::try_new(2, 5).unwrap(), Range::new(2, 5));
    }

    #[test]
    fn test_range_containment_and_overlap() {
        let range = Range::new(2, 6);
        assert!(range.contains(2));
        assert!(!range.contains(6));
        assert!(range.contains_range(&Range::new(3, 6)));
        assert!(!range.contains_range(&Range::new(3, 7)));
        assert!(range.overlaps(&Range::new(5, 9)));
        assert!(!range.overlaps(&Range::new(6, 9)));
        assert_eq!(range.intersection(&Range::new(6, 9)), None);
    }

    #[test]
    fn test_range_shift() {
        assert_eq!(Range::new(2, 4).shifted(3), Some(Range::new(5, 7)));
        assert_eq!(Range::new(2, 4).shifted(-2), Some(Range::new(0, 2)));
        assert_eq!(Range::new(2, 4).shifted(-3), None);
    }

    #[test]
    fn test_range_subtract() {
        let range = Range::new(0, 10);
        assert_eq!(
            range.subtract(&Range::new(3, 5)),
            vec![Range::new(0, 3), Range::new(5, 10)]
        );
        assert_eq!(range.subtract(&Range::new(0, 4)), vec![Range::new(4, 10)]);
        assert!(range.subtract(&Range::new(0, 12)).is_empty());
        assert_eq!(range.subtract(&Range::new(12, 14)), vec![range]);
    }

    #[test]
    fn test_normalize_merges_touching_ranges() {
        let merged = Range::normalize([
            Range::new(8, 9),
            Range::new(0, 2),
            Range::new(2, 4),
            Range::new(3, 5),
            Range::new(7, 7),
        ]);
        assert_eq!(merged, vec![Range::new(0, 5), Range::new(8, 9)]);
    }

    #[test]
    fn test_ranges_from_positions() {
        assert_eq!(
            ranges_from_positions([9, 3, 4, 3, 0]),
            vec![Range::new(0, 1), Range::new(3, 5), Range::new(9, 10)]
        );
        assert!(ranges_from_positions(std::iter::empty()).is_empty());
    }

    #[test]
    fn test_rectangle_intersection() {
        let a = Rectangle::new(0, 0, 4, 4);
        let b = Rectangle::new(2, 3, 5, 5);
        assert_eq!(a.intersection(&b), Some(Rectangle::new(2, 3, 2, 1)));
        assert!(a.contains(3, 3));
        assert!(!a.contains(4, 0));
    }

    #[test]
    fn test_layer_ids_are_unique() {
        let a = LayerId::next();
        let b = LayerId::next();
        assert_ne!(a, b);
        assert!(b.as_u64() > a.as_u64());
    }
}
