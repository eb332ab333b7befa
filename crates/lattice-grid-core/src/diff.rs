//! Structural diffs and the boundary arithmetic built on them.
//!
//! A [`StructuralDiff`] describes how one contiguous run of positions moved
//! across a structural change. Deletions carry the removed range as `before`
//! and an empty range at the same start as `after`; additions are the mirror
//! image. Reorders are expressed as a deletion followed by an addition.
//!
//! Layers that pin a position across changes (frozen boundaries, the
//! viewport origin) update it with [`shift_boundary`].

use std::fmt;

use crate::coordinate::Range;

/// Kind of a structural diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiffType {
    /// Positions were inserted or revealed.
    Add,
    /// Positions were removed or hidden.
    Delete,
    /// Positions kept their place but changed (for example their size).
    Change,
}

/// A single before/after mapping of a run of positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StructuralDiff {
    /// What happened to the run.
    pub diff_type: DiffType,
    /// Positions before the change.
    pub before: Range,
    /// Positions after the change.
    pub after: Range,
}

impl StructuralDiff {
    /// Positions `after` were added; nothing existed there before.
    pub fn add(after: Range) -> Self {
        Self {
            diff_type: DiffType::Add,
            before: Range::empty_at(after.start),
            after,
        }
    }

    /// Positions `before` were removed.
    pub fn delete(before: Range) -> Self {
        Self {
            diff_type: DiffType::Delete,
            before,
            after: Range::empty_at(before.start),
        }
    }

    /// Positions `range` changed in place.
    pub fn change(range: Range) -> Self {
        Self {
            diff_type: DiffType::Change,
            before: range,
            after: range,
        }
    }

    /// The range carrying the positions this diff is about.
    pub fn meaningful_range(&self) -> Range {
        match self.diff_type {
            DiffType::Add => self.after,
            DiffType::Delete | DiffType::Change => self.before,
        }
    }

    /// Signed change in the number of positions.
    pub fn delta(&self) -> isize {
        match self.diff_type {
            DiffType::Add => self.after.len() as isize,
            DiffType::Delete => -(self.before.len() as isize),
            DiffType::Change => 0,
        }
    }
}

impl fmt::Display for StructuralDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {} -> {}", self.diff_type, self.before, self.after)
    }
}

/// Moves a pinned boundary position across a set of diffs.
///
/// Deleted ranges are expressed in the frame before the change, so every
/// DELETE moves the boundary left by the overlap of its range with
/// `[0, boundary)` of the original boundary. Added ranges are expressed in
/// the frame after the change; they are applied in ascending order, each ADD
/// whose range starts strictly before the running boundary moving it right
/// by the added span. CHANGE diffs never move the boundary.
///
/// ```
/// use lattice_grid_core::{shift_boundary, Range, StructuralDiff};
///
/// let diffs = [StructuralDiff::delete(Range::new(2, 4))];
/// assert_eq!(shift_boundary(5, &diffs), 3);
/// ```
pub fn shift_boundary(boundary: usize, diffs: &[StructuralDiff]) -> usize {
    let window = Range::new(0, boundary);
    let removed: usize = diffs
        .iter()
        .filter(|diff| diff.diff_type == DiffType::Delete)
        .filter_map(|diff| diff.before.intersection(&window))
        .map(|overlap| overlap.len())
        .sum();

    let mut added: Vec<Range> = diffs
        .iter()
        .filter(|diff| diff.diff_type == DiffType::Add)
        .map(|diff| diff.after)
        .collect();
    added.sort_unstable();

    let mut shifted = boundary.saturating_sub(removed);
    for range in added {
        if range.start < shifted {
            shifted += range.len();
        }
    }
    shifted
}

/// Total signed change in position count described by `diffs`.
pub fn net_delta(diffs: &[StructuralDiff]) -> isize {
    diffs.iter().map(StructuralDiff::delta).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delete_before_boundary() {
        let diffs = [StructuralDiff::delete(Range::new(2, 4))];
        assert_eq!(shift_boundary(5, &diffs), 3);
    }

    #[test]
    fn test_delete_straddling_boundary_is_clipped() {
        let diffs = [StructuralDiff::delete(Range::new(3, 8))];
        assert_eq!(shift_boundary(5, &diffs), 3);
    }

    #[test]
    fn test_delete_after_boundary_is_ignored() {
        let diffs = [StructuralDiff::delete(Range::new(5, 8))];
        assert_eq!(shift_boundary(5, &diffs), 5);
    }

    #[test]
    fn test_add_before_and_at_boundary() {
        assert_eq!(shift_boundary(5, &[StructuralDiff::add(Range::new(0, 2))]), 7);
        assert_eq!(shift_boundary(5, &[StructuralDiff::add(Range::new(4, 5))]), 6);
        assert_eq!(shift_boundary(5, &[StructuralDiff::add(Range::new(5, 6))]), 5);
    }

    #[test]
    fn test_inserts_in_after_frame() {
        // a b c | d  ->  a X b Y c | d
        let diffs = [
            StructuralDiff::add(Range::new(1, 2)),
            StructuralDiff::add(Range::new(3, 4)),
        ];
        assert_eq!(shift_boundary(3, &diffs), 5);
    }

    #[test]
    fn test_reorder_across_boundary() {
        // Move position 1 out past the boundary: it lands at 6.
        let out = [
            StructuralDiff::delete(Range::new(1, 2)),
            StructuralDiff::add(Range::new(6, 7)),
        ];
        assert_eq!(shift_boundary(5, &out), 4);

        // Move position 6 to the front.
        let into = [
            StructuralDiff::delete(Range::new(6, 7)),
            StructuralDiff::add(Range::new(0, 1)),
        ];
        assert_eq!(shift_boundary(5, &into), 6);

        // Move inside the frozen block.
        let within = [
            StructuralDiff::delete(Range::new(1, 2)),
            StructuralDiff::add(Range::new(2, 3)),
        ];
        assert_eq!(shift_boundary(5, &within), 5);
    }

    #[test]
    fn test_change_does_not_move_boundary() {
        let diffs = [StructuralDiff::change(Range::new(0, 3))];
        assert_eq!(shift_boundary(5, &diffs), 5);
        assert_eq!(net_delta(&diffs), 0);
    }

    #[test]
    fn test_diff_shapes() {
        let add = StructuralDiff::add(Range::new(3, 5));
        assert_eq!(add.before, Range::empty_at(3));
        assert_eq!(add.meaningful_range(), Range::new(3, 5));
        assert_eq!(add.delta(), 2);

        let delete = StructuralDiff::delete(Range::new(3, 5));
        assert_eq!(delete.after, Range::empty_at(3));
        assert_eq!(delete.delta(), -2);
    }
}
