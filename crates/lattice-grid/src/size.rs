//! Per-index pixel sizes along one axis.
//!
//! Sizes are kept sparse: a default size plus explicit overrides keyed by
//! index, so a million default-sized rows cost nothing. Offsets are computed
//! by walking the overrides in index order.

use std::collections::{BTreeMap, HashMap};

/// Column widths or row heights of a data layer.
#[derive(Debug, Clone)]
pub struct SizeConfig {
    default_size: i32,
    sizes: BTreeMap<usize, i32>,
    resizable_by_default: bool,
    resizable: HashMap<usize, bool>,
}

impl SizeConfig {
    /// Creates a config where every index has `default_size` pixels.
    pub fn new(default_size: i32) -> Self {
        Self {
            default_size: default_size.max(1),
            sizes: BTreeMap::new(),
            resizable_by_default: true,
            resizable: HashMap::new(),
        }
    }

    // =========================================================================
    // Sizes
    // =========================================================================

    /// The size used for indices without an override.
    pub fn default_size(&self) -> i32 {
        self.default_size
    }

    /// Sets the size used for indices without an override.
    pub fn set_default_size(&mut self, size: i32) {
        self.default_size = size.max(1);
    }

    /// Size of the given index.
    pub fn size(&self, index: usize) -> i32 {
        self.sizes.get(&index).copied().unwrap_or(self.default_size)
    }

    /// Overrides the size of an index. Negative sizes are stored as 0.
    ///
    /// Returns `true` if the size changed.
    pub fn set_size(&mut self, index: usize, size: i32) -> bool {
        let size = size.max(0);
        if self.size(index) == size {
            return false;
        }
        self.sizes.insert(index, size);
        true
    }

    /// Removes the override of an index.
    pub fn reset_size(&mut self, index: usize) {
        self.sizes.remove(&index);
    }

    /// Sum of the sizes of indices `[0, count)`.
    pub fn aggregate_size(&self, count: usize) -> i32 {
        self.start_of(count)
    }

    /// Pixel offset at which `position` starts (sum of the sizes before it).
    pub fn start_of(&self, position: usize) -> i32 {
        let mut total = self.default_size as i64 * position as i64;
        for (_, size) in self.sizes.range(..position) {
            total += (*size - self.default_size) as i64;
        }
        total.clamp(0, i32::MAX as i64) as i32
    }

    /// The position containing pixel `offset`, among `count` positions.
    pub fn position_at(&self, offset: i32, count: usize) -> Option<usize> {
        if offset < 0 {
            return None;
        }
        let offset = offset as i64;
        let default = self.default_size as i64;
        let mut run_start = 0usize;
        let mut pixels = 0i64;

        for (&index, &size) in self.sizes.range(..count) {
            let run = (index - run_start) as i64 * default;
            if offset < pixels + run {
                return Some(run_start + ((offset - pixels) / default) as usize);
            }
            pixels += run;
            if offset < pixels + size as i64 {
                return Some(index);
            }
            pixels += size as i64;
            run_start = index + 1;
        }

        let run = (count - run_start) as i64 * default;
        (offset < pixels + run).then(|| run_start + ((offset - pixels) / default) as usize)
    }

    // =========================================================================
    // Resizability
    // =========================================================================

    /// Whether the index may be resized.
    pub fn is_resizable(&self, index: usize) -> bool {
        self.resizable
            .get(&index)
            .copied()
            .unwrap_or(self.resizable_by_default)
    }

    /// Sets whether an index may be resized.
    pub fn set_resizable(&mut self, index: usize, resizable: bool) {
        self.resizable.insert(index, resizable);
    }

    /// Sets the resizability of indices without an explicit setting.
    pub fn set_resizable_by_default(&mut self, resizable: bool) {
        self.resizable_by_default = resizable;
    }

    // =========================================================================
    // Structural Changes
    // =========================================================================

    /// Moves overrides up to make room for inserted indices.
    ///
    /// `inserted` holds the new indices, in the frame after the insert.
    pub fn shift_for_insert(&mut self, inserted: &[usize]) {
        let mut inserted = inserted.to_vec();
        inserted.sort_unstable();
        inserted.dedup();
        let remap = |index: usize| {
            let mut index = index;
            for &new in &inserted {
                if index >= new {
                    index += 1;
                }
            }
            index
        };
        self.sizes = std::mem::take(&mut self.sizes)
            .into_iter()
            .map(|(index, size)| (remap(index), size))
            .collect();
        self.resizable = std::mem::take(&mut self.resizable)
            .into_iter()
            .map(|(index, flag)| (remap(index), flag))
            .collect();
    }

    /// Drops overrides of deleted indices and moves later ones down.
    ///
    /// `deleted` holds the removed indices, in the frame before the delete.
    pub fn shift_for_delete(&mut self, deleted: &[usize]) {
        let mut deleted = deleted.to_vec();
        deleted.sort_unstable();
        deleted.dedup();
        let remap = |index: usize| {
            if deleted.binary_search(&index).is_ok() {
                return None;
            }
            Some(index - deleted.partition_point(|&d| d < index))
        };
        self.sizes = std::mem::take(&mut self.sizes)
            .into_iter()
            .filter_map(|(index, size)| remap(index).map(|i| (i, size)))
            .collect();
        self.resizable = std::mem::take(&mut self.resizable)
            .into_iter()
            .filter_map(|(index, flag)| remap(index).map(|i| (i, flag)))
            .collect();
    }
}

impl Default for SizeConfig {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets_with_overrides() {
        let mut sizes = SizeConfig::new(100);
        sizes.set_size(2, 150);
        sizes.set_size(4, 0);

        assert_eq!(sizes.start_of(0), 0);
        assert_eq!(sizes.start_of(2), 200);
        assert_eq!(sizes.start_of(3), 350);
        assert_eq!(sizes.start_of(5), 450);
        assert_eq!(sizes.aggregate_size(6), 550);
    }

    #[test]
    fn test_position_at() {
        let mut sizes = SizeConfig::new(100);
        sizes.set_size(2, 150);
        sizes.set_size(4, 0);

        assert_eq!(sizes.position_at(0, 6), Some(0));
        assert_eq!(sizes.position_at(199, 6), Some(1));
        assert_eq!(sizes.position_at(200, 6), Some(2));
        assert_eq!(sizes.position_at(349, 6), Some(2));
        assert_eq!(sizes.position_at(350, 6), Some(3));
        // Zero-width index 4 is never hit
        assert_eq!(sizes.position_at(450, 6), Some(5));
        assert_eq!(sizes.position_at(550, 6), None);
        assert_eq!(sizes.position_at(-1, 6), None);
    }

    #[test]
    fn test_set_size_reports_change() {
        let mut sizes = SizeConfig::new(20);
        assert!(!sizes.set_size(0, 20));
        assert!(sizes.set_size(0, 30));
        assert!(!sizes.set_size(0, 30));
        sizes.reset_size(0);
        assert_eq!(sizes.size(0), 20);
    }

    #[test]
    fn test_shift_for_insert_and_delete() {
        let mut sizes = SizeConfig::new(10);
        sizes.set_size(1, 11);
        sizes.set_size(3, 33);
        sizes.set_resizable(3, false);

        // a b c d -> X a Y b c d
        sizes.shift_for_insert(&[0, 2]);
        assert_eq!(sizes.size(3), 11);
        assert_eq!(sizes.size(5), 33);
        assert!(!sizes.is_resizable(5));

        sizes.shift_for_delete(&[2, 3]);
        assert_eq!(sizes.size(1), 10);
        assert_eq!(sizes.size(3), 33);
        assert!(!sizes.is_resizable(3));
    }
}
