//! Config labels attached to cells.
//!
//! Every layer contributes labels for a cell on top of the labels its
//! underlying layer reported, so the most proximal layer's labels come first.
//! A config registry walks the stack front to back and the first match wins.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::layer::Layer;

/// Region label of the body of a grid.
pub const BODY: &str = "BODY";
/// Region label of the column header of a grid.
pub const COLUMN_HEADER: &str = "COLUMN_HEADER";
/// Region label of the row header of a grid.
pub const ROW_HEADER: &str = "ROW_HEADER";
/// Region label of the corner of a grid.
pub const CORNER: &str = "CORNER";

/// Region label of the frozen top-left block.
pub const FROZEN_REGION: &str = "FROZEN_REGION";
/// Region label of the frozen columns below the frozen block.
pub const FROZEN_COLUMN_REGION: &str = "FROZEN_COLUMN_REGION";
/// Region label of the frozen rows right of the frozen block.
pub const FROZEN_ROW_REGION: &str = "FROZEN_ROW_REGION";
/// Region label of the scrollable part of a frozen body.
pub const NONFROZEN_REGION: &str = "NONFROZEN_REGION";

/// Label of the selection anchor cell.
pub const SELECTION_ANCHOR: &str = "SELECTION_ANCHOR";

/// An ordered set of labels, most proximal first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelStack {
    labels: Vec<String>,
}

impl LabelStack {
    /// Creates an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a stack from labels in precedence order.
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut stack = Self::new();
        for label in labels {
            stack.add_label(label);
        }
        stack
    }

    /// Appends a label below the existing ones. Duplicates are ignored.
    pub fn add_label(&mut self, label: impl Into<String>) {
        let label = label.into();
        if !self.contains(&label) {
            self.labels.push(label);
        }
    }

    /// Puts a label in front of the existing ones. Duplicates are ignored.
    pub fn add_label_on_top(&mut self, label: impl Into<String>) {
        let label = label.into();
        if !self.contains(&label) {
            self.labels.insert(0, label);
        }
    }

    /// Removes a label, returning whether it was present.
    pub fn remove_label(&mut self, label: &str) -> bool {
        let before = self.labels.len();
        self.labels.retain(|l| l != label);
        self.labels.len() != before
    }

    /// Returns `true` if the label is present.
    pub fn contains(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    /// Labels in precedence order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Number of labels.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Returns `true` if there are no labels.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl fmt::Display for LabelStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.labels.join(", "))
    }
}

/// Adds labels for a cell of the layer it is attached to.
pub trait ConfigLabelAccumulator: Send + Sync {
    /// Adds labels for the cell at the given positions of `layer`.
    fn accumulate_config_labels(
        &self,
        layer: &dyn Layer,
        labels: &mut LabelStack,
        column_position: usize,
        row_position: usize,
    );
}

/// Labels whole columns by column index.
#[derive(Default)]
pub struct ColumnOverrideLabelAccumulator {
    overrides: RwLock<HashMap<usize, Vec<String>>>,
}

impl ColumnOverrideLabelAccumulator {
    /// Creates an accumulator without overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers labels for a column index, most proximal first.
    pub fn register_column_override<I, S>(&self, column_index: usize, labels: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut overrides = self.overrides.write();
        let entry = overrides.entry(column_index).or_default();
        for label in labels {
            let label = label.into();
            if !entry.contains(&label) {
                entry.push(label);
            }
        }
    }

    /// Removes every label registered for a column index.
    pub fn unregister_column_override(&self, column_index: usize) {
        self.overrides.write().remove(&column_index);
    }
}

impl ConfigLabelAccumulator for ColumnOverrideLabelAccumulator {
    fn accumulate_config_labels(
        &self,
        layer: &dyn Layer,
        labels: &mut LabelStack,
        column_position: usize,
        _row_position: usize,
    ) {
        let Some(column_index) = layer.column_index_by_position(column_position) else {
            return;
        };
        if let Some(registered) = self.overrides.read().get(&column_index) {
            for label in registered.iter().rev() {
                labels.add_label_on_top(label.clone());
            }
        }
    }
}

/// Runs several accumulators in order; later ones end up more proximal.
#[derive(Default)]
pub struct AggregateLabelAccumulator {
    accumulators: RwLock<Vec<Arc<dyn ConfigLabelAccumulator>>>,
}

impl AggregateLabelAccumulator {
    /// Creates an empty aggregate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an accumulator.
    pub fn add(&self, accumulator: Arc<dyn ConfigLabelAccumulator>) {
        self.accumulators.write().push(accumulator);
    }
}

impl ConfigLabelAccumulator for AggregateLabelAccumulator {
    fn accumulate_config_labels(
        &self,
        layer: &dyn Layer,
        labels: &mut LabelStack,
        column_position: usize,
        row_position: usize,
    ) {
        let accumulators = self.accumulators.read().clone();
        for accumulator in accumulators {
            accumulator.accumulate_config_labels(layer, labels, column_position, row_position);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_on_top_is_proximal_first() {
        let mut stack = LabelStack::from_labels(["BODY"]);
        stack.add_label_on_top("EVEN_ROW");
        stack.add_label_on_top("SELECTION_ANCHOR");
        assert_eq!(stack.labels(), ["SELECTION_ANCHOR", "EVEN_ROW", "BODY"]);
    }

    #[test]
    fn test_duplicates_keep_first_position() {
        let mut stack = LabelStack::new();
        stack.add_label("A");
        stack.add_label("B");
        stack.add_label_on_top("B");
        stack.add_label("A");
        assert_eq!(stack.labels(), ["A", "B"]);
        assert!(stack.remove_label("A"));
        assert!(!stack.remove_label("A"));
        assert_eq!(stack.to_string(), "[B]");
    }
}
