//! Column groups and reorder validation against unbreakable groups.
//!
//! The reorder layer performs any structurally valid move. Keeping groups in
//! one piece is the job of [`ColumnGroupReorderLayer`], which sits above it and
//! consumes reorder commands that would break an unbreakable group.

use std::collections::BTreeSet;
use std::sync::{Arc, Weak};

use lattice_grid_core::Orientation;
use lattice_grid_core::logging::targets;
use parking_lot::RwLock;

use super::reorder::{shift_for_delete, shift_for_insert};
use super::{Layer, LayerBase, LayerListener, forward_command, propagate_converted};
use crate::command::LayerCommand;
use crate::event::{LayerEvent, StructuralKind};

/// A named set of column indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnGroup {
    name: String,
    members: BTreeSet<usize>,
    unbreakable: bool,
}

impl ColumnGroup {
    /// Name of the group.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Member column indices, ascending.
    pub fn members(&self) -> impl Iterator<Item = usize> + '_ {
        self.members.iter().copied()
    }

    /// Whether the column index belongs to the group.
    pub fn contains(&self, column_index: usize) -> bool {
        self.members.contains(&column_index)
    }

    /// Whether reorders may split the group.
    pub fn is_unbreakable(&self) -> bool {
        self.unbreakable
    }
}

/// Column groups of a grid. A column index belongs to at most one group.
#[derive(Debug, Default)]
pub struct ColumnGroupModel {
    groups: RwLock<Vec<ColumnGroup>>,
}

impl ColumnGroupModel {
    /// Creates an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a group; indices already grouped elsewhere are moved into it.
    pub fn add_group(&self, name: impl Into<String>, column_indices: &[usize], unbreakable: bool) {
        let name = name.into();
        let members: BTreeSet<usize> = column_indices.iter().copied().collect();
        let mut groups = self.groups.write();
        for group in groups.iter_mut() {
            group.members.retain(|index| !members.contains(index));
        }
        groups.retain(|group| group.name != name && !group.members.is_empty());
        groups.push(ColumnGroup {
            name,
            members,
            unbreakable,
        });
    }

    /// Removes a group by name.
    pub fn remove_group(&self, name: &str) -> bool {
        let mut groups = self.groups.write();
        let before = groups.len();
        groups.retain(|group| group.name != name);
        groups.len() != before
    }

    /// Marks a group breakable or unbreakable.
    pub fn set_unbreakable(&self, name: &str, unbreakable: bool) {
        if let Some(group) = self.groups.write().iter_mut().find(|g| g.name == name) {
            group.unbreakable = unbreakable;
        }
    }

    /// The group a column index belongs to.
    pub fn group_of(&self, column_index: usize) -> Option<ColumnGroup> {
        self.groups
            .read()
            .iter()
            .find(|group| group.contains(column_index))
            .cloned()
    }

    /// Whether the column index belongs to an unbreakable group.
    pub fn is_part_of_unbreakable_group(&self, column_index: usize) -> bool {
        self.group_of(column_index)
            .is_some_and(|group| group.is_unbreakable())
    }

    /// All groups.
    pub fn groups(&self) -> Vec<ColumnGroup> {
        self.groups.read().clone()
    }

    fn columns_deleted(&self, deleted: &[usize]) {
        let mut groups = self.groups.write();
        for group in groups.iter_mut() {
            group.members = group
                .members
                .iter()
                .filter_map(|index| shift_for_delete(*index, deleted))
                .collect();
        }
        groups.retain(|group| !group.members.is_empty());
    }

    fn columns_inserted(&self, inserted: &[usize]) {
        for group in self.groups.write().iter_mut() {
            group.members = group
                .members
                .iter()
                .map(|index| shift_for_insert(*index, inserted))
                .collect();
        }
    }
}

/// Rejects column reorders that would break an unbreakable group.
///
/// Positions pass through unchanged; place it directly above the reorder
/// layer so both share a frame.
pub struct ColumnGroupReorderLayer {
    base: LayerBase,
    underlying: Arc<dyn Layer>,
    model: Arc<ColumnGroupModel>,
}

impl ColumnGroupReorderLayer {
    /// Wraps `underlying`, validating against `model`.
    pub fn new(underlying: Arc<dyn Layer>, model: Arc<ColumnGroupModel>) -> Arc<Self> {
        Arc::new_cyclic(|this: &Weak<Self>| {
            underlying.add_layer_listener(this.clone());
            Self {
                base: LayerBase::new(this.clone()),
                underlying,
                model,
            }
        })
    }

    /// The group model.
    pub fn model(&self) -> &Arc<ColumnGroupModel> {
        &self.model
    }

    /// Whether moving `from_positions` into the gap before `to_position` keeps
    /// every unbreakable group in one piece.
    pub fn is_valid_reorder(&self, from_positions: &[usize], to_position: usize) -> bool {
        let moved: BTreeSet<usize> = from_positions
            .iter()
            .filter_map(|p| self.column_index_by_position(*p))
            .collect();

        for group in self.model.groups().iter().filter(|g| g.is_unbreakable()) {
            let positions: Vec<usize> = group
                .members()
                .filter_map(|index| self.column_position_by_index(index))
                .collect();
            let (Some(first), Some(last)) = (positions.iter().min(), positions.iter().max()) else {
                continue;
            };

            let moved_members = moved.iter().filter(|index| group.contains(**index)).count();
            let only_members_moved = moved_members == moved.len();
            let target_in_span = *first <= to_position && to_position <= last + 1;

            // Splitting off some members is only fine when shuffling inside the group.
            if moved_members > 0 && moved_members < positions.len() && !(only_members_moved && target_in_span) {
                return false;
            }
            // Foreign columns must not be dropped between two members.
            if !only_members_moved && *first < to_position && to_position <= *last {
                return false;
            }
        }
        true
    }

    fn validate(&self, command: &LayerCommand) -> bool {
        let Some(local) = command.convert_to_target_layer(self) else {
            return true;
        };
        let (from_positions, to_position) = match local {
            LayerCommand::ReorderColumn {
                from_position,
                to_position,
                ..
            } => (vec![from_position], to_position),
            LayerCommand::MultiReorderColumns {
                from_positions,
                to_position,
                ..
            } => (from_positions, to_position),
            _ => return true,
        };
        let valid = self.is_valid_reorder(&from_positions, to_position);
        if !valid {
            tracing::debug!(
                target: targets::LAYER,
                ?from_positions,
                to_position,
                "reorder rejected: it would break an unbreakable column group"
            );
        }
        valid
    }
}

impl LayerListener for ColumnGroupReorderLayer {
    fn handle_layer_event(&self, event: &LayerEvent) {
        if let LayerEvent::Structural(structural) = event
            && structural.orientation == Orientation::Horizontal
        {
            let mut indices = structural.indices.clone();
            indices.sort_unstable();
            indices.dedup();
            match structural.kind {
                StructuralKind::Delete => self.model.columns_deleted(&indices),
                StructuralKind::Insert => self.model.columns_inserted(&indices),
                _ => {}
            }
        }
        propagate_converted(self, event);
    }
}

impl Layer for ColumnGroupReorderLayer {
    fn base(&self) -> &LayerBase {
        &self.base
    }

    fn underlying(&self) -> Option<&Arc<dyn Layer>> {
        Some(&self.underlying)
    }

    fn do_command(&self, command: &LayerCommand) -> bool {
        match command {
            LayerCommand::ReorderColumn { .. } | LayerCommand::MultiReorderColumns { .. }
                if !self.validate(command) =>
            {
                true
            }
            _ => forward_command(self, command),
        }
    }
}

static_assertions::assert_impl_all!(ColumnGroupReorderLayer: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DummyDataProvider;
    use crate::layer::{DataLayer, ReorderLayer, axis};

    fn stack() -> (Arc<ReorderLayer>, Arc<ColumnGroupReorderLayer>) {
        let data = DataLayer::new(Arc::new(DummyDataProvider::new(8, 2)), 100, 20);
        let reorder = ReorderLayer::new(data);
        let model = Arc::new(ColumnGroupModel::new());
        model.add_group("Address", &[2, 3, 4], true);
        model.add_group("Loose", &[6, 7], false);
        let groups = ColumnGroupReorderLayer::new(reorder.clone(), model);
        (reorder, groups)
    }

    fn reorder(layer: &Arc<ColumnGroupReorderLayer>, from: usize, to: usize) -> bool {
        let origin: Arc<dyn Layer> = layer.clone();
        layer.do_command(&LayerCommand::ReorderColumn {
            layer: origin,
            from_position: from,
            to_position: to,
        })
    }

    #[test]
    fn test_splitting_unbreakable_group_is_rejected() {
        let (reorder_layer, layer) = stack();
        assert!(reorder(&layer, 3, 0));
        assert_eq!(reorder_layer.column_index_order(), (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn test_moving_inside_group_is_allowed() {
        let (reorder_layer, layer) = stack();
        assert!(reorder(&layer, 2, 5));
        assert_eq!(reorder_layer.column_index_order(), vec![0, 1, 3, 4, 2, 5, 6, 7]);
    }

    #[test]
    fn test_dropping_foreign_column_inside_group_is_rejected() {
        let (reorder_layer, layer) = stack();
        assert!(!layer.is_valid_reorder(&[0], 3));
        assert!(layer.is_valid_reorder(&[0], 2));
        assert!(layer.is_valid_reorder(&[0], 5));
        reorder(&layer, 0, 3);
        assert_eq!(reorder_layer.column_index_order(), (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn test_whole_group_moves_together() {
        let (reorder_layer, layer) = stack();
        let origin: Arc<dyn Layer> = layer.clone();
        assert!(layer.do_command(&LayerCommand::MultiReorderColumns {
            layer: origin,
            from_positions: vec![2, 3, 4],
            to_position: 0,
        }));
        assert_eq!(
            axis::indices(reorder_layer.as_ref(), Orientation::Horizontal),
            vec![2, 3, 4, 0, 1, 5, 6, 7]
        );
    }

    #[test]
    fn test_breakable_group_may_split() {
        let (reorder_layer, layer) = stack();
        reorder(&layer, 7, 0);
        assert_eq!(reorder_layer.column_index_order()[0], 7);
    }

    #[test]
    fn test_model_tracks_deletes() {
        let model = ColumnGroupModel::new();
        model.add_group("A", &[1, 2], true);
        model.add_group("B", &[2, 5], false);
        assert_eq!(model.group_of(2).map(|g| g.name().to_string()), Some("B".to_string()));

        model.columns_deleted(&[0, 1]);
        assert!(model.group_of(0).is_some_and(|g| g.name() == "B"));
        assert!(model.group_of(3).is_some());
        assert_eq!(model.groups().len(), 1);
        assert!(!model.is_part_of_unbreakable_group(3));
    }
}
