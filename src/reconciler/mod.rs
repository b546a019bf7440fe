use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::loader::{Artwork, RecordId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Unselected,
    ManuallySelected,
    BulkSelected,
    BulkExcluded,
}

impl RecordStatus {
    pub fn is_selected(self) -> bool {
        matches!(self, Self::ManuallySelected | Self::BulkSelected)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SelectedRecord {
    pub record: Artwork,
    pub position: usize,
}

// selected = manual entry, or inside the bulk window and not excluded
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SelectionState {
    selected_by_id: HashMap<RecordId, SelectedRecord>,
    bulk_target: usize,
    // id -> global position at the time of exclusion
    bulk_exclusions: HashMap<RecordId, usize>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bulk_target(&self) -> usize {
        self.bulk_target
    }

    pub fn is_bulk_governed(&self, position: usize) -> bool {
        position < self.bulk_target
    }

    pub fn is_manually_selected(&self, id: RecordId) -> bool {
        self.selected_by_id.contains_key(&id)
    }

    pub fn is_excluded(&self, id: RecordId) -> bool {
        self.bulk_exclusions.contains_key(&id)
    }

    pub fn manual_count(&self) -> usize {
        self.selected_by_id.len()
    }

    pub fn bulk_exclusions(&self) -> HashSet<RecordId> {
        self.bulk_exclusions.keys().copied().collect()
    }

    pub fn manual_selections(&self) -> Vec<&SelectedRecord> {
        let mut out: Vec<&SelectedRecord> = self.selected_by_id.values().collect();
        out.sort_by_key(|s| (s.position, s.record.id));
        out
    }

    pub fn is_selected(&self, id: RecordId, position: usize) -> bool {
        self.status_of(id, position).is_selected()
    }

    pub fn status_of(&self, id: RecordId, position: usize) -> RecordStatus {
        if self.selected_by_id.contains_key(&id) {
            return RecordStatus::ManuallySelected;
        }
        if !self.is_bulk_governed(position) {
            return RecordStatus::Unselected;
        }
        if self.bulk_exclusions.contains_key(&id) {
            RecordStatus::BulkExcluded
        } else {
            RecordStatus::BulkSelected
        }
    }

    pub fn compute_visible_selection(
        &self,
        page: &[Artwork],
        page_global_start_index: usize,
    ) -> HashSet<RecordId> {
        page.iter()
            .enumerate()
            .filter(|(i, record)| self.is_selected(record.id, page_global_start_index + i))
            .map(|(_, record)| record.id)
            .collect()
    }

    pub fn apply_row_edits(
        &mut self,
        new_selected_ids: &HashSet<RecordId>,
        page: &[Artwork],
        page_global_start_index: usize,
    ) -> bool {
        let mut changed = false;
        for (i, record) in page.iter().enumerate() {
            let position = page_global_start_index + i;
            let wants_selected = new_selected_ids.contains(&record.id);
            if self.is_bulk_governed(position) {
                if wants_selected {
                    changed |= self.bulk_exclusions.remove(&record.id).is_some();
                    changed |= self.upsert(record, position);
                } else {
                    changed |= self.bulk_exclusions.insert(record.id, position).is_none();
                    changed |= self.selected_by_id.remove(&record.id).is_some();
                }
            } else if wants_selected {
                changed |= self.bulk_exclusions.remove(&record.id).is_some();
                changed |= self.upsert(record, position);
            } else {
                changed |= self.selected_by_id.remove(&record.id).is_some();
            }
        }
        changed
    }

    // exclusions beyond a shrunken window are kept; they are inert until the
    // window grows back over them
    pub fn apply_bulk_select(&mut self, n: usize) -> bool {
        let changed = self.bulk_target != n;
        self.bulk_target = n;
        changed
    }

    pub fn selected_count(&self, total: usize) -> usize {
        let window = self.bulk_target.min(total);
        let excluded = self
            .bulk_exclusions
            .values()
            .filter(|position| **position < window)
            .count();
        let manual_outside = self
            .selected_by_id
            .values()
            .filter(|s| s.position >= window)
            .count();
        window.saturating_sub(excluded) + manual_outside
    }

    pub fn clear(&mut self) -> bool {
        let changed = *self != Self::default();
        *self = Self::default();
        changed
    }

    fn upsert(&mut self, record: &Artwork, position: usize) -> bool {
        let entry = SelectedRecord {
            record: record.clone(),
            position,
        };
        match self.selected_by_id.insert(record.id, entry.clone()) {
            Some(previous) => previous != entry,
            None => true,
        }
    }
}
