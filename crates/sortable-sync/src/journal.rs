//! Move journal.
//!
//! Records every handled drop for diagnostics and replay reports.

use serde::Serialize;

use crate::collection::CollectionId;
use crate::hooks::MoveDescriptor;

/// How a drop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveOutcome {
    Moved,
    /// Dropped back at its own position.
    Unchanged,
    Vetoed,
    /// Aborted by a reconciliation failure.
    Failed,
}

/// A recorded move
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoveRecord<T> {
    pub sequence: u64,
    pub item: T,
    pub source: CollectionId,
    pub source_index: usize,
    pub target: CollectionId,
    pub target_index: usize,
    pub outcome: MoveOutcome,
}

/// The move journal. Recording is off until [`MoveJournal::enable`].
pub struct MoveJournal<T> {
    entries: Vec<MoveRecord<T>>,
    next_sequence: u64,
    enabled: bool,
}

impl<T> Default for MoveJournal<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            next_sequence: 0,
            enabled: false,
        }
    }
}

impl<T: Clone + PartialEq + 'static> MoveJournal<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn record(&mut self, descriptor: &MoveDescriptor<T>, outcome: MoveOutcome) {
        if !self.enabled {
            return;
        }
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.entries.push(MoveRecord {
            sequence,
            item: descriptor.item.clone(),
            source: descriptor.source.id(),
            source_index: descriptor.source_index,
            target: descriptor.target.id(),
            target_index: descriptor.target_index,
            outcome,
        });
    }

    pub fn entries(&self) -> &[MoveRecord<T>] {
        &self.entries
    }

    pub fn entries_with(&self, outcome: MoveOutcome) -> Vec<&MoveRecord<T>> {
        self.entries.iter().filter(|e| e.outcome == outcome).collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::ObservableList;

    fn descriptor() -> MoveDescriptor<u32> {
        let a = ObservableList::from_vec(vec![1, 2]);
        let b = ObservableList::from_vec(vec![]);
        MoveDescriptor {
            item: 2,
            source: a,
            source_index: 1,
            target: b,
            target_index: 0,
        }
    }

    #[test]
    fn disabled_journal_records_nothing() {
        let mut journal = MoveJournal::new();
        journal.record(&descriptor(), MoveOutcome::Moved);
        assert!(journal.entries().is_empty());
    }

    #[test]
    fn records_in_sequence() {
        let mut journal = MoveJournal::new();
        journal.enable();
        journal.record(&descriptor(), MoveOutcome::Vetoed);
        journal.record(&descriptor(), MoveOutcome::Moved);

        let entries = journal.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].sequence, 0);
        assert_eq!(entries[1].sequence, 1);
        assert_eq!(entries[1].item, 2);
        assert_eq!(journal.entries_with(MoveOutcome::Vetoed).len(), 1);

        journal.clear();
        assert!(journal.entries().is_empty());
    }

    #[test]
    fn serializes_outcome_in_snake_case() {
        let mut journal = MoveJournal::new();
        journal.enable();
        journal.record(&descriptor(), MoveOutcome::Unchanged);

        let json = serde_json::to_value(&journal.entries()[0]).unwrap();
        assert_eq!(json["outcome"], "unchanged");
        assert_eq!(json["target_index"], 0);
    }
}
