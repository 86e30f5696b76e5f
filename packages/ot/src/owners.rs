//! # Owner Table
//!
//! Side table mapping each log index to the region that encloses it.
//!
//! Ownership is derived from the marker structure of the log and recomputed
//! whenever the log changes shape (a session finishes, a solution is spliced
//! in, the log is cut). Operations themselves are never tagged.
//!
//! The table also remembers which exercises the viewer has already solved,
//! keyed by exercise id so it survives recomputation.

use crate::operation::{ExerciseId, OpKind, Operation};
use serde::Serialize;
use std::collections::BTreeSet;

/// Region enclosing one operation. Markers own nothing themselves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Owner {
    pub exercise: Option<ExerciseId>,
    pub assert: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnerTable {
    owners: Vec<Owner>,
    solved: BTreeSet<ExerciseId>,
}

impl OwnerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ops(ops: &[Operation]) -> Self {
        let mut table = Self::new();
        table.refresh(ops);
        table
    }

    /// Recompute ownership for `ops`, keeping the solved set
    pub fn refresh(&mut self, ops: &[Operation]) {
        let mut exercise = None;
        let mut in_assert = false;

        self.owners.clear();
        self.owners.reserve(ops.len());

        for op in ops {
            let mut owner = Owner::default();

            match op.kind() {
                OpKind::Exercise { ex_id } => {
                    exercise = match exercise {
                        None => Some(*ex_id),
                        Some(_) => None,
                    };
                }
                _ => owner.exercise = exercise,
            }

            match op.kind() {
                OpKind::Assert { .. } => in_assert = !in_assert,
                _ => owner.assert = in_assert,
            }

            self.owners.push(owner);
        }
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    pub fn owner(&self, index: usize) -> Owner {
        self.owners.get(index).copied().unwrap_or_default()
    }

    pub fn exercise_of(&self, index: usize) -> Option<ExerciseId> {
        self.owner(index).exercise
    }

    pub fn is_assert(&self, index: usize) -> bool {
        self.owner(index).assert
    }

    pub fn mark_solved(&mut self, ex_id: ExerciseId) {
        self.solved.insert(ex_id);
    }

    pub fn is_solved(&self, ex_id: ExerciseId) -> bool {
        self.solved.contains(&ex_id)
    }

    pub fn solved(&self) -> impl Iterator<Item = ExerciseId> + '_ {
        self.solved.iter().copied()
    }

    /// True if `op` is the start or end marker of an exercise not solved yet
    pub fn is_unsolved_marker(&self, op: &Operation) -> bool {
        match op.kind() {
            OpKind::Exercise { ex_id } => !self.is_solved(*ex_id),
            _ => false,
        }
    }

    /// Region the operation at `index` belongs to. Markers belong to the
    /// region they open or close.
    pub fn segment_kind(&self, index: usize, op: &Operation) -> SegmentKind {
        match op.kind() {
            OpKind::Exercise { ex_id } => SegmentKind::Exercise(*ex_id),
            OpKind::Assert { .. } => SegmentKind::Assert,
            _ => {
                let owner = self.owner(index);
                match (owner.exercise, owner.assert) {
                    (Some(ex_id), _) => SegmentKind::Exercise(ex_id),
                    (None, true) => SegmentKind::Assert,
                    (None, false) => SegmentKind::Text,
                }
            }
        }
    }

    /// Maximal runs of consecutive operations belonging to the same region
    pub fn segments(&self, ops: &[Operation]) -> Vec<Segment> {
        let mut segments: Vec<Segment> = Vec::new();

        for (index, op) in ops.iter().enumerate() {
            let kind = self.segment_kind(index, op);

            match segments.last_mut() {
                Some(last) if last.kind == kind => {
                    last.end_index = index + 1;
                    last.end_ts = op.ts();
                }
                _ => segments.push(Segment {
                    kind,
                    start_index: index,
                    end_index: index + 1,
                    start_ts: op.ts(),
                    end_ts: op.ts(),
                }),
            }
        }

        segments
    }
}

/// Region kind of a [`Segment`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    Text,
    Exercise(ExerciseId),
    Assert,
}

/// Run of operations `[start_index, end_index)` sharing a region, with the
/// timestamps of its first and last operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Segment {
    pub kind: SegmentKind,
    pub start_index: usize,
    pub end_index: usize,
    pub start_ts: i64,
    pub end_ts: i64,
}

impl Segment {
    pub fn duration(&self) -> i64 {
        self.end_ts - self.start_ts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lecture() -> Vec<Operation> {
        vec![
            Operation::insertion(0, 0, "ab"),
            Operation::exercise(10, 1),
            Operation::insertion(11, 1, "X"),
            Operation::selection(12, 2, 2),
            Operation::exercise(20, 1),
            Operation::insertion(21, 3, "c"),
            Operation::assert(30, 0),
            Operation::insertion(31, 4, "d"),
            Operation::assert(40, 0),
        ]
    }

    #[test]
    fn test_owners_follow_markers() {
        let table = OwnerTable::from_ops(&lecture());

        assert_eq!(table.len(), 9);
        assert_eq!(table.owner(0), Owner::default());
        assert_eq!(table.exercise_of(1), None);
        assert_eq!(table.exercise_of(2), Some(1));
        assert_eq!(table.exercise_of(3), Some(1));
        assert_eq!(table.exercise_of(4), None);
        assert_eq!(table.exercise_of(5), None);
        assert!(!table.is_assert(6));
        assert!(table.is_assert(7));
        assert!(!table.is_assert(8));
        assert_eq!(table.owner(100), Owner::default());
    }

    #[test]
    fn test_open_region_owns_rest_of_log() {
        let ops = vec![Operation::exercise(0, 4), Operation::insertion(1, 0, "a")];
        let table = OwnerTable::from_ops(&ops);
        assert_eq!(table.exercise_of(1), Some(4));
    }

    #[test]
    fn test_solved_set_survives_refresh() {
        let mut ops = lecture();
        let mut table = OwnerTable::from_ops(&ops);
        table.mark_solved(1);

        ops.truncate(3);
        table.refresh(&ops);

        assert_eq!(table.len(), 3);
        assert!(table.is_solved(1));
        assert!(!table.is_unsolved_marker(&ops[1]));
        assert!(table.is_unsolved_marker(&Operation::exercise(0, 2)));
    }

    #[test]
    fn test_segments() {
        let ops = lecture();
        let segments = OwnerTable::from_ops(&ops).segments(&ops);

        let summary: Vec<_> = segments
            .iter()
            .map(|s| (s.kind, s.start_index, s.end_index, s.duration()))
            .collect();

        assert_eq!(
            summary,
            vec![
                (SegmentKind::Text, 0, 1, 0),
                (SegmentKind::Exercise(1), 1, 5, 10),
                (SegmentKind::Text, 5, 6, 0),
                (SegmentKind::Assert, 6, 9, 10),
            ]
        );
    }
}
