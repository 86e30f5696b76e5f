//! Property-based tests for replay and scrubbing.

use elicast_ot::{
    apply, build_text, revert, AreaSet, AreaType, EngineConfig, MemoryBuffer, Operation, OperationLog, OwnerTable,
    Scrubber, TextBuffer,
};
use proptest::prelude::*;

// =============================================================================
// Test helpers
// =============================================================================

#[derive(Clone, Debug)]
enum EditOp {
    Insert { pos_pct: f64, content: String },
    Delete { pos_pct: f64, len_pct: f64 },
    Select { pos_pct: f64 },
}

fn arbitrary_edit_op() -> impl Strategy<Value = EditOp> {
    prop_oneof![
        (
            0.0..=1.0f64,
            prop::collection::vec(prop::sample::select(vec!['a', 'b', 'é', '\n', '✓']), 1..6)
        )
            .prop_map(|(pos_pct, chars)| EditOp::Insert {
                pos_pct,
                content: chars.into_iter().collect(),
            }),
        (0.0..=1.0f64, 0.0..=0.5f64).prop_map(|(pos_pct, len_pct)| EditOp::Delete { pos_pct, len_pct }),
        (0.0..=1.0f64).prop_map(|pos_pct| EditOp::Select { pos_pct }),
    ]
}

fn scaled(pct: f64, len: usize) -> usize {
    ((pct * len as f64) as usize).min(len)
}

/// Turn edits into a log, ts = 10 * index. Returns the log and the final text.
fn record(edits: &[EditOp]) -> (OperationLog, String) {
    let mut buffer = MemoryBuffer::new();
    let mut log = OperationLog::new();

    for (index, edit) in edits.iter().enumerate() {
        let ts = index as i64 * 10;
        let text = buffer.text();
        let len = text.chars().count();

        let op = match edit {
            EditOp::Insert { pos_pct, content } => Operation::insertion(ts, scaled(*pos_pct, len), content.clone()),
            EditOp::Delete { pos_pct, len_pct } => {
                if len == 0 {
                    continue;
                }
                let from = scaled(*pos_pct, len - 1);
                let amount = scaled(*len_pct, len - from).max(1);
                let removed: String = text.chars().skip(from).take(amount).collect();
                Operation::deletion(ts, from, removed)
            }
            EditOp::Select { pos_pct } => {
                let pos = scaled(*pos_pct, len);
                Operation::selection(ts, pos, pos)
            }
        };

        apply(&mut buffer, &op).unwrap();
        log.push(op).unwrap();
    }

    (log, buffer.text())
}

// =============================================================================
// Replay properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Rebuilding from scratch reproduces the recorded document
    #[test]
    fn build_text_matches_recording(edits in prop::collection::vec(arbitrary_edit_op(), 0..40)) {
        let (log, text) = record(&edits);
        prop_assert_eq!(build_text(log.as_slice()).unwrap(), text);
    }

    /// Reverting every operation in reverse order yields the empty document
    #[test]
    fn revert_undoes_apply(edits in prop::collection::vec(arbitrary_edit_op(), 0..40)) {
        let (log, text) = record(&edits);
        let mut buffer = MemoryBuffer::with_text(text);

        for op in log.iter().rev() {
            revert(&mut buffer, op).unwrap();
        }

        prop_assert_eq!(buffer.as_str(), "");
    }

    /// Incremental seeks land on the same document as a fresh rebuild
    #[test]
    fn seek_matches_rebuild(
        edits in prop::collection::vec(arbitrary_edit_op(), 1..40),
        targets in prop::collection::vec(-10i64..450, 1..10),
        threshold in 0usize..20,
    ) {
        let (log, _) = record(&edits);
        let owners = OwnerTable::from_ops(log.as_slice());
        let config = EngineConfig { big_jump_threshold: threshold, ..EngineConfig::default() };
        let mut scrubber = Scrubber::new(&config);
        let mut buffer = MemoryBuffer::new();

        for ts in targets {
            let report = scrubber.seek(&log, &owners, &mut buffer, ts).unwrap();
            let expected = build_text(&log.as_slice()[..log.index_at_ts(ts)]).unwrap();

            prop_assert_eq!(report.index, log.index_at_ts(ts));
            prop_assert_eq!(buffer.as_str(), expected.as_str());
        }
    }
}

// =============================================================================
// Area set properties
// =============================================================================

const TEXT: AreaType = AreaType::new("text", true, true);

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Areas stay sorted, disjoint and cover exactly the typed text
    #[test]
    fn area_set_tracks_document_length(edits in prop::collection::vec(arbitrary_edit_op(), 0..40)) {
        let (log, text) = record(&edits);
        let mut set = AreaSet::new();

        for op in log.iter() {
            if let elicast_ot::OpKind::Text { from_pos, inserted_text, removed_text, .. } = op.kind() {
                let removed = removed_text.chars().count();
                let inserted = inserted_text.chars().count();
                if removed > 0 {
                    set.remove(TEXT, *from_pos, from_pos + removed).unwrap();
                }
                if inserted > 0 {
                    set.insert(TEXT, *from_pos, from_pos + inserted, true);
                }
            }
        }

        for pair in set.as_slice().windows(2) {
            prop_assert!(pair[0].to_pos <= pair[1].from_pos);
        }

        let covered: usize = set.iter().map(|area| area.len()).sum();
        prop_assert_eq!(covered, text.chars().count());
        prop_assert!(set.len() <= 1);
    }
}
