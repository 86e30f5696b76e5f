//! # Replay
//!
//! Applies and reverts single operations against a [`TextBuffer`].
//!
//! Both directions check the buffer before touching it: applying a `text` op
//! requires `[from_pos, to_pos)` to hold exactly the recorded removed text,
//! reverting requires the inserted text to still be in place. A mismatch
//! means the buffer and the log have diverged and is reported as a desync.

use crate::buffer::{char_slice, MemoryBuffer, TextBuffer};
use crate::operation::{char_len, OpKind, Operation};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReplayError {
    #[error("Selection [{from}, {to}] is outside of the document (length {len})")]
    SelectionOutOfBounds { from: usize, to: usize, len: usize },

    #[error("Range [{from}, {to}) is outside of the document (length {len})")]
    RangeOutOfBounds { from: usize, to: usize, len: usize },

    #[error("Buffer is out of sync at {from}: expected {expected:?}, found {found:?}")]
    Desync {
        from: usize,
        expected: String,
        found: String,
    },
}

/// Apply `op` to `buffer`. Only `text` and `selection` ops touch the buffer.
pub fn apply(buffer: &mut impl TextBuffer, op: &Operation) -> Result<(), ReplayError> {
    match op.kind() {
        OpKind::Selection { from_pos, to_pos } => {
            let len = char_len(&buffer.text());
            if *from_pos > len || *to_pos > len {
                return Err(ReplayError::SelectionOutOfBounds {
                    from: *from_pos,
                    to: *to_pos,
                    len,
                });
            }
            buffer.set_selection(*from_pos, *to_pos);
        }
        OpKind::Text {
            from_pos,
            to_pos,
            inserted_text,
            removed_text,
        } => {
            expect_text(buffer, *from_pos, *to_pos, removed_text)?;
            buffer.replace(*from_pos, *to_pos, inserted_text);
        }
        _ => {}
    }
    Ok(())
}

/// Undo a previously applied `text` op. Everything else is a no-op; the
/// caller restores the selection from the log.
pub fn revert(buffer: &mut impl TextBuffer, op: &Operation) -> Result<(), ReplayError> {
    if let OpKind::Text {
        from_pos,
        inserted_text,
        removed_text,
        ..
    } = op.kind()
    {
        let inserted_end = from_pos + char_len(inserted_text);
        expect_text(buffer, *from_pos, inserted_end, inserted_text)?;
        buffer.replace(*from_pos, inserted_end, removed_text);
    }
    Ok(())
}

/// Document content after replaying every `text` op of `ops` on an empty buffer
pub fn build_text(ops: &[Operation]) -> Result<String, ReplayError> {
    let mut buffer = MemoryBuffer::new();
    for op in ops.iter().filter(|op| op.is_text()) {
        apply(&mut buffer, op)?;
    }
    Ok(buffer.text())
}

fn expect_text(buffer: &impl TextBuffer, from_pos: usize, to_pos: usize, expected: &str) -> Result<(), ReplayError> {
    let text = buffer.text();
    match char_slice(&text, from_pos, to_pos) {
        Some(found) if found == expected => Ok(()),
        Some(found) => Err(ReplayError::Desync {
            from: from_pos,
            expected: expected.to_string(),
            found: found.to_string(),
        }),
        None => Err(ReplayError::RangeOutOfBounds {
            from: from_pos,
            to: to_pos,
            len: char_len(&text),
        }),
    }
}
