//! # Sessions
//!
//! Bounded sub-ranges of the log being recorded or solved.
//!
//! ## Recording
//!
//! [`RecordExerciseSession`] and [`RecordAssertSession`] append an opening
//! marker when they start and the matching closing marker when they finish.
//! Everything in between is the body of the region. A session value exists
//! only between `start` and `finish`/`abort`, which consume it.
//!
//! Sessions hold the index of their opening marker rather than a borrow of
//! the log, so the owner of the log can keep appending through them.
//!
//! ## Solving
//!
//! [`SolveExerciseSession`] never writes to the log while it runs. The
//! viewer's edits are collected in a private list stamped with the midpoint
//! of the exercise's markers, and spliced into the log only when a solution
//! is accepted.

use crate::log::{LogError, OperationLog};
use crate::operation::{ExerciseId, OpKind, Operation};
use crate::owners::OwnerTable;
use crate::regions::{find_closing, RegionKind};
use std::ops::Range;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Log(#[from] LogError),

    #[error("Exercise ids must be positive")]
    InvalidExerciseId,

    #[error("Operation {0} is not an exercise start marker")]
    NotAnExerciseMarker(usize),

    #[error("Exercise {0} has no end marker")]
    UnterminatedExercise(ExerciseId),

    #[error("Opening marker of the session at {0} is no longer in the log")]
    MarkerLost(usize),

    #[error("Cannot abort a session that already changed the text")]
    AlreadyInitiated,
}

/// An open recording region of the log
pub trait RegionSession {
    /// Index of the opening marker
    fn start_index(&self) -> usize;

    /// Kind of region being recorded
    fn region_kind(&self) -> RegionKind;

    /// Opening marker and everything recorded after it
    fn ops<'a>(&self, log: &'a OperationLog) -> &'a [Operation] {
        log.as_slice().get(self.start_index()..).unwrap_or(&[])
    }

    /// True once any text change has been recorded in the region
    fn is_initiated(&self, log: &OperationLog) -> bool {
        self.ops(log).iter().skip(1).any(Operation::is_text)
    }
}

/// Recording of an exercise placeholder
#[derive(Debug, PartialEq, Eq)]
pub struct RecordExerciseSession {
    ex_id: ExerciseId,
    start_index: usize,
}

impl RecordExerciseSession {
    /// Append the opening `exPlaceholder` marker for `ex_id`
    pub fn start(log: &mut OperationLog, ex_id: ExerciseId, ts: i64) -> Result<Self, SessionError> {
        if ex_id == 0 {
            return Err(SessionError::InvalidExerciseId);
        }

        let start_index = log.push(Operation::exercise(ts, ex_id))?;
        debug!(ex_id, start_index, ts, "Started exercise recording");

        Ok(Self { ex_id, start_index })
    }

    pub fn ex_id(&self) -> ExerciseId {
        self.ex_id
    }

    /// Append an operation to the region body
    pub fn push_op(&self, log: &mut OperationLog, op: Operation) -> Result<usize, SessionError> {
        Ok(log.push(op)?)
    }

    /// Append the closing marker and recompute ownership. Returns the index
    /// range of the region body.
    pub fn finish(self, log: &mut OperationLog, owners: &mut OwnerTable, ts: i64) -> Result<Range<usize>, SessionError> {
        self.check_marker(log)?;

        let end_index = log.push(Operation::exercise(ts, self.ex_id))?;
        owners.refresh(log.as_slice());

        info!(ex_id = self.ex_id, ops = end_index - self.start_index - 1, "Finished exercise recording");
        Ok(self.start_index + 1..end_index)
    }

    /// Drop the region, truncating the log back to before its opening marker.
    /// Only possible while nothing has been typed in it.
    pub fn abort(self, log: &mut OperationLog) -> Result<(), SessionError> {
        self.check_marker(log)?;
        if self.is_initiated(log) {
            return Err(SessionError::AlreadyInitiated);
        }

        log.truncate(self.start_index);
        debug!(ex_id = self.ex_id, "Aborted exercise recording");
        Ok(())
    }

    fn check_marker(&self, log: &OperationLog) -> Result<(), SessionError> {
        match log.get(self.start_index).map(Operation::kind) {
            Some(OpKind::Exercise { ex_id }) if *ex_id == self.ex_id => Ok(()),
            _ => Err(SessionError::MarkerLost(self.start_index)),
        }
    }
}

impl RegionSession for RecordExerciseSession {
    fn start_index(&self) -> usize {
        self.start_index
    }

    fn region_kind(&self) -> RegionKind {
        RegionKind::Exercise
    }
}

/// Recording of an assertion region
#[derive(Debug, PartialEq, Eq)]
pub struct RecordAssertSession {
    start_index: usize,
}

impl RecordAssertSession {
    /// Append the opening `assert` marker. `time` is the wall clock, used to
    /// derive timestamps for the rest of the region.
    pub fn start(log: &mut OperationLog, ts: i64, time: i64) -> Result<Self, SessionError> {
        let start_index = log.push(Operation::assert(ts, time))?;
        debug!(start_index, ts, "Started assert recording");

        Ok(Self { start_index })
    }

    /// Wall-clock anchor of the region
    pub fn anchor<'a>(&self, log: &'a OperationLog) -> Option<&'a Operation> {
        log.get(self.start_index)
    }

    pub fn push_op(&self, log: &mut OperationLog, op: Operation) -> Result<usize, SessionError> {
        Ok(log.push(op)?)
    }

    pub fn finish(
        self,
        log: &mut OperationLog,
        owners: &mut OwnerTable,
        ts: i64,
        time: i64,
    ) -> Result<Range<usize>, SessionError> {
        self.check_marker(log)?;

        let end_index = log.push(Operation::assert(ts, time))?;
        owners.refresh(log.as_slice());

        info!(ops = end_index - self.start_index - 1, "Finished assert recording");
        Ok(self.start_index + 1..end_index)
    }

    pub fn abort(self, log: &mut OperationLog) -> Result<(), SessionError> {
        self.check_marker(log)?;
        if self.is_initiated(log) {
            return Err(SessionError::AlreadyInitiated);
        }

        log.truncate(self.start_index);
        Ok(())
    }

    fn check_marker(&self, log: &OperationLog) -> Result<(), SessionError> {
        match log.get(self.start_index) {
            Some(op) if op.is_assert_marker() => Ok(()),
            _ => Err(SessionError::MarkerLost(self.start_index)),
        }
    }
}

impl RegionSession for RecordAssertSession {
    fn start_index(&self) -> usize {
        self.start_index
    }

    fn region_kind(&self) -> RegionKind {
        RegionKind::Assert
    }
}

/// A viewer's attempt at a recorded exercise
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolveExerciseSession {
    ex_id: ExerciseId,
    start_index: usize,
    end_index: usize,
    ts: i64,
    solve_ops: Vec<Operation>,
}

impl SolveExerciseSession {
    /// Open a solve attempt for the exercise whose start marker is at `start_index`
    pub fn begin(log: &OperationLog, start_index: usize) -> Result<Self, SessionError> {
        let ops = log.as_slice();

        let (ex_id, start_ts) = match ops.get(start_index) {
            Some(op) => match op.kind() {
                OpKind::Exercise { ex_id } => (*ex_id, op.ts()),
                _ => return Err(SessionError::NotAnExerciseMarker(start_index)),
            },
            None => return Err(SessionError::NotAnExerciseMarker(start_index)),
        };

        let end_index = find_closing(ops, start_index, Operation::is_exercise_marker)
            .ok_or(SessionError::UnterminatedExercise(ex_id))?;

        let ts = midpoint(start_ts, ops[end_index].ts());
        debug!(ex_id, start_index, end_index, ts, "Started solving exercise");

        Ok(Self {
            ex_id,
            start_index,
            end_index,
            ts,
            solve_ops: vec![Operation::nop(ts, 0)],
        })
    }

    pub fn ex_id(&self) -> ExerciseId {
        self.ex_id
    }

    pub fn start_index(&self) -> usize {
        self.start_index
    }

    pub fn end_index(&self) -> usize {
        self.end_index
    }

    /// Timestamp given to every solve operation
    pub fn ts(&self) -> i64 {
        self.ts
    }

    /// Range of the recorded solution between the two markers
    pub fn solution_range(&self) -> Range<usize> {
        self.start_index + 1..self.end_index
    }

    pub fn solve_ops(&self) -> &[Operation] {
        &self.solve_ops
    }

    pub fn push_op(&mut self, op: Operation) {
        self.solve_ops.push(op);
    }

    pub fn is_initiated(&self) -> bool {
        self.solve_ops.iter().any(Operation::is_text)
    }

    /// First text change of the recorded solution; its range is where the
    /// viewer's answer has to start
    pub fn first_exercise_text_op<'a>(&self, log: &'a OperationLog) -> Option<&'a Operation> {
        log.as_slice()
            .get(self.solution_range())?
            .iter()
            .find(|op| op.is_text())
    }

    /// Close the attempt and mark the exercise solved. The solve operations
    /// are spliced into the log by the caller before this.
    pub fn finish(self, owners: &mut OwnerTable) {
        owners.mark_solved(self.ex_id);
        info!(ex_id = self.ex_id, ops = self.solve_ops.len(), "Finished solving exercise");
    }
}

/// Rounded mean of two timestamps, halves rounding up
fn midpoint(a: i64, b: i64) -> i64 {
    a + (b - a + 1).div_euclid(2)
}
