//! # Elicast OT
//!
//! Operation log and area-tracking engine for interactive screencasts.
//!
//! A screencast is a single, timestamp-ordered log of editor operations.
//! Replaying the log up to a timestamp yields the document shown at that
//! moment. Spans of the log are marked as exercises (the viewer has to type
//! the answer) or assertions (hidden checks run against the viewer's answer).
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ operation / log: typed, ordered op log      │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ regions: log → exercise/assert areas        │
//! │  - AreaSet merge/shift rules                │
//! │  - Recursive marker resolution              │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ timeline: recording, sessions, solving      │
//! │  - EditAuthorizer guards every edit         │
//! │  - splice swaps in the viewer's answer      │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ player: seek a TextBuffer to any timestamp  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **The log is the source of truth**: text, regions and ownership are derived
//! 2. **Character positions**: every position counts Unicode scalar values
//! 3. **Replay is reversible**: each text op carries the text it removed
//! 4. **Regions are contiguous**: an exercise always resolves to one span
//!
//! ## Usage
//!
//! ```rust,ignore
//! use elicast_ot::{EngineConfig, MemoryBuffer, Timeline};
//!
//! let mut timeline = Timeline::new(EngineConfig::default());
//! let mut buffer = MemoryBuffer::new();
//!
//! timeline.start_recording(0, now())?;
//! timeline.record_text(&mut buffer, 0, 0, "x = ", now())?;
//! timeline.start_exercise(now())?;
//! timeline.record_text(&mut buffer, 4, 4, "42", now())?;
//! timeline.finish_exercise(now())?;
//! timeline.stop_recording(now())?;
//!
//! let json = timeline.log().to_json()?;
//! ```

mod area;
mod authorize;
mod buffer;
mod config;
mod errors;
mod log;
mod operation;
mod owners;
mod player;
mod position;
mod regions;
mod replay;
mod session;
mod splice;
mod timeline;

pub use area::{Area, AreaError, AreaKind, AreaSet, AreaType};
pub use authorize::EditAuthorizer;
pub use buffer::{MemoryBuffer, TextBuffer};
pub use config::EngineConfig;
pub use errors::{ElicastError, Result};
pub use log::{LogError, OperationLog};
pub use operation::{ExerciseId, OpKind, Operation, OperationError};
pub use owners::{Owner, OwnerTable, Segment, SegmentKind};
pub use player::{clamp_seek_target, sound_cue, RunOutput, Scrubber, SeekReport, SoundCue};
pub use position::{line_ch_to_pos, pos_to_line_ch, LineCh};
pub use regions::{get_areas, Region, RegionBuilder, RegionError, RegionKind};
pub use replay::{apply, build_text, revert, ReplayError};
pub use session::{RecordAssertSession, RecordExerciseSession, RegionSession, SessionError, SolveExerciseSession};
pub use splice::{replace_partial_ops, SpliceError, SpliceReport};
pub use timeline::Timeline;
