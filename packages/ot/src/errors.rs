//! Error types for the replay engine

use crate::log::LogError;
use crate::operation::OperationError;
use crate::regions::RegionError;
use crate::replay::ReplayError;
use crate::session::SessionError;
use crate::splice::SpliceError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ElicastError {
    #[error("Operation error: {0}")]
    Operation(#[from] OperationError),

    #[error("Region error: {0}")]
    Region(#[from] RegionError),

    #[error("Replay error: {0}")]
    Replay(#[from] ReplayError),

    #[error("Log error: {0}")]
    Log(#[from] LogError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Splice error: {0}")]
    Splice(#[from] SpliceError),

    #[error("Not recording")]
    NotRecording,

    #[error("Already recording")]
    AlreadyRecording,

    #[error("A {0} session is still open")]
    SessionOpen(&'static str),

    #[error("No {0} session is open")]
    NoSession(&'static str),
}

pub type Result<T> = std::result::Result<T, ElicastError>;
