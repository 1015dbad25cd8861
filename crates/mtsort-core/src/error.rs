use std::io;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Two firm records of one source timeline disagree with their declared order.
///
/// The device-trusted times contradict the numbering in the file names, so the
/// timeline cannot be corrected automatically and the run must stop.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(
        "timeline '{source_key}': {earlier} ({earlier_time}) is newer than the later file {later} ({later_time})"
    )]
    OutOfOrder {
        source_key: String,
        earlier: String,
        earlier_time: DateTime<Utc>,
        later: String,
        later_time: DateTime<Utc>,
    },
}

/// Per-file persistence failures. The file is skipped and the batch goes on.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("source doesn't exist: {path}")]
    SourceMissing { path: PathBuf },

    #[error("target exists for {path}: {target}")]
    TargetExists { path: PathBuf, target: PathBuf },

    #[error("target doesn't exist for {path}: {target}")]
    TargetMissing { path: PathBuf, target: PathBuf },

    #[error("failed to rename {path} to {target}: {source}")]
    Rename {
        path: PathBuf,
        target: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to set time of {path}: {source}")]
    SetTime {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Errors that abort a whole run.
#[derive(Debug, Error)]
pub enum SortError {
    #[error("failed to read directory {path}: {source}")]
    ListDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Timeline(#[from] ReconcileError),
}
