use thiserror::Error;

/// Errors reported by the monitoring core.
///
/// Only [`Error::IndexOutOfRange`] is ever surfaced by [`Monitor::ingest`](crate::Monitor::ingest):
/// it means the reading store and the position table disagree about how many
/// readings exist, which the caller must not silently continue past.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// A reading index was looked up past the end of a table.
    #[error("reading index {index} is out of range (table holds {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// A reading index was inserted into the heap while already present.
    #[error("reading index {index} is already in the heap")]
    DuplicateInsert { index: usize },

    /// A configuration value was rejected.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = core::result::Result<T, Error>;
