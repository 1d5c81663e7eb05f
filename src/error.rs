//! Custom error types for the crate.
//!
//! This module defines the primary error type, `HessioError`, used by every stage of the
//! ingestion pipeline. Using the `thiserror` crate, it provides a centralized way to report
//! everything from I/O and framing problems to an internally inconsistent record stream.
//!
//! ## Error Hierarchy
//!
//! - **`Io`** / **`Framing`**: the stream reader could not deliver the next record. Both are
//!   fatal for the stream they came from.
//! - **`Decode`**: a record payload could not be turned into its typed structure. Only fatal
//!   for run headers; the demultiplexer downgrades all other decode failures to a skip.
//! - **`UnknownTelescope`**: a per-telescope configuration block names a telescope that is
//!   not part of the current run. The stream is inconsistent, so this is fatal.
//! - **`InvalidRunHeader`** / **`Allocation`**: the run aggregate cannot be built.
//! - **`Export`**: the relational sink rejected an operation. The export builder absorbs
//!   these so ingestion continues with a degraded export.
//! - **`Config`** / **`Configuration`** / **`Layout`**: loading or validating settings and
//!   the array-layout reference table.
//!
//! Recoverable stream conditions (records before a run header, unrecognized record types)
//! never become errors; they surface as [`crate::demux::Dispatch::Ignored`].

use crate::records::RecordKind;
use thiserror::Error;

/// Convenience alias for results using the crate error type.
pub type AppResult<T> = std::result::Result<T, HessioError>;

/// Failure to turn a record payload into its typed structure.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("payload encoding: {0}")]
    Payload(#[from] bincode::Error),

    #[error("{0}")]
    Invalid(String),
}

#[derive(Error, Debug)]
pub enum HessioError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed record stream: {0}")]
    Framing(String),

    #[error("Failed to decode {kind} block: {source}")]
    Decode {
        kind: RecordKind,
        #[source]
        source: DecodeError,
    },

    #[error("{kind} for unknown telescope {tel_id}")]
    UnknownTelescope { kind: RecordKind, tel_id: i32 },

    #[error("Run header rejected: {0}")]
    InvalidRunHeader(String),

    #[error("Not enough memory for {what} of run {run}")]
    Allocation { what: &'static str, run: i32 },

    #[error("Export error: {0}")]
    Export(String),

    #[error("Layout table error: {0}")]
    Layout(String),

    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("Configuration validation error: {0}")]
    Configuration(String),

    #[error("Feature '{0}' is not enabled. Please build with --features {0}")]
    FeatureNotEnabled(String),
}

impl From<figment::Error> for HessioError {
    fn from(value: figment::Error) -> Self {
        HessioError::Config(Box::new(value))
    }
}
