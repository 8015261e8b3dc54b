//! Boundary error type for the query surface.
//!
//! Expected "not found" situations are never errors here: an unknown user
//! cold-starts, an unknown seed item falls back to metadata text. The only
//! "not found"-class failure a query can produce is
//! [`EngineError::NoProfileAvailable`] — nothing at all to rank from.

use data_loader::DataError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    /// Required external configuration is missing. Disables only the
    /// dependent subsystem at load time; a query never sees this.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A batch-job data failure (missing source file, empty input)
    #[error(transparent)]
    Data(#[from] DataError),

    /// A query arrived before the artifacts could be loaded, or an
    /// artifact file is missing/unreadable. Maps to service-unavailable
    /// at the presentation layer, never a crash.
    #[error("Model not loaded: {0}")]
    ModelNotLoaded(String),

    /// Neither a mapped nor a text-derived profile could be built —
    /// there is no signal to rank from.
    #[error("No content profile available")]
    NoProfileAvailable,
}

pub type Result<T> = std::result::Result<T, EngineError>;
