//! # Server Crate
//!
//! Assembles the loaded models into an explicit application context and
//! exposes the query surface consumed by the presentation layer (here,
//! the CLI).
//!
//! ## Components
//!
//! - **config**: environment-driven [`EngineConfig`]
//! - **context**: [`EngineContext`] — artifacts behind `Arc`, optional
//!   title/metadata enrichment subsystems, the poster cache
//! - **query**: [`Query`] dispatch into the three ranking modes and
//!   result enrichment
//! - **error**: the boundary error taxonomy

pub mod config;
pub mod context;
pub mod error;
pub mod query;

// Re-export commonly used types
pub use config::EngineConfig;
pub use context::EngineContext;
pub use error::{EngineError, Result};
pub use query::{Query, ScoreEntry};
