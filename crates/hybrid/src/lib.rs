//! # Hybrid Crate
//!
//! Blends the collaborative-filtering and content-similarity signals into
//! a single ranking. See [`blender::HybridBlender`] for the two modes.

pub mod blender;

// Re-export commonly used types
pub use blender::{HybridBlender, HybridConfig, HybridRecommendation, SeedHybridRecommendation};
