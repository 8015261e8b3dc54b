//! # Data Loader Crate
//!
//! Base crate for the recommendation engine: CSV ingestion, id indexing,
//! and the shared ranking primitives every scorer builds on.
//!
//! ## Main Components
//!
//! - **types**: Core domain types (RatingRecord, ContentRow, id aliases)
//! - **parser**: Rating/content CSV loaders with dual header conventions
//! - **titles**: Display-title side table for result enrichment
//! - **index**: Bidirectional dense id index (one instance per model space)
//! - **ranking**: Partial top-n selection and min-max normalization
//! - **error**: Error types for data loading
//!
//! ## Example Usage
//!
//! ```ignore
//! use data_loader::{load_ratings_csv, filter_sparse_users, IdIndex};
//! use std::path::Path;
//!
//! let ratings = load_ratings_csv(Path::new("data/ratings.csv"))?;
//! let ratings = filter_sparse_users(ratings, 3);
//!
//! let mut users = IdIndex::new();
//! for record in &ratings {
//!     users.insert_or_get(&record.user_id);
//! }
//! ```

// Public modules
pub mod error;
pub mod index;
pub mod parser;
pub mod ranking;
pub mod titles;
pub mod types;

// Re-export commonly used types for convenience
pub use error::{DataError, Result};
pub use index::IdIndex;
pub use parser::{filter_sparse_users, load_content_csv, load_ratings_csv};
pub use ranking::{min_max_normalize, top_indices};
pub use titles::TitleLookup;
pub use types::{ContentRow, ItemId, Position, RatingRecord, UserId};
