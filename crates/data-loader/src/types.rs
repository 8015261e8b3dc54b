//! Core domain types shared across the recommendation engine.

use serde::{Deserialize, Serialize};

// =============================================================================
// Type Aliases
// =============================================================================
// External ids are opaque strings; dense matrix positions are u32. Keeping
// both aliases prevents mixing up user ids with item ids in signatures.

/// External identifier for a user, as it appears in the rating source
pub type UserId = String;

/// External identifier for an item (movie), as it appears in the rating source
pub type ItemId = String;

/// Dense 0-based matrix position assigned by an [`crate::IdIndex`]
pub type Position = u32;

// =============================================================================
// Records
// =============================================================================

/// A single validated rating triple.
///
/// Immutable once ingested; the trainer consumes these by value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingRecord {
    pub user_id: UserId,
    pub item_id: ItemId,
    pub rating: f32,
}

impl RatingRecord {
    pub fn new(user_id: impl Into<UserId>, item_id: impl Into<ItemId>, rating: f32) -> Self {
        Self {
            user_id: user_id.into(),
            item_id: item_id.into(),
            rating,
        }
    }
}

/// One item's concatenated content text, input to the TF-IDF fit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentRow {
    pub item_id: ItemId,
    pub text: String,
}
