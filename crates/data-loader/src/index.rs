//! Bidirectional mapping between external string ids and dense positions.
//!
//! Every model space (CF, content) owns its own `IdIndex`; the two are
//! allowed to disagree in size and ordering. Positions are assigned in
//! first-seen order, which makes index construction deterministic for a
//! given input ordering.

use crate::types::{ItemId, Position};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Bijective map between external ids and dense 0-based positions.
///
/// Serialized form is just the ordered id list; the reverse map is
/// rebuilt on deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct IdIndex {
    ids: Vec<String>,
    positions: HashMap<String, Position>,
}

impl IdIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the position for `id`, assigning the next dense position
    /// on first sight.
    pub fn insert_or_get(&mut self, id: &str) -> Position {
        if let Some(&position) = self.positions.get(id) {
            return position;
        }
        let position = self.ids.len() as Position;
        self.ids.push(id.to_string());
        self.positions.insert(id.to_string(), position);
        position
    }

    /// Position of a known id, `None` for ids outside this space.
    pub fn position(&self, id: &str) -> Option<Position> {
        self.positions.get(id).copied()
    }

    /// External id at a dense position.
    pub fn id(&self, position: Position) -> Option<&str> {
        self.ids.get(position as usize).map(|s| s.as_str())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Iterate ids in position order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(|s| s.as_str())
    }

    /// Resolve a batch of external ids, silently dropping unknown ones.
    pub fn positions_of(&self, ids: &[ItemId]) -> Vec<Position> {
        ids.iter().filter_map(|id| self.position(id)).collect()
    }
}

impl From<Vec<String>> for IdIndex {
    fn from(ids: Vec<String>) -> Self {
        let positions = ids
            .iter()
            .enumerate()
            .map(|(position, id)| (id.clone(), position as Position))
            .collect();
        Self { ids, positions }
    }
}

impl From<IdIndex> for Vec<String> {
    fn from(index: IdIndex) -> Self {
        index.ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_seen_order() {
        let mut index = IdIndex::new();
        assert_eq!(index.insert_or_get("m3"), 0);
        assert_eq!(index.insert_or_get("m1"), 1);
        assert_eq!(index.insert_or_get("m3"), 0);
        assert_eq!(index.insert_or_get("m2"), 2);

        assert_eq!(index.len(), 3);
        assert_eq!(index.id(0), Some("m3"));
        assert_eq!(index.id(2), Some("m2"));
        assert_eq!(index.position("m1"), Some(1));
        assert_eq!(index.position("nope"), None);
    }

    #[test]
    fn test_bijective_round_trip() {
        let mut index = IdIndex::new();
        for id in ["a", "b", "c", "d"] {
            index.insert_or_get(id);
        }
        for position in 0..index.len() as Position {
            let id = index.id(position).unwrap();
            assert_eq!(index.position(id), Some(position));
        }
    }

    #[test]
    fn test_serde_rebuilds_positions() {
        let mut index = IdIndex::new();
        index.insert_or_get("m10");
        index.insert_or_get("m20");

        let json = serde_json::to_string(&index).unwrap();
        assert_eq!(json, r#"["m10","m20"]"#);

        let restored: IdIndex = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.position("m20"), Some(1));
        assert_eq!(restored.id(0), Some("m10"));
    }

    #[test]
    fn test_positions_of_drops_unknown() {
        let mut index = IdIndex::new();
        index.insert_or_get("m1");
        index.insert_or_get("m2");

        let ids = vec!["m2".to_string(), "ghost".to_string(), "m1".to_string()];
        assert_eq!(index.positions_of(&ids), vec![1, 0]);
    }
}
