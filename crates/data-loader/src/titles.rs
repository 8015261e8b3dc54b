//! Display-title side table.
//!
//! Maps item ids to human-readable titles for result enrichment. Loaded
//! from the movies CSV; scoring never depends on it.

use crate::error::{DataError, Result};
use crate::parser::split_fields;
use crate::types::ItemId;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// id → display title lookup.
#[derive(Debug, Clone, Default)]
pub struct TitleLookup {
    titles: HashMap<ItemId, String>,
}

impl TitleLookup {
    /// Load from a movies CSV (`movie_id,title,...` or `movieId,title,...`).
    /// Columns beyond the title are ignored; rows without both fields are
    /// skipped.
    pub fn load_csv(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DataError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let mut content = String::new();
        File::open(path)?.read_to_string(&mut content)?;
        let mut lines = content.lines();

        let header_line = lines.next().ok_or_else(|| DataError::MissingHeader {
            path: path.display().to_string(),
        })?;
        let header = split_fields(header_line);
        let id_col = header
            .iter()
            .position(|h| ["movie_id", "movieId"].contains(&h.trim().trim_start_matches('\u{feff}')));
        let title_col = header.iter().position(|h| h.trim() == "title");
        let (id_col, title_col) = match (id_col, title_col) {
            (Some(id_col), Some(title_col)) => (id_col, title_col),
            _ => {
                return Err(DataError::UnknownHeader {
                    path: path.display().to_string(),
                    expected: "movie_id,title (or movieId,title)",
                    found: header.join(","),
                });
            }
        };

        let mut titles = HashMap::new();
        let mut skipped = 0usize;
        for line in lines {
            if line.trim().is_empty() {
                continue;
            }
            let fields = split_fields(line);
            let id = fields.get(id_col).map(|s| s.trim()).unwrap_or("");
            let title = fields.get(title_col).map(|s| s.trim()).unwrap_or("");
            if id.is_empty() || title.is_empty() {
                skipped += 1;
                continue;
            }
            titles.insert(id.to_string(), title.to_string());
        }

        if skipped > 0 {
            debug!("Skipped {} malformed title rows in {}", skipped, path.display());
        }
        Ok(Self { titles })
    }

    pub fn get(&self, item_id: &str) -> Option<&str> {
        self.titles.get(item_id).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_titles_with_quoted_commas() {
        let path = std::env::temp_dir().join("titles_test.csv");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "movieId,title,genres").unwrap();
        writeln!(file, "1,Toy Story (1995),Animation|Comedy").unwrap();
        writeln!(file, "2,\"Postman, The (1997)\",Drama").unwrap();
        writeln!(file, ",Orphan Title,Drama").unwrap();

        let lookup = TitleLookup::load_csv(&path).unwrap();
        assert_eq!(lookup.len(), 2);
        assert_eq!(lookup.get("1"), Some("Toy Story (1995)"));
        assert_eq!(lookup.get("2"), Some("Postman, The (1997)"));
        assert_eq!(lookup.get("99"), None);
    }
}
