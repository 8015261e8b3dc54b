//! Parsers for the CSV tables consumed by the engine.
//!
//! Three tables are understood:
//! - ratings: `user_id,movie_id,rating` (or `userId,movieId,rating`)
//! - titles:  `movie_id,title` (or `movieId,title`), extra columns ignored
//! - content: `movie_id,content_text` (or `movieId,contentText`)
//!
//! Both header-naming conventions seen in the wild (snake_case and
//! camelCase MovieLens exports) are accepted. Column order is resolved
//! from the header row, never assumed.
//!
//! Malformed rows (missing fields, unparsable rating, empty ids) are
//! skipped and counted; they never abort a load. A missing file or an
//! unusable header is fatal to that load only.

use crate::error::{DataError, Result};
use crate::types::{ContentRow, RatingRecord, UserId};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Read a whole file into lines, mapping a missing file to a typed error.
fn read_lines(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Err(DataError::FileNotFound {
            path: path.display().to_string(),
        });
    }
    let mut file = File::open(path)?;
    let mut content = String::new();
    file.read_to_string(&mut content)?;
    Ok(content.lines().map(|s| s.to_string()).collect())
}

/// Split one CSV line into fields, honoring double-quoted fields.
///
/// Titles routinely contain commas ("Postman, The (1997)"), so a plain
/// `split(',')` is not enough. A doubled quote inside a quoted field
/// is an escaped quote.
pub(crate) fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    // Escaped quote
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

/// Resolve the column position of a field that may appear under either
/// of two header names.
fn find_column(header: &[String], names: [&str; 2]) -> Option<usize> {
    header
        .iter()
        .position(|h| names.contains(&h.trim().trim_start_matches('\u{feff}')))
}

/// Column positions for the three rating fields.
struct RatingColumns {
    user: usize,
    item: usize,
    rating: usize,
}

fn resolve_rating_header(path: &Path, header: &[String]) -> Result<RatingColumns> {
    let user = find_column(header, ["user_id", "userId"]);
    let item = find_column(header, ["movie_id", "movieId"]);
    let rating = find_column(header, ["rating", "rating"]);

    match (user, item, rating) {
        (Some(user), Some(item), Some(rating)) => Ok(RatingColumns { user, item, rating }),
        _ => Err(DataError::UnknownHeader {
            path: path.display().to_string(),
            expected: "user_id,movie_id,rating (or userId,movieId,rating)",
            found: header.join(","),
        }),
    }
}

/// Load validated rating triples from a CSV file.
///
/// Rows with missing fields, empty ids, or an unparsable rating value
/// are skipped; the skip count is logged.
pub fn load_ratings_csv(path: &Path) -> Result<Vec<RatingRecord>> {
    let lines = read_lines(path)?;
    let mut lines = lines.into_iter();

    let header_line = lines.next().ok_or_else(|| DataError::MissingHeader {
        path: path.display().to_string(),
    })?;
    let columns = resolve_rating_header(path, &split_fields(&header_line))?;

    let mut ratings = Vec::new();
    let mut skipped = 0usize;

    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let fields = split_fields(&line);

        let user_id = fields.get(columns.user).map(|s| s.trim()).unwrap_or("");
        let item_id = fields.get(columns.item).map(|s| s.trim()).unwrap_or("");
        let rating_raw = fields.get(columns.rating).map(|s| s.trim()).unwrap_or("");

        if user_id.is_empty() || item_id.is_empty() || rating_raw.is_empty() {
            skipped += 1;
            continue;
        }
        let rating = match rating_raw.parse::<f32>() {
            Ok(value) if value.is_finite() => value,
            _ => {
                skipped += 1;
                continue;
            }
        };

        ratings.push(RatingRecord::new(user_id, item_id, rating));
    }

    if skipped > 0 {
        debug!("Skipped {} malformed rating rows in {}", skipped, path.display());
    }
    Ok(ratings)
}

/// Drop ratings from users with fewer than `min_ratings` rows.
///
/// `min_ratings <= 1` keeps everything without a counting pass.
pub fn filter_sparse_users(ratings: Vec<RatingRecord>, min_ratings: usize) -> Vec<RatingRecord> {
    if min_ratings <= 1 {
        return ratings;
    }

    let mut counts: HashMap<UserId, usize> = HashMap::new();
    for record in &ratings {
        *counts.entry(record.user_id.clone()).or_insert(0) += 1;
    }

    ratings
        .into_iter()
        .filter(|record| counts[&record.user_id] >= min_ratings)
        .collect()
}

/// Load per-item content text rows from a CSV file.
///
/// Rows with an empty id are skipped; empty text is kept (the vectorizer
/// represents it as a zero row).
pub fn load_content_csv(path: &Path) -> Result<Vec<ContentRow>> {
    let lines = read_lines(path)?;
    let mut lines = lines.into_iter();

    let header_line = lines.next().ok_or_else(|| DataError::MissingHeader {
        path: path.display().to_string(),
    })?;
    let header = split_fields(&header_line);

    let item = find_column(&header, ["movie_id", "movieId"]);
    let text = find_column(&header, ["content_text", "contentText"]);
    let (item, text) = match (item, text) {
        (Some(item), Some(text)) => (item, text),
        _ => {
            return Err(DataError::UnknownHeader {
                path: path.display().to_string(),
                expected: "movie_id,content_text (or movieId,contentText)",
                found: header.join(","),
            });
        }
    };

    let mut rows = Vec::new();
    let mut skipped = 0usize;

    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let fields = split_fields(&line);
        let item_id = fields.get(item).map(|s| s.trim()).unwrap_or("");
        if item_id.is_empty() {
            skipped += 1;
            continue;
        }
        let content = fields.get(text).map(|s| s.trim()).unwrap_or("");
        rows.push(ContentRow {
            item_id: item_id.to_string(),
            text: content.to_string(),
        });
    }

    if skipped > 0 {
        debug!("Skipped {} malformed content rows in {}", skipped, path.display());
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_split_fields_quoted() {
        let fields = split_fields(r#"1,"Postman, The (1997)",Drama"#);
        assert_eq!(fields, vec!["1", "Postman, The (1997)", "Drama"]);

        let fields = split_fields(r#"2,"He said ""hi""",Comedy"#);
        assert_eq!(fields[1], r#"He said "hi""#);
    }

    #[test]
    fn test_load_ratings_snake_case_header() {
        let path = write_temp(
            "ratings_snake.csv",
            "user_id,movie_id,rating\nu1,m1,5.0\nu2,m2,3.5\n",
        );
        let ratings = load_ratings_csv(&path).unwrap();
        assert_eq!(ratings.len(), 2);
        assert_eq!(ratings[0], RatingRecord::new("u1", "m1", 5.0));
    }

    #[test]
    fn test_load_ratings_camel_case_header() {
        let path = write_temp(
            "ratings_camel.csv",
            "userId,movieId,rating,timestamp\nu1,m1,4.0,12345\n",
        );
        let ratings = load_ratings_csv(&path).unwrap();
        assert_eq!(ratings.len(), 1);
        assert_eq!(ratings[0].item_id, "m1");
        assert_eq!(ratings[0].rating, 4.0);
    }

    #[test]
    fn test_malformed_rows_skipped() {
        let path = write_temp(
            "ratings_malformed.csv",
            "user_id,movie_id,rating\nu1,m1,5.0\nu2,,4.0\nu3,m3,not-a-number\n,m4,2.0\nu5,m5,1.0\n",
        );
        let ratings = load_ratings_csv(&path).unwrap();
        assert_eq!(ratings.len(), 2);
        assert_eq!(ratings[0].user_id, "u1");
        assert_eq!(ratings[1].user_id, "u5");
    }

    #[test]
    fn test_unknown_header_is_error() {
        let path = write_temp("ratings_bad_header.csv", "a,b,c\n1,2,3\n");
        let err = load_ratings_csv(&path).unwrap_err();
        assert!(matches!(err, DataError::UnknownHeader { .. }));
    }

    #[test]
    fn test_missing_file_is_error() {
        let err = load_ratings_csv(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, DataError::FileNotFound { .. }));
    }

    #[test]
    fn test_filter_sparse_users() {
        let ratings = vec![
            RatingRecord::new("u1", "m1", 5.0),
            RatingRecord::new("u1", "m2", 3.0),
            RatingRecord::new("u2", "m1", 4.0),
        ];
        let filtered = filter_sparse_users(ratings.clone(), 2);
        assert_eq!(filtered.len(), 2);
        assert!(filtered.iter().all(|r| r.user_id == "u1"));

        // min_ratings of 1 keeps everything
        let kept = filter_sparse_users(ratings, 1);
        assert_eq!(kept.len(), 3);
    }

    #[test]
    fn test_load_content_rows() {
        let path = write_temp(
            "content.csv",
            "movie_id,content_text\nm1,\"toy story animation comedy\"\nm2,\n",
        );
        let rows = load_content_csv(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].text, "toy story animation comedy");
        // Empty text is preserved as an (eventual) zero row, not dropped
        assert_eq!(rows[1].text, "");
    }
}
