//! The exposed query surface.
//!
//! One entry point, three anchor kinds:
//! 1. A known user id → user-anchored hybrid ranking
//! 2. A set of seed item ids → seed-anchored hybrid ranking
//! 3. Free-form text → content profile → seed-anchored hybrid ranking
//!
//! Every mode returns an ordered list of [`ScoreEntry`]; titles and
//! poster URLs are attached afterwards when the corresponding subsystem
//! is available, and silently omitted when it is not.

use crate::context::EngineContext;
use crate::error::{EngineError, Result};
use content_index::Profile;
use data_loader::ItemId;
use serde::Serialize;
use tracing::{debug, instrument, warn};

/// How many cast names feed a text-derived profile per seed item.
const SEED_CAST_LIMIT: usize = 10;

/// What a query is anchored on.
#[derive(Debug, Clone)]
pub enum Query {
    /// A user known to the CF index (unknown ids cold-start, never fail)
    User(String),
    /// Ad-hoc liked items; ids outside the content space are resolved
    /// through the external metadata lookup
    Seeds(Vec<ItemId>),
    /// Free-form taste description
    Text(String),
}

/// One result row of the query surface.
///
/// `score` is always the ranking key of the mode that produced the entry;
/// the per-signal fields are present when that signal participated.
/// Constructed fresh per query, never shared or mutated after return.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreEntry {
    pub item_id: ItemId,
    pub score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cf_score: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_score: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hybrid_score: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster_url: Option<String>,
}

impl ScoreEntry {
    fn new(item_id: ItemId, score: f32) -> Self {
        Self {
            item_id,
            score,
            cf_score: None,
            content_score: None,
            hybrid_score: None,
            title: None,
            poster_url: None,
        }
    }
}

impl EngineContext {
    /// Dispatch a query to its mode. The one "not found"-class outcome is
    /// [`EngineError::NoProfileAvailable`] from the seed/text modes.
    pub async fn recommend(&self, query: &Query, n: usize) -> Result<Vec<ScoreEntry>> {
        match query {
            Query::User(user_id) => self.recommend_for_user(user_id, n, true).await,
            Query::Seeds(seeds) => self.recommend_seed_hybrid(seeds, n).await,
            Query::Text(text) => self.recommend_from_text(text, n).await,
        }
    }

    /// User-anchored hybrid ranking (falls back to plain CF inside the
    /// blender when no taste profile exists).
    #[instrument(skip(self))]
    pub async fn recommend_for_user(
        &self,
        user_id: &str,
        n: usize,
        exclude_rated: bool,
    ) -> Result<Vec<ScoreEntry>> {
        let rows = self.blender().recommend_for_user(user_id, n, exclude_rated);
        let mut entries: Vec<ScoreEntry> = rows
            .into_iter()
            .map(|row| {
                let mut entry =
                    ScoreEntry::new(row.item_id, row.hybrid_score.unwrap_or(row.cf_score));
                entry.cf_score = Some(row.cf_score);
                entry.hybrid_score = row.hybrid_score;
                entry
            })
            .collect();
        self.enrich(&mut entries).await;
        Ok(entries)
    }

    /// Plain CF ranking, no content signal.
    #[instrument(skip(self))]
    pub async fn recommend_cf_only(
        &self,
        user_id: &str,
        n: usize,
        exclude_rated: bool,
    ) -> Result<Vec<ScoreEntry>> {
        let rows = self.cf().recommend(user_id, n, exclude_rated);
        let mut entries: Vec<ScoreEntry> = rows
            .into_iter()
            .map(|row| {
                let mut entry = ScoreEntry::new(row.item_id, row.score);
                entry.cf_score = Some(row.score);
                entry
            })
            .collect();
        self.enrich(&mut entries).await;
        Ok(entries)
    }

    /// Seed-anchored hybrid ranking: content similarity blended with the
    /// item-popularity proxy.
    #[instrument(skip(self, seeds), fields(seed_count = seeds.len()))]
    pub async fn recommend_seed_hybrid(&self, seeds: &[ItemId], n: usize) -> Result<Vec<ScoreEntry>> {
        let (profile, mapped) = self.seed_profile(seeds).await?;
        let rows = self.blender().recommend_from_profile(&profile, &mapped, n);
        let mut entries: Vec<ScoreEntry> = rows
            .into_iter()
            .map(|row| {
                let mut entry = ScoreEntry::new(row.item_id, row.hybrid_score);
                entry.cf_score = Some(row.cf_score);
                entry.content_score = Some(row.content_score);
                entry.hybrid_score = Some(row.hybrid_score);
                entry
            })
            .collect();
        self.enrich(&mut entries).await;
        Ok(entries)
    }

    /// Seed-anchored content-only ranking, no popularity blending.
    #[instrument(skip(self, seeds), fields(seed_count = seeds.len()))]
    pub async fn recommend_seed_content(&self, seeds: &[ItemId], n: usize) -> Result<Vec<ScoreEntry>> {
        let (profile, mapped) = self.seed_profile(seeds).await?;
        let rows = self.content().recommend_from_profile(&profile, n, &mapped);
        let mut entries: Vec<ScoreEntry> = rows
            .into_iter()
            .map(|row| {
                let mut entry = ScoreEntry::new(row.item_id, row.score);
                entry.content_score = Some(row.score);
                entry
            })
            .collect();
        self.enrich(&mut entries).await;
        Ok(entries)
    }

    /// Rank from a free-text taste description.
    #[instrument(skip(self, text))]
    pub async fn recommend_from_text(&self, text: &str, n: usize) -> Result<Vec<ScoreEntry>> {
        let profile = self
            .content()
            .profile_from_texts(&[text.to_string()])
            .ok_or(EngineError::NoProfileAvailable)?;
        let rows = self.blender().recommend_from_profile(&profile, &[], n);
        let mut entries: Vec<ScoreEntry> = rows
            .into_iter()
            .map(|row| {
                let mut entry = ScoreEntry::new(row.item_id, row.hybrid_score);
                entry.cf_score = Some(row.cf_score);
                entry.content_score = Some(row.content_score);
                entry.hybrid_score = Some(row.hybrid_score);
                entry
            })
            .collect();
        self.enrich(&mut entries).await;
        Ok(entries)
    }

    /// Build the seed profile: mapped seeds average their index rows,
    /// unmapped seeds are resolved through the metadata lookup into a
    /// text-derived profile, and the two are merged. Returns the mapped
    /// seed ids as well so the caller can exclude them from results.
    async fn seed_profile(&self, seeds: &[ItemId]) -> Result<(Profile, Vec<ItemId>)> {
        let (mapped, missing): (Vec<ItemId>, Vec<ItemId>) = seeds
            .iter()
            .cloned()
            .partition(|seed| self.content().contains(seed));

        let mapped_profile = if mapped.is_empty() {
            None
        } else {
            self.content().profile_from_item_ids(&mapped)
        };

        let text_profile = if missing.is_empty() {
            None
        } else {
            self.text_profile_for_missing(&missing).await
        };

        let profile = match (mapped_profile, text_profile) {
            (None, None) => return Err(EngineError::NoProfileAvailable),
            (Some(profile), None) | (None, Some(profile)) => profile,
            (Some(a), Some(b)) => Profile::merge(&a, &b).ok_or(EngineError::NoProfileAvailable)?,
        };
        Ok((profile, mapped))
    }

    /// Fetch content text for seeds outside the content space.
    ///
    /// Such ids are treated as external metadata ids; seeds that cannot
    /// be parsed or fetched are dropped (their absence only thins the
    /// profile, it never fails the query).
    async fn text_profile_for_missing(&self, missing: &[ItemId]) -> Option<Profile> {
        let tmdb = self.tmdb()?;

        let mut texts = Vec::new();
        for seed in missing {
            let Ok(tmdb_id) = seed.parse::<u64>() else {
                debug!("Seed {} is not in the content space nor a metadata id", seed);
                continue;
            };
            match tmdb.fetch_movie_bundle(tmdb_id, SEED_CAST_LIMIT).await {
                Ok(bundle) => texts.push(bundle.content_text()),
                Err(e) => {
                    warn!("Metadata lookup for seed {} failed ({}), dropping it", seed, e);
                }
            }
        }
        if texts.is_empty() {
            return None;
        }
        self.content().profile_from_texts(&texts)
    }

    /// Attach display titles and poster URLs where the corresponding
    /// subsystem is available. Failures degrade the field to absent.
    async fn enrich(&self, entries: &mut [ScoreEntry]) {
        if let Some(titles) = self.titles() {
            for entry in entries.iter_mut() {
                entry.title = titles.get(&entry.item_id).map(String::from);
            }
        }
        if self.tmdb().is_some() {
            for entry in entries.iter_mut() {
                entry.poster_url = self
                    .poster_url_for(&entry.item_id, entry.title.as_deref())
                    .await;
            }
        }
    }

    /// Resolve (and memoize) the poster URL for an item.
    ///
    /// The cache stores negative results too, so a movie without a poster
    /// is only looked up once. Concurrent misses may fetch twice; the
    /// last writer wins.
    async fn poster_url_for(&self, item_id: &str, title: Option<&str>) -> Option<String> {
        if let Some(cached) = self.poster_cache().read().await.get(item_id) {
            return cached.clone();
        }
        let tmdb = self.tmdb()?;

        // Catalog ids mean nothing to the metadata API, so resolution
        // goes through a title search; no title, no poster
        let poster_path = match title {
            Some(title) => match tmdb.search_movie(title, None).await {
                Ok(results) => results.into_iter().next().and_then(|hit| hit.poster_path),
                Err(e) => {
                    warn!("Poster search for \"{}\" failed: {}", title, e);
                    None
                }
            },
            None => None,
        };

        let url = poster_path.as_deref().map(tmdb_client::poster_url);
        self.poster_cache()
            .write()
            .await
            .insert(item_id.to_string(), url.clone());
        url
    }
}
