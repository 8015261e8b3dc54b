//! # TMDB Client Crate
//!
//! Async client for the external movie-metadata API. The engine uses it
//! for two things only:
//! - assembling the content-text bundle for items that are missing from
//!   the content index (seed-profile text fallback)
//! - poster-URL enrichment of results
//!
//! Both are optional: a missing API key disables this subsystem, never
//! scoring. All calls are GETs with a bounded timeout; rate-limit and
//! server-error responses are retried with exponential backoff, and a
//! final failure degrades the dependent response field rather than
//! failing the request.

use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const POSTER_IMAGE_BASE: &str = "https://image.tmdb.org/t/p/w342";

/// GET retry policy: total attempts and the exponential backoff factor.
const MAX_ATTEMPTS: u32 = 5;
const BACKOFF_FACTOR_MS: u64 = 600;
/// Status classes worth retrying: rate limit and transient server errors.
const RETRY_STATUS: [u16; 5] = [429, 500, 502, 503, 504];

#[derive(Error, Debug)]
pub enum TmdbError {
    /// TMDB_API_KEY is not set; the enrichment subsystem stays disabled
    #[error("TMDB_API_KEY is not set")]
    MissingApiKey,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-retryable (or retries-exhausted) API response
    #[error("TMDB API returned status {status}: {body}")]
    Api { status: u16, body: String },
}

pub type Result<T> = std::result::Result<T, TmdbError>;

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct MovieSummary {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedEntry {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MovieDetails {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub genres: Vec<NamedEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CastMember {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CrewMember {
    pub name: String,
    #[serde(default)]
    pub job: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MovieCredits {
    #[serde(default)]
    pub cast: Vec<CastMember>,
    #[serde(default)]
    pub crew: Vec<CrewMember>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MovieKeywords {
    #[serde(default)]
    pub keywords: Vec<NamedEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<MovieSummary>,
}

/// Everything the engine wants to know about one movie, flattened from
/// the details/credits/keywords endpoints.
#[derive(Debug, Clone, Default)]
pub struct MovieBundle {
    pub title: String,
    pub release_date: Option<String>,
    pub genres: Vec<String>,
    pub cast: Vec<String>,
    pub director: Option<String>,
    pub keywords: Vec<String>,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
}

impl MovieBundle {
    /// Concatenated, lowercased content text — the exact shape the
    /// content index was fitted on: title, genres, cast, director,
    /// keywords, overview.
    pub fn content_text(&self) -> String {
        let parts = [
            self.title.clone(),
            self.genres.join(" "),
            self.cast.join(" "),
            self.director.clone().unwrap_or_default(),
            self.keywords.join(" "),
            self.overview.clone().unwrap_or_default(),
        ];
        parts
            .iter()
            .filter(|part| !part.is_empty())
            .cloned()
            .collect::<Vec<_>>()
            .join(" ")
            .trim()
            .to_lowercase()
    }

    /// Full poster image URL, if the movie has a poster at all.
    pub fn poster_url(&self) -> Option<String> {
        self.poster_path.as_deref().map(poster_url)
    }
}

/// Expand a poster path from any API response into a full image URL.
pub fn poster_url(poster_path: &str) -> String {
    format!("{}{}", POSTER_IMAGE_BASE, poster_path)
}

// =============================================================================
// Client
// =============================================================================

/// TMDB API client with bounded timeouts and GET retry.
#[derive(Debug, Clone)]
pub struct TmdbClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl TmdbClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: base_url.into(),
        })
    }

    /// Build from `TMDB_API_KEY` (+ optional `TMDB_TIMEOUT` seconds).
    ///
    /// A missing key is a configuration error the caller is expected to
    /// treat as "enrichment disabled", not as fatal.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("TMDB_API_KEY").map_err(|_| TmdbError::MissingApiKey)?;
        if api_key.trim().is_empty() {
            return Err(TmdbError::MissingApiKey);
        }
        let timeout_secs = std::env::var("TMDB_TIMEOUT")
            .ok()
            .and_then(|raw| raw.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        Self::new(api_key, DEFAULT_BASE_URL, Duration::from_secs(timeout_secs))
    }

    /// GET a JSON payload, retrying rate-limit/server-error responses and
    /// transient transport failures with exponential backoff. Only safe
    /// for idempotent reads, which is all this client issues.
    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let request = self
                .http
                .get(&url)
                .query(&[("api_key", self.api_key.as_str())])
                .query(params);

            match request.send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if RETRY_STATUS.contains(&status) && attempt < MAX_ATTEMPTS {
                        let delay = backoff_delay(attempt);
                        warn!(
                            "TMDB GET {} returned {}, retrying in {:?} (attempt {}/{})",
                            path, status, delay, attempt, MAX_ATTEMPTS
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    if !response.status().is_success() {
                        let body = response.text().await.unwrap_or_default();
                        return Err(TmdbError::Api { status, body });
                    }
                    return Ok(response.json::<T>().await?);
                }
                Err(err) if (err.is_timeout() || err.is_connect()) && attempt < MAX_ATTEMPTS => {
                    let delay = backoff_delay(attempt);
                    warn!(
                        "TMDB GET {} failed ({}), retrying in {:?} (attempt {}/{})",
                        path, err, delay, attempt, MAX_ATTEMPTS
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Search movies by title, optionally narrowed by release year.
    pub async fn search_movie(&self, title: &str, year: Option<&str>) -> Result<Vec<MovieSummary>> {
        let mut params = vec![("query", title)];
        if let Some(year) = year {
            params.push(("year", year));
        }
        let response: SearchResponse = self.get_json("/search/movie", &params).await?;
        Ok(response.results)
    }

    pub async fn movie_details(&self, tmdb_id: u64) -> Result<MovieDetails> {
        self.get_json(&format!("/movie/{}", tmdb_id), &[]).await
    }

    pub async fn movie_credits(&self, tmdb_id: u64) -> Result<MovieCredits> {
        self.get_json(&format!("/movie/{}/credits", tmdb_id), &[]).await
    }

    pub async fn movie_keywords(&self, tmdb_id: u64) -> Result<MovieKeywords> {
        self.get_json(&format!("/movie/{}/keywords", tmdb_id), &[]).await
    }

    /// Fetch details + credits + keywords and flatten into a
    /// [`MovieBundle`]. Cast is capped to the top `cast_limit` entries;
    /// the director is the first crew member with the Director job.
    pub async fn fetch_movie_bundle(&self, tmdb_id: u64, cast_limit: usize) -> Result<MovieBundle> {
        let details = self.movie_details(tmdb_id).await?;
        let credits = self.movie_credits(tmdb_id).await?;
        let keywords = self.movie_keywords(tmdb_id).await?;

        debug!("Fetched metadata bundle for tmdb id {}", tmdb_id);

        let director = credits
            .crew
            .iter()
            .find(|member| member.job.as_deref() == Some("Director"))
            .map(|member| member.name.clone());

        Ok(MovieBundle {
            title: details.title.unwrap_or_default(),
            release_date: details.release_date,
            genres: details.genres.into_iter().map(|g| g.name).collect(),
            cast: credits
                .cast
                .into_iter()
                .take(cast_limit)
                .map(|c| c.name)
                .collect(),
            director,
            keywords: keywords.keywords.into_iter().map(|k| k.name).collect(),
            overview: details.overview,
            poster_path: details.poster_path,
        })
    }
}

fn backoff_delay(attempt: u32) -> Duration {
    // factor * 2^(attempt - 1), same shape as the usual HTTP retry adapters
    Duration::from_millis(BACKOFF_FACTOR_MS * (1u64 << (attempt - 1)))
}
