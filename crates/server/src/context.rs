//! The application context: every loaded model and optional subsystem,
//! assembled once and passed by reference into query handling.
//!
//! There are no process-wide globals. Both artifacts sit behind `Arc` and
//! are immutable for the lifetime of the context, so any number of
//! concurrent queries can share one context without locking. The single
//! mutable structure is the poster-URL cache, which tolerates concurrent
//! read/insert; a race costs a duplicate metadata fetch, nothing more.

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use cf_model::FactorModel;
use content_index::ContentIndex;
use data_loader::{ItemId, TitleLookup};
use hybrid::{HybridBlender, HybridConfig};
use std::collections::HashMap;
use std::sync::Arc;
use tmdb_client::{TmdbClient, TmdbError};
use tokio::sync::RwLock;
use tracing::{info, warn};

#[derive(Debug)]
pub struct EngineContext {
    cf: Arc<FactorModel>,
    content: Arc<ContentIndex>,
    blender: HybridBlender,
    titles: Option<TitleLookup>,
    tmdb: Option<TmdbClient>,
    /// item id -> resolved poster URL (None = looked up, nothing found)
    poster_cache: RwLock<HashMap<ItemId, Option<String>>>,
}

impl EngineContext {
    /// Load both artifacts from disk and assemble the context.
    ///
    /// A missing or unreadable artifact is [`EngineError::ModelNotLoaded`]:
    /// the caller surfaces it as service-unavailable. A missing TMDB key
    /// or titles file only disables the corresponding enrichment.
    pub fn load(config: &EngineConfig) -> Result<Self> {
        let cf = FactorModel::load(&config.cf_model_path())
            .map_err(|e| EngineError::ModelNotLoaded(format!("{:#}", e)))?;
        let content = ContentIndex::load(&config.content_model_path())
            .map_err(|e| EngineError::ModelNotLoaded(format!("{:#}", e)))?;
        info!(
            "Loaded models: {} CF users, {} CF items, {} content items",
            cf.num_users(),
            cf.num_items(),
            content.num_items()
        );

        let titles = if config.include_titles {
            match TitleLookup::load_csv(&config.titles_file) {
                Ok(titles) => Some(titles),
                Err(e) => {
                    warn!("Title lookup unavailable ({}), titles will be omitted", e);
                    None
                }
            }
        } else {
            None
        };

        let tmdb = match TmdbClient::from_env() {
            Ok(client) => Some(client),
            Err(TmdbError::MissingApiKey) => {
                info!("TMDB_API_KEY not set, metadata enrichment disabled");
                None
            }
            Err(e) => {
                warn!("TMDB client unavailable ({}), metadata enrichment disabled", e);
                None
            }
        };

        Ok(Self::assemble(cf, content, titles, tmdb, config))
    }

    /// Assemble a context from already-built parts (in-memory pipelines,
    /// tests). No filesystem or network access.
    pub fn from_parts(
        cf: FactorModel,
        content: ContentIndex,
        titles: Option<TitleLookup>,
        tmdb: Option<TmdbClient>,
        config: &EngineConfig,
    ) -> Self {
        Self::assemble(cf, content, titles, tmdb, config)
    }

    fn assemble(
        cf: FactorModel,
        content: ContentIndex,
        titles: Option<TitleLookup>,
        tmdb: Option<TmdbClient>,
        config: &EngineConfig,
    ) -> Self {
        let cf = Arc::new(cf);
        let content = Arc::new(content);
        let blender = HybridBlender::new(Arc::clone(&cf), Arc::clone(&content)).with_config(
            HybridConfig::default()
                .with_weights(config.hybrid_cf_weight, config.hybrid_content_weight)
                .with_candidate_k(config.hybrid_candidate_k),
        );
        Self {
            cf,
            content,
            blender,
            titles,
            tmdb,
            poster_cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn cf(&self) -> &FactorModel {
        &self.cf
    }

    pub fn content(&self) -> &ContentIndex {
        &self.content
    }

    pub fn blender(&self) -> &HybridBlender {
        &self.blender
    }

    pub fn titles(&self) -> Option<&TitleLookup> {
        self.titles.as_ref()
    }

    pub fn tmdb(&self) -> Option<&TmdbClient> {
        self.tmdb.as_ref()
    }

    pub(crate) fn poster_cache(&self) -> &RwLock<HashMap<ItemId, Option<String>>> {
        &self.poster_cache
    }
}
