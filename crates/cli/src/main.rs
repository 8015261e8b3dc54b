use anyhow::{Context, Result};
use cf_model::{CenteringPolicy, TrainerConfig};
use clap::{Parser, Subcommand};
use colored::Colorize;
use content_index::{ContentIndex, VectorizerParams};
use data_loader::{TitleLookup, load_content_csv, load_ratings_csv};
use server::{EngineConfig, EngineContext, Query, ScoreEntry};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

/// CineRecs - Hybrid Movie Recommendation Engine
#[derive(Parser)]
#[command(name = "cine-recs")]
#[command(about = "Hybrid movie recommendations from collaborative filtering and content similarity", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train the collaborative-filtering model and persist the artifact
    Train {
        /// Ratings CSV (defaults to MLR_RATINGS_FILE)
        #[arg(long)]
        ratings: Option<PathBuf>,

        /// Factor rank (defaults to MLR_SVD_RANK)
        #[arg(long)]
        rank: Option<usize>,

        /// Center ratings by the global mean instead of per-user means
        #[arg(long)]
        global_mean_centering: bool,
    },

    /// Build the TF-IDF content index and persist the artifact
    BuildContent {
        /// Content CSV with per-item text (defaults to MLR_CONTENT_FILE)
        #[arg(long)]
        content: Option<PathBuf>,
    },

    /// Get recommendations for a known user
    Recommend {
        /// User ID to recommend for
        #[arg(long)]
        user_id: String,

        /// Number of recommendations to return
        #[arg(long, default_value = "10")]
        n: usize,

        /// Blend content similarity into the ranking
        #[arg(long)]
        hybrid: bool,

        /// Allow items the user already rated
        #[arg(long)]
        include_rated: bool,
    },

    /// Get recommendations from a set of liked seed items
    Seed {
        /// Comma-separated seed item ids
        #[arg(long)]
        items: String,

        /// Number of recommendations to return
        #[arg(long, default_value = "10")]
        n: usize,

        /// Skip the popularity blend and rank by content similarity only
        #[arg(long)]
        content_only: bool,
    },

    /// Get recommendations from a free-form taste description
    Text {
        /// The taste description
        #[arg(long)]
        query: String,

        /// Number of recommendations to return
        #[arg(long, default_value = "10")]
        n: usize,
    },

    /// Show a user's rated movies
    User {
        /// User ID to display
        #[arg(long)]
        user_id: String,

        /// Max rows to print
        #[arg(long, default_value = "20")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = EngineConfig::from_env()?;

    // Dispatch to appropriate command handler
    match cli.command {
        Commands::Train {
            ratings,
            rank,
            global_mean_centering,
        } => handle_train(&config, ratings, rank, global_mean_centering)?,
        Commands::BuildContent { content } => handle_build_content(&config, content)?,
        Commands::Recommend {
            user_id,
            n,
            hybrid,
            include_rated,
        } => handle_recommend(&config, user_id, n, hybrid, !include_rated).await?,
        Commands::Seed {
            items,
            n,
            content_only,
        } => handle_seed(&config, items, n, content_only).await?,
        Commands::Text { query, n } => handle_text(&config, query, n).await?,
        Commands::User { user_id, limit } => handle_user(&config, user_id, limit)?,
    }

    Ok(())
}

/// Handle the 'train' command
fn handle_train(
    config: &EngineConfig,
    ratings_override: Option<PathBuf>,
    rank_override: Option<usize>,
    global_mean_centering: bool,
) -> Result<()> {
    let ratings_path = ratings_override.unwrap_or_else(|| config.ratings_file.clone());
    println!("Loading ratings from {}...", ratings_path.display());

    let start = Instant::now();
    let ratings = load_ratings_csv(&ratings_path).context("Failed to load ratings")?;
    println!("{} Loaded {} ratings in {:?}", "✓".green(), ratings.len(), start.elapsed());

    let mut trainer_config = TrainerConfig::default()
        .with_rank(rank_override.unwrap_or(config.svd_rank))
        .with_min_ratings_per_user(config.min_ratings_per_user);
    if global_mean_centering {
        trainer_config = trainer_config.with_centering(CenteringPolicy::GlobalMean);
    }

    let start = Instant::now();
    let model = cf_model::train(ratings, &trainer_config).context("Training failed")?;
    println!(
        "{} Trained model in {:?}: {} users, {} items, rank {}",
        "✓".green(),
        start.elapsed(),
        model.num_users(),
        model.num_items(),
        model.rank()
    );

    let artifact = config.cf_model_path();
    model.save(&artifact)?;
    println!("{} Saved model: {}", "✓".green(), artifact.display());
    Ok(())
}

/// Handle the 'build-content' command
fn handle_build_content(config: &EngineConfig, content_override: Option<PathBuf>) -> Result<()> {
    let content_path = content_override.unwrap_or_else(|| config.content_file.clone());
    println!("Loading content text from {}...", content_path.display());

    let rows = load_content_csv(&content_path).context("Failed to load content rows")?;
    println!("{} Loaded {} content rows", "✓".green(), rows.len());

    let start = Instant::now();
    let index = ContentIndex::fit(
        &rows,
        VectorizerParams {
            max_features: config.tfidf_max_features,
            min_df: config.tfidf_min_df,
        },
    );
    println!(
        "{} Built content index in {:?}: {} items, {} vocabulary terms",
        "✓".green(),
        start.elapsed(),
        index.num_items(),
        index.vocab_size()
    );

    let artifact = config.content_model_path();
    index.save(&artifact)?;
    println!("{} Saved index: {}", "✓".green(), artifact.display());
    Ok(())
}

/// Handle the 'recommend' command
async fn handle_recommend(
    config: &EngineConfig,
    user_id: String,
    n: usize,
    hybrid: bool,
    exclude_rated: bool,
) -> Result<()> {
    let context = load_context(config)?;

    let start = Instant::now();
    let results = if hybrid {
        context.recommend(&Query::User(user_id.clone()), n).await?
    } else {
        context.recommend_cf_only(&user_id, n, exclude_rated).await?
    };
    info!("Query completed in {:?}", start.elapsed());

    println!(
        "{}",
        format!("Recommendations for user {}:", user_id).bold().blue()
    );
    print_entries(&results);
    Ok(())
}

/// Handle the 'seed' command
async fn handle_seed(config: &EngineConfig, items: String, n: usize, content_only: bool) -> Result<()> {
    let seeds: Vec<String> = items
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    anyhow::ensure!(!seeds.is_empty(), "No seed items given");

    let context = load_context(config)?;
    let results = if content_only {
        context.recommend_seed_content(&seeds, n).await?
    } else {
        context.recommend(&Query::Seeds(seeds.clone()), n).await?
    };

    println!(
        "{}",
        format!("Recommendations from {} seed item(s):", seeds.len()).bold().blue()
    );
    print_entries(&results);
    Ok(())
}

/// Handle the 'text' command
async fn handle_text(config: &EngineConfig, query: String, n: usize) -> Result<()> {
    let context = load_context(config)?;
    let results = context.recommend(&Query::Text(query.clone()), n).await?;

    println!("{}", format!("Recommendations for \"{}\":", query).bold().blue());
    print_entries(&results);
    Ok(())
}

/// Handle the 'user' command
fn handle_user(config: &EngineConfig, user_id: String, limit: usize) -> Result<()> {
    let ratings = load_ratings_csv(&config.ratings_file).context("Failed to load ratings")?;
    let titles = TitleLookup::load_csv(&config.titles_file).ok();

    let mut rows: Vec<_> = ratings
        .into_iter()
        .filter(|r| r.user_id == user_id)
        .collect();
    anyhow::ensure!(!rows.is_empty(), "User {} has no ratings", user_id);

    rows.sort_by(|a, b| {
        b.rating
            .partial_cmp(&a.rating)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    println!("{}", format!("User {}:", user_id).bold().blue());
    println!("{}Number of ratings: {}", "• ".cyan(), rows.len());
    let avg: f32 = rows.iter().map(|r| r.rating).sum::<f32>() / rows.len() as f32;
    println!("{}Average rating: {:.2}", "• ".cyan(), avg);

    println!("Rated movies:");
    for row in rows.iter().take(limit) {
        let title = titles
            .as_ref()
            .and_then(|t| t.get(&row.item_id))
            .unwrap_or(row.item_id.as_str());
        println!("  {:.1}  {}", row.rating, title);
    }
    Ok(())
}

fn load_context(config: &EngineConfig) -> Result<EngineContext> {
    println!("Loading model artifacts from {}...", config.artifacts_dir.display());
    let start = Instant::now();
    let context = EngineContext::load(config)?;
    println!("{} Loaded models in {:?}", "✓".green(), start.elapsed());
    Ok(context)
}

/// Helper function to format and print result entries
fn print_entries(entries: &[ScoreEntry]) {
    for (rank, entry) in entries.iter().enumerate() {
        let label = entry.title.as_deref().unwrap_or(entry.item_id.as_str());
        let mut detail = format!("score {:.4}", entry.score);
        if let (Some(cf), Some(content)) = (entry.cf_score, entry.content_score) {
            detail = format!("{} (cf {:.3}, content {:.3})", detail, cf, content);
        }
        println!("{}. {} - {}", (rank + 1).to_string().green(), label, detail);
        if let Some(poster) = &entry.poster_url {
            println!("   {}", poster.dimmed());
        }
    }
    if entries.is_empty() {
        println!("{}", "(no results)".dimmed());
    }
}
