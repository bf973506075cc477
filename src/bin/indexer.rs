use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tasterec::algorithms::{retriever::build_profiles, ColdStartCatalog, GenreVectorBuilder, Taxonomy};
use tasterec::services::catalog::{write_records, Catalog};
use tasterec::services::snapshot;
use tasterec::{init_tracing, Config};
use tracing::info;

/// Precomputes the user vector snapshot and the cold start cache from the
/// raw rating history.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    /// Overrides `data.ratings_path`.
    #[arg(short, long)]
    ratings: Option<String>,

    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Rewrite outputs that already exist.
    #[arg(short, long)]
    force: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    std::env::set_var("RUST_LOG", &args.log_level);
    init_tracing();

    info!("Starting tasterec indexer");

    let config = Config::load_or_default(&args.config)?;
    let ratings_path = args.ratings.unwrap_or_else(|| config.data.ratings_path.clone());

    let snapshot_pending = args.force || !Path::new(&config.data.snapshot_path).exists();
    let cold_start_pending = args.force || !Path::new(&config.data.cold_start_path).exists();
    if !snapshot_pending && !cold_start_pending {
        info!("Snapshot and cold start cache already exist, nothing to do (use --force to rebuild)");
        return Ok(());
    }

    let taxonomy = Arc::new(Taxonomy::new(config.recommendation.genres.iter().cloned())?);
    let catalog = Catalog::load(&config.data.catalog_path)
        .with_context(|| format!("loading catalog {}", config.data.catalog_path))?;
    let ratings = snapshot::load_ratings(&ratings_path)
        .with_context(|| format!("loading ratings {}", ratings_path))?;

    if snapshot_pending {
        let builder = GenreVectorBuilder::new(taxonomy, &catalog, config.recommendation.max_rating)?;
        let profiles = build_profiles(&builder, &ratings)?;
        snapshot::write_snapshot(&config.data.snapshot_path, &profiles)?;
    }

    if cold_start_pending {
        let cold_start = ColdStartCatalog::compute(&catalog, &ratings, config.recommendation.cold_start_size);
        write_records(&config.data.cold_start_path, cold_start.items())?;
    }

    info!("Indexer finished");
    Ok(())
}
