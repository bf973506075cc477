pub mod algorithms;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use error::{RecError, RecResult};
pub use models::*;

use algorithms::{ColdStartCatalog, GenreVectorBuilder, SimilarUserSearch, Taxonomy, UserSimilarityIndex};
use anyhow::{Context, Result};
use services::catalog::{parse_records, Catalog};
use services::classifier::{Classifier, HttpClassifier};
use services::recommendation::Recommender;
use services::serving::ServingService;
use services::snapshot;
use services::storage::{InMemoryRatingStore, RatingStore, RedisRatingStore};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub serving_service: Arc<ServingService>,
}

impl AppState {
    pub async fn new(config: Config) -> Result<Self> {
        let config = Arc::new(config);

        let classifier: Arc<dyn Classifier> = Arc::new(HttpClassifier::new(&config.classifier)?);
        let recommender = build_recommender(&config, classifier)?;

        let rating_store: Arc<dyn RatingStore> = if config.redis.url.is_empty() {
            info!("Using in-memory rating store");
            Arc::new(InMemoryRatingStore::new())
        } else {
            Arc::new(RedisRatingStore::new(&config.redis)?)
        };

        let serving_service = Arc::new(ServingService::new(recommender, rating_store));

        Ok(Self {
            config,
            serving_service,
        })
    }
}

/// Loads taxonomy, catalog, user vector snapshot and cold start cache.
/// Any missing or malformed input is an error.
pub fn build_recommender(config: &Config, classifier: Arc<dyn Classifier>) -> Result<Recommender> {
    utils::validation::validate_max_results(config.recommendation.max_results)?;

    let taxonomy = Arc::new(Taxonomy::new(config.recommendation.genres.iter().cloned())?);

    let catalog = Arc::new(
        Catalog::load(&config.data.catalog_path)
            .with_context(|| format!("loading catalog {}", config.data.catalog_path))?,
    );

    let vector_builder = Arc::new(GenreVectorBuilder::new(
        taxonomy.clone(),
        &catalog,
        config.recommendation.max_rating,
    )?);

    let profiles = snapshot::read_snapshot(&config.data.snapshot_path, taxonomy.len())
        .with_context(|| format!("loading snapshot {}", config.data.snapshot_path))?;
    let index = UserSimilarityIndex::from_profiles(taxonomy.len(), profiles)?;

    let cold_start_content = std::fs::read_to_string(&config.data.cold_start_path)
        .with_context(|| format!("loading cold start cache {}", config.data.cold_start_path))?;
    let cold_start = ColdStartCatalog::from_items(parse_records(
        &cold_start_content,
        &config.data.cold_start_path,
    )?);

    info!(
        categories = taxonomy.len(),
        items = catalog.len(),
        users = index.len(),
        cold_start = cold_start.len(),
        "Recommendation snapshot loaded"
    );

    Ok(Recommender::new(
        catalog,
        vector_builder,
        Arc::new(index),
        Arc::new(cold_start),
        classifier,
    )
    .with_max_results(config.recommendation.max_results)
    .with_max_in_flight(config.classifier.max_in_flight))
}

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}
