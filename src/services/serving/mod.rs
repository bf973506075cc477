use crate::algorithms::SimilarUserSearch;
use crate::error::{RecError, RecResult};
use crate::models::*;
use crate::services::recommendation::Recommender;
use crate::services::storage::RatingStore;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// The recommender snapshot is never mutated; a rebuilt similarity index is
/// published by swapping the whole `Arc`, so in-flight requests finish on the
/// snapshot they started with.
pub struct ServingService {
    recommender: RwLock<Arc<Recommender>>,
    rating_store: Arc<dyn RatingStore>,
    serving_stats: DashMap<String, u64>,
}

impl ServingService {
    pub fn new(recommender: Recommender, rating_store: Arc<dyn RatingStore>) -> Self {
        Self {
            recommender: RwLock::new(Arc::new(recommender)),
            rating_store,
            serving_stats: DashMap::new(),
        }
    }

    pub fn snapshot(&self) -> Arc<Recommender> {
        self.recommender.read().clone()
    }

    pub fn swap_index(&self, similarity: Arc<dyn SimilarUserSearch>) -> RecResult<()> {
        let mut current = self.recommender.write();
        let expected = current.vector_builder().dimension();
        if similarity.dimension() != expected {
            return Err(RecError::InvalidInput(format!(
                "index dimension {} does not match taxonomy size {}",
                similarity.dimension(),
                expected
            )));
        }
        let users = similarity.len();
        *current = Arc::new(current.with_similarity(similarity));
        drop(current);

        self.increment_stat("index_swaps");
        info!(users, "Swapped in rebuilt similarity index");
        Ok(())
    }

    pub async fn login(&self, user_id: UserId) -> RecResult<bool> {
        self.rating_store.exists(user_id).await
    }

    pub async fn ratings_for(&self, user_id: UserId) -> RecResult<Vec<Rating>> {
        self.rating_store.get_ratings(user_id).await
    }

    pub async fn recommendations_for(&self, user_id: UserId) -> RecResult<RecommendationResponse> {
        self.increment_stat("total_requests");
        let start_time = Instant::now();

        let history = self.rating_store.get_ratings(user_id).await?;
        let recommender = self.snapshot();

        match recommender.recommend(user_id, &history).await {
            Ok(response) => {
                let latency = start_time.elapsed().as_millis() as u64;
                self.update_latency_stat(latency);
                self.increment_stat("successful_requests");
                if response.source == RecommendationSource::ColdStart {
                    self.increment_stat("cold_start_requests");
                }
                info!(user_id, latency_ms = latency, "Served recommendations");
                Ok(response)
            }
            Err(e) => {
                self.increment_stat("failed_requests");
                error!(user_id, error = %e, "Failed to generate recommendations");
                Err(e)
            }
        }
    }

    pub fn cold_start_items(&self) -> Vec<Recommendation> {
        self.snapshot().cold_start_items()
    }

    pub async fn create_ratings(&self, user_id: UserId, ratings: &[ItemRating]) -> RecResult<()> {
        let ratings = self.checked(user_id, ratings)?;
        self.rating_store.put_ratings(user_id, &ratings).await?;
        info!(user_id, ratings = ratings.len(), "Created rating history");
        Ok(())
    }

    /// Appends to an existing history; `false` when the user is unknown.
    pub async fn update_ratings(&self, user_id: UserId, ratings: &[ItemRating]) -> RecResult<bool> {
        let ratings = self.checked(user_id, ratings)?;
        let updated = self.rating_store.append_ratings(user_id, &ratings).await?;
        if !updated {
            warn!(user_id, "Ignoring rating update for unknown user");
        }
        Ok(updated)
    }

    // Ratings must name catalog items, or later vector builds would fail.
    fn checked(&self, user_id: UserId, ratings: &[ItemRating]) -> RecResult<Vec<Rating>> {
        let recommender = self.snapshot();
        ratings
            .iter()
            .map(|r| {
                if recommender.catalog().contains(r.item_id) {
                    Ok(r.for_user(user_id))
                } else {
                    Err(RecError::UnknownItem(r.item_id))
                }
            })
            .collect()
    }

    pub fn stats(&self) -> HashMap<String, u64> {
        self.serving_stats
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect()
    }

    fn increment_stat(&self, key: &str) {
        *self.serving_stats.entry(key.to_string()).or_insert(0) += 1;
    }

    fn update_latency_stat(&self, latency_ms: u64) {
        let current_avg = self.serving_stats.get("avg_latency_ms").map(|v| *v).unwrap_or(0);
        let served = self.serving_stats.get("successful_requests").map(|v| *v).unwrap_or(0) + 1;

        let new_avg = (current_avg * (served - 1) + latency_ms) / served;
        self.serving_stats.insert("avg_latency_ms".to_string(), new_avg);

        let current_max = self.serving_stats.get("max_latency_ms").map(|v| *v).unwrap_or(0);
        if latency_ms > current_max {
            self.serving_stats.insert("max_latency_ms".to_string(), latency_ms);
        }
    }
}
