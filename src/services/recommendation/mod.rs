use crate::algorithms::{ColdStartCatalog, GenreVectorBuilder, SimilarUserSearch};
use crate::error::RecResult;
use crate::models::*;
use crate::services::catalog::Catalog;
use crate::services::classifier::Classifier;
use crate::utils::top_k_by_score;
use futures::{StreamExt, TryStreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Clone)]
pub struct Recommender {
    catalog: Arc<Catalog>,
    vector_builder: Arc<GenreVectorBuilder>,
    similarity: Arc<dyn SimilarUserSearch>,
    cold_start: Arc<ColdStartCatalog>,
    classifier: Arc<dyn Classifier>,
    max_results: usize,
    max_in_flight: usize,
}

impl Recommender {
    pub fn new(
        catalog: Arc<Catalog>,
        vector_builder: Arc<GenreVectorBuilder>,
        similarity: Arc<dyn SimilarUserSearch>,
        cold_start: Arc<ColdStartCatalog>,
        classifier: Arc<dyn Classifier>,
    ) -> Self {
        Self {
            catalog,
            vector_builder,
            similarity,
            cold_start,
            classifier,
            max_results: 5,
            max_in_flight: 32,
        }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight.max(1);
        self
    }

    pub fn with_similarity(&self, similarity: Arc<dyn SimilarUserSearch>) -> Self {
        Self {
            similarity,
            ..self.clone()
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn similarity(&self) -> &Arc<dyn SimilarUserSearch> {
        &self.similarity
    }

    pub fn vector_builder(&self) -> &Arc<GenreVectorBuilder> {
        &self.vector_builder
    }

    pub fn cold_start_items(&self) -> Vec<Recommendation> {
        self.cold_start.recommendations()
    }

    pub fn cold_start(&self, user_id: UserId) -> RecommendationResponse {
        RecommendationResponse::new(
            user_id,
            None,
            RecommendationSource::ColdStart,
            self.cold_start.recommendations(),
        )
    }

    pub async fn recommend(&self, user_id: UserId, recent_ratings: &[Rating]) -> RecResult<RecommendationResponse> {
        if recent_ratings.is_empty() {
            debug!(user_id, "No rating history, serving cold start list");
            return Ok(self.cold_start(user_id));
        }

        if self.catalog.is_empty() {
            return Ok(RecommendationResponse::new(
                user_id,
                None,
                RecommendationSource::Personalized,
                Vec::new(),
            ));
        }

        let query = self.vector_builder.build(recent_ratings)?;
        let seen: HashSet<ItemId> = recent_ratings.iter().map(|r| r.item_id).collect();

        let Some(similar_user_id) = self.similarity.find_most_similar(&query)? else {
            info!(user_id, "No similar user found, falling back to cold start list");
            return Ok(RecommendationResponse::new(
                user_id,
                None,
                RecommendationSource::ColdStart,
                self.cold_start.excluding(&seen, self.max_results),
            ));
        };

        let scored = self.score_catalog(similar_user_id).await?;
        let candidates: Vec<(&Item, PredictionResult)> = scored
            .into_iter()
            .filter(|(item, prediction)| prediction.predicted_label && !seen.contains(&item.id))
            .collect();
        let candidate_count = candidates.len();

        let recommendations: Vec<Recommendation> =
            top_k_by_score(candidates, self.max_results, |(_, p)| p.score)
                .into_iter()
                .map(|(item, prediction)| Recommendation::scored(item.clone(), prediction))
                .collect();

        info!(
            user_id,
            similar_user_id,
            candidates = candidate_count,
            returned = recommendations.len(),
            "Generated recommendations"
        );

        Ok(RecommendationResponse::new(
            user_id,
            Some(similar_user_id),
            RecommendationSource::Personalized,
            recommendations,
        ))
    }

    /// Classifier predictions for every catalog item, in catalog order.
    /// The first failed call fails the whole request.
    async fn score_catalog(&self, similar_user_id: UserId) -> RecResult<Vec<(&Item, PredictionResult)>> {
        let classifier: &dyn Classifier = self.classifier.as_ref();
        let calls: Vec<_> = self
            .catalog
            .iter()
            .map(|item| score_item(classifier, similar_user_id, item))
            .collect();

        futures::stream::iter(calls)
            .buffered(self.max_in_flight)
            .try_collect()
            .await
    }
}

async fn score_item<'a>(
    classifier: &dyn Classifier,
    user_id: UserId,
    item: &'a Item,
) -> RecResult<(&'a Item, PredictionResult)> {
    let prediction = classifier.predict(user_id, item.id).await?;
    Ok((item, prediction))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::{Taxonomy, UserSimilarityIndex};
    use crate::error::RecError;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TableClassifier {
        predictions: HashMap<(UserId, ItemId), PredictionResult>,
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl Classifier for TableClassifier {
        async fn predict(&self, user_id: UserId, item_id: ItemId) -> RecResult<PredictionResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.predictions.get(&(user_id, item_id)).copied().unwrap_or(PredictionResult {
                predicted_label: false,
                score: 0.0,
                probability: 0.0,
            }))
        }
    }

    struct FailingClassifier;

    #[async_trait::async_trait]
    impl Classifier for FailingClassifier {
        async fn predict(&self, _user_id: UserId, _item_id: ItemId) -> RecResult<PredictionResult> {
            Err(RecError::Classifier("connection refused".to_string()))
        }
    }

    fn yes(score: f32) -> PredictionResult {
        PredictionResult {
            predicted_label: true,
            score,
            probability: 0.8,
        }
    }

    fn recommender(classifier: Arc<dyn Classifier>) -> Recommender {
        let taxonomy = Arc::new(Taxonomy::new(["Action", "Drama"]).unwrap());
        let catalog = Arc::new(
            Catalog::from_items(
                (1..=8)
                    .map(|id| {
                        let genre = if id % 2 == 0 { "Drama" } else { "Action" };
                        Item::new(id, format!("Movie {}", id), vec![genre.to_string()])
                    })
                    .collect(),
            )
            .unwrap(),
        );
        let builder = Arc::new(GenreVectorBuilder::new(taxonomy, &catalog, 5.0).unwrap());
        let history = vec![Rating::new(10, 1, 5.0), Rating::new(20, 2, 5.0)];
        let index = UserSimilarityIndex::from_ratings(&builder, &history).unwrap();
        let cold_start = Arc::new(ColdStartCatalog::compute(&catalog, &history, 3));

        Recommender::new(catalog, builder, Arc::new(index), cold_start, classifier)
    }

    #[tokio::test]
    async fn test_filters_seen_and_negative_then_ranks() {
        let mut predictions = HashMap::new();
        for (item, score) in [(2, 0.4), (4, 0.9), (6, 0.9), (8, 0.1), (3, 5.0), (1, 0.2), (5, 0.7), (7, 0.6)] {
            predictions.insert((20, item), yes(score));
        }
        predictions.insert((20, 3), PredictionResult { predicted_label: false, ..yes(5.0) });

        let classifier = Arc::new(TableClassifier {
            predictions,
            calls: AtomicUsize::new(0),
        });
        let rec = recommender(classifier.clone());

        let response = rec.recommend(99, &[Rating::new(99, 2, 4.0)]).await.unwrap();

        assert_eq!(response.similar_user_id, Some(20));
        assert_eq!(response.source, RecommendationSource::Personalized);
        let ids: Vec<ItemId> = response.recommendations.iter().map(|r| r.item.id).collect();
        assert_eq!(ids, vec![4, 6, 5, 7, 1]);
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 8);
    }

    fn assert_send<T: Send>(_: &T) {}

    #[test]
    fn test_recommend_future_is_send() {
        let rec = recommender(Arc::new(FailingClassifier));
        let recent = vec![Rating::new(99, 1, 4.0)];
        let future = rec.recommend(99, &recent);
        assert_send(&future);
    }

    #[tokio::test]
    async fn test_empty_catalog_yields_empty_list_without_scoring() {
        let taxonomy = Arc::new(Taxonomy::new(["Action", "Drama"]).unwrap());
        let catalog = Arc::new(Catalog::from_items(vec![]).unwrap());
        let builder = Arc::new(GenreVectorBuilder::new(taxonomy, &catalog, 5.0).unwrap());
        let cold_start = Arc::new(ColdStartCatalog::compute(&catalog, &[], 3));
        let classifier = Arc::new(TableClassifier {
            predictions: HashMap::new(),
            calls: AtomicUsize::new(0),
        });
        let rec = Recommender::new(
            catalog,
            builder,
            Arc::new(UserSimilarityIndex::empty(2)),
            cold_start,
            classifier.clone(),
        );

        let response = rec.recommend(99, &[Rating::new(99, 1, 4.0)]).await.unwrap();

        assert_eq!(response.source, RecommendationSource::Personalized);
        assert!(response.recommendations.is_empty());
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_classifier_failure_is_fatal() {
        let rec = recommender(Arc::new(FailingClassifier));
        let err = rec.recommend(99, &[Rating::new(99, 1, 4.0)]).await.unwrap_err();
        assert!(matches!(err, RecError::Classifier(_)));
    }

    #[tokio::test]
    async fn test_empty_history_gets_cold_start() {
        let rec = recommender(Arc::new(FailingClassifier));
        let response = rec.recommend(99, &[]).await.unwrap();
        assert_eq!(response.source, RecommendationSource::ColdStart);
        assert_eq!(response.recommendations.len(), 3);
        assert!(response.recommendations.iter().all(|r| r.prediction.is_none()));
    }

    #[tokio::test]
    async fn test_unknown_item_in_history_is_lookup_error() {
        let rec = recommender(Arc::new(FailingClassifier));
        let err = rec.recommend(99, &[Rating::new(99, 404, 4.0)]).await.unwrap_err();
        assert!(err.is_lookup());
    }

    #[tokio::test]
    async fn test_no_similar_user_falls_back_without_scoring() {
        let rec = recommender(Arc::new(FailingClassifier))
            .with_similarity(Arc::new(UserSimilarityIndex::empty(2)));
        let response = rec.recommend(99, &[Rating::new(99, 1, 4.0)]).await.unwrap();

        assert_eq!(response.source, RecommendationSource::ColdStart);
        assert_eq!(response.similar_user_id, None);
        assert!(response.recommendations.iter().all(|r| r.item.id != 1));
    }
}
