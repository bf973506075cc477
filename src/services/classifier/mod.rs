use crate::config::ClassifierConfig;
use crate::error::{RecError, RecResult};
use crate::models::{ItemId, PredictionResult, UserId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[async_trait::async_trait]
pub trait Classifier: Send + Sync {
    async fn predict(&self, user_id: UserId, item_id: ItemId) -> RecResult<PredictionResult>;
}

#[derive(Debug, Serialize)]
struct PredictRequest {
    user_id: UserId,
    item_id: ItemId,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    predicted_label: bool,
    score: f32,
    probability: f32,
}

#[derive(Clone)]
pub struct HttpClassifier {
    http_client: reqwest::Client,
    url: String,
}

impl HttpClassifier {
    pub fn new(config: &ClassifierConfig) -> RecResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            http_client,
            url: config.url.clone(),
        })
    }
}

#[async_trait::async_trait]
impl Classifier for HttpClassifier {
    async fn predict(&self, user_id: UserId, item_id: ItemId) -> RecResult<PredictionResult> {
        let response = self
            .http_client
            .post(&self.url)
            .json(&PredictRequest { user_id, item_id })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RecError::Classifier(format!(
                "model server returned {} for user {} item {}",
                status, user_id, item_id
            )));
        }

        let body: PredictResponse = response.json().await?;
        validate_prediction(PredictionResult {
            predicted_label: body.predicted_label,
            score: body.score,
            probability: body.probability,
        })
    }
}

pub fn validate_prediction(prediction: PredictionResult) -> RecResult<PredictionResult> {
    if !prediction.score.is_finite() {
        return Err(RecError::Classifier(format!("non-finite score {}", prediction.score)));
    }
    if !(0.0..=1.0).contains(&prediction.probability) {
        return Err(RecError::Classifier(format!(
            "probability {} outside [0, 1]",
            prediction.probability
        )));
    }
    Ok(prediction)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_prediction() {
        let ok = PredictionResult {
            predicted_label: true,
            score: 3.2,
            probability: 0.9,
        };
        assert!(validate_prediction(ok).is_ok());

        let bad_probability = PredictionResult { probability: 1.5, ..ok };
        assert!(matches!(validate_prediction(bad_probability), Err(RecError::Classifier(_))));

        let bad_score = PredictionResult { score: f32::NAN, ..ok };
        assert!(validate_prediction(bad_score).is_err());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_classifier_error() {
        let classifier = HttpClassifier::new(&ClassifierConfig {
            url: "http://127.0.0.1:9/predict".to_string(),
            timeout_ms: 200,
            max_in_flight: 1,
        })
        .unwrap();

        let err = classifier.predict(1, 1).await.unwrap_err();
        assert!(matches!(err, RecError::Classifier(_)));
    }
}
