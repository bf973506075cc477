use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

pub type UserId = u32;
pub type ItemId = u32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub title: String,
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub user_id: UserId,
    pub item_id: ItemId,
    pub value: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ItemRating {
    pub item_id: ItemId,
    pub value: f32,
}

/// Per-category affinity. Index `i` always refers to taxonomy category `i`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TasteVector {
    components: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub taste: TasteVector,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub predicted_label: bool,
    pub score: f32,
    pub probability: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub item: Item,
    /// Absent for cold-start entries, which are not scored.
    pub prediction: Option<PredictionResult>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationSource {
    Personalized,
    ColdStart,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub user_id: UserId,
    pub similar_user_id: Option<UserId>,
    pub source: RecommendationSource,
    pub recommendations: Vec<Recommendation>,
    pub generated_at: DateTime<Utc>,
}

impl Item {
    pub fn new(id: ItemId, title: impl Into<String>, categories: Vec<String>) -> Self {
        Self {
            id,
            title: title.into(),
            categories,
        }
    }
}

impl Rating {
    pub fn new(user_id: UserId, item_id: ItemId, value: f32) -> Self {
        Self {
            user_id,
            item_id,
            value,
        }
    }
}

impl ItemRating {
    pub fn for_user(self, user_id: UserId) -> Rating {
        Rating::new(user_id, self.item_id, self.value)
    }
}

impl TasteVector {
    pub fn zeros(dimension: usize) -> Self {
        Self {
            components: vec![0.0; dimension],
        }
    }

    pub fn from_components(components: Vec<f64>) -> Self {
        Self { components }
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.components
    }

    pub fn into_components(self) -> Vec<f64> {
        self.components
    }

    pub fn is_zero(&self) -> bool {
        self.components.iter().all(|&c| c == 0.0)
    }

    pub(crate) fn components_mut(&mut self) -> &mut [f64] {
        &mut self.components
    }
}

impl UserProfile {
    pub fn new(user_id: UserId, taste: TasteVector) -> Self {
        Self { user_id, taste }
    }
}

impl Recommendation {
    pub fn scored(item: Item, prediction: PredictionResult) -> Self {
        Self {
            item,
            prediction: Some(prediction),
        }
    }

    pub fn unscored(item: Item) -> Self {
        Self {
            item,
            prediction: None,
        }
    }

    pub fn score(&self) -> Option<f32> {
        self.prediction.map(|p| p.score)
    }
}

impl RecommendationResponse {
    pub fn new(
        user_id: UserId,
        similar_user_id: Option<UserId>,
        source: RecommendationSource,
        recommendations: Vec<Recommendation>,
    ) -> Self {
        Self {
            user_id,
            similar_user_id,
            source,
            recommendations,
            generated_at: Utc::now(),
        }
    }
}
