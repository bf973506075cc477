use crate::algorithms::genre_vector::GenreVectorBuilder;
use crate::error::{RecError, RecResult};
use crate::models::{Rating, TasteVector, UserId, UserProfile};
use nalgebra::DVector;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashSet};

pub trait SimilarUserSearch: Send + Sync {
    /// `None` when no stored user has a positive similarity to `query`.
    fn find_most_similar(&self, query: &TasteVector) -> RecResult<Option<UserId>>;

    fn dimension(&self) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cosine similarity, defined as 0 when either side is the zero vector.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> RecResult<f64> {
    if a.len() != b.len() {
        return Err(RecError::InvalidInput(format!(
            "cannot compare vectors of dimension {} and {}",
            a.len(),
            b.len()
        )));
    }
    let a = DVector::from_column_slice(a);
    let b = DVector::from_column_slice(b);
    Ok(cosine(&a, a.norm(), &b, b.norm()))
}

fn cosine(a: &DVector<f64>, norm_a: f64, b: &DVector<f64>, norm_b: f64) -> f64 {
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        a.dot(b) / (norm_a * norm_b)
    }
}

#[derive(Debug, Clone)]
struct IndexedUser {
    user_id: UserId,
    vector: DVector<f64>,
    norm: f64,
}

/// Users are scanned in insertion order and only a strictly greater
/// similarity replaces the current best, so the first user reaching the
/// maximum wins ties.
#[derive(Debug, Clone)]
pub struct UserSimilarityIndex {
    users: Vec<IndexedUser>,
    dimension: usize,
}

impl UserSimilarityIndex {
    pub fn empty(dimension: usize) -> Self {
        Self {
            users: Vec::new(),
            dimension,
        }
    }

    pub fn from_profiles(dimension: usize, profiles: Vec<UserProfile>) -> RecResult<Self> {
        let mut seen = HashSet::with_capacity(profiles.len());
        let mut users = Vec::with_capacity(profiles.len());

        for profile in profiles {
            if profile.taste.len() != dimension {
                return Err(RecError::InvalidInput(format!(
                    "user {} vector has dimension {}, expected {}",
                    profile.user_id,
                    profile.taste.len(),
                    dimension
                )));
            }
            if !seen.insert(profile.user_id) {
                return Err(RecError::InvalidInput(format!(
                    "user {} appears more than once",
                    profile.user_id
                )));
            }
            let vector = DVector::from_vec(profile.taste.into_components());
            let norm = vector.norm();
            users.push(IndexedUser {
                user_id: profile.user_id,
                vector,
                norm,
            });
        }

        Ok(Self { users, dimension })
    }

    pub fn from_ratings(builder: &GenreVectorBuilder, ratings: &[Rating]) -> RecResult<Self> {
        let profiles = build_profiles(builder, ratings)?;
        Self::from_profiles(builder.dimension(), profiles)
    }

    pub fn user_ids(&self) -> impl Iterator<Item = UserId> + '_ {
        self.users.iter().map(|u| u.user_id)
    }

    pub fn profile(&self, user_id: UserId) -> Option<UserProfile> {
        self.users
            .iter()
            .find(|u| u.user_id == user_id)
            .map(|u| UserProfile::new(u.user_id, TasteVector::from_components(u.vector.as_slice().to_vec())))
    }
}

impl SimilarUserSearch for UserSimilarityIndex {
    fn find_most_similar(&self, query: &TasteVector) -> RecResult<Option<UserId>> {
        if query.len() != self.dimension {
            return Err(RecError::InvalidInput(format!(
                "query vector has dimension {}, expected {}",
                query.len(),
                self.dimension
            )));
        }

        let query = DVector::from_column_slice(query.as_slice());
        let query_norm = query.norm();

        let mut max_similarity = 0.0;
        let mut best = None;

        for user in &self.users {
            let similarity = cosine(&user.vector, user.norm, &query, query_norm);
            if similarity > max_similarity {
                max_similarity = similarity;
                best = Some(user.user_id);
            }
        }

        Ok(best)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        self.users.len()
    }
}

/// Groups ratings by user and vectorizes each history in parallel.
/// Output is ascending by user id.
pub fn build_profiles(builder: &GenreVectorBuilder, ratings: &[Rating]) -> RecResult<Vec<UserProfile>> {
    let mut by_user: BTreeMap<UserId, Vec<Rating>> = BTreeMap::new();
    for rating in ratings {
        by_user.entry(rating.user_id).or_default().push(*rating);
    }

    let groups: Vec<(UserId, Vec<Rating>)> = by_user.into_iter().collect();
    groups
        .into_par_iter()
        .map(|(user_id, history)| -> RecResult<UserProfile> {
            Ok(UserProfile::new(user_id, builder.build(&history)?))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(user_id: UserId, components: &[f64]) -> UserProfile {
        UserProfile::new(user_id, TasteVector::from_components(components.to_vec()))
    }

    #[test]
    fn test_cosine_similarity_bounds() {
        let v = [0.3, 0.0, 1.2];
        assert!((cosine_similarity(&v, &v).unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(cosine_similarity(&v, &[0.0, 0.0, 0.0]).unwrap(), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap(), 0.0);

        let opposite = cosine_similarity(&[1.0, 2.0], &[-1.0, -2.0]).unwrap();
        assert!((opposite + 1.0).abs() < 1e-12);

        let s = cosine_similarity(&[0.1, 0.7, 0.2], &[0.9, 0.05, 0.4]).unwrap();
        assert!((-1.0..=1.0).contains(&s));
    }

    #[test]
    fn test_cosine_similarity_rejects_mismatched_lengths() {
        let err = cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]).unwrap_err();
        assert!(matches!(err, RecError::InvalidInput(_)));
    }

    #[test]
    fn test_find_most_similar_picks_closest_direction() {
        let index = UserSimilarityIndex::from_profiles(
            2,
            vec![profile(1, &[1.0, 0.0]), profile(2, &[0.0, 1.0]), profile(3, &[1.0, 1.0])],
        )
        .unwrap();

        let query = TasteVector::from_components(vec![0.1, 0.9]);
        assert_eq!(index.find_most_similar(&query).unwrap(), Some(2));
    }

    #[test]
    fn test_ties_go_to_first_inserted() {
        let index = UserSimilarityIndex::from_profiles(
            2,
            vec![profile(9, &[1.0, 1.0]), profile(4, &[1.0, 1.0])],
        )
        .unwrap();

        let query = TasteVector::from_components(vec![3.0, 3.0]);
        assert_eq!(index.find_most_similar(&query).unwrap(), Some(9));
    }

    #[test]
    fn test_no_match_cases() {
        let empty = UserSimilarityIndex::empty(2);
        let query = TasteVector::from_components(vec![1.0, 0.0]);
        assert_eq!(empty.find_most_similar(&query).unwrap(), None);

        let index = UserSimilarityIndex::from_profiles(2, vec![profile(0, &[0.0, 1.0])]).unwrap();
        assert_eq!(index.find_most_similar(&query).unwrap(), None);
        assert_eq!(index.find_most_similar(&TasteVector::zeros(2)).unwrap(), None);
    }

    #[test]
    fn test_user_zero_is_a_real_match() {
        let index = UserSimilarityIndex::from_profiles(2, vec![profile(0, &[1.0, 0.0])]).unwrap();
        let query = TasteVector::from_components(vec![1.0, 0.0]);
        assert_eq!(index.find_most_similar(&query).unwrap(), Some(0));
    }

    #[test]
    fn test_rejects_bad_profiles_and_queries() {
        assert!(UserSimilarityIndex::from_profiles(2, vec![profile(1, &[1.0])]).is_err());
        assert!(UserSimilarityIndex::from_profiles(
            1,
            vec![profile(1, &[1.0]), profile(1, &[2.0])]
        )
        .is_err());

        let index = UserSimilarityIndex::empty(3);
        assert!(index.find_most_similar(&TasteVector::zeros(2)).is_err());
    }
}
