use crate::error::{RecError, RecResult};
use crate::models::Rating;

pub const MIN_RATING: f32 = 1.0;
pub const MAX_RATING: f32 = 5.0;

pub fn validate_rating(rating: &Rating) -> RecResult<()> {
    if !rating.value.is_finite() {
        return Err(RecError::InvalidInput(format!(
            "rating for item {} is not a finite number",
            rating.item_id
        )));
    }

    if rating.value < MIN_RATING || rating.value > MAX_RATING {
        return Err(RecError::InvalidInput(format!(
            "rating {} for item {} outside [{}, {}]",
            rating.value, rating.item_id, MIN_RATING, MAX_RATING
        )));
    }

    Ok(())
}

pub fn validate_ratings(ratings: &[Rating]) -> RecResult<()> {
    ratings.iter().try_for_each(validate_rating)
}

pub fn validate_max_results(max_results: usize) -> RecResult<()> {
    if max_results == 0 {
        return Err(RecError::Config("max_results must be greater than 0".to_string()));
    }

    if max_results > 1000 {
        return Err(RecError::Config("max_results too large (max 1000)".to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rating() {
        assert!(validate_rating(&Rating::new(1, 1, 1.0)).is_ok());
        assert!(validate_rating(&Rating::new(1, 1, 5.0)).is_ok());
        assert!(validate_rating(&Rating::new(1, 1, 3.5)).is_ok());
        assert!(validate_rating(&Rating::new(1, 1, 0.5)).is_err());
        assert!(validate_rating(&Rating::new(1, 1, 5.5)).is_err());
        assert!(validate_rating(&Rating::new(1, 1, f32::NAN)).is_err());
    }

    #[test]
    fn test_validate_max_results() {
        assert!(validate_max_results(5).is_ok());
        assert!(validate_max_results(0).is_err());
        assert!(validate_max_results(1001).is_err());
    }
}
