//! Persisted forms of the historical rating store.
//!
//! The raw history is `userId,movieId,rating[,timestamp]` CSV, optionally
//! headed by exactly that line.
//! The snapshot holds one precomputed taste vector per user,
//! `<userId> <v0> ... <vN-1>`, so the similarity index loads without
//! re-vectorizing every history.

use crate::error::{RecError, RecResult};
use crate::models::{ItemId, Rating, TasteVector, UserId, UserProfile};
use crate::utils::{csv_error, csv_reader, is_header_row, record_line};
use serde::Deserialize;
use std::fmt::Write as _;
use std::path::Path;
use tracing::info;

pub fn load_ratings(path: impl AsRef<Path>) -> RecResult<Vec<Rating>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    let ratings = parse_ratings(&content, &path.display().to_string())?;
    info!(path = %path.display(), ratings = ratings.len(), "Loaded historical ratings");
    Ok(ratings)
}

const RATINGS_HEADER: [&str; 4] = ["userId", "movieId", "rating", "timestamp"];

#[derive(Debug, Deserialize)]
struct RatingRecord {
    user_id: UserId,
    item_id: ItemId,
    rating: f32,
    #[serde(default)]
    _timestamp: Option<i64>,
}

pub fn parse_ratings(content: &str, source_name: &str) -> RecResult<Vec<Rating>> {
    let mut ratings = Vec::new();

    for (i, result) in csv_reader(content).into_records().enumerate() {
        let record = result.map_err(|e| csv_error(source_name, e))?;
        if i == 0 && is_header_row(&record, &RATINGS_HEADER, 3) {
            continue;
        }

        let line = record_line(&record);
        if record.len() < 3 || record.len() > 4 {
            return Err(RecError::parse(
                source_name,
                line,
                format!("expected 3 or 4 fields, found {}", record.len()),
            ));
        }

        let parsed: RatingRecord = record
            .deserialize(None)
            .map_err(|e| RecError::parse(source_name, line, e.to_string()))?;
        ratings.push(Rating::new(parsed.user_id, parsed.item_id, parsed.rating));
    }

    Ok(ratings)
}

pub fn read_snapshot(path: impl AsRef<Path>, dimension: usize) -> RecResult<Vec<UserProfile>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    let profiles = parse_snapshot(&content, dimension, &path.display().to_string())?;
    info!(path = %path.display(), users = profiles.len(), dimension, "Loaded user vector snapshot");
    Ok(profiles)
}

pub fn parse_snapshot(content: &str, dimension: usize, source_name: &str) -> RecResult<Vec<UserProfile>> {
    let mut profiles = Vec::new();

    for (i, line) in content.lines().enumerate() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        if fields.len() != dimension + 1 {
            return Err(RecError::parse(
                source_name,
                i + 1,
                format!("expected {} fields, found {}", dimension + 1, fields.len()),
            ));
        }

        let user_id = fields[0]
            .parse::<UserId>()
            .map_err(|e| RecError::parse(source_name, i + 1, format!("user id: {}", e)))?;

        let components = fields[1..]
            .iter()
            .map(|f| {
                f.parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| RecError::parse(source_name, i + 1, format!("invalid component '{}'", f)))
            })
            .collect::<RecResult<Vec<f64>>>()?;

        profiles.push(UserProfile::new(user_id, TasteVector::from_components(components)));
    }

    Ok(profiles)
}

pub fn format_snapshot(profiles: &[UserProfile]) -> String {
    let mut out = String::new();
    for profile in profiles {
        let _ = write!(out, "{}", profile.user_id);
        for c in profile.taste.as_slice() {
            let _ = write!(out, " {}", c);
        }
        out.push('\n');
    }
    out
}

pub fn write_snapshot(path: impl AsRef<Path>, profiles: &[UserProfile]) -> RecResult<()> {
    std::fs::write(path.as_ref(), format_snapshot(profiles))?;
    info!(path = %path.as_ref().display(), users = profiles.len(), "Wrote user vector snapshot");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ratings_with_header_and_timestamp() {
        let content = "userId,movieId,rating,timestamp\n1,31,2.5,1260759144\n1,1029,3.0,1260759179\n";
        let ratings = parse_ratings(content, "ratings.csv").unwrap();
        assert_eq!(ratings, vec![Rating::new(1, 31, 2.5), Rating::new(1, 1029, 3.0)]);
    }

    #[test]
    fn test_parse_ratings_rejects_bad_numbers() {
        let err = parse_ratings("1,31,2.5\n1,abc,3.0\n", "ratings.csv").unwrap_err();
        assert!(matches!(err, RecError::Parse { line: 2, .. }));
        assert!(parse_ratings("1,31\n", "ratings.csv").is_err());
    }

    #[test]
    fn test_unrecognised_first_line_is_an_error() {
        let err = parse_ratings("user,movie,score\n1,31,2.5\n", "ratings.csv").unwrap_err();
        assert!(matches!(err, RecError::Parse { line: 1, .. }));

        let ratings = parse_ratings("\"1\",31,2.5\n2,31,4.0,1260759144\n", "ratings.csv").unwrap();
        assert_eq!(ratings, vec![Rating::new(1, 31, 2.5), Rating::new(2, 31, 4.0)]);
    }

    #[test]
    fn test_snapshot_preserves_bits_and_order() {
        let profiles = vec![
            UserProfile::new(3, TasteVector::from_components(vec![0.1 / 3.0, 0.0])),
            UserProfile::new(1, TasteVector::from_components(vec![1e-7, 0.25])),
        ];
        let text = format_snapshot(&profiles);
        let parsed = parse_snapshot(&text, 2, "snapshot").unwrap();
        assert_eq!(parsed, profiles);
    }

    #[test]
    fn test_snapshot_field_count_checked() {
        let err = parse_snapshot("1 0.5 0.5\n2 0.5\n", 2, "snapshot").unwrap_err();
        assert!(matches!(err, RecError::Parse { line: 2, .. }));
        assert!(parse_snapshot("1 0.5 nan\n", 2, "snapshot").is_err());
        assert!(parse_snapshot("x 0.5 0.1\n", 2, "snapshot").is_err());
    }
}
