use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use crate::algorithms::taxonomy::DEFAULT_GENRES;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub data: DataConfig,
    pub classifier: ClassifierConfig,
    pub redis: RedisConfig,
    pub recommendation: RecommendationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub catalog_path: String,
    pub snapshot_path: String,
    pub cold_start_path: String,
    /// Raw `userId,movieId,rating,timestamp` history, read by the indexer only.
    pub ratings_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    pub url: String,
    pub timeout_ms: u64,
    pub max_in_flight: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Empty selects the in-process rating store.
    pub url: String,
    pub key_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationConfig {
    pub max_results: usize,
    pub cold_start_size: usize,
    pub max_rating: f64,
    pub genres: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                workers: num_cpus::get(),
            },
            data: DataConfig {
                catalog_path: "data/movies.csv".to_string(),
                snapshot_path: "data/user_ratings.txt".to_string(),
                cold_start_path: "data/best_movies.csv".to_string(),
                ratings_path: "data/ratings.csv".to_string(),
            },
            classifier: ClassifierConfig {
                url: "http://localhost:5000/predict".to_string(),
                timeout_ms: 2000,
                max_in_flight: 32,
            },
            redis: RedisConfig {
                url: String::new(),
                key_prefix: "ratings".to_string(),
            },
            recommendation: RecommendationConfig::default(),
        }
    }
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            max_results: 5,
            cold_start_size: 20,
            max_rating: 5.0,
            genres: DEFAULT_GENRES.iter().map(|g| g.to_string()).collect(),
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&Config::default())?)
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("TASTEREC").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn load_or_default(path: &str) -> anyhow::Result<Self> {
        if std::path::Path::new(path).exists() {
            Self::from_file(path)
        } else {
            tracing::info!(path, "Config file not found, using default configuration");
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_recommendation_settings() {
        let config = Config::default();
        assert_eq!(config.recommendation.max_results, 5);
        assert_eq!(config.recommendation.cold_start_size, 20);
        assert_eq!(config.recommendation.max_rating, 5.0);
        assert_eq!(config.recommendation.genres.len(), 20);
        assert!(config.redis.url.is_empty());
    }

    #[test]
    fn test_socket_addr() {
        let config = Config::default();
        let addr = config.server.socket_addr().unwrap();
        assert_eq!(addr.port(), 8080);
    }
}
