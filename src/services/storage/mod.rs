use crate::config::RedisConfig;
use crate::error::{RecError, RecResult};
use crate::models::{Rating, UserId};
use crate::utils::validation::validate_ratings;
use dashmap::DashMap;
use redis::AsyncCommands;
use tracing::{debug, info};

#[async_trait::async_trait]
pub trait RatingStore: Send + Sync {
    /// Empty when the user is unknown.
    async fn get_ratings(&self, user_id: UserId) -> RecResult<Vec<Rating>>;

    async fn put_ratings(&self, user_id: UserId, ratings: &[Rating]) -> RecResult<()>;

    /// Appends to an existing history. Unknown users are left untouched and
    /// `false` is returned.
    async fn append_ratings(&self, user_id: UserId, ratings: &[Rating]) -> RecResult<bool>;

    async fn exists(&self, user_id: UserId) -> RecResult<bool>;
}

fn owned_by(user_id: UserId, ratings: &[Rating]) -> RecResult<()> {
    if let Some(r) = ratings.iter().find(|r| r.user_id != user_id) {
        return Err(RecError::InvalidInput(format!(
            "rating for item {} belongs to user {}, not {}",
            r.item_id, r.user_id, user_id
        )));
    }
    validate_ratings(ratings)
}

#[derive(Debug, Default)]
pub struct InMemoryRatingStore {
    histories: DashMap<UserId, Vec<Rating>>,
}

impl InMemoryRatingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl RatingStore for InMemoryRatingStore {
    async fn get_ratings(&self, user_id: UserId) -> RecResult<Vec<Rating>> {
        Ok(self
            .histories
            .get(&user_id)
            .map(|h| h.value().clone())
            .unwrap_or_default())
    }

    async fn put_ratings(&self, user_id: UserId, ratings: &[Rating]) -> RecResult<()> {
        owned_by(user_id, ratings)?;
        self.histories.insert(user_id, ratings.to_vec());
        Ok(())
    }

    async fn append_ratings(&self, user_id: UserId, ratings: &[Rating]) -> RecResult<bool> {
        owned_by(user_id, ratings)?;
        match self.histories.get_mut(&user_id) {
            Some(mut history) => {
                history.extend_from_slice(ratings);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn exists(&self, user_id: UserId) -> RecResult<bool> {
        Ok(self.histories.contains_key(&user_id))
    }
}

const APPEND_ATTEMPTS: usize = 16;

/// Stores each history as a JSON list under `<prefix>:<userId>`.
pub struct RedisRatingStore {
    redis_client: redis::Client,
    key_prefix: String,
}

impl RedisRatingStore {
    pub fn new(config: &RedisConfig) -> RecResult<Self> {
        let redis_client = redis::Client::open(config.url.as_str())?;
        info!(prefix = %config.key_prefix, "Using Redis rating store");
        Ok(Self {
            redis_client,
            key_prefix: config.key_prefix.clone(),
        })
    }

    fn key(&self, user_id: UserId) -> String {
        format!("{}:{}", self.key_prefix, user_id)
    }

    async fn read(&self, conn: &mut redis::aio::Connection, user_id: UserId) -> RecResult<Option<Vec<Rating>>> {
        let raw: Option<String> = conn.get(self.key(user_id)).await?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}

#[async_trait::async_trait]
impl RatingStore for RedisRatingStore {
    async fn get_ratings(&self, user_id: UserId) -> RecResult<Vec<Rating>> {
        let mut conn = self.redis_client.get_async_connection().await?;
        Ok(self.read(&mut conn, user_id).await?.unwrap_or_default())
    }

    async fn put_ratings(&self, user_id: UserId, ratings: &[Rating]) -> RecResult<()> {
        owned_by(user_id, ratings)?;
        let mut conn = self.redis_client.get_async_connection().await?;
        let json = serde_json::to_string(ratings)?;
        let _: () = conn.set(self.key(user_id), json).await?;
        debug!(user_id, ratings = ratings.len(), "Stored rating history");
        Ok(())
    }

    // WATCH makes the EXEC fail when another writer touched the key after
    // it was read; the append is then retried on the fresh history.
    async fn append_ratings(&self, user_id: UserId, ratings: &[Rating]) -> RecResult<bool> {
        owned_by(user_id, ratings)?;
        let key = self.key(user_id);
        let mut conn = self.redis_client.get_async_connection().await?;

        for attempt in 1..=APPEND_ATTEMPTS {
            redis::cmd("WATCH").arg(&key).query_async::<_, ()>(&mut conn).await?;
            let Some(mut history) = self.read(&mut conn, user_id).await? else {
                redis::cmd("UNWATCH").query_async::<_, ()>(&mut conn).await?;
                return Ok(false);
            };
            history.extend_from_slice(ratings);
            let json = serde_json::to_string(&history)?;

            let committed: Option<()> = redis::pipe()
                .atomic()
                .set(&key, json)
                .ignore()
                .query_async(&mut conn)
                .await?;
            if committed.is_some() {
                debug!(user_id, ratings = history.len(), "Appended to rating history");
                return Ok(true);
            }
            debug!(user_id, attempt, "Rating history changed during append, retrying");
        }

        Err(RecError::Store(format!(
            "append for user {} conflicted {} times",
            user_id, APPEND_ATTEMPTS
        )))
    }

    async fn exists(&self, user_id: UserId) -> RecResult<bool> {
        let mut conn = self.redis_client.get_async_connection().await?;
        Ok(conn.exists(self.key(user_id)).await?)
    }
}
