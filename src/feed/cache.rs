use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info};

use super::leaderboard::Scoreboard;
use super::source::LeaderboardSource;
use crate::error::Result;

/// Keyed cache whose entries go stale after a fixed time
pub struct TtlCache<V> {
    ttl: Duration,
    entries: DashMap<String, (Instant, V)>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
        }
    }

    /// Value for `key` if it was stored within the TTL
    pub fn get_fresh(&self, key: &str) -> Option<V> {
        self.entries
            .get(key)
            .filter(|entry| entry.0.elapsed() < self.ttl)
            .map(|entry| entry.1.clone())
    }

    /// Value for `key` regardless of age
    pub fn get_any(&self, key: &str) -> Option<V> {
        self.entries.get(key).map(|entry| entry.1.clone())
    }

    pub fn insert(&self, key: &str, value: V) {
        self.entries.insert(key.to_string(), (Instant::now(), value));
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

const LEADERBOARD_KEY: &str = "leaderboard";

/// The one upstream leaderboard payload, refreshed at most once per TTL
pub struct EventCache {
    source: Arc<dyn LeaderboardSource>,
    ttl: Duration,
    boards: TtlCache<Arc<Scoreboard>>,
    last_attempt: Mutex<Option<Instant>>,
    fetch_lock: tokio::sync::Mutex<()>,
}

pub type SharedEventCache = Arc<EventCache>;

impl EventCache {
    pub fn new(source: Arc<dyn LeaderboardSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            boards: TtlCache::new(ttl),
            last_attempt: Mutex::new(None),
            fetch_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Last good payload, if any
    pub fn snapshot(&self) -> Option<Arc<Scoreboard>> {
        self.boards.get_any(LEADERBOARD_KEY)
    }

    fn attempted_recently(&self) -> bool {
        let last = *self.last_attempt.lock();
        last.map(|at| at.elapsed() < self.ttl).unwrap_or(false)
    }

    /// Fetch upstream if the window has passed, then return the last good payload.
    ///
    /// Failures are logged and the previous payload is kept.
    pub async fn refresh_if_stale(&self) -> Option<Arc<Scoreboard>> {
        if self.attempted_recently() {
            return self.snapshot();
        }

        let _guard = self.fetch_lock.lock().await;

        // Another caller may have refreshed while we waited
        if self.attempted_recently() {
            return self.snapshot();
        }

        if let Err(e) = self.fetch_and_store().await {
            error!("Leaderboard refresh failed, keeping previous data: {}", e);
        }

        self.snapshot()
    }

    /// Fetch now, ignoring the TTL
    pub async fn force_refresh(&self) -> Result<Arc<Scoreboard>> {
        let _guard = self.fetch_lock.lock().await;
        self.fetch_and_store().await
    }

    async fn fetch_and_store(&self) -> Result<Arc<Scoreboard>> {
        *self.last_attempt.lock() = Some(Instant::now());

        let mut board = self.source.fetch().await?;
        board.remove_canceled();

        let board = Arc::new(board);
        info!(
            "Leaderboard refreshed: event={}, field={}",
            board.event_name().unwrap_or("none"),
            board.field().len()
        );
        self.boards.insert(LEADERBOARD_KEY, board.clone());
        Ok(board)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::error::PoolError;

    /// Serves a swappable canned payload and counts fetches
    pub struct StubSource {
        pub payload: Mutex<Option<serde_json::Value>>,
        pub fetches: AtomicUsize,
    }

    impl StubSource {
        pub fn new(payload: serde_json::Value) -> Arc<Self> {
            Arc::new(Self {
                payload: Mutex::new(Some(payload)),
                fetches: AtomicUsize::new(0),
            })
        }

        pub fn set(&self, payload: Option<serde_json::Value>) {
            *self.payload.lock() = payload;
        }

        pub fn fetch_count(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LeaderboardSource for StubSource {
        async fn fetch(&self) -> Result<Scoreboard> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            match self.payload.lock().clone() {
                Some(value) => Ok(serde_json::from_value(value)?),
                None => Err(PoolError::Feed {
                    message: "upstream unavailable".to_string(),
                }),
            }
        }
    }

    /// Cache primed with `payload`
    pub async fn primed_cache(payload: serde_json::Value) -> (Arc<StubSource>, SharedEventCache) {
        let source = StubSource::new(payload);
        let cache = Arc::new(EventCache::new(source.clone(), Duration::from_secs(60)));
        cache.refresh_if_stale().await;
        (source, cache)
    }
}
