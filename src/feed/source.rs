//! Upstream leaderboard sources

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::info;

use super::leaderboard::Scoreboard;
use crate::error::{PoolError, Result};

/// The leaderboard endpoint; the plain scoreboard lacks per-golfer status,
/// earnings and positions
const DEFAULT_LEADERBOARD_URL: &str =
    "https://site.web.api.espn.com/apis/site/v2/sports/golf/leaderboard?league=pga";

/// Feed settings
#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub url: String,
    pub cache_ttl: Duration,
    pub timeout: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_LEADERBOARD_URL.to_string(),
            cache_ttl: Duration::from_secs(60),
            timeout: Duration::from_secs(30),
        }
    }
}

impl FeedConfig {
    /// LEADERBOARD_URL, LEADERBOARD_EVENT, FEED_CACHE_SECS, FEED_TIMEOUT_SECS
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let mut url = std::env::var("LEADERBOARD_URL").unwrap_or(defaults.url);

        // Pin the feed to a single event id instead of "whatever is on now"
        if let Ok(event) = std::env::var("LEADERBOARD_EVENT") {
            url = pin_event(&url, &event);
        }

        let cache_ttl = std::env::var("FEED_CACHE_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.cache_ttl);

        let timeout = std::env::var("FEED_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout);

        Self {
            url,
            cache_ttl,
            timeout,
        }
    }
}

/// Append an `event=` query parameter; blank ids leave the URL alone
fn pin_event(url: &str, event: &str) -> String {
    let event = event.trim();
    if event.is_empty() {
        return url.to_string();
    }
    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{}{}event={}", url, sep, urlencoding::encode(event))
}

/// Anything that can produce the current leaderboard
#[async_trait]
pub trait LeaderboardSource: Send + Sync {
    async fn fetch(&self) -> Result<Scoreboard>;
}

/// ESPN scoreboard over HTTP
pub struct EspnSource {
    url: String,
    client: Client,
}

impl EspnSource {
    pub fn new(config: &FeedConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PoolError::Feed {
                message: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            url: config.url.clone(),
            client,
        })
    }
}

#[async_trait]
impl LeaderboardSource for EspnSource {
    async fn fetch(&self) -> Result<Scoreboard> {
        info!("Fetching leaderboard from {}", self.url);

        let response = self.client.get(&self.url).send().await?;

        if !response.status().is_success() {
            return Err(PoolError::Feed {
                message: format!("leaderboard request failed with status {}", response.status()),
            });
        }

        let board: Scoreboard = response.json().await?;
        Ok(board)
    }
}
