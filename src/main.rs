use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// One-and-done golf pool server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding season.json, points.json and draft_pool.json
    #[arg(long, env = "DATA_PATH", default_value = "data")]
    data_path: String,

    /// Directory for the pool state file
    #[arg(long, env = "STATE_PATH", default_value = "state")]
    state_path: String,

    /// Run one settlement pass for the current event and exit
    #[arg(long)]
    settle_now: bool,

    /// Also settle in the background every N minutes
    #[arg(long)]
    settle_interval_mins: Option<u64>,
}

mod config;
mod error;
mod feed;
mod logging;
mod managers;
mod scoring;
mod state;
mod web;

use config::PoolConfig;
use feed::{EspnSource, EventCache, FeedConfig, LeaderboardSource, TtlCache};
use managers::{
    create_shared_pick_manager, create_shared_rule_manager, create_shared_settlement_manager,
    spawn_settlement_task,
};
use state::{create_shared_pool_database, PoolDatabase};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();

    // Create log buffer for the admin log endpoints
    let log_buffer = logging::create_log_buffer(1000);

    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_level(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::INFO)
        .with(logging::LogCaptureLayer::new(log_buffer.clone()))
        .init();

    tokio::fs::create_dir_all(&args.state_path).await.ok();
    let state_path = format!("{}/pool.json", args.state_path);

    info!("Loading configurations from {}...", args.data_path);
    let config = Arc::new(PoolConfig::load(&args.data_path));

    info!("Loading pool state from {}...", state_path);
    // A missing file starts an empty pool; anything else stops startup so the
    // next save cannot replace the ledger
    let mut database = PoolDatabase::load(&state_path).await.with_context(|| {
        format!("could not load pool state from {}; fix or move the file aside", state_path)
    })?;
    if database.roll_season(&config.season.season_id, config.season.allowances) > 0 {
        database.save(&state_path).await?;
    }
    info!(
        "Pool state: {} users, {} picks, {} golfers",
        database.user_count(),
        database.picks.len(),
        database.players.len()
    );
    let db = create_shared_pool_database(database);

    let feed_config = FeedConfig::from_env();
    info!("Leaderboard feed: {} (cache {}s)", feed_config.url, feed_config.cache_ttl.as_secs());
    let source: Arc<dyn LeaderboardSource> = Arc::new(EspnSource::new(&feed_config)?);
    let cache = Arc::new(EventCache::new(source, feed_config.cache_ttl));

    let picks = create_shared_pick_manager(db.clone(), config.clone(), cache.clone(), &state_path);
    let rules = create_shared_rule_manager(db.clone(), config.clone(), cache.clone(), &state_path);
    let settlement =
        create_shared_settlement_manager(db.clone(), config.clone(), cache.clone(), &state_path);

    if args.settle_now {
        let report = settlement.settle_week().await?;
        info!("Settlement finished: {}", serde_json::to_string(&report)?);
        return Ok(());
    }

    let weekly_cache = Arc::new(TtlCache::new(feed_config.cache_ttl));
    if let Some(mins) = args.settle_interval_mins.filter(|m| *m > 0) {
        info!("Scheduled settlement every {} minutes", mins);
        spawn_settlement_task(
            settlement.clone(),
            weekly_cache.clone(),
            Duration::from_secs(mins * 60),
        );
    }

    let sessions = web::create_session_store();
    {
        let sessions = sessions.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(3600));
            loop {
                ticker.tick().await;
                let removed = sessions.cleanup_expired().await;
                if removed > 0 {
                    info!("Dropped {} expired sessions", removed);
                }
            }
        });
    }

    let app_state = web::AppState {
        db,
        config,
        weekly_cache,
        cache,
        picks,
        rules,
        settlement,
        sessions,
        log_buffer,
        state_path,
    };

    let server_config = web::ServerConfig::from_env();
    if let Err(e) = web::start_web_server(server_config, app_state).await {
        error!("Web server error: {}", e);
        return Err(e);
    }

    Ok(())
}
