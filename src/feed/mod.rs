pub mod cache;
pub mod leaderboard;
pub mod source;

pub use cache::{EventCache, SharedEventCache, TtlCache};
pub use leaderboard::{LiveScore, Scoreboard, TournamentInfo, TournamentState};
pub use source::{EspnSource, FeedConfig, LeaderboardSource};
