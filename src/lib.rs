// Library surface for the typing engine; the TUI in main.rs is one consumer.
pub mod app_dirs;
pub mod competitor;
pub mod config;
pub mod error;
pub mod history;
pub mod pace;
pub mod passage;
pub mod runtime;
pub mod scorer;
pub mod session;
pub mod stats;
pub mod store;
pub mod timer;

pub use error::{Result, SwiftKeysError};
pub use session::{Mode, Phase, SessionController, SessionError, SessionState};

/// Seconds counted down before a race starts.
pub const COUNTDOWN_SECS: u8 = 3;
pub const COUNTDOWN_TICK_MS: u64 = 1000;
pub const COMPETITOR_TICK_MS: u64 = 200;
pub const LIVE_WPM_TICK_MS: u64 = 1000;

/// Races kept in the dashboard's recent-progress window.
pub const RECENT_PROGRESS_CAPACITY: usize = 9;

/// Durable store key for the race record.
pub const STATS_KEY: &str = "swiftkeys-stats";
