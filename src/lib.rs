pub mod app;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod logging;
pub mod models;
pub mod stats;
pub mod storage;
pub mod store;
pub mod streak;
pub mod state;

pub use app::router;
pub use config::Config;
pub use state::AppState;
pub use storage::{load_data, persist_data};
pub use streak::{classify_tier, compute_streaks, compute_streaks_from_keys};
