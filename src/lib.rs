pub mod actions;
pub mod app;
pub mod clock;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod hydration;
pub mod models;
pub mod notify;
pub mod reconciler;
pub mod scoring;
pub mod state;
pub mod stats;
pub mod storage;
pub mod ticker;
pub mod view;

pub use app::router;
pub use config::Config;
pub use state::AppState;
pub use storage::load_data;
pub use ticker::{tick_channel, Ticker};
