pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod history;
pub mod indicators;
pub mod logging;
pub mod market;

// Re-export common modules
pub use config::Config;
pub use error::AppError;
pub use history::{HistoryRequest, HistoryService};
