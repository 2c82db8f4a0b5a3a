/// Database configuration and connection management
pub mod database;

/// Application settings loading from config.toml
pub mod app;

pub use app::{AppConfig, load_app_configuration};
