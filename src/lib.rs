pub mod app;
pub mod cli;
pub mod client;
pub mod config;
pub mod highlight;
pub mod listing;
pub mod timers;
pub mod ui;

pub use config::{AppConfig, ConfigLoader, ConfigPaths};
