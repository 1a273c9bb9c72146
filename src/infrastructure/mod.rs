pub mod badge_sink;
pub mod config;
pub mod error;
pub mod item_provider;
pub mod logging;
pub mod settings_store;
pub mod storage;
pub mod timer;
