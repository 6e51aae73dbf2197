pub mod app;
pub mod cli;
pub mod haptics;
pub mod logging;
pub mod matching;
pub mod realm;
pub mod settings;
pub mod store;
pub mod theme;
pub mod types;
pub mod ui;
pub mod urgency;
