// Library exports for the binary and integration tests
pub mod capture;
pub mod config;
pub mod constants;
pub mod cooldown;
pub mod display;
pub mod hotkey;
pub mod icon;
pub mod indicator;
pub mod inference;
pub mod mouse;
pub mod pipeline;
pub mod processed;
pub mod shutdown;
pub mod tray;
pub mod trigger;
pub mod watcher;
