//! Data models shared across the crate.
//!
//! - [`ProjectConfig`]: options persisted in the project file
//! - [`GlobalSettings`]: per-user defaults applied to every project
//! - [`UiPrefs`]: resolved editor preferences exposed for the active project
//! - [`MonitorEvent`] and friends: what a directory monitor reports

pub mod config;
pub mod monitor;

pub use config::{DEFAULT_ENCODING, GlobalSettings, ProjectConfig, UiPrefs};
pub use monitor::{
    FileChangeEvent, FileChangeKind, FileInfo, FileTree, MonitorError, MonitorEvent, MonitorHandle,
};
