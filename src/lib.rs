// projctx - project context lifecycle
//
// Library crate: scratch storage, project configuration, encoding resolution
// and directory monitoring for a single active project.
// The binary crate (main.rs) opens a project and reports file changes.

pub mod config;
pub mod events;
pub mod logging;
pub mod models;
pub mod project;
pub mod services;
pub mod state;

// Re-export commonly used types for convenience
pub use config::{ProjectFileCodec, SettingsManager, YamlProjectFile};
pub use events::{ClientEvent, ClientEventQueue, ClientEventSink, DeferredInit};
pub use models::{GlobalSettings, MonitorEvent, ProjectConfig, UiPrefs};
pub use project::{ProjectContext, ProjectEnvironment, ProjectError, ProjectPhase, ProjectSession};
pub use state::{MonitorCallbackHub, MonitorCallbacks};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
