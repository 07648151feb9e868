use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Encoding used when neither the project nor the global settings name one.
pub const DEFAULT_ENCODING: &str = "UTF-8";

/// Project configuration as stored in the project file.
///
/// Keys that this crate does not interpret are kept in `extra` (in file order)
/// so that rewriting the file after default filling does not drop them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(rename = "UseSpacesForTab")]
    pub use_spaces_for_tab: bool,

    #[serde(rename = "NumSpacesForTab")]
    pub num_spaces_for_tab: u32,

    #[serde(rename = "Encoding")]
    pub encoding: String,

    #[serde(flatten)]
    pub extra: IndexMap<String, serde_yaml_ng::Value>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            use_spaces_for_tab: true,
            num_spaces_for_tab: 2,
            encoding: DEFAULT_ENCODING.to_string(),
            extra: IndexMap::new(),
        }
    }
}

/// Per-user settings shared by every project opened on this machine.
///
/// Loaded by [`SettingsManager`](crate::config::SettingsManager); every field
/// falls back to its default when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalSettings {
    pub use_spaces_for_tab: bool,
    pub num_spaces_for_tab: u32,

    /// Empty means "no preference" and resolves to [`DEFAULT_ENCODING`].
    pub default_encoding: String,

    /// Machine-context identifier segmenting scratch storage.
    pub context_id: String,

    /// Regular expressions matched against file names hidden from listings.
    pub ignore_patterns: Vec<String>,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            use_spaces_for_tab: true,
            num_spaces_for_tab: 2,
            default_encoding: String::new(),
            context_id: String::new(),
            ignore_patterns: Vec::new(),
        }
    }
}

/// Read-only editor preferences resolved for the active project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UiPrefs {
    pub use_spaces_for_tab: bool,
    pub num_spaces_for_tab: u32,
    pub default_encoding: String,
}
