use crate::models::GlobalSettings;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use uuid::Uuid;

/// Prefix for environment variables overriding global settings (`PROJCTX_NUM_SPACES_FOR_TAB=4`).
pub const ENV_PREFIX: &str = "PROJCTX";

/// Loads and saves the per-user global settings file.
///
/// Settings are layered: built-in defaults, then `settings.yaml` in the
/// settings directory, then `PROJCTX_*` environment variables.
#[derive(Debug, Clone)]
pub struct SettingsManager {
    settings_dir: Utf8PathBuf,
    settings_path: Utf8PathBuf,
}

impl SettingsManager {
    /// Create a manager rooted at `settings_dir`, creating the directory if needed.
    pub fn new<P: AsRef<Utf8Path>>(settings_dir: P) -> Result<Self> {
        let settings_dir = settings_dir.as_ref().to_path_buf();

        if !settings_dir.exists() {
            fs::create_dir_all(&settings_dir)
                .with_context(|| format!("Failed to create settings directory: {}", settings_dir))?;
        }

        Ok(Self {
            settings_path: settings_dir.join("settings.yaml"),
            settings_dir,
        })
    }

    /// Load the layered settings.
    ///
    /// A machine-context id is generated and written back on first use so that
    /// scratch paths stay stable across sessions.
    pub fn load(&self) -> Result<GlobalSettings> {
        let layered = config::Config::builder()
            .add_source(
                config::File::new(self.settings_path.as_str(), config::FileFormat::Yaml)
                    .required(false),
            )
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("ignore_patterns"),
            )
            .build()
            .with_context(|| format!("Failed to read settings: {}", self.settings_path))?;

        let mut settings: GlobalSettings = layered
            .try_deserialize()
            .with_context(|| format!("Failed to parse settings: {}", self.settings_path))?;

        if settings.context_id.trim().is_empty() {
            settings.context_id = generate_context_id();
            tracing::info!("Generated machine context id {}", settings.context_id);
            self.save(&settings)?;
        }

        tracing::info!("Loaded global settings from {}", self.settings_path);
        Ok(settings)
    }

    pub fn save(&self, settings: &GlobalSettings) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(settings).context("Failed to serialize settings to YAML")?;

        fs::write(&self.settings_path, yaml_string)
            .with_context(|| format!("Failed to write settings: {}", self.settings_path))?;

        tracing::info!("Saved global settings to {}", self.settings_path);
        Ok(())
    }

    pub fn settings_dir(&self) -> &Utf8Path {
        &self.settings_dir
    }

    pub fn settings_path(&self) -> &Utf8Path {
        &self.settings_path
    }
}

/// Eight lowercase hex digits, random per machine/user settings store.
pub fn generate_context_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}
