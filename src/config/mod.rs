//! Project file codec and configuration loading.

pub mod settings;

pub use settings::SettingsManager;

use crate::models::ProjectConfig;
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use serde::Deserialize;
use std::fs;
use thiserror::Error;

/// Errors raised while reading or writing a project file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read project file {path}")]
    Read {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse project file {path}: {source}")]
    Parse {
        path: Utf8PathBuf,
        #[source]
        source: serde_yaml_ng::Error,
    },

    #[error("failed to serialize project configuration")]
    Serialize(#[source] serde_yaml_ng::Error),

    #[error("failed to write project file {path}")]
    Write {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// Short message suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            ConfigError::Parse { path, source } => format!(
                "the project file {} could not be read: {}",
                path.file_name().unwrap_or(path.as_str()),
                source
            ),
            other => format!("unable to initialize project - {}", other),
        }
    }
}

/// Reads and writes the on-disk project file.
pub trait ProjectFileCodec {
    /// Read the project file, filling absent fields from `defaults`.
    ///
    /// The returned flag is `true` when at least one default was used.
    fn read(
        &self,
        path: &Utf8Path,
        defaults: &ProjectConfig,
    ) -> Result<(ProjectConfig, bool), ConfigError>;

    fn write(&self, path: &Utf8Path, config: &ProjectConfig) -> Result<(), ConfigError>;
}

/// Project file stored as a YAML mapping of `Key: value` lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlProjectFile;

#[derive(Debug, Default, Deserialize)]
struct ProjectFileFields {
    #[serde(rename = "UseSpacesForTab")]
    use_spaces_for_tab: Option<bool>,

    #[serde(rename = "NumSpacesForTab")]
    num_spaces_for_tab: Option<u32>,

    #[serde(rename = "Encoding")]
    encoding: Option<String>,

    #[serde(flatten)]
    extra: IndexMap<String, serde_yaml_ng::Value>,
}

impl ProjectFileFields {
    fn merge(self, defaults: &ProjectConfig) -> (ProjectConfig, bool) {
        let mut provided_defaults = false;

        let use_spaces_for_tab = self.use_spaces_for_tab.unwrap_or_else(|| {
            provided_defaults = true;
            defaults.use_spaces_for_tab
        });
        let num_spaces_for_tab = self.num_spaces_for_tab.unwrap_or_else(|| {
            provided_defaults = true;
            defaults.num_spaces_for_tab
        });
        let encoding = match self.encoding {
            Some(encoding) if !encoding.trim().is_empty() => encoding,
            _ => {
                provided_defaults = true;
                defaults.encoding.clone()
            }
        };

        let config = ProjectConfig {
            use_spaces_for_tab,
            num_spaces_for_tab,
            encoding,
            extra: self.extra,
        };
        (config, provided_defaults)
    }
}

impl ProjectFileCodec for YamlProjectFile {
    fn read(
        &self,
        path: &Utf8Path,
        defaults: &ProjectConfig,
    ) -> Result<(ProjectConfig, bool), ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        // An empty file is a valid project with every option defaulted
        let fields = if contents.trim().is_empty() {
            ProjectFileFields::default()
        } else {
            serde_yaml_ng::from_str::<ProjectFileFields>(&contents).map_err(|source| {
                ConfigError::Parse {
                    path: path.to_path_buf(),
                    source,
                }
            })?
        };

        Ok(fields.merge(defaults))
    }

    fn write(&self, path: &Utf8Path, config: &ProjectConfig) -> Result<(), ConfigError> {
        let yaml = serde_yaml_ng::to_string(config).map_err(ConfigError::Serialize)?;
        fs::write(path, yaml).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Load the project configuration, persisting it back when defaults were filled in.
///
/// Rewriting is best-effort: a failed write is logged and the merged
/// configuration is still returned. The flag reports whether defaults were used.
pub fn load_project_config(
    codec: &dyn ProjectFileCodec,
    project_file: &Utf8Path,
    defaults: &ProjectConfig,
) -> Result<(ProjectConfig, bool), ConfigError> {
    let (config, provided_defaults) = codec.read(project_file, defaults)?;

    if provided_defaults {
        match codec.write(project_file, &config) {
            Ok(()) => tracing::info!("Wrote default project options to {}", project_file),
            Err(e) => tracing::error!("Failed to persist project defaults: {:#}", anyhow::Error::new(e)),
        }
    }

    tracing::debug!(
        "Loaded project config from {} (defaults provided: {})",
        project_file,
        provided_defaults
    );
    Ok((config, provided_defaults))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn project_file(contents: &str) -> (TempDir, Utf8PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let dir = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let path = dir.join("demo.projctx");
        fs::write(&path, contents).unwrap();
        (temp_dir, path)
    }

    fn defaults() -> ProjectConfig {
        ProjectConfig {
            use_spaces_for_tab: false,
            num_spaces_for_tab: 8,
            encoding: "windows-1252".to_string(),
            extra: IndexMap::new(),
        }
    }

    #[test]
    fn test_missing_field_uses_default() {
        let (_dir, path) = project_file("UseSpacesForTab: true\nEncoding: UTF-8\n");

        let (config, provided) = YamlProjectFile.read(&path, &defaults()).unwrap();

        assert!(provided);
        assert!(config.use_spaces_for_tab);
        assert_eq!(config.num_spaces_for_tab, 8);
        assert_eq!(config.encoding, "UTF-8");
    }

    #[test]
    fn test_complete_file_needs_no_defaults() {
        let (_dir, path) =
            project_file("UseSpacesForTab: true\nNumSpacesForTab: 4\nEncoding: UTF-8\n");

        let (config, provided) = YamlProjectFile.read(&path, &defaults()).unwrap();

        assert!(!provided);
        assert_eq!(config.num_spaces_for_tab, 4);
    }

    #[test]
    fn test_empty_file_is_all_defaults() {
        let (_dir, path) = project_file("");

        let (config, provided) = YamlProjectFile.read(&path, &defaults()).unwrap();

        assert!(provided);
        assert_eq!(config, defaults());
    }

    #[test]
    fn test_blank_encoding_is_defaulted() {
        let (_dir, path) =
            project_file("UseSpacesForTab: true\nNumSpacesForTab: 4\nEncoding: ''\n");

        let (config, provided) = YamlProjectFile.read(&path, &defaults()).unwrap();

        assert!(provided);
        assert_eq!(config.encoding, "windows-1252");
    }

    #[test]
    fn test_unknown_keys_survive_rewrite() {
        let (_dir, path) = project_file("RestoreWorkspace: Default\nNumSpacesForTab: 3\n");

        let (config, provided) = load_project_config(&YamlProjectFile, &path, &defaults()).unwrap();
        assert!(provided);

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("RestoreWorkspace: Default"));
        assert!(written.contains("NumSpacesForTab: 3"));

        let (reloaded, provided_again) = YamlProjectFile.read(&path, &defaults()).unwrap();
        assert!(!provided_again);
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_malformed_file_reports_parse_error() {
        let (_dir, path) = project_file("NumSpacesForTab: [not, a, number]\n");

        let err = YamlProjectFile.read(&path, &defaults()).unwrap_err();

        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.user_message().starts_with("the project file demo.projctx could not be read"));
    }

    #[test]
    fn test_missing_file_reports_read_error() {
        let err = YamlProjectFile
            .read(Utf8Path::new("/definitely/not/here.projctx"), &defaults())
            .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
