//! The active project and its lifecycle.
//!
//! [`ProjectContext`] moves through three phases:
//!
//! 1. `Uninitialized` - nothing open
//! 2. `Started` - [`startup`](ProjectContext::startup) resolved the scratch path
//!    and loaded the configuration. Only filesystem access is needed here, so it
//!    can run very early in the host's lifetime.
//! 3. `Initialized` - [`initialize`](ProjectContext::initialize) resolved the
//!    default encoding and queued directory monitoring behind the host's
//!    [`DeferredInit`] signal.
//!
//! Monitor state is tracked separately as a cached flag driven only by monitor
//! events. It starts out `true` after `startup` (see
//! [`has_file_monitor`](ProjectContext::has_file_monitor)).

pub mod session;

pub use session::ProjectSession;

use crate::config::{ConfigError, ProjectFileCodec, YamlProjectFile, load_project_config};
use crate::events::{ClientEvent, ClientEventSink, DeferredInit};
use crate::models::{DEFAULT_ENCODING, GlobalSettings, MonitorEvent, ProjectConfig, UiPrefs};
use crate::services::{
    DirectoryMonitor, EncodingResolver, EncodingValidator, FileListingFilter, ScratchPathError,
    ScratchPathResolver, TempFileProbe, WriteProbe,
};
use crate::state::{MonitorCallbackHub, MonitorCallbacks};
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use std::io;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};
use std::time::Duration;
use thiserror::Error;

/// Errors that prevent a project from opening
#[derive(Error, Debug)]
pub enum ProjectError {
    #[error("project file not found: {path}")]
    ProjectFileNotFound {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("project directory is not writable: {path}")]
    DirectoryNotWritable {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    ScratchPath(#[from] ScratchPathError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("a project is already open: {0}")]
    AlreadyActive(Utf8PathBuf),
}

impl ProjectError {
    /// Short, human-readable reason suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            ProjectError::ProjectFileNotFound { .. } => "the project file does not exist".to_string(),
            ProjectError::DirectoryNotWritable { .. } => {
                "the project directory is not writeable".to_string()
            }
            ProjectError::ScratchPath(e) => format!("unable to initialize project - {}", e),
            ProjectError::Config(e) => e.user_message(),
            ProjectError::AlreadyActive(_) => "another project is already open".to_string(),
        }
    }

    /// True for failures detected before any project state was touched.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            ProjectError::ProjectFileNotFound { .. } | ProjectError::DirectoryNotWritable { .. }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectPhase {
    Uninitialized,
    Started,
    Initialized,
}

/// Collaborators the project context depends on.
///
/// [`ProjectEnvironment::new`] wires the production implementations; the
/// `with_*` methods swap individual pieces (tests use these for doubles).
pub struct ProjectEnvironment {
    pub settings: GlobalSettings,
    pub scratch: ScratchPathResolver,
    pub probe: Box<dyn WriteProbe>,
    pub codec: Box<dyn ProjectFileCodec>,
    pub encoding: EncodingResolver,
    pub monitor: Box<dyn DirectoryMonitor>,
    pub events: Arc<dyn ClientEventSink>,
}

impl ProjectEnvironment {
    pub fn new(
        settings: GlobalSettings,
        monitor: Box<dyn DirectoryMonitor>,
        events: Arc<dyn ClientEventSink>,
    ) -> Self {
        Self {
            scratch: ScratchPathResolver::from_environment(settings.context_id.clone()),
            settings,
            probe: Box::new(TempFileProbe),
            codec: Box::new(YamlProjectFile),
            encoding: EncodingResolver::default(),
            monitor,
            events,
        }
    }

    pub fn with_scratch_resolver(mut self, scratch: ScratchPathResolver) -> Self {
        self.scratch = scratch;
        self
    }

    pub fn with_probe(mut self, probe: impl WriteProbe + 'static) -> Self {
        self.probe = Box::new(probe);
        self
    }

    pub fn with_codec(mut self, codec: impl ProjectFileCodec + 'static) -> Self {
        self.codec = Box::new(codec);
        self
    }

    pub fn with_encoding_validator(mut self, validator: impl EncodingValidator + 'static) -> Self {
        self.encoding = EncodingResolver::new(Box::new(validator));
        self
    }
}

#[derive(Debug, Clone)]
struct ActiveProject {
    file: Utf8PathBuf,
    directory: Utf8PathBuf,
    scratch_path: Utf8PathBuf,
    config: ProjectConfig,
}

/// The single active project of this process.
///
/// Owned by the host (usually through [`ProjectSession`]) and driven from one
/// control thread. Monitor events produced on other threads are queued and
/// applied by [`pump_monitor_events`](Self::pump_monitor_events).
pub struct ProjectContext {
    env: ProjectEnvironment,
    project: Option<ActiveProject>,
    phase: ProjectPhase,
    default_encoding: String,
    has_file_monitor: bool,
    hub: MonitorCallbackHub,
    monitor_events: Option<Receiver<MonitorEvent>>,
}

impl ProjectContext {
    pub fn new(env: ProjectEnvironment) -> Self {
        Self {
            env,
            project: None,
            phase: ProjectPhase::Uninitialized,
            default_encoding: String::new(),
            has_file_monitor: false,
            hub: MonitorCallbackHub::new(),
            monitor_events: None,
        }
    }

    /// Project defaults derived from the global settings.
    pub fn default_config(settings: &GlobalSettings) -> ProjectConfig {
        let encoding = if settings.default_encoding.trim().is_empty() {
            DEFAULT_ENCODING.to_string()
        } else {
            settings.default_encoding.clone()
        };

        ProjectConfig {
            use_spaces_for_tab: settings.use_spaces_for_tab,
            num_spaces_for_tab: settings.num_spaces_for_tab,
            encoding,
            ..ProjectConfig::default()
        }
    }

    /// Open `project_file`: check preconditions, resolve scratch storage and load
    /// the configuration.
    ///
    /// Nothing is committed unless every step succeeds; on error the context
    /// stays `Uninitialized`. Use [`ProjectError::user_message`] for display.
    pub fn startup(&mut self, project_file: &Utf8Path) -> Result<(), ProjectError> {
        if let Some(active) = &self.project {
            return Err(ProjectError::AlreadyActive(active.file.clone()));
        }

        let project = self.open_project(project_file).inspect_err(|e| {
            tracing::error!("Unable to open project {}: {}", project_file, e);
        })?;

        tracing::info!(
            "Project started: {} (scratch: {})",
            project.directory,
            project.scratch_path
        );
        self.project = Some(project);
        self.phase = ProjectPhase::Started;

        // Assume monitoring works so the first directory listing does not force a
        // redundant refresh; a failed registration clears this.
        self.has_file_monitor = true;

        Ok(())
    }

    fn open_project(&self, project_file: &Utf8Path) -> Result<ActiveProject, ProjectError> {
        let not_found = |source: io::Error| ProjectError::ProjectFileNotFound {
            path: project_file.to_path_buf(),
            source,
        };

        if !project_file.exists() {
            return Err(not_found(io::Error::from(io::ErrorKind::NotFound)));
        }
        let file = project_file.canonicalize_utf8().map_err(not_found)?;
        let directory = file
            .parent()
            .map(Utf8Path::to_path_buf)
            .ok_or_else(|| ScratchPathError::NoParent(file.clone()))?;

        if !self.env.probe.can_write(&directory) {
            return Err(ProjectError::DirectoryNotWritable {
                path: directory,
                source: io::Error::from(io::ErrorKind::PermissionDenied),
            });
        }

        let scratch_path = self.env.scratch.resolve(&file)?;

        let defaults = Self::default_config(&self.env.settings);
        let (config, _) = load_project_config(self.env.codec.as_ref(), &file, &defaults)?;

        Ok(ActiveProject {
            file,
            directory,
            scratch_path,
            config,
        })
    }

    /// Second startup phase, run once the host runtime is available.
    ///
    /// Without an open project this does nothing. Otherwise it resolves the
    /// default encoding (an unsupported encoding only produces a warning event)
    /// and arranges for directory monitoring to start when `deferred_init` fires.
    pub fn initialize(&mut self, deferred_init: &mut DeferredInit<ProjectContext>) {
        let Some(project) = &self.project else {
            return;
        };
        if self.phase == ProjectPhase::Initialized {
            tracing::warn!("Project {} is already initialized", project.directory);
            return;
        }

        let resolution = self.env.encoding.resolve(&project.config.encoding);
        if let Some(message) = resolution.warning {
            self.env.events.enqueue(ClientEvent::ShowWarningBar {
                severe: false,
                message,
            });
        }
        self.default_encoding = resolution.encoding;

        deferred_init.connect(|context: &mut ProjectContext| context.start_monitoring());
        self.phase = ProjectPhase::Initialized;
        tracing::info!("Project initialized (encoding: {})", self.default_encoding);
    }

    // Registering twice for the same root is the caller's problem; DeferredInit
    // only fires once.
    fn start_monitoring(&mut self) {
        let Some(project) = &self.project else {
            return;
        };
        let directory = project.directory.clone();

        let (tx, rx) = mpsc::channel();
        self.monitor_events = Some(rx);

        let filter = FileListingFilter::new(&self.env.settings.ignore_patterns);
        tracing::info!("Registering directory monitor for {}", directory);
        self.env.monitor.register_monitor(&directory, true, filter, tx);
    }

    /// Apply every queued monitor event. Returns how many were handled.
    pub fn pump_monitor_events(&mut self) -> usize {
        let events: Vec<MonitorEvent> = match &self.monitor_events {
            Some(rx) => rx.try_iter().collect(),
            None => return 0,
        };

        let count = events.len();
        for event in events {
            self.handle_monitor_event(event);
        }
        count
    }

    /// Like [`pump_monitor_events`](Self::pump_monitor_events), but waits up to
    /// `timeout` for the first event. Returns immediately when monitoring has not
    /// been requested.
    pub fn wait_for_monitor_events(&mut self, timeout: Duration) -> usize {
        let first = match &self.monitor_events {
            Some(rx) => rx.recv_timeout(timeout).ok(),
            None => None,
        };

        match first {
            Some(event) => {
                self.handle_monitor_event(event);
                1 + self.pump_monitor_events()
            }
            None => 0,
        }
    }

    /// Apply one monitor event and relay it to subscribers.
    pub fn handle_monitor_event(&mut self, event: MonitorEvent) {
        match event {
            MonitorEvent::Registered { handle, files } => {
                self.has_file_monitor = true;
                tracing::info!("Directory monitor {} registered ({} entries)", handle.id(), files.entry_count());
                self.hub.notify_registered(handle, &files);
            }
            MonitorEvent::RegistrationError(error) => {
                tracing::error!("{}", error);
                self.has_file_monitor = false;
                self.hub.notify_registration_error(&error);
            }
            MonitorEvent::MonitoringError(error) => {
                tracing::error!("{}", error);
                self.hub.notify_monitoring_error(&error);
            }
            MonitorEvent::FilesChanged(changes) => {
                if let Some(project) = &self.project {
                    self.env.events.enqueue(ClientEvent::FilesChanged {
                        root: project.directory.clone(),
                        changes: changes.clone(),
                    });
                }
                self.hub.notify_files_changed(&changes);
            }
            MonitorEvent::Unregistered(handle) => {
                self.has_file_monitor = false;
                tracing::info!("Directory monitor {} unregistered", handle.id());
                self.hub.notify_unregistered(handle);
            }
        }
    }

    /// Subscribe to monitor lifecycle events. Subscriptions are never removed.
    pub fn register_file_monitor_callbacks(&mut self, callbacks: MonitorCallbacks) {
        self.hub.subscribe(callbacks);
    }

    /// Whether cached listings of `dir` can be trusted to be kept current.
    ///
    /// `dir` must be the project root or lie beneath it once `.`/`..` and
    /// symlinks are resolved.
    pub fn is_monitoring_directory(&self, dir: &Utf8Path) -> bool {
        match &self.project {
            Some(project) => {
                self.has_file_monitor && normalize_path(dir).starts_with(&project.directory)
            }
            None => false,
        }
    }

    pub fn has_project(&self) -> bool {
        self.project.is_some()
    }

    /// Last known monitor state. Optimistically `true` between `startup` and the
    /// monitor's first report.
    pub fn has_file_monitor(&self) -> bool {
        self.has_file_monitor
    }

    pub fn phase(&self) -> ProjectPhase {
        self.phase
    }

    pub fn file(&self) -> Option<&Utf8Path> {
        self.project.as_ref().map(|p| p.file.as_path())
    }

    /// Project root (canonical).
    pub fn directory(&self) -> Option<&Utf8Path> {
        self.project.as_ref().map(|p| p.directory.as_path())
    }

    pub fn scratch_path(&self) -> Option<&Utf8Path> {
        self.project.as_ref().map(|p| p.scratch_path.as_path())
    }

    pub fn config(&self) -> Option<&ProjectConfig> {
        self.project.as_ref().map(|p| &p.config)
    }

    /// Resolved encoding; empty until [`initialize`](Self::initialize) ran.
    pub fn default_encoding(&self) -> &str {
        &self.default_encoding
    }

    pub fn ui_prefs(&self) -> Option<UiPrefs> {
        self.project.as_ref().map(|p| UiPrefs {
            use_spaces_for_tab: p.config.use_spaces_for_tab,
            num_spaces_for_tab: p.config.num_spaces_for_tab,
            default_encoding: self.default_encoding.clone(),
        })
    }

    pub fn settings(&self) -> &GlobalSettings {
        &self.env.settings
    }
}

/// Canonical form of `path` when it exists, otherwise `path` with `.` and `..`
/// components folded away.
fn normalize_path(path: &Utf8Path) -> Utf8PathBuf {
    if let Ok(canonical) = path.canonicalize_utf8() {
        return canonical;
    }

    let mut normalized = Utf8PathBuf::new();
    for component in path.components() {
        match component {
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => {
                if !normalized.pop() && !normalized.has_root() {
                    normalized.push(component);
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_folds_dot_segments() {
        assert_eq!(
            normalize_path(Utf8Path::new("/no/such/root/./src/../../elsewhere")),
            Utf8PathBuf::from("/no/such/elsewhere")
        );
        assert_eq!(
            normalize_path(Utf8Path::new("/no/such/root/src/./lib.rs")),
            Utf8PathBuf::from("/no/such/root/src/lib.rs")
        );
        assert_eq!(normalize_path(Utf8Path::new("/../no-such-dir")), Utf8PathBuf::from("/no-such-dir"));
    }

    #[test]
    fn test_default_config_from_settings() {
        let settings = GlobalSettings {
            use_spaces_for_tab: false,
            num_spaces_for_tab: 4,
            default_encoding: "windows-1252".to_string(),
            ..GlobalSettings::default()
        };

        let config = ProjectContext::default_config(&settings);

        assert!(!config.use_spaces_for_tab);
        assert_eq!(config.num_spaces_for_tab, 4);
        assert_eq!(config.encoding, "windows-1252");
    }

    #[test]
    fn test_default_config_falls_back_to_utf8() {
        let config = ProjectContext::default_config(&GlobalSettings::default());
        assert_eq!(config.encoding, "UTF-8");
    }

    #[test]
    fn test_user_messages_distinguish_preconditions() {
        let missing = ProjectError::ProjectFileNotFound {
            path: "/p/demo.projctx".into(),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        let read_only = ProjectError::DirectoryNotWritable {
            path: "/p".into(),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };

        assert_eq!(missing.user_message(), "the project file does not exist");
        assert_eq!(read_only.user_message(), "the project directory is not writeable");
        assert!(missing.is_precondition());
        assert!(read_only.is_precondition());
        assert!(!ProjectError::from(ScratchPathError::EmptyContextId).is_precondition());
    }

    #[test]
    fn test_scratch_failure_message() {
        let err = ProjectError::from(ScratchPathError::EmptyContextId);
        assert_eq!(
            err.user_message(),
            "unable to initialize project - machine context id is empty"
        );
    }
}
