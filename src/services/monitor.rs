//! Directory monitoring.
//!
//! [`DirectoryMonitor`] is the seam the project context registers through.
//! Implementations report [`MonitorEvent`]s on the supplied channel from
//! whatever thread they like; the receiving side applies them on the thread
//! that owns the project.

use crate::models::{
    FileChangeEvent, FileChangeKind, FileInfo, FileTree, MonitorError, MonitorEvent, MonitorHandle,
};
use crate::services::scratch::PROJECT_USER_DIR;
use camino::{Utf8Path, Utf8PathBuf};
use notify::event::{CreateKind, EventKind, ModifyKind, RemoveKind, RenameMode};
use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher};
use regex::Regex;
use std::fs;
use std::io;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, PoisonError};

/// Names always hidden from project file listings.
const IGNORED_NAMES: &[&str] = &[PROJECT_USER_DIR, ".git", ".svn", ".hg"];

/// Decides which files are worth reporting for a project.
#[derive(Debug, Clone, Default)]
pub struct FileListingFilter {
    patterns: Vec<Regex>,
}

impl FileListingFilter {
    /// Build a filter from user-supplied patterns. Invalid patterns are logged and skipped.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Self {
        let patterns = patterns
            .iter()
            .filter_map(|pattern| match Regex::new(pattern.as_ref()) {
                Ok(regex) => Some(regex),
                Err(e) => {
                    tracing::warn!("Ignoring invalid file listing pattern '{}': {}", pattern.as_ref(), e);
                    None
                }
            })
            .collect();

        Self { patterns }
    }

    /// True when the file's own name is not ignored.
    pub fn accepts(&self, file: &FileInfo) -> bool {
        file.file_name().is_none_or(|name| self.accepts_name(name))
    }

    /// True when no component of `path` below `root` is ignored.
    pub fn accepts_within(&self, root: &Utf8Path, path: &Utf8Path) -> bool {
        let relative = path.strip_prefix(root).unwrap_or(path);
        relative
            .components()
            .all(|component| self.accepts_name(component.as_str()))
    }

    fn accepts_name(&self, name: &str) -> bool {
        !IGNORED_NAMES.contains(&name) && !self.patterns.iter().any(|re| re.is_match(name))
    }
}

/// External directory-watching subsystem.
pub trait DirectoryMonitor {
    /// Start watching `root`.
    ///
    /// Never fails directly: success is reported as [`MonitorEvent::Registered`],
    /// failure as [`MonitorEvent::RegistrationError`], both on `events`.
    fn register_monitor(
        &mut self,
        root: &Utf8Path,
        recursive: bool,
        filter: FileListingFilter,
        events: Sender<MonitorEvent>,
    );
}

/// [`DirectoryMonitor`] backed by the platform watcher from `notify`.
///
/// A watcher that reported [`MonitorEvent::Unregistered`] is dropped on the
/// next call into the monitor.
#[derive(Default)]
pub struct NotifyMonitor {
    watchers: Vec<(MonitorHandle, RecommendedWatcher)>,
    unregistered: Arc<Mutex<Vec<MonitorHandle>>>,
    next_handle: u64,
}

impl NotifyMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live registrations.
    pub fn active_registrations(&mut self) -> usize {
        self.prune_unregistered();
        self.watchers.len()
    }

    // Watchers cannot be dropped from their own event thread, so the callback
    // only records the handle.
    fn prune_unregistered(&mut self) {
        let finished = std::mem::take(&mut *self.unregistered.lock().unwrap_or_else(PoisonError::into_inner));
        if finished.is_empty() {
            return;
        }
        self.watchers.retain(|(handle, _)| !finished.contains(handle));
        tracing::debug!("Dropped {} unregistered watcher(s)", finished.len());
    }

    fn start_watch(
        &mut self,
        handle: MonitorHandle,
        root: &Utf8Path,
        recursive: bool,
        filter: FileListingFilter,
        events: Sender<MonitorEvent>,
    ) -> Result<FileTree, MonitorError> {
        let registration_error = |message: String| MonitorError::Registration {
            path: root.to_path_buf(),
            message,
        };

        let watched_root = root.to_path_buf();
        let watch_filter = filter.clone();
        let unregistered = Arc::clone(&self.unregistered);
        let mut done = false;
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<notify::Event>| {
                if done {
                    return;
                }
                match res {
                    Ok(event) => {
                        if is_root_removal(&event, &watched_root) {
                            done = true;
                            unregistered
                                .lock()
                                .unwrap_or_else(PoisonError::into_inner)
                                .push(handle);
                            let _ = events.send(MonitorEvent::Unregistered(handle));
                            return;
                        }
                        let changes = map_event(&event, &watched_root, &watch_filter);
                        if !changes.is_empty() {
                            let _ = events.send(MonitorEvent::FilesChanged(changes));
                        }
                    }
                    Err(e) => {
                        let _ = events.send(MonitorEvent::MonitoringError(MonitorError::Monitoring {
                            path: watched_root.clone(),
                            message: e.to_string(),
                        }));
                    }
                }
            },
            Config::default(),
        )
        .map_err(|e| registration_error(e.to_string()))?;

        let mode = if recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        watcher
            .watch(root.as_std_path(), mode)
            .map_err(|e| registration_error(e.to_string()))?;

        // Scan only once events are flowing so nothing created meanwhile is lost.
        let files = scan_tree(root, recursive, &filter).map_err(|e| registration_error(e.to_string()))?;

        self.watchers.push((handle, watcher));
        Ok(files)
    }
}

impl DirectoryMonitor for NotifyMonitor {
    fn register_monitor(
        &mut self,
        root: &Utf8Path,
        recursive: bool,
        filter: FileListingFilter,
        events: Sender<MonitorEvent>,
    ) {
        self.prune_unregistered();
        self.next_handle += 1;
        let handle = MonitorHandle::new(self.next_handle);

        let event = match self.start_watch(handle, root, recursive, filter, events.clone()) {
            Ok(files) => {
                tracing::info!("Monitoring {} ({} entries)", root, files.entry_count());
                MonitorEvent::Registered { handle, files }
            }
            Err(e) => MonitorEvent::RegistrationError(e),
        };
        let _ = events.send(event);
    }
}

/// List `root` (recursively if asked), skipping entries the filter rejects.
///
/// Only failing to read `root` itself is an error. Unreadable entries and
/// subdirectories below it are logged and left out of the tree.
pub fn scan_tree(root: &Utf8Path, recursive: bool, filter: &FileListingFilter) -> io::Result<FileTree> {
    let mut tree = FileTree::leaf(FileInfo::new(root, true));

    let mut entries = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Skipping unreadable entry in {}: {}", root, e);
                continue;
            }
        };
        let Ok(path) = Utf8PathBuf::try_from(entry.path()) else {
            tracing::debug!("Skipping non UTF-8 path {:?}", entry.path());
            continue;
        };
        let is_dir = match entry.file_type() {
            Ok(file_type) => file_type.is_dir(),
            Err(e) => {
                tracing::warn!("Skipping {}: {}", path, e);
                continue;
            }
        };
        let info = FileInfo::new(path, is_dir);
        if filter.accepts(&info) {
            entries.push(info);
        }
    }
    entries.sort_by(|a, b| a.path.cmp(&b.path));

    for info in entries {
        if info.is_dir && recursive {
            match scan_tree(&info.path, true, filter) {
                Ok(subtree) => tree.children.push(subtree),
                Err(e) => {
                    tracing::warn!("Not listing contents of {}: {}", info.path, e);
                    tree.children.push(FileTree::leaf(info));
                }
            }
        } else {
            tree.children.push(FileTree::leaf(info));
        }
    }
    Ok(tree)
}

fn is_root_removal(event: &notify::Event, root: &Utf8Path) -> bool {
    matches!(event.kind, EventKind::Remove(_)) && event.paths.iter().any(|p| p == root.as_std_path())
}

fn map_event(event: &notify::Event, root: &Utf8Path, filter: &FileListingFilter) -> Vec<FileChangeEvent> {
    let paths: Vec<Utf8PathBuf> = event
        .paths
        .iter()
        .filter_map(|p| Utf8PathBuf::try_from(p.clone()).ok())
        .collect();

    let mut changes = Vec::new();
    let mut push = |kind: FileChangeKind, path: &Utf8Path, is_dir: bool| {
        if filter.accepts_within(root, path) {
            changes.push(FileChangeEvent::new(kind, FileInfo::new(path, is_dir)));
        }
    };

    match event.kind {
        EventKind::Create(kind) => {
            for path in &paths {
                push(FileChangeKind::Added, path, kind == CreateKind::Folder || path.is_dir());
            }
        }
        EventKind::Remove(kind) => {
            for path in &paths {
                push(FileChangeKind::Removed, path, kind == RemoveKind::Folder);
            }
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if paths.len() >= 2 => {
            push(FileChangeKind::Removed, &paths[0], paths[1].is_dir());
            push(FileChangeKind::Added, &paths[1], paths[1].is_dir());
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            for path in &paths {
                push(FileChangeKind::Removed, path, false);
            }
        }
        EventKind::Modify(ModifyKind::Name(_)) => {
            for path in &paths {
                let kind = if path.exists() {
                    FileChangeKind::Added
                } else {
                    FileChangeKind::Removed
                };
                push(kind, path, path.is_dir());
            }
        }
        EventKind::Modify(_) => {
            for path in &paths {
                push(FileChangeKind::Modified, path, path.is_dir());
            }
        }
        EventKind::Access(_) | EventKind::Any | EventKind::Other => {}
    }
    changes
}
