use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

/// Opaque identifier of one directory-monitor registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MonitorHandle(u64);

impl MonitorHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// A file or directory seen by the monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub path: Utf8PathBuf,
    pub is_dir: bool,
}

impl FileInfo {
    pub fn new(path: impl Into<Utf8PathBuf>, is_dir: bool) -> Self {
        Self {
            path: path.into(),
            is_dir,
        }
    }

    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name()
    }
}

/// Listing of the monitored tree captured at registration time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTree {
    pub info: FileInfo,
    pub children: Vec<FileTree>,
}

impl FileTree {
    pub fn leaf(info: FileInfo) -> Self {
        Self {
            info,
            children: Vec::new(),
        }
    }

    /// Number of entries in the tree, the root included.
    pub fn entry_count(&self) -> usize {
        1 + self.children.iter().map(FileTree::entry_count).sum::<usize>()
    }

    pub fn contains(&self, path: &Utf8Path) -> bool {
        self.info.path == path || self.children.iter().any(|child| child.contains(path))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileChangeKind {
    Added,
    Removed,
    Modified,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChangeEvent {
    pub kind: FileChangeKind,
    pub file: FileInfo,
}

impl FileChangeEvent {
    pub fn new(kind: FileChangeKind, file: FileInfo) -> Self {
        Self { kind, file }
    }
}

/// Errors reported by a directory monitor. Never fatal to the project.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MonitorError {
    #[error("unable to monitor {path}: {message}")]
    Registration { path: Utf8PathBuf, message: String },

    #[error("error while monitoring {path}: {message}")]
    Monitoring { path: Utf8PathBuf, message: String },
}

/// Lifecycle and change events delivered by a directory monitor.
///
/// Monitors may produce these on a background thread; they are applied to the
/// project context on the thread that owns it.
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorEvent {
    Registered { handle: MonitorHandle, files: FileTree },
    RegistrationError(MonitorError),
    MonitoringError(MonitorError),
    FilesChanged(Vec<FileChangeEvent>),
    Unregistered(MonitorHandle),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_tree_len_and_contains() {
        let tree = FileTree {
            info: FileInfo::new("/p", true),
            children: vec![
                FileTree::leaf(FileInfo::new("/p/a.txt", false)),
                FileTree {
                    info: FileInfo::new("/p/src", true),
                    children: vec![FileTree::leaf(FileInfo::new("/p/src/lib.rs", false))],
                },
            ],
        };

        assert_eq!(tree.entry_count(), 4);
        assert_eq!(FileTree::leaf(FileInfo::new("/empty", true)).entry_count(), 1);
        assert!(tree.contains(Utf8Path::new("/p/src/lib.rs")));
        assert!(!tree.contains(Utf8Path::new("/p/missing")));
    }

    #[test]
    fn test_monitor_error_display() {
        let err = MonitorError::Registration {
            path: "/p".into(),
            message: "no watches left".to_string(),
        };
        assert_eq!(err.to_string(), "unable to monitor /p: no watches left");
    }
}
