//! Per-user scratch storage for a project.
//!
//! Layout: `<project dir>/.project.user/<username>/<context id>`. The user
//! segment is skipped when no username is known. Directories are created on
//! demand and never removed.

use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::io;
use thiserror::Error;

/// Name of the hidden per-project storage directory.
pub const PROJECT_USER_DIR: &str = ".project.user";

#[derive(Error, Debug)]
pub enum ScratchPathError {
    #[error("project file {0} has no parent directory")]
    NoParent(Utf8PathBuf),

    #[error("machine context id is empty")]
    EmptyContextId,

    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to mark {path} hidden: {source}")]
    MarkHidden {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Maps a project file to its private scratch directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScratchPathResolver {
    username: Option<String>,
    context_id: String,
}

impl ScratchPathResolver {
    /// `username` is ignored when empty or when it is not a plain path segment.
    pub fn new(username: Option<String>, context_id: impl Into<String>) -> Self {
        let username = username
            .map(|name| name.trim().to_string())
            .filter(|name| is_plain_segment(name));

        Self {
            username,
            context_id: context_id.into(),
        }
    }

    /// Resolver for the OS user running this process.
    pub fn from_environment(context_id: impl Into<String>) -> Self {
        Self::new(Some(whoami::username()), context_id)
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn context_id(&self) -> &str {
        &self.context_id
    }

    /// The hidden storage directory for `project_file`, without creating it.
    pub fn project_user_dir(project_file: &Utf8Path) -> Option<Utf8PathBuf> {
        project_file.parent().map(|dir| dir.join(PROJECT_USER_DIR))
    }

    /// Resolve (and create) the scratch directory for `project_file`.
    pub fn resolve(&self, project_file: &Utf8Path) -> Result<Utf8PathBuf, ScratchPathError> {
        if !is_plain_segment(&self.context_id) {
            return Err(ScratchPathError::EmptyContextId);
        }

        let mut dir = Self::project_user_dir(project_file)
            .ok_or_else(|| ScratchPathError::NoParent(project_file.to_path_buf()))?;

        if !dir.exists() {
            ensure_directory(&dir)?;
            mark_hidden(&dir).map_err(|source| ScratchPathError::MarkHidden {
                path: dir.clone(),
                source,
            })?;
        }

        if let Some(username) = &self.username {
            dir.push(username);
            ensure_directory(&dir)?;
        }

        dir.push(&self.context_id);
        ensure_directory(&dir)?;

        tracing::debug!("Resolved scratch path {}", dir);
        Ok(dir)
    }
}

fn is_plain_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains(['/', '\\'])
}

fn ensure_directory(path: &Utf8Path) -> Result<(), ScratchPathError> {
    fs::create_dir_all(path).map_err(|source| ScratchPathError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(windows)]
fn mark_hidden(path: &Utf8Path) -> io::Result<()> {
    use std::os::windows::ffi::OsStrExt;
    use windows_sys::Win32::Storage::FileSystem::{
        FILE_ATTRIBUTE_HIDDEN, GetFileAttributesW, INVALID_FILE_ATTRIBUTES, SetFileAttributesW,
    };

    let wide: Vec<u16> = path
        .as_std_path()
        .as_os_str()
        .encode_wide()
        .chain(std::iter::once(0))
        .collect();

    // SAFETY: `wide` is a NUL-terminated UTF-16 path that outlives both calls.
    unsafe {
        let attributes = GetFileAttributesW(wide.as_ptr());
        if attributes == INVALID_FILE_ATTRIBUTES {
            return Err(io::Error::last_os_error());
        }
        if SetFileAttributesW(wide.as_ptr(), attributes | FILE_ATTRIBUTE_HIDDEN) == 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

// The leading dot already hides the directory.
#[cfg(not(windows))]
fn mark_hidden(_path: &Utf8Path) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn project_in_temp_dir() -> (TempDir, Utf8PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let dir = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let project_file = dir.join("demo.projctx");
        fs::write(&project_file, "").unwrap();
        (temp_dir, project_file)
    }

    #[test]
    fn test_resolve_with_username() {
        let (_temp_dir, project_file) = project_in_temp_dir();
        let resolver = ScratchPathResolver::new(Some("alice".to_string()), "1a2b3c4d");

        let scratch = resolver.resolve(&project_file).unwrap();

        let expected = project_file
            .parent()
            .unwrap()
            .join(PROJECT_USER_DIR)
            .join("alice")
            .join("1a2b3c4d");
        assert_eq!(scratch, expected);
        assert!(scratch.is_dir());
    }

    #[test]
    fn test_resolve_without_username() {
        let (_temp_dir, project_file) = project_in_temp_dir();
        let resolver = ScratchPathResolver::new(Some("   ".to_string()), "1a2b3c4d");

        let scratch = resolver.resolve(&project_file).unwrap();

        assert_eq!(resolver.username(), None);
        assert_eq!(
            scratch,
            project_file.parent().unwrap().join(PROJECT_USER_DIR).join("1a2b3c4d")
        );
    }

    #[test]
    fn test_resolve_is_repeatable() {
        let (_temp_dir, project_file) = project_in_temp_dir();
        let resolver = ScratchPathResolver::new(Some("alice".to_string()), "1a2b3c4d");

        let first = resolver.resolve(&project_file).unwrap();
        let second = resolver.resolve(&project_file).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_username_with_separator_is_ignored() {
        let resolver = ScratchPathResolver::new(Some("../evil".to_string()), "1a2b3c4d");
        assert_eq!(resolver.username(), None);
    }

    #[test]
    fn test_empty_context_id_rejected() {
        let (_temp_dir, project_file) = project_in_temp_dir();
        let resolver = ScratchPathResolver::new(Some("alice".to_string()), "");

        let err = resolver.resolve(&project_file).unwrap_err();

        assert!(matches!(err, ScratchPathError::EmptyContextId));
        assert!(!project_file.parent().unwrap().join(PROJECT_USER_DIR).exists());
    }

    #[test]
    fn test_creation_failure_propagates() {
        let (_temp_dir, project_file) = project_in_temp_dir();
        // A regular file where the storage directory should go blocks creation
        let blocker = project_file.parent().unwrap().join(PROJECT_USER_DIR);
        fs::write(&blocker, "not a directory").unwrap();
        let resolver = ScratchPathResolver::new(Some("alice".to_string()), "1a2b3c4d");

        let err = resolver.resolve(&project_file).unwrap_err();

        assert!(matches!(err, ScratchPathError::CreateDir { .. }));
    }
}
