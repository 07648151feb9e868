use camino::Utf8Path;
use std::fs;
use uuid::Uuid;

/// Checks whether a directory accepts new files.
pub trait WriteProbe {
    fn can_write(&self, dir: &Utf8Path) -> bool;
}

/// Probes by writing and removing a uniquely named file.
#[derive(Debug, Clone, Copy, Default)]
pub struct TempFileProbe;

impl WriteProbe for TempFileProbe {
    fn can_write(&self, dir: &Utf8Path) -> bool {
        let test_file = dir.join(Uuid::new_v4().to_string());

        if let Err(e) = fs::write(&test_file, "test") {
            tracing::debug!("Directory {} is not writable: {}", dir, e);
            return false;
        }

        if let Err(e) = fs::remove_file(&test_file) {
            tracing::error!("Failed to remove probe file {}: {}", test_file, e);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_writable_directory_leaves_nothing_behind() {
        let temp_dir = TempDir::new().unwrap();
        let dir = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();

        assert!(TempFileProbe.can_write(&dir));
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 0);
    }

    #[test]
    fn test_missing_directory_is_not_writable() {
        let temp_dir = TempDir::new().unwrap();
        let dir = Utf8PathBuf::try_from(temp_dir.path().join("missing")).unwrap();

        assert!(!TempFileProbe.can_write(&dir));
    }
}
