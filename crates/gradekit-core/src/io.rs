use crate::error::Result;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Atomically write `data` to `path` using a tempfile in the same directory.
/// A crash mid-write never leaves a half-written artifact behind.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Create a directory and all parents, idempotent.
pub fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)?;
    Ok(())
}

/// Remove `path` (if present) and recreate it empty.
pub fn reset_dir(path: &Path) -> Result<()> {
    if path.exists() {
        tracing::info!(dir = %path.display(), "removing previous output");
        std::fs::remove_dir_all(path)?;
    }
    std::fs::create_dir_all(path)?;
    Ok(())
}

/// Remove a file if it exists. Returns true if something was removed.
pub fn remove_if_exists(path: &Path) -> Result<bool> {
    if path.is_file() {
        std::fs::remove_file(path)?;
        return Ok(true);
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn atomic_write_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("GRADING.md");
        atomic_write(&path, b"### alice").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "### alice");
    }

    #[test]
    fn atomic_write_overwrites() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("RESULT.md");
        atomic_write(&path, b"Result: FAIL").unwrap();
        atomic_write(&path, b"Result: PASS").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "Result: PASS");
    }

    #[test]
    fn reset_dir_clears_previous_content() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("ASS_ROOT");
        std::fs::create_dir_all(out.join("PASS")).unwrap();
        std::fs::write(out.join("PASS/old.log"), "stale").unwrap();

        reset_dir(&out).unwrap();

        assert!(out.is_dir());
        assert!(!out.join("PASS").exists());
    }

    #[test]
    fn remove_if_exists_reports_removal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("SUCCESS");
        assert!(!remove_if_exists(&path).unwrap());
        std::fs::write(&path, "").unwrap();
        assert!(remove_if_exists(&path).unwrap());
        assert!(!path.exists());
    }
}
