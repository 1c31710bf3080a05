use anyhow::{Context, Result};
use std::path::Path;

/// Create a directory (and parents) if it does not already exist.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory: {}", path.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_dir_is_idempotent() {
        let dir = std::env::temp_dir().join("casona-ensure-dir-test/a/b");
        ensure_dir(&dir).unwrap();
        ensure_dir(&dir).unwrap();
        assert!(dir.is_dir());
        std::fs::remove_dir_all(std::env::temp_dir().join("casona-ensure-dir-test")).unwrap();
    }
}
