use crate::StoreError;
use std::fs;
use std::path::{Path, PathBuf};

/// Directory layout of a Daybreak data root.
///
/// ```text
/// <root>/settings.json    typed user settings
/// <root>/manifests.toml   snapshot of the merged catalog
/// <root>/themes/<name>/   user-installed themes
/// <root>/.lock            single-owner lock file
/// ```
#[derive(Debug, Clone)]
pub struct StoreLayout {
    root: PathBuf,
}

impl StoreLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[inline]
    pub fn settings_file(&self) -> PathBuf {
        self.root.join("settings.json")
    }

    #[inline]
    pub fn manifests_file(&self) -> PathBuf {
        self.root.join("manifests.toml")
    }

    #[inline]
    pub fn themes_dir(&self) -> PathBuf {
        self.root.join("themes")
    }

    #[inline]
    pub fn lock_file(&self) -> PathBuf {
        self.root.join(".lock")
    }

    pub fn initialize(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root)?;
        fs::create_dir_all(self.themes_dir())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_under_root() {
        let layout = StoreLayout::new("/data/daybreak");
        assert_eq!(layout.root(), Path::new("/data/daybreak"));
        assert!(layout.settings_file().starts_with("/data/daybreak"));
        assert!(layout.manifests_file().ends_with("manifests.toml"));
        assert!(layout.themes_dir().ends_with("themes"));
    }

    #[test]
    fn initialize_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StoreLayout::new(dir.path().join("root"));
        layout.initialize().unwrap();
        assert!(layout.themes_dir().is_dir());
        layout.initialize().unwrap();
    }
}
