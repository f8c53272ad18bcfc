use crate::StoreError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const THEME_FILE: &str = "theme.toml";

#[derive(Debug, Deserialize)]
struct ThemeFile {
    name: String,
    #[serde(default)]
    colors: BTreeMap<String, String>,
    #[serde(default)]
    stylesheet: Option<String>,
}

/// A UI theme: a directory holding `theme.toml` and optional assets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    pub name: String,
    pub dir: PathBuf,
    pub colors: BTreeMap<String, String>,
    pub stylesheet: Option<String>,
}

pub fn validate_theme_name(name: &str) -> Result<(), StoreError> {
    if name.is_empty() || name.len() > 64 {
        return Err(StoreError::InvalidTheme(
            "theme name must be 1-64 characters".to_owned(),
        ));
    }
    if !name
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
    {
        return Err(StoreError::InvalidTheme(format!(
            "theme name '{name}' must match [a-zA-Z0-9_-]"
        )));
    }
    Ok(())
}

impl Theme {
    /// Load from a theme directory or directly from its `theme.toml`.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let (dir, file) = if path.is_dir() {
            (path.to_path_buf(), path.join(THEME_FILE))
        } else {
            let dir = path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
            (dir, path.to_path_buf())
        };

        let content = fs::read_to_string(&file)?;
        let parsed: ThemeFile = toml::from_str(&content).map_err(|e| {
            StoreError::InvalidTheme(format!("{}: {e}", file.display()))
        })?;
        validate_theme_name(&parsed.name)?;
        if let Some(ref sheet) = parsed.stylesheet {
            if sheet.contains(['/', '\\']) || sheet.starts_with('.') {
                return Err(StoreError::InvalidTheme(format!(
                    "stylesheet '{sheet}' must be a plain file name"
                )));
            }
        }

        Ok(Self {
            name: parsed.name,
            dir,
            colors: parsed.colors,
            stylesheet: parsed.stylesheet,
        })
    }

    /// Every loadable theme in the subdirectories of `dir`. Broken themes are
    /// skipped with a warning.
    pub fn discover(dir: &Path) -> Vec<Self> {
        let Ok(entries) = fs::read_dir(dir) else {
            debug!("no themes at {}", dir.display());
            return Vec::new();
        };

        let mut themes = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            match Self::load(&path) {
                Ok(theme) => {
                    debug!("found theme '{}' at {}", theme.name, path.display());
                    themes.push(theme);
                }
                Err(e) => warn!("skipping theme at {}: {e}", path.display()),
            }
        }
        themes.sort_by(|a, b| a.name.cmp(&b.name));
        themes
    }

    /// Copy the theme at `source` into `themes_dir/<name>` and return the copy.
    pub fn install(source: &Path, themes_dir: &Path) -> Result<Self, StoreError> {
        let theme = Self::load(source)?;
        let dest = themes_dir.join(&theme.name);
        if theme.dir == dest {
            debug!("theme '{}' already installed", theme.name);
            return Ok(theme);
        }
        fs::create_dir_all(&dest)?;

        fs::copy(theme.dir.join(THEME_FILE), dest.join(THEME_FILE))?;
        if let Some(ref sheet) = theme.stylesheet {
            let sheet_path = theme.dir.join(sheet);
            if sheet_path.is_file() {
                fs::copy(&sheet_path, dest.join(sheet))?;
            } else {
                warn!("theme '{}' references missing stylesheet {sheet}", theme.name);
            }
        }

        Self::load(&dest)
    }
}
