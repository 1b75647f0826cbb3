use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Preferences remembered between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub output_dir: Option<PathBuf>,
    pub window_size: Option<(u32, u32)>,
}

impl Preferences {
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("failed to read preferences at {}", path.display()))?;
            let preferences: Self = toml::from_str(&contents)
                .with_context(|| format!("failed to parse preferences at {}", path.display()))?;
            Ok(preferences)
        } else {
            Ok(Self::default())
        }
    }

    pub fn persist(&self, path: &Path) -> Result<()> {
        let dir = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("preferences path has no parent: {}", path.display()))?;
        fs::create_dir_all(dir).with_context(|| {
            format!(
                "failed to prepare directory for preferences at {}",
                dir.display()
            )
        })?;
        let serialized =
            toml::to_string_pretty(self).context("failed to serialize preferences to TOML")?;
        fs::write(path, serialized)
            .with_context(|| format!("failed to write preferences to {}", path.display()))?;
        Ok(())
    }

    /// Folds explicit command-line values in; returns true when anything changed.
    pub fn remember(&mut self, output_dir: Option<&Path>, window_size: Option<(u32, u32)>) -> bool {
        let mut changed = false;
        if let Some(dir) = output_dir {
            if self.output_dir.as_deref() != Some(dir) {
                self.output_dir = Some(dir.to_path_buf());
                changed = true;
            }
        }
        if let Some(size) = window_size {
            if self.window_size != Some(size) {
                self.window_size = Some(size);
                changed = true;
            }
        }
        changed
    }
}
