//! Filesystem locations for configuration and cached state.
//!
//! User-level paths follow the platform convention (XDG on Linux) via
//! `directories`; project-level paths are plain files in the project
//! directory.

use crate::ConfigError;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

pub struct Paths {
    project_dirs: Option<ProjectDirs>,
}

impl Paths {
    pub fn new() -> Self {
        Self {
            project_dirs: ProjectDirs::from("mx", "Sanare", "sanare"),
        }
    }

    fn project_dirs(&self) -> Result<&ProjectDirs, ConfigError> {
        self.project_dirs.as_ref().ok_or_else(|| {
            ConfigError::XdgError("no home directory for the current user".to_string())
        })
    }

    /// User config file (`~/.config/sanare/config.toml` on Linux).
    pub fn user_config_file(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.project_dirs()?.config_dir().join("config.toml"))
    }

    /// Directory holding the durable permission mirror, one JSON file per
    /// user (`~/.cache/sanare/permissions/` on Linux).
    pub fn permission_mirror_dir(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.project_dirs()?.cache_dir().join("permissions"))
    }

    /// `sanare.toml` in the project directory.
    pub fn project_config_file(project_dir: impl AsRef<Path>) -> PathBuf {
        project_dir.as_ref().join("sanare.toml")
    }

    /// `sanare.local.toml`, the gitignored per-machine override.
    pub fn local_config_file(project_dir: impl AsRef<Path>) -> PathBuf {
        project_dir.as_ref().join("sanare.local.toml")
    }
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}
