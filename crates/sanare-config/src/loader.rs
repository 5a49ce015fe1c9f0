//! Multi-source configuration loading.
//!
//! Later sources override earlier ones: built-in defaults, then the user
//! config file, the project `sanare.toml`, the per-machine
//! `sanare.local.toml`, and finally `SANARE_*` environment variables. The
//! merged result is validated before it is handed out.

use crate::{Paths, SanareConfig};
use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "SANARE";

/// Assembles a [`SanareConfig`] from every configured source.
pub struct ConfigLoader {
    project_dir: PathBuf,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            project_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Directory searched for `sanare.toml` and `sanare.local.toml`
    /// (defaults to the current directory).
    pub fn with_project_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.project_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Merges all sources and validates the result.
    pub fn load(self) -> Result<SanareConfig> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&SanareConfig::default())?);

        let files = [
            Paths::new().user_config_file().ok(),
            Some(Paths::project_config_file(&self.project_dir)),
            Some(Paths::local_config_file(&self.project_dir)),
        ];
        for path in files.into_iter().flatten() {
            if path.exists() {
                builder = builder.add_source(
                    config::File::from(path)
                        .required(false)
                        .format(config::FileFormat::Toml),
                );
            }
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("_")
                .try_parsing(true),
        );

        let merged: SanareConfig = builder
            .build()
            .context("failed to merge configuration sources")?
            .try_deserialize()
            .context("configuration did not match the expected shape")?;
        merged
            .validate()
            .context("configuration failed validation")?;
        Ok(merged)
    }

    /// [`ConfigLoader::load`], falling back to the built-in defaults when
    /// no usable configuration exists. For startup paths where a broken
    /// config file must not keep the application shell from coming up.
    pub fn load_or_default(self) -> SanareConfig {
        self.load().unwrap_or_default()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
