//! Configuration file support for abuild.
//!
//! Two configuration file locations are read:
//! - Global: `~/.abuild/config.toml` - User-wide defaults
//! - Project: `.abuild/config.toml` next to the build file
//!
//! Project config takes precedence over global config, and command-line
//! flags take precedence over both.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::builder::errors::BuildError;

/// STL passed to the toolchain generator when none is configured.
pub const DEFAULT_STL: &str = "stlport";

/// Android platform passed to the toolchain generator when none is configured.
pub const DEFAULT_PLATFORM: &str = "android-14";

/// Environment variable naming the NDK root.
pub const NDK_HOME_ENV: &str = "NDK_HOME";

/// abuild configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// NDK settings
    pub ndk: NdkConfig,

    /// Build settings
    pub build: BuildConfig,
}

/// NDK-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NdkConfig {
    /// NDK root, used when `NDK_HOME` is unset
    pub home: Option<PathBuf>,

    /// STL flavour for generated toolchains (e.g. "stlport", "gnustl")
    pub stl: Option<String>,

    /// Android platform level (e.g. "android-14")
    pub platform: Option<String>,
}

/// Build-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Parallel make jobs (None = host CPU count)
    pub jobs: Option<usize>,

    /// Make program (None = `make`)
    pub make: Option<PathBuf>,

    /// Build release by default
    pub release: bool,

    /// Stream tool output by default
    pub verbose: bool,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.ndk.home.is_some() {
            self.ndk.home = other.ndk.home;
        }
        if other.ndk.stl.is_some() {
            self.ndk.stl = other.ndk.stl;
        }
        if other.ndk.platform.is_some() {
            self.ndk.platform = other.ndk.platform;
        }

        if other.build.jobs.is_some() {
            self.build.jobs = other.build.jobs;
        }
        if other.build.make.is_some() {
            self.build.make = other.build.make;
        }
        if other.build.release {
            self.build.release = true;
        }
        if other.build.verbose {
            self.build.verbose = true;
        }
    }

    pub fn stl(&self) -> &str {
        self.ndk.stl.as_deref().unwrap_or(DEFAULT_STL)
    }

    pub fn platform(&self) -> &str {
        self.ndk.platform.as_deref().unwrap_or(DEFAULT_PLATFORM)
    }

    /// Resolve the NDK root: `NDK_HOME` first, then `ndk.home`.
    pub fn ndk_home(&self, env_value: Option<String>) -> Result<PathBuf, BuildError> {
        env_value
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| self.ndk.home.clone())
            .ok_or_else(|| BuildError::configuration(format!("{} must be defined", NDK_HOME_ENV)))
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.abuild/config.toml)
/// 2. Global config (~/.abuild/config.toml)
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Config {
    let mut config = Config::default();

    if let Some(global_path) = global_path {
        if global_path.exists() {
            config.merge(Config::load_or_default(global_path));
        }
    }

    if project_path.exists() {
        config.merge(Config::load_or_default(project_path));
    }

    config
}

/// Get the global abuild config directory (~/.abuild).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".abuild"))
}

/// Get the global config path (~/.abuild/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (.abuild/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".abuild").join("config.toml")
}
