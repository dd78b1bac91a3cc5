//! JSON build file.
//!
//! ```json
//! {
//!   "archs": ["arm", "x86"],
//!   "targets": [
//!     {
//!       "path": "libogg",
//!       "output": "libogg.so",
//!       "configure": ["--disable-docs"],
//!       "inject": "#define HAVE_FOO 1",
//!       "c++": false
//!     }
//!   ]
//! }
//! ```
//!
//! Target paths are relative to the directory containing the build file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::core::target::Task;

/// A parsed build file.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildFile {
    /// Architectures to build; `None` means every architecture in the table
    #[serde(default)]
    pub archs: Option<Vec<String>>,

    /// Libraries to build, in order
    pub targets: Vec<TargetSpec>,
}

/// One entry of `targets`.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetSpec {
    pub path: PathBuf,

    pub output: String,

    #[serde(default)]
    pub configure: Vec<String>,

    #[serde(default)]
    pub inject: Option<String>,

    #[serde(rename = "c++", default)]
    pub cpp: bool,
}

impl BuildFile {
    /// Read and parse a build file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read build file: {}", path.display()))?;

        Self::parse(&contents)
            .with_context(|| format!("failed to parse build file: {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    /// Turn the targets into tasks, resolving paths against `base_dir`.
    pub fn tasks(&self, base_dir: &Path) -> Result<Vec<Task>> {
        self.targets
            .iter()
            .map(|t| {
                let task = Task::new(base_dir.join(&t.path), t.output.clone())?
                    .configure_args(t.configure.iter().cloned())
                    .inject(t.inject.clone())
                    .cpp(t.cpp);
                Ok(task)
            })
            .collect()
    }
}
