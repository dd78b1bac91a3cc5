//! Build error taxonomy.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while preparing toolchains or building a library.
///
/// The `Display` form is a one-line summary; [`BuildError::detail`] returns
/// whatever the external tool printed, for verbose reporting.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("{message}")]
    Configuration { message: String },

    #[error("failed to build standalone toolchain for `{arch}`")]
    ToolchainBuild { arch: String, output: String },

    #[error("cannot resolve toolchain in {}: {reason}", .bin_dir.display())]
    ToolchainResolution { bin_dir: PathBuf, reason: String },

    #[error("{library}: ./configure failed for {abi}")]
    Configure {
        abi: String,
        library: String,
        output: String,
    },

    #[error("{library}: make failed for {abi}")]
    Compile {
        abi: String,
        library: String,
        output: String,
    },

    #[error("{library}: make install failed for {abi}")]
    Install {
        abi: String,
        library: String,
        output: String,
    },

    #[error("{library}: {} verification error(s) for {abi}", .errors.len())]
    Verification {
        abi: String,
        library: String,
        errors: Vec<String>,
    },
}

impl BuildError {
    pub fn configuration(message: impl Into<String>) -> Self {
        BuildError::Configuration {
            message: message.into(),
        }
    }

    /// Captured tool output or collected diagnostics, if any.
    pub fn detail(&self) -> Option<String> {
        let text = match self {
            BuildError::ToolchainBuild { output, .. }
            | BuildError::Configure { output, .. }
            | BuildError::Compile { output, .. }
            | BuildError::Install { output, .. } => output.trim().to_string(),
            BuildError::Verification { errors, .. } => errors.join("\n"),
            BuildError::Configuration { .. } | BuildError::ToolchainResolution { .. } => {
                String::new()
            }
        };

        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    /// Whether this is a failed build step of one library for one ABI.
    ///
    /// These end the run with a failure report; everything else is fatal
    /// before or outside of a build.
    pub fn is_step_failure(&self) -> bool {
        matches!(
            self,
            BuildError::Configure { .. }
                | BuildError::Compile { .. }
                | BuildError::Install { .. }
                | BuildError::Verification { .. }
        )
    }
}
