//! Autotools process driver.
//!
//! Runs `./configure`, `make`, `make install` and `make distclean` in a
//! source tree under a cross-compilation [`Environment`]. Output is captured
//! and attached to the error on failure, unless verbose mode streams it to
//! the console.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use regex::{NoExpand, Regex};

use crate::builder::env::Environment;
use crate::builder::errors::BuildError;
use crate::util::fs::{append_string, read_to_string, write_string};
use crate::util::process::{host_cpu_count, ProcessBuilder};

/// Header that injected text is appended to.
pub const CONFIG_HEADER: &str = "config.h";

/// Fields rewritten in a generated `libtool` script.
///
/// Disables library versioning so the installed file and its SONAME are
/// exactly `libname.so`.
pub const LIBTOOL_OVERRIDES: &[(&str, &str)] = &[
    ("version_type", "none"),
    ("need_lib_prefix", "no"),
    ("need_version", "no"),
    ("library_names_spec", "'$libname$release$shared_ext'"),
    ("soname_spec", "'$libname$release$shared_ext'"),
    ("finish_cmds", ""),
    ("shlibpath_var", "LD_LIBRARY_PATH"),
    ("shlibpath_overrides_runpath", "yes"),
];

/// Outcome of one external step.
enum StepStatus {
    Success,
    Failed(String),
}

/// Driver for the autotools commands of one library and ABI.
pub struct Autotools<'a> {
    src_dir: &'a Path,
    env: &'a Environment,
    abi: &'a str,
    library: &'a str,
    make: PathBuf,
    jobs: usize,
    verbose: bool,
}

impl<'a> Autotools<'a> {
    pub fn new(src_dir: &'a Path, env: &'a Environment, abi: &'a str, library: &'a str) -> Self {
        Autotools {
            src_dir,
            env,
            abi,
            library,
            make: PathBuf::from("make"),
            jobs: host_cpu_count(),
            verbose: false,
        }
    }

    /// Use a different make program.
    pub fn make_program(mut self, make: impl Into<PathBuf>) -> Self {
        self.make = make.into();
        self
    }

    /// Parallelism passed as `make -j`.
    pub fn jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Stream tool output instead of capturing it.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    fn command(&self, program: impl AsRef<Path>) -> ProcessBuilder {
        ProcessBuilder::new(program)
            .cwd(self.src_dir)
            .envs(self.env.vars())
    }

    fn run(&self, cmd: &ProcessBuilder) -> Result<StepStatus> {
        tracing::debug!("[{}] running {}", self.abi, cmd.display_command());

        if self.verbose {
            let status = cmd.status()?;
            return Ok(if status.success() {
                StepStatus::Success
            } else {
                StepStatus::Failed(format!("exited with {}; see output above", status))
            });
        }

        let output = cmd.exec()?;
        if output.status.success() {
            Ok(StepStatus::Success)
        } else {
            Ok(StepStatus::Failed(
                String::from_utf8_lossy(&output.stderr).into_owned(),
            ))
        }
    }

    /// Run `./configure --host <host> --prefix <prefix> <args>`, then patch
    /// the generated `libtool` if there is one.
    pub fn configure(&self, prefix: &Path, args: &[String]) -> Result<()> {
        let script = self.src_dir.join("configure");
        let Ok(script) = script.canonicalize() else {
            return Err(self.configure_error(format!(
                "no configure script in {}",
                self.src_dir.display()
            )));
        };

        let cmd = self
            .command(script)
            .arg("--host")
            .arg(self.env.host())
            .arg("--prefix")
            .arg(prefix)
            .args(args);

        if let StepStatus::Failed(output) = self.run(&cmd)? {
            return Err(self.configure_error(output));
        }

        if patch_libtool(self.src_dir)? {
            tracing::debug!("[{}] patched libtool in {}", self.abi, self.src_dir.display());
        }

        Ok(())
    }

    fn configure_error(&self, output: String) -> anyhow::Error {
        BuildError::Configure {
            abi: self.abi.to_string(),
            library: self.library.to_string(),
            output,
        }
        .into()
    }

    /// Run `make -j <jobs>`.
    pub fn make(&self) -> Result<()> {
        let cmd = self
            .command(&self.make)
            .arg("-j")
            .arg(self.jobs.to_string());

        match self.run(&cmd)? {
            StepStatus::Success => Ok(()),
            StepStatus::Failed(output) => Err(BuildError::Compile {
                abi: self.abi.to_string(),
                library: self.library.to_string(),
                output,
            }
            .into()),
        }
    }

    /// Run `make install`.
    pub fn make_install(&self) -> Result<()> {
        let cmd = self.command(&self.make).arg("install");

        match self.run(&cmd)? {
            StepStatus::Success => Ok(()),
            StepStatus::Failed(output) => Err(BuildError::Install {
                abi: self.abi.to_string(),
                library: self.library.to_string(),
                output,
            }
            .into()),
        }
    }

    /// Run `make distclean`. Best effort: a pristine tree makes this fail,
    /// so failures are only logged.
    pub fn make_distclean(&self) {
        let cmd = self.command(&self.make).arg("distclean");
        tracing::debug!("[{}] running {}", self.abi, cmd.display_command());

        match cmd.exec() {
            Ok(output) if !output.status.success() => {
                tracing::debug!(
                    "[{}] make distclean failed in {} (ignored)",
                    self.abi,
                    self.src_dir.display()
                );
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("[{}] could not run make distclean: {:#}", self.abi, e),
        }
    }

    /// Append `code` to the generated `config.h`.
    ///
    /// Must run after configure: a missing header is an error.
    pub fn inject(&self, code: &str) -> Result<()> {
        let header = self.src_dir.join(CONFIG_HEADER);
        append_string(&header, &format!("\n{}\n", code.trim()))
            .with_context(|| format!("failed to inject header content for {}", self.library))
    }
}

/// Rewrite [`LIBTOOL_OVERRIDES`] in `<src_dir>/libtool`.
///
/// Returns `false` if the tree has no `libtool` script.
pub fn patch_libtool(src_dir: &Path) -> Result<bool> {
    let path = src_dir.join("libtool");
    if !path.is_file() {
        return Ok(false);
    }

    let mut contents = read_to_string(&path)?;
    for (key, value) in LIBTOOL_OVERRIDES {
        let re = Regex::new(&format!(r"(?m)^{}=.*$", regex::escape(key)))
            .context("invalid libtool override pattern")?;
        let replacement = format!("{}={}", key, value);
        contents = re
            .replace_all(&contents, NoExpand(&replacement))
            .into_owned();
    }

    write_string(&path, &contents)?;
    Ok(true)
}
