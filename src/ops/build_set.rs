//! Orchestration of a whole run: every task against every requested ABI.

use std::path::PathBuf;

use anyhow::Result;

use crate::builder::context::BuildContext;
use crate::builder::env::BuildMode;
use crate::builder::errors::BuildError;
use crate::builder::target::BuildTarget;
use crate::builder::toolchain::{runtime_library_name, Toolchain, ToolchainRegistry};
use crate::core::target::Task;
use crate::util::fs::copy_into;
use crate::util::shell::Status;

/// Outcome of [`BuildSet::run`].
#[derive(Debug, Default)]
pub struct RunReport {
    /// Published libraries, in build order
    pub published: Vec<PathBuf>,

    /// Installed copies of the C++ runtime
    pub runtime_installed: Vec<PathBuf>,

    /// The build step that ended the run, if any
    pub failure: Option<BuildError>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

/// An ordered queue of tasks plus the toolchains to build them with.
///
/// Tasks run in the order they were added; within a task, ABIs run in the
/// requested order. The run stops at the first failed build.
#[derive(Debug)]
pub struct BuildSet {
    registry: ToolchainRegistry,
    tasks: Vec<Task>,
    abis: Vec<String>,
    release: bool,
    verbose: bool,
    cpp: bool,
}

impl BuildSet {
    /// Create a build set for every ABI in `registry`.
    pub fn new(registry: ToolchainRegistry) -> Self {
        let abis = registry.abi_names();
        BuildSet {
            registry,
            tasks: Vec::new(),
            abis,
            release: false,
            verbose: false,
            cpp: false,
        }
    }

    pub fn release(mut self, release: bool) -> Self {
        self.release = release;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Restrict the run to `abis`, in the given order.
    ///
    /// Every ABI must have a toolchain in the registry.
    pub fn with_abis(mut self, abis: Vec<String>) -> Result<Self> {
        for abi in &abis {
            if self.registry.get(abi).is_none() {
                return Err(BuildError::configuration(format!(
                    "no toolchain for ABI `{}`; available: {}",
                    abi,
                    self.registry.abi_names().join(", ")
                ))
                .into());
            }
        }

        let mut unique: Vec<String> = Vec::with_capacity(abis.len());
        for abi in abis {
            if !unique.contains(&abi) {
                unique.push(abi);
            }
        }
        self.abis = unique;
        Ok(self)
    }

    /// Queue a task.
    pub fn add(&mut self, task: Task) {
        self.tasks.push(task);
    }

    /// Whether any task reached so far needed the C++ runtime.
    pub fn requires_cpp(&self) -> bool {
        self.cpp
    }

    /// Build every task for every ABI.
    ///
    /// Every requested toolchain is checked first, so a broken one fails
    /// the run before anything is built. A failed build step ends the run
    /// and is returned in the report; any other error is returned as `Err`.
    /// If a C++ task was reached, the C++ runtime is installed for every
    /// requested ABI afterwards, even when the run failed.
    pub fn run(&mut self, ctx: &BuildContext<'_>) -> Result<RunReport> {
        self.check_toolchains(ctx)?;

        let mode = BuildMode {
            release: self.release,
            verbose: self.verbose,
            cpp: false,
        };
        let mut report = RunReport::default();

        'tasks: for task in &self.tasks {
            if task.cpp {
                self.cpp = true;
            }

            for abi in &self.abis {
                let toolchain = self.toolchain(abi)?;
                match BuildTarget::new(task, toolchain).run(ctx, &mode) {
                    Ok(published) => report.published.push(published),
                    Err(err) => match err.downcast::<BuildError>() {
                        Ok(build_err) if build_err.is_step_failure() => {
                            tracing::debug!("aborting run: {}", build_err);
                            report.failure = Some(build_err);
                            break 'tasks;
                        }
                        Ok(build_err) => return Err(build_err.into()),
                        Err(err) => return Err(err),
                    },
                }
            }
        }

        if self.cpp {
            match self.install_runtime(ctx) {
                Ok(installed) => report.runtime_installed = installed,
                // Keep the step failure.
                Err(err) if report.failure.is_some() => {
                    ctx.shell.warn(format!("C++ runtime not installed: {:#}", err));
                }
                Err(err) => return Err(err),
            }
        }

        Ok(report)
    }

    fn toolchain(&self, abi: &str) -> Result<&Toolchain> {
        self.registry.get(abi).ok_or_else(|| {
            BuildError::configuration(format!("no toolchain for ABI `{}`", abi)).into()
        })
    }

    /// Resolve every requested toolchain, with C++ support if any task
    /// needs it.
    fn check_toolchains(&self, ctx: &BuildContext<'_>) -> Result<()> {
        let cpp = self.tasks.iter().any(|t| t.cpp);
        for abi in &self.abis {
            let host = self.toolchain(abi)?.check(cpp, &ctx.stl)?;
            tracing::debug!("[{}] host {}", abi, host);
        }
        Ok(())
    }

    /// Copy the C++ runtime into every requested ABI's output directory.
    fn install_runtime(&self, ctx: &BuildContext<'_>) -> Result<Vec<PathBuf>> {
        let name = runtime_library_name(&ctx.stl);
        let mut installed = Vec::with_capacity(self.abis.len());

        for abi in &self.abis {
            let toolchain = self.toolchain(abi)?;
            let host = toolchain.check(true, &ctx.stl)?;
            let runtime = toolchain.runtime_library(&host, &ctx.stl);

            let dest = copy_into(&runtime, &ctx.abi_output_dir(abi), &name)?;
            ctx.shell.status_tagged(Status::Installed, abi, &name);
            installed.push(dest);
        }

        Ok(installed)
    }
}
