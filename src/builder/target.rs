//! One library built for one ABI.
//!
//! The lifecycle is linear:
//! clean → configure → inject → build → install → verify → publish.
//! Any step failing ends the build; nothing is published unless every
//! step before publish succeeded.

use std::fmt;
use std::path::PathBuf;

use anyhow::Result;

use crate::builder::autotools::Autotools;
use crate::builder::context::BuildContext;
use crate::builder::env::{BuildMode, Environment};
use crate::builder::errors::BuildError;
use crate::builder::toolchain::Toolchain;
use crate::builder::verify::verify_library;
use crate::core::target::Task;
use crate::util::fs::{copy_into, display_relative};
use crate::util::shell::Status;

/// Lifecycle stages, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Clean,
    Configure,
    Inject,
    Build,
    Install,
    Verify,
    Publish,
}

impl Stage {
    fn status(&self) -> Status {
        match self {
            Stage::Clean => Status::Cleaning,
            Stage::Configure => Status::Configuring,
            Stage::Inject => Status::Injecting,
            Stage::Build => Status::Compiling,
            Stage::Install => Status::Installing,
            Stage::Verify => Status::Verifying,
            Stage::Publish => Status::Finished,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Clean => "make distclean",
            Stage::Configure => "./configure",
            Stage::Inject => "injecting header content",
            Stage::Build => "make",
            Stage::Install => "make install",
            Stage::Verify => "verify",
            Stage::Publish => "publish",
        };
        f.write_str(s)
    }
}

/// A task bound to one toolchain.
pub struct BuildTarget<'a> {
    task: &'a Task,
    toolchain: &'a Toolchain,
}

impl<'a> BuildTarget<'a> {
    pub fn new(task: &'a Task, toolchain: &'a Toolchain) -> Self {
        BuildTarget { task, toolchain }
    }

    fn announce(&self, ctx: &BuildContext<'_>, stage: Stage) {
        ctx.shell.status_tagged(
            stage.status(),
            self.toolchain.abi_name(),
            format!("{}: {}", self.task.output, stage),
        );
    }

    /// Run the whole lifecycle and return the published path.
    ///
    /// `mode.cpp` is overridden by the task's own C++ flag.
    pub fn run(&self, ctx: &BuildContext<'_>, mode: &BuildMode) -> Result<PathBuf> {
        let task = self.task;
        let tc = self.toolchain;
        let abi = tc.abi_name();
        let mode = mode.with_cpp(task.cpp);

        let env = Environment::for_toolchain(tc, ctx.table, &mode, &ctx.stl)?;
        tracing::debug!("[{}] environment: {:?}", abi, env.vars());

        let driver = Autotools::new(&task.src_dir, &env, abi, &task.output)
            .make_program(&ctx.make)
            .jobs(ctx.jobs)
            .verbose(mode.verbose);

        self.announce(ctx, Stage::Clean);
        driver.make_distclean();

        self.announce(ctx, Stage::Configure);
        let mut args: Vec<String> = task
            .kind
            .configure_args()
            .iter()
            .map(|a| a.to_string())
            .collect();
        args.extend(task.configure_args.iter().cloned());
        {
            let _spinner = ctx.shell.spinner(format!("[{}] ./configure", abi));
            driver.configure(tc.prefix(), &args)?;
        }

        if let Some(code) = &task.inject {
            self.announce(ctx, Stage::Inject);
            driver.inject(code)?;
        }

        self.announce(ctx, Stage::Build);
        {
            let _spinner = ctx.shell.spinner(format!("[{}] make", abi));
            driver.make()?;
        }

        self.announce(ctx, Stage::Install);
        driver.make_install()?;

        let artifact = tc.prefix_lib_dir().join(&task.output);
        if !artifact.is_file() {
            return Err(BuildError::Install {
                abi: abi.to_string(),
                library: task.output.clone(),
                output: format!("make install did not produce {}", artifact.display()),
            }
            .into());
        }

        if task.kind.has_dynamic_section() {
            self.announce(ctx, Stage::Verify);
        }
        let objdump = tc.tool(env.host(), "objdump");
        let errors = verify_library(&objdump, &env, &artifact, task.kind, &task.output)?;
        if !errors.is_empty() {
            for error in &errors {
                ctx.shell.status_tagged(Status::Error, abi, error);
            }
            return Err(BuildError::Verification {
                abi: abi.to_string(),
                library: task.output.clone(),
                errors,
            }
            .into());
        }

        let dest_dir = ctx.abi_output_dir(abi);
        let published = copy_into(&artifact, &dest_dir, &task.output)?;
        ctx.shell.status_tagged(
            Stage::Publish.status(),
            abi,
            format!(
                "{} → {} ({})",
                task.output,
                display_relative(&dest_dir),
                task.kind
            ),
        );

        Ok(published)
    }
}
