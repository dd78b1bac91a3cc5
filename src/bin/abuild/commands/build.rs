//! `abuild build` command

use std::path::Path;

use anyhow::Result;

use crate::cli::BuildArgs;
use abuild::core::ArchTable;
use abuild::ops::abuild_build::{build, BuildOptions};
use abuild::util::config::{global_config_path, load_config, project_config_path, NDK_HOME_ENV};
use abuild::util::fs::display_relative;
use abuild::util::shell::{Shell, Status, Verbosity};

pub fn execute(args: BuildArgs, shell: &Shell) -> Result<()> {
    let table = ArchTable::bundled()?;

    // Load configuration (global + project next to the build file)
    let project_root = args
        .build_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let global = global_config_path();
    let config = load_config(global.as_deref(), &project_config_path(project_root));

    // NDK_HOME > ndk.home; checked before anything is built
    let ndk = config.ndk_home(std::env::var(NDK_HOME_ENV).ok())?;

    let opts = BuildOptions {
        build_file: args.build_file,
        ndk,
        archs: args.archs,
        abis: args.abis,
        output_dir: args.output,
        release: args.release || config.build.release,
        verbose: shell.is_verbose() || (config.build.verbose && !shell.is_quiet()),
        // CLI > config > None (host CPU count)
        jobs: args.jobs.or(config.build.jobs),
        make: args.make.or_else(|| config.build.make.clone()),
        stl: args.stl.unwrap_or_else(|| config.stl().to_string()),
        platform: args.platform.unwrap_or_else(|| config.platform().to_string()),
    };

    // `build.verbose` streams tool output, so the shell must not draw spinners
    let streaming;
    let shell = if opts.verbose && !shell.is_verbose() {
        streaming = shell.with_verbosity(Verbosity::Verbose);
        &streaming
    } else {
        shell
    };

    let report = build(&opts, &table, shell)?;

    if let Some(failure) = report.failure {
        return Err(failure.into());
    }

    shell.status(
        Status::Finished,
        format!(
            "{} librar{} published to {}",
            report.published.len(),
            if report.published.len() == 1 { "y" } else { "ies" },
            display_relative(&opts.output_dir)
        ),
    );
    if !report.runtime_installed.is_empty() {
        shell.status(
            Status::Installed,
            format!("C++ runtime for {} ABI(s)", report.runtime_installed.len()),
        );
    }

    Ok(())
}
