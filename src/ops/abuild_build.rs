//! Implementation of `abuild build`.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use crate::builder::context::BuildContext;
use crate::builder::errors::BuildError;
use crate::builder::toolchain::{GeneratorOptions, ToolchainRegistry};
use crate::core::abi::ArchTable;
use crate::core::build_file::BuildFile;
use crate::ops::build_set::{BuildSet, RunReport};
use crate::util::config::{DEFAULT_PLATFORM, DEFAULT_STL};
use crate::util::process::{find_executable, host_cpu_count};
use crate::util::shell::Shell;

/// Options for the build command.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Path to the JSON build file
    pub build_file: PathBuf,

    /// NDK root
    pub ndk: PathBuf,

    /// Architectures to build (empty = build file's list, then all)
    pub archs: Vec<String>,

    /// ABIs to build (empty = every ABI of the selected architectures)
    pub abis: Vec<String>,

    /// Published libraries land in `<output_dir>/<abi>/`
    pub output_dir: PathBuf,

    /// Build with `-O3` instead of `-g`
    pub release: bool,

    /// Stream configure/make output
    pub verbose: bool,

    /// `make -j` value (None = host CPU count)
    pub jobs: Option<usize>,

    /// Make program (None = `make`)
    pub make: Option<PathBuf>,

    /// STL flavour for the generator and the C++ runtime
    pub stl: String,

    /// Android platform for the generator
    pub platform: String,
}

impl BuildOptions {
    pub fn new(build_file: impl Into<PathBuf>, ndk: impl Into<PathBuf>) -> Self {
        BuildOptions {
            build_file: build_file.into(),
            ndk: ndk.into(),
            archs: Vec::new(),
            abis: Vec::new(),
            output_dir: PathBuf::from("."),
            release: false,
            verbose: false,
            jobs: None,
            make: None,
            stl: DEFAULT_STL.to_string(),
            platform: DEFAULT_PLATFORM.to_string(),
        }
    }
}

/// Pick the architectures to build.
///
/// The command line wins over the build file, which wins over the table.
pub fn select_archs(cli: &[String], file: Option<&[String]>, table: &ArchTable) -> Vec<String> {
    if !cli.is_empty() {
        return cli.to_vec();
    }
    match file {
        Some(archs) if !archs.is_empty() => archs.to_vec(),
        _ => table.arch_names(),
    }
}

/// Resolve the make program; bare names are looked up in `PATH`.
pub fn resolve_make(make: Option<&Path>) -> Result<PathBuf> {
    let make = make.unwrap_or_else(|| Path::new("make"));
    if make.is_absolute() || make.components().count() > 1 {
        return Ok(make.to_path_buf());
    }

    find_executable(&make.to_string_lossy()).ok_or_else(|| {
        BuildError::configuration(format!("`{}` not found in PATH", make.display())).into()
    })
}

/// Build every target of a build file.
pub fn build(opts: &BuildOptions, table: &ArchTable, shell: &Shell) -> Result<RunReport> {
    let build_file = BuildFile::load(&opts.build_file)?;
    let base_dir = opts
        .build_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let tasks = build_file.tasks(base_dir)?;
    if tasks.is_empty() {
        bail!("no targets in {}", opts.build_file.display());
    }

    let make = resolve_make(opts.make.as_deref())?;
    let archs = select_archs(&opts.archs, build_file.archs.as_deref(), table);
    tracing::debug!("architectures: {}", archs.join(", "));

    let registry = ToolchainRegistry::generate(
        &opts.ndk,
        &archs,
        table,
        GeneratorOptions {
            stl: opts.stl.clone(),
            platform: opts.platform.clone(),
        },
        shell,
    )?;

    let mut set = BuildSet::new(registry)
        .release(opts.release)
        .verbose(opts.verbose);
    if !opts.abis.is_empty() {
        set = set.with_abis(opts.abis.clone())?;
    }
    for task in tasks {
        set.add(task);
    }

    let ctx = BuildContext::new(table, shell, &opts.output_dir)
        .with_make(make)
        .with_jobs(opts.jobs.unwrap_or_else(host_cpu_count))
        .with_stl(&opts.stl);

    set.run(&ctx)
}
