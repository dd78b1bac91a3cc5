//! Run-wide build settings.

use std::path::PathBuf;

use crate::core::abi::ArchTable;
use crate::util::config::DEFAULT_STL;
use crate::util::process::host_cpu_count;
use crate::util::shell::Shell;

/// Settings shared by every library and ABI in one run.
///
/// Per-build switches (release, verbose, C++) live in
/// [`BuildMode`](crate::builder::env::BuildMode) instead.
#[derive(Debug)]
pub struct BuildContext<'a> {
    /// Architecture table with the global flag defaults
    pub table: &'a ArchTable,

    /// Console output
    pub shell: &'a Shell,

    /// Published libraries land in `<output_dir>/<abi>/`
    pub output_dir: PathBuf,

    /// Make program
    pub make: PathBuf,

    /// `make -j` value
    pub jobs: usize,

    /// STL flavour; selects the C++ runtime library
    pub stl: String,
}

impl<'a> BuildContext<'a> {
    pub fn new(table: &'a ArchTable, shell: &'a Shell, output_dir: impl Into<PathBuf>) -> Self {
        BuildContext {
            table,
            shell,
            output_dir: output_dir.into(),
            make: PathBuf::from("make"),
            jobs: host_cpu_count(),
            stl: DEFAULT_STL.to_string(),
        }
    }

    pub fn with_make(mut self, make: impl Into<PathBuf>) -> Self {
        self.make = make.into();
        self
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    pub fn with_stl(mut self, stl: impl Into<String>) -> Self {
        self.stl = stl.into();
        self
    }

    /// Output directory for one ABI.
    pub fn abi_output_dir(&self, abi: &str) -> PathBuf {
        self.output_dir.join(abi)
    }
}
