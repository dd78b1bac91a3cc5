//! Library kinds and queued build tasks.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

/// What kind of library a task produces.
///
/// Selected from the output filename extension: `.so` is shared, `.a` is
/// static.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LibraryKind {
    Shared,
    Static,
}

impl LibraryKind {
    /// Infer the kind from an output filename.
    pub fn from_output(name: &str) -> Option<Self> {
        if name.ends_with(".so") {
            Some(LibraryKind::Shared)
        } else if name.ends_with(".a") {
            Some(LibraryKind::Static)
        } else {
            None
        }
    }

    /// Arguments passed to `./configure` to select this kind.
    pub fn configure_args(&self) -> [&'static str; 2] {
        match self {
            LibraryKind::Shared => ["--disable-static", "--enable-shared"],
            LibraryKind::Static => ["--disable-shared", "--enable-static"],
        }
    }

    /// Whether the produced artifact carries dynamic-linking metadata to check.
    pub fn has_dynamic_section(&self) -> bool {
        matches!(self, LibraryKind::Shared)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LibraryKind::Shared => "shared library",
            LibraryKind::Static => "static library",
        }
    }
}

impl fmt::Display for LibraryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A library queued for building against every requested ABI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// Autotools source tree (contains `configure`)
    pub src_dir: PathBuf,

    /// Output filename, e.g. `libfoo.so`
    pub output: String,

    /// Library kind, derived from `output`
    pub kind: LibraryKind,

    /// Extra arguments for `./configure`
    pub configure_args: Vec<String>,

    /// Text appended to `config.h` after configure
    pub inject: Option<String>,

    /// Whether the library needs the C++ runtime
    pub cpp: bool,
}

impl Task {
    /// Create a task; fails if the output name is neither `.so` nor `.a`.
    pub fn new(src_dir: impl AsRef<Path>, output: impl Into<String>) -> Result<Self> {
        let output = output.into();
        let Some(kind) = LibraryKind::from_output(&output) else {
            bail!(
                "cannot infer library kind from `{}`: output must end in `.so` or `.a`",
                output
            );
        };

        Ok(Task {
            src_dir: src_dir.as_ref().to_path_buf(),
            output,
            kind,
            configure_args: Vec::new(),
            inject: None,
            cpp: false,
        })
    }

    pub fn configure_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.configure_args.extend(args.into_iter().map(|a| a.into()));
        self
    }

    pub fn inject(mut self, code: Option<String>) -> Self {
        self.inject = code;
        self
    }

    pub fn cpp(mut self, cpp: bool) -> Self {
        self.cpp = cpp;
        self
    }
}
