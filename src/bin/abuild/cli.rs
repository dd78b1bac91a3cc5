//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use abuild::util::shell::ColorChoice;

/// abuild - cross-compile autotools libraries for Android
#[derive(Parser)]
#[command(name = "abuild")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Stream configure/make output and print full error details
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print errors only
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Coloring: auto, always, never
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    pub color: ColorChoice,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build every target of a build file for every requested ABI
    Build(BuildArgs),

    /// List the supported architectures and their ABIs
    Abis,
}

#[derive(Args)]
pub struct BuildArgs {
    /// JSON build file
    pub build_file: PathBuf,

    /// Architecture to build (repeatable; overrides the build file)
    #[arg(short = 'a', long = "arch", value_name = "ARCH")]
    pub archs: Vec<String>,

    /// Only build this ABI (repeatable)
    #[arg(long = "abi", value_name = "ABI")]
    pub abis: Vec<String>,

    /// Output directory; libraries land in <DIR>/<abi>/
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub output: PathBuf,

    /// Build with optimizations instead of debug info
    #[arg(short = 'R', long)]
    pub release: bool,

    /// Number of parallel make jobs
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Make program
    #[arg(long, env = "MAKE", value_name = "PROGRAM")]
    pub make: Option<PathBuf>,

    /// STL flavour for the standalone toolchains
    #[arg(long)]
    pub stl: Option<String>,

    /// Android platform for the standalone toolchains
    #[arg(long)]
    pub platform: Option<String>,
}
