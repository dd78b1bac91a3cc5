//! High-level operations.
//!
//! This module contains the implementation of abuild commands.

pub mod abuild_build;
pub mod build_set;

pub use abuild_build::{build, BuildOptions};
pub use build_set::{BuildSet, RunReport};
