//! abuild - cross-compile autotools libraries for Android
//!
//! This crate provides the library functionality behind the `abuild`
//! binary: standalone toolchain generation, per-ABI build environments,
//! the autotools lifecycle and JNI-loadability checks.

pub mod builder;
pub mod core;
pub mod ops;
pub mod util;

/// Fake NDK and autotools projects for unit tests.
#[cfg(all(test, unix))]
pub mod test_support;

pub use crate::builder::BuildError;
pub use crate::core::{ArchTable, Task};
pub use crate::ops::{BuildSet, RunReport};
