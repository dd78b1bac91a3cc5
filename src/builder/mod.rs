//! Cross-compilation of autotools libraries.
//!
//! Toolchain generation, the per-ABI environment, the autotools driver and
//! the checks applied to every built library.

pub mod autotools;
pub mod context;
pub mod env;
pub mod errors;
pub mod target;
pub mod toolchain;
pub mod verify;

pub use autotools::Autotools;
pub use context::BuildContext;
pub use env::{BuildMode, Environment};
pub use errors::BuildError;
pub use target::BuildTarget;
pub use toolchain::{Toolchain, ToolchainRegistry};
