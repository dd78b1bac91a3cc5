//! Core data structures.
//!
//! - The bundled architecture/ABI table
//! - Library kinds and queued tasks
//! - The JSON build file

pub mod abi;
pub mod build_file;
pub mod target;

pub use abi::{Abi, ArchTable, Architecture};
pub use build_file::BuildFile;
pub use target::{LibraryKind, Task};
