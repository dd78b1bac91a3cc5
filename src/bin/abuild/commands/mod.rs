//! Command implementations

pub mod abis;
pub mod build;
