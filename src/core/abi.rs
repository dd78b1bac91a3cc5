//! Architecture and ABI table.
//!
//! The table ships with the binary (`data/archs.toml`) and is parsed once at
//! startup. It is immutable afterwards and handed by reference to everything
//! that needs per-ABI flags.

use anyhow::{bail, Context, Result};
use serde::Deserialize;

/// The bundled table, embedded at compile time.
pub const BUNDLED_ARCH_TABLE: &str = include_str!("../../data/archs.toml");

/// A concrete binary interface within an architecture family.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Abi {
    /// ABI identifier (e.g. `armeabi-v7a`)
    pub name: String,

    /// C compiler flags appended after the global defaults
    #[serde(default)]
    pub cflags: Vec<String>,

    /// C++ compiler flags appended after the global defaults
    #[serde(default)]
    pub cxxflags: Vec<String>,

    /// Linker flags appended after the global defaults
    #[serde(default)]
    pub ldflags: Vec<String>,
}

/// A CPU family, as understood by the NDK toolchain generator.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Architecture {
    /// Architecture name passed as `--arch` (e.g. `arm`)
    pub name: String,

    /// ABIs belonging to this architecture, in build order
    #[serde(rename = "abi", default)]
    pub abis: Vec<Abi>,
}

/// The full architecture table plus the global flag defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct ArchTable {
    #[serde(default)]
    pub cflags: Vec<String>,

    #[serde(default)]
    pub cxxflags: Vec<String>,

    #[serde(default)]
    pub ldflags: Vec<String>,

    #[serde(rename = "arch", default)]
    archs: Vec<Architecture>,
}

impl ArchTable {
    /// Load the table bundled with this build.
    pub fn bundled() -> Result<Self> {
        Self::parse(BUNDLED_ARCH_TABLE).context("bundled architecture table is invalid")
    }

    /// Parse and validate a table.
    ///
    /// Every architecture must declare at least one ABI, and ABI names must be
    /// unique across the whole table.
    pub fn parse(contents: &str) -> Result<Self> {
        let table: ArchTable =
            toml::from_str(contents).context("failed to parse architecture table")?;

        let mut seen = Vec::new();
        for arch in &table.archs {
            if arch.abis.is_empty() {
                bail!("architecture `{}` declares no ABIs", arch.name);
            }
            for abi in &arch.abis {
                if seen.contains(&abi.name.as_str()) {
                    bail!("ABI `{}` is declared more than once", abi.name);
                }
                seen.push(abi.name.as_str());
            }
        }

        Ok(table)
    }

    /// All architectures, in table order.
    pub fn archs(&self) -> &[Architecture] {
        &self.archs
    }

    /// Architecture names, in table order.
    pub fn arch_names(&self) -> Vec<String> {
        self.archs.iter().map(|a| a.name.clone()).collect()
    }

    /// Look up an architecture by name.
    pub fn arch(&self, name: &str) -> Option<&Architecture> {
        self.archs.iter().find(|a| a.name == name)
    }

    /// ABIs of an architecture.
    pub fn abis_for_arch(&self, arch: &str) -> Option<&[Abi]> {
        self.arch(arch).map(|a| a.abis.as_slice())
    }

    /// Look up an ABI by name.
    pub fn abi(&self, name: &str) -> Option<&Abi> {
        self.archs
            .iter()
            .flat_map(|a| a.abis.iter())
            .find(|abi| abi.name == name)
    }
}
