//! JNI-loadability checks for built libraries.
//!
//! Android's JNI loader resolves dependencies by exact SONAME and does not
//! understand versioned names like `libfoo.so.1`. A shared library passes
//! only if its SONAME equals its own filename and every NEEDED entry ends
//! in `.so`. Static archives carry no dynamic section and always pass.

use std::path::Path;

use anyhow::Result;

use crate::builder::env::Environment;
use crate::core::target::LibraryKind;
use crate::util::process::ProcessBuilder;

/// The parts of a dynamic section the loader cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DynamicInfo {
    pub needed: Vec<String>,
    pub soname: Option<String>,
}

/// Parse `objdump -x` output.
///
/// Reads the entries following the `Dynamic Section` header up to the next
/// blank line.
pub fn parse_objdump(output: &str) -> DynamicInfo {
    let mut info = DynamicInfo::default();
    let mut lines = output
        .lines()
        .skip_while(|line| !line.starts_with("Dynamic Section"));

    if lines.next().is_none() {
        return info;
    }

    for line in lines {
        if line.trim().is_empty() {
            break;
        }

        let mut fields = line.split_whitespace();
        let (Some(tag), Some(value)) = (fields.next(), fields.next()) else {
            continue;
        };

        match tag {
            "NEEDED" => info.needed.push(value.to_string()),
            "SONAME" => info.soname = Some(value.to_string()),
            _ => {}
        }
    }

    info
}

/// Check dynamic-section metadata against the JNI loader's rules.
///
/// Returns every violation found; an empty list means the library loads.
pub fn check_dynamic_info(kind: LibraryKind, name: &str, info: &DynamicInfo) -> Vec<String> {
    if !kind.has_dynamic_section() {
        return Vec::new();
    }

    let mut errors = Vec::new();

    match info.soname.as_deref() {
        Some(soname) if soname == name => {}
        Some(soname) if soname.starts_with(name) => errors.push(format!(
            "Found versioned SONAME field; breaks loading via JNI: '{}'",
            soname
        )),
        Some(soname) => errors.push(format!(
            "SONAME field '{}' does not match library name '{}'",
            soname, name
        )),
        None => errors.push(format!("Missing SONAME field; expected '{}'", name)),
    }

    for needed in &info.needed {
        if !needed.ends_with(".so") {
            errors.push(format!(
                "Found versioned NEEDED field; will not load via JNI: '{}'",
                needed
            ));
        }
    }

    errors
}

/// Inspect a built library with the toolchain's `objdump` and check it.
pub fn verify_library(
    objdump: &Path,
    env: &Environment,
    library: &Path,
    kind: LibraryKind,
    name: &str,
) -> Result<Vec<String>> {
    if !kind.has_dynamic_section() {
        return Ok(Vec::new());
    }

    let output = ProcessBuilder::new(objdump)
        .arg("-x")
        .arg(library)
        .envs(env.vars())
        .exec_and_check()?;

    let info = parse_objdump(&String::from_utf8_lossy(&output.stdout));
    tracing::debug!("{}: SONAME {:?}, NEEDED {:?}", name, info.soname, info.needed);

    Ok(check_dynamic_info(kind, name, &info))
}
