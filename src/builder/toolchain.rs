//! Standalone NDK toolchains, one per ABI.
//!
//! The registry runs the NDK's `make-standalone-toolchain.sh` once per
//! architecture into a private temporary tree, then records a [`Toolchain`]
//! for every ABI of that architecture. Each toolchain owns its own install
//! prefix, so libraries built for one ABI are never visible to another.
//!
//! All temporary directories are released when the registry is dropped.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::TempDir;

use crate::builder::errors::BuildError;
use crate::core::abi::{Abi, ArchTable};
use crate::util::fs::glob_paths;
use crate::util::process::ProcessBuilder;
use crate::util::shell::{Shell, Status};

/// Location of the generator script inside the NDK.
const GENERATOR_SCRIPT: &str = "build/tools/make-standalone-toolchain.sh";

/// Options forwarded to the toolchain generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorOptions {
    /// STL flavour, e.g. "stlport"
    pub stl: String,
    /// Android platform, e.g. "android-14"
    pub platform: String,
}

/// A generated cross-compiler installation for one ABI.
#[derive(Debug)]
pub struct Toolchain {
    root: PathBuf,
    arch: String,
    abi: Abi,
    prefix: TempDir,
}

impl Toolchain {
    /// Wrap an existing standalone toolchain tree.
    ///
    /// Allocates a fresh, private install prefix.
    pub fn new(root: impl Into<PathBuf>, arch: impl Into<String>, abi: Abi) -> Result<Self> {
        let prefix = tempfile::Builder::new()
            .prefix(&format!("abuild-prefix-{}-", abi.name))
            .tempdir()
            .context("failed to create install prefix")?;

        Ok(Toolchain {
            root: root.into(),
            arch: arch.into(),
            abi,
            prefix,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn arch(&self) -> &str {
        &self.arch
    }

    pub fn abi(&self) -> &Abi {
        &self.abi
    }

    pub fn abi_name(&self) -> &str {
        &self.abi.name
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.root.join("bin")
    }

    pub fn sysroot(&self) -> PathBuf {
        self.root.join("sysroot")
    }

    /// Private `--prefix` for `./configure`.
    pub fn prefix(&self) -> &Path {
        self.prefix.path()
    }

    /// Where `make install` puts libraries.
    pub fn prefix_lib_dir(&self) -> PathBuf {
        self.prefix().join("lib")
    }

    pub fn prefix_include_dir(&self) -> PathBuf {
        self.prefix().join("include")
    }

    /// Headers needed by C++ sources (cstdint etc).
    pub fn cpp_include_dir(&self) -> PathBuf {
        self.root.join("include").join("gabi++").join("include")
    }

    /// The compiler prefix, e.g. `arm-linux-androideabi`.
    ///
    /// Derived from the single `*-gcc` binary in `bin/`; zero or several
    /// candidates mean the toolchain is broken or ambiguous.
    pub fn host_triple(&self) -> Result<String, BuildError> {
        let bin_dir = self.bin_dir();
        let resolution = |reason: String| BuildError::ToolchainResolution {
            bin_dir: bin_dir.clone(),
            reason,
        };

        let candidates =
            glob_paths(&bin_dir.join("*-gcc")).map_err(|e| resolution(format!("{:#}", e)))?;

        match candidates.as_slice() {
            [] => Err(resolution("no `*-gcc` compiler found".to_string())),
            [gcc] => {
                let name = gcc
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                match name.strip_suffix("-gcc") {
                    Some(host) if !host.is_empty() => Ok(host.to_string()),
                    _ => Err(resolution(format!("unexpected compiler name `{}`", name))),
                }
            }
            many => Err(resolution(format!(
                "{} `*-gcc` compilers found, expected exactly one",
                many.len()
            ))),
        }
    }

    /// Absolute path of a prefixed tool, e.g. `tool(host, "objdump")`.
    pub fn tool(&self, host: &str, name: &str) -> PathBuf {
        self.bin_dir().join(format!("{}-{}", host, name))
    }

    /// The bundled C++ runtime shared object for `stl`.
    pub fn runtime_library(&self, host: &str, stl: &str) -> PathBuf {
        self.root
            .join(host)
            .join("lib")
            .join(runtime_library_name(stl))
    }

    /// Make sure this toolchain can build before any build starts.
    ///
    /// Resolves the host triple; with `cpp`, also requires the C++ headers
    /// and the `stl` runtime library.
    pub fn check(&self, cpp: bool, stl: &str) -> Result<String, BuildError> {
        let host = self.host_triple()?;
        if !cpp {
            return Ok(host);
        }

        let missing = |what: &str, path: &Path| BuildError::ToolchainResolution {
            bin_dir: self.bin_dir(),
            reason: format!("{} not found at {}", what, path.display()),
        };

        let headers = self.cpp_include_dir();
        if !headers.is_dir() {
            return Err(missing("C++ headers", &headers));
        }
        let runtime = self.runtime_library(&host, stl);
        if !runtime.is_file() {
            return Err(missing("C++ runtime", &runtime));
        }

        Ok(host)
    }
}

/// Filename of the C++ runtime shared object for an STL flavour.
pub fn runtime_library_name(stl: &str) -> String {
    format!("lib{}_shared.so", stl)
}

/// All toolchains for one orchestration run.
#[derive(Debug)]
pub struct ToolchainRegistry {
    // Field order matters: toolchains drop before the tree they point into.
    toolchains: Vec<Toolchain>,
    options: GeneratorOptions,
    root: TempDir,
}

impl ToolchainRegistry {
    /// Generate one standalone toolchain per requested architecture.
    pub fn generate(
        ndk_path: &Path,
        archs: &[String],
        table: &ArchTable,
        options: GeneratorOptions,
        shell: &Shell,
    ) -> Result<Self> {
        if !ndk_path.is_dir() {
            return Err(BuildError::configuration(format!(
                "NDK path must be the NDK directory: {}",
                ndk_path.display()
            ))
            .into());
        }

        let script = ndk_path.join(GENERATOR_SCRIPT);
        if !script.is_file() {
            return Err(BuildError::configuration(format!(
                "not a valid NDK root (missing {}): {}",
                GENERATOR_SCRIPT,
                ndk_path.display()
            ))
            .into());
        }

        let root = tempfile::Builder::new()
            .prefix("abuild-toolchains-")
            .tempdir()
            .context("failed to create toolchain directory")?;

        let mut registry = ToolchainRegistry {
            toolchains: Vec::new(),
            options,
            root,
        };

        let mut done: Vec<&str> = Vec::new();
        for arch in archs {
            if done.contains(&arch.as_str()) {
                tracing::warn!("architecture `{}` requested more than once", arch);
                continue;
            }
            registry.add_arch(&script, arch, table, shell)?;
            done.push(arch.as_str());
        }

        Ok(registry)
    }

    fn add_arch(&mut self, script: &Path, arch: &str, table: &ArchTable, shell: &Shell) -> Result<()> {
        let Some(abis) = table.abis_for_arch(arch) else {
            return Err(BuildError::configuration(format!(
                "unknown architecture `{}`; expected one of: {}",
                arch,
                table.arch_names().join(", ")
            ))
            .into());
        };

        let install_dir = self.root.path().join(arch);
        shell.status_tagged(Status::Building, arch, "standalone toolchain");

        let cmd = ProcessBuilder::new("sh")
            .arg(script)
            .arg(format!("--install-dir={}", install_dir.display()))
            .arg(format!("--stl={}", self.options.stl))
            .arg(format!("--arch={}", arch))
            .arg(format!("--platform={}", self.options.platform));
        tracing::debug!("running {}", cmd.display_command());

        let output = {
            let _spinner = shell.spinner(format!("[{}] make-standalone-toolchain.sh", arch));
            cmd.exec()?
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let captured = if stderr.trim().is_empty() { stdout } else { stderr };
            return Err(BuildError::ToolchainBuild {
                arch: arch.to_string(),
                output: captured.into_owned(),
            }
            .into());
        }

        let confirmation = stdout.lines().next().unwrap_or("").trim();
        if !confirmation.is_empty() {
            shell.status_tagged(Status::Info, arch, confirmation);
        }

        let names: Vec<&str> = abis.iter().map(|a| a.name.as_str()).collect();
        shell.status_tagged(
            Status::Info,
            arch,
            format!("supported ABIs: {}", names.join(", ")),
        );

        for abi in abis {
            if self.get(&abi.name).is_some() {
                continue;
            }
            self.toolchains
                .push(Toolchain::new(&install_dir, arch, abi.clone())?);
        }

        Ok(())
    }

    /// Toolchain for an ABI.
    pub fn get(&self, abi: &str) -> Option<&Toolchain> {
        self.toolchains.iter().find(|t| t.abi_name() == abi)
    }

    /// ABI names, in generation order.
    pub fn abi_names(&self) -> Vec<String> {
        self.toolchains
            .iter()
            .map(|t| t.abi_name().to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::shell::{ColorChoice, Verbosity};
    use std::fs;

    fn abi(name: &str) -> Abi {
        Abi {
            name: name.to_string(),
            cflags: Vec::new(),
            cxxflags: Vec::new(),
            ldflags: Vec::new(),
        }
    }

    fn quiet() -> Shell {
        Shell::new(Verbosity::Quiet, ColorChoice::Never)
    }

    fn options() -> GeneratorOptions {
        GeneratorOptions {
            stl: "stlport".to_string(),
            platform: "android-14".to_string(),
        }
    }

    #[test]
    fn test_host_triple_single_gcc() {
        let tmp = TempDir::new().unwrap();
        let bin = tmp.path().join("bin");
        fs::create_dir_all(&bin).unwrap();
        fs::write(bin.join("arm-linux-androideabi-gcc"), "").unwrap();
        fs::write(bin.join("arm-linux-androideabi-gcc-4.9"), "").unwrap();
        fs::write(bin.join("arm-linux-androideabi-ar"), "").unwrap();

        let tc = Toolchain::new(tmp.path(), "arm", abi("armeabi")).unwrap();
        assert_eq!(tc.host_triple().unwrap(), "arm-linux-androideabi");
        assert_eq!(
            tc.tool("arm-linux-androideabi", "objdump"),
            bin.join("arm-linux-androideabi-objdump")
        );
    }

    #[test]
    fn test_host_triple_missing() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("bin")).unwrap();

        let tc = Toolchain::new(tmp.path(), "x86", abi("x86")).unwrap();
        let err = tc.host_triple().unwrap_err();
        assert!(matches!(err, BuildError::ToolchainResolution { .. }));
    }

    #[test]
    fn test_host_triple_ambiguous() {
        let tmp = TempDir::new().unwrap();
        let bin = tmp.path().join("bin");
        fs::create_dir_all(&bin).unwrap();
        fs::write(bin.join("i686-linux-android-gcc"), "").unwrap();
        fs::write(bin.join("x86_64-linux-android-gcc"), "").unwrap();

        let tc = Toolchain::new(tmp.path(), "x86", abi("x86")).unwrap();
        let err = tc.host_triple().unwrap_err();
        assert!(err.to_string().contains("expected exactly one"));
    }

    #[test]
    fn test_prefixes_are_private() {
        let tmp = TempDir::new().unwrap();
        let a = Toolchain::new(tmp.path(), "arm", abi("armeabi")).unwrap();
        let b = Toolchain::new(tmp.path(), "arm", abi("armeabi-v7a")).unwrap();

        assert_ne!(a.prefix(), b.prefix());
        assert!(a.prefix().is_dir());

        let prefix = a.prefix().to_path_buf();
        drop(a);
        assert!(!prefix.exists());
    }

    #[test]
    fn test_runtime_library_path() {
        let tmp = TempDir::new().unwrap();
        let tc = Toolchain::new(tmp.path(), "x86", abi("x86")).unwrap();
        assert_eq!(
            tc.runtime_library("i686-linux-android", "stlport"),
            tmp.path().join("i686-linux-android/lib/libstlport_shared.so")
        );
    }

    #[test]
    fn test_check_cpp_requirements() {
        let tmp = TempDir::new().unwrap();
        let bin = tmp.path().join("bin");
        fs::create_dir_all(&bin).unwrap();
        fs::write(bin.join("i686-linux-android-gcc"), "").unwrap();
        let tc = Toolchain::new(tmp.path(), "x86", abi("x86")).unwrap();

        assert_eq!(tc.check(false, "stlport").unwrap(), "i686-linux-android");
        let err = tc.check(true, "stlport").unwrap_err();
        assert!(err.to_string().contains("C++ headers not found"));

        fs::create_dir_all(tc.cpp_include_dir()).unwrap();
        let err = tc.check(true, "stlport").unwrap_err();
        assert!(err.to_string().contains("C++ runtime not found"));

        let runtime = tc.runtime_library("i686-linux-android", "stlport");
        fs::create_dir_all(runtime.parent().unwrap()).unwrap();
        fs::write(&runtime, "").unwrap();
        assert!(tc.check(true, "stlport").is_ok());
        assert!(matches!(
            tc.check(true, "gnustl"),
            Err(BuildError::ToolchainResolution { .. })
        ));
    }

    #[test]
    fn test_generate_rejects_missing_ndk() {
        let table = ArchTable::bundled().unwrap();
        let err = ToolchainRegistry::generate(
            Path::new("/definitely/not/an/ndk"),
            &["arm".to_string()],
            &table,
            options(),
            &quiet(),
        )
        .unwrap_err();

        let build_err = err.downcast_ref::<BuildError>().unwrap();
        assert!(matches!(build_err, BuildError::Configuration { .. }));
    }

    #[test]
    fn test_generate_rejects_dir_without_script() {
        let tmp = TempDir::new().unwrap();
        let table = ArchTable::bundled().unwrap();
        let err = ToolchainRegistry::generate(
            tmp.path(),
            &["arm".to_string()],
            &table,
            options(),
            &quiet(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("not a valid NDK root"));
    }

    #[cfg(unix)]
    #[test]
    fn test_generate_failure_carries_stderr() {
        let tmp = TempDir::new().unwrap();
        let tools = tmp.path().join("build/tools");
        fs::create_dir_all(&tools).unwrap();
        fs::write(
            tools.join("make-standalone-toolchain.sh"),
            "echo 'ERROR: unknown toolchain' >&2\nexit 1\n",
        )
        .unwrap();

        let table = ArchTable::bundled().unwrap();
        let err = ToolchainRegistry::generate(
            tmp.path(),
            &["arm".to_string()],
            &table,
            options(),
            &quiet(),
        )
        .unwrap_err();

        match err.downcast_ref::<BuildError>().unwrap() {
            BuildError::ToolchainBuild { arch, output } => {
                assert_eq!(arch, "arm");
                assert!(output.contains("unknown toolchain"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_generate_records_every_abi() {
        let tmp = TempDir::new().unwrap();
        let tools = tmp.path().join("build/tools");
        fs::create_dir_all(&tools).unwrap();
        fs::write(
            tools.join("make-standalone-toolchain.sh"),
            "for a in \"$@\"; do case $a in --install-dir=*) dir=\"${a#*=}\";; esac; done\n\
             mkdir -p \"$dir/bin\"\n\
             echo \"Toolchain installed to $dir.\"\n",
        )
        .unwrap();

        let table = ArchTable::bundled().unwrap();
        let registry = ToolchainRegistry::generate(
            tmp.path(),
            &["arm".to_string(), "x86".to_string(), "arm".to_string()],
            &table,
            options(),
            &quiet(),
        )
        .unwrap();

        assert_eq!(registry.abi_names(), vec!["armeabi", "armeabi-v7a", "x86"]);
        let v7a = registry.get("armeabi-v7a").unwrap();
        assert_eq!(v7a.arch(), "arm");
        assert!(v7a.bin_dir().is_dir());
        assert!(registry.get("mips").is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_generate_rejects_unknown_arch() {
        let tmp = TempDir::new().unwrap();
        let tools = tmp.path().join("build/tools");
        fs::create_dir_all(&tools).unwrap();
        fs::write(tools.join("make-standalone-toolchain.sh"), "exit 0\n").unwrap();

        let table = ArchTable::bundled().unwrap();
        let err = ToolchainRegistry::generate(
            tmp.path(),
            &["sparc".to_string()],
            &table,
            options(),
            &quiet(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown architecture `sparc`"));
    }
}
