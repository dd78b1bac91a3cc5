//! Cross-compilation environment for autotools.
//!
//! Builds the variables `./configure` and `make` need to target one ABI:
//! prefixed tool names, flag strings, `PATH` and the pkg-config search path.
//!
//! Flag precedence, first to last: table defaults, ABI overrides, the
//! release/debug flag, then the mandatory include/sysroot flag.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::PathBuf;

use crate::builder::errors::BuildError;
use crate::builder::toolchain::{runtime_library_name, Toolchain};
use crate::core::abi::ArchTable;

/// Per-build settings, passed explicitly into each build call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildMode {
    /// Optimise (`-O3`) instead of emitting debug info (`-g`)
    pub release: bool,
    /// Stream tool output instead of capturing it
    pub verbose: bool,
    /// Add C++ flags and link against the C++ runtime
    pub cpp: bool,
}

impl BuildMode {
    pub fn with_cpp(mut self, cpp: bool) -> Self {
        self.cpp = cpp;
        self
    }

    fn optimization_flag(&self) -> &'static str {
        if self.release {
            "-O3"
        } else {
            "-g"
        }
    }
}

/// Tool variables and the binary each one names.
const TOOLS: &[(&str, &str)] = &[
    ("CPP", "cpp"),
    ("AR", "ar"),
    ("AS", "as"),
    ("NM", "nm"),
    ("CC", "gcc"),
    ("CXX", "g++"),
    ("LD", "ld"),
    ("RANLIB", "ranlib"),
    ("STRIP", "strip"),
    ("OBJDUMP", "objdump"),
];

/// Environment overrides for one toolchain and build mode.
///
/// Variables not listed here are inherited from the calling process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    host: String,
    vars: BTreeMap<String, String>,
}

impl Environment {
    /// Build the environment for `toolchain`.
    ///
    /// `stl` names the C++ runtime linked when `mode.cpp` is set.
    pub fn for_toolchain(
        toolchain: &Toolchain,
        table: &ArchTable,
        mode: &BuildMode,
        stl: &str,
    ) -> Result<Self, BuildError> {
        let host = toolchain.host_triple()?;
        let abi = toolchain.abi();
        let sysroot = toolchain.sysroot();
        let mut vars = BTreeMap::new();

        vars.insert("PATH".to_string(), search_path(toolchain.bin_dir()));

        for (var, tool) in TOOLS {
            vars.insert(var.to_string(), format!("{}-{}", host, tool));
        }

        let pkgconfig = toolchain
            .prefix_lib_dir()
            .join("pkgconfig")
            .display()
            .to_string();
        vars.insert("PKG_CONFIG_PATH".to_string(), pkgconfig.clone());
        vars.insert("PKG_CONFIG_LIBDIR".to_string(), pkgconfig);

        let sysroot_flags = format!(
            "-I{} --sysroot={}",
            toolchain.prefix_include_dir().display(),
            sysroot.display()
        );

        let mut cflags = table.cflags.clone();
        cflags.extend(abi.cflags.iter().cloned());
        cflags.push(mode.optimization_flag().to_string());
        cflags.push(sysroot_flags.clone());

        let mut ldflags = table.ldflags.clone();
        ldflags.extend(abi.ldflags.iter().cloned());
        ldflags.push(format!(
            "-L{} -L{}/usr/lib -lm",
            toolchain.prefix_lib_dir().display(),
            sysroot.display()
        ));

        if mode.cpp {
            let cpp_include = toolchain.cpp_include_dir();
            if !cpp_include.is_dir() {
                return Err(BuildError::ToolchainResolution {
                    bin_dir: toolchain.bin_dir(),
                    reason: format!("C++ headers not found at {}", cpp_include.display()),
                });
            }

            let mut cxxflags = table.cxxflags.clone();
            cxxflags.extend(abi.cxxflags.iter().cloned());
            cxxflags.push(mode.optimization_flag().to_string());
            cxxflags.push(sysroot_flags.clone());
            cxxflags.push(format!("-I{}", cpp_include.display()));
            cxxflags.push("-fexceptions".to_string());
            cxxflags.push("-frtti".to_string());
            vars.insert("CXXFLAGS".to_string(), cxxflags.join(" "));

            let runtime = runtime_library_name(stl);
            let link_name = runtime
                .strip_prefix("lib")
                .and_then(|n| n.strip_suffix(".so"))
                .unwrap_or(&runtime);
            ldflags.push(format!("-l{}", link_name));
        }

        vars.insert("CPPFLAGS".to_string(), sysroot_flags);
        vars.insert("CFLAGS".to_string(), cflags.join(" "));
        vars.insert("LDFLAGS".to_string(), ldflags.join(" "));

        Ok(Environment { host, vars })
    }

    /// The compiler prefix used for `--host`.
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(|v| v.as_str())
    }

    pub fn vars(&self) -> &BTreeMap<String, String> {
        &self.vars
    }
}

/// `bin_dir` prepended to the current `PATH`.
fn search_path(bin_dir: PathBuf) -> String {
    let mut paths = vec![bin_dir];
    if let Some(current) = std::env::var_os("PATH") {
        paths.extend(std::env::split_paths(&current));
    }
    std::env::join_paths(paths)
        .unwrap_or_else(|_| OsString::new())
        .to_string_lossy()
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::abi::Abi;
    use std::fs;
    use tempfile::TempDir;

    fn table() -> ArchTable {
        ArchTable::parse(
            r#"
cflags = ["-DGLOBAL_C"]
cxxflags = ["-DGLOBAL_CXX"]
ldflags = ["-Wl,--global"]

[[arch]]
name = "arm"

[[arch.abi]]
name = "armeabi-v7a"
cflags = ["-DABI_C"]
cxxflags = ["-DABI_CXX"]
ldflags = ["-Wl,--abi"]
"#,
        )
        .unwrap()
    }

    fn toolchain(tmp: &TempDir, table: &ArchTable) -> Toolchain {
        let bin = tmp.path().join("bin");
        fs::create_dir_all(&bin).unwrap();
        fs::create_dir_all(tmp.path().join("include/gabi++/include")).unwrap();
        fs::write(bin.join("arm-linux-androideabi-gcc"), "").unwrap();

        let abi: Abi = table.abi("armeabi-v7a").unwrap().clone();
        Toolchain::new(tmp.path(), "arm", abi).unwrap()
    }

    fn position(haystack: &str, needle: &str) -> usize {
        haystack
            .find(needle)
            .unwrap_or_else(|| panic!("`{}` not found in `{}`", needle, haystack))
    }

    #[test]
    fn test_tool_variables() {
        let tmp = TempDir::new().unwrap();
        let table = table();
        let tc = toolchain(&tmp, &table);
        let env = Environment::for_toolchain(&tc, &table, &BuildMode::default(), "stlport").unwrap();

        assert_eq!(env.host(), "arm-linux-androideabi");
        assert_eq!(env.get("CC"), Some("arm-linux-androideabi-gcc"));
        assert_eq!(env.get("CXX"), Some("arm-linux-androideabi-g++"));
        assert_eq!(env.get("AS"), Some("arm-linux-androideabi-as"));
        assert_eq!(env.get("OBJDUMP"), Some("arm-linux-androideabi-objdump"));
        assert!(env
            .get("PATH")
            .unwrap()
            .starts_with(&tc.bin_dir().display().to_string()));
        assert_eq!(
            env.get("PKG_CONFIG_PATH").unwrap(),
            tc.prefix().join("lib/pkgconfig").display().to_string()
        );
    }

    #[test]
    fn test_cflags_precedence() {
        let tmp = TempDir::new().unwrap();
        let table = table();
        let tc = toolchain(&tmp, &table);

        for (release, mode_flag) in [(false, "-g"), (true, "-O3")] {
            let mode = BuildMode {
                release,
                ..BuildMode::default()
            };
            let env = Environment::for_toolchain(&tc, &table, &mode, "stlport").unwrap();
            let cflags = env.get("CFLAGS").unwrap();

            let global = position(cflags, "-DGLOBAL_C");
            let abi = position(cflags, "-DABI_C");
            let mode_pos = position(cflags, mode_flag);
            let sysroot = position(cflags, "--sysroot=");
            assert!(global < abi && abi < mode_pos && mode_pos < sysroot);
            assert!(cflags.ends_with(&format!("--sysroot={}", tc.sysroot().display())));
        }
    }

    #[test]
    fn test_precedence_for_every_bundled_abi() {
        let table = ArchTable::bundled().unwrap();

        for arch in table.arch_names() {
            for abi in table.abis_for_arch(&arch).unwrap() {
                let tmp = TempDir::new().unwrap();
                let bin = tmp.path().join("bin");
                fs::create_dir_all(&bin).unwrap();
                fs::create_dir_all(tmp.path().join("include/gabi++/include")).unwrap();
                fs::write(bin.join("fake-linux-android-gcc"), "").unwrap();
                let tc = Toolchain::new(tmp.path(), arch.as_str(), abi.clone()).unwrap();

                let sysroot = vec![
                    format!("-I{}", tc.prefix_include_dir().display()),
                    format!("--sysroot={}", tc.sysroot().display()),
                ];

                for (release, mode_flag) in [(false, "-g"), (true, "-O3")] {
                    let mode = BuildMode {
                        release,
                        cpp: true,
                        ..BuildMode::default()
                    };
                    let env = Environment::for_toolchain(&tc, &table, &mode, "stlport").unwrap();
                    let tokens = |key: &str| -> Vec<String> {
                        env.get(key)
                            .unwrap()
                            .split_whitespace()
                            .map(str::to_string)
                            .collect()
                    };

                    let mut cflags = table.cflags.clone();
                    cflags.extend(abi.cflags.iter().cloned());
                    cflags.push(mode_flag.to_string());
                    cflags.extend(sysroot.iter().cloned());
                    assert_eq!(tokens("CFLAGS"), cflags, "CFLAGS for {}", abi.name);

                    let mut cxxflags = table.cxxflags.clone();
                    cxxflags.extend(abi.cxxflags.iter().cloned());
                    cxxflags.push(mode_flag.to_string());
                    cxxflags.extend(sysroot.iter().cloned());
                    let cxx = tokens("CXXFLAGS");
                    assert_eq!(&cxx[..cxxflags.len()], &cxxflags[..], "CXXFLAGS for {}", abi.name);

                    let mut ldflags = table.ldflags.clone();
                    ldflags.extend(abi.ldflags.iter().cloned());
                    let ld = tokens("LDFLAGS");
                    assert_eq!(&ld[..ldflags.len()], &ldflags[..], "LDFLAGS for {}", abi.name);
                    assert_eq!(ld.last().map(String::as_str), Some("-lstlport_shared"));
                }
            }
        }
    }

    #[test]
    fn test_ldflags_precedence() {
        let tmp = TempDir::new().unwrap();
        let table = table();
        let tc = toolchain(&tmp, &table);
        let env = Environment::for_toolchain(&tc, &table, &BuildMode::default(), "stlport").unwrap();
        let ldflags = env.get("LDFLAGS").unwrap();

        assert!(position(ldflags, "-Wl,--global") < position(ldflags, "-Wl,--abi"));
        assert!(position(ldflags, "-Wl,--abi") < position(ldflags, "/usr/lib -lm"));
        assert!(!ldflags.contains("stlport"));
    }

    #[test]
    fn test_cpp_toggle_is_pure_superset() {
        let tmp = TempDir::new().unwrap();
        let table = table();
        let tc = toolchain(&tmp, &table);

        let c = Environment::for_toolchain(&tc, &table, &BuildMode::default(), "stlport").unwrap();
        let cxx = Environment::for_toolchain(
            &tc,
            &table,
            &BuildMode::default().with_cpp(true),
            "stlport",
        )
        .unwrap();

        for (key, value) in c.vars() {
            if key == "LDFLAGS" {
                assert_eq!(
                    cxx.get(key).unwrap(),
                    format!("{} -lstlport_shared", value)
                );
            } else {
                assert_eq!(cxx.get(key), Some(value.as_str()), "{} differs", key);
            }
        }

        let extra: Vec<&String> = cxx.vars().keys().filter(|k| c.get(k).is_none()).collect();
        assert_eq!(extra, vec!["CXXFLAGS"]);

        let cxxflags = cxx.get("CXXFLAGS").unwrap();
        assert!(position(cxxflags, "-DGLOBAL_CXX") < position(cxxflags, "-DABI_CXX"));
        assert!(position(cxxflags, "-DABI_CXX") < position(cxxflags, "--sysroot="));
        assert!(cxxflags.ends_with(&format!(
            "-I{} -fexceptions -frtti",
            tc.cpp_include_dir().display()
        )));
        assert!(c.get("CXXFLAGS").is_none());
    }

    #[test]
    fn test_cpp_requires_runtime_headers() {
        let tmp = TempDir::new().unwrap();
        let table = table();
        let tc = toolchain(&tmp, &table);
        fs::remove_dir_all(tmp.path().join("include")).unwrap();

        let err = Environment::for_toolchain(
            &tc,
            &table,
            &BuildMode::default().with_cpp(true),
            "stlport",
        )
        .unwrap_err();
        assert!(matches!(err, BuildError::ToolchainResolution { .. }));

        assert!(Environment::for_toolchain(&tc, &table, &BuildMode::default(), "stlport").is_ok());
    }

    #[test]
    fn test_stl_selects_runtime_link_flag() {
        let tmp = TempDir::new().unwrap();
        let table = table();
        let tc = toolchain(&tmp, &table);
        let env = Environment::for_toolchain(
            &tc,
            &table,
            &BuildMode::default().with_cpp(true),
            "gnustl",
        )
        .unwrap();
        assert!(env.get("LDFLAGS").unwrap().ends_with("-lgnustl_shared"));
    }
}
