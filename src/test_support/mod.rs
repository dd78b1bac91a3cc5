//! Fake NDK and autotools projects for unit tests.
//!
//! Everything here is a small POSIX shell script, so these helpers are
//! Unix-only. The fake toolchain uses a single host triple for every
//! architecture and its `objdump` reports the artifact's own contents as
//! the SONAME; a project can therefore choose its SONAME by writing it to
//! a `SONAME` file.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

const GENERATOR: &str = r#"#!/bin/sh
for a in "$@"; do
  case "$a" in
    --install-dir=*) dir="${a#*=}" ;;
    --arch=*) arch="${a#*=}" ;;
    --stl=*) stl="${a#*=}" ;;
  esac
done
host=fake-linux-android
mkdir -p "$dir/bin" "$dir/include/gabi++/include" "$dir/sysroot/usr/lib" "$dir/$host/lib"
: > "$dir/bin/$host-gcc"
cat > "$dir/bin/$host-objdump" <<'OBJDUMP'
#!/bin/sh
echo "$2:     file format elf32-fake"
echo
echo "Dynamic Section:"
echo "  NEEDED               libc.so"
echo "  SONAME               $(cat "$2")"
echo
OBJDUMP
chmod 755 "$dir/bin/$host-objdump"
echo "runtime for $arch" > "$dir/$host/lib/lib${stl}_shared.so"
echo "Toolchain installed to $dir."
"#;

const CONFIGURE: &str = r#"#!/bin/sh
echo "$@" >> attempts.log
while [ $# -gt 0 ]; do
  case "$1" in
    --prefix) echo "$2" > .prefix; shift ;;
  esac
  shift
done
echo '#define PACKAGE "fake"' > config.h
"#;

const MAKE: &str = r#"#!/bin/sh
out=$(cat OUTPUT)
case "$1" in
  distclean)
    rm -f .prefix config.h "$out"
    ;;
  install)
    prefix=$(cat .prefix)
    mkdir -p "$prefix/lib"
    cp "$out" "$prefix/lib/$out"
    ;;
  *)
    if [ -f FAIL ]; then
      echo "error: $out does not compile" >&2
      exit 2
    fi
    if [ -f SONAME ]; then cat SONAME > "$out"; else echo "$out" > "$out"; fi
    ;;
esac
"#;

/// Write an executable script.
pub fn write_script(path: &Path, body: &str) {
    fs::write(path, body).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

/// A scratch directory holding a fake NDK, a fake `make` and projects.
pub struct FakeNdk {
    dir: TempDir,
}

impl FakeNdk {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let tools = dir.path().join("ndk/build/tools");
        fs::create_dir_all(&tools).unwrap();
        write_script(&tools.join("make-standalone-toolchain.sh"), GENERATOR);
        write_script(&dir.path().join("fake-make"), MAKE);
        FakeNdk { dir }
    }

    /// NDK root.
    pub fn ndk(&self) -> PathBuf {
        self.dir.path().join("ndk")
    }

    /// The fake `make` program.
    pub fn make(&self) -> PathBuf {
        self.dir.path().join("fake-make")
    }

    pub fn out_dir(&self) -> PathBuf {
        self.dir.path().join("out")
    }

    /// Create an autotools-style project that builds `output`.
    pub fn project(&self, name: &str, output: &str) -> PathBuf {
        let src = self.dir.path().join(name);
        fs::create_dir_all(&src).unwrap();
        write_script(&src.join("configure"), CONFIGURE);
        fs::write(src.join("OUTPUT"), output).unwrap();
        src
    }
}

/// Make the project's compile step fail.
pub fn fail_compile(project: &Path) {
    fs::write(project.join("FAIL"), "").unwrap();
}

/// Embed `soname` in the project's artifact.
pub fn set_soname(project: &Path, soname: &str) {
    fs::write(project.join("SONAME"), soname).unwrap();
}

/// Whether `./configure` ever ran in the project.
pub fn was_attempted(project: &Path) -> bool {
    project.join("attempts.log").exists()
}
