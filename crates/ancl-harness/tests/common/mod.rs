#![allow(dead_code)]

//! Fake compilers for hermetic pipeline tests.
//!
//! Test "programs" are shell scripts. The fake reference compiler copies its input
//! to the `-o` path and marks it executable, so a script behaves the same whether
//! it came straight from the source or through the fake ancl. The fake ancl
//! rewrites the source on the way to its assembly output:
//!
//! - lines ending in `#REF` are dropped,
//! - a leading `#ANCL ` is removed (the line becomes live),
//! - with `-O`, a leading `#OPT ` is removed as well.
//!
//! Marker lines trigger toolchain faults: `# cc-error`, `# cc-noexec`,
//! `# ancl-error`, `# ancl-noasm`.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use ancl_harness::{AsmSyntax, RunConfig, RunnerConfig, ToolchainConfig};

const FAKE_CC: &str = r#"#!/bin/sh
src=""
out=""
for arg in "$@"; do
  case "$arg" in
    -o*) out="${arg#-o}" ;;
    -I*) ;;
    *) src="$arg" ;;
  esac
done
if [ -z "$src" ] || [ -z "$out" ]; then
  echo "fake-cc: usage: fake-cc <src> -o<out> [-I<dir>]" >&2
  exit 2
fi
if [ ! -f "$src" ]; then
  echo "fake-cc: error: no such file: $src" >&2
  exit 1
fi
if grep -q '^# cc-error' "$src"; then
  echo "fake-cc: error: rejected $src" >&2
  exit 1
fi
cp "$src" "$out" || exit 1
if grep -q '^# cc-noexec' "$src"; then
  chmod -x "$out"
else
  chmod +x "$out"
fi
"#;

const FAKE_ANCL: &str = r#"#!/bin/sh
src=""
asm=""
opt=0
for arg in "$@"; do
  case "$arg" in
    -f*) src="${arg#-f}" ;;
    -n*|-g*) asm="${arg#-?}" ;;
    -O) opt=1 ;;
    --linscan) ;;
    *) echo "fake-ancl: unknown argument: $arg" >&2; exit 2 ;;
  esac
done
echo "fake-ancl: compiling $src"
if grep -q '^# ancl-error' "$src"; then
  echo "fake-ancl: error: unsupported construct in $src" >&2
  exit 1
fi
if grep -q '^# ancl-noasm' "$src"; then
  exit 0
fi
if [ "$opt" = 1 ]; then
  sed -e '/#REF$/d' -e 's/^#ANCL //' -e 's/^#OPT //' "$src" > "$asm"
else
  sed -e '/#REF$/d' -e 's/^#ANCL //' "$src" > "$asm"
fi
"#;

pub struct FakeToolchain {
    pub dir: PathBuf,
    pub cc: PathBuf,
    pub ancl: PathBuf,
}

/// Written once per test binary, before any test spawns a process, so no
/// concurrently forked child can hold the scripts open for writing.
pub fn toolchain() -> &'static FakeToolchain {
    static TOOLCHAIN: OnceLock<FakeToolchain> = OnceLock::new();
    TOOLCHAIN.get_or_init(|| {
        let dir = make_temp_dir("toolchain");
        let cc = dir.join("fake-cc");
        let ancl = dir.join("fake-ancl");
        write_executable(&cc, FAKE_CC);
        write_executable(&ancl, FAKE_ANCL);
        FakeToolchain { dir, cc, ancl }
    })
}

pub fn make_temp_dir(prefix: &str) -> PathBuf {
    let base = std::env::temp_dir();
    let pid = std::process::id();
    for n in 0..10_000u32 {
        let p = base.join(format!("ancl-harness-{prefix}-{pid}-{n}"));
        if std::fs::create_dir(&p).is_ok() {
            return p;
        }
    }
    panic!("failed to create temp dir under {}", base.display());
}

pub fn write_file(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent dir");
    }
    std::fs::write(path, contents).expect("write file");
}

fn write_executable(path: &Path, contents: &str) {
    use std::os::unix::fs::PermissionsExt as _;

    write_file(path, contents);
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .expect("chmod fake compiler");
}

/// A tests dir with its own artifact root, using the fake toolchain.
pub struct Suite {
    pub root: PathBuf,
    pub config: RunConfig,
}

impl Suite {
    pub fn new(prefix: &str) -> Self {
        let tc = toolchain();
        let root = make_temp_dir(prefix);
        let tests_dir = root.join("suite");
        std::fs::create_dir_all(&tests_dir).expect("create suite dir");
        let config = RunConfig {
            toolchain: ToolchainConfig {
                reference_cc: tc.cc.clone(),
                ancl: tc.ancl.clone(),
                optimize: false,
                asm_syntax: AsmSyntax::Intel,
                linear_scan: false,
            },
            runner: RunnerConfig {
                wall_timeout: Some(Duration::from_secs(20)),
            },
            tests_dir,
            artifact_root: root.join("artifacts"),
            keep_artifacts: false,
        };
        Suite { root, config }
    }

    pub fn add(&self, id: &str, script: &str) {
        write_file(&self.config.tests_dir.join(id), script);
    }
}

impl Drop for Suite {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.root);
    }
}
