//! End-to-end tests for the relstage binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn relstage(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_relstage"));
    cmd.current_dir(dir).env_remove("RUST_LOG");
    cmd
}

fn touch(dir: &Path, names: &[&str]) {
    fs::create_dir_all(dir).unwrap();
    for name in names {
        fs::write(dir.join(name), name).unwrap();
    }
}

#[test]
fn test_stage_windows_bundle() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    touch(
        &root.join("deps/fmt/bin"),
        &["fmt.dll", "fmt.pdb", "fmt-tool.exe"],
    );
    touch(&root.join("deps/zlib/bin"), &["zlib.dll"]);
    fs::write(
        root.join("deps.toml"),
        r#"
[[dependency]]
id = "fmt"
shared = true
bin_dirs = ["deps/fmt/bin"]
helper_executables = false

[[dependency]]
id = "zlib"
shared = false
bin_dirs = ["deps/zlib/bin"]
"#,
    )
    .unwrap();

    relstage(root)
        .args(["stage", "--manifest", "deps.toml", "--os", "windows"])
        .assert()
        .success()
        .stdout(predicate::str::contains("fmt: 1 libraries, 0 executables"))
        .stdout(predicate::str::contains("zlib: static, skipped"));

    let bin = root.join("build/output/release/bin");
    assert!(bin.join("fmt.dll").is_file());
    assert!(!bin.join("fmt.pdb").exists());
    assert!(!bin.join("fmt-tool.exe").exists());
    assert!(!bin.join("zlib.dll").exists());
}

#[test]
fn test_stage_with_json_manifest_and_lib_dir_override() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    touch(&root.join("deps/ssl/bin"), &["libssl-3.dll", "libcrypto-3.dll"]);
    fs::write(
        root.join("deps.json"),
        r#"{"default_shared": true, "dependency": [{"id": "openssl", "bin_dirs": ["deps/ssl/bin"]}]}"#,
    )
    .unwrap();

    relstage(root)
        .args([
            "stage",
            "-m",
            "deps.json",
            "--os",
            "win64",
            "--bin-dir",
            "bundle",
            "--lib-dir",
            "bundle",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("staged 2 libraries"));

    assert!(root.join("bundle/libssl-3.dll").is_file());
    assert!(root.join("bundle/libcrypto-3.dll").is_file());
}

#[test]
fn test_info_reports_rule_and_version() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("version.txt"), "0.11.0\n").unwrap();

    relstage(temp.path())
        .args(["info", "--os", "linux"])
        .assert()
        .success()
        .stdout(predicate::str::contains("family: posix"))
        .stdout(predicate::str::contains("search path patching: true"))
        .stdout(predicate::str::contains("version: 0.11.0"))
        .stdout(predicate::str::contains("dist"));
}

#[test]
fn test_config_file_selects_platform() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("relstage.toml"),
        "[platform]\nos = \"windows\"\n\n[build]\nbuild_type = \"Debug\"\n",
    )
    .unwrap();

    relstage(temp.path())
        .arg("info")
        .assert()
        .success()
        .stdout(predicate::str::contains("os: windows"))
        .stdout(predicate::str::contains("build type: Debug"))
        .stdout(predicate::str::contains("version: unknown"));
}

#[test]
fn test_unknown_platform_fails() {
    let temp = TempDir::new().unwrap();

    relstage(temp.path())
        .args(["info", "--os", "macos"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("macos"));
}

#[test]
fn test_missing_manifest_fails() {
    let temp = TempDir::new().unwrap();

    relstage(temp.path())
        .args(["stage", "--manifest", "nope.toml", "--os", "windows"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope.toml"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("relstage.toml"), "[unknown]\nkey = 1\n").unwrap();

    relstage(temp.path()).arg("info").assert().failure();
}
