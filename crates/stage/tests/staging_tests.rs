//! End-to-end staging tests against a scratch dependency tree

use relstage_core::{DependencySpec, Error, OsTag, PatternTable, Result, TargetLayout};
use relstage_stage::{SearchPathEditor, Stager};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const RECORD: &str = "\nRPATH=";

/// Stands in for patchelf: rewrites a trailing `RPATH=` record in each file.
#[derive(Default)]
struct FakeElfEditor {
    calls: Mutex<Vec<(String, Vec<PathBuf>)>>,
}

impl FakeElfEditor {
    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl SearchPathEditor for FakeElfEditor {
    fn set_search_path(&self, search_path: &str, files: &[PathBuf]) -> Result<()> {
        assert!(!files.is_empty(), "editor invoked with no files");
        for file in files {
            let content = fs::read_to_string(file).unwrap();
            let body = content.split(RECORD).next().unwrap_or_default();
            fs::write(file, format!("{body}{RECORD}{search_path}")).unwrap();
        }
        self.calls
            .lock()
            .unwrap()
            .push((search_path.to_string(), files.to_vec()));
        Ok(())
    }

    fn name(&self) -> &'static str {
        "fake-elf"
    }
}

fn search_path_of(file: &Path) -> Option<String> {
    let content = fs::read_to_string(file).unwrap();
    content.split(RECORD).nth(1).map(str::to_string)
}

fn touch(dir: &Path, names: &[&str]) {
    fs::create_dir_all(dir).unwrap();
    for name in names {
        fs::write(dir.join(name), format!("contents of {name}")).unwrap();
    }
}

fn listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<_> = match fs::read_dir(dir) {
        Ok(entries) => entries
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    };
    names.sort();
    names
}

fn snapshot(dir: &Path) -> BTreeMap<String, Vec<u8>> {
    listing(dir)
        .into_iter()
        .map(|name| {
            let bytes = fs::read(dir.join(&name)).unwrap();
            (name, bytes)
        })
        .collect()
}

struct Fixture {
    temp: TempDir,
    layout: TargetLayout,
}

impl Fixture {
    fn new(os: OsTag) -> Self {
        let temp = TempDir::new().unwrap();
        let layout = TargetLayout::for_build(&temp.path().join("build"), "Release", &os.rule());
        Self { temp, layout }
    }

    fn dir(&self, relative: &str) -> PathBuf {
        self.temp.path().join(relative)
    }
}

fn linux_stager(libraries: PatternTable, editor: &Arc<FakeElfEditor>) -> Stager {
    Stager::new(
        OsTag::Linux.rule(),
        libraries,
        PatternTable::new(),
        editor.clone(),
    )
}

#[test]
fn test_static_dependencies_contribute_nothing() {
    let fx = Fixture::new(OsTag::Linux);
    touch(&fx.dir("zlib/lib"), &["libz.so.1"]);
    touch(&fx.dir("zlib/bin"), &["zpipe"]);

    let editor = Arc::new(FakeElfEditor::default());
    let stager = linux_stager(PatternTable::new(), &editor);
    let deps = vec![
        DependencySpec::new("zlib", false)
            .with_lib_dir(fx.dir("zlib/lib"))
            .with_bin_dir(fx.dir("zlib/bin"))
            .with_helper_executables(true),
    ];

    stager.stage(&deps, &fx.layout).unwrap();

    assert!(listing(&fx.layout.library_dir).is_empty());
    assert!(listing(&fx.layout.executable_dir).is_empty());
    assert_eq!(editor.call_count(), 0);
}

#[test]
fn test_staging_twice_is_byte_identical() {
    let fx = Fixture::new(OsTag::Linux);
    touch(&fx.dir("fmt/lib"), &["libfmt.so.10", "libfmt.so.10.1.0"]);
    touch(&fx.dir("proxy/bin"), &["proxyfmu"]);
    touch(&fx.dir("proxy/lib"), &["libproxy.so"]);

    let editor = Arc::new(FakeElfEditor::default());
    let stager = linux_stager(PatternTable::new(), &editor);
    let deps = vec![
        DependencySpec::new("fmt", true).with_lib_dir(fx.dir("fmt/lib")),
        DependencySpec::new("proxyfmu", true)
            .with_lib_dir(fx.dir("proxy/lib"))
            .with_bin_dir(fx.dir("proxy/bin"))
            .with_helper_executables(true),
    ];

    let first_report = stager.stage(&deps, &fx.layout).unwrap();
    let first_libs = snapshot(&fx.layout.library_dir);
    let first_bins = snapshot(&fx.layout.executable_dir);

    let second_report = stager.stage(&deps, &fx.layout).unwrap();

    assert_eq!(first_report, second_report);
    assert_eq!(snapshot(&fx.layout.library_dir), first_libs);
    assert_eq!(snapshot(&fx.layout.executable_dir), first_bins);
    assert_eq!(first_libs.len(), 3);
}

#[test]
fn test_posix_search_paths_after_patching() {
    let fx = Fixture::new(OsTag::Linux);
    touch(&fx.dir("libcosim/lib"), &["libcosim.so", "libcosim.so.0"]);
    touch(&fx.dir("proxyfmu/lib"), &["libproxyfmu-client.so"]);
    touch(&fx.dir("proxyfmu/bin"), &["proxyfmu", "proxyfmu-helper"]);

    let editor = Arc::new(FakeElfEditor::default());
    let stager = linux_stager(PatternTable::new(), &editor);
    let deps = vec![
        DependencySpec::new("libcosim", true).with_lib_dir(fx.dir("libcosim/lib")),
        DependencySpec::new("proxyfmu", true)
            .with_lib_dir(fx.dir("proxyfmu/lib"))
            .with_bin_dir(fx.dir("proxyfmu/bin"))
            .with_helper_executables(true),
    ];

    let report = stager.stage(&deps, &fx.layout).unwrap();
    assert_eq!(report.library_count(), 3);
    assert_eq!(report.executable_count(), 2);

    for name in listing(&fx.layout.library_dir) {
        assert_eq!(
            search_path_of(&fx.layout.library_dir.join(&name)).as_deref(),
            Some("$ORIGIN"),
            "{name}"
        );
    }
    for name in listing(&fx.layout.executable_dir) {
        assert_eq!(
            search_path_of(&fx.layout.executable_dir.join(&name)).as_deref(),
            Some("$ORIGIN/../lib"),
            "{name}"
        );
    }
}

#[test]
fn test_windows_never_patches() {
    let fx = Fixture::new(OsTag::Windows);
    touch(&fx.dir("boost/bin"), &["boost_system-vc143-mt-x64-1_83.dll"]);
    touch(&fx.dir("proxyfmu/bin"), &["proxyfmu.exe", "proxyfmu-client.dll"]);

    let editor = Arc::new(FakeElfEditor::default());
    let stager = Stager::new(
        OsTag::Windows.rule(),
        PatternTable::builtin(),
        PatternTable::new(),
        editor.clone(),
    );
    let deps = vec![
        DependencySpec::new("boost", true).with_bin_dir(fx.dir("boost/bin")),
        DependencySpec::new("proxyfmu", true)
            .with_bin_dir(fx.dir("proxyfmu/bin"))
            .with_helper_executables(true),
    ];

    let report = stager.stage(&deps, &fx.layout).unwrap();

    assert_eq!(editor.call_count(), 0);
    assert_eq!(fx.layout.library_dir, fx.layout.executable_dir);
    assert_eq!(
        listing(&fx.layout.executable_dir),
        vec![
            "boost_system-vc143-mt-x64-1_83.dll",
            "proxyfmu-client.dll",
            "proxyfmu.exe",
        ]
    );
    assert_eq!(report.executable_count(), 1);
}

#[test]
fn test_pattern_override_selects_subset() {
    let fx = Fixture::new(OsTag::Linux);
    touch(&fx.dir("umbrella/lib"), &["libfoo1.so", "libbar2.so", "libbaz3.so"]);

    let editor = Arc::new(FakeElfEditor::default());
    let table = PatternTable::from_entries([("umbrella", vec!["foo*", "bar*"])]).unwrap();
    let stager = linux_stager(table, &editor);
    let deps = vec![DependencySpec::new("umbrella", true).with_lib_dir(fx.dir("umbrella/lib"))];

    let report = stager.stage(&deps, &fx.layout).unwrap();

    assert_eq!(
        listing(&fx.layout.library_dir),
        vec!["libbar2.so", "libfoo1.so"]
    );
    let staged: Vec<_> = report.get("umbrella").unwrap().libraries.file_names().collect();
    assert_eq!(staged, vec!["libfoo1.so", "libbar2.so"]);
}

#[test]
fn test_pattern_override_selects_subset_on_windows() {
    let fx = Fixture::new(OsTag::Windows);
    touch(&fx.dir("umbrella/bin"), &["foo1.dll", "bar2.dll", "baz3.dll"]);

    let table = PatternTable::from_entries([("umbrella", vec!["foo*", "bar*"])]).unwrap();
    let stager = Stager::new(
        OsTag::Windows.rule(),
        table,
        PatternTable::new(),
        Arc::new(FakeElfEditor::default()),
    );
    let deps = vec![DependencySpec::new("umbrella", true).with_bin_dir(fx.dir("umbrella/bin"))];

    stager.stage(&deps, &fx.layout).unwrap();

    assert_eq!(
        listing(&fx.layout.executable_dir),
        vec!["bar2.dll", "foo1.dll"]
    );
}

#[test]
fn test_default_wildcard_stages_all_shared_libraries() {
    let fx = Fixture::new(OsTag::Linux);
    touch(
        &fx.dir("thrift-ish/lib"),
        &[
            "libalpha.so",
            "libalpha.so.1",
            "libbeta.so.2.0.1",
            "libgamma.a",
            "alpha.pc",
            "README",
        ],
    );

    let editor = Arc::new(FakeElfEditor::default());
    let stager = linux_stager(PatternTable::builtin(), &editor);
    let deps = vec![DependencySpec::new("thrift-ish", true).with_lib_dir(fx.dir("thrift-ish/lib"))];

    stager.stage(&deps, &fx.layout).unwrap();

    assert_eq!(
        listing(&fx.layout.library_dir),
        vec!["libalpha.so", "libalpha.so.1", "libbeta.so.2.0.1"]
    );
    assert_eq!(editor.call_count(), 1);
}

#[test]
fn test_disabled_helpers_contribute_no_executables() {
    let fx = Fixture::new(OsTag::Linux);
    touch(&fx.dir("tool/bin"), &["tool-a", "tool-b"]);
    touch(&fx.dir("tool/lib"), &["libtool.so"]);

    let editor = Arc::new(FakeElfEditor::default());
    let stager = linux_stager(PatternTable::new(), &editor);
    let deps = vec![
        DependencySpec::new("tool", true)
            .with_lib_dir(fx.dir("tool/lib"))
            .with_bin_dir(fx.dir("tool/bin"))
            .with_helper_executables(false),
    ];

    let report = stager.stage(&deps, &fx.layout).unwrap();

    assert!(listing(&fx.layout.executable_dir).is_empty());
    assert_eq!(report.executable_count(), 0);
    assert_eq!(listing(&fx.layout.library_dir), vec!["libtool.so"]);
}

#[test]
fn test_helper_pattern_override() {
    let fx = Fixture::new(OsTag::Linux);
    touch(&fx.dir("proxyfmu/bin"), &["proxyfmu", "unrelated-tool"]);

    let editor = Arc::new(FakeElfEditor::default());
    let stager = Stager::new(
        OsTag::Linux.rule(),
        PatternTable::new(),
        PatternTable::from_entries([("proxyfmu", vec!["proxyfmu*"])]).unwrap(),
        editor.clone(),
    );
    let deps = vec![
        DependencySpec::new("proxyfmu", true)
            .with_bin_dir(fx.dir("proxyfmu/bin"))
            .with_helper_executables(true),
    ];

    stager.stage(&deps, &fx.layout).unwrap();

    assert_eq!(listing(&fx.layout.executable_dir), vec!["proxyfmu"]);
    // no libraries were found, so only the executables were patched
    let calls = editor.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "$ORIGIN/../lib");
}

#[test]
fn test_many_dependencies_in_parallel() {
    let fx = Fixture::new(OsTag::Linux);
    let mut deps = Vec::new();
    for i in 0..32 {
        let dir = fx.dir(&format!("dep{i}/lib"));
        touch(&dir, &[format!("libdep{i}.so").as_str()]);
        deps.push(DependencySpec::new(format!("dep{i}"), true).with_lib_dir(dir));
    }

    let editor = Arc::new(FakeElfEditor::default());
    let stager = linux_stager(PatternTable::new(), &editor);
    let report = stager.stage(&deps, &fx.layout).unwrap();

    assert_eq!(report.library_count(), 32);
    assert_eq!(listing(&fx.layout.library_dir).len(), 32);
    assert_eq!(editor.call_count(), 32);
}

#[test]
fn test_failed_copy_aborts_the_pass() {
    let fx = Fixture::new(OsTag::Linux);
    touch(&fx.dir("fmt/lib"), &["libfmt.so.10"]);
    touch(&fx.dir("zlib/lib"), &["libz.so.1"]);
    // a directory squatting on the destination name makes the final rename fail
    let blocked = fx.layout.library_dir.join("libfmt.so.10");
    fs::create_dir_all(blocked.join("occupied")).unwrap();

    let editor = Arc::new(FakeElfEditor::default());
    let stager = linux_stager(PatternTable::new(), &editor);
    let deps = vec![
        DependencySpec::new("fmt", true).with_lib_dir(fx.dir("fmt/lib")),
        DependencySpec::new("zlib", true).with_lib_dir(fx.dir("zlib/lib")),
    ];

    let err = stager.stage(&deps, &fx.layout).unwrap_err();

    match err {
        Error::Dependency { dependency, source } => {
            assert_eq!(dependency, "fmt");
            match *source {
                Error::Io { path, .. } => {
                    assert_eq!(path.as_deref(), Some(blocked.as_path()));
                }
                other => panic!("expected an I/O error, got {other}"),
            }
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(blocked.is_dir());
    // the failed dependency was never handed to the editor
    let calls = editor.calls.lock().unwrap();
    assert!(calls.iter().all(|(_, files)| !files.contains(&blocked)));
}
