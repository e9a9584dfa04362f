use std::{
    fs,
    path::Path,
    process::{Command, Output, Stdio},
};
use tempfile::tempdir;

fn bin_path() -> &'static str {
    env!("CARGO_BIN_EXE_rustpath")
}

fn run(dir: &Path, args: &[&str]) -> Output {
    Command::new(bin_path())
        .current_dir(dir)
        .args(args)
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1")
        .stdin(Stdio::null())
        .output()
        .expect("failed to run rustpath")
}

#[test]
fn check_fails_on_wrong_argument_counts() {
    let dir = tempdir().expect("tempdir");
    fs::write(
        dir.path().join("lib.rs"),
        "struct Pair<A, B>(A, B);\nfn f(_: Pair<u8>) {}\n",
    )
    .expect("source");

    let output = run(dir.path(), &["check", "lib.rs"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Wrong number of type arguments: expected 2, found 1"),
        "missing diagnostic:\n{stderr}"
    );
}

#[test]
fn check_passes_clean_crates_and_honours_lint_toggles() {
    let dir = tempdir().expect("tempdir");
    fs::write(
        dir.path().join("lib.rs"),
        "mod shapes {\n    pub struct Circle;\n}\nuse shapes::Circle;\nfn f(_: shapes::Circle) {}\n",
    )
    .expect("source");

    let output = run(dir.path(), &["check", "lib.rs"]);
    assert!(!output.status.success(), "qualification lint should fire");

    fs::write(
        dir.path().join("rustpath.toml"),
        "[lints]\nunnecessary-qualifications = false\n",
    )
    .expect("config");
    let output = run(dir.path(), &["check", "lib.rs"]);
    assert!(
        output.status.success(),
        "check failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(String::from_utf8_lossy(&output.stdout).contains("no diagnostics"));
}

#[test]
fn render_prints_imports_before_the_type() {
    let dir = tempdir().expect("tempdir");
    fs::write(
        dir.path().join("lib.rs"),
        "mod shapes {\n    pub struct Circle;\n    pub type Round = Circle;\n}\nmod draw {}\n",
    )
    .expect("source");

    let output = run(
        dir.path(),
        &["render", "lib.rs", "--ty", "&'a shapes::Round", "--into", "draw", "--expand", "--no-lifetimes"],
    );
    assert!(
        output.status.success(),
        "render failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines, vec!["use crate::shapes::Circle;", "&Circle"]);
}

#[test]
fn lookup_reads_the_configured_index() {
    let dir = tempdir().expect("tempdir");
    fs::write(
        dir.path().join("index.toml"),
        "[[crate]]\nname = \"serde\"\nversions = [{ version = \"1.0.1\" }, { version = \"1.0.2\", features = [\"derive\"] }]\n",
    )
    .expect("index");
    fs::write(dir.path().join("rustpath.toml"), "[registry]\nindex = \"index.toml\"\n").expect("config");

    let output = run(dir.path(), &["lookup", "serde", "^1"]);
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "serde 1.0.2 [derive]");

    let output = run(dir.path(), &["lookup", "serde", "^2"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("No version found matching ^2"));
}
