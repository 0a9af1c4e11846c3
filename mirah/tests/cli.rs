use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn mirah(args: &[&str], dir: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_mirah"))
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("run mirah")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn write_file(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent directories");
    }
    fs::write(path, contents).expect("write source file");
}

#[test]
fn test_inline_script_runs() {
    let dir = tempfile::tempdir().unwrap();
    let output = mirah(&["run", "-e", "puts 6 * 7"], dir.path());

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "42\n");
}

#[test]
fn test_syntax_error_is_labelled_with_unit_name() {
    let dir = tempfile::tempdir().unwrap();
    let output = mirah(&["run", "-e", "puts )"], dir.path());

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("DashE:1:"), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "");
}

#[test]
fn test_compile_writes_payloads_under_destination() {
    let dir = tempfile::tempdir().unwrap();
    write_file(
        &dir.path().join("src/greeter.mirah"),
        "package demo.app\nclass Greeter\n  def self.greet(name: String): String\n    \"Hello, \" + name\n  end\nend\n",
    );

    let output = mirah(&["compile", "-d", "out", "src"], dir.path());
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(dir.path().join("out/demo/app/Greeter.mbc").is_file());
    assert!(dir.path().join("out/demo/app/Greeter.mbc").metadata().unwrap().len() > 0);
}

#[test]
fn test_listing_backend_writes_text() {
    let dir = tempfile::tempdir().unwrap();
    let output = mirah(&["compile", "-b", "listing", "-e", "puts 1"], dir.path());

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let listing = fs::read_to_string(dir.path().join("DashE.masm")).unwrap();
    assert!(listing.starts_with("class DashE (target v4)"));
}

#[test]
fn test_listing_backend_cannot_run() {
    let dir = tempfile::tempdir().unwrap();
    let output = mirah(&["run", "-b", "listing", "-e", "puts 1"], dir.path());
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_run_passes_trailing_arguments() {
    let dir = tempfile::tempdir().unwrap();
    let output = mirah(
        &["run", "-e", "puts args.length\nputs args[1]", "--", "a", "b"],
        dir.path(),
    );

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "2\nb\n");
}

#[test]
fn test_compiled_classes_are_found_on_the_classpath() {
    let dir = tempfile::tempdir().unwrap();
    write_file(
        &dir.path().join("lib/util.mirah"),
        "class Util\n  def self.twice(n: int): int\n    n * 2\n  end\nend\n",
    );

    let output = mirah(&["compile", "-d", "classes", "lib"], dir.path());
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let output = mirah(&["run", "-c", "classes", "-e", "puts Util.twice(21)"], dir.path());
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "42\n");

    let output = mirah(&["run", "-e", "puts Util.twice(21)"], dir.path());
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Cannot find class Util"));
}

#[test]
fn test_directories_are_expanded_in_name_order() {
    let dir = tempfile::tempdir().unwrap();
    write_file(&dir.path().join("app/b.mirah"), "puts \"b\"\n");
    write_file(&dir.path().join("app/a.mirah"), "puts \"a\"\n");
    write_file(&dir.path().join("app/notes.txt"), "not source");

    let output = mirah(&["run", "app"], dir.path());
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "a\n");
}

#[test]
fn test_change_directory_before_expansion() {
    let dir = tempfile::tempdir().unwrap();
    write_file(&dir.path().join("project/main.mirah"), "puts \"moved\"\n");

    let output = mirah(&["run", "--cd", "project", "main.mirah"], dir.path());
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "moved\n");
}

#[test]
fn test_no_entry_point_still_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    write_file(
        &dir.path().join("lib.mirah"),
        "class Lib\n  def self.one: int\n    1\n  end\nend\n",
    );

    let output = mirah(&["run", "lib.mirah"], dir.path());
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("No main(String[]) method found"));
}

#[test]
fn test_plugins_enable_extension_classes() {
    let dir = tempfile::tempdir().unwrap();
    let output = mirah(&["run", "-p", "math", "-e", "puts Math.max(3, 7)"], dir.path());

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "7\n");
}

#[test]
fn test_unknown_plugin_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = mirah(&["run", "-p", "nope", "-e", "puts 1"], dir.path());
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_raised_failures_exit_with_one() {
    let dir = tempfile::tempdir().unwrap();
    let output = mirah(&["run", "-e", "raise \"boom\""], dir.path());

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("boom"));
}

#[test]
fn test_version_banner_alone_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let output = mirah(&["compile", "-v"], dir.path());

    assert!(output.status.success());
    assert!(stdout(&output).starts_with("Mirah v"));
}

#[test]
fn test_missing_input_is_a_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let output = mirah(&["compile"], dir.path());
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_unknown_flag_exits_with_one() {
    let dir = tempfile::tempdir().unwrap();
    let output = mirah(&["compile", "--no-such-flag"], dir.path());
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_help_exits_with_zero() {
    let dir = tempfile::tempdir().unwrap();
    let output = mirah(&["--help"], dir.path());

    assert!(output.status.success());
    assert!(stdout(&output).contains("compile"));
}

#[test]
fn test_parse_prints_sexpr() {
    let dir = tempfile::tempdir().unwrap();
    write_file(&dir.path().join("hello.mirah"), "puts \"hi\"\n");

    let output = mirah(&["parse", "hello.mirah"], dir.path());
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).starts_with("(unit \"hello.mirah\"\n  (script-class Hello"));
}

#[test]
fn test_missing_return_is_a_type_error() {
    let dir = tempfile::tempdir().unwrap();
    write_file(
        &dir.path().join("k.mirah"),
        "class K\n  def self.f(x: int): int\n    if x > 0\n      return 1\n    end\n  end\nend\n",
    );

    let output = mirah(&["compile", "k.mirah"], dir.path());
    assert_eq!(output.status.code(), Some(1));
    assert!(
        stderr(&output).contains("k.mirah:2: K.f can finish without returning a value of type int"),
        "stderr: {}",
        stderr(&output)
    );
    assert!(!stderr(&output).contains("Internal compiler error"));
    assert!(!dir.path().join("K.mbc").exists());
}
