use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn project(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().expect("temp dir");
    for (name, code) in files {
        let path = dir.path().join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, code).unwrap();
    }
    dir
}

fn yardstick(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("yardstick").expect("cargo bin yardstick");
    cmd.current_dir(dir.path());
    cmd
}

const DOCUMENTED: &str = "class Foo\n  # @param name [String]\n  # @return [String]\n  def greet(name)\n    name\n  end\nend\n";

#[test]
fn clean_projects_exit_successfully() {
    let dir = project(&[("lib/foo.rb", DOCUMENTED)]);
    yardstick(&dir)
        .args(["typecheck", "."])
        .assert()
        .success()
        .stdout(predicate::str::contains("No problems found in 1 files."));
}

#[test]
fn reports_problems_and_fails() {
    let dir = project(&[("lib/foo.rb", "class Foo\n  def bar(baz); end\nend\n")]);
    yardstick(&dir)
        .args(["typecheck", "lib"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("`Foo#bar` has undefined @return type"))
        .stdout(predicate::str::contains("`Foo#bar` has undefined @param type for baz"))
        .stdout(predicate::str::contains("2 problems found in 1 files."));
}

#[test]
fn strict_level_checks_inferred_types() {
    let code = "class Foo\n  # @return [Array]\n  def bar\n    'bar'\n  end\nend\n";
    let dir = project(&[("foo.rb", code)]);
    yardstick(&dir).args(["typecheck"]).assert().success();
    yardstick(&dir)
        .args(["typecheck", "--level", "strict"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("does not match inferred type `String`"));
}

#[test]
fn reads_the_config_file() {
    let code = "class Foo\n  # @return [Array]\n  def bar\n    'bar'\n  end\nend\n";
    let dir = project(&[
        ("foo.rb", code),
        ("vendor/gem.rb", "def untagged; end\n"),
        ("yardstick.toml", "level = \"strict\"\nexclude = [\"vendor/**\"]\n"),
    ]);
    yardstick(&dir)
        .args(["typecheck"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("1 problems found in 1 files."));
}

#[test]
fn prints_json() {
    let dir = project(&[("foo.rb", "class Foo\n  def bar; end\nend\n")]);
    let output = yardstick(&dir)
        .args(["typecheck", "--format", "json"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let problems: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(problems.as_array().unwrap().len(), 1);
    assert_eq!(problems[0]["severity"], "warning");
    assert_eq!(problems[0]["message"], "`Foo#bar` has undefined @return type");
}

#[test]
fn checks_across_files() {
    let dir = project(&[
        ("sup.rb", "class Sup\n  # @param arg [String]\n  # @return [void]\n  def meth(arg); end\nend\n"),
        ("sub.rb", "class Sub < Sup\n  def meth(arg); end\nend\n"),
    ]);
    yardstick(&dir)
        .args(["typecheck", "--threads", "2"])
        .assert()
        .success();
}

#[test]
fn rejects_invalid_config() {
    let dir = project(&[("foo.rb", DOCUMENTED), ("yardstick.toml", "level = \"loose\"\n")]);
    yardstick(&dir)
        .args(["typecheck"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid config file"));
}

#[test]
fn rejects_missing_paths() {
    let dir = project(&[]);
    yardstick(&dir)
        .args(["typecheck", "missing"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("no such file or directory"));
}

#[test]
fn probes_signatures() {
    let dir = project(&[(
        "foo.rb",
        "class Foo\n  # @return [Array<String>]\n  def names; end\nend\nfoo = Foo.new\n",
    )]);
    yardstick(&dir)
        .args(["probe", "foo.rb", "foo.names.first"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("String\n"));
    yardstick(&dir)
        .args(["probe", "foo.rb", "foo.missing"])
        .assert()
        .success()
        .stdout(predicate::str::contains("undefined (unresolved `missing`)"));
}
