use predicates::prelude::*;
use std::fs;
use std::path::Path;
use assert_cmd::Command;
use tempfile::TempDir;

fn lua_cmd() -> Command {
    Command::cargo_bin("lua-rs").unwrap()
}

fn write_script(dir: &TempDir, name: &str, source: &str) -> std::path::PathBuf {
    let file = dir.path().join(name);
    fs::write(&file, source).unwrap();
    file
}

#[test]
fn runs_a_script() {
    let dir = TempDir::new().unwrap();
    let file = write_script(&dir, "sum.lua", "local x = 2\nlocal y = 3\nprint(x+y)\n");

    lua_cmd()
        .arg(&file)
        .assert()
        .success()
        .stdout("5\n")
        .stderr("");
}

#[test]
fn feeds_stdin_to_read() {
    let dir = TempDir::new().unwrap();
    let file = write_script(&dir, "double.lua", "print(read() * 2)\n");

    lua_cmd()
        .arg(&file)
        .write_stdin("21\n")
        .assert()
        .success()
        .stdout("42\n");
}

#[test]
fn runtime_error_exits_with_one_and_no_output() {
    let dir = TempDir::new().unwrap();
    let file = write_script(&dir, "div.lua", "print(1/0)\n");

    lua_cmd()
        .arg(&file)
        .assert()
        .code(1)
        .stdout("")
        .stderr(predicate::str::starts_with("ERROR: "))
        .stderr(predicate::str::contains("Division by zero"));
}

#[test]
fn missing_argument_is_an_error() {
    lua_cmd()
        .assert()
        .code(1)
        .stderr(predicate::str::starts_with("ERROR: "));
}

#[test]
fn missing_file_is_an_error() {
    lua_cmd()
        .arg("does-not-exist.lua")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("does-not-exist.lua"));
}

#[test]
fn help_is_not_an_error() {
    lua_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--compile"));
}

#[test]
fn dump_ast_prints_the_tree_without_running() {
    let dir = TempDir::new().unwrap();
    let file = write_script(&dir, "tree.lua", "print(1 / 0)\n");

    lua_cmd()
        .arg("--dump-ast")
        .arg(&file)
        .assert()
        .success()
        .stdout("(block (print (/ 1 0)))\n");
}

#[test]
fn compile_writes_asm_next_to_the_source() {
    let dir = TempDir::new().unwrap();
    let file = write_script(&dir, "loop.lua", "local i = 0\nwhile i < 3 do\nprint(i)\ni = i + 1\nend\n");

    lua_cmd()
        .arg("--compile")
        .arg(&file)
        .assert()
        .success()
        .stdout("");

    let asm = fs::read_to_string(dir.path().join("loop.asm")).unwrap();
    assert!(asm.contains("while_1:"));
}

#[test]
fn compile_honours_the_output_flag() {
    let dir = TempDir::new().unwrap();
    let file = write_script(&dir, "one.lua", "print(1)\n");
    let out = dir.path().join("custom.s");

    lua_cmd()
        .args(["--compile", "-o"])
        .arg(&out)
        .arg(&file)
        .assert()
        .success();

    assert!(Path::new(&out).exists());
}

#[test]
fn compile_errors_use_the_same_report() {
    let dir = TempDir::new().unwrap();
    let file = write_script(&dir, "str.lua", "print(\"hi\")\n");

    lua_cmd()
        .arg("-c")
        .arg(&file)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Compile error"));
}
