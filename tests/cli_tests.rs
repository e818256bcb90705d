mod common;

use std::path::Path;
use std::process::Command;

use classpatch::consts::DEFAULT_REGISTRAR_METHOD_NAME;
use common::*;
use tempfile::TempDir;

const HANDLER: &str = "com/example/ExampleHandler";

fn run_registrar(out: &Path, extra: &[&str]) -> Vec<u8> {
    let status = Command::new(env!("CARGO_BIN_EXE_classpatch"))
        .args(["registrar", "--owner", "com/example/Registrars", "--subscriber", HANDLER, "--static"])
        .args(extra)
        .arg("-o")
        .arg(out)
        .status()
        .unwrap();
    assert!(status.success());
    std::fs::read(out).unwrap()
}

fn mnemonics(bytes: &[u8]) -> Vec<&'static str> {
    disassemble_method(bytes, DEFAULT_REGISTRAR_METHOD_NAME, "()V").iter().map(|i| i.mnemonic()).collect()
}

#[test]
fn test_registrar_without_side_flags_registers_on_both_sides() {
    let dir = TempDir::new().unwrap();
    let bytes = run_registrar(&dir.path().join("Both.class"), &["--bus", "mod"]);

    let names = mnemonics(&bytes);
    assert!(!names.contains(&"iload_2"));
    assert!(!names.contains(&"ifeq"));
    assert!(!names.contains(&"ifne"));
    let invoked = invoked_members(&disassemble_method(&bytes, DEFAULT_REGISTRAR_METHOD_NAME, "()V"));
    assert!(invoked.contains(&"net/minecraftforge/eventbus/api/IEventBus.register".to_string()));
}

#[test]
fn test_registrar_client_flag_guards_registration() {
    let dir = TempDir::new().unwrap();
    let bytes = run_registrar(&dir.path().join("Client.class"), &["--bus", "forge", "--client"]);

    let names = mnemonics(&bytes);
    assert_eq!(names.iter().filter(|m| **m == "ifeq").count(), 1);
    assert!(!names.contains(&"ifne"));
}

#[test]
fn test_registrar_server_flag_guards_registration() {
    let dir = TempDir::new().unwrap();
    let bytes = run_registrar(&dir.path().join("Server.class"), &["--bus", "forge", "--server"]);

    let names = mnemonics(&bytes);
    assert_eq!(names.iter().filter(|m| **m == "ifne").count(), 1);
    assert!(!names.contains(&"ifeq"));
}

#[test]
fn test_registrar_side_flag_requires_bus() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("NoBus.class");
    let status = Command::new(env!("CARGO_BIN_EXE_classpatch"))
        .args(["registrar", "--owner", "com/example/Registrars", "--subscriber", HANDLER, "--client", "-o"])
        .arg(&out)
        .status()
        .unwrap();
    assert!(!status.success());
    assert!(!out.exists());
}
