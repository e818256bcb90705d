mod common;

use std::fs;
use std::path::PathBuf;

use classpatch::consts::CANCELABLE_DESCRIPTOR;
use classpatch::{transform_class_file, transform_directory, Config, Error};
use common::*;
use tempfile::TempDir;

#[test]
fn test_transform_directory_mirrors_layout() {
    init_logging();
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();

    let nested = input.path().join("com/example");
    fs::create_dir_all(&nested).unwrap();
    fs::write(nested.join("FooEvent.class"), event_class("com/example/FooEvent", &[CANCELABLE_DESCRIPTOR], &[])).unwrap();
    fs::write(input.path().join("Plain.class"), event_class("Plain", &[], &[])).unwrap();
    fs::write(input.path().join("README.txt"), "not a class").unwrap();

    let results = transform_directory(input.path(), output.path(), &Config::default()).unwrap();
    let mut paths: Vec<PathBuf> = results.iter().map(|(path, _)| path.clone()).collect();
    paths.sort();
    assert_eq!(paths, vec![PathBuf::from("Plain.class"), PathBuf::from("com/example/FooEvent.class")]);
    assert!(results.iter().all(|(_, result)| result.is_ok()));

    let foo = fs::read(output.path().join("com/example/FooEvent.class")).unwrap();
    assert_eq!(method_names(&foo), vec!["<init>()V", "isCancelable()Z"]);
    assert!(!output.path().join("README.txt").exists());
}

#[test]
fn test_directory_failures_are_per_file() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    fs::write(input.path().join("Broken.class"), [0xCA, 0xFE]).unwrap();
    fs::write(input.path().join("Good.class"), event_class("Good", &[], &[])).unwrap();

    let results = transform_directory(input.path(), output.path(), &Config::default()).unwrap();
    assert_eq!(results.len(), 2);
    let failed: Vec<_> = results.iter().filter(|(_, r)| r.is_err()).map(|(p, _)| p.clone()).collect();
    assert_eq!(failed, vec![PathBuf::from("Broken.class")]);
    assert!(output.path().join("Good.class").exists());
}

#[test]
fn test_transform_single_file_in_place() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("Event.class");
    let input = event_class(
        "Event",
        &[],
        &[("getListenerList", "()Lnet/minecraftforge/eventbus/ListenerList;")],
    );
    fs::write(&path, &input).unwrap();

    transform_class_file(&path, &path, &Config::default()).unwrap();
    assert_eq!(method_names(&fs::read(&path).unwrap()), vec!["<init>()V"]);
}

#[test]
fn test_missing_file_is_an_io_error() {
    let dir = TempDir::new().unwrap();
    let result = transform_class_file(&dir.path().join("Missing.class"), &dir.path().join("Out.class"), &Config::default());
    assert!(matches!(result, Err(Error::Io(_))));
}
