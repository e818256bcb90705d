mod common;

use classpatch::classfile::opcodes::{ICONST_0, ICONST_1, IRETURN};
use classpatch::consts::*;
use classpatch::{transform_event_class, transform_event_classes, Config, Error};
use common::*;

const LISTENER_LIST: &str = "()Lnet/minecraftforge/eventbus/ListenerList;";

fn legacy_accessors() -> Vec<(&'static str, &'static str)> {
    vec![("getListenerList", LISTENER_LIST), ("getParentListenerList", LISTENER_LIST)]
}

#[test]
fn test_unmarked_class_is_byte_identical() {
    init_logging();
    let input = event_class("com/example/PlainEvent", &[], &[("fire", "()V"), ("getCount", "()I")]);
    let output = transform_event_class(&input, &Config::default()).unwrap();
    assert_eq!(output, input);
}

#[test]
fn test_other_annotations_survive() {
    let input = event_class("com/example/DocumentedEvent", &["Ljava/lang/Deprecated;"], &[]);
    let output = transform_event_class(&input, &Config::default()).unwrap();
    assert_eq!(output, input);
    assert_eq!(class_annotations(&output, true), vec!["Ljava/lang/Deprecated;"]);
}

#[test]
fn test_legacy_accessors_are_stripped() {
    init_logging();
    let mut methods = legacy_accessors();
    methods.push(("fire", "()V"));
    let input = event_class("com/example/LegacyEvent", &[], &methods);
    let output = transform_event_class(&input, &Config::default()).unwrap();
    assert_eq!(method_names(&output), vec!["<init>()V", "fire()V"]);
}

#[test]
fn test_accessor_with_other_descriptor_is_kept() {
    let input = event_class("com/example/OverloadEvent", &[], &[("getListenerList", "()Ljava/lang/Object;")]);
    let output = transform_event_class(&input, &Config::default()).unwrap();
    assert_eq!(output, input);
}

#[test]
fn test_example_event_scenario() {
    init_logging();
    let input = event_class("com/example/ExampleEvent", &[CANCELABLE_DESCRIPTOR], &legacy_accessors());
    let output = transform_event_class(&input, &Config::default()).unwrap();

    assert_eq!(method_names(&output), vec!["<init>()V", "isCancelable()Z"]);
    assert_eq!(method_code(&output, "isCancelable", "()Z"), vec![ICONST_1, IRETURN]);
    assert_eq!(method_annotations(&output, "isCancelable", "()Z", true), vec![OVERRIDE_DESCRIPTOR]);
    assert!(class_annotations(&output, true).is_empty());
}

#[test]
fn test_explicit_method_is_not_duplicated() {
    let input = event_class("com/example/ManualEvent", &[CANCELABLE_DESCRIPTOR], &[("isCancelable", "()Z")]);
    let output = transform_event_class(&input, &Config::default()).unwrap();

    assert_eq!(method_names(&output), vec!["<init>()V", "isCancelable()Z"]);
    // The explicit body is forwarded untouched
    assert_eq!(method_code(&output, "isCancelable", "()Z"), vec![ICONST_0, IRETURN]);
    assert!(method_annotations(&output, "isCancelable", "()Z", true).is_empty());
    assert!(class_annotations(&output, true).is_empty());
}

#[test]
fn test_both_markers_synthesize_in_order() {
    let input = event_class(
        "com/example/ResultEvent",
        &[HAS_RESULT_DESCRIPTOR, "Ljava/lang/Deprecated;", CANCELABLE_DESCRIPTOR],
        &[("fire", "()V")],
    );
    let output = transform_event_class(&input, &Config::default()).unwrap();

    assert_eq!(method_names(&output), vec!["<init>()V", "fire()V", "isCancelable()Z", "hasResult()Z"]);
    assert_eq!(class_annotations(&output, true), vec!["Ljava/lang/Deprecated;"]);
    assert_eq!(method_code(&output, "hasResult", "()Z"), vec![ICONST_1, IRETURN]);
}

#[test]
fn test_has_result_with_explicit_method_only_adds_cancelable() {
    let input = event_class(
        "com/example/MixedEvent",
        &[CANCELABLE_DESCRIPTOR, HAS_RESULT_DESCRIPTOR],
        &[("hasResult", "()Z")],
    );
    let output = transform_event_class(&input, &Config::default()).unwrap();
    assert_eq!(method_names(&output), vec!["<init>()V", "hasResult()Z", "isCancelable()Z"]);
}

#[test]
fn test_transformation_is_idempotent() {
    let input = event_class(
        "com/example/TwiceEvent",
        &[CANCELABLE_DESCRIPTOR, HAS_RESULT_DESCRIPTOR],
        &legacy_accessors(),
    );
    let config = Config::default();
    let once = transform_event_class(&input, &config).unwrap();
    let twice = transform_event_class(&once, &config).unwrap();
    assert_eq!(twice, once);
}

#[test]
fn test_malformed_input_fails() {
    let config = Config::default();
    assert!(matches!(transform_event_class(&[0xCA, 0xFE, 0xBA, 0xBF], &config), Err(Error::ClassFormat(_))));

    let input = event_class("com/example/CutEvent", &[], &[]);
    let truncated = &input[..input.len() - 3];
    assert!(matches!(transform_event_class(truncated, &config), Err(Error::ClassFormat(_))));
}

#[test]
fn test_batch_isolates_failures() {
    let good = event_class("com/example/GoodEvent", &[CANCELABLE_DESCRIPTOR], &[]);
    let results = transform_event_classes(
        vec![
            ("GoodEvent".to_string(), good),
            ("Broken".to_string(), vec![0, 1, 2, 3]),
            ("Plain".to_string(), event_class("com/example/Plain", &[], &[])),
        ],
        &Config::default(),
    );
    let names: Vec<_> = results.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["GoodEvent", "Broken", "Plain"]);
    assert!(results[0].1.is_ok());
    assert!(results[1].1.is_err());
    assert!(results[2].1.is_ok());
    assert_eq!(method_names(results[0].1.as_ref().unwrap()), vec!["<init>()V", "isCancelable()Z"]);
}
