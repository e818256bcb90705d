mod common;

use std::sync::{Mutex, Once};

use classpatch::{transform_event_class, Bus, Config, RegistrarClassBuilder, SubscriberAnnotation, SubscriberMetadata};
use common::event_class;
use log::{Level, LevelFilter, Log, Metadata, Record};

/// Records every warning emitted while this test binary runs.
struct CapturingLogger {
    warnings: Mutex<Vec<String>>,
}

impl Log for CapturingLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Warn
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            self.warnings.lock().unwrap().push(record.args().to_string());
        }
    }

    fn flush(&self) {}
}

static LOGGER: CapturingLogger = CapturingLogger { warnings: Mutex::new(Vec::new()) };
static INIT: Once = Once::new();

/// Warnings logged so far that mention `needle`.
fn warnings_mentioning(needle: &str) -> Vec<String> {
    INIT.call_once(|| {
        log::set_logger(&LOGGER).unwrap();
        log::set_max_level(LevelFilter::Warn);
    });
    LOGGER.warnings.lock().unwrap().iter().filter(|w| w.contains(needle)).cloned().collect()
}

#[test]
fn test_stripping_listener_list_is_reported() {
    warnings_mentioning("");
    let class = "com/example/StrippedEvent";
    let input = event_class(class, &[], &[("getListenerList", "()Lnet/minecraftforge/eventbus/ListenerList;")]);
    transform_event_class(&input, &Config::default()).unwrap();

    assert_eq!(
        warnings_mentioning(class),
        vec![format!("Stripping getListenerList from {} (an assumed Event class)", class)]
    );
}

#[test]
fn test_sided_registration_is_reported() {
    warnings_mentioning("");
    let handler = "com/example/SidedHandler";
    let annotation = SubscriberAnnotation::new(Bus::Forge).client_only().with_target_mod_id("examplemod");
    RegistrarClassBuilder::new("com/example/SidedRegistrars")
        .subscriber(None, SubscriberMetadata::new(handler), Some(annotation.clone()))
        .build(&Config::default())
        .unwrap();

    assert_eq!(
        warnings_mentioning(handler),
        vec![format!(
            "Sided @EventBusSubscriber annotations are still in progress, applying {} from {} : examplemod",
            annotation, handler
        )]
    );
}

#[test]
fn test_unsided_registration_is_quiet() {
    warnings_mentioning("");
    let handler = "com/example/QuietHandler";
    RegistrarClassBuilder::new("com/example/QuietRegistrars")
        .subscriber(None, SubscriberMetadata::new(handler), Some(SubscriberAnnotation::new(Bus::Mod)))
        .build(&Config::default())
        .unwrap();

    assert!(warnings_mentioning(handler).is_empty());
}
