#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Event dispatch through a live registry.

use std::sync::Arc;

use modulio_kernel::config::ModulioConfig;
use modulio_kernel::events::{EventDispatcher, EventKind, ModuleEvent, install_logging_listeners};
use modulio_kernel::registry::{ModuleRegistry, RegistryServices};
use modulio_test_utils::{RecordingEventBus, TestRegistry, assert, test_module};
use parking_lot::Mutex;

fn registry_with(dispatcher: Arc<EventDispatcher>) -> ModuleRegistry {
    let config = ModulioConfig::default();
    let mut services = RegistryServices::in_memory(&config);
    services.events = dispatcher;
    ModuleRegistry::new(config, services)
}

#[test]
fn lifecycle_emits_events_in_order() {
    let registry = TestRegistry::new();
    registry
        .add_module(
            test_module("blog")
                .permission("blog.view")
                .migrations("db/blog")
                .run_migrations(true)
                .rollback_migrations(true),
        )
        .unwrap();
    registry.deregister("blog").unwrap();

    assert_eq!(
        registry.events.kinds(),
        vec![
            EventKind::MigrationsCompleted,
            EventKind::PermissionsCreated,
            EventKind::ModuleRegistered,
            EventKind::MigrationsCompleted,
            EventKind::ModuleDeregistered,
        ]
    );
}

#[test]
fn registered_event_carries_module_and_timestamp() {
    let registry = TestRegistry::new();
    let before = chrono::Utc::now();
    registry.add_module(test_module("blog")).unwrap();

    let events = registry.events.of_kind(EventKind::ModuleRegistered);
    assert_eq!(events.len(), 1);
    let ModuleEvent::Registered(event) = &events[0] else {
        panic!("expected Registered");
    };
    assert_eq!(event.module.name, "blog");
    assert!(event.timestamp >= before);
    assert!(event.context.is_empty());
}

#[test]
fn dispatcher_handlers_see_registry_events() {
    let dispatcher = Arc::new(EventDispatcher::new());
    let seen = Arc::new(Mutex::new(Vec::new()));

    let log = Arc::clone(&seen);
    dispatcher.listen(EventKind::ModuleRegistered, "record", 0, move |event| {
        log.lock().push(format!("+{}", event.module().name));
        Ok(())
    });
    let log = Arc::clone(&seen);
    dispatcher.listen(EventKind::ModuleDeregistered, "record", 0, move |event| {
        log.lock().push(format!("-{}", event.module().name));
        Ok(())
    });

    let registry = registry_with(dispatcher);
    registry.add_module(test_module("blog")).unwrap();
    registry.add_module(test_module("shop")).unwrap();
    registry.deregister("blog").unwrap();

    assert_eq!(*seen.lock(), vec!["+blog", "+shop", "-blog"]);
}

#[test]
fn failing_handler_does_not_abort_registration() {
    let dispatcher = Arc::new(EventDispatcher::new());
    dispatcher.listen(EventKind::ModuleRegistered, "broken", 0, |_| {
        anyhow::bail!("notification service down")
    });
    install_logging_listeners(&dispatcher);

    let registry = registry_with(dispatcher);
    let report = registry.add_module(test_module("blog")).unwrap();

    assert!(report.is_clean());
    assert!(registry.has_module("blog"));
}

#[test]
fn custom_event_bus_replaces_dispatcher() {
    let config = ModulioConfig::default();
    let bus = Arc::new(RecordingEventBus::new());
    let mut services = RegistryServices::in_memory(&config);
    services.events = bus.clone();
    let registry = ModuleRegistry::new(config, services);

    registry.add_module(test_module("blog")).unwrap();
    assert_eq!(bus.kinds(), vec![EventKind::ModuleRegistered]);
}

#[test]
fn events_serialize_for_external_consumers() {
    let registry = TestRegistry::new();
    registry
        .add_module(test_module("blog").permission("blog.view"))
        .unwrap();

    let events = registry.events.events();
    let json: Vec<serde_json::Value> = events
        .iter()
        .map(|e| serde_json::to_value(e).unwrap())
        .collect();

    assert_eq!(json[0]["event"], "permissions_created");
    assert_eq!(json[1]["event"], "registered");
    assert_eq!(json[1]["module"]["name"], "blog");
    assert!(json[1]["id"].is_string());
    assert::has_key(&json[1], "timestamp");
    assert::has_key(&json[1], "context");
}

#[test]
fn deregistered_event_carries_reason_and_context() {
    let registry = TestRegistry::new();
    registry.add_module(test_module("blog")).unwrap();
    registry.events.clear();

    let context = [("ticket".to_string(), serde_json::json!("OPS-12"))]
        .into_iter()
        .collect();
    registry
        .deregister_with_reason("blog", Some("retired".to_string()), context)
        .unwrap();

    assert_eq!(registry.events.kinds(), vec![EventKind::ModuleDeregistered]);
    let json = serde_json::to_string(&registry.events.events()[0]).unwrap();
    assert::contains(&json, r#""reason":"retired""#);
    assert::contains(&json, "OPS-12");
    assert::not_contains(&json, "failures");
}
