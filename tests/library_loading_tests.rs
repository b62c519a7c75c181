//! Library loading tests
//!
//! Tests for memoization, import ordering, cycle detection, missing
//! libraries, duplicate registration and deferred loading.

mod common;

use common::*;
use library_loader::{ExportValue, Exports, LibraryError, LibraryManager, LoadState};
use serde_json::json;
use std::sync::Arc;

#[test]
fn test_end_to_end_core_and_app() {
    let manager = LibraryManager::new();
    manager.library("core", None, Vec::<String>::new(), |exports, _| {
        exports.set("value", json!(1));
        Ok(())
    });
    manager.library("app", None, ["core"], |exports, imports| {
        let core = imports[0].get_data("value").and_then(|v| v.as_i64()).unwrap_or(0);
        exports.set("value", json!(core + 1));
        Ok(())
    });

    let app = manager.import("app").unwrap();
    assert_eq!(app.get_data("value"), Some(json!(2)));
}

#[test]
fn test_import_is_memoized() {
    let manager = manager_with_core();
    let runs = Counter::new();
    let counter = runs.clone();
    manager.library("lib", None, Vec::<String>::new(), move |exports, _| {
        counter.bump();
        exports.set("loaded", json!(true));
        Ok(())
    });

    let first = manager.import("lib").unwrap();
    let second = manager.import("lib").unwrap();
    let direct = manager.registry().get("lib").unwrap().load(manager.registry()).unwrap();

    assert!(first.ptr_eq(&second));
    assert!(first.ptr_eq(&direct));
    assert_eq!(runs.get(), 1);
}

#[test]
fn test_imports_passed_in_declaration_order() {
    let manager = manager_with_core();
    // Registered in the opposite order of the import list
    manager.library("y", None, Vec::<String>::new(), |exports, _| {
        exports.set("id", json!("y"));
        Ok(())
    });
    manager.library("x", None, Vec::<String>::new(), |exports, _| {
        exports.set("id", json!("x"));
        Ok(())
    });
    manager.library("c", None, ["x", "y"], |exports, imports| {
        let ids: Vec<_> = imports.iter().map(|i| i.get_data("id")).collect();
        exports.set("ids", json!(ids));
        Ok(())
    });

    let c = manager.import("c").unwrap();
    assert_eq!(c.get_data("ids"), Some(json!(["x", "y"])));
}

#[test]
fn test_dependencies_load_before_dependents() {
    let manager = manager_with_core();
    let log = LoadLog::new();
    register_logged(&manager, &log, "app", &["ui", "net"]);
    register_logged(&manager, &log, "ui", &["base"]);
    register_logged(&manager, &log, "net", &["base"]);
    register_logged(&manager, &log, "base", &[]);

    manager.import("app").unwrap();
    assert_eq!(log.entries(), vec!["base", "ui", "net", "app"]);
}

#[test]
fn test_imported_exports_share_identity() {
    let manager = manager_with_core();
    manager.library("shared", None, Vec::<String>::new(), |_, _| Ok(()));
    let seen = Arc::new(std::sync::Mutex::new(Vec::<Exports>::new()));
    for name in ["a", "b"] {
        let seen = Arc::clone(&seen);
        manager.library(name, None, ["shared"], move |_, imports| {
            seen.lock().unwrap().push(imports[0].clone());
            Ok(())
        });
    }

    manager.import("a").unwrap();
    manager.import("b").unwrap();
    let shared = manager.import("shared").unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert!(seen.iter().all(|e| e.ptr_eq(&shared)));
}

#[test]
fn test_direct_cycle_detected() {
    let manager = manager_with_core();
    manager.library("a", None, ["b"], |_, _| Ok(()));
    manager.library("b", None, ["a"], |_, _| Ok(()));

    let err = manager.import("a").unwrap_err();
    assert!(matches!(err, LibraryError::CircularDependency(ref name) if name == "a"));
    assert_ne!(manager.state_of("a"), Some(LoadState::Ready));
    assert_ne!(manager.state_of("b"), Some(LoadState::Ready));
}

#[test]
fn test_transitive_cycle_detected_from_any_member() {
    for start in ["a", "b", "c"] {
        let manager = manager_with_core();
        manager.library("a", None, ["b"], |_, _| Ok(()));
        manager.library("b", None, ["c"], |_, _| Ok(()));
        manager.library("c", None, ["a"], |_, _| Ok(()));

        let err = manager.import(start).unwrap_err();
        assert!(
            matches!(err, LibraryError::CircularDependency(ref name) if name == start),
            "start {}: {}",
            start,
            err
        );
        for name in ["a", "b", "c"] {
            assert_ne!(manager.state_of(name), Some(LoadState::Ready));
        }
    }
}

#[test]
fn test_reentrant_import_from_routine_is_cycle() {
    let manager = Arc::new(manager_with_core());
    let inner = Arc::clone(&manager);
    manager.library("selfish", None, Vec::<String>::new(), move |_, _| {
        inner.import("selfish").map(|_| ())
    });

    let err = manager.import("selfish").unwrap_err();
    assert!(matches!(err, LibraryError::CircularDependency(ref name) if name == "selfish"));
}

#[test]
fn test_failed_library_is_not_retried() {
    let manager = manager_with_core();
    let runs = Counter::new();
    let counter = runs.clone();
    manager.library("flaky", None, Vec::<String>::new(), move |_, _| {
        counter.bump();
        Err(anyhow::anyhow!("disk on fire").into())
    });

    let err = manager.import("flaky").unwrap_err();
    assert!(matches!(err, LibraryError::OperationError(ref m) if m == "disk on fire"));
    assert_eq!(manager.state_of("flaky"), Some(LoadState::Loading));

    let err = manager.import("flaky").unwrap_err();
    assert!(matches!(err, LibraryError::CircularDependency(_)));
    assert_eq!(runs.get(), 1);
}

#[test]
fn test_missing_import_target() {
    let manager = manager_with_core();
    let before = manager.libraries();

    let err = manager.import("unregistered").unwrap_err();
    assert!(matches!(err, LibraryError::LibraryNotFound(ref name) if name == "unregistered"));
    assert_eq!(manager.libraries(), before);
}

#[test]
fn test_missing_dependency() {
    let manager = manager_with_core();
    let runs = Counter::new();
    let counter = runs.clone();
    manager.library("needy", None, ["ghost"], move |_, _| {
        counter.bump();
        Ok(())
    });

    let err = manager.import("needy").unwrap_err();
    assert!(matches!(err, LibraryError::LibraryNotFound(ref name) if name == "ghost"));
    assert_eq!(runs.get(), 0);
    assert!(!manager.libraries().contains(&"ghost".to_string()));
}

#[test]
fn test_duplicate_registration_first_wins() {
    let manager = manager_with_core();
    let second_runs = Counter::new();
    let counter = second_runs.clone();

    manager.library("lib", None, Vec::<String>::new(), |exports, _| {
        exports.set("version", json!(1));
        Ok(())
    });
    manager.library("lib", None, Vec::<String>::new(), move |exports, _| {
        counter.bump();
        exports.set("version", json!(2));
        Ok(())
    });

    let lib = manager.import("lib").unwrap();
    assert_eq!(lib.get_data("version"), Some(json!(1)));
    assert_eq!(second_runs.get(), 0);
    assert_eq!(manager.libraries(), vec!["core", "lib"]);
}

#[test]
fn test_metadata_attached_when_ready() {
    let manager = manager_with_core();
    manager.library("dep", None, Vec::<String>::new(), |_, _| Ok(()));
    manager.library("lib", None, ["dep", "core"], |_, _| Ok(()));

    let lib = manager.import("lib").unwrap();
    let metadata = manager.metadata_of(&lib).unwrap();
    assert_eq!(metadata.name, "lib");
    assert_eq!(metadata.imports, vec!["dep", "core"]);
    // Metadata lives beside the exports, not among its members
    assert!(lib.is_empty());
}

#[test]
fn test_deferred_library_loads_on_first_read() {
    let manager = manager_with_core();
    let runs = Counter::new();
    let counter = runs.clone();
    manager.library("heavy", None, Vec::<String>::new(), move |exports, _| {
        counter.bump();
        exports.set(
            "compute",
            ExportValue::function(|_| Ok(json!(7).into())),
        );
        Ok(())
    });

    // The importer keeps a lazy reference without loading "heavy"
    let handles = Arc::new(std::sync::Mutex::new(None));
    let slot = Arc::clone(&handles);
    let registry = Arc::clone(manager.registry());
    manager.library("importer", None, Vec::<String>::new(), move |exports, _| {
        let heavy = registry.get("heavy").map(|l| l.stub()).unwrap_or_default();
        exports.set("heavy", heavy);
        let registry = Arc::clone(&registry);
        *slot.lock().unwrap() = Some(library_loader::defer(exports, "heavy", move |_, _| {
            registry.load("heavy").map(|_| ())
        }));
        Ok(())
    });

    manager.import("importer").unwrap();
    assert_eq!(runs.get(), 0);
    assert_eq!(manager.state_of("heavy"), Some(LoadState::NotLoaded));

    let deferred = handles.lock().unwrap().clone().unwrap();
    let result = deferred.resolve().unwrap().call("compute", &[]).unwrap();
    assert_eq!(result.as_data(), Some(&json!(7)));
    deferred.get("compute").unwrap();

    assert_eq!(runs.get(), 1);
    assert_eq!(manager.state_of("heavy"), Some(LoadState::Ready));
}
