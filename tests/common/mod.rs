//! Shared helpers for library loader integration tests

#![allow(dead_code)]

use library_loader::{Exports, LibraryManager};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Manager with an empty "core" library, so bootstrap succeeds
pub fn manager_with_core() -> LibraryManager {
    let manager = LibraryManager::new();
    manager.library("core", None, Vec::<String>::new(), |_, _| Ok(()));
    manager
}

/// Shared invocation counter
#[derive(Clone, Default)]
pub struct Counter(Arc<AtomicUsize>);

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Records the order in which loader routines ran
#[derive(Clone, Default)]
pub struct LoadLog(Arc<Mutex<Vec<String>>>);

impl LoadLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, name: &str) {
        self.0.lock().unwrap().push(name.to_string());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// Register a library whose routine only logs its own name
pub fn register_logged(manager: &LibraryManager, log: &LoadLog, name: &str, imports: &[&str]) {
    let log = log.clone();
    let own = name.to_string();
    manager.library(name, None, imports.iter().copied(), move |exports: &Exports, _| {
        log.record(&own);
        exports.set("name", serde_json::json!(own));
        Ok(())
    });
}
