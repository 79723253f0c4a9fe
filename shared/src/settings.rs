use std::{
    collections::BTreeMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

/// Persistent application settings, grouped like a config file. Passed to
/// the components that remember user choices.
pub trait SettingsStore: Send + Sync {
    fn read(&self, group: &str, key: &str) -> Option<String>;

    fn write(&self, group: &str, key: &str, value: &str);
}

/// `SettingsStore` kept in process memory
#[derive(Default)]
pub struct MemorySettings {
    entries: Mutex<BTreeMap<(String, String), String>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<(String, String), String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SettingsStore for MemorySettings {
    fn read(&self, group: &str, key: &str) -> Option<String> {
        self.lock()
            .get(&(group.to_string(), key.to_string()))
            .cloned()
    }

    fn write(&self, group: &str, key: &str, value: &str) {
        self.lock()
            .insert((group.to_string(), key.to_string()), value.to_string());
    }
}
