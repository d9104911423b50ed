//! Handle → provider registry.
//!
//! The map lives behind `RwLock<Arc<..>>`. Readers clone the `Arc` and drop
//! the lock immediately, so a snapshot never changes under them. Writers go
//! through `Arc::make_mut`, which copies the map only while some snapshot
//! still holds the old one.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use crate::error::RegistryError;
use crate::provider::SharedProvider;

type ProviderMap = BTreeMap<String, SharedProvider>;

/// Registered statistics providers, keyed by handle.
///
/// Handles are unique and matched exactly (case-sensitive).
#[derive(Default)]
pub struct ProviderRegistry {
    providers: RwLock<Arc<ProviderMap>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under `handle`.
    pub fn register(
        &self,
        handle: impl Into<String>,
        provider: SharedProvider,
    ) -> Result<(), RegistryError> {
        let handle = handle.into();
        let mut providers = self.write();

        if providers.contains_key(&handle) {
            return Err(RegistryError::DuplicateHandle(handle));
        }

        debug!("registering provider {}", handle);
        Arc::make_mut(&mut *providers).insert(handle, provider);
        Ok(())
    }

    /// Remove the provider registered under `handle` and hand it back.
    pub fn unregister(&self, handle: &str) -> Result<SharedProvider, RegistryError> {
        let mut providers = self.write();

        if !providers.contains_key(handle) {
            return Err(RegistryError::UnknownHandle(handle.to_string()));
        }

        debug!("unregistering provider {}", handle);
        Arc::make_mut(&mut *providers)
            .remove(handle)
            .ok_or_else(|| RegistryError::UnknownHandle(handle.to_string()))
    }

    pub fn lookup(&self, handle: &str) -> Result<SharedProvider, RegistryError> {
        self.read()
            .get(handle)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownHandle(handle.to_string()))
    }

    /// Point-in-time view of every registered provider.
    ///
    /// Each call returns a fresh snapshot. Later registrations and removals
    /// are not visible through snapshots taken earlier.
    pub fn all(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            providers: Arc::clone(&self.read()),
        }
    }

    pub fn contains(&self, handle: &str) -> bool {
        self.read().contains_key(handle)
    }

    pub fn handles(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // The map is only ever replaced whole, so a poisoned lock still guards a
    // consistent value.
    fn read(&self) -> RwLockReadGuard<'_, Arc<ProviderMap>> {
        self.providers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Arc<ProviderMap>> {
        self.providers.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("handles", &self.handles())
            .finish()
    }
}

/// Immutable view of the registry, ordered by handle.
#[derive(Clone)]
pub struct RegistrySnapshot {
    providers: Arc<ProviderMap>,
}

impl RegistrySnapshot {
    /// Iterate `(handle, provider)` pairs. Can be called any number of times.
    pub fn iter(&self) -> btree_map::Iter<'_, String, SharedProvider> {
        self.providers.iter()
    }

    pub fn get(&self, handle: &str) -> Option<&SharedProvider> {
        self.providers.get(handle)
    }

    pub fn handles(&self) -> impl Iterator<Item = &str> + '_ {
        self.providers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl<'a> IntoIterator for &'a RegistrySnapshot {
    type Item = (&'a String, &'a SharedProvider);
    type IntoIter = btree_map::Iter<'a, String, SharedProvider>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Debug for RegistrySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.handles()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::provider::StatProvider;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct Fixed(&'static str);

    #[async_trait]
    impl StatProvider for Fixed {
        async fn info(&self) -> Result<Value, ProviderError> {
            Ok(json!({ "name": self.0 }))
        }
    }

    fn provider(name: &'static str) -> SharedProvider {
        Arc::new(Fixed(name))
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = ProviderRegistry::new();
        registry.register("svc-a", provider("a")).unwrap();

        assert!(registry.lookup("svc-a").is_ok());
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("svc-a"));
    }

    #[test]
    fn test_duplicate_handle() {
        let registry = ProviderRegistry::new();
        registry.register("svc-a", provider("a")).unwrap();

        let err = registry.register("svc-a", provider("again")).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateHandle("svc-a".to_string()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unregister() {
        let registry = ProviderRegistry::new();
        registry.register("svc-a", provider("a")).unwrap();

        registry.unregister("svc-a").unwrap();
        assert!(registry.is_empty());

        let err = registry.unregister("svc-a").err().unwrap();
        assert_eq!(err, RegistryError::UnknownHandle("svc-a".to_string()));
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        let registry = ProviderRegistry::new();
        registry.register("svc-a", provider("a")).unwrap();

        let err = registry.lookup("SVC-A").err().unwrap();
        assert_eq!(err, RegistryError::UnknownHandle("SVC-A".to_string()));
    }

    #[test]
    fn test_snapshot_isolated_from_later_changes() {
        let registry = ProviderRegistry::new();
        registry.register("svc-a", provider("a")).unwrap();
        registry.register("svc-b", provider("b")).unwrap();

        let snapshot = registry.all();

        registry.register("svc-c", provider("c")).unwrap();
        registry.unregister("svc-a").unwrap();

        let before: Vec<&str> = snapshot.handles().collect();
        assert_eq!(before, vec!["svc-a", "svc-b"]);

        let after: Vec<String> = registry.all().handles().map(str::to_string).collect();
        assert_eq!(after, vec!["svc-b", "svc-c"]);
    }

    #[test]
    fn test_snapshot_is_restartable() {
        let registry = ProviderRegistry::new();
        registry.register("svc-b", provider("b")).unwrap();
        registry.register("svc-a", provider("a")).unwrap();

        let snapshot = registry.all();
        let first: Vec<&String> = snapshot.iter().map(|(handle, _)| handle).collect();
        let second: Vec<&String> = (&snapshot).into_iter().map(|(handle, _)| handle).collect();

        assert_eq!(first, second);
        assert_eq!(first, vec!["svc-a", "svc-b"]);
    }

    #[test]
    fn test_concurrent_registration_keeps_snapshots_consistent() {
        let registry = Arc::new(ProviderRegistry::new());

        let writers: Vec<_> = (0..4)
            .map(|w| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        registry
                            .register(format!("w{}-{}", w, i), provider("x"))
                            .unwrap();
                    }
                })
            })
            .collect();

        for _ in 0..100 {
            let snapshot = registry.all();
            let len = snapshot.len();
            assert_eq!(snapshot.iter().count(), len);
        }

        for writer in writers {
            writer.join().unwrap();
        }
        assert_eq!(registry.len(), 200);
    }
}
