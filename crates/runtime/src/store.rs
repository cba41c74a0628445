//! Accessor instances addressed by `(source, operation, instance)`.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use crate::accessor::{Accessor, Policy};

/// Instance name used when the caller does not pick one.
pub const DEFAULT_INSTANCE: &str = "default";

/// Address of one accessor instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccessorKey {
    pub source: String,
    pub operation: String,
    pub instance: String,
}

impl AccessorKey {
    /// The default instance of an operation.
    pub fn new(source: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            operation: operation.into(),
            instance: DEFAULT_INSTANCE.to_string(),
        }
    }

    /// A named instance, e.g. one per record shown side by side.
    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = instance.into();
        self
    }
}

impl fmt::Display for AccessorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.source, self.operation, self.instance)
    }
}

/// Key-addressed cache of accessor instances sharing one payload type.
pub struct RequestStore<T, E> {
    accessors: Mutex<HashMap<AccessorKey, Accessor<T, E>>>,
}

impl<T, E> Default for RequestStore<T, E> {
    fn default() -> Self {
        Self {
            accessors: Mutex::new(HashMap::new()),
        }
    }
}

impl<T, E> fmt::Debug for RequestStore<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let accessors = self.accessors.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("RequestStore")
            .field("instances", &accessors.len())
            .finish()
    }
}

impl<T, E> RequestStore<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// The instance at `key`, created with `policy` on first use.
    ///
    /// An existing instance keeps the policy it was created with.
    pub fn accessor(&self, key: &AccessorKey, policy: Policy) -> Accessor<T, E> {
        let mut accessors = self.accessors.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = accessors.get(key) {
            if existing.policy() != policy {
                debug!(%key, ?policy, kept = ?existing.policy(), "policy differs from existing instance");
            }
            return existing.clone();
        }
        let accessor = Accessor::new(policy);
        accessors.insert(key.clone(), accessor.clone());
        accessor
    }

    pub fn get(&self, key: &AccessorKey) -> Option<Accessor<T, E>> {
        self.accessors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Drop an instance, resetting it first so its call is aborted.
    pub fn remove(&self, key: &AccessorKey) -> bool {
        let removed = self
            .accessors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        let Some(accessor) = removed else {
            return false;
        };
        accessor.reset();
        true
    }

    /// Keys of every instance, sorted.
    pub fn keys(&self) -> Vec<AccessorKey> {
        let mut keys: Vec<_> = self
            .accessors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.accessors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::time::Duration;

    use tokio::time::sleep;

    use super::*;
    use crate::state::RequestState;

    type Store = RequestStore<u32, String>;

    #[tokio::test(start_paused = true)]
    async fn test_instances_of_one_operation_are_independent() {
        let store = Store::new();
        let left = AccessorKey::new("pets", "getPet").with_instance("left");
        let right = AccessorKey::new("pets", "getPet").with_instance("right");

        store.accessor(&left, Policy::Supersede).execute(|_| async {
            sleep(Duration::from_millis(10)).await;
            Ok(1)
        });
        store.accessor(&right, Policy::Supersede).execute(|_| async {
            sleep(Duration::from_millis(30)).await;
            Ok(2)
        });

        let left_state = store.get(&left).unwrap().settled().await;
        assert_eq!(left_state, RequestState::Success(1));
        assert!(store.get(&right).unwrap().state().is_pending());

        assert_eq!(
            store.get(&right).unwrap().settled().await,
            RequestState::Success(2)
        );
        assert_eq!(store.keys(), [left, right]);
    }

    #[test]
    fn test_existing_instance_keeps_policy() {
        let store = Store::new();
        let key = AccessorKey::new("pets", "listPets");
        let first = store.accessor(&key, Policy::debounce_ms(50));
        let second = store.accessor(&key, Policy::Supersede);

        assert_eq!(second.policy(), first.policy());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_resets_instance() {
        let store = Store::new();
        let key = AccessorKey::new("pets", "getPet");
        let accessor = store.accessor(&key, Policy::Supersede);
        accessor.execute(|_| std::future::pending());

        assert!(store.remove(&key));
        assert!(!store.remove(&key));
        assert_eq!(accessor.state(), RequestState::Init);
        assert!(store.is_empty());
    }

    #[test]
    fn test_key_display() {
        let key = AccessorKey::new("pets", "getPet").with_instance("42");
        assert_eq!(key.to_string(), "pets/getPet/42");
        assert_eq!(AccessorKey::new("a", "b").instance, DEFAULT_INSTANCE);
    }
}
