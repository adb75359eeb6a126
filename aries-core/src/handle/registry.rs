use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use rst_common::with_logging::log::debug;
use rst_common::with_tokio::tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::errors::AgentError;

pub type Handle = u32;

/// ObjectCache is an arena of protocol objects of a single kind
///
/// The map itself is guarded by a `RwLock`, each object by its own `Mutex` so that
/// distinct handles can transition in parallel. A transition takes the object through
/// [`ObjectCache::checkout`], a second concurrent checkout of the same handle fails with
/// [`AgentError::ObjectBusy`] instead of waiting.
pub struct ObjectCache<T> {
    name: &'static str,
    counter: AtomicU32,
    store: RwLock<HashMap<Handle, Arc<Mutex<T>>>>,
}

impl<T> ObjectCache<T>
where
    T: Clone + Send,
{
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            counter: AtomicU32::new(1),
            store: RwLock::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub async fn insert(&self, object: T) -> Handle {
        let handle = self.counter.fetch_add(1, Ordering::SeqCst);
        let mut store = self.store.write().await;
        store.insert(handle, Arc::new(Mutex::new(object)));

        debug!("[{}] handle created: {}", self.name, handle);
        handle
    }

    /// snapshot returns a copy of the object, waiting for any in-flight transition
    pub async fn snapshot(&self, handle: Handle) -> Result<T, AgentError> {
        let object = self.lookup(handle).await?;
        let guard = object.lock().await;
        Ok(guard.clone())
    }

    /// checkout takes exclusive ownership of the object for one transition
    pub async fn checkout(&self, handle: Handle) -> Result<OwnedMutexGuard<T>, AgentError> {
        let object = self.lookup(handle).await?;
        object.try_lock_owned().map_err(|_| {
            AgentError::ObjectBusy(format!("{} handle {} is in use", self.name, handle))
        })
    }

    pub async fn release(&self, handle: Handle) -> Result<(), AgentError> {
        let mut store = self.store.write().await;
        store
            .remove(&handle)
            .map(|_| debug!("[{}] handle released: {}", self.name, handle))
            .ok_or_else(|| self.invalid(handle))
    }

    pub async fn contains(&self, handle: Handle) -> bool {
        let store = self.store.read().await;
        store.contains_key(&handle)
    }

    pub async fn handles(&self) -> Vec<Handle> {
        let store = self.store.read().await;
        let mut handles: Vec<Handle> = store.keys().copied().collect();
        handles.sort();
        handles
    }

    async fn lookup(&self, handle: Handle) -> Result<Arc<Mutex<T>>, AgentError> {
        let store = self.store.read().await;
        store
            .get(&handle)
            .cloned()
            .ok_or_else(|| self.invalid(handle))
    }

    fn invalid(&self, handle: Handle) -> AgentError {
        AgentError::InvalidHandle(format!("{} handle {} not found", self.name, handle))
    }
}
