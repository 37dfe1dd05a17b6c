use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

/// Per-profile state map. The outer lock only guards membership; each profile's
/// value has its own mutex so updates for one learner never block another.
pub struct ProfileMap<T> {
    inner: RwLock<HashMap<String, Arc<Mutex<T>>>>,
}

impl<T> Default for ProfileMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ProfileMap<T> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, profile_id: &str) -> Option<Arc<Mutex<T>>> {
        self.inner.read().get(profile_id).cloned()
    }

    pub fn get_or_insert_with(&self, profile_id: &str, init: impl FnOnce() -> T) -> Arc<Mutex<T>> {
        if let Some(slot) = self.get(profile_id) {
            return slot;
        }
        let mut guard = self.inner.write();
        guard
            .entry(profile_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(init())))
            .clone()
    }

    pub fn insert(&self, profile_id: &str, value: T) {
        self.inner
            .write()
            .insert(profile_id.to_string(), Arc::new(Mutex::new(value)));
    }

    /// Runs `f` under the profile's lock, or returns `None` when the profile is unknown.
    pub fn with<R>(&self, profile_id: &str, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let slot = self.get(profile_id)?;
        let mut value = slot.lock();
        Some(f(&mut value))
    }

    pub fn with_or_insert<R>(
        &self,
        profile_id: &str,
        init: impl FnOnce() -> T,
        f: impl FnOnce(&mut T) -> R,
    ) -> R {
        let slot = self.get_or_insert_with(profile_id, init);
        let mut value = slot.lock();
        f(&mut value)
    }

    pub fn profile_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.inner.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Visits every profile in id order; each profile lock is held only for its own visit.
    pub fn for_each(&self, mut f: impl FnMut(&str, &mut T)) {
        let mut slots: Vec<(String, Arc<Mutex<T>>)> = self
            .inner
            .read()
            .iter()
            .map(|(id, slot)| (id.clone(), slot.clone()))
            .collect();
        slots.sort_by(|a, b| a.0.cmp(&b.0));
        for (id, slot) in slots {
            let mut value = slot.lock();
            f(&id, &mut value);
        }
    }

    pub fn clear(&self) {
        self.inner.write().clear();
    }
}
