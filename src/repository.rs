use crate::errors::{AppError, AppResult};
use crate::store::CollectionStore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// A record that lives in a persisted collection, identified by an opaque
/// string id.
pub trait Entity: Clone + Serialize + DeserializeOwned {
    fn id(&self) -> &str;
    fn set_id(&mut self, id: String);
}

/// In-memory collection backed by the store. Every mutation re-persists the
/// full collection before returning, so a fresh `load` of the same key always
/// reflects the last completed operation.
pub struct Repository<T: Entity> {
    store: Arc<CollectionStore>,
    key: &'static str,
    items: Mutex<Vec<T>>,
}

impl<T: Entity> Repository<T> {
    pub fn open(store: Arc<CollectionStore>, key: &'static str) -> AppResult<Self> {
        let items = store.load(key)?;
        Ok(Self {
            store,
            key,
            items: Mutex::new(items),
        })
    }

    pub fn collection_key(&self) -> &'static str {
        self.key
    }

    /// Insertion-ordered snapshot; no implicit sort.
    pub fn list(&self) -> AppResult<Vec<T>> {
        Ok(self.lock_items()?.clone())
    }

    pub fn len(&self) -> AppResult<usize> {
        Ok(self.lock_items()?.len())
    }

    pub fn is_empty(&self) -> AppResult<bool> {
        Ok(self.lock_items()?.is_empty())
    }

    pub fn get(&self, id: &str) -> AppResult<Option<T>> {
        Ok(self.lock_items()?.iter().find(|item| item.id() == id).cloned())
    }

    /// Appends. Assigns a fresh id when the caller left it empty; a supplied
    /// id that already exists is rejected to keep ids unique.
    pub fn add(&self, item: T) -> AppResult<T> {
        self.insert(item, false)
    }

    /// Prepends; saved artifacts are newest-first by convention.
    pub fn add_first(&self, item: T) -> AppResult<T> {
        self.insert(item, true)
    }

    fn insert(&self, mut item: T, front: bool) -> AppResult<T> {
        let mut items = self.lock_items()?;

        if item.id().is_empty() {
            item.set_id(Uuid::new_v4().to_string());
        } else if items.iter().any(|existing| existing.id() == item.id()) {
            return Err(AppError::Validation(format!(
                "id {} already exists in {}",
                item.id(),
                self.key
            )));
        }

        if front {
            items.insert(0, item.clone());
        } else {
            items.push(item.clone());
        }
        self.persist(&items)?;
        Ok(item)
    }

    /// Replaces fields of the matching record via the supplied closure.
    pub fn update_with(&self, id: &str, apply: impl FnOnce(&mut T)) -> AppResult<T> {
        let mut items = self.lock_items()?;
        let Some(item) = items.iter_mut().find(|item| item.id() == id) else {
            return Err(AppError::NotFound(format!("no record {} in {}", id, self.key)));
        };

        apply(item);
        // The closure must not re-key the record.
        item.set_id(id.to_string());
        let updated = item.clone();
        self.persist(&items)?;
        Ok(updated)
    }

    /// Deletes if present; returns whether a removal happened.
    pub fn remove(&self, id: &str) -> AppResult<bool> {
        let mut items = self.lock_items()?;
        let before = items.len();
        items.retain(|item| item.id() != id);
        if items.len() == before {
            return Ok(false);
        }
        self.persist(&items)?;
        Ok(true)
    }

    pub fn replace_all(&self, new_items: Vec<T>) -> AppResult<()> {
        let mut items = self.lock_items()?;
        *items = new_items;
        self.persist(&items)?;
        Ok(())
    }

    fn persist(&self, items: &[T]) -> AppResult<()> {
        self.store.save(self.key, items)
    }

    fn lock_items(&self) -> AppResult<MutexGuard<'_, Vec<T>>> {
        self.items
            .lock()
            .map_err(|_| AppError::Internal("repository mutex poisoned".to_string()))
    }
}
