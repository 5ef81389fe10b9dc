//! `localStorage` as a [`KeyValueStore`].

use cmap_core::{KeyValueStore, MemoryStorage};

pub enum BrowserStorage {
    Local(web_sys::Storage),
    /// Private mode or no window: keep state for this page only.
    Memory(MemoryStorage),
}

impl BrowserStorage {
    pub fn local() -> Self {
        let storage = web_sys::window().and_then(|w| w.local_storage().ok().flatten());
        match storage {
            Some(storage) => BrowserStorage::Local(storage),
            None => {
                log::warn!("localStorage unavailable; work will not survive a reload");
                BrowserStorage::Memory(MemoryStorage::new())
            }
        }
    }
}

impl KeyValueStore for BrowserStorage {
    fn get(&self, key: &str) -> Option<String> {
        match self {
            BrowserStorage::Local(storage) => storage.get_item(key).ok().flatten(),
            BrowserStorage::Memory(memory) => memory.get(key),
        }
    }

    fn set(&mut self, key: &str, value: &str) {
        match self {
            BrowserStorage::Local(storage) => {
                if storage.set_item(key, value).is_err() {
                    log::warn!("could not write {key} to localStorage");
                }
            }
            BrowserStorage::Memory(memory) => memory.set(key, value),
        }
    }

    fn remove(&mut self, key: &str) {
        match self {
            BrowserStorage::Local(storage) => {
                let _ = storage.remove_item(key);
            }
            BrowserStorage::Memory(memory) => memory.remove(key),
        }
    }
}
