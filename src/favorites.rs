//! Favorites held in memory for the lifetime of the process.

use crate::display::FavoriteEntry;
use std::sync::{Mutex, MutexGuard};

/// Insertion-ordered set of favorite records, keyed by id.
///
/// Shared across handlers behind an `Arc`; every operation takes the lock
/// for its own duration only.
#[derive(Debug, Default)]
pub struct FavoritesStore {
    entries: Mutex<Vec<FavoriteEntry>>,
}

impl FavoritesStore {
    pub fn new() -> Self {
        Self::default()
    }

    // A poisoned lock still guards a consistent Vec, so keep using it.
    fn lock(&self) -> MutexGuard<'_, Vec<FavoriteEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Adds `entry` if its id is absent, removes it otherwise.
    /// Returns whether the id is a favorite afterwards.
    pub fn toggle(&self, entry: FavoriteEntry) -> bool {
        let mut entries = self.lock();
        match entries.iter().position(|e| e.id() == entry.id()) {
            Some(index) => {
                let removed = entries.remove(index);
                tracing::debug!("Removed {} from favorites", removed.name());
                false
            }
            None => {
                tracing::debug!("Added {} to favorites", entry.name());
                entries.push(entry);
                true
            }
        }
    }

    pub fn is_favorite(&self, id: u32) -> bool {
        self.lock().iter().any(|e| e.id() == id)
    }

    pub fn remove(&self, id: u32) -> Option<FavoriteEntry> {
        let mut entries = self.lock();
        let index = entries.iter().position(|e| e.id() == id)?;
        Some(entries.remove(index))
    }

    pub fn entries(&self) -> Vec<FavoriteEntry> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}
