pub mod store;

use std::sync::Arc;

use crate::{error::StoreError, models::NotesByUrl};

pub use store::{JsonFileStore, KeyValueStore, MemoryStore};

/// Key the whole notes mapping is stored under.
pub const NOTES_KEY: &str = "notes";

pub struct Repository {
    store: Arc<dyn KeyValueStore>,
}

impl Repository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn load(&self) -> Result<NotesByUrl, StoreError> {
        match self.store.get(NOTES_KEY).await? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(NotesByUrl::new()),
        }
    }

    pub async fn save(&self, notes: &NotesByUrl) -> Result<(), StoreError> {
        let value = serde_json::to_value(notes)?;

        self.store.set(NOTES_KEY, value).await
    }
}
