use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::tag::ResolutionEntry;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("component channel `{component_channel}` is not known to the store")]
    ComponentNotFound { component_channel: String },
    #[error("backing store unavailable: {0}")]
    Unavailable(String),
    #[error("backing store returned malformed data: {0}")]
    Decode(String),
}

/// Full contents of the backing store, keyed by normalized tag name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TagSnapshot {
    pub tags: HashMap<String, Vec<ResolutionEntry>>,
    pub count: usize,
}

impl TagSnapshot {
    pub fn from_entries(entries: impl IntoIterator<Item = ResolutionEntry>) -> Self {
        let mut tags: HashMap<String, Vec<ResolutionEntry>> = HashMap::new();
        for entry in entries {
            let entry = entry.normalized();
            tags.entry(entry.tag_name.clone()).or_default().push(entry);
        }
        let count = tags.len();
        Self { tags, count }
    }
}

/// Durable source of truth the entry cache mirrors.
#[async_trait]
pub trait TagStore: Send + Sync {
    async fn fetch_all(&self) -> Result<TagSnapshot, StoreError>;

    /// Every entry registered under `name`, already normalized by the caller.
    async fn fetch_by_name(&self, name: &str) -> Result<Vec<ResolutionEntry>, StoreError>;

    /// Registers `entry.tag_name` against `entry.component_channel`. Fails with
    /// [`StoreError::ComponentNotFound`] for unknown channels; repeating an existing
    /// registration succeeds without creating a duplicate.
    async fn create_or_associate(&self, entry: &ResolutionEntry) -> Result<(), StoreError>;
}
