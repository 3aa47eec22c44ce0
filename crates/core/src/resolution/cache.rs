use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::domain::tag::{normalize_tag_name, ResolutionEntry};
use crate::resolution::store::{StoreError, TagStore};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("initial tag cache load failed: {0}")]
    Load(#[source] StoreError),
    #[error("component channel `{component_channel}` is not registered (tag `{tag}`)")]
    ComponentNotFound { tag: String, component_channel: String },
    #[error("tag `{tag}` is out of sync with the backing store and was evicted: {source}")]
    Consistency {
        tag: String,
        #[source]
        source: StoreError,
    },
}

#[derive(Debug, Default)]
struct CacheState {
    tags: HashMap<String, Vec<ResolutionEntry>>,
    count: usize,
}

impl CacheState {
    fn replace(&mut self, key: String, entries: Vec<ResolutionEntry>) {
        if entries.is_empty() {
            self.remove(&key);
            return;
        }
        if self.tags.insert(key, entries).is_none() {
            self.count += 1;
        }
    }

    fn remove(&mut self, key: &str) -> Option<Vec<ResolutionEntry>> {
        let removed = self.tags.remove(key);
        if removed.is_some() {
            self.count -= 1;
        }
        removed
    }
}

/// In-memory mirror of the backing store, keyed by lower-cased tag name.
///
/// Every operation serializes through one async lock. Mutations hold it across the store
/// round trip and the follow-up re-fetch, so readers never observe a half-reconciled slot.
pub struct EntryCache {
    store: Arc<dyn TagStore>,
    state: Mutex<CacheState>,
}

impl EntryCache {
    /// Builds the cache from a full store load. There is no degraded mode: if the store
    /// cannot be read the cache does not exist.
    pub async fn load(store: Arc<dyn TagStore>) -> Result<Self, CacheError> {
        let snapshot = store.fetch_all().await.map_err(CacheError::Load)?;

        let mut tags: HashMap<String, Vec<ResolutionEntry>> = HashMap::new();
        for (name, entries) in snapshot.tags {
            tags.entry(normalize_tag_name(&name)).or_default().extend(entries);
        }
        tags.retain(|_, entries| !entries.is_empty());
        let count = tags.len();

        if count != snapshot.count {
            warn!(
                event_name = "resolution.cache.count_mismatch",
                reported_count = snapshot.count,
                loaded_count = count,
                "store-reported tag count differs from loaded tag count"
            );
        }
        info!(event_name = "resolution.cache.loaded", tag_count = count, "tag cache loaded");

        Ok(Self { store, state: Mutex::new(CacheState { tags, count }) })
    }

    pub async fn find(&self, name: &str) -> Vec<ResolutionEntry> {
        let key = normalize_tag_name(name);
        let state = self.state.lock().await;
        state.tags.get(&key).cloned().unwrap_or_default()
    }

    pub async fn contains_tag(&self, name: &str) -> bool {
        let key = normalize_tag_name(name);
        self.state.lock().await.tags.contains_key(&key)
    }

    /// True when the tag is cached with an entry for the same component channel.
    pub async fn contains_entry(&self, entry: &ResolutionEntry) -> bool {
        let key = normalize_tag_name(&entry.tag_name);
        let state = self.state.lock().await;
        state.tags.get(&key).is_some_and(|cached| {
            cached.iter().any(|existing| existing.component_channel == entry.component_channel)
        })
    }

    /// Registers `entry` in the backing store, then replaces the cached slot with a fresh
    /// read of the tag. Any store failure other than an unknown component leaves the tag
    /// evicted and is reported as [`CacheError::Consistency`].
    pub async fn add(&self, entry: ResolutionEntry) -> Result<(), CacheError> {
        let entry = entry.normalized();
        let key = entry.tag_name.clone();
        let mut state = self.state.lock().await;

        match self.store.create_or_associate(&entry).await {
            Ok(()) => {}
            Err(StoreError::ComponentNotFound { component_channel }) => {
                warn!(
                    event_name = "resolution.cache.component_not_found",
                    tag = %key,
                    component_channel = %component_channel,
                    "registration rejected by backing store"
                );
                return Err(CacheError::ComponentNotFound { tag: key, component_channel });
            }
            Err(source) => return Err(evict_inconsistent(&mut state, key, source)),
        }

        let fetched = match self.store.fetch_by_name(&key).await {
            Ok(fetched) => fetched,
            Err(source) => return Err(evict_inconsistent(&mut state, key, source)),
        };

        if !fetched.iter().any(|stored| stored.component_channel == entry.component_channel) {
            let source = StoreError::Decode(format!(
                "registration for component `{}` not visible after write",
                entry.component_channel
            ));
            return Err(evict_inconsistent(&mut state, key, source));
        }

        debug!(
            event_name = "resolution.cache.reconciled",
            tag = %key,
            entry_count = fetched.len(),
            "tag slot replaced from backing store"
        );
        state.replace(key, fetched);
        Ok(())
    }

    pub async fn names_snapshot(&self) -> Vec<String> {
        self.state.lock().await.tags.keys().cloned().collect()
    }

    /// Administrative removal of every entry cached for `name`. The backing store is not
    /// touched.
    pub async fn drop_tag(&self, name: &str) -> Option<Vec<ResolutionEntry>> {
        let key = normalize_tag_name(name);
        let removed = self.state.lock().await.remove(&key);
        if removed.is_some() {
            info!(event_name = "resolution.cache.dropped", tag = %key, "tag dropped from cache");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.count
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn evict_inconsistent(state: &mut CacheState, key: String, source: StoreError) -> CacheError {
    state.remove(&key);
    error!(
        event_name = "resolution.cache.consistency_fault",
        tag = %key,
        error = %source,
        "backing store failed during write-through; tag evicted from cache"
    );
    CacheError::Consistency { tag: key, source }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::domain::tag::ResolutionEntry;
    use crate::resolution::cache::{CacheError, EntryCache};
    use crate::resolution::store::{StoreError, TagStore};
    use crate::resolution::testing::{entry, FakeStore, Failure};

    async fn cache_with(store: Arc<FakeStore>) -> EntryCache {
        EntryCache::load(store).await.expect("cache load")
    }

    #[tokio::test]
    async fn lookups_are_case_insensitive() {
        let store = Arc::new(FakeStore::default().with_entry(entry("Deploy", "C1", "U1")));
        let cache = cache_with(store).await;

        let lower = cache.find("deploy").await;
        assert_eq!(lower.len(), 1);
        assert_eq!(cache.find("Deploy").await, lower);
        assert_eq!(cache.find("DEPLOY").await, lower);
        assert!(cache.contains_tag("dEpLoY").await);
    }

    #[tokio::test]
    async fn missing_tag_yields_empty_list() {
        let cache = cache_with(Arc::new(FakeStore::default())).await;

        assert!(cache.find("nothing").await.is_empty());
        assert!(!cache.contains_tag("nothing").await);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn load_failure_is_reported() {
        let store = Arc::new(FakeStore::default());
        store.fail(Failure::FetchAll);

        let result = EntryCache::load(store).await;

        assert!(matches!(result, Err(CacheError::Load(StoreError::Unavailable(_)))));
    }

    #[tokio::test]
    async fn add_is_write_through() {
        let store = Arc::new(FakeStore::default().with_component("C2", "U2"));
        let cache = cache_with(store.clone()).await;

        cache
            .add(ResolutionEntry::registration("Gemfire", "C2"))
            .await
            .expect("registration should succeed");

        let cached = cache.find("gemfire").await;
        let fresh = store.fetch_by_name("gemfire").await.expect("fetch");
        assert_eq!(cached, fresh);
        assert!(cached.iter().any(|entry| entry.component_channel == "C2"));
        assert_eq!(cached[0].owner_reference, "U2", "owner comes from the store read");
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn second_component_for_same_tag_replaces_slot_from_store() {
        let store = Arc::new(
            FakeStore::default().with_entry(entry("deploy", "C1", "U1")).with_component("C2", "U2"),
        );
        let cache = cache_with(store.clone()).await;

        cache.add(ResolutionEntry::registration("DEPLOY", "C2")).await.expect("register");

        let cached = cache.find("deploy").await;
        assert_eq!(cached.len(), 2);
        assert_eq!(cached, store.fetch_by_name("deploy").await.expect("fetch"));
        assert_eq!(cache.len().await, 1, "still one distinct tag");
    }

    #[tokio::test]
    async fn unknown_component_leaves_cache_untouched() {
        let store = Arc::new(FakeStore::default().with_entry(entry("deploy", "C1", "U1")));
        let cache = cache_with(store).await;
        let before = cache.find("deploy").await;

        let result = cache.add(ResolutionEntry::registration("deploy", "C404")).await;

        assert_eq!(
            result,
            Err(CacheError::ComponentNotFound {
                tag: "deploy".to_string(),
                component_channel: "C404".to_string(),
            })
        );
        assert_eq!(cache.find("deploy").await, before);
    }

    #[tokio::test]
    async fn failed_refetch_evicts_tag() {
        let store = Arc::new(
            FakeStore::default().with_entry(entry("deploy", "C1", "U1")).with_component("C2", "U2"),
        );
        let cache = cache_with(store.clone()).await;
        store.fail(Failure::FetchByName);

        let result = cache.add(ResolutionEntry::registration("deploy", "C2")).await;

        assert!(matches!(result, Err(CacheError::Consistency { ref tag, .. }) if tag == "deploy"));
        assert!(!cache.contains_tag("deploy").await, "stale slot must not keep serving");
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn failed_mutation_is_a_consistency_fault() {
        let store = Arc::new(FakeStore::default().with_entry(entry("deploy", "C1", "U1")));
        let cache = cache_with(store.clone()).await;
        store.fail(Failure::Create);

        let result = cache.add(ResolutionEntry::registration("deploy", "C1")).await;

        assert!(matches!(result, Err(CacheError::Consistency { .. })));
        assert!(cache.find("deploy").await.is_empty());
    }

    #[tokio::test]
    async fn contains_entry_matches_on_component_channel() {
        let store = Arc::new(FakeStore::default().with_entry(entry("deploy", "C1", "U1")));
        let cache = cache_with(store).await;

        assert!(cache.contains_entry(&ResolutionEntry::registration("Deploy", "C1")).await);
        assert!(!cache.contains_entry(&ResolutionEntry::registration("deploy", "C2")).await);
        assert!(!cache.contains_entry(&ResolutionEntry::registration("other", "C1")).await);
    }

    #[tokio::test]
    async fn drop_tag_removes_slot_and_count() {
        let store = Arc::new(
            FakeStore::default()
                .with_entry(entry("deploy", "C1", "U1"))
                .with_entry(entry("gemfire", "C2", "U2")),
        );
        let cache = cache_with(store).await;

        let dropped = cache.drop_tag("DEPLOY").await.expect("tag was cached");

        assert_eq!(dropped.len(), 1);
        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.names_snapshot().await, vec!["gemfire".to_string()]);
        assert!(cache.drop_tag("deploy").await.is_none());
    }
}
