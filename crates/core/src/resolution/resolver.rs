use std::sync::Arc;

use tracing::info;

use crate::config::MatchingConfig;
use crate::domain::tag::ResolutionEntry;
use crate::resolution::cache::{CacheError, EntryCache};
use crate::resolution::candidates;
use crate::resolution::dispatcher::MatchDispatcher;
use crate::resolution::result::ResolutionResult;
use crate::resolution::similarity::MatchPolicy;

/// Entry point for the chat layer: free-text lookups and tag registration.
#[derive(Clone)]
pub struct TagResolver {
    cache: Arc<EntryCache>,
    dispatcher: MatchDispatcher,
}

impl TagResolver {
    pub fn new(cache: Arc<EntryCache>, policy: MatchPolicy) -> Self {
        let dispatcher = MatchDispatcher::new(Arc::clone(&cache), policy);
        Self { cache, dispatcher }
    }

    pub fn from_config(cache: Arc<EntryCache>, config: &MatchingConfig) -> Self {
        let dispatcher = MatchDispatcher::new(Arc::clone(&cache), MatchPolicy::from(config))
            .with_result_buffer(config.result_buffer);
        Self { cache, dispatcher }
    }

    pub fn cache(&self) -> &Arc<EntryCache> {
        &self.cache
    }

    pub fn policy(&self) -> MatchPolicy {
        self.dispatcher.policy()
    }

    /// Resolves query words (command tokens already stripped) to every matching entry.
    pub async fn resolve<S: AsRef<str>>(&self, words: &[S]) -> ResolutionResult {
        let candidates = candidates::generate(words);
        let result = self.dispatcher.dispatch(candidates).await;
        info!(
            event_name = "resolution.query.resolved",
            word_count = words.len(),
            candidate_count = result.dispatched,
            entry_count = result.entries.len(),
            found = result.found,
            "tag query resolved"
        );
        result
    }

    pub async fn register(&self, entry: ResolutionEntry) -> Result<(), CacheError> {
        self.cache.add(entry).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::config::MatchingConfig;
    use crate::domain::tag::ResolutionEntry;
    use crate::resolution::cache::{CacheError, EntryCache};
    use crate::resolution::resolver::TagResolver;
    use crate::resolution::similarity::MatchPolicy;
    use crate::resolution::testing::FakeStore;

    fn deploy_entry() -> ResolutionEntry {
        ResolutionEntry {
            tag_name: "deploy".to_string(),
            owner_reference: "U1".to_string(),
            component_channel: "C1".to_string(),
            support_channel: None,
            runbook_url: "http://x".to_string(),
        }
    }

    async fn resolver(policy: MatchPolicy) -> TagResolver {
        let store = FakeStore::default().with_entry(deploy_entry());
        let cache = EntryCache::load(Arc::new(store)).await.expect("cache load");
        TagResolver::new(Arc::new(cache), policy)
    }

    #[tokio::test]
    async fn typo_resolves_to_deploy_entry() {
        let resolver = resolver(MatchPolicy { threshold: 0.8, min_fuzzy_len: 4 }).await;

        let result = resolver.resolve(&["depoy"]).await;

        assert!(result.found);
        assert_eq!(result.entries, vec![deploy_entry()]);
    }

    #[tokio::test]
    async fn dropped_letter_in_short_tag_misses_default_threshold() {
        // Ratio is 1 - distance / max_len = 1 - 1/6 ~ 0.833, below the 0.85 default.
        // Accepting `depoy` takes a lower configured threshold (see the test above);
        // the default stays at 0.85.
        let resolver = resolver(MatchPolicy::default()).await;

        assert!(!resolver.resolve(&["depoy"]).await.found);
        assert!(resolver.resolve(&["Deploy"]).await.found);
    }

    #[tokio::test]
    async fn unrelated_query_is_not_found() {
        let resolver = resolver(MatchPolicy::default()).await;

        let result = resolver.resolve(&["xyz"]).await;

        assert!(!result.found);
        assert!(result.entries.is_empty());
        assert!(result.is_complete());
    }

    #[tokio::test]
    async fn overlapping_candidates_keep_duplicates() {
        let resolver = resolver(MatchPolicy { threshold: 0.8, min_fuzzy_len: 4 }).await;

        let result = resolver.resolve(&["please", "deploy", "depoy", "now"]).await;

        assert_eq!(result.dispatched, 9);
        assert_eq!(result.completed, 9);
        assert_eq!(result.entries.len(), 2);
        assert_eq!(result.deduplicated(), vec![deploy_entry()]);
    }

    #[tokio::test]
    async fn multi_word_tags_resolve_through_bigrams() {
        let store = FakeStore::default().with_component("C7", "U7");
        let cache = EntryCache::load(Arc::new(store)).await.expect("cache load");
        let resolver = TagResolver::from_config(Arc::new(cache), &MatchingConfig::default());

        resolver
            .register(ResolutionEntry::registration("Load Balancer", "C7"))
            .await
            .expect("register");
        let result = resolver.resolve(&["the", "load", "balancr", "is", "down"]).await;

        assert!(result.found);
        assert!(result.entries.iter().all(|entry| entry.tag_name == "load balancer"));
    }

    #[tokio::test]
    async fn register_surfaces_unknown_component() {
        let resolver = resolver(MatchPolicy::default()).await;

        let result = resolver.register(ResolutionEntry::registration("gemfire", "C9")).await;

        assert!(matches!(result, Err(CacheError::ComponentNotFound { .. })));
        assert!(!resolver.cache().contains_tag("gemfire").await);
    }
}
