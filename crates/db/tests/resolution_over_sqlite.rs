use std::sync::Arc;

use tagbot_core::config::MatchingConfig;
use tagbot_core::domain::tag::ResolutionEntry;
use tagbot_core::resolution::{CacheError, EntryCache, TagResolver, TagStore};
use tagbot_db::{connect_with_settings, migrations, DemoDataset, SqlTagRepository};

type TestResult<T = ()> = Result<T, String>;

async fn seeded_resolver() -> TestResult<(TagResolver, Arc<SqlTagRepository>)> {
    let pool = connect_with_settings("sqlite::memory:", 1, 30).await.map_err(|e| e.to_string())?;
    migrations::run_pending(&pool).await.map_err(|e| e.to_string())?;
    DemoDataset::load(&pool).await.map_err(|e| e.to_string())?;

    let repository = Arc::new(SqlTagRepository::new(pool));
    let cache = EntryCache::load(repository.clone()).await.map_err(|e| e.to_string())?;
    let resolver = TagResolver::from_config(Arc::new(cache), &MatchingConfig::default());
    Ok((resolver, repository))
}

#[tokio::test]
async fn cache_loads_every_seeded_tag() -> TestResult {
    let (resolver, _) = seeded_resolver().await?;

    if resolver.cache().len().await != 6 {
        return Err(format!("expected 6 distinct tags, got {}", resolver.cache().len().await));
    }
    let cache_entries = resolver.cache().find("cache").await;
    if cache_entries.len() != 2 {
        return Err(format!("`cache` is registered on two components, got {cache_entries:?}"));
    }
    Ok(())
}

#[tokio::test]
async fn free_text_query_resolves_through_sqlite_store() -> TestResult {
    let (resolver, _) = seeded_resolver().await?;

    let result = resolver.resolve(&["the", "load", "balancer", "keeps", "dropping"]).await;

    if !result.found || !result.is_complete() {
        return Err(format!("query should resolve completely: {result:?}"));
    }
    let unique = result.deduplicated();
    if unique.len() != 1 || unique[0].component_channel != "C0EDGE" {
        return Err(format!("expected the edge component only, got {unique:?}"));
    }
    if unique[0].support_channel.as_deref() != Some("C0EDGEHELP") {
        return Err("support channel should come from the component row".to_string());
    }
    Ok(())
}

#[tokio::test]
async fn registration_is_visible_in_cache_and_store() -> TestResult {
    let (resolver, repository) = seeded_resolver().await?;

    resolver
        .register(ResolutionEntry::registration("Artifacts", "C0DEPLOY"))
        .await
        .map_err(|e| e.to_string())?;

    let cached = resolver.cache().find("artifacts").await;
    let stored = repository.fetch_by_name("artifacts").await.map_err(|e| e.to_string())?;
    if cached != stored || cached.len() != 1 {
        return Err(format!("cache {cached:?} should mirror store {stored:?}"));
    }
    if cached[0].owner_reference != "U0RELENG" {
        return Err("owner should default to the component owner".to_string());
    }
    Ok(())
}

#[tokio::test]
async fn registration_against_unknown_channel_is_rejected() -> TestResult {
    let (resolver, _) = seeded_resolver().await?;

    match resolver.register(ResolutionEntry::registration("artifacts", "C0NOPE")).await {
        Err(CacheError::ComponentNotFound { component_channel, .. })
            if component_channel == "C0NOPE" =>
        {
            Ok(())
        }
        other => Err(format!("expected ComponentNotFound, got {other:?}")),
    }
}
