use std::sync::Arc;

use tagbot_core::config::{AppConfig, ConfigError, LoadOptions};
use tagbot_core::resolution::{CacheError, EntryCache, TagResolver};
use tagbot_db::{connect_with_config, migrations, DbPool, SqlTagRepository};
use tagbot_slack::{tag_dispatcher, EventDispatcher};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub resolver: TagResolver,
    pub dispatcher: EventDispatcher,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("tag cache could not be built: {0}")]
    CacheLoad(#[source] CacheError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool =
        connect_with_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let store = Arc::new(SqlTagRepository::new(db_pool.clone()));
    let cache = EntryCache::load(store).await.map_err(BootstrapError::CacheLoad)?;
    let resolver = TagResolver::from_config(Arc::new(cache), &config.matching);
    let dispatcher = tag_dispatcher(resolver.clone(), &config.slack);
    info!(
        event_name = "system.bootstrap.resolver_ready",
        correlation_id = "bootstrap",
        tag_count = resolver.cache().len().await,
        handler_count = dispatcher.handler_count(),
        "tag resolver and event dispatcher ready"
    );

    Ok(Application { config, db_pool, resolver, dispatcher })
}
