use std::sync::Arc;

use serde::Serialize;
use tagbot_core::config::ConfigOverrides;
use tagbot_core::domain::tag::ResolutionEntry;
use tagbot_core::resolution::{EntryCache, TagResolver};
use tagbot_db::SqlTagRepository;

use crate::commands::{open_database, prepare, to_data, CommandResult, StepError};

#[derive(Debug, Serialize)]
struct ResolveReport {
    found: bool,
    dispatched: usize,
    completed: usize,
    entries: Vec<ResolutionEntry>,
}

pub fn run(words: &[String], threshold: Option<f64>) -> CommandResult {
    let overrides = ConfigOverrides { similarity_threshold: threshold, ..ConfigOverrides::default() };
    let (config, runtime) = match prepare("resolve", overrides) {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;
        let store = Arc::new(SqlTagRepository::new(pool.clone()));
        let cache = EntryCache::load(store)
            .await
            .map_err(|error| ("cache_load", error.to_string(), 6u8))?;

        let resolver = TagResolver::from_config(Arc::new(cache), &config.matching);
        let result = resolver.resolve(words).await;
        pool.close().await;

        Ok::<ResolveReport, StepError>(ResolveReport {
            found: result.found,
            dispatched: result.dispatched,
            completed: result.completed,
            entries: result.deduplicated(),
        })
    });

    match result {
        Ok(report) => {
            let message = if report.found {
                format!("matched {} entries", report.entries.len())
            } else {
                "no matching tags".to_string()
            };
            CommandResult::success_with_data("resolve", message, to_data(&report))
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("resolve", error_class, message, exit_code)
        }
    }
}
