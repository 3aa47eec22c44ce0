use std::sync::Arc;

use clap::Args;
use tagbot_core::config::ConfigOverrides;
use tagbot_core::domain::tag::ResolutionEntry;
use tagbot_core::resolution::{CacheError, EntryCache, TagResolver};
use tagbot_db::{SqlTagRepository, TagRecord};

use crate::commands::{open_database, prepare, to_data, CommandResult, StepError};

#[derive(Debug, Clone, Args)]
pub struct RegisterArgs {
    #[arg(long, help = "Tag name; stored lower-cased")]
    pub tag: String,
    #[arg(long, help = "Component Slack channel id, e.g. C0DEPLOY")]
    pub channel: String,
    #[arg(long, help = "Owner Slack user id; defaults to the component owner")]
    pub owner: Option<String>,
}

pub fn run(args: RegisterArgs) -> CommandResult {
    let mut entry = ResolutionEntry::registration(&args.tag, args.channel.trim());
    if let Some(owner) = args.owner.as_deref().map(str::trim).filter(|owner| !owner.is_empty()) {
        entry = entry.with_owner(owner);
    }
    if let Err(error) = entry.validate() {
        return CommandResult::failure("register", "invalid_input", error.to_string(), 2);
    }

    let (config, runtime) = match prepare("register", ConfigOverrides::default()) {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;
        let cache = EntryCache::load(Arc::new(SqlTagRepository::new(pool.clone())))
            .await
            .map_err(|error| ("cache_load", error.to_string(), 6u8))?;
        let resolver = TagResolver::from_config(Arc::new(cache), &config.matching);

        let already_present = resolver.cache().contains_entry(&entry).await;
        if !already_present {
            resolver.register(entry.clone()).await.map_err(|error| match error {
                CacheError::ComponentNotFound { .. } => {
                    ("component_not_found", error.to_string(), 7u8)
                }
                CacheError::Consistency { .. } => ("cache_consistency", error.to_string(), 8u8),
                CacheError::Load(_) => ("cache_load", error.to_string(), 6u8),
            })?;
        }

        let records = SqlTagRepository::new(pool.clone())
            .list_for_component(&entry.component_channel)
            .await
            .map_err(|error| ("db_query", error.to_string(), 4u8))?;
        pool.close().await;

        Ok::<(bool, Vec<TagRecord>), StepError>((already_present, records))
    });

    match result {
        Ok((already_present, records)) => {
            let message = if already_present {
                format!("tag `{}` is already registered on {}", entry.tag_name, entry.component_channel)
            } else {
                format!("registered tag `{}` on {}", entry.tag_name, entry.component_channel)
            };
            CommandResult::success_with_data("register", message, to_data(&records))
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("register", error_class, message, exit_code)
        }
    }
}
