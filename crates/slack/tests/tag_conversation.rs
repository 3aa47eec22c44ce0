use std::sync::Arc;

use async_trait::async_trait;
use tagbot_core::config::{MatchingConfig, SlackConfig};
use tagbot_core::domain::component::{Component, ComponentChannel};
use tagbot_core::domain::tag::ResolutionEntry;
use tagbot_core::resolution::{EntryCache, StoreError, TagResolver, TagSnapshot, TagStore};
use tagbot_db::InMemoryTagStore;
use tagbot_slack::blocks::{self, UNKNOWN_COMPONENT_TEXT};
use tagbot_slack::events::{MessageEvent, SlackEnvelope, SlackEvent};
use tagbot_slack::{tag_dispatcher, EventContext, EventDispatcher, HandlerResult};

type TestResult<T = ()> = Result<T, String>;

fn slack_config() -> SlackConfig {
    SlackConfig {
        app_token: "xapp-test".to_owned().into(),
        bot_token: "xoxb-test".to_owned().into(),
        bot_user_id: Some("UBOT".to_owned()),
        help_channel: Some("CHELP".to_owned()),
    }
}

async fn deploy_store() -> InMemoryTagStore {
    InMemoryTagStore::new()
        .with_component(Component {
            name: "Deploy Pipeline".to_owned(),
            channel: ComponentChannel("C0DEPLOY".to_owned()),
            support_channel: Some("C0HELP".to_owned()),
            runbook_url: "https://runbooks/deploy".to_owned(),
            owner_reference: "U0RELENG".to_owned(),
        })
        .await
}

/// Accepts writes but never shows them on re-read.
struct LosingStore(InMemoryTagStore);

#[async_trait]
impl TagStore for LosingStore {
    async fn fetch_all(&self) -> Result<TagSnapshot, StoreError> {
        self.0.fetch_all().await
    }

    async fn fetch_by_name(&self, _name: &str) -> Result<Vec<ResolutionEntry>, StoreError> {
        Ok(Vec::new())
    }

    async fn create_or_associate(&self, entry: &ResolutionEntry) -> Result<(), StoreError> {
        self.0.create_or_associate(entry).await
    }
}

async fn setup() -> TestResult<(EventDispatcher, Arc<InMemoryTagStore>)> {
    let store = Arc::new(deploy_store().await);
    let cache = EntryCache::load(store.clone()).await.map_err(|e| e.to_string())?;
    let resolver = TagResolver::from_config(Arc::new(cache), &MatchingConfig::default());
    Ok((tag_dispatcher(resolver, &slack_config()), store))
}

async fn say(dispatcher: &EventDispatcher, text: &str) -> TestResult<Vec<String>> {
    let envelope = SlackEnvelope {
        envelope_id: "env".to_owned(),
        event: SlackEvent::Message(MessageEvent {
            channel_id: "CHELP".to_owned(),
            user_id: "U1".to_owned(),
            text: text.to_owned(),
            ts: "1".to_owned(),
        }),
    };
    let ctx = EventContext { correlation_id: "corr-1".to_owned() };

    match dispatcher.dispatch(&envelope, &ctx).await.map_err(|e| e.to_string())? {
        HandlerResult::Responded(reply) => {
            Ok(reply.message.section_texts().into_iter().map(str::to_owned).collect())
        }
        other => Err(format!("expected a reply to `{text}`, got {other:?}")),
    }
}

#[tokio::test]
async fn registered_tags_become_resolvable() -> TestResult {
    let (dispatcher, store) = setup().await?;

    let added = say(&dispatcher, "<@UBOT> tag <#C0DEPLOY|deploy> Deploy, pipeline").await?;
    if !added[0].contains("Tag _deploy_ added") || !added[0].contains("Tag _pipeline_ added") {
        return Err(format!("unexpected registration summary: {added:?}"));
    }
    if store.fetch_by_name("pipeline").await.map_err(|e| e.to_string())?.len() != 1 {
        return Err("registration should be written to the store".to_owned());
    }

    let found = say(&dispatcher, "tag: the pipeline is stuck").await?;
    if !found[0].starts_with("*tag:* pipeline, *owner:* <@U0RELENG>") {
        return Err(format!("unexpected lookup reply: {found:?}"));
    }
    Ok(())
}

#[tokio::test]
async fn repeated_registration_is_reported_as_already_added() -> TestResult {
    let (dispatcher, _) = setup().await?;

    say(&dispatcher, "<@UBOT> tag <#C0DEPLOY|deploy> deploy").await?;
    let again = say(&dispatcher, "<@UBOT> tag <#C0DEPLOY|deploy> DEPLOY").await?;

    if again != vec![blocks::already_added_line("deploy")] {
        return Err(format!("expected already-added notice, got {again:?}"));
    }
    Ok(())
}

#[tokio::test]
async fn unknown_component_gets_corrective_text() -> TestResult {
    let (dispatcher, _) = setup().await?;

    let reply = say(&dispatcher, "<@UBOT> tag <#C0NOPE|nope> deploy").await?;

    if reply != vec![UNKNOWN_COMPONENT_TEXT.to_owned()] {
        return Err(format!("expected unknown-component text, got {reply:?}"));
    }
    Ok(())
}

#[tokio::test]
async fn unmatched_lookup_gets_not_found_text() -> TestResult {
    let (dispatcher, _) = setup().await?;

    let reply = say(&dispatcher, "tag? xyz").await?;

    if reply != vec![blocks::NOT_FOUND_TEXT.to_owned()] {
        return Err(format!("expected not-found text, got {reply:?}"));
    }
    Ok(())
}

#[tokio::test]
async fn consistency_fault_fails_dispatch_with_correlated_reply() -> TestResult {
    let store = Arc::new(LosingStore(deploy_store().await));
    let cache = EntryCache::load(store).await.map_err(|e| e.to_string())?;
    let resolver = TagResolver::from_config(Arc::new(cache), &MatchingConfig::default());
    let dispatcher = tag_dispatcher(resolver.clone(), &slack_config());

    let envelope = SlackEnvelope {
        envelope_id: "env".to_owned(),
        event: SlackEvent::Message(MessageEvent {
            channel_id: "CHELP".to_owned(),
            user_id: "U1".to_owned(),
            text: "<@UBOT> tag <#C0DEPLOY|deploy> deploy".to_owned(),
            ts: "1".to_owned(),
        }),
    };
    let ctx = EventContext { correlation_id: "corr-7".to_owned() };

    let Err(error) = dispatcher.dispatch(&envelope, &ctx).await else {
        return Err("a lost write should fail the dispatch".to_owned());
    };
    let reply = error.reply_message();
    if reply != blocks::error_message("An unexpected internal error occurred.", "corr-7") {
        return Err(format!("unexpected error reply: {reply:?}"));
    }
    if resolver.cache().contains_tag("deploy").await {
        return Err("inconsistent tag should be evicted from the cache".to_owned());
    }
    Ok(())
}
