use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use tagbot_core::domain::tag::ResolutionEntry;
use tagbot_core::errors::{ApplicationError, InterfaceError};
use tagbot_core::resolution::{CacheError, TagResolver};

use crate::blocks::{self, HelpTopic, MessageTemplate};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TagCommand {
    Lookup { words: Vec<String> },
    Register { component_channel: String, tags: Vec<String> },
    Help(HelpTopic),
    Ignore,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandContext {
    pub channel_id: String,
    pub user_id: String,
    pub correlation_id: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandRouteError {
    #[error("tag registration failed: {0}")]
    Registration(#[source] InterfaceError),
}

impl CommandRouteError {
    pub fn interface(&self) -> &InterfaceError {
        match self {
            Self::Registration(interface) => interface,
        }
    }
}

/// Classifies a channel message. `bot_user_id` enables `<@BOT> ...` commands.
pub fn parse_message(text: &str, bot_user_id: Option<&str>) -> TagCommand {
    let words: Vec<&str> = text.split_whitespace().collect();
    let Some(first) = words.first() else {
        return TagCommand::Ignore;
    };

    if bot_user_id.is_some_and(|bot| user_trim(first) == bot && first.starts_with("<@")) {
        return parse_bot_command(&words[1..]);
    }

    if first.eq_ignore_ascii_case("help") && words.len() == 1 {
        return TagCommand::Help(HelpTopic::Base);
    }

    let is_lookup = first
        .get(..4)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("tag:") || prefix.eq_ignore_ascii_case("tag?"));
    if !is_lookup {
        return TagCommand::Ignore;
    }
    let glued = &first[4..];
    let mut query = Vec::with_capacity(words.len());
    if !glued.is_empty() {
        query.push(glued.to_owned());
    }
    query.extend(words[1..].iter().map(|word| (*word).to_owned()));

    if query.is_empty() {
        TagCommand::Help(HelpTopic::Base)
    } else {
        TagCommand::Lookup { words: query }
    }
}

fn parse_bot_command(args: &[&str]) -> TagCommand {
    let Some(verb) = args.first() else {
        return TagCommand::Help(HelpTopic::Base);
    };

    match verb.to_lowercase().as_str() {
        "tag" | "tags" => parse_registration(&args[1..]),
        "help" => TagCommand::Help(match args.get(1).map(|topic| topic.to_lowercase()).as_deref() {
            Some("tags") | Some("tag") => HelpTopic::Tags,
            Some("add") => HelpTopic::Add,
            _ => HelpTopic::Base,
        }),
        _ => TagCommand::Help(HelpTopic::Base),
    }
}

fn parse_registration(args: &[&str]) -> TagCommand {
    let Some(channel) = args.first().filter(|token| token.starts_with("<#")) else {
        return TagCommand::Help(HelpTopic::Tags);
    };

    let tags: Vec<String> = args[1..]
        .join(" ")
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_owned)
        .collect();
    if tags.is_empty() {
        return TagCommand::Help(HelpTopic::Tags);
    }

    TagCommand::Register { component_channel: chan_trim(channel), tags }
}

/// `<#C123|name>` to `C123`.
pub fn chan_trim(token: &str) -> String {
    let id = token.split('|').next().unwrap_or(token);
    id.trim_start_matches("<#").trim_end_matches('>').to_owned()
}

/// `<@U123>` to `U123`.
pub fn user_trim(token: &str) -> &str {
    token.trim_start_matches("<@").trim_end_matches('>')
}

pub struct CommandRouter<S> {
    service: S,
}

impl<S> CommandRouter<S>
where
    S: TagCommandService,
{
    pub fn new(service: S) -> Self {
        Self { service }
    }

    pub async fn route(
        &self,
        command: TagCommand,
        ctx: &CommandContext,
    ) -> Result<Option<MessageTemplate>, CommandRouteError> {
        match command {
            TagCommand::Lookup { words } => self.service.lookup(&words, ctx).await.map(Some),
            TagCommand::Register { component_channel, tags } => {
                self.service.register(&component_channel, &tags, ctx).await.map(Some)
            }
            TagCommand::Help(topic) => Ok(Some(blocks::help_message(topic))),
            TagCommand::Ignore => Ok(None),
        }
    }
}

#[async_trait]
pub trait TagCommandService: Send + Sync {
    async fn lookup(
        &self,
        words: &[String],
        ctx: &CommandContext,
    ) -> Result<MessageTemplate, CommandRouteError>;

    async fn register(
        &self,
        component_channel: &str,
        tags: &[String],
        ctx: &CommandContext,
    ) -> Result<MessageTemplate, CommandRouteError>;
}

/// Command service backed by the shared resolver and its entry cache.
#[derive(Clone)]
pub struct ResolverCommandService {
    resolver: TagResolver,
}

impl ResolverCommandService {
    pub fn new(resolver: TagResolver) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl TagCommandService for ResolverCommandService {
    async fn lookup(
        &self,
        words: &[String],
        ctx: &CommandContext,
    ) -> Result<MessageTemplate, CommandRouteError> {
        let result = self.resolver.resolve(words).await;
        info!(
            event_name = "slack.lookup.answered",
            correlation_id = %ctx.correlation_id,
            channel_id = %ctx.channel_id,
            found = result.found,
            "tag lookup answered"
        );
        Ok(blocks::resolution_message(&result))
    }

    async fn register(
        &self,
        component_channel: &str,
        tags: &[String],
        ctx: &CommandContext,
    ) -> Result<MessageTemplate, CommandRouteError> {
        let cache = self.resolver.cache();
        let mut lines = Vec::with_capacity(tags.len());

        for tag in tags {
            let registration = ResolutionEntry::registration(tag, component_channel);
            if let Err(invalid) = registration.validate() {
                lines.push(format!("Skipped `{tag}`: {invalid}"));
                continue;
            }
            if cache.contains_entry(&registration).await {
                lines.push(blocks::already_added_line(&registration.tag_name));
                continue;
            }

            let tag_name = registration.tag_name.clone();
            match self.resolver.register(registration).await {
                Ok(()) => lines.push(blocks::added_line(&tag_name, component_channel)),
                Err(CacheError::ComponentNotFound { .. }) => {
                    return Ok(blocks::unknown_component_message());
                }
                Err(error) => {
                    warn!(
                        event_name = "slack.register.failed",
                        correlation_id = %ctx.correlation_id,
                        tag = %tag_name,
                        error = %error,
                        "tag registration failed"
                    );
                    return Err(CommandRouteError::Registration(
                        ApplicationError::from(error).into_interface(ctx.correlation_id.clone()),
                    ));
                }
            }
        }

        info!(
            event_name = "slack.register.completed",
            correlation_id = %ctx.correlation_id,
            user_id = %ctx.user_id,
            component_channel = %component_channel,
            tag_count = tags.len(),
            "tag registration processed"
        );
        Ok(blocks::registration_message(&lines))
    }
}
