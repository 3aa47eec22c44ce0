use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use tagbot_core::config::SlackConfig;
use tagbot_core::resolution::TagResolver;

use crate::{
    blocks::{self, MessageTemplate},
    commands::{
        parse_message, CommandContext, CommandRouteError, CommandRouter, ResolverCommandService,
        TagCommand, TagCommandService,
    },
};

/// Slack's own system user; its messages are never commands.
pub const SLACKBOT_USER_ID: &str = "USLACKBOT";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlackEnvelope {
    pub envelope_id: String,
    pub event: SlackEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlackEvent {
    Message(MessageEvent),
    MemberJoinedChannel(MemberJoinedChannelEvent),
    Unsupported { event_type: String },
}

impl SlackEvent {
    pub fn event_type(&self) -> SlackEventType {
        match self {
            Self::Message(_) => SlackEventType::Message,
            Self::MemberJoinedChannel(_) => SlackEventType::MemberJoinedChannel,
            Self::Unsupported { .. } => SlackEventType::Unsupported,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SlackEventType {
    Message,
    MemberJoinedChannel,
    Unsupported,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageEvent {
    pub channel_id: String,
    pub user_id: String,
    pub text: String,
    pub ts: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberJoinedChannelEvent {
    pub channel_id: String,
    pub user_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl EventContext {
    pub fn generate() -> Self {
        Self { correlation_id: Uuid::new_v4().to_string() }
    }
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

/// A message for the transport to post. Ephemeral replies are shown to `user_id` only.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatReply {
    pub channel_id: String,
    pub user_id: String,
    pub ephemeral: bool,
    pub message: MessageTemplate,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    Responded(ChatReply),
    Processed,
    Ignored,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventHandlerError {
    #[error(transparent)]
    Route(#[from] CommandRouteError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

impl DispatchError {
    /// User-safe reply for the failed event, carrying the correlation id.
    pub fn reply_message(&self) -> MessageTemplate {
        let Self::Handler(EventHandlerError::Route(route)) = self;
        let interface = route.interface();
        blocks::error_message(interface.user_message(), interface.correlation_id())
    }
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> SlackEventType;
    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<SlackEventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_type(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let Some(handler) = self.handlers.get(&envelope.event.event_type()) else {
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(envelope, ctx).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

/// Message and member-join handlers wired to `resolver`.
pub fn tag_dispatcher(resolver: TagResolver, slack: &SlackConfig) -> EventDispatcher {
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(MessageHandler::new(
        ResolverCommandService::new(resolver),
        slack.bot_user_id.clone(),
    ));
    dispatcher.register(MemberJoinedHandler::new(slack.help_channel.clone()));
    dispatcher
}

pub struct MessageHandler<S> {
    router: CommandRouter<S>,
    bot_user_id: Option<String>,
}

impl<S> MessageHandler<S>
where
    S: TagCommandService,
{
    pub fn new(service: S, bot_user_id: Option<String>) -> Self {
        Self { router: CommandRouter::new(service), bot_user_id }
    }

    fn is_own_or_system(&self, user_id: &str) -> bool {
        user_id == SLACKBOT_USER_ID || self.bot_user_id.as_deref() == Some(user_id)
    }
}

#[async_trait]
impl<S> EventHandler for MessageHandler<S>
where
    S: TagCommandService + 'static,
{
    fn event_type(&self) -> SlackEventType {
        SlackEventType::Message
    }

    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SlackEvent::Message(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };
        if self.is_own_or_system(&event.user_id) {
            debug!(
                event_name = "slack.message.skipped",
                correlation_id = %ctx.correlation_id,
                user_id = %event.user_id,
                "message from slackbot or self ignored"
            );
            return Ok(HandlerResult::Ignored);
        }

        let command = parse_message(&event.text, self.bot_user_id.as_deref());
        if command == TagCommand::Ignore {
            return Ok(HandlerResult::Ignored);
        }

        let command_ctx = CommandContext {
            channel_id: event.channel_id.clone(),
            user_id: event.user_id.clone(),
            correlation_id: ctx.correlation_id.clone(),
        };
        let message = self.router.route(command, &command_ctx).await?;
        Ok(match message {
            Some(message) => HandlerResult::Responded(ChatReply {
                channel_id: event.channel_id.clone(),
                user_id: event.user_id.clone(),
                ephemeral: true,
                message,
            }),
            None => HandlerResult::Processed,
        })
    }
}

/// Greets members joining the configured help channel.
pub struct MemberJoinedHandler {
    help_channel: Option<String>,
}

impl MemberJoinedHandler {
    pub fn new(help_channel: Option<String>) -> Self {
        Self { help_channel }
    }
}

#[async_trait]
impl EventHandler for MemberJoinedHandler {
    fn event_type(&self) -> SlackEventType {
        SlackEventType::MemberJoinedChannel
    }

    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SlackEvent::MemberJoinedChannel(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };
        if self.help_channel.as_deref() != Some(event.channel_id.as_str()) {
            return Ok(HandlerResult::Ignored);
        }

        debug!(
            event_name = "slack.member_joined.welcomed",
            correlation_id = %ctx.correlation_id,
            user_id = %event.user_id,
            "posting welcome help"
        );
        Ok(HandlerResult::Responded(ChatReply {
            channel_id: event.channel_id.clone(),
            user_id: event.user_id.clone(),
            ephemeral: true,
            message: blocks::welcome_message(),
        }))
    }
}
