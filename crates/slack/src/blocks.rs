use serde::Serialize;

use tagbot_core::domain::tag::ResolutionEntry;
use tagbot_core::resolution::ResolutionResult;

pub const NOT_FOUND_TEXT: &str = "I couldn't find anything relevant. Please contact your local (or remote) owner if you think you have a tag which should be added";
pub const UNKNOWN_COMPONENT_TEXT: &str = "This component is not in the database - please reach out to the bot maintainers to get your component added";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextObject {
    Plain { text: String },
    Mrkdwn { text: String },
}

impl TextObject {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Plain { text: text.into() }
    }

    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Plain { text } | Self::Mrkdwn { text } => text,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Section { block_id: String, text: TextObject },
    Context { block_id: String, elements: Vec<TextObject> },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageTemplate {
    pub fallback_text: String,
    pub blocks: Vec<Block>,
}

impl MessageTemplate {
    /// Every section's text, in block order.
    pub fn section_texts(&self) -> Vec<&str> {
        self.blocks
            .iter()
            .filter_map(|block| match block {
                Block::Section { text, .. } => Some(text.text()),
                Block::Context { .. } => None,
            })
            .collect()
    }
}

pub struct MessageBuilder {
    fallback_text: String,
    blocks: Vec<Block>,
}

impl MessageBuilder {
    pub fn new(fallback_text: impl Into<String>) -> Self {
        Self { fallback_text: fallback_text.into(), blocks: Vec::new() }
    }

    pub fn section<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut SectionBuilder),
    {
        let mut builder = SectionBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Section { block_id: block_id.into(), text: builder.build() });
        self
    }

    pub fn context<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut ContextBuilder),
    {
        let mut builder = ContextBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Context { block_id: block_id.into(), elements: builder.build() });
        self
    }

    pub fn build(self) -> MessageTemplate {
        MessageTemplate { fallback_text: self.fallback_text, blocks: self.blocks }
    }
}

#[derive(Default)]
pub struct SectionBuilder {
    text: Option<TextObject>,
}

impl SectionBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::plain(text));
        self
    }

    pub fn mrkdwn(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::mrkdwn(text));
        self
    }

    fn build(self) -> TextObject {
        self.text.unwrap_or_else(|| TextObject::plain(""))
    }
}

#[derive(Default)]
pub struct ContextBuilder {
    elements: Vec<TextObject>,
}

impl ContextBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.elements.push(TextObject::plain(text));
        self
    }

    fn build(self) -> Vec<TextObject> {
        self.elements
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HelpTopic {
    Base,
    Tags,
    Add,
}

pub fn user_mention(user_id: &str) -> String {
    format!("<@{user_id}>")
}

pub fn channel_mention(channel_id: &str) -> String {
    format!("<#{channel_id}>")
}

/// One line per entry: tag, owner, component channel, support channel, runbook.
pub fn entry_line(entry: &ResolutionEntry) -> String {
    let support = entry
        .support_channel
        .as_deref()
        .map(channel_mention)
        .unwrap_or_else(|| "_none_".to_owned());
    let runbook = if entry.has_runbook() { entry.runbook_url.as_str() } else { "_none_" };

    format!(
        "*tag:* {}, *owner:* {}, *component-channel:* {}, *support-channel:* {}, *runbook:* {}",
        entry.tag_name,
        user_mention(&entry.owner_reference),
        channel_mention(&entry.component_channel),
        support,
        runbook
    )
}

/// Renders a query result with repeated entries collapsed.
pub fn resolution_message(result: &ResolutionResult) -> MessageTemplate {
    let entries = result.deduplicated();
    if entries.is_empty() {
        return MessageBuilder::new(NOT_FOUND_TEXT)
            .section("tag.lookup.empty.v1", |section| {
                section.plain(NOT_FOUND_TEXT);
            })
            .build();
    }

    let lines = entries.iter().map(entry_line).collect::<Vec<_>>().join("\n");
    let noun = if entries.len() == 1 { "entry" } else { "entries" };
    MessageBuilder::new(format!("Found {} matching {noun}", entries.len()))
        .section("tag.lookup.entries.v1", |section| {
            section.mrkdwn(lines);
        })
        .build()
}

pub fn already_added_line(tag: &str) -> String {
    format!("Tag _{tag}_ is already marked for this component")
}

pub fn added_line(tag: &str, component_channel: &str) -> String {
    format!("Tag _{tag}_ added for {}", channel_mention(component_channel))
}

pub fn registration_message(lines: &[String]) -> MessageTemplate {
    MessageBuilder::new("Tag registration summary")
        .section("tag.register.summary.v1", |section| {
            section.mrkdwn(lines.join("\n"));
        })
        .build()
}

pub fn unknown_component_message() -> MessageTemplate {
    MessageBuilder::new(UNKNOWN_COMPONENT_TEXT)
        .section("tag.register.unknown_component.v1", |section| {
            section.plain(UNKNOWN_COMPONENT_TEXT);
        })
        .build()
}

pub fn error_message(summary: &str, correlation_id: &str) -> MessageTemplate {
    MessageBuilder::new(summary.to_owned())
        .section("tag.error.summary.v1", |section| {
            section.mrkdwn(format!(":warning: {summary}"));
        })
        .context("tag.error.context.v1", |context| {
            context.plain(format!("Correlation ID: {correlation_id}"));
        })
        .build()
}

pub fn help_message(topic: HelpTopic) -> MessageTemplate {
    let text = match topic {
        HelpTopic::Base => {
            "type _tag: [keyword]_ to see the component, runbook, appropriate channels, and the owner associated with this tag\n\n\
             type _help_ in this channel to see this message again at any time\n\n\
             type _help tags_ for further information about adding tags\n\n\
             type _help add_ for help adding other details to the database"
        }
        HelpTopic::Tags => {
            "To add tags to the bot, use the following syntax:\n\n\
             _@[bot] tag [#component-channel] [tag1], [tag2], ..._"
        }
        HelpTopic::Add => {
            "Components are added by the bot maintainers with `tagbot` operator commands. Ask them to register yours."
        }
    };

    MessageBuilder::new("Tag bot help")
        .section("tag.help.summary.v1", |section| {
            section.mrkdwn(text);
        })
        .build()
}

pub fn welcome_message() -> MessageTemplate {
    MessageBuilder::new("Welcome! Here is how to get help from the bot")
        .section("tag.help.welcome.v1", |section| {
            section.mrkdwn(
                "Hi! It looks like this is your first time joining this channel.\n\
                 Please follow this guide for getting help from the bot:\n\n\
                 type _tag: [keyword]_ to see the component, runbook, appropriate channels, and the owner associated with this tag\n\n\
                 type _help_ in this channel to see this message again at any time",
            );
        })
        .build()
}

#[cfg(test)]
mod tests {
    use tagbot_core::domain::tag::ResolutionEntry;
    use tagbot_core::resolution::ResolutionResult;

    use super::{
        entry_line, error_message, help_message, resolution_message, Block, HelpTopic,
        MessageBuilder, TextObject, NOT_FOUND_TEXT,
    };

    fn deploy(channel: &str) -> ResolutionEntry {
        ResolutionEntry {
            tag_name: "deploy".to_owned(),
            owner_reference: "U1".to_owned(),
            component_channel: channel.to_owned(),
            support_channel: Some("CHELP".to_owned()),
            runbook_url: "https://runbooks/deploy".to_owned(),
        }
    }

    fn result_with(entries: Vec<ResolutionEntry>) -> ResolutionResult {
        ResolutionResult {
            found: !entries.is_empty(),
            dispatched: 1,
            completed: 1,
            entries,
        }
    }

    #[test]
    fn message_builder_creates_typed_block_structure() {
        let message = MessageBuilder::new("fallback")
            .section("tag.summary.v1", |section| {
                section.mrkdwn("*Summary*");
            })
            .context("tag.summary.context.v1", |context| {
                context.plain("details");
            })
            .build();

        assert_eq!(message.blocks.len(), 2);
        assert!(matches!(
            &message.blocks[0],
            Block::Section {
                block_id,
                text: TextObject::Mrkdwn { .. }
            } if block_id == "tag.summary.v1"
        ));
        assert_eq!(message.section_texts(), vec!["*Summary*"]);
    }

    #[test]
    fn entry_line_links_owner_and_channels() {
        assert_eq!(
            entry_line(&deploy("C1")),
            "*tag:* deploy, *owner:* <@U1>, *component-channel:* <#C1>, *support-channel:* <#CHELP>, *runbook:* https://runbooks/deploy"
        );

        let mut bare = deploy("C1");
        bare.support_channel = None;
        bare.runbook_url = String::new();
        assert!(entry_line(&bare).ends_with("*support-channel:* _none_, *runbook:* _none_"));
    }

    #[test]
    fn resolution_message_collapses_repeated_entries() {
        let message = resolution_message(&result_with(vec![deploy("C1"), deploy("C2"), deploy("C1")]));

        let text = message.section_texts().join("\n");
        assert_eq!(text.lines().count(), 2);
        assert_eq!(message.fallback_text, "Found 2 matching entries");
    }

    #[test]
    fn empty_result_uses_not_found_text() {
        let message = resolution_message(&result_with(Vec::new()));

        assert_eq!(message.section_texts(), vec![NOT_FOUND_TEXT]);
    }

    #[test]
    fn error_template_contains_correlation_id() {
        let message = error_message("Cannot process request", "req-123");
        let elements = if let Block::Context { elements, .. } = &message.blocks[1] {
            Some(elements)
        } else {
            None
        };
        assert!(elements.is_some(), "expected context block");
        let elements = elements.expect("context block asserted above");
        assert!(matches!(
            elements.first(),
            Some(TextObject::Plain { text }) if text.contains("req-123")
        ));
    }

    #[test]
    fn tag_help_shows_registration_syntax() {
        let message = help_message(HelpTopic::Tags);

        assert!(message.section_texts()[0].contains("_@[bot] tag [#component-channel] [tag1], [tag2], ..._"));
        assert!(help_message(HelpTopic::Base).section_texts()[0].contains("_tag: [keyword]_"));
    }
}
