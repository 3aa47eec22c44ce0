//! Chat layer for the tag bot.
//!
//! - **Commands** (`commands`) - message grammar (`tag: ...`, `@bot tag #chan a, b`, `help`)
//!   and the resolver-backed command service
//! - **Events** (`events`) - message and member-join handlers behind an `EventDispatcher`
//! - **Block Kit** (`blocks`) - entry lines, help texts, error cards
//!
//! No transport lives here: the dispatcher returns `ChatReply` values for whatever connection
//! the host process runs.
//!
//! ```text
//! Slack event → EventDispatcher → MessageHandler → CommandRouter → TagResolver
//!                    ↓
//!               ChatReply ← Block Kit message
//! ```

pub mod blocks;
pub mod commands;
pub mod events;

pub use commands::{parse_message, ResolverCommandService, TagCommand, TagCommandService};
pub use events::{tag_dispatcher, ChatReply, EventContext, EventDispatcher, HandlerResult};
