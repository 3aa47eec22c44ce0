pub mod config;
pub mod domain;
pub mod errors;
pub mod resolution;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, MatchingConfig};
pub use domain::component::{Component, ComponentChannel};
pub use domain::tag::{normalize_tag_name, ResolutionEntry};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use resolution::{
    CacheError, EntryCache, MatchPolicy, ResolutionResult, StoreError, TagResolver, TagSnapshot,
    TagStore,
};
