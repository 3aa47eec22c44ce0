use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Canonical cache/store key for a tag: trimmed and lower-cased.
pub fn normalize_tag_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// One stored fact a tag resolves to.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolutionEntry {
    pub tag_name: String,
    pub owner_reference: String,
    pub component_channel: String,
    pub support_channel: Option<String>,
    pub runbook_url: String,
}

impl ResolutionEntry {
    /// Registration request for `tag_name` on a component. Owner, support channel and runbook
    /// are filled in by the backing store on re-fetch.
    pub fn registration(tag_name: &str, component_channel: impl Into<String>) -> Self {
        Self {
            tag_name: normalize_tag_name(tag_name),
            owner_reference: String::new(),
            component_channel: component_channel.into(),
            support_channel: None,
            runbook_url: String::new(),
        }
    }

    pub fn with_owner(mut self, owner_reference: impl Into<String>) -> Self {
        self.owner_reference = owner_reference.into();
        self
    }

    pub fn normalized(mut self) -> Self {
        self.tag_name = normalize_tag_name(&self.tag_name);
        self
    }

    pub fn has_runbook(&self) -> bool {
        !self.runbook_url.trim().is_empty()
    }

    /// Rejects registrations the store could never satisfy.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.tag_name.trim().is_empty() {
            return Err(DomainError::BlankTagName);
        }
        if self.component_channel.trim().is_empty() {
            return Err(DomainError::InvariantViolation(
                "component channel must not be blank".to_owned(),
            ));
        }
        Ok(())
    }
}
