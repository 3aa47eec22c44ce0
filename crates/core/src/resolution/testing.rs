use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::tag::{normalize_tag_name, ResolutionEntry};
use crate::resolution::store::{StoreError, TagSnapshot, TagStore};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Failure {
    FetchAll,
    FetchByName,
    Create,
}

/// Store double with per-operation failure injection.
#[derive(Default)]
pub(crate) struct FakeStore {
    owners: Mutex<HashMap<String, String>>,
    rows: Mutex<Vec<ResolutionEntry>>,
    failures: Mutex<Vec<Failure>>,
}

pub(crate) fn entry(tag: &str, component_channel: &str, owner: &str) -> ResolutionEntry {
    ResolutionEntry {
        tag_name: tag.to_string(),
        owner_reference: owner.to_string(),
        component_channel: component_channel.to_string(),
        support_channel: Some(format!("{component_channel}-support")),
        runbook_url: format!("http://runbooks/{component_channel}"),
    }
}

impl FakeStore {
    pub(crate) fn with_component(self, channel: &str, owner: &str) -> Self {
        self.owners.lock().expect("owners lock").insert(channel.to_string(), owner.to_string());
        self
    }

    pub(crate) fn with_entry(self, entry: ResolutionEntry) -> Self {
        let this = self.with_component(&entry.component_channel, &entry.owner_reference);
        this.rows.lock().expect("rows lock").push(entry.normalized());
        this
    }

    pub(crate) fn fail(&self, failure: Failure) {
        self.failures.lock().expect("failures lock").push(failure);
    }

    fn check(&self, failure: Failure) -> Result<(), StoreError> {
        if self.failures.lock().expect("failures lock").contains(&failure) {
            return Err(StoreError::Unavailable(format!("injected {failure:?} failure")));
        }
        Ok(())
    }
}

#[async_trait]
impl TagStore for FakeStore {
    async fn fetch_all(&self) -> Result<TagSnapshot, StoreError> {
        self.check(Failure::FetchAll)?;
        Ok(TagSnapshot::from_entries(self.rows.lock().expect("rows lock").clone()))
    }

    async fn fetch_by_name(&self, name: &str) -> Result<Vec<ResolutionEntry>, StoreError> {
        self.check(Failure::FetchByName)?;
        let key = normalize_tag_name(name);
        let rows = self.rows.lock().expect("rows lock");
        Ok(rows.iter().filter(|row| row.tag_name == key).cloned().collect())
    }

    async fn create_or_associate(&self, registration: &ResolutionEntry) -> Result<(), StoreError> {
        self.check(Failure::Create)?;
        let channel = &registration.component_channel;
        let Some(component_owner) = self.owners.lock().expect("owners lock").get(channel).cloned()
        else {
            return Err(StoreError::ComponentNotFound { component_channel: channel.clone() });
        };

        let owner = if registration.owner_reference.is_empty() {
            component_owner
        } else {
            registration.owner_reference.clone()
        };
        let stored = entry(&normalize_tag_name(&registration.tag_name), channel, &owner);

        let mut rows = self.rows.lock().expect("rows lock");
        if !rows.contains(&stored) {
            rows.push(stored);
        }
        Ok(())
    }
}
