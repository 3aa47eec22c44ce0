use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use tagbot_core::domain::component::{Component, ComponentChannel};
use tagbot_core::domain::tag::{normalize_tag_name, ResolutionEntry};
use tagbot_core::resolution::store::{StoreError, TagSnapshot, TagStore};

use super::{ComponentRepository, RepositoryError};

/// Process-local `TagStore` with the same association rules as the SQL repository.
#[derive(Default)]
pub struct InMemoryTagStore {
    components: RwLock<HashMap<String, Component>>,
    tags: RwLock<Vec<(String, String, String)>>,
}

impl InMemoryTagStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_component(self, component: Component) -> Self {
        self.components.write().await.insert(component.channel.0.clone(), component);
        self
    }

    fn entry_for(component: &Component, tag: &str, owner: &str) -> ResolutionEntry {
        ResolutionEntry {
            tag_name: tag.to_string(),
            owner_reference: owner.to_string(),
            component_channel: component.channel.0.clone(),
            support_channel: component.support_channel.clone(),
            runbook_url: component.runbook_url.clone(),
        }
    }

    async fn entries_where(&self, predicate: impl Fn(&str) -> bool) -> Vec<ResolutionEntry> {
        let components = self.components.read().await;
        let tags = self.tags.read().await;
        tags.iter()
            .filter(|(tag, _, _)| predicate(tag))
            .filter_map(|(tag, channel, owner)| {
                components.get(channel).map(|component| Self::entry_for(component, tag, owner))
            })
            .collect()
    }
}

#[async_trait]
impl TagStore for InMemoryTagStore {
    async fn fetch_all(&self) -> Result<TagSnapshot, StoreError> {
        Ok(TagSnapshot::from_entries(self.entries_where(|_| true).await))
    }

    async fn fetch_by_name(&self, name: &str) -> Result<Vec<ResolutionEntry>, StoreError> {
        let key = normalize_tag_name(name);
        Ok(self.entries_where(|tag| tag == key).await)
    }

    async fn create_or_associate(&self, entry: &ResolutionEntry) -> Result<(), StoreError> {
        let components = self.components.read().await;
        let Some(component) = components.get(&entry.component_channel) else {
            return Err(StoreError::ComponentNotFound {
                component_channel: entry.component_channel.clone(),
            });
        };

        let owner = if entry.owner_reference.trim().is_empty() {
            component.owner_reference.clone()
        } else {
            entry.owner_reference.clone()
        };
        let row = (normalize_tag_name(&entry.tag_name), entry.component_channel.clone(), owner);

        let mut tags = self.tags.write().await;
        if !tags.contains(&row) {
            tags.push(row);
        }
        Ok(())
    }
}

#[async_trait]
impl ComponentRepository for InMemoryTagStore {
    async fn find_by_channel(
        &self,
        channel: &ComponentChannel,
    ) -> Result<Option<Component>, RepositoryError> {
        Ok(self.components.read().await.get(&channel.0).cloned())
    }

    async fn list(&self) -> Result<Vec<Component>, RepositoryError> {
        let mut components: Vec<_> = self.components.read().await.values().cloned().collect();
        components.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(components)
    }

    async fn save(&self, component: Component) -> Result<(), RepositoryError> {
        self.components.write().await.insert(component.channel.0.clone(), component);
        Ok(())
    }
}
