use async_trait::async_trait;
use thiserror::Error;

use tagbot_core::domain::component::{Component, ComponentChannel};
use tagbot_core::resolution::store::StoreError;

pub mod component;
pub mod memory;
pub mod tag;

pub use component::SqlComponentRepository;
pub use memory::InMemoryTagStore;
pub use tag::{SqlTagRepository, TagRecord};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("component channel `{0}` is not registered")]
    ComponentNotFound(String),
}

impl From<RepositoryError> for StoreError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::ComponentNotFound(component_channel) => {
                StoreError::ComponentNotFound { component_channel }
            }
            RepositoryError::Database(error) => StoreError::Unavailable(error.to_string()),
            RepositoryError::Decode(message) => StoreError::Decode(message),
        }
    }
}

#[async_trait]
pub trait ComponentRepository: Send + Sync {
    async fn find_by_channel(
        &self,
        channel: &ComponentChannel,
    ) -> Result<Option<Component>, RepositoryError>;
    async fn list(&self) -> Result<Vec<Component>, RepositoryError>;
    async fn save(&self, component: Component) -> Result<(), RepositoryError>;
}
