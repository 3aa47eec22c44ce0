use sqlx::Row;

use tagbot_core::domain::component::{Component, ComponentChannel};

use super::{ComponentRepository, RepositoryError};
use crate::DbPool;

pub struct SqlComponentRepository {
    pool: DbPool,
}

impl SqlComponentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_component(row: &sqlx::sqlite::SqliteRow) -> Result<Component, RepositoryError> {
    let name: String = row.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let channel: String =
        row.try_get("slack_channel").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let support_channel: Option<String> =
        row.try_get("support_channel").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let runbook_url: String =
        row.try_get("runbook_url").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let owner_reference: String =
        row.try_get("owner_slack_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(Component {
        name,
        channel: ComponentChannel(channel),
        support_channel: support_channel.filter(|value| !value.trim().is_empty()),
        runbook_url,
        owner_reference,
    })
}

#[async_trait::async_trait]
impl ComponentRepository for SqlComponentRepository {
    async fn find_by_channel(
        &self,
        channel: &ComponentChannel,
    ) -> Result<Option<Component>, RepositoryError> {
        let row = sqlx::query(
            "SELECT name, slack_channel, support_channel, runbook_url, owner_slack_id
             FROM components WHERE slack_channel = ?",
        )
        .bind(&channel.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_component).transpose()
    }

    async fn list(&self) -> Result<Vec<Component>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT name, slack_channel, support_channel, runbook_url, owner_slack_id
             FROM components ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_component).collect::<Result<Vec<_>, _>>()
    }

    async fn save(&self, component: Component) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO components (name, slack_channel, support_channel, runbook_url, owner_slack_id)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(slack_channel) DO UPDATE SET
                 name = excluded.name,
                 support_channel = excluded.support_channel,
                 runbook_url = excluded.runbook_url,
                 owner_slack_id = excluded.owner_slack_id",
        )
        .bind(&component.name)
        .bind(&component.channel.0)
        .bind(&component.support_channel)
        .bind(&component.runbook_url)
        .bind(&component.owner_reference)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tagbot_core::domain::component::{Component, ComponentChannel};

    use super::SqlComponentRepository;
    use crate::repositories::ComponentRepository;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> SqlComponentRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SqlComponentRepository::new(pool)
    }

    fn component(channel: &str, name: &str) -> Component {
        Component {
            name: name.to_string(),
            channel: ComponentChannel(channel.to_string()),
            support_channel: None,
            runbook_url: format!("https://runbooks/{channel}"),
            owner_reference: "U1".to_string(),
        }
    }

    #[tokio::test]
    async fn save_then_find_by_channel() {
        let repo = setup().await;
        repo.save(component("C1", "Deploy")).await.expect("save");

        let found = repo.find_by_channel(&ComponentChannel("C1".to_string())).await.expect("find");

        assert_eq!(found, Some(component("C1", "Deploy")));
        assert!(repo
            .find_by_channel(&ComponentChannel("C2".to_string()))
            .await
            .expect("find")
            .is_none());
    }

    #[tokio::test]
    async fn save_updates_existing_channel() {
        let repo = setup().await;
        repo.save(component("C1", "Deploy")).await.expect("save");

        let mut renamed = component("C1", "Release Pipeline");
        renamed.support_channel = Some("C1HELP".to_string());
        repo.save(renamed.clone()).await.expect("upsert");

        let all = repo.list().await.expect("list");
        assert_eq!(all, vec![renamed]);
    }

    #[tokio::test]
    async fn list_orders_by_name() {
        let repo = setup().await;
        repo.save(component("C2", "Zookeeper")).await.expect("save");
        repo.save(component("C1", "Artifactory")).await.expect("save");

        let names: Vec<_> =
            repo.list().await.expect("list").into_iter().map(|component| component.name).collect();

        assert_eq!(names, vec!["Artifactory".to_string(), "Zookeeper".to_string()]);
    }
}
