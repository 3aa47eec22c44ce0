use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::Row;
use tracing::debug;

use tagbot_core::domain::tag::{normalize_tag_name, ResolutionEntry};
use tagbot_core::resolution::store::{StoreError, TagSnapshot, TagStore};

use super::RepositoryError;
use crate::DbPool;

const ENTRY_COLUMNS: &str = "SELECT t.tag, t.owner_slack_id, c.slack_channel, c.support_channel, c.runbook_url
     FROM tags t JOIN components c ON c.id = t.component_id";

/// A stored tag row as seen from its component.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TagRecord {
    pub tag: String,
    pub owner_reference: String,
    pub created_at: DateTime<Utc>,
}

/// `TagStore` over the `tags` and `components` tables. An entry is one tag row joined with
/// its component.
pub struct SqlTagRepository {
    pool: DbPool,
}

impl SqlTagRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn entries(&self) -> Result<Vec<ResolutionEntry>, RepositoryError> {
        let rows = sqlx::query(&format!("{ENTRY_COLUMNS} ORDER BY t.tag ASC, t.id ASC"))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_entry).collect::<Result<Vec<_>, _>>()
    }

    /// Rows stored with different casing match too; `tags.tag` is `COLLATE NOCASE`.
    pub async fn entries_named(&self, name: &str) -> Result<Vec<ResolutionEntry>, RepositoryError> {
        let rows = sqlx::query(&format!("{ENTRY_COLUMNS} WHERE t.tag = ? ORDER BY t.id ASC"))
            .bind(normalize_tag_name(name))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_entry).collect::<Result<Vec<_>, _>>()
    }

    /// Inserts the tag row for `entry`, resolving the component by channel. The tag owner
    /// falls back to the component owner when the entry carries none.
    pub async fn associate(&self, entry: &ResolutionEntry) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let component = sqlx::query("SELECT id, owner_slack_id FROM components WHERE slack_channel = ?")
            .bind(&entry.component_channel)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(component) = component else {
            return Err(RepositoryError::ComponentNotFound(entry.component_channel.clone()));
        };

        let component_id: i64 =
            component.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let component_owner: String =
            component.try_get("owner_slack_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let owner = if entry.owner_reference.trim().is_empty() {
            component_owner
        } else {
            entry.owner_reference.clone()
        };

        let inserted = sqlx::query(
            "INSERT INTO tags (tag, component_id, owner_slack_id) VALUES (?, ?, ?)
             ON CONFLICT(tag, component_id, owner_slack_id) DO NOTHING",
        )
        .bind(normalize_tag_name(&entry.tag_name))
        .bind(component_id)
        .bind(&owner)
        .execute(&mut *tx)
        .await?
        .rows_affected()
            > 0;

        tx.commit().await?;
        debug!(
            event_name = "db.tag.associated",
            tag = %entry.tag_name,
            component_channel = %entry.component_channel,
            inserted,
            "tag association written"
        );
        Ok(inserted)
    }

    pub async fn list_for_component(&self, channel: &str) -> Result<Vec<TagRecord>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT t.tag, t.owner_slack_id, t.created_at
             FROM tags t JOIN components c ON c.id = t.component_id
             WHERE c.slack_channel = ?
             ORDER BY t.tag ASC",
        )
        .bind(channel)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_record).collect::<Result<Vec<_>, _>>()
    }
}

fn row_to_entry(row: &sqlx::sqlite::SqliteRow) -> Result<ResolutionEntry, RepositoryError> {
    let tag_name: String = row.try_get("tag").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let owner_reference: String =
        row.try_get("owner_slack_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let component_channel: String =
        row.try_get("slack_channel").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let support_channel: Option<String> =
        row.try_get("support_channel").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let runbook_url: String =
        row.try_get("runbook_url").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(ResolutionEntry {
        tag_name: normalize_tag_name(&tag_name),
        owner_reference,
        component_channel,
        support_channel: support_channel.filter(|value| !value.trim().is_empty()),
        runbook_url,
    })
}

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<TagRecord, RepositoryError> {
    let tag: String = row.try_get("tag").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let owner_reference: String =
        row.try_get("owner_slack_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("created_at `{created_at_str}`: {e}")))?;

    Ok(TagRecord { tag, owner_reference, created_at })
}

#[async_trait]
impl TagStore for SqlTagRepository {
    async fn fetch_all(&self) -> Result<TagSnapshot, StoreError> {
        Ok(TagSnapshot::from_entries(self.entries().await?))
    }

    async fn fetch_by_name(&self, name: &str) -> Result<Vec<ResolutionEntry>, StoreError> {
        Ok(self.entries_named(name).await?)
    }

    async fn create_or_associate(&self, entry: &ResolutionEntry) -> Result<(), StoreError> {
        self.associate(entry).await?;
        Ok(())
    }
}
