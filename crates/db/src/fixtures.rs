use serde::Serialize;
use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

const DEMO_COMPONENT_CHANNELS: &[&str] = &["C0DEPLOY", "C0GEMFIRE", "C0EDGE"];

/// (tag, component channel) rows the demo dataset guarantees.
const DEMO_TAGS: &[(&str, &str)] = &[
    ("deploy", "C0DEPLOY"),
    ("pipeline", "C0DEPLOY"),
    ("gemfire", "C0GEMFIRE"),
    ("cache", "C0GEMFIRE"),
    ("load balancer", "C0EDGE"),
    ("dns", "C0EDGE"),
    ("cache", "C0EDGE"),
];

/// Deterministic components and tags for local runs and integration tests.
pub struct DemoDataset;

impl DemoDataset {
    pub const SQL: &str = include_str!("../../../config/fixtures/demo_seed_data.sql");

    /// Loads the demo rows. Safe to run repeatedly.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;
        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        let mut tags = DEMO_TAGS.iter().map(|(tag, _)| *tag).collect::<Vec<_>>();
        tags.sort_unstable();
        tags.dedup();

        Ok(SeedResult {
            components_seeded: DEMO_COMPONENT_CHANNELS.len(),
            tag_rows_seeded: DEMO_TAGS.len(),
            distinct_tags: tags,
        })
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        for channel in DEMO_COMPONENT_CHANNELS {
            let exists: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM components WHERE slack_channel = ?1)",
            )
            .bind(*channel)
            .fetch_one(pool)
            .await?;
            checks.push((format!("component:{channel}"), exists == 1));
        }

        for (tag, channel) in DEMO_TAGS {
            let exists: i64 = sqlx::query_scalar(
                "SELECT EXISTS(
                     SELECT 1 FROM tags t JOIN components c ON c.id = t.component_id
                     WHERE t.tag = ?1 AND c.slack_channel = ?2
                 )",
            )
            .bind(*tag)
            .bind(*channel)
            .fetch_one(pool)
            .await?;
            checks.push((format!("tag:{tag}@{channel}"), exists == 1));
        }

        let all_present = checks.iter().all(|(_, ok)| *ok);
        Ok(VerificationResult { all_present, checks })
    }

    /// Removes the demo components; their tags go with them.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;
        for channel in DEMO_COMPONENT_CHANNELS {
            sqlx::query(
                "DELETE FROM tags WHERE component_id IN
                     (SELECT id FROM components WHERE slack_channel = ?1)",
            )
            .bind(*channel)
            .execute(&mut *tx)
            .await?;
            sqlx::query("DELETE FROM components WHERE slack_channel = ?1")
                .bind(*channel)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct SeedResult {
    pub components_seeded: usize,
    pub tag_rows_seeded: usize,
    pub distinct_tags: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(String, bool)>,
}
