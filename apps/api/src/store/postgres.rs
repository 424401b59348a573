use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;

use crate::models::engagement::{
    Candidate, Engagement, Job, SyncCounts, SyncRecord, TimelineEvent,
};
use crate::store::EngagementStore;

const ENGAGEMENT_COLUMNS: &str = r#"
    id, job_id, candidate_id, client_name, client_email, client_phone,
    budget, duration, end_date, status, synced, crm_opportunity_id,
    crm_contact_id, last_synced_at, created_at
"#;

#[derive(Clone)]
pub struct PgEngagementStore {
    pool: PgPool,
}

impl PgEngagementStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EngagementStore for PgEngagementStore {
    async fn get_engagement(&self, id: &str) -> Result<Option<Engagement>> {
        Ok(sqlx::query_as::<_, Engagement>(&format!(
            "SELECT {ENGAGEMENT_COLUMNS} FROM engagements WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn get_job(&self, id: &str) -> Result<Option<Job>> {
        Ok(
            sqlx::query_as::<_, Job>("SELECT id, title, description FROM jobs WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn get_candidate(&self, id: &str) -> Result<Option<Candidate>> {
        Ok(sqlx::query_as::<_, Candidate>(
            "SELECT id, name, skills FROM candidates WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn list_unsynced(&self, limit: usize) -> Result<Vec<Engagement>> {
        let limit = i64::try_from(limit).context("batch limit out of range")?;
        Ok(sqlx::query_as::<_, Engagement>(&format!(
            r#"
            SELECT {ENGAGEMENT_COLUMNS}
            FROM engagements
            WHERE synced = false
            ORDER BY created_at ASC, id ASC
            LIMIT $1
            "#
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn mark_synced(&self, id: &str, record: &SyncRecord) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE engagements
            SET synced = true,
                crm_opportunity_id = $2,
                crm_contact_id = $3,
                last_synced_at = $4
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(record.opportunity_id)
        .bind(record.contact_id)
        .bind(record.synced_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            anyhow::bail!("Engagement {id} disappeared before its sync status could be saved");
        }

        info!(
            "Marked engagement {id} synced (opportunity {}, contact {})",
            record.opportunity_id, record.contact_id
        );
        Ok(())
    }

    async fn append_timeline(&self, id: &str, event: &TimelineEvent) -> Result<()> {
        let entry = serde_json::to_value(event)?;
        sqlx::query(
            "UPDATE engagements SET timeline = timeline || jsonb_build_array($2::jsonb) WHERE id = $1",
        )
        .bind(id)
        .bind(entry)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_opportunity(&self, opportunity_id: i64) -> Result<Option<Engagement>> {
        Ok(sqlx::query_as::<_, Engagement>(&format!(
            "SELECT {ENGAGEMENT_COLUMNS} FROM engagements WHERE crm_opportunity_id = $1 LIMIT 1"
        ))
        .bind(opportunity_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn count_by_sync_flag(&self) -> Result<SyncCounts> {
        let (synced, unsynced): (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE synced),
                COUNT(*) FILTER (WHERE NOT synced)
            FROM engagements
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(SyncCounts { synced, unsynced })
    }
}
