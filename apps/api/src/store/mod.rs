//! Local persistence for engagements and their linked job/candidate records.
//!
//! The sync engine only reads jobs and candidates; on engagements it touches
//! nothing but the sync-status columns and the timeline.

use anyhow::Result;
use async_trait::async_trait;

use crate::models::engagement::{
    Candidate, Engagement, Job, SyncCounts, SyncRecord, TimelineEvent,
};

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::PgEngagementStore;

/// Carried by the sync engine as `Arc<dyn EngagementStore>`.
#[async_trait]
pub trait EngagementStore: Send + Sync {
    async fn get_engagement(&self, id: &str) -> Result<Option<Engagement>>;

    async fn get_job(&self, id: &str) -> Result<Option<Job>>;

    async fn get_candidate(&self, id: &str) -> Result<Option<Candidate>>;

    /// Up to `limit` engagements with `synced = false`, oldest first.
    async fn list_unsynced(&self, limit: usize) -> Result<Vec<Engagement>>;

    /// Sets all sync-status fields at once. Never called before the remote
    /// write has succeeded.
    async fn mark_synced(&self, id: &str, record: &SyncRecord) -> Result<()>;

    async fn append_timeline(&self, id: &str, event: &TimelineEvent) -> Result<()>;

    async fn find_by_opportunity(&self, opportunity_id: i64) -> Result<Option<Engagement>>;

    async fn count_by_sync_flag(&self) -> Result<SyncCounts>;
}
