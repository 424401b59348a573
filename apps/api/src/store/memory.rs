//! In-memory `EngagementStore` for exercising the engine without PostgreSQL.

use std::collections::BTreeMap;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};

use crate::models::engagement::{
    Candidate, Engagement, Job, SyncCounts, SyncRecord, TimelineEvent,
};
use crate::store::EngagementStore;

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    engagements: BTreeMap<String, Engagement>,
    jobs: BTreeMap<String, Job>,
    candidates: BTreeMap<String, Candidate>,
    timelines: BTreeMap<String, Vec<TimelineEvent>>,
    fail_listing: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_job(&self, id: &str, title: &str, description: &str) {
        self.inner.lock().unwrap().jobs.insert(
            id.to_string(),
            Job {
                id: id.to_string(),
                title: title.to_string(),
                description: description.to_string(),
            },
        );
    }

    pub fn insert_candidate(&self, id: &str, name: &str, skills: &[&str]) {
        self.inner.lock().unwrap().candidates.insert(
            id.to_string(),
            Candidate {
                id: id.to_string(),
                name: name.to_string(),
                skills: skills.iter().map(|s| s.to_string()).collect(),
            },
        );
    }

    pub fn insert_engagement(&self, engagement: Engagement) {
        self.inner
            .lock()
            .unwrap()
            .engagements
            .insert(engagement.id.clone(), engagement);
    }

    pub fn engagement(&self, id: &str) -> Engagement {
        self.inner.lock().unwrap().engagements[id].clone()
    }

    pub fn timeline(&self, id: &str) -> Vec<TimelineEvent> {
        self.inner
            .lock()
            .unwrap()
            .timelines
            .get(id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn fail_listing(&self) {
        self.inner.lock().unwrap().fail_listing = true;
    }
}

/// Builds an unsynced engagement. `seq` orders creation time.
pub fn engagement(id: &str, seq: i64, job_id: &str, candidate_id: &str) -> Engagement {
    Engagement {
        id: id.to_string(),
        job_id: job_id.to_string(),
        candidate_id: candidate_id.to_string(),
        client_name: Some("Acme Corp".to_string()),
        client_email: Some("ops@acme.test".to_string()),
        client_phone: None,
        budget: Some("$12,000".to_string()),
        duration: Some("6 months".to_string()),
        end_date: None,
        status: "pending".to_string(),
        synced: false,
        crm_opportunity_id: None,
        crm_contact_id: None,
        last_synced_at: None,
        created_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(seq),
    }
}

#[async_trait]
impl EngagementStore for MemoryStore {
    async fn get_engagement(&self, id: &str) -> Result<Option<Engagement>> {
        Ok(self.inner.lock().unwrap().engagements.get(id).cloned())
    }

    async fn get_job(&self, id: &str) -> Result<Option<Job>> {
        Ok(self.inner.lock().unwrap().jobs.get(id).cloned())
    }

    async fn get_candidate(&self, id: &str) -> Result<Option<Candidate>> {
        Ok(self.inner.lock().unwrap().candidates.get(id).cloned())
    }

    async fn list_unsynced(&self, limit: usize) -> Result<Vec<Engagement>> {
        let inner = self.inner.lock().unwrap();
        if inner.fail_listing {
            anyhow::bail!("connection reset while listing engagements");
        }
        let mut unsynced: Vec<_> = inner
            .engagements
            .values()
            .filter(|e| !e.synced)
            .cloned()
            .collect();
        unsynced.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        unsynced.truncate(limit);
        Ok(unsynced)
    }

    async fn mark_synced(&self, id: &str, record: &SyncRecord) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let Some(engagement) = inner.engagements.get_mut(id) else {
            anyhow::bail!("Engagement {id} disappeared before its sync status could be saved");
        };
        engagement.synced = true;
        engagement.crm_opportunity_id = Some(record.opportunity_id);
        engagement.crm_contact_id = Some(record.contact_id);
        engagement.last_synced_at = Some(record.synced_at);
        Ok(())
    }

    async fn append_timeline(&self, id: &str, event: &TimelineEvent) -> Result<()> {
        self.inner
            .lock()
            .unwrap()
            .timelines
            .entry(id.to_string())
            .or_default()
            .push(event.clone());
        Ok(())
    }

    async fn find_by_opportunity(&self, opportunity_id: i64) -> Result<Option<Engagement>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .engagements
            .values()
            .find(|e| e.crm_opportunity_id == Some(opportunity_id))
            .cloned())
    }

    async fn count_by_sync_flag(&self) -> Result<SyncCounts> {
        let inner = self.inner.lock().unwrap();
        let synced = inner.engagements.values().filter(|e| e.synced).count() as i64;
        let unsynced = inner.engagements.len() as i64 - synced;
        Ok(SyncCounts { synced, unsynced })
    }
}
