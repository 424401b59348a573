use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One candidate placed with a client. Only the `synced`, `crm_*` and
/// `last_synced_at` columns are written by the sync engine.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Engagement {
    pub id: String,
    pub job_id: String,
    pub candidate_id: String,
    pub client_name: Option<String>,
    pub client_email: Option<String>,
    pub client_phone: Option<String>,
    /// Free-form, e.g. "$12,000" or "TBD".
    pub budget: Option<String>,
    pub duration: Option<String>,
    pub end_date: Option<NaiveDate>,
    pub status: String,
    pub synced: bool,
    pub crm_opportunity_id: Option<i64>,
    pub crm_contact_id: Option<i64>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Engagement {
    pub fn is_active(&self) -> bool {
        self.status.eq_ignore_ascii_case("active")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Job {
    pub id: String,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Candidate {
    pub id: String,
    pub name: String,
    pub skills: Vec<String>,
}

/// Remote identifiers written back after a successful push.
#[derive(Debug, Clone, Copy)]
pub struct SyncRecord {
    pub opportunity_id: i64,
    pub contact_id: i64,
    pub synced_at: DateTime<Utc>,
}

/// Local engagement counts split by the sync flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncCounts {
    pub synced: i64,
    pub unsynced: i64,
}

/// Entry appended to an engagement's `timeline` array.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TimelineEvent {
    CrmSynced {
        opportunity_id: i64,
        contact_id: i64,
        at: DateTime<Utc>,
    },
    CrmStatusUpdated {
        opportunity_id: i64,
        status: String,
        probability: f64,
        at: DateTime<Utc>,
    },
}
