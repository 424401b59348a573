//! Sync statistics and CRM reachability checks. Connectivity problems are
//! reported as data, never as errors.

use serde::Serialize;
use tracing::warn;

use crate::crm::contacts::count_companies;
use crate::sync::{SyncEngine, SyncError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CrmStatus {
    Connected,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncStatusReport {
    pub total: i64,
    pub synced: i64,
    pub unsynced: i64,
    /// Percentage of engagements synced; 0 when there are none.
    pub sync_rate: f64,
    pub crm_status: CrmStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConnectionReport {
    Success { session_id: i64, sample_count: i64 },
    Error { message: String },
}

pub fn sync_rate(synced: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    synced as f64 / total as f64 * 100.0
}

impl SyncEngine {
    /// Local counts plus a connectivity probe. Only a failing local count is an error.
    pub async fn sync_status(&self) -> Result<SyncStatusReport, SyncError> {
        let counts = self.store.count_by_sync_flag().await?;
        let total = counts.synced + counts.unsynced;

        let crm_status = match self.crm.session().ensure_session().await {
            Ok(_) => CrmStatus::Connected,
            Err(e) => {
                warn!("CRM connectivity probe failed: {e}");
                CrmStatus::Error
            }
        };

        Ok(SyncStatusReport {
            total,
            synced: counts.synced,
            unsynced: counts.unsynced,
            sync_rate: sync_rate(counts.synced, total),
            crm_status,
        })
    }

    /// Authenticates and performs one bounded read to prove end-to-end reachability.
    pub async fn test_connection(&self) -> ConnectionReport {
        let session = match self.crm.session().ensure_session().await {
            Ok(session) => session,
            Err(e) => {
                warn!("CRM connection test failed: {e}");
                return ConnectionReport::Error {
                    message: e.to_string(),
                };
            }
        };

        match count_companies(&self.crm).await {
            Ok(sample_count) => ConnectionReport::Success {
                session_id: session.session_id,
                sample_count,
            },
            Err(e) => {
                warn!("CRM connection test read failed: {e}");
                ConnectionReport::Error {
                    message: e.to_string(),
                }
            }
        }
    }
}
