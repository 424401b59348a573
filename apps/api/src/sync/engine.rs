//! Sync orchestration.
//!
//! Per engagement: load engagement, job and candidate → resolve the client
//! contact → create an opportunity → persist `synced` plus both remote ids.
//! Nothing is written locally until the remote writes have succeeded, and
//! batch sync isolates failures per record.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{info, warn};

use crate::config::SyncSettings;
use crate::crm::contacts::resolve_contact;
use crate::crm::opportunities::{
    create_opportunity, parse_budget, record_outcome, DealOutcome, NewOpportunity,
};
use crate::crm::{ContactId, CrmClient, CrmError, OpportunityId};
use crate::models::engagement::{Candidate, Engagement, Job, SyncRecord, TimelineEvent};
use crate::store::EngagementStore;
use crate::sync::SyncError;

/// Used when an engagement has no client email, so contact resolution still succeeds.
pub const PLACEHOLDER_EMAIL: &str = "no-email@placeholder.invalid";

pub const ACTIVE_PROBABILITY: f64 = 75.0;
pub const DEFAULT_PROBABILITY: f64 = 25.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncOutcome {
    pub engagement_id: String,
    pub opportunity_id: OpportunityId,
    pub contact_id: ContactId,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncFailure {
    pub engagement_id: String,
    pub error: String,
}

/// Result of one batch pass. Always returned, even when every record failed;
/// callers check `error_count`.
#[derive(Debug, Default, Serialize)]
pub struct BatchReport {
    pub synced_count: usize,
    pub error_count: usize,
    /// Records left untouched because the batch deadline ran out.
    pub deferred_count: usize,
    pub results: Vec<SyncOutcome>,
    pub errors: Vec<SyncFailure>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdate {
    pub status: DealOutcome,
    pub probability: Option<f64>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusAck {
    pub opportunity_id: OpportunityId,
    pub status: DealOutcome,
    pub probability: f64,
}

/// Remote ids produced for one engagement, not yet persisted.
#[derive(Debug, Clone, Copy)]
struct Pushed {
    opportunity_id: OpportunityId,
    contact_id: ContactId,
}

pub struct SyncEngine {
    pub(super) store: Arc<dyn EngagementStore>,
    pub(super) crm: CrmClient,
    settings: SyncSettings,
}

impl SyncEngine {
    pub fn new(store: Arc<dyn EngagementStore>, crm: CrmClient, settings: SyncSettings) -> Self {
        Self {
            store,
            crm,
            settings,
        }
    }

    pub fn crm(&self) -> &CrmClient {
        &self.crm
    }

    pub async fn sync_engagement(&self, engagement_id: &str) -> Result<SyncOutcome, SyncError> {
        let engagement = self
            .store
            .get_engagement(engagement_id)
            .await?
            .ok_or_else(|| SyncError::NotFound(format!("Engagement {engagement_id} not found")))?;

        if engagement.synced {
            warn!(
                "Engagement {engagement_id} is already synced (opportunity {:?}); a new opportunity will be created",
                engagement.crm_opportunity_id
            );
        }

        let pushed = self.push(&engagement).await?;
        self.persist(&engagement.id, pushed).await
    }

    /// Syncs up to `limit` (capped at the configured batch size) unsynced
    /// engagements, one at a time. Only a failure to list them is an error;
    /// a CRM authentication failure ends the pass early.
    pub async fn sync_all(&self, limit: Option<usize>) -> Result<BatchReport, SyncError> {
        let max = self.settings.batch_size.max(1);
        let limit = limit.unwrap_or(max).clamp(1, max);

        let pending = self.store.list_unsynced(limit).await?;
        let deadline = Instant::now() + self.settings.batch_deadline;
        info!("Batch sync starting for {} engagement(s)", pending.len());

        let mut report = BatchReport::default();
        for (index, engagement) in pending.iter().enumerate() {
            if Instant::now() >= deadline {
                report.deferred_count = pending.len() - index;
                warn!(
                    "Batch deadline reached before engagement {}; deferring {} record(s)",
                    engagement.id, report.deferred_count
                );
                break;
            }

            // Only the remote part races the deadline; a finished push is always persisted.
            let pushed = match tokio::time::timeout_at(deadline, self.push(engagement)).await {
                Ok(pushed) => pushed,
                Err(_) => {
                    report.record_failure(&engagement.id, &SyncError::DeadlineExceeded);
                    report.deferred_count = pending.len() - index - 1;
                    warn!(
                        "Batch deadline reached at engagement {}; deferring {} record(s)",
                        engagement.id, report.deferred_count
                    );
                    break;
                }
            };

            let outcome = match pushed {
                Ok(pushed) => self.persist(&engagement.id, pushed).await,
                Err(e) => Err(e),
            };

            match outcome {
                Ok(outcome) => report.results.push(outcome),
                // Rejected credentials fail every remaining record the same way.
                Err(e @ SyncError::Crm(CrmError::Authentication(_))) => {
                    report.record_failure(&engagement.id, &e);
                    report.deferred_count = pending.len() - index - 1;
                    warn!(
                        "Stopping batch after CRM authentication failure; deferring {} record(s)",
                        report.deferred_count
                    );
                    break;
                }
                Err(e) => report.record_failure(&engagement.id, &e),
            }
        }

        report.synced_count = report.results.len();
        report.error_count = report.errors.len();
        info!(
            "Batch sync finished: {} synced, {} failed, {} deferred",
            report.synced_count, report.error_count, report.deferred_count
        );
        Ok(report)
    }

    /// Marks an opportunity won or lost. An explicit probability overrides the
    /// outcome's default (100 for won, 0 for lost).
    pub async fn update_opportunity_status(
        &self,
        opportunity_id: OpportunityId,
        update: &StatusUpdate,
    ) -> Result<StatusAck, SyncError> {
        let probability = match update.probability {
            Some(p) if (0.0..=100.0).contains(&p) => p,
            Some(p) => {
                return Err(SyncError::Validation(format!(
                    "probability must be between 0 and 100, got {p}"
                )))
            }
            None => update.status.default_probability(),
        };

        record_outcome(&self.crm, opportunity_id, probability, update.notes.as_deref()).await?;

        let event = TimelineEvent::CrmStatusUpdated {
            opportunity_id: opportunity_id.0,
            status: update.status.as_str().to_string(),
            probability,
            at: Utc::now(),
        };
        match self.store.find_by_opportunity(opportunity_id.0).await {
            Ok(Some(engagement)) => {
                if let Err(e) = self.store.append_timeline(&engagement.id, &event).await {
                    warn!("Could not record status change on engagement {}: {e}", engagement.id);
                }
            }
            Ok(None) => {}
            Err(e) => warn!("Could not look up engagement for opportunity {opportunity_id}: {e}"),
        }

        Ok(StatusAck {
            opportunity_id,
            status: update.status,
            probability,
        })
    }

    /// Remote half of a sync. Touches no local state.
    async fn push(&self, engagement: &Engagement) -> Result<Pushed, SyncError> {
        let job = self
            .store
            .get_job(&engagement.job_id)
            .await?
            .ok_or_else(|| {
                SyncError::NotFound(format!(
                    "Job {} for engagement {} not found",
                    engagement.job_id, engagement.id
                ))
            })?;
        let candidate = self
            .store
            .get_candidate(&engagement.candidate_id)
            .await?
            .ok_or_else(|| {
                SyncError::NotFound(format!(
                    "Candidate {} for engagement {} not found",
                    engagement.candidate_id, engagement.id
                ))
            })?;

        let email = engagement
            .client_email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .unwrap_or(PLACEHOLDER_EMAIL);
        let display_name = engagement
            .client_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(email);

        let contact_id = resolve_contact(
            &self.crm,
            email,
            display_name,
            engagement.client_phone.as_deref(),
            true,
        )
        .await?;

        let opportunity = NewOpportunity {
            name: format!("{} - {}", job.title, candidate.name),
            contact_id,
            expected_value: parse_budget(engagement.budget.as_deref()),
            probability: probability_for(engagement),
            description: describe(&job, &candidate, engagement.duration.as_deref()),
            deadline: engagement.end_date,
        };
        let opportunity_id = create_opportunity(&self.crm, &opportunity).await?;

        Ok(Pushed {
            opportunity_id,
            contact_id,
        })
    }

    async fn persist(&self, engagement_id: &str, pushed: Pushed) -> Result<SyncOutcome, SyncError> {
        let record = SyncRecord {
            opportunity_id: pushed.opportunity_id.0,
            contact_id: pushed.contact_id.0,
            synced_at: Utc::now(),
        };
        self.store.mark_synced(engagement_id, &record).await?;

        let event = TimelineEvent::CrmSynced {
            opportunity_id: record.opportunity_id,
            contact_id: record.contact_id,
            at: record.synced_at,
        };
        if let Err(e) = self.store.append_timeline(engagement_id, &event).await {
            warn!("Engagement {engagement_id} synced but timeline append failed: {e}");
        }

        Ok(SyncOutcome {
            engagement_id: engagement_id.to_string(),
            opportunity_id: pushed.opportunity_id,
            contact_id: pushed.contact_id,
        })
    }
}

impl BatchReport {
    fn record_failure(&mut self, engagement_id: &str, error: &SyncError) {
        warn!("Sync failed for engagement {engagement_id}: {error}");
        self.errors.push(SyncFailure {
            engagement_id: engagement_id.to_string(),
            error: error.to_string(),
        });
    }
}

/// Heuristic, not a score: active placements are likelier to close.
pub fn probability_for(engagement: &Engagement) -> f64 {
    if engagement.is_active() {
        ACTIVE_PROBABILITY
    } else {
        DEFAULT_PROBABILITY
    }
}

/// Opportunity description: role, candidate, skills, duration, then the job description.
pub fn describe(job: &Job, candidate: &Candidate, duration: Option<&str>) -> String {
    let skills = if candidate.skills.is_empty() {
        "Not specified".to_string()
    } else {
        candidate.skills.join(", ")
    };
    format!(
        "Position: {}\nCandidate: {}\nSkills: {}\nDuration: {}\n\n{}",
        job.title,
        candidate.name,
        skills,
        duration.unwrap_or("Not specified"),
        job.description
    )
}
