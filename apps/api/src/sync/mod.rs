//! CRM synchronization: projects local engagements into CRM contacts and
//! opportunities and writes the outcome back onto the engagement.

use thiserror::Error;

use crate::crm::CrmError;

pub mod engine;
pub mod handlers;
pub mod status;

pub use engine::SyncEngine;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Crm(#[from] CrmError),

    #[error("store error: {0}")]
    Store(#[from] anyhow::Error),

    #[error("batch deadline exceeded before this record finished")]
    DeadlineExceeded,
}
