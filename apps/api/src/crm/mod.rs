//! CRM integration. Everything that talks to the external CRM goes through here.
//!
//! Layering, leaves first: `endpoint` (wire protocol) → `session` (authenticate
//! once, cache the credential) → `client` (credentialed model/method calls) →
//! `contacts` / `opportunities` (domain writes).

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod client;
pub mod contacts;
pub mod endpoint;
#[cfg(test)]
pub mod fake;
pub mod opportunities;
pub mod replies;
pub mod session;

pub use client::CrmClient;
pub use endpoint::HttpEndpoint;
pub use session::SessionCredential;

#[derive(Debug, Error)]
pub enum CrmError {
    /// Credentials rejected or no credential returned. Fatal for the whole operation.
    #[error("CRM authentication failed: {0}")]
    Authentication(String),

    /// Transport or protocol failure on one specific call.
    #[error("RPC {model}.{method} failed: {cause}")]
    Rpc {
        model: String,
        method: String,
        cause: String,
    },
}

/// Remote `res.partner` identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContactId(pub i64);

/// Remote `crm.lead` identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OpportunityId(pub i64);

impl fmt::Display for ContactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for OpportunityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
