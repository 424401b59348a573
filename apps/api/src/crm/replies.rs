//! Typed shapes of the replies this service expects from the CRM.
//! A reply that does not decode is treated as protocol drift.

use serde::Deserialize;

/// `common.authenticate` answers with the user id, or `false` when rejected.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum AuthenticateReply {
    Uid(i64),
    Rejected(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticateResult {
    pub session_id: i64,
}

impl AuthenticateReply {
    pub fn accepted(self) -> Option<AuthenticateResult> {
        match self {
            AuthenticateReply::Uid(uid) if uid > 0 => Some(AuthenticateResult { session_id: uid }),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(transparent)]
pub struct SearchResult {
    pub ids: Vec<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(transparent)]
pub struct CreateResult {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(transparent)]
pub struct CountResult {
    pub count: i64,
}

#[derive(Debug, Deserialize)]
#[serde(transparent)]
pub struct WriteResult {
    pub applied: bool,
}
