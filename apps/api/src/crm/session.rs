use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::CrmConfig;
use crate::crm::endpoint::RpcEndpoint;
use crate::crm::replies::AuthenticateReply;
use crate::crm::CrmError;

/// Credential returned by the CRM's authenticate call. Lives only in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionCredential {
    pub session_id: i64,
}

/// Authenticates once and hands the cached credential to every later call.
///
/// The lock is held across the authenticate round trip, so concurrent first
/// callers wait for a single authenticate instead of racing their own.
/// There is no expiry: a credential the CRM stops honouring keeps failing
/// until `reauthenticate` is called or the process restarts.
pub struct SessionManager {
    endpoint: Arc<dyn RpcEndpoint>,
    database: String,
    username: String,
    password: String,
    session: Mutex<Option<SessionCredential>>,
}

impl SessionManager {
    pub fn new(endpoint: Arc<dyn RpcEndpoint>, config: &CrmConfig) -> Self {
        Self {
            endpoint,
            database: config.database.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
            session: Mutex::new(None),
        }
    }

    pub async fn ensure_session(&self) -> Result<SessionCredential, CrmError> {
        let mut session = self.session.lock().await;
        if let Some(credential) = *session {
            return Ok(credential);
        }
        let credential = self.authenticate().await?;
        *session = Some(credential);
        Ok(credential)
    }

    /// Drops the cached credential and authenticates again.
    pub async fn reauthenticate(&self) -> Result<SessionCredential, CrmError> {
        let mut session = self.session.lock().await;
        *session = None;
        let credential = self.authenticate().await?;
        *session = Some(credential);
        Ok(credential)
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    async fn authenticate(&self) -> Result<SessionCredential, CrmError> {
        let args: Vec<Value> = vec![
            json!(self.database),
            json!(self.username),
            json!(self.password),
            json!({}),
        ];
        let reply = self
            .endpoint
            .invoke("common", "authenticate", args)
            .await
            .map_err(|e| CrmError::Authentication(e.to_string()))?;

        let reply: AuthenticateReply = serde_json::from_value(reply)
            .map_err(|e| CrmError::Authentication(format!("unexpected reply: {e}")))?;

        match reply.accepted() {
            Some(result) => {
                info!(
                    "Authenticated with CRM database '{}' as '{}' (session {})",
                    self.database, self.username, result.session_id
                );
                Ok(SessionCredential {
                    session_id: result.session_id,
                })
            }
            None => {
                warn!("CRM rejected credentials for '{}'", self.username);
                Err(CrmError::Authentication(
                    "credentials rejected, no session returned".to_string(),
                ))
            }
        }
    }
}
