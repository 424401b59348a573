use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::CrmConfig;
use crate::crm::endpoint::RpcEndpoint;
use crate::crm::session::SessionManager;
use crate::crm::CrmError;

/// Credentialed access to CRM models. Cheap to clone; clones share one session.
///
/// Every call re-sends database and password next to the session id, because
/// the protocol re-validates credentials per call.
#[derive(Clone)]
pub struct CrmClient {
    endpoint: Arc<dyn RpcEndpoint>,
    session: Arc<SessionManager>,
}

impl CrmClient {
    pub fn new(endpoint: Arc<dyn RpcEndpoint>, config: &CrmConfig) -> Self {
        let session = Arc::new(SessionManager::new(endpoint.clone(), config));
        Self { endpoint, session }
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Invokes `model.method(*args, **kwargs)` on the CRM.
    pub async fn call(
        &self,
        model: &str,
        method: &str,
        args: Vec<Value>,
        kwargs: Value,
    ) -> Result<Value, CrmError> {
        let credential = self.session.ensure_session().await?;

        let envelope = vec![
            json!(self.session.database()),
            json!(credential.session_id),
            json!(self.session.password()),
            json!(model),
            json!(method),
            Value::Array(args),
            kwargs,
        ];

        debug!("CRM call {model}.{method}");
        self.endpoint
            .invoke("object", "execute_kw", envelope)
            .await
            .map_err(|e| CrmError::Rpc {
                model: model.to_string(),
                method: method.to_string(),
                cause: e.to_string(),
            })
    }

    /// Like `call`, decoding the reply into the expected shape.
    pub async fn call_typed<T: DeserializeOwned>(
        &self,
        model: &str,
        method: &str,
        args: Vec<Value>,
        kwargs: Value,
    ) -> Result<T, CrmError> {
        let reply = self.call(model, method, args, kwargs).await?;
        serde_json::from_value(reply).map_err(|e| CrmError::Rpc {
            model: model.to_string(),
            method: method.to_string(),
            cause: format!("unexpected reply: {e}"),
        })
    }
}
