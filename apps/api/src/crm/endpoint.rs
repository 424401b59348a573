//! Wire layer for the CRM's legacy RPC protocol, spoken in its JSON-RPC flavour.
//!
//! Knows nothing about contacts or opportunities: it posts one
//! `{"jsonrpc":"2.0","method":"call","params":{service, method, args}}`
//! envelope per call and hands back the raw `result`. No retries.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("remote fault: {0}")]
    Fault(String),

    #[error("response carried neither a result nor an error")]
    MissingResult,
}

/// A single remote endpoint. Implemented over HTTP in production and faked in tests.
#[async_trait]
pub trait RpcEndpoint: Send + Sync {
    async fn invoke(
        &self,
        service: &str,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, EndpointError>;
}

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'static str,
    params: CallParams<'a>,
    id: u64,
}

#[derive(Debug, Serialize)]
struct CallParams<'a> {
    service: &'a str,
    method: &'a str,
    args: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcFault>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcFault {
    message: String,
    #[serde(default)]
    data: Option<FaultData>,
}

#[derive(Debug, Deserialize)]
struct FaultData {
    #[serde(default)]
    message: Option<String>,
}

impl JsonRpcFault {
    /// The server's detailed message when present, otherwise the generic one.
    fn describe(self) -> String {
        self.data
            .and_then(|d| d.message)
            .filter(|m| !m.is_empty())
            .unwrap_or(self.message)
    }
}

impl JsonRpcResponse {
    fn into_result(self) -> Result<Value, EndpointError> {
        if let Some(fault) = self.error {
            return Err(EndpointError::Fault(fault.describe()));
        }
        self.result.ok_or(EndpointError::MissingResult)
    }
}

pub struct HttpEndpoint {
    client: Client,
    url: String,
    next_id: AtomicU64,
}

impl HttpEndpoint {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, EndpointError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            url: format!("{}/jsonrpc", base_url.trim_end_matches('/')),
            next_id: AtomicU64::new(1),
        })
    }
}

#[async_trait]
impl RpcEndpoint for HttpEndpoint {
    async fn invoke(
        &self,
        service: &str,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, EndpointError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method: "call",
            params: CallParams {
                service,
                method,
                args,
            },
            id,
        };

        let response = self.client.post(&self.url).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EndpointError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let reply: JsonRpcResponse = response.json().await?;
        debug!("RPC {service}.{method} (id {id}) answered");
        reply.into_result()
    }
}
