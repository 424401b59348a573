//! In-process stand-in for the CRM endpoint. Keeps one table per model and
//! understands the handful of methods the engine uses.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::config::CrmConfig;
use crate::crm::endpoint::{EndpointError, RpcEndpoint};

const PASSWORD: &str = "secret";
const UID: i64 = 2;

pub fn fake_config() -> CrmConfig {
    CrmConfig {
        url: "http://crm.invalid".to_string(),
        database: "crm".to_string(),
        username: "sync-bot".to_string(),
        password: PASSWORD.to_string(),
        rpc_timeout: Duration::from_secs(5),
    }
}

#[derive(Default)]
pub struct FakeCrm {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    tables: BTreeMap<String, Vec<(i64, Map<String, Value>)>>,
    messages: BTreeMap<i64, Vec<String>>,
    next_id: i64,
    auth_calls: usize,
    auth_unreachable: bool,
    executed: Vec<(String, String)>,
    failing: Vec<(String, String)>,
    latency: Option<Duration>,
}

impl FakeCrm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn auth_calls(&self) -> usize {
        self.state.lock().unwrap().auth_calls
    }

    pub fn fail_authenticate(&self) {
        self.state.lock().unwrap().auth_unreachable = true;
    }

    pub fn set_latency(&self, latency: Duration) {
        self.state.lock().unwrap().latency = Some(latency);
    }

    /// Every later `model.method` call answers with a remote fault.
    pub fn fail_on(&self, model: &str, method: &str) {
        self.state
            .lock()
            .unwrap()
            .failing
            .push((model.to_string(), method.to_string()));
    }

    /// `(model, method)` of every `execute_kw` call, in order.
    pub fn executed(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().executed.clone()
    }

    pub fn add_partner(&self, name: &str, email: &str, is_company: bool) -> i64 {
        let values = json!({"name": name, "email": email, "is_company": is_company});
        self.state.lock().unwrap().insert("res.partner", values)
    }

    pub fn add_lead(&self, name: &str) -> i64 {
        let values = json!({"name": name, "probability": 25.0, "type": "opportunity"});
        self.state.lock().unwrap().insert("crm.lead", values)
    }

    pub fn partner(&self, id: i64) -> Value {
        self.state.lock().unwrap().record("res.partner", id)
    }

    pub fn lead(&self, id: i64) -> Value {
        self.state.lock().unwrap().record("crm.lead", id)
    }

    pub fn leads(&self) -> usize {
        self.state
            .lock()
            .unwrap()
            .tables
            .get("crm.lead")
            .map_or(0, Vec::len)
    }

    pub fn partners_with_email(&self, email: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .tables
            .get("res.partner")
            .map_or(0, |rows| {
                rows.iter()
                    .filter(|(_, r)| r.get("email") == Some(&json!(email)))
                    .count()
            })
    }

    pub fn messages(&self, lead_id: i64) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .messages
            .get(&lead_id)
            .cloned()
            .unwrap_or_default()
    }
}

impl State {
    fn insert(&mut self, model: &str, values: Value) -> i64 {
        self.next_id += 1;
        let id = self.next_id;
        let mut row = values.as_object().cloned().unwrap_or_default();
        row.insert("id".to_string(), json!(id));
        self.tables
            .entry(model.to_string())
            .or_default()
            .push((id, row));
        id
    }

    fn record(&self, model: &str, id: i64) -> Value {
        self.tables
            .get(model)
            .and_then(|rows| rows.iter().find(|(rid, _)| *rid == id))
            .map(|(_, row)| Value::Object(row.clone()))
            .unwrap_or(Value::Null)
    }

    fn matching(&self, model: &str, domain: &Value) -> Vec<i64> {
        let terms = domain.as_array().cloned().unwrap_or_default();
        self.tables
            .get(model)
            .map(|rows| {
                rows.iter()
                    .filter(|(_, row)| {
                        terms.iter().all(|term| {
                            let field = term[0].as_str().unwrap_or_default();
                            term[1] == "=" && row.get(field) == Some(&term[2])
                        })
                    })
                    .map(|(id, _)| *id)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn execute(
        &mut self,
        model: &str,
        method: &str,
        args: &[Value],
        kwargs: &Value,
    ) -> Result<Value, EndpointError> {
        match method {
            "search" => {
                let mut ids = self.matching(model, &args[0]);
                if let Some(limit) = kwargs.get("limit").and_then(Value::as_u64) {
                    ids.truncate(limit as usize);
                }
                Ok(json!(ids))
            }
            "search_count" => Ok(json!(self.matching(model, &args[0]).len())),
            "create" => Ok(json!(self.insert(model, args[0].clone()))),
            "write" => {
                let ids: Vec<i64> = serde_json::from_value(args[0].clone()).unwrap();
                let values = args[1].as_object().cloned().unwrap_or_default();
                let rows = self.tables.entry(model.to_string()).or_default();
                for id in &ids {
                    let Some((_, row)) = rows.iter_mut().find(|(rid, _)| *rid == *id) else {
                        return Err(EndpointError::Fault(format!(
                            "Record does not exist or has been deleted: {model}({id})"
                        )));
                    };
                    row.extend(values.clone());
                }
                Ok(json!(true))
            }
            "message_post" => {
                let ids: Vec<i64> = serde_json::from_value(args[0].clone()).unwrap();
                let body = kwargs["body"].as_str().unwrap_or_default().to_string();
                for id in ids {
                    self.messages.entry(id).or_default().push(body.clone());
                }
                Ok(json!(1))
            }
            other => Err(EndpointError::Fault(format!(
                "The method '{other}' does not exist on the model '{model}'"
            ))),
        }
    }
}

#[async_trait]
impl RpcEndpoint for FakeCrm {
    async fn invoke(
        &self,
        service: &str,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, EndpointError> {
        let latency = self.state.lock().unwrap().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.state.lock().unwrap();
        match (service, method) {
            ("common", "authenticate") => {
                state.auth_calls += 1;
                if state.auth_unreachable {
                    return Err(EndpointError::Status {
                        status: 502,
                        body: "Bad Gateway".to_string(),
                    });
                }
                if args[2] == PASSWORD {
                    Ok(json!(UID))
                } else {
                    Ok(json!(false))
                }
            }
            ("object", "execute_kw") => {
                if args[1] != UID || args[2] != PASSWORD {
                    return Err(EndpointError::Fault("Access Denied".to_string()));
                }
                let model = args[3].as_str().unwrap_or_default().to_string();
                let method = args[4].as_str().unwrap_or_default().to_string();
                state.executed.push((model.clone(), method.clone()));
                if state.failing.contains(&(model.clone(), method.clone())) {
                    return Err(EndpointError::Fault(format!(
                        "{model}.{method} is unavailable"
                    )));
                }
                let call_args = args[5].as_array().cloned().unwrap_or_default();
                state.execute(&model, &method, &call_args, &args[6])
            }
            _ => Err(EndpointError::Fault(format!("unknown service {service}.{method}"))),
        }
    }
}
