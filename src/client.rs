//! Blocking HTTP client for the ContextGraph decisions API

use serde_json::Value;
use std::fmt;
use std::time::Duration;
use ureq::Agent;
use ureq::http::Response;

use crate::api::DecisionApi;
use crate::decision::{Decision, DecisionList, DecisionQuery, NewDecision, Transition};
use crate::error::ClientError;

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP implementation of [`DecisionApi`]
pub struct HttpClient {
    agent: Agent,
    base_url: String,
    auth_header: String,
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient").field("base_url", &self.base_url).finish_non_exhaustive()
    }
}

impl HttpClient {
    /// Create a client for `base_url` authenticating with `api_key`
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Self {
        let config = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();

        Self {
            agent: Agent::new_with_config(config),
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_header: format!("Bearer {}", api_key),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn post(&self, path: &str, body: &impl serde::Serialize) -> Result<Value, ClientError> {
        let url = self.url(path);
        let body = serde_json::to_string(body)?;
        log::debug!("POST {} {}", url, body);

        let response = self
            .agent
            .post(&url)
            .header("Authorization", &self.auth_header)
            .header("Content-Type", "application/json")
            .send(body.as_bytes())?;

        read_json(response)
    }

    fn get(&self, path: &str, params: &[(&str, String)]) -> Result<Value, ClientError> {
        let url = self.url(path);
        log::debug!("GET {} {:?}", url, params);

        let mut request = self
            .agent
            .get(&url)
            .header("Authorization", &self.auth_header)
            .header("Content-Type", "application/json");
        for (key, value) in params {
            request = request.query(*key, value);
        }

        read_json(request.call()?)
    }
}

/// Read a response body as JSON, mapping non-2xx statuses to errors.
/// An empty success body decodes to null.
fn read_json(mut response: Response<ureq::Body>) -> Result<Value, ClientError> {
    let status = response.status();
    let body = response.body_mut().read_to_string()?;

    if !status.is_success() {
        return Err(ClientError::Status {
            code: status.as_u16(),
            body,
        });
    }

    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(&body)?)
}

/// Single-record responses may be bare or wrapped in `{"data": {...}}`
fn unwrap_record(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.get("data").is_some_and(Value::is_object) => {
            map.remove("data").unwrap_or_default()
        }
        other => other,
    }
}

fn decode_decision(value: Value) -> Result<Decision, ClientError> {
    match unwrap_record(value) {
        Value::Null => Ok(Decision::default()),
        record => Ok(serde_json::from_value(record)?),
    }
}

impl DecisionApi for HttpClient {
    fn create_decision(&self, decision: &NewDecision) -> Result<Decision, ClientError> {
        decode_decision(self.post("/v1/decisions", decision)?)
    }

    fn transition_decision(&self, id: &str, transition: &Transition) -> Result<(), ClientError> {
        self.post(&format!("/v1/decisions/{}/transition", id), transition)?;
        Ok(())
    }

    fn get_decision(&self, id: &str) -> Result<Decision, ClientError> {
        decode_decision(self.get(&format!("/v1/decisions/{}", id), &[])?)
    }

    fn list_decisions(&self, query: &DecisionQuery) -> Result<Vec<Decision>, ClientError> {
        let value = self.get("/v1/decisions", &query.params())?;
        if value.is_null() {
            return Ok(Vec::new());
        }
        let list: DecisionList = serde_json::from_value(value)?;
        Ok(list.data)
    }
}
