//! Decision recording shared by all framework adapters
//!
//! Builds the decision payload (event context, static metadata, timestamp,
//! source tag, framework reference), sends it, optionally auto-approves it,
//! and keeps track of decisions still waiting for their end event.

use chrono::Utc;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::api::DecisionApi;
use crate::client::HttpClient;
use crate::config::Config;
use crate::decision::{Decision, DecisionStatus, DecisionType, NewDecision, Transition};
use crate::enforcement::{Enforcement, Verdict};
use crate::error::{ClientError, ConfigError};

/// Framework-side identifier attached to a decision's context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub key: &'static str,
    pub value: String,
}

impl Reference {
    /// LangChain run id (`context.run_id`)
    pub fn run_id(value: impl Into<String>) -> Self {
        Self {
            key: "run_id",
            value: value.into(),
        }
    }

    /// CrewAI task/agent reference (`context.reference_id`)
    pub fn reference_id(value: impl Into<String>) -> Self {
        Self {
            key: "reference_id",
            value: value.into(),
        }
    }
}

/// Result of proposing a gated action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
    pub decision_id: Option<String>,
    pub verdict: Verdict,
}

/// Sends decisions on behalf of one agent or crew
pub struct DecisionRecorder {
    api: Arc<dyn DecisionApi>,
    agent_id: String,
    source: String,
    auto_approve: bool,
    metadata: IndexMap<String, Value>,
    enforcement: Option<Enforcement>,
}

impl DecisionRecorder {
    pub fn new(api: Arc<dyn DecisionApi>, agent_id: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            api,
            agent_id: agent_id.into(),
            source: source.into(),
            auto_approve: false,
            metadata: IndexMap::new(),
            enforcement: None,
        }
    }

    /// HTTP-backed recorder configured from `config`
    ///
    /// `agent_id` is the already-resolved agent or crew id; `default_url` is
    /// used when neither the config nor CG_API_URL names an endpoint.
    pub fn from_config(config: &Config, agent_id: String, default_url: &str, source: &str) -> Result<Self, ConfigError> {
        let api_key = config.resolved_api_key()?;
        let client = HttpClient::new(&config.resolved_api_url(default_url), &api_key, config.timeout());
        log::info!("ContextGraph {} recorder for {} -> {}", source, agent_id, client.base_url());

        Ok(Self::new(Arc::new(client), agent_id, source)
            .with_auto_approve(config.auto_approve)
            .with_metadata(config.metadata.clone())
            .with_enforcement(config.enforcement.to_enforcement()))
    }

    /// Approve every decision right after creating it
    pub fn with_auto_approve(mut self, auto_approve: bool) -> Self {
        self.auto_approve = auto_approve;
        self
    }

    /// Static key/value pairs merged into every decision's context
    pub fn with_metadata(mut self, metadata: IndexMap<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_enforcement(mut self, enforcement: Option<Enforcement>) -> Self {
        self.enforcement = enforcement;
        self
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn api(&self) -> &dyn DecisionApi {
        self.api.as_ref()
    }

    /// Merge event context with metadata, timestamp, source and reference.
    /// Later layers win on key clashes.
    pub fn build_context(&self, context: Map<String, Value>, reference: Option<&Reference>) -> Map<String, Value> {
        let mut merged = context;
        for (key, value) in &self.metadata {
            merged.insert(key.clone(), value.clone());
        }
        merged.insert(
            "timestamp".to_string(),
            Value::String(Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()),
        );
        merged.insert("source".to_string(), Value::String(self.source.clone()));
        if let Some(reference) = reference {
            merged.insert(reference.key.to_string(), Value::String(reference.value.clone()));
        }
        merged
    }

    fn submit(
        &self,
        decision_type: DecisionType,
        action: &str,
        context: Map<String, Value>,
        reference: Option<&Reference>,
    ) -> Result<Decision, ClientError> {
        let payload = NewDecision::proposed(
            self.agent_id.clone(),
            decision_type,
            action,
            self.build_context(context, reference),
        );
        log::debug!("Logging {} decision for action {}", decision_type, action);

        let decision = self.api.create_decision(&payload)?;

        if self.auto_approve
            && let Some(id) = decision.id.as_deref()
        {
            self.transition(id, DecisionStatus::Approved, None);
        }

        Ok(decision)
    }

    /// Log a decision, returning its id. Failures are logged, never raised.
    pub fn log_decision(
        &self,
        decision_type: DecisionType,
        action: &str,
        context: Map<String, Value>,
        reference: Option<&Reference>,
    ) -> Option<String> {
        match self.submit(decision_type, action, context, reference) {
            Ok(decision) => decision.id,
            Err(e) => {
                log::error!("Failed to log decision to ContextGraph: {}", e);
                None
            }
        }
    }

    /// Log a decision and decide whether the action may run
    pub fn propose(
        &self,
        decision_type: DecisionType,
        action: &str,
        context: Map<String, Value>,
        reference: Option<&Reference>,
    ) -> Proposal {
        let decision = match self.submit(decision_type, action, context, reference) {
            Ok(decision) => decision,
            Err(e) => {
                log::error!("Failed to log decision to ContextGraph: {}", e);
                let verdict = match &self.enforcement {
                    Some(enforcement) => enforcement.unreachable(&e.to_string()),
                    None => Verdict::Error { message: e.to_string() },
                };
                return Proposal {
                    decision_id: None,
                    verdict,
                };
            }
        };

        let verdict = match &self.enforcement {
            Some(enforcement) if !self.auto_approve => enforcement.judge(
                self.api.as_ref(),
                decision.id.as_deref(),
                decision.status.unwrap_or(DecisionStatus::Proposed),
            ),
            _ => Verdict::Allow,
        };

        if let Verdict::Block { message, .. } = &verdict {
            log::warn!("Action {} blocked: {}", action, message);
        }

        Proposal {
            decision_id: decision.id,
            verdict,
        }
    }

    /// Move a decision to a new status. Failures are logged, never raised.
    pub fn transition(&self, decision_id: &str, status: DecisionStatus, result: Option<Value>) {
        let transition = Transition::new(status, result);
        if let Err(e) = self.api.transition_decision(decision_id, &transition) {
            log::error!("Failed to transition decision {}: {}", decision_id, e);
        }
    }
}

/// Decisions waiting for their end/error event, keyed by framework id
#[derive(Debug, Default)]
pub struct InFlight {
    decisions: Mutex<HashMap<String, String>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&self, key: impl Into<String>, decision_id: impl Into<String>) {
        self.decisions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), decision_id.into());
    }

    /// Remove and return the decision tracked under `key`
    pub fn take(&self, key: &str) -> Option<String> {
        self.decisions.lock().unwrap_or_else(PoisonError::into_inner).remove(key)
    }

    pub fn len(&self) -> usize {
        self.decisions.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Build a JSON object from key/value pairs
pub(crate) fn context_of<const N: usize>(pairs: [(&str, Value); N]) -> Map<String, Value> {
    pairs.into_iter().map(|(key, value)| (key.to_string(), value)).collect()
}
