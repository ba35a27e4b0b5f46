//! Decision records exchanged with the ContextGraph API
//!
//! A decision is one logged agent event. It is created as `proposed`, may be
//! approved or denied by the service (or a human reviewer), and is finally
//! transitioned to `executed` or `failed` once the framework reports back.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Kind of agent event a decision records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionType {
    ToolInvocation,
    ToolExecution,
    ToolUsage,
    ChainExecution,
    LlmCall,
    ModelCall,
    CrewExecution,
    TaskExecution,
    AgentAction,
    AgentReasoning,
    /// Any type this crate does not know about
    #[serde(other)]
    Other,
}

impl DecisionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ToolInvocation => "tool_invocation",
            Self::ToolExecution => "tool_execution",
            Self::ToolUsage => "tool_usage",
            Self::ChainExecution => "chain_execution",
            Self::LlmCall => "llm_call",
            Self::ModelCall => "model_call",
            Self::CrewExecution => "crew_execution",
            Self::TaskExecution => "task_execution",
            Self::AgentAction => "agent_action",
            Self::AgentReasoning => "agent_reasoning",
            Self::Other => "other",
        }
    }

    /// Parse a user-supplied type name (accepts `-` or `_` separators)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "tool_invocation" => Some(Self::ToolInvocation),
            "tool_execution" => Some(Self::ToolExecution),
            "tool_usage" => Some(Self::ToolUsage),
            "chain_execution" => Some(Self::ChainExecution),
            "llm_call" => Some(Self::LlmCall),
            "model_call" => Some(Self::ModelCall),
            "crew_execution" => Some(Self::CrewExecution),
            "task_execution" => Some(Self::TaskExecution),
            "agent_action" => Some(Self::AgentAction),
            "agent_reasoning" => Some(Self::AgentReasoning),
            _ => None,
        }
    }
}

impl fmt::Display for DecisionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionStatus {
    Proposed,
    #[serde(alias = "pending", alias = "require_approval", alias = "requires_approval")]
    PendingApproval,
    Approved,
    Denied,
    Rejected,
    Executed,
    Failed,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl DecisionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Proposed => "proposed",
            Self::PendingApproval => "pending_approval",
            Self::Approved => "approved",
            Self::Denied => "denied",
            Self::Rejected => "rejected",
            Self::Executed => "executed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Unknown => "unknown",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "proposed" => Some(Self::Proposed),
            "pending_approval" | "pending" | "require_approval" | "requires_approval" => Some(Self::PendingApproval),
            "approved" => Some(Self::Approved),
            "denied" => Some(Self::Denied),
            "rejected" => Some(Self::Rejected),
            "executed" => Some(Self::Executed),
            "failed" => Some(Self::Failed),
            "cancelled" | "canceled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// The action must not run
    pub fn is_blocking(&self) -> bool {
        matches!(self, Self::Denied | Self::Rejected | Self::Cancelled)
    }

    /// Waiting on a reviewer
    pub fn is_pending(&self) -> bool {
        *self == Self::PendingApproval
    }

    /// The action may run
    pub fn is_cleared(&self) -> bool {
        matches!(self, Self::Approved | Self::Executed)
    }
}

impl fmt::Display for DecisionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of `POST /v1/decisions`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDecision {
    pub agent_id: String,
    #[serde(rename = "type")]
    pub decision_type: DecisionType,
    pub action: String,
    pub status: DecisionStatus,
    pub context: Map<String, Value>,
}

impl NewDecision {
    pub fn proposed(
        agent_id: impl Into<String>,
        decision_type: DecisionType,
        action: impl Into<String>,
        context: Map<String, Value>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            decision_type,
            action: action.into(),
            status: DecisionStatus::Proposed,
            context,
        }
    }
}

/// Body of `POST /v1/decisions/{id}/transition`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub status: DecisionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

impl Transition {
    /// Build a transition. Null or empty-object results are dropped.
    pub fn new(status: DecisionStatus, result: Option<Value>) -> Self {
        let result = result.filter(|value| match value {
            Value::Null => false,
            Value::Object(map) => !map.is_empty(),
            _ => true,
        });
        Self { status, result }
    }
}

/// A decision as returned by the service
///
/// Every field is optional so partial responses still decode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Decision {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub decision_type: Option<DecisionType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<DecisionStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Response of `GET /v1/decisions`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DecisionList {
    #[serde(default)]
    pub data: Vec<Decision>,
}

/// Filters for `GET /v1/decisions`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecisionQuery {
    pub agent_id: Option<String>,
    pub decision_type: Option<DecisionType>,
    pub status: Option<DecisionStatus>,
    pub limit: Option<usize>,
}

impl DecisionQuery {
    /// Query parameters in wire form
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(agent_id) = &self.agent_id {
            params.push(("agent_id", agent_id.clone()));
        }
        if let Some(decision_type) = self.decision_type {
            params.push(("type", decision_type.as_str().to_string()));
        }
        if let Some(status) = self.status {
            params.push(("status", status.as_str().to_string()));
        }
        if let Some(limit) = self.limit {
            params.push(("limit", limit.to_string()));
        }
        params
    }
}
