//! Policy documents and a local dry-run evaluator
//!
//! The service evaluates policies authoritatively. This module reads the same
//! documents so operators can check which effect a decision would get before
//! uploading a policy.
//!
//! ```json
//! {
//!   "name": "no-prod-deletes",
//!   "condition": {"and": [
//!     {"field": "type", "equals": "tool_execution"},
//!     {"field": "action", "in": ["delete_file", "drop_table"]}
//!   ]},
//!   "effect": "deny"
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::decision::DecisionStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    Allow,
    RequireApproval,
    Deny,
}

impl Effect {
    /// Status the service is expected to assign
    pub fn expected_status(&self) -> DecisionStatus {
        match self {
            Effect::Allow => DecisionStatus::Approved,
            Effect::RequireApproval => DecisionStatus::PendingApproval,
            Effect::Deny => DecisionStatus::Denied,
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::Allow => write!(f, "allow"),
            Effect::RequireApproval => write!(f, "require_approval"),
            Effect::Deny => write!(f, "deny"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Condition {
    And {
        and: Vec<Condition>,
    },
    Or {
        or: Vec<Condition>,
    },
    Not {
        not: Box<Condition>,
    },
    In {
        field: String,
        #[serde(rename = "in")]
        values: Vec<Value>,
    },
    Equals {
        field: String,
        equals: Value,
    },
}

/// Look up a dotted path (`context.tool`) in a decision
fn resolve<'a>(decision: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(decision, |value, segment| value.get(segment))
}

impl Condition {
    pub fn matches(&self, decision: &Value) -> bool {
        match self {
            Condition::And { and } => and.iter().all(|c| c.matches(decision)),
            Condition::Or { or } => or.iter().any(|c| c.matches(decision)),
            Condition::Not { not } => !not.matches(decision),
            Condition::In { field, values } => resolve(decision, field).is_some_and(|v| values.contains(v)),
            Condition::Equals { field, equals } => resolve(decision, field).is_some_and(|v| v == equals),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub condition: Condition,
    pub effect: Effect,
}

impl Policy {
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("(unnamed)")
    }
}

/// Outcome of evaluating a policy set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Evaluation {
    pub effect: Effect,
    pub matched: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicySet {
    pub policies: Vec<Policy>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PolicyDocument {
    Many(Vec<Policy>),
    Wrapped { policies: Vec<Policy> },
    One(Policy),
}

impl PolicySet {
    /// Parse a single policy, an array of policies, or `{"policies": [...]}`
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let policies = match serde_json::from_str(text)? {
            PolicyDocument::Many(policies) => policies,
            PolicyDocument::Wrapped { policies } => policies,
            PolicyDocument::One(policy) => vec![policy],
        };
        Ok(Self { policies })
    }

    /// Strongest matching effect (deny > require_approval > allow).
    /// Nothing matching means allow.
    pub fn evaluate(&self, decision: &Value) -> Evaluation {
        let matching: Vec<&Policy> = self.policies.iter().filter(|p| p.condition.matches(decision)).collect();

        Evaluation {
            effect: matching.iter().map(|p| p.effect).max().unwrap_or(Effect::Allow),
            matched: matching.iter().map(|p| p.label().to_string()).collect(),
        }
    }
}
