//! LangChain-style integrations
//!
//! Two hook shapes are supported:
//! - [`CallbackHandler`]: the classic run-scoped callbacks (`on_tool_start`,
//!   `on_chain_end`, ...), implemented by [`ContextGraphCallback`]
//! - [`AgentMiddleware`]: v1-style `before_model` / `after_model` /
//!   `wrap_tool_call` hooks, implemented by [`ContextGraphMiddleware`]

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

use crate::enforcement::Verdict;

pub mod callback;
pub mod middleware;

pub use callback::{CallbackOptions, ContextGraphCallback};
pub use middleware::{ContextGraphMiddleware, MiddlewareOptions};

/// Default endpoint for LangChain integrations
pub const DEFAULT_API_URL: &str = "https://contextgraph-api.fly.dev";

/// Identifiers and annotations LangChain passes with every callback
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunContext {
    pub run_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl RunContext {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            ..Self::default()
        }
    }
}

/// The agent chose a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentAction {
    pub tool: String,
    pub tool_input: Value,
    /// The agent's reasoning log
    #[serde(default)]
    pub log: String,
}

/// The agent returned its final answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentFinish {
    pub return_values: Value,
    #[serde(default)]
    pub log: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generation {
    pub text: String,
}

/// Result of an LLM run: one list of generations per prompt
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmResult {
    pub generations: Vec<Vec<Generation>>,
    #[serde(default)]
    pub llm_output: Option<Value>,
}

/// Run-scoped lifecycle callbacks
///
/// All hooks default to no-ops. Start hooks that can abort the step return a
/// [`Verdict`].
#[allow(unused_variables)]
pub trait CallbackHandler: Send + Sync {
    fn on_agent_action(&self, action: &AgentAction, run: &RunContext) -> Verdict {
        Verdict::Allow
    }

    fn on_agent_finish(&self, finish: &AgentFinish, run: &RunContext) {}

    fn on_tool_start(&self, serialized: &Value, input_str: &str, inputs: Option<&Value>, run: &RunContext) -> Verdict {
        Verdict::Allow
    }

    fn on_tool_end(&self, output: &str, run: &RunContext) {}

    fn on_tool_error(&self, error: &dyn fmt::Display, run: &RunContext) {}

    fn on_chain_start(&self, serialized: &Value, inputs: &Value, run: &RunContext) {}

    fn on_chain_end(&self, outputs: &Value, run: &RunContext) {}

    fn on_chain_error(&self, error: &dyn fmt::Display, run: &RunContext) {}

    fn on_llm_start(&self, serialized: &Value, prompts: &[String], run: &RunContext) {}

    fn on_llm_end(&self, response: &LlmResult, run: &RunContext) {}

    fn on_llm_error(&self, error: &dyn fmt::Display, run: &RunContext) {}
}

/// Agent state visible to model middleware
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    #[serde(default)]
    pub messages: Vec<Value>,
}

/// A tool call requested by the model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub args: Option<Value>,
}

/// Executes the wrapped tool call
pub type ToolExecutor<'a> = dyn FnMut(&ToolCall) -> eyre::Result<Value> + 'a;

/// v1-style agent middleware
#[allow(unused_variables)]
pub trait AgentMiddleware: Send + Sync {
    fn before_model(&self, state: &AgentState) {}

    fn after_model(&self, state: &AgentState) {}

    fn wrap_tool_call(&self, call: &ToolCall, execute: &mut ToolExecutor<'_>) -> eyre::Result<Value> {
        execute(call)
    }
}
