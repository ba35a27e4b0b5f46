//! Middleware for LangChain v1-style agents
//!
//! Logs each model invocation and wraps every tool call: the call is proposed
//! as a decision first, may be blocked by the gate, and is closed as
//! `executed` or `failed` depending on the tool's result.

use serde_json::{Value, json};

use super::{AgentMiddleware, AgentState, DEFAULT_API_URL, ToolCall, ToolExecutor};
use crate::config::Config;
use crate::decision::{DecisionStatus, DecisionType};
use crate::enforcement::Verdict;
use crate::error::{ActionBlocked, ConfigError};
use crate::recorder::{DecisionRecorder, InFlight, context_of};
use crate::serialize::render;

const SOURCE: &str = "langchain-v1";

/// In-flight key for the current model call
const MODEL_KEY: &str = "model";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MiddlewareOptions {
    pub log_model_calls: bool,
    pub log_tool_calls: bool,
}

impl Default for MiddlewareOptions {
    fn default() -> Self {
        Self {
            log_model_calls: true,
            log_tool_calls: true,
        }
    }
}

pub struct ContextGraphMiddleware {
    recorder: DecisionRecorder,
    options: MiddlewareOptions,
    active: InFlight,
}

impl ContextGraphMiddleware {
    pub fn new(recorder: DecisionRecorder, options: MiddlewareOptions) -> Self {
        Self {
            recorder,
            options,
            active: InFlight::new(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        config.resolved_api_key()?;
        let agent_id = config.resolved_agent_id()?;
        let recorder = DecisionRecorder::from_config(config, agent_id, DEFAULT_API_URL, SOURCE)?;
        let options = MiddlewareOptions {
            log_model_calls: config.langchain.log_model_calls,
            log_tool_calls: config.langchain.log_tool_calls,
        };
        Ok(Self::new(recorder, options))
    }

    pub fn options(&self) -> MiddlewareOptions {
        self.options
    }
}

fn last_message(state: &AgentState) -> Value {
    state
        .messages
        .last()
        .map(|message| Value::String(render(message)))
        .unwrap_or(Value::Null)
}

impl AgentMiddleware for ContextGraphMiddleware {
    fn before_model(&self, state: &AgentState) {
        if !self.options.log_model_calls {
            return;
        }
        let decision_id = self.recorder.log_decision(
            DecisionType::ModelCall,
            "invoke_model",
            context_of([
                ("message_count", json!(state.messages.len())),
                ("last_message", last_message(state)),
            ]),
            None,
        );
        if let Some(id) = decision_id {
            self.active.track(MODEL_KEY, id);
        }
    }

    fn after_model(&self, state: &AgentState) {
        if !self.options.log_model_calls {
            return;
        }
        if let Some(id) = self.active.take(MODEL_KEY) {
            self.recorder
                .transition(&id, DecisionStatus::Executed, Some(json!({ "response": last_message(state) })));
        }
    }

    fn wrap_tool_call(&self, call: &ToolCall, execute: &mut ToolExecutor<'_>) -> eyre::Result<Value> {
        if !self.options.log_tool_calls {
            return execute(call);
        }

        let tool_name = call.name.as_deref().unwrap_or("unknown_tool");
        let tool_input = call.args.clone().unwrap_or_else(|| json!({}));

        let proposal = self.recorder.propose(
            DecisionType::ToolExecution,
            tool_name,
            context_of([("tool_name", json!(tool_name)), ("tool_input", tool_input)]),
            None,
        );

        if let Verdict::Block { decision_id, message } = proposal.verdict {
            return Err(ActionBlocked {
                action: tool_name.to_string(),
                decision_id,
                message,
            }
            .into());
        }

        match execute(call) {
            Ok(output) => {
                if let Some(id) = &proposal.decision_id {
                    self.recorder
                        .transition(id, DecisionStatus::Executed, Some(json!({ "output": output })));
                }
                Ok(output)
            }
            Err(e) => {
                if let Some(id) = &proposal.decision_id {
                    self.recorder
                        .transition(id, DecisionStatus::Failed, Some(json!({ "error": e.to_string() })));
                }
                Err(e)
            }
        }
    }
}
