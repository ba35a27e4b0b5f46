//! Callback handler that logs LangChain runs as ContextGraph decisions
//!
//! Captures agent tool choices, tool executions, chain executions and
//! (optionally) LLM calls. Every start event opens a decision keyed by run id;
//! the matching end or error event closes it as `executed` or `failed`.

use serde_json::{Value, json};
use std::fmt;

use super::{AgentAction, AgentFinish, CallbackHandler, DEFAULT_API_URL, LlmResult, RunContext};
use crate::config::Config;
use crate::decision::{DecisionStatus, DecisionType};
use crate::enforcement::Verdict;
use crate::error::ConfigError;
use crate::recorder::{DecisionRecorder, InFlight, Reference, context_of};
use crate::serialize::to_json;

const SOURCE: &str = "langchain";

/// Which optional event categories to log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallbackOptions {
    pub log_llm_calls: bool,
    pub log_chain_calls: bool,
}

impl Default for CallbackOptions {
    fn default() -> Self {
        Self {
            log_llm_calls: false,
            log_chain_calls: true,
        }
    }
}

pub struct ContextGraphCallback {
    recorder: DecisionRecorder,
    options: CallbackOptions,
    runs: InFlight,
}

impl ContextGraphCallback {
    pub fn new(recorder: DecisionRecorder, options: CallbackOptions) -> Self {
        Self {
            recorder,
            options,
            runs: InFlight::new(),
        }
    }

    /// Build an HTTP-backed handler, resolving credentials from config or env
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        // Validate the key before the agent id so errors surface in that order
        config.resolved_api_key()?;
        let agent_id = config.resolved_agent_id()?;
        let recorder = DecisionRecorder::from_config(config, agent_id, DEFAULT_API_URL, SOURCE)?;
        let options = CallbackOptions {
            log_llm_calls: config.langchain.log_llm_calls,
            log_chain_calls: config.langchain.log_chain_calls,
        };
        Ok(Self::new(recorder, options))
    }

    pub fn options(&self) -> CallbackOptions {
        self.options
    }

    /// Number of runs with an open decision
    pub fn open_runs(&self) -> usize {
        self.runs.len()
    }

    fn start(
        &self,
        decision_type: DecisionType,
        action: &str,
        context: serde_json::Map<String, Value>,
        run: &RunContext,
    ) -> Verdict {
        let run_id = run.run_id.to_string();
        let proposal = self
            .recorder
            .propose(decision_type, action, context, Some(&Reference::run_id(run_id.clone())));

        // A blocked run never reports back, so only allowed runs stay open
        if let Some(id) = proposal.decision_id
            && !proposal.verdict.is_blocked()
        {
            self.runs.track(run_id, id);
        }
        proposal.verdict
    }

    /// Log and track a run that is audited but never gated
    fn record(
        &self,
        decision_type: DecisionType,
        action: &str,
        context: serde_json::Map<String, Value>,
        run: &RunContext,
    ) {
        let run_id = run.run_id.to_string();
        let decision_id = self
            .recorder
            .log_decision(decision_type, action, context, Some(&Reference::run_id(run_id.clone())));

        if let Some(id) = decision_id {
            self.runs.track(run_id, id);
        }
    }

    fn finish(&self, run: &RunContext, status: DecisionStatus, result: Value) {
        if let Some(id) = self.runs.take(&run.run_id.to_string()) {
            self.recorder.transition(&id, status, Some(result));
        }
    }

    fn fail(&self, run: &RunContext, error: &dyn fmt::Display) {
        self.finish(run, DecisionStatus::Failed, json!({ "error": error.to_string() }));
    }
}

fn serialized_name<'a>(serialized: &'a Value) -> Option<&'a str> {
    serialized.get("name").and_then(Value::as_str)
}

/// Chain name: `name`, else the last segment of the `id` path
fn chain_name(serialized: &Value) -> String {
    serialized_name(serialized)
        .or_else(|| {
            serialized
                .get("id")
                .and_then(Value::as_array)
                .and_then(|id| id.last())
                .and_then(Value::as_str)
        })
        .unwrap_or("unknown")
        .to_string()
}

impl CallbackHandler for ContextGraphCallback {
    fn on_agent_action(&self, action: &AgentAction, run: &RunContext) -> Verdict {
        self.start(
            DecisionType::ToolInvocation,
            &action.tool,
            context_of([
                ("tool", json!(action.tool)),
                ("tool_input", action.tool_input.clone()),
                ("reasoning", json!(action.log)),
            ]),
            run,
        )
    }

    fn on_agent_finish(&self, finish: &AgentFinish, run: &RunContext) {
        self.finish(
            run,
            DecisionStatus::Executed,
            json!({ "output": finish.return_values, "log": finish.log }),
        );
    }

    fn on_tool_start(&self, serialized: &Value, input_str: &str, inputs: Option<&Value>, run: &RunContext) -> Verdict {
        let tool_name = serialized_name(serialized).unwrap_or("unknown_tool");
        self.start(
            DecisionType::ToolExecution,
            tool_name,
            context_of([
                ("tool", json!(tool_name)),
                ("input", json!(input_str)),
                ("inputs", inputs.cloned().unwrap_or(Value::Null)),
                ("tags", to_json(&run.tags)),
                ("metadata", run.metadata.clone().unwrap_or(Value::Null)),
            ]),
            run,
        )
    }

    fn on_tool_end(&self, output: &str, run: &RunContext) {
        self.finish(run, DecisionStatus::Executed, json!({ "output": output }));
    }

    fn on_tool_error(&self, error: &dyn fmt::Display, run: &RunContext) {
        self.fail(run, error);
    }

    fn on_chain_start(&self, serialized: &Value, inputs: &Value, run: &RunContext) {
        if !self.options.log_chain_calls {
            return;
        }
        let chain = chain_name(serialized);
        self.record(
            DecisionType::ChainExecution,
            &chain,
            context_of([
                ("chain", json!(chain)),
                ("inputs", inputs.clone()),
                ("tags", to_json(&run.tags)),
                ("metadata", run.metadata.clone().unwrap_or(Value::Null)),
            ]),
            run,
        );
    }

    fn on_chain_end(&self, outputs: &Value, run: &RunContext) {
        if !self.options.log_chain_calls {
            return;
        }
        self.finish(run, DecisionStatus::Executed, json!({ "outputs": outputs }));
    }

    fn on_chain_error(&self, error: &dyn fmt::Display, run: &RunContext) {
        if !self.options.log_chain_calls {
            return;
        }
        self.fail(run, error);
    }

    fn on_llm_start(&self, serialized: &Value, prompts: &[String], run: &RunContext) {
        if !self.options.log_llm_calls {
            return;
        }
        let model = serialized_name(serialized).unwrap_or("unknown_model");
        self.record(
            DecisionType::LlmCall,
            model,
            context_of([
                ("model", json!(model)),
                ("prompts", json!(prompts)),
                ("tags", to_json(&run.tags)),
                ("metadata", run.metadata.clone().unwrap_or(Value::Null)),
            ]),
            run,
        );
    }

    fn on_llm_end(&self, response: &LlmResult, run: &RunContext) {
        if !self.options.log_llm_calls {
            return;
        }
        let generations: Vec<Vec<&str>> = response
            .generations
            .iter()
            .map(|batch| batch.iter().map(|g| g.text.as_str()).collect())
            .collect();
        self.finish(
            run,
            DecisionStatus::Executed,
            json!({ "generations": generations, "llm_output": response.llm_output }),
        );
    }

    fn on_llm_error(&self, error: &dyn fmt::Display, run: &RunContext) {
        if !self.options.log_llm_calls {
            return;
        }
        self.fail(run, error);
    }
}
