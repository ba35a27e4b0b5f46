//! Hook-style gate for a single tool call
//!
//! Reads a payload such as `{"tool_name": "Bash", "tool_input": {...}}`,
//! proposes a `tool_execution` decision and exits 0 (allow) or 2 (block).

use colored::*;
use eyre::{Context, Result};
use serde_json::{Map, Value};

use contextgraph::config::Config;
use contextgraph::decision::DecisionType;
use contextgraph::langchain::DEFAULT_API_URL;
use contextgraph::{DecisionRecorder, Verdict};

use super::read_input;

/// Split a hook payload into the action name and the decision context
pub(crate) fn payload_context(payload: Value) -> Result<(String, Map<String, Value>)> {
    let Value::Object(mut fields) = payload else {
        eyre::bail!("Hook payload must be a JSON object");
    };

    let tool_name = match fields.remove("tool_name") {
        Some(Value::String(name)) if !name.is_empty() => name,
        _ => "unknown_tool".to_string(),
    };
    let tool_input = fields.remove("tool_input").unwrap_or_else(|| Value::Object(Map::new()));

    let mut context = Map::new();
    context.insert("tool_name".to_string(), Value::String(tool_name.clone()));
    context.insert("tool_input".to_string(), tool_input);
    context.extend(fields);

    Ok((tool_name, context))
}

pub fn run(payload: Option<&str>, config: &Config) -> Result<()> {
    let payload_str = read_input(payload, "payload")?;
    let payload: Value = serde_json::from_str(&payload_str).context("Failed to parse payload JSON")?;
    log::debug!("Guard payload: {}", payload);

    let (action, context) = payload_context(payload)?;

    let recorder = DecisionRecorder::from_config(config, config.resolved_agent_id()?, DEFAULT_API_URL, "cli")?;
    let proposal = recorder.propose(DecisionType::ToolExecution, &action, context, None);
    log::info!("Guard {} -> {:?}", action, proposal.verdict);

    match &proposal.verdict {
        Verdict::Allow => {}
        Verdict::Block { decision_id, message } => {
            eprintln!("{} {} blocked by ContextGraph: {}", "✗".red(), action.bold(), message);
            if let Some(id) = decision_id {
                eprintln!("  Decision: {}", id.cyan());
            }
        }
        Verdict::Error { message } => {
            eprintln!("{} ContextGraph error (allowing): {}", "⚠".yellow(), message);
        }
    }

    std::process::exit(proposal.verdict.exit_code());
}
