use colored::*;
use eyre::{Context, Result, eyre};
use serde_json::{Map, Value};
use std::sync::Arc;

use contextgraph::config::Config;
use contextgraph::decision::{Decision, DecisionQuery, DecisionStatus, DecisionType, NewDecision, Transition};
use contextgraph::{DecisionApi, DecisionRecorder};

use super::client;
use crate::cli::{DecisionAction, OutputFormat};

pub fn run(action: DecisionAction, config: &Config) -> Result<()> {
    match action {
        DecisionAction::List {
            decision_type,
            status,
            agent_id,
            limit,
            format,
        } => list(
            decision_type.as_deref(),
            status.as_deref(),
            agent_id,
            limit,
            OutputFormat::resolve(format),
            config,
        ),
        DecisionAction::Get { id, format } => get(&id, OutputFormat::resolve(format), config),
        DecisionAction::Log {
            decision_type,
            action,
            context,
        } => log_decision(&decision_type, &action, context.as_deref(), config),
        DecisionAction::Transition { id, status, result } => transition(&id, &status, result.as_deref(), config),
    }
}

fn parse_type(s: &str) -> Result<DecisionType> {
    DecisionType::from_str(s).ok_or_else(|| eyre!("Unknown decision type: {}", s))
}

fn parse_status(s: &str) -> Result<DecisionStatus> {
    DecisionStatus::from_str(s).ok_or_else(|| eyre!("Unknown decision status: {}", s))
}

fn parse_json(s: &str, what: &str) -> Result<Value> {
    serde_json::from_str(s).with_context(|| format!("Failed to parse {} JSON", what))
}

fn status_label(status: Option<DecisionStatus>) -> ColoredString {
    match status {
        None => "-".dimmed(),
        Some(s) if s.is_blocking() => s.as_str().red(),
        Some(s) if s.is_pending() => s.as_str().yellow(),
        Some(s) if s.is_cleared() => s.as_str().green(),
        Some(s) => s.as_str().normal(),
    }
}

fn list(
    decision_type: Option<&str>,
    status: Option<&str>,
    agent_id: Option<String>,
    limit: usize,
    format: OutputFormat,
    config: &Config,
) -> Result<()> {
    let query = DecisionQuery {
        agent_id: agent_id.or_else(|| config.resolved_agent_id().ok()),
        decision_type: decision_type.map(parse_type).transpose()?,
        status: status.map(parse_status).transpose()?,
        limit: Some(limit),
    };
    log::debug!("Listing decisions with {:?}", query);

    let decisions = client(config)?
        .list_decisions(&query)
        .context("Failed to list decisions")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&decisions)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&decisions)?),
        OutputFormat::Text => {
            if decisions.is_empty() {
                println!("{}", "No decisions found".dimmed());
                return Ok(());
            }

            println!("{}", "Decisions:".bold());
            println!();
            for decision in &decisions {
                println!(
                    "  {} {} {} [{}]",
                    decision.id.as_deref().unwrap_or("-").cyan(),
                    decision.decision_type.map(|t| t.as_str()).unwrap_or("-"),
                    decision.action.as_deref().unwrap_or("-").bold(),
                    status_label(decision.status)
                );
                if let Some(created_at) = &decision.created_at {
                    println!("    {}", created_at.dimmed());
                }
            }
            println!();
            println!("  {} decision(s)", decisions.len());
        }
    }

    Ok(())
}

fn print_decision(decision: &Decision) {
    println!("{}: {}", "id".cyan(), decision.id.as_deref().unwrap_or("-"));
    println!("{}: {}", "agent".cyan(), decision.agent_id.as_deref().unwrap_or("-"));
    println!(
        "{}: {}",
        "type".cyan(),
        decision.decision_type.map(|t| t.as_str()).unwrap_or("-")
    );
    println!("{}: {}", "action".cyan(), decision.action.as_deref().unwrap_or("-"));
    println!("{}: {}", "status".cyan(), status_label(decision.status));
    if let Some(created_at) = &decision.created_at {
        println!("{}: {}", "created".cyan(), created_at);
    }
    if let Some(updated_at) = &decision.updated_at {
        println!("{}: {}", "updated".cyan(), updated_at);
    }
    if let Some(context) = &decision.context {
        println!("{}:", "context".cyan());
        match serde_json::to_string_pretty(context) {
            Ok(text) => {
                for line in text.lines() {
                    println!("  {}", line);
                }
            }
            Err(_) => println!("  {}", context),
        }
    }
    if let Some(result) = &decision.result {
        println!("{}: {}", "result".cyan(), result);
    }
}

fn get(id: &str, format: OutputFormat, config: &Config) -> Result<()> {
    let decision = client(config)?
        .get_decision(id)
        .with_context(|| format!("Failed to fetch decision {}", id))?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&decision)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&decision)?),
        OutputFormat::Text => print_decision(&decision),
    }

    Ok(())
}

fn log_decision(decision_type: &str, action: &str, context: Option<&str>, config: &Config) -> Result<()> {
    let decision_type = parse_type(decision_type)?;
    let context = match context {
        Some(text) => match parse_json(text, "context")? {
            Value::Object(map) => map,
            other => eyre::bail!("Context must be a JSON object, got: {}", other),
        },
        None => Map::new(),
    };

    let recorder = DecisionRecorder::new(Arc::new(client(config)?), config.resolved_agent_id()?, "cli")
        .with_metadata(config.metadata.clone());
    let payload = NewDecision::proposed(
        recorder.agent_id(),
        decision_type,
        action,
        recorder.build_context(context, None),
    );

    let decision = recorder
        .api()
        .create_decision(&payload)
        .context("Failed to log decision")?;

    let id = decision.id.as_deref().unwrap_or("-");
    println!(
        "{} Logged {} {} ({})",
        "✓".green(),
        decision_type,
        action.cyan(),
        id
    );
    if let Some(status) = decision.status
        && status != DecisionStatus::Proposed
    {
        println!("  Status: {}", status_label(Some(status)));
    }

    Ok(())
}

fn transition(id: &str, status: &str, result: Option<&str>, config: &Config) -> Result<()> {
    let status = parse_status(status)?;
    let result = result.map(|text| parse_json(text, "result")).transpose()?;

    client(config)?
        .transition_decision(id, &Transition::new(status, result))
        .with_context(|| format!("Failed to transition decision {}", id))?;

    println!("{} {} → {}", "✓".green(), id.cyan(), status_label(Some(status)));
    Ok(())
}
