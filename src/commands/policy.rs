use colored::*;
use eyre::{Context, Result};
use serde_json::Value;
use std::fs;
use std::path::Path;

use contextgraph::policy::{Effect, PolicySet};

use super::read_input;
use crate::cli::{OutputFormat, PolicyAction};

pub fn run(action: PolicyAction) -> Result<()> {
    match action {
        PolicyAction::Check { file, decision, format } => {
            check(&file, decision.as_deref(), OutputFormat::resolve(format))
        }
    }
}

fn check(file: &Path, decision: Option<&str>, format: OutputFormat) -> Result<()> {
    let text = fs::read_to_string(file).with_context(|| format!("Failed to read policy file {}", file.display()))?;
    let policies =
        PolicySet::from_json(&text).with_context(|| format!("Failed to parse policy file {}", file.display()))?;

    let decision_str = read_input(decision, "decision")?;
    let decision: Value = serde_json::from_str(&decision_str).context("Failed to parse decision JSON")?;

    let evaluation = policies.evaluate(&decision);
    log::info!(
        "Evaluated {} policies from {}: {}",
        policies.policies.len(),
        file.display(),
        evaluation.effect
    );

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&evaluation)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&evaluation)?),
        OutputFormat::Text => {
            let effect = match evaluation.effect {
                Effect::Allow => evaluation.effect.to_string().green(),
                Effect::RequireApproval => evaluation.effect.to_string().yellow(),
                Effect::Deny => evaluation.effect.to_string().red(),
            };
            println!("{}: {}", "Effect".bold(), effect);
            println!("  Expected status: {}", evaluation.effect.expected_status());

            if evaluation.matched.is_empty() {
                println!("  {}", "No policies matched".dimmed());
            } else {
                println!("  Matched:");
                for name in &evaluation.matched {
                    println!("    - {}", name.cyan());
                }
            }
        }
    }

    Ok(())
}
