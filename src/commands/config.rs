use colored::*;
use eyre::Result;
use serde_json::Value;

use contextgraph::config::Config;
use contextgraph::crewai;
use contextgraph::langchain;

use crate::cli::{ConfigAction, OutputFormat};

pub fn run(action: ConfigAction, config: &Config) -> Result<()> {
    match action {
        ConfigAction::Show { format } => show(OutputFormat::resolve(format), config),
    }
}

/// Keep only enough of the key to recognise it
fn mask(key: &str) -> String {
    let prefix: String = key.chars().take(4).collect();
    format!("{}****", prefix)
}

/// The loaded config with the API key masked
fn redacted(config: &Config) -> Config {
    let mut config = config.clone();
    config.api_key = config.api_key.as_deref().map(mask);
    config
}

fn show(format: OutputFormat, config: &Config) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&redacted(config))?);
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(&redacted(config))?);
        }
        OutputFormat::Text => {
            println!("{}", "ContextGraph Configuration".bold());
            println!();

            let unset = || "(unset)".dimmed().to_string();
            println!("{}:", "credentials".cyan());
            println!(
                "  api_key: {}",
                config.resolved_api_key().map(|k| mask(&k)).unwrap_or_else(|_| unset())
            );
            println!("  agent_id: {}", config.resolved_agent_id().unwrap_or_else(|_| unset()));
            println!("  crew_id: {}", config.resolved_crew_id().unwrap_or_else(|_| unset()));
            println!();

            println!("{}:", "endpoints".cyan());
            println!("  langchain: {}", config.resolved_api_url(langchain::DEFAULT_API_URL));
            println!("  crewai: {}", config.resolved_api_url(crewai::DEFAULT_API_URL));
            println!("  timeout: {}s", config.timeout_secs);
            println!();

            println!("{}:", "langchain".cyan());
            println!("  log_llm_calls: {}", config.langchain.log_llm_calls);
            println!("  log_chain_calls: {}", config.langchain.log_chain_calls);
            println!("  log_model_calls: {}", config.langchain.log_model_calls);
            println!("  log_tool_calls: {}", config.langchain.log_tool_calls);
            println!();

            println!("{}:", "crewai".cyan());
            println!("  log_tool_calls: {}", config.crewai.log_tool_calls);
            println!("  log_agent_thoughts: {}", config.crewai.log_agent_thoughts);
            println!();

            println!("{}:", "enforcement".cyan());
            println!("  enabled: {}", config.enforcement.enabled);
            println!("  fail_closed: {}", config.enforcement.fail_closed);
            println!("  poll_interval_ms: {}", config.enforcement.poll_interval_ms);
            println!("  approval_timeout_secs: {}", config.enforcement.approval_timeout_secs);
            println!();

            println!("auto_approve: {}", config.auto_approve);
            println!("log_level: {}", config.log_level.as_filter());

            if !config.metadata.is_empty() {
                println!();
                println!("{}:", "metadata".cyan());
                for (key, value) in &config.metadata {
                    match value {
                        Value::String(s) => println!("  {}: {}", key, s),
                        other => println!("  {}: {}", key, other),
                    }
                }
            }
        }
    }

    Ok(())
}
