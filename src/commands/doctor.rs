//! Diagnose ContextGraph setup issues

use colored::*;
use eyre::Result;

use contextgraph::config::Config;
use contextgraph::decision::DecisionQuery;
use contextgraph::error::ClientError;
use contextgraph::{DecisionApi, HttpClient, crewai, langchain};

pub fn run(config: &Config) -> Result<()> {
    println!("{}", "ContextGraph Doctor".bold());
    println!("{}", "═".repeat(50));
    println!();

    let mut issues = 0;

    // Check config file
    let config_file = Config::cg_dir().join("contextgraph.yaml");
    if config_file.exists() {
        println!("{} Config file: {}", "✓".green(), config_file.display());
    } else {
        println!("{} No config file at {} (using env/defaults)", "⚠".yellow(), config_file.display());
    }

    println!();
    println!("{}", "Credentials:".bold());

    let api_key = match config.resolved_api_key() {
        Ok(key) => {
            println!("  {} API key", "✓".green());
            Some(key)
        }
        Err(e) => {
            println!("  {} {}", "✗".red(), e);
            issues += 1;
            None
        }
    };

    match config.resolved_agent_id() {
        Ok(id) => println!("  {} Agent id: {}", "✓".green(), id.cyan()),
        Err(_) => println!("  {} Agent id not set (needed for LangChain adapters)", "⚠".yellow()),
    }
    match config.resolved_crew_id() {
        Ok(id) => println!("  {} Crew id: {}", "✓".green(), id.cyan()),
        Err(_) => println!("  {} Crew id not set (needed for the CrewAI observer)", "⚠".yellow()),
    }

    println!();
    println!("{}", "Connectivity:".bold());

    match api_key {
        Some(key) => {
            let mut urls = vec![config.resolved_api_url(langchain::DEFAULT_API_URL)];
            let crew_url = config.resolved_api_url(crewai::DEFAULT_API_URL);
            if !urls.contains(&crew_url) {
                urls.push(crew_url);
            }

            for url in urls {
                let client = HttpClient::new(&url, &key, config.timeout());
                let query = DecisionQuery {
                    limit: Some(1),
                    ..Default::default()
                };
                match client.list_decisions(&query) {
                    Ok(_) => println!("  {} {}", "✓".green(), url),
                    Err(ClientError::Status { code, .. }) if code == 401 || code == 403 => {
                        println!("  {} {} (API key rejected: HTTP {})", "✗".red(), url, code);
                        issues += 1;
                    }
                    Err(e) => {
                        println!("  {} {} ({})", "✗".red(), url, e);
                        issues += 1;
                    }
                }
            }
        }
        None => println!("  {} Skipped (no API key)", "⚠".yellow()),
    }

    println!();
    println!("{}", "Enforcement:".bold());
    if config.enforcement.enabled {
        println!(
            "  {} (fail {}, approval timeout {}s)",
            "enabled".green(),
            if config.enforcement.fail_closed { "closed" } else { "open" },
            config.enforcement.approval_timeout_secs
        );
    } else {
        println!("  {} (audit logging only)", "disabled".yellow());
    }
    if config.auto_approve {
        println!("  {} auto_approve is on; every decision is approved locally", "⚠".yellow());
    }

    println!();
    if issues == 0 {
        println!("{} All checks passed!", "✓".green().bold());
    } else {
        println!("{} {} issue(s) found", "✗".red().bold(), issues);
        std::process::exit(1);
    }

    Ok(())
}
