pub mod completions;
pub mod config;
pub mod decision;
pub mod doctor;
pub mod guard;
pub mod policy;

use eyre::{Context, Result};
use std::io::{self, Read};

use contextgraph::HttpClient;
use contextgraph::config::Config;
use contextgraph::langchain::DEFAULT_API_URL;

/// Use the inline argument, or read everything from stdin
pub(crate) fn read_input(inline: Option<&str>, what: &str) -> Result<String> {
    match inline {
        Some(text) => Ok(text.to_string()),
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .with_context(|| format!("Failed to read {} from stdin", what))?;
            Ok(buffer)
        }
    }
}

/// HTTP client for the configured endpoint
pub(crate) fn client(config: &Config) -> Result<HttpClient> {
    let api_key = config.resolved_api_key()?;
    Ok(HttpClient::new(
        &config.resolved_api_url(DEFAULT_API_URL),
        &api_key,
        config.timeout(),
    ))
}
