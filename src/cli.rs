use clap::{Parser, Subcommand, ValueEnum};
use std::io::IsTerminal;
use std::path::PathBuf;

/// Output format for commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

impl OutputFormat {
    /// Resolve the effective output format.
    /// If user specified a format, use it.
    /// Otherwise: TTY → Text, non-TTY (pipe) → Json
    pub fn resolve(user_choice: Option<OutputFormat>) -> OutputFormat {
        match user_choice {
            Some(fmt) => fmt,
            None => {
                if std::io::stdout().is_terminal() {
                    OutputFormat::Text
                } else {
                    OutputFormat::Json
                }
            }
        }
    }
}

#[derive(Parser)]
#[command(
    name = "cg",
    about = "ContextGraph Cloud - audit and policy enforcement for agent decisions",
    version = env!("GIT_DESCRIBE"),
    after_help = "Logs are written to: ~/.local/share/contextgraph/logs/cg.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to contextgraph.yaml config file")]
    pub config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true, help = "Log at debug level")]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose", help = "Only log errors")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log, inspect and transition decisions
    Decision {
        #[command(subcommand)]
        action: DecisionAction,
    },

    /// Gate a tool call from a hook payload (exit 0 = allow, 2 = block)
    Guard {
        /// Hook payload JSON (reads from stdin if not provided)
        #[arg(long)]
        payload: Option<String>,
    },

    /// Work with policy documents locally
    Policy {
        #[command(subcommand)]
        action: PolicyAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Diagnose setup issues
    Doctor,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
pub enum DecisionAction {
    /// List decisions
    List {
        /// Filter by decision type (tool_execution, model_call, ...)
        #[arg(long = "type")]
        decision_type: Option<String>,

        /// Filter by status (proposed, approved, denied, ...)
        #[arg(long)]
        status: Option<String>,

        /// Filter by agent id (defaults to the configured agent)
        #[arg(long)]
        agent_id: Option<String>,

        /// Max results
        #[arg(long, default_value = "20")]
        limit: usize,

        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },

    /// Show a single decision
    Get {
        /// Decision id
        id: String,

        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },

    /// Log a new decision
    Log {
        /// Decision type
        #[arg(long = "type")]
        decision_type: String,

        /// Action or tool name
        #[arg(long)]
        action: String,

        /// Context JSON object
        #[arg(long)]
        context: Option<String>,
    },

    /// Transition a decision to a new status
    Transition {
        /// Decision id
        id: String,

        /// New status (approved, denied, executed, failed, ...)
        status: String,

        /// Result JSON
        #[arg(long)]
        result: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum PolicyAction {
    /// Evaluate a decision against a policy file
    Check {
        /// Policy JSON file (single policy or array)
        file: PathBuf,

        /// Decision JSON (reads from stdin if not provided)
        #[arg(long)]
        decision: Option<String>,

        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show {
        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },
}
