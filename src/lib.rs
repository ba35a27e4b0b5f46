//! ContextGraph Cloud adapters for agent frameworks
//!
//! Forwards agent lifecycle events (tool calls, model calls, chain, crew and
//! task execution) to the ContextGraph decisions API for audit trails and
//! policy enforcement.
//!
//! - [`langchain::ContextGraphCallback`] and [`langchain::ContextGraphMiddleware`]
//!   for LangChain-style agents
//! - [`crewai::ContextGraphObserver`] for CrewAI-style crews
//!
//! ```no_run
//! use contextgraph::config::Config;
//! use contextgraph::langchain::{CallbackHandler, ContextGraphCallback, RunContext};
//! use serde_json::json;
//!
//! let config = Config::load(None)?;
//! let callback = ContextGraphCallback::from_config(&config)?;
//!
//! let run = RunContext::new(uuid::Uuid::new_v4());
//! let verdict = callback.on_tool_start(&json!({"name": "search"}), "rust", None, &run);
//! if !verdict.is_blocked() {
//!     callback.on_tool_end("3 results", &run);
//! }
//! # Ok::<(), eyre::Report>(())
//! ```

pub mod api;
pub mod client;
pub mod config;
pub mod crewai;
pub mod decision;
pub mod enforcement;
pub mod error;
pub mod langchain;
pub mod policy;
pub mod recorder;
pub mod serialize;

pub use api::DecisionApi;
pub use client::HttpClient;
pub use decision::{Decision, DecisionStatus, DecisionType};
pub use enforcement::{Enforcement, Verdict};
pub use error::{ActionBlocked, ClientError, ConfigError};
pub use recorder::DecisionRecorder;
