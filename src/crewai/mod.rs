//! CrewAI-style integration
//!
//! Crews, tasks and agents are described by plain structs; the host framework
//! drives a [`CrewObserver`] with lifecycle events.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::enforcement::Verdict;

pub mod observer;

pub use observer::{ContextGraphObserver, ObserverOptions};

/// Default endpoint for the CrewAI observer
pub const DEFAULT_API_URL: &str = "https://api.contextgraph.dev";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrewAgent {
    /// Stable identity of this agent instance
    pub id: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub goal: Option<String>,
}

impl CrewAgent {
    pub fn new(id: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Some(role.into()),
            goal: None,
        }
    }

    pub fn with_goal(mut self, goal: impl Into<String>) -> Self {
        self.goal = Some(goal.into());
        self
    }

    pub fn role_or_unknown(&self) -> &str {
        self.role.as_deref().unwrap_or("unknown_agent")
    }

    /// Key identifying this agent's in-flight actions
    pub fn reference(&self) -> String {
        format!("{}_{}", self.role_or_unknown(), self.id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Stable identity of this task instance
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub expected_output: Option<String>,
}

impl Task {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: Some(description.into()),
            expected_output: None,
        }
    }

    pub fn with_expected_output(mut self, expected_output: impl Into<String>) -> Self {
        self.expected_output = Some(expected_output.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crew {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub agents: Vec<CrewAgent>,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

/// Crew lifecycle callbacks
///
/// All hooks default to no-ops. Hooks that can stop work return a [`Verdict`].
#[allow(unused_variables)]
pub trait CrewObserver: Send + Sync {
    fn on_crew_start(&self, crew: &Crew) {}

    fn on_crew_end(&self, crew: &Crew, output: Option<&str>) {}

    fn on_crew_error(&self, crew: &Crew, error: &dyn fmt::Display) {}

    fn on_task_start(&self, task: &Task, agent: &CrewAgent) -> Verdict {
        Verdict::Allow
    }

    fn on_task_end(&self, task: &Task, output: Option<&str>) {}

    fn on_task_error(&self, task: &Task, error: &dyn fmt::Display) {}

    fn on_agent_action(&self, agent: &CrewAgent, action: &str, action_input: &Value) -> Verdict {
        Verdict::Allow
    }

    fn on_agent_finish(&self, agent: &CrewAgent, output: &Value) {}

    fn on_tool_use(&self, agent: &CrewAgent, tool_name: &str, tool_input: &Value, tool_output: &Value) {}

    fn on_tool_error(&self, agent: &CrewAgent, tool_name: &str, tool_input: &Value, error: &dyn fmt::Display) {}

    fn on_agent_thought(&self, agent: &CrewAgent, thought: &str) {}
}
