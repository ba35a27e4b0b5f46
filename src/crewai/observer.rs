//! Observer that logs CrewAI crew, task, agent and tool events
//!
//! Crew and task runs open decisions that are closed on completion; tool
//! uses are reported after the fact and closed immediately.

use serde_json::{Value, json};
use std::fmt;
use std::sync::{Mutex, PoisonError};

use super::{Crew, CrewAgent, CrewObserver, DEFAULT_API_URL, Task};
use crate::config::Config;
use crate::decision::{DecisionStatus, DecisionType};
use crate::enforcement::Verdict;
use crate::error::ConfigError;
use crate::recorder::{DecisionRecorder, InFlight, Reference, context_of};
use crate::serialize::{clip_value, truncate_chars};

const SOURCE: &str = "crewai";

const CREW_TASK_DESCRIPTION_LIMIT: usize = 200;
const TASK_TEXT_LIMIT: usize = 500;
const OUTPUT_LIMIT: usize = 5000;
const TOOL_OUTPUT_LIMIT: usize = 2000;
const THOUGHT_LIMIT: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserverOptions {
    pub log_tool_calls: bool,
    pub log_agent_thoughts: bool,
}

impl Default for ObserverOptions {
    fn default() -> Self {
        Self {
            log_tool_calls: true,
            log_agent_thoughts: true,
        }
    }
}

pub struct ContextGraphObserver {
    recorder: DecisionRecorder,
    options: ObserverOptions,
    active: InFlight,
    crew_decision: Mutex<Option<String>>,
}

impl ContextGraphObserver {
    pub fn new(recorder: DecisionRecorder, options: ObserverOptions) -> Self {
        Self {
            recorder,
            options,
            active: InFlight::new(),
            crew_decision: Mutex::new(None),
        }
    }

    /// Build an HTTP-backed observer; the crew id is the acting agent id
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        config.resolved_api_key()?;
        let crew_id = config.resolved_crew_id()?;
        let recorder = DecisionRecorder::from_config(config, crew_id, DEFAULT_API_URL, SOURCE)?;
        let options = ObserverOptions {
            log_tool_calls: config.crewai.log_tool_calls,
            log_agent_thoughts: config.crewai.log_agent_thoughts,
        };
        Ok(Self::new(recorder, options))
    }

    pub fn options(&self) -> ObserverOptions {
        self.options
    }

    /// Tasks and agent actions with an open decision
    pub fn open_decisions(&self) -> usize {
        self.active.len()
    }

    fn take_crew_decision(&self) -> Option<String> {
        self.crew_decision.lock().unwrap_or_else(PoisonError::into_inner).take()
    }

    fn action_key(agent: &CrewAgent) -> String {
        format!("action_{}", agent.reference())
    }
}

/// Clipped output, or null when there is none
fn clipped_output(output: Option<&str>) -> Value {
    match output {
        Some(text) if !text.is_empty() => Value::String(truncate_chars(text, OUTPUT_LIMIT)),
        _ => Value::Null,
    }
}

fn clipped_text(text: Option<&str>, max: usize) -> String {
    truncate_chars(text.unwrap_or_default(), max)
}

impl CrewObserver for ContextGraphObserver {
    fn on_crew_start(&self, crew: &Crew) {
        let agents: Vec<Value> = crew
            .agents
            .iter()
            .map(|agent| json!({ "name": agent.role, "goal": agent.goal }))
            .collect();
        let tasks: Vec<Value> = crew
            .tasks
            .iter()
            .map(|task| {
                let description = task
                    .description
                    .as_deref()
                    .filter(|d| !d.is_empty())
                    .map(|d| truncate_chars(d, CREW_TASK_DESCRIPTION_LIMIT));
                json!({ "description": description })
            })
            .collect();

        let decision_id = self.recorder.log_decision(
            DecisionType::CrewExecution,
            "start_crew",
            context_of([
                ("crew_name", json!(crew.name.as_deref().unwrap_or("unnamed_crew"))),
                ("agents", json!(agents)),
                ("tasks", json!(tasks)),
                ("num_agents", json!(agents.len())),
                ("num_tasks", json!(tasks.len())),
            ]),
            None,
        );

        *self.crew_decision.lock().unwrap_or_else(PoisonError::into_inner) = decision_id;
    }

    fn on_crew_end(&self, _crew: &Crew, output: Option<&str>) {
        if let Some(id) = self.take_crew_decision() {
            self.recorder.transition(
                &id,
                DecisionStatus::Executed,
                Some(json!({ "output": clipped_output(output), "success": true })),
            );
        }
    }

    fn on_crew_error(&self, _crew: &Crew, error: &dyn fmt::Display) {
        if let Some(id) = self.take_crew_decision() {
            self.recorder
                .transition(&id, DecisionStatus::Failed, Some(json!({ "error": error.to_string() })));
        }
    }

    fn on_task_start(&self, task: &Task, agent: &CrewAgent) -> Verdict {
        let proposal = self.recorder.propose(
            DecisionType::TaskExecution,
            "execute_task",
            context_of([
                ("task_description", json!(clipped_text(task.description.as_deref(), TASK_TEXT_LIMIT))),
                ("expected_output", json!(clipped_text(task.expected_output.as_deref(), TASK_TEXT_LIMIT))),
                ("agent_name", json!(agent.role_or_unknown())),
                ("agent_goal", json!(agent.goal)),
            ]),
            Some(&Reference::reference_id(task.id.clone())),
        );

        if let Some(id) = proposal.decision_id
            && !proposal.verdict.is_blocked()
        {
            self.active.track(task.id.clone(), id);
        }
        proposal.verdict
    }

    fn on_task_end(&self, task: &Task, output: Option<&str>) {
        if let Some(id) = self.active.take(&task.id) {
            self.recorder
                .transition(&id, DecisionStatus::Executed, Some(json!({ "output": clipped_output(output) })));
        }
    }

    fn on_task_error(&self, task: &Task, error: &dyn fmt::Display) {
        if let Some(id) = self.active.take(&task.id) {
            self.recorder
                .transition(&id, DecisionStatus::Failed, Some(json!({ "error": error.to_string() })));
        }
    }

    fn on_agent_action(&self, agent: &CrewAgent, action: &str, action_input: &Value) -> Verdict {
        let proposal = self.recorder.propose(
            DecisionType::AgentAction,
            action,
            context_of([
                ("agent_name", json!(agent.role_or_unknown())),
                ("action", json!(action)),
                ("action_input", action_input.clone()),
            ]),
            Some(&Reference::reference_id(agent.reference())),
        );

        if let Some(id) = proposal.decision_id
            && !proposal.verdict.is_blocked()
        {
            self.active.track(Self::action_key(agent), id);
        }
        proposal.verdict
    }

    fn on_agent_finish(&self, agent: &CrewAgent, output: &Value) {
        if let Some(id) = self.active.take(&Self::action_key(agent)) {
            self.recorder
                .transition(&id, DecisionStatus::Executed, Some(json!({ "output": output })));
        }
    }

    fn on_tool_use(&self, agent: &CrewAgent, tool_name: &str, tool_input: &Value, tool_output: &Value) {
        if !self.options.log_tool_calls {
            return;
        }

        let decision_id = self.recorder.log_decision(
            DecisionType::ToolUsage,
            tool_name,
            context_of([
                ("agent_name", json!(agent.role_or_unknown())),
                ("tool_name", json!(tool_name)),
                ("tool_input", tool_input.clone()),
                ("tool_output", clip_value(tool_output.clone(), TOOL_OUTPUT_LIMIT)),
            ]),
            None,
        );

        // Tool uses are reported after the fact
        if let Some(id) = decision_id {
            self.recorder.transition(&id, DecisionStatus::Executed, None);
        }
    }

    fn on_tool_error(&self, agent: &CrewAgent, tool_name: &str, tool_input: &Value, error: &dyn fmt::Display) {
        if !self.options.log_tool_calls {
            return;
        }

        let decision_id = self.recorder.log_decision(
            DecisionType::ToolUsage,
            tool_name,
            context_of([
                ("agent_name", json!(agent.role_or_unknown())),
                ("tool_name", json!(tool_name)),
                ("tool_input", tool_input.clone()),
            ]),
            None,
        );

        if let Some(id) = decision_id {
            self.recorder
                .transition(&id, DecisionStatus::Failed, Some(json!({ "error": error.to_string() })));
        }
    }

    fn on_agent_thought(&self, agent: &CrewAgent, thought: &str) {
        if !self.options.log_agent_thoughts {
            return;
        }

        self.recorder.log_decision(
            DecisionType::AgentReasoning,
            "think",
            context_of([
                ("agent_name", json!(agent.role_or_unknown())),
                ("thought", json!(truncate_chars(thought, THOUGHT_LIMIT))),
            ]),
            None,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockApi;
    use crate::enforcement::Enforcement;
    use std::sync::Arc;

    fn observer(api: &Arc<MockApi>, options: ObserverOptions) -> ContextGraphObserver {
        ContextGraphObserver::new(DecisionRecorder::new(api.clone(), "research-crew", SOURCE), options)
    }

    fn researcher() -> CrewAgent {
        CrewAgent::new("a1", "Researcher").with_goal("find sources")
    }

    fn crew() -> Crew {
        Crew {
            name: Some("research".to_string()),
            agents: vec![researcher(), CrewAgent::new("a2", "Writer")],
            tasks: vec![Task::new("t1", "x".repeat(300)), Task::default()],
        }
    }

    #[test]
    fn test_crew_start_context() {
        let api = Arc::new(MockApi::new());
        let obs = observer(&api, ObserverOptions::default());
        obs.on_crew_start(&crew());

        let created = api.last_created();
        assert_eq!(created.agent_id, "research-crew");
        assert_eq!(created.decision_type, DecisionType::CrewExecution);
        assert_eq!(created.action, "start_crew");
        assert_eq!(created.context["crew_name"], "research");
        assert_eq!(created.context["num_agents"], 2);
        assert_eq!(created.context["num_tasks"], 2);
        assert_eq!(
            created.context["agents"][0],
            json!({"name": "Researcher", "goal": "find sources"})
        );
        assert_eq!(created.context["tasks"][0]["description"].as_str().unwrap().len(), 200);
        assert_eq!(created.context["tasks"][1]["description"], Value::Null);
        assert_eq!(created.context["source"], "crewai");
    }

    #[test]
    fn test_unnamed_crew() {
        let api = Arc::new(MockApi::new());
        let obs = observer(&api, ObserverOptions::default());
        obs.on_crew_start(&Crew::default());
        assert_eq!(api.last_created().context["crew_name"], "unnamed_crew");
    }

    #[test]
    fn test_crew_end_closes_once() {
        let api = Arc::new(MockApi::new());
        let obs = observer(&api, ObserverOptions::default());
        let crew = crew();
        obs.on_crew_start(&crew);
        obs.on_crew_end(&crew, Some("final report"));
        obs.on_crew_end(&crew, Some("again"));

        let transitions = api.transitions();
        assert_eq!(transitions.len(), 1);
        assert_eq!(
            transitions[0].1.result,
            Some(json!({"output": "final report", "success": true}))
        );
    }

    #[test]
    fn test_crew_error() {
        let api = Arc::new(MockApi::new());
        let obs = observer(&api, ObserverOptions::default());
        let crew = crew();
        obs.on_crew_start(&crew);
        obs.on_crew_error(&crew, &"agent crashed");
        assert_eq!(api.transitions()[0].1.status, DecisionStatus::Failed);
        assert_eq!(api.transitions()[0].1.result, Some(json!({"error": "agent crashed"})));
    }

    #[test]
    fn test_task_lifecycle() {
        let api = Arc::new(MockApi::new());
        let obs = observer(&api, ObserverOptions::default());
        let task = Task::new("task-7", "Summarise the paper").with_expected_output("A summary");

        let verdict = obs.on_task_start(&task, &researcher());
        assert_eq!(verdict, Verdict::Allow);

        let created = api.last_created();
        assert_eq!(created.decision_type, DecisionType::TaskExecution);
        assert_eq!(created.action, "execute_task");
        assert_eq!(created.context["task_description"], "Summarise the paper");
        assert_eq!(created.context["expected_output"], "A summary");
        assert_eq!(created.context["agent_name"], "Researcher");
        assert_eq!(created.context["agent_goal"], "find sources");
        assert_eq!(created.context["reference_id"], "task-7");

        let long_output = "y".repeat(6000);
        obs.on_task_end(&task, Some(&long_output));
        let result = api.transitions()[0].1.result.clone().unwrap();
        assert_eq!(result["output"].as_str().unwrap().len(), 5000);
    }

    #[test]
    fn test_task_end_without_output() {
        let api = Arc::new(MockApi::new());
        let obs = observer(&api, ObserverOptions::default());
        let task = Task::new("t", "d");
        obs.on_task_start(&task, &researcher());
        obs.on_task_end(&task, Some(""));
        assert_eq!(api.transitions()[0].1.result, Some(json!({"output": null})));
    }

    #[test]
    fn test_agent_action_and_finish() {
        let api = Arc::new(MockApi::new());
        let obs = observer(&api, ObserverOptions::default());
        let agent = researcher();

        obs.on_agent_action(&agent, "search_web", &json!({"q": "rust"}));
        let created = api.last_created();
        assert_eq!(created.decision_type, DecisionType::AgentAction);
        assert_eq!(created.action, "search_web");
        assert_eq!(created.context["reference_id"], "Researcher_a1");

        // A different agent finishing does not close it
        obs.on_agent_finish(&CrewAgent::new("a2", "Writer"), &json!("x"));
        assert!(api.transitions().is_empty());

        obs.on_agent_finish(&agent, &json!(["r1", "r2"]));
        assert_eq!(api.transitions()[0].1.result, Some(json!({"output": ["r1", "r2"]})));
    }

    #[test]
    fn test_tool_use_closed_immediately() {
        let api = Arc::new(MockApi::new());
        let obs = observer(&api, ObserverOptions::default());
        obs.on_tool_use(&researcher(), "scraper", &json!({"url": "u"}), &json!("z".repeat(3000)));

        let created = api.last_created();
        assert_eq!(created.decision_type, DecisionType::ToolUsage);
        assert_eq!(created.context["tool_output"].as_str().unwrap().len(), 2000);

        let transitions = api.transitions();
        assert_eq!(transitions.len(), 1);
        assert_eq!(transitions[0].1.status, DecisionStatus::Executed);
        assert!(transitions[0].1.result.is_none());
    }

    #[test]
    fn test_tool_error() {
        let api = Arc::new(MockApi::new());
        let obs = observer(&api, ObserverOptions::default());
        obs.on_tool_error(&researcher(), "scraper", &json!({}), &"timeout");
        assert!(api.last_created().context.get("tool_output").is_none());
        assert_eq!(api.transitions()[0].1.result, Some(json!({"error": "timeout"})));
    }

    #[test]
    fn test_tool_calls_disabled() {
        let api = Arc::new(MockApi::new());
        let obs = observer(
            &api,
            ObserverOptions {
                log_tool_calls: false,
                ..ObserverOptions::default()
            },
        );
        obs.on_tool_use(&researcher(), "scraper", &json!({}), &json!("out"));
        obs.on_tool_error(&researcher(), "scraper", &json!({}), &"timeout");
        assert!(api.created().is_empty());
    }

    #[test]
    fn test_agent_thought() {
        let api = Arc::new(MockApi::new());
        let obs = observer(&api, ObserverOptions::default());
        obs.on_agent_thought(&CrewAgent::default(), &"t".repeat(2500));

        let created = api.last_created();
        assert_eq!(created.decision_type, DecisionType::AgentReasoning);
        assert_eq!(created.action, "think");
        assert_eq!(created.context["agent_name"], "unknown_agent");
        assert_eq!(created.context["thought"].as_str().unwrap().len(), 2000);
        assert!(api.transitions().is_empty());

        let quiet = observer(
            &api,
            ObserverOptions {
                log_agent_thoughts: false,
                ..ObserverOptions::default()
            },
        );
        quiet.on_agent_thought(&researcher(), "hmm");
        assert_eq!(api.created().len(), 1);
    }

    #[test]
    fn test_pending_task_approved_by_reviewer() {
        let api = Arc::new(MockApi::with_create_status(DecisionStatus::PendingApproval));
        api.queue_polls(&[DecisionStatus::PendingApproval, DecisionStatus::Approved]);
        let recorder = DecisionRecorder::new(api.clone(), "crew", SOURCE).with_enforcement(Some(Enforcement {
            fail_closed: false,
            poll_interval: std::time::Duration::from_millis(1),
            approval_timeout: std::time::Duration::from_secs(5),
        }));
        let obs = ContextGraphObserver::new(recorder, ObserverOptions::default());

        let verdict = obs.on_task_start(&Task::new("t", "deploy"), &researcher());
        assert_eq!(verdict, Verdict::Allow);
        assert_eq!(*api.polls.lock().unwrap(), 2);
    }

    #[test]
    fn test_denied_task_and_action_not_tracked() {
        let api = Arc::new(MockApi::with_create_status(DecisionStatus::Denied));
        let recorder = DecisionRecorder::new(api.clone(), "crew", SOURCE).with_enforcement(Some(Enforcement::default()));
        let obs = ContextGraphObserver::new(recorder, ObserverOptions::default());

        let task = Task::new("t", "drop prod tables");
        assert!(obs.on_task_start(&task, &researcher()).is_blocked());
        assert!(obs.on_agent_action(&researcher(), "drop_table", &json!({"table": "users"})).is_blocked());
        assert_eq!(obs.open_decisions(), 0);

        obs.on_task_error(&task, &"aborted");
        obs.on_agent_finish(&researcher(), &json!(null));
        assert!(api.transitions().is_empty());
    }

    #[test]
    fn test_from_config_requires_crew_id() {
        let config = Config {
            api_key: Some("k".to_string()),
            ..Config::default()
        };
        if std::env::var("CG_CREW_ID").is_err() {
            assert!(matches!(
                ContextGraphObserver::from_config(&config),
                Err(ConfigError::MissingCrewId)
            ));
        }
    }
}
