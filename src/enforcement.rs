//! Policy enforcement gate
//!
//! Turns the status the service assigns to a freshly proposed decision into a
//! local [`Verdict`]. Decisions that need human approval are polled until a
//! reviewer answers or the approval window closes.

use std::thread;
use std::time::{Duration, Instant};

use crate::api::DecisionApi;
use crate::decision::DecisionStatus;

/// Outcome of gating an action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Let the action proceed
    Allow,
    /// Stop the action
    Block { decision_id: Option<String>, message: String },
    /// Something went wrong talking to the service (does not block)
    Error { message: String },
}

impl Verdict {
    /// Process exit code for hook-style callers (2 blocks)
    pub fn exit_code(&self) -> i32 {
        match self {
            Verdict::Allow => 0,
            Verdict::Block { .. } => 2,
            Verdict::Error { .. } => 0,
        }
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, Verdict::Block { .. })
    }
}

/// Enforcement settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enforcement {
    /// Block when the service cannot be reached
    pub fail_closed: bool,
    pub poll_interval: Duration,
    pub approval_timeout: Duration,
}

impl Default for Enforcement {
    fn default() -> Self {
        Self {
            fail_closed: false,
            poll_interval: Duration::from_secs(1),
            approval_timeout: Duration::from_secs(300),
        }
    }
}

impl Enforcement {
    /// Verdict for a decision the service accepted with `status`
    pub fn judge(&self, api: &dyn DecisionApi, decision_id: Option<&str>, status: DecisionStatus) -> Verdict {
        if status.is_blocking() {
            return Verdict::Block {
                decision_id: decision_id.map(str::to_string),
                message: format!("decision {}", status),
            };
        }

        if status.is_pending() {
            return match decision_id {
                Some(id) => self.await_approval(api, id),
                None => Verdict::Block {
                    decision_id: None,
                    message: "approval required but the service returned no decision id".to_string(),
                },
            };
        }

        Verdict::Allow
    }

    /// Verdict when the decision could not be created at all
    pub fn unreachable(&self, error: &str) -> Verdict {
        if self.fail_closed {
            Verdict::Block {
                decision_id: None,
                message: format!("ContextGraph unavailable: {}", error),
            }
        } else {
            Verdict::Error {
                message: error.to_string(),
            }
        }
    }

    fn await_approval(&self, api: &dyn DecisionApi, id: &str) -> Verdict {
        log::info!("Decision {} awaiting approval (timeout {:?})", id, self.approval_timeout);
        // Timeouts too large to represent never expire
        let deadline = Instant::now().checked_add(self.approval_timeout);

        while deadline.is_none_or(|deadline| Instant::now() < deadline) {
            thread::sleep(self.poll_interval);

            let status = match api.get_decision(id) {
                Ok(decision) => decision.status.unwrap_or(DecisionStatus::Unknown),
                Err(e) => {
                    log::warn!("Failed to poll decision {}: {}", id, e);
                    continue;
                }
            };

            if status.is_cleared() {
                log::info!("Decision {} {}", id, status);
                return Verdict::Allow;
            }
            if status.is_blocking() {
                log::info!("Decision {} {}", id, status);
                return Verdict::Block {
                    decision_id: Some(id.to_string()),
                    message: format!("decision {}", status),
                };
            }
        }

        log::warn!("Decision {} timed out awaiting approval", id);
        Verdict::Block {
            decision_id: Some(id.to_string()),
            message: format!("approval timed out after {}s", self.approval_timeout.as_secs()),
        }
    }
}
