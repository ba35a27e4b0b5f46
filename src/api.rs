//! The decisions API seam
//!
//! Adapters talk to the service only through [`DecisionApi`], so they can be
//! driven by the HTTP client in production and by recorders in tests.

use crate::decision::{Decision, DecisionQuery, NewDecision, Transition};
use crate::error::ClientError;

/// Operations the ContextGraph service exposes for decisions
pub trait DecisionApi: Send + Sync {
    /// `POST /v1/decisions`
    fn create_decision(&self, decision: &NewDecision) -> Result<Decision, ClientError>;

    /// `POST /v1/decisions/{id}/transition`
    fn transition_decision(&self, id: &str, transition: &Transition) -> Result<(), ClientError>;

    /// `GET /v1/decisions/{id}`
    fn get_decision(&self, id: &str) -> Result<Decision, ClientError>;

    /// `GET /v1/decisions`
    fn list_decisions(&self, query: &DecisionQuery) -> Result<Vec<Decision>, ClientError>;
}
