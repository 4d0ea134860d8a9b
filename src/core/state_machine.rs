//! State machine for tracking a single publish run
//!
//! A run moves `NotStarted → Packing → InFlight → Completed`, may stop at
//! `Completed` straight from `Packing` on a dry run, and can fall into `Failed`
//! from any non-terminal state. State lives in memory for one invocation only.

use crate::core::error::PublishError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Publishing state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PublishState {
    NotStarted,
    Packing,
    InFlight,
    Completed,
    Failed,
}

impl PublishState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PublishState::Completed | PublishState::Failed)
    }

    fn can_transition_to(&self, to: PublishState) -> bool {
        use PublishState::*;
        matches!(
            (*self, to),
            (NotStarted, Packing)
                | (Packing, InFlight)
                | (Packing, Completed)
                | (InFlight, Completed)
                | (NotStarted | Packing | InFlight, Failed)
        )
    }
}

impl fmt::Display for PublishState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// State transition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StateTransition {
    /// From state
    pub from: PublishState,

    /// To state
    pub to: PublishState,

    /// Timestamp
    pub timestamp: DateTime<Utc>,

    /// Additional metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

/// State machine for one publish run
#[derive(Debug)]
pub struct PublishStateMachine {
    current_state: PublishState,
    transitions: Vec<StateTransition>,
    started_at: DateTime<Utc>,
    error: Option<String>,
}

impl Default for PublishStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl PublishStateMachine {
    /// Create a new state machine
    pub fn new() -> Self {
        Self {
            current_state: PublishState::NotStarted,
            transitions: Vec::new(),
            started_at: Utc::now(),
            error: None,
        }
    }

    /// Transition to a new state
    ///
    /// Returns [`PublishError::InvalidStateTransition`] for transitions the
    /// run lifecycle does not allow.
    pub fn transition(
        &mut self,
        to: PublishState,
        metadata: Option<HashMap<String, serde_json::Value>>,
    ) -> Result<(), PublishError> {
        if !self.current_state.can_transition_to(to) {
            return Err(PublishError::InvalidStateTransition {
                from: self.current_state.to_string(),
                to: to.to_string(),
            });
        }

        if let Some(serde_json::Value::String(error)) =
            metadata.as_ref().and_then(|meta| meta.get("error"))
        {
            self.error = Some(error.clone());
        }

        self.transitions.push(StateTransition {
            from: self.current_state,
            to,
            timestamp: Utc::now(),
            metadata,
        });
        self.current_state = to;

        Ok(())
    }

    /// Move to `Failed` recording `error`, unless the run already ended
    pub fn fail(&mut self, error: &str) {
        if self.current_state.is_terminal() {
            return;
        }

        let mut metadata = HashMap::new();
        metadata.insert(
            "error".to_string(),
            serde_json::Value::String(error.to_string()),
        );
        // Every non-terminal state may fail.
        let _ = self.transition(PublishState::Failed, Some(metadata));
    }

    /// Get current state
    pub fn get_state(&self) -> PublishState {
        self.current_state
    }

    /// Get transitions so far
    pub fn transitions(&self) -> &[StateTransition] {
        &self.transitions
    }

    /// Get last error
    pub fn get_last_error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Get elapsed milliseconds since the machine was created
    pub fn get_elapsed_time(&self) -> i64 {
        let end = self
            .transitions
            .last()
            .map(|t| t.timestamp)
            .unwrap_or_else(Utc::now);

        (end - self.started_at).num_milliseconds()
    }

    /// Get transition history as human-readable string
    pub fn get_history(&self) -> String {
        self.transitions
            .iter()
            .map(|t| {
                let time = t.timestamp.to_rfc3339();
                let meta = if let Some(metadata) = &t.metadata {
                    format!(" ({})", serde_json::to_string(metadata).unwrap_or_default())
                } else {
                    String::new()
                };
                format!("{}: {:?} → {:?}{}", time, t.from, t.to, meta)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
