use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Reasons a `Ready`/`Synced` condition can carry, per `SPEC_FULL.md`
/// section 6 ("Status conditions written back").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ConditionReason {
    Creating,
    Available,
    Deleting,
    ReconcileError,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Condition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: bool,
    pub reason: ConditionReason,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default = "Utc::now")]
    pub last_transition_time: DateTime<Utc>,
}

impl Condition {
    pub fn ready(status: bool, reason: ConditionReason) -> Self {
        Self {
            type_: "Ready".to_string(),
            status,
            reason,
            message: None,
            last_transition_time: Utc::now(),
        }
    }

    pub fn synced(status: bool, reason: ConditionReason) -> Self {
        Self {
            type_: "Synced".to_string(),
            status,
            reason,
            message: None,
            last_transition_time: Utc::now(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Shared status shape, embedded (not subclassed — Rust has no
/// inheritance) in every resource kind's own `*Status` struct alongside
/// its `atProvider` observation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct Conditions {
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl Conditions {
    pub fn set(&mut self, condition: Condition) {
        self.conditions.retain(|c| c.type_ != condition.type_);
        self.conditions.push(condition);
    }
}
