//! Activity notification rule
//!
//! Picks one canned notification from the recent step count reported by a
//! client: fewer than [`ACTIVE_STEPS_THRESHOLD`] steps is "inactive".

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Step delta at or above which the user counts as active
pub const ACTIVE_STEPS_THRESHOLD: i64 = 50;

/// Client context sent to `/notify`; every field is optional
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotifyPayload {
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub day_of_week: Option<String>,
    /// Object that may hold `steps_delta`
    #[serde(default)]
    pub metrics: Option<Value>,
    #[serde(default)]
    pub location: Option<Value>,
}

impl NotifyPayload {
    pub fn with_steps(steps: impl Into<Value>) -> Self {
        Self {
            metrics: Some(serde_json::json!({ "steps_delta": steps.into() })),
            ..Default::default()
        }
    }

    /// `metrics.steps_delta` as an integer; missing or non-numeric is 0
    pub fn steps_delta(&self) -> i64 {
        self.metrics
            .as_ref()
            .and_then(|m| m.get("steps_delta"))
            .and_then(parse_steps)
            .unwrap_or(0)
    }
}

/// Integers as-is, finite floats truncated toward zero, integer strings parsed
fn parse_steps(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite())
                .map(|f| f.trunc().clamp(i64::MIN as f64, i64::MAX as f64) as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

impl Notification {
    pub fn inactive() -> Self {
        Self {
            title: "Time to move".to_string(),
            body: "You’ve been inactive recently. Take a short walk 😊".to_string(),
        }
    }

    pub fn active() -> Self {
        Self {
            title: "Nice!".to_string(),
            body: "Good job staying active today 💪".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifyResponse {
    pub notifications: Vec<Notification>,
}

/// Always exactly one notification
pub fn notify(payload: &NotifyPayload) -> NotifyResponse {
    let notification = if payload.steps_delta() < ACTIVE_STEPS_THRESHOLD {
        Notification::inactive()
    } else {
        Notification::active()
    };
    NotifyResponse {
        notifications: vec![notification],
    }
}
