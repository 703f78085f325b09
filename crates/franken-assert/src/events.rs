use serde::{Deserialize, Serialize};

use crate::error::HarnessError;
use crate::realm::Realm;

pub const COMPONENT: &str = "conformance_assert";

/// One structured record per assertion or verification call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarnessEvent {
    pub trace_id: String,
    pub decision_id: String,
    pub policy_id: String,
    pub component: String,
    pub event: String,
    pub outcome: String,
    pub error_code: Option<String>,
    pub detail: Option<String>,
    pub env_fingerprint: String,
}

/// Append the outcome of `event` to the realm journal and hand the result
/// back unchanged.
pub(crate) fn record<T>(
    realm: &mut Realm,
    event: &str,
    result: Result<T, HarnessError>,
) -> Result<T, HarnessError> {
    if !realm.config().record_events {
        return result;
    }
    let (outcome, error_code, detail) = match &result {
        Ok(_) => ("pass", None, None),
        Err(err) => {
            let outcome = match err {
                HarnessError::Assertion { .. } => "fail",
                HarnessError::Usage { .. } => "usage_error",
                HarnessError::Unexpected { .. } => "unexpected",
                HarnessError::Config { .. } => "config_error",
            };
            (
                outcome,
                Some(err.code().to_string()),
                Some(err.message().to_string()),
            )
        }
    };
    let config = realm.config();
    let entry = HarnessEvent {
        trace_id: config.trace_id.clone(),
        decision_id: config.decision_id.clone(),
        policy_id: config.policy_id.clone(),
        component: COMPONENT.to_string(),
        event: event.to_string(),
        outcome: outcome.to_string(),
        error_code,
        detail,
        env_fingerprint: realm.env_fingerprint().to_string(),
    };
    realm.push_event(entry);
    result
}

/// Render events as JSON lines, one per event.
pub fn to_jsonl(events: &[HarnessEvent]) -> Result<String, serde_json::Error> {
    let mut out = String::new();
    for event in events {
        out.push_str(&serde_json::to_string(event)?);
        out.push('\n');
    }
    Ok(out)
}
