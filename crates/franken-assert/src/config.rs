use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::HarnessError;

/// Largest valid array length, written to `length` by the writability probe.
pub const DEFAULT_ARRAY_LENGTH_PROBE: f64 = 4_294_967_295.0;
pub const DEFAULT_WRITABILITY_SENTINEL: &str = "unlikelyValue";
pub const DEFAULT_MAX_EVENTS: usize = 10_000;

/// Realm-wide harness settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub trace_id: String,
    pub decision_id: String,
    pub policy_id: String,
    /// Failed `[[Set]]`/`[[Delete]]` raise TypeError when set; otherwise they
    /// fail silently, as in sloppy-mode code.
    pub strict_mode: bool,
    /// Value the writability probe writes to ordinary properties.
    pub writability_sentinel: String,
    /// Value the writability probe writes to an array's `length`.
    pub array_length_probe: f64,
    /// Append a [`crate::events::HarnessEvent`] per assertion call.
    pub record_events: bool,
    /// Journal capacity; the oldest event is dropped past it.
    pub max_events: usize,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            trace_id: "trace-harness".to_string(),
            decision_id: "decision-harness".to_string(),
            policy_id: "policy-harness-es2020".to_string(),
            strict_mode: true,
            writability_sentinel: DEFAULT_WRITABILITY_SENTINEL.to_string(),
            array_length_probe: DEFAULT_ARRAY_LENGTH_PROBE,
            record_events: true,
            max_events: DEFAULT_MAX_EVENTS,
        }
    }
}

impl HarnessConfig {
    pub fn validate(&self) -> Result<(), HarnessError> {
        if self.trace_id.trim().is_empty() {
            return Err(config_error("trace_id is required"));
        }
        if self.decision_id.trim().is_empty() {
            return Err(config_error("decision_id is required"));
        }
        if self.policy_id.trim().is_empty() {
            return Err(config_error("policy_id is required"));
        }
        // An empty sentinel is falsy and could collide with real values.
        if self.writability_sentinel.is_empty() {
            return Err(config_error("writability_sentinel must be non-empty"));
        }
        let probe = self.array_length_probe;
        if !(probe.is_finite() && probe >= 0.0 && probe.fract() == 0.0 && probe <= DEFAULT_ARRAY_LENGTH_PROBE)
        {
            return Err(config_error(
                "array_length_probe must be an integer in 0..=4294967295",
            ));
        }
        if self.record_events && self.max_events == 0 {
            return Err(config_error("max_events must be positive when recording events"));
        }
        Ok(())
    }

    pub fn from_json_str(content: &str) -> Result<Self, HarnessError> {
        let config: Self = serde_json::from_str(content)
            .map_err(|err| config_error(format!("config parse error: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, HarnessError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|err| config_error(format!("cannot read {}: {err}", path.display())))?;
        Self::from_json_str(&content)
    }

    /// Hash of the settings that change probe behavior. Correlation ids are
    /// excluded so two runs with the same semantics share a fingerprint.
    pub fn fingerprint(&self) -> String {
        let envelope = format!(
            "strict={};sentinel={};array_length_probe={}",
            self.strict_mode, self.writability_sentinel, self.array_length_probe
        );
        sha256_hex(envelope.as_bytes())
    }
}

fn config_error(detail: impl Into<String>) -> HarnessError {
    HarnessError::Config {
        detail: detail.into(),
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FE_ASSERT_INVALID_CONFIG;

    #[test]
    fn default_config_is_valid() {
        let config = HarnessConfig::default();
        config.validate().unwrap();
        assert!(config.strict_mode);
        assert_eq!(config.writability_sentinel, "unlikelyValue");
        assert_eq!(config.array_length_probe, 4294967295.0);
    }

    #[test]
    fn blank_trace_id_rejected() {
        let config = HarnessConfig {
            trace_id: "  ".to_string(),
            ..HarnessConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(err.code(), FE_ASSERT_INVALID_CONFIG);
        assert!(err.message().contains("trace_id"));
    }

    #[test]
    fn out_of_range_length_probe_rejected() {
        for probe in [-1.0, 4294967296.0, 1.5, f64::NAN] {
            let config = HarnessConfig {
                array_length_probe: probe,
                ..HarnessConfig::default()
            };
            assert!(config.validate().is_err(), "{probe} should be rejected");
        }
    }

    #[test]
    fn zero_event_capacity_rejected_only_when_recording() {
        let config = HarnessConfig {
            max_events: 0,
            ..HarnessConfig::default()
        };
        assert!(config.validate().unwrap_err().message().contains("max_events"));
        let quiet = HarnessConfig {
            record_events: false,
            max_events: 0,
            ..HarnessConfig::default()
        };
        quiet.validate().unwrap();
    }

    #[test]
    fn empty_sentinel_rejected() {
        let config = HarnessConfig {
            writability_sentinel: String::new(),
            ..HarnessConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config = HarnessConfig::from_json_str(r#"{"strict_mode": false}"#).unwrap();
        assert!(!config.strict_mode);
        assert_eq!(config.policy_id, "policy-harness-es2020");
    }

    #[test]
    fn malformed_json_is_config_error() {
        let err = HarnessConfig::from_json_str("{not json").unwrap_err();
        assert_eq!(err.code(), FE_ASSERT_INVALID_CONFIG);
    }

    #[test]
    fn invalid_json_values_fail_validation() {
        assert!(HarnessConfig::from_json_str(r#"{"policy_id": ""}"#).is_err());
    }

    #[test]
    fn load_json_missing_file_is_config_error() {
        let err = HarnessConfig::load_json("/nonexistent/harness.json").unwrap_err();
        assert_eq!(err.code(), FE_ASSERT_INVALID_CONFIG);
    }

    #[test]
    fn fingerprint_ignores_correlation_ids() {
        let a = HarnessConfig::default();
        let b = HarnessConfig {
            trace_id: "other".to_string(),
            ..HarnessConfig::default()
        };
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }

    #[test]
    fn fingerprint_tracks_strictness() {
        let sloppy = HarnessConfig {
            strict_mode: false,
            ..HarnessConfig::default()
        };
        assert_ne!(HarnessConfig::default().fingerprint(), sloppy.fingerprint());
    }

    #[test]
    fn config_serde_round_trip() {
        let config = HarnessConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: HarnessConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
