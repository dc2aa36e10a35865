//! Journey settings
//!
//! Timing of every delayed effect and the geometric thresholds used by the
//! resolver and trace tracker. Defaults match the shipped tuning; hosts may
//! override them from JSON.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::consts;
use crate::error::SettingsError;

/// Tunable timing and thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Delays (milliseconds) ===
    /// Repelled pieces are removed after this
    pub repel_clear_ms: u64,
    /// Returned pieces are removed after this
    pub return_clear_ms: u64,
    /// Error feedback clears this long after the pieces are gone
    pub feedback_clear_ms: u64,
    /// Success feedback in free mode clears after this
    pub transient_feedback_clear_ms: u64,
    /// Length of the merge animation before the result lands
    pub evolution_ms: u64,
    /// Pause between forming the target and moving on
    pub combination_advance_ms: u64,
    /// How long a non-target result stays on display
    pub secondary_result_hold_ms: u64,
    /// Pause between a completed trace and moving on
    pub trace_advance_ms: u64,

    // === Geometry ===
    pub pair_proximity: f32,
    pub triple_proximity: f32,
    pub trace_tolerance: f32,
    pub trace_min_duration_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            repel_clear_ms: 350,
            return_clear_ms: 600,
            feedback_clear_ms: 1400,
            transient_feedback_clear_ms: 1600,
            evolution_ms: 1800,
            combination_advance_ms: 1400,
            secondary_result_hold_ms: 1200,
            trace_advance_ms: 1200,

            pair_proximity: consts::PAIR_PROXIMITY,
            triple_proximity: consts::TRIPLE_PROXIMITY,
            trace_tolerance: consts::TRACE_TOLERANCE,
            trace_min_duration_ms: consts::TRACE_MIN_DURATION_MS,
        }
    }
}

impl Settings {
    /// Parse settings from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        log::info!("Loaded settings");
        Ok(settings)
    }

    /// Reject values the engine can't work with
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.pair_proximity <= 0.0 {
            return Err(SettingsError::NonPositive {
                field: "pair_proximity",
            });
        }
        if self.triple_proximity <= 0.0 {
            return Err(SettingsError::NonPositive {
                field: "triple_proximity",
            });
        }
        if !(self.trace_tolerance > 0.0 && self.trace_tolerance < 1.0) {
            return Err(SettingsError::InvalidTolerance(self.trace_tolerance));
        }
        Ok(())
    }

    pub fn repel_clear(&self) -> Duration {
        Duration::from_millis(self.repel_clear_ms)
    }

    pub fn return_clear(&self) -> Duration {
        Duration::from_millis(self.return_clear_ms)
    }

    pub fn feedback_clear(&self) -> Duration {
        Duration::from_millis(self.feedback_clear_ms)
    }

    pub fn transient_feedback_clear(&self) -> Duration {
        Duration::from_millis(self.transient_feedback_clear_ms)
    }

    pub fn evolution(&self) -> Duration {
        Duration::from_millis(self.evolution_ms)
    }

    pub fn combination_advance(&self) -> Duration {
        Duration::from_millis(self.combination_advance_ms)
    }

    pub fn secondary_result_hold(&self) -> Duration {
        Duration::from_millis(self.secondary_result_hold_ms)
    }

    pub fn trace_advance(&self) -> Duration {
        Duration::from_millis(self.trace_advance_ms)
    }

    pub fn trace_min_duration(&self) -> Duration {
        Duration::from_millis(self.trace_min_duration_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        // Repelling is the quicker of the two error exits
        assert!(settings.repel_clear() < settings.return_clear());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let settings = Settings::from_json(r#"{ "evolution_ms": 500 }"#).expect("valid json");
        assert_eq!(settings.evolution(), Duration::from_millis(500));
        assert_eq!(settings.repel_clear_ms, Settings::default().repel_clear_ms);
    }

    #[test]
    fn test_rejects_bad_tolerance() {
        let err = Settings::from_json(r#"{ "trace_tolerance": 1.5 }"#).unwrap_err();
        assert!(matches!(err, SettingsError::InvalidTolerance(_)));
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(
            Settings::from_json("{ not json"),
            Err(SettingsError::Json(_))
        ));
    }
}
