use serde::{Deserialize, Serialize};

use crate::error::{LuppaError, Result};
use crate::pattern::PatternType;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub anthropic_api_key: String,
    pub server_host: String,
    pub server_port: u16,
    pub analysis: AnalysisConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            anthropic_api_key: std::env::var("ANTHROPIC_API_KEY").unwrap_or_default(),
            server_host: std::env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            server_port: std::env::var("SERVER_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            analysis: AnalysisConfig::default(),
        }
    }
}

/// Detector thresholds and scoring weights. Every knob here is a product
/// calibration decision, so none of them are hard-coded at use sites; all
/// are validated fail-fast before a detection run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Maximum simple-cycle length enumerated by the cycle detector.
    pub max_cycle_len: usize,
    /// Share of total inbound contract weight the top awarding source must
    /// reach for a concentration flag.
    pub concentration_top_share: f64,
    /// Minimum total inbound contract weight; filters single-contract noise.
    pub concentration_min_weight: f64,
    /// Sliding window for concentration, in days. None means full history.
    pub concentration_window_days: Option<i64>,
    /// Maximum independent-path length searched by the cross-conflict
    /// detector.
    pub conflict_max_path_len: usize,
    /// Rolling window for burst detection, in days.
    pub burst_window_days: i64,
    /// A window is a burst when its observation count exceeds this multiple
    /// of the trailing baseline expectation.
    pub burst_multiplier: f64,
    /// Minimum prior observations before an entity is eligible for burst
    /// flagging.
    pub min_baseline_observations: usize,
    pub weight_cycle: f64,
    pub weight_concentration: f64,
    pub weight_cross_conflict: f64,
    pub weight_temporal_anomaly: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_cycle_len: 6,
            concentration_top_share: 0.60,
            concentration_min_weight: 100.0,
            concentration_window_days: None,
            conflict_max_path_len: 3,
            burst_window_days: 30,
            burst_multiplier: 3.0,
            min_baseline_observations: 5,
            weight_cycle: 0.35,
            weight_concentration: 0.25,
            weight_cross_conflict: 0.25,
            weight_temporal_anomaly: 0.15,
        }
    }
}

impl AnalysisConfig {
    /// Rejects nonsensical thresholds before any detector runs. Running with
    /// a bad configuration would silently produce misleading risk scores.
    pub fn validate(&self) -> Result<()> {
        if self.max_cycle_len < 3 {
            return Err(LuppaError::Config(format!(
                "max_cycle_len must be at least 3, got {}",
                self.max_cycle_len
            )));
        }
        if !(self.concentration_top_share > 0.0 && self.concentration_top_share <= 1.0) {
            return Err(LuppaError::Config(format!(
                "concentration_top_share must be in (0, 1], got {}",
                self.concentration_top_share
            )));
        }
        if !self.concentration_min_weight.is_finite() || self.concentration_min_weight < 0.0 {
            return Err(LuppaError::Config(format!(
                "concentration_min_weight must be finite and non-negative, got {}",
                self.concentration_min_weight
            )));
        }
        if let Some(days) = self.concentration_window_days {
            if days <= 0 {
                return Err(LuppaError::Config(format!(
                    "concentration_window_days must be positive, got {days}"
                )));
            }
        }
        if !(1..=3).contains(&self.conflict_max_path_len) {
            return Err(LuppaError::Config(format!(
                "conflict_max_path_len must be in 1..=3, got {}",
                self.conflict_max_path_len
            )));
        }
        if self.burst_window_days <= 0 {
            return Err(LuppaError::Config(format!(
                "burst_window_days must be positive, got {}",
                self.burst_window_days
            )));
        }
        if !self.burst_multiplier.is_finite() || self.burst_multiplier <= 1.0 {
            return Err(LuppaError::Config(format!(
                "burst_multiplier must be greater than 1, got {}",
                self.burst_multiplier
            )));
        }
        if self.min_baseline_observations == 0 {
            return Err(LuppaError::Config(
                "min_baseline_observations must be at least 1".into(),
            ));
        }

        let weights = [
            self.weight_cycle,
            self.weight_concentration,
            self.weight_cross_conflict,
            self.weight_temporal_anomaly,
        ];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(LuppaError::Config(
                "pattern weights must be finite and non-negative".into(),
            ));
        }
        if weights.iter().sum::<f64>() <= 0.0 {
            return Err(LuppaError::Config(
                "at least one pattern weight must be positive".into(),
            ));
        }

        Ok(())
    }

    pub fn pattern_weight(&self, pattern_type: PatternType) -> f64 {
        match pattern_type {
            PatternType::Cycle => self.weight_cycle,
            PatternType::Concentration => self.weight_concentration,
            PatternType::CrossConflict => self.weight_cross_conflict,
            PatternType::TemporalAnomaly => self.weight_temporal_anomaly,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(AnalysisConfig::default().validate().is_ok());
    }

    #[test]
    fn short_cycle_bound_rejected() {
        let config = AnalysisConfig {
            max_cycle_len: 2,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(LuppaError::Config(_))));
    }

    #[test]
    fn out_of_range_share_rejected() {
        let config = AnalysisConfig {
            concentration_top_share: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn non_positive_multiplier_rejected() {
        let config = AnalysisConfig {
            burst_multiplier: 1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn negative_weight_rejected() {
        let config = AnalysisConfig {
            weight_cycle: -0.1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_weight_sum_rejected() {
        let config = AnalysisConfig {
            weight_cycle: 0.0,
            weight_concentration: 0.0,
            weight_cross_conflict: 0.0,
            weight_temporal_anomaly: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
