// PressureEstimator - knock frequency to classified PSI result
//
// Rules, evaluated in order (limits come from PressureConfig):
// 1. freq > max_freq_limit                         -> OutOfRange, no estimate
// 2. freq > overinflated_freq or table psi > limit -> Overinflated, "> limit"
// 3. otherwise the nearest table PSI               -> Normal inside the normal
//                                                     range, else Underinflated
//
// All comparisons are strict, so a frequency equal to overinflated_freq falls
// through to the table lookup.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::calibration::CalibrationTable;
use crate::config::PressureConfig;
use crate::error::ConfigurationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PressureClassification {
    /// Reading is implausible; ask the operator to knock again
    OutOfRange,
    Overinflated,
    Normal,
    Underinflated,
}

impl PressureClassification {
    pub fn display_name(&self) -> &'static str {
        match self {
            PressureClassification::OutOfRange => "REMEASURE",
            PressureClassification::Overinflated => "OVERINFLATED",
            PressureClassification::Normal => "NORMAL",
            PressureClassification::Underinflated => "UNDERINFLATED",
        }
    }
}

/// Estimated pressure as reported to the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "psi", rename_all = "snake_case")]
pub enum PsiEstimate {
    Exact(i32),
    /// Above the calibrated range, e.g. "> 100 PSI"
    Above(i32),
}

impl fmt::Display for PsiEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PsiEstimate::Exact(psi) => write!(f, "{} PSI", psi),
            PsiEstimate::Above(psi) => write!(f, "> {} PSI", psi),
        }
    }
}

/// Final output of one measurement cycle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PressureResult {
    pub frequency_hz: f32,
    pub psi_estimate: Option<PsiEstimate>,
    pub classification: PressureClassification,
}

impl PressureResult {
    /// Result asking for a new measurement
    pub fn remeasure(frequency_hz: f32) -> Self {
        Self {
            frequency_hz,
            psi_estimate: None,
            classification: PressureClassification::OutOfRange,
        }
    }

    /// PSI text for a display, "-" when there is no estimate
    pub fn psi_label(&self) -> String {
        self.psi_estimate
            .map(|estimate| estimate.to_string())
            .unwrap_or_else(|| "-".to_string())
    }
}

impl fmt::Display for PressureResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({:.0} Hz, {})",
            self.classification.display_name(),
            self.frequency_hz,
            self.psi_label()
        )
    }
}

pub struct PressureEstimator {
    table: Arc<CalibrationTable>,
    config: PressureConfig,
}

impl PressureEstimator {
    pub fn new(table: Arc<CalibrationTable>, config: PressureConfig) -> Self {
        Self { table, config }
    }

    /// Build the estimator and its table from configuration
    pub fn from_config(config: &PressureConfig) -> Result<Self, ConfigurationError> {
        let table = CalibrationTable::new(config.table.clone())?;
        Ok(Self::new(Arc::new(table), config.clone()))
    }

    pub fn table(&self) -> &CalibrationTable {
        &self.table
    }

    /// Classify a frequency picked from a knock spectrum
    ///
    /// Rounds to whole Hz first when `round_frequency` is configured, so a
    /// frequency typed in by hand lands in the same class a measured knock
    /// with that pitch would.
    pub fn classify_measured(&self, freq: f32) -> Result<PressureResult, ConfigurationError> {
        let freq = if self.config.round_frequency {
            freq.round()
        } else {
            freq
        };
        self.classify(freq)
    }

    /// Classify a knock frequency as given
    ///
    /// # Errors
    /// `ConfigurationError::EmptyTable` when a table lookup is needed and the
    /// table has no points.
    pub fn classify(&self, freq: f32) -> Result<PressureResult, ConfigurationError> {
        if !freq.is_finite() || freq > self.config.max_freq_limit {
            return Ok(PressureResult::remeasure(freq));
        }

        let psi = self.table.nearest_psi(freq)?;

        if freq > self.config.overinflated_freq || psi > self.config.overinflated_psi {
            return Ok(PressureResult {
                frequency_hz: freq,
                psi_estimate: Some(PsiEstimate::Above(self.config.overinflated_psi)),
                classification: PressureClassification::Overinflated,
            });
        }

        let classification = if (self.config.normal_min_psi..=self.config.normal_max_psi).contains(&psi) {
            PressureClassification::Normal
        } else {
            PressureClassification::Underinflated
        };

        Ok(PressureResult {
            frequency_hz: freq,
            psi_estimate: Some(PsiEstimate::Exact(psi)),
            classification,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::CalibrationPoint;

    fn estimator() -> PressureEstimator {
        PressureEstimator::from_config(&PressureConfig::default()).unwrap()
    }

    #[test]
    fn test_above_max_limit_is_out_of_range() {
        let result = estimator().classify(125.1).unwrap();
        assert_eq!(result.classification, PressureClassification::OutOfRange);
        assert_eq!(result.psi_estimate, None);

        let result = estimator().classify(300.0).unwrap();
        assert_eq!(result.classification, PressureClassification::OutOfRange);
    }

    #[test]
    fn test_exactly_max_limit_is_not_out_of_range() {
        // 125.0 is not above the limit, but it is above the overinflated frequency
        let result = estimator().classify(125.0).unwrap();
        assert_eq!(result.classification, PressureClassification::Overinflated);
        assert_eq!(result.psi_estimate, Some(PsiEstimate::Above(100)));
    }

    #[test]
    fn test_overinflated_frequency_boundary() {
        let result = estimator().classify(95.2).unwrap();
        assert_eq!(result.classification, PressureClassification::Normal);
        assert_eq!(result.psi_estimate, Some(PsiEstimate::Exact(100)));

        let result = estimator().classify(95.3).unwrap();
        assert_eq!(result.classification, PressureClassification::Overinflated);
        assert_eq!(result.psi_label(), "> 100 PSI");
    }

    #[test]
    fn test_table_psi_above_limit_is_overinflated() {
        let config = PressureConfig {
            table: vec![
                CalibrationPoint::new(110, 90.0),
                CalibrationPoint::new(60, 80.0),
            ],
            ..PressureConfig::default()
        };
        let estimator = PressureEstimator::from_config(&config).unwrap();
        let result = estimator.classify(89.0).unwrap();
        assert_eq!(result.classification, PressureClassification::Overinflated);
        assert_eq!(result.psi_estimate, Some(PsiEstimate::Above(100)));
    }

    #[test]
    fn test_normal_range() {
        let estimator = estimator();
        for (freq, psi) in [(84.2, 80), (85.0, 85), (88.0, 90), (92.2, 95)] {
            let result = estimator.classify(freq).unwrap();
            assert_eq!(result.classification, PressureClassification::Normal);
            assert_eq!(result.psi_estimate, Some(PsiEstimate::Exact(psi)));
        }
    }

    #[test]
    fn test_underinflated() {
        let estimator = estimator();
        let result = estimator.classify(82.031_25).unwrap();
        assert_eq!(result.classification, PressureClassification::Underinflated);
        assert_eq!(result.psi_estimate, Some(PsiEstimate::Exact(65)));

        let result = estimator.classify(82.0).unwrap();
        assert_eq!(result.psi_estimate, Some(PsiEstimate::Exact(65)));

        let result = estimator.classify(83.0).unwrap();
        assert_eq!(result.psi_estimate, Some(PsiEstimate::Exact(75)));
        assert_eq!(result.classification, PressureClassification::Underinflated);

        let result = estimator.classify(60.0).unwrap();
        assert_eq!(result.psi_estimate, Some(PsiEstimate::Exact(30)));
    }

    #[test]
    fn test_configurable_limits() {
        let config = PressureConfig {
            max_freq_limit: 90.0,
            normal_min_psi: 60,
            ..PressureConfig::default()
        };
        let estimator = PressureEstimator::from_config(&config).unwrap();
        assert_eq!(
            estimator.classify(91.0).unwrap().classification,
            PressureClassification::OutOfRange
        );
        assert_eq!(
            estimator.classify(83.0).unwrap().classification,
            PressureClassification::Normal
        );
    }

    #[test]
    fn test_empty_table_fails_lookup() {
        let config = PressureConfig {
            table: Vec::new(),
            ..PressureConfig::default()
        };
        let estimator = PressureEstimator::from_config(&config).unwrap();
        assert_eq!(estimator.classify(82.0), Err(ConfigurationError::EmptyTable));
        // out-of-range never consults the table
        assert!(estimator.classify(200.0).is_ok());
    }

    #[test]
    fn test_measured_frequency_is_rounded_when_configured() {
        let result = estimator().classify_measured(95.4).unwrap();
        assert_eq!(result.frequency_hz, 95.0);
        assert_eq!(result.classification, PressureClassification::Normal);
        assert_eq!(result.psi_estimate, Some(PsiEstimate::Exact(100)));

        let raw = PressureEstimator::from_config(&PressureConfig {
            round_frequency: false,
            ..PressureConfig::default()
        })
        .unwrap();
        let result = raw.classify_measured(95.4).unwrap();
        assert_eq!(result.frequency_hz, 95.4);
        assert_eq!(result.classification, PressureClassification::Overinflated);
    }

    #[test]
    fn test_non_finite_frequency_asks_for_remeasure() {
        let result = estimator().classify(f32::NAN).unwrap();
        assert_eq!(result.classification, PressureClassification::OutOfRange);
    }

    #[test]
    fn test_display_and_serialization() {
        let result = estimator().classify(82.0).unwrap();
        assert_eq!(result.to_string(), "UNDERINFLATED (82 Hz, 65 PSI)");

        let json = serde_json::to_value(result).unwrap();
        assert_eq!(json["classification"], "underinflated");
        assert_eq!(json["psi_estimate"]["kind"], "exact");
        assert_eq!(json["psi_estimate"]["psi"], 65);

        let remeasure = PressureResult::remeasure(130.0);
        assert_eq!(remeasure.psi_label(), "-");
        assert!(serde_json::to_value(remeasure).unwrap()["psi_estimate"].is_null());
    }
}
