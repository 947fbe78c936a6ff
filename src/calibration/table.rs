// CalibrationTable - empirical knock frequency to PSI mapping
//
// The table is measured per tire model and loaded once at startup. Lookup is
// an exhaustive nearest-match over the points in table order; the table does
// not need to be sorted and no interpolation is performed.

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// One measured (pressure, knock frequency) pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationPoint {
    pub psi: i32,
    pub freq: f32,
}

impl CalibrationPoint {
    pub const fn new(psi: i32, freq: f32) -> Self {
        Self { psi, freq }
    }
}

/// Reference measurements for a passenger tire, highest pressure first
pub fn default_points() -> Vec<CalibrationPoint> {
    vec![
        CalibrationPoint::new(105, 98.0),
        CalibrationPoint::new(100, 95.2),
        CalibrationPoint::new(95, 92.2),
        CalibrationPoint::new(90, 88.0),
        CalibrationPoint::new(85, 85.0),
        CalibrationPoint::new(80, 84.2),
        CalibrationPoint::new(75, 82.8),
        CalibrationPoint::new(70, 82.2),
        CalibrationPoint::new(65, 82.0),
        CalibrationPoint::new(60, 79.8),
        CalibrationPoint::new(55, 77.2),
        CalibrationPoint::new(50, 73.0),
        CalibrationPoint::new(45, 70.0),
        CalibrationPoint::new(40, 67.6),
        CalibrationPoint::new(35, 65.4),
        CalibrationPoint::new(30, 64.0),
        CalibrationPoint::new(25, 64.0),
        CalibrationPoint::new(20, 64.0),
    ]
}

/// Read-only nearest-match lookup over calibration points
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationTable {
    points: Vec<CalibrationPoint>,
}

impl CalibrationTable {
    /// Build a table, rejecting non-finite frequencies
    ///
    /// An empty table is accepted here so that configuration problems surface
    /// at lookup time as `ConfigurationError::EmptyTable`, never as a default.
    pub fn new(points: Vec<CalibrationPoint>) -> Result<Self, ConfigurationError> {
        for (index, point) in points.iter().enumerate() {
            if !point.freq.is_finite() {
                return Err(ConfigurationError::InvalidPoint {
                    index,
                    reason: format!("frequency {} is not finite", point.freq),
                });
            }
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[CalibrationPoint] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// PSI of the point whose frequency is closest to `freq`
    ///
    /// Ties keep the earliest point in table order.
    pub fn nearest_psi(&self, freq: f32) -> Result<i32, ConfigurationError> {
        self.nearest_point(freq).map(|point| point.psi)
    }

    pub fn nearest_point(&self, freq: f32) -> Result<&CalibrationPoint, ConfigurationError> {
        let (first, rest) = self
            .points
            .split_first()
            .ok_or(ConfigurationError::EmptyTable)?;

        let mut best = first;
        let mut best_distance = (first.freq - freq).abs();
        for point in rest {
            let distance = (point.freq - freq).abs();
            if distance < best_distance {
                best = point;
                best_distance = distance;
            }
        }
        Ok(best)
    }
}

impl Default for CalibrationTable {
    fn default() -> Self {
        Self {
            points: default_points(),
        }
    }
}
