// Calibration module - static PSI table and per-cycle ambient statistics
//
// This module provides two components:
// 1. CalibrationTable: empirical knock frequency -> PSI lookup (process-wide)
// 2. CalibrationStats: ambient level and knock threshold (per cycle)

pub mod stats;
pub mod table;

pub use stats::CalibrationStats;
pub use table::{default_points, CalibrationPoint, CalibrationTable};
