//! Altitude quality classification and segmentation.

use thiserror::Error;

use crate::model::{LineIndex, SurveyPoint};

/// Default lower bound of the normal altitude band.
pub const DEFAULT_LOW_ALTITUDE: f64 = 80.0;
/// Default upper bound of the normal altitude band.
pub const DEFAULT_HIGH_ALTITUDE: f64 = 120.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum QualityError {
    #[error("invalid altitude band: low {low} must be below high {high}")]
    InvalidBand { low: f64, high: f64 },
}

/// Closed altitude interval `[low, high]` considered normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityBand {
    low: f64,
    high: f64,
}

impl QualityBand {
    /// Creates a band, rejecting `low >= high` and non-finite bounds.
    pub fn new(low: f64, high: f64) -> Result<Self, QualityError> {
        if !low.is_finite() || !high.is_finite() || low >= high {
            return Err(QualityError::InvalidBand { low, high });
        }
        Ok(Self { low, high })
    }

    pub fn low(&self) -> f64 {
        self.low
    }

    pub fn high(&self) -> f64 {
        self.high
    }

    /// Returns `true` if `altitude` is inside the band, bounds included.
    pub fn contains(&self, altitude: f64) -> bool {
        altitude >= self.low && altitude <= self.high
    }
}

impl Default for QualityBand {
    fn default() -> Self {
        Self {
            low: DEFAULT_LOW_ALTITUDE,
            high: DEFAULT_HIGH_ALTITUDE,
        }
    }
}

/// Run of visible points on one line sharing the same altitude class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualitySegment {
    pub line_id: String,
    pub point_indices: Vec<usize>,
    /// `true` when every point of the run is inside the band; the first
    /// point may be the carried-over boundary point of the previous run.
    pub normal_altitude: bool,
}

impl QualitySegment {
    fn start(line_id: &str, normal_altitude: bool) -> Self {
        Self {
            line_id: line_id.to_string(),
            point_indices: Vec::new(),
            normal_altitude,
        }
    }
}

/// Splits each indexed line into maximal runs of visible points with the
/// same altitude class.
///
/// A run that starts at a class change begins with the previous point
/// repeated, so adjoining runs share exactly one point. Runs shorter than
/// two points are dropped. Output follows the index's line order.
pub fn quality_segments(
    points: &[SurveyPoint],
    index: &LineIndex,
    band: &QualityBand,
) -> Vec<QualitySegment> {
    let mut segments = Vec::new();

    for (line_id, indices) in index.iter() {
        if indices.len() < 2 {
            continue;
        }
        let visible: Vec<usize> = indices
            .iter()
            .copied()
            .filter(|&i| points.get(i).is_some_and(|p| p.visible))
            .collect();
        if visible.len() < 2 {
            continue;
        }

        let first_normal = band.contains(points[visible[0]].altitude);
        let mut current = QualitySegment::start(line_id, first_normal);
        current.point_indices.push(visible[0]);
        for pair in visible.windows(2) {
            let (prev, idx) = (pair[0], pair[1]);
            let normal = band.contains(points[idx].altitude);
            if normal != current.normal_altitude {
                let next = QualitySegment::start(line_id, normal);
                let finished = std::mem::replace(&mut current, next);
                if finished.point_indices.len() >= 2 {
                    segments.push(finished);
                }
                current.point_indices.push(prev);
            }
            current.point_indices.push(idx);
        }
        if current.point_indices.len() >= 2 {
            segments.push(current);
        }
    }

    log::debug!("derived {} quality segments from {} lines", segments.len(), index.len());
    segments
}

/// Indices of visible points outside the band, the candidates for
/// automatic discard on export.
pub fn abnormal_points(points: &[SurveyPoint], band: &QualityBand) -> Vec<usize> {
    points
        .iter()
        .enumerate()
        .filter(|(_, p)| p.visible && !band.contains(p.altitude))
        .map(|(i, _)| i)
        .collect()
}
