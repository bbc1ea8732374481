//! Editing session over a single batch.
//!
//! [`BatchEditor`] owns a batch's points together with the derived line
//! index and keeps the two consistent: every visibility edit is followed by
//! a full renumbering before the editor hands data back out.

use crate::geometry::Point;
use crate::model::{Batch, LineIndex, SurveyPoint};
use crate::quality::{quality_segments, QualityBand, QualitySegment};
use crate::renumber::regenerate_line_numbers;
use crate::visibility::{hide_by_region, hide_outside_band};

/// Point count and line count of the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditorStatus {
    pub visible_points: usize,
    pub total_points: usize,
    pub lines: usize,
}

#[derive(Debug, Clone)]
pub struct BatchEditor {
    batch: Batch,
    index: LineIndex,
    band: QualityBand,
}

impl BatchEditor {
    /// Takes ownership of `batch` and renumbers its visible points.
    pub fn new(mut batch: Batch, band: QualityBand) -> Self {
        let index = regenerate_line_numbers(&mut batch.points);
        Self { batch, index, band }
    }

    pub fn batch(&self) -> &Batch {
        &self.batch
    }

    /// Returns the edited batch.
    pub fn into_batch(self) -> Batch {
        self.batch
    }

    pub fn points(&self) -> &[SurveyPoint] {
        &self.batch.points
    }

    pub fn index(&self) -> &LineIndex {
        &self.index
    }

    pub fn band(&self) -> QualityBand {
        self.band
    }

    /// Replaces the altitude band used for segmentation.
    pub fn set_band(&mut self, band: QualityBand) {
        self.band = band;
    }

    /// Hides points by region and renumbers. Returns how many were hidden.
    pub fn apply_region(&mut self, region: &[Point], invert: bool) -> usize {
        let hidden = hide_by_region(&mut self.batch.points, region, invert);
        self.renumber();
        hidden
    }

    /// Hides every point outside the band and renumbers.
    pub fn apply_band_discard(&mut self) -> usize {
        let hidden = hide_outside_band(&mut self.batch.points, &self.band);
        self.renumber();
        hidden
    }

    /// Rebuilds the index from point state.
    pub fn renumber(&mut self) {
        self.index = regenerate_line_numbers(&mut self.batch.points);
    }

    /// Quality segments of the current state.
    pub fn segments(&self) -> Vec<QualitySegment> {
        quality_segments(&self.batch.points, &self.index, &self.band)
    }

    pub fn status(&self) -> EditorStatus {
        EditorStatus {
            visible_points: self.batch.visible_count(),
            total_points: self.batch.points.len(),
            lines: self.index.len(),
        }
    }

    /// Short description of one point, `None` when out of range.
    pub fn point_summary(&self, index: usize) -> Option<String> {
        self.batch
            .points
            .get(index)
            .map(|p| format!("FN {} | LINE {}", p.sequence, p.line_id))
    }
}
