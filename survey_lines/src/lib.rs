//! Core library for reconciling flown survey lines against planned design
//! lines.

pub mod editor;
pub mod geometry;
pub mod io;
pub mod matching;
pub mod model;
pub mod quality;
pub mod renumber;
pub mod visibility;

pub use editor::{BatchEditor, EditorStatus};
pub use matching::{
    match_line_numbers, nearest_design_line, unmatch_batch, DesignLineRef, DistanceMode,
    MatchError, MatchOptions, MatchSummary,
};
pub use model::{line_prefix, Batch, DesignLine, DesignLineFile, LineIndex, SurveyPoint};
pub use quality::{abnormal_points, quality_segments, QualityBand, QualityError, QualitySegment};
pub use renumber::regenerate_line_numbers;
pub use visibility::{hide_below, hide_by_region, hide_outside_band};
