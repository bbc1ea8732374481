//! Nearest design line matching.
//!
//! Each visible run of a batch is attributed to the design line closest to
//! its first point. The generated identifier is the design line's prefix
//! followed by how many runs were already attributed to it, so repeated
//! passes over the same course get distinct names.

use thiserror::Error;

use crate::geometry::Point;
use crate::model::{design_line_count, line_prefix, Batch, DesignLine, DesignLineFile};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    #[error("no design lines loaded")]
    NoDesignLines,
}

/// How the distance from a point to a design line is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceMode {
    /// Perpendicular distance to the infinite line through both endpoints.
    #[default]
    SupportingLine,
    /// Distance to the closest point of the finite segment.
    Segment,
}

impl DistanceMode {
    fn measure(self, line: &DesignLine, p: Point) -> f64 {
        let geom = line.line();
        match self {
            DistanceMode::SupportingLine => geom.distance_to_supporting_line(p),
            DistanceMode::Segment => geom.distance_to_segment(p),
        }
    }
}

/// Options for [`match_line_numbers`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MatchOptions {
    pub distance: DistanceMode,
}

/// Location of a design line inside a slice of files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DesignLineRef {
    pub file: usize,
    pub line: usize,
}

/// Outcome of one matching pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchSummary {
    /// Number of visible runs that were attributed.
    pub runs: usize,
    /// Identifier assigned to each run, in batch order.
    pub assigned: Vec<String>,
    /// Related-line entries removed by the undo step.
    pub released: usize,
}

/// Finds the design line nearest to `p` across all files.
///
/// Ties keep the first line in file order, then line order. Returns `None`
/// when there are no design lines.
pub fn nearest_design_line(
    files: &[DesignLineFile],
    p: Point,
    mode: DistanceMode,
) -> Option<(DesignLineRef, f64)> {
    let mut best: Option<(DesignLineRef, f64)> = None;
    for (fi, file) in files.iter().enumerate() {
        for (li, line) in file.lines.iter().enumerate() {
            let d = mode.measure(line, p);
            if best.map_or(true, |(_, best_d)| d < best_d) {
                best = Some((DesignLineRef { file: fi, line: li }, d));
            }
        }
    }
    best
}

/// Undoes a batch's previous attribution.
///
/// For every related-line entry, each design line sharing its prefix has
/// its counter decremented, then the entry is removed. Returns the number
/// of entries released.
pub fn unmatch_batch(batch: &mut Batch, files: &mut [DesignLineFile]) -> usize {
    let released = batch.related_lines.len();
    for related in batch.related_lines.drain(..) {
        let prefix = line_prefix(&related);
        for line in files.iter_mut().flat_map(|f| f.lines.iter_mut()) {
            if line.prefix() == prefix {
                line.match_times = line.match_times.saturating_sub(1);
            }
        }
    }
    if released > 0 {
        log::debug!("released {} related lines of batch {}", released, batch.name);
    }
    released
}

/// Assigns line identifiers to every visible run of `batch`.
///
/// Any attribution from an earlier call is undone first, so calling this
/// again without other changes leaves counters and identifiers unchanged.
/// Hidden points keep their identifiers.
pub fn match_line_numbers(
    batch: &mut Batch,
    files: &mut [DesignLineFile],
    options: MatchOptions,
) -> Result<MatchSummary, MatchError> {
    if design_line_count(files) == 0 {
        return Err(MatchError::NoDesignLines);
    }

    let mut summary = MatchSummary {
        released: unmatch_batch(batch, files),
        ..MatchSummary::default()
    };

    let mut active: Option<(DesignLineRef, String)> = None;
    let len = batch.points.len();
    for i in 0..len {
        if !batch.points[i].visible {
            continue;
        }
        let run_start = i == 0 || !batch.points[i - 1].visible;
        if run_start {
            let position = batch.points[i].position;
            let (winner, dist) = nearest_design_line(files, position, options.distance)
                .ok_or(MatchError::NoDesignLines)?;
            let line = &files[winner.file].lines[winner.line];
            let id = format!("{}{}", line.prefix(), line.match_times);
            log::debug!(
                "run at point {} matched {} ({:.3} away) as {}",
                i,
                line.name,
                dist,
                id
            );
            active = Some((winner, id));
        }

        if let Some((winner, id)) = &active {
            batch.points[i].line_id.clone_from(id);
            let run_end = i + 1 == len || !batch.points[i + 1].visible;
            if run_end {
                files[winner.file].lines[winner.line].match_times += 1;
                batch.related_lines.push(id.clone());
                summary.assigned.push(id.clone());
                summary.runs += 1;
                active = None;
            }
        }
    }

    log::info!(
        "matched {} runs of batch {} against {} design lines",
        summary.runs,
        batch.name,
        design_line_count(files)
    );
    Ok(summary)
}
