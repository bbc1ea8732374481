//! Visibility filters over survey points.
//!
//! Every filter here only clears the `visible` flag. Nothing in this module
//! turns a hidden point back on.

use crate::geometry::{point_in_polygon, Point};
use crate::model::SurveyPoint;
use crate::quality::QualityBand;

fn hide_where<F>(points: &mut [SurveyPoint], mut predicate: F) -> usize
where
    F: FnMut(&SurveyPoint) -> bool,
{
    let mut hidden = 0;
    for p in points.iter_mut().filter(|p| p.visible) {
        if predicate(p) {
            p.visible = false;
            hidden += 1;
        }
    }
    hidden
}

/// Hides points by polygon membership (even-odd rule).
///
/// With `invert == false` the points inside `region` are hidden, otherwise
/// the points outside it. Returns how many points were newly hidden.
pub fn hide_by_region(points: &mut [SurveyPoint], region: &[Point], invert: bool) -> usize {
    let hidden = hide_where(points, |p| point_in_polygon(p.position, region) != invert);
    log::debug!(
        "region filter ({} vertices, invert={}) hid {} points",
        region.len(),
        invert,
        hidden
    );
    hidden
}

/// Hides points whose altitude is below `threshold`.
pub fn hide_below(points: &mut [SurveyPoint], threshold: f64) -> usize {
    let hidden = hide_where(points, |p| p.altitude < threshold);
    log::debug!("threshold filter < {} hid {} points", threshold, hidden);
    hidden
}

/// Hides points whose altitude falls outside `band`.
pub fn hide_outside_band(points: &mut [SurveyPoint], band: &QualityBand) -> usize {
    let hidden = hide_where(points, |p| !band.contains(p.altitude));
    log::debug!(
        "band filter [{}, {}] hid {} points",
        band.low(),
        band.high(),
        hidden
    );
    hidden
}
