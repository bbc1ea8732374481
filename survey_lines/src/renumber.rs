//! Rebuilds line identifiers after visibility edits.

use std::collections::{BTreeMap, BTreeSet};

use crate::model::{LineIndex, SurveyPoint};

/// Splits `indices` wherever the fiducial jumps by more than one.
///
/// Sub-runs shorter than two points are dropped.
fn contiguous_runs(points: &[SurveyPoint], indices: &[usize]) -> Vec<Vec<usize>> {
    let mut runs = Vec::new();
    let mut current: Vec<usize> = Vec::new();
    for &idx in indices {
        if let Some(&last) = current.last() {
            if points[idx].sequence - points[last].sequence > 1 {
                let finished = std::mem::take(&mut current);
                if finished.len() >= 2 {
                    runs.push(finished);
                }
            }
        }
        current.push(idx);
    }
    if current.len() >= 2 {
        runs.push(current);
    }
    runs
}

/// Next `<base><k>` not in `taken`, advancing `k` past every collision.
fn next_free_id(base: &str, k: &mut usize, taken: &BTreeSet<String>) -> String {
    loop {
        *k += 1;
        let candidate = format!("{}{}", base, k);
        if !taken.contains(&candidate) {
            return candidate;
        }
        log::warn!("line id {} is already in use, trying the next suffix", candidate);
    }
}

/// Rebuilds the line index from current point state.
///
/// Visible points are regrouped by identifier. A group whose fiducials
/// break into several contiguous runs has each run renamed to
/// `<id><n>` with `n` starting at 1; a single run keeps its identifier.
/// A suffix whose identifier is already carried by other points is
/// skipped. Points of runs shorter than two are left out of the index and
/// keep their identifier.
pub fn regenerate_line_numbers(points: &mut [SurveyPoint]) -> LineIndex {
    let mut taken: BTreeSet<String> = points.iter().map(|p| p.line_id.clone()).collect();
    let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (i, p) in points.iter().enumerate() {
        if p.visible {
            groups.entry(p.line_id.clone()).or_default().push(i);
        }
    }

    let mut index = LineIndex::new();
    for (line_id, indices) in groups {
        if indices.len() < 2 {
            continue;
        }
        let mut runs = contiguous_runs(points, &indices);
        match runs.len() {
            0 => {}
            1 => index.insert(line_id, runs.remove(0)),
            n => {
                log::debug!("line {} split into {} runs", line_id, n);
                let mut k = 0;
                for run in runs {
                    let new_id = next_free_id(&line_id, &mut k, &taken);
                    taken.insert(new_id.clone());
                    for &i in &run {
                        points[i].line_id.clone_from(&new_id);
                    }
                    index.insert(new_id, run);
                }
            }
        }
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pass(id: &str, seqs: &[i64]) -> Vec<SurveyPoint> {
        seqs.iter()
            .map(|&s| SurveyPoint::new(id, s, s as f64, 0.0, 100.0))
            .collect()
    }

    fn fiducials(points: &[SurveyPoint], index: &LineIndex, id: &str) -> Vec<i64> {
        index
            .get(id)
            .unwrap_or_default()
            .iter()
            .map(|&i| points[i].sequence)
            .collect()
    }

    #[test]
    fn gap_splits_and_renames() {
        let mut pts = pass("L1", &[1, 2, 3, 7, 8]);
        let index = regenerate_line_numbers(&mut pts);
        assert_eq!(index.len(), 2);
        assert_eq!(fiducials(&pts, &index, "L11"), vec![1, 2, 3]);
        assert_eq!(fiducials(&pts, &index, "L12"), vec![7, 8]);
        assert_eq!(pts[4].line_id, "L12");
    }

    #[test]
    fn contiguous_line_keeps_id() {
        let mut pts = pass("L1", &[1, 2, 3]);
        let index = regenerate_line_numbers(&mut pts);
        assert_eq!(index.get("L1"), Some(&[0, 1, 2][..]));
        assert!(pts.iter().all(|p| p.line_id == "L1"));
    }

    #[test]
    fn short_runs_are_dropped() {
        let mut pts = pass("L1", &[1, 2, 5, 9, 10]);
        let index = regenerate_line_numbers(&mut pts);
        assert_eq!(fiducials(&pts, &index, "L11"), vec![1, 2]);
        assert_eq!(fiducials(&pts, &index, "L12"), vec![9, 10]);
        // The isolated point is not indexed and keeps its old identifier.
        assert_eq!(pts[2].line_id, "L1");
        assert_eq!(index.point_count(), 4);
    }

    #[test]
    fn single_surviving_run_is_not_renamed() {
        let mut pts = pass("L1", &[1, 5, 6, 7]);
        let index = regenerate_line_numbers(&mut pts);
        assert_eq!(fiducials(&pts, &index, "L1"), vec![5, 6, 7]);
        assert!(index.get("L11").is_none());
    }

    #[test]
    fn hiding_a_point_introduces_a_split() {
        let mut pts = pass("7", &[1, 2, 3, 4, 5]);
        pts[2].visible = false;
        let index = regenerate_line_numbers(&mut pts);
        assert_eq!(fiducials(&pts, &index, "71"), vec![1, 2]);
        assert_eq!(fiducials(&pts, &index, "72"), vec![4, 5]);
    }

    #[test]
    fn renumbering_is_idempotent() {
        let mut pts = pass("L1", &[1, 2, 3, 7, 8, 20, 21]);
        pts.extend(pass("L2", &[1, 2, 3]));
        pts[1].visible = false;
        let first = regenerate_line_numbers(&mut pts);
        let ids: Vec<String> = pts.iter().map(|p| p.line_id.clone()).collect();
        let second = regenerate_line_numbers(&mut pts);
        assert_eq!(first, second);
        assert_eq!(ids, pts.iter().map(|p| p.line_id.clone()).collect::<Vec<_>>());
    }

    #[test]
    fn empty_and_hidden_inputs() {
        assert!(regenerate_line_numbers(&mut []).is_empty());
        let mut pts = pass("L1", &[1, 2]);
        pts.iter_mut().for_each(|p| p.visible = false);
        assert!(regenerate_line_numbers(&mut pts).is_empty());
    }

    #[test]
    fn split_skips_identifiers_in_use() {
        let mut pts = pass("L1", &[1, 2, 3, 7, 8]);
        pts.extend(pass("L11", &[20, 21]));
        let index = regenerate_line_numbers(&mut pts);
        assert_eq!(fiducials(&pts, &index, "L11"), vec![20, 21]);
        assert_eq!(fiducials(&pts, &index, "L12"), vec![1, 2, 3]);
        assert_eq!(fiducials(&pts, &index, "L13"), vec![7, 8]);
        assert_eq!(index.point_count(), 7);
    }
}
