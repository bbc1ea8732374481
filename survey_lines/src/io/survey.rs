//! Loader for whitespace-delimited survey logs.

use std::io;

use crate::model::SurveyPoint;

/// How leading header rows are recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderRule {
    /// Skip a fixed number of rows.
    Skip(usize),
    /// Skip every row up to and including the first one whose first token
    /// equals the marker.
    Marker(String),
}

/// Column positions of the fields the engine needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    pub line_id: usize,
    pub sequence: usize,
    pub x: usize,
    pub y: usize,
    pub altitude: usize,
    pub header: HeaderRule,
}

impl ColumnMapping {
    /// Plain `LINE FN X Y ALT` layout with no header.
    pub fn dat() -> Self {
        Self {
            line_id: 0,
            sequence: 1,
            x: 2,
            y: 3,
            altitude: 4,
            header: HeaderRule::Skip(0),
        }
    }

    /// Flight log export: data follows the `LINE` header row, coordinates
    /// in columns 4 and 5 and radar altitude in column 7.
    pub fn flight_log() -> Self {
        Self {
            line_id: 0,
            sequence: 1,
            x: 4,
            y: 5,
            altitude: 7,
            header: HeaderRule::Marker("LINE".to_string()),
        }
    }

    /// Looks up a preset by name. Case insensitive.
    pub fn from_preset(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "dat" => Some(Self::dat()),
            "flight-log" | "flight_log" | "xyz" => Some(Self::flight_log()),
            _ => None,
        }
    }

    /// Replaces the header rule with a fixed skip count.
    pub fn with_skip(mut self, rows: usize) -> Self {
        self.header = HeaderRule::Skip(rows);
        self
    }

    fn min_fields(&self) -> usize {
        [self.line_id, self.sequence, self.x, self.y, self.altitude]
            .into_iter()
            .max()
            .unwrap_or(0)
            + 1
    }

    fn parse_row(&self, row: &str) -> Option<SurveyPoint> {
        let fields: Vec<&str> = row.split_whitespace().collect();
        if fields.len() < self.min_fields() {
            return None;
        }
        let sequence = fields[self.sequence].parse::<i64>().ok()?;
        let x = fields[self.x].parse::<f64>().ok()?;
        let y = fields[self.y].parse::<f64>().ok()?;
        let altitude = fields[self.altitude].parse::<f64>().ok()?;
        Some(SurveyPoint::new(fields[self.line_id], sequence, x, y, altitude))
    }
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self::dat()
    }
}

/// Returns the rows that follow the header.
fn data_rows<'a, I>(rows: I, header: &HeaderRule) -> Vec<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut iter = rows.into_iter();
    match header {
        HeaderRule::Skip(n) => iter.skip(*n).collect(),
        HeaderRule::Marker(marker) => {
            let found = iter
                .by_ref()
                .any(|row| row.split_whitespace().next() == Some(marker.as_str()));
            if found {
                iter.collect()
            } else {
                Vec::new()
            }
        }
    }
}

/// Parses survey rows from text.
///
/// Blank rows, rows with too few fields and rows with unparsable numbers
/// are skipped.
pub fn parse_survey_rows(text: &str, mapping: &ColumnMapping) -> Vec<SurveyPoint> {
    let mut points = Vec::new();
    let mut skipped = 0usize;
    for (n, row) in data_rows(text.lines(), &mapping.header).into_iter().enumerate() {
        if row.trim().is_empty() {
            continue;
        }
        match mapping.parse_row(row) {
            Some(p) => points.push(p),
            None => {
                skipped += 1;
                log::debug!("skipping malformed data row {}: {:?}", n + 1, row);
            }
        }
    }
    if skipped > 0 {
        log::warn!("skipped {} malformed rows", skipped);
    }
    points
}

/// Reads a survey log from `path`.
pub fn read_survey_file(path: &str, mapping: &ColumnMapping) -> io::Result<Vec<SurveyPoint>> {
    let contents = crate::io::read_to_string(path)?;
    let points = parse_survey_rows(&contents, mapping);
    log::info!("read {} points from {}", points.len(), path);
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dat_rows_with_skip() {
        let text = "header line\nL1 1 10.0 20.0 95.5\nL1 2 11.0 21.0 96\n";
        let pts = parse_survey_rows(text, &ColumnMapping::dat().with_skip(1));
        assert_eq!(pts.len(), 2);
        assert_eq!(pts[1].sequence, 2);
        assert!((pts[1].altitude - 96.0).abs() < 1e-6);
        assert!(pts.iter().all(|p| p.visible));
    }

    #[test]
    fn malformed_rows_are_skipped() {
        let text = "L1 1 10.0 20.0 95.5\nL1 x 10.0 20.0 95.5\nL1 3 10.0\n\nL1 4 1 2 3\n";
        let pts = parse_survey_rows(text, &ColumnMapping::dat());
        let seqs: Vec<i64> = pts.iter().map(|p| p.sequence).collect();
        assert_eq!(seqs, vec![1, 4]);
    }

    #[test]
    fn flight_log_marker_header() {
        let text = "/ survey export\n/ units m\nLINE FN DATE TIME X Y Z RALT\n\
                    1001 17 20240101 1200 500.0 600.0 30.0 98.0\n\
                    1001 18 20240101 1201 501.0 601.0 30.0 99.0\n";
        let pts = parse_survey_rows(text, &ColumnMapping::flight_log());
        assert_eq!(pts.len(), 2);
        assert_eq!(pts[0].line_id, "1001");
        assert_eq!(pts[0].position.x, 500.0);
        assert_eq!(pts[0].altitude, 98.0);
    }

    #[test]
    fn missing_marker_yields_nothing() {
        let text = "1001 17 a b 500.0 600.0 30.0 98.0\n";
        assert!(parse_survey_rows(text, &ColumnMapping::flight_log()).is_empty());
    }

    #[test]
    fn presets_by_name() {
        assert_eq!(ColumnMapping::from_preset("DAT"), Some(ColumnMapping::dat()));
        assert_eq!(
            ColumnMapping::from_preset("flight-log"),
            Some(ColumnMapping::flight_log())
        );
        assert!(ColumnMapping::from_preset("csv").is_none());
    }
}
