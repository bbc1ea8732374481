//! Value types shared by the reconciliation engines.
//!
//! Serialized field names follow the project file layout (`LINE`, `FN`,
//! `X1`, `batchName`, ...) so the types can be written straight into a
//! project document.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::geometry::{Line, Point};

/// Returns `name` without its last character.
///
/// The trailing character of a design line name encodes pass direction or
/// parity, so all passes over the same planned course share this prefix.
pub fn line_prefix(name: &str) -> &str {
    match name.char_indices().next_back() {
        Some((idx, _)) => &name[..idx],
        None => name,
    }
}

/// One recorded position/altitude sample from a flight pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "PointRecord", into = "PointRecord")]
pub struct SurveyPoint {
    pub line_id: String,
    /// Fiducial number, increasing along an uninterrupted pass.
    pub sequence: i64,
    pub position: Point,
    /// Radar altitude, the quality scalar for segmentation.
    pub altitude: f64,
    pub visible: bool,
}

impl SurveyPoint {
    /// Creates a new visible point.
    pub fn new(line_id: impl Into<String>, sequence: i64, x: f64, y: f64, altitude: f64) -> Self {
        Self {
            line_id: line_id.into(),
            sequence,
            position: Point::new(x, y),
            altitude,
            visible: true,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct PointRecord {
    #[serde(rename = "LINE")]
    line: String,
    #[serde(rename = "FN", serialize_with = "ser_fiducial", deserialize_with = "de_fiducial")]
    fiducial: i64,
    #[serde(rename = "X")]
    x: f64,
    #[serde(rename = "Y")]
    y: f64,
    #[serde(rename = "RALT")]
    ralt: f64,
    #[serde(rename = "Visible", serialize_with = "ser_flag", deserialize_with = "de_flag")]
    visible: bool,
}

impl From<PointRecord> for SurveyPoint {
    fn from(r: PointRecord) -> Self {
        Self {
            line_id: r.line,
            sequence: r.fiducial,
            position: Point::new(r.x, r.y),
            altitude: r.ralt,
            visible: r.visible,
        }
    }
}

impl From<SurveyPoint> for PointRecord {
    fn from(p: SurveyPoint) -> Self {
        Self {
            line: p.line_id,
            fiducial: p.sequence,
            x: p.position.x,
            y: p.position.y,
            ralt: p.altitude,
            visible: p.visible,
        }
    }
}

fn ser_fiducial<S: Serializer>(value: &i64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format!("{:06}", value))
}

fn de_fiducial<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Float(f64),
        Text(String),
    }
    match Raw::deserialize(d)? {
        Raw::Int(v) => Ok(v),
        Raw::Float(v) => Ok(v as i64),
        Raw::Text(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|e| serde::de::Error::custom(format!("invalid FN {:?}: {}", s, e))),
    }
}

fn ser_count<S: Serializer>(value: &f64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(*value as u64)
}

fn ser_flag<S: Serializer>(value: &bool, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u8(u8::from(*value))
}

fn de_flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Bool(bool),
        Int(i64),
    }
    Ok(match Raw::deserialize(d)? {
        Raw::Bool(b) => b,
        Raw::Int(v) => v != 0,
    })
}

/// A planned straight-line course the survey was meant to follow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "DesignLineRecord", into = "DesignLineRecord")]
pub struct DesignLine {
    pub name: String,
    pub start: Point,
    pub end: Point,
    /// Number of flown runs currently attributed to this course.
    pub match_times: u32,
}

impl DesignLine {
    /// Creates a design line with a zero match counter.
    pub fn new(name: impl Into<String>, start: Point, end: Point) -> Self {
        Self {
            name: name.into(),
            start,
            end,
            match_times: 0,
        }
    }

    /// Name with the direction character removed.
    pub fn prefix(&self) -> &str {
        line_prefix(&self.name)
    }

    /// Geometry of the course.
    pub fn line(&self) -> Line {
        Line::new(self.start, self.end)
    }
}

#[derive(Serialize, Deserialize)]
struct DesignLineRecord {
    #[serde(rename = "Line")]
    line: String,
    #[serde(rename = "X1")]
    x1: f64,
    #[serde(rename = "Y1")]
    y1: f64,
    #[serde(rename = "X2")]
    x2: f64,
    #[serde(rename = "Y2")]
    y2: f64,
    // Older project files store the counter as a double.
    #[serde(rename = "MatchTimes", default, serialize_with = "ser_count")]
    match_times: f64,
}

impl From<DesignLineRecord> for DesignLine {
    fn from(r: DesignLineRecord) -> Self {
        Self {
            name: r.line,
            start: Point::new(r.x1, r.y1),
            end: Point::new(r.x2, r.y2),
            match_times: if r.match_times.is_finite() && r.match_times > 0.0 {
                r.match_times as u32
            } else {
                0
            },
        }
    }
}

impl From<DesignLine> for DesignLineRecord {
    fn from(d: DesignLine) -> Self {
        Self {
            line: d.name,
            x1: d.start.x,
            y1: d.start.y,
            x2: d.end.x,
            y2: d.end.y,
            match_times: f64::from(d.match_times),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Ordered set of design lines loaded from one source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignLineFile {
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "data", default)]
    pub lines: Vec<DesignLine>,
    /// Display flag only; matching ignores it.
    #[serde(default = "default_true")]
    pub visible: bool,
}

impl DesignLineFile {
    pub fn new(file_path: impl Into<String>, lines: Vec<DesignLine>) -> Self {
        Self {
            file_path: file_path.into(),
            lines,
            visible: true,
        }
    }
}

/// Total number of design lines across `files`.
pub fn design_line_count(files: &[DesignLineFile]) -> usize {
    files.iter().map(|f| f.lines.len()).sum()
}

/// One or more files of survey points representing the same pass set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    #[serde(rename = "batchName")]
    pub name: String,
    #[serde(rename = "fileNames", default)]
    pub file_names: Vec<String>,
    #[serde(default)]
    pub points: Vec<SurveyPoint>,
    /// Identifiers generated by the last match, one per attributed run.
    #[serde(rename = "relatedLines", default)]
    pub related_lines: Vec<String>,
    /// Data row count every contributed file must share; zero while empty.
    #[serde(rename = "fileLineCount", default)]
    pub row_count: usize,
}

impl Batch {
    /// Creates an empty batch.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Number of points that are currently visible.
    pub fn visible_count(&self) -> usize {
        self.points.iter().filter(|p| p.visible).count()
    }
}

/// Cached mapping from line identifier to point indices.
///
/// Always derived from point state; iteration is lexicographic by
/// identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineIndex {
    lines: BTreeMap<String, Vec<usize>>,
}

impl LineIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self {
            lines: BTreeMap::new(),
        }
    }

    /// Records `indices` under `line_id`, replacing any previous entry.
    pub fn insert(&mut self, line_id: impl Into<String>, indices: Vec<usize>) {
        self.lines.insert(line_id.into(), indices);
    }

    /// Point indices for a line.
    pub fn get(&self, line_id: &str) -> Option<&[usize]> {
        self.lines.get(line_id).map(Vec::as_slice)
    }

    /// Iterator over `(line id, indices)` in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[usize])> {
        self.lines.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Iterator over line identifiers.
    pub fn line_ids(&self) -> impl Iterator<Item = &str> {
        self.lines.keys().map(String::as_str)
    }

    /// Number of lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of indexed points across all lines.
    pub fn point_count(&self) -> usize {
        self.lines.values().map(Vec::len).sum()
    }
}
