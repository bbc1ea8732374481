use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::io::design::read_design_file;
use crate::io::survey::{read_survey_file, ColumnMapping};
use crate::matching::{match_line_numbers, unmatch_batch, MatchError, MatchOptions, MatchSummary};
use crate::model::{Batch, DesignLineFile};
use crate::quality::{QualityBand, QualityError, DEFAULT_HIGH_ALTITUDE, DEFAULT_LOW_ALTITUDE};

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("design line file {0} is already in the project")]
    DuplicateDesignFile(String),
    #[error("batch {0} already exists")]
    DuplicateBatch(String),
    #[error("file {file} is already part of batch {batch}")]
    DuplicateDataFile { batch: String, file: String },
    #[error("no batch named {0}")]
    NoSuchBatch(String),
    #[error("batch {batch} has no data file #{index}")]
    NoSuchDataFile { batch: String, index: usize },
    #[error("file {file} has no readable survey rows")]
    EmptyDataFile { file: String },
    #[error("file {file} has {found} rows but {first} has {expected}")]
    RowCountMismatch {
        file: String,
        first: String,
        expected: usize,
        found: usize,
    },
    #[error(transparent)]
    Match(#[from] MatchError),
    #[error(transparent)]
    Quality(#[from] QualityError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Settings shared by every batch of a project.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSettings {
    pub low_alt_threshold: f64,
    pub high_alt_threshold: f64,
}

impl ProjectSettings {
    /// The configured altitude band, validated.
    pub fn band(&self) -> Result<QualityBand, QualityError> {
        QualityBand::new(self.low_alt_threshold, self.high_alt_threshold)
    }
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            low_alt_threshold: DEFAULT_LOW_ALTITUDE,
            high_alt_threshold: DEFAULT_HIGH_ALTITUDE,
        }
    }
}

// Older files carry local timestamps without an offset.
fn de_timestamp<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Local>, D::Error> {
    let raw = String::deserialize(d)?;
    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(ts.with_timezone(&Local));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .and_then(|naive| Local.from_local_datetime(&naive).earliest())
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp {:?}", raw)))
}

/// A survey reconciliation project: design lines plus flight batches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub project_name: String,
    #[serde(deserialize_with = "de_timestamp")]
    pub created_time: DateTime<Local>,
    #[serde(deserialize_with = "de_timestamp")]
    pub last_modified: DateTime<Local>,
    #[serde(default)]
    pub design_lines: Vec<DesignLineFile>,
    #[serde(default)]
    pub batches: Vec<Batch>,
    #[serde(rename = "commonSettings", default)]
    pub settings: ProjectSettings,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Local::now();
        Self {
            project_name: name.into(),
            created_time: now,
            last_modified: now,
            design_lines: Vec::new(),
            batches: Vec::new(),
            settings: ProjectSettings::default(),
        }
    }

    /// Marks the project as modified now.
    pub fn touch(&mut self) {
        self.last_modified = Local::now();
    }

    /// Loads a design line file from disk and adds it.
    pub fn add_design_line_file(&mut self, path: &str) -> Result<usize, ProjectError> {
        if self.has_design_file(path) {
            log::warn!("design line file {} was already imported", path);
            return Err(ProjectError::DuplicateDesignFile(path.to_string()));
        }
        let file = read_design_file(path)?;
        self.add_design_lines(file)
    }

    /// Adds an already parsed design line file.
    pub fn add_design_lines(&mut self, file: DesignLineFile) -> Result<usize, ProjectError> {
        if self.has_design_file(&file.file_path) {
            return Err(ProjectError::DuplicateDesignFile(file.file_path));
        }
        self.design_lines.push(file);
        self.touch();
        Ok(self.design_lines.len() - 1)
    }

    pub fn has_design_file(&self, path: &str) -> bool {
        self.design_lines.iter().any(|f| f.file_path == path)
    }

    /// Removes a design line file by position.
    pub fn remove_design_line_file(&mut self, index: usize) -> Option<DesignLineFile> {
        if index >= self.design_lines.len() {
            return None;
        }
        self.touch();
        Some(self.design_lines.remove(index))
    }

    /// Sets the display flag of a design line file.
    pub fn set_design_line_visibility(&mut self, index: usize, visible: bool) -> bool {
        match self.design_lines.get_mut(index) {
            Some(file) => {
                file.visible = visible;
                self.touch();
                true
            }
            None => false,
        }
    }

    /// Adds an empty batch.
    pub fn add_batch(&mut self, name: &str) -> Result<usize, ProjectError> {
        if self.batch_index(name).is_some() {
            log::warn!("batch {} was already added", name);
            return Err(ProjectError::DuplicateBatch(name.to_string()));
        }
        self.batches.push(Batch::new(name));
        self.touch();
        Ok(self.batches.len() - 1)
    }

    /// Removes a batch, first releasing its design line attribution.
    pub fn remove_batch(&mut self, index: usize) -> Option<Batch> {
        if index >= self.batches.len() {
            return None;
        }
        let mut batch = self.batches.remove(index);
        unmatch_batch(&mut batch, &mut self.design_lines);
        self.touch();
        Some(batch)
    }

    pub fn batch_index(&self, name: &str) -> Option<usize> {
        self.batches.iter().position(|b| b.name == name)
    }

    pub fn batch(&self, name: &str) -> Option<&Batch> {
        self.batches.iter().find(|b| b.name == name)
    }

    pub fn batch_mut(&mut self, name: &str) -> Option<&mut Batch> {
        self.batches.iter_mut().find(|b| b.name == name)
    }

    fn require_batch(&self, name: &str) -> Result<usize, ProjectError> {
        self.batch_index(name)
            .ok_or_else(|| ProjectError::NoSuchBatch(name.to_string()))
    }

    /// Contributes a survey file to a batch.
    ///
    /// The first file supplies the batch's points and fixes its row count.
    /// Every later file must parse to the same number of rows and only adds
    /// its name.
    pub fn add_data_file(
        &mut self,
        batch_name: &str,
        path: &str,
        mapping: &ColumnMapping,
    ) -> Result<(), ProjectError> {
        let idx = self.require_batch(batch_name)?;
        let batch = &self.batches[idx];
        if batch.file_names.iter().any(|f| f == path) {
            log::warn!("file {} was already imported into {}", path, batch_name);
            return Err(ProjectError::DuplicateDataFile {
                batch: batch_name.to_string(),
                file: path.to_string(),
            });
        }

        let points = read_survey_file(path, mapping)?;
        if points.is_empty() {
            return Err(ProjectError::EmptyDataFile {
                file: path.to_string(),
            });
        }

        let batch = &mut self.batches[idx];
        if batch.row_count == 0 {
            batch.row_count = points.len();
            batch.points = points;
        } else if batch.row_count != points.len() {
            return Err(ProjectError::RowCountMismatch {
                file: path.to_string(),
                first: batch.file_names.first().cloned().unwrap_or_default(),
                expected: batch.row_count,
                found: points.len(),
            });
        }
        batch.file_names.push(path.to_string());
        self.touch();
        Ok(())
    }

    /// Removes a contributed file. Removing the last one clears the batch.
    pub fn remove_data_file(
        &mut self,
        batch_name: &str,
        index: usize,
    ) -> Result<String, ProjectError> {
        let idx = self.require_batch(batch_name)?;
        let batch = &mut self.batches[idx];
        if index >= batch.file_names.len() {
            return Err(ProjectError::NoSuchDataFile {
                batch: batch_name.to_string(),
                index,
            });
        }
        let removed = batch.file_names.remove(index);
        if batch.file_names.is_empty() {
            unmatch_batch(batch, &mut self.design_lines);
            batch.points.clear();
            batch.row_count = 0;
        }
        self.touch();
        Ok(removed)
    }

    /// Runs nearest line matching for one batch against all design lines.
    pub fn match_batch(
        &mut self,
        batch_name: &str,
        options: MatchOptions,
    ) -> Result<MatchSummary, ProjectError> {
        let idx = self.require_batch(batch_name)?;
        let summary = match_line_numbers(&mut self.batches[idx], &mut self.design_lines, options)?;
        self.touch();
        Ok(summary)
    }
}

impl Default for Project {
    fn default() -> Self {
        Self::new("")
    }
}

pub fn read_project_json(path: &str) -> std::io::Result<Project> {
    let contents = crate::io::read_to_string(path)?;
    let proj: Project = serde_json::from_str(&contents).map_err(crate::io::invalid_data)?;
    Ok(proj)
}

pub fn write_project_json(path: &str, project: &Project) -> std::io::Result<()> {
    let json = serde_json::to_string_pretty(project).map_err(std::io::Error::other)?;
    crate::io::write_string(path, &json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use crate::model::{DesignLine, SurveyPoint};
    use std::io::Write;

    fn survey_file(rows: &[&str]) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        for r in rows {
            writeln!(f, "{}", r).unwrap();
        }
        f
    }

    #[test]
    fn duplicate_batch_rejected() {
        let mut p = Project::new("p");
        p.add_batch("F1").unwrap();
        assert!(matches!(p.add_batch("F1"), Err(ProjectError::DuplicateBatch(_))));
    }

    #[test]
    fn row_count_must_match() {
        let mut p = Project::new("p");
        p.add_batch("F1").unwrap();
        let a = survey_file(&["L1 1 0 0 100", "L1 2 1 0 100"]);
        let b = survey_file(&["L1 1 0 0 100", "L1 2 1 0 100"]);
        let c = survey_file(&["L1 1 0 0 100"]);
        let a_path = a.path().to_str().unwrap();
        p.add_data_file("F1", a_path, &ColumnMapping::dat()).unwrap();
        p.add_data_file("F1", b.path().to_str().unwrap(), &ColumnMapping::dat())
            .unwrap();
        let err = p
            .add_data_file("F1", c.path().to_str().unwrap(), &ColumnMapping::dat())
            .unwrap_err();
        assert!(matches!(
            err,
            ProjectError::RowCountMismatch { expected: 2, found: 1, .. }
        ));
        assert!(matches!(
            p.add_data_file("F1", a_path, &ColumnMapping::dat()),
            Err(ProjectError::DuplicateDataFile { .. })
        ));
        let batch = p.batch("F1").unwrap();
        assert_eq!(batch.file_names.len(), 2);
        assert_eq!(batch.points.len(), 2);
    }

    #[test]
    fn removing_last_file_clears_batch() {
        let mut p = Project::new("p");
        p.add_batch("F1").unwrap();
        let a = survey_file(&["L1 1 0 0 100", "L1 2 1 0 100"]);
        p.add_data_file("F1", a.path().to_str().unwrap(), &ColumnMapping::dat())
            .unwrap();
        p.remove_data_file("F1", 0).unwrap();
        let batch = p.batch("F1").unwrap();
        assert!(batch.points.is_empty());
        assert_eq!(batch.row_count, 0);
        assert!(p.remove_data_file("F1", 0).is_err());
    }

    #[test]
    fn removing_batch_releases_counters() {
        let mut p = Project::new("p");
        p.add_design_lines(DesignLineFile::new(
            "plan",
            vec![DesignLine::new("10A", Point::new(0.0, 0.0), Point::new(10.0, 0.0))],
        ))
        .unwrap();
        p.add_batch("F1").unwrap();
        p.batch_mut("F1").unwrap().points = vec![
            SurveyPoint::new("x", 1, 0.0, 1.0, 100.0),
            SurveyPoint::new("x", 2, 1.0, 1.0, 100.0),
        ];
        p.match_batch("F1", MatchOptions::default()).unwrap();
        assert_eq!(p.design_lines[0].lines[0].match_times, 1);
        p.remove_batch(0).unwrap();
        assert_eq!(p.design_lines[0].lines[0].match_times, 0);
    }

    #[test]
    fn design_files_can_be_hidden_and_removed() {
        let mut p = Project::new("p");
        let plan = DesignLineFile::new(
            "plan",
            vec![DesignLine::new("10A", Point::new(0.0, 0.0), Point::new(10.0, 0.0))],
        );
        p.add_design_lines(plan.clone()).unwrap();
        assert!(matches!(
            p.add_design_lines(plan),
            Err(ProjectError::DuplicateDesignFile(_))
        ));
        assert!(p.set_design_line_visibility(0, false));
        assert!(!p.design_lines[0].visible);
        assert!(!p.set_design_line_visibility(3, true));
        assert_eq!(p.remove_design_line_file(0).unwrap().file_path, "plan");
        assert!(p.remove_design_line_file(0).is_none());
        assert!(!p.has_design_file("plan"));
    }

    #[test]
    fn project_json_layout() {
        let mut p = Project::new("survey");
        p.add_batch("F1").unwrap();
        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(v["projectName"], "survey");
        assert!(v["createdTime"].is_string());
        assert_eq!(v["batches"][0]["batchName"], "F1");
        assert_eq!(v["commonSettings"]["lowAltThreshold"], 80.0);
    }

    #[test]
    fn naive_timestamps_are_accepted() {
        let json = r#"{"projectName":"old","createdTime":"2024-03-01T08:00:00",
            "lastModified":"2024-03-02T09:30:00","designLines":[],"batches":[]}"#;
        let p: Project = serde_json::from_str(json).unwrap();
        assert_eq!(p.project_name, "old");
        assert_eq!(p.settings, ProjectSettings::default());
    }
}
