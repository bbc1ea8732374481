//! Export of cleaned survey points.

use std::fs::File;
use std::io::{self, BufWriter, Write};

use crate::model::{Batch, SurveyPoint};

/// Default export file name for a batch.
pub fn default_export_name(batch: &Batch) -> String {
    format!("{}_export.csv", batch.name)
}

/// Writes visible points as `LINE,FN,X,Y,RALT` rows to `writer`.
pub fn write_points<W: Write>(writer: &mut W, points: &[SurveyPoint]) -> io::Result<usize> {
    writeln!(writer, "LINE,FN,X,Y,RALT")?;
    let mut written = 0;
    for p in points.iter().filter(|p| p.visible) {
        writeln!(
            writer,
            "{},{},{},{},{}",
            p.line_id, p.sequence, p.position.x, p.position.y, p.altitude
        )?;
        written += 1;
    }
    Ok(written)
}

/// Writes visible points of `points` to a CSV file, returning the row count.
pub fn write_points_csv(path: &str, points: &[SurveyPoint]) -> io::Result<usize> {
    let mut file = BufWriter::new(File::create(path)?);
    let written = write_points(&mut file, points)?;
    file.flush()?;
    log::info!("exported {} points to {}", written, path);
    Ok(written)
}
