//! Loader for planned design line files.
//!
//! The format has one header row followed by row pairs. Each pair describes
//! one design line: the first row is `name x y ...` at the start point and
//! the second row gives the end point in the same columns.

use std::io;

use crate::geometry::Point;
use crate::model::{DesignLine, DesignLineFile};

fn parse_row(row: &str) -> Option<(&str, Point)> {
    let fields: Vec<&str> = row.split_whitespace().collect();
    if fields.len() < 3 {
        return None;
    }
    let x = fields[1].parse::<f64>().ok()?;
    let y = fields[2].parse::<f64>().ok()?;
    Some((fields[0], Point::new(x, y)))
}

/// Parses design lines from text. Incomplete or unparsable pairs are skipped.
pub fn parse_design_lines(text: &str) -> Vec<DesignLine> {
    let mut lines = Vec::new();
    let mut rows = text.lines().skip(1).map(str::trim);
    while let Some(first) = rows.next() {
        let second = rows.next().unwrap_or_default();
        if first.is_empty() || second.is_empty() {
            continue;
        }
        match (parse_row(first), parse_row(second)) {
            (Some((name, start)), Some((_, end))) => lines.push(DesignLine::new(name, start, end)),
            _ => log::debug!("skipping design pair {:?} / {:?}", first, second),
        }
    }
    lines
}

/// Reads a design line file. The path becomes the file's source identifier.
pub fn read_design_file(path: &str) -> io::Result<DesignLineFile> {
    let contents = crate::io::read_to_string(path)?;
    let lines = parse_design_lines(&contents);
    log::info!("read {} design lines from {}", lines.len(), path);
    Ok(DesignLineFile::new(path, lines))
}
