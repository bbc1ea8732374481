use std::fs::File;
use std::process::ExitCode;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use survey_lines::{
    geometry::Point,
    io::{
        export::{default_export_name, write_points_csv},
        project::{read_project_json, write_project_json, Project},
        survey::ColumnMapping,
    },
    BatchEditor, DistanceMode, MatchOptions, QualityBand,
};

#[derive(Parser)]
#[command(name = "survey_lines_cli", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty project file.
    NewProject { name: String, output: String },
    /// Import a design line file into a project.
    AddDesign { project: String, file: String },
    /// Drop a design line file by its position in the project.
    RemoveDesign { project: String, index: usize },
    /// Add an empty flight batch.
    AddBatch { project: String, name: String },
    /// Drop a batch, releasing its design line matches.
    RemoveBatch { project: String, name: String },
    /// Contribute a survey log to a batch.
    AddData {
        project: String,
        batch: String,
        file: String,
        /// Column layout preset: `dat` or `flight-log`.
        #[arg(long, default_value = "dat")]
        format: String,
        /// Number of header rows to skip, overriding the preset.
        #[arg(long)]
        skip: Option<usize>,
    },
    /// Drop a contributed file from a batch by position.
    RemoveData {
        project: String,
        batch: String,
        index: usize,
    },
    /// Assign line identifiers from the nearest design lines.
    Match {
        project: String,
        batch: String,
        /// Measure distance to the finite segment instead of its extension.
        #[arg(long)]
        clamped: bool,
    },
    /// Hide points inside a polygon given as `x,y;x,y;...` and renumber.
    HideRegion {
        project: String,
        batch: String,
        #[arg(allow_hyphen_values = true)]
        polygon: String,
        /// Hide the points outside the polygon instead.
        #[arg(long)]
        invert: bool,
    },
    /// Hide points outside the altitude band and renumber.
    DiscardAbnormal {
        project: String,
        batch: String,
        #[arg(long)]
        low: Option<f64>,
        #[arg(long)]
        high: Option<f64>,
    },
    /// Print the quality segments of a batch.
    Segments {
        project: String,
        batch: String,
        #[arg(long)]
        low: Option<f64>,
        #[arg(long)]
        high: Option<f64>,
    },
    /// Store the altitude band in the project settings.
    SetThresholds { project: String, low: f64, high: f64 },
    /// Write the visible points of a batch to CSV.
    Export {
        project: String,
        batch: String,
        output: Option<String>,
    },
    /// Show design files and batches of a project.
    Summary { project: String },
}

fn init_logging() {
    if let Ok(path) = std::env::var("SURVEY_LINES_LOG") {
        match File::create(&path) {
            Ok(file) => {
                env_logger::Builder::from_default_env()
                    .target(env_logger::Target::Pipe(Box::new(file)))
                    .init();
            }
            Err(e) => {
                eprintln!("Failed to create log file {}: {}", path, e);
                env_logger::Builder::from_default_env().init();
            }
        }
    } else {
        env_logger::Builder::from_default_env().init();
    }
}

fn load(path: &str) -> Result<Project> {
    let project = read_project_json(path).with_context(|| format!("reading project {}", path))?;
    log::debug!(
        "loaded project {} with {} batches",
        project.project_name,
        project.batches.len()
    );
    Ok(project)
}

fn save(path: &str, project: &Project) -> Result<()> {
    write_project_json(path, project).with_context(|| format!("writing project {}", path))
}

fn parse_polygon(raw: &str) -> Result<Vec<Point>> {
    let mut vertices = Vec::new();
    for pair in raw.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        let (x, y) = pair
            .split_once(',')
            .ok_or_else(|| anyhow!("vertex {:?}: expected x,y", pair))?;
        let x: f64 = x.trim().parse().with_context(|| format!("vertex {:?}", pair))?;
        let y: f64 = y.trim().parse().with_context(|| format!("vertex {:?}", pair))?;
        vertices.push(Point::new(x, y));
    }
    if vertices.len() < 3 {
        bail!("polygon needs at least 3 vertices, got {}", vertices.len());
    }
    Ok(vertices)
}

fn resolve_band(project: &Project, low: Option<f64>, high: Option<f64>) -> Result<QualityBand> {
    let low = low.unwrap_or(project.settings.low_alt_threshold);
    let high = high.unwrap_or(project.settings.high_alt_threshold);
    Ok(QualityBand::new(low, high)?)
}

/// Runs `edit` on a batch of the project and stores the result back.
fn edit_batch<F, T>(project: &mut Project, name: &str, band: QualityBand, edit: F) -> Result<T>
where
    F: FnOnce(&mut BatchEditor) -> T,
{
    let idx = project
        .batch_index(name)
        .ok_or_else(|| anyhow!("no batch named {}", name))?;
    let batch = std::mem::take(&mut project.batches[idx]);
    let mut editor = BatchEditor::new(batch, band);
    let out = edit(&mut editor);
    project.batches[idx] = editor.into_batch();
    project.touch();
    Ok(out)
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::NewProject { name, output } => {
            save(&output, &Project::new(&name))?;
            println!("Created project {} at {}", name, output);
        }
        Commands::AddDesign { project: path, file } => {
            let mut project = load(&path)?;
            let idx = project.add_design_line_file(&file)?;
            let count = project.design_lines[idx].lines.len();
            save(&path, &project)?;
            println!("Added {} design lines from {}", count, file);
        }
        Commands::RemoveDesign { project: path, index } => {
            let mut project = load(&path)?;
            let removed = project
                .remove_design_line_file(index)
                .ok_or_else(|| anyhow!("no design line file #{}", index))?;
            save(&path, &project)?;
            println!("Removed design file {}", removed.file_path);
        }
        Commands::AddBatch { project: path, name } => {
            let mut project = load(&path)?;
            project.add_batch(&name)?;
            save(&path, &project)?;
            println!("Added batch {}", name);
        }
        Commands::RemoveBatch { project: path, name } => {
            let mut project = load(&path)?;
            let idx = project
                .batch_index(&name)
                .ok_or_else(|| anyhow!("no batch named {}", name))?;
            project.remove_batch(idx);
            save(&path, &project)?;
            println!("Removed batch {}", name);
        }
        Commands::RemoveData {
            project: path,
            batch,
            index,
        } => {
            let mut project = load(&path)?;
            let file = project.remove_data_file(&batch, index)?;
            save(&path, &project)?;
            println!("Removed {} from {}", file, batch);
        }
        Commands::AddData {
            project: path,
            batch,
            file,
            format,
            skip,
        } => {
            let mut mapping = ColumnMapping::from_preset(&format)
                .ok_or_else(|| anyhow!("unknown format {}", format))?;
            if let Some(rows) = skip {
                mapping = mapping.with_skip(rows);
            }
            let mut project = load(&path)?;
            project.add_data_file(&batch, &file, &mapping)?;
            let rows = project.batch(&batch).map(|b| b.row_count).unwrap_or_default();
            save(&path, &project)?;
            println!("Added {} to {} ({} rows)", file, batch, rows);
        }
        Commands::Match {
            project: path,
            batch,
            clamped,
        } => {
            let mut project = load(&path)?;
            let options = MatchOptions {
                distance: if clamped {
                    DistanceMode::Segment
                } else {
                    DistanceMode::SupportingLine
                },
            };
            let summary = project.match_batch(&batch, options)?;
            save(&path, &project)?;
            println!("Matched {} runs: {}", summary.runs, summary.assigned.join(" "));
        }
        Commands::HideRegion {
            project: path,
            batch,
            polygon,
            invert,
        } => {
            let region = parse_polygon(&polygon)?;
            let mut project = load(&path)?;
            let band = project.settings.band()?;
            let (hidden, lines) = edit_batch(&mut project, &batch, band, |ed| {
                let hidden = ed.apply_region(&region, invert);
                (hidden, ed.status().lines)
            })?;
            save(&path, &project)?;
            println!("Hid {} points; {} lines remain", hidden, lines);
        }
        Commands::DiscardAbnormal {
            project: path,
            batch,
            low,
            high,
        } => {
            let mut project = load(&path)?;
            let band = resolve_band(&project, low, high)?;
            let (hidden, lines) = edit_batch(&mut project, &batch, band, |ed| {
                let hidden = ed.apply_band_discard();
                (hidden, ed.status().lines)
            })?;
            save(&path, &project)?;
            println!("Discarded {} abnormal points; {} lines remain", hidden, lines);
        }
        Commands::Segments {
            project: path,
            batch,
            low,
            high,
        } => {
            let project = load(&path)?;
            let band = resolve_band(&project, low, high)?;
            let batch = project
                .batch(&batch)
                .cloned()
                .ok_or_else(|| anyhow!("no batch named {}", batch))?;
            let editor = BatchEditor::new(batch, band);
            let points = editor.points();
            for seg in editor.segments() {
                let (first, last) = match (seg.point_indices.first(), seg.point_indices.last()) {
                    (Some(&f), Some(&l)) => (points[f].sequence, points[l].sequence),
                    _ => continue,
                };
                println!(
                    "{},{},{},{},{}",
                    seg.line_id,
                    if seg.normal_altitude { "normal" } else { "abnormal" },
                    seg.point_indices.len(),
                    first,
                    last
                );
            }
        }
        Commands::SetThresholds {
            project: path,
            low,
            high,
        } => {
            QualityBand::new(low, high)?;
            let mut project = load(&path)?;
            project.settings.low_alt_threshold = low;
            project.settings.high_alt_threshold = high;
            project.touch();
            save(&path, &project)?;
            println!("Altitude band set to [{}, {}]", low, high);
        }
        Commands::Export {
            project: path,
            batch,
            output,
        } => {
            let project = load(&path)?;
            let batch = project
                .batch(&batch)
                .ok_or_else(|| anyhow!("no batch named {}", batch))?;
            let output = output.unwrap_or_else(|| default_export_name(batch));
            let written = write_points_csv(&output, &batch.points)
                .with_context(|| format!("writing {}", output))?;
            println!("Exported {} points to {}", written, output);
        }
        Commands::Summary { project: path } => {
            let project = load(&path)?;
            println!("Project: {}", project.project_name);
            println!(
                "Altitude band: [{}, {}]",
                project.settings.low_alt_threshold, project.settings.high_alt_threshold
            );
            for file in &project.design_lines {
                println!("Design file {}: {} lines", file.file_path, file.lines.len());
            }
            for batch in &project.batches {
                println!(
                    "Batch {}: {}/{} visible points, {} files, related lines [{}]",
                    batch.name,
                    batch.visible_count(),
                    batch.points.len(),
                    batch.file_names.len(),
                    batch.related_lines.join(" ")
                );
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    init_logging();
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polygon_parsing() {
        let poly = parse_polygon("-1,-1; 1,-1; 1,1; -1,1").unwrap();
        assert_eq!(poly.len(), 4);
        assert_eq!(poly[0], Point::new(-1.0, -1.0));
        assert!(parse_polygon("0,0;1,1").is_err());
        assert!(parse_polygon("0,0;1;2,2").is_err());
    }

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
