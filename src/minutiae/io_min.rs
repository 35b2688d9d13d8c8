//! Reader for the raw `.min` files written by the NBIS `mindtct` detector.
//!
//! The file starts with a 3-line header followed by one colon-delimited
//! record per minutia:
//!
//! ```text
//!    0 :  123,  45 :  8 :  0.750 :  BIF : ...
//! id   x,y         dir   quality  type   ...
//! ```
//!
//! Direction is the detector's 32-step angular unit (11.25° per step),
//! zero-referenced to the vertical axis. It is converted to degrees here.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use super::io_txt::{format_minutia_line, write_lines, TXT_EXTENSION};
use super::model::{MinutiaKind, MinutiaPoint};
use crate::discover::output_path_for;
use crate::error::FpsynthError;

pub const MIN_EXTENSION: &str = "min";

/// Number of header lines preceding the records.
pub const HEADER_LINES: usize = 3;

/// Degrees per detector direction unit (32 steps per turn).
pub const DIRECTION_STEP_DEGREES: f64 = 11.25;

/// Convert a detector direction unit to degrees in `[0, 360)`.
///
/// `u = 0` points straight up (90°), each step turns 11.25° clockwise.
pub fn direction_to_degrees(unit: i64) -> f64 {
    // `+ 0.0` folds a negative zero from `rem_euclid` into `0.0`.
    (90.0 - DIRECTION_STEP_DEGREES * unit as f64).rem_euclid(360.0) + 0.0
}

/// One decoded detector record.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectorMinutia {
    pub kind: MinutiaKind,
    pub x: i32,
    pub y: i32,
    pub orientation_deg: f64,
    pub quality: f64,
}

impl DetectorMinutia {
    pub fn to_point(&self) -> MinutiaPoint {
        MinutiaPoint::from_degrees(self.kind, self.x, self.y, self.orientation_deg)
    }

    /// The canonical text line for this record.
    pub fn canonical_line(&self) -> String {
        format_minutia_line(self.kind, self.x, self.y, self.orientation_deg)
    }
}

/// Outcome of decoding one `.min` file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MinParseSummary {
    /// Records that passed parsing and the quality filter, in file order.
    pub minutiae: Vec<DetectorMinutia>,
    /// Records skipped because they could not be parsed.
    pub malformed: usize,
    /// Records dropped by the quality threshold.
    pub below_quality: usize,
}

/// A canonical file written by [`convert_min_to_txt`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConvertedRecord {
    pub path: PathBuf,
    pub count: usize,
}

/// Decode `.min` content, skipping the header.
///
/// Malformed records are logged and skipped one by one; they never fail the
/// whole input.
pub fn read_min_str(content: &str, path: &Path, quality_threshold: f64) -> MinParseSummary {
    let mut summary = MinParseSummary::default();

    for (line_idx, line) in content.lines().enumerate().skip(HEADER_LINES) {
        match parse_min_line(line, path, line_idx + 1) {
            Ok(None) => {}
            Ok(Some(minutia)) if minutia.quality < quality_threshold => {
                summary.below_quality += 1;
            }
            Ok(Some(minutia)) => summary.minutiae.push(minutia),
            Err(err) => {
                warn!("Skipping record: {err}");
                summary.malformed += 1;
            }
        }
    }

    summary
}

/// Read and decode one `.min` file.
pub fn read_min_file(path: &Path, quality_threshold: f64) -> Result<MinParseSummary, FpsynthError> {
    if !path.is_file() {
        return Err(FpsynthError::MissingInput {
            path: path.to_path_buf(),
        });
    }
    let content = fs::read_to_string(path)?;
    Ok(read_min_str(&content, path, quality_threshold))
}

/// Convert a `.min` file into `<output_dir>/<stem>.txt`.
///
/// If no record survives parsing and the quality filter, nothing is written
/// and [`FpsynthError::EmptyResult`] is returned.
pub fn convert_min_to_txt(
    min_path: &Path,
    output_dir: &Path,
    quality_threshold: f64,
) -> Result<ConvertedRecord, FpsynthError> {
    let summary = read_min_file(min_path, quality_threshold)?;

    if summary.minutiae.is_empty() {
        return Err(FpsynthError::EmptyResult {
            path: min_path.to_path_buf(),
        });
    }

    let output_path = output_path_for(min_path, output_dir, TXT_EXTENSION);
    let mut content = String::new();
    for minutia in &summary.minutiae {
        content.push_str(&minutia.canonical_line());
        content.push('\n');
    }
    write_lines(&output_path, &content)?;

    debug!(
        "Converted {} minutiae ({} malformed, {} below quality): {} -> {}",
        summary.minutiae.len(),
        summary.malformed,
        summary.below_quality,
        min_path.display(),
        output_path.display()
    );

    Ok(ConvertedRecord {
        path: output_path,
        count: summary.minutiae.len(),
    })
}

/// Decode a single record line. Blank lines yield `Ok(None)`.
pub fn parse_min_line(
    line: &str,
    path: &Path,
    line_num: usize,
) -> Result<Option<DetectorMinutia>, FpsynthError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    // Records carry trailing neighbour lists; only the first five fields matter.
    let fields: Vec<&str> = trimmed.splitn(6, ':').map(str::trim).collect();
    if fields.len() < 5 {
        return Err(malformed(
            path,
            line_num,
            format!("expected at least 5 fields, found {}", fields.len()),
        ));
    }

    let (x, y) = parse_xy(fields[1], path, line_num)?;

    let direction = fields[2].parse::<i64>().map_err(|_| {
        malformed(
            path,
            line_num,
            format!("invalid direction '{}'; expected integer", fields[2]),
        )
    })?;

    // NBIS writes quality before type. Shortened exports put the type first;
    // whichever of the two fields is numeric is the quality.
    let (quality, type_field) = match (fields[3].parse::<f64>(), fields[4].parse::<f64>()) {
        (Ok(quality), _) => (quality, fields[4]),
        (Err(_), Ok(quality)) => (quality, fields[3]),
        (Err(_), Err(_)) => {
            return Err(malformed(
                path,
                line_num,
                format!("invalid quality '{}'; expected number", fields[3]),
            ))
        }
    };

    Ok(Some(DetectorMinutia {
        kind: MinutiaKind::from_type_field(type_field),
        x,
        y,
        orientation_deg: direction_to_degrees(direction),
        quality,
    }))
}

/// Fuzz-only entrypoint for `.min` single-line parsing.
#[cfg(feature = "fuzzing")]
pub fn fuzz_parse_min_line(input: &str) -> Result<(), FpsynthError> {
    let _ = parse_min_line(input, Path::new("<fuzz>"), 1)?;
    Ok(())
}

fn parse_xy(raw: &str, path: &Path, line_num: usize) -> Result<(i32, i32), FpsynthError> {
    let mut parts = raw.split(',').map(str::trim);
    let (Some(x_raw), Some(y_raw), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(malformed(
            path,
            line_num,
            format!("invalid coordinates '{raw}'; expected 'x,y'"),
        ));
    };

    let x = x_raw
        .parse::<i32>()
        .map_err(|_| malformed(path, line_num, format!("invalid x '{x_raw}'")))?;
    let y = y_raw
        .parse::<i32>()
        .map_err(|_| malformed(path, line_num, format!("invalid y '{y_raw}'")))?;

    Ok((x, y))
}

fn malformed(path: &Path, line: usize, message: impl Into<String>) -> FpsynthError {
    FpsynthError::MalformedRecord {
        path: path.to_path_buf(),
        line,
        message: message.into(),
    }
}
