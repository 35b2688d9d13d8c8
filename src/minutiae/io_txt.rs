//! Canonical minutiae text format.
//!
//! One whitespace-delimited record per line:
//!
//! ```text
//! type x y orientation_degrees
//! ```
//!
//! `type` is the numeric [`MinutiaKind`] code. Orientation is written in
//! degrees and converted to radians when read back. Blank lines and lines
//! starting with `#` are ignored.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use log::error;

use super::model::{MinutiaKind, MinutiaPoint, MinutiaeTable};
use crate::error::FpsynthError;

pub const TXT_EXTENSION: &str = "txt";

/// Format one canonical line. Orientation keeps a decimal point so that
/// whole degrees read as `90.0`.
pub fn format_minutia_line(kind: MinutiaKind, x: i32, y: i32, orientation_deg: f64) -> String {
    format!("{} {} {} {:?}", kind.code(), x, y, orientation_deg)
}

/// Serialize points to the canonical text form.
pub fn to_minutiae_string(points: &[MinutiaPoint]) -> String {
    let mut out = String::new();
    for point in points {
        out.push_str(&format_minutia_line(
            point.kind(),
            point.x(),
            point.y(),
            point.orientation_degrees(),
        ));
        out.push('\n');
    }
    out
}

/// Write points to `path` in the canonical text form.
pub fn write_minutiae_txt(path: &Path, points: &[MinutiaPoint]) -> Result<(), FpsynthError> {
    write_lines(path, &to_minutiae_string(points))
}

pub(crate) fn write_lines(path: &Path, content: &str) -> Result<(), FpsynthError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| FpsynthError::OutputIo {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, content).map_err(|source| FpsynthError::OutputIo {
        path: path.to_path_buf(),
        source,
    })
}

/// Strictly parse canonical text. Any bad line fails the whole input.
pub fn parse_minutiae_str(content: &str, path: &Path) -> Result<MinutiaeTable, FpsynthError> {
    let mut points = Vec::new();

    for (line_idx, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        points.push(parse_minutia_line(trimmed, path, line_idx + 1)?);
    }

    Ok(MinutiaeTable::new(points))
}

/// Load a canonical minutiae file as an `(N, 4)` table with orientation in
/// radians.
///
/// Never fails: an unreadable or malformed file is logged and comes back as
/// an empty `(0, 4)` table, which callers treat as "no usable minutiae".
pub fn parse_minutiae_file(path: &Path) -> MinutiaeTable {
    let parsed = read_text(path).and_then(|content| parse_minutiae_str(&content, path));

    match parsed {
        Ok(table) => table,
        Err(err) => {
            error!("Error parsing minutiae file {}: {err}", path.display());
            MinutiaeTable::empty()
        }
    }
}

/// Read a text input; a missing file is [`FpsynthError::MissingInput`],
/// anything else (permissions, invalid UTF-8) is [`FpsynthError::InputIo`].
pub(crate) fn read_text(path: &Path) -> Result<String, FpsynthError> {
    fs::read_to_string(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => FpsynthError::MissingInput {
            path: path.to_path_buf(),
        },
        _ => FpsynthError::InputIo {
            path: path.to_path_buf(),
            source,
        },
    })
}

/// Count the non-blank lines of a canonical file.
pub fn count_minutiae_lines(path: &Path) -> Result<usize, FpsynthError> {
    let content = read_text(path)?;
    Ok(content.lines().filter(|line| !line.trim().is_empty()).count())
}

/// Fuzz-only entrypoint for canonical text parsing.
#[cfg(feature = "fuzzing")]
pub fn fuzz_parse_minutiae_str(input: &str) -> Result<(), FpsynthError> {
    let _ = parse_minutiae_str(input, Path::new("<fuzz>"))?;
    Ok(())
}

fn parse_minutia_line(
    line: &str,
    path: &Path,
    line_num: usize,
) -> Result<MinutiaPoint, FpsynthError> {
    // Take at most 5 tokens so pathological inputs do not allocate unbounded memory.
    let tokens: Vec<&str> = line.split_whitespace().take(5).collect();
    if tokens.len() != 4 {
        return Err(malformed(
            path,
            line_num,
            format!("expected 4 columns, found {}", tokens.len()),
        ));
    }

    let code = parse_integral(tokens[0], "type", path, line_num)?;
    let kind = u8::try_from(code)
        .ok()
        .and_then(MinutiaKind::from_code)
        .ok_or_else(|| malformed(path, line_num, format!("unknown minutia type {code}")))?;

    let x = parse_coordinate(tokens[1], "x", path, line_num)?;
    let y = parse_coordinate(tokens[2], "y", path, line_num)?;

    let degrees = tokens[3].parse::<f64>().map_err(|_| {
        malformed(
            path,
            line_num,
            format!("invalid orientation '{}'", tokens[3]),
        )
    })?;
    if !degrees.is_finite() {
        return Err(malformed(path, line_num, "orientation is not finite"));
    }

    Ok(MinutiaPoint::from_degrees(kind, x, y, degrees))
}

// Columns may be written as `10` or `10.0`; only whole numbers are accepted.
fn parse_integral(raw: &str, field: &str, path: &Path, line_num: usize) -> Result<i64, FpsynthError> {
    if let Ok(value) = raw.parse::<i64>() {
        return Ok(value);
    }
    let value = raw
        .parse::<f64>()
        .map_err(|_| malformed(path, line_num, format!("invalid {field} '{raw}'")))?;
    if !value.is_finite() || value.fract() != 0.0 || value.abs() > i32::MAX as f64 {
        return Err(malformed(
            path,
            line_num,
            format!("{field} '{raw}' is not a whole number"),
        ));
    }
    Ok(value as i64)
}

fn parse_coordinate(raw: &str, field: &str, path: &Path, line_num: usize) -> Result<i32, FpsynthError> {
    let value = parse_integral(raw, field, path, line_num)?;
    i32::try_from(value)
        .map_err(|_| malformed(path, line_num, format!("{field} '{raw}' is out of range")))
}

fn malformed(path: &Path, line: usize, message: impl Into<String>) -> FpsynthError {
    FpsynthError::MalformedRecord {
        path: path.to_path_buf(),
        line,
        message: message.into(),
    }
}
