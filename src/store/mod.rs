//! Batch conversion of detector output into canonical minutiae records.
//!
//! Every file left in the output directory after
//! [`convert_all_minutiae_files`] holds at least
//! [`ConvertOptions::min_minutiae_count`] records.

use std::fs;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::batch::{run_batch, BatchOptions, StageReport};
use crate::error::FpsynthError;
use crate::minutiae::io_min::MIN_EXTENSION;
use crate::minutiae::io_txt::count_minutiae_lines;
use crate::minutiae::convert_min_to_txt;

/// Default minimum number of minutiae for a record to be kept.
pub const DEFAULT_MIN_MINUTIAE: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConvertOptions {
    /// Records with a lower detector quality are dropped.
    pub quality_threshold: f64,
    /// Converted files with fewer lines are deleted.
    pub min_minutiae_count: usize,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            quality_threshold: 0.0,
            min_minutiae_count: DEFAULT_MIN_MINUTIAE,
        }
    }
}

/// Convert one `.min` file and enforce the minimum count on the result.
pub fn convert_and_check(
    min_path: &Path,
    output_dir: &Path,
    opts: &ConvertOptions,
) -> Result<(), FpsynthError> {
    let converted = convert_min_to_txt(min_path, output_dir, opts.quality_threshold)?;
    let count = count_minutiae_lines(&converted.path)?;

    if count < opts.min_minutiae_count {
        fs::remove_file(&converted.path).map_err(|source| FpsynthError::OutputIo {
            path: converted.path.clone(),
            source,
        })?;
        debug!("Removed {} ({count} minutiae)", converted.path.display());
        return Err(FpsynthError::ThresholdRejected {
            path: converted.path,
            count,
            minimum: opts.min_minutiae_count,
        });
    }

    Ok(())
}

/// Convert every `.min` file under `source_dir` into `output_dir`.
///
/// A file that cannot be converted, or converts to fewer than the minimum
/// number of minutiae, is counted as a failure and leaves nothing behind.
pub fn convert_all_minutiae_files(
    source_dir: &Path,
    output_dir: &Path,
    opts: &ConvertOptions,
    batch: &BatchOptions,
) -> Result<StageReport, FpsynthError> {
    let files = crate::discover::collect_files_with_extensions(source_dir, &[MIN_EXTENSION])?;
    fs::create_dir_all(output_dir).map_err(|source| FpsynthError::OutputIo {
        path: output_dir.to_path_buf(),
        source,
    })?;

    Ok(run_batch("convert", &files, batch, |min_path| {
        convert_and_check(min_path, output_dir, opts)
    }))
}
