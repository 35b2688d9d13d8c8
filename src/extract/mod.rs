//! Minutiae extraction through an external feature detector.
//!
//! The detector is opaque: it is handed an image and an output prefix and
//! is expected to leave `<prefix>.min` behind. The absence of that file is
//! the failure signal.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, warn};

use crate::batch::{run_batch, BatchOptions, StageReport};
use crate::discover::{collect_files_with_extensions, stem_string};
use crate::error::FpsynthError;
use crate::minutiae::io_min::MIN_EXTENSION;
use crate::tool::{run_tool, with_suffix};

/// Side files written by mindtct next to the `.min` output.
pub const AUXILIARY_EXTENSIONS: &[&str] = &["dm", "hcm", "lcm", "lfm", "qm", "xyt", "brw"];

pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(60);

/// Produces a raw `.min` record for one fingerprint image.
pub trait FeatureDetector: Send + Sync {
    /// Short tool name used in logs and reports.
    fn name(&self) -> &str;

    /// Run detection on `image`, writing `<output_prefix>.min`.
    ///
    /// Returns the path of the `.min` file.
    fn detect(&self, image: &Path, output_prefix: &Path) -> Result<PathBuf, FpsynthError>;
}

/// NIST mindtct, run as `mindtct -m1 <image> <prefix>`.
#[derive(Clone, Debug)]
pub struct Mindtct {
    pub binary: PathBuf,
    pub timeout: Duration,
    /// Keep the auxiliary maps mindtct writes besides the `.min` file.
    pub keep_all_files: bool,
}

impl Mindtct {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            timeout: DEFAULT_TOOL_TIMEOUT,
            keep_all_files: false,
        }
    }
}

impl FeatureDetector for Mindtct {
    fn name(&self) -> &str {
        "mindtct"
    }

    fn detect(&self, image: &Path, output_prefix: &Path) -> Result<PathBuf, FpsynthError> {
        if !image.is_file() {
            return Err(FpsynthError::MissingInput {
                path: image.to_path_buf(),
            });
        }

        let output = run_tool(
            self.name(),
            &self.binary,
            [
                OsStr::new("-m1"),
                image.as_os_str(),
                output_prefix.as_os_str(),
            ],
            image,
            self.timeout,
        )?;

        let stderr = output.stderr.trim();
        if !stderr.is_empty() {
            warn!("mindtct warning for {}: {stderr}", image.display());
        }

        let min_path = with_suffix(output_prefix, MIN_EXTENSION);
        if !min_path.is_file() {
            return Err(FpsynthError::ExternalToolFailure {
                tool: self.name().to_string(),
                path: image.to_path_buf(),
                message: format!("no .min file produced ({})", output.status),
            });
        }

        if !self.keep_all_files {
            remove_auxiliary_files(output_prefix);
        }

        Ok(min_path)
    }
}

/// Delete `<prefix>.<ext>` for every auxiliary extension that exists.
pub fn remove_auxiliary_files(output_prefix: &Path) {
    for ext in AUXILIARY_EXTENSIONS {
        let path = with_suffix(output_prefix, ext);
        if path.is_file() {
            if let Err(err) = fs::remove_file(&path) {
                debug!("Could not remove {}: {err}", path.display());
            }
        }
    }
}

/// Extract minutiae for one image into `<output_dir>/<stem>.min`.
pub fn extract_minutiae_from_image(
    image: &Path,
    output_dir: &Path,
    detector: &dyn FeatureDetector,
) -> Result<PathBuf, FpsynthError> {
    let prefix = output_dir.join(stem_string(image));
    let min_path = detector.detect(image, &prefix)?;
    debug!("Extracted minutiae: {}", min_path.display());
    Ok(min_path)
}

/// Run the detector over every image under `input_dir`.
pub fn extract_minutiae_from_folder<S: AsRef<str>>(
    input_dir: &Path,
    output_dir: &Path,
    detector: &dyn FeatureDetector,
    image_formats: &[S],
    batch: &BatchOptions,
) -> Result<StageReport, FpsynthError> {
    let images = collect_files_with_extensions(input_dir, image_formats)?;
    fs::create_dir_all(output_dir).map_err(|source| FpsynthError::OutputIo {
        path: output_dir.to_path_buf(),
        source,
    })?;

    Ok(run_batch("extract", &images, batch, |image| {
        extract_minutiae_from_image(image, output_dir, detector).map(|_| ())
    }))
}
