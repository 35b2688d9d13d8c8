//! Quality admission for raw scans.
//!
//! Scans are scored by an external quality tool and only those at or below
//! the accepted score are copied forward. NFIQ scores run from 1 (best) to
//! 5 (worst).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::batch::{run_batch, BatchOptions, StageReport};
use crate::discover::collect_files_with_extensions;
use crate::error::FpsynthError;
use crate::extract::DEFAULT_TOOL_TIMEOUT;
use crate::tool::run_tool;

/// Image extensions picked up by the scan-level stages.
pub const SUPPORTED_IMAGE_FORMATS: &[&str] = &["bmp", "jpg", "jpeg", "png", "tif", "tiff"];

pub const DEFAULT_MAX_NFIQ_SCORE: u32 = 3;

/// Assigns a quality score to one scan; lower is better.
pub trait QualityScorer: Send + Sync {
    fn name(&self) -> &str;

    fn score(&self, image: &Path) -> Result<u32, FpsynthError>;
}

/// NIST nfiq, run as `nfiq <image>`; the score is the first integer on
/// stdout.
#[derive(Clone, Debug)]
pub struct Nfiq {
    pub binary: PathBuf,
    pub timeout: Duration,
}

impl Nfiq {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }
}

impl QualityScorer for Nfiq {
    fn name(&self) -> &str {
        "nfiq"
    }

    fn score(&self, image: &Path) -> Result<u32, FpsynthError> {
        let output = run_tool(self.name(), &self.binary, [image], image, self.timeout)?;
        if !output.status.success() {
            return Err(FpsynthError::ExternalToolFailure {
                tool: self.name().to_string(),
                path: image.to_path_buf(),
                message: format!("{}: {}", output.status, output.stderr.trim()),
            });
        }

        parse_score(&output.stdout).ok_or_else(|| FpsynthError::ExternalToolFailure {
            tool: self.name().to_string(),
            path: image.to_path_buf(),
            message: format!("no score in output '{}'", output.stdout.trim()),
        })
    }
}

/// First whitespace-separated unsigned integer in `stdout`.
pub fn parse_score(stdout: &str) -> Option<u32> {
    stdout
        .split_whitespace()
        .find_map(|token| token.parse::<u32>().ok())
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PreprocessOptions {
    /// Highest admitted score.
    pub max_score: u32,
    pub image_formats: Vec<String>,
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        Self {
            max_score: DEFAULT_MAX_NFIQ_SCORE,
            image_formats: SUPPORTED_IMAGE_FORMATS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Score one scan and copy it into `output_dir` if admitted.
///
/// Without a scorer every readable scan is admitted.
pub fn admit_scan(
    image: &Path,
    output_dir: &Path,
    scorer: Option<&dyn QualityScorer>,
    opts: &PreprocessOptions,
) -> Result<PathBuf, FpsynthError> {
    if let Some(scorer) = scorer {
        let score = scorer.score(image)?;
        if score > opts.max_score {
            return Err(FpsynthError::QualityRejected {
                path: image.to_path_buf(),
                score,
                max_score: opts.max_score,
            });
        }
        debug!("{} scored {score}", image.display());
    }

    let file_name = image.file_name().ok_or_else(|| FpsynthError::MissingInput {
        path: image.to_path_buf(),
    })?;
    let destination = output_dir.join(file_name);
    fs::copy(image, &destination).map_err(|source| FpsynthError::OutputIo {
        path: destination.clone(),
        source,
    })?;
    Ok(destination)
}

/// Copy every admitted scan under `input_dir` into `output_dir`.
pub fn filter_by_quality(
    input_dir: &Path,
    output_dir: &Path,
    scorer: Option<&dyn QualityScorer>,
    opts: &PreprocessOptions,
    batch: &BatchOptions,
) -> Result<StageReport, FpsynthError> {
    let images = collect_files_with_extensions(input_dir, &opts.image_formats)?;
    fs::create_dir_all(output_dir).map_err(|source| FpsynthError::OutputIo {
        path: output_dir.to_path_buf(),
        source,
    })?;

    Ok(run_batch("preprocess", &images, batch, |image| {
        admit_scan(image, output_dir, scorer, opts).map(|_| ())
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discover::stem_string;
    use crate::error::IssueCode;

    /// Scores a scan by the digit at the end of its stem.
    struct StemScorer;

    impl QualityScorer for StemScorer {
        fn name(&self) -> &str {
            "stem"
        }

        fn score(&self, image: &Path) -> Result<u32, FpsynthError> {
            stem_string(image)
                .chars()
                .last()
                .and_then(|c| c.to_digit(10))
                .ok_or_else(|| FpsynthError::ExternalToolFailure {
                    tool: "stem".to_string(),
                    path: image.to_path_buf(),
                    message: "no score".to_string(),
                })
        }
    }

    fn scans(dir: &Path, names: &[&str]) {
        fs::create_dir_all(dir).expect("create scans");
        for name in names {
            fs::write(dir.join(name), b"scan").expect("write scan");
        }
    }

    #[test]
    fn parse_score_takes_first_integer() {
        assert_eq!(parse_score("2\n"), Some(2));
        assert_eq!(parse_score("  4 0.71\n"), Some(4));
        assert_eq!(parse_score("quality: 3"), Some(3));
        assert_eq!(parse_score("error"), None);
        assert_eq!(parse_score(""), None);
    }

    #[test]
    fn scans_above_max_score_are_rejected() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let input = temp.path().join("raw");
        let output = temp.path().join("processed");
        scans(&input, &["a_1.png", "b_3.bmp", "c_5.tif", "d_x.jpg"]);

        let report = filter_by_quality(
            &input,
            &output,
            Some(&StemScorer as &dyn QualityScorer),
            &PreprocessOptions::default(),
            &BatchOptions::sequential(),
        )
        .expect("preprocess");

        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.total(), 4);
        assert_eq!(report.count_code(IssueCode::ThresholdRejected), 1);
        assert_eq!(report.count_code(IssueCode::ExternalToolFailure), 1);
        assert!(output.join("a_1.png").is_file());
        assert!(output.join("b_3.bmp").is_file());
        assert!(!output.join("c_5.tif").exists());
    }

    #[test]
    fn no_scorer_admits_everything() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let input = temp.path().join("raw");
        let output = temp.path().join("processed");
        scans(&input, &["a_9.png", "b.JPEG", "readme.txt"]);

        let report = filter_by_quality(
            &input,
            &output,
            None,
            &PreprocessOptions::default(),
            &BatchOptions::default(),
        )
        .expect("preprocess");

        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.total(), 2);
        assert_eq!(
            fs::read(output.join("a_9.png")).expect("read copy"),
            b"scan".to_vec()
        );
    }

    #[cfg(unix)]
    #[test]
    fn nfiq_failure_is_a_tool_failure() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let image = temp.path().join("scan.png");
        fs::write(&image, b"scan").expect("write");

        // `false` ignores its arguments and exits non-zero.
        let scorer = Nfiq::new("false");
        let err = scorer.score(&image).unwrap_err();
        assert!(matches!(err, FpsynthError::ExternalToolFailure { .. }));
    }
}
