//! Pipeline configuration.
//!
//! Every field has a default, so a YAML file only needs the keys it
//! changes:
//!
//! ```yaml
//! mindtct_path: /opt/nbis/bin/mindtct
//! template_size: { height: 256, width: 256 }
//! channel_layout: with_singular
//! jobs: 4
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::batch::BatchOptions;
use crate::error::FpsynthError;
use crate::extract::Mindtct;
use crate::minutiae::ImageSize;
use crate::preprocess::{Nfiq, PreprocessOptions, DEFAULT_MAX_NFIQ_SCORE, SUPPORTED_IMAGE_FORMATS};
use crate::render::{ChannelLayout, OriginalSize, RenderOptions};
use crate::store::{ConvertOptions, DEFAULT_MIN_MINUTIAE};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub mindtct_path: PathBuf,
    pub nfiq_path: PathBuf,

    /// Run the quality scorer during preprocessing.
    pub filter_quality: bool,
    pub max_nfiq_score: u32,

    pub template_size: ImageSize,
    /// Original scan size; `None` treats points as template coordinates.
    pub original_size: Option<ImageSize>,
    /// Read each record's original size from the scan with the same stem.
    pub original_size_from_scans: bool,
    pub orientation_line_length: u32,
    pub point_sigma: f64,
    pub orientation_sigma: f64,
    pub point_gain: f32,
    pub orientation_gain: f32,
    pub channel_layout: ChannelLayout,

    pub quality_threshold: f64,
    pub min_minutiae_count: usize,

    pub supported_image_formats: Vec<String>,
    pub tool_timeout_secs: u64,
    pub keep_all_files: bool,
    /// Worker threads per stage; unset uses one per core.
    pub jobs: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let render = RenderOptions::default();
        Self {
            mindtct_path: PathBuf::from("./external_tools/mindtct"),
            nfiq_path: PathBuf::from("./external_tools/nfiq"),
            filter_quality: true,
            max_nfiq_score: DEFAULT_MAX_NFIQ_SCORE,
            template_size: render.target_size,
            original_size: None,
            original_size_from_scans: false,
            orientation_line_length: render.orientation_line_length,
            point_sigma: render.point_sigma,
            orientation_sigma: render.orientation_sigma,
            point_gain: render.point_gain,
            orientation_gain: render.orientation_gain,
            channel_layout: render.layout,
            quality_threshold: 0.0,
            min_minutiae_count: DEFAULT_MIN_MINUTIAE,
            supported_image_formats: SUPPORTED_IMAGE_FORMATS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            tool_timeout_secs: 60,
            keep_all_files: false,
            jobs: None,
        }
    }
}

impl PipelineConfig {
    /// Load and validate a YAML config file.
    pub fn from_yaml_file(path: &Path) -> Result<Self, FpsynthError> {
        let data = fs::read_to_string(path).map_err(|_| FpsynthError::MissingInput {
            path: path.to_path_buf(),
        })?;
        let config: Self =
            serde_yaml::from_str(&data).map_err(|source| FpsynthError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), FpsynthError> {
        self.render_options().validate()?;
        if let Some(size) = self.original_size {
            if size.is_empty() {
                return Err(FpsynthError::InvalidConfig(format!(
                    "original_size must be non-empty, got {size}"
                )));
            }
        }
        if self.jobs == Some(0) {
            return Err(FpsynthError::InvalidConfig(
                "jobs must be at least 1".to_string(),
            ));
        }
        if self.tool_timeout_secs == 0 {
            return Err(FpsynthError::InvalidConfig(
                "tool_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.supported_image_formats.is_empty() {
            return Err(FpsynthError::InvalidConfig(
                "supported_image_formats must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            target_size: self.template_size,
            orientation_line_length: self.orientation_line_length,
            point_sigma: self.point_sigma,
            orientation_sigma: self.orientation_sigma,
            point_gain: self.point_gain,
            orientation_gain: self.orientation_gain,
            layout: self.channel_layout,
        }
    }

    /// Original-size policy for rendering; `scans_dir` is where the scans
    /// of the current run live, if any.
    pub fn original_size_policy(&self, scans_dir: Option<&Path>) -> OriginalSize {
        match (self.original_size, scans_dir) {
            (Some(size), _) => OriginalSize::Fixed(size),
            (None, Some(dir)) if self.original_size_from_scans => OriginalSize::FromScans {
                dir: dir.to_path_buf(),
                extensions: self.supported_image_formats.clone(),
            },
            _ => OriginalSize::SameAsTarget,
        }
    }

    pub fn convert_options(&self) -> ConvertOptions {
        ConvertOptions {
            quality_threshold: self.quality_threshold,
            min_minutiae_count: self.min_minutiae_count,
        }
    }

    pub fn preprocess_options(&self) -> PreprocessOptions {
        PreprocessOptions {
            max_score: self.max_nfiq_score,
            image_formats: self.supported_image_formats.clone(),
        }
    }

    pub fn mindtct(&self) -> Mindtct {
        Mindtct {
            binary: self.mindtct_path.clone(),
            timeout: self.tool_timeout(),
            keep_all_files: self.keep_all_files,
        }
    }

    pub fn nfiq(&self) -> Nfiq {
        Nfiq {
            binary: self.nfiq_path.clone(),
            timeout: self.tool_timeout(),
        }
    }

    pub fn batch_options(&self) -> BatchOptions {
        BatchOptions {
            jobs: self.jobs,
            cancel: None,
        }
    }
}
