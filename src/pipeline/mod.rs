//! Stage orchestration.
//!
//! A full run moves a batch of scans through four directories under the
//! output root:
//!
//! ```text
//! input/ --preprocess--> processed/ --extract--> minutiae/
//!        --convert--> minutiae_txt/ --render--> templates/
//! ```
//!
//! Each stage reads only the previous stage's output directory, so an item
//! that fails anywhere simply has no file downstream.

mod report;

pub use report::{OverallStats, PipelineReport};

use std::path::{Path, PathBuf};

use log::info;

use crate::batch::{BatchOptions, CancelToken, StageReport};
use crate::config::PipelineConfig;
use crate::error::FpsynthError;
use crate::extract::{extract_minutiae_from_folder, FeatureDetector};
use crate::preprocess::{filter_by_quality, QualityScorer};
use crate::render::create_templates_from_folder;
use crate::store::convert_all_minutiae_files;

pub const PROCESSED_DIR: &str = "processed";
pub const MINUTIAE_DIR: &str = "minutiae";
pub const MINUTIAE_TXT_DIR: &str = "minutiae_txt";
pub const TEMPLATES_DIR: &str = "templates";

/// Drives the batch stages with one configuration.
pub struct Pipeline {
    config: PipelineConfig,
    detector: Box<dyn FeatureDetector>,
    scorer: Option<Box<dyn QualityScorer>>,
    batch: BatchOptions,
    scans_dir: Option<PathBuf>,
}

impl Pipeline {
    /// Build a pipeline using mindtct and, when quality filtering is on,
    /// nfiq from the configured paths.
    pub fn new(config: PipelineConfig) -> Result<Self, FpsynthError> {
        config.validate()?;
        let detector: Box<dyn FeatureDetector> = Box::new(config.mindtct());
        let scorer: Option<Box<dyn QualityScorer>> = if config.filter_quality {
            Some(Box::new(config.nfiq()))
        } else {
            None
        };
        let batch = config.batch_options();
        info!("Pipeline initialized ({} templates)", config.template_size);

        Ok(Self {
            config,
            detector,
            scorer,
            batch,
            scans_dir: None,
        })
    }

    pub fn with_detector(mut self, detector: Box<dyn FeatureDetector>) -> Self {
        self.detector = detector;
        self
    }

    pub fn with_scorer(mut self, scorer: Option<Box<dyn QualityScorer>>) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.batch.cancel = Some(cancel);
        self
    }

    /// Scans used to look up original sizes in template-only runs.
    pub fn with_scans_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scans_dir = Some(dir.into());
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run all four stages from raw scans to templates.
    pub fn run_full_pipeline(
        &self,
        input_dir: &Path,
        output_dir: &Path,
    ) -> Result<PipelineReport, FpsynthError> {
        info!(
            "Starting full pipeline: {} -> {}",
            input_dir.display(),
            output_dir.display()
        );

        let processed_dir = output_dir.join(PROCESSED_DIR);
        let minutiae_dir = output_dir.join(MINUTIAE_DIR);
        let txt_dir = output_dir.join(MINUTIAE_TXT_DIR);
        let templates_dir = output_dir.join(TEMPLATES_DIR);

        info!("Step 1: preprocessing scans");
        let preprocessing = self.run_preprocessing_only(input_dir, &processed_dir)?;

        info!("Step 2: extracting minutiae");
        let extraction = self.extract(&processed_dir, &minutiae_dir)?;

        info!("Step 3: converting minutiae records");
        let conversion = self.convert(&minutiae_dir, &txt_dir)?;

        info!("Step 4: rendering templates");
        let templates = self.render(&txt_dir, &templates_dir, Some(&processed_dir))?;

        let overall = OverallStats::new(preprocessing.total(), templates.succeeded());
        info!(
            "Pipeline complete: {}/{} images -> templates",
            overall.final_templates, overall.input_images
        );

        Ok(PipelineReport {
            preprocessing: Some(preprocessing),
            extraction: Some(extraction),
            conversion: Some(conversion),
            templates: Some(templates),
            overall: Some(overall),
        })
    }

    /// Quality-filter scans from `input_dir` into `output_dir`.
    pub fn run_preprocessing_only(
        &self,
        input_dir: &Path,
        output_dir: &Path,
    ) -> Result<StageReport, FpsynthError> {
        filter_by_quality(
            input_dir,
            output_dir,
            self.scorer.as_deref(),
            &self.config.preprocess_options(),
            &self.batch,
        )
    }

    /// Extract and convert minutiae for already preprocessed scans, writing
    /// `minutiae/` and `minutiae_txt/` under `output_dir`.
    pub fn run_minutiae_extraction_only(
        &self,
        input_dir: &Path,
        output_dir: &Path,
    ) -> Result<PipelineReport, FpsynthError> {
        let minutiae_dir = output_dir.join(MINUTIAE_DIR);
        let txt_dir = output_dir.join(MINUTIAE_TXT_DIR);

        let extraction = self.extract(input_dir, &minutiae_dir)?;
        let conversion = self.convert(&minutiae_dir, &txt_dir)?;

        Ok(PipelineReport {
            extraction: Some(extraction),
            conversion: Some(conversion),
            ..Default::default()
        })
    }

    /// Render templates for every canonical record in `minutiae_dir`.
    pub fn run_template_creation_only(
        &self,
        minutiae_dir: &Path,
        output_dir: &Path,
    ) -> Result<StageReport, FpsynthError> {
        self.render(minutiae_dir, output_dir, self.scans_dir.as_deref())
    }

    /// Convert raw `.min` files only.
    pub fn run_conversion_only(
        &self,
        minutiae_dir: &Path,
        output_dir: &Path,
    ) -> Result<StageReport, FpsynthError> {
        self.convert(minutiae_dir, output_dir)
    }

    fn extract(&self, input_dir: &Path, output_dir: &Path) -> Result<StageReport, FpsynthError> {
        extract_minutiae_from_folder(
            input_dir,
            output_dir,
            &*self.detector,
            &self.config.supported_image_formats,
            &self.batch,
        )
    }

    fn convert(&self, input_dir: &Path, output_dir: &Path) -> Result<StageReport, FpsynthError> {
        convert_all_minutiae_files(
            input_dir,
            output_dir,
            &self.config.convert_options(),
            &self.batch,
        )
    }

    fn render(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        scans_dir: Option<&Path>,
    ) -> Result<StageReport, FpsynthError> {
        create_templates_from_folder(
            input_dir,
            output_dir,
            &self.config.original_size_policy(scans_dir),
            &self.config.render_options(),
            &self.batch,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::with_suffix;
    use std::fs;

    /// Writes six bifurcations, or two for stems starting with "sparse".
    struct FakeDetector;

    impl FeatureDetector for FakeDetector {
        fn name(&self) -> &str {
            "fake"
        }

        fn detect(&self, image: &Path, output_prefix: &Path) -> Result<PathBuf, FpsynthError> {
            let stem = crate::discover::stem_string(image);
            let count = if stem.starts_with("sparse") { 2 } else { 6 };
            let mut content = String::from("h\nh\nh\n");
            for i in 0..count {
                content.push_str(&format!("{i} : {},{} : 4 : 0.8 : BIF : 0,0\n", 20 + 10 * i, 40));
            }
            let min_path = with_suffix(output_prefix, "min");
            fs::write(&min_path, content)?;
            Ok(min_path)
        }
    }

    fn small_config() -> PipelineConfig {
        PipelineConfig {
            template_size: crate::minutiae::ImageSize::square(96),
            filter_quality: false,
            jobs: Some(2),
            ..Default::default()
        }
    }

    #[test]
    fn full_run_reports_every_stage() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let input = temp.path().join("raw");
        let output = temp.path().join("out");
        fs::create_dir_all(&input).expect("create input");
        for name in ["f01.png", "f02.bmp", "sparse03.tif"] {
            fs::write(input.join(name), b"scan").expect("write scan");
        }

        let pipeline = Pipeline::new(small_config())
            .expect("pipeline")
            .with_detector(Box::new(FakeDetector));
        let report = pipeline.run_full_pipeline(&input, &output).expect("run");

        let preprocessing = report.preprocessing.as_ref().expect("preprocessing");
        assert_eq!(preprocessing.stats.succeeded, 3);
        assert_eq!(report.extraction.as_ref().map(|r| r.succeeded()), Some(3));
        let conversion = report.conversion.as_ref().expect("conversion");
        assert_eq!(conversion.succeeded(), 2);
        assert_eq!(conversion.failed_items().collect::<Vec<_>>(), vec!["sparse03"]);
        assert_eq!(report.templates.as_ref().map(|r| r.total()), Some(2));

        let overall = report.overall.expect("overall");
        assert_eq!(overall.input_images, 3);
        assert_eq!(overall.final_templates, 2);

        assert!(output.join(TEMPLATES_DIR).join("f01.png").is_file());
        assert!(output.join(TEMPLATES_DIR).join("f02.png").is_file());
        assert!(!output.join(TEMPLATES_DIR).join("sparse03.png").exists());
    }

    #[test]
    fn cancelled_run_dispatches_nothing() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let input = temp.path().join("raw");
        fs::create_dir_all(&input).expect("create input");
        fs::write(input.join("f01.png"), b"scan").expect("write scan");

        let cancel = CancelToken::new();
        cancel.cancel();
        let pipeline = Pipeline::new(small_config())
            .expect("pipeline")
            .with_detector(Box::new(FakeDetector))
            .with_cancel(cancel);

        let report = pipeline
            .run_minutiae_extraction_only(&input, temp.path())
            .expect("run");
        let extraction = report.extraction.expect("extraction");
        assert_eq!(extraction.succeeded(), 0);
        assert_eq!(extraction.cancelled, 1);
    }

    #[test]
    fn missing_input_dir_is_an_error() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let pipeline = Pipeline::new(small_config()).expect("pipeline");
        let err = pipeline
            .run_template_creation_only(&temp.path().join("absent"), temp.path())
            .unwrap_err();
        assert!(matches!(err, FpsynthError::MissingInput { .. }));
    }
}
