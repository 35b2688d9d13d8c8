//! Pipeline report types.

use serde::Serialize;
use std::fmt;

use crate::batch::{ratio, StageReport};

/// End-to-end yield of a full run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct OverallStats {
    pub input_images: usize,
    pub final_templates: usize,
    /// `final_templates / input_images`, zero for an empty input.
    pub rate: f64,
}

impl OverallStats {
    pub fn new(input_images: usize, final_templates: usize) -> Self {
        Self {
            input_images,
            final_templates,
            rate: ratio(final_templates, input_images),
        }
    }
}

/// Stage reports of one orchestrated run. Stages that did not run are
/// `None`.
#[derive(Clone, Debug, Default, Serialize)]
pub struct PipelineReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preprocessing: Option<StageReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction: Option<StageReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversion: Option<StageReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub templates: Option<StageReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall: Option<OverallStats>,
}

impl PipelineReport {
    /// Stages that ran, in pipeline order.
    pub fn stages(&self) -> impl Iterator<Item = &StageReport> {
        [
            &self.preprocessing,
            &self.extraction,
            &self.conversion,
            &self.templates,
        ]
        .into_iter()
        .flatten()
    }

    pub fn failure_count(&self) -> usize {
        self.stages().map(|stage| stage.failures.len()).sum()
    }
}

impl fmt::Display for PipelineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for stage in self.stages() {
            write!(f, "{stage}")?;
        }

        if let Some(overall) = &self.overall {
            writeln!(
                f,
                "overall: {}/{} images -> templates ({:.1}%)",
                overall.final_templates,
                overall.input_images,
                overall.rate * 100.0
            )?;
        }

        Ok(())
    }
}
