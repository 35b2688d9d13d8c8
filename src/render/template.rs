//! Template composition.
//!
//! A template is an RGB raster where each channel holds the diffused point
//! and orientation fields of one group of minutia kinds. Raw point and line
//! hits are one pixel wide; Gaussian diffusion turns them into smooth peaked
//! surfaces, and the separate sigma/gain pairs let point density and
//! orientation be tuned independently inside a channel.

use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::blur::gaussian_blur;
use super::field::{orientation_field, position_field, DensityField, Scaling};
use crate::batch::{run_batch, BatchOptions, StageReport};
use crate::discover::{collect_files_with_extensions, find_by_stem, output_path_for, stem_string};
use crate::error::FpsynthError;
use crate::minutiae::io_txt::TXT_EXTENSION;
use crate::minutiae::{parse_minutiae_file, ImageSize, MinutiaKind, MinutiaeRecord};

/// Rendered template: three independent 8-bit channels.
pub type TemplateImage = RgbImage;

pub const TEMPLATE_EXTENSION: &str = "png";

/// Number of channels in a template.
pub const CHANNELS: usize = 3;

/// Which minutia kinds feed each template channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelLayout {
    /// Bifurcations, terminations, empty.
    #[default]
    Minutiae,
    /// Bifurcations, terminations, cores and deltas.
    WithSingular,
}

impl ChannelLayout {
    /// Kinds per channel; an empty slice is an all-zero channel.
    pub fn channels(&self) -> [&'static [MinutiaKind]; CHANNELS] {
        match self {
            ChannelLayout::Minutiae => [
                &[MinutiaKind::Bifurcation],
                &[MinutiaKind::Termination],
                &[],
            ],
            ChannelLayout::WithSingular => [
                &[MinutiaKind::Bifurcation],
                &[MinutiaKind::Termination],
                &[MinutiaKind::Core, MinutiaKind::Delta],
            ],
        }
    }
}

/// Rendering parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RenderOptions {
    pub target_size: ImageSize,
    /// Orientation segment length in original-scan pixels.
    pub orientation_line_length: u32,
    pub point_sigma: f64,
    pub orientation_sigma: f64,
    pub point_gain: f32,
    pub orientation_gain: f32,
    pub layout: ChannelLayout,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            target_size: ImageSize::square(512),
            orientation_line_length: 15,
            point_sigma: 3.0,
            orientation_sigma: 3f64.sqrt(),
            point_gain: 60.0,
            orientation_gain: 3.0,
            layout: ChannelLayout::Minutiae,
        }
    }
}

impl RenderOptions {
    pub fn validate(&self) -> Result<(), FpsynthError> {
        if self.target_size.is_empty() {
            return Err(FpsynthError::InvalidConfig(format!(
                "template size must be non-empty, got {}",
                self.target_size
            )));
        }
        for (name, sigma) in [
            ("point_sigma", self.point_sigma),
            ("orientation_sigma", self.orientation_sigma),
        ] {
            if !(sigma.is_finite() && sigma >= 0.0) {
                return Err(FpsynthError::InvalidConfig(format!(
                    "{name} must be a non-negative number, got {sigma}"
                )));
            }
        }
        for (name, gain) in [
            ("point_gain", self.point_gain),
            ("orientation_gain", self.orientation_gain),
        ] {
            if !(gain.is_finite() && gain >= 0.0) {
                return Err(FpsynthError::InvalidConfig(format!(
                    "{name} must be a non-negative number, got {gain}"
                )));
            }
        }
        Ok(())
    }
}

/// Where the original scan dimensions of a record come from.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum OriginalSize {
    /// Points are already in template coordinates.
    #[default]
    SameAsTarget,
    /// Every record comes from scans of this size.
    Fixed(ImageSize),
    /// Read the size of the scan with the same stem in `dir`.
    FromScans {
        dir: PathBuf,
        extensions: Vec<String>,
    },
}

impl OriginalSize {
    /// Resolve the original size for the record named `stem`.
    ///
    /// A scan that cannot be found or measured falls back to `target`.
    pub fn resolve(&self, stem: &str, target: ImageSize) -> ImageSize {
        match self {
            OriginalSize::SameAsTarget => target,
            OriginalSize::Fixed(size) => *size,
            OriginalSize::FromScans { dir, extensions } => {
                let measured = find_by_stem(dir, stem, extensions)
                    .and_then(|scan| imagesize::size(&scan).ok())
                    .and_then(|size| {
                        Some(ImageSize::new(
                            u32::try_from(size.height).ok()?,
                            u32::try_from(size.width).ok()?,
                        ))
                    })
                    .filter(|size| !size.is_empty());

                measured.unwrap_or_else(|| {
                    warn!(
                        "No readable scan for '{stem}' in {}; assuming {target}",
                        dir.display()
                    );
                    target
                })
            }
        }
    }
}

/// Render one channel from the points whose kind is in `kinds`.
///
/// Returns `None` when the channel has no points.
pub fn render_channel(
    record: &MinutiaeRecord,
    kinds: &[MinutiaKind],
    opts: &RenderOptions,
) -> Option<Vec<u8>> {
    let points = record.of_kinds(kinds);
    if points.is_empty() {
        return None;
    }

    let scaling = Scaling::new(record.original_size(), opts.target_size);
    let points_field = gaussian_blur(&position_field(&points, &scaling), opts.point_sigma);
    let lines_field = gaussian_blur(
        &orientation_field(&points, &scaling, opts.orientation_line_length),
        opts.orientation_sigma,
    );

    Some(compose(&points_field, opts.point_gain, &lines_field, opts.orientation_gain))
}

fn compose(points: &DensityField, point_gain: f32, lines: &DensityField, line_gain: f32) -> Vec<u8> {
    points
        .values()
        .iter()
        .zip(lines.values())
        .map(|(&p, &l)| (p * point_gain + l * line_gain).clamp(0.0, 255.0) as u8)
        .collect()
}

/// Render a template from a record.
///
/// An empty record is a failure, never an all-zero image.
pub fn create_template_image(
    record: &MinutiaeRecord,
    opts: &RenderOptions,
) -> Result<TemplateImage, FpsynthError> {
    opts.validate()?;
    if record.is_empty() {
        return Err(FpsynthError::EmptyRecord);
    }
    if record.original_size().is_empty() {
        return Err(FpsynthError::InvalidConfig(format!(
            "original scan size must be non-empty, got {}",
            record.original_size()
        )));
    }

    let width = opts.target_size.width;
    let height = opts.target_size.height;
    let pixel_count = width as usize * height as usize;

    let channels: Vec<Vec<u8>> = opts
        .layout
        .channels()
        .iter()
        .map(|kinds| {
            render_channel(record, kinds, opts).unwrap_or_else(|| vec![0; pixel_count])
        })
        .collect();

    let mut image = RgbImage::new(width, height);
    for (i, pixel) in image.pixels_mut().enumerate() {
        *pixel = Rgb([channels[0][i], channels[1][i], channels[2][i]]);
    }
    Ok(image)
}

/// Load a canonical minutiae file and render it.
pub fn create_template_from_file(
    minutiae_file: &Path,
    original: &OriginalSize,
    opts: &RenderOptions,
) -> Result<TemplateImage, FpsynthError> {
    if !minutiae_file.is_file() {
        return Err(FpsynthError::MissingInput {
            path: minutiae_file.to_path_buf(),
        });
    }

    let table = parse_minutiae_file(minutiae_file);
    if table.is_empty() {
        return Err(FpsynthError::EmptyResult {
            path: minutiae_file.to_path_buf(),
        });
    }

    let original_size = original.resolve(&stem_string(minutiae_file), opts.target_size);
    create_template_image(&table.into_record(original_size), opts)
}

/// Save a template as PNG, creating parent directories.
pub fn save_template(image: &TemplateImage, path: &Path) -> Result<(), FpsynthError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| FpsynthError::OutputIo {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    image.save(path).map_err(|source| FpsynthError::ImageWrite {
        path: path.to_path_buf(),
        source,
    })
}

/// Render every canonical `.txt` file under `minutiae_dir` into
/// `<output_dir>/<stem>.png`.
pub fn create_templates_from_folder(
    minutiae_dir: &Path,
    output_dir: &Path,
    original: &OriginalSize,
    opts: &RenderOptions,
    batch: &BatchOptions,
) -> Result<StageReport, FpsynthError> {
    opts.validate()?;
    let files = collect_files_with_extensions(minutiae_dir, &[TXT_EXTENSION])?;
    std::fs::create_dir_all(output_dir).map_err(|source| FpsynthError::OutputIo {
        path: output_dir.to_path_buf(),
        source,
    })?;

    Ok(run_batch("render", &files, batch, |minutiae_file| {
        let image = create_template_from_file(minutiae_file, original, opts)?;
        let output_path = output_path_for(minutiae_file, output_dir, TEMPLATE_EXTENSION);
        save_template(&image, &output_path)?;
        debug!("Created template: {}", output_path.display());
        Ok(())
    }))
}
