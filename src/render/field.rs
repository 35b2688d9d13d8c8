//! Binary point and orientation rasters at the template resolution.
//!
//! Both passes take points in original-scan coordinates and map them to the
//! target grid with independent horizontal and vertical scale factors.

use image::{ImageBuffer, Luma};
use log::debug;

use crate::minutiae::{ImageSize, MinutiaPoint};

/// Value written for a hit in a binary field.
pub const FIELD_ON: f32 = 255.0;

/// Single-channel f32 image backing a [`DensityField`].
pub type FieldBuffer = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Single-channel f32 raster at template resolution.
#[derive(Clone, Debug, PartialEq)]
pub struct DensityField(FieldBuffer);

impl DensityField {
    /// Zero-initialized field of the given size.
    pub fn new(w: usize, h: usize) -> Self {
        Self(ImageBuffer::new(w as u32, h as u32))
    }

    pub fn with_size(size: ImageSize) -> Self {
        Self(ImageBuffer::new(size.width, size.height))
    }

    pub fn width(&self) -> usize {
        self.0.width() as usize
    }

    pub fn height(&self) -> usize {
        self.0.height() as usize
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.0.get_pixel(x as u32, y as u32)[0]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, v: f32) {
        self.0.put_pixel(x as u32, y as u32, Luma([v]));
    }

    /// Row-major samples, `width * height` long.
    pub fn values(&self) -> &[f32] {
        self.0.as_raw()
    }

    pub fn as_image(&self) -> &FieldBuffer {
        &self.0
    }

    /// Number of non-zero samples.
    pub fn count_nonzero(&self) -> usize {
        self.values().iter().filter(|&&v| v != 0.0).count()
    }

    pub fn max_value(&self) -> f32 {
        self.values().iter().copied().fold(0.0, f32::max)
    }
}

impl From<FieldBuffer> for DensityField {
    fn from(image: FieldBuffer) -> Self {
        Self(image)
    }
}

/// Mapping from original-scan coordinates to target pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Scaling {
    pub scale_x: f64,
    pub scale_y: f64,
    pub target: ImageSize,
}

impl Scaling {
    /// Both sizes must be non-empty.
    pub fn new(original: ImageSize, target: ImageSize) -> Self {
        Self {
            scale_x: f64::from(target.width) / f64::from(original.width),
            scale_y: f64::from(target.height) / f64::from(original.height),
            target,
        }
    }

    /// Rounded target position, not clipped.
    pub fn to_target(&self, x: i32, y: i32) -> (i64, i64) {
        (
            (f64::from(x) * self.scale_x).round() as i64,
            (f64::from(y) * self.scale_y).round() as i64,
        )
    }

    /// Rounded target position clipped into the target grid.
    pub fn to_target_clipped(&self, x: i32, y: i32) -> (usize, usize) {
        let (tx, ty) = self.to_target(x, y);
        let max_x = i64::from(self.target.width) - 1;
        let max_y = i64::from(self.target.height) - 1;
        (tx.clamp(0, max_x) as usize, ty.clamp(0, max_y) as usize)
    }

    fn contains(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && x < i64::from(self.target.width) && y < i64::from(self.target.height)
    }
}

/// Mark each point's scaled position with [`FIELD_ON`].
///
/// Points outside the target are clipped onto the border. Several points on
/// one pixel do not accumulate.
pub fn position_field(points: &[MinutiaPoint], scaling: &Scaling) -> DensityField {
    let mut field = DensityField::with_size(scaling.target);
    for point in points {
        let (x, y) = scaling.to_target_clipped(point.x(), point.y());
        field.set(x, y, FIELD_ON);
    }
    field
}

/// Draw a segment from each point along its orientation.
///
/// The segment length is `line_length` scaled horizontally. Rows grow
/// downward while angles grow counter-clockwise, so the vertical component
/// is negated. Samples outside the target are dropped.
pub fn orientation_field(
    points: &[MinutiaPoint],
    scaling: &Scaling,
    line_length: u32,
) -> DensityField {
    let mut field = DensityField::with_size(scaling.target);
    let length = (f64::from(line_length) * scaling.scale_x).trunc();

    for point in points {
        let (x0, y0) = scaling.to_target(point.x(), point.y());
        let theta = point.orientation();
        let x1 = x0 as f64 + length * theta.cos();
        let y1 = y0 as f64 - length * theta.sin();

        if !x1.is_finite() || !y1.is_finite() {
            debug!(
                "Skipping orientation line for point at ({}, {}): degenerate geometry",
                point.x(),
                point.y()
            );
            continue;
        }

        for (x, y) in line_pixels((x0, y0), (x1.round() as i64, y1.round() as i64)) {
            if scaling.contains(x, y) {
                field.set(x as usize, y as usize, FIELD_ON);
            }
        }
    }

    field
}

/// Pixels on the segment from `start` to `end`, both endpoints included.
///
/// Samples `max(|dx|, |dy|) + 1` evenly spaced points and rounds each, so the
/// result is 8-connected.
pub fn line_pixels(start: (i64, i64), end: (i64, i64)) -> impl Iterator<Item = (i64, i64)> {
    let dx = end.0 - start.0;
    let dy = end.1 - start.1;
    let steps = dx.abs().max(dy.abs());

    (0..=steps).map(move |i| {
        if steps == 0 {
            return start;
        }
        let t = i as f64 / steps as f64;
        (
            start.0 + (t * dx as f64).round() as i64,
            start.1 + (t * dy as f64).round() as i64,
        )
    })
}
