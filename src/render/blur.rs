//! Separable Gaussian diffusion for density fields.
//!
//! The kernel is truncated at four standard deviations and normalized to
//! unit sum, then applied with `imageproc`'s separable filter. Samples past
//! the border take the value of the nearest edge pixel.

use imageproc::filter::separable_filter_equal;

use super::field::DensityField;

/// Standard deviations covered on each side of the kernel centre.
pub const TRUNCATE: f64 = 4.0;

/// Normalized 1D Gaussian taps, `2 * radius + 1` long.
///
/// Returns the identity kernel `[1.0]` for a non-positive or non-finite
/// sigma.
pub fn gaussian_kernel(sigma: f64) -> Vec<f32> {
    if !(sigma.is_finite() && sigma > 0.0) {
        return vec![1.0];
    }

    let radius = (TRUNCATE * sigma + 0.5) as usize;
    let denom = 2.0 * sigma * sigma;
    let weights: Vec<f64> = (0..=2 * radius)
        .map(|i| {
            let d = i as f64 - radius as f64;
            (-(d * d) / denom).exp()
        })
        .collect();
    let sum: f64 = weights.iter().sum();

    weights.into_iter().map(|w| (w / sum) as f32).collect()
}

/// Blur `field` with a Gaussian of standard deviation `sigma`.
pub fn gaussian_blur(field: &DensityField, sigma: f64) -> DensityField {
    let taps = gaussian_kernel(sigma);
    if taps.len() == 1 || field.values().is_empty() {
        return field.clone();
    }

    DensityField::from(separable_filter_equal(field.as_image(), &taps))
}
