//! Dense template rendering.
//!
//! A minutiae record becomes a three-channel image in three steps:
//!
//! 1. [`field`] rasterizes point positions and orientation segments into
//!    binary fields at the template resolution.
//! 2. [`blur`] diffuses each field with a Gaussian.
//! 3. [`template`] mixes the two diffused fields per channel with separate
//!    gains and clips the result to 8 bits.

pub mod blur;
pub mod field;
pub mod template;

pub use blur::gaussian_blur;
pub use field::{orientation_field, position_field, DensityField, Scaling};
pub use template::{
    create_template_from_file, create_template_image, create_templates_from_folder,
    save_template, ChannelLayout, OriginalSize, RenderOptions, TemplateImage,
};
