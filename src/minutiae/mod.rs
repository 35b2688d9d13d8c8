//! Minutiae model and file formats.
//!
//! Two on-disk formats flow through the pipeline:
//!
//! - [`io_min`]: raw `.min` detector output (read only).
//! - [`io_txt`]: the canonical `type x y orientation_degrees` text records,
//!   written by the conversion stage and read by rendering.
//!
//! # Example
//!
//! ```
//! use fpsynth::minutiae::{ImageSize, MinutiaKind, MinutiaPoint, MinutiaeRecord};
//!
//! let record = MinutiaeRecord::new(
//!     vec![MinutiaPoint::from_degrees(MinutiaKind::Bifurcation, 10, 20, 90.0)],
//!     ImageSize::square(256),
//! );
//! assert_eq!(record.of_kinds(&[MinutiaKind::Bifurcation]).len(), 1);
//! ```

pub mod io_min;
pub mod io_txt;
mod model;

pub use io_min::{convert_min_to_txt, direction_to_degrees, ConvertedRecord};
pub use io_txt::{parse_minutiae_file, write_minutiae_txt};
pub use model::{ImageSize, MinutiaKind, MinutiaPoint, MinutiaeRecord, MinutiaeTable};
