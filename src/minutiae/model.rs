//! Core minutiae model.
//!
//! Points carry their position in the coordinate space of the scan they were
//! detected on. Nothing here knows about render targets; scaling happens in
//! [`crate::render`].

use serde::Serialize;
use std::f64::consts::PI;

/// The kind of a fingerprint feature point.
///
/// Decided once when a record is parsed and never re-derived downstream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MinutiaKind {
    /// A ridge splitting in two.
    Bifurcation,
    /// A ridge ending.
    Termination,
    /// Singular point: core.
    Core,
    /// Singular point: delta.
    Delta,
}

impl MinutiaKind {
    /// Numeric code used by the canonical text format.
    pub fn code(self) -> u8 {
        match self {
            MinutiaKind::Bifurcation => 1,
            MinutiaKind::Termination => 2,
            MinutiaKind::Core => 4,
            MinutiaKind::Delta => 5,
        }
    }

    /// Inverse of [`MinutiaKind::code`].
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(MinutiaKind::Bifurcation),
            2 => Some(MinutiaKind::Termination),
            4 => Some(MinutiaKind::Core),
            5 => Some(MinutiaKind::Delta),
            _ => None,
        }
    }

    /// Classify a detector type field. Anything without the bifurcation
    /// marker is a termination.
    pub fn from_type_field(raw: &str) -> Self {
        if raw.contains("BIF") {
            MinutiaKind::Bifurcation
        } else {
            MinutiaKind::Termination
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            MinutiaKind::Bifurcation => "bifurcation",
            MinutiaKind::Termination => "termination",
            MinutiaKind::Core => "core",
            MinutiaKind::Delta => "delta",
        }
    }
}

/// One oriented feature point.
///
/// `orientation` is in radians, counter-clockwise from the positive x axis
/// with y pointing up.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct MinutiaPoint {
    kind: MinutiaKind,
    x: i32,
    y: i32,
    orientation: f64,
}

impl MinutiaPoint {
    pub fn new(kind: MinutiaKind, x: i32, y: i32, orientation: f64) -> Self {
        Self {
            kind,
            x,
            y,
            orientation,
        }
    }

    /// Build a point from an orientation expressed in degrees.
    pub fn from_degrees(kind: MinutiaKind, x: i32, y: i32, degrees: f64) -> Self {
        Self::new(kind, x, y, degrees * PI / 180.0)
    }

    #[inline]
    pub fn kind(&self) -> MinutiaKind {
        self.kind
    }

    #[inline]
    pub fn x(&self) -> i32 {
        self.x
    }

    #[inline]
    pub fn y(&self) -> i32 {
        self.y
    }

    /// Orientation in radians.
    #[inline]
    pub fn orientation(&self) -> f64 {
        self.orientation
    }

    pub fn orientation_degrees(&self) -> f64 {
        self.orientation * 180.0 / PI
    }

    /// The `[type, x, y, orientation]` row view of this point.
    pub fn as_row(&self) -> [f64; 4] {
        [
            f64::from(self.kind.code()),
            f64::from(self.x),
            f64::from(self.y),
            self.orientation,
        ]
    }
}

/// Image dimensions as `(height, width)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, serde::Deserialize)]
pub struct ImageSize {
    pub height: u32,
    pub width: u32,
}

impl ImageSize {
    pub fn new(height: u32, width: u32) -> Self {
        Self { height, width }
    }

    pub fn square(side: u32) -> Self {
        Self::new(side, side)
    }

    pub fn is_empty(&self) -> bool {
        self.height == 0 || self.width == 0
    }
}

impl std::fmt::Display for ImageSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Minutiae loaded from one canonical file, shaped as an `(N, 4)` table.
///
/// An empty table means "no usable minutiae"; readers return it instead of
/// an error.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MinutiaeTable {
    points: Vec<MinutiaPoint>,
}

impl MinutiaeTable {
    pub fn new(points: Vec<MinutiaPoint>) -> Self {
        Self { points }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// `(rows, columns)`; columns is always 4, even for zero or one row.
    pub fn shape(&self) -> (usize, usize) {
        (self.points.len(), 4)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[MinutiaPoint] {
        &self.points
    }

    pub fn rows(&self) -> impl Iterator<Item = [f64; 4]> + '_ {
        self.points.iter().map(MinutiaPoint::as_row)
    }

    /// Attach the dimensions of the scan the points were detected on.
    pub fn into_record(self, original_size: ImageSize) -> MinutiaeRecord {
        MinutiaeRecord::new(self.points, original_size)
    }
}

/// All minutiae of one scan plus that scan's original size.
#[derive(Clone, Debug, PartialEq)]
pub struct MinutiaeRecord {
    points: Vec<MinutiaPoint>,
    original_size: ImageSize,
}

impl MinutiaeRecord {
    pub fn new(points: Vec<MinutiaPoint>, original_size: ImageSize) -> Self {
        Self {
            points,
            original_size,
        }
    }

    pub fn points(&self) -> &[MinutiaPoint] {
        &self.points
    }

    pub fn original_size(&self) -> ImageSize {
        self.original_size
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Points whose kind is in `kinds`, in record order.
    pub fn of_kinds(&self, kinds: &[MinutiaKind]) -> Vec<MinutiaPoint> {
        self.points
            .iter()
            .filter(|p| kinds.contains(&p.kind()))
            .copied()
            .collect()
    }
}
