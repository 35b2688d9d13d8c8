#![allow(dead_code)]

use fpsynth::minutiae::{ImageSize, MinutiaKind, MinutiaPoint};
use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

/// Orientation tolerance after a degrees -> radians -> degrees trip.
pub const EPS_DEGREES: f64 = 1e-9;

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// Fewer cases for properties that touch the filesystem.
pub fn proptest_config_io() -> ProptestConfig {
    let mut config = proptest_config();
    config.cases = config.cases.min(16);
    config
}

pub fn arb_kind() -> BoxedStrategy<MinutiaKind> {
    prop_oneof![
        Just(MinutiaKind::Bifurcation),
        Just(MinutiaKind::Termination),
        Just(MinutiaKind::Core),
        Just(MinutiaKind::Delta),
    ]
    .boxed()
}

pub fn arb_point() -> BoxedStrategy<MinutiaPoint> {
    (arb_kind(), -4096i32..=4096, -4096i32..=4096, 0.0f64..360.0)
        .prop_map(|(kind, x, y, degrees)| MinutiaPoint::from_degrees(kind, x, y, degrees))
        .boxed()
}

pub fn arb_points(max: usize) -> BoxedStrategy<Vec<MinutiaPoint>> {
    proptest::collection::vec(arb_point(), 0..=max).boxed()
}

pub fn arb_size(max_side: u32) -> BoxedStrategy<ImageSize> {
    (1u32..=max_side, 1u32..=max_side)
        .prop_map(|(height, width)| ImageSize::new(height, width))
        .boxed()
}

/// A size and a point inside it.
pub fn arb_sized_point(max_side: u32) -> BoxedStrategy<(ImageSize, i32, i32)> {
    arb_size(max_side)
        .prop_flat_map(|size| {
            (
                Just(size),
                0..size.width as i32,
                0..size.height as i32,
            )
        })
        .boxed()
}
