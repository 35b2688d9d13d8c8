//! Detector and scorer adapters driven by stand-in shell scripts.
//!
//! Everything runs in one test so no other test thread forks while a script
//! is still open for writing.
#![cfg(unix)]

mod common;

use std::fs;
use std::time::Duration;

use fpsynth::batch::BatchOptions;
use fpsynth::error::{FpsynthError, IssueCode};
use fpsynth::extract::{extract_minutiae_from_folder, FeatureDetector, Mindtct};
use fpsynth::preprocess::{filter_by_quality, Nfiq, PreprocessOptions, QualityScorer};

#[test]
fn tool_adapters_follow_the_output_contract() {
    let _ = env_logger::builder().is_test(true).try_init();
    let temp = tempfile::tempdir().expect("create temp dir");
    let bin = temp.path().join("bin");

    // Fake mindtct: writes <prefix>.min plus side files, complains on stderr.
    let mindtct = bin.join("mindtct");
    common::write_script(
        &mindtct,
        r#"[ "$1" = "-m1" ] || exit 2
case "$2" in *broken*) exit 1 ;; esac
printf 'Image (w,h) 32 32\n\n1 Minutiae Detected\n\n   0 :   10,  20 :  0 : 0.90 : BIF : 0,0\n' > "$3.min"
touch "$3.xyt" "$3.qm" "$3.brw"
echo "low contrast" >&2"#,
    );

    let nfiq = bin.join("nfiq");
    common::write_script(
        &nfiq,
        r#"case "$1" in *poor*) echo 5 ;; *) echo 2 ;; esac"#,
    );

    let sleeper = bin.join("sleeper");
    common::write_script(&sleeper, "exec sleep 30");

    let scans = temp.path().join("scans");
    common::write_bmp(&scans.join("good.bmp"), 32, 32);
    common::write_bmp(&scans.join("broken.bmp"), 32, 32);
    common::write_bmp(&scans.join("poor.bmp"), 32, 32);

    // Extraction keeps only the .min file by default.
    let detector = Mindtct {
        binary: mindtct.clone(),
        timeout: Duration::from_secs(20),
        keep_all_files: false,
    };
    let out = temp.path().join("minutiae");
    fs::create_dir_all(&out).expect("create output");
    let min_path = detector
        .detect(&scans.join("good.bmp"), &out.join("good"))
        .expect("detect");
    assert_eq!(min_path, out.join("good.min"));
    assert!(!out.join("good.xyt").exists());
    assert!(!out.join("good.qm").exists());

    // A tool run that leaves no .min behind is a per-item failure.
    let err = detector
        .detect(&scans.join("broken.bmp"), &out.join("broken"))
        .unwrap_err();
    assert!(matches!(err, FpsynthError::ExternalToolFailure { .. }));

    // Side files survive when asked for.
    let keeper = Mindtct {
        keep_all_files: true,
        ..detector.clone()
    };
    keeper
        .detect(&scans.join("good.bmp"), &out.join("kept"))
        .expect("detect");
    assert!(out.join("kept.xyt").is_file());

    let report = extract_minutiae_from_folder(
        &scans,
        &temp.path().join("batch"),
        &detector,
        &["bmp"],
        &BatchOptions::default(),
    )
    .expect("extract folder");
    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.failed_items().collect::<Vec<_>>(), vec!["broken"]);

    // A hung detector is killed at the deadline.
    let hung = Mindtct {
        binary: sleeper,
        timeout: Duration::from_millis(200),
        keep_all_files: false,
    };
    let err = hung
        .detect(&scans.join("good.bmp"), &out.join("hung"))
        .unwrap_err();
    assert!(matches!(err, FpsynthError::ExternalToolTimeout { .. }));
    assert_eq!(err.code(), IssueCode::ExternalToolFailure);

    // Quality admission.
    let scorer = Nfiq {
        binary: nfiq,
        timeout: Duration::from_secs(20),
    };
    assert_eq!(scorer.score(&scans.join("good.bmp")).expect("score"), 2);

    let processed = temp.path().join("processed");
    let report = filter_by_quality(
        &scans,
        &processed,
        Some(&scorer as &dyn QualityScorer),
        &PreprocessOptions::default(),
        &BatchOptions::sequential(),
    )
    .expect("preprocess");
    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.count_code(IssueCode::ThresholdRejected), 1);
    assert!(processed.join("good.bmp").is_file());
    assert!(!processed.join("poor.bmp").exists());
}
