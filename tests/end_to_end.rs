mod common;

use std::fs;

use fpsynth::batch::BatchOptions;
use fpsynth::minutiae::{convert_min_to_txt, parse_minutiae_file, ImageSize, MinutiaKind};
use fpsynth::render::{
    create_template_from_file, create_templates_from_folder, OriginalSize, RenderOptions,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn two_record_scan_renders_into_separate_channels() {
    init_logging();
    let temp = tempfile::tempdir().expect("create temp dir");
    let min_path = temp.path().join("min").join("scan_01.min");
    common::write_min_file(
        &min_path,
        &[
            "id:10,20:0:TYP_BIF:0.9\n".to_string(),
            "id:30,40:8:TYP_OTH:0.9\n".to_string(),
        ],
    );

    let txt_dir = temp.path().join("txt");
    let converted = convert_min_to_txt(&min_path, &txt_dir, 0.0).expect("convert");
    assert_eq!(converted.count, 2);
    assert_eq!(converted.path, txt_dir.join("scan_01.txt"));
    assert_eq!(
        fs::read_to_string(&converted.path).expect("read txt"),
        "1 10 20 90.0\n2 30 40 0.0\n"
    );

    let table = parse_minutiae_file(&converted.path);
    assert_eq!(table.shape(), (2, 4));
    assert_eq!(table.points()[0].kind(), MinutiaKind::Bifurcation);
    assert!((table.points()[0].orientation() - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
    assert_eq!(table.points()[1].kind(), MinutiaKind::Termination);

    let opts = RenderOptions {
        target_size: ImageSize::square(256),
        ..Default::default()
    };
    let template =
        create_template_from_file(&converted.path, &OriginalSize::SameAsTarget, &opts)
            .expect("render");
    assert_eq!(template.dimensions(), (256, 256));

    assert!(template.get_pixel(10, 20)[0] > 200);
    assert!(template.get_pixel(30, 40)[1] > 200);
    assert_eq!(template.get_pixel(30, 40)[0], 0);
    assert_eq!(template.get_pixel(10, 20)[1], 0);
    assert!(template.pixels().all(|p| p[2] == 0));
}

#[test]
fn original_scan_size_rescales_points() {
    init_logging();
    let temp = tempfile::tempdir().expect("create temp dir");
    let scans = temp.path().join("scans");
    common::write_bmp(&scans.join("wide.bmp"), 512, 256);

    let txt = temp.path().join("txt").join("wide.txt");
    fs::create_dir_all(txt.parent().expect("parent")).expect("create txt dir");
    fs::write(&txt, "1 200 100 0.0\n").expect("write txt");

    let opts = RenderOptions {
        target_size: ImageSize::square(128),
        ..Default::default()
    };
    let original = OriginalSize::FromScans {
        dir: scans,
        extensions: vec!["bmp".to_string()],
    };
    let template = create_template_from_file(&txt, &original, &opts).expect("render");

    // x: 200 * 128/512 = 50, y: 100 * 128/256 = 50
    assert_eq!(template.get_pixel(50, 50)[0], 255);
    assert_eq!(template.get_pixel(127, 100)[0], 0);
}

#[test]
fn folder_render_skips_unusable_records() {
    init_logging();
    let temp = tempfile::tempdir().expect("create temp dir");
    let txt_dir = temp.path().join("txt");
    fs::create_dir_all(&txt_dir).expect("create txt dir");
    fs::write(txt_dir.join("good.txt"), "1 40 40 45.0\n2 80 80 180.0\n").expect("write");
    fs::write(txt_dir.join("empty.txt"), "").expect("write");
    fs::write(txt_dir.join("garbled.txt"), "1 40 forty 45.0\n").expect("write");

    let templates = temp.path().join("templates");
    let report = create_templates_from_folder(
        &txt_dir,
        &templates,
        &OriginalSize::SameAsTarget,
        &RenderOptions {
            target_size: ImageSize::square(128),
            ..Default::default()
        },
        &BatchOptions::default(),
    )
    .expect("render folder");

    assert_eq!(report.succeeded(), 1);
    assert_eq!(report.total(), 3);
    let mut failed: Vec<&str> = report.failed_items().collect();
    failed.sort_unstable();
    assert_eq!(failed, vec!["empty", "garbled"]);

    assert!(templates.join("good.png").is_file());
    assert!(!templates.join("empty.png").exists());

    let written = image::open(templates.join("good.png"))
        .expect("decode template")
        .to_rgb8();
    assert_eq!(written.dimensions(), (128, 128));
    assert!(written.get_pixel(40, 40)[0] > 200);
}
