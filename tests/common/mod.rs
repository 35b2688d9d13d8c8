#![allow(dead_code)]

use std::fs;
use std::path::Path;

/// Header mindtct writes before the records; the readers skip three lines.
pub const MIN_HEADER: &str = "Image (w,h) 256 256\n\n2 Minutiae Detected\n\n";

pub fn bmp_bytes(width: u32, height: u32) -> Vec<u8> {
    let row_stride = (width * 3).div_ceil(4) * 4;
    let pixel_array_size = row_stride * height;
    let file_size = 54 + pixel_array_size;

    let mut bytes = Vec::with_capacity(file_size as usize);
    bytes.extend_from_slice(b"BM");
    bytes.extend_from_slice(&file_size.to_le_bytes());
    bytes.extend_from_slice(&[0, 0, 0, 0]);
    bytes.extend_from_slice(&54u32.to_le_bytes());

    bytes.extend_from_slice(&40u32.to_le_bytes());
    bytes.extend_from_slice(&(width as i32).to_le_bytes());
    bytes.extend_from_slice(&(height as i32).to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&24u16.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&pixel_array_size.to_le_bytes());
    bytes.extend_from_slice(&2835u32.to_le_bytes());
    bytes.extend_from_slice(&2835u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());

    bytes.resize(file_size as usize, 0);
    bytes
}

/// Write a blank 24-bit BMP scan of the given size.
pub fn write_bmp(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, bmp_bytes(width, height)).expect("write bmp file");
}

/// One mindtct-style record with NBIS padding.
pub fn min_record(id: usize, x: i32, y: i32, direction: i64, quality: f64, kind: &str) -> String {
    format!("{id:4} : {x:4},{y:4} : {direction:2} : {quality:.2} : {kind} : 0,0\n")
}

/// Write a `.min` file with the standard header followed by `records`.
pub fn write_min_file(path: &Path, records: &[String]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    let mut content = String::from(MIN_HEADER);
    for record in records {
        content.push_str(record);
    }
    fs::write(path, content).expect("write min file");
}

/// `count` bifurcations spread along one row.
pub fn bifurcation_records(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| min_record(i, 20 + 12 * i as i32, 64, 0, 0.75, "BIF"))
        .collect()
}

/// Write an executable shell script.
#[cfg(unix)]
pub fn write_script(path: &Path, body: &str) {
    use std::os::unix::fs::PermissionsExt;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, format!("#!/bin/sh\n{body}\n")).expect("write script");
    let mut permissions = fs::metadata(path).expect("script metadata").permissions();
    permissions.set_mode(0o755);
    fs::set_permissions(path, permissions).expect("make script executable");
}
