//! Batch input discovery and output naming.
//!
//! Every stage finds its inputs by walking a directory tree for a fixed
//! extension set, and names its outputs after the input stem.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::FpsynthError;

/// Recursively collect files under `root` whose extension is in `extensions`
/// (case-insensitive, without the leading dot).
///
/// Results are sorted by path so batch reports are deterministic.
pub fn collect_files_with_extensions<S: AsRef<str>>(
    root: &Path,
    extensions: &[S],
) -> Result<Vec<PathBuf>, FpsynthError> {
    if !root.is_dir() {
        return Err(FpsynthError::MissingInput {
            path: root.to_path_buf(),
        });
    }

    let mut files = Vec::new();

    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry.map_err(std::io::Error::from)?;

        if entry.file_type().is_file() && has_extension(entry.path(), extensions) {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort();
    Ok(files)
}

pub fn has_extension<S: AsRef<str>>(path: &Path, allowed: &[S]) -> bool {
    let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
        return false;
    };

    allowed
        .iter()
        .map(|allowed_ext| allowed_ext.as_ref().trim_start_matches('.'))
        .any(|allowed_ext| ext.eq_ignore_ascii_case(allowed_ext))
}

/// File stem as a lossy string, used to key items across stages.
pub fn stem_string(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `<output_dir>/<stem of input>.<extension>`.
pub fn output_path_for(input: &Path, output_dir: &Path, extension: &str) -> PathBuf {
    output_dir.join(format!("{}.{}", stem_string(input), extension))
}

/// Find a file named `<stem>.<ext>` directly under `dir` for the first
/// matching extension.
pub fn find_by_stem<S: AsRef<str>>(dir: &Path, stem: &str, extensions: &[S]) -> Option<PathBuf> {
    for ext in extensions {
        let ext = ext.as_ref().trim_start_matches('.');
        for candidate_ext in [ext.to_string(), ext.to_ascii_uppercase()] {
            let candidate = dir.join(format!("{stem}.{candidate_ext}"));
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }
    None
}
