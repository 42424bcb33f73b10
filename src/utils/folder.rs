//! Batch input folder scanning and collision-free output saving.

use crate::job::ReferenceImage;
use crate::{Error, ErrorContext, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const DEFAULT_FILE_PATTERN: &str = "*.png,*.jpg,*.jpeg";

#[derive(Debug, Clone)]
pub struct FolderImage {
    pub file_name: String,
    pub image: ReferenceImage,
}

fn build_globs(patterns: &str) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    let mut any = false;
    for pattern in patterns.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let glob = Glob::new(pattern).map_err(|e| {
            Error::validation_with_context(
                format!("invalid file pattern: {e}"),
                ErrorContext::new()
                    .with_field_path("file_pattern")
                    .with_details(pattern.to_string())
                    .with_source("folder_input"),
            )
        })?;
        builder.add(glob);
        any = true;
    }
    if !any {
        builder.add(Glob::new("*").map_err(|e| {
            Error::validation_with_context(e.to_string(), ErrorContext::new().with_source("folder_input"))
        })?);
    }
    builder.build().map_err(|e| {
        Error::validation_with_context(
            e.to_string(),
            ErrorContext::new()
                .with_field_path("file_pattern")
                .with_source("folder_input"),
        )
    })
}

/// Load every file in `folder` (not recursive) whose name matches one of the
/// comma-separated glob `patterns`, sorted by name.
///
/// Files that cannot be read or are not PNG/JPEG/WebP are logged and skipped.
pub fn load_folder_images(folder: impl AsRef<Path>, patterns: &str) -> Result<Vec<FolderImage>> {
    let folder = folder.as_ref();
    if !folder.is_dir() {
        return Err(Error::validation_with_context(
            "input folder does not exist or is not a directory",
            ErrorContext::new()
                .with_field_path("folder_path")
                .with_details(folder.display().to_string())
                .with_source("folder_input"),
        ));
    }
    let globs = build_globs(patterns)?;

    let mut names: Vec<String> = std::fs::read_dir(folder)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| globs.is_match(name))
        .collect();
    names.sort();
    names.dedup();

    let mut images = Vec::with_capacity(names.len());
    let mut skipped = Vec::new();
    for name in names {
        let path = folder.join(&name);
        match std::fs::read(&path)
            .map_err(Error::from)
            .and_then(ReferenceImage::from_bytes)
        {
            Ok(image) => {
                debug!(file = name.as_str(), "loaded input image");
                images.push(FolderImage {
                    file_name: name,
                    image,
                });
            }
            Err(e) => {
                warn!(file = name.as_str(), error = %e, "skipping unreadable input image");
                skipped.push(name);
            }
        }
    }
    info!(
        folder = %folder.display(),
        loaded = images.len(),
        skipped = skipped.len(),
        "scanned input folder"
    );
    Ok(images)
}

/// Write `data` to `folder/file_name`, appending `_1`, `_2`, ... to the stem
/// when the name is taken. Creates the folder if needed.
pub fn save_unique(folder: impl AsRef<Path>, file_name: &str, data: &[u8]) -> Result<PathBuf> {
    let folder = folder.as_ref();
    std::fs::create_dir_all(folder)?;

    let candidate = Path::new(file_name);
    let stem = candidate
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string());
    let ext = candidate
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut path = folder.join(file_name);
    let mut counter = 1u32;
    while path.exists() {
        path = folder.join(format!("{stem}_{counter}{ext}"));
        counter += 1;
    }
    std::fs::write(&path, data)?;
    debug!(path = %path.display(), "saved output image");
    Ok(path)
}
