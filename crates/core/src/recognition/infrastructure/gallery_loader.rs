use std::path::Path;

use crate::recognition::domain::reference_gallery::ReferenceGallery;
use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::frame::Frame;

/// Loads every image in `dir` as a reference; the file stem becomes the subject name.
///
/// Files are read in name order. Unreadable images are skipped with a warning
/// so one bad upload does not take the whole gallery down. A missing
/// directory yields an empty gallery.
pub fn load_dir(dir: &Path) -> Result<ReferenceGallery, std::io::Error> {
    let mut gallery = ReferenceGallery::new();
    if !dir.is_dir() {
        log::warn!("Reference directory {} does not exist", dir.display());
        return Ok(gallery);
    }

    let mut paths: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| is_image(p))
        .collect();
    paths.sort();

    for path in paths {
        let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        match image::open(&path) {
            Ok(img) => gallery.insert(name, Frame::from_rgb_image(img.to_rgb8())),
            Err(e) => log::warn!("Skipping reference {}: {e}", path.display()),
        }
    }
    log::info!("Loaded {} reference face(s) from {}", gallery.len(), dir.display());
    Ok(gallery)
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
