//! Template-matching face matcher.
//!
//! Slides each reference picture (grayscale, at several scales) over a
//! downscaled grayscale copy of the frame and scores every window by
//! normalized cross-correlation. The best-scoring reference is the subject;
//! a frame where nothing clears the floor is treated as having no face.
//! No ML model required, at the cost of being sensitive to pose and lighting.

use ndarray::{s, Array2, ArrayView2};

use crate::recognition::domain::detection_match::{Comparison, DetectionMatch, MatchSubject};
use crate::recognition::domain::face_matcher::FaceMatcher;
use crate::recognition::domain::reference_gallery::SharedGallery;
use crate::shared::frame::Frame;

/// Frames whose best score is at or below this percentage yield no detection.
pub const DEFAULT_MATCH_FLOOR: f64 = 20.0;

/// Frames wider than this are downscaled before matching.
const WORK_WIDTH: u32 = 160;

/// Template widths tried against the working frame.
const TEMPLATE_WIDTHS: &[u32] = &[24, 32, 48, 64];

/// Window step in pixels.
const STEP: usize = 2;

/// Windows flatter than this (variance per pixel) cannot be correlated.
const MIN_VARIANCE: f64 = 1e-3;

struct Template {
    /// Zero-mean, unit-norm pixel values.
    values: Array2<f64>,
}

pub struct TemplateFaceMatcher {
    gallery: SharedGallery,
    floor: f64,
    cached_revision: Option<u64>,
    templates: Vec<(String, Vec<Template>)>,
}

impl TemplateFaceMatcher {
    pub fn new(gallery: SharedGallery, floor: f64) -> Self {
        Self {
            gallery,
            floor,
            cached_revision: None,
            templates: Vec::new(),
        }
    }

    fn refresh_templates(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let gallery = self
            .gallery
            .read()
            .map_err(|e| format!("Lock poisoned: {e}"))?;
        if self.cached_revision == Some(gallery.revision()) {
            return Ok(());
        }
        self.templates = gallery
            .faces()
            .iter()
            .map(|face| (face.name.clone(), build_templates(&face.image)))
            .collect();
        self.cached_revision = Some(gallery.revision());
        Ok(())
    }
}

impl FaceMatcher for TemplateFaceMatcher {
    fn detect(
        &mut self,
        frame: &Frame,
        source_label: &str,
    ) -> Result<Vec<DetectionMatch>, Box<dyn std::error::Error>> {
        self.refresh_templates()?;
        if self.templates.is_empty() {
            return Ok(Vec::new());
        }

        let scene =
            to_gray(frame, Some(WORK_WIDTH)).ok_or("Frame data does not match its dimensions")?;
        let integrals = Integrals::new(scene.view());

        let comparisons: Vec<Comparison> = self
            .templates
            .iter()
            .map(|(name, templates)| {
                let best = templates
                    .iter()
                    .map(|t| best_correlation(scene.view(), &integrals, t))
                    .fold(0.0f64, f64::max);
                Comparison {
                    reference: name.clone(),
                    confidence_percent: best * 100.0,
                }
            })
            .collect();

        let best = comparisons
            .iter()
            .max_by(|a, b| a.confidence_percent.total_cmp(&b.confidence_percent))
            .map(|c| (c.reference.clone(), c.confidence_percent));

        let Some((name, percent)) = best else {
            return Ok(Vec::new());
        };
        if percent <= self.floor {
            log::debug!("{source_label}: no face (best template score {percent:.1}%)");
            return Ok(Vec::new());
        }
        log::debug!("{source_label}: best template score {percent:.1}% ({name})");

        Ok(vec![DetectionMatch::new(
            MatchSubject::Named(name),
            percent,
            comparisons,
        )])
    }
}

/// Converts to luminance, optionally downscaling to `max_width`.
fn to_gray(frame: &Frame, max_width: Option<u32>) -> Option<Array2<f64>> {
    let rgb = frame.to_rgb_image()?;
    let mut gray = image::DynamicImage::ImageRgb8(rgb).to_luma8();
    if let Some(max_w) = max_width {
        if gray.width() > max_w {
            let h = ((gray.height() as f64 * max_w as f64 / gray.width() as f64).round() as u32).max(1);
            gray = image::imageops::resize(&gray, max_w, h, image::imageops::FilterType::Triangle);
        }
    }
    let (w, h) = gray.dimensions();
    let values: Vec<f64> = gray.into_raw().into_iter().map(|v| v as f64 / 255.0).collect();
    Array2::from_shape_vec((h as usize, w as usize), values).ok()
}

fn build_templates(reference: &Frame) -> Vec<Template> {
    let Some(rgb) = reference.to_rgb_image() else {
        return Vec::new();
    };
    let gray = image::DynamicImage::ImageRgb8(rgb).to_luma8();
    let (rw, rh) = gray.dimensions();
    if rw == 0 || rh == 0 {
        return Vec::new();
    }

    TEMPLATE_WIDTHS
        .iter()
        .filter_map(|&tw| {
            let th = ((rh as f64 * tw as f64 / rw as f64).round() as u32).max(1);
            let scaled = if (tw, th) == (rw, rh) {
                gray.clone()
            } else {
                image::imageops::resize(&gray, tw, th, image::imageops::FilterType::Triangle)
            };
            let values: Vec<f64> = scaled.into_raw().into_iter().map(|v| v as f64 / 255.0).collect();
            let arr = Array2::from_shape_vec((th as usize, tw as usize), values).ok()?;
            normalize(arr).map(|values| Template { values })
        })
        .collect()
}

/// Shifts to zero mean and scales to unit L2 norm; `None` for flat images.
fn normalize(mut arr: Array2<f64>) -> Option<Array2<f64>> {
    let n = arr.len() as f64;
    let mean = arr.sum() / n;
    arr.mapv_inplace(|v| v - mean);
    let norm = arr.mapv(|v| v * v).sum().sqrt();
    if norm * norm / n < MIN_VARIANCE {
        return None;
    }
    arr.mapv_inplace(|v| v / norm);
    Some(arr)
}

/// Summed-area tables of values and squared values for O(1) window statistics.
struct Integrals {
    sum: Array2<f64>,
    sum_sq: Array2<f64>,
}

impl Integrals {
    fn new(img: ArrayView2<'_, f64>) -> Self {
        let (h, w) = img.dim();
        let mut sum = Array2::<f64>::zeros((h + 1, w + 1));
        let mut sum_sq = Array2::<f64>::zeros((h + 1, w + 1));
        for y in 0..h {
            let mut row = 0.0;
            let mut row_sq = 0.0;
            for x in 0..w {
                let v = img[[y, x]];
                row += v;
                row_sq += v * v;
                sum[[y + 1, x + 1]] = sum[[y, x + 1]] + row;
                sum_sq[[y + 1, x + 1]] = sum_sq[[y, x + 1]] + row_sq;
            }
        }
        Self { sum, sum_sq }
    }

    fn window(table: &Array2<f64>, y: usize, x: usize, h: usize, w: usize) -> f64 {
        table[[y + h, x + w]] - table[[y, x + w]] - table[[y + h, x]] + table[[y, x]]
    }
}

/// Highest normalized cross-correlation of `template` over `scene`, clamped to 0..=1.
fn best_correlation(scene: ArrayView2<'_, f64>, integrals: &Integrals, template: &Template) -> f64 {
    let (sh, sw) = scene.dim();
    let (th, tw) = template.values.dim();
    if th > sh || tw > sw {
        return 0.0;
    }
    let n = (th * tw) as f64;
    let mut best = 0.0f64;

    for y in (0..=sh - th).step_by(STEP) {
        for x in (0..=sw - tw).step_by(STEP) {
            let sum = Integrals::window(&integrals.sum, y, x, th, tw);
            let sum_sq = Integrals::window(&integrals.sum_sq, y, x, th, tw);
            let var = sum_sq - sum * sum / n;
            if var / n < MIN_VARIANCE {
                continue;
            }
            // Template is zero-mean, so the window mean drops out of the dot product.
            let window = scene.slice(s![y..y + th, x..x + tw]);
            let dot: f64 = window
                .iter()
                .zip(template.values.iter())
                .map(|(a, b)| a * b)
                .sum();
            let score = dot / var.sqrt();
            if score > best {
                best = score;
            }
        }
    }
    best.min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognition::domain::reference_gallery::ReferenceGallery;

    /// Deterministic noise so patterns are distinguishable without a fixture file.
    fn noise_patch(size: u32, seed: u64) -> Vec<u8> {
        let mut state = seed;
        let mut data = Vec::with_capacity((size * size * 3) as usize);
        for _ in 0..(size * size) {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let v = (state >> 56) as u8;
            data.extend_from_slice(&[v, v, v]);
        }
        data
    }

    fn patch_frame(size: u32, seed: u64) -> Frame {
        Frame::new(noise_patch(size, seed), size, size)
    }

    /// Flat gray scene with a patch pasted at (`px`, `py`).
    fn scene_with_patch(width: u32, height: u32, patch: &Frame, px: u32, py: u32) -> Frame {
        let mut img = image::RgbImage::from_pixel(width, height, image::Rgb([90, 90, 90]));
        let patch_img = patch.to_rgb_image().unwrap();
        image::imageops::overlay(&mut img, &patch_img, px as i64, py as i64);
        Frame::from_rgb_image(img)
    }

    fn matcher(refs: &[(&str, Frame)]) -> TemplateFaceMatcher {
        let mut gallery = ReferenceGallery::new();
        for (name, frame) in refs {
            gallery.insert(*name, frame.clone());
        }
        TemplateFaceMatcher::new(gallery.into_shared(), DEFAULT_MATCH_FLOOR)
    }

    #[test]
    fn test_empty_gallery_returns_no_detections() {
        let mut m = matcher(&[]);
        let scene = scene_with_patch(100, 80, &patch_frame(32, 1), 20, 20);
        assert!(m.detect(&scene, "cam").unwrap().is_empty());
    }

    #[test]
    fn test_pasted_reference_is_matched() {
        let alice = patch_frame(32, 1);
        let bob = patch_frame(32, 2);
        let mut m = matcher(&[("alice", alice.clone()), ("bob", bob)]);
        let scene = scene_with_patch(100, 80, &alice, 20, 20);

        let result = m.detect(&scene, "cam").unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].subject, MatchSubject::Named("alice".into()));
        assert!(result[0].confidence_percent > 95.0);
        assert_eq!(result[0].comparisons.len(), 2);
        assert_eq!(result[0].comparisons[0].reference, "alice");
        assert_eq!(result[0].comparisons[1].reference, "bob");
        assert!(result[0].comparisons[1].confidence_percent < result[0].confidence_percent);
    }

    #[test]
    fn test_flat_scene_has_no_detections() {
        let mut m = matcher(&[("alice", patch_frame(32, 1))]);
        let scene = Frame::new(vec![90u8; 100 * 80 * 3], 100, 80);

        assert!(m.detect(&scene, "cam").unwrap().is_empty());
    }

    #[test]
    fn test_score_at_floor_has_no_detections() {
        let alice = patch_frame(32, 1);
        let mut gallery = ReferenceGallery::new();
        gallery.insert("alice", alice.clone());
        let scene = scene_with_patch(100, 80, &alice, 20, 20);
        let mut m = TemplateFaceMatcher::new(gallery.into_shared(), 100.0);

        assert!(m.detect(&scene, "cam").unwrap().is_empty());
    }

    #[test]
    fn test_gallery_changes_are_picked_up() {
        let alice = patch_frame(32, 1);
        let gallery = ReferenceGallery::new().into_shared();
        let mut m = TemplateFaceMatcher::new(gallery.clone(), DEFAULT_MATCH_FLOOR);
        let scene = scene_with_patch(100, 80, &alice, 20, 20);
        assert!(m.detect(&scene, "cam").unwrap().is_empty());

        gallery.write().unwrap().insert("alice", alice);

        let result = m.detect(&scene, "cam").unwrap();
        assert_eq!(result[0].subject, MatchSubject::Named("alice".into()));
    }

    #[test]
    fn test_normalize_rejects_flat_input() {
        assert!(normalize(Array2::from_elem((4, 4), 0.5)).is_none());
    }

    #[test]
    fn test_normalize_produces_unit_norm() {
        let arr = Array2::from_shape_vec((2, 2), vec![0.0, 1.0, 0.0, 1.0]).unwrap();
        let n = normalize(arr).unwrap();
        approx::assert_relative_eq!(n.sum(), 0.0, epsilon = 1e-12);
        approx::assert_relative_eq!(n.mapv(|v| v * v).sum(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_integral_window_sum() {
        let img = Array2::from_shape_vec((3, 3), (1..=9).map(|v| v as f64).collect()).unwrap();
        let integrals = Integrals::new(img.view());
        // Bottom-right 2x2: 5 + 6 + 8 + 9
        approx::assert_relative_eq!(Integrals::window(&integrals.sum, 1, 1, 2, 2), 28.0);
    }
}
