pub mod detection_match;
pub mod face_matcher;
pub mod reference_gallery;
