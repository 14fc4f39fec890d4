pub mod gallery_loader;
pub mod template_face_matcher;
