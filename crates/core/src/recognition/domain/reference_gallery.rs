use std::sync::{Arc, RwLock};

use crate::shared::frame::Frame;

/// A named reference picture of a person to look for.
#[derive(Clone, Debug)]
pub struct ReferenceFace {
    pub name: String,
    pub image: Frame,
}

/// The set of people to recognize.
///
/// `revision` increments on every change so matchers can cache derived data.
#[derive(Clone, Debug, Default)]
pub struct ReferenceGallery {
    faces: Vec<ReferenceFace>,
    revision: u64,
}

/// Gallery shared between the matcher and whoever manages references.
pub type SharedGallery = Arc<RwLock<ReferenceGallery>>;

impl ReferenceGallery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a reference, replacing any existing one with the same name.
    pub fn insert(&mut self, name: impl Into<String>, image: Frame) {
        let name = name.into();
        match self.faces.iter_mut().find(|f| f.name == name) {
            Some(existing) => existing.image = image,
            None => self.faces.push(ReferenceFace { name, image }),
        }
        self.revision += 1;
    }

    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.faces.len();
        self.faces.retain(|f| f.name != name);
        let removed = self.faces.len() != before;
        if removed {
            self.revision += 1;
        }
        removed
    }

    pub fn faces(&self) -> &[ReferenceFace] {
        &self.faces
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn into_shared(self) -> SharedGallery {
        Arc::new(RwLock::new(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(value: u8) -> Frame {
        Frame::new(vec![value; 12], 2, 2)
    }

    #[test]
    fn test_insert_keeps_order_and_bumps_revision() {
        let mut gallery = ReferenceGallery::new();
        gallery.insert("alice", frame(1));
        gallery.insert("bob", frame(2));

        let names: Vec<_> = gallery.faces().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["alice", "bob"]);
        assert_eq!(gallery.revision(), 2);
    }

    #[test]
    fn test_insert_same_name_replaces_image() {
        let mut gallery = ReferenceGallery::new();
        gallery.insert("alice", frame(1));
        gallery.insert("alice", frame(9));

        assert_eq!(gallery.len(), 1);
        assert_eq!(gallery.faces()[0].image.data()[0], 9);
    }

    #[test]
    fn test_remove() {
        let mut gallery = ReferenceGallery::new();
        gallery.insert("alice", frame(1));
        let rev = gallery.revision();

        assert!(!gallery.remove("bob"));
        assert_eq!(gallery.revision(), rev);
        assert!(gallery.remove("alice"));
        assert!(gallery.is_empty());
        assert_eq!(gallery.revision(), rev + 1);
    }
}
