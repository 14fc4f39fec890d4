use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::constants::{CONFIG_DIR_NAME, SOURCES_FILE_NAME};
use crate::shared::source::{Source, SourceDescriptor};
use crate::shared::timestamp::Timestamp;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("source name must not be empty")]
    EmptyName,
    #[error("a source named '{0}' already exists")]
    Duplicate(String),
    #[error("no source named '{0}'")]
    NotFound(String),
    #[error("failed to read or write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid source list {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// The named cameras being monitored, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceRegistry {
    sources: Vec<Source>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(SOURCES_FILE_NAME))
    }

    pub fn add(
        &mut self,
        name: &str,
        descriptor: SourceDescriptor,
        now: Timestamp,
    ) -> Result<&Source, RegistryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.get(name).is_some() {
            return Err(RegistryError::Duplicate(name.to_string()));
        }
        self.sources.push(Source::new(name, descriptor, now));
        let index = self.sources.len() - 1;
        Ok(&self.sources[index])
    }

    pub fn remove(&mut self, name: &str) -> Result<Source, RegistryError> {
        let index = self
            .sources
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        Ok(self.sources.remove(index))
    }

    pub fn get(&self, name: &str) -> Option<&Source> {
        self.sources.iter().find(|s| s.name == name)
    }

    pub fn list(&self) -> &[Source] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Reads the registry from `path`. A missing file yields an empty registry.
    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let json = match fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(source) => {
                return Err(RegistryError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        serde_json::from_str(&json).map_err(|source| RegistryError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), RegistryError> {
        let io_err = |source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|source| RegistryError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(io_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const T: Timestamp = Timestamp::from_secs(100);

    fn registry() -> SourceRegistry {
        let mut r = SourceRegistry::new();
        r.add("door", SourceDescriptor::Device(0), T).unwrap();
        r.add("yard", SourceDescriptor::Stream("rtsp://yard/1".into()), T)
            .unwrap();
        r
    }

    #[test]
    fn test_add_keeps_insertion_order() {
        let names: Vec<_> = registry().list().iter().map(|s| s.name.clone()).collect();
        assert_eq!(names, vec!["door", "yard"]);
    }

    #[test]
    fn test_add_trims_name() {
        let mut r = SourceRegistry::new();
        let added = r.add("  porch ", SourceDescriptor::Device(2), T).unwrap();
        assert_eq!(added.name, "porch");
        assert_eq!(added.added_at, T);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut r = registry();
        let err = r.add("door", SourceDescriptor::Device(3), T).unwrap_err();
        assert!(matches!(err, RegistryError::Duplicate(name) if name == "door"));
        assert_eq!(r.len(), 2);
    }

    #[test]
    fn test_empty_name_rejected() {
        let mut r = SourceRegistry::new();
        assert!(matches!(
            r.add("   ", SourceDescriptor::Device(0), T),
            Err(RegistryError::EmptyName)
        ));
    }

    #[test]
    fn test_shared_descriptor_allowed_under_two_names() {
        let mut r = registry();
        assert!(r.add("door-alt", SourceDescriptor::Device(0), T).is_ok());
    }

    #[test]
    fn test_remove_returns_source() {
        let mut r = registry();
        let removed = r.remove("door").unwrap();
        assert_eq!(removed.descriptor, SourceDescriptor::Device(0));
        assert!(r.get("door").is_none());
        assert!(matches!(r.remove("door"), Err(RegistryError::NotFound(_))));
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cfg").join("cameras.json");
        let r = registry();

        r.save(&path).unwrap();

        assert_eq!(SourceRegistry::load(&path).unwrap(), r);
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(SourceRegistry::load(&dir.path().join("none.json"))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cameras.json");
        fs::write(&path, "[1, 2").unwrap();
        assert!(matches!(
            SourceRegistry::load(&path),
            Err(RegistryError::Parse { .. })
        ));
    }
}
