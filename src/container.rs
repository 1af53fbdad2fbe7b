//! Shared container layout
//!
//! The shared container is the only storage both the foreground process and
//! the extension process can reach. Both sides agree on its layout by
//! convention: artifacts live under well-known relative paths, and small
//! values live in a durable key/value area under `defaults/`.

use std::io::Write;
use std::path::{Component, Path, PathBuf};

use crate::error::DefaultsError;

const DEFAULTS_DIR: &str = "defaults";

/// Handle to the shared storage root
#[derive(Debug, Clone)]
pub struct SharedContainer {
    root: PathBuf,
}

impl SharedContainer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of a conventional relative path inside the container
    pub fn resolve(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// Durable key/value area readable by the extension process
    pub fn defaults(&self) -> SharedDefaults {
        SharedDefaults {
            dir: self.root.join(DEFAULTS_DIR),
        }
    }
}

/// Returns true if `relative` stays inside whatever root it is joined to
pub fn is_contained_relative(relative: &str) -> bool {
    let path = Path::new(relative);
    path.components().any(|component| matches!(component, Component::Normal(_)))
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
}

/// Durable key/value entries stored one file per key.
///
/// Writes go to a temporary sibling, are flushed, then renamed over the
/// entry, so a reader in another process sees either the old or the new
/// complete value.
#[derive(Debug, Clone)]
pub struct SharedDefaults {
    dir: PathBuf,
}

impl SharedDefaults {
    /// Store `value` under `key`, replacing any previous value
    pub fn set(&self, key: &str, value: &str) -> Result<(), DefaultsError> {
        let path = self.entry_path(key)?;

        std::fs::create_dir_all(&self.dir).map_err(|source| DefaultsError::Write {
            path: self.dir.clone(),
            source,
        })?;

        // The temporary is removed on drop unless it was persisted
        let write = || -> std::io::Result<()> {
            let mut tmp = tempfile::Builder::new()
                .prefix(&format!(".{}.", key))
                .suffix(".tmp")
                .tempfile_in(&self.dir)?;
            tmp.write_all(value.as_bytes())?;
            tmp.as_file().sync_all()?;
            tmp.persist(&path)?;
            Ok(())
        };

        write().map_err(|source| DefaultsError::Write {
            path: path.clone(),
            source,
        })
    }

    /// Read the value stored under `key`, if any
    pub fn get(&self, key: &str) -> Result<Option<String>, DefaultsError> {
        let path = self.entry_path(key)?;
        match std::fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(DefaultsError::Read { path, source }),
        }
    }

    fn entry_path(&self, key: &str) -> Result<PathBuf, DefaultsError> {
        let separator = |c: char| c == '/' || c == '\\';
        if key.starts_with('.') || key.contains(separator) || !is_contained_relative(key) {
            return Err(DefaultsError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_round_trip_and_replace() {
        let dir = tempfile::tempdir().unwrap();
        let defaults = SharedContainer::new(dir.path()).defaults();

        assert_eq!(defaults.get("config").unwrap(), None);

        defaults.set("config", r#"{"a":1}"#).unwrap();
        defaults.set("config", r#"{"a":2}"#).unwrap();
        assert_eq!(defaults.get("config").unwrap().as_deref(), Some(r#"{"a":2}"#));

        // Only the entry itself is left behind, no temporary files
        let names: Vec<_> = std::fs::read_dir(dir.path().join("defaults"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("config")]);
    }

    #[test]
    fn test_defaults_rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let defaults = SharedContainer::new(dir.path()).defaults();

        for key in ["", "..", "../escape", "a/b", ".hidden"] {
            assert!(
                matches!(defaults.set(key, "x"), Err(DefaultsError::InvalidKey(_))),
                "key {:?} should be rejected",
                key
            );
        }
    }

    #[test]
    fn test_contained_relative() {
        assert!(is_contained_relative("images"));
        assert!(is_contained_relative("images/thumbs"));
        assert!(!is_contained_relative(""));
        assert!(!is_contained_relative("."));
        assert!(!is_contained_relative("/abs"));
        assert!(!is_contained_relative("../images"));
    }
}
