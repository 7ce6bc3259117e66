//! Generated file artifacts
//!
//! The installer produces translation files and model source files, and the
//! session can emit a migration scaffold on request. All file access goes
//! through `ArtifactFs` with paths relative to an artifact root, so tests
//! run against an in-memory tree and the CLI against a real directory.

pub mod migration;
pub mod model;
pub mod translations;

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::error::DesignerResult;

pub use migration::MigrationGenerator;
pub use model::{ModelArtifact, ModelGenerator};

pub trait ArtifactFs: Send + Sync {
    /// Contents of a file, or `None` when it does not exist.
    fn read(&self, path: &str) -> DesignerResult<Option<String>>;

    /// Write a file, creating parent directories as needed.
    fn write(&self, path: &str, contents: &str) -> DesignerResult<()>;

    fn rename(&self, from: &str, to: &str) -> DesignerResult<()>;

    fn exists(&self, path: &str) -> bool;

    /// Relative paths of all files under `prefix`, sorted.
    fn list(&self, prefix: &str) -> DesignerResult<Vec<String>>;
}

// ============================================================================
// Directory-backed tree
// ============================================================================

pub struct DirFs {
    root: PathBuf,
}

impl DirFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }

    fn collect(&self, dir: &Path, out: &mut Vec<String>) -> io::Result<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                self.collect(&path, out)?;
            } else if let Ok(relative) = path.strip_prefix(&self.root) {
                out.push(relative.to_string_lossy().replace('\\', "/"));
            }
        }
        Ok(())
    }
}

impl ArtifactFs for DirFs {
    fn read(&self, path: &str) -> DesignerResult<Option<String>> {
        match fs::read_to_string(self.resolve(path)) {
            Ok(contents) => Ok(Some(contents)),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    fn write(&self, path: &str, contents: &str) -> DesignerResult<()> {
        let full = self.resolve(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(full, contents)?;
        Ok(())
    }

    fn rename(&self, from: &str, to: &str) -> DesignerResult<()> {
        let target = self.resolve(to);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(self.resolve(from), target)?;
        Ok(())
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve(path).exists()
    }

    fn list(&self, prefix: &str) -> DesignerResult<Vec<String>> {
        let dir = self.resolve(prefix);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        self.collect(&dir, &mut out)?;
        out.sort();
        Ok(out)
    }
}

// ============================================================================
// In-memory tree
// ============================================================================

#[derive(Default)]
pub struct MemoryFs {
    files: RwLock<BTreeMap<String, String>>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file_names(&self) -> Vec<String> {
        self.files.read().unwrap().keys().cloned().collect()
    }
}

impl ArtifactFs for MemoryFs {
    fn read(&self, path: &str) -> DesignerResult<Option<String>> {
        Ok(self.files.read().unwrap().get(path).cloned())
    }

    fn write(&self, path: &str, contents: &str) -> DesignerResult<()> {
        self.files
            .write()
            .unwrap()
            .insert(path.to_string(), contents.to_string());
        Ok(())
    }

    fn rename(&self, from: &str, to: &str) -> DesignerResult<()> {
        let mut files = self.files.write().unwrap();
        match files.remove(from) {
            Some(contents) => {
                files.insert(to.to_string(), contents);
                Ok(())
            }
            None => Err(io::Error::new(io::ErrorKind::NotFound, from.to_string()).into()),
        }
    }

    fn exists(&self, path: &str) -> bool {
        self.files.read().unwrap().contains_key(path)
    }

    fn list(&self, prefix: &str) -> DesignerResult<Vec<String>> {
        Ok(self
            .files
            .read()
            .unwrap()
            .keys()
            .filter(|path| path.starts_with(prefix))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_fs_round_trip() {
        let fs = MemoryFs::new();
        assert_eq!(fs.read("lang/en/book.json").unwrap(), None);

        fs.write("lang/en/book.json", "{}").unwrap();
        assert!(fs.exists("lang/en/book.json"));
        assert_eq!(fs.read("lang/en/book.json").unwrap().as_deref(), Some("{}"));

        fs.rename("lang/en/book.json", "lang/en/book.json.prev").unwrap();
        assert!(!fs.exists("lang/en/book.json"));
        assert_eq!(fs.list("lang/en").unwrap(), vec!["lang/en/book.json.prev"]);
    }

    #[test]
    fn test_dir_fs_creates_parents_and_lists() {
        let dir = tempfile::tempdir().unwrap();
        let fs = DirFs::new(dir.path());

        fs.write("models/book_type.rs", "pub struct BookType;").unwrap();
        fs.write("lang/en/book-type.json", "{}").unwrap();

        assert!(fs.exists("models/book_type.rs"));
        assert_eq!(
            fs.read("models/book_type.rs").unwrap().unwrap(),
            "pub struct BookType;"
        );
        assert_eq!(fs.list("lang").unwrap(), vec!["lang/en/book-type.json"]);
        assert!(fs.list("missing").unwrap().is_empty());

        fs.rename("models/book_type.rs", "models/book_type.rs.prev").unwrap();
        assert!(fs.exists("models/book_type.rs.prev"));
    }
}
