//! Content fingerprints of a shader file and the files it includes.

use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::io;
use std::path::{Path, PathBuf};

/// Length and 64-bit content hash of one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileStamp {
    pub len: u64,
    pub hash: u64,
}

impl FileStamp {
    pub fn of_bytes(bytes: &[u8]) -> Self {
        let mut hasher = DefaultHasher::new();
        bytes.hash(&mut hasher);
        Self {
            len: bytes.len() as u64,
            hash: hasher.finish(),
        }
    }

    pub fn read(path: &Path) -> io::Result<Self> {
        fs::read(path).map(|bytes| Self::of_bytes(&bytes))
    }
}

/// Stamps of a primary shader file and each of its dependencies, in the
/// order they were first included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    pub primary: (PathBuf, FileStamp),
    pub dependencies: Vec<(PathBuf, FileStamp)>,
}

impl Fingerprint {
    /// Stamp the files as they are on disk now.
    pub fn capture(primary: &Path, dependencies: &[PathBuf]) -> io::Result<Self> {
        Ok(Self {
            primary: (primary.to_path_buf(), FileStamp::read(primary)?),
            dependencies: dependencies
                .iter()
                .map(|p| FileStamp::read(p).map(|s| (p.clone(), s)))
                .collect::<io::Result<_>>()?,
        })
    }

    pub fn dependency_paths(&self) -> impl Iterator<Item = &Path> {
        self.dependencies.iter().map(|(p, _)| p.as_path())
    }

    /// Whether every recorded file still has the recorded content. A file
    /// that can no longer be read is an error, not a mismatch.
    pub fn is_current(&self) -> io::Result<bool> {
        for (path, stamp) in std::iter::once(&self.primary).chain(&self.dependencies) {
            if FileStamp::read(path)? != *stamp {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
