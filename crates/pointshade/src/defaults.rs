//! Default shaders bundled into the library.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

/// `(file name, contents)` of every bundled shader and include.
const BUNDLED: [(&str, &str); 4] = [
    ("navierStokes.vtx", include_str!("../shaders/navierStokes.vtx")),
    ("texture.vtx", include_str!("../shaders/texture.vtx")),
    ("ripple.vtx", include_str!("../shaders/ripple.vtx")),
    ("common.vti", include_str!("../shaders/common.vti")),
];

pub struct DefaultShaders;

impl DefaultShaders {
    pub fn files() -> impl Iterator<Item = (&'static str, &'static str)> {
        BUNDLED.into_iter()
    }

    pub fn get(name: &str) -> Option<&'static str> {
        BUNDLED.iter().find(|(n, _)| *n == name).map(|(_, text)| *text)
    }

    /// Write the bundled shaders into `dir`, creating it if needed. Existing
    /// files are left alone. Returns the paths written.
    pub fn export(dir: &Path) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create shader directory {}", dir.display()))?;

        let mut written = Vec::new();
        for (name, text) in BUNDLED {
            let path = dir.join(name);
            if path.exists() {
                debug!(path = %path.display(), "shader already present");
                continue;
            }
            fs::write(&path, text)
                .with_context(|| format!("failed to export {}", path.display()))?;
            info!(path = %path.display(), "exported default shader");
            written.push(path);
        }
        Ok(written)
    }
}

/// Runs [`DefaultShaders::export`] at most once successfully. Owned by the
/// driver that sets up the shader directory.
#[derive(Debug, Default)]
pub struct Exporter {
    done: bool,
}

impl Exporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Export into `dir` unless an earlier call already succeeded.
    pub fn ensure_exported(&mut self, dir: &Path) -> Result<Vec<PathBuf>> {
        if self.done {
            return Ok(Vec::new());
        }
        let written = DefaultShaders::export(dir)?;
        self.done = true;
        Ok(written)
    }
}
