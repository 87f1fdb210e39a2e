//! Loading shader files and splicing their `#include`s.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::trace;

use crate::fingerprint::{FileStamp, Fingerprint};

/// Extension of shader files addressed by script name.
pub const SHADER_EXTENSION: &str = "vtx";

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read shader {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("shader {path} includes itself")]
    IncludeCycle { path: PathBuf },
    #[error("{path}:{line}: malformed #include directive")]
    MalformedInclude { path: PathBuf, line: usize },
}

/// A shader with its includes spliced in.
#[derive(Debug, Clone)]
pub struct ShaderSource {
    pub name: String,
    pub path: PathBuf,
    pub text: String,
    /// Stamps of exactly the bytes that went into `text`.
    pub fingerprint: Fingerprint,
}

impl ShaderSource {
    /// Included files in first-inclusion order.
    pub fn dependencies(&self) -> impl Iterator<Item = &Path> {
        self.fingerprint.dependency_paths()
    }
}

/// `<dir>/<name>.vtx`; a name that already carries the extension is used
/// as is.
pub fn shader_path(dir: &Path, name: &str) -> PathBuf {
    let has_ext = Path::new(name)
        .extension()
        .is_some_and(|e| e == SHADER_EXTENSION);
    if has_ext {
        dir.join(name)
    } else {
        dir.join(format!("{name}.{SHADER_EXTENSION}"))
    }
}

/// Read script `name` from `dir` and resolve its includes.
pub fn load_shader(dir: &Path, name: &str) -> Result<ShaderSource, SourceError> {
    let path = shader_path(dir, name);
    let mut loader = Loader::default();
    let (text, primary) = loader.splice(&path)?;

    Ok(ShaderSource {
        name: name.to_string(),
        fingerprint: Fingerprint {
            primary: (path.clone(), primary),
            dependencies: loader.dependencies,
        },
        path,
        text,
    })
}

#[derive(Default)]
struct Loader {
    stack: Vec<PathBuf>,
    dependencies: Vec<(PathBuf, FileStamp)>,
}

/// The quoted or bracketed target of an `#include` line, if it is one.
fn include_target(line: &str) -> Option<Result<&str, ()>> {
    let rest = line.trim_start().strip_prefix("#include")?;
    let rest = rest.trim();
    let target = rest
        .strip_prefix('"')
        .and_then(|r| r.strip_suffix('"'))
        .or_else(|| rest.strip_prefix('<').and_then(|r| r.strip_suffix('>')));
    Some(target.filter(|t| !t.is_empty()).ok_or(()))
}

fn read(path: &Path) -> Result<String, SourceError> {
    fs::read_to_string(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })
}

impl Loader {
    fn splice(&mut self, path: &Path) -> Result<(String, FileStamp), SourceError> {
        let identity = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        if self.stack.contains(&identity) {
            return Err(SourceError::IncludeCycle {
                path: path.to_path_buf(),
            });
        }

        let raw = read(path)?;
        let stamp = FileStamp::of_bytes(raw.as_bytes());
        let base = path.parent().unwrap_or_else(|| Path::new("."));

        self.stack.push(identity);
        let mut out = String::with_capacity(raw.len());
        for (index, line) in raw.lines().enumerate() {
            match include_target(line) {
                None => {
                    out.push_str(line);
                    out.push('\n');
                }
                Some(Err(())) => {
                    return Err(SourceError::MalformedInclude {
                        path: path.to_path_buf(),
                        line: index + 1,
                    })
                }
                Some(Ok(target)) => {
                    let included = base.join(target);
                    trace!(from = %path.display(), include = %included.display(), "splicing include");
                    let (text, dep_stamp) = self.splice(&included)?;
                    if !self.dependencies.iter().any(|(p, _)| *p == included) {
                        self.dependencies.push((included, dep_stamp));
                    }
                    out.push_str(&text);
                }
            }
        }
        self.stack.pop();

        Ok((out, stamp))
    }
}
