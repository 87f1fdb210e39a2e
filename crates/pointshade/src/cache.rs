//! Process-wide cache of linked shader programs.
//!
//! An entry is served only while the shader file and every file it includes
//! still hash to the recorded fingerprint *and* the program was created by
//! the context that is current now. Anything else is a miss, and a miss
//! always falls back to compiling from source.
//!
//! The cache never calls GL. Entries it drops are handed back to the caller,
//! which owns the context and decides whether the program can be deleted.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use pointshade_core::IsfMetadata;
use pointshade_gl::ContextId;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::fingerprint::Fingerprint;
use crate::program::{CompiledProgram, SharedProgram};
use crate::source::ShaderSource;

/// What a cached program was built for. Two patterns share an entry only
/// when the shader, the capture varying and the resolved samplers all agree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    name: String,
    dir: PathBuf,
    capture: String,
    samplers: Vec<String>,
}

impl CacheKey {
    pub fn new(name: &str, dir: &Path, capture: &str, samplers: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            dir: dir.to_path_buf(),
            capture: capture.to_string(),
            samplers: samplers.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub program: CompiledProgram,
    pub metadata: IsfMetadata,
    pub fingerprint: Fingerprint,
}

/// A cache hit: a program usable in the current context and the metadata
/// it was compiled against.
#[derive(Debug, Clone)]
pub struct CachedResult {
    pub program: CompiledProgram,
    pub metadata: IsfMetadata,
}

/// Failure to check an entry against the files on disk.
#[derive(Debug, Error)]
#[error("could not fingerprint {name}: {source}")]
pub struct CacheIoError {
    name: String,
    #[source]
    source: std::io::Error,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

#[derive(Debug, Default)]
pub struct ShaderCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

pub type SharedShaderCache = Arc<ShaderCache>;

impl ShaderCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedShaderCache {
        Arc::new(Self::new())
    }

    // A panic while holding the lock leaves the map itself intact.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<CacheKey, CacheEntry>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<CacheKey, CacheEntry>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }

    fn check(name: &str, entry: &CacheEntry) -> Result<bool, CacheIoError> {
        entry.fingerprint.is_current().map_err(|source| CacheIoError {
            name: name.to_string(),
            source,
        })
    }

    /// Whether an entry exists whose fingerprint still matches the shader
    /// and all of its dependencies on disk.
    pub fn is_valid(&self, key: &CacheKey) -> bool {
        let entries = self.read();
        let Some(entry) = entries.get(key) else {
            return false;
        };
        match Self::check(&key.name, entry) {
            Ok(current) => current,
            Err(err) => {
                warn!(%err, "treating cache entry as stale");
                false
            }
        }
    }

    /// Whether `entry` was created by the context that is current now.
    pub fn is_context_valid(entry: &CacheEntry, current: ContextId) -> bool {
        entry.program.context() == current
    }

    /// The entry for `key`, if it is valid for both the files on disk and
    /// `current`.
    pub fn load(&self, key: &CacheKey, current: ContextId) -> Option<CachedResult> {
        let name = key.name();
        let hit = {
            let entries = self.read();
            entries.get(key).and_then(|entry| {
                if !Self::is_context_valid(entry, current) {
                    debug!(shader = %name, "cache entry belongs to another context");
                    return None;
                }
                match Self::check(name, entry) {
                    Ok(true) => Some(CachedResult {
                        program: entry.program.clone(),
                        metadata: entry.metadata.clone(),
                    }),
                    Ok(false) => {
                        debug!(shader = %name, "cache entry is stale");
                        None
                    }
                    Err(err) => {
                        warn!(%err, "treating cache entry as stale");
                        None
                    }
                }
            })
        };

        if hit.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            info!(shader = %name, "shader served from cache");
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            debug!(shader = %name, "shader cache miss");
        }
        hit
    }

    /// Record `program` as the compiled form of `source`. Returns the
    /// program of the entry this replaced, if it was a different one.
    pub fn store(
        &self,
        key: CacheKey,
        program: &CompiledProgram,
        metadata: &IsfMetadata,
        source: &ShaderSource,
    ) -> Option<CompiledProgram> {
        let entry = CacheEntry {
            program: program.clone(),
            metadata: metadata.clone(),
            fingerprint: source.fingerprint.clone(),
        };
        debug!(
            shader = %key.name,
            dependencies = source.fingerprint.dependencies.len(),
            "stored shader in cache"
        );
        let replaced = self.write().insert(key, entry);
        replaced
            .map(|old| old.program)
            .filter(|old| !old.same_program(program))
    }

    /// Drop every entry. The programs are returned for the caller to
    /// release; programs still in use elsewhere stay alive.
    pub fn clear(&self) -> Vec<CompiledProgram> {
        let dropped: Vec<_> = self.write().drain().map(|(_, e)| e.program).collect();
        info!(entries = dropped.len(), "cleared shader cache");
        dropped
    }

    /// Drop the entries that reference `program`.
    pub fn forget(&self, program: &SharedProgram) -> Vec<CompiledProgram> {
        let mut entries = self.write();
        let keys: Vec<CacheKey> = entries
            .iter()
            .filter(|(_, e)| Arc::ptr_eq(&e.program.program, program))
            .map(|(k, _)| k.clone())
            .collect();
        keys.iter()
            .filter_map(|k| entries.remove(k))
            .map(|e| e.program)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use pointshade_gl::ProgramId;

    use crate::program::{ProgramObject, UniformTable};
    use crate::source::load_shader;

    fn program(raw: u32, context: ContextId) -> CompiledProgram {
        CompiledProgram {
            program: Arc::new(ProgramObject {
                id: ProgramId::from_raw(raw).unwrap(),
                context,
            }),
            uniforms: UniformTable::new(),
            position: Some(0),
            capture: "outColor".to_string(),
        }
    }

    fn key(name: &str, dir: &Path) -> CacheKey {
        CacheKey::new(name, dir, "outColor", &["audioTexture"])
    }

    fn setup() -> (tempfile::TempDir, ShaderSource) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("common.vti"), "float common;\n").unwrap();
        fs::write(
            dir.path().join("ripple.vtx"),
            "/*{}*/\n#include \"common.vti\"\nvoid main() {}\n",
        )
        .unwrap();
        let source = load_shader(dir.path(), "ripple").unwrap();
        (dir, source)
    }

    #[test]
    fn hit_requires_matching_files_and_context() {
        let (dir, source) = setup();
        let ctx = ContextId::next();
        let cache = ShaderCache::new();
        assert!(cache.load(&key("ripple", dir.path()), ctx).is_none());

        cache.store(key("ripple", dir.path()), &program(7, ctx), &IsfMetadata::empty(), &source);
        assert!(cache.is_valid(&key("ripple", dir.path())));
        let hit = cache.load(&key("ripple", dir.path()), ctx).unwrap();
        assert_eq!(hit.program.id().get(), 7);

        // Same files, different context.
        assert!(cache.load(&key("ripple", dir.path()), ContextId::next()).is_none());
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 2 });
    }

    #[test]
    fn dependency_change_invalidates() {
        let (dir, source) = setup();
        let ctx = ContextId::next();
        let cache = ShaderCache::new();
        cache.store(key("ripple", dir.path()), &program(7, ctx), &IsfMetadata::empty(), &source);

        fs::write(dir.path().join("common.vti"), "float common2;\n").unwrap();
        assert!(!cache.is_valid(&key("ripple", dir.path())));
        assert!(cache.load(&key("ripple", dir.path()), ctx).is_none());
    }

    #[test]
    fn deleted_file_is_a_miss_not_an_error() {
        let (dir, source) = setup();
        let ctx = ContextId::next();
        let cache = ShaderCache::new();
        cache.store(key("ripple", dir.path()), &program(7, ctx), &IsfMetadata::empty(), &source);

        fs::remove_file(dir.path().join("common.vti")).unwrap();
        assert!(!cache.is_valid(&key("ripple", dir.path())));
        assert!(cache.load(&key("ripple", dir.path()), ctx).is_none());
    }

    #[test]
    fn same_name_in_another_directory_is_a_different_entry() {
        let (dir, source) = setup();
        let ctx = ContextId::next();
        let cache = ShaderCache::new();
        cache.store(key("ripple", dir.path()), &program(7, ctx), &IsfMetadata::empty(), &source);

        assert!(!cache.is_valid(&key("ripple", Path::new("/elsewhere"))));
    }

    #[test]
    fn capture_and_samplers_are_part_of_the_key() {
        let (dir, source) = setup();
        let ctx = ContextId::next();
        let cache = ShaderCache::new();
        cache.store(key("ripple", dir.path()), &program(7, ctx), &IsfMetadata::empty(), &source);

        let other_capture = CacheKey::new("ripple", dir.path(), "otherColor", &["audioTexture"]);
        let other_samplers =
            CacheKey::new("ripple", dir.path(), "outColor", &["textureSampler", "audioTexture"]);
        assert!(cache.load(&other_capture, ctx).is_none());
        assert!(cache.load(&other_samplers, ctx).is_none());

        cache.store(other_samplers.clone(), &program(8, ctx), &IsfMetadata::empty(), &source);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.load(&key("ripple", dir.path()), ctx).unwrap().program.id().get(), 7);
        assert_eq!(cache.load(&other_samplers, ctx).unwrap().program.id().get(), 8);
    }

    #[test]
    fn store_clear_and_forget_hand_back_programs() {
        let (dir, source) = setup();
        let ctx = ContextId::next();
        let cache = ShaderCache::new();
        let first = program(7, ctx);
        let second = program(8, ctx);

        assert!(cache
            .store(key("ripple", dir.path()), &first, &IsfMetadata::empty(), &source)
            .is_none());
        // Storing the same program again replaces nothing worth releasing.
        assert!(cache
            .store(key("ripple", dir.path()), &first, &IsfMetadata::empty(), &source)
            .is_none());
        let replaced = cache
            .store(key("ripple", dir.path()), &second, &IsfMetadata::empty(), &source)
            .unwrap();
        assert!(replaced.same_program(&first));

        cache.store(key("other", dir.path()), &second, &IsfMetadata::empty(), &source);
        assert_eq!(cache.forget(&second.program).len(), 2);
        assert!(cache.is_empty());

        cache.store(key("ripple", dir.path()), &first, &IsfMetadata::empty(), &source);
        assert_eq!(cache.clear().len(), 1);
        assert_eq!(cache.len(), 0);
    }
}
