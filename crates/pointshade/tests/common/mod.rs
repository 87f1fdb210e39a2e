#![allow(dead_code)]

use std::fs;
use std::path::Path;

use pointshade::{DefaultShaders, ShaderCache, ShaderPattern, SharedShaderCache};
use pointshade_core::inputs::StaticPoints;
use pointshade_core::{ParameterSet, PatternConfig, Variant};
use pointshade_gl::testing::{FakeContext, FakeGl};
use tempfile::TempDir;

pub type TestPattern = ShaderPattern<FakeGl, FakeContext, ParameterSet>;

pub struct Rig {
    pub gl: FakeGl,
    pub context: FakeContext,
    pub cache: SharedShaderCache,
    pub shaders: TempDir,
}

impl Rig {
    /// A shader directory holding the bundled shaders.
    pub fn new() -> Self {
        let shaders = tempfile::tempdir().unwrap();
        DefaultShaders::export(shaders.path()).unwrap();
        Self {
            gl: FakeGl::new(),
            context: FakeContext::new(),
            cache: ShaderCache::shared(),
            shaders,
        }
    }

    pub fn dir(&self) -> &Path {
        self.shaders.path()
    }

    pub fn write(&self, name: &str, text: &str) {
        fs::write(self.dir().join(name), text).unwrap();
    }

    pub fn config(&self, variant: Variant, script: &str) -> PatternConfig {
        PatternConfig {
            shader_dir: self.dir().to_path_buf(),
            script_name: Some(script.to_string()),
            variant,
            fluid_texture_size: 8,
            ..PatternConfig::default()
        }
    }

    pub fn pattern_with(&self, config: PatternConfig) -> TestPattern {
        ShaderPattern::new(
            self.gl.clone(),
            self.context.clone(),
            ParameterSet::new(),
            config,
            self.cache.clone(),
            Box::new(two_points()),
        )
        .unwrap()
    }

    pub fn pattern(&self, script: &str) -> TestPattern {
        self.pattern_with(self.config(Variant::Fluid, script))
    }
}

pub fn two_points() -> StaticPoints {
    StaticPoints::new(vec![[-0.5, 0.0, 0.0], [0.5, 0.0, 0.0]])
}
