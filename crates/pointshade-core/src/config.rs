use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories_next::ProjectDirs;
use serde::Deserialize;

const QUALIFIER: &str = "xyz";
const ORGANISATION: &str = "theforks";
const APPLICATION: &str = "pointshade";

pub const DEFAULT_SPEED: f32 = 1.0;
pub const DEFAULT_ALPHA_THRESHOLD: f32 = 0.1;
pub const DEFAULT_FLUID_TEXTURE_SIZE: u32 = 256;
pub const DEFAULT_CAPTURE_VARYING: &str = "outColor";

/// Which family of textures a pattern samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Ping-pong velocity/pressure/density simulation textures.
    #[default]
    Fluid,
    /// A directory of still images addressed by the `frame` parameter.
    Frames,
}

impl Variant {
    pub fn default_script(self) -> &'static str {
        match self {
            Variant::Fluid => "navierStokes",
            Variant::Frames => "texture",
        }
    }
}

/// Construction-time settings of a shader pattern.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PatternConfig {
    pub shader_dir: PathBuf,
    /// Falls back to the variant's bundled shader when unset.
    pub script_name: Option<String>,
    pub variant: Variant,
    pub speed: f32,
    pub alpha_threshold: f32,
    pub caching_enabled: bool,
    pub fluid_texture_size: u32,
    pub frame_dir: Option<PathBuf>,
    pub capture_varying: String,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            shader_dir: default_shader_dir(),
            script_name: None,
            variant: Variant::default(),
            speed: DEFAULT_SPEED,
            alpha_threshold: DEFAULT_ALPHA_THRESHOLD,
            caching_enabled: true,
            fluid_texture_size: DEFAULT_FLUID_TEXTURE_SIZE,
            frame_dir: None,
            capture_varying: DEFAULT_CAPTURE_VARYING.to_string(),
        }
    }
}

impl PatternConfig {
    pub fn for_variant(variant: Variant) -> Self {
        Self {
            variant,
            ..Self::default()
        }
    }

    pub fn from_toml_str(input: &str) -> Result<Self> {
        toml::from_str(input).context("invalid pattern configuration")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("in {}", path.display()))
    }

    pub fn script_name(&self) -> &str {
        self.script_name
            .as_deref()
            .unwrap_or_else(|| self.variant.default_script())
    }
}

/// `<data dir>/pointshade/shaders`, or `./shaders` when the platform has no
/// home directory.
pub fn default_shader_dir() -> PathBuf {
    ProjectDirs::from(QUALIFIER, ORGANISATION, APPLICATION)
        .map(|dirs| dirs.data_dir().join("shaders"))
        .unwrap_or_else(|| PathBuf::from("shaders"))
}
