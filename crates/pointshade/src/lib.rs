//! Shader-driven point rendering.
//!
//! A [`ShaderPattern`] runs a vertex shader once per light-fixture point with
//! transform feedback and turns the captured colors into packed point colors.
//! Shaders are plain files with an ISF metadata header; their inputs become
//! host parameters, and linked programs are shared between patterns through a
//! [`ShaderCache`].
//!
//! ```no_run
//! use pointshade::{DefaultShaders, ShaderCache, ShaderPattern};
//! use pointshade_core::inputs::StaticPoints;
//! use pointshade_core::{ParameterSet, PatternConfig};
//! use pointshade_gl::{HostContext, RawGl};
//!
//! # fn main() -> anyhow::Result<()> {
//! pointshade_core::init_logging();
//! let config = PatternConfig::default();
//! DefaultShaders::export(&config.shader_dir)?;
//!
//! let gl = RawGl::load();
//! let context = HostContext::new(gl);
//! let points = StaticPoints::new(vec![[0.0, 0.0, 0.0], [0.5, 0.5, 0.0]]);
//! let mut pattern = ShaderPattern::new(
//!     gl,
//!     context,
//!     ParameterSet::new(),
//!     config,
//!     ShaderCache::shared(),
//!     Box::new(points),
//! )?;
//!
//! let mut colors = vec![0; 2];
//! pattern.run(16.0, &mut colors);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod compile;
pub mod defaults;
pub mod executor;
pub mod fingerprint;
pub mod pattern;
pub mod program;
pub mod source;
pub mod variant;

pub use cache::{CacheEntry, CacheKey, CachedResult, ShaderCache, SharedShaderCache};
pub use compile::{compile_program, resolve_uniforms, CompileError, ShaderStage};
pub use defaults::{DefaultShaders, Exporter};
pub use executor::{FeedbackBuffer, FrameBindings, FrameError, FrameExecutor};
pub use fingerprint::{FileStamp, Fingerprint};
pub use pattern::{ReloadError, ShaderPattern};
pub use program::{CompiledProgram, Location, SharedProgram, UniformTable};
pub use source::{load_shader, ShaderSource, SourceError};
