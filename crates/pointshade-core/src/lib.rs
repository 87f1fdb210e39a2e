//! Host-facing layer of the point shader renderer.
//!
//! Nothing in this crate touches the GPU: it parses shader metadata, keeps the
//! host parameter collection in sync with it, describes the audio and geometry
//! sources a pattern samples every frame, and turns raw feedback values into
//! packed point colors.

pub mod color;
pub mod config;
pub mod inputs;
pub mod isf;
pub mod parameters;

pub use config::{PatternConfig, Variant};
pub use isf::{extract_metadata, IsfInput, IsfMetadata, IsfType, MetadataError};
pub use parameters::{FloatParam, HostParameters, ParameterSet, ScriptParameters};

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter. `RUST_LOG` is used when unset.
pub const LOG_ENV: &str = "POINTSHADE_LOG";

/// Install a `tracing` fmt subscriber filtered by `POINTSHADE_LOG`.
///
/// Calling this more than once, or after the host installed its own
/// subscriber, is harmless.
pub fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
