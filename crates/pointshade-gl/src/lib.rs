//! Raw OpenGL access for the point shader renderer.
//!
//! Everything above this crate talks to the GPU through the [`GlApi`] trait.
//! [`RawGl`] forwards to the `gl` crate against whatever context the host has
//! made current; the `testing` feature adds a recording fake.

pub mod api;
pub mod context;
pub mod handles;
pub mod limits;
pub mod raw;
pub mod validate;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use api::GlApi;
pub use context::{ContextGuard, ContextId, GlContext, HostContext};
pub use handles::{BufferId, FramebufferId, ProgramId, ShaderId, TextureId, VertexArrayId};
pub use limits::TextureLimits;
pub use raw::RawGl;
pub use validate::{check_error, clear_errors, GlError, GlErrorCode};

/// Location value GL returns for names that are not active in a program.
pub const NO_LOCATION: i32 = -1;
