//! Typed GL object names. Zero is never a valid object, so an unallocated
//! slot is `Option::None` rather than a sentinel.

use std::num::NonZeroU32;

use gl::types::GLuint;

macro_rules! gl_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(NonZeroU32);

        impl $name {
            /// Wrap a name returned by GL; `None` for `0`.
            pub fn from_raw(raw: GLuint) -> Option<Self> {
                NonZeroU32::new(raw).map(Self)
            }

            pub fn get(self) -> GLuint {
                self.0.get()
            }
        }
    };
}

gl_handle!(ProgramId);
gl_handle!(ShaderId);
gl_handle!(BufferId);
gl_handle!(TextureId);
gl_handle!(FramebufferId);
gl_handle!(VertexArrayId);
