//! GL error polling.

use gl::types::GLenum;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use thiserror::Error;
use tracing::error;

use crate::GlApi;

/// Error flags reported by `glGetError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum GlErrorCode {
    InvalidEnum = 0x0500,
    InvalidValue = 0x0501,
    InvalidOperation = 0x0502,
    StackOverflow = 0x0503,
    StackUnderflow = 0x0504,
    OutOfMemory = 0x0505,
    InvalidFramebufferOperation = 0x0506,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GlError {
    #[error("{op} raised {code:?}")]
    Call { op: &'static str, code: GlErrorCode },
    #[error("{op} raised unknown GL error 0x{raw:04x}")]
    Unknown { op: &'static str, raw: GLenum },
    #[error("{op} returned no object")]
    NoObject { op: &'static str },
    #[error("no OpenGL context is current")]
    NotCurrent,
}

impl GlError {
    pub fn op(&self) -> Option<&'static str> {
        match self {
            GlError::Call { op, .. }
            | GlError::Unknown { op, .. }
            | GlError::NoObject { op } => Some(op),
            GlError::NotCurrent => None,
        }
    }
}

/// Upper bound on flags drained in one poll; a lost context can report
/// errors forever.
const MAX_DRAIN: usize = 16;

/// Poll the error flags after `op`. The first flag is reported and logged,
/// any others are drained.
pub fn check_error(api: &dyn GlApi, op: &'static str) -> Result<(), GlError> {
    let raw = api.get_error();
    if raw == gl::NO_ERROR {
        return Ok(());
    }
    clear_errors(api);

    let err = match GlErrorCode::from_u32(raw) {
        Some(code) => GlError::Call { op, code },
        None => GlError::Unknown { op, raw },
    };
    error!(op, %err, "GL call failed");
    Err(err)
}

/// Discard every pending error flag.
pub fn clear_errors(api: &dyn GlApi) {
    for _ in 0..MAX_DRAIN {
        if api.get_error() == gl::NO_ERROR {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeGl;

    #[test]
    fn decodes_known_codes() {
        let api = FakeGl::new();
        api.fail_op("draw_arrays", gl::INVALID_OPERATION);
        api.draw_arrays(gl::POINTS, 0, 1);

        let err = check_error(&api, "draw").unwrap_err();
        assert_eq!(
            err,
            GlError::Call {
                op: "draw",
                code: GlErrorCode::InvalidOperation
            }
        );
        assert_eq!(err.op(), Some("draw"));
        assert!(check_error(&api, "draw").is_ok());
    }

    #[test]
    fn unknown_codes_are_kept_raw() {
        let api = FakeGl::new();
        api.fail_op("flush", 0x9999);
        api.flush();
        assert!(matches!(
            check_error(&api, "flush"),
            Err(GlError::Unknown { raw: 0x9999, .. })
        ));
    }

    #[test]
    fn clear_drains_pending_flags() {
        let api = FakeGl::new();
        api.fail_op("flush", gl::OUT_OF_MEMORY);
        api.flush();
        api.flush();
        clear_errors(&api);
        assert_eq!(api.get_error(), gl::NO_ERROR);
    }
}
