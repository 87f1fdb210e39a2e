//! Linked programs and their resolved uniform locations.

use std::collections::HashMap;
use std::sync::Arc;

use gl::types::{GLint, GLuint};
use pointshade_gl::{ContextId, GlApi, ProgramId};
use tracing::debug;

/// A resolved uniform location. Only locations GL reported as active are
/// ever stored.
pub type Location = GLint;

/// Name → location table built once per compile or cache load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UniformTable {
    locations: HashMap<String, Location>,
}

impl UniformTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `location` for `name`. Negative (inactive) locations are
    /// dropped, so a later lookup reports the uniform as absent.
    pub fn insert(&mut self, name: impl Into<String>, location: Location) {
        if location >= 0 {
            self.locations.insert(name.into(), location);
        }
    }

    pub fn get(&self, name: &str) -> Option<Location> {
        self.locations.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.locations.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}

/// A GL program object together with the context that created it.
#[derive(Debug, PartialEq, Eq)]
pub struct ProgramObject {
    pub id: ProgramId,
    pub context: ContextId,
}

/// Shared by the pattern that runs a program and every cache entry pointing
/// at it.
pub type SharedProgram = Arc<ProgramObject>;

/// Everything needed to run a linked program.
#[derive(Debug, Clone)]
pub struct CompiledProgram {
    pub program: SharedProgram,
    pub uniforms: UniformTable,
    /// Attribute index of `position`, if the program reads it.
    pub position: Option<GLuint>,
    /// Name of the captured feedback varying.
    pub capture: String,
}

impl CompiledProgram {
    pub fn id(&self) -> ProgramId {
        self.program.id
    }

    pub fn context(&self) -> ContextId {
        self.program.context
    }

    pub fn same_program(&self, other: &CompiledProgram) -> bool {
        Arc::ptr_eq(&self.program, &other.program)
    }
}

/// Drop one reference to a program. The GL object is deleted only when this
/// was the last reference and `current` is the context that created it;
/// handles of a dead context are forgotten without a GL call.
///
/// Returns whether the program was deleted.
pub fn release(api: &dyn GlApi, current: ContextId, compiled: CompiledProgram) -> bool {
    let Ok(object) = Arc::try_unwrap(compiled.program) else {
        return false;
    };
    if object.context != current {
        debug!(
            program = object.id.get(),
            "dropping program of a previous context"
        );
        return false;
    }
    api.delete_program(object.id.get());
    debug!(program = object.id.get(), "deleted program");
    true
}
