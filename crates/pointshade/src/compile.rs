//! Turning shader text into a linked transform-feedback program.

use std::fmt;
use std::sync::Arc;

use gl::types::GLuint;
use pointshade_core::IsfMetadata;
use pointshade_gl::{check_error, clear_errors, ContextId, GlApi, GlError, ProgramId, ShaderId};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::program::{CompiledProgram, ProgramObject, UniformTable};

/// Uniform names bound to the simulation clock.
pub const TIME_UNIFORMS: [&str; 2] = ["fTime", "time"];

/// Vertex attribute holding the point position.
pub const POSITION_ATTRIBUTE: &str = "position";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
}

impl ShaderStage {
    fn gl_kind(self) -> gl::types::GLenum {
        match self {
            ShaderStage::Vertex => gl::VERTEX_SHADER,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
        }
    }
}

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("could not create a program object")]
    CreateProgram,
    #[error("could not create a {stage} shader object")]
    CreateShader { stage: ShaderStage },
    #[error("{stage} shader failed to compile: {log}")]
    Stage { stage: ShaderStage, log: String },
    #[error("program failed to link: {log}")]
    Link { log: String },
    #[error(transparent)]
    Gl(#[from] GlError),
}

/// Compile `source` as the vertex stage of a new program capturing
/// `capture` through transform feedback, then resolve every uniform it may
/// be fed.
///
/// On failure every object created here has been deleted again.
pub fn compile_program(
    api: &dyn GlApi,
    context: ContextId,
    name: &str,
    source: &str,
    capture: &str,
    meta: &IsfMetadata,
    samplers: &[&str],
) -> Result<CompiledProgram, CompileError> {
    clear_errors(api);

    let program = ProgramId::from_raw(api.create_program()).ok_or(CompileError::CreateProgram)?;
    let result = build(api, program, source, capture).and_then(|()| {
        check_error(api, "program link")?;
        Ok(())
    });
    if let Err(err) = result {
        api.delete_program(program.get());
        error!(shader = %name, %err, "shader compilation failed");
        return Err(err);
    }

    let uniforms = resolve_uniforms(api, program, meta, samplers);
    let position = GLuint::try_from(api.attrib_location(program.get(), POSITION_ATTRIBUTE)).ok();
    if position.is_none() {
        // The program stays usable; frames report the missing attribute.
        error!(shader = %name, "program has no active `position` attribute");
    }

    info!(
        shader = %name,
        program = program.get(),
        uniforms = uniforms.len(),
        "compiled shader"
    );
    Ok(CompiledProgram {
        program: Arc::new(ProgramObject {
            id: program,
            context,
        }),
        uniforms,
        position,
        capture: capture.to_string(),
    })
}

fn build(api: &dyn GlApi, program: ProgramId, source: &str, capture: &str) -> Result<(), CompileError> {
    let stage = ShaderStage::Vertex;
    let shader = ShaderId::from_raw(api.create_shader(stage.gl_kind()))
        .ok_or(CompileError::CreateShader { stage })?;

    api.shader_source(shader.get(), source);
    if !api.compile_shader(shader.get()) {
        let log = api.shader_info_log(shader.get());
        api.delete_shader(shader.get());
        return Err(CompileError::Stage { stage, log });
    }

    api.attach_shader(program.get(), shader.get());
    // Capture declarations are fixed at link time.
    api.transform_feedback_varyings(program.get(), &[capture]);
    let linked = api.link_program(program.get());
    api.detach_shader(program.get(), shader.get());
    api.delete_shader(shader.get());

    if !linked {
        return Err(CompileError::Link {
            log: api.program_info_log(program.get()),
        });
    }
    Ok(())
}

/// Look up every metadata input, the time uniforms and `samplers` in
/// `program`. Names that are not active are left out of the table.
pub fn resolve_uniforms(
    api: &dyn GlApi,
    program: ProgramId,
    meta: &IsfMetadata,
    samplers: &[&str],
) -> UniformTable {
    let mut table = UniformTable::new();
    let names = meta
        .names()
        .chain(TIME_UNIFORMS)
        .chain(samplers.iter().copied());
    for name in names {
        let location = api.uniform_location(program.get(), name);
        if location < 0 {
            debug!(uniform = %name, "uniform not active");
        } else {
            debug!(uniform = %name, location, "resolved uniform");
        }
        table.insert(name, location);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use pointshade_core::extract_metadata;
    use pointshade_gl::testing::{FakeGl, ObjectKind};

    const RIPPLE: &str = r#"/*{"INPUTS":[{"NAME":"amp","DEFAULT":0.5,"MIN":0,"MAX":1}]}*/
#version 330
in vec3 position;
out vec3 outColor;
uniform float fTime;
uniform float amp;
void main() { outColor = vec3(amp * sin(fTime + position.x)); }
"#;

    fn compile(api: &FakeGl, source: &str) -> Result<CompiledProgram, CompileError> {
        let meta = extract_metadata(source).unwrap_or_default();
        compile_program(
            api,
            ContextId::next(),
            "ripple",
            source,
            "outColor",
            &meta,
            &["audioTexture"],
        )
    }

    #[test]
    fn resolves_declared_uniforms_and_position() {
        let api = FakeGl::new();
        let compiled = compile(&api, RIPPLE).unwrap();

        assert!(compiled.uniforms.contains("amp"));
        assert!(compiled.uniforms.contains("fTime"));
        assert!(!compiled.uniforms.contains("time"));
        assert!(!compiled.uniforms.contains("audioTexture"));
        assert_eq!(compiled.position, Some(0));
        assert_eq!(api.varyings(compiled.id().get()), ["outColor"]);
        // Only the program survives; the shader object is gone.
        assert_eq!(api.live_count(ObjectKind::Shader), 0);
        assert_eq!(api.live_count(ObjectKind::Program), 1);
    }

    #[test]
    fn compile_failure_deletes_everything() {
        let api = FakeGl::new();
        let err = compile(&api, "#error broken\nvoid main() {}\n").unwrap_err();

        match err {
            CompileError::Stage { stage, log } => {
                assert_eq!(stage, ShaderStage::Vertex);
                assert!(log.contains("broken"));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(api.live_objects(), 0);
    }

    #[test]
    fn link_failure_deletes_program() {
        let api = FakeGl::new();
        // Declares no `outColor`, so the feedback varying cannot be captured.
        let err = compile(&api, "in vec3 position;\nvoid main() {}\n").unwrap_err();

        assert!(matches!(err, CompileError::Link { .. }));
        assert_eq!(api.live_objects(), 0);
    }

    #[test]
    fn gl_error_after_link_is_reported() {
        let api = FakeGl::new();
        api.fail_op("link_program", gl::OUT_OF_MEMORY);
        let err = compile(&api, RIPPLE).unwrap_err();

        assert!(matches!(err, CompileError::Gl(GlError::Call { .. })));
        assert_eq!(api.live_objects(), 0);
    }

    #[test]
    fn missing_position_is_tolerated_at_compile_time() {
        let api = FakeGl::new();
        let compiled = compile(&api, "out vec3 outColor;\nvoid main() {}\n").unwrap();
        assert_eq!(compiled.position, None);
    }
}
