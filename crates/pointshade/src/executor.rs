//! One transform-feedback pass per frame.
//!
//! The executor uploads the point positions, runs the vertex program once
//! per point with rasterization disabled, and reads the captured colors back
//! into a [`FeedbackBuffer`]. A failing step abandons the rest of the frame;
//! the GL state is restored whatever happened.

use gl::types::{GLsizei, GLuint};
use pointshade_core::inputs::PointSource;
use pointshade_gl::{
    check_error, BufferId, GlApi, GlError, TextureId, TextureLimits, VertexArrayId,
};
use thiserror::Error;
use tracing::{error, trace, warn};

use crate::program::{CompiledProgram, Location};

/// Floats captured per point (`vec3`).
pub const FEEDBACK_COMPONENTS: usize = 3;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("program has no active `position` attribute")]
    MissingPosition,
    #[error("could not create frame buffers")]
    Buffers,
    #[error(transparent)]
    Gl(#[from] GlError),
}

/// Colors of the last successful readback, three floats per point.
#[derive(Debug, Default)]
pub struct FeedbackBuffer {
    data: Vec<f32>,
    scratch: Vec<f32>,
    valid: bool,
}

impl FeedbackBuffer {
    fn resize(&mut self, points: usize) {
        let len = points * FEEDBACK_COMPONENTS;
        if self.data.len() != len {
            self.data = vec![0.0; len];
            self.scratch = vec![0.0; len];
            self.valid = false;
        }
    }

    /// Whether at least one frame has been read back since the last resize.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn point_count(&self) -> usize {
        self.data.len() / FEEDBACK_COMPONENTS
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureBinding {
    pub location: Location,
    pub unit: u32,
    pub texture: TextureId,
}

/// Everything one frame binds, resolved by the pattern beforehand.
#[derive(Debug)]
pub struct FrameBindings<'a> {
    pub program: &'a CompiledProgram,
    /// Float uniforms: the clock and the live script parameter values.
    pub uniforms: Vec<(Location, f32)>,
    pub textures: Vec<TextureBinding>,
}

#[derive(Debug)]
pub struct FrameExecutor {
    limits: TextureLimits,
    vao: Option<VertexArrayId>,
    positions_buffer: Option<BufferId>,
    feedback_buffer: Option<BufferId>,
    /// Point count the feedback buffer is sized for.
    capacity: usize,
    positions: Vec<f32>,
    feedback: FeedbackBuffer,
}

impl FrameExecutor {
    pub fn new(limits: TextureLimits) -> Self {
        Self {
            limits,
            vao: None,
            positions_buffer: None,
            feedback_buffer: None,
            capacity: 0,
            positions: Vec::new(),
            feedback: FeedbackBuffer::default(),
        }
    }

    pub fn feedback(&self) -> &FeedbackBuffer {
        &self.feedback
    }

    /// Run one pass. Errors are logged here as well as returned.
    pub fn run(
        &mut self,
        api: &dyn GlApi,
        points: &dyn PointSource,
        bindings: &FrameBindings<'_>,
    ) -> Result<(), FrameError> {
        let Some(position) = bindings.program.position else {
            error!(
                program = bindings.program.id().get(),
                "skipping frame: no `position` attribute"
            );
            return Err(FrameError::MissingPosition);
        };
        let count = points.point_count();
        if count == 0 {
            return Ok(());
        }

        let result = self.passes(api, points, bindings, position, count);
        self.restore(api, bindings, position);
        result
    }

    fn passes(
        &mut self,
        api: &dyn GlApi,
        points: &dyn PointSource,
        bindings: &FrameBindings<'_>,
        position: GLuint,
        count: usize,
    ) -> Result<(), FrameError> {
        let (vao, vbo, tbo) = self.ensure_buffers(api, count)?;

        self.positions.resize(count * 3, 0.0);
        points.fill_positions(&mut self.positions);

        api.bind_vertex_array(vao.get());
        api.bind_buffer(gl::ARRAY_BUFFER, vbo.get());
        api.buffer_data_f32(gl::ARRAY_BUFFER, &self.positions, gl::STREAM_DRAW);
        api.enable_vertex_attrib_array(position);
        api.vertex_attrib_pointer_f32(position, 3);
        api.bind_buffer_base(gl::TRANSFORM_FEEDBACK_BUFFER, 0, tbo.get());
        check_error(api, "vertex upload")?;

        api.enable(gl::RASTERIZER_DISCARD);
        api.use_program(bindings.program.id().get());
        check_error(api, "program activation")?;

        for (location, value) in &bindings.uniforms {
            api.uniform_1f(*location, *value);
        }
        check_error(api, "uniform upload")?;

        for binding in &bindings.textures {
            if !self.limits.allows_unit(binding.unit) {
                warn!(unit = binding.unit, "texture unit beyond the context limit, skipping");
                continue;
            }
            api.active_texture(binding.unit);
            api.bind_texture(gl::TEXTURE_2D, binding.texture.get());
            api.uniform_1i(binding.location, binding.unit as i32);
        }
        api.active_texture(0);
        check_error(api, "texture binding")?;

        let draw_count = GLsizei::try_from(count).unwrap_or(GLsizei::MAX);
        api.begin_transform_feedback(gl::POINTS);
        api.draw_arrays(gl::POINTS, 0, draw_count);
        api.end_transform_feedback();
        api.flush();
        check_error(api, "feedback draw")?;

        api.bind_buffer(gl::TRANSFORM_FEEDBACK_BUFFER, tbo.get());
        api.get_buffer_sub_data_f32(gl::TRANSFORM_FEEDBACK_BUFFER, &mut self.feedback.scratch);
        check_error(api, "feedback readback")?;
        std::mem::swap(&mut self.feedback.data, &mut self.feedback.scratch);
        self.feedback.valid = true;

        trace!(points = count, "frame complete");
        Ok(())
    }

    fn restore(&self, api: &dyn GlApi, bindings: &FrameBindings<'_>, position: GLuint) {
        for binding in &bindings.textures {
            if self.limits.allows_unit(binding.unit) {
                api.active_texture(binding.unit);
                api.bind_texture(gl::TEXTURE_2D, 0);
            }
        }
        api.active_texture(0);
        api.use_program(0);
        api.disable(gl::RASTERIZER_DISCARD);
        api.disable_vertex_attrib_array(position);
        api.bind_buffer_base(gl::TRANSFORM_FEEDBACK_BUFFER, 0, 0);
        api.bind_buffer(gl::TRANSFORM_FEEDBACK_BUFFER, 0);
        api.bind_buffer(gl::ARRAY_BUFFER, 0);
        api.bind_vertex_array(0);
        let _ = check_error(api, "frame state restore");
    }

    fn ensure_buffers(
        &mut self,
        api: &dyn GlApi,
        count: usize,
    ) -> Result<(VertexArrayId, BufferId, BufferId), FrameError> {
        if self.vao.is_none() {
            self.vao = VertexArrayId::from_raw(api.gen_vertex_array());
        }
        if self.positions_buffer.is_none() {
            self.positions_buffer = BufferId::from_raw(api.gen_buffer());
        }
        if self.feedback_buffer.is_none() {
            self.feedback_buffer = BufferId::from_raw(api.gen_buffer());
            self.capacity = 0;
        }
        let (Some(vao), Some(vbo), Some(tbo)) =
            (self.vao, self.positions_buffer, self.feedback_buffer)
        else {
            check_error(api, "frame buffer creation")?;
            return Err(FrameError::Buffers);
        };

        if self.capacity != count {
            api.bind_buffer(gl::TRANSFORM_FEEDBACK_BUFFER, tbo.get());
            api.buffer_data_uninit(
                gl::TRANSFORM_FEEDBACK_BUFFER,
                count * FEEDBACK_COMPONENTS * std::mem::size_of::<f32>(),
                gl::STATIC_READ,
            );
            api.bind_buffer(gl::TRANSFORM_FEEDBACK_BUFFER, 0);
            check_error(api, "feedback buffer allocation")?;
            self.capacity = count;
            self.feedback.resize(count);
        }
        Ok((vao, vbo, tbo))
    }

    /// Delete the buffers. Safe to call repeatedly.
    pub fn dispose(&mut self, api: &dyn GlApi) {
        if let Some(vao) = self.vao.take() {
            api.delete_vertex_array(vao.get());
        }
        for buffer in [self.positions_buffer.take(), self.feedback_buffer.take()]
            .into_iter()
            .flatten()
        {
            api.delete_buffer(buffer.get());
        }
        self.capacity = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use pointshade_core::inputs::StaticPoints;
    use pointshade_gl::testing::{FakeGl, ObjectKind};
    use pointshade_gl::{ContextId, ProgramId};

    use crate::program::{ProgramObject, UniformTable};

    const SOURCE: &str = "in vec3 position;\nout vec3 outColor;\nuniform float fTime;\nuniform sampler2D audioTexture;\n";

    fn linked(api: &FakeGl) -> CompiledProgram {
        let program = api.create_program();
        let shader = api.create_shader(gl::VERTEX_SHADER);
        api.shader_source(shader, SOURCE);
        api.attach_shader(program, shader);
        api.transform_feedback_varyings(program, &["outColor"]);
        assert!(api.link_program(program));
        api.delete_shader(shader);

        let mut uniforms = UniformTable::new();
        uniforms.insert("fTime", api.uniform_location(program, "fTime"));
        uniforms.insert("audioTexture", api.uniform_location(program, "audioTexture"));
        CompiledProgram {
            program: Arc::new(ProgramObject {
                id: ProgramId::from_raw(program).unwrap(),
                context: ContextId::next(),
            }),
            uniforms,
            position: Some(0),
            capture: "outColor".to_string(),
        }
    }

    fn points() -> StaticPoints {
        StaticPoints::new(vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]])
    }

    #[test]
    fn draws_one_point_per_vertex_and_reads_back() {
        let api = FakeGl::new();
        let program = linked(&api);
        let texture = TextureId::from_raw(api.gen_texture()).unwrap();
        api.set_feedback(vec![1.0, 0.5, 0.0, 0.0, 0.25, 1.0]);

        let mut executor = FrameExecutor::new(TextureLimits::default());
        let bindings = FrameBindings {
            program: &program,
            uniforms: vec![(program.uniforms.get("fTime").unwrap(), 2.5)],
            textures: vec![TextureBinding {
                location: program.uniforms.get("audioTexture").unwrap(),
                unit: 3,
                texture,
            }],
        };
        executor.run(&api, &points(), &bindings).unwrap();

        assert_eq!(api.draws(), [(gl::POINTS, 0, 2)]);
        assert_eq!(api.uniform_value("fTime"), Some(2.5));
        assert_eq!(api.uniform_value("audioTexture"), Some(3.0));
        assert_eq!(api.texture_at_draw(3), Some(texture.get()));
        assert!(executor.feedback().is_valid());
        assert_eq!(executor.feedback().as_slice(), [1.0, 0.5, 0.0, 0.0, 0.25, 1.0]);

        // State is back to normal.
        assert_eq!(api.current_program(), 0);
        assert!(!api.is_enabled(gl::RASTERIZER_DISCARD));
        assert_eq!(api.texture_on_unit(3), None);
    }

    #[test]
    fn gl_error_abandons_the_frame_but_restores_state() {
        let api = FakeGl::new();
        let program = linked(&api);
        api.set_feedback(vec![1.0; 6]);
        let mut executor = FrameExecutor::new(TextureLimits::default());
        let bindings = FrameBindings {
            program: &program,
            uniforms: Vec::new(),
            textures: Vec::new(),
        };
        executor.run(&api, &points(), &bindings).unwrap();

        api.fail_op("draw_arrays", gl::INVALID_OPERATION);
        api.set_feedback(vec![0.0; 6]);
        assert!(matches!(
            executor.run(&api, &points(), &bindings),
            Err(FrameError::Gl(_))
        ));
        // The previous colors are kept.
        assert_eq!(executor.feedback().as_slice(), [1.0; 6]);
        assert_eq!(api.current_program(), 0);
        assert!(!api.is_enabled(gl::RASTERIZER_DISCARD));
        assert_eq!(api.call_count("get_buffer_sub_data_f32"), 1);
    }

    #[test]
    fn missing_position_skips_the_frame() {
        let api = FakeGl::new();
        let mut program = linked(&api);
        program.position = None;
        let mut executor = FrameExecutor::new(TextureLimits::default());
        let bindings = FrameBindings {
            program: &program,
            uniforms: Vec::new(),
            textures: Vec::new(),
        };

        assert!(matches!(
            executor.run(&api, &points(), &bindings),
            Err(FrameError::MissingPosition)
        ));
        assert!(api.draws().is_empty());
    }

    #[test]
    fn units_beyond_the_limit_are_skipped() {
        let api = FakeGl::new();
        let program = linked(&api);
        let texture = TextureId::from_raw(api.gen_texture()).unwrap();
        let limits = TextureLimits {
            max_texture_units: 2,
            ..TextureLimits::default()
        };
        let mut executor = FrameExecutor::new(limits);
        let bindings = FrameBindings {
            program: &program,
            uniforms: Vec::new(),
            textures: vec![TextureBinding {
                location: program.uniforms.get("audioTexture").unwrap(),
                unit: 3,
                texture,
            }],
        };
        executor.run(&api, &points(), &bindings).unwrap();
        assert_eq!(api.texture_at_draw(3), None);
    }

    #[test]
    fn feedback_buffer_is_sized_for_the_points_and_disposed_once() {
        let api = FakeGl::new();
        let program = linked(&api);
        let mut executor = FrameExecutor::new(TextureLimits::default());
        let bindings = FrameBindings {
            program: &program,
            uniforms: Vec::new(),
            textures: Vec::new(),
        };
        executor.run(&api, &points(), &bindings).unwrap();
        assert_eq!(executor.feedback().point_count(), 2);
        let tbo = executor.feedback_buffer.unwrap().get();
        assert_eq!(api.buffer_size(tbo), Some(2 * 3 * 4));

        executor.dispose(&api);
        executor.dispose(&api);
        assert_eq!(api.live_count(ObjectKind::Buffer), 0);
        assert_eq!(api.live_count(ObjectKind::VertexArray), 0);
        assert_eq!(api.double_frees(), 0);
    }
}
