use gl::types::{GLenum, GLint, GLsizei, GLuint};

/// The subset of OpenGL 3.3 used by the renderer.
///
/// Handles are raw GL names; `0` means "no object" exactly as in GL. Methods
/// take `&self` so an implementation can be shared by the state objects that
/// borrow it during a frame. Every method assumes the caller holds the GL
/// context (see [`crate::ContextGuard`]).
pub trait GlApi {
    // Programs and shaders
    fn create_program(&self) -> GLuint;
    fn delete_program(&self, program: GLuint);
    fn create_shader(&self, kind: GLenum) -> GLuint;
    fn delete_shader(&self, shader: GLuint);
    fn shader_source(&self, shader: GLuint, source: &str);
    /// Compile and return the `COMPILE_STATUS`.
    fn compile_shader(&self, shader: GLuint) -> bool;
    fn shader_info_log(&self, shader: GLuint) -> String;
    fn attach_shader(&self, program: GLuint, shader: GLuint);
    fn detach_shader(&self, program: GLuint, shader: GLuint);
    /// Declare interleaved transform feedback captures. Must precede linking.
    fn transform_feedback_varyings(&self, program: GLuint, varyings: &[&str]);
    /// Link and return the `LINK_STATUS`.
    fn link_program(&self, program: GLuint) -> bool;
    fn program_info_log(&self, program: GLuint) -> String;
    fn uniform_location(&self, program: GLuint, name: &str) -> GLint;
    fn attrib_location(&self, program: GLuint, name: &str) -> GLint;
    fn use_program(&self, program: GLuint);
    fn uniform_1f(&self, location: GLint, value: f32);
    fn uniform_1i(&self, location: GLint, value: GLint);

    // Buffers and vertex arrays
    fn gen_buffer(&self) -> GLuint;
    fn delete_buffer(&self, buffer: GLuint);
    fn bind_buffer(&self, target: GLenum, buffer: GLuint);
    fn buffer_data_f32(&self, target: GLenum, data: &[f32], usage: GLenum);
    fn buffer_data_uninit(&self, target: GLenum, size_bytes: usize, usage: GLenum);
    fn bind_buffer_base(&self, target: GLenum, index: GLuint, buffer: GLuint);
    /// Read `out.len()` floats from the start of the buffer bound to `target`.
    fn get_buffer_sub_data_f32(&self, target: GLenum, out: &mut [f32]);
    fn gen_vertex_array(&self) -> GLuint;
    fn delete_vertex_array(&self, vao: GLuint);
    fn bind_vertex_array(&self, vao: GLuint);
    fn enable_vertex_attrib_array(&self, index: GLuint);
    fn disable_vertex_attrib_array(&self, index: GLuint);
    /// Tightly packed float attribute with `components` per vertex.
    fn vertex_attrib_pointer_f32(&self, index: GLuint, components: GLint);

    // Textures
    fn gen_texture(&self) -> GLuint;
    fn delete_texture(&self, texture: GLuint);
    /// Select texture unit `unit` (an index, not `TEXTURE0 + unit`).
    fn active_texture(&self, unit: u32);
    fn bind_texture(&self, target: GLenum, texture: GLuint);
    #[allow(clippy::too_many_arguments)]
    fn tex_image_2d(
        &self,
        target: GLenum,
        internal_format: GLint,
        width: GLsizei,
        height: GLsizei,
        format: GLenum,
        ty: GLenum,
        data: Option<&[u8]>,
    );
    fn tex_sub_image_2d(
        &self,
        target: GLenum,
        width: GLsizei,
        height: GLsizei,
        format: GLenum,
        ty: GLenum,
        data: &[u8],
    );
    fn tex_parameter_i(&self, target: GLenum, pname: GLenum, value: GLint);
    fn pixel_store_i(&self, pname: GLenum, value: GLint);

    // Framebuffers
    fn gen_framebuffer(&self) -> GLuint;
    fn delete_framebuffer(&self, framebuffer: GLuint);
    fn bind_framebuffer(&self, target: GLenum, framebuffer: GLuint);
    fn framebuffer_texture_2d(
        &self,
        target: GLenum,
        attachment: GLenum,
        tex_target: GLenum,
        texture: GLuint,
    );
    fn check_framebuffer_status(&self, target: GLenum) -> GLenum;

    // Pipeline state and draws
    fn enable(&self, cap: GLenum);
    fn disable(&self, cap: GLenum);
    fn begin_transform_feedback(&self, primitive: GLenum);
    fn end_transform_feedback(&self);
    fn draw_arrays(&self, mode: GLenum, first: GLint, count: GLsizei);
    fn flush(&self);

    // Queries
    fn get_error(&self) -> GLenum;
    fn get_integer(&self, pname: GLenum) -> GLint;
    /// `GL_VERSION`, or `None` when no context is current.
    fn version_string(&self) -> Option<String>;
}
