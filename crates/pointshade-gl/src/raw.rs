//! [`GlApi`] over the host's current OpenGL context.

use std::ffi::{c_void, CStr, CString};
use std::ptr;
use std::sync::Once;

use gl::types::{GLchar, GLenum, GLint, GLsizei, GLsizeiptr, GLuint};

use crate::GlApi;

static GL_INIT_ONCE: Once = Once::new();

/// Forwards every call to the `gl` crate.
///
/// The host owns the context: `RawGl` never creates one, it only assumes one
/// is current whenever a method is called.
#[derive(Debug, Clone, Copy)]
pub struct RawGl {
    _private: (),
}

impl RawGl {
    /// Load GL function pointers (exactly once per process) and return the
    /// backend.
    pub fn load() -> Self {
        GL_INIT_ONCE.call_once(|| {
            gl_loader::init_gl();
            gl::load_with(|s| gl_loader::get_proc_address(s).cast());
        });
        Self { _private: () }
    }

    /// Whether the host has a context current on this thread.
    pub fn is_context_current(&self) -> bool {
        unsafe { !gl::GetString(gl::VERSION).is_null() }
    }
}

fn info_log(len: GLint, fetch: impl FnOnce(GLsizei, *mut GLsizei, *mut GLchar)) -> String {
    if len <= 0 {
        return String::new();
    }
    let mut buf = vec![0u8; len as usize];
    let mut written: GLsizei = 0;
    fetch(len, &mut written, buf.as_mut_ptr().cast());
    buf.truncate(written.max(0) as usize);
    String::from_utf8_lossy(&buf).trim_end().to_string()
}

fn gen_one(gen: unsafe fn(GLsizei, *mut GLuint)) -> GLuint {
    let mut id: GLuint = 0;
    unsafe { gen(1, &mut id) };
    id
}

impl GlApi for RawGl {
    fn create_program(&self) -> GLuint {
        unsafe { gl::CreateProgram() }
    }

    fn delete_program(&self, program: GLuint) {
        unsafe { gl::DeleteProgram(program) }
    }

    fn create_shader(&self, kind: GLenum) -> GLuint {
        unsafe { gl::CreateShader(kind) }
    }

    fn delete_shader(&self, shader: GLuint) {
        unsafe { gl::DeleteShader(shader) }
    }

    fn shader_source(&self, shader: GLuint, source: &str) {
        let ptr = source.as_ptr() as *const GLchar;
        let len = source.len() as GLint;
        unsafe { gl::ShaderSource(shader, 1, &ptr, &len) }
    }

    fn compile_shader(&self, shader: GLuint) -> bool {
        let mut status: GLint = 0;
        unsafe {
            gl::CompileShader(shader);
            gl::GetShaderiv(shader, gl::COMPILE_STATUS, &mut status);
        }
        status == GLint::from(gl::TRUE)
    }

    fn shader_info_log(&self, shader: GLuint) -> String {
        let mut len: GLint = 0;
        unsafe { gl::GetShaderiv(shader, gl::INFO_LOG_LENGTH, &mut len) };
        info_log(len, |cap, written, buf| unsafe {
            gl::GetShaderInfoLog(shader, cap, written, buf)
        })
    }

    fn attach_shader(&self, program: GLuint, shader: GLuint) {
        unsafe { gl::AttachShader(program, shader) }
    }

    fn detach_shader(&self, program: GLuint, shader: GLuint) {
        unsafe { gl::DetachShader(program, shader) }
    }

    fn transform_feedback_varyings(&self, program: GLuint, varyings: &[&str]) {
        let names: Vec<CString> = varyings
            .iter()
            .filter_map(|v| CString::new(*v).ok())
            .collect();
        let ptrs: Vec<*const GLchar> = names.iter().map(|n| n.as_ptr()).collect();
        unsafe {
            gl::TransformFeedbackVaryings(
                program,
                ptrs.len() as GLsizei,
                ptrs.as_ptr(),
                gl::INTERLEAVED_ATTRIBS,
            )
        }
    }

    fn link_program(&self, program: GLuint) -> bool {
        let mut status: GLint = 0;
        unsafe {
            gl::LinkProgram(program);
            gl::GetProgramiv(program, gl::LINK_STATUS, &mut status);
        }
        status == GLint::from(gl::TRUE)
    }

    fn program_info_log(&self, program: GLuint) -> String {
        let mut len: GLint = 0;
        unsafe { gl::GetProgramiv(program, gl::INFO_LOG_LENGTH, &mut len) };
        info_log(len, |cap, written, buf| unsafe {
            gl::GetProgramInfoLog(program, cap, written, buf)
        })
    }

    fn uniform_location(&self, program: GLuint, name: &str) -> GLint {
        match CString::new(name) {
            Ok(name) => unsafe { gl::GetUniformLocation(program, name.as_ptr()) },
            Err(_) => crate::NO_LOCATION,
        }
    }

    fn attrib_location(&self, program: GLuint, name: &str) -> GLint {
        match CString::new(name) {
            Ok(name) => unsafe { gl::GetAttribLocation(program, name.as_ptr()) },
            Err(_) => crate::NO_LOCATION,
        }
    }

    fn use_program(&self, program: GLuint) {
        unsafe { gl::UseProgram(program) }
    }

    fn uniform_1f(&self, location: GLint, value: f32) {
        unsafe { gl::Uniform1f(location, value) }
    }

    fn uniform_1i(&self, location: GLint, value: GLint) {
        unsafe { gl::Uniform1i(location, value) }
    }

    fn gen_buffer(&self) -> GLuint {
        gen_one(gl::GenBuffers)
    }

    fn delete_buffer(&self, buffer: GLuint) {
        unsafe { gl::DeleteBuffers(1, &buffer) }
    }

    fn bind_buffer(&self, target: GLenum, buffer: GLuint) {
        unsafe { gl::BindBuffer(target, buffer) }
    }

    fn buffer_data_f32(&self, target: GLenum, data: &[f32], usage: GLenum) {
        unsafe {
            gl::BufferData(
                target,
                std::mem::size_of_val(data) as GLsizeiptr,
                data.as_ptr().cast(),
                usage,
            )
        }
    }

    fn buffer_data_uninit(&self, target: GLenum, size_bytes: usize, usage: GLenum) {
        unsafe { gl::BufferData(target, size_bytes as GLsizeiptr, ptr::null(), usage) }
    }

    fn bind_buffer_base(&self, target: GLenum, index: GLuint, buffer: GLuint) {
        unsafe { gl::BindBufferBase(target, index, buffer) }
    }

    fn get_buffer_sub_data_f32(&self, target: GLenum, out: &mut [f32]) {
        unsafe {
            gl::GetBufferSubData(
                target,
                0,
                std::mem::size_of_val(out) as GLsizeiptr,
                out.as_mut_ptr().cast::<c_void>(),
            )
        }
    }

    fn gen_vertex_array(&self) -> GLuint {
        gen_one(gl::GenVertexArrays)
    }

    fn delete_vertex_array(&self, vao: GLuint) {
        unsafe { gl::DeleteVertexArrays(1, &vao) }
    }

    fn bind_vertex_array(&self, vao: GLuint) {
        unsafe { gl::BindVertexArray(vao) }
    }

    fn enable_vertex_attrib_array(&self, index: GLuint) {
        unsafe { gl::EnableVertexAttribArray(index) }
    }

    fn disable_vertex_attrib_array(&self, index: GLuint) {
        unsafe { gl::DisableVertexAttribArray(index) }
    }

    fn vertex_attrib_pointer_f32(&self, index: GLuint, components: GLint) {
        unsafe { gl::VertexAttribPointer(index, components, gl::FLOAT, gl::FALSE, 0, ptr::null()) }
    }

    fn gen_texture(&self) -> GLuint {
        gen_one(gl::GenTextures)
    }

    fn delete_texture(&self, texture: GLuint) {
        unsafe { gl::DeleteTextures(1, &texture) }
    }

    fn active_texture(&self, unit: u32) {
        unsafe { gl::ActiveTexture(gl::TEXTURE0 + unit) }
    }

    fn bind_texture(&self, target: GLenum, texture: GLuint) {
        unsafe { gl::BindTexture(target, texture) }
    }

    fn tex_image_2d(
        &self,
        target: GLenum,
        internal_format: GLint,
        width: GLsizei,
        height: GLsizei,
        format: GLenum,
        ty: GLenum,
        data: Option<&[u8]>,
    ) {
        let pixels = data.map_or(ptr::null(), |d| d.as_ptr().cast::<c_void>());
        unsafe {
            gl::TexImage2D(
                target,
                0,
                internal_format,
                width,
                height,
                0,
                format,
                ty,
                pixels,
            )
        }
    }

    fn tex_sub_image_2d(
        &self,
        target: GLenum,
        width: GLsizei,
        height: GLsizei,
        format: GLenum,
        ty: GLenum,
        data: &[u8],
    ) {
        unsafe {
            gl::TexSubImage2D(
                target,
                0,
                0,
                0,
                width,
                height,
                format,
                ty,
                data.as_ptr().cast(),
            )
        }
    }

    fn tex_parameter_i(&self, target: GLenum, pname: GLenum, value: GLint) {
        unsafe { gl::TexParameteri(target, pname, value) }
    }

    fn pixel_store_i(&self, pname: GLenum, value: GLint) {
        unsafe { gl::PixelStorei(pname, value) }
    }

    fn gen_framebuffer(&self) -> GLuint {
        gen_one(gl::GenFramebuffers)
    }

    fn delete_framebuffer(&self, framebuffer: GLuint) {
        unsafe { gl::DeleteFramebuffers(1, &framebuffer) }
    }

    fn bind_framebuffer(&self, target: GLenum, framebuffer: GLuint) {
        unsafe { gl::BindFramebuffer(target, framebuffer) }
    }

    fn framebuffer_texture_2d(
        &self,
        target: GLenum,
        attachment: GLenum,
        tex_target: GLenum,
        texture: GLuint,
    ) {
        unsafe { gl::FramebufferTexture2D(target, attachment, tex_target, texture, 0) }
    }

    fn check_framebuffer_status(&self, target: GLenum) -> GLenum {
        unsafe { gl::CheckFramebufferStatus(target) }
    }

    fn enable(&self, cap: GLenum) {
        unsafe { gl::Enable(cap) }
    }

    fn disable(&self, cap: GLenum) {
        unsafe { gl::Disable(cap) }
    }

    fn begin_transform_feedback(&self, primitive: GLenum) {
        unsafe { gl::BeginTransformFeedback(primitive) }
    }

    fn end_transform_feedback(&self) {
        unsafe { gl::EndTransformFeedback() }
    }

    fn draw_arrays(&self, mode: GLenum, first: GLint, count: GLsizei) {
        unsafe { gl::DrawArrays(mode, first, count) }
    }

    fn flush(&self) {
        unsafe { gl::Flush() }
    }

    fn get_error(&self) -> GLenum {
        unsafe { gl::GetError() }
    }

    fn get_integer(&self, pname: GLenum) -> GLint {
        let mut value: GLint = 0;
        unsafe { gl::GetIntegerv(pname, &mut value) };
        value
    }

    fn version_string(&self) -> Option<String> {
        let ptr = unsafe { gl::GetString(gl::VERSION) };
        if ptr.is_null() {
            return None;
        }
        let version = unsafe { CStr::from_ptr(ptr.cast()) };
        Some(version.to_string_lossy().into_owned())
    }
}
