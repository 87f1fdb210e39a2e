//! A recording, in-process [`GlApi`] for tests.
//!
//! `FakeGl` hands out increasing object names, tracks which objects are
//! alive, and keeps enough state (bound program, uniform values, texture
//! sizes, feedback contents) for tests to assert what a frame did without a
//! GPU. Clones share the same state.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::rc::Rc;

use gl::types::{GLenum, GLint, GLsizei, GLuint};

use crate::context::{ContextId, GlContext};
use crate::{GlApi, GlError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Program,
    Shader,
    Buffer,
    VertexArray,
    Texture,
    Framebuffer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureImage {
    pub width: GLsizei,
    pub height: GLsizei,
    pub internal_format: GLint,
}

#[derive(Debug, Default)]
struct Linked {
    uniforms: Vec<String>,
    attribs: Vec<String>,
}

#[derive(Debug, Default)]
struct FakeState {
    next_name: GLuint,
    live: BTreeMap<GLuint, ObjectKind>,
    double_frees: usize,
    calls: Vec<String>,

    fail_compile: bool,
    fail_link: bool,
    failing_ops: HashMap<String, GLenum>,
    null_ops: HashSet<String>,
    pending_errors: Vec<GLenum>,

    sources: HashMap<GLuint, String>,
    shader_logs: HashMap<GLuint, String>,
    attached: HashMap<GLuint, Vec<GLuint>>,
    varyings: HashMap<GLuint, Vec<String>>,
    linked: HashMap<GLuint, Linked>,
    program_logs: HashMap<GLuint, String>,
    compiles: usize,
    links: usize,

    current_program: GLuint,
    uniform_values: HashMap<String, f32>,
    uniform_sets: usize,

    buffers: HashMap<GLenum, GLuint>,
    buffer_sizes: HashMap<GLuint, usize>,
    feedback: Vec<f32>,

    active_unit: u32,
    unit_textures: HashMap<u32, GLuint>,
    images: HashMap<GLuint, TextureImage>,
    tex_params: HashMap<(GLuint, GLenum), GLint>,
    uploads: usize,

    bound_framebuffer: GLuint,
    attachments: HashMap<GLuint, Vec<(GLenum, GLuint)>>,

    enabled: HashSet<GLenum>,
    feedback_active: bool,
    draws: Vec<(GLenum, GLint, GLsizei)>,
    units_at_draw: HashMap<u32, GLuint>,

    integers: HashMap<GLenum, GLint>,
    no_context: bool,
}

#[derive(Debug, Clone)]
pub struct FakeGl {
    state: Rc<RefCell<FakeState>>,
}

impl Default for FakeGl {
    fn default() -> Self {
        Self::new()
    }
}

/// Declared names following `keyword` at the start of a line, e.g. every
/// `uniform float amp;` yields `amp`.
fn declared(source: &str, keywords: &[&str]) -> Vec<String> {
    let mut names = Vec::new();
    for line in source.lines() {
        let mut line = line.trim();
        if let Some(rest) = line.strip_prefix("layout") {
            match rest.find(')') {
                Some(end) => line = rest[end + 1..].trim_start(),
                None => continue,
            }
        }
        let Some(first) = line.split_whitespace().next() else {
            continue;
        };
        if !keywords.contains(&first) {
            continue;
        }
        let Some(decl) = line.split(';').next() else {
            continue;
        };
        for (i, part) in decl.split(',').enumerate() {
            let name = if i == 0 {
                part.split_whitespace().last()
            } else {
                Some(part.trim())
            };
            if let Some(name) = name {
                let name = name.split('[').next().unwrap_or(name);
                if !name.is_empty() && !names.iter().any(|n| n == name) {
                    names.push(name.to_string());
                }
            }
        }
    }
    names
}

impl FakeGl {
    pub fn new() -> Self {
        let mut state = FakeState {
            next_name: 1,
            ..FakeState::default()
        };
        state.integers.insert(gl::MAX_TEXTURE_SIZE, 4096);
        state.integers.insert(gl::MAX_TEXTURE_IMAGE_UNITS, 16);
        state.integers.insert(gl::MAX_COMBINED_TEXTURE_IMAGE_UNITS, 48);
        Self {
            state: Rc::new(RefCell::new(state)),
        }
    }

    // ---- configuration --------------------------------------------------

    /// Make every following shader compile fail.
    pub fn fail_compile(&self, fail: bool) {
        self.state.borrow_mut().fail_compile = fail;
    }

    /// Make every following program link fail.
    pub fn fail_link(&self, fail: bool) {
        self.state.borrow_mut().fail_link = fail;
    }

    /// Raise `code` every time the `GlApi` method named `op` is called.
    pub fn fail_op(&self, op: &str, code: GLenum) {
        self.state.borrow_mut().failing_ops.insert(op.to_string(), code);
    }

    /// Make the object-creating method named `op` return 0 without raising
    /// an error.
    pub fn return_no_object(&self, op: &str) {
        self.state.borrow_mut().null_ops.insert(op.to_string());
    }

    pub fn clear_failures(&self) {
        let mut state = self.state.borrow_mut();
        state.failing_ops.clear();
        state.null_ops.clear();
        state.fail_compile = false;
        state.fail_link = false;
    }

    /// Data returned by transform feedback readbacks.
    pub fn set_feedback(&self, data: Vec<f32>) {
        self.state.borrow_mut().feedback = data;
    }

    pub fn set_integer(&self, pname: GLenum, value: GLint) {
        self.state.borrow_mut().integers.insert(pname, value);
    }

    /// Behave as if no context were current (`version_string` is `None`).
    pub fn set_context_lost(&self, lost: bool) {
        self.state.borrow_mut().no_context = lost;
    }

    // ---- inspection -----------------------------------------------------

    pub fn calls(&self) -> Vec<String> {
        self.state.borrow().calls.clone()
    }

    pub fn call_count(&self, op: &str) -> usize {
        self.state
            .borrow()
            .calls
            .iter()
            .filter(|c| c.split('(').next() == Some(op))
            .count()
    }

    pub fn compile_count(&self) -> usize {
        self.state.borrow().compiles
    }

    pub fn link_count(&self) -> usize {
        self.state.borrow().links
    }

    pub fn is_live(&self, name: GLuint) -> bool {
        self.state.borrow().live.contains_key(&name)
    }

    pub fn live_count(&self, kind: ObjectKind) -> usize {
        self.state.borrow().live.values().filter(|k| **k == kind).count()
    }

    pub fn live_objects(&self) -> usize {
        self.state.borrow().live.len()
    }

    /// Deletes of names that were not alive.
    pub fn double_frees(&self) -> usize {
        self.state.borrow().double_frees
    }

    pub fn current_program(&self) -> GLuint {
        self.state.borrow().current_program
    }

    /// Last value set for uniform `name` of whichever program declared it.
    pub fn uniform_value(&self, name: &str) -> Option<f32> {
        self.state.borrow().uniform_values.get(name).copied()
    }

    pub fn uniform_set_count(&self) -> usize {
        self.state.borrow().uniform_sets
    }

    pub fn clear_uniform_values(&self) {
        self.state.borrow_mut().uniform_values.clear();
    }

    /// Texture currently bound to `unit`.
    pub fn texture_on_unit(&self, unit: u32) -> Option<GLuint> {
        self.state.borrow().unit_textures.get(&unit).copied()
    }

    /// Texture that was bound to `unit` when the last draw was issued.
    pub fn texture_at_draw(&self, unit: u32) -> Option<GLuint> {
        self.state.borrow().units_at_draw.get(&unit).copied()
    }

    pub fn texture_image(&self, texture: GLuint) -> Option<TextureImage> {
        self.state.borrow().images.get(&texture).copied()
    }

    pub fn texture_parameter(&self, texture: GLuint, pname: GLenum) -> Option<GLint> {
        self.state.borrow().tex_params.get(&(texture, pname)).copied()
    }

    pub fn upload_count(&self) -> usize {
        self.state.borrow().uploads
    }

    pub fn framebuffer_attachments(&self, framebuffer: GLuint) -> Vec<(GLenum, GLuint)> {
        self.state
            .borrow()
            .attachments
            .get(&framebuffer)
            .cloned()
            .unwrap_or_default()
    }

    pub fn buffer_size(&self, buffer: GLuint) -> Option<usize> {
        self.state.borrow().buffer_sizes.get(&buffer).copied()
    }

    pub fn is_enabled(&self, cap: GLenum) -> bool {
        self.state.borrow().enabled.contains(&cap)
    }

    pub fn draws(&self) -> Vec<(GLenum, GLint, GLsizei)> {
        self.state.borrow().draws.clone()
    }

    pub fn varyings(&self, program: GLuint) -> Vec<String> {
        self.state
            .borrow()
            .varyings
            .get(&program)
            .cloned()
            .unwrap_or_default()
    }

    // ---- internals ------------------------------------------------------

    fn record(&self, op: &str, args: std::fmt::Arguments<'_>) {
        let mut state = self.state.borrow_mut();
        state.calls.push(format!("{op}({args})"));
        if let Some(code) = state.failing_ops.get(op).copied() {
            state.pending_errors.push(code);
        }
    }

    fn create(&self, op: &str, kind: ObjectKind) -> GLuint {
        if self.state.borrow().null_ops.contains(op) {
            self.record(op, format_args!("0"));
            return 0;
        }
        let name = {
            let mut state = self.state.borrow_mut();
            let name = state.next_name;
            state.next_name += 1;
            state.live.insert(name, kind);
            name
        };
        self.record(op, format_args!("{name}"));
        name
    }

    fn destroy(&self, op: &str, name: GLuint, kind: ObjectKind) {
        self.record(op, format_args!("{name}"));
        if name == 0 {
            return;
        }
        let mut state = self.state.borrow_mut();
        match state.live.get(&name) {
            Some(k) if *k == kind => {
                state.live.remove(&name);
            }
            _ => state.double_frees += 1,
        }
    }
}

impl GlApi for FakeGl {
    fn create_program(&self) -> GLuint {
        self.create("create_program", ObjectKind::Program)
    }

    fn delete_program(&self, program: GLuint) {
        self.destroy("delete_program", program, ObjectKind::Program);
        let mut state = self.state.borrow_mut();
        state.linked.remove(&program);
        state.attached.remove(&program);
        if state.current_program == program {
            state.current_program = 0;
        }
    }

    fn create_shader(&self, _kind: GLenum) -> GLuint {
        self.create("create_shader", ObjectKind::Shader)
    }

    fn delete_shader(&self, shader: GLuint) {
        self.destroy("delete_shader", shader, ObjectKind::Shader);
    }

    fn shader_source(&self, shader: GLuint, source: &str) {
        self.record("shader_source", format_args!("{shader}"));
        self.state
            .borrow_mut()
            .sources
            .insert(shader, source.to_string());
    }

    fn compile_shader(&self, shader: GLuint) -> bool {
        self.record("compile_shader", format_args!("{shader}"));
        let mut state = self.state.borrow_mut();
        state.compiles += 1;
        let source = state.sources.get(&shader).cloned().unwrap_or_default();
        let directive = source
            .lines()
            .find_map(|l| l.trim().strip_prefix("#error").map(str::trim));
        let log = match (state.fail_compile, directive) {
            (true, _) => Some("0:1(1): error: forced compile failure".to_string()),
            (false, Some(msg)) => Some(format!("0:1(1): error: {msg}")),
            (false, None) => None,
        };
        match log {
            Some(log) => {
                state.shader_logs.insert(shader, log);
                false
            }
            None => true,
        }
    }

    fn shader_info_log(&self, shader: GLuint) -> String {
        self.state
            .borrow()
            .shader_logs
            .get(&shader)
            .cloned()
            .unwrap_or_default()
    }

    fn attach_shader(&self, program: GLuint, shader: GLuint) {
        self.record("attach_shader", format_args!("{program}, {shader}"));
        self.state
            .borrow_mut()
            .attached
            .entry(program)
            .or_default()
            .push(shader);
    }

    fn detach_shader(&self, program: GLuint, shader: GLuint) {
        self.record("detach_shader", format_args!("{program}, {shader}"));
        if let Some(list) = self.state.borrow_mut().attached.get_mut(&program) {
            list.retain(|s| *s != shader);
        }
    }

    fn transform_feedback_varyings(&self, program: GLuint, varyings: &[&str]) {
        self.record(
            "transform_feedback_varyings",
            format_args!("{program}, {varyings:?}"),
        );
        self.state
            .borrow_mut()
            .varyings
            .insert(program, varyings.iter().map(|v| v.to_string()).collect());
    }

    fn link_program(&self, program: GLuint) -> bool {
        self.record("link_program", format_args!("{program}"));
        let mut state = self.state.borrow_mut();
        state.links += 1;

        let source: String = state
            .attached
            .get(&program)
            .into_iter()
            .flatten()
            .filter_map(|s| state.sources.get(s))
            .cloned()
            .collect::<Vec<_>>()
            .join("\n");
        let outputs = declared(&source, &["out", "varying"]);
        let missing = state
            .varyings
            .get(&program)
            .into_iter()
            .flatten()
            .find(|v| !outputs.contains(v))
            .cloned();

        let log = if state.fail_link {
            Some("error: forced link failure".to_string())
        } else {
            missing.map(|v| format!("error: transform feedback varying '{v}' is not an output"))
        };
        if let Some(log) = log {
            state.program_logs.insert(program, log);
            state.linked.remove(&program);
            return false;
        }

        let linked = Linked {
            uniforms: declared(&source, &["uniform"]),
            attribs: declared(&source, &["in", "attribute"]),
        };
        state.linked.insert(program, linked);
        true
    }

    fn program_info_log(&self, program: GLuint) -> String {
        self.state
            .borrow()
            .program_logs
            .get(&program)
            .cloned()
            .unwrap_or_default()
    }

    fn uniform_location(&self, program: GLuint, name: &str) -> GLint {
        self.record("uniform_location", format_args!("{program}, {name}"));
        let state = self.state.borrow();
        state
            .linked
            .get(&program)
            .and_then(|l| l.uniforms.iter().position(|u| u == name))
            .map_or(crate::NO_LOCATION, |i| i as GLint)
    }

    fn attrib_location(&self, program: GLuint, name: &str) -> GLint {
        self.record("attrib_location", format_args!("{program}, {name}"));
        let state = self.state.borrow();
        state
            .linked
            .get(&program)
            .and_then(|l| l.attribs.iter().position(|a| a == name))
            .map_or(crate::NO_LOCATION, |i| i as GLint)
    }

    fn use_program(&self, program: GLuint) {
        self.record("use_program", format_args!("{program}"));
        let mut state = self.state.borrow_mut();
        if program == 0 || state.linked.contains_key(&program) {
            state.current_program = program;
        } else {
            state.pending_errors.push(gl::INVALID_OPERATION);
        }
    }

    fn uniform_1f(&self, location: GLint, value: f32) {
        self.record("uniform_1f", format_args!("{location}, {value}"));
        let mut state = self.state.borrow_mut();
        let name = state
            .linked
            .get(&state.current_program)
            .and_then(|l| usize::try_from(location).ok().and_then(|i| l.uniforms.get(i)))
            .cloned();
        match name {
            Some(name) => {
                state.uniform_values.insert(name, value);
                state.uniform_sets += 1;
            }
            None if location == crate::NO_LOCATION => {}
            None => state.pending_errors.push(gl::INVALID_OPERATION),
        }
    }

    fn uniform_1i(&self, location: GLint, value: GLint) {
        self.record("uniform_1i", format_args!("{location}, {value}"));
        let mut state = self.state.borrow_mut();
        let name = state
            .linked
            .get(&state.current_program)
            .and_then(|l| usize::try_from(location).ok().and_then(|i| l.uniforms.get(i)))
            .cloned();
        match name {
            Some(name) => {
                state.uniform_values.insert(name, value as f32);
                state.uniform_sets += 1;
            }
            None if location == crate::NO_LOCATION => {}
            None => state.pending_errors.push(gl::INVALID_OPERATION),
        }
    }

    fn gen_buffer(&self) -> GLuint {
        self.create("gen_buffer", ObjectKind::Buffer)
    }

    fn delete_buffer(&self, buffer: GLuint) {
        self.destroy("delete_buffer", buffer, ObjectKind::Buffer);
    }

    fn bind_buffer(&self, target: GLenum, buffer: GLuint) {
        self.record("bind_buffer", format_args!("{target:#x}, {buffer}"));
        self.state.borrow_mut().buffers.insert(target, buffer);
    }

    fn buffer_data_f32(&self, target: GLenum, data: &[f32], _usage: GLenum) {
        self.record("buffer_data_f32", format_args!("{target:#x}, {}", data.len()));
        let mut state = self.state.borrow_mut();
        if let Some(buffer) = state.buffers.get(&target).copied() {
            state.buffer_sizes.insert(buffer, std::mem::size_of_val(data));
        }
    }

    fn buffer_data_uninit(&self, target: GLenum, size_bytes: usize, _usage: GLenum) {
        self.record("buffer_data_uninit", format_args!("{target:#x}, {size_bytes}"));
        let mut state = self.state.borrow_mut();
        if let Some(buffer) = state.buffers.get(&target).copied() {
            state.buffer_sizes.insert(buffer, size_bytes);
        }
    }

    fn bind_buffer_base(&self, target: GLenum, index: GLuint, buffer: GLuint) {
        self.record(
            "bind_buffer_base",
            format_args!("{target:#x}, {index}, {buffer}"),
        );
        self.state.borrow_mut().buffers.insert(target, buffer);
    }

    fn get_buffer_sub_data_f32(&self, target: GLenum, out: &mut [f32]) {
        self.record("get_buffer_sub_data_f32", format_args!("{target:#x}, {}", out.len()));
        let state = self.state.borrow();
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = state.feedback.get(i).copied().unwrap_or(0.0);
        }
    }

    fn gen_vertex_array(&self) -> GLuint {
        self.create("gen_vertex_array", ObjectKind::VertexArray)
    }

    fn delete_vertex_array(&self, vao: GLuint) {
        self.destroy("delete_vertex_array", vao, ObjectKind::VertexArray);
    }

    fn bind_vertex_array(&self, vao: GLuint) {
        self.record("bind_vertex_array", format_args!("{vao}"));
    }

    fn enable_vertex_attrib_array(&self, index: GLuint) {
        self.record("enable_vertex_attrib_array", format_args!("{index}"));
    }

    fn disable_vertex_attrib_array(&self, index: GLuint) {
        self.record("disable_vertex_attrib_array", format_args!("{index}"));
    }

    fn vertex_attrib_pointer_f32(&self, index: GLuint, components: GLint) {
        self.record(
            "vertex_attrib_pointer_f32",
            format_args!("{index}, {components}"),
        );
    }

    fn gen_texture(&self) -> GLuint {
        self.create("gen_texture", ObjectKind::Texture)
    }

    fn delete_texture(&self, texture: GLuint) {
        self.destroy("delete_texture", texture, ObjectKind::Texture);
        let mut state = self.state.borrow_mut();
        state.images.remove(&texture);
        state.unit_textures.retain(|_, t| *t != texture);
    }

    fn active_texture(&self, unit: u32) {
        self.record("active_texture", format_args!("{unit}"));
        self.state.borrow_mut().active_unit = unit;
    }

    fn bind_texture(&self, _target: GLenum, texture: GLuint) {
        self.record("bind_texture", format_args!("{texture}"));
        let mut state = self.state.borrow_mut();
        let unit = state.active_unit;
        if texture == 0 {
            state.unit_textures.remove(&unit);
        } else {
            state.unit_textures.insert(unit, texture);
        }
    }

    fn tex_image_2d(
        &self,
        _target: GLenum,
        internal_format: GLint,
        width: GLsizei,
        height: GLsizei,
        _format: GLenum,
        _ty: GLenum,
        data: Option<&[u8]>,
    ) {
        self.record(
            "tex_image_2d",
            format_args!("{internal_format:#x}, {width}x{height}, {}", data.is_some()),
        );
        let mut state = self.state.borrow_mut();
        let unit = state.active_unit;
        if let Some(texture) = state.unit_textures.get(&unit).copied() {
            state.images.insert(
                texture,
                TextureImage {
                    width,
                    height,
                    internal_format,
                },
            );
            if data.is_some() {
                state.uploads += 1;
            }
        }
    }

    fn tex_sub_image_2d(
        &self,
        _target: GLenum,
        width: GLsizei,
        height: GLsizei,
        _format: GLenum,
        _ty: GLenum,
        data: &[u8],
    ) {
        self.record(
            "tex_sub_image_2d",
            format_args!("{width}x{height}, {}", data.len()),
        );
        self.state.borrow_mut().uploads += 1;
    }

    fn tex_parameter_i(&self, _target: GLenum, pname: GLenum, value: GLint) {
        self.record("tex_parameter_i", format_args!("{pname:#x}, {value:#x}"));
        let mut state = self.state.borrow_mut();
        let unit = state.active_unit;
        if let Some(texture) = state.unit_textures.get(&unit).copied() {
            state.tex_params.insert((texture, pname), value);
        }
    }

    fn pixel_store_i(&self, pname: GLenum, value: GLint) {
        self.record("pixel_store_i", format_args!("{pname:#x}, {value}"));
    }

    fn gen_framebuffer(&self) -> GLuint {
        self.create("gen_framebuffer", ObjectKind::Framebuffer)
    }

    fn delete_framebuffer(&self, framebuffer: GLuint) {
        self.destroy("delete_framebuffer", framebuffer, ObjectKind::Framebuffer);
        self.state.borrow_mut().attachments.remove(&framebuffer);
    }

    fn bind_framebuffer(&self, _target: GLenum, framebuffer: GLuint) {
        self.record("bind_framebuffer", format_args!("{framebuffer}"));
        self.state.borrow_mut().bound_framebuffer = framebuffer;
    }

    fn framebuffer_texture_2d(
        &self,
        _target: GLenum,
        attachment: GLenum,
        _tex_target: GLenum,
        texture: GLuint,
    ) {
        self.record(
            "framebuffer_texture_2d",
            format_args!("{attachment:#x}, {texture}"),
        );
        let mut state = self.state.borrow_mut();
        let fb = state.bound_framebuffer;
        if fb != 0 {
            state.attachments.entry(fb).or_default().push((attachment, texture));
        }
    }

    fn check_framebuffer_status(&self, _target: GLenum) -> GLenum {
        self.record("check_framebuffer_status", format_args!(""));
        let state = self.state.borrow();
        let complete = state
            .attachments
            .get(&state.bound_framebuffer)
            .is_some_and(|a| !a.is_empty());
        if complete {
            gl::FRAMEBUFFER_COMPLETE
        } else {
            gl::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT
        }
    }

    fn enable(&self, cap: GLenum) {
        self.record("enable", format_args!("{cap:#x}"));
        self.state.borrow_mut().enabled.insert(cap);
    }

    fn disable(&self, cap: GLenum) {
        self.record("disable", format_args!("{cap:#x}"));
        self.state.borrow_mut().enabled.remove(&cap);
    }

    fn begin_transform_feedback(&self, primitive: GLenum) {
        self.record("begin_transform_feedback", format_args!("{primitive:#x}"));
        let mut state = self.state.borrow_mut();
        if state.feedback_active {
            state.pending_errors.push(gl::INVALID_OPERATION);
        }
        state.feedback_active = true;
    }

    fn end_transform_feedback(&self) {
        self.record("end_transform_feedback", format_args!(""));
        let mut state = self.state.borrow_mut();
        if !state.feedback_active {
            state.pending_errors.push(gl::INVALID_OPERATION);
        }
        state.feedback_active = false;
    }

    fn draw_arrays(&self, mode: GLenum, first: GLint, count: GLsizei) {
        self.record("draw_arrays", format_args!("{mode:#x}, {first}, {count}"));
        let mut state = self.state.borrow_mut();
        state.draws.push((mode, first, count));
        state.units_at_draw = state.unit_textures.clone();
    }

    fn flush(&self) {
        self.record("flush", format_args!(""));
    }

    fn get_error(&self) -> GLenum {
        let mut state = self.state.borrow_mut();
        if state.pending_errors.is_empty() {
            gl::NO_ERROR
        } else {
            state.pending_errors.remove(0)
        }
    }

    fn get_integer(&self, pname: GLenum) -> GLint {
        self.state.borrow().integers.get(&pname).copied().unwrap_or(0)
    }

    fn version_string(&self) -> Option<String> {
        if self.state.borrow().no_context {
            None
        } else {
            Some("3.3.0 FakeGl".to_string())
        }
    }
}

#[derive(Debug)]
struct FakeContextState {
    id: Cell<ContextId>,
    available: Cell<bool>,
    acquires: Cell<usize>,
    releases: Cell<usize>,
}

/// A [`GlContext`] whose identity and availability tests control.
#[derive(Debug, Clone)]
pub struct FakeContext {
    state: Rc<FakeContextState>,
}

impl Default for FakeContext {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeContext {
    pub fn new() -> Self {
        Self {
            state: Rc::new(FakeContextState {
                id: Cell::new(ContextId::next()),
                available: Cell::new(true),
                acquires: Cell::new(0),
                releases: Cell::new(0),
            }),
        }
    }

    /// Simulate the host destroying and recreating its context.
    pub fn recreate(&self) -> ContextId {
        let id = ContextId::next();
        self.state.id.set(id);
        id
    }

    pub fn set_available(&self, available: bool) {
        self.state.available.set(available);
    }

    pub fn acquires(&self) -> usize {
        self.state.acquires.get()
    }

    pub fn releases(&self) -> usize {
        self.state.releases.get()
    }
}

impl GlContext for FakeContext {
    fn id(&self) -> ContextId {
        self.state.id.get()
    }

    fn make_current(&self) -> Result<(), GlError> {
        if !self.state.available.get() {
            return Err(GlError::NotCurrent);
        }
        self.state.acquires.set(self.state.acquires.get() + 1);
        Ok(())
    }

    fn release(&self) {
        self.state.releases.set(self.state.releases.get() + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_names_are_parsed() {
        let src = "uniform float amp;\nuniform sampler2D velocityTexture;\n\
                   layout(location = 0) in vec3 position;\nuniform float a, b;\n\
                   out vec3 outColor;";
        assert_eq!(
            declared(src, &["uniform"]),
            ["amp", "velocityTexture", "a", "b"]
        );
        assert_eq!(declared(src, &["in"]), ["position"]);
        assert_eq!(declared(src, &["out"]), ["outColor"]);
    }

    #[test]
    fn tracks_live_objects_and_double_frees() {
        let api = FakeGl::new();
        let tex = api.gen_texture();
        assert!(api.is_live(tex));
        api.delete_texture(tex);
        api.delete_texture(tex);
        api.delete_texture(0);
        assert_eq!(api.live_objects(), 0);
        assert_eq!(api.double_frees(), 1);
    }

    #[test]
    fn link_resolves_declared_locations() {
        let api = FakeGl::new();
        let program = api.create_program();
        let shader = api.create_shader(gl::VERTEX_SHADER);
        api.shader_source(shader, "in vec3 position;\nuniform float amp;\nout vec3 outColor;");
        assert!(api.compile_shader(shader));
        api.attach_shader(program, shader);
        api.transform_feedback_varyings(program, &["outColor"]);
        assert!(api.link_program(program));

        assert_eq!(api.uniform_location(program, "amp"), 0);
        assert_eq!(api.uniform_location(program, "missing"), -1);
        assert_eq!(api.attrib_location(program, "position"), 0);

        api.use_program(program);
        api.uniform_1f(0, 0.25);
        assert_eq!(api.uniform_value("amp"), Some(0.25));
    }

    #[test]
    fn undeclared_varying_fails_link() {
        let api = FakeGl::new();
        let program = api.create_program();
        let shader = api.create_shader(gl::VERTEX_SHADER);
        api.shader_source(shader, "in vec3 position;");
        api.compile_shader(shader);
        api.attach_shader(program, shader);
        api.transform_feedback_varyings(program, &["outColor"]);
        assert!(!api.link_program(program));
        assert!(api.program_info_log(program).contains("outColor"));
    }
}
