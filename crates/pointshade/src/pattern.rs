//! [`ShaderPattern`]: one running point shader.
//!
//! A pattern owns its program, simulation textures and feedback buffers and
//! drives them through reloads and frames. The host drives it with explicit
//! calls: [`ShaderPattern::on_script_name_changed`] and
//! [`ShaderPattern::on_frame_dir_changed`] when the corresponding settings
//! change, [`ShaderPattern::run`] once per render tick. Nothing on the frame
//! path returns an error; failures are logged and the previous colors are
//! kept.

use std::path::Path;
use std::rc::Rc;

use anyhow::Context as _;
use pointshade_core::color::{self, Rgba};
use pointshade_core::inputs::{PointSource, Silence, SpectrumSource};
use pointshade_core::{
    extract_metadata, FloatParam, HostParameters, IsfMetadata, ParameterSet, PatternConfig,
    ScriptParameters, Variant,
};
use pointshade_gl::{ContextId, GlApi, GlContext, GlError, TextureLimits};
use pointshade_sim::{AudioTexture, FrameSequence, SimulationState, FLUID_CHANNELS};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::cache::{CacheKey, SharedShaderCache};
use crate::compile::{compile_program, CompileError, TIME_UNIFORMS};
use crate::executor::{FeedbackBuffer, FrameBindings, FrameExecutor, TextureBinding};
use crate::program::{self, CompiledProgram};
use crate::source::{load_shader, SourceError};
use crate::variant::{self, AUDIO_SAMPLER, FRAME_SAMPLER, FRAME_UNIT};

pub const SPEED_PARAM: &str = "speed";
pub const ALPHA_THRESHOLD_PARAM: &str = "alfTh";
pub const FRAME_PARAM: &str = "frame";

const SPEED_RANGE: (f32, f32) = (0.0, 20.0);
const ALPHA_THRESHOLD_RANGE: (f32, f32) = (-0.1, 1.0);

#[derive(Debug, Error)]
pub enum ReloadError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Gl(#[from] GlError),
    #[error("pattern has been disposed")]
    Disposed,
}

pub struct ShaderPattern<G: GlApi, C: GlContext, H: HostParameters = ParameterSet> {
    gl: G,
    context: Rc<C>,
    host: H,
    config: PatternConfig,
    cache: SharedShaderCache,
    points: Box<dyn PointSource>,
    spectrum: Box<dyn SpectrumSource>,
    limits: TextureLimits,

    program: Option<CompiledProgram>,
    metadata: IsfMetadata,
    script: ScriptParameters,
    /// The script most recently requested, whether or not it compiled.
    script_name: String,

    state: SimulationState,
    frames: FrameSequence,
    audio: Option<AudioTexture>,
    executor: FrameExecutor,

    total_ms: f64,
    force_next: bool,
    reload_generation: u64,
    last_error: Option<String>,
    disposed: bool,
}

impl<G: GlApi, C: GlContext, H: HostParameters> ShaderPattern<G, C, H> {
    /// Register the built-in parameters, allocate the GPU state of the
    /// configured variant and load the configured script.
    ///
    /// A script that fails to load is not an error here: the pattern starts
    /// without a program and reports the failure through
    /// [`last_error`](Self::last_error).
    pub fn new(
        gl: G,
        context: C,
        host: H,
        config: PatternConfig,
        cache: SharedShaderCache,
        points: Box<dyn PointSource>,
    ) -> anyhow::Result<Self> {
        let script_name = config.script_name().to_string();
        let mut pattern = Self {
            gl,
            context: Rc::new(context),
            host,
            cache,
            points,
            spectrum: Box::new(Silence),
            limits: TextureLimits::default(),
            program: None,
            metadata: IsfMetadata::empty(),
            script: ScriptParameters::new(),
            script_name: script_name.clone(),
            state: SimulationState::new(),
            frames: FrameSequence::new(),
            audio: None,
            executor: FrameExecutor::new(TextureLimits::default()),
            total_ms: 0.0,
            force_next: false,
            reload_generation: 0,
            last_error: None,
            disposed: false,
            config,
        };

        pattern.register_builtins();
        pattern.setup_resources()?;
        if let Err(err) = pattern.reload_shader(&script_name, true) {
            warn!(shader = %script_name, %err, "pattern started without a program");
        }
        Ok(pattern)
    }

    /// Sample `spectrum` for the audio texture instead of silence.
    pub fn with_spectrum(mut self, spectrum: Box<dyn SpectrumSource>) -> Self {
        self.spectrum = spectrum;
        self
    }

    fn register_builtins(&mut self) {
        let builtins = [
            FloatParam::new(
                SPEED_PARAM,
                self.config.speed.clamp(SPEED_RANGE.0, SPEED_RANGE.1),
                SPEED_RANGE.0,
                SPEED_RANGE.1,
            )
            .with_description("Simulation speed"),
            FloatParam::new(
                ALPHA_THRESHOLD_PARAM,
                self.config
                    .alpha_threshold
                    .clamp(ALPHA_THRESHOLD_RANGE.0, ALPHA_THRESHOLD_RANGE.1),
                ALPHA_THRESHOLD_RANGE.0,
                ALPHA_THRESHOLD_RANGE.1,
            )
            .with_description("Luminosity below which points fade out"),
        ];
        for param in builtins {
            if !self.host.contains(&param.name) {
                self.host.add(param);
            }
        }
    }

    /// Query limits and create the textures of the configured variant.
    fn setup_resources(&mut self) -> anyhow::Result<()> {
        let context = Rc::clone(&self.context);
        let _guard = context
            .acquire()
            .context("GL context unavailable for pattern setup")?;

        self.limits = TextureLimits::query(&self.gl);
        self.executor = FrameExecutor::new(self.limits);

        match self.config.variant {
            Variant::Fluid => {
                let size = self
                    .config
                    .fluid_texture_size
                    .clamp(1, self.limits.max_texture_size);
                self.state
                    .allocate(&self.gl, &FLUID_CHANNELS, size, true)
                    .context("allocating fluid simulation textures")?;
            }
            Variant::Frames => {
                let dir = self.config.frame_dir.clone();
                self.frames.load_dir(&self.gl, dir.as_deref(), &self.limits);
                self.replace_frame_param();
            }
        }

        self.audio = Some(AudioTexture::create(&self.gl).context("creating audio texture")?);
        Ok(())
    }

    /// Resize the `frame` parameter to the loaded sequence. The selected
    /// frame survives, clamped to the new range.
    fn replace_frame_param(&mut self) {
        let selected = self.host.value(FRAME_PARAM);
        self.host.remove(FRAME_PARAM);
        self.host.add(
            FloatParam::new(FRAME_PARAM, 0.0, 0.0, self.frames.parameter_max())
                .with_description("Frame index"),
        );
        if let Some(value) = selected {
            self.host.set_value(FRAME_PARAM, value);
        }
    }

    /// Load script `name` and make it the running program.
    ///
    /// The cache is consulted first unless caching is disabled or a forced
    /// reload is pending. On success the script parameters are reconciled
    /// with the new metadata (see [`ScriptParameters::reconcile`]) and the
    /// previous program is released. On failure the previous program keeps
    /// running and the error is kept for [`last_error`](Self::last_error).
    pub fn reload_shader(&mut self, name: &str, destructive: bool) -> Result<(), ReloadError> {
        if self.disposed {
            return Err(ReloadError::Disposed);
        }
        let force = std::mem::take(&mut self.force_next);
        self.script_name = name.to_string();

        let context = Rc::clone(&self.context);
        let guard = match context.acquire() {
            Ok(guard) => guard,
            Err(err) => return Err(self.reload_failed(name, err.into())),
        };
        let current = guard.id();

        let (compiled, metadata, replaced) = match self.obtain(name, current, force) {
            Ok(found) => found,
            Err(err) => return Err(self.reload_failed(name, err)),
        };
        let previous = self.program.replace(compiled);
        for old in previous.into_iter().chain(replaced) {
            program::release(&self.gl, current, old);
        }
        drop(guard);

        self.metadata = metadata;
        let report = self
            .script
            .reconcile(&self.metadata, destructive, &mut self.host);
        self.reload_generation += 1;
        self.last_error = None;
        info!(
            shader = %name,
            destructive,
            parameters = self.script.len(),
            added = report.added.len(),
            removed = report.removed.len(),
            generation = self.reload_generation,
            "shader loaded"
        );
        Ok(())
    }

    fn reload_failed(&mut self, name: &str, err: ReloadError) -> ReloadError {
        error!(shader = %name, %err, "shader reload failed, keeping previous program");
        self.last_error = Some(err.to_string());
        err
    }

    /// A program for `name`: from the cache when allowed and valid, compiled
    /// from source otherwise. Also returns cache entries the new one
    /// displaced, for the caller to release.
    fn obtain(
        &mut self,
        name: &str,
        current: ContextId,
        force: bool,
    ) -> Result<(CompiledProgram, IsfMetadata, Vec<CompiledProgram>), ReloadError> {
        let dir = self.config.shader_dir.clone();
        let samplers = variant::samplers(self.config.variant);
        let key = CacheKey::new(name, &dir, &self.config.capture_varying, &samplers);
        if self.config.caching_enabled && !force {
            if let Some(hit) = self.cache.load(&key, current) {
                return Ok((hit.program, hit.metadata, Vec::new()));
            }
        }

        let source = load_shader(&dir, name)?;
        let metadata = extract_metadata(&source.text).unwrap_or_else(|err| {
            warn!(shader = %name, %err, "no usable metadata, shader has no parameters");
            IsfMetadata::empty()
        });
        let compiled = compile_program(
            &self.gl,
            current,
            name,
            &source.text,
            &self.config.capture_varying,
            &metadata,
            &samplers,
        )?;

        let replaced = if self.config.caching_enabled {
            self.cache
                .store(key, &compiled, &metadata, &source)
                .into_iter()
                .collect()
        } else {
            Vec::new()
        };
        Ok((compiled, metadata, replaced))
    }

    /// Recompile the current script from source, keeping live parameter
    /// values.
    pub fn force_reload(&mut self) -> Result<(), ReloadError> {
        self.force_next = true;
        let name = self.script_name.clone();
        self.reload_shader(&name, false)
    }

    /// Switch to another script. Its parameters start at their defaults.
    pub fn on_script_name_changed(&mut self, name: &str) -> Result<(), ReloadError> {
        self.config.script_name = Some(name.to_string());
        self.reload_shader(name, true)
    }

    /// Load the frame sequence of `dir` and resize the `frame` parameter to
    /// it, keeping the selected frame where it still fits. Returns the
    /// number of frames.
    pub fn on_frame_dir_changed(&mut self, dir: Option<&Path>) -> Result<usize, GlError> {
        self.config.frame_dir = dir.map(Path::to_path_buf);
        if self.config.variant != Variant::Frames {
            debug!("frame directory ignored by the fluid variant");
            return Ok(0);
        }

        let context = Rc::clone(&self.context);
        let _guard = context.acquire()?;
        let count = self.frames.load_dir(&self.gl, dir, &self.limits);
        self.replace_frame_param();
        Ok(count)
    }

    /// The pattern became the active one: restart the clock.
    pub fn on_active(&mut self) {
        self.total_ms = 0.0;
    }

    /// Run one frame and shade the points into `colors`.
    ///
    /// Until a frame has been read back successfully every point is black.
    pub fn run(&mut self, delta_ms: f64, colors: &mut [Rgba]) {
        self.run_frame(delta_ms);

        let feedback = self.executor.feedback();
        if feedback.is_valid() {
            let threshold = self
                .host
                .value(ALPHA_THRESHOLD_PARAM)
                .unwrap_or(self.config.alpha_threshold);
            color::post_process(feedback.as_slice(), threshold, self.points.as_ref(), colors);
        } else {
            colors.fill(color::BLACK);
        }
    }

    /// Run the shader once over every point. Returns whether new feedback
    /// was read back.
    ///
    /// Without a program this does nothing, not even advance the clock.
    pub fn run_frame(&mut self, delta_ms: f64) -> bool {
        if self.disposed {
            return false;
        }
        if self
            .program
            .as_ref()
            .is_some_and(|p| p.context() != self.context.id())
        {
            self.recover_context();
        }
        let Some(program) = self.program.clone() else {
            return false;
        };

        self.total_ms += delta_ms;
        let context = Rc::clone(&self.context);
        let drew = match context.acquire() {
            Ok(_guard) => self.draw(&program),
            Err(err) => {
                warn!(%err, "skipping frame");
                false
            }
        };
        self.state.advance();
        drew
    }

    fn draw(&mut self, program: &CompiledProgram) -> bool {
        if program.uniforms.contains(AUDIO_SAMPLER) {
            if let Some(audio) = self.audio.as_mut() {
                if let Err(err) = audio.refresh(&self.gl, self.spectrum.as_ref()) {
                    warn!(%err, "audio texture not refreshed");
                }
            }
        }

        let bindings = self.bindings(program);
        self.executor
            .run(&self.gl, self.points.as_ref(), &bindings)
            .is_ok()
    }

    fn bindings<'a>(&self, program: &'a CompiledProgram) -> FrameBindings<'a> {
        let speed = self.host.value(SPEED_PARAM).unwrap_or(self.config.speed);
        let time = (f64::from(speed) * self.total_ms / 1000.0) as f32;

        let mut uniforms: Vec<_> = TIME_UNIFORMS
            .iter()
            .filter_map(|name| program.uniforms.get(name))
            .map(|location| (location, time))
            .collect();
        uniforms.extend(
            self.script
                .values(&self.host)
                .filter_map(|(name, value)| program.uniforms.get(name).map(|l| (l, value))),
        );

        let mut textures = Vec::new();
        match self.config.variant {
            Variant::Fluid => {
                for (channel, spec) in self.state.channels().enumerate() {
                    let location = program.uniforms.get(spec.sampler);
                    let texture = self.state.current_texture(channel);
                    if let (Some(location), Some(texture)) = (location, texture) {
                        textures.push(TextureBinding {
                            location,
                            unit: spec.unit,
                            texture,
                        });
                    }
                }
            }
            Variant::Frames => {
                let value = self.host.value(FRAME_PARAM).unwrap_or(0.0);
                let texture = self
                    .frames
                    .clamp_index(value)
                    .and_then(|index| self.frames.texture(index));
                if let (Some(location), Some(texture)) =
                    (program.uniforms.get(FRAME_SAMPLER), texture)
                {
                    textures.push(TextureBinding {
                        location,
                        unit: FRAME_UNIT,
                        texture,
                    });
                }
            }
        }
        let audio = self.audio.as_ref().and_then(AudioTexture::handle);
        if let (Some(location), Some(texture)) = (program.uniforms.get(AUDIO_SAMPLER), audio) {
            textures.push(TextureBinding {
                location,
                unit: variant::audio_unit(self.config.variant),
                texture,
            });
        }

        FrameBindings {
            program,
            uniforms,
            textures,
        }
    }

    /// The context was replaced under us: every handle is dead. Forget them
    /// without GL calls, rebuild and recompile.
    fn recover_context(&mut self) {
        warn!("GL context changed, rebuilding GPU resources");
        self.program = None;
        self.state = SimulationState::new();
        self.frames = FrameSequence::new();
        self.audio = None;

        if let Err(err) = self.setup_resources() {
            let message = format!("{err:#}");
            error!(error = %message, "could not rebuild GPU resources");
            self.last_error = Some(message);
            return;
        }
        let name = self.script_name.clone();
        // Failures are recorded in last_error.
        let _ = self.reload_shader(&name, false);
    }

    /// Empty the shared cache, deleting programs nothing else uses.
    pub fn clear_cache(&mut self) {
        let dropped = self.cache.clear();
        let context = Rc::clone(&self.context);
        match context.acquire() {
            Ok(guard) => {
                for compiled in dropped {
                    program::release(&self.gl, guard.id(), compiled);
                }
            }
            Err(err) => warn!(%err, "cleared cache without a context, programs not deleted"),
        };
    }

    /// Release every GPU resource. Safe to call repeatedly; also runs on
    /// drop.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;

        let context = Rc::clone(&self.context);
        let Ok(guard) = context.acquire() else {
            warn!("disposing pattern without a context, GPU objects abandoned");
            self.program = None;
            return;
        };
        let current = guard.id();
        if let Some(compiled) = self.program.take() {
            for entry in self.cache.forget(&compiled.program) {
                program::release(&self.gl, current, entry);
            }
            program::release(&self.gl, current, compiled);
        }
        self.executor.dispose(&self.gl);
        self.state.dispose(&self.gl);
        self.frames.clear(&self.gl);
        if let Some(mut audio) = self.audio.take() {
            audio.dispose(&self.gl);
        }
        debug!(shader = %self.script_name, "pattern disposed");
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Script parameter names in declaration order.
    pub fn script_parameters(&self) -> impl Iterator<Item = &str> {
        self.script.names()
    }

    /// Incremented by every successful reload.
    pub fn reload_generation(&self) -> u64 {
        self.reload_generation
    }

    pub fn metadata(&self) -> &IsfMetadata {
        &self.metadata
    }

    pub fn script_name(&self) -> &str {
        &self.script_name
    }

    pub fn config(&self) -> &PatternConfig {
        &self.config
    }

    pub fn program(&self) -> Option<&CompiledProgram> {
        self.program.as_ref()
    }

    pub fn simulation(&self) -> &SimulationState {
        &self.state
    }

    pub fn frames(&self) -> &FrameSequence {
        &self.frames
    }

    pub fn feedback(&self) -> &FeedbackBuffer {
        self.executor.feedback()
    }

    /// Simulation clock in milliseconds.
    pub fn elapsed_ms(&self) -> f64 {
        self.total_ms
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn gl(&self) -> &G {
        &self.gl
    }
}

impl<G: GlApi, C: GlContext, H: HostParameters> Drop for ShaderPattern<G, C, H> {
    fn drop(&mut self) {
        self.dispose();
    }
}
