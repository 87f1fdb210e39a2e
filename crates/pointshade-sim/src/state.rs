//! [`SimulationState`]: double-buffered simulation textures.
//!
//! Each channel owns two equivalent textures. The one at the current index
//! is read by the next draw, the other one is written by it. After the frame
//! the indices swap through [`SimulationState::advance`].

use gl::types::GLsizei;
use pointshade_gl::{check_error, FramebufferId, GlApi, GlError, TextureId};
use tracing::{debug, warn};

use crate::channels::ChannelSpec;

#[derive(Debug)]
struct Channel {
    spec: ChannelSpec,
    textures: [Option<TextureId>; 2],
}

/// Ping-pong texture sets plus one optional render target per index.
#[derive(Debug, Default)]
pub struct SimulationState {
    channels: Vec<Channel>,
    /// Render target `i` has every channel's texture `i` attached.
    framebuffers: [Option<FramebufferId>; 2],
    /// Which index (0 or 1) is readable this frame.
    current: usize,
    size: u32,
}

impl SimulationState {
    /// An empty state. Nothing is allocated until [`allocate`](Self::allocate).
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate two `size`×`size` textures per channel, with linear filtering
    /// and edge clamping. Any previous allocation is released first.
    ///
    /// On failure everything created by this call is released again.
    pub fn allocate(
        &mut self,
        api: &dyn GlApi,
        specs: &[ChannelSpec],
        size: u32,
        with_framebuffers: bool,
    ) -> Result<(), GlError> {
        self.dispose(api);

        let result = self.create(api, specs, size, with_framebuffers);
        if result.is_err() {
            self.dispose(api);
        }
        result
    }

    fn create(
        &mut self,
        api: &dyn GlApi,
        specs: &[ChannelSpec],
        size: u32,
        with_framebuffers: bool,
    ) -> Result<(), GlError> {
        let extent = size as GLsizei;
        for spec in specs {
            let mut channel = Channel {
                spec: *spec,
                textures: [None; 2],
            };
            for slot in channel.textures.iter_mut() {
                let texture = TextureId::from_raw(api.gen_texture());
                *slot = texture;
                let Some(texture) = texture else {
                    continue;
                };
                api.bind_texture(gl::TEXTURE_2D, texture.get());
                api.tex_image_2d(
                    gl::TEXTURE_2D,
                    spec.format.internal_format(),
                    extent,
                    extent,
                    spec.format.pixel_format(),
                    gl::FLOAT,
                    None,
                );
                api.tex_parameter_i(gl::TEXTURE_2D, gl::TEXTURE_MIN_FILTER, gl::LINEAR as i32);
                api.tex_parameter_i(gl::TEXTURE_2D, gl::TEXTURE_MAG_FILTER, gl::LINEAR as i32);
                api.tex_parameter_i(gl::TEXTURE_2D, gl::TEXTURE_WRAP_S, gl::CLAMP_TO_EDGE as i32);
                api.tex_parameter_i(gl::TEXTURE_2D, gl::TEXTURE_WRAP_T, gl::CLAMP_TO_EDGE as i32);
            }
            self.channels.push(channel);
        }
        api.bind_texture(gl::TEXTURE_2D, 0);
        self.size = size;
        check_error(api, "simulation texture allocation")?;

        if with_framebuffers {
            self.create_framebuffers(api)?;
        }

        debug!(
            channels = self.channels.len(),
            size, with_framebuffers, "allocated simulation state"
        );
        Ok(())
    }

    fn create_framebuffers(&mut self, api: &dyn GlApi) -> Result<(), GlError> {
        for index in 0..2 {
            let Some(fb) = FramebufferId::from_raw(api.gen_framebuffer()) else {
                continue;
            };
            self.framebuffers[index] = Some(fb);

            api.bind_framebuffer(gl::FRAMEBUFFER, fb.get());
            for (attachment, channel) in self.channels.iter().enumerate() {
                if let Some(texture) = channel.textures[index] {
                    api.framebuffer_texture_2d(
                        gl::FRAMEBUFFER,
                        gl::COLOR_ATTACHMENT0 + attachment as u32,
                        gl::TEXTURE_2D,
                        texture.get(),
                    );
                }
            }
            let status = api.check_framebuffer_status(gl::FRAMEBUFFER);
            if status != gl::FRAMEBUFFER_COMPLETE {
                warn!(index, status, "simulation framebuffer incomplete");
            }
        }
        api.bind_framebuffer(gl::FRAMEBUFFER, 0);
        check_error(api, "simulation framebuffer setup")
    }

    pub fn is_allocated(&self) -> bool {
        !self.channels.is_empty()
    }

    /// Texture size fixed at allocation time.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.is_allocated().then_some((self.size, self.size))
    }

    pub fn channels(&self) -> impl Iterator<Item = &ChannelSpec> {
        self.channels.iter().map(|c| &c.spec)
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn next_index(&self) -> usize {
        self.current ^ 1
    }

    /// Swap current and next. Call exactly once per completed frame.
    pub fn advance(&mut self) {
        self.current ^= 1;
    }

    /// Texture of `channel` read by the next draw.
    pub fn current_texture(&self, channel: usize) -> Option<TextureId> {
        self.channels.get(channel)?.textures[self.current]
    }

    /// Texture of `channel` written by the next draw.
    pub fn next_texture(&self, channel: usize) -> Option<TextureId> {
        self.channels.get(channel)?.textures[self.next_index()]
    }

    pub fn framebuffer(&self, index: usize) -> Option<FramebufferId> {
        self.framebuffers.get(index).copied().flatten()
    }

    /// Release every texture and framebuffer exactly once. Safe to call on a
    /// state that was never allocated, and safe to call repeatedly.
    pub fn dispose(&mut self, api: &dyn GlApi) {
        if self.framebuffers.iter().any(Option::is_some) {
            api.bind_framebuffer(gl::FRAMEBUFFER, 0);
        }
        for fb in self.framebuffers.iter_mut() {
            if let Some(fb) = fb.take() {
                api.delete_framebuffer(fb.get());
            }
        }
        for channel in self.channels.drain(..) {
            for texture in channel.textures.into_iter().flatten() {
                api.delete_texture(texture.get());
            }
        }
        self.current = 0;
        self.size = 0;
    }
}
