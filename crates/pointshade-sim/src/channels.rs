use gl::types::{GLenum, GLint};

/// Texel layout of one simulation channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelFormat {
    /// Two 32-bit float components (e.g. velocity).
    Rg32f,
    /// One 32-bit float component (e.g. pressure, density).
    R32f,
}

impl ChannelFormat {
    pub fn internal_format(self) -> GLint {
        match self {
            ChannelFormat::Rg32f => gl::RG32F as GLint,
            ChannelFormat::R32f => gl::R32F as GLint,
        }
    }

    pub fn pixel_format(self) -> GLenum {
        match self {
            ChannelFormat::Rg32f => gl::RG,
            ChannelFormat::R32f => gl::RED,
        }
    }

    pub fn components(self) -> usize {
        match self {
            ChannelFormat::Rg32f => 2,
            ChannelFormat::R32f => 1,
        }
    }
}

/// One ping-pong channel: the sampler uniform that reads it and the texture
/// unit it is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelSpec {
    pub sampler: &'static str,
    pub unit: u32,
    pub format: ChannelFormat,
}

pub const FLUID_CHANNELS: [ChannelSpec; 3] = [
    ChannelSpec {
        sampler: "velocityTexture",
        unit: 0,
        format: ChannelFormat::Rg32f,
    },
    ChannelSpec {
        sampler: "pressureTexture",
        unit: 1,
        format: ChannelFormat::R32f,
    },
    ChannelSpec {
        sampler: "densityTexture",
        unit: 2,
        format: ChannelFormat::R32f,
    },
];

/// Texture unit of the audio texture next to [`FLUID_CHANNELS`].
pub const FLUID_AUDIO_UNIT: u32 = 3;
