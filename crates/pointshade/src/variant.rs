//! Sampler layout of each pattern variant.

use pointshade_core::Variant;
use pointshade_sim::{FLUID_AUDIO_UNIT, FLUID_CHANNELS};

pub const AUDIO_SAMPLER: &str = "audioTexture";
pub const FRAME_SAMPLER: &str = "textureSampler";

/// Texture unit of the frame texture in the frames variant.
pub const FRAME_UNIT: u32 = 0;
/// Texture unit of the audio texture in the frames variant.
pub const FRAMES_AUDIO_UNIT: u32 = 1;

/// Sampler uniforms resolved for programs of `variant`.
pub fn samplers(variant: Variant) -> Vec<&'static str> {
    match variant {
        Variant::Fluid => FLUID_CHANNELS
            .iter()
            .map(|c| c.sampler)
            .chain([AUDIO_SAMPLER])
            .collect(),
        Variant::Frames => vec![FRAME_SAMPLER, AUDIO_SAMPLER],
    }
}

pub fn audio_unit(variant: Variant) -> u32 {
    match variant {
        Variant::Fluid => FLUID_AUDIO_UNIT,
        Variant::Frames => FRAMES_AUDIO_UNIT,
    }
}
