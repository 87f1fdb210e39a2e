//! GPU-side state sampled by point shaders: ping-pong simulation textures,
//! the audio spectrum texture and image frame sequences.

pub mod audio;
pub mod channels;
pub mod frames;
pub mod state;

pub use audio::AudioTexture;
pub use channels::{ChannelFormat, ChannelSpec, FLUID_AUDIO_UNIT, FLUID_CHANNELS};
pub use frames::FrameSequence;
pub use state::SimulationState;
