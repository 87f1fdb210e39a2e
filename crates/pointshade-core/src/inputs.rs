//! Inputs sampled from the host every frame

/// Size in bytes of the spectrum snapshot uploaded to the audio texture.
pub const AUDIO_SNAPSHOT_LEN: usize = 1024;

/// A band-based audio spectrum reader.
pub trait SpectrumSource {
    fn band_count(&self) -> usize;

    /// Normalized magnitude of band `index`, nominally in `[0, 1]`.
    fn band(&self, index: usize) -> f32;
}

/// The fixture model: an ordered, fixed-size set of 3-D points.
pub trait PointSource {
    fn point_count(&self) -> usize;

    /// Write `point_count() * 3` coordinates into `out`.
    fn fill_positions(&self, out: &mut [f32]);

    /// Index into the output color buffer for point `point`.
    fn color_index(&self, point: usize) -> usize {
        point
    }
}

/// Sample `spectrum` into `out` by repeating its bands across the buffer.
///
/// A silent source (no bands) yields an all-zero snapshot.
pub fn fill_audio_snapshot(spectrum: &dyn SpectrumSource, out: &mut [u8; AUDIO_SNAPSHOT_LEN]) {
    let bands = spectrum.band_count();
    if bands == 0 {
        out.fill(0);
        return;
    }
    for (i, byte) in out.iter_mut().enumerate() {
        let magnitude = spectrum.band(i % bands);
        *byte = if magnitude.is_finite() {
            (magnitude.clamp(0.0, 1.0) * 255.0) as u8
        } else {
            0
        };
    }
}

/// A spectrum that never produces sound.
#[derive(Debug, Clone, Copy, Default)]
pub struct Silence;

impl SpectrumSource for Silence {
    fn band_count(&self) -> usize {
        0
    }

    fn band(&self, _index: usize) -> f32 {
        0.0
    }
}

/// Points held in memory, for drivers and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticPoints {
    pub positions: Vec<[f32; 3]>,
}

impl StaticPoints {
    pub fn new(positions: Vec<[f32; 3]>) -> Self {
        Self { positions }
    }
}

impl PointSource for StaticPoints {
    fn point_count(&self) -> usize {
        self.positions.len()
    }

    fn fill_positions(&self, out: &mut [f32]) {
        for (chunk, point) in out.chunks_exact_mut(3).zip(&self.positions) {
            chunk.copy_from_slice(point);
        }
    }
}
