use gl::types::GLsizei;
use pointshade_core::inputs::{fill_audio_snapshot, SpectrumSource, AUDIO_SNAPSHOT_LEN};
use pointshade_gl::{check_error, GlApi, GlError, TextureId};
use tracing::debug;

pub const AUDIO_WIDTH: GLsizei = 512;
pub const AUDIO_HEIGHT: GLsizei = 2;

/// A 512×2 single-channel texture holding the latest spectrum snapshot.
/// Refreshed every frame, not double-buffered.
#[derive(Debug)]
pub struct AudioTexture {
    texture: Option<TextureId>,
    snapshot: Box<[u8; AUDIO_SNAPSHOT_LEN]>,
}

impl AudioTexture {
    pub fn create(api: &dyn GlApi) -> Result<Self, GlError> {
        let mut audio = Self {
            texture: TextureId::from_raw(api.gen_texture()),
            snapshot: Box::new([0; AUDIO_SNAPSHOT_LEN]),
        };
        let Some(texture) = audio.texture else {
            check_error(api, "audio texture creation")?;
            return Err(GlError::NoObject {
                op: "audio texture creation",
            });
        };

        api.bind_texture(gl::TEXTURE_2D, texture.get());
        api.tex_parameter_i(gl::TEXTURE_2D, gl::TEXTURE_MAG_FILTER, gl::NEAREST as i32);
        api.tex_parameter_i(gl::TEXTURE_2D, gl::TEXTURE_MIN_FILTER, gl::NEAREST as i32);
        api.tex_parameter_i(gl::TEXTURE_2D, gl::TEXTURE_WRAP_S, gl::MIRRORED_REPEAT as i32);
        api.tex_parameter_i(gl::TEXTURE_2D, gl::TEXTURE_WRAP_T, gl::MIRRORED_REPEAT as i32);
        api.pixel_store_i(gl::UNPACK_ALIGNMENT, 1);
        api.tex_image_2d(
            gl::TEXTURE_2D,
            gl::R8 as i32,
            AUDIO_WIDTH,
            AUDIO_HEIGHT,
            gl::RED,
            gl::UNSIGNED_BYTE,
            Some(&audio.snapshot[..]),
        );
        api.bind_texture(gl::TEXTURE_2D, 0);

        if let Err(err) = check_error(api, "audio texture creation") {
            audio.dispose(api);
            return Err(err);
        }
        debug!(texture = texture.get(), "created audio texture");
        Ok(audio)
    }

    pub fn handle(&self) -> Option<TextureId> {
        self.texture
    }

    /// Last uploaded snapshot.
    pub fn snapshot(&self) -> &[u8; AUDIO_SNAPSHOT_LEN] {
        &self.snapshot
    }

    /// Sample `spectrum` and upload it.
    pub fn refresh(&mut self, api: &dyn GlApi, spectrum: &dyn SpectrumSource) -> Result<(), GlError> {
        let Some(texture) = self.texture else {
            return Ok(());
        };
        fill_audio_snapshot(spectrum, &mut self.snapshot);

        api.bind_texture(gl::TEXTURE_2D, texture.get());
        api.tex_sub_image_2d(
            gl::TEXTURE_2D,
            AUDIO_WIDTH,
            AUDIO_HEIGHT,
            gl::RED,
            gl::UNSIGNED_BYTE,
            &self.snapshot[..],
        );
        api.bind_texture(gl::TEXTURE_2D, 0);
        check_error(api, "audio texture update")
    }

    pub fn dispose(&mut self, api: &dyn GlApi) {
        if let Some(texture) = self.texture.take() {
            api.delete_texture(texture.get());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pointshade_gl::testing::FakeGl;

    struct Flat(f32);

    impl SpectrumSource for Flat {
        fn band_count(&self) -> usize {
            16
        }

        fn band(&self, _index: usize) -> f32 {
            self.0
        }
    }

    #[test]
    fn creates_r8_texture_with_nearest_mirrored_sampling() {
        let api = FakeGl::new();
        let audio = AudioTexture::create(&api).unwrap();
        let tex = audio.handle().unwrap().get();

        let image = api.texture_image(tex).unwrap();
        assert_eq!((image.width, image.height), (512, 2));
        assert_eq!(image.internal_format, gl::R8 as i32);
        assert_eq!(
            api.texture_parameter(tex, gl::TEXTURE_WRAP_S),
            Some(gl::MIRRORED_REPEAT as i32)
        );
        assert_eq!(
            api.texture_parameter(tex, gl::TEXTURE_MIN_FILTER),
            Some(gl::NEAREST as i32)
        );
    }

    #[test]
    fn refresh_uploads_snapshot() {
        let api = FakeGl::new();
        let mut audio = AudioTexture::create(&api).unwrap();
        let before = api.upload_count();

        audio.refresh(&api, &Flat(1.0)).unwrap();
        assert_eq!(api.upload_count(), before + 1);
        assert!(audio.snapshot().iter().all(|b| *b == 255));
    }

    #[test]
    fn missing_texture_name_is_reported() {
        let api = FakeGl::new();
        api.return_no_object("gen_texture");

        let err = AudioTexture::create(&api).unwrap_err();
        assert_eq!(
            err,
            GlError::NoObject {
                op: "audio texture creation"
            }
        );
        assert_eq!(api.live_objects(), 0);
    }

    #[test]
    fn dispose_twice_frees_once() {
        let api = FakeGl::new();
        let mut audio = AudioTexture::create(&api).unwrap();
        audio.dispose(&api);
        audio.dispose(&api);
        assert_eq!(api.live_objects(), 0);
        assert_eq!(api.double_frees(), 0);
        assert!(audio.refresh(&api, &Flat(0.5)).is_ok());
    }
}
