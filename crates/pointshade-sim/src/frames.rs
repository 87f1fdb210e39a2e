//! Still-image frame sequences, one texture per image file.

use std::fs;
use std::path::{Path, PathBuf};

use gl::types::GLsizei;
use image::imageops::FilterType;
use image::RgbaImage;
use pointshade_gl::{check_error, GlApi, TextureId, TextureLimits};
use tracing::{info, warn};

const EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

#[derive(Debug)]
struct Frame {
    file_name: String,
    texture: TextureId,
}

#[derive(Debug, Default)]
pub struct FrameSequence {
    frames: Vec<Frame>,
    dir: Option<PathBuf>,
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| EXTENSIONS.iter().any(|x| x.eq_ignore_ascii_case(e)))
}

/// Image files of `dir` sorted by file name. A missing directory has none.
pub fn list_frames(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_file() && is_image(p))
        .collect();
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    files
}

fn decode(path: &Path, limits: &TextureLimits) -> image::ImageResult<RgbaImage> {
    let image = image::open(path)?.to_rgba8();
    let (width, height) = image.dimensions();
    if limits.fits(width, height) {
        return Ok(image);
    }
    let (w, h) = limits.scale_to_fit(width, height);
    warn!(
        path = %path.display(),
        from = ?(width, height),
        to = ?(w, h),
        "frame exceeds max texture size, resizing"
    );
    Ok(image::imageops::resize(&image, w, h, FilterType::Triangle))
}

impl FrameSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the sequence with the images in `dir`.
    ///
    /// Files that fail to decode or upload are skipped. Returns the number of
    /// frames loaded.
    pub fn load_dir(&mut self, api: &dyn GlApi, dir: Option<&Path>, limits: &TextureLimits) -> usize {
        self.clear(api);
        self.dir = dir.map(Path::to_path_buf);

        let Some(dir) = dir.filter(|d| !d.as_os_str().is_empty()) else {
            return 0;
        };
        if !dir.is_dir() {
            warn!(dir = %dir.display(), "frame directory does not exist");
            return 0;
        }

        for path in list_frames(dir) {
            let image = match decode(&path, limits) {
                Ok(image) => image,
                Err(err) => {
                    warn!(path = %path.display(), %err, "skipping unreadable frame");
                    continue;
                }
            };
            let Some(texture) = TextureId::from_raw(api.gen_texture()) else {
                warn!(path = %path.display(), "could not create frame texture");
                continue;
            };
            let (width, height) = image.dimensions();
            api.bind_texture(gl::TEXTURE_2D, texture.get());
            api.tex_image_2d(
                gl::TEXTURE_2D,
                gl::RGBA8 as i32,
                width as GLsizei,
                height as GLsizei,
                gl::RGBA,
                gl::UNSIGNED_BYTE,
                Some(image.as_raw().as_slice()),
            );
            api.tex_parameter_i(gl::TEXTURE_2D, gl::TEXTURE_MAG_FILTER, gl::NEAREST as i32);
            api.tex_parameter_i(gl::TEXTURE_2D, gl::TEXTURE_MIN_FILTER, gl::NEAREST as i32);
            api.tex_parameter_i(gl::TEXTURE_2D, gl::TEXTURE_WRAP_S, gl::REPEAT as i32);
            api.tex_parameter_i(gl::TEXTURE_2D, gl::TEXTURE_WRAP_T, gl::REPEAT as i32);
            api.bind_texture(gl::TEXTURE_2D, 0);

            if check_error(api, "frame texture upload").is_err() {
                api.delete_texture(texture.get());
                continue;
            }
            self.frames.push(Frame {
                file_name: path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                texture,
            });
        }

        info!(dir = %dir.display(), frames = self.frames.len(), "loaded frame sequence");
        self.frames.len()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.frames.iter().map(|f| f.file_name.as_str())
    }

    pub fn texture(&self, index: usize) -> Option<TextureId> {
        self.frames.get(index).map(|f| f.texture)
    }

    /// Frame selected by a `frame` parameter value: rounded down and clamped
    /// into range. `None` when the sequence is empty.
    pub fn clamp_index(&self, value: f32) -> Option<usize> {
        let last = self.frames.len().checked_sub(1)?;
        if !value.is_finite() || value <= 0.0 {
            return Some(0);
        }
        Some((value.floor() as usize).min(last))
    }

    /// Upper bound of the `frame` parameter for this sequence.
    pub fn parameter_max(&self) -> f32 {
        match self.frames.len() {
            0 => 1.0,
            n => (n - 1) as f32,
        }
    }

    /// Delete every frame texture.
    pub fn clear(&mut self, api: &dyn GlApi) {
        for frame in self.frames.drain(..) {
            api.delete_texture(frame.texture.get());
        }
    }
}
