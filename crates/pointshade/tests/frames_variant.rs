mod common;

use std::path::Path;

use common::Rig;
use image::RgbaImage;
use pointshade_core::{HostParameters, Variant};
use pointshade_gl::testing::ObjectKind;

fn write_frames(dir: &Path, count: usize) {
    for i in 0..count {
        RgbaImage::new(4, 4)
            .save(dir.join(format!("frame{i:02}.png")))
            .unwrap();
    }
}

#[test]
fn frame_parameter_selects_the_sampled_texture() {
    let rig = Rig::new();
    let frames = tempfile::tempdir().unwrap();
    write_frames(frames.path(), 3);

    let mut config = rig.config(Variant::Frames, "texture");
    config.frame_dir = Some(frames.path().to_path_buf());
    let mut pattern = rig.pattern_with(config);

    assert_eq!(pattern.frames().len(), 3);
    assert_eq!(pattern.host().get("frame").unwrap().max, 2.0);
    assert!(pattern.simulation().dimensions().is_none());

    pattern.host_mut().set_value("frame", 1.7);
    assert!(pattern.run_frame(16.0));
    let second = pattern.frames().texture(1).unwrap().get();
    assert_eq!(rig.gl.texture_at_draw(0), Some(second));
    // Audio on the unit after the frame.
    assert!(rig.gl.texture_at_draw(1).is_some());
    assert_eq!(rig.gl.uniform_value("audioTexture"), Some(1.0));
}

#[test]
fn changing_the_frame_directory_replaces_textures_and_range() {
    let rig = Rig::new();
    let frames = tempfile::tempdir().unwrap();
    write_frames(frames.path(), 2);
    let mut config = rig.config(Variant::Frames, "texture");
    config.frame_dir = Some(frames.path().to_path_buf());
    let mut pattern = rig.pattern_with(config);
    assert_eq!(rig.gl.live_count(ObjectKind::Texture), 3);

    let empty = tempfile::tempdir().unwrap();
    assert_eq!(pattern.on_frame_dir_changed(Some(empty.path())).unwrap(), 0);
    // Only the audio texture is left.
    assert_eq!(rig.gl.live_count(ObjectKind::Texture), 1);
    assert_eq!(pattern.host().get("frame").unwrap().max, 1.0);
    assert!(pattern.host().contains("frame"));

    // No frame to sample: the draw still runs without it.
    assert!(pattern.run_frame(16.0));
    assert_eq!(rig.gl.texture_at_draw(0), None);

    write_frames(empty.path(), 5);
    assert_eq!(pattern.on_frame_dir_changed(Some(empty.path())).unwrap(), 5);
    assert_eq!(pattern.host().get("frame").unwrap().max, 4.0);
    assert_eq!(pattern.config().frame_dir.as_deref(), Some(empty.path()));
}

#[test]
fn selected_frame_survives_rebuilds() {
    let rig = Rig::new();
    let frames = tempfile::tempdir().unwrap();
    write_frames(frames.path(), 4);
    let mut config = rig.config(Variant::Frames, "texture");
    config.frame_dir = Some(frames.path().to_path_buf());
    let mut pattern = rig.pattern_with(config);
    pattern.host_mut().set_value("frame", 3.0);

    rig.context.recreate();
    assert!(pattern.run_frame(16.0));
    assert_eq!(pattern.host().value("frame"), Some(3.0));
    let last = pattern.frames().texture(3).unwrap().get();
    assert_eq!(rig.gl.texture_at_draw(0), Some(last));

    // A shorter sequence clamps the selection into range.
    let shorter = tempfile::tempdir().unwrap();
    write_frames(shorter.path(), 2);
    pattern.on_frame_dir_changed(Some(shorter.path())).unwrap();
    assert_eq!(pattern.host().value("frame"), Some(1.0));
}

#[test]
fn fluid_pattern_ignores_frame_directory() {
    let rig = Rig::new();
    let frames = tempfile::tempdir().unwrap();
    write_frames(frames.path(), 2);
    let mut pattern = rig.pattern("ripple");

    assert_eq!(pattern.on_frame_dir_changed(Some(frames.path())).unwrap(), 0);
    assert!(!pattern.host().contains("frame"));
}
