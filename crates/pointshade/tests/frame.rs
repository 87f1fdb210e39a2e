mod common;

use common::Rig;
use pointshade_core::color::{self, BLACK};
use pointshade_core::Variant;
use pointshade_gl::testing::ObjectKind;

#[test]
fn time_and_parameters_reach_the_shader() {
    let rig = Rig::new();
    let mut pattern = rig.pattern("ripple");
    pattern.host_mut().set_value("speed", 2.0);
    pattern.host_mut().set_value("amp", 0.25);

    assert!(pattern.run_frame(500.0));
    assert_eq!(rig.gl.uniform_value("fTime"), Some(1.0));
    assert_eq!(rig.gl.uniform_value("amp"), Some(0.25));
    assert_eq!(rig.gl.uniform_value("freq"), Some(6.0));
    assert_eq!(rig.gl.draws(), [(gl::POINTS, 0, 2)]);

    pattern.on_active();
    assert_eq!(pattern.elapsed_ms(), 0.0);
    pattern.run_frame(250.0);
    assert_eq!(rig.gl.uniform_value("fTime"), Some(0.5));
}

#[test]
fn fluid_channels_are_read_from_the_current_index() {
    let rig = Rig::new();
    let mut pattern = rig.pattern("navierStokes");

    for _ in 0..3 {
        let state = pattern.simulation();
        let expected: Vec<_> = (0..3).map(|c| state.current_texture(c)).collect();
        let start = state.current_index();

        assert!(pattern.run_frame(16.0));
        for (unit, texture) in expected.into_iter().enumerate() {
            assert_eq!(rig.gl.texture_at_draw(unit as u32), texture.map(|t| t.get()));
        }
        assert_eq!(pattern.simulation().current_index(), start ^ 1);
    }
    // Audio sits next to the fluid channels.
    assert!(rig.gl.texture_at_draw(3).is_some());
    assert_eq!(rig.gl.uniform_value("audioTexture"), Some(3.0));
}

#[test]
fn advance_happens_even_when_the_draw_fails() {
    let rig = Rig::new();
    let mut pattern = rig.pattern("ripple");
    rig.gl.fail_op("draw_arrays", gl::INVALID_OPERATION);

    for k in 1..=5 {
        assert!(!pattern.run_frame(16.0));
        assert_eq!(pattern.simulation().current_index(), k % 2);
    }
    // The failed pass still restored the GL state.
    assert!(!rig.gl.is_enabled(gl::RASTERIZER_DISCARD));
    assert_eq!(rig.gl.current_program(), 0);
}

#[test]
fn unavailable_context_skips_the_frame() {
    let rig = Rig::new();
    let mut pattern = rig.pattern("ripple");
    rig.context.set_available(false);

    assert!(!pattern.run_frame(16.0));
    assert!(rig.gl.draws().is_empty());
    assert_eq!(pattern.simulation().current_index(), 1);

    rig.context.set_available(true);
    assert!(pattern.run_frame(16.0));
}

#[test]
fn run_shades_feedback_into_colors() {
    let rig = Rig::new();
    let mut pattern = rig.pattern("ripple");
    rig.gl.set_feedback(vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);

    let mut colors = [0; 2];
    pattern.run(16.0, &mut colors);
    assert_eq!(color::alpha(colors[0]), 0);
    assert_eq!(colors[1], 0xffff_ffff);

    // A failing frame keeps showing the last colors.
    rig.gl.fail_op("get_buffer_sub_data_f32", gl::INVALID_OPERATION);
    rig.gl.set_feedback(vec![0.0; 6]);
    let mut again = [0; 2];
    pattern.run(16.0, &mut again);
    assert_eq!(again, colors);
}

#[test]
fn run_without_program_is_black() {
    let rig = Rig::new();
    let mut pattern = rig.pattern("missing");

    let mut colors = [0x1234_5678; 2];
    pattern.run(16.0, &mut colors);
    assert_eq!(colors, [BLACK; 2]);
}

#[test]
fn dispose_releases_everything_once() {
    let rig = Rig::new();
    let mut pattern = rig.pattern("navierStokes");
    pattern.run_frame(16.0);
    assert!(rig.gl.live_count(ObjectKind::Texture) > 0);

    pattern.dispose();
    pattern.dispose();
    assert_eq!(rig.gl.live_objects(), 0);
    assert_eq!(rig.gl.double_frees(), 0);
    assert!(rig.cache.is_empty());
    assert!(!pattern.run_frame(16.0));

    drop(pattern);
    assert_eq!(rig.gl.double_frees(), 0);
    assert_eq!(rig.context.acquires(), rig.context.releases());
}

#[test]
fn dropping_a_pattern_disposes_it() {
    let rig = Rig::new();
    {
        let mut config = rig.config(Variant::Fluid, "ripple");
        config.fluid_texture_size = 4;
        let _pattern = rig.pattern_with(config);
        assert!(rig.gl.live_objects() > 0);
    }
    assert_eq!(rig.gl.live_objects(), 0);
}
