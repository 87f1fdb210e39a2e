//! Feedback values to packed point colors.
//!
//! Colors are packed `0xAARRGGBB`.

use crate::inputs::PointSource;

pub type Rgba = u32;

pub const BLACK: Rgba = 0xff00_0000;

fn quantize(channel: f32) -> u8 {
    if channel.is_finite() {
        (channel.clamp(0.0, 1.0) * 255.0).round() as u8
    } else {
        0
    }
}

/// Pack 8-bit channels.
pub fn pack(r: u8, g: u8, b: u8, a: u8) -> Rgba {
    (u32::from(a) << 24) | (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b)
}

pub fn alpha(color: Rgba) -> u8 {
    (color >> 24) as u8
}

/// Rec. 709 relative luminance in `[0, 1]` of the quantized color.
pub fn luminosity(r: u8, g: u8, b: u8) -> f32 {
    (0.2126 * f32::from(r) + 0.7152 * f32::from(g) + 0.0722 * f32::from(b)) / 255.0
}

/// Map one raw feedback triple to a color.
///
/// Below `threshold` the alpha fades linearly with luminosity; at or above it
/// the color is opaque.
pub fn shade(rgb: [f32; 3], threshold: f32) -> Rgba {
    let [r, g, b] = rgb.map(quantize);
    let bright = luminosity(r, g, b);
    if bright < threshold {
        let a = (255.0 * (bright / threshold)).clamp(0.0, 255.0) as u8;
        pack(r, g, b, a)
    } else {
        pack(r, g, b, 255)
    }
}

/// Shade every point of `points` from `feedback` (three floats per point)
/// into `colors`, indexed by each point's color index.
///
/// Points without feedback data or whose color index is out of range are
/// left untouched.
pub fn post_process(
    feedback: &[f32],
    threshold: f32,
    points: &dyn PointSource,
    colors: &mut [Rgba],
) {
    for (point, rgb) in feedback
        .chunks_exact(3)
        .take(points.point_count())
        .enumerate()
    {
        if let Some(slot) = colors.get_mut(points.color_index(point)) {
            *slot = shade([rgb[0], rgb[1], rgb[2]], threshold);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inputs::StaticPoints;

    #[test]
    fn black_below_threshold_is_transparent() {
        let c = shade([0.0, 0.0, 0.0], 0.1);
        assert_eq!(alpha(c), 0);
    }

    #[test]
    fn white_above_threshold_is_opaque() {
        assert_eq!(shade([1.0, 1.0, 1.0], 0.1), 0xffff_ffff);
    }

    #[test]
    fn alpha_scales_with_luminosity() {
        // Pure green at half intensity: luminosity ~0.36.
        let c = shade([0.0, 0.5, 0.0], 0.72);
        let a = alpha(c);
        assert!((120..=130).contains(&a), "alpha {a}");
        assert_eq!((c >> 8) & 0xff, 128);
    }

    #[test]
    fn negative_threshold_never_fades() {
        assert_eq!(alpha(shade([0.0, 0.0, 0.0], -0.1)), 255);
    }

    #[test]
    fn out_of_range_channels_are_clamped() {
        assert_eq!(shade([4.0, -1.0, f32::NAN], 0.0), pack(255, 0, 0, 255));
    }

    #[test]
    fn post_process_writes_by_color_index() {
        let points = StaticPoints::new(vec![[0.0; 3]; 2]);
        let feedback = [1.0, 1.0, 1.0, 0.0, 0.0, 0.0];
        let mut colors = [BLACK; 3];
        post_process(&feedback, 0.1, &points, &mut colors);

        assert_eq!(colors[0], 0xffff_ffff);
        assert_eq!(alpha(colors[1]), 0);
        assert_eq!(colors[2], BLACK);
    }
}
