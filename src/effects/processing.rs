// SPDX-License-Identifier: GPL-3.0-only

//! CPU effect implementations for RGBA preview frames
//!
//! Every effect takes a strength in `0.0..=1.0`; zero leaves the frame
//! untouched and one applies the full effect. Values outside the range are
//! clamped.

use super::{EffectDefinition, EffectKind};
use crate::constants::effect_parameter;
use image::RgbaImage;

/// Apply an attached effect definition to a frame in place.
///
/// The strength is read from the definition's property set on every call so
/// live parameter updates are picked up by the next frame.
pub fn apply_definition(image: &mut RgbaImage, kind: EffectKind, definition: &EffectDefinition) {
    let strength = definition
        .property(kind.parameter_name())
        .unwrap_or(effect_parameter::DEFAULT);
    apply_effect(image, kind, strength);
}

/// Apply `kind` at `strength` to an RGBA frame in place
pub fn apply_effect(image: &mut RgbaImage, kind: EffectKind, strength: f32) {
    let strength = strength.clamp(0.0, 1.0);
    if strength == 0.0 {
        return;
    }

    match kind {
        EffectKind::EdgeDetection => apply_edge_detection(image, strength),
        EffectKind::Saturation => {
            // Strength is the saturation that remains: 1 keeps the source colours
            map_pixels(image, |r, g, b| {
                let l = luminance(r, g, b);
                (
                    l + (r - l) * strength,
                    l + (g - l) * strength,
                    l + (b - l) * strength,
                )
            })
        }
        EffectKind::Sepia => map_pixels(image, |r, g, b| {
            let l = luminance(r, g, b);
            let (sr, sg, sb) = (l * 1.2 + 0.1, l * 0.9 + 0.05, l * 0.7);
            (
                mix(r, sr, strength),
                mix(g, sg, strength),
                mix(b, sb, strength),
            )
        }),
        EffectKind::Vignette => apply_vignette(image, strength),
    }
}

#[inline]
fn luminance(r: f32, g: f32, b: f32) -> f32 {
    0.299 * r + 0.587 * g + 0.114 * b
}

#[inline]
fn mix(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[inline]
fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[inline]
fn to_unit(v: u8) -> f32 {
    v as f32 / 255.0
}

#[inline]
fn to_byte(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Run a per-pixel colour transform, leaving alpha untouched
fn map_pixels(image: &mut RgbaImage, f: impl Fn(f32, f32, f32) -> (f32, f32, f32)) {
    for pixel in image.pixels_mut() {
        let [r, g, b, a] = pixel.0;
        let (r, g, b) = f(to_unit(r), to_unit(g), to_unit(b));
        pixel.0 = [to_byte(r), to_byte(g), to_byte(b), a];
    }
}

fn apply_vignette(image: &mut RgbaImage, strength: f32) {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return;
    }

    for (x, y, pixel) in image.enumerate_pixels_mut() {
        // Pixel centres in normalized 0-1 coordinates
        let dx = (x as f32 + 0.5) / width as f32 - 0.5;
        let dy = (y as f32 + 0.5) / height as f32 - 0.5;
        let dist = (dx * dx + dy * dy).sqrt();
        let factor = 1.0 - strength * smoothstep(0.3, 0.9, dist);

        let [r, g, b, a] = pixel.0;
        pixel.0 = [
            to_byte(to_unit(r) * factor),
            to_byte(to_unit(g) * factor),
            to_byte(to_unit(b) * factor),
            a,
        ];
    }
}

/// Sobel edge magnitude on luminance, blended over the source.
///
/// At full strength the output is white edges on black.
fn apply_edge_detection(image: &mut RgbaImage, strength: f32) {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return;
    }

    let luma: Vec<f32> = image
        .pixels()
        .map(|p| luminance(to_unit(p.0[0]), to_unit(p.0[1]), to_unit(p.0[2])))
        .collect();

    let sample = |x: i64, y: i64| -> f32 {
        let x = x.clamp(0, width as i64 - 1) as usize;
        let y = y.clamp(0, height as i64 - 1) as usize;
        luma[y * width as usize + x]
    };

    for (px, py, pixel) in image.enumerate_pixels_mut() {
        let x = px as i64;
        let y = py as i64;

        let tl = sample(x - 1, y - 1);
        let tm = sample(x, y - 1);
        let tr = sample(x + 1, y - 1);
        let ml = sample(x - 1, y);
        let mr = sample(x + 1, y);
        let bl = sample(x - 1, y + 1);
        let bm = sample(x, y + 1);
        let br = sample(x + 1, y + 1);

        let gx = -tl - 2.0 * ml - bl + tr + 2.0 * mr + br;
        let gy = -tl - 2.0 * tm - tr + bl + 2.0 * bm + br;
        let edge = (gx * gx + gy * gy).sqrt().min(1.0);

        let [r, g, b, a] = pixel.0;
        pixel.0 = [
            to_byte(mix(to_unit(r), edge, strength)),
            to_byte(mix(to_unit(g), edge, strength)),
            to_byte(mix(to_unit(b), edge, strength)),
            a,
        ];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::EffectDescriptor;
    use image::Rgba;

    fn solid(width: u32, height: u32, color: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba(color))
    }

    fn gradient(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x * 16) as u8, (y * 16) as u8, 200, 255])
        })
    }

    #[test]
    fn test_zero_strength_is_identity() {
        for kind in EffectKind::ALL {
            let original = gradient(8, 8);
            let mut image = original.clone();
            apply_effect(&mut image, kind, 0.0);
            assert_eq!(image, original, "{} changed the frame at strength 0", kind);
        }
    }

    #[test]
    fn test_saturation_zero_remaining_is_gray() {
        let mut image = solid(2, 2, [200, 40, 40, 255]);
        apply_effect(&mut image, EffectKind::Saturation, 1.0);
        // Full strength keeps the colours
        assert_eq!(image.get_pixel(0, 0).0, [200, 40, 40, 255]);

        let mut image = solid(2, 2, [200, 40, 40, 255]);
        apply_effect(&mut image, EffectKind::Saturation, 0.0001);
        let [r, g, b, _] = image.get_pixel(0, 0).0;
        assert!(r.abs_diff(g) <= 1 && g.abs_diff(b) <= 1);
    }

    #[test]
    fn test_sepia_is_warm() {
        let mut image = solid(2, 2, [128, 128, 128, 255]);
        apply_effect(&mut image, EffectKind::Sepia, 1.0);
        let [r, g, b, a] = image.get_pixel(1, 1).0;
        assert!(r > g && g > b);
        assert_eq!(a, 255);
    }

    #[test]
    fn test_vignette_darkens_corners() {
        let mut image = solid(32, 32, [255, 255, 255, 255]);
        apply_effect(&mut image, EffectKind::Vignette, 1.0);
        let center = image.get_pixel(16, 16).0[0];
        let corner = image.get_pixel(0, 0).0[0];
        assert_eq!(center, 255);
        assert!(corner < center);
    }

    #[test]
    fn test_edge_detection_of_flat_image_is_black() {
        let mut image = solid(6, 6, [90, 160, 30, 255]);
        apply_effect(&mut image, EffectKind::EdgeDetection, 1.0);
        assert!(image.pixels().all(|p| p.0[..3] == [0, 0, 0]));
    }

    #[test]
    fn test_edge_detection_finds_vertical_edge() {
        let mut image = RgbaImage::from_fn(8, 8, |x, _| {
            if x < 4 {
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([255, 255, 255, 255])
            }
        });
        apply_effect(&mut image, EffectKind::EdgeDetection, 1.0);
        assert_eq!(image.get_pixel(4, 4).0[0], 255);
        assert_eq!(image.get_pixel(0, 4).0[0], 0);
    }

    #[test]
    fn test_definition_strength_follows_live_property() {
        let definition = EffectDescriptor::with_parameter("Sepia", "Intensity", 0.0).to_definition();
        let original = gradient(4, 4);

        let mut image = original.clone();
        apply_definition(&mut image, EffectKind::Sepia, &definition);
        assert_eq!(image, original);

        definition.properties.as_ref().unwrap().insert("Intensity", 1.0);
        let mut image = original.clone();
        apply_definition(&mut image, EffectKind::Sepia, &definition);
        assert_ne!(image, original);
    }
}
