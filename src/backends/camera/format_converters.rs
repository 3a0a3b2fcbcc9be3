// SPDX-License-Identifier: GPL-3.0-only
//! Pixel format conversion for V4L2 preview frames
//!
//! Capture devices deliver packed YUV 4:2:2 or MJPEG; the preview pipeline
//! works on RGBA.

use super::types::{BackendError, BackendResult};
use image::RgbaImage;

/// Packed 4:2:2 byte order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackedYuv {
    /// Y0 U Y1 V
    Yuyv,
    /// U Y0 V Y1
    Uyvy,
}

/// Convert packed YUV 4:2:2 to RGBA
///
/// Each 4-byte group encodes 2 pixels. `stride` is the number of bytes per
/// row (at least `width * 2`). Uses BT.601 coefficients.
pub fn packed_yuv_to_rgba(
    data: &[u8],
    width: u32,
    height: u32,
    stride: u32,
    order: PackedYuv,
) -> BackendResult<RgbaImage> {
    // Odd widths still occupy a whole 4-byte group for the last pixel
    let row_bytes = (width as usize).div_ceil(2) * 4;
    let stride = (stride as usize).max(row_bytes);
    let needed = stride * (height as usize).saturating_sub(1) + row_bytes;
    if data.len() < needed {
        return Err(BackendError::FormatNotSupported(format!(
            "frame has {} bytes, {}x{} packed YUV needs {}",
            data.len(),
            width,
            height,
            needed
        )));
    }

    let mut rgba = Vec::with_capacity(width as usize * height as usize * 4);
    for row in data.chunks(stride).take(height as usize) {
        let mut remaining = width as usize;
        for chunk in row[..row_bytes].chunks_exact(4) {
            let (y0, u, y1, v) = match order {
                PackedYuv::Yuyv => (chunk[0], chunk[1], chunk[2], chunk[3]),
                PackedYuv::Uyvy => (chunk[1], chunk[0], chunk[3], chunk[2]),
            };
            for y in [y0, y1].into_iter().take(remaining.min(2)) {
                let [r, g, b] = yuv_to_rgb(y, u, v);
                rgba.extend_from_slice(&[r, g, b, 255]);
            }
            remaining = remaining.saturating_sub(2);
        }
    }

    RgbaImage::from_raw(width, height, rgba)
        .ok_or_else(|| BackendError::Other("converted frame has the wrong size".to_string()))
}

/// Decode an MJPEG frame to RGBA
pub fn mjpeg_to_rgba(data: &[u8]) -> BackendResult<RgbaImage> {
    image::load_from_memory_with_format(data, image::ImageFormat::Jpeg)
        .map(|decoded| decoded.to_rgba8())
        .map_err(|e| BackendError::FormatNotSupported(format!("MJPEG decode failed: {}", e)))
}

/// Convert one YUV sample (BT.601) to RGB
#[inline]
fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let y = y as f32;
    let u = u as f32 - 128.0;
    let v = v as f32 - 128.0;

    let r = (y + 1.402 * v).clamp(0.0, 255.0) as u8;
    let g = (y - 0.344136 * u - 0.714136 * v).clamp(0.0, 255.0) as u8;
    let b = (y + 1.772 * u).clamp(0.0, 255.0) as u8;
    [r, g, b]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yuyv_white() {
        // Pure white in YUV (Y=255, U=128, V=128)
        let yuyv = vec![255u8, 128, 255, 128];
        let image = packed_yuv_to_rgba(&yuyv, 2, 1, 4, PackedYuv::Yuyv).unwrap();
        assert_eq!(image.get_pixel(0, 0).0, [255, 255, 255, 255]);
        assert_eq!(image.get_pixel(1, 0).0, [255, 255, 255, 255]);
    }

    #[test]
    fn test_uyvy_byte_order() {
        // Black left pixel, white right pixel, neutral chroma
        let uyvy = vec![128u8, 0, 128, 255];
        let image = packed_yuv_to_rgba(&uyvy, 2, 1, 4, PackedYuv::Uyvy).unwrap();
        assert_eq!(image.get_pixel(0, 0).0, [0, 0, 0, 255]);
        assert_eq!(image.get_pixel(1, 0).0, [255, 255, 255, 255]);
    }

    #[test]
    fn test_row_padding_is_skipped() {
        // 2x2 frame with 2 bytes of padding per row
        let data = vec![
            16, 128, 16, 128, 0xAA, 0xAA, //
            235, 128, 235, 128, 0xAA, 0xAA,
        ];
        let image = packed_yuv_to_rgba(&data, 2, 2, 6, PackedYuv::Yuyv).unwrap();
        assert_eq!(image.get_pixel(1, 0).0, [16, 16, 16, 255]);
        assert_eq!(image.get_pixel(0, 1).0, [235, 235, 235, 255]);
    }

    #[test]
    fn test_short_buffer_is_rejected() {
        let result = packed_yuv_to_rgba(&[0u8; 6], 2, 2, 4, PackedYuv::Yuyv);
        assert!(matches!(result, Err(BackendError::FormatNotSupported(_))));
    }

    #[test]
    fn test_invalid_mjpeg() {
        assert!(mjpeg_to_rgba(&[0xFF, 0xD8, 0x00]).is_err());
    }
}
