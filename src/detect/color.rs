use image::DynamicImage;
use std::collections::HashMap;

/// A quantized color bucket with its share of sampled pixels
#[derive(Debug, Clone, PartialEq)]
pub struct ColorBucket {
    pub rgb: (u8, u8, u8),
    pub hex: String,
    pub percentage: f32,
}

/// Maximum thumbnail edge used for sampling
const SAMPLE_EDGE: u32 = 100;
/// Channel quantization step: 8 buckets per channel, 512 possible colors
const QUANT_STEP: u8 = 32;

/// Approximate dominant colors of an image.
///
/// The image is downsampled to at most 100x100 and each channel is quantized
/// to 32-value steps before counting bucket frequency. This is a lossy
/// approximation of dominant colors, not a true clustering; two similar
/// shades can land in different buckets.
#[must_use]
pub fn dominant_colors(image: &DynamicImage, top_n: usize) -> Vec<ColorBucket> {
    let thumb = image.thumbnail(SAMPLE_EDGE, SAMPLE_EDGE).to_rgb8();
    let total_pixels = (thumb.width() * thumb.height()) as usize;
    if total_pixels == 0 || top_n == 0 {
        return Vec::new();
    }

    let mut counts: HashMap<(u8, u8, u8), usize> = HashMap::new();
    for pixel in thumb.pixels() {
        let key = (
            pixel[0] / QUANT_STEP * QUANT_STEP,
            pixel[1] / QUANT_STEP * QUANT_STEP,
            pixel[2] / QUANT_STEP * QUANT_STEP,
        );
        *counts.entry(key).or_insert(0) += 1;
    }

    let mut buckets: Vec<((u8, u8, u8), usize)> = counts.into_iter().collect();
    // Count descending; color value breaks ties so output is deterministic
    buckets.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    buckets.truncate(top_n);

    buckets
        .into_iter()
        .map(|((r, g, b), count)| ColorBucket {
            rgb: (r, g, b),
            hex: format!("#{r:02x}{g:02x}{b:02x}"),
            percentage: count as f32 / total_pixels as f32 * 100.0,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn solid(width: u32, height: u32, rgb: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(rgb)))
    }

    #[test]
    fn test_solid_image_single_bucket() {
        let colors = dominant_colors(&solid(50, 50, [200, 100, 40]), 5);
        assert_eq!(colors.len(), 1);
        // 200 -> 192, 100 -> 96, 40 -> 32 after /32*32 quantization
        assert_eq!(colors[0].rgb, (192, 96, 32));
        assert_eq!(colors[0].hex, "#c06020");
        assert!((colors[0].percentage - 100.0).abs() < 0.01);
    }

    #[test]
    fn test_two_tone_image_ordering() {
        let mut img = RgbImage::from_pixel(10, 10, Rgb([0, 0, 0]));
        // 30 of 100 pixels white, the rest black
        for y in 0..3 {
            for x in 0..10 {
                img.put_pixel(x, y, Rgb([255, 255, 255]));
            }
        }
        let colors = dominant_colors(&DynamicImage::ImageRgb8(img), 5);
        assert_eq!(colors.len(), 2);
        assert_eq!(colors[0].rgb, (0, 0, 0));
        assert!((colors[0].percentage - 70.0).abs() < 0.01);
        assert_eq!(colors[1].rgb, (224, 224, 224));
        assert!((colors[1].percentage - 30.0).abs() < 0.01);
    }

    #[test]
    fn test_top_n_truncation() {
        let mut img = RgbImage::new(4, 1);
        img.put_pixel(0, 0, Rgb([0, 0, 0]));
        img.put_pixel(1, 0, Rgb([64, 64, 64]));
        img.put_pixel(2, 0, Rgb([128, 128, 128]));
        img.put_pixel(3, 0, Rgb([192, 192, 192]));
        let colors = dominant_colors(&DynamicImage::ImageRgb8(img), 2);
        assert_eq!(colors.len(), 2);
    }

    #[test]
    fn test_large_image_is_downsampled() {
        // Sampling must stay bounded regardless of input size
        let colors = dominant_colors(&solid(2000, 1500, [10, 10, 10]), 5);
        assert_eq!(colors.len(), 1);
        assert!((colors[0].percentage - 100.0).abs() < 0.01);
    }
}
