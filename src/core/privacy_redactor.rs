// Privacy redaction - Gaussian blur over detected face regions

use crate::models::pose::DetectionBox;
use image::RgbImage;

/// Smallest blur kernel applied to a face region
pub const MIN_KERNEL_SIZE: u32 = 99;

/// Gaussian sigma used for face blurring
pub const BLUR_SIGMA: f64 = 30.0;

/// A face region in pixel coordinates, already clamped to the image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRegion {
    /// Convert a normalized box to pixels. Coordinates are truncated toward zero,
    /// the origin is clamped into the image and the extent is clipped to its edge.
    /// Returns `None` for boxes that end up empty.
    pub fn from_detection(detection: &DetectionBox, image_width: u32, image_height: u32) -> Option<Self> {
        if image_width == 0 || image_height == 0 {
            return None;
        }

        let w = image_width as i64;
        let h = image_height as i64;

        let x = (detection.xmin as f64 * w as f64) as i64;
        let y = (detection.ymin as f64 * h as f64) as i64;
        let width = (detection.width as f64 * w as f64) as i64;
        let height = (detection.height as f64 * h as f64) as i64;

        let x = x.clamp(0, w - 1);
        let y = y.clamp(0, h - 1);
        let width = width.min(w - x);
        let height = height.min(h - y);

        if width <= 0 || height <= 0 {
            return None;
        }

        Some(Self {
            x: x as u32,
            y: y as u32,
            width: width as u32,
            height: height as u32,
        })
    }

    /// Blur kernel size for this region: at least `MIN_KERNEL_SIZE`, always odd
    pub fn kernel_size(&self) -> u32 {
        let size = MIN_KERNEL_SIZE.max(self.width.min(self.height) / 4);
        if size % 2 == 0 {
            size + 1
        } else {
            size
        }
    }
}

/// Return a copy of `image` with every face box blurred. Pixels outside the
/// boxes are never read or written by the blur.
pub fn redact_faces(image: &RgbImage, faces: &[DetectionBox]) -> RgbImage {
    let mut redacted = image.clone();

    for face in faces {
        match PixelRegion::from_detection(face, image.width(), image.height()) {
            Some(region) => blur_region(&mut redacted, region),
            None => tracing::debug!("Skipping empty face box {:?}", face),
        }
    }

    redacted
}

/// Separable Gaussian blur confined to `region`, with reflect-101 borders at the region edge
fn blur_region(image: &mut RgbImage, region: PixelRegion) {
    let kernel = gaussian_kernel(region.kernel_size(), BLUR_SIGMA);
    let radius = (kernel.len() / 2) as i64;
    let rw = region.width as usize;
    let rh = region.height as usize;

    // Copy region into a float working buffer
    let mut buffer = vec![[0.0f64; 3]; rw * rh];
    for row in 0..rh {
        for col in 0..rw {
            let px = image.get_pixel(region.x + col as u32, region.y + row as u32);
            buffer[row * rw + col] = [px[0] as f64, px[1] as f64, px[2] as f64];
        }
    }

    // Horizontal pass
    let mut horizontal = vec![[0.0f64; 3]; rw * rh];
    for row in 0..rh {
        for col in 0..rw {
            let mut acc = [0.0f64; 3];
            for (k, weight) in kernel.iter().enumerate() {
                let src = reflect_101(col as i64 + k as i64 - radius, rw as i64);
                let value = buffer[row * rw + src];
                for c in 0..3 {
                    acc[c] += value[c] * weight;
                }
            }
            horizontal[row * rw + col] = acc;
        }
    }

    // Vertical pass, written straight back into the image
    for row in 0..rh {
        for col in 0..rw {
            let mut acc = [0.0f64; 3];
            for (k, weight) in kernel.iter().enumerate() {
                let src = reflect_101(row as i64 + k as i64 - radius, rh as i64);
                let value = horizontal[src * rw + col];
                for c in 0..3 {
                    acc[c] += value[c] * weight;
                }
            }
            let px = image.get_pixel_mut(region.x + col as u32, region.y + row as u32);
            for c in 0..3 {
                px[c] = acc[c].round().clamp(0.0, 255.0) as u8;
            }
        }
    }
}

/// Normalized 1-D Gaussian kernel of odd length `size`
fn gaussian_kernel(size: u32, sigma: f64) -> Vec<f64> {
    let center = (size / 2) as f64;
    let mut kernel: Vec<f64> = (0..size)
        .map(|i| {
            let d = i as f64 - center;
            (-(d * d) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f64 = kernel.iter().sum();
    for weight in &mut kernel {
        *weight /= sum;
    }
    kernel
}

/// Mirror an out-of-range index back into `0..len` without repeating the edge sample
fn reflect_101(index: i64, len: i64) -> usize {
    if len == 1 {
        return 0;
    }
    let period = 2 * (len - 1);
    let mut m = index.rem_euclid(period);
    if m >= len {
        m = period - m;
    }
    m as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn checkerboard(size: u32) -> RgbImage {
        RgbImage::from_fn(size, size, |x, y| {
            if (x + y) % 2 == 0 {
                Rgb([255, 255, 255])
            } else {
                Rgb([0, 0, 0])
            }
        })
    }

    #[test]
    fn test_no_faces_returns_identical_copy() {
        let image = checkerboard(16);
        assert_eq!(redact_faces(&image, &[]), image);
    }

    #[test]
    fn test_blur_changes_only_the_box() {
        let image = checkerboard(40);
        let face = DetectionBox::new(0.25, 0.25, 0.5, 0.5);
        let redacted = redact_faces(&image, &[face]);

        for y in 0..40 {
            for x in 0..40 {
                let inside = (10..30).contains(&x) && (10..30).contains(&y);
                if inside {
                    let value = redacted.get_pixel(x, y)[0];
                    assert!(value > 64 && value < 192, "pixel ({}, {}) not blurred: {}", x, y, value);
                } else {
                    assert_eq!(redacted.get_pixel(x, y), image.get_pixel(x, y));
                }
            }
        }
    }

    #[test]
    fn test_small_box_on_large_frame() {
        let image = checkerboard(100);
        let redacted = redact_faces(&image, &[DetectionBox::new(0.1, 0.1, 0.2, 0.2)]);

        let mut changed = 0;
        for y in 0..100 {
            for x in 0..100 {
                if redacted.get_pixel(x, y) != image.get_pixel(x, y) {
                    assert!((10..30).contains(&x) && (10..30).contains(&y), "pixel ({}, {}) changed", x, y);
                    changed += 1;
                }
            }
        }
        assert!(changed > 0);
    }

    #[test]
    fn test_uniform_region_is_unchanged_by_blur() {
        let image = RgbImage::from_pixel(30, 30, Rgb([10, 120, 200]));
        let redacted = redact_faces(&image, &[DetectionBox::new(0.1, 0.1, 0.5, 0.5)]);
        assert_eq!(redacted, image);
    }

    #[test]
    fn test_degenerate_boxes_are_skipped() {
        let image = checkerboard(20);
        let faces = [
            DetectionBox::new(0.5, 0.5, 0.0, 0.3),
            DetectionBox::new(0.5, 0.5, 0.3, -0.2),
            DetectionBox::new(0.2, 0.2, 0.01, 0.01), // truncates to zero pixels
        ];
        assert_eq!(redact_faces(&image, &faces), image);
    }

    #[test]
    fn test_region_clamped_to_image() {
        // Only the origin is clamped. An off-frame box keeps its extent and
        // blurs the strip along the nearest edge rather than being dropped.
        let region = PixelRegion::from_detection(&DetectionBox::new(0.75, -0.1, 0.5, 0.5), 40, 40).unwrap();
        assert_eq!(region, PixelRegion { x: 30, y: 0, width: 10, height: 20 });

        let region = PixelRegion::from_detection(&DetectionBox::new(1.5, 0.0, 0.5, 0.5), 40, 40).unwrap();
        assert_eq!(region.x, 39);
        assert_eq!(region.width, 1);

        let region = PixelRegion::from_detection(&DetectionBox::new(-0.5, 0.2, 0.3, 0.3), 40, 40).unwrap();
        assert_eq!(region, PixelRegion { x: 0, y: 8, width: 12, height: 12 });
    }

    #[test]
    fn test_kernel_size_is_odd_and_bounded() {
        let small = PixelRegion { x: 0, y: 0, width: 40, height: 40 };
        assert_eq!(small.kernel_size(), 99);

        let large = PixelRegion { x: 0, y: 0, width: 800, height: 1000 };
        assert_eq!(large.kernel_size(), 201);

        let kernel = gaussian_kernel(99, BLUR_SIGMA);
        assert!((kernel.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_reflect_101() {
        assert_eq!(reflect_101(-1, 5), 1);
        assert_eq!(reflect_101(5, 5), 3);
        assert_eq!(reflect_101(-9, 5), 1);
        assert_eq!(reflect_101(7, 1), 0);
    }
}
