// Diagnostic overlay - skeleton, landmark markers and severity-coloured angle labels

use crate::core::glyphs;
use crate::models::analysis::{AngleMeasurement, Severity};
use crate::models::pose::{BodyLandmark, LandmarkSet};
use image::{Rgb, RgbImage};
use std::collections::BTreeMap;

/// Landmarks at or below this visibility are not drawn
pub const VISIBILITY_THRESHOLD: f32 = 0.5;

pub const LINE_THICKNESS: i64 = 3;
pub const MARKER_RADIUS: i64 = 5;

const TEXT_X: i32 = 10;
const TEXT_FIRST_BASELINE: i32 = 30;
const TEXT_LINE_STEP: i32 = 25;
const TEXT_SCALE: i32 = 2;

pub const SKELETON_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const MARKER_COLOR: Rgb<u8> = Rgb([0, 0, 255]);
pub const NORMAL_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const CAUTION_COLOR: Rgb<u8> = Rgb([255, 255, 0]);
pub const ANOMALOUS_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// MediaPipe pose skeleton edges, as landmark index pairs
pub const POSE_CONNECTIONS: [(usize, usize); 35] = [
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 7),
    (0, 4),
    (4, 5),
    (5, 6),
    (6, 8),
    (9, 10),
    (11, 12),
    (11, 13),
    (13, 15),
    (15, 17),
    (15, 19),
    (15, 21),
    (17, 19),
    (12, 14),
    (14, 16),
    (16, 18),
    (16, 20),
    (16, 22),
    (18, 20),
    (11, 23),
    (12, 24),
    (23, 24),
    (23, 25),
    (24, 26),
    (25, 27),
    (26, 28),
    (27, 29),
    (28, 30),
    (29, 31),
    (30, 32),
    (27, 31),
    (28, 32),
];

pub fn severity_color(severity: Severity) -> Rgb<u8> {
    match severity {
        Severity::Normal => NORMAL_COLOR,
        Severity::Caution => CAUTION_COLOR,
        Severity::Anomalous => ANOMALOUS_COLOR,
    }
}

/// "right_shoulder" -> "Right shoulder"
pub fn joint_label(joint_name: &str) -> String {
    let spaced = joint_name.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
        None => String::new(),
    }
}

/// Draw the pose overlay on a copy of `image`. Without landmarks the copy is returned untouched.
pub fn render_overlay(
    image: &RgbImage,
    keypoints: Option<&LandmarkSet>,
    angles: &BTreeMap<String, AngleMeasurement>,
) -> RgbImage {
    let mut overlay = image.clone();
    let keypoints = match keypoints {
        Some(keypoints) => keypoints,
        None => return overlay,
    };

    let width = overlay.width();
    let height = overlay.height();

    for &(start, end) in POSE_CONNECTIONS.iter() {
        let (Some(start), Some(end)) = (BodyLandmark::from_index(start), BodyLandmark::from_index(end)) else {
            continue;
        };
        let (Some(a), Some(b)) = (keypoints.get(start), keypoints.get(end)) else {
            continue;
        };
        if a.is_visible(VISIBILITY_THRESHOLD) && b.is_visible(VISIBILITY_THRESHOLD) {
            let p0 = to_pixel(a.x, a.y, width, height);
            let p1 = to_pixel(b.x, b.y, width, height);
            draw_line(&mut overlay, p0, p1, SKELETON_COLOR);
        }
    }

    for (_, landmark) in keypoints.iter() {
        if landmark.is_visible(VISIBILITY_THRESHOLD) {
            let center = to_pixel(landmark.x, landmark.y, width, height);
            fill_circle(&mut overlay, center, MARKER_RADIUS, MARKER_COLOR);
        }
    }

    let mut baseline = TEXT_FIRST_BASELINE;
    for (joint, measurement) in angles {
        let text = format!("{}: {:.1}°", joint_label(joint), measurement.angle_degrees);
        let color = severity_color(measurement.severity());
        let top = baseline - glyphs::GLYPH_HEIGHT * TEXT_SCALE;
        glyphs::draw_text(&mut overlay, TEXT_X, top, &text, color, TEXT_SCALE);
        baseline += TEXT_LINE_STEP;
    }

    overlay
}

/// Normalized coordinates to pixels, truncating toward zero. Wildly out-of-frame
/// points are pulled in to a few frame sizes so rasterisation stays bounded.
fn to_pixel(x: f32, y: f32, width: u32, height: u32) -> (i64, i64) {
    let limit_x = width as f64 * 4.0;
    let limit_y = height as f64 * 4.0;
    let px = (x as f64 * width as f64).clamp(-limit_x, limit_x);
    let py = (y as f64 * height as f64).clamp(-limit_y, limit_y);
    // NaN saturates to 0 on cast
    (px as i64, py as i64)
}

fn put_clipped(image: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && x < image.width() as i64 && y < image.height() as i64 {
        image.put_pixel(x as u32, y as u32, color);
    }
}

/// Bresenham line stamped with a square brush of `LINE_THICKNESS`
fn draw_line(image: &mut RgbImage, from: (i64, i64), to: (i64, i64), color: Rgb<u8>) {
    let half = LINE_THICKNESS / 2;
    let (mut x, mut y) = from;
    let dx = (to.0 - x).abs();
    let dy = -(to.1 - y).abs();
    let sx = if x < to.0 { 1 } else { -1 };
    let sy = if y < to.1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        for oy in -half..=half {
            for ox in -half..=half {
                put_clipped(image, x + ox, y + oy, color);
            }
        }
        if x == to.0 && y == to.1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

fn fill_circle(image: &mut RgbImage, center: (i64, i64), radius: i64, color: Rgb<u8>) {
    for oy in -radius..=radius {
        for ox in -radius..=radius {
            if ox * ox + oy * oy <= radius * radius {
                put_clipped(image, center.0 + ox, center.1 + oy, color);
            }
        }
    }
}
