// src/ui.rs - Annotated frame output
use crate::landmarks::{Handedness, RawHand, HAND_CONNECTIONS};
use anyhow::{Context, Result};
use image::{imageops, DynamicImage, Rgba, RgbaImage};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Theme {
    pub left: Rgba<u8>,
    pub right: Rgba<u8>,
    pub unknown: Rgba<u8>,
    pub joint_outline: Rgba<u8>,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            left: Rgba([70, 130, 240, 255]),
            right: Rgba([255, 152, 0, 255]),
            unknown: Rgba([200, 200, 200, 255]),
            joint_outline: Rgba([255, 255, 255, 255]),
        }
    }
}

/// Writes each processed frame with hand skeletons drawn on it.
pub struct OverlayWriter {
    output_dir: PathBuf,
    theme: Theme,
    mirrored: bool,
}

impl OverlayWriter {
    /// `mirrored` is whether frames reach the detector flipped; the overlay is
    /// flipped back so it matches the source video.
    pub fn new(output_dir: impl AsRef<Path>, mirrored: bool) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&output_dir)
            .with_context(|| format!("Cannot create overlay directory {}", output_dir.display()))?;
        Ok(Self {
            output_dir,
            theme: Theme::default(),
            mirrored,
        })
    }

    pub fn render(&self, frame: &DynamicImage, hands: &[RawHand]) -> RgbaImage {
        let mut canvas = frame.to_rgba8();
        for hand in hands {
            let color = match hand.handedness.parse::<Handedness>() {
                Ok(Handedness::Left) => self.theme.left,
                Ok(Handedness::Right) => self.theme.right,
                Err(_) => self.theme.unknown,
            };
            self.draw_hand_skeleton(&mut canvas, &hand.landmarks, color);
        }
        if self.mirrored {
            imageops::flip_horizontal_in_place(&mut canvas);
        }
        canvas
    }

    pub fn write(&self, frame_no: u64, frame: &DynamicImage, hands: &[RawHand]) -> Result<PathBuf> {
        let path = self.output_dir.join(format!("frame_{:05}.png", frame_no));
        self.render(frame, hands)
            .save(&path)
            .with_context(|| format!("Failed to save overlay {}", path.display()))?;
        Ok(path)
    }

    fn draw_hand_skeleton(&self, canvas: &mut RgbaImage, landmarks: &[[f64; 3]], color: Rgba<u8>) {
        let (w, h) = (canvas.width() as f64, canvas.height() as f64);
        let to_px = |lm: &[f64; 3]| (lm[0] * w, lm[1] * h);

        for (from, to) in HAND_CONNECTIONS {
            if let (Some(a), Some(b)) = (landmarks.get(from), landmarks.get(to)) {
                draw_line(canvas, to_px(a), to_px(b), color);
            }
        }

        for lm in landmarks {
            let center = to_px(lm);
            draw_disc(canvas, center, 4.0, self.theme.joint_outline);
            draw_disc(canvas, center, 2.5, color);
        }
    }
}

fn put(canvas: &mut RgbaImage, x: f64, y: f64, color: Rgba<u8>) {
    if !(x.is_finite() && y.is_finite()) || x < 0.0 || y < 0.0 {
        return;
    }
    let (x, y) = (x as u32, y as u32);
    if x < canvas.width() && y < canvas.height() {
        canvas.put_pixel(x, y, color);
    }
}

/// Liang-Barsky clip of a segment to the canvas, with a 1px margin for the stroke.
fn clip_segment(
    from: (f64, f64),
    to: (f64, f64),
    width: f64,
    height: f64,
) -> Option<((f64, f64), (f64, f64))> {
    if ![from.0, from.1, to.0, to.1].iter().all(|v| v.is_finite()) {
        return None;
    }
    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    let (mut t0, mut t1) = (0.0_f64, 1.0_f64);
    for (p, q) in [
        (-dx, from.0 + 1.0),
        (dx, width - from.0),
        (-dy, from.1 + 1.0),
        (dy, height - from.1),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
        } else {
            let r = q / p;
            if p < 0.0 {
                if r > t1 {
                    return None;
                }
                t0 = t0.max(r);
            } else {
                if r < t0 {
                    return None;
                }
                t1 = t1.min(r);
            }
        }
    }
    Some((
        (from.0 + dx * t0, from.1 + dy * t0),
        (from.0 + dx * t1, from.1 + dy * t1),
    ))
}

fn draw_line(canvas: &mut RgbaImage, from: (f64, f64), to: (f64, f64), color: Rgba<u8>) {
    let Some((from, to)) = clip_segment(from, to, canvas.width() as f64, canvas.height() as f64)
    else {
        return;
    };
    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    let steps = dx.abs().max(dy.abs()).ceil().max(1.0) as usize;
    for i in 0..=steps {
        let t = i as f64 / steps as f64;
        let (x, y) = (from.0 + dx * t, from.1 + dy * t);
        // 2px stroke
        put(canvas, x, y, color);
        put(canvas, x + 1.0, y, color);
        put(canvas, x, y + 1.0, color);
    }
}

fn draw_disc(canvas: &mut RgbaImage, center: (f64, f64), radius: f64, color: Rgba<u8>) {
    let r = radius.ceil() as i64;
    for oy in -r..=r {
        for ox in -r..=r {
            let (fx, fy) = (ox as f64, oy as f64);
            if fx * fx + fy * fy <= radius * radius {
                put(canvas, center.0 + fx, center.1 + fy, color);
            }
        }
    }
}
