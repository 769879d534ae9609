use lasershot_core::{HsvImage, Mask, PixelRect};

use crate::HsvRange;

/// Color segmentation backend consumed by the extractor.
///
/// Implementations may hold expensive state (a loaded model, GPU buffers);
/// the extractor owns the handle for its whole lifetime.
pub trait ColorSegmenter {
    /// Binary mask of pixels inside `range`.
    fn in_range(&mut self, hsv: &HsvImage, range: &HsvRange) -> Mask;

    /// Bounding boxes of external (non-nested) regions of `mask`.
    fn external_boxes(&mut self, mask: &Mask) -> Vec<PixelRect>;
}

/// Pure-Rust segmenter: per-pixel range test plus 8-connected components.
///
/// Only outer regions are reported. A region counts as nested when it sits in
/// a hole of another region, i.e. none of its 4-neighbouring background pixels
/// can be reached from the frame border through 4-connected background.
/// Boxes come out in raster order of each region's first pixel.
#[derive(Clone, Debug, Default)]
pub struct HsvThresholdSegmenter {
    stack: Vec<(usize, usize)>,
}

impl ColorSegmenter for HsvThresholdSegmenter {
    fn in_range(&mut self, hsv: &HsvImage, range: &HsvRange) -> Mask {
        let mut mask = Mask::new(hsv.width, hsv.height);
        for (dst, &px) in mask.data.iter_mut().zip(hsv.data.iter()) {
            if range.contains(px) {
                *dst = 255;
            }
        }
        mask
    }

    fn external_boxes(&mut self, mask: &Mask) -> Vec<PixelRect> {
        let (w, h) = (mask.width, mask.height);
        if w == 0 || h == 0 {
            return Vec::new();
        }
        let outside = self.outer_background(mask);
        let mut visited = vec![false; w * h];
        let mut boxes = Vec::new();
        let mut nested = 0usize;

        for y in 0..h {
            for x in 0..w {
                let idx = y * w + x;
                if visited[idx] || mask.data[idx] == 0 {
                    continue;
                }
                let (rect, external) = self.flood_component(mask, &outside, &mut visited, x, y);
                if external {
                    boxes.push(rect);
                } else {
                    nested += 1;
                }
            }
        }

        if nested > 0 {
            log::trace!("dropped {nested} nested regions");
        }
        boxes
    }
}

fn on_border(x: usize, y: usize, w: usize, h: usize) -> bool {
    x == 0 || y == 0 || x + 1 == w || y + 1 == h
}

fn neighbours4(x: usize, y: usize, w: usize, h: usize) -> impl Iterator<Item = (usize, usize)> {
    let left = x.checked_sub(1).map(|nx| (nx, y));
    let right = (x + 1 < w).then_some((x + 1, y));
    let up = y.checked_sub(1).map(|ny| (x, ny));
    let down = (y + 1 < h).then_some((x, y + 1));
    [left, right, up, down].into_iter().flatten()
}

impl HsvThresholdSegmenter {
    /// Background pixels 4-connected to the frame border.
    fn outer_background(&mut self, mask: &Mask) -> Vec<bool> {
        let (w, h) = (mask.width, mask.height);
        let mut outside = vec![false; w * h];

        self.stack.clear();
        for y in 0..h {
            for x in 0..w {
                let idx = y * w + x;
                if on_border(x, y, w, h) && mask.data[idx] == 0 {
                    outside[idx] = true;
                    self.stack.push((x, y));
                }
            }
        }

        while let Some((x, y)) = self.stack.pop() {
            for (nx, ny) in neighbours4(x, y, w, h) {
                let n = ny * w + nx;
                if !outside[n] && mask.data[n] == 0 {
                    outside[n] = true;
                    self.stack.push((nx, ny));
                }
            }
        }
        outside
    }

    /// Bounding box of the component containing `(x0, y0)` and whether it
    /// touches the outer background (or the frame border).
    fn flood_component(
        &mut self,
        mask: &Mask,
        outside: &[bool],
        visited: &mut [bool],
        x0: usize,
        y0: usize,
    ) -> (PixelRect, bool) {
        let (w, h) = (mask.width, mask.height);
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (x0, y0, x0, y0);
        let mut external = false;

        self.stack.clear();
        self.stack.push((x0, y0));
        visited[y0 * w + x0] = true;

        while let Some((x, y)) = self.stack.pop() {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);

            if !external {
                external = on_border(x, y, w, h)
                    || neighbours4(x, y, w, h).any(|(nx, ny)| outside[ny * w + nx]);
            }

            let xs = x.saturating_sub(1)..=(x + 1).min(w - 1);
            for ny in y.saturating_sub(1)..=(y + 1).min(h - 1) {
                for nx in xs.clone() {
                    let n = ny * w + nx;
                    if !visited[n] && mask.data[n] != 0 {
                        visited[n] = true;
                        self.stack.push((nx, ny));
                    }
                }
            }
        }

        let rect = PixelRect {
            x: min_x as u32,
            y: min_y as u32,
            width: (max_x - min_x + 1) as u32,
            height: (max_y - min_y + 1) as u32,
        };
        (rect, external)
    }
}
