use std::cell::Cell;

use lasershot_core::{HsvImage, Mask, MarkerPoint, PixelRect, RgbaImageView, TimestampMs};

use crate::{ColorSegmenter, HsvThresholdSegmenter, MarkerParams};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Per-cycle intermediate buffers.
///
/// Lives for exactly one `extract` call and is released on every exit path.
struct CycleScratch<'a> {
    live: &'a Cell<usize>,
    hsv: Option<HsvImage>,
    mask: Option<Mask>,
    boxes: Vec<PixelRect>,
}

impl<'a> CycleScratch<'a> {
    fn acquire(live: &'a Cell<usize>) -> Self {
        live.set(live.get() + 1);
        Self {
            live,
            hsv: None,
            mask: None,
            boxes: Vec::new(),
        }
    }
}

impl Drop for CycleScratch<'_> {
    fn drop(&mut self) {
        self.hsv = None;
        self.mask = None;
        self.boxes.clear();
        self.live.set(self.live.get() - 1);
    }
}

/// Turns frames into timestamped marker points.
///
/// Owns the segmentation handle; get it back with [`MarkerExtractor::release`].
pub struct MarkerExtractor<S = HsvThresholdSegmenter> {
    params: MarkerParams,
    segmenter: S,
    live_scratch: Cell<usize>,
}

impl MarkerExtractor<HsvThresholdSegmenter> {
    pub fn with_default_segmenter(params: MarkerParams) -> Self {
        Self::new(HsvThresholdSegmenter::default(), params)
    }
}

impl<S: ColorSegmenter> MarkerExtractor<S> {
    pub fn new(segmenter: S, params: MarkerParams) -> Self {
        Self {
            params,
            segmenter,
            live_scratch: Cell::new(0),
        }
    }

    pub fn params(&self) -> &MarkerParams {
        &self.params
    }

    /// Number of scratch buffer sets currently held. Zero between cycles.
    pub fn live_scratch(&self) -> usize {
        self.live_scratch.get()
    }

    /// Hand the segmentation handle back to the caller.
    pub fn release(self) -> S {
        self.segmenter
    }

    /// Extract marker points from one frame.
    ///
    /// `None` means the frame is not decodable yet; the cycle is skipped and
    /// no points are produced. Every region yields one point at the center of
    /// its bounding box, stamped with `timestamp_ms`. Multiple regions in the
    /// same frame give multiple points with the same timestamp.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, frame), fields(ready = frame.is_some()))
    )]
    pub fn extract(
        &mut self,
        frame: Option<&RgbaImageView<'_>>,
        timestamp_ms: TimestampMs,
    ) -> Vec<MarkerPoint> {
        let mut scratch = CycleScratch::acquire(&self.live_scratch);

        let Some(frame) = frame else {
            log::trace!("frame not ready at t={timestamp_ms}");
            return Vec::new();
        };

        let hsv = scratch.hsv.insert(HsvImage::from_rgba(frame));
        let mask = scratch
            .mask
            .insert(self.segmenter.in_range(hsv, &self.params.hsv_range));
        if mask.data.iter().all(|&v| v == 0) {
            return Vec::new();
        }

        scratch.boxes = self.segmenter.external_boxes(mask);
        let points: Vec<MarkerPoint> = scratch
            .boxes
            .iter()
            .filter(|r| r.area() >= self.params.min_region_area)
            .map(|r| {
                let (x, y) = r.center();
                MarkerPoint::new(x, y, timestamp_ms)
            })
            .collect();

        if points.len() > 1 {
            log::debug!("{} marker regions at t={timestamp_ms}", points.len());
        }
        points
    }

    /// Extract from a raw RGBA buffer; a buffer of the wrong size counts as
    /// not ready.
    pub fn extract_raw(
        &mut self,
        width: usize,
        height: usize,
        rgba: &[u8],
        timestamp_ms: TimestampMs,
    ) -> Vec<MarkerPoint> {
        let view = RgbaImageView::new(width, height, rgba);
        self.extract(view.as_ref(), timestamp_ms)
    }
}
