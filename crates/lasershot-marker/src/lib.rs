//! Laser marker extraction.
//!
//! Design idea:
//! - Convert the frame to HSV and threshold it with a color range.
//! - Trace external regions in the mask and take their bounding boxes.
//! - Emit one timestamped point per region: the center of its box.
//!
//! Segmentation itself sits behind [`ColorSegmenter`] so a different backend
//! can be injected; [`HsvThresholdSegmenter`] is the built-in one.

mod extractor;
mod params;
mod segment;

pub use extractor::MarkerExtractor;
pub use params::{HsvRange, MarkerParams};
pub use segment::{ColorSegmenter, HsvThresholdSegmenter};
