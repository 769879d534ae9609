//! Core types and utilities for laser shot tracking.
//!
//! This crate is intentionally small and purely geometric. It does *not*
//! depend on any concrete segmentation backend, clustering policy or
//! persistence layer.

mod homography;
mod image;
mod logger;
mod point;
mod warp;

pub use homography::{homography_from_4pt, is_degenerate_quad, Homography};
pub use image::{
    sample_bilinear_rgba, HsvImage, Mask, PixelRect, RgbaImage, RgbaImageView,
};
pub use point::{MarkerPoint, Resolution, TimestampMs};
pub use warp::warp_perspective_rgba;

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
