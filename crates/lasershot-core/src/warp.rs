use crate::{sample_bilinear_rgba, Homography, RgbaImage, RgbaImageView};
use nalgebra::Point2;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Warp into the target rectangle: for each dst pixel, map to src via
/// `h_img_from_target` and sample.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(src, h_img_from_target), fields(width = src.width, height = src.height))
)]
pub fn warp_perspective_rgba(
    src: &RgbaImageView<'_>,
    h_img_from_target: &Homography,
    out_w: usize,
    out_h: usize,
) -> RgbaImage {
    let mut out = RgbaImage::new(out_w, out_h);

    for y in 0..out_h {
        for x in 0..out_w {
            let pt = Point2::new(x as f64 + 0.5, y as f64 + 0.5);
            let pi = h_img_from_target.apply(pt);
            let px = sample_bilinear_rgba(src, pi.x - 0.5, pi.y - 0.5);
            out.put_pixel(x, y, px);
        }
    }

    out
}
