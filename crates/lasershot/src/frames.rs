//! Frames from image files, via the `image` crate.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use ::image::imageops::{self, FilterType};
use lasershot_core::{Resolution, RgbaImage, RgbaImageView};

use crate::{AcquisitionError, FrameSource, LaserShotError};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Borrow an `image::RgbaImage` as the workspace view type.
pub fn rgba_view(img: &::image::RgbaImage) -> RgbaImageView<'_> {
    RgbaImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw(),
    }
}

/// Take ownership of an `image::RgbaImage` buffer.
pub fn from_image_rgba(img: ::image::RgbaImage) -> RgbaImage {
    RgbaImage {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.into_raw(),
    }
}

/// Decode `path`, convert to RGBA and resample to `resolution` when the size
/// differs.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(path), fields(path = %path.as_ref().display()))
)]
pub fn load_frame(
    path: impl AsRef<Path>,
    resolution: Resolution,
) -> Result<RgbaImage, LaserShotError> {
    let img = ::image::ImageReader::open(path.as_ref())?
        .decode()?
        .to_rgba8();
    let img = if img.width() != resolution.width || img.height() != resolution.height {
        log::debug!(
            "resampling {} from {}x{} to {}x{}",
            path.as_ref().display(),
            img.width(),
            img.height(),
            resolution.width,
            resolution.height
        );
        imageops::resize(&img, resolution.width, resolution.height, FilterType::Triangle)
    } else {
        img
    };
    Ok(from_image_rgba(img))
}

/// Write an RGBA frame as an image file; the format follows the extension.
pub fn save_frame(frame: &RgbaImage, path: impl AsRef<Path>) -> Result<(), LaserShotError> {
    let width = u32::try_from(frame.width).unwrap_or(u32::MAX);
    let height = u32::try_from(frame.height).unwrap_or(u32::MAX);
    let Some(img) = ::image::RgbaImage::from_raw(width, height, frame.data.clone()) else {
        return Err(LaserShotError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "frame buffer does not match its dimensions",
        )));
    };
    img.save(path)?;
    Ok(())
}

/// Plays a list of image files, one per poll.
#[derive(Clone, Debug)]
pub struct ImageSequenceSource {
    paths: VecDeque<PathBuf>,
    resolution: Resolution,
}

impl ImageSequenceSource {
    pub fn new<I, P>(paths: I, resolution: Resolution) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            resolution,
        }
    }

    pub fn remaining(&self) -> usize {
        self.paths.len()
    }
}

impl FrameSource for ImageSequenceSource {
    fn poll(&mut self) -> Result<Option<RgbaImage>, AcquisitionError> {
        let Some(path) = self.paths.pop_front() else {
            return Err(AcquisitionError::Exhausted);
        };
        load_frame(&path, self.resolution)
            .map(Some)
            .map_err(|e| AcquisitionError::Device(format!("{}: {e}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_png(dir: &Path, name: &str, w: u32, h: u32, spot: (u32, u32)) -> PathBuf {
        let mut img = ::image::RgbaImage::from_pixel(w, h, ::image::Rgba([0, 0, 0, 255]));
        img.put_pixel(spot.0, spot.1, ::image::Rgba([255, 0, 0, 255]));
        let path = dir.join(name);
        img.save(&path).expect("save png");
        path
    }

    #[test]
    fn load_keeps_matching_resolution() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_png(dir.path(), "a.png", 8, 6, (2, 3));
        let frame = load_frame(&path, Resolution::new(8, 6)).expect("load");
        assert_eq!((frame.width, frame.height), (8, 6));
        assert_eq!(frame.view().pixel(2, 3), [255, 0, 0, 255]);
    }

    #[test]
    fn load_resamples_to_processing_resolution() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_png(dir.path(), "big.png", 32, 18, (0, 0));
        let frame = load_frame(&path, Resolution::new(16, 9)).expect("load");
        assert_eq!((frame.width, frame.height), (16, 9));
        assert_eq!(frame.data.len(), 16 * 9 * 4);
    }

    #[test]
    fn sequence_reports_bad_files_and_exhaustion() {
        let dir = tempfile::tempdir().expect("tempdir");
        let good = write_png(dir.path(), "ok.png", 4, 4, (1, 1));
        let missing = dir.path().join("missing.png");
        let mut src = ImageSequenceSource::new([good, missing], Resolution::new(4, 4));

        assert!(matches!(src.poll(), Ok(Some(_))));
        assert!(matches!(src.poll(), Err(AcquisitionError::Device(_))));
        assert!(matches!(src.poll(), Err(AcquisitionError::Exhausted)));
    }

    #[test]
    fn save_then_load_round_trips_pixels() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut frame = RgbaImage::new(5, 3);
        frame.put_pixel(4, 2, [10, 20, 30, 255]);
        let path = dir.path().join("out.png");
        save_frame(&frame, &path).expect("save");
        assert_eq!(load_frame(&path, Resolution::new(5, 3)).expect("load"), frame);
    }
}
