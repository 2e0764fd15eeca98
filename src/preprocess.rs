use std::time::Instant;

use clap::ValueEnum;
use fast_image_resize::images::Image;
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::{DynamicImage, RgbImage};
use tracing::debug;

use crate::error::DecodeError;

/// Edge length of the raster every image is resampled to.
pub const RASTER_SIZE: u32 = 224;

/// Resampling filter used when scaling the decoded image to the raster size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ResampleFilter {
    Nearest,
    #[default]
    Bilinear,
    CatmullRom,
    Lanczos3,
}

impl ResampleFilter {
    fn resize_alg(self) -> ResizeAlg {
        match self {
            ResampleFilter::Nearest => ResizeAlg::Nearest,
            ResampleFilter::Bilinear => ResizeAlg::Convolution(FilterType::Bilinear),
            ResampleFilter::CatmullRom => ResizeAlg::Convolution(FilterType::CatmullRom),
            ResampleFilter::Lanczos3 => ResizeAlg::Convolution(FilterType::Lanczos3),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PreprocessConfig {
    pub height: u32,
    pub width: u32,
    pub filter: ResampleFilter,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            height: RASTER_SIZE,
            width: RASTER_SIZE,
            filter: ResampleFilter::Bilinear,
        }
    }
}

/// A decoded, resampled RGB raster in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    rgb: RgbImage,
}

impl RasterImage {
    pub fn new(rgb: RgbImage) -> Self {
        Self { rgb }
    }

    pub fn width(&self) -> u32 {
        self.rgb.width()
    }

    pub fn height(&self) -> u32 {
        self.rgb.height()
    }

    pub fn pixel_count(&self) -> usize {
        self.rgb.width() as usize * self.rgb.height() as usize
    }

    /// Pixels in raster order as `[r, g, b]`.
    pub fn pixels(&self) -> impl Iterator<Item = [u8; 3]> + '_ {
        self.rgb.pixels().map(|p| p.0)
    }

    pub fn as_rgb(&self) -> &RgbImage {
        &self.rgb
    }
}

/// Outcome of decoding, kept as a value so callers branch on failure explicitly.
#[derive(Debug)]
pub enum Decoded {
    Ok(RasterImage),
    Failed(DecodeError),
}

impl From<Result<RasterImage, DecodeError>> for Decoded {
    fn from(result: Result<RasterImage, DecodeError>) -> Self {
        match result {
            Ok(raster) => Decoded::Ok(raster),
            Err(e) => Decoded::Failed(e),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Processor {
    pub config: PreprocessConfig,
}

impl Processor {
    pub fn new(config: PreprocessConfig) -> Self {
        Self { config }
    }

    pub fn decode(&self, bytes: &[u8]) -> Decoded {
        self.preprocess(bytes).into()
    }

    /// Decodes arbitrary image bytes and resamples them to the configured
    /// raster size. Alpha is dropped, 16-bit and grayscale sources are
    /// converted to 8-bit RGB first.
    pub fn preprocess(&self, bytes: &[u8]) -> Result<RasterImage, DecodeError> {
        if bytes.is_empty() {
            return Err(DecodeError::Empty);
        }
        let t = Instant::now();
        let image = image::load_from_memory(bytes)?;
        debug!(width = image.width(), height = image.height(), elapsed = ?t.elapsed(), "decoded image");

        let t = Instant::now();
        let raster = self.resample(&image)?;
        debug!(filter = ?self.config.filter, elapsed = ?t.elapsed(), "resampled image");
        Ok(raster)
    }

    /// Scales the image until it covers the raster, then keeps the centred
    /// window. Borders beyond the destination aspect ratio are cropped away,
    /// never stretched in.
    pub fn resample(&self, image: &DynamicImage) -> Result<RasterImage, DecodeError> {
        let (width, height) = (self.config.width, self.config.height);
        let src = DynamicImage::ImageRgb8(image.to_rgb8());
        let mut dst_image = Image::new(width, height, PixelType::U8x3);

        let resize_options = ResizeOptions::new()
            .resize_alg(self.config.filter.resize_alg())
            .fit_into_destination(Some((0.5, 0.5)));
        let mut resizer = Resizer::new();
        resizer
            .resize(&src, &mut dst_image, Some(&resize_options))
            .map_err(|e| DecodeError::Resize(e.to_string()))?;

        let rgb = RgbImage::from_raw(width, height, dst_image.buffer().to_vec())
            .ok_or_else(|| DecodeError::Resize("resized buffer has unexpected length".to_string()))?;
        Ok(RasterImage::new(rgb))
    }
}
