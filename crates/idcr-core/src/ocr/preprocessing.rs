//! Illumination-normalizing image variants fed to the OCR ensemble.

use image::{DynamicImage, GrayImage, Luma, imageops};
use imageproc::filter::{gaussian_blur_f32, median_filter};
use tracing::debug;

use crate::error::IdcrError;
use crate::models::config::{PreprocessConfig, VariantKind};

/// A preprocessing transform producing one OCR input from a grayscale crop.
pub trait Variant: Send + Sync {
    /// Stable name, used in logs and voting output.
    fn name(&self) -> &str;

    /// Produce the normalized image (same dimensions as the input).
    fn apply(&self, gray: &GrayImage) -> GrayImage;
}

/// Sigma used for a Gaussian kernel of size `k` when none is given.
pub fn gaussian_sigma(kernel: u32) -> f32 {
    0.3 * ((kernel as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Divide the image by a large Gaussian blur of itself, scaled by 255.
#[derive(Debug, Clone)]
pub struct GaussianNormalize {
    sigma: f32,
}

impl GaussianNormalize {
    pub fn new(kernel: u32) -> Self {
        Self {
            sigma: gaussian_sigma(kernel),
        }
    }
}

impl Variant for GaussianNormalize {
    fn name(&self) -> &str {
        "gaussian"
    }

    fn apply(&self, gray: &GrayImage) -> GrayImage {
        let blur = gaussian_blur_f32(gray, self.sigma);
        let mut out = GrayImage::new(gray.width(), gray.height());
        for (x, y, px) in out.enumerate_pixels_mut() {
            let g = gray.get_pixel(x, y)[0] as f32;
            let b = blur.get_pixel(x, y)[0] as f32;
            let v = if b == 0.0 { 0.0 } else { (g * 255.0 / b).round() };
            *px = Luma([v.clamp(0.0, 255.0) as u8]);
        }
        out
    }
}

/// Divide the image by its median blur, then stretch so the maximum is 255.
///
/// Pixels whose blur is 0 keep their gray value as the ratio.
#[derive(Debug, Clone)]
pub struct MedianNormalize {
    radius: u32,
}

impl MedianNormalize {
    pub fn new(kernel: u32) -> Self {
        Self { radius: kernel / 2 }
    }
}

impl Variant for MedianNormalize {
    fn name(&self) -> &str {
        "median"
    }

    fn apply(&self, gray: &GrayImage) -> GrayImage {
        let blur = median_filter(gray, self.radius, self.radius);
        let ratios: Vec<f32> = gray
            .pixels()
            .zip(blur.pixels())
            // A zero blur leaves the pixel's own value in place
            .map(|(g, b)| {
                if b[0] == 0 {
                    g[0] as f32
                } else {
                    g[0] as f32 / b[0] as f32
                }
            })
            .collect();

        let max = ratios.iter().copied().fold(0.0f32, f32::max);
        let mut out = GrayImage::new(gray.width(), gray.height());
        if max == 0.0 {
            return out;
        }
        for (px, ratio) in out.pixels_mut().zip(ratios) {
            *px = Luma([(255.0 * ratio / max) as u8]);
        }
        out
    }
}

/// Add `amount` white pixels to the bottom and right edges.
pub fn pad(image: &GrayImage, amount: u32) -> GrayImage {
    let mut canvas = GrayImage::from_pixel(
        image.width() + amount,
        image.height() + amount,
        Luma([255u8]),
    );
    imageops::replace(&mut canvas, image, 0, 0);
    canvas
}

/// One preprocessed OCR input.
#[derive(Debug, Clone)]
pub struct VariantImage {
    pub name: String,
    pub image: DynamicImage,
}

/// Ordered set of variants plus shared padding.
pub struct VariantRegistry {
    variants: Vec<Box<dyn Variant>>,
    padding: u32,
}

impl VariantRegistry {
    pub fn new(padding: u32) -> Self {
        Self {
            variants: Vec::new(),
            padding,
        }
    }

    /// Build the configured variants, in configured order.
    pub fn from_config(config: &PreprocessConfig) -> Result<Self, IdcrError> {
        config.validate().map_err(IdcrError::Config)?;
        let mut registry = Self::new(config.padding());
        for kind in &config.variants {
            match kind {
                VariantKind::Gaussian => {
                    registry.register(GaussianNormalize::new(config.gaussian_kernel))
                }
                VariantKind::Median => registry.register(MedianNormalize::new(config.median_kernel)),
            }
        }
        Ok(registry)
    }

    pub fn register(&mut self, variant: impl Variant + 'static) {
        self.variants.push(Box::new(variant));
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.variants.iter().map(|v| v.name())
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Variant> {
        self.variants.iter().map(|v| v.as_ref())
    }

    /// Grayscale the crop, run every variant and pad each result.
    pub fn render(&self, crop: &DynamicImage) -> Vec<VariantImage> {
        let gray = crop.to_luma8();
        self.iter()
            .map(|variant| {
                let normalized = variant.apply(&gray);
                debug!(
                    "Variant {} on {}x{} crop",
                    variant.name(),
                    gray.width(),
                    gray.height()
                );
                VariantImage {
                    name: variant.name().to_string(),
                    image: DynamicImage::ImageLuma8(pad(&normalized, self.padding)),
                }
            })
            .collect()
    }
}
