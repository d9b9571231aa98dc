//! LanczosUpscaler - `image` クレートによる既定の Enhancer
//!
//! decode → RGB 化 → Lanczos3 で拡大 → PNG encode。

use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};

use crate::ports::{EnhanceError, Enhancer};

pub struct LanczosUpscaler {
    factor: u32,
}

impl LanczosUpscaler {
    /// `factor` below 1 is treated as 1 (re-encode only).
    pub fn new(factor: u32) -> Self {
        Self {
            factor: factor.max(1),
        }
    }

    pub fn factor(&self) -> u32 {
        self.factor
    }
}

impl Default for LanczosUpscaler {
    fn default() -> Self {
        Self::new(2)
    }
}

impl Enhancer for LanczosUpscaler {
    fn name(&self) -> &str {
        "lanczos-upscaler"
    }

    fn enhance(&self, image: &[u8]) -> Result<Vec<u8>, EnhanceError> {
        let decoded =
            image::load_from_memory(image).map_err(|e| EnhanceError::Decode(e.to_string()))?;
        let rgb = DynamicImage::ImageRgb8(decoded.to_rgb8());
        drop(decoded);

        let (width, height) = (rgb.width(), rgb.height());
        let target_w = width
            .checked_mul(self.factor)
            .ok_or_else(|| EnhanceError::Failed(format!("{width}px wide image is too large")))?;
        let target_h = height
            .checked_mul(self.factor)
            .ok_or_else(|| EnhanceError::Failed(format!("{height}px tall image is too large")))?;

        let upscaled = if self.factor == 1 {
            rgb
        } else {
            rgb.resize_exact(target_w, target_h, FilterType::Lanczos3)
        };

        let mut out = Cursor::new(Vec::new());
        upscaled
            .write_to(&mut out, ImageFormat::Png)
            .map_err(|e| EnhanceError::Encode(e.to_string()))?;
        Ok(out.into_inner())
    }
}
