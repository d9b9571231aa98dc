//! Header-only image inspection used at admission to derive the size hint.

use std::io::Cursor;

use image::ImageReader;

use crate::domain::CoreError;

/// Pixel count (width * height) read from the image header.
///
/// Only the header is parsed, so this is cheap even for large inputs.
pub fn probe_pixel_count(bytes: &[u8]) -> Result<u64, CoreError> {
    let (width, height) = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| CoreError::InvalidInput(format!("Invalid image data: {e}")))?
        .into_dimensions()
        .map_err(|e| CoreError::InvalidInput(format!("Invalid image data: {e}")))?;
    Ok(u64::from(width) * u64::from(height))
}
