//! Image cleanup ahead of OCR.

use std::io::Cursor;

use image::{DynamicImage, GrayImage, ImageFormat};
use imageproc::contrast::{ThresholdType, otsu_level, threshold};
use imageproc::filter::median_filter;

use crate::error::ProcessingError;

/// Grayscale, Otsu binarization, then a 3x3 median filter.
pub fn binarize(image: &DynamicImage) -> GrayImage {
    let gray = image.to_luma8();
    let level = otsu_level(&gray);
    let binary = threshold(&gray, level, ThresholdType::Binary);
    median_filter(&binary, 1, 1)
}

/// Preprocess and encode as PNG, the input format handed to the engine.
pub fn prepare_for_ocr(image: &DynamicImage) -> Result<Vec<u8>, ProcessingError> {
    let cleaned = binarize(image);
    let mut png = Vec::new();
    DynamicImage::ImageLuma8(cleaned)
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(ProcessingError::ImageDecode)?;
    Ok(png)
}
