//! Embedded pictures: format detection, pixel size and re-encoding.

use std::io::Cursor;

use image::{DynamicImage, GenericImageView, GrayImage, ImageFormat, RgbImage};

use crate::document::{Image, ImageKind};
use crate::error::ProcessError;

/// Decodes an embedded picture. PNG, JPEG and GIF data is kept byte for
/// byte; any other format the decoder understands is re-encoded as PNG.
pub fn load_image(data: Vec<u8>) -> Result<Image, ProcessError> {
    let format = image::guess_format(&data)
        .map_err(|e| ProcessError::ImageProcessing(format!("Unknown image format: {}", e)))?;
    let decoded = image::load_from_memory_with_format(&data, format)
        .map_err(|e| ProcessError::ImageProcessing(format!("Failed to load image: {}", e)))?;

    let kind = match format {
        ImageFormat::Png => ImageKind::Png,
        ImageFormat::Jpeg => ImageKind::Jpeg,
        ImageFormat::Gif => ImageKind::Gif,
        _ => return encode_png(&decoded),
    };

    let (width, height) = decoded.dimensions();
    Ok(Image {
        data,
        kind,
        width,
        height,
    })
}

/// Builds a PNG from raw 8-bit samples, the layout of unfiltered and
/// Flate-compressed PDF image streams.
pub fn image_from_samples(
    width: u32,
    height: u32,
    color_space: &str,
    samples: Vec<u8>,
) -> Result<Image, ProcessError> {
    let decoded = match color_space {
        "DeviceRGB" => RgbImage::from_raw(width, height, samples).map(DynamicImage::ImageRgb8),
        "DeviceGray" => GrayImage::from_raw(width, height, samples).map(DynamicImage::ImageLuma8),
        other => {
            return Err(ProcessError::ImageProcessing(format!(
                "Unsupported color space: {}",
                other
            )))
        }
    }
    .ok_or_else(|| {
        ProcessError::ImageProcessing("Image data is shorter than its dimensions".to_string())
    })?;

    encode_png(&decoded)
}

fn encode_png(decoded: &DynamicImage) -> Result<Image, ProcessError> {
    let mut data = Vec::new();
    decoded
        .write_to(&mut Cursor::new(&mut data), ImageFormat::Png)
        .map_err(|e| ProcessError::ImageProcessing(format!("Failed to encode PNG: {}", e)))?;

    let (width, height) = decoded.dimensions();
    Ok(Image {
        data,
        kind: ImageKind::Png,
        width,
        height,
    })
}
