//! Image decoding: the "bytes in, raster out" boundary in front of the
//! recognition engine.
//!
//! Uploaded payloads are decoded with format sniffing, checked against the
//! configured dimension limits, downscaled when oversized and converted to
//! grayscale before being re-encoded as PNG for the engine. Everything here
//! is CPU-bound; the pipeline runs it on a blocking task.

use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader};

use crate::config::OcrConfig;
use crate::error::{LectorError, Result};

/// Decoded, normalized pixel payload owned by the pipeline for the
/// duration of one request.
#[derive(Debug, Clone)]
pub struct RasterImage {
    /// PNG-encoded grayscale pixels ready for the engine.
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Decode uploaded bytes into a [`RasterImage`].
///
/// Fails on empty buffers, undecodable bytes and images below the
/// configured minimum dimension. Oversized images are downscaled to the
/// configured maximum, preserving aspect ratio.
pub fn decode_image(bytes: &[u8], config: &OcrConfig) -> Result<RasterImage> {
    if bytes.is_empty() {
        return Err(LectorError::Decode("empty image payload".to_string()));
    }

    let reader = ImageReader::new(std::io::Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| LectorError::Decode(format!("failed to read image: {e}")))?;

    let img = reader
        .decode()
        .map_err(|e| LectorError::Decode(format!("failed to decode image: {e}")))?;

    let (width, height) = img.dimensions();
    if width < config.min_image_dimension || height < config.min_image_dimension {
        return Err(LectorError::Decode(format!(
            "image too small: {}x{}, minimum {}x{}",
            width, height, config.min_image_dimension, config.min_image_dimension
        )));
    }

    let img = resize_if_needed(img, config.max_image_dimension);
    let img = DynamicImage::ImageLuma8(img.to_luma8());
    let (width, height) = img.dimensions();

    let mut data = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut data), ImageFormat::Png)
        .map_err(|e| LectorError::Decode(format!("failed to encode raster: {e}")))?;

    Ok(RasterImage {
        data,
        width,
        height,
    })
}

/// Downscale with Lanczos3 when either dimension exceeds `max_dim`,
/// preserving aspect ratio.
fn resize_if_needed(img: DynamicImage, max_dim: u32) -> DynamicImage {
    let (width, height) = img.dimensions();
    if width <= max_dim && height <= max_dim {
        return img;
    }

    let ratio = if width > height {
        max_dim as f32 / width as f32
    } else {
        max_dim as f32 / height as f32
    };
    let new_width = (width as f32 * ratio) as u32;
    let new_height = (height as f32 * ratio) as u32;

    img.resize(new_width, new_height, image::imageops::FilterType::Lanczos3)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> OcrConfig {
        OcrConfig {
            policy: crate::config::EnginePolicy::Cached,
            max_concurrency: 1,
            default_language: "en".to_string(),
            lang_aliases: Default::default(),
            data_dir: None,
            timeout_secs: 60,
            max_image_dimension: 4096,
            min_image_dimension: 16,
            max_image_bytes: 10 * 1024 * 1024,
        }
    }

    fn test_png(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::new_rgb8(width, height);
        let mut output = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut output), ImageFormat::Png)
            .unwrap();
        output
    }

    #[test]
    fn test_decode_valid_png() {
        let raster = decode_image(&test_png(64, 48), &test_config()).unwrap();
        assert_eq!(raster.width, 64);
        assert_eq!(raster.height, 48);
        assert!(!raster.data.is_empty());

        // Output must itself decode, as grayscale.
        let decoded = image::load_from_memory(&raster.data).unwrap();
        assert!(matches!(decoded, DynamicImage::ImageLuma8(_)));
    }

    #[test]
    fn test_decode_rejects_empty_payload() {
        let err = decode_image(&[], &test_config()).unwrap_err();
        assert!(matches!(err, LectorError::Decode(_)));
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn test_decode_rejects_garbage_bytes() {
        let err = decode_image(&[0, 1, 2, 3, 4, 5], &test_config()).unwrap_err();
        assert!(matches!(err, LectorError::Decode(_)));
    }

    #[test]
    fn test_decode_rejects_undersized_image() {
        let err = decode_image(&test_png(8, 100), &test_config()).unwrap_err();
        assert!(err.to_string().contains("too small"));
    }

    #[test]
    fn test_oversized_image_is_downscaled() {
        let config = OcrConfig {
            max_image_dimension: 500,
            ..test_config()
        };
        let raster = decode_image(&test_png(1000, 200), &config).unwrap();
        assert_eq!(raster.width, 500);
        assert_eq!(raster.height, 100);
    }

    #[test]
    fn test_resize_if_needed_leaves_small_images_alone() {
        let img = DynamicImage::new_rgb8(300, 200);
        let resized = resize_if_needed(img, 1000);
        assert_eq!(resized.dimensions(), (300, 200));
    }

    #[test]
    fn test_resize_if_needed_height_bound() {
        let img = DynamicImage::new_rgb8(200, 2000);
        let resized = resize_if_needed(img, 1000);
        assert_eq!(resized.dimensions(), (100, 1000));
    }

    #[test]
    fn test_jpeg_input_is_accepted() {
        let img = DynamicImage::new_rgb8(64, 64);
        let mut jpeg = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut jpeg), ImageFormat::Jpeg)
            .unwrap();

        let raster = decode_image(&jpeg, &test_config()).unwrap();
        assert_eq!((raster.width, raster.height), (64, 64));
    }
}
