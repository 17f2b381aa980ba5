//! Sized decoding and encoding of image bytes.

use std::io::Cursor;
use std::sync::Arc;

use bytes::Bytes;
use image::DynamicImage;
use image::imageops::FilterType;

use crate::domain::entities::SharedImage;
use crate::domain::errors::LoadError;

/// Largest power-of-two factor that keeps both dimensions at or above the
/// requested size. A requested dimension of `0` means native size.
#[must_use]
pub fn sample_size(src_width: u32, src_height: u32, req_width: u32, req_height: u32) -> u32 {
    if req_width == 0 || req_height == 0 {
        return 1;
    }

    let mut sample = 1;
    if src_width > req_width || src_height > req_height {
        let half_width = src_width / 2;
        let half_height = src_height / 2;
        while half_width / sample >= req_width && half_height / sample >= req_height {
            sample *= 2;
        }
    }
    sample
}

/// Downsamples a decoded image for the requested size.
#[must_use]
pub fn downsample(image: DynamicImage, req_width: u32, req_height: u32) -> DynamicImage {
    let sample = sample_size(image.width(), image.height(), req_width, req_height);
    if sample == 1 {
        return image;
    }
    image.resize_exact(
        (image.width() / sample).max(1),
        (image.height() / sample).max(1),
        FilterType::Triangle,
    )
}

/// Decodes bytes and downsamples them for the requested size.
///
/// # Errors
/// Returns `DecodeFailure` if the bytes are not a supported image.
pub fn decode_sized(bytes: &[u8], req_width: u32, req_height: u32) -> Result<DynamicImage, LoadError> {
    let image = image::load_from_memory(bytes)
        .map_err(|e| LoadError::decode(format!("Failed to decode image: {e}")))?;
    Ok(downsample(image, req_width, req_height))
}

/// Runs [`decode_sized`] on the blocking pool.
///
/// # Errors
/// Returns `DecodeFailure` if decoding fails or the decode task panics.
pub async fn decode_sized_blocking(
    bytes: Bytes,
    req_width: u32,
    req_height: u32,
) -> Result<SharedImage, LoadError> {
    tokio::task::spawn_blocking(move || decode_sized(&bytes, req_width, req_height))
        .await
        .map_err(|e| LoadError::decode(format!("Decode task panicked: {e}")))?
        .map(Arc::new)
}

/// Encodes an image as PNG.
///
/// # Errors
/// Returns `CacheUnavailable` if encoding fails.
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, LoadError> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, image::ImageFormat::Png)
        .map_err(|e| LoadError::cache(format!("Failed to encode image: {e}")))?;
    Ok(buffer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(100, 100, 0, 0, 1 ; "native_size")]
    #[test_case(100, 100, 100, 0, 1 ; "zero_height_is_native")]
    #[test_case(50, 50, 100, 100, 1 ; "smaller_than_requested")]
    #[test_case(100, 100, 100, 100, 1 ; "exact_fit")]
    #[test_case(100, 100, 50, 50, 2 ; "half")]
    #[test_case(400, 300, 100, 100, 2 ; "limited_by_height")]
    #[test_case(1000, 1000, 100, 100, 8 ; "large_source")]
    fn test_sample_size(src_w: u32, src_h: u32, req_w: u32, req_h: u32, expected: u32) {
        assert_eq!(sample_size(src_w, src_h, req_w, req_h), expected);
    }

    #[test]
    fn test_decode_sized_downsamples() -> Result<(), LoadError> {
        let bytes = encode_png(&DynamicImage::new_rgb8(64, 32))?;

        let native = decode_sized(&bytes, 0, 0)?;
        assert_eq!((native.width(), native.height()), (64, 32));

        let sized = decode_sized(&bytes, 16, 8)?;
        assert_eq!((sized.width(), sized.height()), (16, 8));
        Ok(())
    }

    #[test]
    fn test_decode_garbage_fails() {
        let err = decode_sized(b"definitely not an image", 0, 0);
        assert!(matches!(err, Err(LoadError::DecodeFailure { .. })));
    }

    #[tokio::test]
    async fn test_decode_on_blocking_pool() -> Result<(), LoadError> {
        let bytes = Bytes::from(encode_png(&DynamicImage::new_rgb8(8, 8))?);
        let image = decode_sized_blocking(bytes, 0, 0).await?;
        assert_eq!(image.width(), 8);
        Ok(())
    }
}
