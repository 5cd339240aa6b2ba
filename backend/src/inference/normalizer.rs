use image::imageops::{self, FilterType};
use image::DynamicImage;
use ndarray::{Array3, Array4, ArrayView4, Axis};

use super::model::InputSize;

/// An uploaded file as received: raw bytes and the MIME type the client declared.
#[derive(Debug, Clone)]
pub struct RawImage {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

impl RawImage {
    pub fn new(bytes: Vec<u8>, content_type: Option<String>) -> Self {
        Self {
            bytes,
            content_type,
        }
    }

    pub fn declares_image(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.trim().to_ascii_lowercase().starts_with("image/"))
            .unwrap_or(false)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("Could not decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Target size must be non-zero, got {width}x{height}")]
    ZeroSize { width: u32, height: u32 },
}

/// `(1, height, width, 3)` RGB tensor with values in [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTensor(Array4<f32>);

impl NormalizedTensor {
    pub fn view(&self) -> ArrayView4<'_, f32> {
        self.0.view()
    }

    pub fn shape(&self) -> &[usize] {
        self.0.shape()
    }

    pub fn height(&self) -> usize {
        self.0.len_of(Axis(1))
    }

    pub fn width(&self) -> usize {
        self.0.len_of(Axis(2))
    }

    pub fn into_inner(self) -> Array4<f32> {
        self.0
    }
}

pub fn normalize(
    raw: &RawImage,
    size: InputSize,
    filter: FilterType,
) -> Result<NormalizedTensor, NormalizeError> {
    if size.width == 0 || size.height == 0 {
        return Err(NormalizeError::ZeroSize {
            width: size.width,
            height: size.height,
        });
    }

    let decoded = image::load_from_memory(&raw.bytes)?;
    log::debug!(
        "Decoded {}x{} image ({:?})",
        decoded.width(),
        decoded.height(),
        decoded.color()
    );

    let pixels = normalize_image(&decoded, size, filter);
    Ok(NormalizedTensor(pixels.insert_axis(Axis(0))))
}

/// Converts to RGB, resizes to `size` and scales to [0, 1]. Output is `(height, width, 3)`.
pub fn normalize_image(image: &DynamicImage, size: InputSize, filter: FilterType) -> Array3<f32> {
    let rgb = image.to_rgb8();
    let resized = if rgb.dimensions() == (size.width, size.height) {
        rgb
    } else {
        imageops::resize(&rgb, size.width, size.height, filter)
    };

    Array3::from_shape_fn(
        (size.height as usize, size.width as usize, 3),
        |(y, x, c)| f32::from(resized.get_pixel(x as u32, y as u32)[c]) / 255.0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, ImageFormat, Luma, Rgb, RgbImage, Rgba, RgbaImage};
    use std::io::Cursor;

    fn encode(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut bytes = Cursor::new(Vec::new());
        image.write_to(&mut bytes, format).unwrap();
        bytes.into_inner()
    }

    fn png(image: DynamicImage) -> RawImage {
        RawImage::new(encode(image, ImageFormat::Png), Some("image/png".into()))
    }

    #[test]
    fn output_has_batch_axis_and_target_shape() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 30, Rgb([10, 20, 30])));
        let tensor = normalize(&png(image), InputSize::new(16, 8), FilterType::Triangle).unwrap();

        assert_eq!(tensor.shape(), &[1, 8, 16, 3]);
        assert_eq!(tensor.height(), 8);
        assert_eq!(tensor.width(), 16);
    }

    #[test]
    fn values_are_scaled_to_unit_interval_in_rgb_order() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(5, 5, Rgb([255, 0, 51])));
        let tensor = normalize(&png(image), InputSize::new(3, 3), FilterType::Triangle)
            .unwrap()
            .into_inner();

        for pixel in tensor.lanes(Axis(3)) {
            assert!((pixel[0] - 1.0).abs() < 1e-6);
            assert!(pixel[1].abs() < 1e-6);
            assert!((pixel[2] - 0.2).abs() < 1e-6);
        }
    }

    #[test]
    fn grayscale_is_expanded_to_three_equal_channels() {
        let image = DynamicImage::ImageLuma8(GrayImage::from_pixel(4, 4, Luma([128])));
        let tensor = normalize(&png(image), InputSize::new(4, 4), FilterType::Nearest)
            .unwrap()
            .into_inner();

        let expected = 128.0 / 255.0;
        assert!(tensor.iter().all(|v| (v - expected).abs() < 1e-6));
    }

    #[test]
    fn alpha_channel_is_dropped() {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([0, 255, 0, 7])));
        let tensor = normalize(&png(image), InputSize::new(2, 2), FilterType::Nearest).unwrap();

        assert_eq!(tensor.shape(), &[1, 2, 2, 3]);
        assert!((tensor.view()[[0, 1, 1, 1]] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn jpeg_input_decodes() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([200, 200, 200])));
        let raw = RawImage::new(encode(image, ImageFormat::Jpeg), Some("image/jpeg".into()));
        let tensor = normalize(&raw, InputSize::new(4, 4), FilterType::CatmullRom)
            .unwrap()
            .into_inner();

        assert!(tensor.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let raw = RawImage::new(b"definitely not an image".to_vec(), Some("image/png".into()));
        let err = normalize(&raw, InputSize::new(4, 4), FilterType::Triangle).unwrap_err();
        assert!(matches!(err, NormalizeError::Decode(_)));
    }

    #[test]
    fn zero_target_size_is_rejected() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(2, 2));
        let err = normalize(&png(image), InputSize::new(0, 4), FilterType::Triangle).unwrap_err();
        assert!(matches!(err, NormalizeError::ZeroSize { width: 0, height: 4 }));
    }

    #[test]
    fn content_type_check() {
        let with = |ct: Option<&str>| RawImage::new(Vec::new(), ct.map(String::from));
        assert!(with(Some("image/png")).declares_image());
        assert!(with(Some("Image/JPEG")).declares_image());
        assert!(!with(Some("text/plain")).declares_image());
        assert!(!with(Some("application/octet-stream")).declares_image());
        assert!(!with(None).declares_image());
    }
}
