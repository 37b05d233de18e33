//! Image values and their representations.
//!
//! An [`Image`] wraps exactly one representation: a raw RGBA pixel buffer
//! or an encoded byte container (PNG, JPEG, BMP, GIF). Width and height are
//! queryable on every representation; for encoded bytes the header is
//! decoded on demand. Converters between representations are registered in
//! an [`ImageRegistry`], with the same first-match, no-auto-chaining
//! dispatch as the array registry.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Cursor;

/// Encoded image container formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageFileFormat {
    Png,
    Jpeg,
    Bmp,
    Gif,
}

impl ImageFileFormat {
    /// All supported container formats.
    pub const ALL: [ImageFileFormat; 4] = [
        ImageFileFormat::Png,
        ImageFileFormat::Jpeg,
        ImageFileFormat::Bmp,
        ImageFileFormat::Gif,
    ];

    /// The codec identifier used by the `image` crate.
    pub fn codec(self) -> ::image::ImageFormat {
        match self {
            ImageFileFormat::Png => ::image::ImageFormat::Png,
            ImageFileFormat::Jpeg => ::image::ImageFormat::Jpeg,
            ImageFileFormat::Bmp => ::image::ImageFormat::Bmp,
            ImageFileFormat::Gif => ::image::ImageFormat::Gif,
        }
    }
}

impl fmt::Display for ImageFileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ImageFileFormat::Png => "png",
            ImageFileFormat::Jpeg => "jpeg",
            ImageFileFormat::Bmp => "bmp",
            ImageFileFormat::Gif => "gif",
        };
        f.write_str(name)
    }
}

/// Errors from image construction and conversion.
#[derive(Debug, thiserror::Error)]
pub enum ImageConvertError {
    #[error("no registered converter from {from} to {to}")]
    NoConverter { from: String, to: String },

    #[error("no registered factory accepts the given input: {0}")]
    UnsupportedRepresentation(String),

    #[error("failed to decode {format} image: {reason}")]
    Decode {
        format: ImageFileFormat,
        reason: String,
    },

    #[error("failed to encode {format} image: {reason}")]
    Encode {
        format: ImageFileFormat,
        reason: String,
    },

    #[error("pixel buffer of {len} bytes does not match {width}x{height} RGBA")]
    PixelBufferSize { len: usize, width: u32, height: u32 },
}

/// Raw RGBA8 pixel storage.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Create a pixel buffer, validating length against the dimensions.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, ImageConvertError> {
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(ImageConvertError::PixelBufferSize {
                len: data.len(),
                width,
                height,
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// An encoded image byte container with its format tag.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedImage {
    format: ImageFileFormat,
    bytes: Vec<u8>,
}

impl EncodedImage {
    pub fn new(format: ImageFileFormat, bytes: Vec<u8>) -> Self {
        Self { format, bytes }
    }

    pub fn format(&self) -> ImageFileFormat {
        self.format
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// An image value wrapping exactly one representation.
#[derive(Debug, Clone, PartialEq)]
pub enum Image {
    Pixels(PixelBuffer),
    Encoded(EncodedImage),
}

/// Tag identifying a concrete image representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Pixels,
    Encoded(ImageFileFormat),
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageKind::Pixels => f.write_str("pixels"),
            ImageKind::Encoded(format) => write!(f, "encoded {}", format),
        }
    }
}

impl Image {
    /// The representation tag of this image.
    pub fn kind(&self) -> ImageKind {
        match self {
            Image::Pixels(_) => ImageKind::Pixels,
            Image::Encoded(e) => ImageKind::Encoded(e.format),
        }
    }

    /// Width and height in pixels.
    ///
    /// Always answerable: encoded representations decode only the header.
    pub fn dimensions(&self) -> Result<(u32, u32), ImageConvertError> {
        match self {
            Image::Pixels(p) => Ok((p.width, p.height)),
            Image::Encoded(e) => {
                let reader = ::image::ImageReader::with_format(
                    Cursor::new(e.bytes.as_slice()),
                    e.format.codec(),
                );
                reader
                    .into_dimensions()
                    .map_err(|err| ImageConvertError::Decode {
                        format: e.format,
                        reason: err.to_string(),
                    })
            }
        }
    }

    pub fn width(&self) -> Result<u32, ImageConvertError> {
        self.dimensions().map(|(w, _)| w)
    }

    pub fn height(&self) -> Result<u32, ImageConvertError> {
        self.dimensions().map(|(_, h)| h)
    }
}

/// Constructs [`Image`] values from raw input bytes.
pub trait ImageFactory: Send + Sync {
    /// Formats this factory can construct from.
    fn supported_formats(&self) -> &[ImageFileFormat];

    /// Whether the input bytes look like a format this factory handles.
    fn can_create_from(&self, bytes: &[u8]) -> bool;

    /// Construct an image value from the input bytes.
    fn create(&self, bytes: &[u8]) -> Result<Image, ImageConvertError>;
}

/// A single-hop conversion between image representations.
pub trait ImageConverter: Send + Sync {
    fn can_convert(&self, source: &Image, target: ImageKind) -> bool;

    fn convert(&self, source: &Image, target: ImageKind) -> Result<Image, ImageConvertError>;
}

/// Registry of image factories and converters.
///
/// Both tables are scanned in registration order; the first match wins.
#[derive(Default)]
pub struct ImageRegistry {
    factories: Vec<Box<dyn ImageFactory>>,
    converters: Vec<Box<dyn ImageConverter>>,
}

impl ImageRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_factory(&mut self, factory: impl ImageFactory + 'static) {
        self.factories.push(Box::new(factory));
    }

    pub fn register(&mut self, converter: impl ImageConverter + 'static) {
        self.converters.push(Box::new(converter));
    }

    /// Number of registered converters.
    pub fn len(&self) -> usize {
        self.converters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }

    /// Construct an image from raw bytes via the first claiming factory.
    pub fn create(&self, bytes: &[u8]) -> Result<Image, ImageConvertError> {
        for factory in &self.factories {
            if factory.can_create_from(bytes) {
                return factory.create(bytes);
            }
        }
        Err(ImageConvertError::UnsupportedRepresentation(format!(
            "{} input bytes match no known image format",
            bytes.len()
        )))
    }

    /// Convert `source` to the requested representation.
    ///
    /// Requesting the representation the image already has returns a clone.
    pub fn convert(&self, source: &Image, target: ImageKind) -> Result<Image, ImageConvertError> {
        if source.kind() == target {
            return Ok(source.clone());
        }
        for converter in &self.converters {
            if converter.can_convert(source, target) {
                return converter.convert(source, target);
            }
        }
        Err(ImageConvertError::NoConverter {
            from: source.kind().to_string(),
            to: target.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_png() -> Vec<u8> {
        let img = ::image::RgbaImage::from_pixel(2, 3, ::image::Rgba([10, 20, 30, 255]));
        let mut out = Cursor::new(Vec::new());
        ::image::DynamicImage::ImageRgba8(img)
            .write_to(&mut out, ::image::ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn test_pixel_buffer_validation() {
        assert!(PixelBuffer::new(2, 2, vec![0u8; 16]).is_ok());
        assert!(matches!(
            PixelBuffer::new(2, 2, vec![0u8; 15]),
            Err(ImageConvertError::PixelBufferSize { len: 15, .. })
        ));
    }

    #[test]
    fn test_dimensions_of_pixels() {
        let image = Image::Pixels(PixelBuffer::new(4, 2, vec![0u8; 32]).unwrap());

        assert_eq!(image.dimensions().unwrap(), (4, 2));
    }

    #[test]
    fn test_dimensions_of_encoded_decode_on_demand() {
        let image = Image::Encoded(EncodedImage::new(ImageFileFormat::Png, tiny_png()));

        assert_eq!(image.width().unwrap(), 2);
        assert_eq!(image.height().unwrap(), 3);
    }

    #[test]
    fn test_empty_registry_reports_no_converter() {
        let registry = ImageRegistry::new();
        let image = Image::Pixels(PixelBuffer::new(1, 1, vec![0u8; 4]).unwrap());

        let err = registry
            .convert(&image, ImageKind::Encoded(ImageFileFormat::Png))
            .unwrap_err();

        assert!(matches!(err, ImageConvertError::NoConverter { .. }));
    }

    #[test]
    fn test_create_without_factory_is_unsupported() {
        let registry = ImageRegistry::new();

        let err = registry.create(b"not an image").unwrap_err();

        assert!(matches!(
            err,
            ImageConvertError::UnsupportedRepresentation(_)
        ));
    }

    #[test]
    fn test_identity_conversion_clones() {
        let registry = ImageRegistry::new();
        let image = Image::Encoded(EncodedImage::new(ImageFileFormat::Png, tiny_png()));

        let same = registry
            .convert(&image, ImageKind::Encoded(ImageFileFormat::Png))
            .unwrap();

        assert_eq!(same, image);
    }
}
