//! Image factories and representation converters for Konduit pipelines.
//!
//! This crate wires the `image` crate's codecs into an
//! [`ImageRegistry`]: factories that sniff raw bytes into [`Image`]
//! values, decoders from any supported container format to raw pixels,
//! encoders from pixels back into a container, and transcoders between
//! container formats.

use image::{DynamicImage, ImageFormat, RgbaImage};
use konduit_core::{
    EncodedImage, Image, ImageConvertError, ImageConverter, ImageFactory, ImageFileFormat,
    ImageKind, ImageRegistry, PixelBuffer,
};
use std::io::Cursor;

/// Register every bundled factory and converter.
pub fn register_all(registry: &mut ImageRegistry) {
    for format in ImageFileFormat::ALL {
        registry.register_factory(SniffingFactory::new(format));
    }
    for format in ImageFileFormat::ALL {
        registry.register(DecodeConverter::new(format));
        registry.register(EncodeConverter::new(format));
    }
    for from in ImageFileFormat::ALL {
        for to in ImageFileFormat::ALL {
            if from != to {
                registry.register(TranscodeConverter::new(from, to));
            }
        }
    }
}

/// Build a registry with everything registered.
pub fn default_registry() -> ImageRegistry {
    let mut registry = ImageRegistry::new();
    register_all(&mut registry);
    registry
}

/// Recognizes one container format by its magic bytes and wraps the
/// input without decoding it.
pub struct SniffingFactory {
    formats: [ImageFileFormat; 1],
}

impl SniffingFactory {
    pub fn new(format: ImageFileFormat) -> Self {
        Self { formats: [format] }
    }

    fn format(&self) -> ImageFileFormat {
        self.formats[0]
    }
}

impl ImageFactory for SniffingFactory {
    fn supported_formats(&self) -> &[ImageFileFormat] {
        &self.formats
    }

    fn can_create_from(&self, bytes: &[u8]) -> bool {
        image::guess_format(bytes)
            .map(|guessed| guessed == self.format().codec())
            .unwrap_or(false)
    }

    fn create(&self, bytes: &[u8]) -> Result<Image, ImageConvertError> {
        Ok(Image::Encoded(EncodedImage::new(
            self.format(),
            bytes.to_vec(),
        )))
    }
}

/// Decodes an encoded image into raw RGBA8 pixels.
pub struct DecodeConverter {
    format: ImageFileFormat,
}

impl DecodeConverter {
    pub fn new(format: ImageFileFormat) -> Self {
        Self { format }
    }
}

impl ImageConverter for DecodeConverter {
    fn can_convert(&self, source: &Image, target: ImageKind) -> bool {
        source.kind() == ImageKind::Encoded(self.format) && target == ImageKind::Pixels
    }

    fn convert(&self, source: &Image, _target: ImageKind) -> Result<Image, ImageConvertError> {
        let Image::Encoded(encoded) = source else {
            return Err(ImageConvertError::UnsupportedRepresentation(
                source.kind().to_string(),
            ));
        };
        let decoded = decode(self.format, encoded.bytes())?;
        let rgba = decoded.to_rgba8();
        let (width, height) = (rgba.width(), rgba.height());
        let pixels = PixelBuffer::new(width, height, rgba.into_raw())?;
        Ok(Image::Pixels(pixels))
    }
}

/// Encodes raw RGBA8 pixels into a container format.
pub struct EncodeConverter {
    format: ImageFileFormat,
}

impl EncodeConverter {
    pub fn new(format: ImageFileFormat) -> Self {
        Self { format }
    }
}

impl ImageConverter for EncodeConverter {
    fn can_convert(&self, source: &Image, target: ImageKind) -> bool {
        source.kind() == ImageKind::Pixels && target == ImageKind::Encoded(self.format)
    }

    fn convert(&self, source: &Image, _target: ImageKind) -> Result<Image, ImageConvertError> {
        let Image::Pixels(pixels) = source else {
            return Err(ImageConvertError::UnsupportedRepresentation(
                source.kind().to_string(),
            ));
        };
        let bytes = encode(self.format, pixels)?;
        Ok(Image::Encoded(EncodedImage::new(self.format, bytes)))
    }
}

/// Re-encodes between two container formats through a pixel decode.
pub struct TranscodeConverter {
    from: ImageFileFormat,
    to: ImageFileFormat,
}

impl TranscodeConverter {
    pub fn new(from: ImageFileFormat, to: ImageFileFormat) -> Self {
        Self { from, to }
    }
}

impl ImageConverter for TranscodeConverter {
    fn can_convert(&self, source: &Image, target: ImageKind) -> bool {
        source.kind() == ImageKind::Encoded(self.from) && target == ImageKind::Encoded(self.to)
    }

    fn convert(&self, source: &Image, _target: ImageKind) -> Result<Image, ImageConvertError> {
        let Image::Encoded(encoded) = source else {
            return Err(ImageConvertError::UnsupportedRepresentation(
                source.kind().to_string(),
            ));
        };
        let decoded = decode(self.from, encoded.bytes())?;
        let rgba = decoded.to_rgba8();
        let pixels = PixelBuffer::new(rgba.width(), rgba.height(), rgba.into_raw())?;
        let bytes = encode(self.to, &pixels)?;
        Ok(Image::Encoded(EncodedImage::new(self.to, bytes)))
    }
}

fn decode(format: ImageFileFormat, bytes: &[u8]) -> Result<DynamicImage, ImageConvertError> {
    image::load_from_memory_with_format(bytes, format.codec()).map_err(|e| {
        ImageConvertError::Decode {
            format,
            reason: e.to_string(),
        }
    })
}

fn encode(format: ImageFileFormat, pixels: &PixelBuffer) -> Result<Vec<u8>, ImageConvertError> {
    let rgba = RgbaImage::from_raw(pixels.width(), pixels.height(), pixels.data().to_vec())
        .ok_or(ImageConvertError::PixelBufferSize {
            len: pixels.data().len(),
            width: pixels.width(),
            height: pixels.height(),
        })?;
    let mut buf = Cursor::new(Vec::new());
    // JPEG has no alpha channel, so encode from RGB there
    let result = match format {
        ImageFileFormat::Jpeg => {
            DynamicImage::ImageRgba8(rgba)
                .to_rgb8()
                .write_to(&mut buf, ImageFormat::Jpeg)
        }
        other => rgba.write_to(&mut buf, other.codec()),
    };
    result.map_err(|e| ImageConvertError::Encode {
        format,
        reason: e.to_string(),
    })?;
    Ok(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_pixels(width: u32, height: u32, rgba: [u8; 4]) -> PixelBuffer {
        let data = rgba
            .iter()
            .copied()
            .cycle()
            .take((width * height * 4) as usize)
            .collect();
        PixelBuffer::new(width, height, data).unwrap()
    }

    #[test]
    fn test_factory_sniffs_format() {
        let registry = default_registry();
        let pixels = solid_pixels(4, 4, [1, 2, 3, 255]);
        let png = registry
            .convert(&Image::Pixels(pixels), ImageKind::Encoded(ImageFileFormat::Png))
            .unwrap();
        let Image::Encoded(encoded) = &png else {
            panic!("expected an encoded image");
        };

        let created = registry.create(encoded.bytes()).unwrap();

        assert_eq!(created.kind(), ImageKind::Encoded(ImageFileFormat::Png));
    }

    #[test]
    fn test_create_rejects_unknown_bytes() {
        let registry = default_registry();

        let err = registry.create(b"not an image at all").unwrap_err();

        assert!(matches!(err, ImageConvertError::UnsupportedRepresentation(_)));
    }

    #[test]
    fn test_encode_decode_preserves_pixels() {
        let registry = default_registry();
        let pixels = solid_pixels(3, 2, [9, 8, 7, 255]);

        let encoded = registry
            .convert(&Image::Pixels(pixels.clone()), ImageKind::Encoded(ImageFileFormat::Png))
            .unwrap();
        let decoded = registry.convert(&encoded, ImageKind::Pixels).unwrap();

        assert_eq!(decoded, Image::Pixels(pixels));
    }

    #[test]
    fn test_transcode_between_containers() {
        let registry = default_registry();
        let pixels = solid_pixels(2, 2, [0, 0, 0, 255]);
        let png = registry
            .convert(&Image::Pixels(pixels), ImageKind::Encoded(ImageFileFormat::Png))
            .unwrap();

        let bmp = registry
            .convert(&png, ImageKind::Encoded(ImageFileFormat::Bmp))
            .unwrap();

        assert_eq!(bmp.kind(), ImageKind::Encoded(ImageFileFormat::Bmp));
        assert_eq!(bmp.dimensions().unwrap(), (2, 2));
    }

    #[test]
    fn test_jpeg_encode_drops_alpha() {
        let registry = default_registry();
        let pixels = solid_pixels(8, 8, [100, 150, 200, 255]);

        let jpeg = registry
            .convert(&Image::Pixels(pixels), ImageKind::Encoded(ImageFileFormat::Jpeg))
            .unwrap();

        assert_eq!(jpeg.kind(), ImageKind::Encoded(ImageFileFormat::Jpeg));
        assert_eq!(jpeg.dimensions().unwrap(), (8, 8));
    }
}
