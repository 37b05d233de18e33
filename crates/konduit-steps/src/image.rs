//! Image preprocessing steps.

use ::image::RgbaImage;
use ::image::imageops::FilterType;
use konduit_core::{
    Data, Image, ImageKind, ImageRegistry, NDArray, PipelineError, PipelineStepRunner, StepConfig,
};

/// Channel layout of the produced tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelLayout {
    /// `[1, 3, height, width]`
    #[default]
    Nchw,
    /// `[1, height, width, 3]`
    Nhwc,
}

impl ChannelLayout {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "nchw" => Some(ChannelLayout::Nchw),
            "nhwc" => Some(ChannelLayout::Nhwc),
            _ => None,
        }
    }
}

/// Resizes an image and converts it to a normalized f32 RGB tensor.
///
/// Pixel values are scaled to [0, 1]. Whatever representation the image
/// arrives in, it is first converted to raw pixels through the bundled
/// image registry.
///
/// Options: required `height` and `width`, `layout` (default `nchw`),
/// `input_name` (default `image`), `output_name` (default `array`).
pub struct ImageToNDArrayRunner {
    input_name: String,
    output_name: String,
    height: u32,
    width: u32,
    layout: ChannelLayout,
    images: ImageRegistry,
}

impl std::fmt::Debug for ImageToNDArrayRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageToNDArrayRunner")
            .field("input_name", &self.input_name)
            .field("output_name", &self.output_name)
            .field("height", &self.height)
            .field("width", &self.width)
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}

impl ImageToNDArrayRunner {
    pub fn from_config(config: &StepConfig) -> Result<Self, PipelineError> {
        let require = |key: &str| {
            config.option_i64(key).ok_or_else(|| PipelineError::RunnerInit {
                step_type: config.step_type.clone(),
                reason: format!("missing {} option", key),
            })
        };
        let layout = match config.option_str("layout") {
            None => ChannelLayout::default(),
            Some(name) => ChannelLayout::parse(name).ok_or_else(|| PipelineError::RunnerInit {
                step_type: config.step_type.clone(),
                reason: format!("unknown layout {:?}", name),
            })?,
        };
        Ok(Self {
            input_name: config.option_str("input_name").unwrap_or("image").to_string(),
            output_name: config.option_str("output_name").unwrap_or("array").to_string(),
            height: require("height")? as u32,
            width: require("width")? as u32,
            layout,
            images: konduit_image::default_registry(),
        })
    }

    fn to_tensor(&self, image: &Image) -> Result<NDArray, PipelineError> {
        let pixels = self
            .images
            .convert(image, ImageKind::Pixels)
            .map_err(|e| PipelineError::Exec(e.to_string()))?;
        let Image::Pixels(pixels) = pixels else {
            return Err(PipelineError::Exec("conversion produced no pixels".to_string()));
        };
        let rgba = RgbaImage::from_raw(pixels.width(), pixels.height(), pixels.data().to_vec())
            .ok_or_else(|| PipelineError::Exec("pixel buffer size mismatch".to_string()))?;
        let resized =
            ::image::imageops::resize(&rgba, self.width, self.height, FilterType::Triangle);

        let (height, width) = (self.height as usize, self.width as usize);
        let mut values = vec![0f32; 3 * height * width];
        for (x, y, pixel) in resized.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            for channel in 0..3 {
                let index = match self.layout {
                    ChannelLayout::Nchw => channel * height * width + y * width + x,
                    ChannelLayout::Nhwc => (y * width + x) * 3 + channel,
                };
                values[index] = f32::from(pixel.0[channel]) / 255.0;
            }
        }

        let shape = match self.layout {
            ChannelLayout::Nchw => vec![1, 3, height, width],
            ChannelLayout::Nhwc => vec![1, height, width, 3],
        };
        NDArray::from_shape_vec(shape, values).map_err(|e| PipelineError::Exec(e.to_string()))
    }
}

impl PipelineStepRunner for ImageToNDArrayRunner {
    fn exec(&mut self, mut input: Data) -> Result<Data, PipelineError> {
        let image = input
            .get_image(&self.input_name)
            .ok_or_else(|| PipelineError::Exec(format!("key {:?} holds no image", self.input_name)))?;
        let tensor = self.to_tensor(image)?;
        input.insert(self.output_name.clone(), tensor)?;
        Ok(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use konduit_core::{DType, PixelBuffer};

    fn solid_image(width: u32, height: u32, rgba: [u8; 4]) -> Image {
        let data = rgba
            .iter()
            .copied()
            .cycle()
            .take((width * height * 4) as usize)
            .collect();
        Image::Pixels(PixelBuffer::new(width, height, data).unwrap())
    }

    #[test]
    fn test_nchw_shape_and_normalization() {
        let config = StepConfig::new("image_to_ndarray")
            .option("height", 4)
            .option("width", 2);
        let mut runner = ImageToNDArrayRunner::from_config(&config).unwrap();
        let input = Data::new()
            .with("image", solid_image(8, 8, [51, 102, 255, 255]))
            .unwrap();

        let out = runner.exec(input).unwrap();

        let tensor = out.get_ndarray("array").unwrap();
        assert_eq!(tensor.shape(), &[1, 3, 4, 2]);
        assert_eq!(tensor.dtype(), DType::F32);
        let serialized = tensor.to_serialized();
        let first = f32::from_le_bytes(serialized.data()[..4].try_into().unwrap());
        assert!((first - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_nhwc_layout() {
        let config = StepConfig::new("image_to_ndarray")
            .option("height", 2)
            .option("width", 2)
            .option("layout", "nhwc");
        let mut runner = ImageToNDArrayRunner::from_config(&config).unwrap();
        let input = Data::new().with("image", solid_image(2, 2, [0, 0, 0, 255])).unwrap();

        let out = runner.exec(input).unwrap();

        assert_eq!(out.get_ndarray("array").unwrap().shape(), &[1, 2, 2, 3]);
    }

    #[test]
    fn test_missing_extent_fails_init() {
        let config = StepConfig::new("image_to_ndarray").option("height", 2);

        let err = ImageToNDArrayRunner::from_config(&config).unwrap_err();

        assert!(matches!(err, PipelineError::RunnerInit { .. }));
    }
}
