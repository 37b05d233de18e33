//! Konduit: typed data pipelines for machine learning serving
//!
//! A pipeline is a declarative document of steps, executed over a typed
//! key-value [`Data`] payload. Linear pipelines run steps in order; graph
//! pipelines add branching, conditional routing, and merging.

mod array_convert;
mod data;
mod geometry;
mod graph;
mod image;
mod ndarray;
mod pipeline;
mod sequence;
mod step;
mod switch;

pub use array_convert::{
    ArrayConvertError, ArrayConverter, ArrayKind, ArrayRegistry, MAX_BUILTIN_RANK,
};
pub use data::{Data, DataError, Value, ValueType};
pub use geometry::{BoundingBox, Point};
pub use graph::{GraphError, GraphExecutor, GraphNode, GraphPipeline, INPUT_NODE, PortRef};
pub use image::{
    EncodedImage, Image, ImageConvertError, ImageConverter, ImageFactory, ImageFileFormat,
    ImageKind, ImageRegistry, PixelBuffer,
};
pub use ndarray::{
    ArrayData, DType, Element, NDArray, NDArrayError, SerializedArray, TypedArray,
};
pub use pipeline::{Pipeline, PipelineExecutor, PipelineFormatError};
pub use sequence::{SequenceExecutor, SequencePipeline};
pub use step::{
    ModelRunnerRegistry, ModelType, PipelineError, PipelineStepRunner, StepConfig, StepFactory,
    StepRegistry,
};
pub use switch::{SwitchConfig, SwitchFactory, SwitchFn, SwitchRegistry};
