//! Top-level pipeline documents and their JSON/YAML wire form.

use crate::data::Data;
use crate::graph::{GraphExecutor, GraphPipeline};
use crate::sequence::{SequenceExecutor, SequencePipeline};
use crate::step::{PipelineError, StepRegistry};
use crate::switch::SwitchRegistry;
use serde::{Deserialize, Serialize};

/// Errors parsing or writing pipeline documents.
#[derive(Debug, thiserror::Error)]
pub enum PipelineFormatError {
    #[error("failed to parse pipeline: {0}")]
    Parse(String),

    #[error("unsupported pipeline format: {0}")]
    UnsupportedFormat(String),
}

/// A pipeline document: either a linear sequence or a dataflow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Pipeline {
    Sequence(SequencePipeline),
    Graph(GraphPipeline),
}

impl Pipeline {
    /// Parse a pipeline, picking the format from a file path's extension.
    /// Without a path the document is treated as YAML, which also accepts
    /// JSON input.
    pub fn from_bytes(data: &[u8], path: Option<&str>) -> Result<Self, PipelineFormatError> {
        let format = path
            .and_then(detect_format)
            .unwrap_or_else(|| "yaml".to_string());
        Self::from_bytes_format(data, &format)
    }

    /// Parse a pipeline with an explicit format name.
    pub fn from_bytes_format(data: &[u8], format: &str) -> Result<Self, PipelineFormatError> {
        match format {
            "json" => {
                serde_json::from_slice(data).map_err(|e| PipelineFormatError::Parse(e.to_string()))
            }
            "yaml" | "yml" => {
                // serde_yaml can't parse `!tag`-style enums nested inside an
                // internally tagged enum, so enums use singleton-map form.
                let de = serde_yaml::Deserializer::from_slice(data);
                serde_yaml::with::singleton_map_recursive::deserialize(de)
                    .map_err(|e| PipelineFormatError::Parse(e.to_string()))
            }
            other => Err(PipelineFormatError::UnsupportedFormat(other.to_string())),
        }
    }

    pub fn from_json(text: &str) -> Result<Self, PipelineFormatError> {
        Self::from_bytes_format(text.as_bytes(), "json")
    }

    pub fn from_yaml(text: &str) -> Result<Self, PipelineFormatError> {
        Self::from_bytes_format(text.as_bytes(), "yaml")
    }

    pub fn to_json(&self) -> Result<String, PipelineFormatError> {
        serde_json::to_string_pretty(self).map_err(|e| PipelineFormatError::Parse(e.to_string()))
    }

    pub fn to_yaml(&self) -> Result<String, PipelineFormatError> {
        let mut out = Vec::new();
        let mut ser = serde_yaml::Serializer::new(&mut out);
        serde_yaml::with::singleton_map_recursive::serialize(self, &mut ser)
            .map_err(|e| PipelineFormatError::Parse(e.to_string()))?;
        String::from_utf8(out).map_err(|e| PipelineFormatError::Parse(e.to_string()))
    }

    /// Instantiate an executor, validating the document and constructing
    /// every runner up front.
    pub fn executor(
        &self,
        steps: &StepRegistry,
        switches: &SwitchRegistry,
    ) -> Result<PipelineExecutor, PipelineError> {
        match self {
            Pipeline::Sequence(sequence) => {
                Ok(PipelineExecutor::Sequence(sequence.executor(steps)?))
            }
            Pipeline::Graph(graph) => Ok(PipelineExecutor::Graph(graph.executor(steps, switches)?)),
        }
    }
}

impl From<SequencePipeline> for Pipeline {
    fn from(sequence: SequencePipeline) -> Self {
        Pipeline::Sequence(sequence)
    }
}

impl From<GraphPipeline> for Pipeline {
    fn from(graph: GraphPipeline) -> Self {
        Pipeline::Graph(graph)
    }
}

/// A live pipeline of either shape.
pub enum PipelineExecutor {
    Sequence(SequenceExecutor),
    Graph(GraphExecutor),
}

impl PipelineExecutor {
    pub fn exec(&mut self, input: Data) -> Result<Data, PipelineError> {
        match self {
            PipelineExecutor::Sequence(executor) => executor.exec(input),
            PipelineExecutor::Graph(executor) => executor.exec(input),
        }
    }

    pub fn close(&mut self) {
        match self {
            PipelineExecutor::Sequence(executor) => executor.close(),
            PipelineExecutor::Graph(executor) => executor.close(),
        }
    }
}

/// Detect format from file path extension.
fn detect_format(path: &str) -> Option<String> {
    let ext = path.rsplit('.').next()?;
    match ext.to_lowercase().as_str() {
        "json" => Some("json".into()),
        "yaml" | "yml" => Some("yaml".into()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ValueType;
    use crate::graph::PortRef;
    use crate::step::StepConfig;
    use crate::switch::SwitchConfig;

    fn sample_graph() -> Pipeline {
        GraphPipeline::new()
            .switch("route", PortRef::input(), SwitchConfig::new("list_empty").option("key", "boxes"))
            .unwrap()
            .then(
                "crop",
                PortRef::port("route", 1),
                StepConfig::new("bbox_to_point").input("boxes", ValueType::List(Box::new(ValueType::BoundingBox))),
            )
            .unwrap()
            .any("either", vec![PortRef::port("route", 0), PortRef::new("crop")])
            .unwrap()
            .output("either")
            .into()
    }

    #[test]
    fn test_sequence_json_roundtrip() {
        let pipeline: Pipeline = SequencePipeline::new()
            .step(StepConfig::new("image_to_ndarray").option("height", 64).option("width", 64))
            .step(StepConfig::new("ssd_to_bbox").option("threshold", 0.5))
            .into();

        let json = pipeline.to_json().unwrap();
        let parsed = Pipeline::from_json(&json).unwrap();

        assert_eq!(parsed, pipeline);
    }

    #[test]
    fn test_graph_yaml_roundtrip() {
        let pipeline = sample_graph();

        let yaml = pipeline.to_yaml().unwrap();
        let parsed = Pipeline::from_yaml(&yaml).unwrap();

        assert_eq!(parsed, pipeline);
    }

    #[test]
    fn test_format_detection() {
        let pipeline = sample_graph();
        let json = pipeline.to_json().unwrap();

        let parsed = Pipeline::from_bytes(json.as_bytes(), Some("pipeline.JSON")).unwrap();
        assert_eq!(parsed, pipeline);

        // YAML is the fallback and accepts JSON documents
        let parsed = Pipeline::from_bytes(json.as_bytes(), None).unwrap();
        assert_eq!(parsed, pipeline);

        let err = Pipeline::from_bytes_format(json.as_bytes(), "toml").unwrap_err();
        assert!(matches!(err, PipelineFormatError::UnsupportedFormat(_)));
    }
}
