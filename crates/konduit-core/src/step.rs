//! Step configuration, the runner trait, and the step-type registry.
//!
//! A [`StepConfig`] is the declarative description of one pipeline stage:
//! a step type name, the input keys (and types) the stage requires, and a
//! free-form options map. Executors turn configs into live
//! [`PipelineStepRunner`] instances through a [`StepRegistry`].

use crate::data::{Data, DataError, ValueType};
use crate::graph::GraphError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Errors raised while building or executing pipelines.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(
        "step {step:?}: input {key:?} expected {expected}, got {}",
        .actual.as_ref().map(ToString::to_string).unwrap_or_else(|| "nothing".to_string())
    )]
    SchemaValidation {
        step: String,
        key: String,
        expected: ValueType,
        actual: Option<ValueType>,
    },

    #[error("unknown step type {0:?}")]
    UnknownStepType(String),

    #[error("failed to initialize {step_type:?} runner: {reason}")]
    RunnerInit { step_type: String, reason: String },

    #[error("runner has been closed")]
    ClosedRunner,

    #[error("step execution failed: {0}")]
    Exec(String),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Data(#[from] DataError),
}

/// Declarative configuration for a single pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepConfig {
    /// Registry name of the step implementation.
    #[serde(rename = "type")]
    pub step_type: String,

    /// Input keys the step requires, with their expected types. Validated
    /// against the incoming [`Data`] before each execution.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub inputs: IndexMap<String, ValueType>,

    /// Implementation-specific options.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub options: IndexMap<String, JsonValue>,
}

impl StepConfig {
    pub fn new(step_type: impl Into<String>) -> Self {
        Self {
            step_type: step_type.into(),
            inputs: IndexMap::new(),
            options: IndexMap::new(),
        }
    }

    /// Declare a required input key.
    pub fn input(mut self, key: impl Into<String>, value_type: ValueType) -> Self {
        self.inputs.insert(key.into(), value_type);
        self
    }

    /// Set an implementation option.
    pub fn option(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn option_str(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(JsonValue::as_str)
    }

    pub fn option_i64(&self, key: &str) -> Option<i64> {
        self.options.get(key).and_then(JsonValue::as_i64)
    }

    pub fn option_f64(&self, key: &str) -> Option<f64> {
        self.options.get(key).and_then(JsonValue::as_f64)
    }

    /// Check the incoming payload against the declared inputs. The error
    /// names the first offending key.
    pub fn validate_inputs(&self, data: &Data) -> Result<(), PipelineError> {
        for (key, expected) in &self.inputs {
            let actual = data.value_type(key);
            if actual.as_ref() != Some(expected) {
                return Err(PipelineError::SchemaValidation {
                    step: self.step_type.clone(),
                    key: key.clone(),
                    expected: expected.clone(),
                    actual,
                });
            }
        }
        Ok(())
    }
}

/// A live pipeline stage. Runners may hold mutable state (sessions,
/// handles) and must release it in [`close`](PipelineStepRunner::close).
pub trait PipelineStepRunner: Send {
    /// Transform one payload. Runners append their outputs to the incoming
    /// data so upstream keys pass through untouched.
    fn exec(&mut self, input: Data) -> Result<Data, PipelineError>;

    /// Release held resources. Called once by the owning executor; the
    /// default is a no-op for stateless runners.
    fn close(&mut self) {}
}

impl std::fmt::Debug for dyn PipelineStepRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn PipelineStepRunner")
    }
}

/// Constructor for a step implementation.
pub type StepFactory =
    Box<dyn Fn(&StepConfig) -> Result<Box<dyn PipelineStepRunner>, PipelineError> + Send + Sync>;

/// Name-indexed table of step constructors. Registration order is kept so
/// listings are stable.
#[derive(Default)]
pub struct StepRegistry {
    factories: IndexMap<String, StepFactory>,
}

impl StepRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a step type. A later registration under the same name
    /// replaces the earlier one.
    pub fn register(
        &mut self,
        step_type: impl Into<String>,
        factory: impl Fn(&StepConfig) -> Result<Box<dyn PipelineStepRunner>, PipelineError>
        + Send
        + Sync
        + 'static,
    ) {
        self.factories.insert(step_type.into(), Box::new(factory));
    }

    pub fn contains(&self, step_type: &str) -> bool {
        self.factories.contains_key(step_type)
    }

    pub fn step_types(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(|k| k.as_str())
    }

    /// Instantiate a runner for the given config.
    pub fn runner(&self, config: &StepConfig) -> Result<Box<dyn PipelineStepRunner>, PipelineError> {
        let factory = self
            .factories
            .get(&config.step_type)
            .ok_or_else(|| PipelineError::UnknownStepType(config.step_type.clone()))?;
        factory(config)
    }
}

/// Model families a `"model"` step can dispatch to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    TensorFlow,
    Onnx,
    Dl4j,
    Keras,
    Samediff,
    Pmml,
}

impl ModelType {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "tensor_flow" | "tensorflow" => Some(ModelType::TensorFlow),
            "onnx" => Some(ModelType::Onnx),
            "dl4j" => Some(ModelType::Dl4j),
            "keras" => Some(ModelType::Keras),
            "samediff" => Some(ModelType::Samediff),
            "pmml" => Some(ModelType::Pmml),
            _ => None,
        }
    }
}

/// Static table mapping [`ModelType`] to runner constructors. Backends
/// register themselves here; the generic `"model"` step type then
/// dispatches on the `model_type` option.
#[derive(Default)]
pub struct ModelRunnerRegistry {
    factories: IndexMap<ModelType, StepFactory>,
}

impl ModelRunnerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        model_type: ModelType,
        factory: impl Fn(&StepConfig) -> Result<Box<dyn PipelineStepRunner>, PipelineError>
        + Send
        + Sync
        + 'static,
    ) {
        self.factories.insert(model_type, Box::new(factory));
    }

    pub fn contains(&self, model_type: ModelType) -> bool {
        self.factories.contains_key(&model_type)
    }

    /// Install this table into a step registry as the `"model"` step type.
    pub fn install(self, registry: &mut StepRegistry) {
        registry.register("model", move |config| {
            let name = config.option_str("model_type").ok_or_else(|| {
                PipelineError::RunnerInit {
                    step_type: "model".to_string(),
                    reason: "missing model_type option".to_string(),
                }
            })?;
            let model_type =
                ModelType::parse(name).ok_or_else(|| PipelineError::RunnerInit {
                    step_type: "model".to_string(),
                    reason: format!("unknown model_type {:?}", name),
                })?;
            let factory =
                self.factories
                    .get(&model_type)
                    .ok_or_else(|| PipelineError::RunnerInit {
                        step_type: "model".to_string(),
                        reason: format!("no runner registered for model_type {:?}", name),
                    })?;
            factory(config)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Passthrough;

    impl PipelineStepRunner for Passthrough {
        fn exec(&mut self, input: Data) -> Result<Data, PipelineError> {
            Ok(input)
        }
    }

    #[test]
    fn test_unknown_step_type() {
        let registry = StepRegistry::new();
        let err = registry.runner(&StepConfig::new("nope")).unwrap_err();

        assert!(matches!(err, PipelineError::UnknownStepType(name) if name == "nope"));
    }

    #[test]
    fn test_registry_dispatch() {
        let mut registry = StepRegistry::new();
        registry.register("identity", |_| Ok(Box::new(Passthrough)));

        let mut runner = registry.runner(&StepConfig::new("identity")).unwrap();
        let data = Data::new().with("x", 1i64).unwrap();

        assert_eq!(runner.exec(data.clone()).unwrap(), data);
    }

    #[test]
    fn test_validate_inputs_names_offending_key() {
        let config = StepConfig::new("identity")
            .input("a", ValueType::Int64)
            .input("b", ValueType::String);
        let data = Data::new().with("a", 1i64).unwrap().with("b", 2i64).unwrap();

        let err = config.validate_inputs(&data).unwrap_err();

        match err {
            PipelineError::SchemaValidation { key, expected, actual, .. } => {
                assert_eq!(key, "b");
                assert_eq!(expected, ValueType::String);
                assert_eq!(actual, Some(ValueType::Int64));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_validate_inputs_missing_key() {
        let config = StepConfig::new("identity").input("a", ValueType::Int64);

        let err = config.validate_inputs(&Data::new()).unwrap_err();

        assert!(matches!(
            err,
            PipelineError::SchemaValidation { actual: None, .. }
        ));
    }

    #[test]
    fn test_model_dispatch_requires_model_type() {
        let mut registry = StepRegistry::new();
        ModelRunnerRegistry::new().install(&mut registry);

        let err = registry.runner(&StepConfig::new("model")).unwrap_err();

        assert!(matches!(err, PipelineError::RunnerInit { .. }));
    }

    #[test]
    fn test_model_dispatch_by_type() {
        let mut models = ModelRunnerRegistry::new();
        models.register(ModelType::Onnx, |_| Ok(Box::new(Passthrough)));
        let mut registry = StepRegistry::new();
        models.install(&mut registry);

        let config = StepConfig::new("model").option("model_type", "onnx");
        assert!(registry.runner(&config).is_ok());

        let config = StepConfig::new("model").option("model_type", "keras");
        assert!(matches!(
            registry.runner(&config).unwrap_err(),
            PipelineError::RunnerInit { .. }
        ));
    }
}
