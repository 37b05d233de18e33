//! Linear pipelines: a list of steps executed in order, each stage's
//! output feeding the next stage's input.

use crate::data::Data;
use crate::step::{PipelineError, PipelineStepRunner, StepConfig, StepRegistry};
use serde::{Deserialize, Serialize};

/// An ordered list of step configurations.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SequencePipeline {
    pub steps: Vec<StepConfig>,
}

impl SequencePipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step.
    pub fn step(mut self, config: StepConfig) -> Self {
        self.steps.push(config);
        self
    }

    /// Instantiate every runner up front. Any constructor failure aborts
    /// the build and no executor is returned.
    pub fn executor(&self, registry: &StepRegistry) -> Result<SequenceExecutor, PipelineError> {
        let mut steps = Vec::with_capacity(self.steps.len());
        for config in &self.steps {
            let runner = registry.runner(config)?;
            steps.push((config.clone(), runner));
        }
        Ok(SequenceExecutor {
            steps,
            closed: false,
        })
    }
}

/// A live linear pipeline holding one runner per step.
#[derive(Debug)]
pub struct SequenceExecutor {
    steps: Vec<(StepConfig, Box<dyn PipelineStepRunner>)>,
    closed: bool,
}

impl SequenceExecutor {
    /// Run the payload through every stage in order. Each stage's declared
    /// inputs are validated against the data it actually receives.
    pub fn exec(&mut self, input: Data) -> Result<Data, PipelineError> {
        if self.closed {
            return Err(PipelineError::ClosedRunner);
        }
        let mut data = input;
        for (config, runner) in &mut self.steps {
            config.validate_inputs(&data)?;
            data = runner.exec(data)?;
        }
        Ok(data)
    }

    /// Close every runner. Idempotent; further [`exec`](Self::exec) calls
    /// fail with [`PipelineError::ClosedRunner`].
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        for (_, runner) in &mut self.steps {
            runner.close();
        }
    }
}

impl Drop for SequenceExecutor {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ValueType;

    /// Appends `out = in + 1`, leaving the rest of the payload untouched.
    struct Increment {
        input: String,
        output: String,
    }

    impl PipelineStepRunner for Increment {
        fn exec(&mut self, mut input: Data) -> Result<Data, PipelineError> {
            let n = input
                .get_i64(&self.input)
                .ok_or_else(|| PipelineError::Exec(format!("missing {:?}", self.input)))?;
            input.insert(self.output.clone(), n + 1)?;
            Ok(input)
        }
    }

    fn registry() -> StepRegistry {
        let mut registry = StepRegistry::new();
        registry.register("increment", |config| {
            Ok(Box::new(Increment {
                input: config.option_str("input").unwrap_or("n").to_string(),
                output: config.option_str("output").unwrap_or("n").to_string(),
            }))
        });
        registry.register("failing_init", |_| {
            Err(PipelineError::RunnerInit {
                step_type: "failing_init".to_string(),
                reason: "missing model file".to_string(),
            })
        });
        registry
    }

    #[test]
    fn test_threads_data_through_steps() {
        let pipeline = SequencePipeline::new()
            .step(StepConfig::new("increment").option("input", "n").option("output", "a"))
            .step(StepConfig::new("increment").option("input", "a").option("output", "b"));
        let mut executor = pipeline.executor(&registry()).unwrap();

        let out = executor.exec(Data::new().with("n", 1i64).unwrap()).unwrap();

        // Upstream keys pass through untouched
        assert_eq!(out.get_i64("n"), Some(1));
        assert_eq!(out.get_i64("a"), Some(2));
        assert_eq!(out.get_i64("b"), Some(3));
    }

    #[test]
    fn test_schema_validation_fails_fast() {
        let pipeline = SequencePipeline::new()
            .step(StepConfig::new("increment").input("n", ValueType::Int64));
        let mut executor = pipeline.executor(&registry()).unwrap();

        let err = executor
            .exec(Data::new().with("n", "oops").unwrap())
            .unwrap_err();

        assert!(matches!(err, PipelineError::SchemaValidation { key, .. } if key == "n"));
    }

    #[test]
    fn test_constructor_failure_aborts_build() {
        let pipeline = SequencePipeline::new()
            .step(StepConfig::new("increment"))
            .step(StepConfig::new("failing_init"));

        let err = pipeline.executor(&registry()).unwrap_err();

        assert!(matches!(err, PipelineError::RunnerInit { .. }));
    }

    #[test]
    fn test_exec_after_close() {
        let pipeline = SequencePipeline::new().step(StepConfig::new("increment"));
        let mut executor = pipeline.executor(&registry()).unwrap();

        executor.close();
        executor.close();

        let err = executor.exec(Data::new().with("n", 0i64).unwrap()).unwrap_err();
        assert!(matches!(err, PipelineError::ClosedRunner));
    }
}
