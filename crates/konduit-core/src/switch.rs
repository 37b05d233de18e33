//! Switch functions route a payload down exactly one graph branch.

use crate::data::Data;
use crate::graph::GraphError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Routing decision for a switch node. Implementations inspect the payload
/// and pick one of a fixed number of output ports.
pub trait SwitchFn: Send {
    /// Number of output ports this switch exposes.
    fn num_outputs(&self) -> usize;

    /// Pick the output port for this payload. Must return a value below
    /// [`num_outputs`](SwitchFn::num_outputs).
    fn select(&self, data: &Data) -> Result<usize, GraphError>;
}

impl std::fmt::Debug for dyn SwitchFn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn SwitchFn")
    }
}

/// Declarative configuration for a switch node's routing function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchConfig {
    /// Registry name of the switch function.
    #[serde(rename = "type")]
    pub switch_type: String,

    /// Implementation-specific options.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub options: IndexMap<String, JsonValue>,
}

impl SwitchConfig {
    pub fn new(switch_type: impl Into<String>) -> Self {
        Self {
            switch_type: switch_type.into(),
            options: IndexMap::new(),
        }
    }

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
}

/// Constructor for a switch function.
pub type SwitchFactory =
    Box<dyn Fn(&SwitchConfig) -> Result<Box<dyn SwitchFn>, GraphError> + Send + Sync>;

/// Name-indexed table of switch function constructors.
#[derive(Default)]
pub struct SwitchRegistry {
    factories: IndexMap<String, SwitchFactory>,
}

impl SwitchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        switch_type: impl Into<String>,
        factory: impl Fn(&SwitchConfig) -> Result<Box<dyn SwitchFn>, GraphError>
        + Send
        + Sync
        + 'static,
    ) {
        self.factories.insert(switch_type.into(), Box::new(factory));
    }

    pub fn contains(&self, switch_type: &str) -> bool {
        self.factories.contains_key(switch_type)
    }

    pub fn switch_types(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(|k| k.as_str())
    }

    /// Instantiate a switch function for the given config.
    pub fn switch_fn(&self, config: &SwitchConfig) -> Result<Box<dyn SwitchFn>, GraphError> {
        let factory = self
            .factories
            .get(&config.switch_type)
            .ok_or_else(|| GraphError::UnknownSwitchType(config.switch_type.clone()))?;
        factory(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Constant(usize);

    impl SwitchFn for Constant {
        fn num_outputs(&self) -> usize {
            2
        }

        fn select(&self, _data: &Data) -> Result<usize, GraphError> {
            Ok(self.0)
        }
    }

    #[test]
    fn test_unknown_switch_type() {
        let registry = SwitchRegistry::new();
        let err = registry.switch_fn(&SwitchConfig::new("nope")).unwrap_err();

        assert!(matches!(err, GraphError::UnknownSwitchType(name) if name == "nope"));
    }

    #[test]
    fn test_registry_dispatch() {
        let mut registry = SwitchRegistry::new();
        registry.register("const", |config| {
            let port = config.option_i64("port").unwrap_or(0) as usize;
            Ok(Box::new(Constant(port)))
        });

        let switch = registry
            .switch_fn(&SwitchConfig::new("const").option("port", 1))
            .unwrap();

        assert_eq!(switch.select(&Data::new()).unwrap(), 1);
    }
}
