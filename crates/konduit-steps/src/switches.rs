//! Bundled switch functions for graph routing.

use konduit_core::{Data, GraphError, SwitchConfig, SwitchFn};

/// Routes on whether a list under `key` is empty: port 0 when empty,
/// port 1 otherwise.
pub struct ListEmptySwitch {
    key: String,
}

impl ListEmptySwitch {
    pub fn from_config(config: &SwitchConfig) -> Result<Self, GraphError> {
        let key = config
            .option_str("key")
            .ok_or_else(|| GraphError::Switch("list_empty requires a key option".to_string()))?;
        Ok(Self {
            key: key.to_string(),
        })
    }
}

impl SwitchFn for ListEmptySwitch {
    fn num_outputs(&self) -> usize {
        2
    }

    fn select(&self, data: &Data) -> Result<usize, GraphError> {
        let (_, items) = data
            .get_list(&self.key)
            .ok_or_else(|| GraphError::Switch(format!("key {:?} holds no list", self.key)))?;
        Ok(if items.is_empty() { 0 } else { 1 })
    }
}

/// Routes on an integer under `key`, interpreted directly as the port
/// number.
pub struct IntValueSwitch {
    key: String,
    num_outputs: usize,
}

impl IntValueSwitch {
    pub fn from_config(config: &SwitchConfig) -> Result<Self, GraphError> {
        let key = config
            .option_str("key")
            .ok_or_else(|| GraphError::Switch("int_value requires a key option".to_string()))?;
        let num_outputs = config
            .option_i64("num_outputs")
            .filter(|&n| n > 0)
            .ok_or_else(|| {
                GraphError::Switch("int_value requires a positive num_outputs option".to_string())
            })?;
        Ok(Self {
            key: key.to_string(),
            num_outputs: num_outputs as usize,
        })
    }
}

impl SwitchFn for IntValueSwitch {
    fn num_outputs(&self) -> usize {
        self.num_outputs
    }

    fn select(&self, data: &Data) -> Result<usize, GraphError> {
        let value = data
            .get_i64(&self.key)
            .ok_or_else(|| GraphError::Switch(format!("key {:?} holds no int64", self.key)))?;
        usize::try_from(value)
            .map_err(|_| GraphError::Switch(format!("key {:?} is negative", self.key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use konduit_core::{Value, ValueType};

    #[test]
    fn test_list_empty_routing() {
        let config = SwitchConfig::new("list_empty").option("key", "boxes");
        let switch = ListEmptySwitch::from_config(&config).unwrap();

        let mut empty = Data::new();
        empty
            .insert("boxes", Value::list(ValueType::BoundingBox, vec![]).unwrap())
            .unwrap();
        assert_eq!(switch.select(&empty).unwrap(), 0);

        let mut full = Data::new();
        full.insert(
            "boxes",
            Value::list(ValueType::Int64, vec![Value::Int64(1)]).unwrap(),
        )
        .unwrap();
        assert_eq!(switch.select(&full).unwrap(), 1);

        assert!(switch.select(&Data::new()).is_err());
    }

    #[test]
    fn test_int_value_routing() {
        let config = SwitchConfig::new("int_value")
            .option("key", "route")
            .option("num_outputs", 3);
        let switch = IntValueSwitch::from_config(&config).unwrap();

        let data = Data::new().with("route", 2i64).unwrap();
        assert_eq!(switch.num_outputs(), 3);
        assert_eq!(switch.select(&data).unwrap(), 2);

        let negative = Data::new().with("route", -1i64).unwrap();
        assert!(switch.select(&negative).is_err());
    }
}
