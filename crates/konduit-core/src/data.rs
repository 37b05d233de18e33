//! The typed key-value container passed between pipeline steps.
//!
//! [`Data`] is an ordered mapping from string keys to tagged values drawn
//! from the closed [`ValueType`] set. A key's declared type is immutable
//! for the life of the instance: rewriting a key with a value of a
//! different type is an error, rewriting with the same type overwrites.
//!
//! The JSON form maps every key to a `{"type": ..., "value": ...}` tagged
//! document and round-trips to an equal `Data` (content equality).

use crate::geometry::{BoundingBox, Point};
use crate::image::{EncodedImage, Image, ImageFileFormat, PixelBuffer};
use crate::ndarray::{DType, NDArray, SerializedArray};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};
use std::fmt;

/// The closed set of value types a [`Data`] key can hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueType {
    #[serde(rename = "int64")]
    Int64,
    #[serde(rename = "double")]
    Double,
    #[serde(rename = "boolean")]
    Boolean,
    #[serde(rename = "string")]
    String,
    #[serde(rename = "bytes")]
    Bytes,
    #[serde(rename = "image")]
    Image,
    #[serde(rename = "bounding_box")]
    BoundingBox,
    #[serde(rename = "point")]
    Point,
    #[serde(rename = "ndarray")]
    NDArray,
    #[serde(rename = "data")]
    Data,
    #[serde(rename = "list")]
    List(Box<ValueType>),
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Int64 => f.write_str("int64"),
            ValueType::Double => f.write_str("double"),
            ValueType::Boolean => f.write_str("boolean"),
            ValueType::String => f.write_str("string"),
            ValueType::Bytes => f.write_str("bytes"),
            ValueType::Image => f.write_str("image"),
            ValueType::BoundingBox => f.write_str("bounding_box"),
            ValueType::Point => f.write_str("point"),
            ValueType::NDArray => f.write_str("ndarray"),
            ValueType::Data => f.write_str("data"),
            ValueType::List(inner) => write!(f, "list<{}>", inner),
        }
    }
}

/// Errors from [`Data`] operations and (de)serialization.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("key {key:?} already holds {existing}, cannot rewrite as {attempted}")]
    TypeMismatch {
        key: String,
        existing: ValueType,
        attempted: ValueType,
    },

    #[error("list element {index} has type {actual}, expected {expected}")]
    ListElementType {
        index: usize,
        expected: ValueType,
        actual: ValueType,
    },

    #[error("failed to serialize data document: {0}")]
    Serialize(String),

    #[error("failed to parse data document: {0}")]
    Parse(String),
}

/// A tagged value held under a [`Data`] key.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int64(i64),
    Double(f64),
    Boolean(bool),
    String(String),
    Bytes(Vec<u8>),
    Image(Image),
    BoundingBox(BoundingBox),
    Point(Point),
    NDArray(NDArray),
    Data(Data),
    /// Homogeneous list: the element type is carried explicitly so an
    /// empty list keeps its type.
    List(ValueType, Vec<Value>),
}

impl Value {
    /// The type tag of this value.
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Int64(_) => ValueType::Int64,
            Value::Double(_) => ValueType::Double,
            Value::Boolean(_) => ValueType::Boolean,
            Value::String(_) => ValueType::String,
            Value::Bytes(_) => ValueType::Bytes,
            Value::Image(_) => ValueType::Image,
            Value::BoundingBox(_) => ValueType::BoundingBox,
            Value::Point(_) => ValueType::Point,
            Value::NDArray(_) => ValueType::NDArray,
            Value::Data(_) => ValueType::Data,
            Value::List(elem, _) => ValueType::List(Box::new(elem.clone())),
        }
    }

    /// Build a homogeneous list value, validating every element's type.
    pub fn list(element_type: ValueType, items: Vec<Value>) -> Result<Self, DataError> {
        for (index, item) in items.iter().enumerate() {
            let actual = item.value_type();
            if actual != element_type {
                return Err(DataError::ListElementType {
                    index,
                    expected: element_type,
                    actual,
                });
            }
        }
        Ok(Value::List(element_type, items))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int64(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Double(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::Bytes(bytes)
    }
}

impl From<Image> for Value {
    fn from(image: Image) -> Self {
        Value::Image(image)
    }
}

impl From<BoundingBox> for Value {
    fn from(bbox: BoundingBox) -> Self {
        Value::BoundingBox(bbox)
    }
}

impl From<Point> for Value {
    fn from(point: Point) -> Self {
        Value::Point(point)
    }
}

impl From<NDArray> for Value {
    fn from(array: NDArray) -> Self {
        Value::NDArray(array)
    }
}

impl From<Data> for Value {
    fn from(data: Data) -> Self {
        Value::Data(data)
    }
}

/// Ordered, typed key-value container. Equality is by content.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Data {
    entries: IndexMap<String, Value>,
}

impl Data {
    /// Create an empty container.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The declared type of a key, if present.
    pub fn value_type(&self, key: &str) -> Option<ValueType> {
        self.entries.get(key).map(Value::value_type)
    }

    /// Insert a value under a key.
    ///
    /// Rewriting an existing key with a different [`ValueType`] fails with
    /// [`DataError::TypeMismatch`]; same-type rewrites overwrite.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<(), DataError> {
        let key = key.into();
        let value = value.into();
        if let Some(existing) = self.entries.get(&key) {
            let existing = existing.value_type();
            let attempted = value.value_type();
            if existing != attempted {
                return Err(DataError::TypeMismatch {
                    key,
                    existing,
                    attempted,
                });
            }
        }
        self.entries.insert(key, value);
        Ok(())
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Result<Self, DataError> {
        self.insert(key, value)?;
        Ok(self)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        match self.entries.get(key) {
            Some(Value::Int64(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        match self.entries.get(key) {
            Some(Value::Double(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.entries.get(key) {
            Some(Value::Boolean(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.entries.get(key) {
            Some(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn get_bytes(&self, key: &str) -> Option<&[u8]> {
        match self.entries.get(key) {
            Some(Value::Bytes(b)) => Some(b),
            _ => None,
        }
    }

    pub fn get_image(&self, key: &str) -> Option<&Image> {
        match self.entries.get(key) {
            Some(Value::Image(i)) => Some(i),
            _ => None,
        }
    }

    pub fn get_bounding_box(&self, key: &str) -> Option<&BoundingBox> {
        match self.entries.get(key) {
            Some(Value::BoundingBox(b)) => Some(b),
            _ => None,
        }
    }

    pub fn get_point(&self, key: &str) -> Option<&Point> {
        match self.entries.get(key) {
            Some(Value::Point(p)) => Some(p),
            _ => None,
        }
    }

    pub fn get_ndarray(&self, key: &str) -> Option<&NDArray> {
        match self.entries.get(key) {
            Some(Value::NDArray(a)) => Some(a),
            _ => None,
        }
    }

    pub fn get_data(&self, key: &str) -> Option<&Data> {
        match self.entries.get(key) {
            Some(Value::Data(d)) => Some(d),
            _ => None,
        }
    }

    pub fn get_list(&self, key: &str) -> Option<(&ValueType, &[Value])> {
        match self.entries.get(key) {
            Some(Value::List(elem, items)) => Some((elem, items)),
            _ => None,
        }
    }

    /// Serialize to a compact JSON document.
    pub fn to_json(&self) -> Result<String, DataError> {
        serde_json::to_string(&self.to_json_value()?).map_err(|e| DataError::Serialize(e.to_string()))
    }

    /// Serialize to a pretty-printed JSON document.
    pub fn to_json_pretty(&self) -> Result<String, DataError> {
        serde_json::to_string_pretty(&self.to_json_value()?)
            .map_err(|e| DataError::Serialize(e.to_string()))
    }

    /// Parse from a JSON document produced by [`Data::to_json`].
    pub fn from_json(text: &str) -> Result<Self, DataError> {
        let json: JsonValue =
            serde_json::from_str(text).map_err(|e| DataError::Parse(e.to_string()))?;
        Self::from_json_value(&json)
    }

    fn to_json_value(&self) -> Result<JsonValue, DataError> {
        let mut out = serde_json::Map::new();
        for (key, value) in &self.entries {
            let tag = serde_json::to_value(value.value_type())
                .map_err(|e| DataError::Serialize(e.to_string()))?;
            out.insert(
                key.clone(),
                json!({ "type": tag, "value": value_to_json(value)? }),
            );
        }
        Ok(JsonValue::Object(out))
    }

    fn from_json_value(json: &JsonValue) -> Result<Self, DataError> {
        let object = json
            .as_object()
            .ok_or_else(|| DataError::Parse("expected a JSON object".into()))?;
        let mut data = Data::new();
        for (key, entry) in object {
            let tagged = entry.as_object().ok_or_else(|| {
                DataError::Parse(format!("key {:?}: expected a tagged object", key))
            })?;
            let tag = tagged
                .get("type")
                .ok_or_else(|| DataError::Parse(format!("key {:?}: missing type tag", key)))?;
            let value_type: ValueType = serde_json::from_value(tag.clone())
                .map_err(|e| DataError::Parse(format!("key {:?}: {}", key, e)))?;
            let raw = tagged
                .get("value")
                .ok_or_else(|| DataError::Parse(format!("key {:?}: missing value", key)))?;
            data.insert(key.clone(), value_from_json(&value_type, raw)?)?;
        }
        Ok(data)
    }
}

fn b64_encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

fn b64_decode(text: &str) -> Result<Vec<u8>, DataError> {
    STANDARD
        .decode(text)
        .map_err(|e| DataError::Parse(format!("invalid base64 payload: {}", e)))
}

fn value_to_json(value: &Value) -> Result<JsonValue, DataError> {
    let json = match value {
        Value::Int64(n) => json!(n),
        Value::Double(n) => json!(n),
        Value::Boolean(b) => json!(b),
        Value::String(s) => json!(s),
        Value::Bytes(bytes) => JsonValue::String(b64_encode(bytes)),
        Value::BoundingBox(bbox) => {
            serde_json::to_value(bbox).map_err(|e| DataError::Serialize(e.to_string()))?
        }
        Value::Point(point) => {
            serde_json::to_value(point).map_err(|e| DataError::Serialize(e.to_string()))?
        }
        Value::Image(image) => image_to_json(image)?,
        Value::NDArray(array) => {
            let serialized = array.to_serialized();
            let dtype = serde_json::to_value(serialized.dtype())
                .map_err(|e| DataError::Serialize(e.to_string()))?;
            json!({
                "shape": serialized.shape(),
                "dtype": dtype,
                "data": b64_encode(serialized.data()),
            })
        }
        Value::Data(data) => data.to_json_value()?,
        Value::List(_, items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(value_to_json(item)?);
            }
            JsonValue::Array(out)
        }
    };
    Ok(json)
}

fn value_from_json(value_type: &ValueType, json: &JsonValue) -> Result<Value, DataError> {
    let value = match value_type {
        ValueType::Int64 => Value::Int64(
            json.as_i64()
                .ok_or_else(|| DataError::Parse("expected an int64".into()))?,
        ),
        ValueType::Double => Value::Double(
            json.as_f64()
                .ok_or_else(|| DataError::Parse("expected a double".into()))?,
        ),
        ValueType::Boolean => Value::Boolean(
            json.as_bool()
                .ok_or_else(|| DataError::Parse("expected a boolean".into()))?,
        ),
        ValueType::String => Value::String(
            json.as_str()
                .ok_or_else(|| DataError::Parse("expected a string".into()))?
                .to_string(),
        ),
        ValueType::Bytes => {
            let text = json
                .as_str()
                .ok_or_else(|| DataError::Parse("expected base64 bytes".into()))?;
            Value::Bytes(b64_decode(text)?)
        }
        ValueType::BoundingBox => Value::BoundingBox(
            serde_json::from_value(json.clone()).map_err(|e| DataError::Parse(e.to_string()))?,
        ),
        ValueType::Point => Value::Point(
            serde_json::from_value(json.clone()).map_err(|e| DataError::Parse(e.to_string()))?,
        ),
        ValueType::Image => Value::Image(image_from_json(json)?),
        ValueType::NDArray => Value::NDArray(ndarray_from_json(json)?),
        ValueType::Data => Value::Data(Data::from_json_value(json)?),
        ValueType::List(inner) => {
            let items = json
                .as_array()
                .ok_or_else(|| DataError::Parse("expected a list".into()))?;
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(value_from_json(inner, item)?);
            }
            Value::List((**inner).clone(), out)
        }
    };
    Ok(value)
}

fn image_to_json(image: &Image) -> Result<JsonValue, DataError> {
    let json = match image {
        Image::Pixels(pixels) => json!({
            "representation": "pixels",
            "width": pixels.width(),
            "height": pixels.height(),
            "data": b64_encode(pixels.data()),
        }),
        Image::Encoded(encoded) => json!({
            "representation": encoded.format().to_string(),
            "data": b64_encode(encoded.bytes()),
        }),
    };
    Ok(json)
}

fn image_from_json(json: &JsonValue) -> Result<Image, DataError> {
    let representation = json
        .get("representation")
        .and_then(JsonValue::as_str)
        .ok_or_else(|| DataError::Parse("image payload missing representation".into()))?;
    let data = json
        .get("data")
        .and_then(JsonValue::as_str)
        .ok_or_else(|| DataError::Parse("image payload missing data".into()))?;
    let bytes = b64_decode(data)?;

    if representation == "pixels" {
        let width = json
            .get("width")
            .and_then(JsonValue::as_u64)
            .ok_or_else(|| DataError::Parse("pixel payload missing width".into()))?;
        let height = json
            .get("height")
            .and_then(JsonValue::as_u64)
            .ok_or_else(|| DataError::Parse("pixel payload missing height".into()))?;
        let pixels = PixelBuffer::new(width as u32, height as u32, bytes)
            .map_err(|e| DataError::Parse(e.to_string()))?;
        return Ok(Image::Pixels(pixels));
    }

    let format = match representation {
        "png" => ImageFileFormat::Png,
        "jpeg" => ImageFileFormat::Jpeg,
        "bmp" => ImageFileFormat::Bmp,
        "gif" => ImageFileFormat::Gif,
        other => {
            return Err(DataError::Parse(format!(
                "unknown image representation {:?}",
                other
            )));
        }
    };
    Ok(Image::Encoded(EncodedImage::new(format, bytes)))
}

fn ndarray_from_json(json: &JsonValue) -> Result<NDArray, DataError> {
    let shape = json
        .get("shape")
        .and_then(JsonValue::as_array)
        .ok_or_else(|| DataError::Parse("ndarray payload missing shape".into()))?
        .iter()
        .map(|dim| {
            dim.as_u64()
                .map(|d| d as usize)
                .ok_or_else(|| DataError::Parse("ndarray shape must be non-negative".into()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let dtype: DType = serde_json::from_value(
        json.get("dtype")
            .cloned()
            .ok_or_else(|| DataError::Parse("ndarray payload missing dtype".into()))?,
    )
    .map_err(|e| DataError::Parse(e.to_string()))?;
    let data = b64_decode(
        json.get("data")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| DataError::Parse("ndarray payload missing data".into()))?,
    )?;
    let serialized =
        SerializedArray::new(shape, dtype, data).map_err(|e| DataError::Parse(e.to_string()))?;
    Ok(NDArray::Buffer(serialized))
}
