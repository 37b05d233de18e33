//! Conversion registry for array representations.
//!
//! Converters are registered in a deterministic order; a conversion request
//! scans the registered converters and the first one whose `can_convert`
//! returns true performs the conversion. The registry never chains
//! converters automatically: each supported (source, target) pair has its
//! own explicit converter, and a missing pair fails with
//! [`ArrayConvertError::NoConverter`].

use crate::ndarray::{ArrayData, DType, NDArray, NDArrayError, TypedArray};
use std::fmt;

/// Highest array rank the built-in converters support.
pub const MAX_BUILTIN_RANK: usize = 5;

/// Tag identifying a concrete array representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayKind {
    /// Little-endian serialized buffer with shape and dtype tags.
    Buffer,
    /// Flat typed storage of the given dtype and rank.
    Typed { dtype: DType, rank: usize },
}

impl fmt::Display for ArrayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArrayKind::Buffer => f.write_str("buffer"),
            ArrayKind::Typed { dtype, rank } => write!(f, "typed<{}, rank {}>", dtype, rank),
        }
    }
}

impl NDArray {
    /// The representation tag of this array.
    pub fn kind(&self) -> ArrayKind {
        match self {
            NDArray::Buffer(_) => ArrayKind::Buffer,
            NDArray::Typed(t) => ArrayKind::Typed {
                dtype: t.dtype(),
                rank: t.shape().len(),
            },
        }
    }
}

/// Errors from the array conversion registry.
#[derive(Debug, thiserror::Error)]
pub enum ArrayConvertError {
    #[error("no registered converter from {from} to {to}")]
    NoConverter { from: ArrayKindName, to: ArrayKindName },

    #[error("conversion to {to} failed: {source}")]
    Failed {
        to: ArrayKindName,
        #[source]
        source: NDArrayError,
    },
}

/// Display-friendly owned form of an [`ArrayKind`] for error payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayKindName(String);

impl From<ArrayKind> for ArrayKindName {
    fn from(kind: ArrayKind) -> Self {
        ArrayKindName(kind.to_string())
    }
}

impl fmt::Display for ArrayKindName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single-hop conversion between array representations.
pub trait ArrayConverter: Send + Sync {
    /// Whether this converter can produce `target` from `source`.
    fn can_convert(&self, source: &NDArray, target: ArrayKind) -> bool;

    /// Perform the conversion. The source is never mutated.
    fn convert(&self, source: &NDArray, target: ArrayKind) -> Result<NDArray, ArrayConvertError>;
}

/// Registry of array converters.
///
/// Registration order is deterministic and decides dispatch: the first
/// converter reporting `can_convert == true` wins.
pub struct ArrayRegistry {
    converters: Vec<Box<dyn ArrayConverter>>,
}

impl Default for ArrayRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl ArrayRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            converters: Vec::new(),
        }
    }

    /// Create a registry with the built-in converters registered.
    ///
    /// For each dtype and each rank 1 through [`MAX_BUILTIN_RANK`], a
    /// typed-to-buffer and a buffer-to-typed converter are registered as
    /// separate rank-specific instances.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for dtype in DType::ALL {
            for rank in 1..=MAX_BUILTIN_RANK {
                registry.register(TypedToBuffer { dtype, rank });
                registry.register(BufferToTyped { dtype, rank });
            }
        }
        registry
    }

    /// Register a converter. Later registrations lose ties to earlier ones.
    pub fn register(&mut self, converter: impl ArrayConverter + 'static) {
        self.converters.push(Box::new(converter));
    }

    /// Number of registered converters.
    pub fn len(&self) -> usize {
        self.converters.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }

    /// Convert `source` to the requested representation.
    ///
    /// Requesting the representation the value already has returns a clone.
    /// Conversion is recomputed fresh on every call; nothing is cached and
    /// the source never changes.
    pub fn convert(
        &self,
        source: &NDArray,
        target: ArrayKind,
    ) -> Result<NDArray, ArrayConvertError> {
        if source.kind() == target {
            return Ok(source.clone());
        }
        for converter in &self.converters {
            if converter.can_convert(source, target) {
                return converter.convert(source, target);
            }
        }
        Err(ArrayConvertError::NoConverter {
            from: source.kind().into(),
            to: target.into(),
        })
    }
}

/// Typed storage of one (dtype, rank) pair to the serialized buffer form.
pub struct TypedToBuffer {
    dtype: DType,
    rank: usize,
}

impl ArrayConverter for TypedToBuffer {
    fn can_convert(&self, source: &NDArray, target: ArrayKind) -> bool {
        target == ArrayKind::Buffer
            && source.kind()
                == ArrayKind::Typed {
                    dtype: self.dtype,
                    rank: self.rank,
                }
    }

    fn convert(&self, source: &NDArray, _target: ArrayKind) -> Result<NDArray, ArrayConvertError> {
        Ok(NDArray::Buffer(source.to_serialized()))
    }
}

/// Serialized buffer form to typed storage of one (dtype, rank) pair.
pub struct BufferToTyped {
    dtype: DType,
    rank: usize,
}

impl ArrayConverter for BufferToTyped {
    fn can_convert(&self, source: &NDArray, target: ArrayKind) -> bool {
        let wanted = ArrayKind::Typed {
            dtype: self.dtype,
            rank: self.rank,
        };
        matches!(source, NDArray::Buffer(b)
            if b.dtype() == self.dtype && b.shape().len() == self.rank)
            && target == wanted
    }

    fn convert(&self, source: &NDArray, target: ArrayKind) -> Result<NDArray, ArrayConvertError> {
        let buffer = match source {
            NDArray::Buffer(b) => b,
            // can_convert only admits buffers
            NDArray::Typed(_) => {
                return Err(ArrayConvertError::NoConverter {
                    from: source.kind().into(),
                    to: target.into(),
                });
            }
        };
        let data = ArrayData::from_le_bytes(buffer.dtype(), buffer.data()).map_err(|source| {
            ArrayConvertError::Failed {
                to: target.into(),
                source,
            }
        })?;
        let typed =
            TypedArray::new(buffer.shape().to_vec(), data).map_err(|source| {
                ArrayConvertError::Failed {
                    to: target.into(),
                    source,
                }
            })?;
        Ok(NDArray::Typed(typed))
    }
}
