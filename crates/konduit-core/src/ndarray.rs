//! N-dimensional array values and their in-memory representations.
//!
//! An [`NDArray`] wraps exactly one concrete representation: flat typed
//! storage with an explicit shape, or an opaque little-endian byte buffer
//! tagged with shape and dtype. Conversion between representations goes
//! through the registry in [`crate::array_convert`] and never mutates the
//! source value.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Element type of an array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DType {
    F32,
    F64,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    Bool,
}

impl DType {
    /// All element types, in a fixed order.
    pub const ALL: [DType; 11] = [
        DType::F32,
        DType::F64,
        DType::I8,
        DType::I16,
        DType::I32,
        DType::I64,
        DType::U8,
        DType::U16,
        DType::U32,
        DType::U64,
        DType::Bool,
    ];

    /// Width of one element in the serialized form, in bytes.
    pub fn size_bytes(self) -> usize {
        match self {
            DType::I8 | DType::U8 | DType::Bool => 1,
            DType::I16 | DType::U16 => 2,
            DType::F32 | DType::I32 | DType::U32 => 4,
            DType::F64 | DType::I64 | DType::U64 => 8,
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DType::F32 => "f32",
            DType::F64 => "f64",
            DType::I8 => "i8",
            DType::I16 => "i16",
            DType::I32 => "i32",
            DType::I64 => "i64",
            DType::U8 => "u8",
            DType::U16 => "u16",
            DType::U32 => "u32",
            DType::U64 => "u64",
            DType::Bool => "bool",
        };
        f.write_str(name)
    }
}

/// Errors from array construction and buffer decoding.
#[derive(Debug, thiserror::Error)]
pub enum NDArrayError {
    #[error("shape {shape:?} implies {expected} elements, got {actual}")]
    ShapeMismatch {
        shape: Vec<usize>,
        expected: usize,
        actual: usize,
    },

    #[error("ragged nested input: row {row} has length {actual}, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("buffer of {len} bytes is not a whole number of {dtype} elements")]
    BufferLength { len: usize, dtype: DType },
}

mod private {
    pub trait Sealed {}
}

/// A primitive element type that can back a [`TypedArray`].
pub trait Element: private::Sealed + Copy {
    const DTYPE: DType;

    fn wrap(data: Vec<Self>) -> ArrayData;
    fn write_le(&self, out: &mut Vec<u8>);
    fn read_le(bytes: &[u8]) -> Self;
}

macro_rules! impl_element {
    ($t:ty, $dtype:expr, $variant:ident) => {
        impl private::Sealed for $t {}

        impl Element for $t {
            const DTYPE: DType = $dtype;

            fn wrap(data: Vec<Self>) -> ArrayData {
                ArrayData::$variant(data)
            }

            fn write_le(&self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }

            fn read_le(bytes: &[u8]) -> Self {
                <$t>::from_le_bytes(bytes.try_into().unwrap())
            }
        }
    };
}

impl_element!(f32, DType::F32, F32);
impl_element!(f64, DType::F64, F64);
impl_element!(i8, DType::I8, I8);
impl_element!(i16, DType::I16, I16);
impl_element!(i32, DType::I32, I32);
impl_element!(i64, DType::I64, I64);
impl_element!(u8, DType::U8, U8);
impl_element!(u16, DType::U16, U16);
impl_element!(u32, DType::U32, U32);
impl_element!(u64, DType::U64, U64);

impl private::Sealed for bool {}

impl Element for bool {
    const DTYPE: DType = DType::Bool;

    fn wrap(data: Vec<Self>) -> ArrayData {
        ArrayData::Bool(data)
    }

    fn write_le(&self, out: &mut Vec<u8>) {
        out.push(*self as u8);
    }

    fn read_le(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }
}

/// Flat element storage for a [`TypedArray`], one variant per dtype.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayData {
    F32(Vec<f32>),
    F64(Vec<f64>),
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    U64(Vec<u64>),
    Bool(Vec<bool>),
}

macro_rules! with_data {
    ($self:expr, $v:ident => $body:expr) => {
        match $self {
            ArrayData::F32($v) => $body,
            ArrayData::F64($v) => $body,
            ArrayData::I8($v) => $body,
            ArrayData::I16($v) => $body,
            ArrayData::I32($v) => $body,
            ArrayData::I64($v) => $body,
            ArrayData::U8($v) => $body,
            ArrayData::U16($v) => $body,
            ArrayData::U32($v) => $body,
            ArrayData::U64($v) => $body,
            ArrayData::Bool($v) => $body,
        }
    };
}

fn encode_le<T: Element>(values: &[T]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * T::DTYPE.size_bytes());
    for value in values {
        value.write_le(&mut out);
    }
    out
}

fn decode_le<T: Element>(bytes: &[u8]) -> Result<ArrayData, NDArrayError> {
    let size = T::DTYPE.size_bytes();
    if bytes.len() % size != 0 {
        return Err(NDArrayError::BufferLength {
            len: bytes.len(),
            dtype: T::DTYPE,
        });
    }
    Ok(T::wrap(bytes.chunks_exact(size).map(T::read_le).collect()))
}

impl ArrayData {
    pub fn dtype(&self) -> DType {
        match self {
            ArrayData::F32(_) => DType::F32,
            ArrayData::F64(_) => DType::F64,
            ArrayData::I8(_) => DType::I8,
            ArrayData::I16(_) => DType::I16,
            ArrayData::I32(_) => DType::I32,
            ArrayData::I64(_) => DType::I64,
            ArrayData::U8(_) => DType::U8,
            ArrayData::U16(_) => DType::U16,
            ArrayData::U32(_) => DType::U32,
            ArrayData::U64(_) => DType::U64,
            ArrayData::Bool(_) => DType::Bool,
        }
    }

    pub fn len(&self) -> usize {
        with_data!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Encode all elements as little-endian bytes.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        with_data!(self, v => encode_le(v))
    }

    /// Decode a little-endian byte buffer into typed storage.
    pub fn from_le_bytes(dtype: DType, bytes: &[u8]) -> Result<Self, NDArrayError> {
        match dtype {
            DType::F32 => decode_le::<f32>(bytes),
            DType::F64 => decode_le::<f64>(bytes),
            DType::I8 => decode_le::<i8>(bytes),
            DType::I16 => decode_le::<i16>(bytes),
            DType::I32 => decode_le::<i32>(bytes),
            DType::I64 => decode_le::<i64>(bytes),
            DType::U8 => decode_le::<u8>(bytes),
            DType::U16 => decode_le::<u16>(bytes),
            DType::U32 => decode_le::<u32>(bytes),
            DType::U64 => decode_le::<u64>(bytes),
            DType::Bool => decode_le::<bool>(bytes),
        }
    }
}

/// Flat typed storage with an explicit shape.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedArray {
    shape: Vec<usize>,
    data: ArrayData,
}

impl TypedArray {
    /// Create a typed array, validating element count against the shape.
    pub fn new(shape: Vec<usize>, data: ArrayData) -> Result<Self, NDArrayError> {
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(NDArrayError::ShapeMismatch {
                shape,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn dtype(&self) -> DType {
        self.data.dtype()
    }

    pub fn data(&self) -> &ArrayData {
        &self.data
    }
}

/// Serialized-buffer representation: shape, dtype tag, little-endian bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct SerializedArray {
    shape: Vec<usize>,
    dtype: DType,
    data: Vec<u8>,
}

impl SerializedArray {
    /// Create a serialized array, validating buffer length against shape and dtype.
    pub fn new(shape: Vec<usize>, dtype: DType, data: Vec<u8>) -> Result<Self, NDArrayError> {
        let expected: usize = shape.iter().product::<usize>() * dtype.size_bytes();
        if data.len() != expected {
            return Err(NDArrayError::BufferLength {
                len: data.len(),
                dtype,
            });
        }
        Ok(Self { shape, dtype, data })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// An n-dimensional array value wrapping exactly one representation.
#[derive(Debug, Clone)]
pub enum NDArray {
    Typed(TypedArray),
    Buffer(SerializedArray),
}

impl NDArray {
    pub fn shape(&self) -> &[usize] {
        match self {
            NDArray::Typed(t) => t.shape(),
            NDArray::Buffer(b) => b.shape(),
        }
    }

    pub fn dtype(&self) -> DType {
        match self {
            NDArray::Typed(t) => t.dtype(),
            NDArray::Buffer(b) => b.dtype(),
        }
    }

    pub fn rank(&self) -> usize {
        self.shape().len()
    }

    pub fn element_count(&self) -> usize {
        self.shape().iter().product()
    }

    /// Canonical serialized form (little-endian buffer).
    ///
    /// Never mutates the source; a `Buffer` representation is cloned.
    pub fn to_serialized(&self) -> SerializedArray {
        match self {
            NDArray::Buffer(b) => b.clone(),
            NDArray::Typed(t) => SerializedArray {
                shape: t.shape.clone(),
                dtype: t.dtype(),
                data: t.data.to_le_bytes(),
            },
        }
    }

    /// Build a rank-1 array from a flat vector.
    pub fn from_vec<T: Element>(values: Vec<T>) -> Self {
        let shape = vec![values.len()];
        NDArray::Typed(TypedArray {
            shape,
            data: T::wrap(values),
        })
    }

    /// Build a rank-2 array from nested vectors; ragged input is an error.
    pub fn from_nested2<T: Element>(rows: Vec<Vec<T>>) -> Result<Self, NDArrayError> {
        let cols = rows.first().map(Vec::len).unwrap_or(0);
        let mut flat = Vec::with_capacity(rows.len() * cols);
        for (row, values) in rows.iter().enumerate() {
            if values.len() != cols {
                return Err(NDArrayError::Ragged {
                    row,
                    expected: cols,
                    actual: values.len(),
                });
            }
            flat.extend_from_slice(values);
        }
        Ok(NDArray::Typed(TypedArray {
            shape: vec![rows.len(), cols],
            data: T::wrap(flat),
        }))
    }

    /// Build a rank-3 array from nested vectors; ragged input is an error.
    pub fn from_nested3<T: Element>(blocks: Vec<Vec<Vec<T>>>) -> Result<Self, NDArrayError> {
        let dim1 = blocks.first().map(Vec::len).unwrap_or(0);
        let dim2 = blocks
            .first()
            .and_then(|b| b.first())
            .map(Vec::len)
            .unwrap_or(0);
        let mut flat = Vec::with_capacity(blocks.len() * dim1 * dim2);
        for (i, block) in blocks.iter().enumerate() {
            if block.len() != dim1 {
                return Err(NDArrayError::Ragged {
                    row: i,
                    expected: dim1,
                    actual: block.len(),
                });
            }
            for (j, values) in block.iter().enumerate() {
                if values.len() != dim2 {
                    return Err(NDArrayError::Ragged {
                        row: i * dim1 + j,
                        expected: dim2,
                        actual: values.len(),
                    });
                }
                flat.extend_from_slice(values);
            }
        }
        Ok(NDArray::Typed(TypedArray {
            shape: vec![blocks.len(), dim1, dim2],
            data: T::wrap(flat),
        }))
    }

    /// Build an array of arbitrary rank from a shape and flat storage.
    pub fn from_shape_vec<T: Element>(
        shape: Vec<usize>,
        values: Vec<T>,
    ) -> Result<Self, NDArrayError> {
        Ok(NDArray::Typed(TypedArray::new(shape, T::wrap(values))?))
    }
}

impl From<TypedArray> for NDArray {
    fn from(value: TypedArray) -> Self {
        NDArray::Typed(value)
    }
}

impl From<SerializedArray> for NDArray {
    fn from(value: SerializedArray) -> Self {
        NDArray::Buffer(value)
    }
}

/// Content equality: two arrays are equal when their shape, dtype, and
/// canonical little-endian bytes agree, regardless of representation.
impl PartialEq for NDArray {
    fn eq(&self, other: &Self) -> bool {
        self.shape() == other.shape()
            && self.dtype() == other.dtype()
            && self.to_serialized().data() == other.to_serialized().data()
    }
}
