use alloc::format;
use alloc::string::String;
use burn_tensor::DType;
use core::fmt;

/// Type of the elements stored in a distributed array.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ElementType {
    /// A scalar type known to the substrate.
    Scalar(DType),
    /// A structured record; only its size is known.
    Derived {
        /// Size of one record in bytes.
        size: usize,
    },
}

impl ElementType {
    /// Size of one element in bytes.
    pub fn size(&self) -> usize {
        match self {
            ElementType::Scalar(dtype) => dtype.size(),
            ElementType::Derived { size } => *size,
        }
    }

    /// Whether the substrate can move the type without a custom layout.
    ///
    /// Quantized floats carry a quantization scheme next to their payload and are treated like
    /// structured types.
    pub fn is_predefined(&self) -> bool {
        match self {
            ElementType::Scalar(dtype) => !matches!(dtype, DType::QFloat(_)),
            ElementType::Derived { .. } => false,
        }
    }

    pub(crate) fn describe(&self) -> String {
        format!("{self}")
    }
}

impl From<DType> for ElementType {
    fn from(dtype: DType) -> Self {
        ElementType::Scalar(dtype)
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementType::Scalar(dtype) => write!(f, "{dtype:?}"),
            ElementType::Derived { size } => write!(f, "derived({size} bytes)"),
        }
    }
}
