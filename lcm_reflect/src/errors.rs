use lcm_types::PrimitiveType;
use thiserror::Error;

pub type EncodeResult<T> = Result<T, EncodeError>;
pub type DecodeResult<T> = Result<T, DecodeError>;

/// A value does not have the shape its struct plan describes.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ShapeError {
    #[error("'{path}' should be {expected} but is {found}")]
    TypeMismatch {
        path: String,
        expected: String,
        found: String,
    },

    #[error("struct '{type_name}' value has no member '{member}'")]
    MissingMember { type_name: String, member: String },

    #[error("expected a '{expected}' value, found '{found}'")]
    WrongStruct { expected: String, found: String },

    #[error("struct '{type_name}' is not part of the codec plan")]
    UnknownStruct { type_name: String },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EncodeError {
    /// Two arrays sharing a size member report different lengths.
    #[error(
        "'{type_name}.{array}' has length {actual} but '{size_member}' is {expected} \
         (taken from '{authoritative}')"
    )]
    DerivedSizeMismatch {
        type_name: String,
        size_member: String,
        authoritative: String,
        array: String,
        expected: usize,
        actual: usize,
    },

    #[error("length {length} of '{type_name}.{size_member}' does not fit {primitive}")]
    LengthOverflow {
        type_name: String,
        size_member: String,
        primitive: PrimitiveType,
        length: usize,
    },

    #[error("'{path}' must hold exactly {expected} elements, found {actual}")]
    ArrayLengthMismatch {
        path: String,
        expected: usize,
        actual: usize,
    },

    #[error("string '{path}' of {length} bytes does not fit a u32 length prefix")]
    StringTooLong { path: String, length: usize },

    #[error(transparent)]
    Shape(#[from] ShapeError),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("buffer too short: need {needed} bytes, have {available}")]
    TooShort { needed: usize, available: usize },

    #[error("fingerprint mismatch: expected {expected:#018x}, got {actual:#018x}")]
    FingerprintMismatch { expected: u64, actual: u64 },

    #[error("string '{path}' has invalid length prefix {length}")]
    InvalidStringLength { path: String, length: u32 },

    #[error("size member '{type_name}.{size_member}' decoded as negative value {value}")]
    NegativeLength {
        type_name: String,
        size_member: String,
        value: i64,
    },

    #[error("string '{path}' is not valid UTF-8")]
    InvalidUtf8 { path: String },

    #[error("string '{path}' does not end with a NUL terminator")]
    MissingTerminator { path: String },

    /// A count of zero-width elements larger than the bytes left to decode.
    #[error("'{path}' claims {count} empty elements with only {remaining} bytes left")]
    ImplausibleCount {
        path: String,
        count: usize,
        remaining: usize,
    },

    #[error("payload is {actual} bytes but the decoded value encodes to {expected}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("struct '{type_name}' is not part of the codec plan")]
    UnknownType { type_name: String },

    /// Sizing the decoded value failed.
    #[error("decoded value cannot be sized: {0}")]
    Size(#[from] EncodeError),
}
