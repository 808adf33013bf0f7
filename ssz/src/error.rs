use thiserror::Error;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Error)]
pub enum ReadError {
    #[error("attempted to decode boolean from invalid byte: {byte:#04x}")]
    BooleanInvalid { byte: u8 },
    #[error("SSZ bytes have wrong length (expected: {expected}, actual: {actual})")]
    WrongSize { expected: usize, actual: usize },
    #[error("SSZ bytes are too short (minimum: {minimum}, actual: {actual})")]
    TooShort { minimum: usize, actual: usize },
    #[error("SSZ byte length {length} is not a multiple of element size {element_size}")]
    LengthNotMultiple { length: usize, element_size: usize },
    #[error("offset is invalid (offset: {offset}, previous: {previous}, length: {length})")]
    OffsetInvalid {
        offset: usize,
        previous: usize,
        length: usize,
    },
    #[error("collection has too many elements (maximum: {maximum}, actual: {actual})")]
    TooLong { maximum: usize, actual: usize },
    #[error("collection has wrong number of elements (expected: {expected}, actual: {actual})")]
    ElementCountMismatch { expected: usize, actual: usize },
    #[error("bitlist is missing its delimiter bit")]
    BitlistDelimiterMissing,
    #[error("padding bits past the end of a bitvector are not zero")]
    BitVectorPaddingNotZero,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Error)]
pub enum WriteError {
    #[error("SSZ offset does not fit in {BYTES_PER_LENGTH_OFFSET} bytes: {offset}")]
    OffsetOverflow { offset: usize },
}

use crate::size::BYTES_PER_LENGTH_OFFSET;

/// Failure to access an element of a tree-backed collection.
///
/// These indicate a bug in the caller rather than bad input and
/// should not be caught and recovered from.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Error)]
pub enum IndexError {
    #[error("index {index} is out of bounds for a collection of length {length}")]
    OutOfBounds { index: u64, length: u64 },
    #[error("tree shape does not match the requested path")]
    ShapeMismatch,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Error)]
pub enum PushError {
    #[error("collection is at its maximum length of {maximum}")]
    Full { maximum: u64 },
}
