//! Errors reported by decoding, encoding and merging.

use thiserror::Error;

use crate::{
    avec::validate::ValidationError,
    sans::{DataError, EncodeError, header::HeaderError},
};

/// Errors occurring while decoding, encoding or merging files.
#[derive(Debug, Error)]
pub enum Error {
    /// Incorrect file header.
    #[error("Incorrect file header: {0}")]
    MalformedHeader(#[from] HeaderError),
    /// Calculated and found file CRC values do not match.
    #[error("Calculated ({calculated}) and found ({found}) CRC values do not match.")]
    InvalidFileCrc { found: u16, calculated: u16 },
    /// Files to merge have different protocol major versions.
    #[error("Protocol major version {found} does not match {expected}.")]
    ProtocolVersionMismatch { expected: u8, found: u8 },
    /// Two handlers were supplied for one global message number.
    #[error("Duplicate handler for message {0}.")]
    DuplicateMessageHandler(u16),
    /// A data record used a local message number with no definition.
    #[error("Local message {0} has no definition.")]
    UndefinedLocalSlot(u8),
    /// A record or the file extends past the available bytes.
    #[error("Needed {needed} bytes, {available} available.")]
    TruncatedRecord { needed: usize, available: usize },
    /// A field definition declared an unknown base type.
    #[error("Unknown base type ({0:#04x}).")]
    UnknownBaseType(u8),
    /// Records did not end exactly at the end of the body.
    #[error("Records ended at {actual} bytes, expected {expected}.")]
    BodyLengthMismatch { expected: usize, actual: usize },
    /// Messages do not satisfy the rules of the file category.
    #[error("Invalid file: {0}")]
    CategoryValidationFailed(#[from] ValidationError),
    /// A file identity message was supplied among the other messages.
    #[error("Found a second file identity message.")]
    DuplicateFileId,
    /// The body is too large for the header's data size.
    #[error("Encoded body of {0} bytes exceeds the data size limit.")]
    EncodeSizeExceeded(usize),
    /// A message has more than 255 fields.
    #[error("Too many fields ({0}).")]
    TooManyFields(usize),
    /// A field value is longer than 255 bytes.
    #[error("Field {field} is too large ({size} bytes).")]
    FieldTooLarge { field: u8, size: usize },
    /// No files were supplied to merge.
    #[error("No files to merge.")]
    NothingToMerge,
    /// An error from the supplied reader.
    #[cfg(feature = "std")]
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<DataError> for Error {
    fn from(err: DataError) -> Self {
        match err {
            DataError::UndefinedLocalSlot(local) => Self::UndefinedLocalSlot(local),
            DataError::TruncatedRecord { needed, available } => {
                Self::TruncatedRecord { needed, available }
            }
            DataError::UnknownBaseType(b) => Self::UnknownBaseType(b),
        }
    }
}

impl From<EncodeError> for Error {
    fn from(err: EncodeError) -> Self {
        match err {
            EncodeError::TooManyFields(n) => Self::TooManyFields(n),
            EncodeError::FieldTooLarge { field, size } => Self::FieldTooLarge { field, size },
        }
    }
}
