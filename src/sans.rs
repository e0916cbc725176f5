//! Internal sans-IO core for implementing decoders and encoders.
//!
//! This module is intended for advanced applications that need fine control
//! over codec internals. See [`crate::avec`] for implementations covering
//! common decoding and encoding patterns.
//!
//! # Architecture
//!
//! A file is a header, a body of records, and a trailing CRC. Each record
//! starts with a one-byte [`header::RecordHeader`]. Definition records bind a
//! [`definition::Definition`] to one of sixteen local message numbers; data
//! records carry values laid out as declared by the definition currently
//! bound to their local message number.
//!
//! All mutable decoding state (the definitions bound to each local message
//! number, and the developer field descriptions seen so far) lives in a
//! [`state::State`], advanced one record at a time. Some areas of decoding are
//! not represented here and must be carefully written by callers:
//!
//! - Slicing the body using the data size declared by the file header, and
//! ending decoding once exactly that many bytes have been consumed.
//!
//! - Applying cyclic redundancy checks. A helper function is provided in the
//! [`check`] module.
//!
//! Implementers are recommended to begin by studying and modifying a decoder
//! from the [`crate::avec`] module.

use thiserror::Error;

pub mod check;
pub mod data;
pub mod definition;
pub mod header;
pub mod state;

/// An error decoding a record.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DataError {
    /// A data record used a local message number with no definition.
    #[error("Local message {0} has no definition.")]
    UndefinedLocalSlot(u8),
    /// A record extends past the end of the body.
    #[error("Record needs {needed} bytes, {available} available.")]
    TruncatedRecord { needed: usize, available: usize },
    /// A field definition declared an unknown base type.
    #[error("Unknown base type ({0:#04x}).")]
    UnknownBaseType(u8),
}

/// An error encoding a record.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodeError {
    /// More than 255 fields of one kind.
    #[error("Too many fields ({0}).")]
    TooManyFields(usize),
    /// A field value longer than 255 bytes.
    #[error("Field {field} is too large ({size} bytes).")]
    FieldTooLarge { field: u8, size: usize },
}

/// Take an exact number of bytes from an offset in a slice, advancing the
/// offset.
pub(crate) fn take<const N: usize>(r: &[u8], i: &mut usize) -> Result<[u8; N], DataError> {
    let mut buf = [0; N];
    buf.copy_from_slice(take_slice(r, i, N)?);
    Ok(buf)
}

/// Take a number of bytes from an offset in a slice, advancing the offset.
pub(crate) fn take_slice<'a>(r: &'a [u8], i: &mut usize, n: usize) -> Result<&'a [u8], DataError> {
    let s = *i;
    let bytes = r
        .get(s..s + n)
        .ok_or(DataError::TruncatedRecord {
            needed: n,
            available: r.len().saturating_sub(s),
        })?;
    *i += n;
    Ok(bytes)
}
