//! Convenience interfaces for common decoding, encoding and merging patterns.
//!
//! The decoders in this module are suited to decoding messages from files and
//! data slices, publishing to a callback or to the [`FromMessages`] trait.
//! Messages of a known shape are converted to and from Rust structs through
//! the [`Profile`] trait.
//!
//! In many cases, these traits can be derived. See the
//! [`FromMessages`](macro@FromMessages) and [`Profile`](macro@Profile) macros
//! for details.

use alloc::vec::Vec;

use crate::{
    error::Error,
    message::Message,
    registry::{Handler, Registry},
    sans::{
        check::crc,
        data::{BaseType, Resolution},
        header::FileHeader,
    },
};

pub mod encode;
pub mod merge;
#[cfg(feature = "std")]
pub mod reader;
pub mod slice;
pub mod validate;

pub use encode::Encoder;
pub use merge::Merger;
#[cfg(feature = "std")]
pub use reader::decode as decode_reader;
pub use slice::decode as decode_slice;

/// How file and header CRCs are treated while decoding or merging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CrcCheck {
    /// Fail on a mismatch.
    #[default]
    Throws,
    /// Accept a mismatch.
    Ignore,
}

/// Which file-category rules an encoder enforces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Validity {
    /// No checks.
    #[default]
    None,
    /// Require the messages each file type needs.
    ByFileType,
    /// As [`Validity::ByFileType`], with the additional requirements for
    /// activity uploads to vendor platforms.
    VendorConnect,
}

/// How message bodies are combined when merging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Merging {
    /// Concatenate bodies in input order.
    #[default]
    Default,
}

/// Describes one field of a [`Profile`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldProfile {
    pub number: u8,
    pub name: &'static str,
    pub base_type: BaseType,
    pub resolution: Option<Resolution>,
}

/// Derive [`Profile`] for a struct representing a single message.
///
/// _Requires Cargo feature `derive`._
///
/// # Example
///
/// Name the global message number and message name with the `profile`
/// attribute. Add the `field(N, T)` attribute to an `Option<V>` struct field,
/// where `N` is the field number, `T` names a [`BaseType`] variant, and `V` is
/// a type implementing [`FieldType`](crate::sans::data::FieldType). Numeric
/// fields with a resolution take an `Option<f64>` and `scale` and `offset`
/// arguments.
///
/// ```
/// #[derive(Debug, Default, Profile)]
/// #[profile(20, "record")]
/// struct Record {
///     #[field(time)]
///     time_offset: Option<u8>,
///     #[field(253, Uint32)]
///     timestamp: Option<u32>,
///     #[field(2, Uint16, scale = 5, offset = 2500)]
///     altitude: Option<f64>,
///     #[developer]
///     developer: Vec<DeveloperValue>,
/// }
/// ```
#[cfg(feature = "derive")]
pub use cassette_derive::Profile;

/// Convert between a [`Message`] and a Rust struct.
///
/// See the [`Profile`](macro@Profile) derive macro for an automatic
/// implementation of this trait.
pub trait Profile: Sized {
    /// Global message number.
    const NUMBER: u16;
    /// Message name.
    const NAME: &'static str;
    /// Fields known to this message.
    const FIELDS: &'static [FieldProfile];
    /// Handler registering this message with a decoder.
    const HANDLER: Handler = Handler::new(Self::NUMBER, Self::NAME);

    /// Read the fields of a message. Missing or unconvertible fields are left
    /// empty.
    fn from_message(message: &Message) -> Self;

    /// Write populated fields to a new message.
    fn to_message(&self) -> Message;

    /// Look up a field by number.
    fn field(number: u8) -> Option<&'static FieldProfile> {
        Self::FIELDS.iter().find(|f| f.number == number)
    }
}

/// Derive [`FromMessages`] for a struct holding a collection of messages.
///
/// _Requires Cargo feature `derive`._
///
/// # Example
///
/// To collect a single message, add the `message` attribute to an `Option<T>`
/// struct field, where `T` is a type implementing [`Profile`]. Additional
/// messages of the same type will overwrite earlier ones. To collect multiple
/// occurrences of a message, apply the attribute to a `Vec<T>` instead.
///
/// ```
/// #[derive(Debug, Default, FromMessages)]
/// struct ActivityMessages {
///     #[message]
///     file_id: Option<FileId>,
///     #[message]
///     records: Vec<Record>,
/// }
/// ```
#[cfg(feature = "derive")]
pub use cassette_derive::FromMessages;

/// Receive messages decoded from a file.
///
/// See the [`FromMessages`](macro@FromMessages) derive macro for an automatic
/// implementation of this trait.
pub trait FromMessages {
    /// Handlers for the messages this receiver accepts. Messages of other
    /// numbers are skipped while decoding.
    const HANDLERS: &'static [Handler];

    /// Add a decoded message.
    fn add_message(&mut self, message: Message);
}

/// A reusable decoder, publishing messages to a callback.
///
/// Each call to a decoding method starts from fresh state, so one decoder may
/// be reused sequentially for any number of files.
#[derive(Debug, Clone)]
pub struct Decoder {
    registry: Registry,
    crc: CrcCheck,
}

impl Decoder {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            crc: CrcCheck::default(),
        }
    }

    /// Set how CRC mismatches are treated.
    pub fn with_crc(mut self, crc: CrcCheck) -> Self {
        self.crc = crc;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Decode messages from a slice of a file.
    ///
    /// Returns the file header.
    pub fn decode(&self, r: &[u8], f: impl FnMut(Message)) -> Result<FileHeader, Error> {
        slice::decode_with(r, &self.registry, self.crc, f)
    }

    /// Decode messages from a slice of a file, collecting them.
    pub fn decode_all(&self, r: &[u8]) -> Result<Vec<Message>, Error> {
        let mut messages = Vec::new();
        self.decode(r, |m| messages.push(m))?;
        Ok(messages)
    }

    /// Decode messages from a reader of a file.
    ///
    /// _Requires Cargo feature `std`._
    #[cfg(feature = "std")]
    pub fn decode_reader(
        &self,
        r: &mut impl std::io::Read,
        f: impl FnMut(Message),
    ) -> Result<FileHeader, Error> {
        reader::decode_with(r, &self.registry, self.crc, f)
    }
}

impl Default for Decoder {
    /// A decoder for every message in [`crate::profile`].
    fn default() -> Self {
        Self::new(Registry::profile())
    }
}

/// Split a file into its header, body and trailing CRC.
pub(crate) fn split(r: &[u8]) -> Result<(FileHeader, &[u8], u16), Error> {
    let header = FileHeader::decode(r)?;

    let start = header.len();
    let end = start + header.data_size as usize;

    let body = r.get(start..end).ok_or(Error::TruncatedRecord {
        needed: end,
        available: r.len(),
    })?;
    let found = r.get(end..end + 2).ok_or(Error::TruncatedRecord {
        needed: end + 2,
        available: r.len(),
    })?;

    Ok((header, body, u16::from_le_bytes([found[0], found[1]])))
}

/// Apply the header and file CRCs of a file split by [`split`].
///
/// The file CRC may cover the body alone, or the header and body.
pub(crate) fn check(
    r: &[u8],
    header: &FileHeader,
    body: &[u8],
    found: u16,
    mode: CrcCheck,
) -> Result<(), Error> {
    let result = header.check(r).map_err(Error::from).and_then(|_| {
        if !header.has_file_crc() {
            return Ok(());
        }

        let calculated = crc(body);
        let end = header.len() + body.len();
        if found == calculated || found == crc(&r[..end]) {
            Ok(())
        } else {
            Err(Error::InvalidFileCrc { found, calculated })
        }
    });

    match (result, mode) {
        (Err(err), CrcCheck::Ignore) => {
            tracing::warn!(%err, "ignoring CRC mismatch");
            Ok(())
        }
        (result, _) => result,
    }
}
