//! Reader-based decoder implementation.
//!
//! _Requires Cargo feature `std`._

use std::{io::Read, vec::Vec};

use crate::{
    error::Error,
    message::Message,
    registry::Registry,
    sans::header::{EXTENDED_HEADER_SIZE, FileHeader, HEADER_SIZE},
};

use super::{CrcCheck, FromMessages, slice};

/// Decode messages from a reader of a file, publishing to a receiver.
///
/// CRCs are checked. This method is also re-exported as
/// `cassette::avec::decode_reader`.
///
/// _Requires Cargo feature `std`._
pub fn decode<O: FromMessages>(r: &mut impl Read, o: &mut O) -> Result<(), Error> {
    let registry = Registry::from_handlers(O::HANDLERS)?;
    decode_with(r, &registry, CrcCheck::Throws, |m| o.add_message(m))?;
    Ok(())
}

/// Decode messages registered with a registry from a reader of a file,
/// publishing to a callback.
///
/// Reads exactly the bytes declared by the file header and its trailing CRC.
/// Returns the file header.
///
/// _Requires Cargo feature `std`._
pub fn decode_with(
    r: &mut impl Read,
    registry: &Registry,
    crc: CrcCheck,
    f: impl FnMut(Message),
) -> Result<FileHeader, Error> {
    let mut buf = take(r, HEADER_SIZE)?;

    if buf[0] as usize == EXTENDED_HEADER_SIZE {
        buf.extend(take(r, EXTENDED_HEADER_SIZE - HEADER_SIZE)?);
    }

    let header = FileHeader::decode(&buf)?;

    // The body, followed by the file CRC.
    buf.extend(take(r, header.data_size as usize + 2)?);

    slice::decode_with(&buf, registry, crc, f)
}

/// Take an exact number of bytes from a reader.
fn take(r: &mut impl Read, n: usize) -> Result<Vec<u8>, Error> {
    let mut buf = Vec::new();
    r.take(n as u64).read_to_end(&mut buf)?;

    if buf.len() != n {
        Err(Error::TruncatedRecord {
            needed: n,
            available: buf.len(),
        })?;
    }

    Ok(buf)
}
