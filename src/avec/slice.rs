//! Slice-based decoder implementation.

use crate::{
    error::Error,
    message::Message,
    registry::Registry,
    sans::{header::FileHeader, state::State},
};

use super::{CrcCheck, FromMessages, check, split};

/// Decode messages from a slice of a file, publishing to a receiver.
///
/// CRCs are checked. This method is also re-exported as
/// `cassette::avec::decode_slice`.
pub fn decode<O: FromMessages>(r: &[u8], o: &mut O) -> Result<(), Error> {
    let registry = Registry::from_handlers(O::HANDLERS)?;
    decode_with(r, &registry, CrcCheck::Throws, |m| o.add_message(m))?;
    Ok(())
}

/// Decode messages registered with a registry from a slice of a file,
/// publishing to a callback.
///
/// Returns the file header.
pub fn decode_with(
    r: &[u8],
    registry: &Registry,
    crc: CrcCheck,
    f: impl FnMut(Message),
) -> Result<FileHeader, Error> {
    let (header, body, found) = split(r)?;

    // Apply the cyclic redundancy checks before continuing.
    check(r, &header, body, found, crc)?;

    decode_body(body, registry, f)?;

    Ok(header)
}

/// Decode the records of a message body, publishing to a callback.
pub fn decode_body(body: &[u8], registry: &Registry, mut f: impl FnMut(Message)) -> Result<(), Error> {
    let mut state = State::new();
    let i = &mut 0; // Offset of the next record in the body.

    while *i < body.len() {
        if let Some(message) = state.advance(body, i, registry)? {
            f(message);
        }
    }

    if *i != body.len() {
        Err(Error::BodyLengthMismatch {
            expected: body.len(),
            actual: *i,
        })?;
    }

    Ok(())
}
