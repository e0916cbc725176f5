//! Decoding state carried from record to record.

use alloc::vec::Vec;

use either::Either::{Left, Right};

use super::{
    DataError,
    data::BaseType,
    definition::Definition,
    header::{DataHeader, DefinitionHeader, RecordHeader},
    take, take_slice,
};
use crate::{
    avec::Profile,
    message::{Message, resolve_developer},
    profile::FieldDescription,
    registry::Registry,
};

/// Number of local message numbers.
pub const LOCAL_MESSAGES: usize = 16;

/// Field number of the timestamp common to all messages.
pub const TIMESTAMP: u8 = 253;

/// Mutable state of one decoding pass.
///
/// Holds the definition bound to each local message number, the developer
/// field descriptions seen so far, and the last full timestamp, used to expand
/// compressed timestamp headers.
#[derive(Debug, Clone, Default)]
pub struct State {
    definitions: [Option<Definition>; LOCAL_MESSAGES],
    catalogue: Vec<FieldDescription>,
    last_timestamp: Option<u32>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    /// The definition bound to a local message number.
    pub fn definition(&self, local: u8) -> Option<&Definition> {
        self.definitions.get(local as usize)?.as_ref()
    }

    /// Field descriptions seen so far, in stream order.
    pub fn catalogue(&self) -> &[FieldDescription] {
        &self.catalogue
    }

    /// Advance over the record starting at an offset in a body, advancing the
    /// offset.
    ///
    /// Returns a message if the record was a data record for a message with a
    /// registered handler. Field descriptions are added to the catalogue
    /// instead of being returned.
    pub fn advance(
        &mut self,
        r: &[u8],
        i: &mut usize,
        registry: &Registry,
    ) -> Result<Option<Message>, DataError> {
        let [byte] = take::<1>(r, i)?;

        match RecordHeader::decode(byte) {
            (local, Left(header)) => {
                self.advance_definition(local, header, r, i)?;
                Ok(None)
            }
            (local, Right(header)) => self.advance_data(local, header, r, i, registry),
        }
    }

    fn advance_definition(
        &mut self,
        local: u8,
        DefinitionHeader { is_developer }: DefinitionHeader,
        r: &[u8],
        i: &mut usize,
    ) -> Result<(), DataError> {
        let definition = Definition::decode(r, i, is_developer)?;
        let global = definition.global;

        let previous = self.definitions[local as usize].replace(definition);
        if let Some(previous) = previous {
            tracing::debug!(local, previous = previous.global, global, "replaced definition");
        }

        Ok(())
    }

    fn advance_data(
        &mut self,
        local: u8,
        DataHeader { time_offset }: DataHeader,
        r: &[u8],
        i: &mut usize,
        registry: &Registry,
    ) -> Result<Option<Message>, DataError> {
        let definition = self.definitions[local as usize]
            .as_ref()
            .ok_or(DataError::UndefinedLocalSlot(local))?;

        let data = take_slice(r, i, definition.data_size())?;
        let developer = take_slice(r, i, definition.developer_data_size())?;
        let global = definition.global;

        tracing::trace!(local, global, size = data.len() + developer.len(), "data record");

        let timestamp = match (time_offset, self.last_timestamp) {
            (Some(offset), Some(last)) => {
                let delta = (offset as u32).wrapping_sub(last) & 0x1F;
                Some(last.wrapping_add(delta))
            }
            (Some(_), None) => None,
            (None, _) => find_timestamp(data, definition),
        };
        if timestamp.is_some() {
            self.last_timestamp = timestamp;
        }

        if global == FieldDescription::NUMBER {
            let message = Message::decode(global, data, definition)?;
            let description = FieldDescription::from_message(&message);
            tracing::debug!(
                developer_data_index = description.developer_data_index,
                field = description.field_definition_number,
                "added field description"
            );
            self.catalogue.push(description);
            return Ok(None);
        }

        let Some(handler) = registry.get(global) else {
            tracing::debug!(global, "skipped unregistered message");
            return Ok(None);
        };

        let mut message = (handler.decode)(global, data, definition)?;

        if let Some(offset) = time_offset {
            message.set_time_offset(Some(offset));
            if !message.contains(TIMESTAMP) {
                message.set(TIMESTAMP, BaseType::Uint32, timestamp);
            }
        }

        if !definition.developer_fields.is_empty() {
            let values = resolve_developer(definition, developer, &self.catalogue)?;
            message.set_developer(values);
        }

        Ok(Some(message))
    }
}

/// Read the timestamp field of a data record without decoding other fields.
fn find_timestamp(r: &[u8], definition: &Definition) -> Option<u32> {
    let mut offset = 0;

    for field in &definition.fields {
        let size = field.size as usize;
        if field.number == TIMESTAMP && size == 4 {
            let mut bytes: [u8; 4] = r.get(offset..offset + 4)?.try_into().ok()?;
            field.base_type.normalise(&mut bytes, definition.is_little_endian);
            return match field.base_type {
                BaseType::Uint32 if bytes != [0xFF; 4] => Some(u32::from_le_bytes(bytes)),
                _ => None,
            };
        }
        offset += size;
    }

    None
}
