//! Definition records and the field schemas they declare.

use alloc::vec::Vec;

use zerocopy::{FromBytes, Immutable, IntoBytes};

use super::{DataError, EncodeError, data::BaseType, header::RecordHeader, take};

/// Declares one standard field of a data record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDefinition {
    /// Field number, unique within a message.
    pub number: u8,
    /// Size of the field in bytes, a multiple of the base type size for arrays.
    pub size: u8,
    pub base_type: BaseType,
}

impl FieldDefinition {
    pub fn new(number: u8, size: u8, base_type: BaseType) -> Self {
        Self {
            number,
            size,
            base_type,
        }
    }
}

/// Declares one developer field of a data record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeveloperFieldDefinition {
    /// Field number, matched against a field description.
    pub number: u8,
    /// Size of the field in bytes.
    pub size: u8,
    /// Developer data index, matched against a field description.
    pub developer_data_index: u8,
}

#[repr(C, packed)]
#[derive(Debug, FromBytes, IntoBytes, Immutable)]
struct DefinitionMessage {
    _reserved: u8,
    architecture: u8,
    global_message: [u8; 2],
    fields: u8,
}

#[repr(C, packed)]
#[derive(Debug, FromBytes, IntoBytes, Immutable)]
struct FieldHeader {
    field: u8,
    size: u8,
    kind: u8,
}

/// The schema bound to a local message number by a definition record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    /// Global message number.
    pub global: u16,
    /// Byte order of multi-byte fields in matching data records.
    pub is_little_endian: bool,
    pub fields: Vec<FieldDefinition>,
    pub developer_fields: Vec<DeveloperFieldDefinition>,
}

impl Definition {
    /// Decode the body of a definition record from an offset in a slice,
    /// advancing the offset.
    pub fn decode(r: &[u8], i: &mut usize, is_developer: bool) -> Result<Self, DataError> {
        let DefinitionMessage {
            architecture,
            global_message,
            fields,
            ..
        } = zerocopy::transmute!(take::<5>(r, i)?);

        let is_little_endian = architecture == 0;
        let global = if is_little_endian {
            u16::from_le_bytes(global_message)
        } else {
            u16::from_be_bytes(global_message)
        };

        let fields = (0..fields)
            .map(|_| {
                let FieldHeader { field, size, kind } = zerocopy::transmute!(take::<3>(r, i)?);
                let base_type = BaseType::from_byte(kind).ok_or(DataError::UnknownBaseType(kind))?;
                Ok(FieldDefinition::new(field, size, base_type))
            })
            .collect::<Result<Vec<_>, DataError>>()?;

        let developer_fields = if is_developer {
            let [count] = take::<1>(r, i)?;
            (0..count)
                .map(|_| {
                    let FieldHeader { field, size, kind } = zerocopy::transmute!(take::<3>(r, i)?);
                    Ok(DeveloperFieldDefinition {
                        number: field,
                        size,
                        developer_data_index: kind,
                    })
                })
                .collect::<Result<Vec<_>, DataError>>()?
        } else {
            Vec::new()
        };

        Ok(Self {
            global,
            is_little_endian,
            fields,
            developer_fields,
        })
    }

    /// Total size of the standard fields of a matching data record.
    pub fn data_size(&self) -> usize {
        self.fields.iter().map(|f| f.size as usize).sum()
    }

    /// Total size of the developer fields of a matching data record.
    pub fn developer_data_size(&self) -> usize {
        self.developer_fields.iter().map(|f| f.size as usize).sum()
    }

    /// Encode a complete definition record for a local message number,
    /// including its record header.
    ///
    /// Records are always written little-endian.
    pub fn encode(&self, local: u8, w: &mut Vec<u8>) -> Result<(), EncodeError> {
        let count = |n: usize| u8::try_from(n).map_err(|_| EncodeError::TooManyFields(n));
        let fields = count(self.fields.len())?;
        let developer_fields = count(self.developer_fields.len())?;

        let is_developer = !self.developer_fields.is_empty();
        w.push(RecordHeader::definition(local, is_developer));

        let message = DefinitionMessage {
            _reserved: 0,
            architecture: 0,
            global_message: self.global.to_le_bytes(),
            fields,
        };
        w.extend_from_slice(message.as_bytes());

        for field in &self.fields {
            let header = FieldHeader {
                field: field.number,
                size: field.size,
                kind: field.base_type.to_byte(),
            };
            w.extend_from_slice(header.as_bytes());
        }

        if is_developer {
            w.push(developer_fields);

            for field in &self.developer_fields {
                let header = FieldHeader {
                    field: field.number,
                    size: field.size,
                    kind: field.developer_data_index,
                };
                w.extend_from_slice(header.as_bytes());
            }
        }

        Ok(())
    }
}
