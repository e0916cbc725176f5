//! File envelope and record headers.

use alloc::vec::Vec;

use either::Either::{self, Left, Right};
use tartan_bitfield::bitfield;
use thiserror::Error;
use zerocopy::{
    FromBytes, Immutable, IntoBytes,
    little_endian::{U16, U32},
};

use super::check::crc;

/// Length of a header without a CRC.
pub const HEADER_SIZE: usize = 12;
/// Length of a header ending in a CRC of its first twelve bytes.
pub const EXTENDED_HEADER_SIZE: usize = 14;
/// Format tag following the data size.
pub const DATA_TYPE: [u8; 4] = *b".FIT";

/// An error decoding a file header.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HeaderError {
    /// Incorrect format tag.
    #[error("Incorrect file type marker.")]
    NotFitData,
    /// Unknown header length.
    #[error("Unknown header length ({0}).")]
    UnknownHeaderLength(u8),
    /// Fewer bytes than the header declares.
    #[error("Header truncated ({0} bytes available).")]
    Truncated(usize),
    /// Calculated and found header CRC values do not match.
    #[error("Calculated ({calculated}) and found ({found}) header CRC values do not match.")]
    HeaderCrc { found: u16, calculated: u16 },
}

#[repr(C, packed)]
#[derive(FromBytes, IntoBytes, Immutable)]
struct RawFileHeader {
    header_size: u8,
    protocol_version: u8,
    profile_version: U16,
    data_size: U32,
    data_type: [u8; 4],
}

/// The fixed-layout header starting every file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    /// Either 12 or 14.
    pub header_size: u8,
    /// Major version in the upper nibble, minor in the lower.
    pub protocol_version: u8,
    /// Profile version multiplied by 100.
    pub profile_version: u16,
    /// Length of the message body following the header.
    pub data_size: u32,
    /// CRC of the first twelve header bytes, for extended headers.
    pub crc: Option<u16>,
}

impl FileHeader {
    /// Build an extended header for a body of `data_size` bytes.
    pub fn new(protocol_version: u8, profile_version: u16, data_size: u32) -> Self {
        Self {
            header_size: EXTENDED_HEADER_SIZE as u8,
            protocol_version,
            profile_version,
            data_size,
            crc: None,
        }
    }

    /// Decode the header at the start of a file.
    pub fn decode(r: &[u8]) -> Result<Self, HeaderError> {
        let fixed: [u8; HEADER_SIZE] = r
            .get(..HEADER_SIZE)
            .ok_or(HeaderError::Truncated(r.len()))?
            .try_into()
            .map_err(|_| HeaderError::Truncated(r.len()))?;

        let RawFileHeader {
            header_size,
            protocol_version,
            profile_version,
            data_size,
            data_type,
        } = zerocopy::transmute!(fixed);

        if data_type != DATA_TYPE {
            Err(HeaderError::NotFitData)?;
        }

        let crc = match header_size as usize {
            HEADER_SIZE => None,
            EXTENDED_HEADER_SIZE => {
                let bytes = r
                    .get(HEADER_SIZE..EXTENDED_HEADER_SIZE)
                    .ok_or(HeaderError::Truncated(r.len()))?;
                Some(u16::from_le_bytes([bytes[0], bytes[1]]))
            }
            _ => Err(HeaderError::UnknownHeaderLength(header_size))?,
        };

        Ok(Self {
            header_size,
            protocol_version,
            profile_version: profile_version.get(),
            data_size: data_size.get(),
            crc,
        })
    }

    /// Check the header CRC against the first twelve bytes of `r`.
    ///
    /// A missing or zero header CRC is not checked.
    pub fn check(&self, r: &[u8]) -> Result<(), HeaderError> {
        match self.crc {
            Some(found) if found != 0 => {
                let calculated = crc(&r[..HEADER_SIZE.min(r.len())]);
                if found != calculated {
                    Err(HeaderError::HeaderCrc { found, calculated })?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Length of the header in bytes.
    pub fn len(&self) -> usize {
        self.header_size as usize
    }

    /// The protocol major version.
    pub fn major_version(&self) -> u8 {
        self.protocol_version >> 4
    }

    /// The protocol minor version.
    pub fn minor_version(&self) -> u8 {
        self.protocol_version & 0x0F
    }

    /// Whether files of this protocol version carry a checked file CRC.
    ///
    /// The protocol byte packs the major version in its high nibble, so
    /// version 2.0 is `0x20`. Bytes `0x14` to `0x1F` are major version 1 and
    /// are not checked, even though they are at least 20 in decimal.
    pub fn has_file_crc(&self) -> bool {
        self.protocol_version >= 0x20
    }

    /// Encode the header, computing the header CRC for extended headers.
    pub fn encode(&self) -> Vec<u8> {
        let raw = RawFileHeader {
            header_size: self.header_size,
            protocol_version: self.protocol_version,
            profile_version: U16::new(self.profile_version),
            data_size: U32::new(self.data_size),
            data_type: DATA_TYPE,
        };

        let mut w = raw.as_bytes().to_vec();

        if self.len() == EXTENDED_HEADER_SIZE {
            let crc = crc(&w);
            w.extend_from_slice(&crc.to_le_bytes());
        }

        w
    }
}

bitfield! {
    struct HeaderByte(u8) {
        [7] is_compressed,
    }
}

bitfield! {
    struct NormalHeader(u8) {
        [0..4] local_message: u8,
        [5] is_developer,
        [6] is_definition,
    }
}

bitfield! {
    struct CompressedHeader(u8) {
        [0..5] time_offset: u8,
        [5..7] local_message: u8,
        [7] is_compressed,
    }
}

/// A header introducing a definition record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefinitionHeader {
    /// Whether developer field definitions follow the standard ones.
    pub is_developer: bool,
}

/// A header introducing a data record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataHeader {
    /// Time offset from a compressed timestamp header.
    pub time_offset: Option<u8>,
}

/// The single byte starting every record.
#[derive(Debug)]
pub struct RecordHeader;

impl RecordHeader {
    /// Decode a record header.
    ///
    /// Returns the local message number, and the kind of record that follows.
    pub fn decode(r: u8) -> (u8, Either<DefinitionHeader, DataHeader>) {
        if HeaderByte(r).is_compressed() {
            let header = CompressedHeader(r);

            let data = DataHeader {
                time_offset: Some(header.time_offset()),
            };

            (header.local_message(), Right(data))
        } else {
            let header = NormalHeader(r);

            let successor = if header.is_definition() {
                Left(DefinitionHeader {
                    is_developer: header.is_developer(),
                })
            } else {
                Right(DataHeader { time_offset: None })
            };

            (header.local_message(), successor)
        }
    }

    /// Encode the header of a definition record.
    pub fn definition(local: u8, is_developer: bool) -> u8 {
        let mut header = NormalHeader(0);
        header.set_local_message(local);
        header.set_is_developer(is_developer);
        header.set_is_definition(true);
        header.0
    }

    /// Encode the header of a data record.
    pub fn data(local: u8) -> u8 {
        let mut header = NormalHeader(0);
        header.set_local_message(local);
        header.0
    }

    /// Encode a compressed timestamp header of a data record.
    pub fn compressed(local: u8, time_offset: u8) -> u8 {
        let mut header = CompressedHeader(0);
        header.set_time_offset(time_offset);
        header.set_local_message(local);
        header.set_is_compressed(true);
        header.0
    }
}
