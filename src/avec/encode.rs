//! Encoding messages into a complete file.

use alloc::vec::Vec;

use crate::{
    error::Error,
    message::Message,
    profile::FileId,
    sans::{check::crc, header::FileHeader},
};

use super::{Profile, Validity, validate::validate};

/// Protocol version 2.0.
pub const PROTOCOL_VERSION: u8 = 0x20;
/// Profile version 21.40.
pub const PROFILE_VERSION: u16 = 2140;

/// Assembles a file identity and the messages following it into a file.
///
/// Every message is written as a definition record for local message 0
/// followed by its data record.
#[derive(Debug, Clone, Copy)]
pub struct Encoder {
    validity: Validity,
    protocol_version: u8,
    profile_version: u16,
}

impl Encoder {
    pub fn new() -> Self {
        Self {
            validity: Validity::default(),
            protocol_version: PROTOCOL_VERSION,
            profile_version: PROFILE_VERSION,
        }
    }

    /// Set the file category rules checked before encoding.
    pub fn with_validity(mut self, validity: Validity) -> Self {
        self.validity = validity;
        self
    }

    pub fn with_protocol_version(mut self, protocol_version: u8) -> Self {
        self.protocol_version = protocol_version;
        self
    }

    pub fn with_profile_version(mut self, profile_version: u16) -> Self {
        self.profile_version = profile_version;
        self
    }

    /// Encode a file from its identity and the ordered messages following it.
    pub fn encode(&self, file_id: &FileId, messages: &[Message]) -> Result<Vec<u8>, Error> {
        validate(self.validity, file_id, messages)?;

        let mut body = Vec::new();
        file_id.to_message().encode(0, &mut body)?;
        for message in messages {
            if message.number() == FileId::NUMBER {
                Err(Error::DuplicateFileId)?;
            }
            message.encode(0, &mut body)?;
        }

        let data_size = u32::try_from(body.len()).map_err(|_| Error::EncodeSizeExceeded(body.len()))?;

        let header = FileHeader::new(self.protocol_version, self.profile_version, data_size);
        tracing::debug!(data_size, messages = messages.len() + 1, "encoded file");

        let mut w = header.encode();
        w.extend_from_slice(&body);
        w.extend_from_slice(&crc(&body).to_le_bytes());

        Ok(w)
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use alloc::vec;

    use crate::{
        avec::{CrcCheck, slice, validate::ValidationError},
        profile::{File, Record},
        registry::Registry,
        sans::header::EXTENDED_HEADER_SIZE,
    };

    #[test]
    fn envelope() {
        let file_id = FileId::default().with_file(File::Course);
        let w = Encoder::new().encode(&file_id, &[]).unwrap();

        let header = FileHeader::decode(&w).unwrap();
        assert_eq!(header.len(), EXTENDED_HEADER_SIZE);
        assert_eq!(header.protocol_version, PROTOCOL_VERSION);
        assert_eq!(header.profile_version, PROFILE_VERSION);
        assert_eq!(w.len(), EXTENDED_HEADER_SIZE + header.data_size as usize + 2);

        let body = &w[EXTENDED_HEADER_SIZE..w.len() - 2];
        assert_eq!(w[w.len() - 2..], crc(body).to_le_bytes());
    }

    #[test]
    fn identity_comes_first() {
        let record = Record {
            heart_rate: Some(140),
            ..Default::default()
        };
        let file_id = FileId::default().with_file(File::Activity);
        let w = Encoder::new().encode(&file_id, &[record.to_message()]).unwrap();

        let mut numbers = vec![];
        slice::decode_with(&w, &Registry::profile(), CrcCheck::Throws, |m| numbers.push(m.number())).unwrap();
        assert_eq!(numbers, [0, 20]);
    }

    #[test]
    fn second_identity_is_rejected() {
        let file_id = FileId::default();
        let result = Encoder::new().encode(&file_id, &[file_id.to_message()]);
        assert!(matches!(result, Err(Error::DuplicateFileId)));
    }

    #[test]
    fn validation_precedes_identity_check() {
        let file_id = FileId::default().with_file(File::Goals);
        let result = Encoder::new()
            .with_validity(Validity::ByFileType)
            .encode(&file_id, &[file_id.to_message()]);
        assert!(matches!(result, Err(Error::CategoryValidationFailed(_))));

        let result = Encoder::new().encode(&file_id, &[file_id.to_message()]);
        assert!(matches!(result, Err(Error::DuplicateFileId)));
    }

    #[test]
    fn validation_failures() {
        let file_id = FileId::default().with_file(File::Goals);
        let result = Encoder::new().with_validity(Validity::ByFileType).encode(&file_id, &[]);
        assert!(matches!(
            result,
            Err(Error::CategoryValidationFailed(ValidationError::MissingMessage {
                file: File::Goals,
                message: "goal"
            }))
        ));
    }

    #[test]
    fn versions() {
        let w = Encoder::new()
            .with_protocol_version(0x10)
            .with_profile_version(100)
            .encode(&FileId::default(), &[])
            .unwrap();

        let header = FileHeader::decode(&w).unwrap();
        assert_eq!(header.major_version(), 1);
        assert_eq!(header.profile_version, 100);
    }
}
