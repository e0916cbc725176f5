//! Merging the message bodies of several files into one file.

use alloc::vec::Vec;

use crate::{
    error::Error,
    sans::{check::crc, header::FileHeader},
};

use super::{CrcCheck, Merging, check, split};

/// Concatenates the bodies of files sharing a protocol major version.
#[derive(Debug, Clone, Copy, Default)]
pub struct Merger {
    crc: CrcCheck,
    merging: Merging,
}

impl Merger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set how CRC mismatches in the inputs are treated.
    pub fn with_crc(mut self, crc: CrcCheck) -> Self {
        self.crc = crc;
        self
    }

    pub fn with_merging(mut self, merging: Merging) -> Self {
        self.merging = merging;
        self
    }

    /// Merge files in order.
    ///
    /// The output header takes its versions from the first file. Fails on the
    /// first corrupt or incompatible input.
    pub fn merge(&self, files: &[&[u8]]) -> Result<Vec<u8>, Error> {
        let mut first: Option<FileHeader> = None;
        let mut body = Vec::new();

        for file in files {
            let (header, data, found) = split(file)?;
            check(file, &header, data, found, self.crc)?;

            if let Some(first) = &first {
                if header.major_version() != first.major_version() {
                    Err(Error::ProtocolVersionMismatch {
                        expected: first.major_version(),
                        found: header.major_version(),
                    })?;
                }
            }

            match self.merging {
                Merging::Default => body.extend_from_slice(data),
            }

            first.get_or_insert(header);
        }

        let first = first.ok_or(Error::NothingToMerge)?;
        let data_size = u32::try_from(body.len()).map_err(|_| Error::EncodeSizeExceeded(body.len()))?;
        tracing::debug!(files = files.len(), data_size, "merged files");

        let mut w = FileHeader::new(first.protocol_version, first.profile_version, data_size).encode();
        w.extend_from_slice(&body);
        w.extend_from_slice(&crc(&body).to_le_bytes());

        Ok(w)
    }
}
