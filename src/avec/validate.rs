//! Rules each file category places on the messages it contains.

use thiserror::Error;

use crate::{
    message::Message,
    profile::{Activity, DeviceInfo, File, FileId, Goal, Record, Session, Workout, WorkoutStep},
};

use super::{Profile, Validity};

/// A file category requirement that was not met.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The file identity does not declare a file type.
    #[error("file identity has no file type.")]
    MissingFileType,
    /// The file identity lacks a field.
    #[error("{file} file identity is missing its {field} field.")]
    MissingField { file: File, field: &'static str },
    /// A required message is absent.
    #[error("{file} file is missing a {message} message.")]
    MissingMessage { file: File, message: &'static str },
    /// A message occurs a different number of times than required.
    #[error("{file} file needs exactly {expected} {message} message(s), found {found}.")]
    MessageCount {
        file: File,
        message: &'static str,
        expected: usize,
        found: usize,
    },
}

/// Check a file identity and the messages following it against the rules of
/// a validity strategy.
pub fn validate(validity: Validity, file_id: &FileId, messages: &[Message]) -> Result<(), ValidationError> {
    if validity == Validity::None {
        return Ok(());
    }

    let Some(file_type) = file_id.file_type else {
        return Err(ValidationError::MissingFileType);
    };

    // Categories without rules are accepted as they are.
    let Some(file) = File::from_u8(file_type) else {
        return Ok(());
    };

    let count = |number: u16| messages.iter().filter(|m| m.number() == number).count();

    let require = |number: u16, message: &'static str| {
        if count(number) == 0 {
            Err(ValidationError::MissingMessage { file, message })
        } else {
            Ok(())
        }
    };

    match file {
        File::Activity => {
            let fields = [
                ("manufacturer", file_id.manufacturer.is_some()),
                ("product", file_id.product.is_some()),
                ("serial number", file_id.serial_number.is_some()),
                ("time created", file_id.time_created.is_some()),
            ];

            if let Some(&(field, _)) = fields.iter().find(|(_, present)| !present) {
                Err(ValidationError::MissingField { file, field })?;
            }

            require(Session::NUMBER, "session")?;
            require(Activity::NUMBER, "activity")?;

            if validity == Validity::VendorConnect {
                let found = count(Session::NUMBER);
                if found != 1 {
                    Err(ValidationError::MessageCount {
                        file,
                        message: "session",
                        expected: 1,
                        found,
                    })?;
                }

                require(DeviceInfo::NUMBER, "device info")?;
                require(Record::NUMBER, "record")?;
            }
        }
        File::Workout => {
            require(Workout::NUMBER, "workout")?;
            require(WorkoutStep::NUMBER, "workout step")?;
        }
        File::Goals => {
            require(Goal::NUMBER, "goal")?;
        }
        _ => {}
    }

    Ok(())
}
