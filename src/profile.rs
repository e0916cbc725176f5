//! Common messages of the global profile.
//!
//! Only the fields most applications need are included. Fields not listed
//! here survive a round trip through [`Message`](crate::message::Message), but
//! not through these structs.

use alloc::{string::String, vec::Vec};
use core::fmt;

use cassette_derive::Profile;
use zerocopy::{Immutable, IntoBytes, KnownLayout, TryFromBytes};

use crate::{
    avec::Profile as _,
    message::DeveloperValue,
    registry::Handler,
    sans::data::{BaseType, Resolution},
};

/// Handlers for every message in this module.
pub const HANDLERS: &[Handler] = &[
    FileId::HANDLER,
    FileCreator::HANDLER,
    Activity::HANDLER,
    Session::HANDLER,
    Lap::HANDLER,
    Record::HANDLER,
    Event::HANDLER,
    DeviceInfo::HANDLER,
    Workout::HANDLER,
    WorkoutStep::HANDLER,
    Goal::HANDLER,
    DeveloperDataId::HANDLER,
    FieldDescription::HANDLER,
];

/// File category declared by a [`FileId`].
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromBytes, IntoBytes, Immutable, KnownLayout)]
pub enum File {
    Device = 1,
    Settings = 2,
    Sport = 3,
    Activity = 4,
    Workout = 5,
    Course = 6,
    Schedules = 7,
    Weight = 9,
    Totals = 10,
    Goals = 11,
    BloodPressure = 14,
    MonitoringA = 15,
    ActivitySummary = 20,
    MonitoringDaily = 28,
    MonitoringB = 32,
    Segment = 34,
    SegmentList = 35,
}

impl File {
    pub fn from_u8(x: u8) -> Option<Self> {
        zerocopy::try_transmute!(x).ok()
    }
}

impl fmt::Display for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Device => "device",
            Self::Settings => "settings",
            Self::Sport => "sport",
            Self::Activity => "activity",
            Self::Workout => "workout",
            Self::Course => "course",
            Self::Schedules => "schedules",
            Self::Weight => "weight",
            Self::Totals => "totals",
            Self::Goals => "goals",
            Self::BloodPressure => "blood pressure",
            Self::MonitoringA => "monitoring A",
            Self::ActivitySummary => "activity summary",
            Self::MonitoringDaily => "daily monitoring",
            Self::MonitoringB => "monitoring B",
            Self::Segment => "segment",
            Self::SegmentList => "segment list",
        };
        write!(f, "{name}")
    }
}

/// Identifies the file and the device that created it.
#[derive(Debug, Clone, Default, PartialEq, Profile)]
#[profile(0, "file_id")]
pub struct FileId {
    #[field(0, Enum)]
    pub file_type: Option<u8>,
    #[field(1, Uint16)]
    pub manufacturer: Option<u16>,
    #[field(2, Uint16)]
    pub product: Option<u16>,
    #[field(3, Uint32z)]
    pub serial_number: Option<u32>,
    #[field(4, Uint32)]
    pub time_created: Option<u32>,
    #[field(5, Uint16)]
    pub number: Option<u16>,
    #[field(8, String)]
    pub product_name: Option<String>,
}

impl FileId {
    /// The declared file category, if known.
    pub fn file(&self) -> Option<File> {
        self.file_type.and_then(File::from_u8)
    }

    pub fn with_file(mut self, file: File) -> Self {
        self.file_type = Some(file as u8);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Profile)]
#[profile(49, "file_creator")]
pub struct FileCreator {
    #[field(0, Uint16)]
    pub software_version: Option<u16>,
    #[field(1, Uint8)]
    pub hardware_version: Option<u8>,
}

/// Summary of a whole activity.
#[derive(Debug, Clone, Default, PartialEq, Profile)]
#[profile(34, "activity")]
pub struct Activity {
    #[field(253, Uint32)]
    pub timestamp: Option<u32>,
    #[field(0, Uint32, scale = 1000)]
    pub total_timer_time: Option<f64>,
    #[field(1, Uint16)]
    pub num_sessions: Option<u16>,
    #[field(2, Enum)]
    pub activity_type: Option<u8>,
    #[field(3, Enum)]
    pub event: Option<u8>,
    #[field(4, Enum)]
    pub event_type: Option<u8>,
    #[field(5, Uint32)]
    pub local_timestamp: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Profile)]
#[profile(18, "session")]
pub struct Session {
    #[field(254, Uint16)]
    pub message_index: Option<u16>,
    #[field(253, Uint32)]
    pub timestamp: Option<u32>,
    #[field(0, Enum)]
    pub event: Option<u8>,
    #[field(1, Enum)]
    pub event_type: Option<u8>,
    #[field(2, Uint32)]
    pub start_time: Option<u32>,
    #[field(3, Sint32)]
    pub start_position_lat: Option<i32>,
    #[field(4, Sint32)]
    pub start_position_long: Option<i32>,
    #[field(5, Enum)]
    pub sport: Option<u8>,
    #[field(6, Enum)]
    pub sub_sport: Option<u8>,
    #[field(7, Uint32, scale = 1000)]
    pub total_elapsed_time: Option<f64>,
    #[field(8, Uint32, scale = 1000)]
    pub total_timer_time: Option<f64>,
    #[field(9, Uint32, scale = 100)]
    pub total_distance: Option<f64>,
    #[field(11, Uint16)]
    pub total_calories: Option<u16>,
    #[field(14, Uint16, scale = 1000)]
    pub avg_speed: Option<f64>,
    #[field(15, Uint16, scale = 1000)]
    pub max_speed: Option<f64>,
    #[field(16, Uint8)]
    pub avg_heart_rate: Option<u8>,
    #[field(17, Uint8)]
    pub max_heart_rate: Option<u8>,
    #[field(22, Uint16)]
    pub total_ascent: Option<u16>,
    #[field(23, Uint16)]
    pub total_descent: Option<u16>,
    #[field(25, Uint16)]
    pub first_lap_index: Option<u16>,
    #[field(26, Uint16)]
    pub num_laps: Option<u16>,
    #[developer]
    pub developer: Vec<DeveloperValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Profile)]
#[profile(19, "lap")]
pub struct Lap {
    #[field(254, Uint16)]
    pub message_index: Option<u16>,
    #[field(253, Uint32)]
    pub timestamp: Option<u32>,
    #[field(0, Enum)]
    pub event: Option<u8>,
    #[field(1, Enum)]
    pub event_type: Option<u8>,
    #[field(2, Uint32)]
    pub start_time: Option<u32>,
    #[field(7, Uint32, scale = 1000)]
    pub total_elapsed_time: Option<f64>,
    #[field(8, Uint32, scale = 1000)]
    pub total_timer_time: Option<f64>,
    #[field(9, Uint32, scale = 100)]
    pub total_distance: Option<f64>,
}

/// A sample of position, distance and sensor readings.
#[derive(Debug, Clone, Default, PartialEq, Profile)]
#[profile(20, "record")]
pub struct Record {
    #[field(time)]
    pub time_offset: Option<u8>,
    #[field(253, Uint32)]
    pub timestamp: Option<u32>,
    #[field(0, Sint32)]
    pub position_lat: Option<i32>,
    #[field(1, Sint32)]
    pub position_long: Option<i32>,
    #[field(2, Uint16, scale = 5, offset = 2500)]
    pub altitude: Option<f64>,
    #[field(3, Uint8)]
    pub heart_rate: Option<u8>,
    #[field(4, Uint8)]
    pub cadence: Option<u8>,
    #[field(5, Uint32, scale = 100)]
    pub distance: Option<f64>,
    #[field(6, Uint16, scale = 1000)]
    pub speed: Option<f64>,
    #[field(7, Uint16)]
    pub power: Option<u16>,
    #[field(13, Sint8)]
    pub temperature: Option<i8>,
    #[developer]
    pub developer: Vec<DeveloperValue>,
}

impl Record {
    /// Position in degrees, converted from semicircles.
    pub fn position(&self) -> Option<(f64, f64)> {
        const DEGREES_PER_SEMICIRCLE: f64 = 180.0 / 2_147_483_648.0;

        let lat = self.position_lat? as f64 * DEGREES_PER_SEMICIRCLE;
        let long = self.position_long? as f64 * DEGREES_PER_SEMICIRCLE;
        Some((lat, long))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Profile)]
#[profile(21, "event")]
pub struct Event {
    #[field(253, Uint32)]
    pub timestamp: Option<u32>,
    #[field(0, Enum)]
    pub event: Option<u8>,
    #[field(1, Enum)]
    pub event_type: Option<u8>,
    #[field(3, Uint32)]
    pub data: Option<u32>,
    #[field(4, Uint8)]
    pub event_group: Option<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Profile)]
#[profile(23, "device_info")]
pub struct DeviceInfo {
    #[field(253, Uint32)]
    pub timestamp: Option<u32>,
    #[field(0, Uint8)]
    pub device_index: Option<u8>,
    #[field(1, Uint8)]
    pub device_type: Option<u8>,
    #[field(2, Uint16)]
    pub manufacturer: Option<u16>,
    #[field(3, Uint32z)]
    pub serial_number: Option<u32>,
    #[field(4, Uint16)]
    pub product: Option<u16>,
    #[field(5, Uint16, scale = 100)]
    pub software_version: Option<f64>,
    #[field(6, Uint8)]
    pub hardware_version: Option<u8>,
    #[field(27, String)]
    pub product_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Profile)]
#[profile(26, "workout")]
pub struct Workout {
    #[field(4, Enum)]
    pub sport: Option<u8>,
    #[field(5, Uint32z)]
    pub capabilities: Option<u32>,
    #[field(6, Uint16)]
    pub num_valid_steps: Option<u16>,
    #[field(8, String)]
    pub name: Option<String>,
    #[field(11, Enum)]
    pub sub_sport: Option<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Profile)]
#[profile(27, "workout_step")]
pub struct WorkoutStep {
    #[field(254, Uint16)]
    pub message_index: Option<u16>,
    #[field(0, String)]
    pub name: Option<String>,
    #[field(1, Enum)]
    pub duration_type: Option<u8>,
    #[field(2, Uint32)]
    pub duration_value: Option<u32>,
    #[field(3, Enum)]
    pub target_type: Option<u8>,
    #[field(4, Uint32)]
    pub target_value: Option<u32>,
    #[field(5, Uint32)]
    pub custom_target_value_low: Option<u32>,
    #[field(6, Uint32)]
    pub custom_target_value_high: Option<u32>,
    #[field(7, Enum)]
    pub intensity: Option<u8>,
    #[field(8, String)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Profile)]
#[profile(15, "goal")]
pub struct Goal {
    #[field(254, Uint16)]
    pub message_index: Option<u16>,
    #[field(0, Enum)]
    pub sport: Option<u8>,
    #[field(1, Enum)]
    pub sub_sport: Option<u8>,
    #[field(2, Uint32)]
    pub start_date: Option<u32>,
    #[field(3, Uint32)]
    pub end_date: Option<u32>,
    #[field(4, Enum)]
    pub goal_type: Option<u8>,
    #[field(5, Uint32)]
    pub value: Option<u32>,
    #[field(6, Enum)]
    pub repeat: Option<u8>,
    #[field(7, Uint32)]
    pub target_value: Option<u32>,
    #[field(8, Enum)]
    pub recurrence: Option<u8>,
    #[field(9, Uint16)]
    pub recurrence_value: Option<u16>,
    #[field(10, Enum)]
    pub enabled: Option<u8>,
}

/// Identifies the application owning a developer data index.
#[derive(Debug, Clone, Default, PartialEq, Profile)]
#[profile(207, "developer_data_id")]
pub struct DeveloperDataId {
    #[field(0, Byte)]
    pub developer_id: Option<Vec<u8>>,
    #[field(1, Byte)]
    pub application_id: Option<Vec<u8>>,
    #[field(2, Uint16)]
    pub manufacturer_id: Option<u16>,
    #[field(3, Uint8)]
    pub developer_data_index: Option<u8>,
    #[field(4, Uint32)]
    pub application_version: Option<u32>,
}

/// Declares the meaning of a developer field.
#[derive(Debug, Clone, Default, PartialEq, Profile)]
#[profile(206, "field_description")]
pub struct FieldDescription {
    #[field(0, Uint8)]
    pub developer_data_index: Option<u8>,
    #[field(1, Uint8)]
    pub field_definition_number: Option<u8>,
    #[field(2, Uint8)]
    pub fit_base_type_id: Option<u8>,
    #[field(3, String)]
    pub field_name: Option<String>,
    #[field(6, Uint8)]
    pub scale: Option<u8>,
    #[field(7, Sint8)]
    pub offset: Option<i8>,
    #[field(8, String)]
    pub units: Option<String>,
    #[field(14, Uint16)]
    pub native_mesg_num: Option<u16>,
    #[field(15, Uint8)]
    pub native_field_num: Option<u8>,
}

impl FieldDescription {
    /// Describe a developer field of a base type.
    pub fn new(developer_data_index: u8, field_definition_number: u8, base_type: BaseType) -> Self {
        Self {
            developer_data_index: Some(developer_data_index),
            field_definition_number: Some(field_definition_number),
            fit_base_type_id: Some(base_type.to_byte()),
            ..Default::default()
        }
    }

    /// The base type of the described field.
    pub fn base_type(&self) -> Option<BaseType> {
        self.fit_base_type_id.and_then(BaseType::from_byte)
    }

    /// The resolution of the described field, if it declares a scale or an
    /// offset.
    pub fn resolution(&self) -> Option<Resolution> {
        if self.scale.is_none() && self.offset.is_none() {
            return None;
        }

        let scale = self.scale.map_or(1.0, f64::from);
        let offset = self.offset.map_or(0.0, f64::from);
        Some(Resolution::new(scale, offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{avec::Profile, message::Message};

    #[test]
    fn file_categories() {
        assert_eq!(File::from_u8(4), Some(File::Activity));
        assert_eq!(File::from_u8(8), None);
        assert_eq!(FileId::default().with_file(File::Goals).file_type, Some(11));
    }

    #[test]
    fn profile_round_trip() {
        let record = Record {
            timestamp: Some(1_000_000_000),
            position_lat: Some(-477_000_000),
            altitude: Some(1234.6),
            speed: Some(3.141),
            temperature: Some(-4),
            ..Default::default()
        };

        let message = record.to_message();
        assert_eq!(message.number(), 20);
        assert_eq!(message.get::<u16>(2), Some(8673));

        assert_eq!(Record::from_message(&message), record);
    }

    #[test]
    fn unconvertible_fields_are_empty() {
        let mut message = Message::new(20);
        message.set(3, BaseType::Uint16, Some(1000u16));
        assert_eq!(Record::from_message(&message).heart_rate, None);
    }

    #[test]
    fn field_table() {
        let altitude = Record::field(2).unwrap();
        assert_eq!(altitude.name, "altitude");
        assert_eq!(altitude.base_type, BaseType::Uint16);
        assert_eq!(altitude.resolution, Some(Resolution::new(5.0, 2500.0)));
        assert!(Record::field(200).is_none());
    }

    #[test]
    fn field_description_resolution() {
        let mut description = FieldDescription::new(0, 1, BaseType::Uint16);
        assert_eq!(description.base_type(), Some(BaseType::Uint16));
        assert_eq!(description.resolution(), None);

        description.scale = Some(10);
        assert_eq!(description.resolution(), Some(Resolution::new(10.0, 0.0)));
    }
}
