//! Decoded messages and their field values.
//!
//! A [`Message`] owns the raw little-endian bytes of each populated field
//! alongside the definition describing it. Typed views are read and written
//! through the accessor functions in this module, usually via the generated
//! implementations of [`crate::avec::Profile`].

use alloc::{
    collections::BTreeMap,
    string::String,
    vec::Vec,
};

use crate::{
    profile::FieldDescription,
    sans::{
        DataError, EncodeError,
        data::{self, BaseType, FieldType, Number, Resolution, Value},
        definition::{Definition, DeveloperFieldDefinition, FieldDefinition},
        header::RecordHeader,
        take_slice,
    },
};

/// Raw field bytes and their definitions, keyed by field number.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields {
    values: BTreeMap<u8, Vec<u8>>,
    definitions: BTreeMap<u8, FieldDefinition>,
}

impl Fields {
    /// Little-endian bytes of a field.
    pub fn raw(&self, number: u8) -> Option<&[u8]> {
        self.values.get(&number).map(Vec::as_slice)
    }

    /// Definition of a field.
    pub fn definition(&self, number: u8) -> Option<&FieldDefinition> {
        self.definitions.get(&number)
    }

    /// Numbers of populated fields, in ascending order.
    pub fn numbers(&self) -> impl Iterator<Item = u8> + '_ {
        self.values.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn insert(&mut self, definition: FieldDefinition, bytes: Vec<u8>) {
        self.definitions.insert(definition.number, definition);
        self.values.insert(definition.number, bytes);
    }

    fn remove(&mut self, number: u8) {
        self.definitions.remove(&number);
        self.values.remove(&number);
    }
}

/// Read the value of a field, applying a resolution to numeric values.
///
/// Scaled scalars become [`Value::F64`]; scaled arrays hold `F64` elements.
pub fn read(fields: &Fields, number: u8, resolution: Option<Resolution>) -> Option<Value> {
    let definition = fields.definition(number)?;
    let value = data::decode_field(definition.base_type, fields.raw(number)?)?;

    let Some(resolution) = resolution else {
        return Some(value);
    };

    match value {
        Value::Array(elements) => Some(Value::Array(
            elements
                .iter()
                .filter_map(|e| e.as_f64())
                .map(|x| Value::F64(resolution.decode(x)))
                .collect(),
        )),
        value => value.as_f64().map(|x| Value::F64(resolution.decode(x))),
    }
}

/// Write the value of a field, or remove it.
///
/// The field is removed if `value` is `None` or would be written as the base
/// type's invalid marker. Numbers saturate to the range of the base type
/// afterwards, so a value clamped onto the marker is stored and written as
/// the marker: `Uint8` 300 is written as `0xFF` and reads back as absent.
///
/// # Panics
///
/// Panics if a resolution is supplied for a string or blob base type.
pub fn write(
    fields: &mut Fields,
    number: u8,
    base_type: BaseType,
    resolution: Option<Resolution>,
    value: Option<Value>,
) {
    assert!(
        resolution.is_none() || !base_type.is_bytes(),
        "resolution applied to {base_type:?} field {number}"
    );

    let bytes = value.and_then(|value| match resolution {
        Some(resolution) => encode_scaled(base_type, resolution, &value),
        None => data::encode_field(base_type, &value),
    });

    match bytes {
        Some(bytes) => {
            let size = bytes.len().min(u8::MAX as usize) as u8;
            fields.insert(FieldDefinition::new(number, size, base_type), bytes);
        }
        None => fields.remove(number),
    }
}

fn encode_scaled(base_type: BaseType, resolution: Resolution, value: &Value) -> Option<Vec<u8>> {
    let scale = |x: f64| Number::Float(resolution.encode(x));

    match value {
        Value::Array(elements) => {
            let bytes: Vec<u8> = elements
                .iter()
                .filter_map(|e| data::encode_element(base_type, scale(e.as_f64()?)))
                .flatten()
                .collect();
            if bytes.is_empty() { None } else { Some(bytes) }
        }
        value => data::encode_element(base_type, scale(value.as_f64()?)),
    }
}

/// A developer field value resolved against its field description.
#[derive(Debug, Clone, PartialEq)]
pub struct DeveloperValue {
    pub developer_data_index: u8,
    /// Field definition number within the developer's fields.
    pub number: u8,
    /// Native base type declared by the field description.
    pub base_type: BaseType,
    pub name: Option<String>,
    pub units: Option<String>,
    /// The value, scaled if the field description declares a resolution.
    pub value: Value,
    bytes: Vec<u8>,
}

impl DeveloperValue {
    /// Build a developer value for a field description.
    ///
    /// Returns `None` if the description does not declare a known base type,
    /// or the value would not be written.
    pub fn new(description: &FieldDescription, value: Value) -> Option<Self> {
        let base_type = description.base_type()?;

        let bytes = match description.resolution() {
            Some(resolution) if !base_type.is_bytes() => {
                encode_scaled(base_type, resolution, &value)?
            }
            _ => data::encode_field(base_type, &value)?,
        };

        Self::from_bytes(description, base_type, bytes)
    }

    /// Decode the little-endian bytes of a developer field.
    fn decode(description: &FieldDescription, bytes: Vec<u8>) -> Option<Self> {
        Self::from_bytes(description, description.base_type()?, bytes)
    }

    fn from_bytes(description: &FieldDescription, base_type: BaseType, bytes: Vec<u8>) -> Option<Self> {
        let mut fields = Fields::default();
        let definition = FieldDefinition::new(0, bytes.len() as u8, base_type);
        fields.insert(definition, bytes);

        let resolution = description.resolution().filter(|_| !base_type.is_bytes());
        let value = read(&fields, 0, resolution)?;
        let bytes = fields.values.remove(&0)?;

        Some(Self {
            developer_data_index: description.developer_data_index?,
            number: description.field_definition_number?,
            base_type,
            name: description.field_name.clone(),
            units: description.units.clone(),
            value,
            bytes,
        })
    }

    /// Little-endian bytes of the value.
    pub fn raw(&self) -> &[u8] {
        &self.bytes
    }
}

/// Resolve developer field bytes against the field descriptions seen so far.
///
/// Fields without a matching description are skipped.
pub(crate) fn resolve_developer(
    definition: &Definition,
    r: &[u8],
    catalogue: &[FieldDescription],
) -> Result<Vec<DeveloperValue>, DataError> {
    let i = &mut 0;
    let mut values = Vec::new();

    for field in &definition.developer_fields {
        let bytes = take_slice(r, i, field.size as usize)?;

        let description = catalogue.iter().rev().find(|d| {
            d.developer_data_index == Some(field.developer_data_index)
                && d.field_definition_number == Some(field.number)
        });

        let Some(description) = description else {
            tracing::debug!(
                developer_data_index = field.developer_data_index,
                field = field.number,
                "no field description for developer field"
            );
            continue;
        };

        let Some(base_type) = description.base_type() else {
            continue;
        };

        let mut bytes = bytes.to_vec();
        if bytes.len() % base_type.size() == 0 {
            base_type.normalise(&mut bytes, definition.is_little_endian);
        }

        if let Some(value) = DeveloperValue::decode(description, bytes) {
            values.push(value);
        }
    }

    Ok(values)
}

/// A message: a global message number and its populated fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
    number: u16,
    fields: Fields,
    developer: Vec<DeveloperValue>,
    time_offset: Option<u8>,
}

impl Message {
    /// Create an empty message.
    pub fn new(number: u16) -> Self {
        Self {
            number,
            ..Default::default()
        }
    }

    /// Decode the standard fields of a data record laid out by a definition.
    ///
    /// Fields holding their invalid marker are not stored.
    pub fn decode(number: u16, r: &[u8], definition: &Definition) -> Result<Self, DataError> {
        let mut message = Self::new(number);
        let i = &mut 0;

        for field in &definition.fields {
            let mut bytes = take_slice(r, i, field.size as usize)?.to_vec();
            let base_type = field.base_type;

            if bytes.len() % base_type.size() != 0 {
                continue;
            }
            base_type.normalise(&mut bytes, definition.is_little_endian);

            if !data::is_absent(base_type, &bytes) {
                message.fields.insert(*field, bytes);
            }
        }

        Ok(message)
    }

    /// Encode a definition record followed by a data record for this message.
    pub fn encode(&self, local: u8, w: &mut Vec<u8>) -> Result<(), EncodeError> {
        let size = |field: u8, n: usize| {
            u8::try_from(n).map_err(|_| EncodeError::FieldTooLarge { field, size: n })
        };

        let fields = self
            .fields
            .values
            .iter()
            .map(|(&number, bytes)| {
                let base_type = self.fields.definitions[&number].base_type;
                Ok(FieldDefinition::new(number, size(number, bytes.len())?, base_type))
            })
            .collect::<Result<Vec<_>, EncodeError>>()?;

        let developer_fields = self
            .developer
            .iter()
            .map(|d| {
                Ok(DeveloperFieldDefinition {
                    number: d.number,
                    size: size(d.number, d.bytes.len())?,
                    developer_data_index: d.developer_data_index,
                })
            })
            .collect::<Result<Vec<_>, EncodeError>>()?;

        let definition = Definition {
            global: self.number,
            is_little_endian: true,
            fields,
            developer_fields,
        };
        definition.encode(local, w)?;

        w.push(RecordHeader::data(local));
        self.fields.values.values().for_each(|b| w.extend_from_slice(b));
        self.developer.iter().for_each(|d| w.extend_from_slice(&d.bytes));

        Ok(())
    }

    /// Global message number.
    pub fn number(&self) -> u16 {
        self.number
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// Whether a field holds bytes.
    ///
    /// A field saturated onto its invalid marker holds bytes but has no
    /// [`value`](Self::value).
    pub fn contains(&self, number: u8) -> bool {
        self.fields.values.contains_key(&number)
    }

    /// Read a field as its native value.
    pub fn value(&self, number: u8) -> Option<Value> {
        read(&self.fields, number, None)
    }

    /// Read a field, converted to a Rust type.
    pub fn get<T: FieldType>(&self, number: u8) -> Option<T> {
        T::from_value(&self.value(number)?)
    }

    /// Read a numeric field, converted to an engineering value.
    pub fn get_scaled(&self, number: u8, resolution: Resolution) -> Option<f64> {
        read(&self.fields, number, Some(resolution))?.as_f64()
    }

    /// Write a field, or remove it if `value` is `None`.
    pub fn set<T: FieldType>(&mut self, number: u8, base_type: BaseType, value: Option<T>) {
        write(&mut self.fields, number, base_type, None, value.map(T::into_value));
    }

    /// Write a numeric field from an engineering value, or remove it if
    /// `value` is `None`.
    ///
    /// # Panics
    ///
    /// Panics if `base_type` is a string or blob type.
    pub fn set_scaled(
        &mut self,
        number: u8,
        base_type: BaseType,
        resolution: Resolution,
        value: Option<f64>,
    ) {
        let value = value.map(Value::F64);
        write(&mut self.fields, number, base_type, Some(resolution), value);
    }

    /// Remove a field.
    pub fn remove(&mut self, number: u8) {
        self.fields.remove(number);
    }

    /// Developer field values.
    pub fn developer(&self) -> &[DeveloperValue] {
        &self.developer
    }

    pub fn set_developer(&mut self, values: Vec<DeveloperValue>) {
        self.developer = values;
    }

    pub fn push_developer(&mut self, value: DeveloperValue) {
        self.developer.push(value);
    }

    /// Time offset from a compressed timestamp header, if decoded from one.
    pub fn time_offset(&self) -> Option<u8> {
        self.time_offset
    }

    pub fn set_time_offset(&mut self, time_offset: Option<u8>) {
        self.time_offset = time_offset;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use alloc::vec;
    use proptest::prelude::*;

    fn definition(fields: Vec<FieldDefinition>) -> Definition {
        Definition {
            global: 20,
            is_little_endian: true,
            fields,
            developer_fields: vec![],
        }
    }

    #[test]
    fn decode_skips_invalid_fields() {
        let definition = definition(vec![
            FieldDefinition::new(3, 1, BaseType::Uint8),
            FieldDefinition::new(4, 1, BaseType::Uint8),
            FieldDefinition::new(2, 2, BaseType::Uint16),
        ]);
        let message = Message::decode(20, &[0xFF, 90, 0x20, 0x0A], &definition).unwrap();

        assert!(!message.contains(3));
        assert_eq!(message.get::<u8>(4), Some(90));
        assert_eq!(message.get::<u16>(2), Some(0x0A20));
        assert_eq!(message.fields().len(), 2);
    }

    #[test]
    fn decode_normalises_big_endian() {
        let mut definition = definition(vec![FieldDefinition::new(0, 4, BaseType::Sint32)]);
        definition.is_little_endian = false;
        let message = Message::decode(20, &[0xFF, 0xFF, 0xFF, 0xFE], &definition).unwrap();

        assert_eq!(message.get::<i32>(0), Some(-2));
        assert_eq!(message.fields().raw(0), Some(&[0xFE, 0xFF, 0xFF, 0xFF][..]));
    }

    #[test]
    fn decode_needs_whole_record() {
        let definition = definition(vec![FieldDefinition::new(0, 4, BaseType::Uint32)]);
        assert_eq!(
            Message::decode(20, &[1, 2], &definition),
            Err(DataError::TruncatedRecord {
                needed: 4,
                available: 2
            })
        );
    }

    #[test]
    fn scaled_fields() {
        let altitude = Resolution::new(5.0, 2500.0);
        let mut message = Message::new(20);
        message.set_scaled(2, BaseType::Uint16, altitude, Some(101.4));

        assert_eq!(message.fields().raw(2), Some(&3007u16.to_le_bytes()[..]));
        assert_eq!(message.get_scaled(2, altitude), Some(101.4));
        assert_eq!(message.get::<u16>(2), Some(3007));
    }

    #[test]
    fn sentinel_values_are_not_written() {
        let mut message = Message::new(20);
        message.set(3, BaseType::Uint8, Some(255u8));
        message.set(4, BaseType::Uint32z, Some(0u32));
        assert!(message.fields().is_empty());

        message.set(3, BaseType::Uint8, Some(300u16));
        assert_eq!(message.fields().raw(3), Some(&[0xFF][..]));
        assert_eq!(message.value(3), None);

        message.set(3, BaseType::Uint8, None::<u8>);
        assert!(!message.contains(3));
    }

    #[test]
    fn saturating_onto_the_marker() {
        let mut message = Message::new(20);
        message.set(13, BaseType::Sint8, Some(200i16));
        message.set(9, BaseType::Uint16z, Some(-5i32));

        assert_eq!(message.fields().raw(13), Some(&[0x7F][..]));
        assert_eq!(message.fields().raw(9), Some(&[0, 0][..]));
        for number in [13, 9] {
            assert!(message.contains(number));
            assert_eq!(message.value(number), None);
        }
    }

    const NUMERIC: [BaseType; 15] = [
        BaseType::Enum,
        BaseType::Sint8,
        BaseType::Uint8,
        BaseType::Sint16,
        BaseType::Uint16,
        BaseType::Sint32,
        BaseType::Uint32,
        BaseType::Float32,
        BaseType::Float64,
        BaseType::Uint8z,
        BaseType::Uint16z,
        BaseType::Uint32z,
        BaseType::Sint64,
        BaseType::Uint64,
        BaseType::Uint64z,
    ];

    /// Raw range of a base type. Floats are limited to where `f32` keeps
    /// fractions of a step.
    fn bounds(base_type: BaseType) -> (i128, i128) {
        match base_type {
            BaseType::Sint8 => (i8::MIN.into(), i8::MAX.into()),
            BaseType::Sint16 => (i16::MIN.into(), i16::MAX.into()),
            BaseType::Sint32 => (i32::MIN.into(), i32::MAX.into()),
            BaseType::Sint64 => (i64::MIN.into(), i64::MAX.into()),
            BaseType::Uint16 | BaseType::Uint16z => (0, u16::MAX.into()),
            BaseType::Uint32 | BaseType::Uint32z => (0, u32::MAX.into()),
            BaseType::Uint64 | BaseType::Uint64z => (0, u64::MAX.into()),
            BaseType::Float32 | BaseType::Float64 => (-1_000_000, 1_000_000),
            _ => (0, u8::MAX.into()),
        }
    }

    proptest! {
        #[test]
        fn scaled_fields_round_trip(
            base_type in prop::sample::select(NUMERIC.to_vec()),
            scale in prop::sample::select(vec![1.0, 5.0, 10.0, 100.0]),
            offset in prop::sample::select(vec![0.0, 500.0, 2500.0]),
            seed in any::<u64>(),
        ) {
            let resolution = Resolution::new(scale, offset);
            let (min, max) = bounds(base_type);

            // Raws beyond 2^40 lose precision as engineering values.
            let (low, high) = (min.max(-(1 << 40)), max.min(1 << 40));
            let raw = low + (seed as i128).rem_euclid(high - low + 1);
            prop_assume!(raw != base_type.invalid() as i128);

            let value = resolution.decode(raw as f64);
            let mut message = Message::new(20);
            message.set_scaled(0, base_type, resolution, Some(value));

            let decoded = message.get_scaled(0, resolution);
            prop_assert!(decoded.is_some(), "{:?} raw {} was dropped", base_type, raw);
            let decoded = decoded.unwrap_or_default();
            prop_assert!((decoded - value).abs() <= 1.0 / scale, "{} != {}", decoded, value);

            if !matches!(base_type, BaseType::Float32 | BaseType::Float64) {
                let size = base_type.size();
                let (above, below) = (max.to_le_bytes(), min.to_le_bytes());

                let too_high = resolution.decode(max as f64 * 2.0 + 1e6);
                let too_low = resolution.decode(min as f64 * 2.0 - 1e6);
                message.set_scaled(1, base_type, resolution, Some(too_high));
                message.set_scaled(2, base_type, resolution, Some(too_low));
                prop_assert_eq!(message.fields().raw(1), Some(&above[..size]));
                prop_assert_eq!(message.fields().raw(2), Some(&below[..size]));
            }
        }
    }

    #[test]
    #[should_panic]
    fn resolution_on_string_panics() {
        let mut fields = Fields::default();
        let value = Some(Value::String("x".into()));
        write(&mut fields, 0, BaseType::String, Some(Resolution::IDENTITY), value);
    }

    #[test]
    fn encodes_fields_in_number_order() {
        let mut message = Message::new(20);
        message.set(253, BaseType::Uint32, Some(1000u32));
        message.set(3, BaseType::Uint8, Some(140u8));

        let mut w = Vec::new();
        message.encode(1, &mut w).unwrap();

        assert_eq!(
            w,
            [
                0x41, 0, 0, 20, 0, 2, 3, 1, 0x02, 253, 4, 0x86, // definition
                0x01, 140, 0xE8, 0x03, 0, 0, // data
            ]
        );
    }

    #[test]
    fn oversized_string_fails_to_encode() {
        let mut message = Message::new(26);
        message.set(8, BaseType::String, Some("x".repeat(300)));

        let mut w = Vec::new();
        assert_eq!(
            message.encode(0, &mut w),
            Err(EncodeError::FieldTooLarge {
                field: 8,
                size: 300
            })
        );
    }
}
