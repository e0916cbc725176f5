//! Base types, resolutions and field values.
//!
//! Field bytes handled here are always little-endian; byte order declared by a
//! definition record is normalised with [`BaseType::normalise`] when a record
//! is sliced.

use alloc::{string::String, vec::Vec};

/// A wire primitive type, as declared by a field definition.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseType {
    /// `enum`
    Enum = 0x00,
    /// `sint8`
    Sint8 = 0x01,
    /// `uint8`
    Uint8 = 0x02,
    /// `sint16`
    Sint16 = 0x03,
    /// `uint16`
    Uint16 = 0x04,
    /// `sint32`
    Sint32 = 0x05,
    /// `uint32`
    Uint32 = 0x06,
    /// `string`, null-terminated UTF-8.
    String = 0x07,
    /// `float32`
    Float32 = 0x08,
    /// `float64`
    Float64 = 0x09,
    /// `uint8z`
    Uint8z = 0x0A,
    /// `uint16z`
    Uint16z = 0x0B,
    /// `uint32z`
    Uint32z = 0x0C,
    /// `byte`, an opaque blob.
    Byte = 0x0D,
    /// `sint64`
    Sint64 = 0x0E,
    /// `uint64`
    Uint64 = 0x0F,
    /// `uint64z`
    Uint64z = 0x10,
}

/// Flag set in a base type byte for endian-sensitive types.
const ENDIAN_FLAG: u8 = 0x80;

/// Mask selecting the base type number from a base type byte.
const NUMBER_MASK: u8 = 0x1F;

impl BaseType {
    /// Decode a base type byte from a field definition.
    ///
    /// Returns `None` for an unknown base type number.
    pub fn from_byte(b: u8) -> Option<Self> {
        let base_type = match b & NUMBER_MASK {
            0x00 => Self::Enum,
            0x01 => Self::Sint8,
            0x02 => Self::Uint8,
            0x03 => Self::Sint16,
            0x04 => Self::Uint16,
            0x05 => Self::Sint32,
            0x06 => Self::Uint32,
            0x07 => Self::String,
            0x08 => Self::Float32,
            0x09 => Self::Float64,
            0x0A => Self::Uint8z,
            0x0B => Self::Uint16z,
            0x0C => Self::Uint32z,
            0x0D => Self::Byte,
            0x0E => Self::Sint64,
            0x0F => Self::Uint64,
            0x10 => Self::Uint64z,
            _ => return None,
        };

        Some(base_type)
    }

    /// The base type byte written to a field definition.
    pub fn to_byte(self) -> u8 {
        if self.is_endian() {
            self as u8 | ENDIAN_FLAG
        } else {
            self as u8
        }
    }

    /// Size in bytes of a single element.
    pub fn size(self) -> usize {
        match self {
            Self::Enum | Self::Sint8 | Self::Uint8 | Self::Uint8z => 1,
            Self::String | Self::Byte => 1,
            Self::Sint16 | Self::Uint16 | Self::Uint16z => 2,
            Self::Sint32 | Self::Uint32 | Self::Uint32z | Self::Float32 => 4,
            Self::Sint64 | Self::Uint64 | Self::Uint64z | Self::Float64 => 8,
        }
    }

    /// Whether byte order applies to this type.
    pub fn is_endian(self) -> bool {
        self.size() > 1
    }

    /// Whether this type carries text or an opaque blob rather than numbers.
    pub fn is_bytes(self) -> bool {
        matches!(self, Self::String | Self::Byte)
    }

    /// The little-endian bit pattern reserved to mean "not present".
    pub fn invalid(self) -> u64 {
        match self {
            Self::Enum | Self::Uint8 | Self::Byte => 0xFF,
            Self::Sint8 => 0x7F,
            Self::Uint16 => 0xFFFF,
            Self::Sint16 => 0x7FFF,
            Self::Uint32 | Self::Float32 => 0xFFFF_FFFF,
            Self::Sint32 => 0x7FFF_FFFF,
            Self::Uint64 | Self::Float64 => u64::MAX,
            Self::Sint64 => 0x7FFF_FFFF_FFFF_FFFF,
            Self::String | Self::Uint8z | Self::Uint16z | Self::Uint32z | Self::Uint64z => 0,
        }
    }

    /// Whether a single little-endian element holds the invalid marker.
    pub fn is_invalid(self, element: &[u8]) -> bool {
        let invalid = self.invalid().to_le_bytes();
        element == &invalid[..self.size()]
    }

    /// Reverse each element of a big-endian field in place.
    pub fn normalise(self, bytes: &mut [u8], is_little_endian: bool) {
        if !is_little_endian && self.is_endian() {
            bytes
                .chunks_exact_mut(self.size())
                .for_each(|element| element.reverse());
        }
    }

    /// Inclusive integer range representable by this type.
    ///
    /// Returns `None` for floating point and string types.
    fn range(self) -> Option<(i128, i128)> {
        let range = match self {
            Self::Sint8 => (i8::MIN as i128, i8::MAX as i128),
            Self::Sint16 => (i16::MIN as i128, i16::MAX as i128),
            Self::Sint32 => (i32::MIN as i128, i32::MAX as i128),
            Self::Sint64 => (i64::MIN as i128, i64::MAX as i128),
            Self::Enum | Self::Uint8 | Self::Uint8z | Self::Byte => (0, u8::MAX as i128),
            Self::Uint16 | Self::Uint16z => (0, u16::MAX as i128),
            Self::Uint32 | Self::Uint32z => (0, u32::MAX as i128),
            Self::Uint64 | Self::Uint64z => (0, u64::MAX as i128),
            Self::Float32 | Self::Float64 | Self::String => return None,
        };

        Some(range)
    }

    /// The invalid marker interpreted as an integer of this type.
    ///
    /// Signed markers are the type's maximum, so no sign extension applies.
    fn invalid_integer(self) -> i128 {
        self.invalid() as i128
    }
}

/// An affine transform between a raw wire number and an engineering value.
///
/// `value = (raw - offset) / scale` and `raw = round(value * scale + offset)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    pub scale: f64,
    pub offset: f64,
}

impl Resolution {
    /// The transform leaving values unchanged.
    pub const IDENTITY: Self = Self::new(1.0, 0.0);

    pub const fn new(scale: f64, offset: f64) -> Self {
        Self { scale, offset }
    }

    /// Convert a raw wire number to an engineering value.
    pub fn decode(self, raw: f64) -> f64 {
        (raw - self.offset) / self.scale
    }

    /// Convert an engineering value to a raw wire number, before rounding.
    pub fn encode(self, value: f64) -> f64 {
        value * self.scale + self.offset
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A decoded field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    U8(u8),
    I8(i8),
    U16(u16),
    I16(i16),
    U32(u32),
    I32(i32),
    U64(u64),
    I64(i64),
    F32(f32),
    F64(f64),
    String(String),
    Bytes(Vec<u8>),
    /// The valid elements of an array field.
    Array(Vec<Value>),
}

impl Value {
    /// The value as an integer, if it is an integer.
    pub fn as_integer(&self) -> Option<i128> {
        let integer = match *self {
            Self::U8(x) => x as i128,
            Self::I8(x) => x as i128,
            Self::U16(x) => x as i128,
            Self::I16(x) => x as i128,
            Self::U32(x) => x as i128,
            Self::I32(x) => x as i128,
            Self::U64(x) => x as i128,
            Self::I64(x) => x as i128,
            _ => return None,
        };

        Some(integer)
    }

    /// The value as a float, if it is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::F32(x) => Some(x as f64),
            Self::F64(x) => Some(x),
            _ => self.as_integer().map(|x| x as f64),
        }
    }

    /// Numeric input to [`encode_element`].
    fn as_number(&self) -> Option<Number> {
        match *self {
            Self::F32(x) => Some(Number::Float(x as f64)),
            Self::F64(x) => Some(Number::Float(x)),
            _ => self.as_integer().map(Number::Integer),
        }
    }
}

/// A number on its way to the wire.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Integer(i128),
    Float(f64),
}

/// Decode one little-endian element of a numeric base type.
///
/// Returns `None` if the element holds the type's invalid marker.
pub fn decode_element(base_type: BaseType, element: &[u8]) -> Option<Value> {
    if element.len() != base_type.size() || base_type.is_invalid(element) {
        return None;
    }

    let mut buf = [0; 8];
    buf[..element.len()].copy_from_slice(element);
    let raw = u64::from_le_bytes(buf);

    let value = match base_type {
        BaseType::Enum | BaseType::Uint8 | BaseType::Uint8z | BaseType::Byte => {
            Value::U8(raw as u8)
        }
        BaseType::Sint8 => Value::I8(raw as u8 as i8),
        BaseType::Uint16 | BaseType::Uint16z => Value::U16(raw as u16),
        BaseType::Sint16 => Value::I16(raw as u16 as i16),
        BaseType::Uint32 | BaseType::Uint32z => Value::U32(raw as u32),
        BaseType::Sint32 => Value::I32(raw as u32 as i32),
        BaseType::Uint64 | BaseType::Uint64z => Value::U64(raw),
        BaseType::Sint64 => Value::I64(raw as i64),
        BaseType::Float32 => Value::F32(f32::from_bits(raw as u32)),
        BaseType::Float64 => Value::F64(f64::from_bits(raw)),
        BaseType::String => return None,
    };

    Some(value)
}

/// Decode the little-endian bytes of a whole field.
///
/// Strings are truncated at the first null byte; blobs are returned verbatim.
/// Returns `None` if the field is absent: every element holds the invalid
/// marker, or a string is empty once trimmed.
pub fn decode_field(base_type: BaseType, bytes: &[u8]) -> Option<Value> {
    match base_type {
        BaseType::String => {
            let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
            let text = &bytes[..end];
            if text.is_empty() {
                return None;
            }
            Some(Value::String(String::from_utf8_lossy(text).into_owned()))
        }
        BaseType::Byte => {
            if bytes.is_empty() || bytes.iter().all(|b| *b == 0xFF) {
                return None;
            }
            Some(Value::Bytes(bytes.to_vec()))
        }
        _ => {
            let size = base_type.size();
            if bytes.is_empty() || bytes.len() % size != 0 {
                return None;
            }

            if bytes.len() == size {
                return decode_element(base_type, bytes);
            }

            let elements: Vec<Value> = bytes
                .chunks_exact(size)
                .filter_map(|element| decode_element(base_type, element))
                .collect();

            if elements.is_empty() {
                None
            } else {
                Some(Value::Array(elements))
            }
        }
    }
}

/// Whether a whole field of little-endian bytes is absent.
pub fn is_absent(base_type: BaseType, bytes: &[u8]) -> bool {
    decode_field(base_type, bytes).is_none()
}

/// Encode a number as one little-endian element of a numeric base type.
///
/// The number is rounded for integer types. Returns `None` if the rounded
/// number equals the type's invalid marker or is not a number at all;
/// otherwise the number saturates to the type's range.
pub fn encode_element(base_type: BaseType, number: Number) -> Option<Vec<u8>> {
    let size = base_type.size();

    if let Some((min, max)) = base_type.range() {
        let raw = match number {
            Number::Integer(x) => x,
            Number::Float(x) if x.is_nan() => return None,
            // Casting saturates at the bounds of `i128`.
            Number::Float(x) => round(x) as i128,
        };

        if raw == base_type.invalid_integer() {
            return None;
        }

        let raw = raw.clamp(min, max);
        return Some(raw.to_le_bytes()[..size].to_vec());
    }

    let value = match number {
        Number::Integer(x) => x as f64,
        Number::Float(x) => x,
    };

    if value.is_nan() {
        return None;
    }

    match base_type {
        BaseType::Float32 => Some((value as f32).to_le_bytes().to_vec()),
        BaseType::Float64 => Some(value.to_le_bytes().to_vec()),
        _ => None,
    }
}

/// Encode a value as the little-endian bytes of a whole field.
///
/// Returns `None` if the field should be omitted.
pub fn encode_field(base_type: BaseType, value: &Value) -> Option<Vec<u8>> {
    match (base_type, value) {
        (BaseType::String, Value::String(s)) if !s.is_empty() => Some(s.as_bytes().to_vec()),
        (BaseType::String, _) => None,
        (BaseType::Byte, Value::Bytes(b)) if !is_absent(BaseType::Byte, b) => Some(b.clone()),
        (_, Value::Array(elements)) => {
            let bytes: Vec<u8> = elements
                .iter()
                .filter_map(|e| encode_element(base_type, e.as_number()?))
                .flatten()
                .collect();
            if bytes.is_empty() { None } else { Some(bytes) }
        }
        (_, value) => encode_element(base_type, value.as_number()?),
    }
}

/// Round half away from zero, without relying on `std`.
fn round(x: f64) -> f64 {
    // Floats of this magnitude are already integral.
    const INTEGRAL: f64 = 4_503_599_627_370_496.0;
    if !(-INTEGRAL..INTEGRAL).contains(&x) {
        return x;
    }

    let truncated = x as i64 as f64;
    let fraction = x - truncated;

    if fraction >= 0.5 {
        truncated + 1.0
    } else if fraction <= -0.5 {
        truncated - 1.0
    } else {
        truncated
    }
}

/// Convert between Rust types and field values.
///
/// Implemented for the primitives, `String`, and `Vec<u8>`. Reading converts
/// across numeric types and yields `None` when the value does not fit.
pub trait FieldType: Sized {
    fn from_value(value: &Value) -> Option<Self>;
    fn into_value(self) -> Value;
}

macro_rules! field_type {
    ($t:ident, $variant:ident) => {
        impl FieldType for $t {
            fn from_value(value: &Value) -> Option<Self> {
                $t::try_from(value.as_integer()?).ok()
            }

            fn into_value(self) -> Value {
                Value::$variant(self)
            }
        }
    };
}

field_type!(u8, U8);
field_type!(i8, I8);
field_type!(u16, U16);
field_type!(i16, I16);
field_type!(u32, U32);
field_type!(i32, I32);
field_type!(u64, U64);
field_type!(i64, I64);

impl FieldType for f32 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_f64().map(|x| x as f32)
    }

    fn into_value(self) -> Value {
        Value::F32(self)
    }
}

impl FieldType for f64 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_f64()
    }

    fn into_value(self) -> Value {
        Value::F64(self)
    }
}

impl FieldType for String {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    fn into_value(self) -> Value {
        Value::String(self)
    }
}

impl FieldType for Vec<u8> {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bytes(b) => Some(b.clone()),
            Value::U8(x) => Some(alloc::vec![*x]),
            Value::Array(elements) => elements.iter().map(u8::from_value).collect(),
            _ => None,
        }
    }

    fn into_value(self) -> Value {
        Value::Bytes(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use alloc::vec;
    use proptest::prelude::*;

    #[test]
    fn base_type_bytes() {
        assert_eq!(BaseType::from_byte(0x84), Some(BaseType::Uint16));
        assert_eq!(BaseType::from_byte(0x04), Some(BaseType::Uint16));
        assert_eq!(BaseType::from_byte(0x07), Some(BaseType::String));
        assert_eq!(BaseType::from_byte(0x11), None);
        assert_eq!(BaseType::Uint16.to_byte(), 0x84);
        assert_eq!(BaseType::Uint8z.to_byte(), 0x0A);
        assert_eq!(BaseType::Uint64z.to_byte(), 0x90);
    }

    #[test]
    fn sentinel_decodes_as_absent() {
        assert_eq!(decode_field(BaseType::Uint8, &[0xFF]), None);
        assert_eq!(decode_field(BaseType::Sint16, &[0xFF, 0x7F]), None);
        assert_eq!(decode_field(BaseType::Uint32z, &[0, 0, 0, 0]), None);
        assert_eq!(decode_field(BaseType::Float32, &[0xFF; 4]), None);
        assert_eq!(decode_field(BaseType::Byte, &[0xFF, 0xFF]), None);
        assert_eq!(decode_field(BaseType::Uint8, &[0xFE]), Some(Value::U8(0xFE)));
        assert_eq!(decode_field(BaseType::Sint16, &[0x00, 0x80]), Some(Value::I16(i16::MIN)));
    }

    #[test]
    fn strings_are_trimmed() {
        assert_eq!(
            decode_field(BaseType::String, b"ride\0\0\0"),
            Some(Value::String("ride".into()))
        );
        assert_eq!(decode_field(BaseType::String, b"\0\0"), None);
    }

    #[test]
    fn arrays_keep_valid_elements() {
        assert_eq!(
            decode_field(BaseType::Uint16, &[1, 0, 0xFF, 0xFF, 3, 0]),
            Some(Value::Array(vec![Value::U16(1), Value::U16(3)]))
        );
        assert_eq!(decode_field(BaseType::Uint16, &[0xFF; 4]), None);
    }

    #[test]
    fn big_endian_is_normalised() {
        let mut bytes = [0x12, 0x34, 0x56, 0x78];
        BaseType::Uint16.normalise(&mut bytes, false);
        assert_eq!(bytes, [0x34, 0x12, 0x78, 0x56]);
    }

    #[test]
    fn encoding_saturates() {
        let encoded = encode_element(BaseType::Uint8, Number::Integer(300));
        assert_eq!(encoded, Some(vec![0xFF]));

        let encoded = encode_element(BaseType::Sint16, Number::Float(-40000.0));
        assert_eq!(encoded, Some(i16::MIN.to_le_bytes().to_vec()));

        let encoded = encode_element(BaseType::Uint16z, Number::Integer(-5));
        assert_eq!(encoded, Some(vec![0, 0]));
    }

    #[test]
    fn encoding_sentinel_is_omitted() {
        assert_eq!(encode_element(BaseType::Uint8, Number::Integer(255)), None);
        assert_eq!(encode_element(BaseType::Sint32, Number::Integer(i32::MAX as i128)), None);
        assert_eq!(encode_element(BaseType::Uint32z, Number::Float(0.2)), None);
        assert_eq!(encode_element(BaseType::Float64, Number::Float(f64::NAN)), None);
    }

    #[test]
    fn encoding_rounds_half_away_from_zero() {
        let resolution = Resolution::new(10.0, 0.0);
        let raw = resolution.encode(1.25);
        assert_eq!(encode_element(BaseType::Sint16, Number::Float(raw)), Some(vec![13, 0]));
        let raw = resolution.encode(-1.25);
        assert_eq!(
            encode_element(BaseType::Sint16, Number::Float(raw)),
            Some((-13i16).to_le_bytes().to_vec())
        );
    }

    #[test]
    fn strings_encode_verbatim() {
        let value = Value::String("Tempo".into());
        assert_eq!(encode_field(BaseType::String, &value), Some(b"Tempo".to_vec()));
        assert_eq!(encode_field(BaseType::String, &Value::String("".into())), None);
    }

    #[test]
    fn conversion_checks_range() {
        assert_eq!(u8::from_value(&Value::U16(200)), Some(200));
        assert_eq!(u8::from_value(&Value::U16(300)), None);
        assert_eq!(i32::from_value(&Value::F64(1.0)), None);
        assert_eq!(f64::from_value(&Value::I8(-3)), Some(-3.0));
    }

    proptest! {
        #[test]
        fn resolution_round_trips(
            raw in 0u32..0xFFFF_FFFE,
            scale in prop::sample::select(vec![1.0, 5.0, 100.0, 1000.0]),
            offset in prop::sample::select(vec![0.0, 500.0, 2500.0]),
        ) {
            let resolution = Resolution::new(scale, offset);
            let value = resolution.decode(raw as f64);
            let encoded = encode_element(BaseType::Uint32, Number::Float(resolution.encode(value)));
            prop_assert_eq!(encoded, Some(raw.to_le_bytes().to_vec()));
        }

        #[test]
        fn integers_round_trip(x in i16::MIN..i16::MAX) {
            let encoded = encode_element(BaseType::Sint16, Number::Integer(x as i128));
            let decoded = encoded.and_then(|b| decode_element(BaseType::Sint16, &b));
            prop_assert_eq!(decoded, Some(Value::I16(x)));
        }
    }
}
