#![cfg(feature = "std")]

use std::path::Path;

use cassette::{
    Error, Handler, Message, Registry,
    avec::{CrcCheck, Decoder, FromMessages},
    sans::{check::crc, data::Value, header::FileHeader, header::HeaderError},
};
use csv::ReaderBuilder;

const PATH: &str = "fixtures/morning-run.fit";

#[test]
fn decode_slice_morning_run() {
    let data = std::fs::read(PATH).unwrap();
    let mut validator = Validator::new(PATH);
    cassette::avec::decode_slice(&data, &mut validator).unwrap();
    validator.finish();
}

#[test]
fn decode_reader_morning_run() {
    let mut file = std::fs::File::open(PATH).unwrap();
    let mut validator = Validator::new(PATH);
    cassette::avec::decode_reader(&mut file, &mut validator).unwrap();
    validator.finish();
}

#[test]
fn decoder_is_reusable() {
    let data = std::fs::read(PATH).unwrap();
    let decoder = Decoder::default();

    let first = decoder.decode_all(&data).unwrap();
    let second = decoder.decode_all(&data).unwrap();
    assert_eq!(first.len(), 6);
    assert_eq!(first, second);
}

#[test]
fn compressed_timestamp() {
    let data = std::fs::read(PATH).unwrap();
    let messages = Decoder::default().decode_all(&data).unwrap();

    let compressed = &messages[4];
    assert_eq!(compressed.time_offset(), Some(5));
    assert_eq!(compressed.get::<u32>(253), Some(1_000_000_005));
    assert_eq!(messages[3].time_offset(), None);
}

#[test]
fn file_crc_mismatch() {
    let mut data = std::fs::read(PATH).unwrap();
    let last = data.len() - 1;
    data[last] ^= 0x80;

    let result = Decoder::default().decode_all(&data);
    assert!(matches!(result, Err(Error::InvalidFileCrc { .. })));

    let messages = Decoder::default()
        .with_crc(CrcCheck::Ignore)
        .decode_all(&data)
        .unwrap();
    assert_eq!(messages.len(), 6);
}

#[test]
fn file_crc_over_body() {
    // The fixture's trailer covers the header and body, as devices write it.
    let data = std::fs::read(PATH).unwrap();
    let header = FileHeader::decode(&data).unwrap();
    let body = &data[header.len()..data.len() - 2];

    let mut rewritten = data[..data.len() - 2].to_vec();
    rewritten.extend_from_slice(&crc(body).to_le_bytes());

    assert_eq!(Decoder::default().decode_all(&rewritten).unwrap().len(), 6);
}

#[test]
fn short_header_file_crc() {
    let body = [0x40, 0, 0, 20, 0, 1, 3, 1, 0x02, 0x00, 120];
    let mut data = FileHeader::new(0x20, 2140, body.len() as u32).encode();
    data[0] = 12;
    data.truncate(12);
    data.extend_from_slice(&body);

    let over_body = crc(&body);
    let over_file = crc(&data);
    let neither = (0..=u16::MAX)
        .find(|c| *c != over_body && *c != over_file)
        .unwrap();

    for trailer in [over_body, over_file] {
        let mut file = data.clone();
        file.extend_from_slice(&trailer.to_le_bytes());
        assert_eq!(Decoder::default().decode_all(&file).unwrap().len(), 1);
    }

    data.extend_from_slice(&neither.to_le_bytes());
    let result = Decoder::default().decode_all(&data);
    assert!(matches!(
        result,
        Err(Error::InvalidFileCrc { found, calculated }) if found == neither && calculated == over_body
    ));
}

#[test]
fn header_crc_mismatch() {
    let mut data = std::fs::read(PATH).unwrap();
    data[12] ^= 0x01;

    let result = Decoder::default().decode_all(&data);
    assert!(matches!(
        result,
        Err(Error::MalformedHeader(HeaderError::HeaderCrc { .. }))
    ));
}

#[test]
fn not_fit_data() {
    let mut data = std::fs::read(PATH).unwrap();
    data[8..12].copy_from_slice(b"JPEG");

    let result = Decoder::default().decode_all(&data);
    assert!(matches!(
        result,
        Err(Error::MalformedHeader(HeaderError::NotFitData))
    ));
}

#[test]
fn truncated_file() {
    let data = std::fs::read(PATH).unwrap();
    let result = Decoder::default().decode_all(&data[..100]);
    assert!(matches!(result, Err(Error::TruncatedRecord { .. })));

    let mut file = &data[..100];
    let result = Decoder::default().decode_reader(&mut file, |_| {});
    assert!(matches!(result, Err(Error::TruncatedRecord { .. })));
}

#[test]
fn empty_registry_consumes_everything() {
    let data = std::fs::read(PATH).unwrap();
    let messages = Decoder::new(Registry::new()).decode_all(&data).unwrap();
    assert!(messages.is_empty());
}

#[test]
fn undefined_local_message() {
    let data = file(&[0x03, 0x01]);
    let result = Decoder::default().decode_all(&data);
    assert!(matches!(result, Err(Error::UndefinedLocalSlot(3))));
}

#[test]
fn record_past_end_of_body() {
    // A record definition declaring four bytes, followed by two.
    let data = file(&[0x40, 0, 0, 20, 0, 1, 253, 4, 0x86, 0x00, 0x01, 0x02]);
    let result = Decoder::default().decode_all(&data);
    assert!(matches!(result, Err(Error::TruncatedRecord { .. })));
}

#[test]
fn unknown_base_type() {
    let data = file(&[0x40, 0, 0, 20, 0, 1, 3, 1, 0x1F]);
    let result = Decoder::default().decode_all(&data);
    assert!(matches!(result, Err(Error::UnknownBaseType(0x1F))));
}

#[test]
fn redefinition_replaces_layout() {
    let body = [
        &[0x40, 0, 0, 20, 0, 1, 3, 1, 0x02][..], // Heart rate.
        &[0x00, 120],
        &[0x40, 0, 0, 20, 0, 1, 4, 1, 0x02], // Cadence.
        &[0x00, 90],
    ]
    .concat();

    let messages = Decoder::default().decode_all(&file(&body)).unwrap();
    assert_eq!(messages[0].get::<u8>(3), Some(120));
    assert_eq!(messages[1].get::<u8>(3), None);
    assert_eq!(messages[1].get::<u8>(4), Some(90));
}

/// Field description for developer index 0, field 0, as `uint16`.
const DESCRIPTION: &[u8] = &[
    0x40, 0, 0, 206, 0, 3, 0, 1, 0x02, 1, 1, 0x02, 2, 1, 0x02, // Definition.
    0x00, 0, 0, 0x84, // Data.
];

/// Record with a timestamp and developer field 0 of index 0.
const DEVELOPER_RECORD: &[u8] = &[
    0x61, 0, 0, 20, 0, 1, 253, 4, 0x86, 1, 0, 2, 0, // Definition.
    0x01, 0x00, 0xCA, 0x9A, 0x3B, 0xFA, 0x00, // Data.
];

#[test]
fn developer_field_described_before_use() {
    let data = file(&[DESCRIPTION, DEVELOPER_RECORD].concat());
    let messages = Decoder::default().decode_all(&data).unwrap();

    assert_eq!(messages.len(), 1);
    let developer = messages[0].developer();
    assert_eq!(developer.len(), 1);
    assert_eq!(developer[0].value, Value::U16(250));
    assert_eq!(developer[0].raw(), &[0xFA, 0x00][..]);
}

#[test]
fn developer_field_described_after_use() {
    let data = file(&[DEVELOPER_RECORD, DESCRIPTION].concat());
    let messages = Decoder::default().decode_all(&data).unwrap();

    assert_eq!(messages.len(), 1);
    assert!(messages[0].developer().is_empty());
    assert_eq!(messages[0].get::<u32>(253), Some(1_000_000_000));
}

/// Wrap a body in an extended header and a trailing body CRC.
fn file(body: &[u8]) -> Vec<u8> {
    let mut w = FileHeader::new(0x20, 2140, body.len() as u32).encode();
    w.extend_from_slice(body);
    w.extend_from_slice(&crc(body).to_le_bytes());
    w
}

/// Compares decoded messages with rows of a CSV rendering: the message
/// number, then number and value pairs for each field, then `d`-prefixed
/// number and value pairs for each developer field.
struct Validator(Vec<Vec<String>>);

impl Validator {
    fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().with_extension("csv");

        let mut reader = ReaderBuilder::new()
            .flexible(true)
            .has_headers(false)
            .from_path(path)
            .unwrap();

        let expected: Vec<Vec<String>> = reader
            .records()
            .map(|r| r.unwrap().iter().map(|f| f.to_string()).collect())
            .collect();

        Self(expected)
    }

    fn finish(self) {
        assert!(self.0.is_empty(), "{} messages not decoded", self.0.len());
    }
}

impl FromMessages for Validator {
    const HANDLERS: &'static [Handler] = cassette::profile::HANDLERS;

    fn add_message(&mut self, message: Message) {
        assert_eq!(render_message(&message), self.0.remove(0));
    }
}

fn render_message(message: &Message) -> Vec<String> {
    let mut row = vec![message.number().to_string()];

    for number in message.fields().numbers() {
        row.push(number.to_string());
        row.push(render(&message.value(number).unwrap()));
    }

    for value in message.developer() {
        row.push(format!("d{}", value.number));
        row.push(render(&value.value));
    }

    row
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bytes(b) => b.iter().map(|x| format!("{x:02x}")).collect(),
        Value::Array(elements) => elements.iter().map(render).collect::<Vec<_>>().join(";"),
        value => match value.as_integer() {
            Some(x) => x.to_string(),
            None => value.as_f64().unwrap().to_string(),
        },
    }
}
