//! JSON shape used to pass records and scanned tags across the host boundary
//!
//! Hosts whose byte type is signed may send `-128..=127`, unsigned values up to
//! `255` are accepted too. Outgoing bytes are always unsigned.

use serde::{Deserialize, Deserializer, Serialize, de::Error as _};
use tapper_ndef::{NdefMessage, NdefRecord, NdefType};

use crate::{
    error::{Result, TagError},
    session::ScannedTag,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireRecord {
    pub tnf: u8,

    #[serde(default, deserialize_with = "host_bytes")]
    pub id: Vec<u8>,

    #[serde(default, deserialize_with = "host_bytes")]
    pub ndef_data: Vec<u8>,

    /// Type field as text, the mime type for mime records
    #[serde(default)]
    pub mime_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireTag {
    pub tag_serial: String,
    pub ndef_records: Vec<WireRecord>,
}

impl From<&NdefRecord> for WireRecord {
    fn from(record: &NdefRecord) -> Self {
        Self {
            tnf: record.tnf.tnf(),
            id: record.id.clone(),
            ndef_data: record.payload.clone(),
            mime_type: record.type_string(),
        }
    }
}

impl TryFrom<WireRecord> for NdefRecord {
    type Error = TagError;

    fn try_from(wire: WireRecord) -> Result<Self> {
        let tnf = NdefType::from_tnf(wire.tnf)
            .ok_or_else(|| TagError::InvalidInput(format!("unknown tnf {}", wire.tnf)))?;

        NdefRecord::try_new(tnf, wire.mime_type.into_bytes(), wire.id, wire.ndef_data)
            .map_err(TagError::from_input)
    }
}

impl From<&ScannedTag> for WireTag {
    fn from(tag: &ScannedTag) -> Self {
        Self {
            tag_serial: tag.serial.clone(),
            ndef_records: tag.records.iter().map(WireRecord::from).collect(),
        }
    }
}

pub fn records_from_json(json: &str) -> Result<Vec<NdefRecord>> {
    let wire: Vec<WireRecord> =
        serde_json::from_str(json).map_err(|error| TagError::InvalidInput(error.to_string()))?;

    wire.into_iter().map(NdefRecord::try_from).collect()
}

pub fn message_from_json(json: &str) -> Result<NdefMessage> {
    let records = records_from_json(json)?;
    NdefMessage::try_new(records).map_err(TagError::from_input)
}

pub fn records_to_json(records: &[NdefRecord]) -> Result<String> {
    let wire = records.iter().map(WireRecord::from).collect::<Vec<_>>();
    serde_json::to_string(&wire).map_err(|error| TagError::InvalidInput(error.to_string()))
}

pub fn tag_to_json(tag: &ScannedTag) -> Result<String> {
    serde_json::to_string(&WireTag::from(tag)).map_err(|error| TagError::InvalidInput(error.to_string()))
}

/// Reinterpret signed host bytes, `-1` becomes `0xFF`
pub fn to_unsigned(bytes: &[i8]) -> Vec<u8> {
    bytes.iter().map(|&byte| byte as u8).collect()
}

pub fn to_signed(bytes: &[u8]) -> Vec<i8> {
    bytes.iter().map(|&byte| byte as i8).collect()
}

/// Accepts either signed or unsigned byte values, anything else is rejected
pub fn unsigned_from_int(value: i64) -> Result<u8> {
    match value {
        -128..=255 => Ok((value & 0xFF) as u8),
        _ => Err(TagError::InvalidInput(format!("{value} is not a byte"))),
    }
}

fn host_bytes<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    Vec::<i64>::deserialize(deserializer)?
        .into_iter()
        .map(|value| unsigned_from_int(value).map_err(D::Error::custom))
        .collect()
}

#[uniffi::export]
fn wire_records_from_json(json: String) -> Result<Vec<NdefRecord>> {
    records_from_json(&json)
}

#[uniffi::export]
fn wire_records_to_json(records: Vec<NdefRecord>) -> Result<String> {
    records_to_json(&records)
}

#[uniffi::export]
fn wire_tag_to_json(tag: ScannedTag) -> Result<String> {
    tag_to_json(&tag)
}
