use crate::{NdefError, NdefMessage, NdefRecord, payload::TextPayload};

#[uniffi::export]
fn ndef_encode_message(records: Vec<NdefRecord>) -> Result<Vec<u8>, NdefError> {
    Ok(NdefMessage::try_new(records)?.encode())
}

#[uniffi::export]
fn ndef_decode_message(data: Vec<u8>) -> Result<Vec<NdefRecord>, NdefError> {
    Ok(NdefMessage::decode(&data)?.into_records())
}

#[uniffi::export]
fn ndef_encode_record(record: NdefRecord) -> Result<Vec<u8>, NdefError> {
    record.encode()
}

#[uniffi::export]
fn ndef_decode_record(data: Vec<u8>) -> Result<NdefRecord, NdefError> {
    NdefRecord::decode(&data)
}

#[uniffi::export]
fn ndef_text_record(text: String, language: String) -> Result<NdefRecord, NdefError> {
    NdefRecord::text(&text, &language)
}

#[uniffi::export]
fn ndef_uri_record(uri: String) -> Result<NdefRecord, NdefError> {
    NdefRecord::uri(&uri)
}

#[uniffi::export]
fn ndef_mime_record(mime_type: String, payload: Vec<u8>) -> Result<NdefRecord, NdefError> {
    NdefRecord::mime(&mime_type, payload)
}

#[uniffi::export]
fn ndef_record_text(record: NdefRecord) -> Option<TextPayload> {
    record.as_text()
}

#[uniffi::export]
fn ndef_record_uri(record: NdefRecord) -> Option<String> {
    record.as_uri()
}
