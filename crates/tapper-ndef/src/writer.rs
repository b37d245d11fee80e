use crate::{header::NdefHeader, record::NdefRecord};

/// Header for a record, short form when the payload fits in one length byte
pub fn header_for(record: &NdefRecord, message_begin: bool, message_end: bool) -> NdefHeader {
    let short_record = record.payload.len() <= u8::MAX as usize;
    let has_id_length = !record.id.is_empty();

    NdefHeader {
        message_begin,
        message_end,
        chunked: false,
        short_record,
        has_id_length,
        type_name_format: record.tnf.tnf(),
        type_length: record.type_.len() as u8,
        payload_length: record.payload.len() as u32,
        id_length: has_id_length.then_some(record.id.len() as u8),
    }
}

/// Write one record, the caller is responsible for having validated it
pub fn write_record(record: &NdefRecord, message_begin: bool, message_end: bool, out: &mut Vec<u8>) {
    let header = header_for(record, message_begin, message_end);

    header.write_to(out);
    out.extend_from_slice(&record.type_);
    out.extend_from_slice(&record.id);
    out.extend_from_slice(&record.payload);
}

pub fn encoded_record_len(record: &NdefRecord) -> usize {
    let header = header_for(record, false, false);
    header.encoded_len() + record.type_.len() + record.id.len() + record.payload.len()
}

/// Write records as one message, flags the first with message begin and the last with
/// message end
pub fn write_records(records: &[NdefRecord], out: &mut Vec<u8>) {
    let last = records.len().saturating_sub(1);

    for (index, record) in records.iter().enumerate() {
        write_record(record, index == 0, index == last, out);
    }
}
