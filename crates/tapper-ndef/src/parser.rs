pub mod stream;

use stream::{Stream, StreamExt as _};
use tracing::trace;
use winnow::{
    ModalResult, Parser,
    binary::{
        Endianness,
        bits::{bits, bool as take_bool, take as take_bits},
    },
    error::{ContextError, ErrMode, Needed},
    token::{any, take},
};

use crate::{
    MAX_PAYLOAD_SIZE, NdefError, Result, header::NdefHeader, message::NdefMessage,
    ndef_type::NdefType, payload::TextPayload, payload::TextPayloadFormat, record::NdefRecord,
};

/// A record as framed on the wire, before chunk reassembly and validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawRecord<'i> {
    pub header: NdefHeader,
    pub type_: &'i [u8],
    pub id: &'i [u8],
    pub payload: &'i [u8],
}

/// Payload of a chunked record collected so far
struct ChunkedRecord {
    tnf: u8,
    type_: Vec<u8>,
    id: Vec<u8>,
    payload: Vec<u8>,
}

impl NdefError {
    pub(crate) fn from_winnow(error: ErrMode<ContextError>) -> Self {
        match error {
            ErrMode::Incomplete(Needed::Size(size)) => NdefError::Truncated {
                missing: u32::try_from(size.get()).ok(),
            },
            ErrMode::Incomplete(Needed::Unknown) => NdefError::Truncated { missing: None },
            error => NdefError::Malformed(error.to_string()),
        }
    }
}

/// Decode a complete message, the first record must carry the message begin flag and
/// the last one the message end flag
pub fn parse_ndef_message(bytes: &[u8]) -> Result<NdefMessage> {
    if bytes.is_empty() {
        return Ok(NdefMessage::default());
    }

    let mut input = stream::new(bytes);
    let mut records = Vec::new();
    let mut chunk: Option<ChunkedRecord> = None;

    loop {
        let raw = parse_raw_record(&mut input)?;
        let header = raw.header;
        let in_chunk = chunk.is_some();

        if !header.message_begin && records.is_empty() && !in_chunk {
            return Err(malformed("expected message begin flag on the first record"));
        }

        if header.message_begin && (!records.is_empty() || in_chunk) {
            return Err(malformed("unexpected message begin flag"));
        }

        match (chunk.take(), header.chunked) {
            // plain record
            (None, false) => {
                let record = record_from_parts(
                    header.type_name_format,
                    raw.type_.to_vec(),
                    raw.id.to_vec(),
                    raw.payload.to_vec(),
                )?;

                records.push(record);
            }

            // first chunk
            (None, true) => {
                check_first_chunk(&raw)?;
                chunk = Some(ChunkedRecord {
                    tnf: header.type_name_format,
                    type_: raw.type_.to_vec(),
                    id: raw.id.to_vec(),
                    payload: raw.payload.to_vec(),
                });
            }

            // middle or last chunk
            (Some(mut partial), chunked) => {
                check_following_chunk(&raw)?;
                append_chunk(&mut partial.payload, raw.payload)?;

                if chunked {
                    chunk = Some(partial);
                } else {
                    trace!("reassembled chunked record of {} bytes", partial.payload.len());
                    let record = record_from_parts(
                        partial.tnf,
                        partial.type_,
                        partial.id,
                        partial.payload,
                    )?;

                    records.push(record);
                }
            }
        }

        if header.message_end {
            break;
        }
    }

    if !input.is_empty() {
        return Err(NdefError::TrailingData {
            remaining: input.len() as u32,
        });
    }

    Ok(NdefMessage::from_validated(records))
}

/// Decode exactly one unchunked record, message begin and end flags are ignored
pub fn parse_single_record(bytes: &[u8]) -> Result<NdefRecord> {
    let mut input = stream::new(bytes);
    let raw = parse_raw_record(&mut input)?;

    if raw.header.chunked {
        return Err(malformed("a chunked record can not be decoded on its own"));
    }

    if !input.is_empty() {
        return Err(NdefError::TrailingData {
            remaining: input.len() as u32,
        });
    }

    record_from_parts(
        raw.header.type_name_format,
        raw.type_.to_vec(),
        raw.id.to_vec(),
        raw.payload.to_vec(),
    )
}

/// Parse the header and the three length prefixed fields of one record
pub fn parse_raw_record<'i>(input: &mut Stream<'i>) -> Result<RawRecord<'i>> {
    let header = parse_header.parse_next(input).map_err(NdefError::from_winnow)?;
    check_payload_size(u64::from(header.payload_length))?;

    let (type_, id, payload) = parse_fields(input, &header).map_err(NdefError::from_winnow)?;

    Ok(RawRecord {
        header,
        type_,
        id,
        payload,
    })
}

pub fn parse_header(input: &mut Stream<'_>) -> ModalResult<NdefHeader> {
    let (message_begin, message_end, chunked, short_record, has_id_length, type_name_format) =
        parse_header_byte(input)?;

    let type_length = winnow::binary::u8.parse_next(input)?;

    let payload_length = if short_record {
        any.map(|x: u8| x as u32).parse_next(input)?
    } else {
        winnow::binary::u32(Endianness::Big).parse_next(input)?
    };

    let id_length = if has_id_length {
        Some(any.parse_next(input)?)
    } else {
        None
    };

    Ok(NdefHeader {
        message_begin,
        message_end,
        chunked,
        short_record,
        has_id_length,
        type_name_format,
        type_length,
        payload_length,
        id_length,
    })
}

/// Decode a well known text payload: status byte, language code, then the text
pub fn parse_text_payload(input: &mut Stream<'_>) -> ModalResult<TextPayload> {
    let (is_utf16, language_code_length): (bool, u8) =
        bits::<_, _, ErrMode<ContextError>, _, _>((take_bool, take_bits(7_u8)))
            .parse_next(input)?;

    // bit 6 is reserved, only the low 6 bits carry the length
    let language_code_length = language_code_length & 0x3F;
    let language_code: &[u8] = take(language_code_length as usize).parse_next(input)?;

    let remaining = input.len();
    let text: &[u8] = take(remaining).parse_next(input)?;

    let (format, text) = if is_utf16 {
        let units = text
            .chunks_exact(2)
            .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
            .collect::<Vec<u16>>();

        (TextPayloadFormat::Utf16, String::from_utf16_lossy(&units))
    } else {
        (TextPayloadFormat::Utf8, String::from_utf8_lossy(text).to_string())
    };

    Ok(TextPayload {
        format,
        language: String::from_utf8_lossy(language_code).to_string(),
        text,
    })
}

// private
fn parse_header_byte(input: &mut Stream<'_>) -> ModalResult<(bool, bool, bool, bool, bool, u8)> {
    bits::<_, _, ErrMode<ContextError>, _, _>((
        take_bool,
        take_bool,
        take_bool,
        take_bool,
        take_bool,
        take_bits(3_u8),
    ))
    .parse_next(input)
}

fn parse_fields<'i>(
    input: &mut Stream<'i>,
    header: &NdefHeader,
) -> ModalResult<(&'i [u8], &'i [u8], &'i [u8])> {
    let type_: &[u8] = take(header.type_length as usize).parse_next(input)?;
    let id: &[u8] = take(header.id_length.unwrap_or(0) as usize).parse_next(input)?;
    let payload: &[u8] = take(header.payload_length as usize).parse_next(input)?;

    Ok((type_, id, payload))
}

fn check_payload_size(size: u64) -> Result<()> {
    if size > u64::from(MAX_PAYLOAD_SIZE) {
        return Err(NdefError::PayloadTooLarge {
            size,
            max: MAX_PAYLOAD_SIZE,
        });
    }

    Ok(())
}

fn check_first_chunk(raw: &RawRecord<'_>) -> Result<()> {
    let header = raw.header;

    if header.message_end {
        return Err(malformed("unexpected message end flag in a non trailing chunk"));
    }

    if header.type_name_format == NdefType::Unchanged.tnf() {
        return Err(malformed("unexpected unchanged type name format in the first chunk"));
    }

    if header.type_length == 0 && header.type_name_format != NdefType::Unknown.tnf() {
        return Err(malformed("expected a type in the first chunk"));
    }

    Ok(())
}

fn check_following_chunk(raw: &RawRecord<'_>) -> Result<()> {
    let header = raw.header;

    if header.has_id_length {
        return Err(malformed("unexpected id length flag in a non leading chunk"));
    }

    if header.chunked && header.message_end {
        return Err(malformed("unexpected message end flag in a non trailing chunk"));
    }

    if header.type_name_format != NdefType::Unchanged.tnf() {
        return Err(malformed("expected unchanged type name format in a non leading chunk"));
    }

    if header.type_length != 0 {
        return Err(malformed("expected an empty type in a non leading chunk"));
    }

    Ok(())
}

fn append_chunk(payload: &mut Vec<u8>, chunk: &[u8]) -> Result<()> {
    check_payload_size((payload.len() + chunk.len()) as u64)?;
    payload.extend_from_slice(chunk);
    Ok(())
}

fn record_from_parts(tnf: u8, type_: Vec<u8>, id: Vec<u8>, payload: Vec<u8>) -> Result<NdefRecord> {
    let tnf = NdefType::try_from(tnf)?;
    if tnf == NdefType::Unchanged {
        return Err(malformed("unexpected unchanged type name format outside a chunk"));
    }

    let record = NdefRecord {
        tnf,
        type_,
        id,
        payload,
    };

    record
        .validate()
        .map_err(|error| NdefError::Malformed(error.to_string()))?;

    Ok(record)
}

fn malformed(message: &str) -> NdefError {
    NdefError::Malformed(message.to_string())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn hello_record_bytes() -> Vec<u8> {
        // well known "T", en, "hello"
        vec![0xD1, 0x01, 0x08, b'T', 0x02, b'e', b'n', b'h', b'e', b'l', b'l', b'o']
    }

    #[test]
    fn known_header_parse() {
        let mut header_bytes = stream::new(&[0xD1, 0x01, 0x0D, 0x55, 0x02]);
        let header: NdefHeader = parse_header(&mut header_bytes).unwrap();

        assert!(header.message_begin);
        assert!(header.message_end);
        assert!(!header.chunked);
        assert!(header.short_record);
        assert!(!header.has_id_length);
        assert_eq!(header.type_name_format, 1);
        assert_eq!(header.type_length, 1);
        assert_eq!(header.payload_length, 13);
        assert_eq!(header_bytes.len(), 2);
    }

    #[test]
    fn long_header_parse() {
        let mut header_bytes = stream::new(&[0xCA, 0x02, 0x00, 0x00, 0x01, 0x00, 0x03]);
        let header = parse_header(&mut header_bytes).unwrap();

        assert!(!header.short_record);
        assert!(header.has_id_length);
        assert_eq!(header.type_name_format, 2);
        assert_eq!(header.payload_length, 256);
        assert_eq!(header.id_length, Some(3));
    }

    #[test]
    fn parse_single_text_record_message() {
        let message = parse_ndef_message(&hello_record_bytes()).unwrap();
        assert_eq!(message.len(), 1);

        let record = &message.records()[0];
        assert_eq!(record.tnf, NdefType::WellKnown);
        assert_eq!(record.type_, b"T");
        assert!(record.id.is_empty());

        let text = record.as_text().unwrap();
        assert_eq!(text.language, "en");
        assert_eq!(text.text, "hello");
    }

    #[test]
    fn truncated_length_prefix_is_malformed_not_a_panic() {
        // short record flag cleared, payload length needs 4 bytes but only 2 are left
        let result = parse_ndef_message(&[0xC2, 0x03, 0x00, 0x01]);
        assert!(matches!(result, Err(NdefError::Truncated { .. })));

        // header says 8 bytes of payload, only 3 present
        let mut bytes = hello_record_bytes();
        bytes.truncate(7);
        let result = parse_ndef_message(&bytes);
        assert_eq!(result, Err(NdefError::Truncated { missing: Some(5) }));
    }

    #[test]
    fn oversized_payload_length_is_rejected_before_reading() {
        let result = parse_ndef_message(&[0xC2, 0x01, 0xFF, 0xFF, 0xFF, 0xFF, b'a']);
        assert_eq!(
            result,
            Err(NdefError::PayloadTooLarge {
                size: u64::from(u32::MAX),
                max: MAX_PAYLOAD_SIZE
            })
        );
    }

    #[test]
    fn missing_message_begin_is_malformed() {
        let mut bytes = hello_record_bytes();
        bytes[0] &= !crate::header::FLAG_MB;

        assert!(matches!(parse_ndef_message(&bytes), Err(NdefError::Malformed(_))));
    }

    #[test]
    fn missing_message_end_is_truncated() {
        let mut bytes = hello_record_bytes();
        bytes[0] &= !crate::header::FLAG_ME;

        assert!(matches!(parse_ndef_message(&bytes), Err(NdefError::Truncated { .. })));
    }

    #[test]
    fn second_message_begin_is_malformed() {
        let mut bytes = hello_record_bytes();
        bytes[0] &= !crate::header::FLAG_ME;
        bytes.extend(hello_record_bytes());

        assert!(matches!(parse_ndef_message(&bytes), Err(NdefError::Malformed(_))));
    }

    #[test]
    fn bytes_after_message_end_are_rejected() {
        let mut bytes = hello_record_bytes();
        bytes.extend([0x00, 0x00]);

        assert_eq!(
            parse_ndef_message(&bytes),
            Err(NdefError::TrailingData { remaining: 2 })
        );
    }

    #[test]
    fn reserved_type_name_format_is_rejected() {
        assert!(matches!(
            parse_ndef_message(&[0xD7, 0x00, 0x00]),
            Err(NdefError::Malformed(_))
        ));
    }

    #[test]
    fn chunked_record_is_reassembled() {
        let bytes = vec![
            // first chunk: MB CF SR, mime "a/b", payload "he"
            0xB2, 0x03, 0x02, b'a', b'/', b'b', b'h', b'e',
            // middle chunk: CF SR, unchanged, payload "ll"
            0x36, 0x00, 0x02, b'l', b'l',
            // last chunk: ME SR, unchanged, payload "o"
            0x56, 0x00, 0x01, b'o',
        ];

        let message = parse_ndef_message(&bytes).unwrap();
        assert_eq!(message.len(), 1);

        let record = &message.records()[0];
        assert_eq!(record.tnf, NdefType::Mime);
        assert_eq!(record.type_, b"a/b");
        assert_eq!(record.payload, b"hello");
    }

    #[test]
    fn chunk_continuation_must_be_unchanged() {
        let bytes = vec![0xB2, 0x03, 0x01, b'a', b'/', b'b', b'h', 0x52, 0x00, 0x01, b'i'];
        assert!(matches!(parse_ndef_message(&bytes), Err(NdefError::Malformed(_))));
    }

    #[test]
    fn unchanged_outside_chunk_is_rejected() {
        assert!(matches!(
            parse_ndef_message(&[0xD6, 0x00, 0x00]),
            Err(NdefError::Malformed(_))
        ));
    }

    #[test]
    fn empty_record_with_payload_is_rejected() {
        assert!(matches!(
            parse_ndef_message(&[0xD0, 0x00, 0x01, 0xAA]),
            Err(NdefError::Malformed(_))
        ));
    }

    #[test]
    fn empty_input_is_an_empty_message() {
        assert!(parse_ndef_message(&[]).unwrap().is_empty());
    }

    #[test]
    fn single_record_ignores_message_flags() {
        let mut bytes = hello_record_bytes();
        bytes[0] &= !(crate::header::FLAG_MB | crate::header::FLAG_ME);

        let record = parse_single_record(&bytes).unwrap();
        assert_eq!(record.type_, b"T");
    }

    #[test]
    fn text_payload_utf16() {
        let payload = [0x82, b'e', b'n', 0x00, b'h', 0x00, b'i'];
        let text = parse_text_payload(&mut stream::new(&payload)).unwrap();

        assert_eq!(text.format, TextPayloadFormat::Utf16);
        assert_eq!(text.language, "en");
        assert_eq!(text.text, "hi");
    }
}
