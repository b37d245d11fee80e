use winnow::Parser as _;

use crate::{NdefError, Result, parser};

/// Type of the well known text record
pub const RTD_TEXT: &[u8] = b"T";

/// Type of the well known URI record
pub const RTD_URI: &[u8] = b"U";

#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct TextPayload {
    pub format: TextPayloadFormat,
    pub language: String,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum TextPayloadFormat {
    Utf8,
    Utf16,
}

impl TextPayload {
    pub fn new(text: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            format: TextPayloadFormat::Utf8,
            language: language.into(),
            text: text.into(),
        }
    }

    pub fn decode(payload: &[u8]) -> Result<Self> {
        if payload.is_empty() {
            return Err(NdefError::Malformed("text payload has no status byte".into()));
        }

        parser::parse_text_payload
            .parse_next(&mut parser::stream::new(payload))
            .map_err(NdefError::from_winnow)
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let language = self.language.as_bytes();

        // 6 bits for the language code length
        if language.len() > 0x3F {
            return Err(NdefError::InvalidRecord(format!(
                "language code is {} bytes, at most 63 allowed",
                language.len()
            )));
        }

        let mut status = language.len() as u8;
        let text = match self.format {
            TextPayloadFormat::Utf8 => self.text.as_bytes().to_vec(),
            TextPayloadFormat::Utf16 => {
                status |= 0x80;
                self.text.encode_utf16().flat_map(u16::to_be_bytes).collect()
            }
        };

        let mut payload = Vec::with_capacity(1 + language.len() + text.len());
        payload.push(status);
        payload.extend_from_slice(language);
        payload.extend_from_slice(&text);

        Ok(payload)
    }
}

/// Encode a URI using the longest matching abbreviation from [`URI_PREFIXES`]
pub fn encode_uri(uri: &str) -> Vec<u8> {
    let (code, prefix) = URI_PREFIXES
        .iter()
        .enumerate()
        .skip(1)
        .filter(|(_, prefix)| uri.starts_with(**prefix))
        .max_by_key(|(_, prefix)| prefix.len())
        .unwrap_or((0, &""));

    let rest = &uri.as_bytes()[prefix.len()..];

    let mut payload = Vec::with_capacity(1 + rest.len());
    payload.push(code as u8);
    payload.extend_from_slice(rest);
    payload
}

pub fn decode_uri(payload: &[u8]) -> Result<String> {
    let Some((&code, rest)) = payload.split_first() else {
        return Err(NdefError::Malformed("uri payload has no prefix byte".into()));
    };

    // unknown codes are treated as no abbreviation
    let prefix = URI_PREFIXES.get(code as usize).copied().unwrap_or_default();
    let rest = std::str::from_utf8(rest)
        .map_err(|error| NdefError::Malformed(format!("uri is not utf-8: {error}")))?;

    Ok(format!("{prefix}{rest}"))
}

/// URI prefix codes as defined in NFC Forum RTD URI specification
pub const URI_PREFIXES: &[&str] = &[
    "",                           // 0x00 - no prepending
    "http://www.",                // 0x01
    "https://www.",               // 0x02
    "http://",                    // 0x03
    "https://",                   // 0x04
    "tel:",                       // 0x05
    "mailto:",                    // 0x06
    "ftp://anonymous:anonymous@", // 0x07
    "ftp://ftp.",                 // 0x08
    "ftps://",                    // 0x09
    "sftp://",                    // 0x0A
    "smb://",                     // 0x0B
    "nfs://",                     // 0x0C
    "ftp://",                     // 0x0D
    "dav://",                     // 0x0E
    "news:",                      // 0x0F
    "telnet://",                  // 0x10
    "imap:",                      // 0x11
    "rtsp://",                    // 0x12
    "urn:",                       // 0x13
    "pop:",                       // 0x14
    "sip:",                       // 0x15
    "sips:",                      // 0x16
    "tftp:",                      // 0x17
    "btspp://",                   // 0x18
    "btl2cap://",                 // 0x19
    "btgoep://",                  // 0x1A
    "tcpobex://",                 // 0x1B
    "irdaobex://",                // 0x1C
    "file://",                    // 0x1D
    "urn:epc:id:",                // 0x1E
    "urn:epc:tag:",               // 0x1F
    "urn:epc:pat:",               // 0x20
    "urn:epc:raw:",               // 0x21
    "urn:epc:",                   // 0x22
    "urn:nfc:",                   // 0x23
];
