use crate::{
    MAX_FIELD_LENGTH, MAX_PAYLOAD_SIZE, NdefError, Result,
    ndef_type::NdefType,
    parser,
    payload::{self, RTD_TEXT, RTD_URI, TextPayload},
    writer,
};

/// One structured record: type name format, type, id and payload
///
/// Fields are public so hosts can build records directly, [`NdefRecord::validate`]
/// runs again whenever a record is encoded or added to a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, uniffi::Record)]
pub struct NdefRecord {
    pub tnf: NdefType,
    pub type_: Vec<u8>,
    pub id: Vec<u8>,
    pub payload: Vec<u8>,
}

impl NdefRecord {
    pub fn try_new(tnf: NdefType, type_: Vec<u8>, id: Vec<u8>, payload: Vec<u8>) -> Result<Self> {
        let record = Self {
            tnf,
            type_,
            id,
            payload,
        };

        record.validate()?;
        Ok(record)
    }

    /// Record with the empty type name format and no fields
    pub fn empty() -> Self {
        Self {
            tnf: NdefType::Empty,
            type_: Vec::new(),
            id: Vec::new(),
            payload: Vec::new(),
        }
    }

    /// Well known text record, UTF-8 encoded
    pub fn text(text: &str, language: &str) -> Result<Self> {
        let payload = TextPayload::new(text, language).encode()?;
        Self::try_new(NdefType::WellKnown, RTD_TEXT.to_vec(), Vec::new(), payload)
    }

    /// Well known URI record, the scheme is abbreviated when possible
    pub fn uri(uri: &str) -> Result<Self> {
        if uri.is_empty() {
            return Err(NdefError::InvalidRecord("uri is empty".into()));
        }

        let payload = payload::encode_uri(uri);
        Self::try_new(NdefType::WellKnown, RTD_URI.to_vec(), Vec::new(), payload)
    }

    /// MIME media record, the type is lower cased
    pub fn mime(mime_type: &str, payload: Vec<u8>) -> Result<Self> {
        let mime_type = mime_type.trim().to_ascii_lowercase();

        match mime_type.split_once('/') {
            Some((kind, subtype)) if !kind.is_empty() && !subtype.is_empty() => {}
            _ => {
                return Err(NdefError::InvalidRecord(format!(
                    "mime type {mime_type:?} is not of the form type/subtype"
                )));
            }
        }

        Self::try_new(NdefType::Mime, mime_type.into_bytes(), Vec::new(), payload)
    }

    /// External type record, stored as `domain:type` lower cased
    pub fn external(domain: &str, type_: &str, payload: Vec<u8>) -> Result<Self> {
        let domain = domain.trim().to_ascii_lowercase();
        let type_ = type_.trim().to_ascii_lowercase();

        if domain.is_empty() || type_.is_empty() {
            return Err(NdefError::InvalidRecord("external domain and type are required".into()));
        }

        let full_type = format!("{domain}:{type_}").into_bytes();
        Self::try_new(NdefType::External, full_type, Vec::new(), payload)
    }

    /// Check the fields against the rules of the type name format
    pub fn validate(&self) -> Result<()> {
        if self.type_.len() > MAX_FIELD_LENGTH {
            return Err(invalid(format!("type is {} bytes, at most 255 allowed", self.type_.len())));
        }

        if self.id.len() > MAX_FIELD_LENGTH {
            return Err(invalid(format!("id is {} bytes, at most 255 allowed", self.id.len())));
        }

        if self.payload.len() as u64 > u64::from(MAX_PAYLOAD_SIZE) {
            return Err(NdefError::PayloadTooLarge {
                size: self.payload.len() as u64,
                max: MAX_PAYLOAD_SIZE,
            });
        }

        match self.tnf {
            NdefType::Empty => {
                if !self.type_.is_empty() || !self.id.is_empty() || !self.payload.is_empty() {
                    return Err(invalid("empty record must not carry a type, id or payload"));
                }
            }
            NdefType::Unknown => {
                if !self.type_.is_empty() {
                    return Err(invalid("unknown record must not carry a type"));
                }
            }
            NdefType::Unchanged => {
                return Err(invalid("unchanged type name format is only valid inside chunks"));
            }
            NdefType::WellKnown | NdefType::Mime | NdefType::AbsoluteUri | NdefType::External => {}
        }

        Ok(())
    }

    /// Standalone wire form with both message begin and end flags set
    pub fn encode(&self) -> Result<Vec<u8>> {
        self.validate()?;

        let mut out = Vec::with_capacity(writer::encoded_record_len(self));
        writer::write_record(self, true, true, &mut out);
        Ok(out)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        parser::parse_single_record(bytes)
    }

    pub fn is_well_known(&self, rtd: &[u8]) -> bool {
        self.tnf == NdefType::WellKnown && self.type_ == rtd
    }

    /// Text content if this is a well known text record
    pub fn as_text(&self) -> Option<TextPayload> {
        if !self.is_well_known(RTD_TEXT) {
            return None;
        }

        TextPayload::decode(&self.payload).ok()
    }

    /// Full URI if this is a well known URI or an absolute URI record
    pub fn as_uri(&self) -> Option<String> {
        match self.tnf {
            NdefType::WellKnown if self.type_ == RTD_URI => payload::decode_uri(&self.payload).ok(),
            NdefType::AbsoluteUri => String::from_utf8(self.type_.clone()).ok(),
            _ => None,
        }
    }

    /// Type as a string, record types are ASCII in practice
    pub fn type_string(&self) -> String {
        String::from_utf8_lossy(&self.type_).to_string()
    }
}

fn invalid(message: impl Into<String>) -> NdefError {
    NdefError::InvalidRecord(message.into())
}
