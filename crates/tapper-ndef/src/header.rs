pub const FLAG_MB: u8 = 0x80;
pub const FLAG_ME: u8 = 0x40;
pub const FLAG_CF: u8 = 0x20;
pub const FLAG_SR: u8 = 0x10;
pub const FLAG_IL: u8 = 0x08;
pub const TNF_MASK: u8 = 0x07;

/// Header of a single record as it appears on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NdefHeader {
    pub message_begin: bool,
    pub message_end: bool,
    pub chunked: bool,
    pub short_record: bool,
    pub has_id_length: bool,
    /// Raw 3 bit value, the reserved value 7 is kept so the decoder can reject it
    pub type_name_format: u8,
    pub type_length: u8,
    pub payload_length: u32,
    pub id_length: Option<u8>,
}

impl NdefHeader {
    pub fn flags(&self) -> u8 {
        let mut flags = self.type_name_format & TNF_MASK;

        if self.message_begin {
            flags |= FLAG_MB;
        }
        if self.message_end {
            flags |= FLAG_ME;
        }
        if self.chunked {
            flags |= FLAG_CF;
        }
        if self.short_record {
            flags |= FLAG_SR;
        }
        if self.has_id_length {
            flags |= FLAG_IL;
        }

        flags
    }

    /// Write the header bytes, the short record form uses a single byte payload length
    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.push(self.flags());
        out.push(self.type_length);

        if self.short_record {
            out.push(self.payload_length as u8);
        } else {
            out.extend_from_slice(&self.payload_length.to_be_bytes());
        }

        if let Some(id_length) = self.id_length {
            out.push(id_length);
        }
    }

    pub fn encoded_len(&self) -> usize {
        let payload_length_len = if self.short_record { 1 } else { 4 };
        let id_length_len = usize::from(self.id_length.is_some());

        2 + payload_length_len + id_length_len
    }
}
