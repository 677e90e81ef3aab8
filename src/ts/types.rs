use crate::utils::Crc32Mpeg2;
use bytes::{BufMut, BytesMut};

// PIDs
/// Base of the pseudo PIDs given to subtitle pages carried inside teletext.
pub const PID_TELETEXT_SUBTITLE_BASE: u16 = 0x2000;

// Table IDs
pub const TABLE_ID_PMT: u8 = 0x02;
pub const TABLE_ID_AIT: u8 = 0x74;

// Elementary Stream Types (ISO/IEC 13818-1 table 2-34 and common extensions)
pub const STREAM_TYPE_MPEG1_VIDEO: u8 = 0x01;
pub const STREAM_TYPE_MPEG2_VIDEO: u8 = 0x02;
pub const STREAM_TYPE_MPEG1_AUDIO: u8 = 0x03;
pub const STREAM_TYPE_MPEG2_AUDIO: u8 = 0x04;
pub const STREAM_TYPE_PRIVATE_SECTIONS: u8 = 0x05;
pub const STREAM_TYPE_PRIVATE_PES: u8 = 0x06;
pub const STREAM_TYPE_DSMCC_B: u8 = 0x0b;
pub const STREAM_TYPE_AAC: u8 = 0x0f;
pub const STREAM_TYPE_MPEG4_VIDEO: u8 = 0x10;
pub const STREAM_TYPE_AAC_LATM: u8 = 0x11;
pub const STREAM_TYPE_H264: u8 = 0x1b;
pub const STREAM_TYPE_H265: u8 = 0x24;
pub const STREAM_TYPE_AC3: u8 = 0x81;
pub const STREAM_TYPE_EAC3: u8 = 0x87;

// Descriptor tags
pub const DESC_CA: u8 = 0x09;
pub const DESC_ISO639_LANGUAGE: u8 = 0x0a;
pub const DESC_TELETEXT: u8 = 0x56;
pub const DESC_SUBTITLING: u8 = 0x59;
pub const DESC_AC3: u8 = 0x6a;
pub const DESC_APPLICATION_SIGNALLING: u8 = 0x6f;
pub const DESC_EAC3: u8 = 0x7a;
pub const DESC_AAC: u8 = 0x7c;

// AIT descriptor tags
pub const AIT_DESC_APPLICATION_NAME: u8 = 0x01;
pub const AIT_DESC_TRANSPORT_PROTOCOL: u8 = 0x02;
pub const AIT_DESC_SIMPLE_APPLICATION_LOCATION: u8 = 0x15;

// Teletext types (ETSI EN 300 468 table 94)
pub const TELETEXT_TYPE_SUBTITLE: u8 = 0x02;
pub const TELETEXT_TYPE_SUBTITLE_HEARING_IMPAIRED: u8 = 0x05;

// Constants
pub const TS_PACKET_SIZE: usize = 188;
pub const TS_HEADER_SIZE: usize = 4;
pub const TS_SYNC_BYTE: u8 = 0x47;
/// Long-form PSI section header length (table_id .. last_section_number).
pub const PSI_HEADER_SIZE: usize = 8;
pub const PSI_CRC_SIZE: usize = 4;
/// `section_length` is a 12-bit field but PSI limits it to 1021.
pub const PSI_MAX_SECTION_LENGTH: usize = 1021;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TsHeader {
    pub transport_error: bool,
    pub payload_unit_start: bool,
    pub transport_priority: bool,
    pub pid: u16,
    pub scrambling_control: u8,
    pub adaptation_field_exists: bool,
    pub contains_payload: bool,
    pub continuity_counter: u8,
}

impl Default for TsHeader {
    fn default() -> Self {
        Self {
            transport_error: false,
            payload_unit_start: false,
            transport_priority: false,
            pid: 0,
            scrambling_control: 0,
            adaptation_field_exists: false,
            contains_payload: true,
            continuity_counter: 0,
        }
    }
}

impl TsHeader {
    /// Serialises the four header bytes; used by tests and packet synthesis.
    pub fn to_bytes(&self) -> [u8; TS_HEADER_SIZE] {
        let mut b1 = ((self.pid >> 8) & 0x1f) as u8;
        if self.transport_error {
            b1 |= 0x80;
        }
        if self.payload_unit_start {
            b1 |= 0x40;
        }
        if self.transport_priority {
            b1 |= 0x20;
        }

        let mut b3 = (self.scrambling_control & 0x03) << 6;
        if self.adaptation_field_exists {
            b3 |= 0x20;
        }
        if self.contains_payload {
            b3 |= 0x10;
        }
        b3 |= self.continuity_counter & 0x0f;

        [TS_SYNC_BYTE, b1, (self.pid & 0xff) as u8, b3]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    pub tag: u8,
    pub data: Vec<u8>,
}

/// Long-form PSI section header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionHeader {
    pub table_id: u8,
    pub section_syntax: bool,
    pub section_length: usize,
    pub table_id_extension: u16,
    pub version: u8,
    pub current_next: bool,
    pub section_number: u8,
    pub last_section_number: u8,
}

impl SectionHeader {
    /// Total section size including the three leading bytes.
    pub fn total_len(&self) -> usize {
        3 + self.section_length
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PmtStream {
    pub stream_type: u8,
    pub elementary_pid: u16,
    pub descriptors: Vec<Descriptor>,
}

impl PmtStream {
    pub fn descriptor(&self, tag: u8) -> Option<&Descriptor> {
        self.descriptors.iter().find(|d| d.tag == tag)
    }

    pub fn has_descriptor(&self, tag: u8) -> bool {
        self.descriptor(tag).is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pmt {
    pub program_number: u16,
    pub version: u8,
    pub pcr_pid: u16,
    pub program_descriptors: Vec<Descriptor>,
    pub streams: Vec<PmtStream>,
}

fn descriptors_len(descriptors: &[Descriptor]) -> usize {
    descriptors.iter().map(|d| 2 + d.data.len()).sum()
}

fn put_descriptors(buf: &mut BytesMut, descriptors: &[Descriptor]) {
    for desc in descriptors {
        buf.put_u8(desc.tag);
        buf.put_u8(desc.data.len() as u8);
        buf.put_slice(&desc.data);
    }
}

impl Pmt {
    /// Writes the PMT as one complete section, CRC included.
    pub fn write_section(&self, buf: &mut BytesMut) {
        let body_len = 4
            + descriptors_len(&self.program_descriptors)
            + self
                .streams
                .iter()
                .map(|s| 5 + descriptors_len(&s.descriptors))
                .sum::<usize>();
        let section_length = 5 + body_len + PSI_CRC_SIZE;

        let start = buf.len();
        buf.put_u8(TABLE_ID_PMT);
        buf.put_u16(0xB000 | (section_length as u16 & 0x3ff));
        buf.put_u16(self.program_number);
        buf.put_u8(0xC1 | ((self.version & 0x1f) << 1));
        buf.put_u8(0);
        buf.put_u8(0);

        buf.put_u16(self.pcr_pid & 0x1fff | 7 << 13);
        let prog_desc_len = descriptors_len(&self.program_descriptors);
        buf.put_u16((prog_desc_len as u16) & 0x3ff | 0xf << 12);
        put_descriptors(buf, &self.program_descriptors);

        for info in &self.streams {
            buf.put_u8(info.stream_type);
            buf.put_u16(info.elementary_pid & 0x1fff | 7 << 13);
            let es_desc_len = descriptors_len(&info.descriptors);
            buf.put_u16((es_desc_len as u16) & 0x3ff | 0xf << 12);
            put_descriptors(buf, &info.descriptors);
        }

        let crc = Crc32Mpeg2::new().calculate(&buf[start..]);
        buf.put_u32(crc);
    }
}
