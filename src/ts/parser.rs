use super::types::*;
use crate::error::{EsError, Result};
use crate::utils::Crc32Mpeg2;

/// Stateless TS/PSI parsing helpers sharing one CRC table.
pub struct TsParser {
    crc: Crc32Mpeg2,
}

impl TsParser {
    pub fn new() -> Self {
        Self {
            crc: Crc32Mpeg2::new(),
        }
    }

    pub fn crc(&self) -> &Crc32Mpeg2 {
        &self.crc
    }

    pub fn parse_header(&self, data: &[u8]) -> Result<TsHeader> {
        if data.len() < TS_HEADER_SIZE {
            return Err(EsError::InvalidData("TS packet too short".into()));
        }

        if data[0] != TS_SYNC_BYTE {
            return Err(EsError::InvalidData("Invalid sync byte".into()));
        }

        Ok(TsHeader {
            transport_error: (data[1] & 0x80) != 0,
            payload_unit_start: (data[1] & 0x40) != 0,
            transport_priority: (data[1] & 0x20) != 0,
            pid: (((data[1] & 0x1F) as u16) << 8) | data[2] as u16,
            scrambling_control: (data[3] >> 6) & 0x03,
            adaptation_field_exists: (data[3] & 0x20) != 0,
            contains_payload: (data[3] & 0x10) != 0,
            continuity_counter: data[3] & 0x0F,
        })
    }

    /// True when the adaptation field sets the discontinuity indicator.
    pub fn discontinuity(&self, data: &[u8], header: &TsHeader) -> bool {
        if !header.adaptation_field_exists || data.len() < TS_HEADER_SIZE + 2 {
            return false;
        }
        data[TS_HEADER_SIZE] > 0 && (data[TS_HEADER_SIZE + 1] & 0x80) != 0
    }

    /// Offset of the payload inside `data`, or `None` for packets without one.
    pub fn payload_offset(&self, data: &[u8], header: &TsHeader) -> Result<Option<usize>> {
        if !header.contains_payload {
            return Ok(None);
        }
        let mut offset = TS_HEADER_SIZE;
        if header.adaptation_field_exists {
            let length = *data
                .get(offset)
                .ok_or_else(|| EsError::InvalidData("Adaptation field length missing".into()))?
                as usize;
            offset += length + 1;
        }
        if offset > data.len() {
            return Err(EsError::InvalidData("Adaptation field too long".into()));
        }
        Ok(Some(offset))
    }

    pub fn parse_section_header(&self, data: &[u8]) -> Result<SectionHeader> {
        if data.len() < PSI_HEADER_SIZE {
            return Err(EsError::InvalidData("PSI section header too short".into()));
        }
        let section_length = ((data[1] as usize & 0x0F) << 8) | data[2] as usize;
        if section_length > PSI_MAX_SECTION_LENGTH {
            return Err(EsError::InvalidData(format!(
                "PSI section length {} out of range",
                section_length
            )));
        }
        Ok(SectionHeader {
            table_id: data[0],
            section_syntax: (data[1] & 0x80) != 0,
            section_length,
            table_id_extension: ((data[3] as u16) << 8) | data[4] as u16,
            version: (data[5] >> 1) & 0x1F,
            current_next: (data[5] & 0x01) != 0,
            section_number: data[6],
            last_section_number: data[7],
        })
    }

    /// Validates length and CRC of a complete long-form section and returns
    /// its header together with the body between header and CRC.
    pub fn checked_section<'a>(&self, data: &'a [u8]) -> Result<(SectionHeader, &'a [u8])> {
        let header = self.parse_section_header(data)?;
        let total = header.total_len();
        if data.len() < total || total < PSI_HEADER_SIZE + PSI_CRC_SIZE {
            return Err(EsError::InvalidData("PSI section truncated".into()));
        }
        self.crc.verify_section(&data[..total])?;
        Ok((header, &data[PSI_HEADER_SIZE..total - PSI_CRC_SIZE]))
    }

    pub fn parse_pmt(&self, section: &[u8]) -> Result<Pmt> {
        let (header, data) = self.checked_section(section)?;
        if header.table_id != TABLE_ID_PMT {
            return Err(EsError::Parser(format!(
                "table id 0x{:02x} is not a PMT",
                header.table_id
            )));
        }

        let mut pmt = Pmt {
            program_number: header.table_id_extension,
            version: header.version,
            ..Default::default()
        };
        let end = data.len();
        let mut pos = 0;

        if pos + 4 > end {
            return Err(EsError::InvalidData("PMT too short for PCR PID".into()));
        }

        pmt.pcr_pid = ((data[pos] as u16 & 0x1F) << 8) | data[pos + 1] as u16;
        let program_info_length = ((data[pos + 2] as usize & 0x0F) << 8) | data[pos + 3] as usize;
        pos += 4;

        if pos + program_info_length > end {
            return Err(EsError::InvalidData("Program info data too short".into()));
        }
        pmt.program_descriptors = parse_descriptors(&data[pos..pos + program_info_length])?;
        pos += program_info_length;

        while pos + 5 <= end {
            let stream_type = data[pos];
            let elementary_pid = ((data[pos + 1] as u16 & 0x1F) << 8) | data[pos + 2] as u16;
            let es_info_length = ((data[pos + 3] as usize & 0x0F) << 8) | data[pos + 4] as usize;
            pos += 5;

            if pos + es_info_length > end {
                return Err(EsError::InvalidData("ES info data too short".into()));
            }

            let descriptors = parse_descriptors(&data[pos..pos + es_info_length])?;
            pos += es_info_length;

            pmt.streams.push(PmtStream {
                stream_type,
                elementary_pid,
                descriptors,
            });
        }

        Ok(pmt)
    }
}

impl Default for TsParser {
    fn default() -> Self {
        Self::new()
    }
}

pub fn parse_descriptors(data: &[u8]) -> Result<Vec<Descriptor>> {
    let mut descriptors = Vec::new();
    let mut pos = 0;

    while pos + 2 <= data.len() {
        let tag = data[pos];
        let length = data[pos + 1] as usize;
        pos += 2;

        if pos + length > data.len() {
            return Err(EsError::InvalidData("Descriptor data too short".into()));
        }

        descriptors.push(Descriptor {
            tag,
            data: data[pos..pos + length].to_vec(),
        });
        pos += length;
    }

    Ok(descriptors)
}
