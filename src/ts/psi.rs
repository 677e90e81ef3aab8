//! Section reassembly for one PSI table carried on one PID.

use super::parser::TsParser;
use super::types::*;
use crate::error::{EsError, Result};
use bytes::{Bytes, BytesMut};
use std::collections::HashMap;

/// Collects PSI sections of a single table id from TS packet payloads.
///
/// Sections may span packets and several sections may share one packet.
/// A section is emitted once per version: repeats of an already delivered
/// `(extension, section_number, version)` are dropped.
pub struct PsiTable {
    table_id: u8,
    parser: TsParser,
    buffer: BytesMut,
    synced: bool,
    versions: HashMap<(u16, u8), u8>,
}

impl PsiTable {
    pub fn new(table_id: u8) -> Self {
        Self {
            table_id,
            parser: TsParser::new(),
            buffer: BytesMut::new(),
            synced: false,
            versions: HashMap::new(),
        }
    }

    pub fn table_id(&self) -> u8 {
        self.table_id
    }

    pub fn parser(&self) -> &TsParser {
        &self.parser
    }

    /// Forgets buffered data and seen versions.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.synced = false;
        self.versions.clear();
    }

    /// Feeds one packet payload. Returns the new sections completed by it.
    ///
    /// On a malformed section the partial buffer is discarded and the error
    /// returned; the table resynchronises on the next unit start.
    pub fn feed(&mut self, payload: &[u8], unit_start: bool) -> Result<Vec<Bytes>> {
        let mut sections = Vec::new();

        if unit_start {
            let pointer = *payload
                .first()
                .ok_or_else(|| EsError::InvalidData("PSI payload without pointer field".into()))?
                as usize;
            let rest = &payload[1..];
            if pointer > rest.len() {
                self.reset_buffer();
                return Err(EsError::InvalidData("PSI pointer field out of range".into()));
            }
            if self.synced {
                self.buffer.extend_from_slice(&rest[..pointer]);
                if let Err(e) = self.drain(&mut sections) {
                    // keep the section starting at the pointer for the next feed
                    self.buffer.clear();
                    self.buffer.extend_from_slice(&rest[pointer..]);
                    return Err(e);
                }
            }
            self.buffer.clear();
            self.buffer.extend_from_slice(&rest[pointer..]);
            self.synced = true;
        } else if self.synced {
            self.buffer.extend_from_slice(payload);
        } else {
            return Ok(sections);
        }

        if let Err(e) = self.drain(&mut sections) {
            self.reset_buffer();
            return Err(e);
        }
        Ok(sections)
    }

    fn reset_buffer(&mut self) {
        self.buffer.clear();
        self.synced = false;
    }

    fn drain(&mut self, out: &mut Vec<Bytes>) -> Result<()> {
        loop {
            match self.buffer.first() {
                None => return Ok(()),
                Some(0xFF) => {
                    // stuffing up to the end of the packet
                    self.buffer.clear();
                    return Ok(());
                }
                Some(_) => {}
            }
            if self.buffer.len() < 3 {
                return Ok(());
            }
            let total = 3 + (((self.buffer[1] as usize & 0x0F) << 8) | self.buffer[2] as usize);
            if self.buffer.len() < total {
                return Ok(());
            }
            let section = self.buffer.split_to(total).freeze();
            if let Some(section) = self.accept(section)? {
                out.push(section);
            }
        }
    }

    fn accept(&mut self, section: Bytes) -> Result<Option<Bytes>> {
        if section[0] != self.table_id {
            return Ok(None);
        }
        let (header, _) = self.parser.checked_section(&section)?;
        if !header.current_next {
            return Ok(None);
        }
        let key = (header.table_id_extension, header.section_number);
        if self.versions.get(&key) == Some(&header.version) {
            return Ok(None);
        }
        self.versions.insert(key, header.version);
        log::trace!(
            "table 0x{:02x} ext {} section {}/{} version {}",
            header.table_id,
            header.table_id_extension,
            header.section_number,
            header.last_section_number,
            header.version
        );
        Ok(Some(section))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pmt_section(version: u8) -> Bytes {
        let pmt = Pmt {
            program_number: 1,
            version,
            pcr_pid: 0x100,
            program_descriptors: vec![],
            streams: vec![PmtStream {
                stream_type: STREAM_TYPE_H264,
                elementary_pid: 0x100,
                descriptors: vec![Descriptor {
                    tag: 0x05,
                    data: vec![0xAA; 150],
                }],
            }],
        };
        let mut buf = BytesMut::new();
        pmt.write_section(&mut buf);
        buf.freeze()
    }

    #[test]
    fn test_single_packet_section() {
        let section = pmt_section(0);
        let mut payload = vec![0u8];
        payload.extend_from_slice(&section[..]);
        payload.resize(TS_PACKET_SIZE - TS_HEADER_SIZE, 0xFF);

        let mut table = PsiTable::new(TABLE_ID_PMT);
        let sections = table.feed(&payload, true).unwrap();
        assert_eq!(sections, vec![section.clone()]);

        // same version again is not reported
        assert!(table.feed(&payload, true).unwrap().is_empty());
    }

    #[test]
    fn test_section_spanning_packets() {
        let section = pmt_section(2);
        let mut first = vec![0u8];
        first.extend_from_slice(&section[..100]);
        let second = &section[100..];

        let mut table = PsiTable::new(TABLE_ID_PMT);
        assert!(table.feed(&first, true).unwrap().is_empty());
        let sections = table.feed(second, false).unwrap();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0], section);
    }

    #[test]
    fn test_continuation_without_start_is_ignored() {
        let section = pmt_section(1);
        let mut table = PsiTable::new(TABLE_ID_PMT);
        assert!(table.feed(&section[10..], false).unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_section_reports_error() {
        let section = pmt_section(4);
        let mut payload = vec![0u8];
        payload.extend_from_slice(&section[..]);
        let at = payload.len() - 2;
        payload[at] ^= 0x01;

        let mut table = PsiTable::new(TABLE_ID_PMT);
        assert!(table.feed(&payload, true).is_err());
        assert!(table.feed(&[0x00, 0xFF], false).unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_tail_keeps_next_section() {
        let broken = pmt_section(5);
        let next = pmt_section(6);

        let mut first = vec![0u8];
        first.extend_from_slice(&broken[..100]);

        let mut tail = broken[100..].to_vec();
        let at = tail.len() - 1;
        tail[at] ^= 0x01;
        let mut second = vec![tail.len() as u8];
        second.extend_from_slice(&tail);
        second.extend_from_slice(&next[..]);

        let mut table = PsiTable::new(TABLE_ID_PMT);
        assert!(table.feed(&first, true).unwrap().is_empty());
        assert!(table.feed(&second, true).is_err());

        let sections = table.feed(&[0x00, 0xFF], true).unwrap();
        assert_eq!(sections, vec![next]);
    }

    #[test]
    fn test_other_table_ids_skipped() {
        let section = pmt_section(0);
        let mut payload = vec![0u8];
        payload.extend_from_slice(&section[..]);
        let mut table = PsiTable::new(TABLE_ID_AIT);
        assert!(table.feed(&payload, true).unwrap().is_empty());
    }
}
