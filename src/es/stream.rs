use super::set::StreamId;
use super::types::*;
use crate::error::Result;
use crate::ts::{Ait, PsiTable, TsHeader, TABLE_ID_AIT};
use crate::utils::LogLimiter;
use log::{debug, warn};
use std::time::Duration;

/// Per-stream AIT reassembly and the last table decoded from it.
struct AitState {
    table: PsiTable,
    current: Option<Ait>,
}

/// One media or data component of a service.
///
/// Identity (`id`, `position`, `index`, `pid`, `component_type`) is managed by
/// the owning [`ElementarySet`](super::ElementarySet); presentation metadata is
/// public and filled in by whoever parses the signalling.
pub struct ElementaryStream {
    id: StreamId,
    position: u32,
    index: u32,
    service: ServiceId,
    component_type: ComponentType,
    pid: u16,
    label: String,

    /// For subtitles extracted from teletext: PID of the teletext carrier.
    pub parent_pid: Option<u16>,
    /// The demultiplexer has a filter open for this PID.
    pub pid_opened: bool,

    last_cc: Option<u8>,
    cc_duplicate: bool,
    cc_log: LogLimiter,
    ca_ids: Vec<CaId>,

    /// Frame duration in 90 kHz ticks, 0 when unknown.
    pub frame_duration: u32,
    pub width: u32,
    pub height: u32,
    pub aspect_num: u16,
    pub aspect_den: u16,
    /// ISO 639-2 language code, lower case.
    pub lang: Option<String>,
    pub audio_type: u8,
    pub audio_version: u8,
    pub composition_id: u16,
    pub ancillary_id: u16,

    ait: Option<Box<AitState>>,
}

pub(crate) fn stream_label(set_label: &str, component_type: ComponentType, pid: u16) -> String {
    format!("{}: {} @ #{}", set_label, component_type, pid)
}

impl ElementaryStream {
    pub(crate) fn new(
        id: StreamId,
        position: u32,
        index: u32,
        pid: u16,
        component_type: ComponentType,
        service: ServiceId,
        set_label: &str,
        cc_log_interval: Duration,
    ) -> Self {
        Self {
            id,
            position,
            index,
            service,
            component_type,
            pid,
            label: stream_label(set_label, component_type, pid),
            parent_pid: None,
            pid_opened: false,
            last_cc: None,
            cc_duplicate: false,
            cc_log: LogLimiter::new(cc_log_interval),
            ca_ids: Vec::new(),
            frame_duration: 0,
            width: 0,
            height: 0,
            aspect_num: 0,
            aspect_den: 0,
            lang: None,
            audio_type: 0,
            audio_version: 0,
            composition_id: 0,
            ancillary_id: 0,
            ait: None,
        }
    }

    pub fn id(&self) -> StreamId {
        self.id
    }

    /// Creation ordinal inside the owning set.
    pub fn position(&self) -> u32 {
        self.position
    }

    /// Component index handed to consumers, 1-based.
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn service(&self) -> ServiceId {
        self.service
    }

    pub fn pid(&self) -> u16 {
        self.pid
    }

    pub fn component_type(&self) -> ComponentType {
        self.component_type
    }

    pub fn class(&self) -> ComponentClass {
        self.component_type.class()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub(crate) fn set_type(&mut self, component_type: ComponentType, set_label: &str) {
        if self.component_type != component_type {
            debug!("{}: type changed to {}", self.label, component_type);
            self.component_type = component_type;
            self.label = stream_label(set_label, component_type, self.pid);
        }
    }

    pub(crate) fn relabel(&mut self, set_label: &str) {
        self.label = stream_label(set_label, self.component_type, self.pid);
    }

    /// Sets the language from raw ISO 639 bytes; empty or non-alphabetic
    /// codes clear it.
    pub fn set_language(&mut self, code: &[u8]) {
        self.lang = match code.get(..3) {
            Some(code) if code.iter().all(u8::is_ascii_alphabetic) => {
                Some(String::from_utf8_lossy(code).to_ascii_lowercase())
            }
            _ => None,
        };
    }

    pub fn ca_ids(&self) -> &[CaId] {
        &self.ca_ids
    }

    pub fn is_scrambled(&self) -> bool {
        !self.ca_ids.is_empty()
    }

    /// Adds a CA system; returns false when the caid is already present.
    pub fn add_ca_id(&mut self, ca: CaId) -> bool {
        if self.ca_ids.iter().any(|c| c.caid == ca.caid) {
            return false;
        }
        self.ca_ids.push(ca);
        true
    }

    pub fn remove_ca_id(&mut self, caid: u16) -> bool {
        let before = self.ca_ids.len();
        self.ca_ids.retain(|c| c.caid != caid);
        self.ca_ids.len() != before
    }

    /// Replaces the CA set, deduplicating by caid. Returns true on change.
    pub fn set_ca_ids(&mut self, ca_ids: impl IntoIterator<Item = CaId>) -> bool {
        let mut next: Vec<CaId> = Vec::new();
        for ca in ca_ids {
            if !next.iter().any(|c| c.caid == ca.caid) {
                next.push(ca);
            }
        }
        if next == self.ca_ids {
            return false;
        }
        self.ca_ids = next;
        true
    }

    pub fn clear_ca_ids(&mut self) {
        self.ca_ids.clear();
    }

    pub fn last_continuity_counter(&self) -> Option<u8> {
        self.last_cc
    }

    /// Continuity errors seen over the stream's lifetime.
    pub fn continuity_errors(&self) -> u64 {
        self.cc_log.total()
    }

    /// Checks the continuity counter of one packet on this PID.
    ///
    /// Returns false on a continuity error. Packets without payload do not
    /// advance the counter. One repeat is a legal duplicate, a second
    /// consecutive repeat is an error. The adaptation-field discontinuity
    /// indicator reseeds the counter.
    pub fn check_continuity(&mut self, header: &TsHeader, discontinuity: bool) -> bool {
        if !header.contains_payload {
            return true;
        }
        let cc = header.continuity_counter & 0x0f;
        let (ok, duplicate) = match self.last_cc {
            None => (true, false),
            Some(_) if discontinuity => (true, false),
            Some(last) if cc == last => (!self.cc_duplicate, true),
            Some(last) => (cc == ((last + 1) & 0x0f), false),
        };
        self.cc_duplicate = duplicate;
        if !ok {
            let expected = self.last_cc.map(|last| (last + 1) & 0x0f).unwrap_or(cc);
            if let Some(count) = self.cc_log.allow() {
                warn!(
                    "{}: continuity counter error (expected {}, got {}, {} since last report)",
                    self.label, expected, cc, count
                );
            }
        }
        self.last_cc = Some(cc);
        ok
    }

    /// Feeds a TS payload carrying the AIT of this stream and returns every
    /// table version completed by it.
    pub fn feed_ait(&mut self, payload: &[u8], unit_start: bool) -> Result<Vec<Ait>> {
        let state = self.ait.get_or_insert_with(|| {
            Box::new(AitState {
                table: PsiTable::new(TABLE_ID_AIT),
                current: None,
            })
        });
        let sections = state.table.feed(payload, unit_start)?;
        let mut tables = Vec::with_capacity(sections.len());
        for section in sections {
            let ait = Ait::parse(state.table.parser(), &section)?;
            debug!(
                "{}: AIT version {} with {} application(s)",
                self.label,
                ait.version,
                ait.applications.len()
            );
            state.current = Some(ait.clone());
            tables.push(ait);
        }
        Ok(tables)
    }

    /// Most recent AIT decoded on this stream.
    pub fn ait(&self) -> Option<&Ait> {
        self.ait.as_ref().and_then(|state| state.current.as_ref())
    }
}

impl std::fmt::Debug for ElementaryStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElementaryStream")
            .field("id", &self.id)
            .field("position", &self.position)
            .field("index", &self.index)
            .field("pid", &self.pid)
            .field("type", &self.component_type)
            .field("parent_pid", &self.parent_pid)
            .field("pid_opened", &self.pid_opened)
            .field("lang", &self.lang)
            .field("ca_ids", &self.ca_ids)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ts::ait::test_utils::ait_section;
    use pretty_assertions::assert_eq;

    fn stream(pid: u16, component_type: ComponentType) -> ElementaryStream {
        ElementaryStream::new(
            StreamId::new(0, 0),
            0,
            1,
            pid,
            component_type,
            ServiceId(1),
            "svc",
            Duration::from_secs(10),
        )
    }

    fn header(cc: u8) -> TsHeader {
        TsHeader {
            pid: 0x100,
            continuity_counter: cc,
            ..Default::default()
        }
    }

    #[test]
    fn test_label() {
        let mut es = stream(0x100, ComponentType::H264);
        assert_eq!(es.label(), "svc: H264 @ #256");
        es.set_type(ComponentType::Hevc, "svc");
        assert_eq!(es.label(), "svc: HEVC @ #256");
        es.relabel("other");
        assert_eq!(es.label(), "other: HEVC @ #256");
    }

    #[test]
    fn test_continuity() {
        let mut es = stream(0x100, ComponentType::H264);
        assert!(es.check_continuity(&header(14), false));
        assert!(es.check_continuity(&header(15), false));
        assert!(es.check_continuity(&header(0), false));
        // duplicate
        assert!(es.check_continuity(&header(0), false));
        assert!(!es.check_continuity(&header(5), false));
        assert_eq!(es.continuity_errors(), 1);
        assert!(es.check_continuity(&header(6), false));
        // discontinuity indicator reseeds
        assert!(es.check_continuity(&header(12), true));
        assert_eq!(es.last_continuity_counter(), Some(12));
        assert_eq!(es.continuity_errors(), 1);

        let no_payload = TsHeader {
            contains_payload: false,
            continuity_counter: 3,
            ..header(3)
        };
        assert!(es.check_continuity(&no_payload, false));
        assert_eq!(es.last_continuity_counter(), Some(12));
        assert_eq!(es.continuity_errors(), 1);
    }

    #[test]
    fn test_continuity_single_duplicate_only() {
        let mut es = stream(0x100, ComponentType::H264);
        let results: Vec<bool> = [3, 3, 3, 3]
            .iter()
            .map(|&cc| es.check_continuity(&header(cc), false))
            .collect();
        assert_eq!(results, vec![true, true, false, false]);
        assert_eq!(es.continuity_errors(), 2);

        // advancing clears the duplicate allowance, then one repeat is fine again
        assert!(es.check_continuity(&header(4), false));
        assert!(es.check_continuity(&header(4), false));
        assert!(!es.check_continuity(&header(4), false));
        assert!(es.check_continuity(&header(5), false));
        assert_eq!(es.continuity_errors(), 3);
    }

    #[test]
    fn test_ca_ids() {
        let mut es = stream(0x100, ComponentType::H264);
        assert!(!es.is_scrambled());
        assert!(es.add_ca_id(CaId::new(0x0b00, 0x200)));
        assert!(!es.add_ca_id(CaId::new(0x0b00, 0x201)));
        assert!(es.is_scrambled());
        assert!(!es.set_ca_ids(vec![CaId::new(0x0b00, 0x200)]));
        assert!(es.set_ca_ids(vec![CaId::new(0x0500, 0x300), CaId::new(0x0500, 0x301)]));
        assert_eq!(es.ca_ids().len(), 1);
        assert!(es.remove_ca_id(0x0500));
        assert!(!es.is_scrambled());
    }

    #[test]
    fn test_language() {
        let mut es = stream(0x101, ComponentType::Aac);
        es.set_language(b"ENG");
        assert_eq!(es.lang.as_deref(), Some("eng"));
        es.set_language(&[0, 0, 0]);
        assert_eq!(es.lang, None);
    }

    #[test]
    fn test_feed_ait() {
        let mut es = stream(0x150, ComponentType::Hbbtv);
        let section = ait_section(1, 7, "App", "http://example.com/", "start.html");
        let mut payload = vec![0u8];
        payload.extend_from_slice(&section);
        payload.resize(184, 0xFF);

        let tables = es.feed_ait(&payload, true).unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(es.ait().unwrap().applications[0].application_id, 7);
        assert!(es.feed_ait(&payload, true).unwrap().is_empty());
    }
}
