use bytes::BytesMut;
use esset::es::{
    shared, ComponentClass, ComponentType, DefaultSortPolicy, ElementarySet, FilterAction,
    FilterRule, ServiceId, Subsystem,
};
use esset::ts::*;
use pretty_assertions::assert_eq;
use std::sync::Arc;

const PMT_PID: u16 = 0x0100;

fn descriptor(tag: u8, data: &[u8]) -> Descriptor {
    Descriptor {
        tag,
        data: data.to_vec(),
    }
}

fn sample_pmt(version: u8) -> Pmt {
    Pmt {
        program_number: 28106,
        version,
        pcr_pid: 0x1401,
        program_descriptors: vec![],
        streams: vec![
            PmtStream {
                stream_type: STREAM_TYPE_H264,
                elementary_pid: 0x1401,
                descriptors: vec![],
            },
            PmtStream {
                stream_type: STREAM_TYPE_MPEG2_AUDIO,
                elementary_pid: 0x1402,
                descriptors: vec![descriptor(DESC_ISO639_LANGUAGE, b"deu\x00")],
            },
            PmtStream {
                stream_type: STREAM_TYPE_PRIVATE_PES,
                elementary_pid: 0x1403,
                descriptors: vec![
                    descriptor(DESC_AC3, &[0x00]),
                    descriptor(DESC_ISO639_LANGUAGE, b"eng\x00"),
                ],
            },
            PmtStream {
                stream_type: STREAM_TYPE_PRIVATE_PES,
                elementary_pid: 0x1404,
                // subtitle page 150, magazine 1
                descriptors: vec![descriptor(
                    DESC_TELETEXT,
                    &[b'd', b'e', b'u', (TELETEXT_TYPE_SUBTITLE << 3) | 0x01, 0x50],
                )],
            },
        ],
    }
}

/// Packs one section into a single TS packet with a pointer field.
fn section_packet(pid: u16, cc: u8, section: &[u8]) -> Vec<u8> {
    let header = TsHeader {
        payload_unit_start: true,
        pid,
        continuity_counter: cc,
        ..Default::default()
    };
    let mut packet = header.to_bytes().to_vec();
    packet.push(0);
    packet.extend_from_slice(section);
    packet.resize(TS_PACKET_SIZE, 0xff);
    packet
}

fn pmt_packet(version: u8, cc: u8) -> Vec<u8> {
    let mut section = BytesMut::new();
    sample_pmt(version).write_section(&mut section);
    section_packet(PMT_PID, cc, &section)
}

fn recording_set() -> ElementarySet {
    let mut set = ElementarySet::new(Subsystem::Recording, "Das Erste HD", ServiceId(28106));
    set.set_sort_policy(Arc::new(DefaultSortPolicy::new(vec!["eng".into()])));
    set
}

#[test]
fn test_pmt_packet_to_streaming_start() {
    let parser = TsParser::new();
    let mut table = PsiTable::new(TABLE_ID_PMT);
    let mut set = recording_set();

    let packet = pmt_packet(3, 0);
    let header = parser.parse_header(&packet).unwrap();
    assert_eq!(header.pid, PMT_PID);
    let offset = parser.payload_offset(&packet, &header).unwrap().unwrap();

    let sections = table.feed(&packet[offset..], header.payload_unit_start).unwrap();
    assert_eq!(sections.len(), 1);
    let pmt = parser.parse_pmt(&sections[0]).unwrap();
    assert_eq!(pmt.version, 3);

    let update = set.apply_pmt(&pmt, true);
    assert_eq!(update.added.len(), 5);
    assert!(update.removed.is_empty());

    let subtitle = set.find(PID_TELETEXT_SUBTITLE_BASE + 150).unwrap();
    assert_eq!(subtitle.component_type(), ComponentType::TextSub);
    assert_eq!(subtitle.parent_pid, Some(0x1404));
    assert_eq!(subtitle.lang.as_deref(), Some("deu"));

    let start = set.build_start();
    let order: Vec<u16> = start.components.iter().map(|c| c.pid).collect();
    // preferred language first within audio
    assert_eq!(
        order,
        vec![0x1401, 0x1403, 0x1402, PID_TELETEXT_SUBTITLE_BASE + 150, 0x1404]
    );
    assert_eq!(start.components_of(ComponentClass::Audio).count(), 2);
    assert_eq!(start.service, ServiceId(28106));
}

#[test]
fn test_repeated_pmt_is_dropped_and_new_version_applies() {
    let parser = TsParser::new();
    let mut table = PsiTable::new(TABLE_ID_PMT);
    let mut set = recording_set();

    for (cc, version) in [(0u8, 1u8), (1, 1)] {
        let packet = pmt_packet(version, cc);
        let header = parser.parse_header(&packet).unwrap();
        let offset = parser.payload_offset(&packet, &header).unwrap().unwrap();
        for section in table.feed(&packet[offset..], true).unwrap() {
            set.apply_pmt(&parser.parse_pmt(&section).unwrap(), true);
        }
    }
    assert_eq!(set.len(), 5);

    let mut pmt = sample_pmt(2);
    pmt.streams.retain(|s| s.elementary_pid != 0x1403);
    let mut section = BytesMut::new();
    pmt.write_section(&mut section);
    let packet = section_packet(PMT_PID, 2, &section);
    let header = parser.parse_header(&packet).unwrap();
    let offset = parser.payload_offset(&packet, &header).unwrap().unwrap();
    let sections = table.feed(&packet[offset..], true).unwrap();
    assert_eq!(sections.len(), 1);

    let update = set.apply_pmt(&parser.parse_pmt(&sections[0]).unwrap(), true);
    assert_eq!(update.removed, vec![0x1403]);
    assert!(set.find(0x1403).is_none());
    assert_eq!(set.len(), 4);
}

#[test]
fn test_recording_filter_with_rules() {
    let parser = TsParser::new();
    let mut set = recording_set();
    set.set_filter_rules(vec![
        FilterRule::new(ComponentClass::Audio, FilterAction::Use).with_language("deu"),
        FilterRule::new(ComponentClass::Audio, FilterAction::Ignore),
        FilterRule::new(ComponentClass::Video, FilterAction::Use),
    ]);

    let mut section = BytesMut::new();
    sample_pmt(0).write_section(&mut section);
    set.apply_pmt(&parser.parse_pmt(&section).unwrap(), true);
    set.filter_build();

    let selected: Vec<u16> = set.iter_filtered().map(|es| es.pid()).collect();
    assert!(selected.contains(&0x1401));
    assert!(selected.contains(&0x1402));
    assert!(!selected.contains(&0x1403));
}

#[test]
fn test_continuity_across_packets() {
    let parser = TsParser::new();
    let mut set = recording_set();
    set.stream_create(0x1401, ComponentType::H264, true);

    let mut errors = 0;
    for cc in [0u8, 1, 2, 2, 5, 6] {
        let header = TsHeader {
            pid: 0x1401,
            continuity_counter: cc,
            ..Default::default()
        };
        let mut packet = header.to_bytes().to_vec();
        packet.resize(TS_PACKET_SIZE, 0xff);

        let header = parser.parse_header(&packet).unwrap();
        let discontinuity = parser.discontinuity(&packet, &header);
        let es = set.find(header.pid).unwrap();
        if !es.check_continuity(&header, discontinuity) {
            errors += 1;
        }
    }

    assert_eq!(errors, 1);
    let es = set.find(0x1401).unwrap();
    assert_eq!(es.continuity_errors(), 1);
    assert_eq!(es.last_continuity_counter(), Some(6));
}

#[test]
fn test_shared_set_across_threads() {
    let set = shared(Subsystem::Live, "ZDF HD", ServiceId(28006));
    set.lock()
        .set_sort_policy(Arc::new(DefaultSortPolicy::default()));

    let writer = {
        let set = Arc::clone(&set);
        std::thread::spawn(move || {
            let mut set = set.lock();
            set.stream_create(0x1838, ComponentType::Mpeg2Audio, true);
            set.stream_create(0x1837, ComponentType::H264, true);
            set.filter_build();
        })
    };
    writer.join().unwrap();

    let start = set.lock().build_start();
    assert_eq!(start.len(), 2);
    assert_eq!(start.components[0].pid, 0x1837);
}
