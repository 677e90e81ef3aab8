//! Reconciling a set against a freshly parsed PMT.

use super::set::{ElementarySet, StreamId};
use super::stream::ElementaryStream;
use super::start::StartComponent;
use super::types::*;
use crate::ts::*;
use log::{info, trace};
use std::collections::HashSet;

/// PIDs touched by one [`ElementarySet::apply_pmt`] pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PmtUpdate {
    pub added: Vec<u16>,
    pub changed: Vec<u16>,
    pub removed: Vec<u16>,
}

impl PmtUpdate {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.changed.is_empty() && self.removed.is_empty()
    }
}

/// Maps a PMT entry to a component type; `None` for streams the set does not
/// track.
pub fn component_type_for(stream: &PmtStream) -> Option<ComponentType> {
    let ty = match stream.stream_type {
        STREAM_TYPE_MPEG1_VIDEO | STREAM_TYPE_MPEG2_VIDEO => ComponentType::Mpeg2Video,
        STREAM_TYPE_MPEG4_VIDEO => ComponentType::Mpeg4Video,
        STREAM_TYPE_H264 => ComponentType::H264,
        STREAM_TYPE_H265 => ComponentType::Hevc,
        STREAM_TYPE_MPEG1_AUDIO | STREAM_TYPE_MPEG2_AUDIO => ComponentType::Mpeg2Audio,
        STREAM_TYPE_AAC => ComponentType::Aac,
        STREAM_TYPE_AAC_LATM => ComponentType::AacLatm,
        STREAM_TYPE_AC3 => ComponentType::Ac3,
        STREAM_TYPE_EAC3 => ComponentType::Eac3,
        STREAM_TYPE_DSMCC_B => ComponentType::Data,
        STREAM_TYPE_PRIVATE_SECTIONS if stream.has_descriptor(DESC_APPLICATION_SIGNALLING) => {
            ComponentType::Hbbtv
        }
        STREAM_TYPE_PRIVATE_PES => {
            if stream.has_descriptor(DESC_AC3) {
                ComponentType::Ac3
            } else if stream.has_descriptor(DESC_EAC3) {
                ComponentType::Eac3
            } else if stream.has_descriptor(DESC_AAC) {
                ComponentType::Aac
            } else if stream.has_descriptor(DESC_SUBTITLING) {
                ComponentType::DvbSub
            } else if stream.has_descriptor(DESC_TELETEXT) {
                ComponentType::Teletext
            } else {
                return None;
            }
        }
        _ => return None,
    };
    Some(ty)
}

fn ca_ids_of(descriptors: &[Descriptor]) -> impl Iterator<Item = CaId> + '_ {
    descriptors
        .iter()
        .filter(|d| d.tag == DESC_CA && d.data.len() >= 4)
        .map(|d| {
            let caid = ((d.data[0] as u16) << 8) | d.data[1] as u16;
            let pid = ((d.data[2] as u16 & 0x1F) << 8) | d.data[3] as u16;
            CaId::new(caid, pid)
        })
}

/// Subtitle page inside a teletext descriptor.
struct TeletextPage {
    lang: [u8; 3],
    page: u16,
}

fn teletext_subtitle_pages(desc: &Descriptor) -> Vec<TeletextPage> {
    desc.data
        .chunks_exact(5)
        .filter(|entry| {
            let kind = entry[3] >> 3;
            kind == TELETEXT_TYPE_SUBTITLE || kind == TELETEXT_TYPE_SUBTITLE_HEARING_IMPAIRED
        })
        .map(|entry| {
            let magazine = match entry[3] & 0x07 {
                0 => 8,
                m => m as u16,
            };
            let bcd = entry[4];
            let page = magazine * 100 + (bcd >> 4) as u16 * 10 + (bcd & 0x0F) as u16;
            TeletextPage {
                lang: [entry[0], entry[1], entry[2]],
                page,
            }
        })
        .collect()
}

fn apply_descriptors(es: &mut ElementaryStream, stream: &PmtStream) {
    for desc in &stream.descriptors {
        match desc.tag {
            DESC_ISO639_LANGUAGE if desc.data.len() >= 4 => {
                es.set_language(&desc.data[..3]);
                es.audio_type = desc.data[3];
            }
            DESC_SUBTITLING if desc.data.len() >= 8 => {
                es.set_language(&desc.data[..3]);
                es.composition_id = ((desc.data[4] as u16) << 8) | desc.data[5] as u16;
                es.ancillary_id = ((desc.data[6] as u16) << 8) | desc.data[7] as u16;
            }
            DESC_TELETEXT if desc.data.len() >= 5 => {
                es.set_language(&desc.data[..3]);
            }
            _ => {}
        }
    }
}

impl ElementarySet {
    fn snapshot(&mut self, pid: u16) -> Option<StartComponent> {
        let id = self.find_id(pid)?;
        self.get(id).map(StartComponent::from)
    }

    fn record(&mut self, update: &mut PmtUpdate, pid: u16, before: Option<StartComponent>) {
        let after = self.snapshot(pid);
        match before {
            None => update.added.push(pid),
            Some(before) if Some(&before) != after.as_ref() => update.changed.push(pid),
            Some(_) => {}
        }
    }

    /// Brings the set in line with `pmt`.
    ///
    /// Signalled streams are created or retyped and their descriptor metadata
    /// refreshed; streams no longer signalled are destroyed. Teletext subtitle
    /// pages become subtitle streams on pseudo PIDs above the PID range, with
    /// `parent_pid` pointing at the teletext carrier and the carrier's CA list.
    /// Every ECM PID named by a CA descriptor gets a [`ComponentType::Ca`]
    /// stream. The filter is rebuilt when anything changed.
    pub fn apply_pmt(&mut self, pmt: &Pmt, running: bool) -> PmtUpdate {
        let mut update = PmtUpdate::default();
        let mut signalled: HashSet<u16> = HashSet::new();
        let program_ca: Vec<CaId> = ca_ids_of(&pmt.program_descriptors).collect();
        let mut ecm: Vec<CaId> = program_ca.clone();

        for stream in &pmt.streams {
            let Some(ty) = component_type_for(stream) else {
                trace!(
                    "{}: skipping PID {} with stream type 0x{:02x}",
                    self.label(),
                    stream.elementary_pid,
                    stream.stream_type
                );
                continue;
            };
            let pid = stream.elementary_pid;
            if !signalled.insert(pid) {
                continue;
            }

            let stream_ca: Vec<CaId> = program_ca
                .iter()
                .copied()
                .chain(ca_ids_of(&stream.descriptors))
                .collect();
            ecm.extend(ca_ids_of(&stream.descriptors));

            let before = self.snapshot(pid);
            let es = self.type_modify(pid, ty, running);
            apply_descriptors(es, stream);
            es.set_ca_ids(stream_ca.iter().copied());
            self.record(&mut update, pid, before);

            if ty != ComponentType::Teletext {
                continue;
            }
            let pages = stream
                .descriptor(DESC_TELETEXT)
                .map(teletext_subtitle_pages)
                .unwrap_or_default();
            for page in pages {
                let sub_pid = PID_TELETEXT_SUBTITLE_BASE + page.page;
                if !signalled.insert(sub_pid) {
                    continue;
                }
                let before = self.snapshot(sub_pid);
                let sub = self.type_modify(sub_pid, ComponentType::TextSub, false);
                sub.parent_pid = Some(pid);
                sub.set_language(&page.lang);
                sub.set_ca_ids(stream_ca.iter().copied());
                self.record(&mut update, sub_pid, before);
            }
        }

        // ECM PIDs of every signalled CA system, program level first
        for ca in ecm {
            if !signalled.insert(ca.pid) {
                continue;
            }
            let before = self.snapshot(ca.pid);
            let es = self.type_modify(ca.pid, ComponentType::Ca, running);
            es.set_ca_ids(std::iter::once(ca));
            self.record(&mut update, ca.pid, before);
        }

        let stale: Vec<StreamId> = self
            .iter()
            .filter(|es| !signalled.contains(&es.pid()))
            .map(|es| es.id())
            .collect();
        for id in stale {
            if let Some(pid) = self.get(id).map(|es| es.pid()) {
                update.removed.push(pid);
            }
            self.stream_destroy(id);
        }

        if !update.is_empty() {
            info!(
                "{}: PMT version {} applied ({} added, {} changed, {} removed)",
                self.label(),
                pmt.version,
                update.added.len(),
                update.changed.len(),
                update.removed.len()
            );
            self.filter_build();
        }
        update
    }
}
