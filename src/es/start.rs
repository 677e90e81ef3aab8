use super::filter::Subsystem;
use super::set::ElementarySet;
use super::stream::ElementaryStream;
use super::types::*;
use chrono::{DateTime, Utc};

/// Frozen description of one component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartComponent {
    pub index: u32,
    pub pid: u16,
    pub parent_pid: Option<u16>,
    pub component_type: ComponentType,
    pub class: ComponentClass,
    pub lang: Option<String>,
    pub frame_duration: u32,
    pub width: u32,
    pub height: u32,
    pub aspect_num: u16,
    pub aspect_den: u16,
    pub audio_type: u8,
    pub audio_version: u8,
    pub composition_id: u16,
    pub ancillary_id: u16,
    pub ca_ids: Vec<CaId>,
}

impl From<&ElementaryStream> for StartComponent {
    fn from(es: &ElementaryStream) -> Self {
        Self {
            index: es.index(),
            pid: es.pid(),
            parent_pid: es.parent_pid,
            component_type: es.component_type(),
            class: es.class(),
            lang: es.lang.clone(),
            frame_duration: es.frame_duration,
            width: es.width,
            height: es.height,
            aspect_num: es.aspect_num,
            aspect_den: es.aspect_den,
            audio_type: es.audio_type,
            audio_version: es.audio_version,
            composition_id: es.composition_id,
            ancillary_id: es.ancillary_id,
            ca_ids: es.ca_ids().to_vec(),
        }
    }
}

/// Immutable snapshot of a service's components in presentation order.
///
/// Owns copies of everything it describes; the set it came from can change
/// or disappear without affecting it.
#[derive(Debug, Clone)]
pub struct StreamingStart {
    pub service: ServiceId,
    pub label: String,
    pub subsystem: Subsystem,
    pub created_at: DateTime<Utc>,
    pub components: Vec<StartComponent>,
}

impl StreamingStart {
    pub(crate) fn from_set(set: &ElementarySet) -> Self {
        Self {
            service: set.service(),
            label: set.label().to_string(),
            subsystem: set.subsystem(),
            created_at: Utc::now(),
            components: set.iter().map(StartComponent::from).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn component_by_pid(&self, pid: u16) -> Option<&StartComponent> {
        self.components.iter().find(|c| c.pid == pid)
    }

    pub fn component_by_index(&self, index: u32) -> Option<&StartComponent> {
        self.components.iter().find(|c| c.index == index)
    }

    pub fn components_of(&self, class: ComponentClass) -> impl Iterator<Item = &StartComponent> {
        self.components.iter().filter(move |c| c.class == class)
    }
}
