use super::filter::{self, FilterRule, Subsystem};
use super::sort::{DefaultSortPolicy, SortPolicy};
use super::start::StreamingStart;
use super::stream::ElementaryStream;
use super::types::*;
use crate::config;
use log::{debug, trace};
use std::fmt;
use std::sync::Arc;

/// Generation-checked handle of a stream inside one [`ElementarySet`].
///
/// Handles of destroyed streams never resolve again, even after their slot is
/// reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamId {
    index: u32,
    generation: u32,
}

impl StreamId {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "es{}.{}", self.index, self.generation)
    }
}

struct Slot {
    generation: u32,
    stream: Option<ElementaryStream>,
}

fn resolve(slots: &[Slot], id: StreamId) -> Option<&ElementaryStream> {
    slots
        .get(id.index as usize)
        .filter(|slot| slot.generation == id.generation)
        .and_then(|slot| slot.stream.as_ref())
}

fn member(slots: &[Slot], id: StreamId) -> &ElementaryStream {
    match resolve(slots, id) {
        Some(es) => es,
        None => panic!("stream {} listed in set but not allocated", id),
    }
}

/// The elementary streams of one service.
///
/// `all` keeps every live stream in insertion order (or presentation order
/// after [`sort_streams`](Self::sort_streams)); `filter` is the subsequence
/// selected for the set's [`Subsystem`]. No internal locking: the owner
/// serialises access.
pub struct ElementarySet {
    slots: Vec<Slot>,
    free: Vec<u32>,
    all: Vec<StreamId>,
    filter: Vec<StreamId>,
    subsystem: Subsystem,
    label: String,
    service: ServiceId,
    last: Option<(u16, StreamId)>,
    next_position: u32,
    rules: Vec<FilterRule>,
    sort_policy: Arc<dyn SortPolicy>,
    scans: u64,
}

impl ElementarySet {
    /// Creates an empty set bound to a subsystem policy and owning service.
    pub fn new(subsystem: Subsystem, label: impl Into<String>, service: ServiceId) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            all: Vec::new(),
            filter: Vec::new(),
            subsystem,
            label: label.into(),
            service,
            last: None,
            next_position: 0,
            rules: Vec::new(),
            sort_policy: Arc::new(DefaultSortPolicy::from_config()),
            scans: 0,
        }
    }

    pub fn subsystem(&self) -> Subsystem {
        self.subsystem
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn service(&self) -> ServiceId {
        self.service
    }

    /// Destroys every stream and drops the label and filter rules.
    pub fn clean(&mut self) {
        self.clean_streams();
        self.label.clear();
        self.rules.clear();
    }

    /// Destroys every stream but keeps the set configuration.
    pub fn clean_streams(&mut self) {
        if !self.all.is_empty() {
            debug!("{}: removing {} stream(s)", self.label, self.all.len());
        }
        for id in std::mem::take(&mut self.all) {
            self.release(id);
        }
        self.filter.clear();
        self.last = None;
    }

    pub fn update_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
        let label = &self.label;
        for slot in &mut self.slots {
            if let Some(es) = slot.stream.as_mut() {
                es.relabel(label);
            }
        }
    }

    /// Removes one stream.
    ///
    /// # Panics
    ///
    /// If `id` is not a live member of this set.
    pub fn stream_destroy(&mut self, id: StreamId) {
        let Some(at) = self.all.iter().position(|&x| x == id) else {
            panic!("{}: stream {} is not a member of this set", self.label, id);
        };
        self.all.remove(at);
        self.filter.retain(|&x| x != id);
        if matches!(self.last, Some((_, cached)) if cached == id) {
            self.last = None;
        }
        self.release(id);
    }

    fn release(&mut self, id: StreamId) {
        if let Some(slot) = self.slots.get_mut(id.index as usize) {
            if slot.generation == id.generation {
                if let Some(es) = slot.stream.take() {
                    debug!("{}: destroyed", es.label());
                    self.free.push(id.index);
                }
            }
        }
    }

    pub fn has_streams(&self, filtered: bool) -> bool {
        if filtered {
            !self.filter.is_empty()
        } else {
            !self.all.is_empty()
        }
    }

    pub fn has_audio_or_video(&self) -> bool {
        self.iter()
            .any(|es| matches!(es.class(), ComponentClass::Audio | ComponentClass::Video))
    }

    pub fn has_no_audio(&self, filtered: bool) -> bool {
        let ids = if filtered { &self.filter } else { &self.all };
        !ids.iter()
            .any(|&id| member(&self.slots, id).class() == ComponentClass::Audio)
    }

    pub fn len(&self) -> usize {
        self.all.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    /// Streams in `all` order.
    pub fn iter(&self) -> impl Iterator<Item = &ElementaryStream> + '_ {
        self.all.iter().map(move |&id| member(&self.slots, id))
    }

    /// Streams in `filter` order.
    pub fn iter_filtered(&self) -> impl Iterator<Item = &ElementaryStream> + '_ {
        self.filter.iter().map(move |&id| member(&self.slots, id))
    }

    pub fn all_ids(&self) -> &[StreamId] {
        &self.all
    }

    pub fn filter_ids(&self) -> &[StreamId] {
        &self.filter
    }

    pub fn get(&self, id: StreamId) -> Option<&ElementaryStream> {
        resolve(&self.slots, id)
    }

    pub fn get_mut(&mut self, id: StreamId) -> Option<&mut ElementaryStream> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.stream.as_mut())
    }

    fn member_mut(&mut self, id: StreamId) -> &mut ElementaryStream {
        match self.get_mut(id) {
            Some(es) => es,
            None => panic!("stream {} listed in set but not allocated", id),
        }
    }

    /// Linear scans performed by [`find_id`](Self::find_id) on cache misses.
    pub fn scan_count(&self) -> u64 {
        self.scans
    }

    /// Looks a PID up, consulting the single-entry cache before scanning.
    pub fn find_id(&mut self, pid: u16) -> Option<StreamId> {
        if let Some((cached_pid, id)) = self.last {
            if cached_pid == pid {
                return Some(id);
            }
        }
        self.scans += 1;
        let slots = &self.slots;
        let id = self
            .all
            .iter()
            .copied()
            .find(|&id| member(slots, id).pid() == pid)?;
        self.last = Some((pid, id));
        Some(id)
    }

    pub fn find(&mut self, pid: u16) -> Option<&mut ElementaryStream> {
        let id = self.find_id(pid)?;
        self.get_mut(id)
    }

    /// First stream of the given type in `all` order.
    pub fn type_find(&mut self, component_type: ComponentType) -> Option<&mut ElementaryStream> {
        let slots = &self.slots;
        let id = self
            .all
            .iter()
            .copied()
            .find(|&id| member(slots, id).component_type() == component_type)?;
        self.get_mut(id)
    }

    /// Returns the stream for `pid`, creating it when absent. An existing
    /// stream is returned unchanged.
    pub fn stream_create(
        &mut self,
        pid: u16,
        component_type: ComponentType,
        running: bool,
    ) -> &mut ElementaryStream {
        if let Some(id) = self.find_id(pid) {
            return self.member_mut(id);
        }

        let index = self.iter().map(|es| es.index()).max().unwrap_or(0) + 1;
        let position = self.next_position;
        self.next_position += 1;

        let id = match self.free.pop() {
            Some(slot_index) => {
                let slot = &mut self.slots[slot_index as usize];
                slot.generation = slot.generation.wrapping_add(1);
                StreamId::new(slot_index, slot.generation)
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    stream: None,
                });
                StreamId::new((self.slots.len() - 1) as u32, 0)
            }
        };

        let mut es = ElementaryStream::new(
            id,
            position,
            index,
            pid,
            component_type,
            self.service,
            &self.label,
            config::get_cc_log_interval(),
        );
        es.pid_opened = running;
        debug!("{}: created (position {}, index {})", es.label(), position, index);

        self.slots[id.index as usize].stream = Some(es);
        self.all.push(id);
        self.last = Some((pid, id));
        self.member_mut(id)
    }

    /// Like [`stream_create`](Self::stream_create), but an existing stream
    /// takes the new type and running state.
    pub fn type_modify(
        &mut self,
        pid: u16,
        component_type: ComponentType,
        running: bool,
    ) -> &mut ElementaryStream {
        match self.find_id(pid) {
            Some(id) => {
                let label = self.label.clone();
                let es = self.member_mut(id);
                es.set_type(component_type, &label);
                es.pid_opened = running;
                es
            }
            None => self.stream_create(pid, component_type, running),
        }
    }

    /// Destroys every stream of the given type; returns how many went.
    pub fn type_destroy(&mut self, component_type: ComponentType) -> usize {
        let victims: Vec<StreamId> = self
            .iter()
            .filter(|es| es.component_type() == component_type)
            .map(|es| es.id())
            .collect();
        for &id in &victims {
            self.stream_destroy(id);
        }
        victims.len()
    }

    pub fn filter_rules(&self) -> &[FilterRule] {
        &self.rules
    }

    /// Installs filter rules; they take effect on the next
    /// [`filter_build`](Self::filter_build).
    pub fn set_filter_rules(&mut self, rules: Vec<FilterRule>) {
        self.rules = rules;
    }

    /// Populates an empty `filter` with the subsystem's default selection.
    pub fn init_filter_streams(&mut self) {
        let slots = &self.slots;
        let subsystem = self.subsystem;
        self.filter = self
            .all
            .iter()
            .copied()
            .filter(|&id| subsystem.admits(member(slots, id)))
            .collect();
    }

    /// Recomputes `filter` from `all`, preserving `all`'s order.
    pub fn filter_build(&mut self) {
        let streams: Vec<&ElementaryStream> = self.iter().collect();
        let selected = filter::select(&streams, self.subsystem, &self.rules);
        let filter: Vec<StreamId> = selected.iter_ones().map(|i| self.all[i]).collect();
        trace!(
            "{}: filter keeps {} of {} stream(s)",
            self.label,
            filter.len(),
            self.all.len()
        );
        self.filter = filter;
    }

    pub fn sort_policy(&self) -> &Arc<dyn SortPolicy> {
        &self.sort_policy
    }

    pub fn set_sort_policy(&mut self, policy: Arc<dyn SortPolicy>) {
        self.sort_policy = policy;
    }

    /// Reorders `all` into presentation order. `filter` keeps its order until
    /// the next [`filter_build`](Self::filter_build).
    pub fn sort_streams(&mut self) {
        let policy = Arc::clone(&self.sort_policy);
        let slots = &self.slots;
        self.all
            .sort_by(|&a, &b| policy.compare(member(slots, a), member(slots, b)));
    }

    /// Sorts the streams and snapshots them for downstream consumers.
    pub fn build_start(&mut self) -> Arc<StreamingStart> {
        self.sort_streams();
        Arc::new(StreamingStart::from_set(self))
    }
}

impl fmt::Debug for ElementarySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementarySet")
            .field("label", &self.label)
            .field("subsystem", &self.subsystem)
            .field("service", &self.service)
            .field("all", &self.iter().map(|es| es.pid()).collect::<Vec<_>>())
            .field(
                "filter",
                &self.iter_filtered().map(|es| es.pid()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
