//! Stream selection for the `filter` subsequence of a set.
//!
//! Selection runs in two stages. The set's [`Subsystem`] first decides which
//! streams are admissible at all. Optional [`FilterRule`]s then refine the
//! admitted streams class by class; a class without rules keeps everything
//! admitted. The result is a bit per position of `all`, so the filter always
//! keeps `all`'s relative order.

use super::stream::ElementaryStream;
use super::types::*;
use bitvec::prelude::*;

/// Downstream consumer a set is maintained for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subsystem {
    /// Generic service tracking, everything selected.
    Service,
    /// Live playback/streaming, everything selected.
    Live,
    /// Recording: no CA/AIT signalling and no data carousels.
    Recording,
    /// Descrambler feed: scrambled streams and CA signalling only.
    Descrambler,
}

impl Subsystem {
    pub fn admits(self, es: &ElementaryStream) -> bool {
        match self {
            Subsystem::Service | Subsystem::Live => true,
            Subsystem::Recording => !matches!(
                es.class(),
                ComponentClass::Signaling | ComponentClass::Data
            ),
            Subsystem::Descrambler => {
                es.is_scrambled() || es.component_type() == ComponentType::Ca
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Subsystem::Service => "service",
            Subsystem::Live => "live",
            Subsystem::Recording => "recording",
            Subsystem::Descrambler => "descrambler",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterAction {
    /// Select every matching stream.
    Use,
    /// Drop matching streams from consideration by later rules.
    Ignore,
    /// Select only the first matching stream.
    OneTime,
    /// Select the first matching stream as the only one of its class and stop
    /// evaluating rules for the class.
    Exclusive,
    /// Select matching streams only if nothing of the class was selected by
    /// earlier rules.
    Empty,
}

/// One selection rule. Unset criteria match anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterRule {
    pub class: ComponentClass,
    pub component: Option<ComponentType>,
    pub language: Option<String>,
    pub ca_id: Option<u16>,
    pub pid: Option<u16>,
    pub action: FilterAction,
}

impl FilterRule {
    pub fn new(class: ComponentClass, action: FilterAction) -> Self {
        Self {
            class,
            component: None,
            language: None,
            ca_id: None,
            pid: None,
            action,
        }
    }

    pub fn with_component(mut self, component: ComponentType) -> Self {
        self.component = Some(component);
        self
    }

    pub fn with_language(mut self, language: &str) -> Self {
        self.language = Some(language.to_ascii_lowercase());
        self
    }

    pub fn with_ca_id(mut self, caid: u16) -> Self {
        self.ca_id = Some(caid);
        self
    }

    pub fn with_pid(mut self, pid: u16) -> Self {
        self.pid = Some(pid);
        self
    }

    pub fn matches(&self, es: &ElementaryStream) -> bool {
        if es.class() != self.class {
            return false;
        }
        if self.component.is_some_and(|c| c != es.component_type()) {
            return false;
        }
        if self.pid.is_some_and(|pid| pid != es.pid()) {
            return false;
        }
        if let Some(lang) = &self.language {
            if es.lang.as_deref() != Some(lang.as_str()) {
                return false;
            }
        }
        if let Some(caid) = self.ca_id {
            if !es.ca_ids().iter().any(|c| c.caid == caid) {
                return false;
            }
        }
        true
    }
}

/// Computes the selection bit for every stream of `streams` (in `all` order).
pub(crate) fn select(
    streams: &[&ElementaryStream],
    subsystem: Subsystem,
    rules: &[FilterRule],
) -> BitVec {
    let admitted: BitVec = streams.iter().map(|es| subsystem.admits(es)).collect();
    if rules.is_empty() {
        return admitted;
    }

    let mut selected = bitvec![0; streams.len()];
    let mut ignored = bitvec![0; streams.len()];

    for class in ComponentClass::ALL {
        let members: Vec<usize> = admitted
            .iter_ones()
            .filter(|&i| streams[i].class() == class)
            .collect();
        let mut class_rules = rules.iter().filter(|r| r.class == class).peekable();
        if class_rules.peek().is_none() {
            for &i in &members {
                selected.set(i, true);
            }
            continue;
        }

        'rules: for rule in class_rules {
            let class_had_selection = members.iter().any(|&i| selected[i]);
            for &i in &members {
                if ignored[i] || !rule.matches(streams[i]) {
                    continue;
                }
                match rule.action {
                    FilterAction::Use => selected.set(i, true),
                    FilterAction::Ignore => ignored.set(i, true),
                    FilterAction::OneTime => {
                        selected.set(i, true);
                        break;
                    }
                    FilterAction::Exclusive => {
                        for &j in &members {
                            selected.set(j, j == i);
                        }
                        break 'rules;
                    }
                    FilterAction::Empty => {
                        if !class_had_selection {
                            selected.set(i, true);
                        }
                    }
                }
            }
        }
    }

    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::es::ElementarySet;
    use pretty_assertions::assert_eq;

    fn filtered(set: &ElementarySet) -> Vec<u16> {
        set.iter_filtered().map(|es| es.pid()).collect()
    }

    fn broadcast_set(subsystem: Subsystem) -> ElementarySet {
        let mut set = ElementarySet::new(subsystem, "svc", ServiceId(1));
        set.stream_create(0x100, ComponentType::H264, true);
        set.stream_create(0x101, ComponentType::Mpeg2Audio, true).set_language(b"ger");
        set.stream_create(0x102, ComponentType::Ac3, true).set_language(b"eng");
        set.stream_create(0x103, ComponentType::Mpeg2Audio, true).set_language(b"eng");
        set.stream_create(0x104, ComponentType::DvbSub, true).set_language(b"eng");
        set.stream_create(0x105, ComponentType::Hbbtv, true);
        set.stream_create(0x106, ComponentType::Data, true);
        set
    }

    #[test]
    fn test_subsystem_defaults() {
        let mut set = broadcast_set(Subsystem::Live);
        set.filter_build();
        assert_eq!(filtered(&set).len(), 7);

        let mut set = broadcast_set(Subsystem::Recording);
        set.init_filter_streams();
        assert_eq!(filtered(&set), vec![0x100, 0x101, 0x102, 0x103, 0x104]);

        let mut set = broadcast_set(Subsystem::Descrambler);
        set.find(0x100).unwrap().add_ca_id(CaId::new(0x0d00, 0x500));
        set.stream_create(0x500, ComponentType::Ca, false);
        set.filter_build();
        assert_eq!(filtered(&set), vec![0x100, 0x500]);
    }

    #[test]
    fn test_use_and_ignore() {
        let mut set = broadcast_set(Subsystem::Live);
        set.set_filter_rules(vec![
            FilterRule::new(ComponentClass::Audio, FilterAction::Ignore).with_language("ger"),
            FilterRule::new(ComponentClass::Audio, FilterAction::Use),
        ]);
        set.filter_build();
        assert_eq!(
            filtered(&set),
            vec![0x100, 0x102, 0x103, 0x104, 0x105, 0x106]
        );
    }

    #[test]
    fn test_one_time_and_exclusive() {
        let mut set = broadcast_set(Subsystem::Live);
        set.set_filter_rules(vec![
            FilterRule::new(ComponentClass::Audio, FilterAction::OneTime).with_language("eng"),
        ]);
        set.filter_build();
        assert_eq!(filtered(&set), vec![0x100, 0x102, 0x104, 0x105, 0x106]);

        set.set_filter_rules(vec![
            FilterRule::new(ComponentClass::Audio, FilterAction::Use),
            FilterRule::new(ComponentClass::Audio, FilterAction::Exclusive)
                .with_component(ComponentType::Ac3),
            FilterRule::new(ComponentClass::Audio, FilterAction::Use).with_pid(0x101),
        ]);
        set.filter_build();
        assert_eq!(filtered(&set), vec![0x100, 0x102, 0x104, 0x105, 0x106]);
    }

    #[test]
    fn test_empty_fallback() {
        let mut set = broadcast_set(Subsystem::Live);
        set.set_filter_rules(vec![
            FilterRule::new(ComponentClass::Audio, FilterAction::Use).with_language("fre"),
            FilterRule::new(ComponentClass::Audio, FilterAction::Empty).with_language("eng"),
        ]);
        set.filter_build();
        assert_eq!(filtered(&set), vec![0x100, 0x102, 0x103, 0x104, 0x105, 0x106]);

        set.set_filter_rules(vec![
            FilterRule::new(ComponentClass::Audio, FilterAction::Use).with_language("ger"),
            FilterRule::new(ComponentClass::Audio, FilterAction::Empty).with_language("eng"),
        ]);
        set.filter_build();
        assert_eq!(filtered(&set), vec![0x100, 0x101, 0x104, 0x105, 0x106]);
    }

    #[test]
    fn test_ca_rule() {
        let mut set = broadcast_set(Subsystem::Live);
        set.find(0x100).unwrap().add_ca_id(CaId::new(0x1802, 0x600));
        set.set_filter_rules(vec![
            FilterRule::new(ComponentClass::Video, FilterAction::Ignore).with_ca_id(0x1802),
        ]);
        set.filter_build();
        assert!(!filtered(&set).contains(&0x100));
    }
}
