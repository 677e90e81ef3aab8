//! # Elementary-stream sets
//!
//! An [`ElementarySet`] holds the components of one service: every live
//! [`ElementaryStream`] in insertion order, the subsequence selected for one
//! downstream [`Subsystem`], and a one-entry PID cache in front of lookups.
//!
//! The signalling layer drives membership through
//! [`stream_create`](ElementarySet::stream_create),
//! [`type_modify`](ElementarySet::type_modify),
//! [`type_destroy`](ElementarySet::type_destroy) or a whole-table
//! [`apply_pmt`](ElementarySet::apply_pmt). Consumers take an immutable
//! [`StreamingStart`] from [`build_start`](ElementarySet::build_start).
//!
//! ## Example
//!
//! ```rust
//! use esset::es::{ComponentType, ElementarySet, ServiceId, Subsystem};
//!
//! let mut set = ElementarySet::new(Subsystem::Live, "Das Erste HD", ServiceId(1));
//! set.stream_create(0x1401, ComponentType::Mpeg2Audio, true);
//! set.stream_create(0x1400, ComponentType::H264, true);
//! set.filter_build();
//!
//! assert!(set.has_audio_or_video());
//! let start = set.build_start();
//! assert_eq!(start.components[0].pid, 0x1400);
//! ```

/// Filter predicates and rules
pub mod filter;

/// The set itself
pub mod set;

/// Presentation ordering
pub mod sort;

/// Start descriptors
pub mod start;

/// One elementary stream
pub mod stream;

/// Component types and identifiers
pub mod types;

/// PMT reconciliation
pub mod update;


pub use filter::{FilterAction, FilterRule, Subsystem};
pub use set::{ElementarySet, StreamId};
pub use sort::{DefaultSortPolicy, SortPolicy};
pub use start::{StartComponent, StreamingStart};
pub use stream::ElementaryStream;
pub use types::{CaId, ComponentClass, ComponentType, ServiceId};
pub use update::{component_type_for, PmtUpdate};

use parking_lot::Mutex;
use std::sync::Arc;

/// A set behind the owning service's lock.
pub type SharedElementarySet = Arc<Mutex<ElementarySet>>;

/// Wraps a new set for sharing between the demux and consumer sides.
pub fn shared(subsystem: Subsystem, label: impl Into<String>, service: ServiceId) -> SharedElementarySet {
    Arc::new(Mutex::new(ElementarySet::new(subsystem, label, service)))
}
