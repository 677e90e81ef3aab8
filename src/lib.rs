#![doc(html_root_url = "https://docs.rs/esset/0.1.0")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(rustdoc::missing_crate_level_docs)]

//! # esset - elementary-stream sets for transport stream services
//!
//! `esset` keeps track of the components of a tuned broadcast service: the
//! video, audio, subtitle, teletext and signalling streams that share one
//! program inside an MPEG transport stream, each identified by its PID.
//!
//! ## Features
//!
//! - PID-indexed stream set with a one-entry lookup cache
//! - Generation-checked stream handles in place of raw references
//! - Per-subsystem filtering (live, recording, descrambler) with optional
//!   selection rules
//! - Deterministic presentation ordering with a pluggable comparison policy
//! - Immutable start descriptors for downstream consumers
//! - PMT reconciliation, continuity-counter checks and per-stream AIT decoding
//!
//! ## Quick Start
//!
//! ```rust
//! use esset::es::{ComponentType, ElementarySet, ServiceId, Subsystem};
//!
//! let mut set = ElementarySet::new(Subsystem::Recording, "ZDF HD", ServiceId(28006));
//! set.stream_create(0x1838, ComponentType::Mpeg2Audio, true);
//! set.stream_create(0x1837, ComponentType::H264, true);
//! set.stream_create(0x1839, ComponentType::Hbbtv, true);
//! set.filter_build();
//!
//! // the AIT carrier is not recorded
//! assert_eq!(set.filter_ids().len(), 2);
//!
//! let start = set.build_start();
//! let order: Vec<u16> = start.components.iter().map(|c| c.pid).collect();
//! assert_eq!(order, vec![0x1837, 0x1838, 0x1839]);
//! ```
//!
//! ## Module Overview
//!
//! - `es`: streams, sets, filtering, ordering, start descriptors, PMT updates
//! - `ts`: TS header, PSI section, PMT and AIT parsing
//! - `config`: language preference and log-rate configuration
//! - `error`: error type and `Result` alias
//! - `utils`: CRC32 and log rate limiting

/// Configuration module
pub mod config;

/// Error types and utilities
pub mod error;

/// Elementary streams and stream sets
pub mod es;

/// Transport stream and PSI parsing
pub mod ts;

/// Common utilities and helper functions
pub mod utils;

pub use error::{EsError, Result};
pub use es::{ElementarySet, ElementaryStream, StreamingStart};
