//! # MPEG Transport Stream primitives
//!
//! The pieces of TS handling the elementary-stream set consumes directly:
//!
//! - TS packet header parsing (PID, continuity counter, discontinuity flag)
//! - PSI section header parsing and CRC checking
//! - PMT parsing into elementary-stream entries and their descriptors
//! - Section reassembly across packets for per-stream tables
//! - AIT (HbbTV application information) decoding
//!
//! ## Example
//!
//! ```rust
//! use esset::ts::{Pmt, PmtStream, TsParser, STREAM_TYPE_H264};
//! use bytes::BytesMut;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pmt = Pmt {
//!     program_number: 1,
//!     pcr_pid: 0x100,
//!     streams: vec![PmtStream {
//!         stream_type: STREAM_TYPE_H264,
//!         elementary_pid: 0x100,
//!         descriptors: vec![],
//!     }],
//!     ..Default::default()
//! };
//! let mut section = BytesMut::new();
//! pmt.write_section(&mut section);
//!
//! let parsed = TsParser::new().parse_pmt(&section)?;
//! assert_eq!(parsed.streams[0].elementary_pid, 0x100);
//! # Ok(())
//! # }
//! ```

/// AIT decoding
pub mod ait;

/// Header, section and PMT parsing
pub mod parser;

/// Section reassembly
pub mod psi;

/// Core TS types and constants
pub mod types;

pub use ait::{Ait, AitApplication, ControlCode};
pub use parser::{parse_descriptors, TsParser};
pub use psi::PsiTable;
pub use types::*;
