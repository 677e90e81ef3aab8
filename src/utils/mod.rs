//! # Utility Functions and Types
//!
//! - MPEG-2 CRC32 calculation and PSI section verification
//! - Rate limiting for high-frequency diagnostics
//!
//! ```rust
//! use esset::utils::Crc32Mpeg2;
//!
//! let crc = Crc32Mpeg2::new();
//! println!("CRC32: {:08x}", crc.calculate(b"Hello, world!"));
//! ```

/// CRC calculation implementations
pub mod crc;

/// Log rate limiting
pub mod limit;

pub use crc::Crc32Mpeg2;
pub use limit::LogLimiter;
