//! CRC32 as used by MPEG-2 PSI sections (ITU-T H.222.0 annex A).
//!
//! Polynomial 0x04C11DB7, initial value 0xFFFFFFFF, no reflection, no final XOR.
//! Running the algorithm over a whole section including its trailing CRC
//! yields zero for an intact section.

use crate::error::{EsError, Result};

const CRC32_MPEG2: u32 = 0x04C11DB7;

/// Table-driven MPEG-2 CRC32 calculator.
pub struct Crc32Mpeg2 {
    table: [u32; 256],
}

impl Crc32Mpeg2 {
    /// Builds the 256-entry lookup table.
    pub fn new() -> Self {
        let mut table = [0u32; 256];
        for (i, slot) in table.iter_mut().enumerate() {
            let mut crc = (i as u32) << 24;
            for _ in 0..8 {
                crc = if (crc & 0x8000_0000) != 0 {
                    (crc << 1) ^ CRC32_MPEG2
                } else {
                    crc << 1
                };
            }
            *slot = crc;
        }
        Self { table }
    }

    /// Computes the CRC of `data`.
    ///
    /// ```
    /// use esset::utils::Crc32Mpeg2;
    ///
    /// let crc = Crc32Mpeg2::new();
    /// assert_eq!(crc.calculate(&[0x01, 0x01]), 0xD66F_B816);
    /// ```
    pub fn calculate(&self, data: &[u8]) -> u32 {
        data.iter().fold(0xFFFF_FFFF, |crc, &byte| {
            let index = ((crc >> 24) ^ byte as u32) & 0xFF;
            (crc << 8) ^ self.table[index as usize]
        })
    }

    /// Checks a complete PSI section whose last four bytes hold the CRC.
    pub fn verify_section(&self, section: &[u8]) -> Result<()> {
        if section.len() < 4 {
            return Err(EsError::InvalidData("section too short for CRC".into()));
        }
        let (body, tail) = section.split_at(section.len() - 4);
        let expected = u32::from_be_bytes([tail[0], tail[1], tail[2], tail[3]]);
        let computed = self.calculate(body);
        if expected != computed {
            return Err(EsError::Crc { expected, computed });
        }
        Ok(())
    }
}

impl Default for Crc32Mpeg2 {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vector() {
        let crc = Crc32Mpeg2::new();
        assert_eq!(crc.calculate(&[0x01, 0x01]), 0xD66F_B816);
        assert_eq!(crc.calculate(&[]), 0xFFFF_FFFF);
    }

    #[test]
    fn test_verify_section() {
        let crc = Crc32Mpeg2::new();
        let mut section = vec![
            0x02, 0xB0, 0x0D, 0x00, 0x01, 0xC1, 0x00, 0x00, 0xE1, 0x00, 0xF0, 0x00,
        ];
        let value = crc.calculate(&section);
        section.extend_from_slice(&value.to_be_bytes());
        assert!(crc.verify_section(&section).is_ok());
        assert_eq!(crc.calculate(&section), 0);

        let last = section.len() - 1;
        section[last] ^= 0xFF;
        assert!(matches!(
            crc.verify_section(&section),
            Err(EsError::Crc { .. })
        ));
        assert!(crc.verify_section(&[0x00, 0x01]).is_err());
    }
}
