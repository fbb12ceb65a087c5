// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Chunk integrity code: standard CRC-32 (IEEE 802.3 polynomial).

/// Compute the CRC-32 of `data`.
///
/// The printer verifies each chunk frame against this value, computed over
/// the zero-padded chunk buffer.
pub fn checksum(data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_empty_input() {
        assert_eq!(checksum(b""), 0);
    }

    #[test]
    fn checksum_known_value() {
        // The CRC-32 check value from the catalogue of parametrised CRCs.
        assert_eq!(checksum(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn padding_changes_checksum() {
        let mut padded = b"G28\n".to_vec();
        padded.resize(16, 0);
        assert_ne!(checksum(b"G28\n"), checksum(&padded));
    }
}
