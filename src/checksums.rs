// src/checksums.rs
//
// FCS-16 (reflected CRC-16, polynomial 0x8408) used by the tester's CHART and
// CHART_DISPLAY frames. The frame carries its own FCS low byte first, so a
// running FCS over the whole checksummed region lands on the fixed residual.

use serde::Serialize;

// ============================================================================
// Constants
// ============================================================================

/// Reversed form of the CCITT polynomial 0x1021.
pub const FCS16_POLYNOMIAL: u16 = 0x8408;

/// Initial FCS value.
pub const FCS16_INIT: u16 = 0xFFFF;

/// Residual left in the FCS register after a correct frame and its own FCS.
pub const FCS16_GOOD: u16 = 0xF0B8;

/// Lookup table, generated at compile time.
pub static FCS16_TABLE: [u16; 256] = build_fcs16_table();

// ============================================================================
// Types
// ============================================================================

/// Both values produced by a pass over a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChecksumResult {
    /// FCS register after consuming the frame including its own FCS bytes
    pub residual: u16,
    /// Checksum rebuilt from the register state just before the FCS bytes
    pub reconstructed: u16,
}

// ============================================================================
// Table Construction
// ============================================================================

/// Build the 256-entry table for the reflected polynomial.
pub const fn build_fcs16_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut b = 0;
    while b < 256 {
        let mut v = b as u16;
        let mut i = 0;
        while i < 8 {
            v = if v & 1 != 0 {
                (v >> 1) ^ FCS16_POLYNOMIAL
            } else {
                v >> 1
            };
            i += 1;
        }
        table[b] = v;
        b += 1;
    }
    table
}

// ============================================================================
// Running FCS
// ============================================================================

/// Advance the FCS register by one byte.
#[inline]
pub fn fcs16_update(fcs: u16, byte: u8) -> u16 {
    (fcs >> 8) ^ FCS16_TABLE[((fcs ^ byte as u16) & 0xFF) as usize]
}

/// Run the FCS over `data` starting from `init`.
pub fn fcs16(init: u16, data: &[u8]) -> u16 {
    data.iter().fold(init, |fcs, &b| fcs16_update(fcs, b))
}

/// The FCS value a sender appends to `data` (complemented register).
pub fn fcs16_checksum(data: &[u8]) -> u16 {
    fcs16(FCS16_INIT, data) ^ 0xFFFF
}

/// Compute both checksum values over `region`, the frame bytes up to and
/// including its two FCS bytes (the CR/LF trailer is not part of it).
///
/// The reconstructed value is rebuilt while iterating: at every index before
/// the two FCS bytes a candidate is formed from the previous and current
/// register state and overwrites the last one, so only the candidate taken at
/// `region.len() - 3` survives. Its low 16 bits are the register after the
/// payload, which complemented is the checksum the device embedded.
pub fn compute_checksums(region: &[u8]) -> ChecksumResult {
    let len = region.len();
    let mut current = FCS16_INIT;
    let mut candidate: u32 = 0;

    for (i, &byte) in region.iter().enumerate() {
        let last = current;
        current = fcs16_update(current, byte);
        if i + 2 < len {
            candidate = (((last ^ byte as u16) as u32) << 16) | current as u32;
        }
    }

    ChecksumResult {
        residual: current,
        reconstructed: ((candidate ^ 0xFFFF) & 0xFFFF) as u16,
    }
}

/// Read the little-endian checksum stored in the last two bytes of `region`.
pub fn extract_checksum(region: &[u8]) -> Option<u16> {
    match region {
        [.., lo, hi] => Some(u16::from_le_bytes([*lo, *hi])),
        _ => None,
    }
}

/// True when the residual is the good FCS and the rebuilt checksum matches
/// the two stored bytes.
pub fn fcs16_is_valid(region: &[u8]) -> bool {
    let Some(received) = extract_checksum(region) else {
        return false;
    };
    let result = compute_checksums(region);
    result.residual == FCS16_GOOD && result.reconstructed == received
}
