//! # Authority Codec
//!
//! Compact encoding for officer permission sets.
//!
//! The game reports permissions as a string of code letters (for example
//! `"XWS"`). Each letter maps to a fixed bit so a full permission set fits
//! in a `u16` row column. Encoding is pure, order-independent, and ignores
//! characters outside the alphabet.

// =============================================================================
// ALPHABET
// =============================================================================

/// Permission code letters in canonical order.
const AUTHORITY_CODES: [char; 8] = ['X', 'W', 'S', 'A', 'B', 'C', 'E', 'P'];

/// Bit values parallel to [`AUTHORITY_CODES`].
const AUTHORITY_BITS: [u16; 8] = [1, 2, 4, 8, 16, 32, 64, 128];

/// A single officer permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Authority {
    /// `X` — full executive control over the region.
    Executive = 1,
    /// `W` — World Assembly representation.
    WorldAssembly = 2,
    /// `S` — succession rights.
    Succession = 4,
    /// `A` — appearance control.
    Appearance = 8,
    /// `B` — border control (ban and eject).
    BorderControl = 16,
    /// `C` — communications.
    Communications = 32,
    /// `E` — embassy management.
    Embassies = 64,
    /// `P` — poll management.
    Polls = 128,
}

// =============================================================================
// CODEC
// =============================================================================

/// Encode a permission string into bit flags.
///
/// Empty or whitespace-only input yields `0`. Unknown characters are
/// silently ignored; duplicates do not double-set bits.
#[must_use]
pub fn encode(authorities: &str) -> u16 {
    let trimmed = authorities.trim();
    if trimmed.is_empty() {
        return 0;
    }
    let mut flags = 0u16;
    for (code, bit) in AUTHORITY_CODES.iter().zip(AUTHORITY_BITS) {
        if trimmed.contains(*code) {
            flags |= bit;
        }
    }
    flags
}

/// Whether the encoded flags contain the given permission.
#[must_use]
pub fn has(flags: u16, authority: Authority) -> bool {
    flags & (authority as u16) != 0
}

// =============================================================================
// TESTS
// =============================================================================
