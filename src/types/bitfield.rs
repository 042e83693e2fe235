// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Shift+mask views into a packed step word.
//!
//! Step layouts declare their fields as `BitField<OFFSET, BITS>` aliases and
//! check the whole table with [`layout_fits`] inside a `const` assertion, so an
//! overlapping or oversized layout fails to compile.

/// A `BITS` wide field starting at bit `OFFSET` of a `u32` word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitField<const OFFSET: u32, const BITS: u32>;

impl<const OFFSET: u32, const BITS: u32> BitField<OFFSET, BITS> {
    /// First bit of the field
    pub const OFFSET: u32 = OFFSET;
    /// Width of the field
    pub const BITS: u32 = BITS;
    /// Unshifted mask covering `BITS` bits
    pub const MASK: u32 = if BITS >= 32 { u32::MAX } else { (1u32 << BITS) - 1 };
    /// `(offset, bits)` pair used in layout tables
    pub const SPAN: (u32, u32) = (OFFSET, BITS);

    /// Extract the field from `word`
    #[inline]
    pub const fn get(word: u32) -> u32 {
        (word >> OFFSET) & Self::MASK
    }

    /// Return `word` with the field replaced by `value` (excess bits dropped)
    #[inline]
    pub const fn set(word: u32, value: u32) -> u32 {
        (word & !(Self::MASK << OFFSET)) | ((value & Self::MASK) << OFFSET)
    }

    /// Extract a single-bit field as a flag
    #[inline]
    pub const fn get_flag(word: u32) -> bool {
        Self::get(word) != 0
    }

    /// Return `word` with a single-bit field set to `flag`
    #[inline]
    pub const fn set_flag(word: u32, flag: bool) -> u32 {
        Self::set(word, flag as u32)
    }
}

/// Check that `fields` do not overlap and all fit into `word_bits`.
pub const fn layout_fits(fields: &[(u32, u32)], word_bits: u32) -> bool {
    let mut used: u64 = 0;
    let mut i = 0;
    while i < fields.len() {
        let (offset, bits) = fields[i];
        if bits == 0 || offset + bits > word_bits {
            return false;
        }
        let mask = ((1u64 << bits) - 1) << offset;
        if used & mask != 0 {
            return false;
        }
        used |= mask;
        i += 1;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    type Low = BitField<0, 3>;
    type Mid = BitField<3, 5>;
    type Top = BitField<31, 1>;

    #[test]
    fn test_get_set() {
        let mut word = 0;
        word = Low::set(word, 5);
        word = Mid::set(word, 17);
        word = Top::set_flag(word, true);

        assert_eq!(Low::get(word), 5);
        assert_eq!(Mid::get(word), 17);
        assert!(Top::get_flag(word));
    }

    #[test]
    fn test_set_does_not_touch_neighbours() {
        let word = Mid::set(u32::MAX, 0);
        assert_eq!(Low::get(word), 7);
        assert_eq!(Mid::get(word), 0);
        assert!(Top::get_flag(word));
    }

    #[test]
    fn test_excess_bits_dropped() {
        let word = Low::set(0, 0xff);
        assert_eq!(word, 0b111);
    }

    #[test]
    fn test_layout_fits() {
        assert!(layout_fits(&[Low::SPAN, Mid::SPAN, Top::SPAN], 32));
        // Overlap
        assert!(!layout_fits(&[(0, 4), (3, 2)], 32));
        // Too wide for a 16 bit word
        assert!(!layout_fits(&[(0, 4), (12, 8)], 16));
    }
}
