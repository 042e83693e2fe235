// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Fixed-width integer domains for packed step fields.
//!
//! A domain is described purely at the type level: `UnsignedValue<3>` is the
//! range `0..=7`, `SignedValue<4>` is `-8..=7`. Setters clamp through these
//! domains before packing so a field can never spill into its neighbours.

/// Unsigned domain `[0, 2^BITS - 1]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnsignedValue<const BITS: u32>;

impl<const BITS: u32> UnsignedValue<BITS> {
    /// Number of bits the value occupies when packed
    pub const BITS: u32 = BITS;
    /// Smallest legal value
    pub const MIN: i32 = 0;
    /// Largest legal value
    pub const MAX: i32 = (1 << BITS) - 1;
    /// Number of distinct values
    pub const RANGE: i32 = Self::MAX - Self::MIN + 1;

    /// Saturate `value` into the domain
    pub const fn clamp(value: i32) -> i32 {
        if value < Self::MIN {
            Self::MIN
        } else if value > Self::MAX {
            Self::MAX
        } else {
            value
        }
    }
}

/// Signed two's-complement domain `[-2^(BITS-1), 2^(BITS-1) - 1]`
///
/// Signed fields are stored biased, i.e. the packed value is `value - MIN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignedValue<const BITS: u32>;

impl<const BITS: u32> SignedValue<BITS> {
    /// Number of bits the value occupies when packed
    pub const BITS: u32 = BITS;
    /// Smallest legal value
    pub const MIN: i32 = -(1 << (BITS - 1));
    /// Largest legal value
    pub const MAX: i32 = (1 << (BITS - 1)) - 1;
    /// Number of distinct values
    pub const RANGE: i32 = Self::MAX - Self::MIN + 1;

    /// Saturate `value` into the domain
    pub const fn clamp(value: i32) -> i32 {
        if value < Self::MIN {
            Self::MIN
        } else if value > Self::MAX {
            Self::MAX
        } else {
            value
        }
    }

    /// Convert a domain value to its biased packed form
    pub const fn to_biased(value: i32) -> u32 {
        (Self::clamp(value) - Self::MIN) as u32
    }

    /// Convert a biased packed value back to the domain
    pub const fn from_biased(raw: u32) -> i32 {
        Self::MIN + raw as i32
    }
}
