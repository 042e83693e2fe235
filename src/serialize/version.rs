// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Data version history of the project format.

/// Version tag stored at the start of every record
pub type DataVersion = u32;

/// Named data versions.
///
/// Only the versions a reader branches on are named; the remaining numbers
/// changed parts of the format this crate does not model.
pub struct ProjectVersion;

impl ProjectVersion {
    /// First tagged version
    pub const V1: DataVersion = 1;
    /// Step word1 grew beyond 5 bits
    pub const V5: DataVersion = 5;
    /// Step gate offset
    pub const V7: DataVersion = 7;
    /// Sequence divisor widened from u8 to u16
    pub const V10: DataVersion = 10;
    /// Step condition
    pub const V12: DataVersion = 12;
    /// Curve step gate word
    pub const V18: DataVersion = 18;
    /// Track fill muted flag
    pub const V22: DataVersion = 22;
    /// Track CV update mode
    pub const V23: DataVersion = 23;
    /// Step word1 widened from u16 to u32
    pub const V27: DataVersion = 27;
    /// Curve track shape probability bias
    pub const V30: DataVersion = 30;
    /// MIDI/CV slide time and transpose
    pub const V33: DataVersion = 33;
    /// Logic tracks
    pub const V34: DataVersion = 34;
    /// Arp tracks
    pub const V35: DataVersion = 35;
    /// Stochastic rest probabilities, length modifier and octave range
    pub const V36: DataVersion = 36;
    /// Stochastic sequence loop bounds
    pub const V37: DataVersion = 37;
    /// Stochastic track name
    pub const V38: DataVersion = 38;
    /// Pattern follow
    pub const V39: DataVersion = 39;
    /// Logic track input tracks
    pub const V40: DataVersion = 40;

    /// Version written by this crate
    pub const LATEST: DataVersion = Self::V40;
}
