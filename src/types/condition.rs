// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Step trigger conditions.
//!
//! A condition is stored as a 7-bit code inside the second step word. The
//! code space is laid out as the fixed conditions followed by every loop
//! condition `n:b` (trigger on iteration `n` of every `b`), then the negated
//! loop conditions.

use std::fmt;

use super::value::UnsignedValue;

/// Smallest loop base
const LOOP_BASE_MIN: u8 = 2;
/// Largest loop base
const LOOP_BASE_MAX: u8 = 8;
/// Number of fixed (non-loop) conditions
const FIXED_COUNT: u8 = 7;
/// Number of loop conditions (2 + 3 + ... + 8)
const LOOP_COUNT: u8 = 35;

/// Packed condition code domain
pub type ConditionValue = UnsignedValue<7>;

/// Decoded condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionKind {
    /// Always trigger
    Off,
    /// Trigger only while fill is active
    Fill,
    /// Trigger only while fill is inactive
    NotFill,
    /// Trigger when the previous condition evaluated true
    Pre,
    /// Trigger when the previous condition evaluated false
    NotPre,
    /// Trigger on the first iteration only
    First,
    /// Trigger on every iteration except the first
    NotFirst,
    /// Trigger on iteration `offset + 1` of every `base`
    Loop { offset: u8, base: u8 },
    /// Trigger on every iteration except `offset + 1` of every `base`
    NotLoop { offset: u8, base: u8 },
}

/// A step condition code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Condition(u8);

impl Condition {
    /// Always trigger
    pub const OFF: Condition = Condition(0);
    /// Fill only
    pub const FILL: Condition = Condition(1);
    /// Not while fill
    pub const NOT_FILL: Condition = Condition(2);
    /// Previous condition true
    pub const PRE: Condition = Condition(3);
    /// Previous condition false
    pub const NOT_PRE: Condition = Condition(4);
    /// First iteration
    pub const FIRST: Condition = Condition(5);
    /// Not first iteration
    pub const NOT_FIRST: Condition = Condition(6);
    /// Number of valid codes
    pub const COUNT: u8 = FIXED_COUNT + 2 * LOOP_COUNT;

    /// Condition for a raw code, clamped to the valid range
    pub fn from_code(code: i32) -> Self {
        let max = Self::COUNT as i32 - 1;
        Condition(code.clamp(0, max) as u8)
    }

    /// Raw code as stored in a step
    pub fn code(self) -> u8 {
        self.0
    }

    /// Loop condition `offset + 1 : base`
    pub fn looped(offset: u8, base: u8, negated: bool) -> Self {
        let base = base.clamp(LOOP_BASE_MIN, LOOP_BASE_MAX);
        let offset = offset.min(base - 1);
        let mut code = FIXED_COUNT;
        for b in LOOP_BASE_MIN..base {
            code += b;
        }
        code += offset;
        if negated {
            code += LOOP_COUNT;
        }
        Condition(code)
    }

    /// Decode the condition
    pub fn kind(self) -> ConditionKind {
        match self.0 {
            0 => ConditionKind::Off,
            1 => ConditionKind::Fill,
            2 => ConditionKind::NotFill,
            3 => ConditionKind::Pre,
            4 => ConditionKind::NotPre,
            5 => ConditionKind::First,
            6 => ConditionKind::NotFirst,
            code => {
                let mut index = code - FIXED_COUNT;
                let negated = index >= LOOP_COUNT;
                if negated {
                    index -= LOOP_COUNT;
                }
                let mut base = LOOP_BASE_MIN;
                while index >= base {
                    index -= base;
                    base += 1;
                }
                if negated {
                    ConditionKind::NotLoop { offset: index, base }
                } else {
                    ConditionKind::Loop { offset: index, base }
                }
            }
        }
    }

    /// Step through the code space by `delta`
    pub fn adjusted(self, delta: i32) -> Self {
        Self::from_code(self.0 as i32 + delta)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            ConditionKind::Off => write!(f, "Off"),
            ConditionKind::Fill => write!(f, "Fill"),
            ConditionKind::NotFill => write!(f, "!Fill"),
            ConditionKind::Pre => write!(f, "Pre"),
            ConditionKind::NotPre => write!(f, "!Pre"),
            ConditionKind::First => write!(f, "First"),
            ConditionKind::NotFirst => write!(f, "!First"),
            ConditionKind::Loop { offset, base } => write!(f, "{}:{}", offset + 1, base),
            ConditionKind::NotLoop { offset, base } => write!(f, "!{}:{}", offset + 1, base),
        }
    }
}

// Every code must fit the packed field
const _: () = assert!((Condition::COUNT as i32) <= ConditionValue::MAX + 1);
