// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Parameters that can be overridden by a live route.

use std::io::{self, Read, Write};

use crate::serialize::Field;

/// A stored value paired with a live override.
///
/// `base` is what the user edits and what gets persisted. `routed` is the
/// value pushed by the engine while a route targets the parameter. Which one
/// is visible is decided per call by the caller's routing lookup.
///
/// Equality compares the stored value only; live values are transient.
#[derive(Debug, Clone, Copy, Default)]
pub struct Routable<T> {
    /// Stored value
    pub base: T,
    /// Live value pushed by the routing engine
    pub routed: T,
}

impl<T: Copy> Routable<T> {
    /// Create a parameter whose stored and live value are `value`
    pub const fn new(value: T) -> Self {
        Self {
            base: value,
            routed: value,
        }
    }

    /// Live value while routed, stored value otherwise
    #[inline]
    pub fn get(&self, routed: bool) -> T {
        if routed {
            self.routed
        } else {
            self.base
        }
    }

    /// Write the live value (`routed`) or the stored value
    #[inline]
    pub fn set(&mut self, value: T, routed: bool) {
        if routed {
            self.routed = value;
        } else {
            self.base = value;
        }
    }
}

impl<T: PartialEq> PartialEq for Routable<T> {
    fn eq(&self, other: &Self) -> bool {
        self.base == other.base
    }
}

/// Only the stored value is persisted
impl<T: Field + Copy> Field for Routable<T> {
    fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        self.base.write_to(out)
    }

    fn read_from<R: Read>(input: &mut R) -> io::Result<Self> {
        Ok(Routable::new(T::read_from(input)?))
    }
}
