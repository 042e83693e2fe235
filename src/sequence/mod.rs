// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Sequences: fixed step arrays plus transport parameters.
//!
//! This module provides:
//! - [`SequenceBase`], the routable transport shared by note, curve, logic
//!   and arp sequences (divisor, reset measure, run mode, step bounds)
//! - [`SequenceKey`], the routable scale and root note selection
//! - One submodule per sequence type with its packed `Step`
//!
//! Getters that resolve routable values take the project [`Routing`] table;
//! the owning track index stored in every sequence selects the routes that
//! apply.

pub mod arp;
pub mod curve;
pub mod logic;
pub mod note;
pub mod stochastic;

pub use arp::ArpSequence;
pub use curve::CurveSequence;
pub use logic::LogicSequence;
pub use note::NoteSequence;
pub use stochastic::StochasticSequence;

use std::fmt;
use std::io::{self, Read, Write};

use crate::music::{print_root_note, print_scale, Scale};
use crate::routing::{Routable, Routing, Target};
use crate::serialize::{Persist, ProjectVersion, VersionedReader, VersionedWriter};
use crate::types::utils::{
    adjusted_by_divisor, adjusted_by_power_of_two, adjusted_enum, clamp_divisor,
    divisor_to_index, index_to_divisor, print_divisor,
};
use crate::types::{ModelEnum, RunMode};
use crate::STEP_COUNT;

/// Operations every sequence type supports
pub trait Sequence: Clone + Persist {
    /// Index of the owning track
    fn track_index(&self) -> usize;

    /// Propagate the owning track index
    fn set_track_index(&mut self, track_index: usize);

    /// Reset parameters and steps to their defaults
    fn clear(&mut self);

    /// Whether the sequence differs from a cleared one
    fn is_edited(&self) -> bool;

    /// Apply a live value pushed by a route; unsupported targets are ignored
    fn write_routed(&mut self, target: Target, int_value: i32, float_value: f32);
}

/// Bitmask of selected steps (bit n = step n)
pub type StepSelection = u64;

/// Routable transport parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceBase {
    track_index: usize,
    divisor: Routable<u16>,
    reset_measure: u8,
    run_mode: Routable<RunMode>,
    first_step: Routable<u8>,
    last_step: Routable<u8>,
}

impl Default for SequenceBase {
    fn default() -> Self {
        Self {
            track_index: 0,
            divisor: Routable::new(12),
            reset_measure: 0,
            run_mode: Routable::new(RunMode::Forward),
            first_step: Routable::new(0),
            last_step: Routable::new(15),
        }
    }
}

impl SequenceBase {
    /// Reset to defaults, keeping the track index
    pub fn clear(&mut self) {
        *self = Self {
            track_index: self.track_index,
            ..Self::default()
        };
    }

    /// Owning track
    pub fn track_index(&self) -> usize {
        self.track_index
    }

    pub(crate) fn set_track_index(&mut self, track_index: usize) {
        self.track_index = track_index;
    }

    fn routed(&self, routing: &Routing, target: Target) -> bool {
        routing.is_routed(target, self.track_index)
    }

    // divisor

    /// Clock divisor
    pub fn divisor(&self, routing: &Routing) -> i32 {
        self.divisor.get(self.routed(routing, Target::Divisor)) as i32
    }

    /// Set the divisor, clamped to `1..=768`
    pub fn set_divisor(&mut self, divisor: i32, routed: bool) {
        self.divisor.set(clamp_divisor(divisor) as u16, routed);
    }

    /// Position of the divisor in the known divisor list
    pub fn indexed_divisor(&self, routing: &Routing) -> Option<usize> {
        divisor_to_index(self.divisor(routing))
    }

    /// Select a known divisor by index; out of range indices are ignored
    pub fn set_indexed_divisor(&mut self, index: usize) {
        if let Some(divisor) = index_to_divisor(index) {
            self.set_divisor(divisor, false);
        }
    }

    /// Adjust the stored divisor unless routed
    pub fn edit_divisor(&mut self, routing: &Routing, value: i32, shift: bool) {
        if !self.routed(routing, Target::Divisor) {
            let divisor = adjusted_by_divisor(self.divisor(routing), value, shift);
            self.set_divisor(divisor, false);
        }
    }

    /// Print the divisor
    pub fn print_divisor(&self, routing: &Routing, out: &mut dyn fmt::Write) -> fmt::Result {
        routing.print_routed(out, Target::Divisor, self.track_index)?;
        print_divisor(out, self.divisor(routing))
    }

    // reset measure

    /// Bars after which playback restarts (0 = off)
    pub fn reset_measure(&self) -> i32 {
        self.reset_measure as i32
    }

    /// Set the reset measure, clamped to `0..=128`
    pub fn set_reset_measure(&mut self, reset_measure: i32) {
        self.reset_measure = reset_measure.clamp(0, 128) as u8;
    }

    /// Adjust the reset measure; shift doubles or halves
    pub fn edit_reset_measure(&mut self, value: i32, shift: bool) {
        self.set_reset_measure(adjusted_by_power_of_two(self.reset_measure(), value, shift));
    }

    /// Print the reset measure
    pub fn print_reset_measure(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        print_reset_measure(out, self.reset_measure())
    }

    // run mode

    /// Step order
    pub fn run_mode(&self, routing: &Routing) -> RunMode {
        self.run_mode.get(self.routed(routing, Target::RunMode))
    }

    /// Set the step order
    pub fn set_run_mode(&mut self, run_mode: RunMode, routed: bool) {
        self.run_mode.set(run_mode, routed);
    }

    /// Step through run modes unless routed
    pub fn edit_run_mode(&mut self, routing: &Routing, value: i32, _shift: bool) {
        if !self.routed(routing, Target::RunMode) {
            self.set_run_mode(adjusted_enum(self.run_mode(routing), value), false);
        }
    }

    /// Print the run mode
    pub fn print_run_mode(&self, routing: &Routing, out: &mut dyn fmt::Write) -> fmt::Result {
        routing.print_routed(out, Target::RunMode, self.track_index)?;
        out.write_str(self.run_mode(routing).name())
    }

    // first / last step

    /// First played step
    pub fn first_step(&self, routing: &Routing) -> i32 {
        self.first_step.get(self.routed(routing, Target::FirstStep)) as i32
    }

    /// Last played step, never before the first step.
    ///
    /// A routed first step may legitimately pass the stored last step, so
    /// the bound is enforced here as well as on load.
    pub fn last_step(&self, routing: &Routing) -> i32 {
        let last = self.last_step.get(self.routed(routing, Target::LastStep)) as i32;
        last.max(self.first_step(routing))
    }

    /// Set the first step; stored edits are bounded by the stored last step
    pub fn set_first_step(&mut self, first_step: i32, routed: bool) {
        let max = if routed {
            STEP_COUNT as i32 - 1
        } else {
            self.last_step.base as i32
        };
        self.first_step.set(first_step.clamp(0, max) as u8, routed);
    }

    /// Set the last step; stored edits are bounded by the stored first step
    pub fn set_last_step(&mut self, last_step: i32, routed: bool) {
        let min = if routed { 0 } else { self.first_step.base as i32 };
        self.last_step
            .set(last_step.clamp(min, STEP_COUNT as i32 - 1) as u8, routed);
    }

    /// Adjust the first step; shift moves both bounds
    pub fn edit_first_step(&mut self, routing: &Routing, value: i32, shift: bool) {
        if shift {
            self.offset_first_and_last_step(routing, value);
        } else if !self.routed(routing, Target::FirstStep) {
            self.set_first_step(self.first_step.base as i32 + value, false);
        }
    }

    /// Adjust the last step; shift moves both bounds
    pub fn edit_last_step(&mut self, routing: &Routing, value: i32, shift: bool) {
        if shift {
            self.offset_first_and_last_step(routing, value);
        } else if !self.routed(routing, Target::LastStep) {
            self.set_last_step(self.last_step.base as i32 + value, false);
        }
    }

    /// Print the first step (1-based)
    pub fn print_first_step(&self, routing: &Routing, out: &mut dyn fmt::Write) -> fmt::Result {
        routing.print_routed(out, Target::FirstStep, self.track_index)?;
        write!(out, "{}", self.first_step(routing) + 1)
    }

    /// Print the last step (1-based)
    pub fn print_last_step(&self, routing: &Routing, out: &mut dyn fmt::Write) -> fmt::Result {
        routing.print_routed(out, Target::LastStep, self.track_index)?;
        write!(out, "{}", self.last_step(routing) + 1)
    }

    /// Stored step bounds, used by editing operations
    pub fn stored_step_range(&self) -> (usize, usize) {
        let first = self.first_step.base as usize;
        let last = (self.last_step.base as usize).max(first);
        (first, last)
    }

    fn offset_first_and_last_step(&mut self, routing: &Routing, value: i32) {
        if self.routed(routing, Target::FirstStep) || self.routed(routing, Target::LastStep) {
            return;
        }
        let (first, last) = self.stored_step_range();
        let value = value.clamp(-(first as i32), STEP_COUNT as i32 - 1 - last as i32);
        if value > 0 {
            self.set_last_step(last as i32 + value, false);
            self.set_first_step(first as i32 + value, false);
        } else {
            self.set_first_step(first as i32 + value, false);
            self.set_last_step(last as i32 + value, false);
        }
    }

    /// Repair a persisted combination with the last step before the first
    pub(crate) fn normalize(&mut self) {
        if self.last_step.base < self.first_step.base {
            self.last_step = Routable::new(self.first_step.base);
        }
    }

    /// Apply a routed transport value; returns whether the target applied
    pub fn write_routed(&mut self, target: Target, int_value: i32) -> bool {
        match target {
            Target::Divisor => self.set_divisor(int_value, true),
            Target::RunMode => self.set_run_mode(RunMode::from_index(int_value.max(0) as usize), true),
            Target::FirstStep => self.set_first_step(int_value, true),
            Target::LastStep => self.set_last_step(int_value, true),
            _ => return false,
        }
        true
    }
}

impl Persist for SequenceBase {
    fn write<W: Write>(&self, writer: &mut VersionedWriter<W>) -> io::Result<()> {
        writer.write(&self.divisor)?;
        writer.write(&self.reset_measure)?;
        writer.write(&self.run_mode)?;
        writer.write(&self.first_step)?;
        writer.write(&self.last_step)
    }

    fn read<R: Read>(&mut self, reader: &mut VersionedReader<R>) -> io::Result<()> {
        read_divisor(reader, &mut self.divisor)?;
        reader.read(&mut self.reset_measure)?;
        reader.read(&mut self.run_mode)?;
        reader.read(&mut self.first_step)?;
        reader.read(&mut self.last_step)?;
        self.normalize();
        Ok(())
    }
}

/// Read a divisor that was a `u8` before version 10
pub(crate) fn read_divisor<R: Read>(
    reader: &mut VersionedReader<R>,
    divisor: &mut Routable<u16>,
) -> io::Result<()> {
    let mut value = divisor.base;
    if reader.data_version() < ProjectVersion::V10 {
        reader.read_as::<u8, _>(&mut value)?;
    } else {
        reader.read(&mut value)?;
    }
    *divisor = Routable::new(value);
    Ok(())
}

/// Print a reset measure (`off`, `1 bar`, `4 bars`)
pub(crate) fn print_reset_measure(out: &mut dyn fmt::Write, reset_measure: i32) -> fmt::Result {
    match reset_measure {
        0 => out.write_str("off"),
        1 => out.write_str("1 bar"),
        n => write!(out, "{} bars", n),
    }
}

/// Routable scale and root note selection
///
/// `-1` selects the project default for both.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceKey {
    track_index: usize,
    scale: Routable<i8>,
    root_note: Routable<i8>,
}

impl Default for SequenceKey {
    fn default() -> Self {
        Self {
            track_index: 0,
            scale: Routable::new(-1),
            root_note: Routable::new(-1),
        }
    }
}

impl SequenceKey {
    /// Reset to the project defaults, keeping the track index
    pub fn clear(&mut self) {
        *self = Self {
            track_index: self.track_index,
            ..Self::default()
        };
    }

    pub(crate) fn set_track_index(&mut self, track_index: usize) {
        self.track_index = track_index;
    }

    /// Selected scale index, `-1` for the project default
    pub fn scale(&self, routing: &Routing) -> i32 {
        self.scale
            .get(routing.is_routed(Target::Scale, self.track_index)) as i32
    }

    /// Set the scale, clamped to `-1..Scale::COUNT`
    pub fn set_scale(&mut self, scale: i32, routed: bool) {
        self.scale
            .set(scale.clamp(-1, Scale::COUNT as i32 - 1) as i8, routed);
    }

    /// Scale as a 0-based list index (0 = default)
    pub fn indexed_scale(&self, routing: &Routing) -> i32 {
        self.scale(routing) + 1
    }

    /// Select the scale from a 0-based list index
    pub fn set_indexed_scale(&mut self, index: i32) {
        self.set_scale(index - 1, false);
    }

    /// Adjust the scale unless routed
    pub fn edit_scale(&mut self, routing: &Routing, value: i32, _shift: bool) {
        if !routing.is_routed(Target::Scale, self.track_index) {
            self.set_scale(self.scale(routing) + value, false);
        }
    }

    /// Print the scale
    pub fn print_scale(&self, routing: &Routing, out: &mut dyn fmt::Write) -> fmt::Result {
        routing.print_routed(out, Target::Scale, self.track_index)?;
        print_scale(out, self.scale(routing))
    }

    /// Scale in effect given the project default
    pub fn selected_scale(&self, routing: &Routing, default_scale: Scale) -> Scale {
        match self.scale(routing) {
            s if s < 0 => default_scale,
            s => Scale::from_index(s as usize),
        }
    }

    /// Selected root note, `-1` for the project default
    pub fn root_note(&self, routing: &Routing) -> i32 {
        self.root_note
            .get(routing.is_routed(Target::RootNote, self.track_index)) as i32
    }

    /// Set the root note, clamped to `-1..=11`
    pub fn set_root_note(&mut self, root_note: i32, routed: bool) {
        self.root_note.set(root_note.clamp(-1, 11) as i8, routed);
    }

    /// Root note as a 0-based list index (0 = default)
    pub fn indexed_root_note(&self, routing: &Routing) -> i32 {
        self.root_note(routing) + 1
    }

    /// Select the root note from a 0-based list index
    pub fn set_indexed_root_note(&mut self, index: i32) {
        self.set_root_note(index - 1, false);
    }

    /// Adjust the root note unless routed
    pub fn edit_root_note(&mut self, routing: &Routing, value: i32, _shift: bool) {
        if !routing.is_routed(Target::RootNote, self.track_index) {
            self.set_root_note(self.root_note(routing) + value, false);
        }
    }

    /// Print the root note
    pub fn print_root_note(&self, routing: &Routing, out: &mut dyn fmt::Write) -> fmt::Result {
        routing.print_routed(out, Target::RootNote, self.track_index)?;
        print_root_note(out, self.root_note(routing))
    }

    /// Root note in effect given the project default
    pub fn selected_root_note(&self, routing: &Routing, default_root_note: i32) -> i32 {
        match self.root_note(routing) {
            r if r < 0 => default_root_note,
            r => r,
        }
    }

    /// Apply a routed scale or root note; returns whether the target applied
    pub fn write_routed(&mut self, target: Target, int_value: i32) -> bool {
        match target {
            Target::Scale => self.set_scale(int_value, true),
            Target::RootNote => self.set_root_note(int_value, true),
            _ => return false,
        }
        true
    }
}

impl Persist for SequenceKey {
    fn write<W: Write>(&self, writer: &mut VersionedWriter<W>) -> io::Result<()> {
        writer.write(&self.scale)?;
        writer.write(&self.root_note)
    }

    fn read<R: Read>(&mut self, reader: &mut VersionedReader<R>) -> io::Result<()> {
        reader.read(&mut self.scale)?;
        reader.read(&mut self.root_note)
    }
}

/// Read the two words of a step.
///
/// Before version 27 the second word was 16 bits wide, and before version 5
/// only its low 5 bits were defined.
pub(crate) fn read_step_words<R: Read>(
    reader: &mut VersionedReader<R>,
    data0: &mut u32,
    data1: &mut u32,
) -> io::Result<()> {
    reader.read(data0)?;
    if reader.data_version() < ProjectVersion::V27 {
        reader.read_as::<u16, _>(data1)?;
        if reader.data_version() < ProjectVersion::V5 {
            *data1 &= 0x1f;
        }
    } else {
        reader.read(data1)?;
    }
    Ok(())
}

/// Rotate steps inside `[first, last]`, or only the selected ones
pub(crate) fn shift_step_range<T: Copy>(
    steps: &mut [T],
    selected: StepSelection,
    first: usize,
    last: usize,
    direction: i32,
) {
    use crate::types::utils::{shift_selected_steps, shift_steps};
    if selected != 0 {
        shift_selected_steps(steps, selected, first, last, direction);
    } else {
        shift_steps(steps, first, last, direction);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialize::{from_bytes, to_bytes};

    #[test]
    fn test_base_defaults() {
        let routing = Routing::new();
        let base = SequenceBase::default();
        assert_eq!(base.divisor(&routing), 12);
        assert_eq!(base.run_mode(&routing), RunMode::Forward);
        assert_eq!(base.first_step(&routing), 0);
        assert_eq!(base.last_step(&routing), 15);
    }

    #[test]
    fn test_step_bounds_stay_ordered() {
        let routing = Routing::new();
        let mut base = SequenceBase::default();
        base.set_first_step(40, false);
        assert_eq!(base.first_step(&routing), 15);
        base.set_last_step(3, false);
        assert_eq!(base.last_step(&routing), 15);
        base.set_last_step(99, false);
        assert_eq!(base.last_step(&routing), 63);
    }

    #[test]
    fn test_routed_first_step_guards_last_step() {
        let mut routing = Routing::new();
        routing.edit_route(Target::FirstStep, 0).unwrap();
        let mut base = SequenceBase::default();
        base.write_routed(Target::FirstStep, 30);
        assert_eq!(base.first_step(&routing), 30);
        assert_eq!(base.last_step(&routing), 30);
        // Stored bounds untouched
        assert_eq!(base.stored_step_range(), (0, 15));
    }

    #[test]
    fn test_edit_is_noop_while_routed() {
        let mut routing = Routing::new();
        let mut base = SequenceBase::default();
        base.set_track_index(3);
        routing.edit_route(Target::Divisor, 3).unwrap();
        base.edit_divisor(&routing, 1, false);
        assert_eq!(base.divisor(&Routing::new()), 12);

        base.edit_divisor(&Routing::new(), 1, true);
        assert_eq!(base.divisor(&Routing::new()), 16);
    }

    #[test]
    fn test_offset_first_and_last_step() {
        let routing = Routing::new();
        let mut base = SequenceBase::default();
        base.edit_first_step(&routing, 4, true);
        assert_eq!(base.stored_step_range(), (4, 19));
        base.edit_last_step(&routing, -10, true);
        assert_eq!(base.stored_step_range(), (0, 15));
        base.edit_last_step(&routing, 100, true);
        assert_eq!(base.stored_step_range(), (48, 63));
    }

    #[test]
    fn test_print_helpers_mark_routed() {
        let mut routing = Routing::new();
        routing.edit_route(Target::RunMode, 0).unwrap();
        let base = SequenceBase::default();
        let mut out = String::new();
        base.print_run_mode(&routing, &mut out).unwrap();
        assert_eq!(out, "*Forward");

        let mut out = String::new();
        base.print_reset_measure(&mut out).unwrap();
        assert_eq!(out, "off");
    }

    #[test]
    fn test_base_persist_normalizes_bounds() {
        let mut base = SequenceBase::default();
        base.first_step = Routable::new(20);
        base.last_step = Routable::new(10);
        let bytes = to_bytes(&base).unwrap();

        let mut decoded = SequenceBase::default();
        from_bytes(&bytes, &mut decoded).unwrap();
        assert_eq!(decoded.stored_step_range(), (20, 20));
        assert_eq!(decoded.last_step.base, 20);
    }

    #[test]
    fn test_divisor_read_as_u8_before_v10() {
        // divisor (u8), reset measure, run mode, first, last
        let bytes = [24u8, 0, 1, 0, 7];
        let mut reader = VersionedReader::with_version(&bytes[..], 9);
        let mut base = SequenceBase::default();
        base.read(&mut reader).unwrap();
        let routing = Routing::new();
        assert_eq!(base.divisor(&routing), 24);
        assert_eq!(base.run_mode(&routing), RunMode::Backward);
        assert_eq!(base.last_step(&routing), 7);
    }

    #[test]
    fn test_key_selection() {
        let routing = Routing::new();
        let mut key = SequenceKey::default();
        assert_eq!(key.selected_scale(&routing, Scale::Minor), Scale::Minor);
        assert_eq!(key.selected_root_note(&routing, 4), 4);

        key.set_indexed_scale(2);
        key.set_root_note(20, false);
        assert_eq!(key.selected_scale(&routing, Scale::Minor), Scale::Major);
        assert_eq!(key.root_note(&routing), 11);

        let mut out = String::new();
        key.print_root_note(&routing, &mut out).unwrap();
        assert_eq!(out, "B");
    }

    #[test]
    fn test_key_routed_write() {
        let mut routing = Routing::new();
        routing.edit_route(Target::Scale, 0).unwrap();
        let mut key = SequenceKey::default();
        assert!(key.write_routed(Target::Scale, 3));
        assert!(!key.write_routed(Target::Divisor, 3));
        assert_eq!(key.scale(&routing), 3);
        assert_eq!(key.scale(&Routing::new()), -1);
    }
}
