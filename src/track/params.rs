// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Playback parameters shared by note, stochastic, logic and arp tracks.

use std::fmt;
use std::io::{self, Read, Write};

use crate::routing::{Routable, Routing, Target};
use crate::serialize::{Persist, ProjectVersion, VersionedReader, VersionedWriter};
use crate::types::utils::{adjusted_by_step, adjusted_enum, print_yes_no};
use crate::types::{CvUpdateMode, FillMode, ModelEnum, PlayMode};

/// Bounds of the four probability biases.
///
/// Each bias spans the range of the step field it biases, which differs
/// between step layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BiasRanges {
    pub gate_probability: i32,
    pub retrigger_probability: i32,
    pub length: i32,
    pub note_probability: i32,
}

/// Routable track parameters
#[derive(Debug, Clone, PartialEq)]
pub struct TrackParams {
    track_index: usize,
    bias_ranges: BiasRanges,
    play_mode: PlayMode,
    fill_mode: FillMode,
    fill_muted: bool,
    cv_update_mode: CvUpdateMode,
    slide_time: Routable<u8>,
    octave: Routable<i8>,
    transpose: Routable<i8>,
    rotate: Routable<i8>,
    gate_probability_bias: Routable<i8>,
    retrigger_probability_bias: Routable<i8>,
    length_bias: Routable<i8>,
    note_probability_bias: Routable<i8>,
}

impl TrackParams {
    /// Parameters at their defaults for steps with the given bias ranges
    pub fn new(bias_ranges: BiasRanges) -> Self {
        Self {
            track_index: 0,
            bias_ranges,
            play_mode: PlayMode::Aligned,
            fill_mode: FillMode::Gates,
            fill_muted: true,
            cv_update_mode: CvUpdateMode::Gate,
            slide_time: Routable::new(50),
            octave: Routable::new(0),
            transpose: Routable::new(0),
            rotate: Routable::new(0),
            gate_probability_bias: Routable::new(0),
            retrigger_probability_bias: Routable::new(0),
            length_bias: Routable::new(0),
            note_probability_bias: Routable::new(0),
        }
    }

    /// Reset to defaults, keeping the track index
    pub fn clear(&mut self) {
        let track_index = self.track_index;
        *self = Self::new(self.bias_ranges);
        self.track_index = track_index;
    }

    pub(crate) fn set_track_index(&mut self, track_index: usize) {
        self.track_index = track_index;
    }

    fn routed(&self, routing: &Routing, target: Target) -> bool {
        routing.is_routed(target, self.track_index)
    }

    // play mode

    pub fn play_mode(&self) -> PlayMode {
        self.play_mode
    }

    pub fn set_play_mode(&mut self, play_mode: PlayMode) {
        self.play_mode = play_mode;
    }

    pub fn edit_play_mode(&mut self, value: i32, _shift: bool) {
        self.play_mode = adjusted_enum(self.play_mode, value);
    }

    pub fn print_play_mode(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        out.write_str(self.play_mode.name())
    }

    // fill mode

    pub fn fill_mode(&self) -> FillMode {
        self.fill_mode
    }

    pub fn set_fill_mode(&mut self, fill_mode: FillMode) {
        self.fill_mode = fill_mode;
    }

    pub fn edit_fill_mode(&mut self, value: i32, _shift: bool) {
        self.fill_mode = adjusted_enum(self.fill_mode, value);
    }

    pub fn print_fill_mode(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        out.write_str(self.fill_mode.name())
    }

    // fill muted

    /// Whether fill also plays while the track is muted
    pub fn fill_muted(&self) -> bool {
        self.fill_muted
    }

    pub fn set_fill_muted(&mut self, fill_muted: bool) {
        self.fill_muted = fill_muted;
    }

    pub fn edit_fill_muted(&mut self, value: i32, _shift: bool) {
        self.fill_muted = value > 0;
    }

    pub fn print_fill_muted(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        print_yes_no(out, self.fill_muted)
    }

    // cv update mode

    pub fn cv_update_mode(&self) -> CvUpdateMode {
        self.cv_update_mode
    }

    pub fn set_cv_update_mode(&mut self, mode: CvUpdateMode) {
        self.cv_update_mode = mode;
    }

    pub fn edit_cv_update_mode(&mut self, value: i32, _shift: bool) {
        self.cv_update_mode = adjusted_enum(self.cv_update_mode, value);
    }

    pub fn print_cv_update_mode(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        out.write_str(self.cv_update_mode.name())
    }

    // slide time

    /// Slide time in percent
    pub fn slide_time(&self, routing: &Routing) -> i32 {
        self.slide_time.get(self.routed(routing, Target::SlideTime)) as i32
    }

    pub fn set_slide_time(&mut self, slide_time: i32, routed: bool) {
        self.slide_time.set(slide_time.clamp(0, 100) as u8, routed);
    }

    /// Adjust in steps of 5 unless `shift` is held
    pub fn edit_slide_time(&mut self, routing: &Routing, value: i32, shift: bool) {
        if !self.routed(routing, Target::SlideTime) {
            self.set_slide_time(adjusted_by_step(self.slide_time(routing), value, 5, !shift), false);
        }
    }

    pub fn print_slide_time(&self, routing: &Routing, out: &mut dyn fmt::Write) -> fmt::Result {
        routing.print_routed(out, Target::SlideTime, self.track_index)?;
        write!(out, "{}%", self.slide_time(routing))
    }

    // octave

    pub fn octave(&self, routing: &Routing) -> i32 {
        self.octave.get(self.routed(routing, Target::Octave)) as i32
    }

    pub fn set_octave(&mut self, octave: i32, routed: bool) {
        self.octave.set(octave.clamp(-10, 10) as i8, routed);
    }

    pub fn edit_octave(&mut self, routing: &Routing, value: i32, _shift: bool) {
        if !self.routed(routing, Target::Octave) {
            self.set_octave(self.octave(routing) + value, false);
        }
    }

    pub fn print_octave(&self, routing: &Routing, out: &mut dyn fmt::Write) -> fmt::Result {
        routing.print_routed(out, Target::Octave, self.track_index)?;
        write!(out, "{:+}", self.octave(routing))
    }

    // transpose

    pub fn transpose(&self, routing: &Routing) -> i32 {
        self.transpose.get(self.routed(routing, Target::Transpose)) as i32
    }

    pub fn set_transpose(&mut self, transpose: i32, routed: bool) {
        self.transpose.set(transpose.clamp(-100, 100) as i8, routed);
    }

    pub fn edit_transpose(&mut self, routing: &Routing, value: i32, _shift: bool) {
        if !self.routed(routing, Target::Transpose) {
            self.set_transpose(self.transpose(routing) + value, false);
        }
    }

    pub fn print_transpose(&self, routing: &Routing, out: &mut dyn fmt::Write) -> fmt::Result {
        routing.print_routed(out, Target::Transpose, self.track_index)?;
        write!(out, "{:+}", self.transpose(routing))
    }

    // rotate

    pub fn rotate(&self, routing: &Routing) -> i32 {
        self.rotate.get(self.routed(routing, Target::Rotate)) as i32
    }

    pub fn set_rotate(&mut self, rotate: i32, routed: bool) {
        self.rotate.set(rotate.clamp(-64, 64) as i8, routed);
    }

    pub fn edit_rotate(&mut self, routing: &Routing, value: i32, _shift: bool) {
        if !self.routed(routing, Target::Rotate) {
            self.set_rotate(self.rotate(routing) + value, false);
        }
    }

    pub fn print_rotate(&self, routing: &Routing, out: &mut dyn fmt::Write) -> fmt::Result {
        routing.print_routed(out, Target::Rotate, self.track_index)?;
        write!(out, "{:+}", self.rotate(routing))
    }

    // probability biases

    pub fn gate_probability_bias(&self, routing: &Routing) -> i32 {
        self.gate_probability_bias
            .get(self.routed(routing, Target::GateProbabilityBias)) as i32
    }

    pub fn set_gate_probability_bias(&mut self, bias: i32, routed: bool) {
        let range = self.bias_ranges.gate_probability;
        self.gate_probability_bias
            .set(bias.clamp(-range, range) as i8, routed);
    }

    pub fn edit_gate_probability_bias(&mut self, routing: &Routing, value: i32, _shift: bool) {
        if !self.routed(routing, Target::GateProbabilityBias) {
            self.set_gate_probability_bias(self.gate_probability_bias(routing) + value, false);
        }
    }

    pub fn print_gate_probability_bias(&self, routing: &Routing, out: &mut dyn fmt::Write) -> fmt::Result {
        routing.print_routed(out, Target::GateProbabilityBias, self.track_index)?;
        print_bias(
            out,
            self.gate_probability_bias(routing),
            self.bias_ranges.gate_probability,
        )
    }

    pub fn retrigger_probability_bias(&self, routing: &Routing) -> i32 {
        self.retrigger_probability_bias
            .get(self.routed(routing, Target::RetriggerProbabilityBias)) as i32
    }

    pub fn set_retrigger_probability_bias(&mut self, bias: i32, routed: bool) {
        let range = self.bias_ranges.retrigger_probability;
        self.retrigger_probability_bias
            .set(bias.clamp(-range, range) as i8, routed);
    }

    pub fn edit_retrigger_probability_bias(&mut self, routing: &Routing, value: i32, _shift: bool) {
        if !self.routed(routing, Target::RetriggerProbabilityBias) {
            let bias = self.retrigger_probability_bias(routing) + value;
            self.set_retrigger_probability_bias(bias, false);
        }
    }

    pub fn print_retrigger_probability_bias(
        &self,
        routing: &Routing,
        out: &mut dyn fmt::Write,
    ) -> fmt::Result {
        routing.print_routed(out, Target::RetriggerProbabilityBias, self.track_index)?;
        print_bias(
            out,
            self.retrigger_probability_bias(routing),
            self.bias_ranges.retrigger_probability,
        )
    }

    pub fn length_bias(&self, routing: &Routing) -> i32 {
        self.length_bias.get(self.routed(routing, Target::LengthBias)) as i32
    }

    pub fn set_length_bias(&mut self, bias: i32, routed: bool) {
        let range = self.bias_ranges.length;
        self.length_bias.set(bias.clamp(-range, range) as i8, routed);
    }

    pub fn edit_length_bias(&mut self, routing: &Routing, value: i32, _shift: bool) {
        if !self.routed(routing, Target::LengthBias) {
            self.set_length_bias(self.length_bias(routing) + value, false);
        }
    }

    pub fn print_length_bias(&self, routing: &Routing, out: &mut dyn fmt::Write) -> fmt::Result {
        routing.print_routed(out, Target::LengthBias, self.track_index)?;
        print_bias(out, self.length_bias(routing), self.bias_ranges.length)
    }

    pub fn note_probability_bias(&self, routing: &Routing) -> i32 {
        self.note_probability_bias
            .get(self.routed(routing, Target::NoteProbabilityBias)) as i32
    }

    pub fn set_note_probability_bias(&mut self, bias: i32, routed: bool) {
        let range = self.bias_ranges.note_probability;
        self.note_probability_bias
            .set(bias.clamp(-range, range) as i8, routed);
    }

    pub fn edit_note_probability_bias(&mut self, routing: &Routing, value: i32, _shift: bool) {
        if !self.routed(routing, Target::NoteProbabilityBias) {
            self.set_note_probability_bias(self.note_probability_bias(routing) + value, false);
        }
    }

    pub fn print_note_probability_bias(&self, routing: &Routing, out: &mut dyn fmt::Write) -> fmt::Result {
        routing.print_routed(out, Target::NoteProbabilityBias, self.track_index)?;
        print_bias(
            out,
            self.note_probability_bias(routing),
            self.bias_ranges.note_probability,
        )
    }

    /// Apply a routed track value; returns whether the target applied
    pub fn write_routed(&mut self, target: Target, int_value: i32) -> bool {
        match target {
            Target::SlideTime => self.set_slide_time(int_value, true),
            Target::Octave => self.set_octave(int_value, true),
            Target::Transpose => self.set_transpose(int_value, true),
            Target::Rotate => self.set_rotate(int_value, true),
            Target::GateProbabilityBias => self.set_gate_probability_bias(int_value, true),
            Target::RetriggerProbabilityBias => {
                self.set_retrigger_probability_bias(int_value, true)
            }
            Target::LengthBias => self.set_length_bias(int_value, true),
            Target::NoteProbabilityBias => self.set_note_probability_bias(int_value, true),
            _ => return false,
        }
        true
    }
}

/// Print a bias as a percentage of its range
pub(crate) fn print_bias(out: &mut dyn fmt::Write, bias: i32, range: i32) -> fmt::Result {
    write!(out, "{:+.1}%", bias as f32 * 100.0 / range.max(1) as f32)
}

impl Persist for TrackParams {
    fn write<W: Write>(&self, writer: &mut VersionedWriter<W>) -> io::Result<()> {
        writer.write(&self.play_mode)?;
        writer.write(&self.fill_mode)?;
        writer.write(&self.fill_muted)?;
        writer.write(&self.cv_update_mode)?;
        writer.write(&self.slide_time)?;
        writer.write(&self.octave)?;
        writer.write(&self.transpose)?;
        writer.write(&self.rotate)?;
        writer.write(&self.gate_probability_bias)?;
        writer.write(&self.retrigger_probability_bias)?;
        writer.write(&self.length_bias)?;
        writer.write(&self.note_probability_bias)
    }

    fn read<R: Read>(&mut self, reader: &mut VersionedReader<R>) -> io::Result<()> {
        reader.read(&mut self.play_mode)?;
        reader.read(&mut self.fill_mode)?;
        reader.read_since(&mut self.fill_muted, ProjectVersion::V22)?;
        reader.read_since(&mut self.cv_update_mode, ProjectVersion::V23)?;
        reader.read(&mut self.slide_time)?;
        reader.read(&mut self.octave)?;
        reader.read(&mut self.transpose)?;
        reader.read(&mut self.rotate)?;
        reader.read(&mut self.gate_probability_bias)?;
        reader.read(&mut self.retrigger_probability_bias)?;
        reader.read(&mut self.length_bias)?;
        reader.read(&mut self.note_probability_bias)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialize::{from_bytes, to_bytes};

    const RANGES: BiasRanges = BiasRanges {
        gate_probability: 8,
        retrigger_probability: 8,
        length: 8,
        note_probability: 8,
    };

    #[test]
    fn test_defaults() {
        let routing = Routing::new();
        let params = TrackParams::new(RANGES);
        assert_eq!(params.play_mode(), PlayMode::Aligned);
        assert_eq!(params.fill_mode(), FillMode::Gates);
        assert!(params.fill_muted());
        assert_eq!(params.slide_time(&routing), 50);
        assert_eq!(params.octave(&routing), 0);
    }

    #[test]
    fn test_setters_clamp() {
        let routing = Routing::new();
        let mut params = TrackParams::new(RANGES);
        params.set_slide_time(150, false);
        params.set_octave(-20, false);
        params.set_transpose(120, false);
        params.set_rotate(-99, false);
        params.set_length_bias(20, false);
        assert_eq!(params.slide_time(&routing), 100);
        assert_eq!(params.octave(&routing), -10);
        assert_eq!(params.transpose(&routing), 100);
        assert_eq!(params.rotate(&routing), -64);
        assert_eq!(params.length_bias(&routing), 8);
    }

    #[test]
    fn test_edit_slide_time_snaps() {
        let routing = Routing::new();
        let mut params = TrackParams::new(RANGES);
        params.set_slide_time(52, false);
        params.edit_slide_time(&routing, 1, false);
        assert_eq!(params.slide_time(&routing), 55);
        params.edit_slide_time(&routing, 1, true);
        assert_eq!(params.slide_time(&routing), 56);
    }

    #[test]
    fn test_routed_values_are_live_only() {
        let mut routing = Routing::new();
        routing.edit_route(Target::Transpose, 3).unwrap();
        let mut params = TrackParams::new(RANGES);
        params.set_track_index(3);
        assert!(params.write_routed(Target::Transpose, 12));
        assert!(!params.write_routed(Target::Divisor, 12));

        assert_eq!(params.transpose(&routing), 12);
        assert_eq!(params.transpose(&Routing::new()), 0);
        params.edit_transpose(&routing, 5, false);
        assert_eq!(params.transpose(&Routing::new()), 0);

        let mut text = String::new();
        params.print_transpose(&routing, &mut text).unwrap();
        assert_eq!(text, "*+12");
    }

    #[test]
    fn test_print_bias() {
        let routing = Routing::new();
        let mut params = TrackParams::new(RANGES);
        params.set_gate_probability_bias(-4, false);
        let mut text = String::new();
        params.print_gate_probability_bias(&routing, &mut text).unwrap();
        assert_eq!(text, "-50.0%");
    }

    #[test]
    fn test_fill_muted_defaults_before_v22() {
        let params = TrackParams::new(RANGES);
        let bytes = to_bytes(&params).unwrap();
        // Drop the version tag, fill muted and cv update mode
        let mut old = bytes[4..6].to_vec();
        old.extend_from_slice(&bytes[8..]);

        let mut decoded = TrackParams::new(RANGES);
        decoded.set_fill_muted(false);
        let mut reader = VersionedReader::with_version(&old[..], 21);
        decoded.read(&mut reader).unwrap();
        assert!(!decoded.fill_muted());
        assert_eq!(decoded.cv_update_mode(), CvUpdateMode::Gate);
    }

    #[test]
    fn test_roundtrip() {
        let mut params = TrackParams::new(RANGES);
        params.set_play_mode(PlayMode::Free);
        params.set_cv_update_mode(CvUpdateMode::Always);
        params.set_note_probability_bias(-3, false);
        let bytes = to_bytes(&params).unwrap();
        let mut decoded = TrackParams::new(RANGES);
        from_bytes(&bytes, &mut decoded).unwrap();
        assert_eq!(decoded, params);
    }
}
