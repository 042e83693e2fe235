// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Curve tracks.

use std::fmt;
use std::io::{self, Read, Write};

use super::params::print_bias;
use super::pattern_follow::TrackPatternFollow;
use super::{new_sequences, PatternTrack, SequenceArray};
use crate::routing::{Routable, Routing, Target};
use crate::sequence::curve::{GateProbability, SHAPE_VARIATION_PROBABILITY_MAX};
use crate::sequence::{CurveSequence, Sequence};
use crate::serialize::{read_array, write_array, Persist, ProjectVersion, VersionedReader, VersionedWriter};
use crate::types::utils::{adjusted_by_step, adjusted_enum};
use crate::types::{ModelEnum, PlayMode};

/// Offset bound in hundredths of a volt
pub const OFFSET_MAX: i32 = 500;

crate::model_enum! {
    /// What a curve track does while fill is held
    pub enum CurveFillMode {
        None => "None",
        Variation => "Variation",
        NextPattern => "Next Pattern",
        Invert => "Invert",
    }
}

crate::model_enum! {
    /// Output of a muted curve track
    pub enum MuteMode {
        LastValue => "Last Value",
        Zero => "0V",
        Min => "Min",
        Max => "Max",
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CurveTrack {
    track_index: usize,
    play_mode: PlayMode,
    fill_mode: CurveFillMode,
    mute_mode: MuteMode,
    slide_time: Routable<u8>,
    offset: Routable<i16>,
    rotate: Routable<i8>,
    shape_probability_bias: Routable<i8>,
    gate_probability_bias: Routable<i8>,
    pattern_follow: TrackPatternFollow,
    sequences: SequenceArray<CurveSequence>,
}

impl Default for CurveTrack {
    fn default() -> Self {
        Self {
            track_index: 0,
            play_mode: PlayMode::Aligned,
            fill_mode: CurveFillMode::None,
            mute_mode: MuteMode::LastValue,
            slide_time: Routable::new(0),
            offset: Routable::new(0),
            rotate: Routable::new(0),
            shape_probability_bias: Routable::new(0),
            gate_probability_bias: Routable::new(0),
            pattern_follow: TrackPatternFollow::default(),
            sequences: new_sequences(),
        }
    }
}

impl CurveTrack {
    fn routed(&self, routing: &Routing, target: Target) -> bool {
        routing.is_routed(target, self.track_index)
    }

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

    pub fn fill_mode(&self) -> CurveFillMode {
        self.fill_mode
    }

    pub fn set_fill_mode(&mut self, fill_mode: CurveFillMode) {
        self.fill_mode = fill_mode;
    }

    pub fn edit_fill_mode(&mut self, value: i32, _shift: bool) {
        self.fill_mode = adjusted_enum(self.fill_mode, value);
    }

    pub fn print_fill_mode(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        out.write_str(self.fill_mode.name())
    }

    pub fn mute_mode(&self) -> MuteMode {
        self.mute_mode
    }

    pub fn set_mute_mode(&mut self, mute_mode: MuteMode) {
        self.mute_mode = mute_mode;
    }

    pub fn edit_mute_mode(&mut self, value: i32, _shift: bool) {
        self.mute_mode = adjusted_enum(self.mute_mode, value);
    }

    pub fn print_mute_mode(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        out.write_str(self.mute_mode.name())
    }

    // slide time

    pub fn slide_time(&self, routing: &Routing) -> i32 {
        self.slide_time.get(self.routed(routing, Target::SlideTime)) as i32
    }

    pub fn set_slide_time(&mut self, slide_time: i32, routed: bool) {
        self.slide_time.set(slide_time.clamp(0, 100) as u8, routed);
    }

    pub fn edit_slide_time(&mut self, routing: &Routing, value: i32, shift: bool) {
        if !self.routed(routing, Target::SlideTime) {
            self.set_slide_time(adjusted_by_step(self.slide_time(routing), value, 5, !shift), false);
        }
    }

    pub fn print_slide_time(&self, routing: &Routing, out: &mut dyn fmt::Write) -> fmt::Result {
        routing.print_routed(out, Target::SlideTime, self.track_index)?;
        write!(out, "{}%", self.slide_time(routing))
    }

    // offset

    /// Output offset in hundredths of a volt
    pub fn offset(&self, routing: &Routing) -> i32 {
        self.offset.get(self.routed(routing, Target::Offset)) as i32
    }

    pub fn offset_volts(&self, routing: &Routing) -> f32 {
        self.offset(routing) as f32 * 0.01
    }

    pub fn set_offset(&mut self, offset: i32, routed: bool) {
        self.offset
            .set(offset.clamp(-OFFSET_MAX, OFFSET_MAX) as i16, routed);
    }

    /// Adjust by 0.01V, or by 0.1V with `shift`
    pub fn edit_offset(&mut self, routing: &Routing, value: i32, shift: bool) {
        if !self.routed(routing, Target::Offset) {
            let offset = adjusted_by_step(self.offset(routing), value, 10, shift);
            self.set_offset(offset, false);
        }
    }

    pub fn print_offset(&self, routing: &Routing, out: &mut dyn fmt::Write) -> fmt::Result {
        routing.print_routed(out, Target::Offset, self.track_index)?;
        write!(out, "{:+.2}V", self.offset_volts(routing))
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

    // biases

    pub fn shape_probability_bias(&self, routing: &Routing) -> i32 {
        self.shape_probability_bias
            .get(self.routed(routing, Target::ShapeProbabilityBias)) as i32
    }

    pub fn set_shape_probability_bias(&mut self, bias: i32, routed: bool) {
        let range = SHAPE_VARIATION_PROBABILITY_MAX;
        self.shape_probability_bias
            .set(bias.clamp(-range, range) as i8, routed);
    }

    pub fn edit_shape_probability_bias(&mut self, routing: &Routing, value: i32, _shift: bool) {
        if !self.routed(routing, Target::ShapeProbabilityBias) {
            self.set_shape_probability_bias(self.shape_probability_bias(routing) + value, false);
        }
    }

    pub fn print_shape_probability_bias(&self, routing: &Routing, out: &mut dyn fmt::Write) -> fmt::Result {
        routing.print_routed(out, Target::ShapeProbabilityBias, self.track_index)?;
        print_bias(
            out,
            self.shape_probability_bias(routing),
            SHAPE_VARIATION_PROBABILITY_MAX,
        )
    }

    pub fn gate_probability_bias(&self, routing: &Routing) -> i32 {
        self.gate_probability_bias
            .get(self.routed(routing, Target::GateProbabilityBias)) as i32
    }

    pub fn set_gate_probability_bias(&mut self, bias: i32, routed: bool) {
        let range = GateProbability::RANGE;
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
        print_bias(out, self.gate_probability_bias(routing), GateProbability::RANGE)
    }

    pub fn pattern_follow(&self) -> &TrackPatternFollow {
        &self.pattern_follow
    }

    pub fn pattern_follow_mut(&mut self) -> &mut TrackPatternFollow {
        &mut self.pattern_follow
    }

    pub fn sequence(&self, index: usize) -> &CurveSequence {
        &self.sequences[index]
    }

    pub fn sequence_mut(&mut self, index: usize) -> &mut CurveSequence {
        &mut self.sequences[index]
    }

    pub fn set_sequence(&mut self, index: usize, mut sequence: CurveSequence) {
        sequence.set_track_index(self.track_index);
        self.sequences[index] = sequence;
    }

    pub fn clear(&mut self) {
        let track_index = self.track_index;
        *self = Self::default();
        self.set_track_index(track_index);
    }

    /// Apply a routed value to the track or to every sequence
    pub fn write_routed(&mut self, target: Target, int_value: i32, float_value: f32) {
        match target {
            Target::SlideTime => self.set_slide_time(int_value, true),
            Target::Offset => self.set_offset(int_value, true),
            Target::Rotate => self.set_rotate(int_value, true),
            Target::ShapeProbabilityBias => self.set_shape_probability_bias(int_value, true),
            Target::GateProbabilityBias => self.set_gate_probability_bias(int_value, true),
            _ => {
                for sequence in self.sequences.iter_mut() {
                    sequence.write_routed(target, int_value, float_value);
                }
            }
        }
    }
}

impl PatternTrack for CurveTrack {
    type Sequence = CurveSequence;

    fn track_index(&self) -> usize {
        self.track_index
    }

    fn set_track_index(&mut self, track_index: usize) {
        self.track_index = track_index;
        for sequence in self.sequences.iter_mut() {
            sequence.set_track_index(track_index);
        }
    }

    fn sequences(&self) -> &SequenceArray<CurveSequence> {
        &self.sequences
    }

    fn sequences_mut(&mut self) -> &mut SequenceArray<CurveSequence> {
        &mut self.sequences
    }
}

impl Persist for CurveTrack {
    fn write<W: Write>(&self, writer: &mut VersionedWriter<W>) -> io::Result<()> {
        writer.write(&self.play_mode)?;
        writer.write(&self.fill_mode)?;
        writer.write(&self.mute_mode)?;
        writer.write(&self.slide_time)?;
        writer.write(&self.offset)?;
        writer.write(&self.rotate)?;
        writer.write(&self.shape_probability_bias)?;
        writer.write(&self.gate_probability_bias)?;
        self.pattern_follow.write(writer)?;
        write_array(writer, &self.sequences)
    }

    fn read<R: Read>(&mut self, reader: &mut VersionedReader<R>) -> io::Result<()> {
        reader.read(&mut self.play_mode)?;
        reader.read(&mut self.fill_mode)?;
        reader.read(&mut self.mute_mode)?;
        reader.read(&mut self.slide_time)?;
        reader.read(&mut self.offset)?;
        reader.read(&mut self.rotate)?;
        reader.read_since(&mut self.shape_probability_bias, ProjectVersion::V30)?;
        reader.read_since(&mut self.gate_probability_bias, ProjectVersion::V30)?;
        self.pattern_follow.read(reader)?;
        read_array(reader, &mut self.sequences)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialize::{from_bytes, to_bytes};

    #[test]
    fn test_offset_clamps_and_prints() {
        let routing = Routing::new();
        let mut track = CurveTrack::default();
        track.set_offset(-900, false);
        assert_eq!(track.offset(&routing), -OFFSET_MAX);

        track.set_offset(125, false);
        let mut text = String::new();
        track.print_offset(&routing, &mut text).unwrap();
        assert_eq!(text, "+1.25V");
    }

    #[test]
    fn test_edit_offset_steps() {
        let routing = Routing::new();
        let mut track = CurveTrack::default();
        track.edit_offset(&routing, 3, false);
        assert_eq!(track.offset(&routing), 3);
        track.edit_offset(&routing, 1, true);
        assert_eq!(track.offset(&routing), 10);
    }

    #[test]
    fn test_routed_offset_and_sequence_targets() {
        let mut routing = Routing::new();
        routing.edit_route(Target::Offset, 0).unwrap();
        routing.edit_route(Target::RunMode, 0).unwrap();
        let mut track = CurveTrack::default();
        track.write_routed(Target::Offset, 250, 2.5);
        track.write_routed(Target::RunMode, 2, 2.0);

        assert_eq!(track.offset(&routing), 250);
        assert_eq!(track.offset(&Routing::new()), 0);
        assert_eq!(
            track.sequence(4).base().run_mode(&routing),
            crate::types::RunMode::Pendulum
        );
    }

    #[test]
    fn test_clear_keeps_track_index() {
        let mut track = CurveTrack::default();
        track.set_track_index(6);
        track.set_mute_mode(MuteMode::Max);
        track.clear();
        assert_eq!(track.mute_mode(), MuteMode::LastValue);
        assert_eq!(track.track_index(), 6);
        assert_eq!(track.sequence(3).track_index(), 6);
    }

    #[test]
    fn test_roundtrip() {
        let mut track = CurveTrack::default();
        track.set_fill_mode(CurveFillMode::Invert);
        track.set_shape_probability_bias(-3, false);
        track.sequence_mut(1).set_shapes(&[3, 4, 5]);
        let bytes = to_bytes(&track).unwrap();
        let mut decoded = CurveTrack::default();
        from_bytes(&bytes, &mut decoded).unwrap();
        assert_eq!(decoded, track);
    }
}
