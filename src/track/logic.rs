// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Logic tracks.
//!
//! A logic track reads the gates and notes of up to two other tracks and
//! combines them step by step.

use std::fmt;
use std::io::{self, Read, Write};

use super::params::{BiasRanges, TrackParams};
use super::pattern_follow::TrackPatternFollow;
use super::{new_sequences, PatternTrack, SequenceArray};
use crate::routing::Target;
use crate::sequence::logic::{GateProbability, Length, NoteVariationProbability, RetriggerProbability};
use crate::sequence::{LogicSequence, Sequence};
use crate::serialize::{read_array, write_array, Persist, ProjectVersion, VersionedReader, VersionedWriter};
use crate::types::utils::print_yes_no;
use crate::TRACK_COUNT;

const BIAS_RANGES: BiasRanges = BiasRanges {
    gate_probability: GateProbability::RANGE,
    retrigger_probability: RetriggerProbability::RANGE,
    length: Length::RANGE,
    note_probability: NoteVariationProbability::RANGE,
};

#[derive(Debug, Clone, PartialEq)]
pub struct LogicTrack {
    track_index: usize,
    params: TrackParams,
    pattern_follow: TrackPatternFollow,
    input_track1: i8,
    input_track2: i8,
    detailed_view: bool,
    sequences: SequenceArray<LogicSequence>,
}

impl Default for LogicTrack {
    fn default() -> Self {
        Self {
            track_index: 0,
            params: TrackParams::new(BIAS_RANGES),
            pattern_follow: TrackPatternFollow::default(),
            input_track1: -1,
            input_track2: -1,
            detailed_view: false,
            sequences: new_sequences(),
        }
    }
}

impl LogicTrack {
    pub fn params(&self) -> &TrackParams {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut TrackParams {
        &mut self.params
    }

    pub fn pattern_follow(&self) -> &TrackPatternFollow {
        &self.pattern_follow
    }

    pub fn pattern_follow_mut(&mut self) -> &mut TrackPatternFollow {
        &mut self.pattern_follow
    }

    /// First input track, `None` when unassigned
    pub fn input_track1(&self) -> Option<usize> {
        usize::try_from(self.input_track1).ok()
    }

    pub fn set_input_track1(&mut self, track: Option<usize>) {
        self.input_track1 = encode_input(track);
    }

    pub fn print_input_track1(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        print_input(out, self.input_track1())
    }

    /// Second input track, `None` when unassigned
    pub fn input_track2(&self) -> Option<usize> {
        usize::try_from(self.input_track2).ok()
    }

    pub fn set_input_track2(&mut self, track: Option<usize>) {
        self.input_track2 = encode_input(track);
    }

    pub fn print_input_track2(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        print_input(out, self.input_track2())
    }

    /// Show every step layer at once; not persisted
    pub fn detailed_view(&self) -> bool {
        self.detailed_view
    }

    pub fn set_detailed_view(&mut self, detailed: bool) {
        self.detailed_view = detailed;
    }

    pub fn toggle_detailed_view(&mut self) {
        self.detailed_view = !self.detailed_view;
    }

    pub fn print_detailed_view(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        print_yes_no(out, self.detailed_view)
    }

    pub fn sequence(&self, index: usize) -> &LogicSequence {
        &self.sequences[index]
    }

    pub fn sequence_mut(&mut self, index: usize) -> &mut LogicSequence {
        &mut self.sequences[index]
    }

    pub fn set_sequence(&mut self, index: usize, mut sequence: LogicSequence) {
        sequence.set_track_index(self.track_index);
        self.sequences[index] = sequence;
    }

    pub fn clear(&mut self) {
        self.params.clear();
        self.pattern_follow = TrackPatternFollow::default();
        self.input_track1 = -1;
        self.input_track2 = -1;
        self.detailed_view = false;
        for sequence in self.sequences.iter_mut() {
            sequence.clear();
        }
    }

    pub fn write_routed(&mut self, target: Target, int_value: i32, float_value: f32) {
        if self.params.write_routed(target, int_value) {
            return;
        }
        for sequence in self.sequences.iter_mut() {
            sequence.write_routed(target, int_value, float_value);
        }
    }
}

fn encode_input(track: Option<usize>) -> i8 {
    match track {
        Some(index) if index < TRACK_COUNT => index as i8,
        _ => -1,
    }
}

fn print_input(out: &mut dyn fmt::Write, track: Option<usize>) -> fmt::Result {
    match track {
        Some(index) => write!(out, "{}", index + 1),
        None => out.write_str("-"),
    }
}

impl PatternTrack for LogicTrack {
    type Sequence = LogicSequence;

    fn track_index(&self) -> usize {
        self.track_index
    }

    fn set_track_index(&mut self, track_index: usize) {
        self.track_index = track_index;
        self.params.set_track_index(track_index);
        for sequence in self.sequences.iter_mut() {
            sequence.set_track_index(track_index);
        }
    }

    fn sequences(&self) -> &SequenceArray<LogicSequence> {
        &self.sequences
    }

    fn sequences_mut(&mut self) -> &mut SequenceArray<LogicSequence> {
        &mut self.sequences
    }
}

impl Persist for LogicTrack {
    fn write<W: Write>(&self, writer: &mut VersionedWriter<W>) -> io::Result<()> {
        self.params.write(writer)?;
        self.pattern_follow.write(writer)?;
        writer.write(&self.input_track1)?;
        writer.write(&self.input_track2)?;
        write_array(writer, &self.sequences)
    }

    fn read<R: Read>(&mut self, reader: &mut VersionedReader<R>) -> io::Result<()> {
        self.params.read(reader)?;
        self.pattern_follow.read(reader)?;
        reader.read_since(&mut self.input_track1, ProjectVersion::V40)?;
        reader.read_since(&mut self.input_track2, ProjectVersion::V40)?;
        read_array(reader, &mut self.sequences)
    }
}
