// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Note tracks.

use std::io::{self, Read, Write};

use super::params::{BiasRanges, TrackParams};
use super::pattern_follow::TrackPatternFollow;
use super::{new_sequences, PatternTrack, SequenceArray};
use crate::routing::Target;
use crate::sequence::note::{GateProbability, Length, NoteVariationProbability, RetriggerProbability};
use crate::sequence::{NoteSequence, Sequence};
use crate::serialize::{read_array, write_array, Persist, VersionedReader, VersionedWriter};

const BIAS_RANGES: BiasRanges = BiasRanges {
    gate_probability: GateProbability::RANGE,
    retrigger_probability: RetriggerProbability::RANGE,
    length: Length::RANGE,
    note_probability: NoteVariationProbability::RANGE,
};

#[derive(Debug, Clone, PartialEq)]
pub struct NoteTrack {
    track_index: usize,
    params: TrackParams,
    pattern_follow: TrackPatternFollow,
    sequences: SequenceArray<NoteSequence>,
}

impl Default for NoteTrack {
    fn default() -> Self {
        Self {
            track_index: 0,
            params: TrackParams::new(BIAS_RANGES),
            pattern_follow: TrackPatternFollow::default(),
            sequences: new_sequences(),
        }
    }
}

impl NoteTrack {
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

    pub fn sequence(&self, index: usize) -> &NoteSequence {
        &self.sequences[index]
    }

    pub fn sequence_mut(&mut self, index: usize) -> &mut NoteSequence {
        &mut self.sequences[index]
    }

    /// Replace a sequence; it is adopted by this track
    pub fn set_sequence(&mut self, index: usize, mut sequence: NoteSequence) {
        sequence.set_track_index(self.track_index);
        self.sequences[index] = sequence;
    }

    pub fn clear(&mut self) {
        self.params.clear();
        self.pattern_follow = TrackPatternFollow::default();
        for sequence in self.sequences.iter_mut() {
            sequence.clear();
        }
    }

    /// Apply a routed value to the track or to every sequence
    pub fn write_routed(&mut self, target: Target, int_value: i32, float_value: f32) {
        if self.params.write_routed(target, int_value) {
            return;
        }
        for sequence in self.sequences.iter_mut() {
            sequence.write_routed(target, int_value, float_value);
        }
    }
}

impl PatternTrack for NoteTrack {
    type Sequence = NoteSequence;

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

    fn sequences(&self) -> &SequenceArray<NoteSequence> {
        &self.sequences
    }

    fn sequences_mut(&mut self) -> &mut SequenceArray<NoteSequence> {
        &mut self.sequences
    }
}

impl Persist for NoteTrack {
    fn write<W: Write>(&self, writer: &mut VersionedWriter<W>) -> io::Result<()> {
        self.params.write(writer)?;
        self.pattern_follow.write(writer)?;
        write_array(writer, &self.sequences)
    }

    fn read<R: Read>(&mut self, reader: &mut VersionedReader<R>) -> io::Result<()> {
        self.params.read(reader)?;
        self.pattern_follow.read(reader)?;
        read_array(reader, &mut self.sequences)
    }
}
