// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Stochastic tracks.

use std::fmt;
use std::io::{self, Read, Write};

use super::params::{BiasRanges, TrackParams};
use super::pattern_follow::TrackPatternFollow;
use super::{new_sequences, PatternTrack, SequenceArray};
use crate::routing::Target;
use crate::sequence::stochastic::{
    GateProbability, Length, NoteVariationProbability, RetriggerProbability,
};
use crate::sequence::{Sequence, StochasticSequence};
use crate::serialize::{read_array, write_array, Persist, ProjectVersion, VersionedReader, VersionedWriter};
use crate::types::utils::{name_from_bytes, name_to_bytes};
use crate::NAME_LENGTH;

const BIAS_RANGES: BiasRanges = BiasRanges {
    gate_probability: GateProbability::RANGE,
    retrigger_probability: RetriggerProbability::RANGE,
    length: Length::RANGE,
    note_probability: NoteVariationProbability::RANGE,
};

const DEFAULT_NAME: &str = "STOCH";

#[derive(Debug, Clone, PartialEq)]
pub struct StochasticTrack {
    track_index: usize,
    name: [u8; NAME_LENGTH],
    params: TrackParams,
    pattern_follow: TrackPatternFollow,
    sequences: SequenceArray<StochasticSequence>,
}

impl Default for StochasticTrack {
    fn default() -> Self {
        Self {
            track_index: 0,
            name: name_to_bytes(DEFAULT_NAME),
            params: TrackParams::new(BIAS_RANGES),
            pattern_follow: TrackPatternFollow::default(),
            sequences: new_sequences(),
        }
    }
}

impl StochasticTrack {
    /// Display name of the track
    pub fn name(&self) -> &str {
        name_from_bytes(&self.name)
    }

    /// Set the name, truncated to `NAME_LENGTH` characters
    pub fn set_name(&mut self, name: &str) {
        self.name = name_to_bytes(name);
    }

    pub fn print_name(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        out.write_str(self.name())
    }

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

    pub fn sequence(&self, index: usize) -> &StochasticSequence {
        &self.sequences[index]
    }

    pub fn sequence_mut(&mut self, index: usize) -> &mut StochasticSequence {
        &mut self.sequences[index]
    }

    pub fn set_sequence(&mut self, index: usize, mut sequence: StochasticSequence) {
        sequence.set_track_index(self.track_index);
        self.sequences[index] = sequence;
    }

    pub fn clear(&mut self) {
        self.name = name_to_bytes(DEFAULT_NAME);
        self.params.clear();
        self.pattern_follow = TrackPatternFollow::default();
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

impl PatternTrack for StochasticTrack {
    type Sequence = StochasticSequence;

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

    fn sequences(&self) -> &SequenceArray<StochasticSequence> {
        &self.sequences
    }

    fn sequences_mut(&mut self) -> &mut SequenceArray<StochasticSequence> {
        &mut self.sequences
    }
}

impl Persist for StochasticTrack {
    fn write<W: Write>(&self, writer: &mut VersionedWriter<W>) -> io::Result<()> {
        writer.write(&self.name)?;
        self.params.write(writer)?;
        self.pattern_follow.write(writer)?;
        write_array(writer, &self.sequences)
    }

    fn read<R: Read>(&mut self, reader: &mut VersionedReader<R>) -> io::Result<()> {
        reader.read_since(&mut self.name, ProjectVersion::V38)?;
        self.params.read(reader)?;
        self.pattern_follow.read(reader)?;
        read_array(reader, &mut self.sequences)
    }
}
