// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Arpeggiator tracks.

use std::io::{self, Read, Write};

use super::params::{BiasRanges, TrackParams};
use super::pattern_follow::TrackPatternFollow;
use super::{new_sequences, PatternTrack, SequenceArray};
use crate::routing::Target;
use crate::sequence::arp::{GateProbability, Length, NoteVariationProbability, RetriggerProbability};
use crate::sequence::{ArpSequence, Sequence};
use crate::serialize::{read_array, write_array, Persist, VersionedReader, VersionedWriter};

const BIAS_RANGES: BiasRanges = BiasRanges {
    gate_probability: GateProbability::RANGE,
    retrigger_probability: RetriggerProbability::RANGE,
    length: Length::RANGE,
    note_probability: NoteVariationProbability::RANGE,
};

#[derive(Debug, Clone, PartialEq)]
pub struct ArpTrack {
    track_index: usize,
    params: TrackParams,
    pattern_follow: TrackPatternFollow,
    sequences: SequenceArray<ArpSequence>,
}

impl Default for ArpTrack {
    fn default() -> Self {
        Self {
            track_index: 0,
            params: TrackParams::new(BIAS_RANGES),
            pattern_follow: TrackPatternFollow::default(),
            sequences: new_sequences(),
        }
    }
}

impl ArpTrack {
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

    pub fn sequence(&self, index: usize) -> &ArpSequence {
        &self.sequences[index]
    }

    pub fn sequence_mut(&mut self, index: usize) -> &mut ArpSequence {
        &mut self.sequences[index]
    }

    pub fn set_sequence(&mut self, index: usize, mut sequence: ArpSequence) {
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

    pub fn write_routed(&mut self, target: Target, int_value: i32, float_value: f32) {
        if self.params.write_routed(target, int_value) {
            return;
        }
        for sequence in self.sequences.iter_mut() {
            sequence.write_routed(target, int_value, float_value);
        }
    }
}

impl PatternTrack for ArpTrack {
    type Sequence = ArpSequence;

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

    fn sequences(&self) -> &SequenceArray<ArpSequence> {
        &self.sequences
    }

    fn sequences_mut(&mut self) -> &mut SequenceArray<ArpSequence> {
        &mut self.sequences
    }
}

impl Persist for ArpTrack {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::Routing;

    #[test]
    fn test_arp_octaves_route_reaches_sequences() {
        let mut routing = Routing::new();
        routing.edit_route(Target::ArpOctaves, 7).unwrap();
        let mut track = ArpTrack::default();
        track.set_track_index(7);
        track.write_routed(Target::ArpOctaves, 3, 3.0);
        assert_eq!(track.sequence(0).octaves(&routing), 3);
        assert_eq!(track.sequence(0).octaves(&Routing::new()), 0);
    }

    #[test]
    fn test_clear() {
        let mut track = ArpTrack::default();
        track.sequence_mut(2).toggle_hold();
        track.params_mut().set_rotate(5, false);
        track.clear();
        assert!(!track.sequence(2).hold());
        assert_eq!(track.params().rotate(&Routing::new()), 0);
    }
}
