// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Note sequences.
//!
//! A note step packs gate, probabilities, length, note and condition into
//! two 32-bit words:
//!
//! ```text
//! word0: gate 0 | slide 1 | gate prob 2..5 | length 5..8 | length range 8..12
//!        length prob 12..15 | note 15..22 | note range 22..29 | note prob 29..32
//! word1: retrigger 0..2 | retrigger prob 2..5 | gate offset 5..9 | condition 9..16
//! ```

use std::fmt;
use std::io::{self, Read, Write};

use super::{read_step_words, shift_step_range, Sequence, SequenceBase, SequenceKey, StepSelection};
use crate::music::{Note as PitchClass, Scale};
use crate::routing::Target;
use crate::serialize::{read_array, write_array, Persist, ProjectVersion, VersionedReader, VersionedWriter};
use crate::types::condition::ConditionValue;
use crate::types::utils::duplicate_steps;
use crate::types::{layout_fits, BitField, Condition, LayerRange, SignedValue, UnsignedValue};
use crate::STEP_COUNT;

pub type GateProbability = UnsignedValue<3>;
pub type GateOffset = SignedValue<4>;
pub type Retrigger = UnsignedValue<2>;
pub type RetriggerProbability = UnsignedValue<3>;
pub type Length = UnsignedValue<3>;
pub type LengthVariationRange = SignedValue<4>;
pub type LengthVariationProbability = UnsignedValue<3>;
pub type Note = SignedValue<7>;
pub type NoteVariationRange = SignedValue<7>;
pub type NoteVariationProbability = UnsignedValue<3>;

type GateBits = BitField<0, 1>;
type SlideBits = BitField<1, 1>;
type GateProbabilityBits = BitField<2, { GateProbability::BITS }>;
type LengthBits = BitField<5, { Length::BITS }>;
type LengthVariationRangeBits = BitField<8, { LengthVariationRange::BITS }>;
type LengthVariationProbabilityBits = BitField<12, { LengthVariationProbability::BITS }>;
type NoteBits = BitField<15, { Note::BITS }>;
type NoteVariationRangeBits = BitField<22, { NoteVariationRange::BITS }>;
type NoteVariationProbabilityBits = BitField<29, { NoteVariationProbability::BITS }>;

type RetriggerBits = BitField<0, { Retrigger::BITS }>;
type RetriggerProbabilityBits = BitField<2, { RetriggerProbability::BITS }>;
type GateOffsetBits = BitField<5, { GateOffset::BITS }>;
type ConditionBits = BitField<9, { ConditionValue::BITS }>;

const _: () = assert!(layout_fits(
    &[
        GateBits::SPAN,
        SlideBits::SPAN,
        GateProbabilityBits::SPAN,
        LengthBits::SPAN,
        LengthVariationRangeBits::SPAN,
        LengthVariationProbabilityBits::SPAN,
        NoteBits::SPAN,
        NoteVariationRangeBits::SPAN,
        NoteVariationProbabilityBits::SPAN,
    ],
    32
));
const _: () = assert!(layout_fits(
    &[
        RetriggerBits::SPAN,
        RetriggerProbabilityBits::SPAN,
        GateOffsetBits::SPAN,
        ConditionBits::SPAN,
    ],
    32
));

crate::model_enum! {
    /// Per-step parameter shown by list editors
    pub enum Layer {
        Gate => "GATE",
        GateProbability => "GATE PROB",
        GateOffset => "GATE OFFSET",
        Slide => "SLIDE",
        Retrigger => "RETRIG",
        RetriggerProbability => "RETRIG PROB",
        Length => "LENGTH",
        LengthVariationRange => "LENGTH RANGE",
        LengthVariationProbability => "LENGTH PROB",
        Note => "NOTE",
        NoteVariationRange => "NOTE RANGE",
        NoteVariationProbability => "NOTE PROB",
        Condition => "CONDITION",
    }
}

/// One packed note step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    data0: u32,
    data1: u32,
}

impl Default for Step {
    fn default() -> Self {
        let mut step = Step { data0: 0, data1: 0 };
        step.clear();
        step
    }
}

impl Step {
    /// Reset every field to its default
    pub fn clear(&mut self) {
        self.data0 = 0;
        self.data1 = 0;
        self.set_gate(false);
        self.set_gate_probability(GateProbability::MAX);
        self.set_gate_offset(0);
        self.set_slide(false);
        self.set_retrigger(0);
        self.set_retrigger_probability(RetriggerProbability::MAX);
        self.set_length(Length::MAX / 2);
        self.set_length_variation_range(0);
        self.set_length_variation_probability(LengthVariationProbability::MAX);
        self.set_note(0);
        self.set_note_variation_range(0);
        self.set_note_variation_probability(NoteVariationProbability::MAX);
        self.set_condition(Condition::OFF);
    }

    /// Raw packed words
    pub fn raw(&self) -> (u32, u32) {
        (self.data0, self.data1)
    }

    // gate

    pub fn gate(&self) -> bool {
        GateBits::get_flag(self.data0)
    }

    pub fn set_gate(&mut self, gate: bool) {
        self.data0 = GateBits::set_flag(self.data0, gate);
    }

    pub fn toggle_gate(&mut self) {
        self.set_gate(!self.gate());
    }

    // gate probability

    pub fn gate_probability(&self) -> i32 {
        GateProbabilityBits::get(self.data0) as i32
    }

    pub fn set_gate_probability(&mut self, gate_probability: i32) {
        self.data0 = GateProbabilityBits::set(self.data0, GateProbability::clamp(gate_probability) as u32);
    }

    // gate offset

    pub fn gate_offset(&self) -> i32 {
        GateOffset::from_biased(GateOffsetBits::get(self.data1))
    }

    /// Set the gate offset; negative offsets are not supported yet and clamp to 0
    pub fn set_gate_offset(&mut self, gate_offset: i32) {
        let value = GateOffset::clamp(gate_offset).max(0);
        self.data1 = GateOffsetBits::set(self.data1, GateOffset::to_biased(value));
    }

    // slide

    pub fn slide(&self) -> bool {
        SlideBits::get_flag(self.data0)
    }

    pub fn set_slide(&mut self, slide: bool) {
        self.data0 = SlideBits::set_flag(self.data0, slide);
    }

    pub fn toggle_slide(&mut self) {
        self.set_slide(!self.slide());
    }

    // retrigger

    pub fn retrigger(&self) -> i32 {
        RetriggerBits::get(self.data1) as i32
    }

    pub fn set_retrigger(&mut self, retrigger: i32) {
        self.data1 = RetriggerBits::set(self.data1, Retrigger::clamp(retrigger) as u32);
    }

    // retrigger probability

    pub fn retrigger_probability(&self) -> i32 {
        RetriggerProbabilityBits::get(self.data1) as i32
    }

    pub fn set_retrigger_probability(&mut self, probability: i32) {
        self.data1 = RetriggerProbabilityBits::set(self.data1, RetriggerProbability::clamp(probability) as u32);
    }

    // length

    pub fn length(&self) -> i32 {
        LengthBits::get(self.data0) as i32
    }

    pub fn set_length(&mut self, length: i32) {
        self.data0 = LengthBits::set(self.data0, Length::clamp(length) as u32);
    }

    // length variation range

    pub fn length_variation_range(&self) -> i32 {
        LengthVariationRange::from_biased(LengthVariationRangeBits::get(self.data0))
    }

    pub fn set_length_variation_range(&mut self, range: i32) {
        self.data0 = LengthVariationRangeBits::set(self.data0, LengthVariationRange::to_biased(range));
    }

    // length variation probability

    pub fn length_variation_probability(&self) -> i32 {
        LengthVariationProbabilityBits::get(self.data0) as i32
    }

    pub fn set_length_variation_probability(&mut self, probability: i32) {
        self.data0 = LengthVariationProbabilityBits::set(
            self.data0,
            LengthVariationProbability::clamp(probability) as u32,
        );
    }

    // note

    pub fn note(&self) -> i32 {
        Note::from_biased(NoteBits::get(self.data0))
    }

    pub fn set_note(&mut self, note: i32) {
        self.data0 = NoteBits::set(self.data0, Note::to_biased(note));
    }

    // note variation range

    pub fn note_variation_range(&self) -> i32 {
        NoteVariationRange::from_biased(NoteVariationRangeBits::get(self.data0))
    }

    pub fn set_note_variation_range(&mut self, range: i32) {
        self.data0 = NoteVariationRangeBits::set(self.data0, NoteVariationRange::to_biased(range));
    }

    // note variation probability

    pub fn note_variation_probability(&self) -> i32 {
        NoteVariationProbabilityBits::get(self.data0) as i32
    }

    pub fn set_note_variation_probability(&mut self, probability: i32) {
        self.data0 = NoteVariationProbabilityBits::set(
            self.data0,
            NoteVariationProbability::clamp(probability) as u32,
        );
    }

    // condition

    pub fn condition(&self) -> Condition {
        Condition::from_code(ConditionBits::get(self.data1) as i32)
    }

    pub fn set_condition(&mut self, condition: Condition) {
        self.data1 = ConditionBits::set(self.data1, condition.code() as u32);
    }

    /// Print the step note in the given scale and root
    pub fn print_note(&self, out: &mut dyn fmt::Write, scale: Scale, root_note: i32) -> fmt::Result {
        scale.print_note(out, self.note(), PitchClass::from_pitch_class(root_note))
    }

    /// Value of `layer`
    pub fn layer_value(&self, layer: Layer) -> i32 {
        match layer {
            Layer::Gate => self.gate() as i32,
            Layer::GateProbability => self.gate_probability(),
            Layer::GateOffset => self.gate_offset(),
            Layer::Slide => self.slide() as i32,
            Layer::Retrigger => self.retrigger(),
            Layer::RetriggerProbability => self.retrigger_probability(),
            Layer::Length => self.length(),
            Layer::LengthVariationRange => self.length_variation_range(),
            Layer::LengthVariationProbability => self.length_variation_probability(),
            Layer::Note => self.note(),
            Layer::NoteVariationRange => self.note_variation_range(),
            Layer::NoteVariationProbability => self.note_variation_probability(),
            Layer::Condition => self.condition().code() as i32,
        }
    }

    /// Set `layer` to `value`, clamped by the field setter
    pub fn set_layer_value(&mut self, layer: Layer, value: i32) {
        match layer {
            Layer::Gate => self.set_gate(value != 0),
            Layer::GateProbability => self.set_gate_probability(value),
            Layer::GateOffset => self.set_gate_offset(value),
            Layer::Slide => self.set_slide(value != 0),
            Layer::Retrigger => self.set_retrigger(value),
            Layer::RetriggerProbability => self.set_retrigger_probability(value),
            Layer::Length => self.set_length(value),
            Layer::LengthVariationRange => self.set_length_variation_range(value),
            Layer::LengthVariationProbability => self.set_length_variation_probability(value),
            Layer::Note => self.set_note(value),
            Layer::NoteVariationRange => self.set_note_variation_range(value),
            Layer::NoteVariationProbability => self.set_note_variation_probability(value),
            Layer::Condition => self.set_condition(Condition::from_code(value)),
        }
    }

    /// Legal values of `layer`
    pub fn layer_range(layer: Layer) -> LayerRange {
        match layer {
            Layer::Gate | Layer::Slide => LayerRange::new(0, 1),
            Layer::GateProbability => LayerRange::new(GateProbability::MIN, GateProbability::MAX),
            Layer::GateOffset => LayerRange::new(0, GateOffset::MAX),
            Layer::Retrigger => LayerRange::new(Retrigger::MIN, Retrigger::MAX),
            Layer::RetriggerProbability => {
                LayerRange::new(RetriggerProbability::MIN, RetriggerProbability::MAX)
            }
            Layer::Length => LayerRange::new(Length::MIN, Length::MAX),
            Layer::LengthVariationRange => {
                LayerRange::new(LengthVariationRange::MIN, LengthVariationRange::MAX)
            }
            Layer::LengthVariationProbability => {
                LayerRange::new(LengthVariationProbability::MIN, LengthVariationProbability::MAX)
            }
            Layer::Note => LayerRange::new(Note::MIN, Note::MAX),
            Layer::NoteVariationRange => LayerRange::new(NoteVariationRange::MIN, NoteVariationRange::MAX),
            Layer::NoteVariationProbability => {
                LayerRange::new(NoteVariationProbability::MIN, NoteVariationProbability::MAX)
            }
            Layer::Condition => LayerRange::new(0, Condition::COUNT as i32 - 1),
        }
    }

    /// Value of `layer` in a cleared step
    pub fn layer_default_value(layer: Layer) -> i32 {
        Step::default().layer_value(layer)
    }
}

impl Persist for Step {
    fn write<W: Write>(&self, writer: &mut VersionedWriter<W>) -> io::Result<()> {
        writer.write(&self.data0)?;
        writer.write(&self.data1)
    }

    fn read<R: Read>(&mut self, reader: &mut VersionedReader<R>) -> io::Result<()> {
        read_step_words(reader, &mut self.data0, &mut self.data1)?;
        if reader.data_version() < ProjectVersion::V7 {
            self.set_gate_offset(0);
        }
        if reader.data_version() < ProjectVersion::V12 {
            self.set_condition(Condition::OFF);
        }
        Ok(())
    }
}

/// A note pattern
#[derive(Debug, Clone, PartialEq)]
pub struct NoteSequence {
    base: SequenceBase,
    key: SequenceKey,
    steps: [Step; STEP_COUNT],
}

impl Default for NoteSequence {
    fn default() -> Self {
        Self {
            base: SequenceBase::default(),
            key: SequenceKey::default(),
            steps: [Step::default(); STEP_COUNT],
        }
    }
}

impl NoteSequence {
    /// Transport parameters
    pub fn base(&self) -> &SequenceBase {
        &self.base
    }

    /// Mutable transport parameters
    pub fn base_mut(&mut self) -> &mut SequenceBase {
        &mut self.base
    }

    /// Scale and root note
    pub fn key(&self) -> &SequenceKey {
        &self.key
    }

    /// Mutable scale and root note
    pub fn key_mut(&mut self) -> &mut SequenceKey {
        &mut self.key
    }

    pub fn steps(&self) -> &[Step; STEP_COUNT] {
        &self.steps
    }

    pub fn steps_mut(&mut self) -> &mut [Step; STEP_COUNT] {
        &mut self.steps
    }

    pub fn step(&self, index: usize) -> &Step {
        &self.steps[index]
    }

    pub fn step_mut(&mut self, index: usize) -> &mut Step {
        &mut self.steps[index]
    }

    /// Reset every step
    pub fn clear_steps(&mut self) {
        for step in self.steps.iter_mut() {
            step.clear();
        }
    }

    /// Set gates of the leading steps
    pub fn set_gates(&mut self, gates: &[bool]) {
        for (step, &gate) in self.steps.iter_mut().zip(gates) {
            step.set_gate(gate);
        }
    }

    /// Set notes of the leading steps
    pub fn set_notes(&mut self, notes: &[i32]) {
        for (step, &note) in self.steps.iter_mut().zip(notes) {
            step.set_note(note);
        }
    }

    /// Rotate the played range, or only the selected steps
    pub fn shift_steps(&mut self, selected: StepSelection, direction: i32) {
        let (first, last) = self.base.stored_step_range();
        shift_step_range(&mut self.steps, selected, first, last, direction);
    }

    /// Copy the played range behind itself and extend the last step
    pub fn duplicate_steps(&mut self) {
        let (first, last) = self.base.stored_step_range();
        duplicate_steps(&mut self.steps, first, last);
        self.base
            .set_last_step((last + (last - first + 1)) as i32, false);
    }
}

impl Sequence for NoteSequence {
    fn track_index(&self) -> usize {
        self.base.track_index()
    }

    fn set_track_index(&mut self, track_index: usize) {
        self.base.set_track_index(track_index);
        self.key.set_track_index(track_index);
    }

    fn clear(&mut self) {
        self.base.clear();
        self.key.clear();
        self.clear_steps();
    }

    fn is_edited(&self) -> bool {
        let mut fresh = NoteSequence::default();
        fresh.set_track_index(self.track_index());
        *self != fresh
    }

    fn write_routed(&mut self, target: Target, int_value: i32, _float_value: f32) {
        if !self.key.write_routed(target, int_value) {
            self.base.write_routed(target, int_value);
        }
    }
}

impl Persist for NoteSequence {
    fn write<W: Write>(&self, writer: &mut VersionedWriter<W>) -> io::Result<()> {
        self.key.write(writer)?;
        self.base.write(writer)?;
        write_array(writer, &self.steps)
    }

    fn read<R: Read>(&mut self, reader: &mut VersionedReader<R>) -> io::Result<()> {
        self.key.read(reader)?;
        self.base.read(reader)?;
        read_array(reader, &mut self.steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::Routing;
    use crate::serialize::{from_bytes, to_bytes};
    use crate::types::ModelEnum;

    #[test]
    fn test_step_defaults() {
        let step = Step::default();
        assert!(!step.gate());
        assert_eq!(step.gate_probability(), GateProbability::MAX);
        assert_eq!(step.retrigger_probability(), RetriggerProbability::MAX);
        assert_eq!(step.length(), Length::MAX / 2);
        assert_eq!(step.note(), 0);
        assert_eq!(step.condition(), Condition::OFF);
    }

    #[test]
    fn test_setters_clamp_without_touching_neighbours() {
        let mut step = Step::default();
        step.set_note(1000);
        assert_eq!(step.note(), Note::MAX);
        step.set_note(-1000);
        assert_eq!(step.note(), Note::MIN);
        assert_eq!(step.length(), Length::MAX / 2);
        assert_eq!(step.note_variation_range(), 0);

        step.set_length_variation_range(-99);
        assert_eq!(step.length_variation_range(), LengthVariationRange::MIN);
        assert_eq!(step.length_variation_probability(), LengthVariationProbability::MAX);
    }

    #[test]
    fn test_gate_offset_rejects_negatives() {
        let mut step = Step::default();
        step.set_gate_offset(-3);
        assert_eq!(step.gate_offset(), 0);
        step.set_gate_offset(5);
        assert_eq!(step.gate_offset(), 5);
        step.set_gate_offset(50);
        assert_eq!(step.gate_offset(), GateOffset::MAX);
    }

    #[test]
    fn test_layer_values() {
        let mut step = Step::default();
        for &layer in Layer::ALL {
            let range = Step::layer_range(layer);
            step.set_layer_value(layer, range.max);
            assert_eq!(step.layer_value(layer), range.max, "{}", layer);
            step.set_layer_value(layer, range.min);
            assert_eq!(step.layer_value(layer), range.min, "{}", layer);
        }
        assert_eq!(Step::layer_default_value(Layer::Length), Length::MAX / 2);
        assert_eq!(Layer::COUNT, 13);
    }

    #[test]
    fn test_equality_is_raw() {
        let mut a = Step::default();
        let mut b = Step::default();
        a.set_note(5);
        a.set_gate(true);
        b.set_gate(true);
        b.set_note(5);
        assert_eq!(a, b);
        b.set_condition(Condition::FILL);
        assert_ne!(a, b);
    }

    #[test]
    fn test_step_reads_at_old_versions() {
        let mut step = Step::default();
        step.set_note(5);
        step.set_gate_offset(3);
        step.set_condition(Condition::NOT_FIRST);
        let (data0, data1) = step.raw();

        // Version 11: word1 as u16, condition not yet present
        let mut bytes = data0.to_le_bytes().to_vec();
        bytes.extend_from_slice(&(data1 as u16).to_le_bytes());
        let mut reader = VersionedReader::with_version(&bytes[..], 11);
        let mut decoded = Step::default();
        decoded.read(&mut reader).unwrap();
        assert_eq!(decoded.note(), 5);
        assert_eq!(decoded.gate_offset(), 3);
        assert_eq!(decoded.condition(), Condition::OFF);

        // Version 6: no gate offset either
        let mut reader = VersionedReader::with_version(&bytes[..], 6);
        decoded.read(&mut reader).unwrap();
        assert_eq!(decoded.gate_offset(), 0);
    }

    #[test]
    fn test_sequence_defaults_and_edit_tracking() {
        let mut sequence = NoteSequence::default();
        sequence.set_track_index(2);
        assert!(!sequence.is_edited());
        sequence.step_mut(4).toggle_gate();
        assert!(sequence.is_edited());
        sequence.clear();
        assert!(!sequence.is_edited());
        assert_eq!(sequence.track_index(), 2);
    }

    #[test]
    fn test_shift_and_duplicate() {
        let mut sequence = NoteSequence::default();
        sequence.base_mut().set_last_step(3, false);
        sequence.set_notes(&[1, 2, 3, 4]);

        sequence.shift_steps(0, 1);
        let notes: Vec<i32> = sequence.steps()[..4].iter().map(Step::note).collect();
        assert_eq!(notes, vec![4, 1, 2, 3]);

        sequence.duplicate_steps();
        let notes: Vec<i32> = sequence.steps()[..8].iter().map(Step::note).collect();
        assert_eq!(notes, vec![4, 1, 2, 3, 4, 1, 2, 3]);
        assert_eq!(sequence.base().stored_step_range(), (0, 7));
    }

    #[test]
    fn test_write_routed_fans_out() {
        let mut routing = Routing::new();
        routing.edit_route(Target::RootNote, 0).unwrap();
        routing.edit_route(Target::Divisor, 0).unwrap();
        let mut sequence = NoteSequence::default();
        sequence.write_routed(Target::RootNote, 7, 0.0);
        sequence.write_routed(Target::Divisor, 48, 0.0);
        sequence.write_routed(Target::Tempo, 1, 1.0);

        assert_eq!(sequence.key().root_note(&routing), 7);
        assert_eq!(sequence.base().divisor(&routing), 48);
        assert_eq!(sequence.key().root_note(&Routing::new()), -1);
        assert!(!sequence.is_edited());
    }

    #[test]
    fn test_sequence_roundtrip() {
        let mut sequence = NoteSequence::default();
        sequence.key_mut().set_scale(3, false);
        sequence.base_mut().set_divisor(48, false);
        sequence.set_gates(&[true, false, true]);
        sequence.step_mut(2).set_condition(Condition::looped(1, 4, true));

        let bytes = to_bytes(&sequence).unwrap();
        let mut decoded = NoteSequence::default();
        from_bytes(&bytes, &mut decoded).unwrap();
        assert_eq!(decoded, sequence);
    }

    #[test]
    fn test_print_note() {
        let mut step = Step::default();
        step.set_note(2);
        let mut out = String::new();
        step.print_note(&mut out, Scale::Major, 0).unwrap();
        assert_eq!(out, "E0");
    }
}
