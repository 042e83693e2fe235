// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Arpeggiator sequences.
//!
//! ```text
//! word0: gate 0 | slide 1 | gate prob 2..6 | length 6..10 | length range 10..14
//!        length prob 14..18 | note 18..25 | note prob 25..29
//! word1: retrigger 0..3 | retrigger prob 3..7 | gate offset 7..11 | condition 11..18
//!        bypass scale 18
//! ```

use std::fmt;
use std::io::{self, Read, Write};

use super::{read_step_words, shift_step_range, Sequence, SequenceBase, SequenceKey, StepSelection};
use crate::routing::{Routable, Routing, Target};
use crate::serialize::{read_array, write_array, Persist, ProjectVersion, VersionedReader, VersionedWriter};
use crate::types::condition::ConditionValue;
use crate::types::utils::{adjusted_enum, duplicate_steps, print_yes_no};
use crate::types::{
    layout_fits, BitField, Condition, LayerRange, ModelEnum, SignedValue, UnsignedValue,
};
use crate::STEP_COUNT;

pub type GateProbability = UnsignedValue<4>;
pub type GateOffset = SignedValue<4>;
pub type Retrigger = UnsignedValue<3>;
pub type RetriggerProbability = UnsignedValue<4>;
pub type Length = UnsignedValue<4>;
pub type LengthVariationRange = SignedValue<4>;
pub type LengthVariationProbability = UnsignedValue<4>;
pub type Note = SignedValue<7>;
pub type NoteVariationProbability = UnsignedValue<4>;

/// Octave span of the arpeggio in either direction
pub const OCTAVES_MAX: i32 = 5;

type GateBits = BitField<0, 1>;
type SlideBits = BitField<1, 1>;
type GateProbabilityBits = BitField<2, { GateProbability::BITS }>;
type LengthBits = BitField<6, { Length::BITS }>;
type LengthVariationRangeBits = BitField<10, { LengthVariationRange::BITS }>;
type LengthVariationProbabilityBits = BitField<14, { LengthVariationProbability::BITS }>;
type NoteBits = BitField<18, { Note::BITS }>;
type NoteVariationProbabilityBits = BitField<25, { NoteVariationProbability::BITS }>;

type RetriggerBits = BitField<0, { Retrigger::BITS }>;
type RetriggerProbabilityBits = BitField<3, { RetriggerProbability::BITS }>;
type GateOffsetBits = BitField<7, { GateOffset::BITS }>;
type ConditionBits = BitField<11, { ConditionValue::BITS }>;
type BypassScaleBits = BitField<18, 1>;

const _: () = assert!(layout_fits(
    &[
        GateBits::SPAN,
        SlideBits::SPAN,
        GateProbabilityBits::SPAN,
        LengthBits::SPAN,
        LengthVariationRangeBits::SPAN,
        LengthVariationProbabilityBits::SPAN,
        NoteBits::SPAN,
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
        BypassScaleBits::SPAN,
    ],
    32
));

crate::model_enum! {
    /// Order in which held notes are played
    pub enum ArpMode {
        Up => "Up",
        Down => "Down",
        UpDown => "Up Down",
        DownUp => "Down Up",
        UpAndDown => "Up & Down",
        DownAndUp => "Down & Up",
        Converge => "Converge",
        Diverge => "Diverge",
        Random => "Random",
        Played => "Played",
    }
}

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
        NoteVariationProbability => "NOTE PROB",
        Condition => "CONDITION",
    }
}

/// One packed arpeggiator step
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
        self.set_bypass_scale(false);
        self.set_retrigger(0);
        self.set_retrigger_probability(RetriggerProbability::MAX);
        self.set_length(Length::MAX / 2);
        self.set_length_variation_range(0);
        self.set_length_variation_probability(LengthVariationProbability::MAX);
        self.set_note(0);
        self.set_note_variation_probability(NoteVariationProbability::MAX);
        self.set_condition(Condition::OFF);
    }

    /// Raw packed words
    pub fn raw(&self) -> (u32, u32) {
        (self.data0, self.data1)
    }

    pub fn gate(&self) -> bool {
        GateBits::get_flag(self.data0)
    }

    pub fn set_gate(&mut self, gate: bool) {
        self.data0 = GateBits::set_flag(self.data0, gate);
    }

    pub fn toggle_gate(&mut self) {
        self.set_gate(!self.gate());
    }

    pub fn slide(&self) -> bool {
        SlideBits::get_flag(self.data0)
    }

    pub fn set_slide(&mut self, slide: bool) {
        self.data0 = SlideBits::set_flag(self.data0, slide);
    }

    pub fn toggle_slide(&mut self) {
        self.set_slide(!self.slide());
    }

    pub fn bypass_scale(&self) -> bool {
        BypassScaleBits::get_flag(self.data1)
    }

    pub fn set_bypass_scale(&mut self, bypass: bool) {
        self.data1 = BypassScaleBits::set_flag(self.data1, bypass);
    }

    pub fn toggle_bypass_scale(&mut self) {
        self.set_bypass_scale(!self.bypass_scale());
    }

    pub fn gate_probability(&self) -> i32 {
        GateProbabilityBits::get(self.data0) as i32
    }

    pub fn set_gate_probability(&mut self, probability: i32) {
        self.data0 = GateProbabilityBits::set(self.data0, GateProbability::clamp(probability) as u32);
    }

    pub fn gate_offset(&self) -> i32 {
        GateOffset::from_biased(GateOffsetBits::get(self.data1))
    }

    pub fn set_gate_offset(&mut self, gate_offset: i32) {
        self.data1 = GateOffsetBits::set(self.data1, GateOffset::to_biased(gate_offset));
    }

    pub fn retrigger(&self) -> i32 {
        RetriggerBits::get(self.data1) as i32
    }

    pub fn set_retrigger(&mut self, retrigger: i32) {
        self.data1 = RetriggerBits::set(self.data1, Retrigger::clamp(retrigger) as u32);
    }

    pub fn retrigger_probability(&self) -> i32 {
        RetriggerProbabilityBits::get(self.data1) as i32
    }

    pub fn set_retrigger_probability(&mut self, probability: i32) {
        self.data1 =
            RetriggerProbabilityBits::set(self.data1, RetriggerProbability::clamp(probability) as u32);
    }

    pub fn length(&self) -> i32 {
        LengthBits::get(self.data0) as i32
    }

    pub fn set_length(&mut self, length: i32) {
        self.data0 = LengthBits::set(self.data0, Length::clamp(length) as u32);
    }

    pub fn length_variation_range(&self) -> i32 {
        LengthVariationRange::from_biased(LengthVariationRangeBits::get(self.data0))
    }

    pub fn set_length_variation_range(&mut self, range: i32) {
        self.data0 = LengthVariationRangeBits::set(self.data0, LengthVariationRange::to_biased(range));
    }

    pub fn length_variation_probability(&self) -> i32 {
        LengthVariationProbabilityBits::get(self.data0) as i32
    }

    pub fn set_length_variation_probability(&mut self, probability: i32) {
        self.data0 = LengthVariationProbabilityBits::set(
            self.data0,
            LengthVariationProbability::clamp(probability) as u32,
        );
    }

    /// Index into the held chord
    pub fn note(&self) -> i32 {
        Note::from_biased(NoteBits::get(self.data0))
    }

    pub fn set_note(&mut self, note: i32) {
        self.data0 = NoteBits::set(self.data0, Note::to_biased(note));
    }

    pub fn note_variation_probability(&self) -> i32 {
        NoteVariationProbabilityBits::get(self.data0) as i32
    }

    pub fn set_note_variation_probability(&mut self, probability: i32) {
        self.data0 = NoteVariationProbabilityBits::set(
            self.data0,
            NoteVariationProbability::clamp(probability) as u32,
        );
    }

    pub fn condition(&self) -> Condition {
        Condition::from_code(ConditionBits::get(self.data1) as i32)
    }

    pub fn set_condition(&mut self, condition: Condition) {
        self.data1 = ConditionBits::set(self.data1, condition.code() as u32);
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
            Layer::NoteVariationProbability => self.set_note_variation_probability(value),
            Layer::Condition => self.set_condition(Condition::from_code(value)),
        }
    }

    /// Legal values of `layer`
    pub fn layer_range(layer: Layer) -> LayerRange {
        match layer {
            Layer::Gate | Layer::Slide => LayerRange::new(0, 1),
            Layer::GateProbability => LayerRange::new(GateProbability::MIN, GateProbability::MAX),
            Layer::GateOffset => LayerRange::new(GateOffset::MIN, GateOffset::MAX),
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
        read_step_words(reader, &mut self.data0, &mut self.data1)
    }
}

/// An arpeggiator pattern
#[derive(Debug, Clone, PartialEq)]
pub struct ArpSequence {
    base: SequenceBase,
    key: SequenceKey,
    arp_mode: ArpMode,
    octaves: Routable<i8>,
    hold: bool,
    steps: [Step; STEP_COUNT],
}

impl Default for ArpSequence {
    fn default() -> Self {
        Self {
            base: SequenceBase::default(),
            key: SequenceKey::default(),
            arp_mode: ArpMode::Up,
            octaves: Routable::new(0),
            hold: false,
            steps: [Step::default(); STEP_COUNT],
        }
    }
}

impl ArpSequence {
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

    // arp mode

    pub fn arp_mode(&self) -> ArpMode {
        self.arp_mode
    }

    pub fn set_arp_mode(&mut self, mode: ArpMode) {
        self.arp_mode = mode;
    }

    pub fn edit_arp_mode(&mut self, value: i32, _shift: bool) {
        self.arp_mode = adjusted_enum(self.arp_mode, value);
    }

    pub fn print_arp_mode(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        out.write_str(self.arp_mode.name())
    }

    // octaves

    pub fn octaves(&self, routing: &Routing) -> i32 {
        self.octaves
            .get(routing.is_routed(Target::ArpOctaves, self.base.track_index())) as i32
    }

    pub fn set_octaves(&mut self, octaves: i32, routed: bool) {
        self.octaves
            .set(octaves.clamp(-OCTAVES_MAX, OCTAVES_MAX) as i8, routed);
    }

    pub fn edit_octaves(&mut self, routing: &Routing, value: i32, _shift: bool) {
        if !routing.is_routed(Target::ArpOctaves, self.base.track_index()) {
            self.set_octaves(self.octaves(routing) + value, false);
        }
    }

    pub fn print_octaves(&self, routing: &Routing, out: &mut dyn fmt::Write) -> fmt::Result {
        routing.print_routed(out, Target::ArpOctaves, self.base.track_index())?;
        write!(out, "{:+}", self.octaves(routing))
    }

    // hold

    /// Keep playing after the input notes are released
    pub fn hold(&self) -> bool {
        self.hold
    }

    pub fn set_hold(&mut self, hold: bool) {
        self.hold = hold;
    }

    pub fn toggle_hold(&mut self) {
        self.hold = !self.hold;
    }

    pub fn print_hold(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        print_yes_no(out, self.hold)
    }

    // steps

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

    pub fn clear_steps(&mut self) {
        for step in self.steps.iter_mut() {
            step.clear();
        }
    }

    pub fn set_gates(&mut self, gates: &[bool]) {
        for (step, &gate) in self.steps.iter_mut().zip(gates) {
            step.set_gate(gate);
        }
    }

    pub fn set_notes(&mut self, notes: &[i32]) {
        for (step, &note) in self.steps.iter_mut().zip(notes) {
            step.set_note(note);
        }
    }

    pub fn shift_steps(&mut self, selected: StepSelection, direction: i32) {
        let (first, last) = self.base.stored_step_range();
        shift_step_range(&mut self.steps, selected, first, last, direction);
    }

    pub fn duplicate_steps(&mut self) {
        let (first, last) = self.base.stored_step_range();
        duplicate_steps(&mut self.steps, first, last);
        self.base
            .set_last_step((last + (last - first + 1)) as i32, false);
    }
}

impl Sequence for ArpSequence {
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
        self.arp_mode = ArpMode::Up;
        self.octaves = Routable::new(0);
        self.hold = false;
        self.clear_steps();
    }

    fn is_edited(&self) -> bool {
        let mut fresh = ArpSequence::default();
        fresh.set_track_index(self.track_index());
        *self != fresh
    }

    fn write_routed(&mut self, target: Target, int_value: i32, _float_value: f32) {
        if target == Target::ArpOctaves {
            self.set_octaves(int_value, true);
        } else if !self.key.write_routed(target, int_value) {
            self.base.write_routed(target, int_value);
        }
    }
}

impl Persist for ArpSequence {
    fn write<W: Write>(&self, writer: &mut VersionedWriter<W>) -> io::Result<()> {
        self.key.write(writer)?;
        self.base.write(writer)?;
        writer.write(&self.arp_mode)?;
        writer.write(&self.octaves)?;
        writer.write(&self.hold)?;
        write_array(writer, &self.steps)
    }

    fn read<R: Read>(&mut self, reader: &mut VersionedReader<R>) -> io::Result<()> {
        // Arp sequences first appear in version 35
        if reader.data_version() < ProjectVersion::V35 {
            return Ok(());
        }
        self.key.read(reader)?;
        self.base.read(reader)?;
        reader.read(&mut self.arp_mode)?;
        reader.read(&mut self.octaves)?;
        reader.read(&mut self.hold)?;
        read_array(reader, &mut self.steps)
    }
}
