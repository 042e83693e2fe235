// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Logic sequences.
//!
//! A logic step does not carry its own gate or note. It combines the gates
//! and notes of two input tracks with a gate operator and a note operator.
//!
//! ```text
//! word0: gate logic 0..4 | gate prob 4..8 | length 8..12 | length range 12..16
//!        length prob 16..20 | note logic 20..24 | note prob 24..28 | slide 28
//!        bypass scale 29
//! word1: retrigger 0..3 | retrigger prob 3..7 | gate offset 7..11 | condition 11..18
//! ```

use std::io::{self, Read, Write};

use super::{read_step_words, shift_step_range, Sequence, SequenceBase, SequenceKey, StepSelection};
use crate::routing::Target;
use crate::serialize::{read_array, write_array, Persist, ProjectVersion, VersionedReader, VersionedWriter};
use crate::types::condition::ConditionValue;
use crate::types::utils::duplicate_steps;
use crate::types::{
    layout_fits, BitField, Condition, LayerRange, ModelEnum, SignedValue, UnsignedValue,
};
use crate::STEP_COUNT;

pub type GateLogicValue = UnsignedValue<4>;
pub type GateProbability = UnsignedValue<4>;
pub type GateOffset = SignedValue<4>;
pub type Retrigger = UnsignedValue<3>;
pub type RetriggerProbability = UnsignedValue<4>;
pub type Length = UnsignedValue<4>;
pub type LengthVariationRange = SignedValue<4>;
pub type LengthVariationProbability = UnsignedValue<4>;
pub type NoteLogicValue = UnsignedValue<4>;
pub type NoteVariationProbability = UnsignedValue<4>;

type GateLogicBits = BitField<0, { GateLogicValue::BITS }>;
type GateProbabilityBits = BitField<4, { GateProbability::BITS }>;
type LengthBits = BitField<8, { Length::BITS }>;
type LengthVariationRangeBits = BitField<12, { LengthVariationRange::BITS }>;
type LengthVariationProbabilityBits = BitField<16, { LengthVariationProbability::BITS }>;
type NoteLogicBits = BitField<20, { NoteLogicValue::BITS }>;
type NoteVariationProbabilityBits = BitField<24, { NoteVariationProbability::BITS }>;
type SlideBits = BitField<28, 1>;
type BypassScaleBits = BitField<29, 1>;

type RetriggerBits = BitField<0, { Retrigger::BITS }>;
type RetriggerProbabilityBits = BitField<3, { RetriggerProbability::BITS }>;
type GateOffsetBits = BitField<7, { GateOffset::BITS }>;
type ConditionBits = BitField<11, { ConditionValue::BITS }>;

const _: () = assert!(layout_fits(
    &[
        GateLogicBits::SPAN,
        GateProbabilityBits::SPAN,
        LengthBits::SPAN,
        LengthVariationRangeBits::SPAN,
        LengthVariationProbabilityBits::SPAN,
        NoteLogicBits::SPAN,
        NoteVariationProbabilityBits::SPAN,
        SlideBits::SPAN,
        BypassScaleBits::SPAN,
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
    /// How the gates of the two input tracks combine
    pub enum GateLogic {
        One => "Input 1",
        Two => "Input 2",
        And => "AND",
        Or => "OR",
        Xor => "XOR",
        Nand => "NAND",
        Nor => "NOR",
        Xnor => "XNOR",
    }
}

impl GateLogic {
    /// Combine two input gates
    pub fn apply(self, a: bool, b: bool) -> bool {
        match self {
            GateLogic::One => a,
            GateLogic::Two => b,
            GateLogic::And => a && b,
            GateLogic::Or => a || b,
            GateLogic::Xor => a ^ b,
            GateLogic::Nand => !(a && b),
            GateLogic::Nor => !(a || b),
            GateLogic::Xnor => a == b,
        }
    }
}

crate::model_enum! {
    /// How the notes of the two input tracks combine
    pub enum NoteLogic {
        One => "Input 1",
        Two => "Input 2",
        Min => "MIN",
        Max => "MAX",
        Sum => "SUM",
        Avg => "AVG",
    }
}

impl NoteLogic {
    /// Combine two input notes
    pub fn apply(self, a: i32, b: i32) -> i32 {
        match self {
            NoteLogic::One => a,
            NoteLogic::Two => b,
            NoteLogic::Min => a.min(b),
            NoteLogic::Max => a.max(b),
            NoteLogic::Sum => a + b,
            NoteLogic::Avg => (a + b) / 2,
        }
    }
}

const _: () = assert!(GateLogic::ALL.len() as i32 <= GateLogicValue::MAX + 1);
const _: () = assert!(NoteLogic::ALL.len() as i32 <= NoteLogicValue::MAX + 1);

crate::model_enum! {
    /// Per-step parameter shown by list editors
    pub enum Layer {
        GateLogic => "GATE LOGIC",
        GateProbability => "GATE PROB",
        GateOffset => "GATE OFFSET",
        Slide => "SLIDE",
        Retrigger => "RETRIG",
        RetriggerProbability => "RETRIG PROB",
        Length => "LENGTH",
        LengthVariationRange => "LENGTH RANGE",
        LengthVariationProbability => "LENGTH PROB",
        NoteLogic => "NOTE LOGIC",
        NoteVariationProbability => "NOTE PROB",
        Condition => "CONDITION",
    }
}

/// One packed logic step
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
        self.set_gate_logic(GateLogic::One);
        self.set_gate_probability(GateProbability::MAX);
        self.set_gate_offset(0);
        self.set_slide(false);
        self.set_bypass_scale(false);
        self.set_retrigger(0);
        self.set_retrigger_probability(RetriggerProbability::MAX);
        self.set_length(Length::MAX / 2);
        self.set_length_variation_range(0);
        self.set_length_variation_probability(LengthVariationProbability::MAX);
        self.set_note_logic(NoteLogic::One);
        self.set_note_variation_probability(NoteVariationProbability::MAX);
        self.set_condition(Condition::OFF);
    }

    /// Raw packed words
    pub fn raw(&self) -> (u32, u32) {
        (self.data0, self.data1)
    }

    pub fn gate_logic(&self) -> GateLogic {
        GateLogic::from_index(GateLogicBits::get(self.data0) as usize)
    }

    pub fn set_gate_logic(&mut self, logic: GateLogic) {
        self.data0 = GateLogicBits::set(self.data0, logic.index() as u32);
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
        BypassScaleBits::get_flag(self.data0)
    }

    pub fn set_bypass_scale(&mut self, bypass: bool) {
        self.data0 = BypassScaleBits::set_flag(self.data0, bypass);
    }

    pub fn toggle_bypass_scale(&mut self) {
        self.set_bypass_scale(!self.bypass_scale());
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

    pub fn note_logic(&self) -> NoteLogic {
        NoteLogic::from_index(NoteLogicBits::get(self.data0) as usize)
    }

    pub fn set_note_logic(&mut self, logic: NoteLogic) {
        self.data0 = NoteLogicBits::set(self.data0, logic.index() as u32);
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
            Layer::GateLogic => self.gate_logic().index() as i32,
            Layer::GateProbability => self.gate_probability(),
            Layer::GateOffset => self.gate_offset(),
            Layer::Slide => self.slide() as i32,
            Layer::Retrigger => self.retrigger(),
            Layer::RetriggerProbability => self.retrigger_probability(),
            Layer::Length => self.length(),
            Layer::LengthVariationRange => self.length_variation_range(),
            Layer::LengthVariationProbability => self.length_variation_probability(),
            Layer::NoteLogic => self.note_logic().index() as i32,
            Layer::NoteVariationProbability => self.note_variation_probability(),
            Layer::Condition => self.condition().code() as i32,
        }
    }

    /// Set `layer` to `value`, clamped by the field setter
    pub fn set_layer_value(&mut self, layer: Layer, value: i32) {
        match layer {
            Layer::GateLogic => self.set_gate_logic(GateLogic::from_index(value.max(0) as usize)),
            Layer::GateProbability => self.set_gate_probability(value),
            Layer::GateOffset => self.set_gate_offset(value),
            Layer::Slide => self.set_slide(value != 0),
            Layer::Retrigger => self.set_retrigger(value),
            Layer::RetriggerProbability => self.set_retrigger_probability(value),
            Layer::Length => self.set_length(value),
            Layer::LengthVariationRange => self.set_length_variation_range(value),
            Layer::LengthVariationProbability => self.set_length_variation_probability(value),
            Layer::NoteLogic => self.set_note_logic(NoteLogic::from_index(value.max(0) as usize)),
            Layer::NoteVariationProbability => self.set_note_variation_probability(value),
            Layer::Condition => self.set_condition(Condition::from_code(value)),
        }
    }

    /// Legal values of `layer`
    pub fn layer_range(layer: Layer) -> LayerRange {
        match layer {
            Layer::GateLogic => LayerRange::new(0, GateLogic::COUNT as i32 - 1),
            Layer::GateProbability => LayerRange::new(GateProbability::MIN, GateProbability::MAX),
            Layer::GateOffset => LayerRange::new(GateOffset::MIN, GateOffset::MAX),
            Layer::Slide => LayerRange::new(0, 1),
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
            Layer::NoteLogic => LayerRange::new(0, NoteLogic::COUNT as i32 - 1),
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

/// A logic pattern
#[derive(Debug, Clone, PartialEq)]
pub struct LogicSequence {
    base: SequenceBase,
    key: SequenceKey,
    steps: [Step; STEP_COUNT],
}

impl Default for LogicSequence {
    fn default() -> Self {
        Self {
            base: SequenceBase::default(),
            key: SequenceKey::default(),
            steps: [Step::default(); STEP_COUNT],
        }
    }
}

impl LogicSequence {
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

    /// Set the gate operator of the leading steps
    pub fn set_gate_logics(&mut self, logics: &[GateLogic]) {
        for (step, &logic) in self.steps.iter_mut().zip(logics) {
            step.set_gate_logic(logic);
        }
    }

    /// Set the note operator of the leading steps
    pub fn set_note_logics(&mut self, logics: &[NoteLogic]) {
        for (step, &logic) in self.steps.iter_mut().zip(logics) {
            step.set_note_logic(logic);
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

impl Sequence for LogicSequence {
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
        let mut fresh = LogicSequence::default();
        fresh.set_track_index(self.track_index());
        *self != fresh
    }

    fn write_routed(&mut self, target: Target, int_value: i32, _float_value: f32) {
        if !self.key.write_routed(target, int_value) {
            self.base.write_routed(target, int_value);
        }
    }
}

impl Persist for LogicSequence {
    fn write<W: Write>(&self, writer: &mut VersionedWriter<W>) -> io::Result<()> {
        self.key.write(writer)?;
        self.base.write(writer)?;
        write_array(writer, &self.steps)
    }

    fn read<R: Read>(&mut self, reader: &mut VersionedReader<R>) -> io::Result<()> {
        // Logic sequences first appear in version 34
        if reader.data_version() < ProjectVersion::V34 {
            return Ok(());
        }
        self.key.read(reader)?;
        self.base.read(reader)?;
        read_array(reader, &mut self.steps)
    }
}
