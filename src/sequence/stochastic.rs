// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Stochastic sequences.
//!
//! The first twelve steps form a pool of notes (one per semitone) that the
//! engine draws from with per-step probabilities. The sequence carries its own
//! transport, rest probabilities, an octave range and a loop window into the
//! generated material.
//!
//! ```text
//! word0: gate 0 | slide 1 | length 2..6 | length range 6..10 | length prob 10..14
//!        note 14..21 | octave 21..24 | note prob 24..28 | octave prob 28..32
//! word1: bypass scale 0 | retrigger 1..4 | gate prob 4..8 | retrigger prob 8..12
//!        gate offset 12..16 | condition 16..23 | repeats 23..26 | repeat mode 26..29
//! ```

use std::fmt;
use std::io::{self, Read, Write};

use super::{
    print_reset_measure, read_divisor, read_step_words, shift_step_range, Sequence, SequenceKey,
    StepSelection,
};
use crate::routing::{Routable, Routing, Target};
use crate::serialize::{
    read_array, write_array, Persist, ProjectVersion, VersionedReader, VersionedWriter,
};
use crate::types::condition::ConditionValue;
use crate::types::utils::{
    adjusted_by_divisor, adjusted_by_power_of_two, adjusted_enum, clamp_divisor, duplicate_steps,
    print_divisor,
};
use crate::types::{
    layout_fits, BitField, Condition, LayerRange, ModelEnum, RunMode, SignedValue, UnsignedValue,
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
pub type NoteOctave = SignedValue<3>;
pub type NoteOctaveProbability = UnsignedValue<4>;
pub type StageRepeats = UnsignedValue<3>;
pub type StageRepeatsMode = UnsignedValue<3>;

/// Number of steps forming the note pool
pub const NOTE_POOL_SIZE: usize = 12;

/// Upper bound of a rest probability
pub const REST_PROBABILITY_MAX: i32 = 15;

/// Bound of the length modifier in eighths
pub const LENGTH_MODIFIER_RANGE: i32 = 16;

type GateBits = BitField<0, 1>;
type SlideBits = BitField<1, 1>;
type LengthBits = BitField<2, { Length::BITS }>;
type LengthVariationRangeBits = BitField<6, { LengthVariationRange::BITS }>;
type LengthVariationProbabilityBits = BitField<10, { LengthVariationProbability::BITS }>;
type NoteBits = BitField<14, { Note::BITS }>;
type NoteOctaveBits = BitField<21, { NoteOctave::BITS }>;
type NoteVariationProbabilityBits = BitField<24, { NoteVariationProbability::BITS }>;
type NoteOctaveProbabilityBits = BitField<28, { NoteOctaveProbability::BITS }>;

type BypassScaleBits = BitField<0, 1>;
type RetriggerBits = BitField<1, { Retrigger::BITS }>;
type GateProbabilityBits = BitField<4, { GateProbability::BITS }>;
type RetriggerProbabilityBits = BitField<8, { RetriggerProbability::BITS }>;
type GateOffsetBits = BitField<12, { GateOffset::BITS }>;
type ConditionBits = BitField<16, { ConditionValue::BITS }>;
type StageRepeatsBits = BitField<23, { StageRepeats::BITS }>;
type StageRepeatModeBits = BitField<26, { StageRepeatsMode::BITS }>;

const _: () = assert!(layout_fits(
    &[
        GateBits::SPAN,
        SlideBits::SPAN,
        LengthBits::SPAN,
        LengthVariationRangeBits::SPAN,
        LengthVariationProbabilityBits::SPAN,
        NoteBits::SPAN,
        NoteOctaveBits::SPAN,
        NoteVariationProbabilityBits::SPAN,
        NoteOctaveProbabilityBits::SPAN,
    ],
    32
));
const _: () = assert!(layout_fits(
    &[
        BypassScaleBits::SPAN,
        RetriggerBits::SPAN,
        GateProbabilityBits::SPAN,
        RetriggerProbabilityBits::SPAN,
        GateOffsetBits::SPAN,
        ConditionBits::SPAN,
        StageRepeatsBits::SPAN,
        StageRepeatModeBits::SPAN,
    ],
    32
));

crate::model_enum! {
    /// Which repeats of a stage fire a gate
    pub enum StageRepeatMode {
        Each => "Each",
        First => "First",
        Middle => "Middle",
        Last => "Last",
        Odd => "Odd",
        Even => "Even",
        Triplets => "Triplets",
        Random => "Random",
    }
}

const _: () = assert!(StageRepeatMode::ALL.len() as i32 <= StageRepeatsMode::MAX + 1);

crate::model_enum! {
    /// Notification raised by the last loop/reseed action
    pub enum Message {
        None => "",
        LoopOn => "LOOP ON",
        LoopOff => "LOOP OFF",
        Cleared => "CLEARED",
        ReSeed => "RESEED",
    }
}

crate::model_enum! {
    /// Per-step parameter shown by list editors
    pub enum Layer {
        Gate => "GATE",
        GateProbability => "GATE PROB",
        GateOffset => "GATE OFFSET",
        Retrigger => "RETRIG",
        RetriggerProbability => "RETRIG PROB",
        StageRepeats => "REPEAT",
        StageRepeatsMode => "REPEAT MODE",
        Length => "LENGTH",
        LengthVariationRange => "LENGTH RANGE",
        LengthVariationProbability => "LENGTH PROB",
        NoteVariationProbability => "NOTE PROB",
        NoteOctave => "OCTAVE",
        NoteOctaveProbability => "OCTAVE PROB",
        Slide => "SLIDE",
        Condition => "CONDITION",
    }
}

/// One packed stochastic step
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
        self.set_bypass_scale(true);
        self.set_retrigger(0);
        self.set_retrigger_probability(RetriggerProbability::MAX);
        self.set_length(Length::MAX / 2);
        self.set_length_variation_range(0);
        self.set_length_variation_probability(LengthVariationProbability::MAX);
        self.set_note(0);
        self.set_note_octave(0);
        self.set_note_octave_probability(NoteOctaveProbability::MAX);
        self.set_note_variation_probability(0);
        self.set_condition(Condition::OFF);
        self.set_stage_repeats(0);
        self.set_stage_repeat_mode(StageRepeatMode::Each);
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

    /// Play the note as a raw semitone instead of a scale degree
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
        GateProbabilityBits::get(self.data1) as i32
    }

    pub fn set_gate_probability(&mut self, probability: i32) {
        self.data1 = GateProbabilityBits::set(self.data1, GateProbability::clamp(probability) as u32);
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

    pub fn note(&self) -> i32 {
        Note::from_biased(NoteBits::get(self.data0))
    }

    pub fn set_note(&mut self, note: i32) {
        self.data0 = NoteBits::set(self.data0, Note::to_biased(note));
    }

    pub fn note_octave(&self) -> i32 {
        NoteOctave::from_biased(NoteOctaveBits::get(self.data0))
    }

    pub fn set_note_octave(&mut self, octave: i32) {
        self.data0 = NoteOctaveBits::set(self.data0, NoteOctave::to_biased(octave));
    }

    pub fn note_octave_probability(&self) -> i32 {
        NoteOctaveProbabilityBits::get(self.data0) as i32
    }

    pub fn set_note_octave_probability(&mut self, probability: i32) {
        self.data0 =
            NoteOctaveProbabilityBits::set(self.data0, NoteOctaveProbability::clamp(probability) as u32);
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

    /// Number of extra repeats of the stage
    pub fn stage_repeats(&self) -> i32 {
        StageRepeatsBits::get(self.data1) as i32
    }

    pub fn set_stage_repeats(&mut self, repeats: i32) {
        self.data1 = StageRepeatsBits::set(self.data1, StageRepeats::clamp(repeats) as u32);
    }

    pub fn stage_repeat_mode(&self) -> StageRepeatMode {
        StageRepeatMode::from_index(StageRepeatModeBits::get(self.data1) as usize)
    }

    pub fn set_stage_repeat_mode(&mut self, mode: StageRepeatMode) {
        self.data1 = StageRepeatModeBits::set(self.data1, mode.index() as u32);
    }

    /// Value of `layer`
    pub fn layer_value(&self, layer: Layer) -> i32 {
        match layer {
            Layer::Gate => self.gate() as i32,
            Layer::GateProbability => self.gate_probability(),
            Layer::GateOffset => self.gate_offset(),
            Layer::Retrigger => self.retrigger(),
            Layer::RetriggerProbability => self.retrigger_probability(),
            Layer::StageRepeats => self.stage_repeats(),
            Layer::StageRepeatsMode => self.stage_repeat_mode().index() as i32,
            Layer::Length => self.length(),
            Layer::LengthVariationRange => self.length_variation_range(),
            Layer::LengthVariationProbability => self.length_variation_probability(),
            Layer::NoteVariationProbability => self.note_variation_probability(),
            Layer::NoteOctave => self.note_octave(),
            Layer::NoteOctaveProbability => self.note_octave_probability(),
            Layer::Slide => self.slide() as i32,
            Layer::Condition => self.condition().code() as i32,
        }
    }

    /// Set `layer` to `value`, clamped by the field setter
    pub fn set_layer_value(&mut self, layer: Layer, value: i32) {
        match layer {
            Layer::Gate => self.set_gate(value != 0),
            Layer::GateProbability => self.set_gate_probability(value),
            Layer::GateOffset => self.set_gate_offset(value),
            Layer::Retrigger => self.set_retrigger(value),
            Layer::RetriggerProbability => self.set_retrigger_probability(value),
            Layer::StageRepeats => self.set_stage_repeats(value),
            Layer::StageRepeatsMode => {
                self.set_stage_repeat_mode(StageRepeatMode::from_index(value.max(0) as usize))
            }
            Layer::Length => self.set_length(value),
            Layer::LengthVariationRange => self.set_length_variation_range(value),
            Layer::LengthVariationProbability => self.set_length_variation_probability(value),
            Layer::NoteVariationProbability => self.set_note_variation_probability(value),
            Layer::NoteOctave => self.set_note_octave(value),
            Layer::NoteOctaveProbability => self.set_note_octave_probability(value),
            Layer::Slide => self.set_slide(value != 0),
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
            Layer::StageRepeats => LayerRange::new(StageRepeats::MIN, StageRepeats::MAX),
            Layer::StageRepeatsMode => LayerRange::new(0, StageRepeatMode::COUNT as i32 - 1),
            Layer::Length => LayerRange::new(Length::MIN, Length::MAX),
            Layer::LengthVariationRange => {
                LayerRange::new(LengthVariationRange::MIN, LengthVariationRange::MAX)
            }
            Layer::LengthVariationProbability => {
                LayerRange::new(LengthVariationProbability::MIN, LengthVariationProbability::MAX)
            }
            Layer::NoteVariationProbability => {
                LayerRange::new(NoteVariationProbability::MIN, NoteVariationProbability::MAX)
            }
            Layer::NoteOctave => LayerRange::new(NoteOctave::MIN, NoteOctave::MAX),
            Layer::NoteOctaveProbability => {
                LayerRange::new(NoteOctaveProbability::MIN, NoteOctaveProbability::MAX)
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

/// A stochastic pattern
#[derive(Debug, Clone, PartialEq)]
pub struct StochasticSequence {
    track_index: usize,
    key: SequenceKey,
    divisor: Routable<u16>,
    reset_measure: u8,
    run_mode: Routable<RunMode>,
    first_step: u8,
    last_step: u8,
    reseed: Routable<bool>,
    rest_probability2: Routable<i8>,
    rest_probability4: Routable<i8>,
    rest_probability8: Routable<i8>,
    sequence_first_step: Routable<u8>,
    sequence_last_step: Routable<u8>,
    low_octave_range: Routable<i8>,
    high_octave_range: Routable<i8>,
    length_modifier: Routable<i8>,
    steps: [Step; STEP_COUNT],
    use_loop: bool,
    clear_loop: bool,
    message: Message,
}

impl Default for StochasticSequence {
    fn default() -> Self {
        let mut sequence = Self {
            track_index: 0,
            key: SequenceKey::default(),
            divisor: Routable::new(12),
            reset_measure: 0,
            run_mode: Routable::new(RunMode::Forward),
            first_step: 0,
            last_step: 0,
            reseed: Routable::new(false),
            rest_probability2: Routable::new(0),
            rest_probability4: Routable::new(0),
            rest_probability8: Routable::new(0),
            sequence_first_step: Routable::new(0),
            sequence_last_step: Routable::new(15),
            low_octave_range: Routable::new(0),
            high_octave_range: Routable::new(0),
            length_modifier: Routable::new(0),
            steps: [Step::default(); STEP_COUNT],
            use_loop: false,
            clear_loop: false,
            message: Message::None,
        };
        sequence.clear_steps();
        sequence
    }
}

impl StochasticSequence {
    fn routed(&self, routing: &Routing, target: Target) -> bool {
        routing.is_routed(target, self.track_index)
    }

    /// Scale and root note
    pub fn key(&self) -> &SequenceKey {
        &self.key
    }

    /// Mutable scale and root note
    pub fn key_mut(&mut self) -> &mut SequenceKey {
        &mut self.key
    }

    // divisor

    pub fn divisor(&self, routing: &Routing) -> i32 {
        self.divisor.get(self.routed(routing, Target::Divisor)) as i32
    }

    pub fn set_divisor(&mut self, divisor: i32, routed: bool) {
        self.divisor.set(clamp_divisor(divisor) as u16, routed);
    }

    pub fn edit_divisor(&mut self, routing: &Routing, value: i32, shift: bool) {
        if !self.routed(routing, Target::Divisor) {
            self.set_divisor(adjusted_by_divisor(self.divisor(routing), value, shift), false);
        }
    }

    pub fn print_divisor(&self, routing: &Routing, out: &mut dyn fmt::Write) -> fmt::Result {
        routing.print_routed(out, Target::Divisor, self.track_index)?;
        print_divisor(out, self.divisor(routing))
    }

    // reset measure

    pub fn reset_measure(&self) -> i32 {
        self.reset_measure as i32
    }

    pub fn set_reset_measure(&mut self, reset_measure: i32) {
        self.reset_measure = reset_measure.clamp(0, 128) as u8;
    }

    pub fn edit_reset_measure(&mut self, value: i32, shift: bool) {
        self.set_reset_measure(adjusted_by_power_of_two(self.reset_measure(), value, shift));
    }

    pub fn print_reset_measure(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        print_reset_measure(out, self.reset_measure())
    }

    // run mode

    pub fn run_mode(&self, routing: &Routing) -> RunMode {
        self.run_mode.get(self.routed(routing, Target::RunMode))
    }

    pub fn set_run_mode(&mut self, run_mode: RunMode, routed: bool) {
        self.run_mode.set(run_mode, routed);
    }

    pub fn edit_run_mode(&mut self, routing: &Routing, value: i32, _shift: bool) {
        if !self.routed(routing, Target::RunMode) {
            self.set_run_mode(adjusted_enum(self.run_mode(routing), value), false);
        }
    }

    pub fn print_run_mode(&self, routing: &Routing, out: &mut dyn fmt::Write) -> fmt::Result {
        routing.print_routed(out, Target::RunMode, self.track_index)?;
        out.write_str(self.run_mode(routing).name())
    }

    // first / last step (not routable)

    pub fn first_step(&self) -> i32 {
        self.first_step as i32
    }

    pub fn set_first_step(&mut self, first_step: i32) {
        self.first_step = first_step.clamp(0, self.last_step()) as u8;
    }

    /// Last step, never before the first step
    pub fn last_step(&self) -> i32 {
        (self.last_step as i32).max(self.first_step())
    }

    pub fn set_last_step(&mut self, last_step: i32) {
        self.last_step = last_step.clamp(self.first_step(), STEP_COUNT as i32 - 1) as u8;
    }

    pub fn edit_first_step(&mut self, value: i32, shift: bool) {
        if shift {
            self.offset_first_and_last_step(value);
        } else {
            self.set_first_step(self.first_step() + value);
        }
    }

    pub fn edit_last_step(&mut self, value: i32, shift: bool) {
        if shift {
            self.offset_first_and_last_step(value);
        } else {
            self.set_last_step(self.last_step() + value);
        }
    }

    pub fn print_first_step(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        write!(out, "{}", self.first_step() + 1)
    }

    pub fn print_last_step(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        write!(out, "{}", self.last_step() + 1)
    }

    /// Collapse the step window onto one step
    pub fn set_step_bounds(&mut self, index: usize) {
        let index = index.min(STEP_COUNT - 1) as u8;
        self.first_step = index;
        self.last_step = index;
    }

    fn offset_first_and_last_step(&mut self, value: i32) {
        let value = value.clamp(-self.first_step(), STEP_COUNT as i32 - 1 - self.last_step());
        if value > 0 {
            self.set_last_step(self.last_step() + value);
            self.set_first_step(self.first_step() + value);
        } else {
            self.set_first_step(self.first_step() + value);
            self.set_last_step(self.last_step() + value);
        }
    }

    // rest probabilities

    /// Probability of a single-step rest, what is left after the longer rests
    pub fn rest_probability(&self, routing: &Routing) -> i32 {
        (REST_PROBABILITY_MAX
            - self.rest_probability2(routing)
            - self.rest_probability4(routing)
            - self.rest_probability8(routing))
        .max(0)
    }

    pub fn print_rest_probability(&self, routing: &Routing, out: &mut dyn fmt::Write) -> fmt::Result {
        print_rest(out, self.rest_probability(routing))
    }

    pub fn rest_probability2(&self, routing: &Routing) -> i32 {
        self.rest_probability2
            .get(self.routed(routing, Target::RestProbability2)) as i32
    }

    pub fn set_rest_probability2(&mut self, probability: i32, routed: bool) {
        self.rest_probability2
            .set(probability.clamp(0, REST_PROBABILITY_MAX) as i8, routed);
    }

    pub fn edit_rest_probability2(&mut self, routing: &Routing, value: i32, _shift: bool) {
        if !self.routed(routing, Target::RestProbability2) {
            self.set_rest_probability2(self.rest_probability2(routing) + value, false);
        }
    }

    pub fn print_rest_probability2(&self, routing: &Routing, out: &mut dyn fmt::Write) -> fmt::Result {
        routing.print_routed(out, Target::RestProbability2, self.track_index)?;
        print_rest(out, self.rest_probability2(routing))
    }

    pub fn rest_probability4(&self, routing: &Routing) -> i32 {
        self.rest_probability4
            .get(self.routed(routing, Target::RestProbability4)) as i32
    }

    pub fn set_rest_probability4(&mut self, probability: i32, routed: bool) {
        self.rest_probability4
            .set(probability.clamp(0, REST_PROBABILITY_MAX) as i8, routed);
    }

    pub fn edit_rest_probability4(&mut self, routing: &Routing, value: i32, _shift: bool) {
        if !self.routed(routing, Target::RestProbability4) {
            self.set_rest_probability4(self.rest_probability4(routing) + value, false);
        }
    }

    pub fn print_rest_probability4(&self, routing: &Routing, out: &mut dyn fmt::Write) -> fmt::Result {
        routing.print_routed(out, Target::RestProbability4, self.track_index)?;
        print_rest(out, self.rest_probability4(routing))
    }

    pub fn rest_probability8(&self, routing: &Routing) -> i32 {
        self.rest_probability8
            .get(self.routed(routing, Target::RestProbability8)) as i32
    }

    pub fn set_rest_probability8(&mut self, probability: i32, routed: bool) {
        self.rest_probability8
            .set(probability.clamp(0, REST_PROBABILITY_MAX) as i8, routed);
    }

    pub fn edit_rest_probability8(&mut self, routing: &Routing, value: i32, _shift: bool) {
        if !self.routed(routing, Target::RestProbability8) {
            self.set_rest_probability8(self.rest_probability8(routing) + value, false);
        }
    }

    pub fn print_rest_probability8(&self, routing: &Routing, out: &mut dyn fmt::Write) -> fmt::Result {
        routing.print_routed(out, Target::RestProbability8, self.track_index)?;
        print_rest(out, self.rest_probability8(routing))
    }

    // reseed

    pub fn reseed(&self, routing: &Routing) -> bool {
        self.reseed.get(self.routed(routing, Target::Reseed))
    }

    /// Request a reseed; a raised request posts [`Message::ReSeed`]
    pub fn set_reseed(&mut self, reseed: bool, routed: bool) {
        self.reseed.set(reseed, routed);
        if reseed {
            self.message = Message::ReSeed;
        }
    }

    // sequence loop window

    pub fn sequence_first_step(&self, routing: &Routing) -> i32 {
        self.sequence_first_step
            .get(self.routed(routing, Target::SequenceFirstStep)) as i32
    }

    /// Set the loop start; stored edits are bounded by the stored loop end
    pub fn set_sequence_first_step(&mut self, first_step: i32, routed: bool) {
        let max = if routed {
            STEP_COUNT as i32 - 1
        } else {
            self.sequence_last_step.base as i32
        };
        self.sequence_first_step
            .set(first_step.clamp(0, max) as u8, routed);
    }

    /// Loop end, never before the loop start
    pub fn sequence_last_step(&self, routing: &Routing) -> i32 {
        let last = self
            .sequence_last_step
            .get(self.routed(routing, Target::SequenceLastStep)) as i32;
        last.max(self.sequence_first_step(routing))
    }

    /// Set the loop end; stored edits are bounded by the stored loop start
    pub fn set_sequence_last_step(&mut self, last_step: i32, routed: bool) {
        let min = if routed {
            0
        } else {
            self.sequence_first_step.base as i32
        };
        self.sequence_last_step
            .set(last_step.clamp(min, STEP_COUNT as i32 - 1) as u8, routed);
    }

    pub fn edit_sequence_first_step(&mut self, routing: &Routing, value: i32, shift: bool) {
        if shift {
            self.offset_sequence_first_and_last_step(routing, value);
        } else if !self.routed(routing, Target::SequenceFirstStep) {
            let first = self.sequence_first_step.base as i32;
            self.set_sequence_first_step(first + value, false);
        }
    }

    pub fn edit_sequence_last_step(&mut self, routing: &Routing, value: i32, shift: bool) {
        if shift {
            self.offset_sequence_first_and_last_step(routing, value);
        } else if !self.routed(routing, Target::SequenceLastStep) {
            let last = self.sequence_last_step.base as i32;
            self.set_sequence_last_step(last + value, false);
        }
    }

    pub fn print_sequence_first_step(&self, routing: &Routing, out: &mut dyn fmt::Write) -> fmt::Result {
        routing.print_routed(out, Target::SequenceFirstStep, self.track_index)?;
        write!(out, "{}", self.sequence_first_step(routing) + 1)
    }

    pub fn print_sequence_last_step(&self, routing: &Routing, out: &mut dyn fmt::Write) -> fmt::Result {
        routing.print_routed(out, Target::SequenceLastStep, self.track_index)?;
        write!(out, "{}", self.sequence_last_step(routing) + 1)
    }

    fn offset_sequence_first_and_last_step(&mut self, routing: &Routing, value: i32) {
        if self.routed(routing, Target::SequenceFirstStep)
            || self.routed(routing, Target::SequenceLastStep)
        {
            return;
        }
        let first = self.sequence_first_step.base as i32;
        let last = (self.sequence_last_step.base as i32).max(first);
        let value = value.clamp(-first, STEP_COUNT as i32 - 1 - last);
        if value > 0 {
            self.set_sequence_last_step(last + value, false);
            self.set_sequence_first_step(first + value, false);
        } else {
            self.set_sequence_first_step(first + value, false);
            self.set_sequence_last_step(last + value, false);
        }
    }

    /// Stored loop window length
    pub fn sequence_length(&self) -> i32 {
        self.sequence_last_step.base as i32 - self.sequence_first_step.base as i32 + 1
    }

    /// Length of the generated buffer the loop window reads from (16 minimum)
    pub fn buffer_loop_length(&self) -> i32 {
        (self.sequence_last_step.base as i32 + 1).max(16)
    }

    // loop flags

    pub fn use_loop(&self) -> bool {
        self.use_loop
    }

    pub fn set_use_loop(&mut self, use_loop: bool) {
        self.use_loop = use_loop;
    }

    /// Toggle looping and post the matching message
    pub fn toggle_use_loop(&mut self) {
        self.use_loop = !self.use_loop;
        self.message = if self.use_loop {
            Message::LoopOn
        } else {
            Message::LoopOff
        };
    }

    pub fn clear_loop(&self) -> bool {
        self.clear_loop
    }

    pub fn set_clear_loop(&mut self, clear_loop: bool) {
        self.clear_loop = clear_loop;
        if clear_loop {
            self.message = Message::Cleared;
        }
    }

    pub fn message(&self) -> Message {
        self.message
    }

    pub fn set_message(&mut self, message: Message) {
        self.message = message;
    }

    // octave range

    pub fn low_octave_range(&self, routing: &Routing) -> i32 {
        self.low_octave_range
            .get(self.routed(routing, Target::LowOctaveRange)) as i32
    }

    /// Set the low octave, bounded by the high octave of the same layer
    pub fn set_low_octave_range(&mut self, octave: i32, routed: bool) {
        let high = self.high_octave_range.get(routed) as i32;
        self.low_octave_range.set(octave.clamp(-10, high) as i8, routed);
    }

    pub fn edit_low_octave_range(&mut self, routing: &Routing, value: i32, _shift: bool) {
        if !self.routed(routing, Target::LowOctaveRange) {
            self.set_low_octave_range(self.low_octave_range(routing) + value, false);
        }
    }

    pub fn print_low_octave_range(&self, routing: &Routing, out: &mut dyn fmt::Write) -> fmt::Result {
        routing.print_routed(out, Target::LowOctaveRange, self.track_index)?;
        write!(out, "{:+}", self.low_octave_range(routing))
    }

    pub fn high_octave_range(&self, routing: &Routing) -> i32 {
        self.high_octave_range
            .get(self.routed(routing, Target::HighOctaveRange)) as i32
    }

    /// Set the high octave, bounded by the low octave of the same layer
    pub fn set_high_octave_range(&mut self, octave: i32, routed: bool) {
        let low = self.low_octave_range.get(routed) as i32;
        self.high_octave_range.set(octave.clamp(low, 10) as i8, routed);
    }

    pub fn edit_high_octave_range(&mut self, routing: &Routing, value: i32, _shift: bool) {
        if !self.routed(routing, Target::HighOctaveRange) {
            self.set_high_octave_range(self.high_octave_range(routing) + value, false);
        }
    }

    pub fn print_high_octave_range(&self, routing: &Routing, out: &mut dyn fmt::Write) -> fmt::Result {
        routing.print_routed(out, Target::HighOctaveRange, self.track_index)?;
        write!(out, "{:+}", self.high_octave_range(routing))
    }

    // length modifier

    pub fn length_modifier(&self, routing: &Routing) -> i32 {
        self.length_modifier
            .get(self.routed(routing, Target::LengthModifier)) as i32
    }

    pub fn set_length_modifier(&mut self, modifier: i32, routed: bool) {
        self.length_modifier.set(
            modifier.clamp(-LENGTH_MODIFIER_RANGE, LENGTH_MODIFIER_RANGE) as i8,
            routed,
        );
    }

    pub fn edit_length_modifier(&mut self, routing: &Routing, value: i32, _shift: bool) {
        if !self.routed(routing, Target::LengthModifier) {
            self.set_length_modifier(self.length_modifier(routing) + value, false);
        }
    }

    pub fn print_length_modifier(&self, routing: &Routing, out: &mut dyn fmt::Write) -> fmt::Result {
        routing.print_routed(out, Target::LengthModifier, self.track_index)?;
        write!(out, "{:+.1}%", self.length_modifier(routing) as f32 * 12.5)
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

    /// Reset every step; the note pool gets one semitone per step
    pub fn clear_steps(&mut self) {
        for step in self.steps.iter_mut() {
            step.clear();
        }
        for (note, step) in self.steps.iter_mut().take(NOTE_POOL_SIZE).enumerate() {
            step.set_note(note as i32);
        }
    }

    /// Whether no note of the pool is enabled
    pub fn is_empty(&self) -> bool {
        !self.steps[..NOTE_POOL_SIZE].iter().any(Step::gate)
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

    /// Rotate the step window, or only the selected steps
    pub fn shift_steps(&mut self, selected: StepSelection, direction: i32) {
        let (first, last) = (self.first_step() as usize, self.last_step() as usize);
        shift_step_range(&mut self.steps, selected, first, last, direction);
    }

    /// Copy the step window behind itself and extend the last step
    pub fn duplicate_steps(&mut self) {
        let (first, last) = (self.first_step(), self.last_step());
        duplicate_steps(&mut self.steps, first as usize, last as usize);
        self.set_last_step(last + (last - first + 1));
    }
}

fn print_rest(out: &mut dyn fmt::Write, probability: i32) -> fmt::Result {
    write!(
        out,
        "{:+.1}%",
        probability as f32 * 100.0 / REST_PROBABILITY_MAX as f32
    )
}

impl Sequence for StochasticSequence {
    fn track_index(&self) -> usize {
        self.track_index
    }

    fn set_track_index(&mut self, track_index: usize) {
        self.track_index = track_index;
        self.key.set_track_index(track_index);
    }

    fn clear(&mut self) {
        let track_index = self.track_index;
        *self = StochasticSequence::default();
        self.set_track_index(track_index);
    }

    /// Only the note pool counts as content
    fn is_edited(&self) -> bool {
        let mut cleared = Step::default();
        self.steps[..NOTE_POOL_SIZE]
            .iter()
            .enumerate()
            .any(|(note, step)| {
                cleared.set_note(note as i32);
                *step != cleared
            })
    }

    /// Step bounds are not routable here; their routes are ignored
    fn write_routed(&mut self, target: Target, int_value: i32, _float_value: f32) {
        if self.key.write_routed(target, int_value) {
            return;
        }
        match target {
            Target::Divisor => self.set_divisor(int_value, true),
            Target::RunMode => {
                self.set_run_mode(RunMode::from_index(int_value.max(0) as usize), true)
            }
            Target::Reseed => self.set_reseed(int_value != 0, true),
            Target::RestProbability2 => self.set_rest_probability2(int_value, true),
            Target::RestProbability4 => self.set_rest_probability4(int_value, true),
            Target::RestProbability8 => self.set_rest_probability8(int_value, true),
            Target::SequenceFirstStep => self.set_sequence_first_step(int_value, true),
            Target::SequenceLastStep => self.set_sequence_last_step(int_value, true),
            Target::LowOctaveRange => self.set_low_octave_range(int_value, true),
            Target::HighOctaveRange => self.set_high_octave_range(int_value, true),
            Target::LengthModifier => self.set_length_modifier(int_value, true),
            // loop bounds are routed through SequenceFirstStep/SequenceLastStep
            Target::FirstStep | Target::LastStep => {}
            _ => {}
        }
    }
}

impl Persist for StochasticSequence {
    fn write<W: Write>(&self, writer: &mut VersionedWriter<W>) -> io::Result<()> {
        self.key.write(writer)?;
        writer.write(&self.divisor)?;
        writer.write(&self.reset_measure)?;
        writer.write(&self.run_mode)?;
        writer.write(&self.first_step)?;
        writer.write(&self.last_step)?;
        writer.write(&self.rest_probability2)?;
        writer.write(&self.rest_probability4)?;
        writer.write(&self.rest_probability8)?;
        writer.write(&self.length_modifier)?;
        writer.write(&self.low_octave_range)?;
        writer.write(&self.high_octave_range)?;
        writer.write(&self.sequence_first_step)?;
        writer.write(&self.sequence_last_step)?;
        write_array(writer, &self.steps)
    }

    fn read<R: Read>(&mut self, reader: &mut VersionedReader<R>) -> io::Result<()> {
        self.key.read(reader)?;
        read_divisor(reader, &mut self.divisor)?;
        reader.read(&mut self.reset_measure)?;
        reader.read(&mut self.run_mode)?;
        reader.read(&mut self.first_step)?;
        reader.read(&mut self.last_step)?;
        reader.read_since(&mut self.rest_probability2, ProjectVersion::V36)?;
        reader.read_since(&mut self.rest_probability4, ProjectVersion::V36)?;
        reader.read_since(&mut self.rest_probability8, ProjectVersion::V36)?;
        reader.read_since(&mut self.length_modifier, ProjectVersion::V36)?;
        reader.read_since(&mut self.low_octave_range, ProjectVersion::V36)?;
        reader.read_since(&mut self.high_octave_range, ProjectVersion::V36)?;
        reader.read_since(&mut self.sequence_first_step, ProjectVersion::V37)?;
        reader.read_since(&mut self.sequence_last_step, ProjectVersion::V37)?;
        read_array(reader, &mut self.steps)?;

        if self.last_step < self.first_step {
            self.last_step = self.first_step;
        }
        if self.sequence_last_step.base < self.sequence_first_step.base {
            self.sequence_last_step = Routable::new(self.sequence_first_step.base);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialize::{from_bytes, to_bytes};

    #[test]
    fn test_step_defaults() {
        let step = Step::default();
        assert!(step.bypass_scale());
        assert_eq!(step.gate_probability(), GateProbability::MAX);
        assert_eq!(step.length(), Length::MAX / 2);
        assert_eq!(step.note_variation_probability(), 0);
        assert_eq!(step.note_octave_probability(), NoteOctaveProbability::MAX);
        assert_eq!(step.stage_repeat_mode(), StageRepeatMode::Each);
    }

    #[test]
    fn test_gate_offset_allows_negatives() {
        let mut step = Step::default();
        step.set_gate_offset(-5);
        assert_eq!(step.gate_offset(), -5);
        assert!(step.bypass_scale());
    }

    #[test]
    fn test_layers() {
        let mut step = Step::default();
        for &layer in Layer::ALL {
            let range = Step::layer_range(layer);
            step.set_layer_value(layer, range.min - 1);
            assert_eq!(step.layer_value(layer), range.min, "{}", layer);
            step.set_layer_value(layer, range.max + 1);
            assert_eq!(step.layer_value(layer), range.max, "{}", layer);
        }
    }

    #[test]
    fn test_note_pool_defaults() {
        let sequence = StochasticSequence::default();
        let notes: Vec<i32> = sequence.steps()[..13].iter().map(Step::note).collect();
        assert_eq!(notes, vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 0]);
        assert!(!sequence.is_edited());
        assert!(sequence.is_empty());
    }

    #[test]
    fn test_edit_tracking_only_looks_at_pool() {
        let mut sequence = StochasticSequence::default();
        sequence.step_mut(20).toggle_gate();
        assert!(!sequence.is_edited());
        sequence.step_mut(3).toggle_gate();
        assert!(sequence.is_edited());
        assert!(!sequence.is_empty());
    }

    #[test]
    fn test_rest_probability_is_remainder() {
        let routing = Routing::new();
        let mut sequence = StochasticSequence::default();
        sequence.set_rest_probability2(5, false);
        sequence.set_rest_probability4(6, false);
        assert_eq!(sequence.rest_probability(&routing), 4);
        sequence.set_rest_probability8(10, false);
        assert_eq!(sequence.rest_probability(&routing), 0);
    }

    #[test]
    fn test_octave_range_ordering() {
        let routing = Routing::new();
        let mut sequence = StochasticSequence::default();
        sequence.set_high_octave_range(3, false);
        sequence.set_low_octave_range(5, false);
        assert_eq!(sequence.low_octave_range(&routing), 3);
        sequence.set_high_octave_range(-4, false);
        assert_eq!(sequence.high_octave_range(&routing), 3);
    }

    #[test]
    fn test_messages() {
        let mut sequence = StochasticSequence::default();
        sequence.toggle_use_loop();
        assert_eq!(sequence.message(), Message::LoopOn);
        sequence.toggle_use_loop();
        assert_eq!(sequence.message(), Message::LoopOff);
        sequence.set_clear_loop(true);
        assert_eq!(sequence.message(), Message::Cleared);
        sequence.set_reseed(true, false);
        assert_eq!(sequence.message(), Message::ReSeed);
    }

    #[test]
    fn test_routed_loop_window() {
        let mut routing = Routing::new();
        routing.edit_route(Target::SequenceFirstStep, 0).unwrap();
        let mut sequence = StochasticSequence::default();
        sequence.write_routed(Target::SequenceFirstStep, 40, 0.0);
        sequence.write_routed(Target::FirstStep, 9, 0.0);
        assert_eq!(sequence.sequence_first_step(&routing), 40);
        assert_eq!(sequence.sequence_last_step(&routing), 40);
        assert_eq!(sequence.sequence_length(), 16);
        assert_eq!(sequence.first_step(), 0);
    }

    #[test]
    fn test_roundtrip() {
        let mut sequence = StochasticSequence::default();
        sequence.set_divisor(24, false);
        sequence.set_rest_probability4(7, false);
        sequence.set_sequence_last_step(31, false);
        sequence.step_mut(2).set_gate(true);
        sequence.step_mut(2).set_stage_repeat_mode(StageRepeatMode::Triplets);

        let bytes = to_bytes(&sequence).unwrap();
        let mut decoded = StochasticSequence::default();
        from_bytes(&bytes, &mut decoded).unwrap();
        assert_eq!(decoded, sequence);
        assert_eq!(decoded.buffer_loop_length(), 32);
    }

    #[test]
    fn test_fields_default_before_v36() {
        let mut sequence = StochasticSequence::default();
        sequence.set_rest_probability2(9, false);
        sequence.set_sequence_last_step(40, false);
        let bytes = to_bytes(&sequence).unwrap();

        // Strip the version tag and the eight gated bytes, read as version 35
        let mut old = bytes[4..4 + 2 + 2 + 1 + 1 + 2].to_vec();
        old.extend_from_slice(&bytes[4 + 8 + 8..]);
        let mut decoded = StochasticSequence::default();
        let mut reader = VersionedReader::with_version(&old[..], 35);
        decoded.read(&mut reader).unwrap();

        let routing = Routing::new();
        assert_eq!(decoded.rest_probability2(&routing), 0);
        assert_eq!(decoded.sequence_last_step(&routing), 15);
        assert_eq!(decoded.divisor(&routing), 12);
        assert_eq!(decoded.steps(), sequence.steps());
    }
}
