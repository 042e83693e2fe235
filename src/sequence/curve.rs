// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Curve sequences.
//!
//! A curve step selects a shape drawn between a low and a high level, plus a
//! short gate pattern. The first word holds the shape data; the 16-bit second
//! word (added in version 18) holds the gate:
//!
//! ```text
//! word0: shape 0..6 | shape variation 6..12 | variation prob 12..16 | min 16..24 | max 24..32
//! word1: gate 0..4 | gate prob 4..7
//! ```

use std::fmt;
use std::io::{self, Read, Write};

use super::{shift_step_range, Sequence, SequenceBase, StepSelection};
use crate::routing::Target;
use crate::serialize::{
    read_array, write_array, Persist, ProjectVersion, VersionedReader, VersionedWriter,
};
use crate::types::utils::{adjusted_enum, duplicate_steps};
use crate::types::{layout_fits, BitField, LayerRange, ModelEnum, UnsignedValue, VoltageRange};
use crate::STEP_COUNT;

pub type Shape = UnsignedValue<6>;
pub type ShapeVariationProbability = UnsignedValue<4>;
pub type Min = UnsignedValue<8>;
pub type Max = UnsignedValue<8>;
pub type Gate = UnsignedValue<4>;
pub type GateProbability = UnsignedValue<3>;

/// Largest shape variation probability
pub const SHAPE_VARIATION_PROBABILITY_MAX: i32 = 8;

type ShapeBits = BitField<0, { Shape::BITS }>;
type ShapeVariationBits = BitField<6, { Shape::BITS }>;
type ShapeVariationProbabilityBits = BitField<12, { ShapeVariationProbability::BITS }>;
type MinBits = BitField<16, { Min::BITS }>;
type MaxBits = BitField<24, { Max::BITS }>;

type GateBits = BitField<0, { Gate::BITS }>;
type GateProbabilityBits = BitField<4, { GateProbability::BITS }>;

const _: () = assert!(layout_fits(
    &[
        ShapeBits::SPAN,
        ShapeVariationBits::SPAN,
        ShapeVariationProbabilityBits::SPAN,
        MinBits::SPAN,
        MaxBits::SPAN,
    ],
    32
));
const _: () = assert!(layout_fits(&[GateBits::SPAN, GateProbabilityBits::SPAN], 16));

crate::model_enum! {
    /// Curve shapes a step can draw
    pub enum CurveShape {
        Low => "Low",
        High => "High",
        StepUp => "Step Up",
        StepDown => "Step Down",
        SmoothUp => "Smooth Up",
        SmoothDown => "Smooth Down",
        RampUp => "Ramp Up",
        RampDown => "Ramp Down",
        ExpUp => "Exp Up",
        ExpDown => "Exp Down",
        LogUp => "Log Up",
        LogDown => "Log Down",
        SmoothUpHalf => "Smooth Up Half",
        SmoothDownHalf => "Smooth Down Half",
        RampUpHalf => "Ramp Up Half",
        RampDownHalf => "Ramp Down Half",
        ExpUpHalf => "Exp Up Half",
        ExpDownHalf => "Exp Down Half",
        LogUpHalf => "Log Up Half",
        LogDownHalf => "Log Down Half",
        Triangle => "Triangle",
        Bell => "Bell",
        ExpDown2x => "Exp Down 2x",
        ExpDown3x => "Exp Down 3x",
        ExpDown4x => "Exp Down 4x",
    }
}

const _: () = assert!(CurveShape::ALL.len() as i32 <= Shape::MAX + 1);

crate::model_enum! {
    /// Per-step parameter shown by list editors
    pub enum Layer {
        Shape => "SHAPE",
        ShapeVariation => "SHAPE VAR",
        ShapeVariationProbability => "SHAPE PROB",
        Min => "MIN",
        Max => "MAX",
        Gate => "GATE",
        GateProbability => "GATE PROB",
    }
}

/// One packed curve step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    data0: u32,
    data1: u16,
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
        self.set_shape(0);
        self.set_shape_variation(0);
        self.set_shape_variation_probability(0);
        self.set_min(0);
        self.set_max(Max::MAX);
        self.set_gate(0);
        self.set_gate_probability(GateProbability::MAX);
    }

    /// Raw packed words
    pub fn raw(&self) -> (u32, u16) {
        (self.data0, self.data1)
    }

    fn word1(&self) -> u32 {
        self.data1 as u32
    }

    pub fn shape(&self) -> i32 {
        ShapeBits::get(self.data0) as i32
    }

    pub fn set_shape(&mut self, shape: i32) {
        let shape = shape.clamp(0, CurveShape::COUNT as i32 - 1);
        self.data0 = ShapeBits::set(self.data0, shape as u32);
    }

    /// Shape as a typed value
    pub fn curve_shape(&self) -> CurveShape {
        CurveShape::from_index(self.shape() as usize)
    }

    pub fn shape_variation(&self) -> i32 {
        ShapeVariationBits::get(self.data0) as i32
    }

    pub fn set_shape_variation(&mut self, shape: i32) {
        let shape = shape.clamp(0, CurveShape::COUNT as i32 - 1);
        self.data0 = ShapeVariationBits::set(self.data0, shape as u32);
    }

    pub fn shape_variation_probability(&self) -> i32 {
        ShapeVariationProbabilityBits::get(self.data0) as i32
    }

    /// Set the variation probability, clamped to `0..=8`
    pub fn set_shape_variation_probability(&mut self, probability: i32) {
        let probability = probability.clamp(0, SHAPE_VARIATION_PROBABILITY_MAX);
        self.data0 = ShapeVariationProbabilityBits::set(self.data0, probability as u32);
    }

    pub fn min(&self) -> i32 {
        MinBits::get(self.data0) as i32
    }

    /// Set the low level; raises the high level to stay `min <= max`
    pub fn set_min(&mut self, min: i32) {
        let min = Min::clamp(min);
        self.data0 = MinBits::set(self.data0, min as u32);
        self.data0 = MaxBits::set(self.data0, self.max().max(min) as u32);
    }

    pub fn min_normalized(&self) -> f32 {
        self.min() as f32 / Min::MAX as f32
    }

    pub fn set_min_normalized(&mut self, min: f32) {
        self.set_min((min * Min::MAX as f32).round() as i32);
    }

    pub fn max(&self) -> i32 {
        MaxBits::get(self.data0) as i32
    }

    /// Set the high level; lowers the low level to stay `min <= max`
    pub fn set_max(&mut self, max: i32) {
        let max = Max::clamp(max);
        self.data0 = MaxBits::set(self.data0, max as u32);
        self.data0 = MinBits::set(self.data0, self.min().min(max) as u32);
    }

    pub fn max_normalized(&self) -> f32 {
        self.max() as f32 / Max::MAX as f32
    }

    pub fn set_max_normalized(&mut self, max: f32) {
        self.set_max((max * Max::MAX as f32).round() as i32);
    }

    /// Gate pattern (one bit per quarter of the step)
    pub fn gate(&self) -> i32 {
        GateBits::get(self.word1()) as i32
    }

    pub fn set_gate(&mut self, gate: i32) {
        self.data1 = GateBits::set(self.word1(), Gate::clamp(gate) as u32) as u16;
    }

    pub fn gate_probability(&self) -> i32 {
        GateProbabilityBits::get(self.word1()) as i32
    }

    pub fn set_gate_probability(&mut self, probability: i32) {
        let probability = GateProbability::clamp(probability) as u32;
        self.data1 = GateProbabilityBits::set(self.word1(), probability) as u16;
    }

    /// Value of `layer`
    pub fn layer_value(&self, layer: Layer) -> i32 {
        match layer {
            Layer::Shape => self.shape(),
            Layer::ShapeVariation => self.shape_variation(),
            Layer::ShapeVariationProbability => self.shape_variation_probability(),
            Layer::Min => self.min(),
            Layer::Max => self.max(),
            Layer::Gate => self.gate(),
            Layer::GateProbability => self.gate_probability(),
        }
    }

    /// Set `layer` to `value`, clamped by the field setter
    pub fn set_layer_value(&mut self, layer: Layer, value: i32) {
        match layer {
            Layer::Shape => self.set_shape(value),
            Layer::ShapeVariation => self.set_shape_variation(value),
            Layer::ShapeVariationProbability => self.set_shape_variation_probability(value),
            Layer::Min => self.set_min(value),
            Layer::Max => self.set_max(value),
            Layer::Gate => self.set_gate(value),
            Layer::GateProbability => self.set_gate_probability(value),
        }
    }

    /// Legal values of `layer`
    pub fn layer_range(layer: Layer) -> LayerRange {
        match layer {
            Layer::Shape | Layer::ShapeVariation => {
                LayerRange::new(0, CurveShape::COUNT as i32 - 1)
            }
            Layer::ShapeVariationProbability => {
                LayerRange::new(0, SHAPE_VARIATION_PROBABILITY_MAX)
            }
            Layer::Min => LayerRange::new(Min::MIN, Min::MAX),
            Layer::Max => LayerRange::new(Max::MIN, Max::MAX),
            Layer::Gate => LayerRange::new(Gate::MIN, Gate::MAX),
            Layer::GateProbability => LayerRange::new(GateProbability::MIN, GateProbability::MAX),
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
        reader.read(&mut self.data0)?;
        reader.read_since(&mut self.data1, ProjectVersion::V18)
    }
}

/// A curve pattern
#[derive(Debug, Clone, PartialEq)]
pub struct CurveSequence {
    base: SequenceBase,
    range: VoltageRange,
    steps: [Step; STEP_COUNT],
}

impl Default for CurveSequence {
    fn default() -> Self {
        Self {
            base: SequenceBase::default(),
            range: VoltageRange::Bipolar5V,
            steps: [Step::default(); STEP_COUNT],
        }
    }
}

impl CurveSequence {
    /// Transport parameters
    pub fn base(&self) -> &SequenceBase {
        &self.base
    }

    /// Mutable transport parameters
    pub fn base_mut(&mut self) -> &mut SequenceBase {
        &mut self.base
    }

    /// Output voltage range
    pub fn range(&self) -> VoltageRange {
        self.range
    }

    pub fn set_range(&mut self, range: VoltageRange) {
        self.range = range;
    }

    pub fn edit_range(&mut self, value: i32, _shift: bool) {
        self.set_range(adjusted_enum(self.range, value));
    }

    pub fn print_range(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        out.write_str(self.range.name())
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

    /// Set shapes of the leading steps
    pub fn set_shapes(&mut self, shapes: &[i32]) {
        for (step, &shape) in self.steps.iter_mut().zip(shapes) {
            step.set_shape(shape);
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

impl Sequence for CurveSequence {
    fn track_index(&self) -> usize {
        self.base.track_index()
    }

    fn set_track_index(&mut self, track_index: usize) {
        self.base.set_track_index(track_index);
    }

    fn clear(&mut self) {
        self.base.clear();
        self.range = VoltageRange::Bipolar5V;
        self.clear_steps();
    }

    fn is_edited(&self) -> bool {
        let mut fresh = CurveSequence::default();
        fresh.set_track_index(self.track_index());
        *self != fresh
    }

    fn write_routed(&mut self, target: Target, int_value: i32, _float_value: f32) {
        self.base.write_routed(target, int_value);
    }
}

impl Persist for CurveSequence {
    fn write<W: Write>(&self, writer: &mut VersionedWriter<W>) -> io::Result<()> {
        writer.write(&self.range)?;
        self.base.write(writer)?;
        write_array(writer, &self.steps)
    }

    fn read<R: Read>(&mut self, reader: &mut VersionedReader<R>) -> io::Result<()> {
        reader.read(&mut self.range)?;
        self.base.read(reader)?;
        read_array(reader, &mut self.steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialize::{from_bytes, to_bytes};

    #[test]
    fn test_step_defaults() {
        let step = Step::default();
        assert_eq!(step.min(), 0);
        assert_eq!(step.max(), Max::MAX);
        assert_eq!(step.gate_probability(), GateProbability::MAX);
        assert_eq!(step.curve_shape(), CurveShape::Low);
    }

    #[test]
    fn test_min_max_coupling() {
        let mut step = Step::default();
        step.set_max(100);
        step.set_min(150);
        assert_eq!((step.min(), step.max()), (150, 150));
        step.set_max(20);
        assert_eq!((step.min(), step.max()), (20, 20));
        step.set_max(-5);
        assert_eq!((step.min(), step.max()), (0, 0));
        step.set_min(999);
        assert_eq!((step.min(), step.max()), (255, 255));
    }

    #[test]
    fn test_normalized_levels() {
        let mut step = Step::default();
        step.set_min_normalized(0.5);
        assert_eq!(step.min(), 128);
        assert!((step.max_normalized() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_shape_clamps() {
        let mut step = Step::default();
        step.set_shape(63);
        assert_eq!(step.shape(), CurveShape::COUNT as i32 - 1);
        step.set_shape_variation_probability(15);
        assert_eq!(step.shape_variation_probability(), 8);
        assert_eq!(step.min(), 0);
    }

    #[test]
    fn test_layers() {
        let mut step = Step::default();
        for &layer in Layer::ALL {
            let range = Step::layer_range(layer);
            step.set_layer_value(layer, range.max + 10);
            assert_eq!(step.layer_value(layer), range.max, "{}", layer);
        }
        assert_eq!(Step::layer_default_value(Layer::Max), 255);
    }

    #[test]
    fn test_gate_word_missing_before_v18() {
        let mut step = Step::default();
        step.set_shape(4);
        step.set_gate(0b1010);
        let bytes = step.raw().0.to_le_bytes();

        let mut decoded = Step::default();
        let mut reader = VersionedReader::with_version(&bytes[..], 17);
        decoded.read(&mut reader).unwrap();
        assert_eq!(decoded.shape(), 4);
        assert_eq!(decoded.gate(), 0);
        assert_eq!(decoded.gate_probability(), GateProbability::MAX);
    }

    #[test]
    fn test_equality_covers_gate_word() {
        let a = Step::default();
        let mut b = Step::default();
        b.set_gate(1);
        assert_ne!(a, b);
    }

    #[test]
    fn test_sequence_roundtrip() {
        let mut sequence = CurveSequence::default();
        sequence.set_range(VoltageRange::Unipolar3V);
        sequence.set_shapes(&[1, 2, 3]);
        sequence.step_mut(5).set_max(42);

        let bytes = to_bytes(&sequence).unwrap();
        let mut decoded = CurveSequence::default();
        from_bytes(&bytes, &mut decoded).unwrap();
        assert_eq!(decoded, sequence);
        assert!(decoded.is_edited());
    }

    #[test]
    fn test_write_routed_ignores_scale() {
        let mut sequence = CurveSequence::default();
        sequence.write_routed(Target::Scale, 3, 0.0);
        assert!(!sequence.is_edited());
    }
}
