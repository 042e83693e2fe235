// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Primitive model types shared by every sequence and track.
//!
//! This module provides:
//! - Fixed-width value domains used to clamp packed fields
//! - Bit field accessors with compile-time layout checks
//! - Step conditions
//! - The small enums every track type stores (run mode, play mode, ...)
//! - Editing helpers shared by the parameter setters

pub mod bitfield;
pub mod condition;
pub mod utils;
pub mod value;

pub use bitfield::{layout_fits, BitField};
pub use condition::{Condition, ConditionKind};
pub use value::{SignedValue, UnsignedValue};

/// Common contract of the small enums stored in the model.
///
/// Enums are persisted as their `u8` index and edited by stepping through
/// their variants, so every enum exposes a dense index and a clamped inverse.
pub trait ModelEnum: Copy + Eq + 'static {
    /// Number of variants
    const COUNT: usize;

    /// Dense index of the variant
    fn index(self) -> usize;

    /// Variant for `index`, clamped to the last variant
    fn from_index(index: usize) -> Self;

    /// Display name
    fn name(self) -> &'static str;
}

/// Declare a model enum with display names.
///
/// Generates the enum (as `#[repr(u8)]`), an `ALL` table, a [`ModelEnum`]
/// implementation, `Default` (first variant) and `Display`.
#[macro_export]
macro_rules! model_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        $vis enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Every variant in declaration order
            pub const ALL: &'static [$name] = &[ $( $name::$variant ),+ ];
        }

        impl $crate::types::ModelEnum for $name {
            const COUNT: usize = $name::ALL.len();

            fn index(self) -> usize {
                self as usize
            }

            fn from_index(index: usize) -> Self {
                $name::ALL[index.min($name::ALL.len() - 1)]
            }

            fn name(self) -> &'static str {
                match self {
                    $( $name::$variant => $label ),+
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::ALL[0]
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.pad($crate::types::ModelEnum::name(*self))
            }
        }
    };
}

model_enum! {
    /// Step order used when advancing through a sequence
    pub enum RunMode {
        Forward => "Forward",
        Backward => "Backward",
        Pendulum => "Pendulum",
        PingPong => "Ping Pong",
        Random => "Random",
        RandomWalk => "Random Walk",
    }
}

model_enum! {
    /// Whether a track follows the global measure or free-runs
    pub enum PlayMode {
        Aligned => "Aligned",
        Free => "Free",
    }
}

model_enum! {
    /// What a track does while fill is held
    pub enum FillMode {
        None => "None",
        Gates => "Gates",
        NextPattern => "Next Pattern",
        Condition => "Condition",
    }
}

model_enum! {
    /// When the CV output of a track is updated
    pub enum CvUpdateMode {
        Gate => "Gate",
        Always => "Always",
    }
}

model_enum! {
    /// Output voltage range of a curve sequence or modulation output
    pub enum VoltageRange {
        Unipolar1V => "1V Unipolar",
        Unipolar2V => "2V Unipolar",
        Unipolar3V => "3V Unipolar",
        Unipolar4V => "4V Unipolar",
        Unipolar5V => "5V Unipolar",
        Bipolar1V => "1V Bipolar",
        Bipolar2V => "2V Bipolar",
        Bipolar3V => "3V Bipolar",
        Bipolar4V => "4V Bipolar",
        Bipolar5V => "5V Bipolar",
    }
}

impl VoltageRange {
    /// Low and high voltage of the range
    pub fn limits(self) -> (f32, f32) {
        match self {
            VoltageRange::Unipolar1V => (0.0, 1.0),
            VoltageRange::Unipolar2V => (0.0, 2.0),
            VoltageRange::Unipolar3V => (0.0, 3.0),
            VoltageRange::Unipolar4V => (0.0, 4.0),
            VoltageRange::Unipolar5V => (0.0, 5.0),
            VoltageRange::Bipolar1V => (-1.0, 1.0),
            VoltageRange::Bipolar2V => (-2.0, 2.0),
            VoltageRange::Bipolar3V => (-3.0, 3.0),
            VoltageRange::Bipolar4V => (-4.0, 4.0),
            VoltageRange::Bipolar5V => (-5.0, 5.0),
        }
    }
}

model_enum! {
    /// Which views follow the playing pattern
    ///
    /// The order matters: toggling with a launchpad connected cycles through
    /// the variants in declaration order.
    pub enum PatternFollow {
        Off => "Off",
        Display => "Display",
        LaunchPad => "LP",
        DispAndLp => "Disp+LP",
    }
}

/// Inclusive range of a step layer, used by generic list editors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerRange {
    /// Smallest value
    pub min: i32,
    /// Largest value
    pub max: i32,
}

impl LayerRange {
    /// Create a new layer range
    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_enum_index_roundtrip() {
        for &mode in RunMode::ALL {
            assert_eq!(RunMode::from_index(mode.index()), mode);
        }
        assert_eq!(RunMode::COUNT, 6);
    }

    #[test]
    fn test_model_enum_from_index_clamps() {
        assert_eq!(FillMode::from_index(100), FillMode::Condition);
        assert_eq!(PlayMode::from_index(0), PlayMode::Aligned);
    }

    #[test]
    fn test_model_enum_names() {
        assert_eq!(FillMode::NextPattern.name(), "Next Pattern");
        assert_eq!(PatternFollow::DispAndLp.to_string(), "Disp+LP");
        assert_eq!(VoltageRange::default(), VoltageRange::Unipolar1V);
    }

    #[test]
    fn test_voltage_limits() {
        assert_eq!(VoltageRange::Bipolar5V.limits(), (-5.0, 5.0));
        assert_eq!(VoltageRange::Unipolar3V.limits(), (0.0, 3.0));
    }
}
