// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Data model of a multi-track hardware step sequencer.
//!
//! This crate provides:
//! - Bit-packed steps and the sequences holding them
//! - Tracks of six types behind one fixed-size container
//! - Routable parameters and the route table driving them
//! - A version-gated binary format that keeps old project files loadable
//! - The file layer storing projects, sequences and settings in slots

pub mod config;
pub mod engine;
pub mod file_manager;
pub mod music;
pub mod project;
pub mod routing;
pub mod sequence;
pub mod serialize;
pub mod track;
pub mod types;

pub use engine::{critical_section, EngineGuard, EngineLock, TickGate};
pub use file_manager::{FileManager, FsError};
pub use project::{ClipBoard, Project};
pub use routing::{Routable, Routing, RoutingError, Target};
pub use track::{ModelError, Track, TrackMode};

/// Steps per sequence
pub const STEP_COUNT: usize = 64;

/// Patterns per track
pub const PATTERN_COUNT: usize = 16;

/// Extra sequence slots per track used for snapshots
pub const SNAPSHOT_COUNT: usize = 1;

pub const TRACK_COUNT: usize = 8;

/// Slots in the route table
pub const ROUTE_COUNT: usize = 16;

/// Characters in project, track and file names
pub const NAME_LENGTH: usize = 8;
