// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Live parameter routing.
//!
//! This module provides:
//! - [`Routable`], the stored/live value pair held by every modulatable parameter
//! - [`Target`], the closed set of modulatable parameters
//! - [`Route`], a binding of one source to one target on a set of tracks
//! - [`Routing`], the fixed route table and its routed-set lookup

mod routable;

pub use routable::Routable;

use std::fmt;
use std::io::{self, Read, Write};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::serialize::{read_array, write_array, Persist, VersionedReader, VersionedWriter};
use crate::types::ModelEnum;
use crate::{ROUTE_COUNT, TRACK_COUNT};

/// Marker printed in front of a value that is currently routed
pub const ROUTED_MARKER: &str = "*";

crate::model_enum! {
    /// Every parameter a route can drive
    pub enum Target {
        None => "None",
        // Project
        Tempo => "Tempo",
        Swing => "Swing",
        // Track
        SlideTime => "Slide Time",
        Octave => "Octave",
        Transpose => "Transpose",
        Offset => "Offset",
        Rotate => "Rotate",
        GateProbabilityBias => "Gate P. Bias",
        RetriggerProbabilityBias => "Retrig P. Bias",
        LengthBias => "Length Bias",
        NoteProbabilityBias => "Note P. Bias",
        ShapeProbabilityBias => "Shape P. Bias",
        // Sequence
        FirstStep => "First Step",
        LastStep => "Last Step",
        RunMode => "Run Mode",
        Divisor => "Divisor",
        Scale => "Scale",
        RootNote => "Root Note",
        Reseed => "Reseed",
        RestProbability2 => "Rest Prob. 2",
        RestProbability4 => "Rest Prob. 4",
        RestProbability8 => "Rest Prob. 8",
        LowOctaveRange => "Low Octave",
        HighOctaveRange => "High Octave",
        LengthModifier => "Length Mod",
        SequenceFirstStep => "Seq First Step",
        SequenceLastStep => "Seq Last Step",
        ArpOctaves => "Arp Octaves",
    }
}

crate::model_enum! {
    /// Scope a target lives in
    pub enum TargetCategory {
        None => "None",
        Project => "Project",
        Track => "Track",
        Sequence => "Sequence",
    }
}

impl Target {
    /// Scope of the target
    pub fn category(self) -> TargetCategory {
        match self {
            Target::None => TargetCategory::None,
            Target::Tempo | Target::Swing => TargetCategory::Project,
            Target::SlideTime
            | Target::Octave
            | Target::Transpose
            | Target::Offset
            | Target::Rotate
            | Target::GateProbabilityBias
            | Target::RetriggerProbabilityBias
            | Target::LengthBias
            | Target::NoteProbabilityBias
            | Target::ShapeProbabilityBias => TargetCategory::Track,
            _ => TargetCategory::Sequence,
        }
    }

    /// Project-wide target (not bound to tracks)
    pub fn is_project_target(self) -> bool {
        self.category() == TargetCategory::Project
    }

    /// Track or sequence target (bound to a track mask)
    pub fn is_per_track(self) -> bool {
        matches!(
            self.category(),
            TargetCategory::Track | TargetCategory::Sequence
        )
    }

    /// Value range a route maps its source onto
    pub fn range(self) -> (f32, f32) {
        match self {
            Target::None => (0.0, 0.0),
            Target::Tempo => (1.0, 1000.0),
            Target::Swing => (50.0, 75.0),
            Target::SlideTime => (0.0, 100.0),
            Target::Octave => (-10.0, 10.0),
            Target::Transpose => (-100.0, 100.0),
            Target::Offset => (-500.0, 500.0),
            Target::Rotate => (-64.0, 64.0),
            Target::GateProbabilityBias
            | Target::RetriggerProbabilityBias
            | Target::LengthBias
            | Target::NoteProbabilityBias
            | Target::ShapeProbabilityBias => (-8.0, 8.0),
            Target::FirstStep
            | Target::LastStep
            | Target::SequenceFirstStep
            | Target::SequenceLastStep => (0.0, (crate::STEP_COUNT - 1) as f32),
            Target::RunMode => (0.0, (crate::types::RunMode::COUNT - 1) as f32),
            Target::Divisor => (1.0, 768.0),
            Target::Scale => (0.0, (crate::music::Scale::COUNT - 1) as f32),
            Target::RootNote => (0.0, 11.0),
            Target::Reseed => (0.0, 1.0),
            Target::RestProbability2 | Target::RestProbability4 | Target::RestProbability8 => {
                (0.0, 15.0)
            }
            Target::LowOctaveRange | Target::HighOctaveRange => (-10.0, 10.0),
            Target::LengthModifier => (-16.0, 16.0),
            Target::ArpOctaves => (-5.0, 5.0),
        }
    }
}

crate::model_enum! {
    /// Where a route reads its value from
    pub enum Source {
        None => "None",
        CvIn1 => "CV In 1",
        CvIn2 => "CV In 2",
        CvIn3 => "CV In 3",
        CvIn4 => "CV In 4",
        CvOut1 => "CV Out 1",
        CvOut2 => "CV Out 2",
        CvOut3 => "CV Out 3",
        CvOut4 => "CV Out 4",
        CvOut5 => "CV Out 5",
        CvOut6 => "CV Out 6",
        CvOut7 => "CV Out 7",
        CvOut8 => "CV Out 8",
        Midi => "MIDI",
    }
}

/// Routing table misuse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RoutingError {
    /// Every slot already holds an active route
    #[error("All routes are used!")]
    AllRoutesUsed,

    /// Another slot already drives this target on this track
    #[error("{target} on track {track} is already routed by route {route}")]
    RouteConflict {
        target: Target,
        track: usize,
        route: usize,
    },

    /// Slot index outside the table
    #[error("route index {0} out of range")]
    InvalidRoute(usize),

    /// Per-track target pointed at a track that does not exist
    #[error("track index {0} out of range")]
    InvalidTrack(usize),
}

/// One binding of a source to a target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Route {
    target: Target,
    tracks: u8,
    min: f32,
    max: f32,
    source: Source,
}

impl Default for Route {
    fn default() -> Self {
        Self {
            target: Target::None,
            tracks: 0,
            min: 0.0,
            max: 1.0,
            source: Source::None,
        }
    }
}

impl Route {
    /// Route driving `target` on `track_index`, spanning the full target range
    pub fn new(target: Target, track_index: usize) -> Result<Self, RoutingError> {
        let mut route = Route::default();
        route.init(target, track_index)?;
        Ok(route)
    }

    /// A route is active while it has a target
    pub fn active(&self) -> bool {
        self.target != Target::None
    }

    /// Reset to an unused slot
    pub fn clear(&mut self) {
        *self = Route::default();
    }

    /// Point the route at `target` on `track_index` with the full range.
    ///
    /// Project targets ignore `track_index`; per-track targets need an
    /// existing track, otherwise the route is left untouched.
    pub fn init(&mut self, target: Target, track_index: usize) -> Result<(), RoutingError> {
        let tracks = if !target.is_per_track() {
            0
        } else if track_index < TRACK_COUNT {
            1 << track_index
        } else {
            return Err(RoutingError::InvalidTrack(track_index));
        };
        let (min, max) = target.range();
        self.target = target;
        self.tracks = tracks;
        self.min = min;
        self.max = max;
        self.source = Source::CvIn1;
        Ok(())
    }

    /// Driven parameter
    pub fn target(&self) -> Target {
        self.target
    }

    /// Change the target; the value range resets to the new target's range
    pub fn set_target(&mut self, target: Target) {
        if target != self.target {
            let (min, max) = target.range();
            self.target = target;
            self.min = min;
            self.max = max;
        }
    }

    /// Bitmask of driven tracks
    pub fn tracks(&self) -> u8 {
        self.tracks
    }

    /// Set the bitmask of driven tracks
    pub fn set_tracks(&mut self, tracks: u8) {
        self.tracks = tracks;
    }

    /// Toggle one track in the mask
    pub fn toggle_track(&mut self, track_index: usize) {
        if track_index < TRACK_COUNT {
            self.tracks ^= 1 << track_index;
        }
    }

    /// Whether this route drives `target` on `track_index`
    pub fn drives(&self, target: Target, track_index: usize) -> bool {
        self.target == target
            && (target.is_project_target()
                || (track_index < TRACK_COUNT && self.tracks & (1 << track_index) != 0))
    }

    /// Value the source minimum maps to
    pub fn min(&self) -> f32 {
        self.min
    }

    /// Set the low end, clamped to the target range
    pub fn set_min(&mut self, min: f32) {
        let (lo, hi) = self.target.range();
        self.min = min.clamp(lo, hi);
    }

    /// Value the source maximum maps to
    pub fn max(&self) -> f32 {
        self.max
    }

    /// Set the high end, clamped to the target range
    pub fn set_max(&mut self, max: f32) {
        let (lo, hi) = self.target.range();
        self.max = max.clamp(lo, hi);
    }

    /// Input of the route
    pub fn source(&self) -> Source {
        self.source
    }

    /// Set the input
    pub fn set_source(&mut self, source: Source) {
        self.source = source;
    }

    /// Map a normalized source value (0..1) into the target range
    pub fn map(&self, normalized: f32) -> f32 {
        self.min + normalized.clamp(0.0, 1.0) * (self.max - self.min)
    }
}

impl Persist for Route {
    fn write<W: Write>(&self, writer: &mut VersionedWriter<W>) -> io::Result<()> {
        writer.write(&self.target)?;
        writer.write(&self.tracks)?;
        writer.write(&self.min)?;
        writer.write(&self.max)?;
        writer.write(&self.source)
    }

    fn read<R: Read>(&mut self, reader: &mut VersionedReader<R>) -> io::Result<()> {
        reader.read(&mut self.target)?;
        reader.read(&mut self.tracks)?;
        reader.read(&mut self.min)?;
        reader.read(&mut self.max)?;
        reader.read(&mut self.source)
    }
}

/// The route table.
///
/// Besides the routes themselves the table caches, per target, the mask of
/// tracks currently driven, so [`Routing::is_routed`] is a single lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct Routing {
    routes: [Route; ROUTE_COUNT],
    routed_set: [u8; Target::COUNT],
}

impl Default for Routing {
    fn default() -> Self {
        Self {
            routes: [Route::default(); ROUTE_COUNT],
            routed_set: [0; Target::COUNT],
        }
    }
}

impl Routing {
    /// Create an empty routing table
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove every route
    pub fn clear(&mut self) {
        *self = Routing::default();
        debug!("routing cleared");
    }

    /// Route in slot `index`
    pub fn route(&self, index: usize) -> Option<&Route> {
        self.routes.get(index)
    }

    /// All slots in index order
    pub fn routes(&self) -> &[Route; ROUTE_COUNT] {
        &self.routes
    }

    /// Active routes with their slot index
    pub fn active_routes(&self) -> impl Iterator<Item = (usize, &Route)> {
        self.routes.iter().enumerate().filter(|(_, r)| r.active())
    }

    /// Whether `target` is currently driven on `track_index`.
    ///
    /// Project targets ignore the track index.
    pub fn is_routed(&self, target: Target, track_index: usize) -> bool {
        let mask = self.routed_set[target.index()];
        if target.is_project_target() {
            mask != 0
        } else {
            track_index < TRACK_COUNT && mask & (1 << track_index) != 0
        }
    }

    /// Print the routed marker when `target` is driven on `track_index`
    pub fn print_routed(
        &self,
        out: &mut dyn fmt::Write,
        target: Target,
        track_index: usize,
    ) -> fmt::Result {
        if self.is_routed(target, track_index) {
            out.write_str(ROUTED_MARKER)?;
        }
        Ok(())
    }

    /// Slot of the route driving `target` on `track_index`
    pub fn find_route(&self, target: Target, track_index: usize) -> Option<usize> {
        self.routes
            .iter()
            .position(|route| route.drives(target, track_index))
    }

    /// First unused slot
    pub fn find_empty_route(&self) -> Option<usize> {
        self.routes.iter().position(|route| !route.active())
    }

    /// Store `route` in slot `index`.
    ///
    /// Rejected when another slot already drives the same target on one of
    /// the tracks in `route`, so every (target, track) pair has at most one
    /// route.
    pub fn set_route(&mut self, index: usize, route: Route) -> Result<(), RoutingError> {
        if index >= ROUTE_COUNT {
            return Err(RoutingError::InvalidRoute(index));
        }
        if route.active() {
            if let Some(conflict) = self.conflict(index, &route) {
                warn!("route {} rejected: {}", index, conflict);
                return Err(conflict);
            }
        }
        self.routes[index] = route;
        self.rebuild_routed_set();
        debug!("route {} set to {:?}", index, route.target());
        Ok(())
    }

    /// Find or create a route for `target` on `track_index`.
    ///
    /// Returns the existing slot, otherwise initializes the first empty one.
    pub fn edit_route(&mut self, target: Target, track_index: usize) -> Result<usize, RoutingError> {
        if let Some(index) = self.find_route(target, track_index) {
            return Ok(index);
        }
        let route = Route::new(target, track_index)?;
        let Some(index) = self.find_empty_route() else {
            warn!("no empty route for {} on track {}", target, track_index);
            return Err(RoutingError::AllRoutesUsed);
        };
        self.set_route(index, route)?;
        info!("route {} created for {} on track {}", index, target, track_index);
        Ok(index)
    }

    /// Free slot `index`
    pub fn clear_route(&mut self, index: usize) {
        if let Some(route) = self.routes.get_mut(index) {
            route.clear();
            self.rebuild_routed_set();
            debug!("route {} cleared", index);
        }
    }

    fn conflict(&self, index: usize, route: &Route) -> Option<RoutingError> {
        for (other_index, other) in self.active_routes() {
            if other_index == index || other.target() != route.target() {
                continue;
            }
            if route.target().is_project_target() {
                return Some(RoutingError::RouteConflict {
                    target: route.target(),
                    track: 0,
                    route: other_index,
                });
            }
            let shared = other.tracks() & route.tracks();
            if shared != 0 {
                return Some(RoutingError::RouteConflict {
                    target: route.target(),
                    track: shared.trailing_zeros() as usize,
                    route: other_index,
                });
            }
        }
        None
    }

    fn rebuild_routed_set(&mut self) {
        self.routed_set = [0; Target::COUNT];
        for route in self.routes.iter().filter(|r| r.active()) {
            let mask = if route.target().is_project_target() {
                0xff
            } else {
                route.tracks()
            };
            self.routed_set[route.target().index()] |= mask;
        }
    }
}

impl Persist for Routing {
    fn write<W: Write>(&self, writer: &mut VersionedWriter<W>) -> io::Result<()> {
        write_array(writer, &self.routes)
    }

    fn read<R: Read>(&mut self, reader: &mut VersionedReader<R>) -> io::Result<()> {
        read_array(reader, &mut self.routes)?;
        self.rebuild_routed_set();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialize::{from_bytes, to_bytes};

    #[test]
    fn test_empty_table() {
        let routing = Routing::new();
        assert_eq!(routing.find_empty_route(), Some(0));
        assert!(!routing.is_routed(Target::Octave, 0));
        assert_eq!(routing.find_route(Target::Octave, 0), None);
    }

    #[test]
    fn test_edit_route_creates_then_reuses() {
        let mut routing = Routing::new();
        let index = routing.edit_route(Target::Octave, 2).unwrap();
        assert_eq!(index, 0);
        assert!(routing.is_routed(Target::Octave, 2));
        assert!(!routing.is_routed(Target::Octave, 3));
        assert_eq!(routing.edit_route(Target::Octave, 2).unwrap(), 0);

        let route = routing.route(0).unwrap();
        assert_eq!(route.tracks(), 0b100);
        assert_eq!((route.min(), route.max()), Target::Octave.range());
    }

    #[test]
    fn test_table_exhaustion_is_reported() {
        let mut routing = Routing::new();
        for track in 0..TRACK_COUNT {
            routing.edit_route(Target::Octave, track).unwrap();
            routing.edit_route(Target::Transpose, track).unwrap();
        }
        assert_eq!(routing.find_empty_route(), None);
        assert_eq!(
            routing.edit_route(Target::Rotate, 0),
            Err(RoutingError::AllRoutesUsed)
        );
        // Existing routes are still found
        assert_eq!(routing.edit_route(Target::Transpose, 7), Ok(15));
    }

    #[test]
    fn test_set_route_rejects_double_binding() {
        let mut routing = Routing::new();
        routing.edit_route(Target::Scale, 1).unwrap();

        let mut route = Route::new(Target::Scale, 3).unwrap();
        route.toggle_track(1);
        let result = routing.set_route(5, route);
        assert_eq!(
            result,
            Err(RoutingError::RouteConflict {
                target: Target::Scale,
                track: 1,
                route: 0
            })
        );
        assert!(!routing.is_routed(Target::Scale, 3));

        // Disjoint track mask is fine
        routing.set_route(5, Route::new(Target::Scale, 3).unwrap()).unwrap();
        assert!(routing.is_routed(Target::Scale, 3));
    }

    #[test]
    fn test_project_targets_ignore_track() {
        let mut routing = Routing::new();
        routing.edit_route(Target::Tempo, 0).unwrap();
        assert!(routing.is_routed(Target::Tempo, 5));
        assert!(routing.set_route(1, Route::new(Target::Tempo, 4).unwrap()).is_err());
    }

    #[test]
    fn test_per_track_route_needs_existing_track() {
        let mut routing = Routing::new();
        assert_eq!(
            routing.edit_route(Target::Octave, TRACK_COUNT),
            Err(RoutingError::InvalidTrack(TRACK_COUNT))
        );
        assert_eq!(routing.active_routes().count(), 0);
        assert_eq!(
            Route::new(Target::Transpose, 42),
            Err(RoutingError::InvalidTrack(42))
        );

        let mut route = Route::new(Target::Octave, 2).unwrap();
        assert!(route.init(Target::Rotate, TRACK_COUNT).is_err());
        assert_eq!(route.target(), Target::Octave);
        assert_eq!(route.tracks(), 0b100);

        // project targets carry no track
        route.init(Target::Tempo, TRACK_COUNT).unwrap();
        assert_eq!(route.tracks(), 0);
    }

    #[test]
    fn test_clear_route_updates_lookup() {
        let mut routing = Routing::new();
        let index = routing.edit_route(Target::Divisor, 0).unwrap();
        routing.clear_route(index);
        assert!(!routing.is_routed(Target::Divisor, 0));
        assert_eq!(routing.find_empty_route(), Some(0));
    }

    #[test]
    fn test_print_routed() {
        let mut routing = Routing::new();
        routing.edit_route(Target::Rotate, 1).unwrap();
        let mut out = String::new();
        routing.print_routed(&mut out, Target::Rotate, 1).unwrap();
        routing.print_routed(&mut out, Target::Rotate, 0).unwrap();
        assert_eq!(out, ROUTED_MARKER);
    }

    #[test]
    fn test_route_min_max_clamped() {
        let mut route = Route::new(Target::Octave, 0).unwrap();
        route.set_min(-50.0);
        route.set_max(50.0);
        assert_eq!(route.min(), -10.0);
        assert_eq!(route.max(), 10.0);
        assert_eq!(route.map(0.5), 0.0);
    }

    #[test]
    fn test_persist_rebuilds_lookup() {
        let mut routing = Routing::new();
        routing.edit_route(Target::RootNote, 6).unwrap();
        let bytes = to_bytes(&routing).unwrap();

        let mut decoded = Routing::new();
        from_bytes(&bytes, &mut decoded).unwrap();
        assert_eq!(decoded, routing);
        assert!(decoded.is_routed(Target::RootNote, 6));
    }
}
