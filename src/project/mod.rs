// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! The project: global parameters, the tracks and the route table.
//!
//! Structural track changes go through the project so they run inside an
//! engine critical section.

mod clipboard;

pub use clipboard::ClipBoard;

use std::fmt;
use std::io::{self, Read, Write};

use tracing::{debug, info};

use crate::engine::{critical_section, EngineLock};
use crate::music::{Note, Scale};
use crate::routing::{Routable, Routing, Source, Target};
use crate::serialize::{Persist, VersionedReader, VersionedWriter};
use crate::track::{ModelError, Track, TrackMode};
use crate::types::utils::{adjusted_enum, name_from_bytes, name_to_bytes};
use crate::types::ModelEnum;
use crate::{NAME_LENGTH, TRACK_COUNT};

pub const DEFAULT_NAME: &str = "INIT";

const TEMPO_MIN: f32 = 1.0;
const TEMPO_MAX: f32 = 1000.0;
const SWING_MIN: i32 = 50;
const SWING_MAX: i32 = 75;
const SYNC_MEASURE_MAX: i32 = 128;

#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    name: [u8; NAME_LENGTH],
    tempo: Routable<f32>,
    swing: Routable<u8>,
    sync_measure: u8,
    scale: Scale,
    root_note: Note,
    selected_track_index: u8,
    tracks: [Track; TRACK_COUNT],
    routing: Routing,
}

impl Default for Project {
    fn default() -> Self {
        Self {
            name: name_to_bytes(DEFAULT_NAME),
            tempo: Routable::new(120.0),
            swing: Routable::new(50),
            sync_measure: 1,
            scale: Scale::Major,
            root_note: Note::default(),
            selected_track_index: 0,
            tracks: std::array::from_fn(Track::new),
            routing: Routing::new(),
        }
    }
}

impl Project {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset to an empty project: Note tracks only, no routes.
    ///
    /// Callers sharing the project with a running engine hold the engine lock.
    pub fn clear(&mut self) {
        *self = Project::default();
        info!("project cleared");
    }

    // name

    pub fn name(&self) -> &str {
        name_from_bytes(&self.name)
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name_to_bytes(name);
    }

    // tempo

    pub fn tempo(&self) -> f32 {
        self.tempo.get(self.routing.is_routed(Target::Tempo, 0))
    }

    pub fn set_tempo(&mut self, tempo: f32, routed: bool) {
        self.tempo.set(tempo.clamp(TEMPO_MIN, TEMPO_MAX), routed);
    }

    /// Coarse steps of 1 BPM, fine steps of 0.1 BPM with shift
    pub fn edit_tempo(&mut self, value: i32, shift: bool) {
        if self.routing.is_routed(Target::Tempo, 0) {
            return;
        }
        let step = if shift { 0.1 } else { 1.0 };
        self.set_tempo(self.tempo.base + value as f32 * step, false);
    }

    pub fn print_tempo(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        self.routing.print_routed(out, Target::Tempo, 0)?;
        write!(out, "{:.1}", self.tempo())
    }

    // swing

    pub fn swing(&self) -> i32 {
        self.swing.get(self.routing.is_routed(Target::Swing, 0)) as i32
    }

    pub fn set_swing(&mut self, swing: i32, routed: bool) {
        self.swing.set(swing.clamp(SWING_MIN, SWING_MAX) as u8, routed);
    }

    pub fn edit_swing(&mut self, value: i32, _shift: bool) {
        if self.routing.is_routed(Target::Swing, 0) {
            return;
        }
        self.set_swing(self.swing.base as i32 + value, false);
    }

    pub fn print_swing(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        self.routing.print_routed(out, Target::Swing, 0)?;
        write!(out, "{}%", self.swing())
    }

    // sync measure

    pub fn sync_measure(&self) -> i32 {
        self.sync_measure as i32
    }

    pub fn set_sync_measure(&mut self, measure: i32) {
        self.sync_measure = measure.clamp(1, SYNC_MEASURE_MAX) as u8;
    }

    pub fn edit_sync_measure(&mut self, value: i32, shift: bool) {
        let delta = if shift { value * 4 } else { value };
        self.set_sync_measure(self.sync_measure() + delta);
    }

    pub fn print_sync_measure(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        write!(out, "{} {}", self.sync_measure, if self.sync_measure > 1 { "bars" } else { "bar" })
    }

    // scale and root note, the defaults for sequences without their own

    pub fn scale(&self) -> Scale {
        self.scale
    }

    pub fn set_scale(&mut self, scale: Scale) {
        self.scale = scale;
    }

    pub fn edit_scale(&mut self, value: i32, _shift: bool) {
        self.scale = adjusted_enum(self.scale, value);
    }

    pub fn print_scale(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        out.write_str(self.scale.name())
    }

    pub fn root_note(&self) -> Note {
        self.root_note
    }

    pub fn set_root_note(&mut self, root_note: Note) {
        self.root_note = root_note;
    }

    pub fn edit_root_note(&mut self, value: i32, _shift: bool) {
        self.root_note = adjusted_enum(self.root_note, value);
    }

    pub fn print_root_note(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        out.write_str(self.root_note.name())
    }

    // tracks

    pub fn selected_track_index(&self) -> usize {
        self.selected_track_index as usize
    }

    pub fn set_selected_track_index(&mut self, index: usize) {
        self.selected_track_index = index.min(TRACK_COUNT - 1) as u8;
    }

    pub fn selected_track(&self) -> &Track {
        &self.tracks[self.selected_track_index()]
    }

    pub fn tracks(&self) -> &[Track; TRACK_COUNT] {
        &self.tracks
    }

    pub fn track(&self, index: usize) -> &Track {
        &self.tracks[index]
    }

    pub fn track_mut(&mut self, index: usize) -> &mut Track {
        &mut self.tracks[index]
    }

    /// Switch the type of a track with the tick context suspended
    pub fn set_track_mode<L: EngineLock + ?Sized>(
        &mut self,
        engine: &L,
        track_index: usize,
        mode: TrackMode,
    ) {
        let track = &mut self.tracks[track_index];
        critical_section(engine, || track.set_track_mode(mode));
    }

    /// Overwrite a track with a copy of `source`, keeping the track index
    pub fn paste_track<L: EngineLock + ?Sized>(
        &mut self,
        engine: &L,
        track_index: usize,
        source: &Track,
    ) -> Result<(), ModelError> {
        let track = &mut self.tracks[track_index];
        critical_section(engine, || {
            track.set_track_mode(source.track_mode());
            track.assign_from(source)
        })?;
        info!(
            track = track_index,
            mode = %source.track_mode(),
            "track pasted"
        );
        Ok(())
    }

    // routing

    pub fn routing(&self) -> &Routing {
        &self.routing
    }

    pub fn routing_mut(&mut self) -> &mut Routing {
        &mut self.routing
    }

    /// Push a live value to `target` on every track in the `tracks` mask
    pub fn write_routed(&mut self, target: Target, tracks: u8, int_value: i32, float_value: f32) {
        match target {
            Target::None => {}
            Target::Tempo => self.set_tempo(float_value, true),
            Target::Swing => self.set_swing(int_value, true),
            _ => {
                for (index, track) in self.tracks.iter_mut().enumerate() {
                    if tracks & (1 << index) != 0 {
                        track.write_routed(target, int_value, float_value);
                    }
                }
            }
        }
    }

    /// Run one routing pass: read every active route's source and push the
    /// mapped value. `source_value` returns the normalized (0..1) input.
    pub fn update_routes(&mut self, source_value: impl Fn(Source) -> f32) {
        for index in 0..self.routing.routes().len() {
            let route = self.routing.routes()[index];
            if !route.active() {
                continue;
            }
            let value = route.map(source_value(route.source()));
            self.write_routed(route.target(), route.tracks(), value.round() as i32, value);
        }
    }
}

impl Persist for Project {
    fn write<W: Write>(&self, writer: &mut VersionedWriter<W>) -> io::Result<()> {
        writer.write(&self.name)?;
        writer.write(&self.tempo)?;
        writer.write(&self.swing)?;
        writer.write(&self.sync_measure)?;
        writer.write(&self.scale)?;
        writer.write(&self.root_note)?;
        writer.write(&self.selected_track_index)?;
        for track in &self.tracks {
            track.write(writer)?;
        }
        self.routing.write(writer)
    }

    fn read<R: Read>(&mut self, reader: &mut VersionedReader<R>) -> io::Result<()> {
        reader.read(&mut self.name)?;
        reader.read(&mut self.tempo)?;
        reader.read(&mut self.swing)?;
        reader.read(&mut self.sync_measure)?;
        reader.read(&mut self.scale)?;
        reader.read(&mut self.root_note)?;
        reader.read(&mut self.selected_track_index)?;
        for track in self.tracks.iter_mut() {
            track.read(reader)?;
        }
        self.routing.read(reader)?;

        let tempo = self.tempo.base;
        self.set_tempo(tempo, false);
        let swing = self.swing.base as i32;
        self.set_swing(swing, false);
        self.set_sync_measure(self.sync_measure as i32);
        self.set_selected_track_index(self.selected_track_index as usize);
        debug!(name = self.name(), version = reader.data_version(), "project read");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::TickGate;
    use crate::serialize::{from_bytes, to_bytes};

    #[test]
    fn test_defaults() {
        let project = Project::new();
        assert_eq!(project.name(), DEFAULT_NAME);
        assert_eq!(project.tempo(), 120.0);
        assert_eq!(project.swing(), 50);
        assert!(project
            .tracks()
            .iter()
            .enumerate()
            .all(|(i, t)| t.track_index() == i && t.track_mode() == TrackMode::Note));
    }

    #[test]
    fn test_tempo_routing() {
        let mut project = Project::new();
        project.routing_mut().edit_route(Target::Tempo, 0).unwrap();
        project.write_routed(Target::Tempo, 0, 140, 140.0);
        assert_eq!(project.tempo(), 140.0);

        project.edit_tempo(10, false);
        assert_eq!(project.tempo.base, 120.0);

        let mut text = String::new();
        project.print_tempo(&mut text).unwrap();
        assert_eq!(text, "*140.0");

        project.routing_mut().clear();
        assert_eq!(project.tempo(), 120.0);
    }

    #[test]
    fn test_write_routed_respects_track_mask() {
        let mut project = Project::new();
        let route = project.routing_mut().edit_route(Target::Octave, 1).unwrap();
        let mut updated = project.routing().routes()[route];
        updated.toggle_track(3);
        project.routing_mut().set_route(route, updated).unwrap();

        project.write_routed(Target::Octave, 0b1010, 2, 2.0);
        let routing = project.routing().clone();
        assert_eq!(project.track(1).note_track().params().octave(&routing), 2);
        assert_eq!(project.track(3).note_track().params().octave(&routing), 2);
        assert_eq!(project.track(2).note_track().params().octave(&routing), 0);
    }

    #[test]
    fn test_set_track_mode_locks_engine() {
        let gate = TickGate::new();
        let mut project = Project::new();
        project.set_track_mode(&gate, 2, TrackMode::Logic);
        assert_eq!(project.track(2).track_mode(), TrackMode::Logic);
        assert_eq!(project.track(2).logic_track().sequence(0).base().track_index(), 2);
        assert!(!gate.is_suspended());
    }

    #[test]
    fn test_paste_track_changes_mode() {
        let gate = TickGate::new();
        let mut project = Project::new();
        project.set_track_mode(&gate, 0, TrackMode::Curve);
        project.track_mut(0).curve_track_mut().set_offset(250, false);
        let source = project.track(0).clone();

        project.paste_track(&gate, 5, &source).unwrap();
        let pasted = project.track(5);
        assert_eq!(pasted.track_index(), 5);
        assert_eq!(pasted.curve_track().offset(&Routing::new()), 250);
    }

    #[test]
    fn test_update_routes() {
        let mut project = Project::new();
        let index = project.routing_mut().edit_route(Target::Swing, 0).unwrap();
        let mut route = project.routing().routes()[index];
        route.set_source(Source::CvIn1);
        project.routing_mut().set_route(index, route).unwrap();

        project.update_routes(|source| if source == Source::CvIn1 { 1.0 } else { 0.0 });
        assert_eq!(project.swing(), 75);
    }

    #[test]
    fn test_clear() {
        let gate = TickGate::new();
        let mut project = Project::new();
        project.set_name("SONG");
        project.set_track_mode(&gate, 4, TrackMode::Arp);
        project.routing_mut().edit_route(Target::Swing, 0).unwrap();
        project.clear();
        assert_eq!(project, Project::new());
        assert_eq!(project.routing().active_routes().count(), 0);
    }

    #[test]
    fn test_roundtrip() {
        let gate = TickGate::new();
        let mut project = Project::new();
        project.set_name("LIVE SET");
        project.set_tempo(133.5, false);
        project.set_swing(62, false);
        project.set_scale(Scale::Dorian);
        project.set_selected_track_index(6);
        project.set_track_mode(&gate, 1, TrackMode::Stochastic);
        project.set_track_mode(&gate, 6, TrackMode::MidiCv);
        project.routing_mut().edit_route(Target::Divisor, 1).unwrap();

        let bytes = to_bytes(&project).unwrap();
        let mut decoded = Project::new();
        from_bytes(&bytes, &mut decoded).unwrap();
        assert_eq!(decoded, project);
        assert!(decoded.routing().is_routed(Target::Divisor, 1));
    }
}
