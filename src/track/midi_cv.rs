// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! MIDI/CV tracks.
//!
//! A MIDI/CV track converts incoming MIDI notes to gate and CV outputs. It
//! owns no patterns.

use std::fmt;
use std::io::{self, Read, Write};

use crate::routing::{Routable, Routing, Target};
use crate::serialize::{Persist, ProjectVersion, VersionedReader, VersionedWriter};
use crate::types::utils::{adjusted_by_step, adjusted_enum, print_yes_no};
use crate::types::{ModelEnum, VoltageRange};

/// Maximum number of voices
pub const VOICES_MAX: i32 = 8;
/// Maximum pitch bend range in semitones
pub const PITCH_BEND_RANGE_MAX: i32 = 48;

crate::model_enum! {
    /// Port MIDI is received on
    pub enum MidiPort {
        Midi => "MIDI",
        UsbMidi => "USB",
        CvGate => "CV/Gate",
    }
}

crate::model_enum! {
    /// Outputs each voice drives
    pub enum VoiceConfig {
        Pitch => "Pitch",
        PitchVelocity => "Pitch+Vel",
        PitchVelocityPressure => "Pitch+Vel+Press",
    }
}

crate::model_enum! {
    /// Which held note wins when voices run out
    pub enum NotePriority {
        LastNote => "Last Note",
        FirstNote => "First Note",
        LowestNote => "Lowest Note",
        HighestNote => "Highest Note",
    }
}

/// Port and channel filter; channel `-1` accepts every channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MidiSource {
    port: MidiPort,
    channel: i8,
}

impl Default for MidiSource {
    fn default() -> Self {
        Self {
            port: MidiPort::Midi,
            channel: -1,
        }
    }
}

impl MidiSource {
    pub fn port(&self) -> MidiPort {
        self.port
    }

    pub fn set_port(&mut self, port: MidiPort) {
        self.port = port;
    }

    pub fn channel(&self) -> i32 {
        self.channel as i32
    }

    pub fn set_channel(&mut self, channel: i32) {
        self.channel = channel.clamp(-1, 15) as i8;
    }

    pub fn print(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        match self.channel {
            -1 => write!(out, "{} Omni", self.port),
            channel => write!(out, "{} Ch{}", self.port, channel + 1),
        }
    }
}

impl Persist for MidiSource {
    fn write<W: Write>(&self, writer: &mut VersionedWriter<W>) -> io::Result<()> {
        writer.write(&self.port)?;
        writer.write(&self.channel)
    }

    fn read<R: Read>(&mut self, reader: &mut VersionedReader<R>) -> io::Result<()> {
        reader.read(&mut self.port)?;
        reader.read(&mut self.channel)?;
        self.set_channel(self.channel as i32);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MidiCvTrack {
    track_index: usize,
    source: MidiSource,
    voices: u8,
    voice_config: VoiceConfig,
    note_priority: NotePriority,
    low_note: u8,
    high_note: u8,
    pitch_bend_range: u8,
    modulation_range: VoltageRange,
    retrigger: bool,
    slide_time: Routable<u8>,
    transpose: Routable<i8>,
}

impl Default for MidiCvTrack {
    fn default() -> Self {
        Self {
            track_index: 0,
            source: MidiSource::default(),
            voices: 1,
            voice_config: VoiceConfig::Pitch,
            note_priority: NotePriority::LastNote,
            low_note: 0,
            high_note: 127,
            pitch_bend_range: 2,
            modulation_range: VoltageRange::Unipolar5V,
            retrigger: false,
            slide_time: Routable::new(0),
            transpose: Routable::new(0),
        }
    }
}

impl MidiCvTrack {
    pub fn track_index(&self) -> usize {
        self.track_index
    }

    pub(crate) fn set_track_index(&mut self, track_index: usize) {
        self.track_index = track_index;
    }

    pub fn clear(&mut self) {
        let track_index = self.track_index;
        *self = Self::default();
        self.track_index = track_index;
    }

    pub fn source(&self) -> &MidiSource {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut MidiSource {
        &mut self.source
    }

    // voices

    pub fn voices(&self) -> i32 {
        self.voices as i32
    }

    pub fn set_voices(&mut self, voices: i32) {
        self.voices = voices.clamp(1, VOICES_MAX) as u8;
    }

    pub fn edit_voices(&mut self, value: i32, _shift: bool) {
        self.set_voices(self.voices() + value);
    }

    pub fn print_voices(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        write!(out, "{}", self.voices)
    }

    pub fn voice_config(&self) -> VoiceConfig {
        self.voice_config
    }

    pub fn set_voice_config(&mut self, config: VoiceConfig) {
        self.voice_config = config;
    }

    pub fn edit_voice_config(&mut self, value: i32, _shift: bool) {
        self.voice_config = adjusted_enum(self.voice_config, value);
    }

    pub fn print_voice_config(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        out.write_str(self.voice_config.name())
    }

    pub fn note_priority(&self) -> NotePriority {
        self.note_priority
    }

    pub fn set_note_priority(&mut self, priority: NotePriority) {
        self.note_priority = priority;
    }

    pub fn edit_note_priority(&mut self, value: i32, _shift: bool) {
        self.note_priority = adjusted_enum(self.note_priority, value);
    }

    pub fn print_note_priority(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        out.write_str(self.note_priority.name())
    }

    // note range

    pub fn low_note(&self) -> i32 {
        self.low_note as i32
    }

    /// Lowest accepted note; pushes the high note up when crossing it
    pub fn set_low_note(&mut self, note: i32) {
        self.low_note = note.clamp(0, 127) as u8;
        if self.low_note > self.high_note {
            self.high_note = self.low_note;
        }
    }

    pub fn edit_low_note(&mut self, value: i32, shift: bool) {
        self.set_low_note(adjusted_by_step(self.low_note(), value, 12, shift));
    }

    pub fn print_low_note(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        print_midi_note(out, self.low_note())
    }

    pub fn high_note(&self) -> i32 {
        self.high_note as i32
    }

    /// Highest accepted note; pushes the low note down when crossing it
    pub fn set_high_note(&mut self, note: i32) {
        self.high_note = note.clamp(0, 127) as u8;
        if self.high_note < self.low_note {
            self.low_note = self.high_note;
        }
    }

    pub fn edit_high_note(&mut self, value: i32, shift: bool) {
        self.set_high_note(adjusted_by_step(self.high_note(), value, 12, shift));
    }

    pub fn print_high_note(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        print_midi_note(out, self.high_note())
    }

    // pitch bend / modulation

    pub fn pitch_bend_range(&self) -> i32 {
        self.pitch_bend_range as i32
    }

    pub fn set_pitch_bend_range(&mut self, range: i32) {
        self.pitch_bend_range = range.clamp(0, PITCH_BEND_RANGE_MAX) as u8;
    }

    pub fn edit_pitch_bend_range(&mut self, value: i32, _shift: bool) {
        self.set_pitch_bend_range(self.pitch_bend_range() + value);
    }

    pub fn print_pitch_bend_range(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        match self.pitch_bend_range {
            0 => out.write_str("off"),
            range => write!(out, "{} semitones", range),
        }
    }

    pub fn modulation_range(&self) -> VoltageRange {
        self.modulation_range
    }

    pub fn set_modulation_range(&mut self, range: VoltageRange) {
        self.modulation_range = range;
    }

    pub fn edit_modulation_range(&mut self, value: i32, _shift: bool) {
        self.modulation_range = adjusted_enum(self.modulation_range, value);
    }

    pub fn print_modulation_range(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        out.write_str(self.modulation_range.name())
    }

    pub fn retrigger(&self) -> bool {
        self.retrigger
    }

    pub fn set_retrigger(&mut self, retrigger: bool) {
        self.retrigger = retrigger;
    }

    pub fn edit_retrigger(&mut self, value: i32, _shift: bool) {
        self.retrigger = value > 0;
    }

    pub fn print_retrigger(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        print_yes_no(out, self.retrigger)
    }

    // slide time / transpose

    pub fn slide_time(&self, routing: &Routing) -> i32 {
        self.slide_time
            .get(routing.is_routed(Target::SlideTime, self.track_index)) as i32
    }

    pub fn set_slide_time(&mut self, slide_time: i32, routed: bool) {
        self.slide_time.set(slide_time.clamp(0, 100) as u8, routed);
    }

    pub fn edit_slide_time(&mut self, routing: &Routing, value: i32, shift: bool) {
        if !routing.is_routed(Target::SlideTime, self.track_index) {
            self.set_slide_time(adjusted_by_step(self.slide_time(routing), value, 5, !shift), false);
        }
    }

    pub fn print_slide_time(&self, routing: &Routing, out: &mut dyn fmt::Write) -> fmt::Result {
        routing.print_routed(out, Target::SlideTime, self.track_index)?;
        write!(out, "{}%", self.slide_time(routing))
    }

    pub fn transpose(&self, routing: &Routing) -> i32 {
        self.transpose
            .get(routing.is_routed(Target::Transpose, self.track_index)) as i32
    }

    pub fn set_transpose(&mut self, transpose: i32, routed: bool) {
        self.transpose.set(transpose.clamp(-100, 100) as i8, routed);
    }

    pub fn edit_transpose(&mut self, routing: &Routing, value: i32, _shift: bool) {
        if !routing.is_routed(Target::Transpose, self.track_index) {
            self.set_transpose(self.transpose(routing) + value, false);
        }
    }

    pub fn print_transpose(&self, routing: &Routing, out: &mut dyn fmt::Write) -> fmt::Result {
        routing.print_routed(out, Target::Transpose, self.track_index)?;
        write!(out, "{:+}", self.transpose(routing))
    }

    pub fn write_routed(&mut self, target: Target, int_value: i32, _float_value: f32) {
        match target {
            Target::SlideTime => self.set_slide_time(int_value, true),
            Target::Transpose => self.set_transpose(int_value, true),
            _ => {}
        }
    }
}

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Print a MIDI note number as name and octave (60 = C4)
fn print_midi_note(out: &mut dyn fmt::Write, note: i32) -> fmt::Result {
    write!(
        out,
        "{}{}",
        NOTE_NAMES[note.rem_euclid(12) as usize],
        note.div_euclid(12) - 1
    )
}

impl Persist for MidiCvTrack {
    fn write<W: Write>(&self, writer: &mut VersionedWriter<W>) -> io::Result<()> {
        self.source.write(writer)?;
        writer.write(&self.voices)?;
        writer.write(&self.voice_config)?;
        writer.write(&self.note_priority)?;
        writer.write(&self.low_note)?;
        writer.write(&self.high_note)?;
        writer.write(&self.pitch_bend_range)?;
        writer.write(&self.modulation_range)?;
        writer.write(&self.retrigger)?;
        writer.write(&self.slide_time)?;
        writer.write(&self.transpose)
    }

    fn read<R: Read>(&mut self, reader: &mut VersionedReader<R>) -> io::Result<()> {
        self.source.read(reader)?;
        reader.read(&mut self.voices)?;
        reader.read(&mut self.voice_config)?;
        reader.read(&mut self.note_priority)?;
        reader.read(&mut self.low_note)?;
        reader.read(&mut self.high_note)?;
        reader.read(&mut self.pitch_bend_range)?;
        reader.read(&mut self.modulation_range)?;
        reader.read(&mut self.retrigger)?;
        reader.read_since(&mut self.slide_time, ProjectVersion::V33)?;
        reader.read_since(&mut self.transpose, ProjectVersion::V33)?;
        self.set_voices(self.voices as i32);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialize::{from_bytes, to_bytes};

    #[test]
    fn test_note_range_stays_ordered() {
        let mut track = MidiCvTrack::default();
        track.set_high_note(40);
        track.set_low_note(50);
        assert_eq!((track.low_note(), track.high_note()), (50, 50));
        track.set_high_note(30);
        assert_eq!((track.low_note(), track.high_note()), (30, 30));
    }

    #[test]
    fn test_print_helpers() {
        let mut track = MidiCvTrack::default();
        track.set_low_note(60);
        track.source_mut().set_channel(9);

        let mut text = String::new();
        track.print_low_note(&mut text).unwrap();
        text.push(' ');
        track.source().print(&mut text).unwrap();
        text.push(' ');
        track.print_pitch_bend_range(&mut text).unwrap();
        assert_eq!(text, "C4 MIDI Ch10 2 semitones");
    }

    #[test]
    fn test_voices_clamp() {
        let mut track = MidiCvTrack::default();
        track.set_voices(0);
        assert_eq!(track.voices(), 1);
        track.edit_voices(20, false);
        assert_eq!(track.voices(), VOICES_MAX);
    }

    #[test]
    fn test_routed_transpose() {
        let mut routing = Routing::new();
        routing.edit_route(Target::Transpose, 0).unwrap();
        let mut track = MidiCvTrack::default();
        track.write_routed(Target::Transpose, -12, -12.0);
        track.write_routed(Target::Rotate, 3, 3.0);
        assert_eq!(track.transpose(&routing), -12);
        assert_eq!(track, MidiCvTrack::default());
    }

    #[test]
    fn test_slide_and_transpose_default_before_v33() {
        let mut track = MidiCvTrack::default();
        track.set_slide_time(80, false);
        track.set_transpose(7, false);
        let bytes = to_bytes(&track).unwrap();

        let old = &bytes[4..bytes.len() - 2];
        let mut decoded = MidiCvTrack::default();
        let mut reader = VersionedReader::with_version(old, 32);
        decoded.read(&mut reader).unwrap();
        assert_eq!(decoded, MidiCvTrack::default());
    }

    #[test]
    fn test_roundtrip() {
        let mut track = MidiCvTrack::default();
        track.source_mut().set_port(MidiPort::UsbMidi);
        track.set_voices(4);
        track.set_voice_config(VoiceConfig::PitchVelocity);
        track.set_modulation_range(VoltageRange::Bipolar5V);
        let bytes = to_bytes(&track).unwrap();
        let mut decoded = MidiCvTrack::default();
        from_bytes(&bytes, &mut decoded).unwrap();
        assert_eq!(decoded, track);
    }
}
