// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Scales and pitch classes referenced by sequences.
//!
//! Sequences store a scale as an index into [`Scale::ALL`] and a root note
//! as a pitch class (`-1` meaning "use the project default"). Step notes are
//! scale degrees; [`Scale::semitones`] maps a degree onto semitones above the
//! root.

use std::fmt;

use crate::types::ModelEnum;

crate::model_enum! {
    /// Pitch classes
    pub enum Note {
        C => "C",
        Cs => "C#",
        D => "D",
        Ds => "D#",
        E => "E",
        F => "F",
        Fs => "F#",
        G => "G",
        Gs => "G#",
        A => "A",
        As => "A#",
        B => "B",
    }
}

impl Note {
    /// Pitch class (0-11)
    pub fn pitch_class(self) -> u8 {
        self as u8
    }

    /// Note for any semitone count, wrapped to one octave
    pub fn from_pitch_class(pc: i32) -> Self {
        Note::from_index(pc.rem_euclid(12) as usize)
    }

    /// Transpose by semitones
    pub fn transpose(self, semitones: i32) -> Self {
        Note::from_pitch_class(self.pitch_class() as i32 + semitones)
    }
}

crate::model_enum! {
    /// Built-in scales
    pub enum Scale {
        Semitones => "Semitones",
        Major => "Major",
        Minor => "Minor",
        Dorian => "Dorian",
        Phrygian => "Phrygian",
        Lydian => "Lydian",
        Mixolydian => "Mixolydian",
        Locrian => "Locrian",
        HarmonicMinor => "Harmonic Minor",
        MelodicMinor => "Melodic Minor",
        MajorPentatonic => "Major Pentatonic",
        MinorPentatonic => "Minor Pentatonic",
        Blues => "Blues",
        WholeTone => "Whole Tone",
        Diminished => "Diminished",
    }
}

impl Scale {
    /// Semitones from the root for each degree of one octave
    pub fn intervals(self) -> &'static [u8] {
        match self {
            Scale::Semitones => &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11],
            Scale::Major => &[0, 2, 4, 5, 7, 9, 11],
            Scale::Minor => &[0, 2, 3, 5, 7, 8, 10],
            Scale::Dorian => &[0, 2, 3, 5, 7, 9, 10],
            Scale::Phrygian => &[0, 1, 3, 5, 7, 8, 10],
            Scale::Lydian => &[0, 2, 4, 6, 7, 9, 11],
            Scale::Mixolydian => &[0, 2, 4, 5, 7, 9, 10],
            Scale::Locrian => &[0, 1, 3, 5, 6, 8, 10],
            Scale::HarmonicMinor => &[0, 2, 3, 5, 7, 8, 11],
            Scale::MelodicMinor => &[0, 2, 3, 5, 7, 9, 11],
            Scale::MajorPentatonic => &[0, 2, 4, 7, 9],
            Scale::MinorPentatonic => &[0, 3, 5, 7, 10],
            Scale::Blues => &[0, 3, 5, 6, 7, 10],
            Scale::WholeTone => &[0, 2, 4, 6, 8, 10],
            Scale::Diminished => &[0, 1, 3, 4, 6, 7, 9, 10],
        }
    }

    /// Degrees per octave
    pub fn notes_per_octave(self) -> i32 {
        self.intervals().len() as i32
    }

    /// Whether degrees map one-to-one onto semitones
    pub fn is_chromatic(self) -> bool {
        self.notes_per_octave() == 12
    }

    /// Semitones above the root for `degree` (any sign, any octave)
    pub fn semitones(self, degree: i32) -> i32 {
        let per_octave = self.notes_per_octave();
        let octave = degree.div_euclid(per_octave);
        let index = degree.rem_euclid(per_octave) as usize;
        octave * 12 + self.intervals()[index] as i32
    }

    /// Print `degree` as a note name with octave, e.g. `D#1`
    pub fn print_note(self, out: &mut dyn fmt::Write, degree: i32, root: Note) -> fmt::Result {
        let semitones = root.pitch_class() as i32 + self.semitones(degree);
        let note = Note::from_pitch_class(semitones);
        write!(out, "{}{}", note, semitones.div_euclid(12))
    }
}

/// Print a scale selection where `-1` stands for the project default
pub fn print_scale(out: &mut dyn fmt::Write, scale: i32) -> fmt::Result {
    if scale < 0 {
        out.write_str("Default")
    } else {
        out.write_str(Scale::from_index(scale as usize).name())
    }
}

/// Print a root note selection where `-1` stands for the project default
pub fn print_root_note(out: &mut dyn fmt::Write, root_note: i32) -> fmt::Result {
    if root_note < 0 {
        out.write_str("Default")
    } else {
        out.write_str(Note::from_pitch_class(root_note).name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_transpose_wraps() {
        assert_eq!(Note::B.transpose(1), Note::C);
        assert_eq!(Note::C.transpose(-1), Note::B);
        assert_eq!(Note::from_pitch_class(14), Note::D);
    }

    #[test]
    fn test_semitones() {
        assert_eq!(Scale::Major.semitones(0), 0);
        assert_eq!(Scale::Major.semitones(2), 4);
        assert_eq!(Scale::Major.semitones(7), 12);
        assert_eq!(Scale::Major.semitones(-1), -1);
        assert_eq!(Scale::Semitones.semitones(5), 5);
    }

    #[test]
    fn test_chromatic() {
        assert!(Scale::Semitones.is_chromatic());
        assert!(!Scale::Blues.is_chromatic());
    }

    #[test]
    fn test_print_note() {
        let mut out = String::new();
        Scale::Major.print_note(&mut out, 8, Note::C).unwrap();
        assert_eq!(out, "D1");
    }

    #[test]
    fn test_print_defaults() {
        let mut out = String::new();
        print_scale(&mut out, -1).unwrap();
        out.push(' ');
        print_root_note(&mut out, 3).unwrap();
        out.push(' ');
        print_scale(&mut out, 1).unwrap();
        assert_eq!(out, "Default D# Major");
    }
}
