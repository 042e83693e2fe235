// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Pattern-follow setting.
//!
//! Tracks that own patterns can make the step display, the launchpad, or
//! both, follow the pattern currently playing. Each such track holds one
//! [`TrackPatternFollow`] by value.

use std::fmt;
use std::io::{self, Read, Write};

use crate::serialize::{Persist, ProjectVersion, VersionedReader, VersionedWriter};
use crate::types::utils::adjusted_enum;
use crate::types::{ModelEnum, PatternFollow};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackPatternFollow {
    mode: PatternFollow,
}

impl TrackPatternFollow {
    pub fn get(&self) -> PatternFollow {
        self.mode
    }

    pub fn set(&mut self, mode: PatternFollow) {
        self.mode = mode;
    }

    /// Select the mode from the display and launchpad flags
    pub fn set_from_flags(&mut self, display: bool, launchpad: bool) {
        self.mode = match (display, launchpad) {
            (true, true) => PatternFollow::DispAndLp,
            (true, false) => PatternFollow::Display,
            (false, true) => PatternFollow::LaunchPad,
            (false, false) => PatternFollow::Off,
        };
    }

    /// Switch display following, keeping launchpad following as is
    pub fn set_display(&mut self, display: bool) {
        let launchpad = self.is_launchpad_on();
        self.set_from_flags(display, launchpad);
    }

    pub fn is_display_on(&self) -> bool {
        matches!(self.mode, PatternFollow::Display | PatternFollow::DispAndLp)
    }

    pub fn is_launchpad_on(&self) -> bool {
        matches!(self.mode, PatternFollow::LaunchPad | PatternFollow::DispAndLp)
    }

    /// Cycle through every mode with a launchpad attached, Off/Display otherwise
    pub fn toggle_display(&mut self, launchpad_connected: bool) {
        self.mode = if launchpad_connected {
            PatternFollow::from_index((self.mode.index() + 1) % PatternFollow::COUNT)
        } else if self.mode == PatternFollow::Off {
            PatternFollow::Display
        } else {
            PatternFollow::Off
        };
    }

    pub fn edit(&mut self, value: i32, _shift: bool) {
        self.mode = adjusted_enum(self.mode, value);
    }

    pub fn print(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        out.write_str(self.mode.name())
    }
}

impl Persist for TrackPatternFollow {
    fn write<W: Write>(&self, writer: &mut VersionedWriter<W>) -> io::Result<()> {
        writer.write(&self.mode)
    }

    fn read<R: Read>(&mut self, reader: &mut VersionedReader<R>) -> io::Result<()> {
        reader.read_since(&mut self.mode, ProjectVersion::V39)
    }
}
