// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Device settings stored next to the projects.

use std::fmt;
use std::io::{self, Read, Write};

use crate::serialize::{read_array, write_array, Persist, VersionedReader, VersionedWriter};

pub const CV_OUTPUT_COUNT: usize = 8;

/// Calibration points per output, one per volt from -5V to +5V
pub const CALIBRATION_ITEM_COUNT: usize = 11;

const CALIBRATION_MIN_VOLTS: f32 = -5.0;
const CALIBRATION_MAX_VOLTS: f32 = 5.0;
const DAC_MAX: u32 = u16::MAX as u32;

pub const BRIGHTNESS_MAX: i32 = 100;
pub const SCREENSAVER_TIMEOUT_MAX: i32 = 3600;

/// DAC codes for each calibration voltage of one CV output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CvOutputCalibration {
    items: [u16; CALIBRATION_ITEM_COUNT],
}

impl Default for CvOutputCalibration {
    fn default() -> Self {
        Self {
            items: std::array::from_fn(Self::default_item),
        }
    }
}

impl CvOutputCalibration {
    /// Uncalibrated code for point `index`: the ideal linear mapping
    pub fn default_item(index: usize) -> u16 {
        (index as u32 * DAC_MAX / (CALIBRATION_ITEM_COUNT as u32 - 1)) as u16
    }

    pub fn item_volts(index: usize) -> f32 {
        CALIBRATION_MIN_VOLTS + index as f32
    }

    pub fn item(&self, index: usize) -> u16 {
        self.items[index]
    }

    pub fn set_item(&mut self, index: usize, value: i32) {
        self.items[index] = value.clamp(0, DAC_MAX as i32) as u16;
    }

    pub fn edit_item(&mut self, index: usize, value: i32, shift: bool) {
        let step = if shift { 100 } else { 1 };
        self.set_item(index, self.items[index] as i32 + value * step);
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// DAC code for `volts`, interpolated between the calibration points
    pub fn volts_to_value(&self, volts: f32) -> u16 {
        let position = (volts.clamp(CALIBRATION_MIN_VOLTS, CALIBRATION_MAX_VOLTS)
            - CALIBRATION_MIN_VOLTS)
            .min((CALIBRATION_ITEM_COUNT - 1) as f32);
        let index = (position.floor() as usize).min(CALIBRATION_ITEM_COUNT - 2);
        let t = position - index as f32;
        let a = self.items[index] as f32;
        let b = self.items[index + 1] as f32;
        (a + (b - a) * t).round() as u16
    }
}

impl Persist for CvOutputCalibration {
    fn write<W: Write>(&self, writer: &mut VersionedWriter<W>) -> io::Result<()> {
        for item in &self.items {
            writer.write(item)?;
        }
        Ok(())
    }

    fn read<R: Read>(&mut self, reader: &mut VersionedReader<R>) -> io::Result<()> {
        for item in self.items.iter_mut() {
            reader.read(item)?;
        }
        Ok(())
    }
}

/// Calibration, display brightness and screensaver timeout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    calibration: [CvOutputCalibration; CV_OUTPUT_COUNT],
    brightness: u8,
    screensaver_timeout: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            calibration: [CvOutputCalibration::default(); CV_OUTPUT_COUNT],
            brightness: BRIGHTNESS_MAX as u8,
            screensaver_timeout: 0,
        }
    }
}

impl Settings {
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn calibration(&self, output: usize) -> &CvOutputCalibration {
        &self.calibration[output]
    }

    pub fn calibration_mut(&mut self, output: usize) -> &mut CvOutputCalibration {
        &mut self.calibration[output]
    }

    /// Brightness in percent
    pub fn brightness(&self) -> i32 {
        self.brightness as i32
    }

    pub fn set_brightness(&mut self, brightness: i32) {
        self.brightness = brightness.clamp(0, BRIGHTNESS_MAX) as u8;
    }

    pub fn edit_brightness(&mut self, value: i32, shift: bool) {
        let step = if shift { 10 } else { 1 };
        self.set_brightness(self.brightness() + value * step);
    }

    pub fn print_brightness(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        write!(out, "{}%", self.brightness)
    }

    /// Seconds without input before the display blanks, 0 disables it
    pub fn screensaver_timeout(&self) -> i32 {
        self.screensaver_timeout as i32
    }

    pub fn set_screensaver_timeout(&mut self, seconds: i32) {
        self.screensaver_timeout = seconds.clamp(0, SCREENSAVER_TIMEOUT_MAX) as u16;
    }

    pub fn edit_screensaver_timeout(&mut self, value: i32, shift: bool) {
        let step = if shift { 60 } else { 5 };
        self.set_screensaver_timeout(self.screensaver_timeout() + value * step);
    }

    pub fn print_screensaver_timeout(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        match self.screensaver_timeout {
            0 => out.write_str("off"),
            s if s % 60 == 0 => write!(out, "{}m", s / 60),
            s => write!(out, "{}s", s),
        }
    }
}

impl Persist for Settings {
    fn write<W: Write>(&self, writer: &mut VersionedWriter<W>) -> io::Result<()> {
        write_array(writer, &self.calibration)?;
        writer.write(&self.brightness)?;
        writer.write(&self.screensaver_timeout)
    }

    fn read<R: Read>(&mut self, reader: &mut VersionedReader<R>) -> io::Result<()> {
        read_array(reader, &mut self.calibration)?;
        reader.read(&mut self.brightness)?;
        reader.read(&mut self.screensaver_timeout)?;
        self.set_brightness(self.brightness as i32);
        self.set_screensaver_timeout(self.screensaver_timeout as i32);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialize::{from_bytes, to_bytes};

    #[test]
    fn test_default_calibration_is_linear() {
        let calibration = CvOutputCalibration::default();
        assert_eq!(calibration.item(0), 0);
        assert_eq!(calibration.item(CALIBRATION_ITEM_COUNT - 1), u16::MAX);
        assert_eq!(CvOutputCalibration::item_volts(5), 0.0);
        assert_eq!(calibration.volts_to_value(-5.0), 0);
        assert_eq!(calibration.volts_to_value(5.0), u16::MAX);
        assert_eq!(calibration.volts_to_value(9.0), u16::MAX);
    }

    #[test]
    fn test_interpolation_between_points() {
        let mut calibration = CvOutputCalibration::default();
        calibration.set_item(5, 30000);
        calibration.set_item(6, 31000);
        assert_eq!(calibration.volts_to_value(0.5), 30500);
        calibration.set_item(0, -10);
        assert_eq!(calibration.item(0), 0);
    }

    #[test]
    fn test_print_screensaver_timeout() {
        let mut settings = Settings::default();
        let mut text = String::new();
        settings.print_screensaver_timeout(&mut text).unwrap();
        settings.set_screensaver_timeout(120);
        text.push(' ');
        settings.print_screensaver_timeout(&mut text).unwrap();
        settings.edit_screensaver_timeout(1, false);
        text.push(' ');
        settings.print_screensaver_timeout(&mut text).unwrap();
        assert_eq!(text, "off 2m 125s");
    }

    #[test]
    fn test_roundtrip() {
        let mut settings = Settings::default();
        settings.calibration_mut(3).set_item(2, 12345);
        settings.set_brightness(40);
        settings.set_screensaver_timeout(300);
        let bytes = to_bytes(&settings).unwrap();
        let mut decoded = Settings::default();
        from_bytes(&bytes, &mut decoded).unwrap();
        assert_eq!(decoded, settings);
    }
}
