// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Copy/paste buffer for whole tracks and single patterns.

use tracing::debug;

use super::Project;
use crate::engine::EngineLock;
use crate::track::{ModelError, Track, TrackContainer, SEQUENCE_COUNT};

#[derive(Debug, Clone, Default)]
enum Content {
    #[default]
    Empty,
    Track(Box<Track>),
    Pattern {
        track: Box<Track>,
        pattern: usize,
    },
}

/// Holds at most one copied item
#[derive(Debug, Clone, Default)]
pub struct ClipBoard {
    content: Content,
}

impl ClipBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.content = Content::Empty;
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.content, Content::Empty)
    }

    pub fn copy_track(&mut self, track: &Track) {
        debug!(track = track.track_index(), "track copied");
        self.content = Content::Track(Box::new(track.clone()));
    }

    pub fn can_paste_track(&self) -> bool {
        matches!(self.content, Content::Track(_))
    }

    /// Paste the copied track over `track_index`; false when no track is held
    pub fn paste_track<L: EngineLock + ?Sized>(
        &self,
        project: &mut Project,
        engine: &L,
        track_index: usize,
    ) -> Result<bool, ModelError> {
        match &self.content {
            Content::Track(track) => {
                project.paste_track(engine, track_index, track)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Copy one pattern of a track that has patterns; `Ok(false)` for MIDI/CV tracks
    pub fn copy_pattern(&mut self, track: &Track, pattern: usize) -> Result<bool, ModelError> {
        if pattern >= SEQUENCE_COUNT {
            return Err(ModelError::InvalidPatternIndex(pattern));
        }
        if matches!(track.container(), TrackContainer::MidiCv(_)) {
            return Ok(false);
        }
        self.content = Content::Pattern {
            track: Box::new(track.clone()),
            pattern,
        };
        Ok(true)
    }

    /// A pattern can be pasted onto a track of the same type
    pub fn can_paste_pattern(&self, target: &Track) -> bool {
        match &self.content {
            Content::Pattern { track, .. } => track.track_mode() == target.track_mode(),
            _ => false,
        }
    }

    pub fn paste_pattern(&self, target: &mut Track, pattern: usize) -> Result<bool, ModelError> {
        let Content::Pattern { track, pattern: source_pattern } = &self.content else {
            return Ok(false);
        };
        for index in [*source_pattern, pattern] {
            if index >= SEQUENCE_COUNT {
                return Err(ModelError::InvalidPatternIndex(index));
            }
        }
        if track.track_mode() != target.track_mode() {
            return Err(ModelError::TrackModeMismatch {
                expected: target.track_mode(),
                actual: track.track_mode(),
            });
        }
        let index = target.track_index();
        match (track.container(), target.container_mut()) {
            (TrackContainer::Note(src), TrackContainer::Note(dst)) => {
                dst.set_sequence(pattern, src.sequence(*source_pattern).clone())
            }
            (TrackContainer::Curve(src), TrackContainer::Curve(dst)) => {
                dst.set_sequence(pattern, src.sequence(*source_pattern).clone())
            }
            (TrackContainer::Stochastic(src), TrackContainer::Stochastic(dst)) => {
                dst.set_sequence(pattern, src.sequence(*source_pattern).clone())
            }
            (TrackContainer::Logic(src), TrackContainer::Logic(dst)) => {
                dst.set_sequence(pattern, src.sequence(*source_pattern).clone())
            }
            (TrackContainer::Arp(src), TrackContainer::Arp(dst)) => {
                dst.set_sequence(pattern, src.sequence(*source_pattern).clone())
            }
            _ => return Ok(false),
        }
        debug!(track = index, pattern, "pattern pasted");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::TickGate;
    use crate::routing::Routing;
    use crate::sequence::Sequence;
    use crate::track::TrackMode;

    #[test]
    fn test_empty_clipboard() {
        let gate = TickGate::new();
        let mut project = Project::new();
        let clipboard = ClipBoard::new();
        assert!(clipboard.is_empty());
        assert!(!clipboard.can_paste_track());
        assert_eq!(clipboard.paste_track(&mut project, &gate, 0), Ok(false));
    }

    #[test]
    fn test_copy_paste_track() {
        let gate = TickGate::new();
        let mut project = Project::new();
        project.set_track_mode(&gate, 2, TrackMode::Arp);
        project.track_mut(2).arp_track_mut().sequence_mut(0).set_octaves(3, false);

        let mut clipboard = ClipBoard::new();
        clipboard.copy_track(project.track(2));
        assert!(clipboard.can_paste_track());
        assert_eq!(clipboard.paste_track(&mut project, &gate, 7), Ok(true));

        let pasted = project.track(7).arp_track();
        assert_eq!(pasted.sequence(0).octaves(&Routing::new()), 3);
        assert_eq!(pasted.sequence(0).track_index(), 7);
    }

    #[test]
    fn test_copy_paste_pattern() {
        let mut source = Track::new(0);
        source.note_track_mut().sequence_mut(1).base_mut().set_divisor(24, false);
        let mut clipboard = ClipBoard::new();
        assert_eq!(clipboard.copy_pattern(&source, 1), Ok(true));

        let mut target = Track::new(3);
        assert!(clipboard.can_paste_pattern(&target));
        assert_eq!(clipboard.paste_pattern(&mut target, 5), Ok(true));
        let sequence = target.note_track().sequence(5);
        assert_eq!(sequence.base().divisor(&Routing::new()), 24);
        assert_eq!(sequence.track_index(), 3);

        target.set_track_mode(TrackMode::Curve);
        assert!(!clipboard.can_paste_pattern(&target));
        assert!(clipboard.paste_pattern(&mut target, 0).is_err());
    }

    #[test]
    fn test_pattern_indices_are_checked() {
        let mut clipboard = ClipBoard::new();
        assert_eq!(
            clipboard.copy_pattern(&Track::new(0), 99),
            Err(ModelError::InvalidPatternIndex(99))
        );
        assert!(clipboard.is_empty());

        let mut target = Track::new(1);
        assert_eq!(clipboard.paste_pattern(&mut target, 0), Ok(false));

        assert_eq!(clipboard.copy_pattern(&Track::new(0), 0), Ok(true));
        assert_eq!(
            clipboard.paste_pattern(&mut target, SEQUENCE_COUNT),
            Err(ModelError::InvalidPatternIndex(SEQUENCE_COUNT))
        );
    }

    #[test]
    fn test_copy_pattern_ignores_midi_cv() {
        let mut track = Track::new(0);
        track.set_track_mode(TrackMode::MidiCv);
        let mut clipboard = ClipBoard::new();
        assert_eq!(clipboard.copy_pattern(&track, 0), Ok(false));
        assert!(clipboard.is_empty());
    }
}
