// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Integration tests for the sequencer model
//!
//! These tests drive several modules together through the public API.

use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::TempDir;

use seq_model::file_manager::{FileHeader, FileType};
use seq_model::routing::{Route, Source};
use seq_model::sequence::{curve, note, ArpSequence, LogicSequence, NoteSequence};
use seq_model::serialize::{from_bytes, to_bytes, Persist, ProjectVersion, VersionedReader};
use seq_model::track::SEQUENCE_COUNT;
use seq_model::types::ModelEnum;
use seq_model::{
    ClipBoard, FileManager, FsError, ModelError, Project, RoutingError, Target, TickGate,
    TrackMode, PATTERN_COUNT, TRACK_COUNT,
};

fn volume() -> (TempDir, FileManager) {
    let dir = TempDir::new().unwrap();
    let manager = FileManager::new(dir.path());
    (dir, manager)
}

/// A project with one track of every type and a few routes
fn populated_project() -> Project {
    let gate = TickGate::new();
    let mut project = Project::new();
    project.set_name("LIVE");
    project.set_tempo(133.5, false);
    project.set_swing(62, false);

    for (index, mode) in TrackMode::ALL.iter().enumerate() {
        project.set_track_mode(&gate, index, *mode);
    }

    let sequence = project.track_mut(0).note_track_mut().sequence_mut(2);
    sequence.set_gates(&[true, false, true, true]);
    sequence.set_notes(&[0, 3, 7, 12]);

    project
        .track_mut(1)
        .curve_track_mut()
        .sequence_mut(0)
        .step_mut(5)
        .set_shape(4);
    project.track_mut(3).stochastic_track_mut().set_name("RAIN");
    project
        .track_mut(5)
        .logic_track_mut()
        .set_input_track1(Some(0));
    project.track_mut(6).set_link_track(0);

    let routing = project.routing_mut();
    routing.set_route(0, Route::new(Target::Tempo, 0).unwrap()).unwrap();
    let mut transpose = Route::new(Target::Transpose, 0).unwrap();
    transpose.toggle_track(4);
    transpose.set_source(Source::CvIn3);
    routing.set_route(1, transpose).unwrap();
    project
}

#[test]
fn test_note_step_layers_stay_in_range() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut step = note::Step::default();
    for _ in 0..2000 {
        let layer = note::Layer::from_index(rng.gen_range(0..note::Layer::COUNT));
        let value = rng.gen_range(-500..500);
        step.set_layer_value(layer, value);

        for &layer in note::Layer::ALL {
            let range = note::Step::layer_range(layer);
            let current = step.layer_value(layer);
            assert!(
                (range.min..=range.max).contains(&current),
                "{} = {} outside {}..{}",
                layer,
                current,
                range.min,
                range.max
            );
        }
    }
}

#[test]
fn test_curve_step_layers_stay_in_range() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut step = curve::Step::default();
    for _ in 0..2000 {
        let layer = curve::Layer::from_index(rng.gen_range(0..curve::Layer::COUNT));
        step.set_layer_value(layer, rng.gen_range(-1000..1000));

        for &layer in curve::Layer::ALL {
            let range = curve::Step::layer_range(layer);
            let current = step.layer_value(layer);
            assert!(current >= range.min && current <= range.max, "{} = {}", layer, current);
        }
    }
}

#[test]
fn test_layer_writes_leave_other_layers_untouched() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut step = note::Step::default();
    for _ in 0..500 {
        let layer = note::Layer::from_index(rng.gen_range(0..note::Layer::COUNT));
        let range = note::Step::layer_range(layer);
        let before: Vec<i32> = note::Layer::ALL.iter().map(|&l| step.layer_value(l)).collect();

        let value = rng.gen_range(range.min..=range.max);
        step.set_layer_value(layer, value);

        for (index, &other) in note::Layer::ALL.iter().enumerate() {
            if other != layer {
                assert_eq!(step.layer_value(other), before[index], "{} changed", other);
            }
        }
    }
}

#[test]
fn test_project_file_roundtrip() {
    let (_dir, mut manager) = volume();
    let project = populated_project();

    manager.write_project(&project, 12).unwrap();
    assert!(manager.slot_used(FileType::Project, 12));
    assert_eq!(manager.slot_info(FileType::Project, 12).name, "LIVE");

    let mut loaded = Project::new();
    manager.read_project(&mut loaded, 12).unwrap();
    assert_eq!(loaded, project);

    for (index, mode) in TrackMode::ALL.iter().enumerate() {
        assert_eq!(loaded.track(index).track_mode(), *mode);
        assert_eq!(loaded.track(index).track_index(), index);
    }
    assert_eq!(loaded.track(3).stochastic_track().name(), "RAIN");
    assert_eq!(loaded.track(5).logic_track().input_track1(), Some(0));
    assert_eq!(loaded.track(6).link_track(), Some(0));
    assert!(loaded.routing().is_routed(Target::Tempo, 0));
    assert!(loaded.routing().is_routed(Target::Transpose, 4));
    assert!(!loaded.routing().is_routed(Target::Transpose, 2));

    let mut last = Project::new();
    assert_eq!(manager.read_last_project(&mut last).unwrap(), 12);
    assert_eq!(last.name(), "LIVE");
}

#[test]
fn test_corrupted_project_is_rejected() {
    let (_dir, mut manager) = volume();
    manager.write_project(&populated_project(), 0).unwrap();

    // first character of the project name inside the hashed body
    let path = manager.slot_path(FileType::Project, 0);
    let mut bytes = std::fs::read(&path).unwrap();
    bytes[FileHeader::SIZE + 4] ^= 0x20;
    std::fs::write(&path, bytes).unwrap();

    let mut project = populated_project();
    let err = manager.read_project(&mut project, 0).unwrap_err();
    assert!(matches!(err, FsError::ChecksumMismatch(_)), "{:?}", err);
    assert_eq!(project, Project::new());
}

#[test]
fn test_routes_are_exclusive_per_track() {
    let mut project = Project::new();
    let routing = project.routing_mut();

    let mut octave = Route::new(Target::Octave, 1).unwrap();
    octave.toggle_track(2);
    routing.set_route(0, octave).unwrap();

    let err = routing.set_route(3, Route::new(Target::Octave, 2).unwrap()).unwrap_err();
    assert_eq!(
        err,
        RoutingError::RouteConflict {
            target: Target::Octave,
            track: 2,
            route: 0,
        }
    );
    routing.set_route(3, Route::new(Target::Octave, 5).unwrap()).unwrap();

    routing.set_route(4, Route::new(Target::Swing, 0).unwrap()).unwrap();
    let err = routing.set_route(5, Route::new(Target::Swing, 0).unwrap());
    assert!(matches!(err, Err(RoutingError::RouteConflict { route: 4, .. })));
    assert_eq!(routing.active_routes().count(), 3);
}

#[test]
fn test_routing_pass_drives_tracks() {
    let mut project = populated_project();
    project.update_routes(|source| if source == Source::CvIn3 { 1.0 } else { 0.0 });

    let routing = project.routing().clone();
    assert_eq!(project.tempo(), 1.0);
    let transpose = project.track(0).note_track().params().transpose(&routing);
    assert_eq!(transpose, 100);

    let mut text = String::new();
    project.print_tempo(&mut text).unwrap();
    assert!(text.starts_with('*'));

    project.routing_mut().clear_route(0);
    assert_eq!(project.tempo(), 133.5);
}

#[test]
fn test_sequence_files_in_slots() {
    let (_dir, mut manager) = volume();
    let mut sequence = NoteSequence::default();
    sequence.set_gates(&[true; 16]);
    sequence.set_notes(&[0, 2, 4, 5, 7, 9, 11, 12]);

    manager.write_sequence(&sequence, "SCALE", 3).unwrap();
    assert!(manager.slot_used(FileType::NoteSequence, 3));
    assert!(!manager.slot_used(FileType::NoteSequence, 4));
    assert!(!manager.slot_used(FileType::CurveSequence, 3));

    let mut loaded = NoteSequence::default();
    manager.read_sequence(&mut loaded, 3).unwrap();
    assert_eq!(loaded, sequence);

    std::fs::copy(
        manager.slot_path(FileType::NoteSequence, 3),
        manager.slot_path(FileType::LogicSequence, 3),
    )
    .unwrap();
    let mut wrong = LogicSequence::default();
    let err = manager.read_sequence(&mut wrong, 3);
    assert!(matches!(err, Err(FsError::InvalidFileType { .. })), "{:?}", err);

    let err = manager.read_sequence(&mut loaded, 9);
    assert!(matches!(err, Err(FsError::NotFound(_))));
}

#[test]
fn test_old_data_keeps_new_sequence_defaults() {
    let mut logic = LogicSequence::default();
    logic.step_mut(0).set_gate_probability(0);
    let before = logic.clone();
    let mut reader = VersionedReader::with_version(&[][..], ProjectVersion::V33);
    logic.read(&mut reader).unwrap();
    assert_eq!(logic, before);

    let mut arp = ArpSequence::default();
    let mut reader = VersionedReader::with_version(&[][..], ProjectVersion::V34);
    arp.read(&mut reader).unwrap();
    assert_eq!(arp, ArpSequence::default());

    let bytes = to_bytes(&ArpSequence::default()).unwrap();
    let mut decoded = ArpSequence::default();
    decoded.set_hold(true);
    from_bytes(&bytes, &mut decoded).unwrap();
    assert!(!decoded.hold());
}

#[test]
fn test_clipboard_paste_under_engine_lock() {
    let gate = TickGate::new();
    let mut project = populated_project();
    let mut clipboard = ClipBoard::new();

    clipboard.copy_track(project.track(1));
    assert!(clipboard.paste_track(&mut project, &gate, 7).unwrap());
    assert!(!gate.is_suspended());
    assert_eq!(project.track(7).track_mode(), TrackMode::Curve);
    assert_eq!(project.track(7).track_index(), 7);
    assert_eq!(
        project.track(7).curve_track().sequence(0).step(5).shape(),
        project.track(1).curve_track().sequence(0).step(5).shape()
    );

    assert!(clipboard.copy_pattern(project.track(0), 2).unwrap());
    let target = project.track_mut(0);
    assert!(clipboard.paste_pattern(target, PATTERN_COUNT - 1).unwrap());
    assert_eq!(
        target.note_track().sequence(PATTERN_COUNT - 1),
        target.note_track().sequence(2)
    );

    let curve = project.track_mut(1);
    assert!(matches!(
        clipboard.paste_pattern(curve, 0),
        Err(ModelError::TrackModeMismatch { .. }) | Ok(false)
    ));
}

#[test]
fn test_pattern_operations_bounds() {
    let mut project = populated_project();
    let track = project.track_mut(0);
    assert!(track.duplicate_pattern(2).unwrap());
    assert_eq!(
        track.note_track().sequence(3),
        track.note_track().sequence(2)
    );
    assert!(!track.duplicate_pattern(PATTERN_COUNT - 1).unwrap());
    assert_eq!(
        track.clear_pattern(1000),
        Err(ModelError::InvalidPatternIndex(1000))
    );
}

#[test]
fn test_file_task_delivers_result() {
    let (_dir, mut manager) = volume();
    let project = populated_project();
    let outcome: Arc<Mutex<Option<Result<(), FsError>>>> = Arc::new(Mutex::new(None));

    let sink = Arc::clone(&outcome);
    let queued = manager.task(
        move |fm| fm.write_project(&project, 1),
        move |result| *sink.lock().unwrap() = Some(result),
    );
    assert!(queued);
    assert!(!manager.task(|_| Ok(()), |_| {}));

    manager.process_task();
    assert!(!manager.task_pending());
    assert!(matches!(*outcome.lock().unwrap(), Some(Ok(()))));
    assert!(manager.slot_used(FileType::Project, 1));
}

#[test]
fn test_random_mode_changes_roundtrip() {
    let mut rng = StdRng::seed_from_u64(2026);
    let gate = TickGate::new();
    let mut project = Project::new();
    for _ in 0..32 {
        let track = rng.gen_range(0..TRACK_COUNT);
        let mode = TrackMode::from_index(rng.gen_range(0..TrackMode::COUNT));
        project.set_track_mode(&gate, track, mode);
        project.track_mut(track).set_link_track(rng.gen_range(-2..TRACK_COUNT as i32));
    }

    let bytes = to_bytes(&project).unwrap();
    let mut decoded = Project::new();
    from_bytes(&bytes, &mut decoded).unwrap();
    assert_eq!(decoded, project);
    for track in decoded.tracks() {
        if let Some(link) = track.link_track() {
            assert!(link < track.track_index());
        }
    }
}

#[test]
fn test_clipboard_rejects_missing_pattern() {
    let mut project = populated_project();
    let mut clipboard = ClipBoard::new();

    assert_eq!(
        clipboard.copy_pattern(project.track(0), SEQUENCE_COUNT),
        Err(ModelError::InvalidPatternIndex(SEQUENCE_COUNT))
    );
    assert!(!clipboard.paste_pattern(project.track_mut(0), 0).unwrap());

    assert!(clipboard.copy_pattern(project.track(0), SEQUENCE_COUNT - 1).unwrap());
    assert_eq!(
        clipboard.paste_pattern(project.track_mut(0), 99),
        Err(ModelError::InvalidPatternIndex(99))
    );
}

#[test]
fn test_failed_sequence_load_clears_sequence() {
    let (_dir, manager) = volume();
    let mut sequence = NoteSequence::default();
    sequence.set_gates(&[true; 8]);

    let err = manager.read_sequence(&mut sequence, 5);
    assert!(matches!(err, Err(FsError::NotFound(_))), "{:?}", err);
    assert_eq!(sequence, NoteSequence::default());
}

#[test]
fn test_mode_change_starts_from_fresh_track() {
    let gate = TickGate::new();
    for &from in TrackMode::ALL {
        for &to in TrackMode::ALL {
            if from == to {
                continue;
            }
            let mut project = Project::new();
            project.set_track_mode(&gate, 6, from);
            project.track_mut(6).set_link_track(2);
            project.track_mut(6).write_routed(Target::SlideTime, 90, 90.0);
            project.set_track_mode(&gate, 6, to);

            let mut expected = Project::new();
            expected.set_track_mode(&gate, 6, to);
            assert_eq!(
                project.track(6).container(),
                expected.track(6).container(),
                "{from} -> {to}"
            );
        }
    }
}

#[test]
fn test_route_to_missing_track_is_rejected() {
    let mut project = Project::new();
    let routing = project.routing_mut();
    assert_eq!(
        routing.edit_route(Target::Transpose, TRACK_COUNT),
        Err(RoutingError::InvalidTrack(TRACK_COUNT))
    );
    assert_eq!(routing.active_routes().count(), 0);
    assert!(routing.edit_route(Target::Tempo, TRACK_COUNT).is_ok());
}
