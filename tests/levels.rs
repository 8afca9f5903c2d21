//! Track volume, mute and master gain as seen by the output.

use gridseq::pipeline::test_fixture::{ManualClock, RecordingOutput, test_asset};
use gridseq::{EngineError, Notification, Placement, Sequencer};

fn sequencer() -> Sequencer<RecordingOutput> {
    Sequencer::with_defaults(RecordingOutput::new(ManualClock::new(0.0)))
}

#[test]
fn test_mute_restores_previous_volume() {
    let mut seq = sequencer();
    seq.add_track("kick").unwrap();
    let bus = seq.track("kick").unwrap().bus;

    seq.set_track_volume("kick", 0.6).unwrap();
    seq.set_track_muted("kick", true).unwrap();
    assert_eq!(seq.output().last_bus_gain(bus), Some(0.0));
    assert_eq!(seq.effective_track_gain("kick"), Some(0.0));
    assert_eq!(seq.track_volume("kick"), Some(0.6));

    seq.set_track_muted("kick", false).unwrap();
    assert_eq!(seq.output().last_bus_gain(bus), Some(0.6));
    assert_eq!(seq.effective_track_gain("kick"), Some(0.6));
}

#[test]
fn test_volume_change_while_muted_stays_silent() {
    let mut seq = sequencer();
    seq.add_track("kick").unwrap();
    let bus = seq.track("kick").unwrap().bus;
    seq.set_track_muted("kick", true).unwrap();
    seq.set_track_volume("kick", 0.3).unwrap();
    assert_eq!(seq.output().last_bus_gain(bus), Some(0.0));
    seq.set_track_muted("kick", false).unwrap();
    assert_eq!(seq.output().last_bus_gain(bus), Some(0.3));
}

#[test]
fn test_levels_change_while_playing() {
    let mut seq = sequencer();
    seq.add_track("kick").unwrap();
    seq.add_placement("kick", 0, Placement::single(test_asset(1, 0.1))).unwrap();
    seq.play().unwrap();

    let rx = seq.subscribe();
    seq.set_track_volume("kick", 2.0).unwrap();
    seq.set_master_volume(-1.0);
    assert_eq!(seq.track_volume("kick"), Some(1.0));
    assert_eq!(seq.master_volume(), 0.0);
    assert_eq!(seq.output().master_gains.last(), Some(&0.0));

    let notes: Vec<Notification> = rx.try_iter().collect();
    assert_eq!(
        notes,
        vec![
            Notification::TrackVolumeChanged { track: "kick".into(), volume: 1.0 },
            Notification::MasterVolumeChanged(0.0),
        ]
    );
}

#[test]
fn test_unknown_track_is_reported() {
    let mut seq = sequencer();
    assert_eq!(seq.set_track_volume("ghost", 0.5), Err(EngineError::UnknownTrack("ghost".into())));
    assert_eq!(seq.set_track_muted("ghost", true), Err(EngineError::UnknownTrack("ghost".into())));
}

#[test]
fn test_removed_track_bus_goes_silent() {
    let mut seq = sequencer();
    seq.add_track("kick").unwrap();
    let bus = seq.track("kick").unwrap().bus;
    seq.remove_track("kick").unwrap();
    assert_eq!(seq.output().last_bus_gain(bus), Some(0.0));
    assert!(seq.track("kick").is_none());
}
