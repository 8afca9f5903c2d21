//! Look-ahead scheduling: measure wrap, non-looping termination and the
//! ordering of notifications against triggers.

use gridseq::pipeline::test_fixture::{ManualClock, Recorded, RecordingOutput, test_asset};
use gridseq::{Notification, Placement, Sequencer, TransportStatus};

fn sequencer_at(t: f64) -> (Sequencer<RecordingOutput>, ManualClock) {
    let clock = ManualClock::new(t);
    (Sequencer::with_defaults(RecordingOutput::new(clock.clone())), clock)
}

fn columns(notes: &[Notification]) -> Vec<(i64, f64)> {
    notes
        .iter()
        .filter_map(|n| match n {
            Notification::GridCellChanged { column, deadline } => Some((*column, *deadline)),
            _ => None,
        })
        .collect()
}

#[test]
fn test_loop_wraps_to_column_zero_one_measure_later() {
    let (mut seq, clock) = sequencer_at(0.0);
    let rx = seq.subscribe();
    seq.play().unwrap();
    for i in 1..=39 {
        clock.set(i as f64 * 0.05);
        seq.tick().unwrap();
    }

    let seen = columns(&rx.try_iter().collect::<Vec<_>>());
    assert_eq!(seen.len(), 17);
    for (i, (column, deadline)) in seen.iter().take(16).enumerate() {
        assert_eq!(*column, i as i64);
        assert_eq!(*deadline, i as f64 * 0.125);
    }
    // 16 cells of 0.125s later
    assert_eq!(seen[16], (0, 2.0));
}

#[test]
fn test_non_looping_measure_plays_once_then_stops() {
    let (mut seq, clock) = sequencer_at(0.0);
    seq.set_bpm(600.0).unwrap();
    seq.set_subdivision(4).unwrap();
    seq.set_time_signature(2, 4).unwrap();
    seq.set_looping(false);
    assert_eq!(seq.columns_per_measure(), 2);
    assert!((seq.cell_seconds() - 0.1).abs() < 1e-12);

    seq.add_track("kick").unwrap();
    seq.add_placement("kick", 0, Placement::single(test_asset(1, 0.05))).unwrap();
    seq.add_placement("kick", 1, Placement::single(test_asset(1, 0.05))).unwrap();

    let rx = seq.subscribe();
    seq.play().unwrap();
    for t in [0.05, 0.12, 0.21, 0.3, 0.45] {
        clock.set(t);
        seq.tick().unwrap();
    }

    let notes: Vec<Notification> = rx.try_iter().collect();
    let playing: Vec<i64> = columns(&notes).into_iter().map(|(c, _)| c).filter(|c| *c >= 0).collect();
    assert_eq!(playing, vec![0, 1]);
    assert_eq!(notes.iter().filter(|n| **n == Notification::Stop).count(), 1);
    assert_eq!(seq.status(), TransportStatus::Stopped);
    assert_eq!(seq.output().triggers().len(), 2);
}

#[test]
fn test_non_looping_stop_waits_for_the_last_cell() {
    let (mut seq, clock) = sequencer_at(0.0);
    seq.set_bpm(600.0).unwrap();
    seq.set_subdivision(4).unwrap();
    seq.set_time_signature(2, 4).unwrap();
    seq.set_looping(false);
    seq.play().unwrap();

    clock.set(0.05);
    seq.tick().unwrap();
    clock.set(0.15);
    seq.tick().unwrap();
    // column 1 is still sounding until 0.2
    assert_eq!(seq.status(), TransportStatus::Playing);
    clock.set(0.2);
    seq.tick().unwrap();
    assert_eq!(seq.status(), TransportStatus::Stopped);
}

#[test]
fn test_cell_change_is_announced_before_its_triggers() {
    let (mut seq, clock) = sequencer_at(0.0);
    seq.add_track("kick").unwrap();
    seq.add_track("snare").unwrap();
    for col in (0..16).step_by(2) {
        seq.add_placement("kick", col, Placement::single(test_asset(1, 0.05))).unwrap();
        seq.add_placement("snare", col + 1, Placement::combined(test_asset(2, 0.05), test_asset(3, 0.05)))
            .unwrap();
    }
    let probe = seq.subscribe();
    seq.output_mut().attach_probe(probe);

    seq.play().unwrap();
    for i in 1..=20 {
        clock.set(i as f64 * 0.05);
        seq.tick().unwrap();
    }
    seq.output_mut().sync();

    let mut announced: Option<f64> = None;
    let mut triggers = 0;
    for entry in &seq.output().log {
        match entry {
            Recorded::Note(Notification::GridCellChanged { deadline, .. }) => announced = Some(*deadline),
            Recorded::Trigger(_, req) => {
                assert_eq!(announced, Some(req.start_at), "trigger without its cell change first");
                triggers += 1;
            }
            _ => {}
        }
    }
    assert!(triggers > 8);
}

#[test]
fn test_turning_loop_off_keeps_dispatched_triggers() {
    let (mut seq, clock) = sequencer_at(0.0);
    seq.add_track("kick").unwrap();
    seq.add_placement("kick", 0, Placement::single(test_asset(1, 0.5))).unwrap();
    seq.play().unwrap();
    for i in 1..=39 {
        clock.set(i as f64 * 0.05);
        seq.tick().unwrap();
    }
    // column 0 of the next measure is already out, due at 2.0
    assert_eq!(seq.current_column(), 0);
    let wrapped = seq.output().triggers().iter().filter(|t| t.start_at == 2.0).count();
    assert_eq!(wrapped, 1);

    seq.set_looping(false);
    assert!(seq.output().cancels().is_empty());
    assert_eq!(seq.status(), TransportStatus::Playing);

    // the new measure still plays out, then playback ends
    for i in 40..=90 {
        clock.set(i as f64 * 0.05);
        seq.tick().unwrap();
    }
    assert_eq!(seq.status(), TransportStatus::Stopped);
    assert_eq!(seq.output().triggers().len(), 2);
}
