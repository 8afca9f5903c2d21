// The layer between the terminal and the sequencer.
//
// The TUI resolves keys into `InputEvent`s and renders whatever
// `display_state()` returns; it never touches the sequencer. This layer turns
// input into sequencer operations and keeps `DisplayState` current from the
// notifications the sequencer publishes.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use crossbeam_channel::Receiver;

use crate::audio_api::{AssetRef, AudioOutput};
use crate::error::EngineError;
use crate::pipeline::project::Placement;
use crate::sequencer::timing::{Subdivision, columns_per_measure};
use crate::sequencer::{Notification, Sequencer};
use crate::shared::{CellState, DisplayState, InputEvent, TrackRow, TransportStatus};

pub struct Middle<O: AudioOutput> {
    seq: Arc<Mutex<Sequencer<O>>>,
    notes: Receiver<Notification>,
    // one sample per track row, in row order
    assets: Vec<(String, AssetRef)>,
    // columns announced but not yet audible
    pending_columns: VecDeque<(i64, f64)>,
    display: DisplayState,
}

impl<O: AudioOutput> Middle<O> {
    /// Create one track per asset and start listening for notifications.
    pub fn new(seq: Arc<Mutex<Sequencer<O>>>, assets: Vec<(String, AssetRef)>) -> Self {
        let notes = lock(&seq).subscribe();
        let mut middle = Self {
            seq,
            notes,
            assets,
            pending_columns: VecDeque::new(),
            display: DisplayState {
                status: TransportStatus::Stopped,
                active_column: None,
                columns: 0,
                bpm: 0.0,
                numerator: 0,
                denominator: 0,
                subdivision: 0,
                looping: false,
                master_volume: 0.0,
                tracks: Vec::new(),
                cursor: (0, 0),
                display_text: String::new(),
            },
        };
        {
            // a rejected track drops its asset too, so rows and assets stay aligned
            let mut seq = lock(&middle.seq);
            let display = &mut middle.display;
            middle.assets.retain(|(id, _)| match seq.add_track(id) {
                Ok(()) => true,
                Err(e) => {
                    display.display_text = e.to_string();
                    false
                }
            });
        }
        middle.drain_notifications();
        middle.refresh();
        middle
    }

    pub fn display_state(&self) -> &DisplayState {
        &self.display
    }

    /// Apply one input. Returns false when the user asked to quit.
    pub fn handle_input(&mut self, event: InputEvent) -> bool {
        let result = match event {
            InputEvent::Quit => return false,
            InputEvent::MoveCursor { dx, dy } => {
                self.move_cursor(dx, dy);
                Ok(())
            }
            InputEvent::ToggleCell => self.toggle_cell(false),
            InputEvent::ToggleCombinedCell => self.toggle_cell(true),
            InputEvent::PlayStop => {
                let mut seq = lock(&self.seq);
                match seq.status() {
                    TransportStatus::Stopped => seq.play(),
                    _ => {
                        seq.stop();
                        Ok(())
                    }
                }
            }
            InputEvent::Pause => {
                let mut seq = lock(&self.seq);
                match seq.status() {
                    TransportStatus::Playing => {
                        seq.pause();
                        Ok(())
                    }
                    TransportStatus::Paused => seq.play(),
                    TransportStatus::Stopped => Ok(()),
                }
            }
            InputEvent::ToggleLoop => {
                let mut seq = lock(&self.seq);
                let looping = seq.is_looping();
                seq.set_looping(!looping);
                Ok(())
            }
            InputEvent::AdjustBpm(delta) => {
                let mut seq = lock(&self.seq);
                let bpm = seq.bpm() + delta;
                seq.set_bpm(bpm)
            }
            InputEvent::AdjustNumerator(delta) => {
                let mut seq = lock(&self.seq);
                let (n, d) = seq.time_signature();
                let n = (n as i64 + delta as i64).max(1) as u32;
                seq.set_time_signature(n, d)
            }
            InputEvent::CycleSubdivision => self.cycle_subdivision(),
            InputEvent::ToggleMute => self.with_cursor_track(|seq, id| {
                let muted = seq.is_track_muted(id).unwrap_or(false);
                seq.set_track_muted(id, !muted)
            }),
            InputEvent::AdjustTrackVolume(delta) => self.with_cursor_track(|seq, id| {
                let volume = seq.track_volume(id).unwrap_or(0.0);
                seq.set_track_volume(id, volume + delta)
            }),
            InputEvent::AdjustMasterVolume(delta) => {
                let mut seq = lock(&self.seq);
                let volume = seq.master_volume();
                seq.set_master_volume(volume + delta);
                Ok(())
            }
        };

        if let Err(e) = result {
            self.display.display_text = e.to_string();
        }
        self.poll();
        true
    }

    /// Pick up notifications raised since the last call (the scheduler
    /// thread raises them too) and move the highlight to the column that is
    /// currently audible.
    pub fn poll(&mut self) {
        if self.drain_notifications() {
            self.refresh();
        }
        let now = lock(&self.seq).output().now();
        while let Some((column, _)) = self.pending_columns.front().copied().filter(|(_, d)| *d <= now) {
            self.display.active_column = usize::try_from(column).ok();
            self.pending_columns.pop_front();
        }
    }

    // returns whether anything besides the column highlight changed
    fn drain_notifications(&mut self) -> bool {
        let mut changed = false;
        for note in self.notes.try_iter() {
            match note {
                Notification::GridCellChanged { column, deadline } if column >= 0 => {
                    self.pending_columns.push_back((column, deadline));
                }
                Notification::GridCellChanged { .. } => {
                    self.pending_columns.clear();
                    self.display.active_column = None;
                }
                Notification::Play | Notification::Pause | Notification::Stop => {
                    changed = true;
                    if note == Notification::Pause {
                        self.pending_columns.clear();
                    }
                    self.display.display_text.clear();
                }
                _ => changed = true,
            }
        }
        changed
    }

    /// Rebuild everything but the highlight from the sequencer's accessors.
    fn refresh(&mut self) {
        let seq = lock(&self.seq);
        let columns = seq.columns_per_measure();
        let (numerator, denominator) = seq.time_signature();
        self.display.status = seq.status();
        self.display.columns = columns;
        self.display.bpm = seq.bpm();
        self.display.numerator = numerator;
        self.display.denominator = denominator;
        self.display.subdivision = seq.subdivision();
        self.display.looping = seq.is_looping();
        self.display.master_volume = seq.master_volume();
        self.display.tracks = seq
            .tracks()
            .iter()
            .map(|track| TrackRow {
                id: track.id.clone(),
                volume: track.volume(),
                muted: track.is_muted(),
                cells: (0..columns)
                    .map(|c| match track.placement(c) {
                        None => CellState::Empty,
                        Some(Placement::Single(_)) => CellState::Single,
                        Some(Placement::Combined { .. }) => CellState::Combined,
                    })
                    .collect(),
            })
            .collect();
        drop(seq);

        let (col, row) = self.display.cursor;
        self.display.cursor = (
            col.min(columns.saturating_sub(1)),
            row.min(self.display.tracks.len().saturating_sub(1)),
        );
    }

    fn move_cursor(&mut self, dx: i32, dy: i32) {
        let (col, row) = self.display.cursor;
        let max_col = self.display.columns.saturating_sub(1) as i64;
        let max_row = self.display.tracks.len().saturating_sub(1) as i64;
        self.display.cursor = (
            (col as i64 + dx as i64).clamp(0, max_col) as usize,
            (row as i64 + dy as i64).clamp(0, max_row) as usize,
        );
    }

    fn toggle_cell(&mut self, combined: bool) -> Result<(), EngineError> {
        let (column, row) = self.display.cursor;
        let Some((id, asset)) = self.assets.get(row).cloned() else {
            return Ok(());
        };
        let mut seq = lock(&self.seq);
        let occupied = seq.track(&id).and_then(|t| t.placement(column)).is_some();
        if occupied {
            return seq.remove_placement(&id, column);
        }
        let placement = if combined {
            let accent = self.assets[(row + 1) % self.assets.len()].1;
            Placement::combined_with_multiplier(asset, accent, seq.accent_multiplier())?
        } else {
            Placement::single(asset)
        };
        seq.add_placement(&id, column, placement)
    }

    // next subdivision that divides the current denominator
    fn cycle_subdivision(&mut self) -> Result<(), EngineError> {
        let mut seq = lock(&self.seq);
        let (n, d) = seq.time_signature();
        let mut candidate = Subdivision::new(seq.subdivision())?;
        for _ in 0..4 {
            candidate = candidate.next();
            if columns_per_measure(n, d, candidate).is_ok() {
                return seq.set_subdivision(candidate.value());
            }
        }
        Ok(())
    }

    fn with_cursor_track<F>(&mut self, f: F) -> Result<(), EngineError>
    where
        F: FnOnce(&mut Sequencer<O>, &str) -> Result<(), EngineError>,
    {
        let Some(row) = self.display.tracks.get(self.display.cursor.1) else {
            return Ok(());
        };
        let id = row.id.clone();
        let mut seq = lock(&self.seq);
        f(&mut seq, &id)
    }
}

// a poisoned lock means the scheduler thread panicked mid-tick; the state is
// still the last committed one, so keep going with it
fn lock<O: AudioOutput>(seq: &Arc<Mutex<Sequencer<O>>>) -> MutexGuard<'_, Sequencer<O>> {
    seq.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
