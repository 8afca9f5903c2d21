//! The sequencer core: transport state machine, track registry, gain/mute
//! control and the notification fan-out, all behind one object.
//!
//! Tempo, meter, subdivision and grid contents can only change while
//! stopped. Levels and the loop flag can change at any time. Rejected
//! operations return an `EngineError`, log it as a diagnostic and leave
//! every piece of state untouched.

use std::collections::BTreeSet;

use crossbeam_channel::Receiver;

use crate::audio::VoiceId;
use crate::audio_api::{AudioOutput, BusId};
use crate::error::EngineError;
use crate::pipeline::config::EngineConfig;
use crate::pipeline::project::{Placement, Track, TrackRegistry};
use crate::pipeline::transport_state::TransportState;
use crate::shared::{DEFAULT_MASTER_VOLUME, DEFAULT_TRACK_VOLUME, NO_COLUMN, TransportStatus, clamp_gain};

pub mod events;
pub mod runner;
mod scheduler;
pub mod timing;

pub use events::{Notification, NotificationKind, Notifier};
pub use runner::Runner;
use timing::{Subdivision, columns_per_measure, validate_bpm};

fn diagnostic(err: EngineError) -> EngineError {
    log::warn!("rejected: {err}");
    err
}

pub struct Sequencer<O: AudioOutput> {
    transport: TransportState,
    tracks: TrackRegistry,
    notifier: Notifier,
    output: O,
    in_flight: BTreeSet<VoiceId>,
    lookahead: f64, // seconds
    master_volume: f32,
    // used for combined placements made through the front end
    accent_multiplier: f32,
    next_bus: BusId,
}

impl<O: AudioOutput> Sequencer<O> {
    pub fn new(output: O, config: &EngineConfig) -> Self {
        let transport = TransportState {
            bpm: config.bpm,
            looping: config.looping,
            ..TransportState::default()
        };
        Self {
            transport,
            tracks: TrackRegistry::new(),
            notifier: Notifier::new(),
            output,
            in_flight: BTreeSet::new(),
            lookahead: config.lookahead_seconds(),
            master_volume: DEFAULT_MASTER_VOLUME,
            accent_multiplier: config.accent_multiplier,
            next_bus: 0,
        }
    }

    pub fn with_defaults(output: O) -> Self {
        Self::new(output, &EngineConfig::default())
    }

    // ── observers ─────────────────────────────────────────────────

    pub fn subscribe(&mut self) -> Receiver<Notification> {
        self.notifier.subscribe()
    }

    pub fn subscribe_to(&mut self, kinds: &[NotificationKind]) -> Receiver<Notification> {
        self.notifier.subscribe_to(kinds)
    }

    // ── accessors ─────────────────────────────────────────────────

    pub fn status(&self) -> TransportStatus {
        self.transport.status
    }

    /// A copy of the whole transport configuration and position.
    pub fn snapshot(&self) -> TransportState {
        self.transport.clone()
    }

    pub fn bpm(&self) -> f64 {
        self.transport.bpm
    }

    pub fn time_signature(&self) -> (u32, u32) {
        (self.transport.numerator, self.transport.denominator)
    }

    pub fn subdivision(&self) -> u32 {
        self.transport.subdivision.value()
    }

    pub fn is_looping(&self) -> bool {
        self.transport.looping
    }

    pub fn current_column(&self) -> i64 {
        self.transport.current_column
    }

    pub fn next_deadline(&self) -> f64 {
        self.transport.next_deadline
    }

    pub fn cell_seconds(&self) -> f64 {
        self.transport.meter().cell_seconds()
    }

    pub fn columns_per_measure(&self) -> usize {
        // every setter validates the meter, so this can't fail in practice
        self.transport.meter().columns_per_measure().unwrap_or(0)
    }

    pub fn lookahead(&self) -> f64 {
        self.lookahead
    }

    pub fn master_volume(&self) -> f32 {
        self.master_volume
    }

    pub fn accent_multiplier(&self) -> f32 {
        self.accent_multiplier
    }

    pub fn tracks(&self) -> &TrackRegistry {
        &self.tracks
    }

    pub fn track(&self, id: &str) -> Option<&Track> {
        self.tracks.get(id)
    }

    pub fn track_volume(&self, id: &str) -> Option<f32> {
        self.tracks.get(id).map(Track::volume)
    }

    pub fn is_track_muted(&self, id: &str) -> Option<bool> {
        self.tracks.get(id).map(Track::is_muted)
    }

    pub fn effective_track_gain(&self, id: &str) -> Option<f32> {
        self.tracks.get(id).map(Track::effective_gain)
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut O {
        &mut self.output
    }

    // ── transport ─────────────────────────────────────────────────

    /// Stopped → Playing from column 0, Paused → Playing from where it
    /// paused. Runs one tick straight away so the first column goes out at
    /// the play instant rather than a polling interval later.
    pub fn play(&mut self) -> Result<(), EngineError> {
        let now = self.output.now();
        match self.transport.status {
            TransportStatus::Playing => return Ok(()),
            TransportStatus::Stopped => {
                self.transport.reset_position();
                self.transport.next_deadline = now;
            }
            TransportStatus::Paused => {
                // a resume right after pausing waits for the old deadline
                // rather than moving it backwards
                let resume_at = now + self.transport.resume_offset;
                self.transport.next_deadline = self.transport.next_deadline.max(resume_at);
                self.transport.resume_offset = 0.0;
            }
        }
        self.transport.status = TransportStatus::Playing;
        log::debug!(
            "play from column {} at {:.3}s",
            self.transport.current_column + 1,
            self.transport.next_deadline
        );
        self.notifier.emit(Notification::Play);
        self.tick().map(|_| ())
    }

    pub fn pause(&mut self) {
        if self.transport.status != TransportStatus::Playing {
            return;
        }
        self.cancel_in_flight();
        let now = self.output.now();
        let resume_at = self.transport.rewind_unstarted(now);
        self.transport.resume_offset = (resume_at - now).max(0.0);
        self.transport.status = TransportStatus::Paused;
        log::debug!(
            "paused before column {}, {:.3}s to go",
            self.transport.current_column + 1,
            self.transport.resume_offset
        );
        self.notifier.emit(Notification::Pause);
    }

    pub fn stop(&mut self) {
        if self.transport.status == TransportStatus::Stopped {
            return;
        }
        self.cancel_in_flight();
        self.transport.reset_position();
        self.transport.status = TransportStatus::Stopped;
        log::debug!("stopped");
        self.notifier.emit(Notification::Stop);
        let now = self.output.now();
        self.notifier.emit(Notification::GridCellChanged { column: NO_COLUMN, deadline: now });
    }

    /// Teardown: stop the transport, cancelling anything still sounding.
    pub fn shutdown(&mut self) {
        self.stop();
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.transport.looping = looping;
        self.notifier.emit(Notification::LoopingChanged(looping));
    }

    // ── stopped-only configuration ────────────────────────────────

    fn guard(&self, operation: &'static str) -> Result<(), EngineError> {
        match self.transport.status {
            TransportStatus::Stopped => Ok(()),
            status => Err(diagnostic(EngineError::InvalidState { operation, status })),
        }
    }

    pub fn set_bpm(&mut self, bpm: f64) -> Result<(), EngineError> {
        self.guard("set_bpm")?;
        let bpm = validate_bpm(bpm).map_err(diagnostic)?;
        self.transport.bpm = bpm;
        self.notifier.emit(Notification::BpmChanged(bpm));
        Ok(())
    }

    pub fn set_time_signature(&mut self, numerator: u32, denominator: u32) -> Result<(), EngineError> {
        self.guard("set_time_signature")?;
        columns_per_measure(numerator, denominator, self.transport.subdivision).map_err(diagnostic)?;
        self.transport.numerator = numerator;
        self.transport.denominator = denominator;
        self.notifier
            .emit(Notification::TimeSignatureChanged { numerator, denominator });
        Ok(())
    }

    pub fn set_subdivision(&mut self, note_value: u32) -> Result<(), EngineError> {
        self.guard("set_subdivision")?;
        let subdivision = Subdivision::new(note_value).map_err(diagnostic)?;
        columns_per_measure(self.transport.numerator, self.transport.denominator, subdivision)
            .map_err(diagnostic)?;
        self.transport.subdivision = subdivision;
        self.notifier.emit(Notification::SubdivisionChanged(note_value));
        Ok(())
    }

    pub fn add_track(&mut self, id: &str) -> Result<(), EngineError> {
        self.guard("add_track")?;
        if id.trim().is_empty() {
            return Err(diagnostic(EngineError::invalid_argument("track id must not be empty")));
        }
        let bus = self.next_bus;
        self.tracks.insert(Track::new(id, bus)).map_err(diagnostic)?;
        self.next_bus += 1;
        self.output.set_bus_gain(bus, DEFAULT_TRACK_VOLUME);
        self.notifier.emit(Notification::TrackAdded(id.to_string()));
        Ok(())
    }

    pub fn remove_track(&mut self, id: &str) -> Result<(), EngineError> {
        self.guard("remove_track")?;
        let track = self.tracks.remove(id).map_err(diagnostic)?;
        self.output.set_bus_gain(track.bus, 0.0);
        self.notifier.emit(Notification::TrackRemoved(track.id));
        Ok(())
    }

    /// Put `placement` in a cell. An existing placement is removed first,
    /// with its own notification.
    pub fn add_placement(&mut self, track_id: &str, column: usize, placement: Placement) -> Result<(), EngineError> {
        self.guard("add_placement")?;
        let track = self.tracks.require_mut(track_id).map_err(diagnostic)?;
        let replaced = track.clear(column);
        track.place(column, placement);
        if replaced.is_some() {
            self.notifier.emit(Notification::AudioRemovedFromGrid {
                track: track_id.to_string(),
                column,
            });
        }
        self.notifier.emit(Notification::AudioAddedToGrid {
            track: track_id.to_string(),
            column,
        });
        Ok(())
    }

    /// Clear a cell. Clearing an empty cell is a no-op.
    pub fn remove_placement(&mut self, track_id: &str, column: usize) -> Result<(), EngineError> {
        self.guard("remove_placement")?;
        let track = self.tracks.require_mut(track_id).map_err(diagnostic)?;
        if track.clear(column).is_none() {
            log::debug!("{track_id}: column {column} already empty");
            return Ok(());
        }
        self.notifier.emit(Notification::AudioRemovedFromGrid {
            track: track_id.to_string(),
            column,
        });
        Ok(())
    }

    // ── levels (any state) ────────────────────────────────────────

    pub fn set_track_volume(&mut self, track_id: &str, volume: f32) -> Result<(), EngineError> {
        let track = self.tracks.require_mut(track_id).map_err(diagnostic)?;
        track.set_volume(volume);
        let volume = track.volume();
        if !track.is_muted() {
            self.output.set_bus_gain(track.bus, volume);
        }
        self.notifier.emit(Notification::TrackVolumeChanged {
            track: track_id.to_string(),
            volume,
        });
        Ok(())
    }

    pub fn set_track_muted(&mut self, track_id: &str, muted: bool) -> Result<(), EngineError> {
        let track = self.tracks.require_mut(track_id).map_err(diagnostic)?;
        track.set_muted(muted);
        self.output.set_bus_gain(track.bus, track.effective_gain());
        self.notifier.emit(Notification::TrackMuteChanged {
            track: track_id.to_string(),
            muted,
        });
        Ok(())
    }

    pub fn set_master_volume(&mut self, volume: f32) {
        let volume = clamp_gain(volume);
        self.master_volume = volume;
        self.output.set_master_gain(volume);
        self.notifier.emit(Notification::MasterVolumeChanged(volume));
    }

    // ── in-flight voices ──────────────────────────────────────────

    fn reap_finished(&mut self) {
        for voice in self.output.drain_finished() {
            self.in_flight.remove(&voice);
        }
    }

    fn cancel_in_flight(&mut self) {
        self.reap_finished();
        let voices = std::mem::take(&mut self.in_flight);
        if !voices.is_empty() {
            log::debug!("cancelling {} voice(s)", voices.len());
        }
        for voice in voices {
            self.output.cancel(voice);
        }
    }
}
