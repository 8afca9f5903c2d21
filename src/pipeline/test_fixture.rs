// Purely for testing: a hand-cranked clock and an output that records every
// request instead of making sound. Both are deterministic, so scheduler tests
// can step time exactly.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::Receiver;

use crate::audio::{SampleId, VoiceId, next_voice_id};
use crate::audio_api::{AssetRef, AudioClock, AudioOutput, BusId, TriggerRequest};
use crate::sequencer::Notification;

/// A clock that only moves when told to. Clones share the same time.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    bits: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start: f64) -> Self {
        let clock = Self::default();
        clock.set(start);
        clock
    }

    pub fn set(&self, t: f64) {
        self.bits.store(t.to_bits(), Ordering::SeqCst);
    }

    pub fn advance(&self, dt: f64) {
        self.set(self.now() + dt);
    }
}

impl AudioClock for ManualClock {
    fn now(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::SeqCst))
    }
}

/// Everything that crossed the output boundary, interleaved with the
/// notifications raised before it when a probe is attached.
#[derive(Clone, Debug, PartialEq)]
pub enum Recorded {
    Note(Notification),
    Trigger(VoiceId, TriggerRequest),
    Cancel(VoiceId),
}

pub struct RecordingOutput {
    clock: ManualClock,
    probe: Option<Receiver<Notification>>,
    pub log: Vec<Recorded>,
    pub bus_gains: Vec<(BusId, f32)>,
    pub master_gains: Vec<f32>,
    sounding: Vec<(VoiceId, f64)>, // voice, natural end time
    cancelled: HashSet<VoiceId>,
}

impl RecordingOutput {
    pub fn new(clock: ManualClock) -> Self {
        Self {
            clock,
            probe: None,
            log: Vec::new(),
            bus_gains: Vec::new(),
            master_gains: Vec::new(),
            sounding: Vec::new(),
            cancelled: HashSet::new(),
        }
    }

    /// Interleave notifications from `rx` into `log` so tests can check
    /// ordering between notifications and triggers.
    pub fn attach_probe(&mut self, rx: Receiver<Notification>) {
        self.probe = Some(rx);
    }

    fn drain_probe(&mut self) {
        if let Some(rx) = &self.probe {
            self.log.extend(rx.try_iter().map(Recorded::Note));
        }
    }

    /// Pull in notifications raised after the last output call.
    pub fn sync(&mut self) {
        self.drain_probe();
    }

    pub fn triggers(&self) -> Vec<TriggerRequest> {
        self.log
            .iter()
            .filter_map(|r| match r {
                Recorded::Trigger(_, req) => Some(*req),
                _ => None,
            })
            .collect()
    }

    pub fn cancels(&self) -> Vec<VoiceId> {
        self.log
            .iter()
            .filter_map(|r| match r {
                Recorded::Cancel(v) => Some(*v),
                _ => None,
            })
            .collect()
    }

    pub fn last_bus_gain(&self, bus: BusId) -> Option<f32> {
        self.bus_gains.iter().rev().find(|(b, _)| *b == bus).map(|(_, g)| *g)
    }

    pub fn was_cancelled(&self, voice: VoiceId) -> bool {
        self.cancelled.contains(&voice)
    }
}

impl AudioClock for RecordingOutput {
    fn now(&self) -> f64 {
        self.clock.now()
    }
}

impl AudioOutput for RecordingOutput {
    fn trigger(&mut self, req: TriggerRequest) -> VoiceId {
        self.drain_probe();
        let voice = next_voice_id();
        self.sounding.push((voice, req.start_at + req.asset.duration));
        self.log.push(Recorded::Trigger(voice, req));
        voice
    }

    fn cancel(&mut self, voice: VoiceId) {
        self.drain_probe();
        self.sounding.retain(|(v, _)| *v != voice);
        self.cancelled.insert(voice);
        self.log.push(Recorded::Cancel(voice));
    }

    fn set_bus_gain(&mut self, bus: BusId, gain: f32) {
        self.bus_gains.push((bus, gain));
    }

    fn set_master_gain(&mut self, gain: f32) {
        self.master_gains.push(gain);
    }

    fn drain_finished(&mut self) -> Vec<VoiceId> {
        let now = self.clock.now();
        let (done, still): (Vec<_>, Vec<_>) = self.sounding.drain(..).partition(|(_, end)| *end <= now);
        self.sounding = still;
        done.into_iter().map(|(v, _)| v).collect()
    }
}

pub fn test_asset(id: u64, duration: f64) -> AssetRef {
    AssetRef::new(SampleId(id), duration)
}
