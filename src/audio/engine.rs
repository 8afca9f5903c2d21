use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::Sender;

use super::frame::StereoFrame;
use super::sample_buffer::SampleBuffer;
use super::sample_id::{SampleId, VoiceId};
use super::voice::Voice;
use crate::audio_api::{AudioCommand, BusId};
use crate::shared::{DEFAULT_MASTER_VOLUME, DEFAULT_TRACK_VOLUME, clamp_gain};

/// The real-time renderer. Lives inside the output callback and is only
/// ever touched through `AudioCommand`s.
pub struct Engine {
    samples: HashMap<SampleId, SampleBuffer>,
    voices: Vec<Option<Voice>>, // fixed pool, sized once
    bus_gains: Vec<f32>,
    master_gain: f32,
    frames_rendered: u64,
    clock: Arc<AtomicU64>,
    finished_tx: Option<Sender<VoiceId>>,
}

impl Engine {
    pub fn new(max_voices: usize, clock: Arc<AtomicU64>) -> Self {
        Self {
            samples: HashMap::new(),
            voices: (0..max_voices).map(|_| None).collect(),
            bus_gains: Vec::new(),
            master_gain: DEFAULT_MASTER_VOLUME,
            frames_rendered: clock.load(Ordering::Acquire),
            clock,
            finished_tx: None,
        }
    }

    pub fn set_finished_tx(&mut self, tx: Sender<VoiceId>) {
        self.finished_tx = Some(tx);
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    pub fn active_voices(&self) -> usize {
        self.voices.iter().filter(|v| v.is_some()).count()
    }

    pub fn handle_cmd(&mut self, cmd: AudioCommand) {
        match cmd {
            AudioCommand::RegisterSample { id, buffer } => {
                self.samples.insert(id, buffer);
            }
            AudioCommand::Trigger { voice, sample_id, bus, level, start_frame } => {
                self.start_voice(Voice::new(voice, sample_id, bus, level, start_frame));
            }
            AudioCommand::Cancel(voice) => {
                for slot in self.voices.iter_mut() {
                    if slot.as_ref().is_some_and(|v| v.id == voice) {
                        *slot = None;
                    }
                }
            }
            AudioCommand::SetBusGain { bus, gain } => {
                let idx = bus as usize;
                if idx >= self.bus_gains.len() {
                    self.bus_gains.resize(idx + 1, DEFAULT_TRACK_VOLUME);
                }
                self.bus_gains[idx] = clamp_gain(gain);
            }
            AudioCommand::SetMasterGain(gain) => self.master_gain = clamp_gain(gain),
        }
    }

    fn start_voice(&mut self, voice: Voice) {
        // a sample that never registered is a silent cell
        if !self.samples.contains_key(&voice.sample_id) {
            self.report_finished(voice.id);
            return;
        }
        match self.voices.iter_mut().find(|slot| slot.is_none()) {
            Some(slot) => *slot = Some(voice),
            None => self.report_finished(voice.id), // pool exhausted, drop it
        }
    }

    fn report_finished(&self, voice: VoiceId) {
        if let Some(tx) = &self.finished_tx {
            let _ = tx.try_send(voice);
        }
    }

    fn bus_gain(&self, bus: BusId) -> f32 {
        self.bus_gains.get(bus as usize).copied().unwrap_or(DEFAULT_TRACK_VOLUME)
    }

    /// Render one block, advancing the shared clock by its length.
    pub fn render_block(&mut self, out: &mut [StereoFrame]) {
        out.fill(StereoFrame::zero());
        let block_start = self.frames_rendered;

        for i in 0..self.voices.len() {
            let Some(mut voice) = self.voices[i].take() else {
                continue;
            };
            let gain = voice.level * self.bus_gain(voice.bus);
            if let Some(buffer) = self.samples.get(&voice.sample_id) {
                voice.render_into(buffer, out, block_start, gain);
            } else {
                voice.active = false;
            }
            if voice.active {
                self.voices[i] = Some(voice);
            } else {
                self.report_finished(voice.id);
            }
        }

        if self.master_gain != 1.0 {
            for frame in out.iter_mut() {
                *frame = frame.scaled(self.master_gain);
            }
        }

        self.frames_rendered += out.len() as u64;
        self.clock.store(self.frames_rendered, Ordering::Release);
    }
}
