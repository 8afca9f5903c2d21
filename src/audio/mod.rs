use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Context;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::audio_api::{AudioClock, AudioCommand, AudioOutput, BusId, TriggerRequest};

mod engine;
mod frame;
mod sample_buffer;
mod sample_id;
mod voice;

pub use engine::Engine;
pub use frame::StereoFrame;
pub use sample_buffer::SampleBuffer;
pub use sample_id::{SampleId, VoiceId, next_sample_id, next_voice_id};

const COMMAND_QUEUE: usize = 1024;
const FINISHED_QUEUE: usize = 1024;

/// Owns the output stream. Dropping it silences the device.
pub struct AudioHandle {
    port: OutputPort,
    _output_stream: cpal::Stream,
}

impl AudioHandle {
    /// A sendable endpoint for the scheduler thread.
    pub fn port(&self) -> OutputPort {
        self.port.clone()
    }

    pub fn sample_rate(&self) -> u32 {
        self.port.sample_rate
    }
}

/// The `AudioOutput` the sequencer talks to: a command queue into the
/// output callback plus the frame counter the callback advances.
#[derive(Clone)]
pub struct OutputPort {
    tx: Sender<AudioCommand>,
    finished_rx: Receiver<VoiceId>,
    // triggers that never reached the renderer, reported finished on the next drain
    dropped: Vec<VoiceId>,
    frames: Arc<AtomicU64>,
    sample_rate: u32,
}

impl OutputPort {
    pub fn new(
        tx: Sender<AudioCommand>,
        finished_rx: Receiver<VoiceId>,
        frames: Arc<AtomicU64>,
        sample_rate: u32,
    ) -> Self {
        Self { tx, finished_rx, dropped: Vec::new(), frames, sample_rate }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Queue a command for the renderer. Returns false if it was dropped.
    pub fn send(&self, cmd: AudioCommand) -> bool {
        match self.tx.try_send(cmd) {
            Ok(()) => true,
            Err(TrySendError::Full(cmd)) => {
                log::warn!("audio command queue full, dropped {cmd:?}");
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                log::warn!("audio output is gone");
                false
            }
        }
    }

    fn seconds_to_frame(&self, t: f64) -> u64 {
        (t.max(0.0) * self.sample_rate as f64).round() as u64
    }
}

impl AudioClock for OutputPort {
    fn now(&self) -> f64 {
        self.frames.load(Ordering::Acquire) as f64 / self.sample_rate as f64
    }
}

impl AudioOutput for OutputPort {
    fn trigger(&mut self, req: TriggerRequest) -> VoiceId {
        let voice = next_voice_id();
        let sent = self.send(AudioCommand::Trigger {
            voice,
            sample_id: req.asset.sample_id,
            bus: req.bus,
            level: req.level,
            start_frame: self.seconds_to_frame(req.start_at),
        });
        if !sent {
            self.dropped.push(voice);
        }
        voice
    }

    fn cancel(&mut self, voice: VoiceId) {
        self.dropped.retain(|v| *v != voice);
        self.send(AudioCommand::Cancel(voice));
    }

    fn set_bus_gain(&mut self, bus: BusId, gain: f32) {
        self.send(AudioCommand::SetBusGain { bus, gain });
    }

    fn set_master_gain(&mut self, gain: f32) {
        self.send(AudioCommand::SetMasterGain(gain));
    }

    fn drain_finished(&mut self) -> Vec<VoiceId> {
        let mut finished = std::mem::take(&mut self.dropped);
        finished.extend(self.finished_rx.try_iter());
        finished
    }
}

pub fn start_audio(max_voices: usize) -> anyhow::Result<AudioHandle> {
    let (tx, rx) = crossbeam_channel::bounded::<AudioCommand>(COMMAND_QUEUE);
    let (finished_tx, finished_rx) = crossbeam_channel::bounded::<VoiceId>(FINISHED_QUEUE);

    let host = cpal::default_host();
    let device = host.default_output_device().context("no default output device")?;
    let supported = device.default_output_config().context("no default output config")?;

    let sample_rate: u32 = supported.sample_rate();
    let channels = supported.channels() as usize;
    let frames = Arc::new(AtomicU64::new(0));

    let mut engine = Engine::new(max_voices, frames.clone());
    engine.set_finished_tx(finished_tx);

    let output_stream = match supported.sample_format() {
        cpal::SampleFormat::F32 => build_output_stream_f32(&device, &supported.into(), rx, engine, channels)?,
        other => anyhow::bail!("unsupported sample format {other:?} (only f32 supported for now)"),
    };
    output_stream.play().context("failed to play output stream")?;
    log::info!("audio output running at {sample_rate} Hz, {channels} channel(s)");

    Ok(AudioHandle {
        port: OutputPort::new(tx, finished_rx, frames, sample_rate),
        _output_stream: output_stream,
    })
}

fn build_output_stream_f32(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    rx: Receiver<AudioCommand>,
    mut engine: Engine,
    channels: usize,
) -> anyhow::Result<cpal::Stream> {
    let err_fn = |err| log::error!("audio output stream error: {err}");
    let mut scratch: Vec<StereoFrame> = Vec::with_capacity(4096);

    let stream = device.build_output_stream(
        config,
        move |data: &mut [f32], _info| {
            while let Ok(cmd) = rx.try_recv() {
                engine.handle_cmd(cmd);
            }

            let n_frames = data.len() / channels.max(1);
            scratch.resize(n_frames, StereoFrame::zero());
            engine.render_block(&mut scratch);

            for (out, frame) in data.chunks_mut(channels.max(1)).zip(scratch.iter()) {
                match out {
                    [mono] => *mono = 0.5 * (frame.left + frame.right),
                    [l, r, rest @ ..] => {
                        *l = frame.left;
                        *r = frame.right;
                        rest.fill(0.0);
                    }
                    [] => {}
                }
            }
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_api::AssetRef;

    #[test]
    fn port_converts_start_time_to_frames() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let (_ftx, frx) = crossbeam_channel::unbounded();
        let frames = Arc::new(AtomicU64::new(22050));
        let mut port = OutputPort::new(tx, frx, frames, 44100);
        assert!((port.now() - 0.5).abs() < 1e-12);

        let voice = port.trigger(TriggerRequest {
            asset: AssetRef::new(SampleId(3), 1.0),
            bus: 1,
            level: 1.0,
            start_at: 0.75,
        });
        match rx.try_recv().unwrap() {
            AudioCommand::Trigger { voice: v, start_frame, bus, .. } => {
                assert_eq!(v, voice);
                assert_eq!(start_frame, 33075);
                assert_eq!(bus, 1);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn trigger_dropped_on_a_full_queue_is_reported_finished() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let (_ftx, frx) = crossbeam_channel::unbounded();
        let mut port = OutputPort::new(tx, frx, Arc::new(AtomicU64::new(0)), 44100);
        let req = TriggerRequest {
            asset: AssetRef::new(SampleId(3), 1.0),
            bus: 0,
            level: 1.0,
            start_at: 0.0,
        };

        let queued = port.trigger(req);
        let dropped = port.trigger(req);
        assert_eq!(port.drain_finished(), vec![dropped]);
        // reported once only
        assert!(port.drain_finished().is_empty());
        assert!(matches!(rx.try_recv(), Ok(AudioCommand::Trigger { voice, .. }) if voice == queued));
    }
}
