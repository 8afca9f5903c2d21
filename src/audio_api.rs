pub use crate::audio::{SampleBuffer, SampleId, VoiceId};

/// Identifies one gain stage on the output side. Each track owns one; the
/// master stage sits after all of them.
pub type BusId = u32;

/// Opaque handle to a decoded, fixed-duration sample, produced by the loader.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AssetRef {
    pub sample_id: SampleId,
    pub duration: f64, // seconds
}

impl AssetRef {
    pub fn new(sample_id: SampleId, duration: f64) -> Self {
        Self { sample_id, duration }
    }
}

/// One "start this sample at time T" request.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TriggerRequest {
    pub asset: AssetRef,
    pub bus: BusId,
    // per-voice level applied before the bus gain; 1.0 for ordinary hits
    pub level: f32,
    // in the clock's time base
    pub start_at: f64,
}

/// Monotonic time source shared by the scheduler and the trigger primitive.
pub trait AudioClock {
    /// Seconds since the clock started. Never decreases.
    fn now(&self) -> f64;
}

/// Everything the sequencer needs from the audio side.
///
/// Implementations must not block: triggers are fire-and-forget and
/// cancellation is best-effort.
pub trait AudioOutput: AudioClock {
    fn trigger(&mut self, req: TriggerRequest) -> VoiceId;

    /// Stop a voice if it is still sounding or waiting to start. Unknown or
    /// already finished voices are ignored.
    fn cancel(&mut self, voice: VoiceId);

    fn set_bus_gain(&mut self, bus: BusId, gain: f32);

    fn set_master_gain(&mut self, gain: f32);

    /// Voices that finished on their own since the last call.
    fn drain_finished(&mut self) -> Vec<VoiceId>;
}

#[derive(Clone, Debug)]
pub enum AudioCommand {
    // The renderer can't load files (blocks the audio thread), so a decoded
    // buffer is registered first and then referenced by id
    RegisterSample { id: SampleId, buffer: SampleBuffer },

    Trigger {
        voice: VoiceId,
        sample_id: SampleId,
        bus: BusId,
        level: f32,
        start_frame: u64,
    },
    Cancel(VoiceId),
    SetBusGain { bus: BusId, gain: f32 },
    SetMasterGain(f32),
}
