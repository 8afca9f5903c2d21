use super::frame::StereoFrame;
use super::sample_buffer::SampleBuffer;
use super::sample_id::{SampleId, VoiceId};
use crate::audio_api::BusId;

/// One playing (or pending) instance of a sample.
#[derive(Clone, Debug)]
pub struct Voice {
    pub id: VoiceId,
    pub sample_id: SampleId,
    pub bus: BusId,
    pub level: f32,
    pub active: bool,
    start_frame: u64, // absolute frame this voice begins on
    pos: usize,       // read position in the buffer
}

impl Voice {
    pub fn new(id: VoiceId, sample_id: SampleId, bus: BusId, level: f32, start_frame: u64) -> Self {
        Self {
            id,
            sample_id,
            bus,
            level,
            active: true,
            start_frame,
            pos: 0,
        }
    }

    pub fn start_frame(&self) -> u64 {
        self.start_frame
    }

    /// Mix this voice into `out`, whose first frame is absolute frame
    /// `block_start`. A voice due later than this block writes nothing; a
    /// voice whose start already passed begins at the top of the block.
    pub fn render_into(&mut self, buffer: &SampleBuffer, out: &mut [StereoFrame], block_start: u64, gain: f32) {
        if !self.active {
            return;
        }
        let block_end = block_start + out.len() as u64;
        if self.start_frame >= block_end {
            return;
        }
        let offset = self.start_frame.saturating_sub(block_start) as usize;

        for frame in out[offset..].iter_mut() {
            let Some(sample) = buffer.data.get(self.pos) else {
                break;
            };
            frame.left += sample.left * gain;
            frame.right += sample.right * gain;
            self.pos += 1;
        }

        if self.pos >= buffer.data.len() {
            self.active = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ones(n: usize) -> SampleBuffer {
        SampleBuffer::from_frames(vec![StereoFrame { left: 1.0, right: 1.0 }; n], 44100)
    }

    #[test]
    fn starts_on_exact_frame_inside_block() {
        let buf = ones(100);
        let mut v = Voice::new(VoiceId(0), SampleId(0), 0, 1.0, 1_010);
        let mut out = vec![StereoFrame::zero(); 32];
        v.render_into(&buf, &mut out, 1_000, 0.5);
        assert_eq!(out[9], StereoFrame::zero());
        assert_eq!(out[10], StereoFrame { left: 0.5, right: 0.5 });
        assert!(v.active);
    }

    #[test]
    fn waits_for_a_later_block() {
        let buf = ones(10);
        let mut v = Voice::new(VoiceId(0), SampleId(0), 0, 1.0, 64);
        let mut out = vec![StereoFrame::zero(); 32];
        v.render_into(&buf, &mut out, 0, 1.0);
        assert!(out.iter().all(|f| *f == StereoFrame::zero()));
        assert!(v.active);
    }

    #[test]
    fn deactivates_at_end_of_buffer() {
        let buf = ones(4);
        let mut v = Voice::new(VoiceId(0), SampleId(0), 0, 1.0, 0);
        let mut out = vec![StereoFrame::zero(); 8];
        v.render_into(&buf, &mut out, 0, 1.0);
        assert!(!v.active);
        assert_eq!(out[3].left, 1.0);
        assert_eq!(out[4].left, 0.0);
    }
}
