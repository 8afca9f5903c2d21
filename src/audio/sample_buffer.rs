use std::path::Path;

use anyhow::Context;

use super::frame::StereoFrame;

/// A decoded sample, already converted to stereo at the output rate.
#[derive(Clone, Debug)]
pub struct SampleBuffer {
    pub data: Vec<StereoFrame>,
    pub sample_rate: u32,
}

impl SampleBuffer {
    pub fn from_frames(data: Vec<StereoFrame>, sample_rate: u32) -> Self {
        Self { data, sample_rate }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.data.len() as f64 / self.sample_rate as f64
    }

    // Load a WAV file from disk, converting to stereo frames at `target_rate`
    pub fn load_wav(path: &Path, target_rate: u32) -> anyhow::Result<Self> {
        let mut reader = hound::WavReader::open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        let spec = reader.spec();

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<Result<Vec<_>, _>>()?,
            hound::SampleFormat::Int => {
                let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|x| x as f32 / max))
                    .collect::<Result<Vec<_>, _>>()?
            }
            #[allow(unreachable_patterns)]
            _ => anyhow::bail!("unsupported sample format: {:?}", spec.sample_format),
        };

        let frames = interleaved_to_stereo(&samples, spec.channels)
            .with_context(|| format!("{}: unsupported channel count", path.display()))?;

        Ok(Self {
            data: resample_linear(&frames, spec.sample_rate, target_rate),
            sample_rate: target_rate,
        })
    }
}

fn interleaved_to_stereo(samples: &[f32], channels: u16) -> anyhow::Result<Vec<StereoFrame>> {
    match channels {
        0 => anyhow::bail!("zero channels"),
        // mono, duplicate
        1 => Ok(samples.iter().map(|&x| StereoFrame { left: x, right: x }).collect()),
        // anything wider keeps the first two channels
        n => Ok(samples
            .chunks_exact(n as usize)
            .map(|c| StereoFrame { left: c[0], right: c[1] })
            .collect()),
    }
}

fn resample_linear(frames: &[StereoFrame], source_rate: u32, target_rate: u32) -> Vec<StereoFrame> {
    if source_rate == target_rate || source_rate == 0 || frames.is_empty() {
        return frames.to_vec();
    }
    let ratio = target_rate as f64 / source_rate as f64;
    let out_len = (frames.len() as f64 * ratio).ceil() as usize;
    let mut out = Vec::with_capacity(out_len);

    for i in 0..out_len {
        let src_pos = i as f64 / ratio;
        let idx = src_pos.floor() as usize;
        let frac = (src_pos - idx as f64) as f32;
        if idx >= frames.len() - 1 {
            out.push(frames[frames.len() - 1]);
        } else {
            let a = frames[idx];
            let b = frames[idx + 1];
            out.push(StereoFrame {
                left: a.left * (1.0 - frac) + b.left * frac,
                right: a.right * (1.0 - frac) + b.right * frac,
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mono_is_duplicated() {
        let frames = interleaved_to_stereo(&[0.5, -0.25], 1).unwrap();
        assert_eq!(frames, vec![
            StereoFrame { left: 0.5, right: 0.5 },
            StereoFrame { left: -0.25, right: -0.25 },
        ]);
    }

    #[test]
    fn upsampling_doubles_length_and_interpolates() {
        let frames = vec![
            StereoFrame { left: 0.0, right: 0.0 },
            StereoFrame { left: 1.0, right: 1.0 },
        ];
        let out = resample_linear(&frames, 22050, 44100);
        assert_eq!(out.len(), 4);
        assert!((out[1].left - 0.5).abs() < 1e-6);
    }

    #[test]
    fn duration_follows_rate() {
        let buf = SampleBuffer::from_frames(vec![StereoFrame::zero(); 22050], 44100);
        assert!((buf.duration() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn wav_round_trip_through_hound() {
        let path = std::env::temp_dir().join(format!("gridseq-load-{}.wav", std::process::id()));
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        {
            let mut writer = hound::WavWriter::create(&path, spec).unwrap();
            for _ in 0..441 {
                writer.write_sample(16384i16).unwrap();
            }
            writer.finalize().unwrap();
        }
        let buf = SampleBuffer::load_wav(&path, 44100).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(buf.len(), 441);
        assert!((buf.data[0].left - 0.5).abs() < 1e-3);
        assert!((buf.duration() - 0.01).abs() < 1e-9);
    }
}
