use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::audio::{OutputPort, SampleBuffer, SampleId, next_sample_id};
use crate::audio_api::{AssetRef, AudioCommand};

// Load a WAV from disk, prepare for registration with the engine
pub fn load(path: &Path, target_rate: u32) -> anyhow::Result<(SampleId, SampleBuffer)> {
    let id = next_sample_id();
    let buffer = SampleBuffer::load_wav(path, target_rate)?;
    Ok((id, buffer))
}

/// Decode `path`, hand the buffer to the renderer and return the handle the
/// sequencer places on the grid.
pub fn load_and_register(path: &Path, port: &OutputPort) -> anyhow::Result<AssetRef> {
    let (id, buffer) = load(path, port.sample_rate())?;
    let asset = AssetRef::new(id, buffer.duration());
    log::debug!("loaded {} as {:?} ({:.3}s)", path.display(), id, asset.duration);
    anyhow::ensure!(
        port.send(AudioCommand::RegisterSample { id, buffer }),
        "audio output did not accept {}",
        path.display()
    );
    Ok(asset)
}

// All .wav files directly inside `dir`, sorted by file name
pub fn index_wav_in_dir(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("cannot read {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("wav"))
        })
        .collect();
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexes_only_wav_files_sorted() {
        let dir = std::env::temp_dir().join(format!("gridseq-index-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        for name in ["snare.WAV", "kick.wav", "notes.txt"] {
            std::fs::write(dir.join(name), b"").unwrap();
        }
        let found = index_wav_in_dir(&dir).unwrap();
        std::fs::remove_dir_all(&dir).ok();

        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["kick.wav", "snare.WAV"]);
    }

    #[test]
    fn missing_directory_is_an_error() {
        assert!(index_wav_in_dir(Path::new("/definitely/not/here")).is_err());
    }
}
