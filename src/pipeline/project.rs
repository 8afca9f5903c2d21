// The grid data model: tracks, their gain/mute settings, and what sits in
// each cell. The sequencer only mutates membership and placements while
// stopped; levels can change at any time.

use std::collections::BTreeMap;

use crate::audio_api::{AssetRef, BusId};
use crate::error::EngineError;
use crate::shared::{DEFAULT_ACCENT_MULTIPLIER, DEFAULT_TRACK_VOLUME, clamp_gain};

/// What plays when the scheduler reaches a (track, column) cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Placement {
    Single(AssetRef),
    // two hits at once; the accent is boosted by `accent_multiplier`
    Combined {
        primary: AssetRef,
        accent: AssetRef,
        accent_multiplier: f32,
    },
}

impl Placement {
    pub fn single(asset: AssetRef) -> Self {
        Placement::Single(asset)
    }

    pub fn combined(primary: AssetRef, accent: AssetRef) -> Self {
        Placement::Combined {
            primary,
            accent,
            accent_multiplier: DEFAULT_ACCENT_MULTIPLIER,
        }
    }

    pub fn combined_with_multiplier(
        primary: AssetRef,
        accent: AssetRef,
        accent_multiplier: f32,
    ) -> Result<Self, EngineError> {
        if !accent_multiplier.is_finite() || accent_multiplier <= 0.0 {
            return Err(EngineError::invalid_argument(format!(
                "accent multiplier must be positive, got {accent_multiplier}"
            )));
        }
        Ok(Placement::Combined { primary, accent, accent_multiplier })
    }

    pub fn is_combined(&self) -> bool {
        matches!(self, Placement::Combined { .. })
    }
}

/// Per-voice level for the accent half of a combined hit.
///
/// The accent's effective gain is `volume * multiplier` clamped to [0, 1].
/// Since the track bus already applies `volume`, the voice itself carries
/// the remaining factor.
pub fn accent_level(volume: f32, multiplier: f32) -> f32 {
    let volume = clamp_gain(volume);
    if volume <= 0.0 {
        return clamp_gain(multiplier);
    }
    clamp_gain(volume * multiplier) / volume
}

#[derive(Clone, Debug, PartialEq)]
pub struct Track {
    pub id: String,
    pub bus: BusId,
    volume: f32, // also the value restored on unmute
    muted: bool,
    cells: BTreeMap<usize, Placement>,
}

impl Track {
    pub fn new(id: impl Into<String>, bus: BusId) -> Self {
        Self {
            id: id.into(),
            bus,
            volume: DEFAULT_TRACK_VOLUME,
            muted: false,
            cells: BTreeMap::new(),
        }
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn set_volume(&mut self, v: f32) {
        self.volume = clamp_gain(v);
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    /// The gain the bus should currently have.
    pub fn effective_gain(&self) -> f32 {
        if self.muted { 0.0 } else { self.volume }
    }

    pub fn placement(&self, column: usize) -> Option<&Placement> {
        self.cells.get(&column)
    }

    // replacing a cell is remove-then-insert; the old placement is returned
    pub fn place(&mut self, column: usize, placement: Placement) -> Option<Placement> {
        self.cells.insert(column, placement)
    }

    pub fn clear(&mut self, column: usize) -> Option<Placement> {
        self.cells.remove(&column)
    }

    pub fn cells(&self) -> impl Iterator<Item = (usize, &Placement)> {
        self.cells.iter().map(|(c, p)| (*c, p))
    }
}

/// Tracks in insertion order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrackRegistry {
    tracks: Vec<Track>,
}

impl TrackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn insert(&mut self, track: Track) -> Result<(), EngineError> {
        if self.contains(&track.id) {
            return Err(EngineError::invalid_argument(format!(
                "track '{}' already exists",
                track.id
            )));
        }
        self.tracks.push(track);
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Result<Track, EngineError> {
        let idx = self
            .tracks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| EngineError::UnknownTrack(id.to_string()))?;
        Ok(self.tracks.remove(idx))
    }

    pub fn get(&self, id: &str) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Track> {
        self.tracks.iter_mut().find(|t| t.id == id)
    }

    pub fn require(&self, id: &str) -> Result<&Track, EngineError> {
        self.get(id).ok_or_else(|| EngineError::UnknownTrack(id.to_string()))
    }

    pub fn require_mut(&mut self, id: &str) -> Result<&mut Track, EngineError> {
        self.get_mut(id).ok_or_else(|| EngineError::UnknownTrack(id.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter()
    }

    pub fn ids(&self) -> Vec<String> {
        self.tracks.iter().map(|t| t.id.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SampleId;

    fn asset(n: u64) -> AssetRef {
        AssetRef::new(SampleId(n), 0.2)
    }

    #[test]
    fn registry_keeps_insertion_order_and_rejects_duplicates() {
        let mut reg = TrackRegistry::new();
        reg.insert(Track::new("snare", 0)).unwrap();
        reg.insert(Track::new("kick", 1)).unwrap();
        assert!(matches!(reg.insert(Track::new("kick", 2)), Err(EngineError::InvalidArgument(_))));
        assert_eq!(reg.ids(), vec!["snare", "kick"]);

        reg.remove("snare").unwrap();
        assert_eq!(reg.ids(), vec!["kick"]);
        assert_eq!(reg.remove("snare"), Err(EngineError::UnknownTrack("snare".into())));
    }

    #[test]
    fn mute_keeps_restore_volume() {
        let mut t = Track::new("hat", 0);
        t.set_volume(0.6);
        t.set_muted(true);
        assert_eq!(t.effective_gain(), 0.0);
        assert_eq!(t.volume(), 0.6);
        t.set_muted(false);
        assert_eq!(t.effective_gain(), 0.6);
    }

    #[test]
    fn place_replaces_existing_cell() {
        let mut t = Track::new("kick", 0);
        assert_eq!(t.place(3, Placement::single(asset(1))), None);
        let old = t.place(3, Placement::combined(asset(1), asset(2)));
        assert_eq!(old, Some(Placement::Single(asset(1))));
        assert!(t.placement(3).unwrap().is_combined());
        assert_eq!(t.cells().count(), 1);
    }

    #[test]
    fn combined_defaults_and_validates_multiplier() {
        match Placement::combined(asset(1), asset(2)) {
            Placement::Combined { accent_multiplier, .. } => assert_eq!(accent_multiplier, 3.0),
            other => panic!("expected combined, got {other:?}"),
        }
        assert!(Placement::combined_with_multiplier(asset(1), asset(2), 0.0).is_err());
        assert!(Placement::combined_with_multiplier(asset(1), asset(2), f32::NAN).is_err());
    }

    #[test]
    fn accent_level_multiplies_then_clamps() {
        // 0.2 * 3 = 0.6, so the voice carries the full factor of 3
        assert!((accent_level(0.2, 3.0) - 3.0).abs() < 1e-6);
        // 0.5 * 3 clamps to 1.0, leaving a factor of 2 on top of the bus
        assert!((accent_level(0.5, 3.0) - 2.0).abs() < 1e-6);
        assert!((accent_level(1.0, 3.0) - 1.0).abs() < 1e-6);
    }
}
