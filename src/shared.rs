// Types shared between the sequencer core and whatever front end drives it.
//
// The front end only ever sees the sequencer through the operations on
// `Sequencer` and the notifications it publishes. `InputEvent` is what the
// terminal layer resolves keypresses into, and `DisplayState` is what it
// renders every frame.

pub const DEFAULT_BPM: f64 = 120.0;
pub const DEFAULT_NUMERATOR: u32 = 4;
pub const DEFAULT_DENOMINATOR: u32 = 4;
pub const DEFAULT_SUBDIVISION: u32 = 16;
pub const DEFAULT_ACCENT_MULTIPLIER: f32 = 3.0;
pub const DEFAULT_TRACK_VOLUME: f32 = 1.0;
pub const DEFAULT_MASTER_VOLUME: f32 = 1.0;

// column index meaning "before column 0"
pub const NO_COLUMN: i64 = -1;

/// The three transport states. Exactly one holds at any time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TransportStatus {
    #[default]
    Stopped,
    Playing,
    Paused,
}

impl TransportStatus {
    pub fn label(self) -> &'static str {
        match self {
            TransportStatus::Stopped => "STOP",
            TransportStatus::Playing => "PLAY",
            TransportStatus::Paused => "PAUSE",
        }
    }
}

/// Clamp a gain into [0, 1]. NaN collapses to silence.
pub fn clamp_gain(v: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}

#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
    // cursor
    MoveCursor { dx: i32, dy: i32 },

    // grid editing (rejected by the core unless stopped)
    ToggleCell,
    ToggleCombinedCell,

    // transport
    PlayStop,
    Pause,
    ToggleLoop,

    // configuration (rejected by the core unless stopped)
    AdjustBpm(f64),
    AdjustNumerator(i32),
    CycleSubdivision,

    // levels, live in any state
    ToggleMute,
    AdjustTrackVolume(f32),
    AdjustMasterVolume(f32),

    Quit,
}

#[derive(Clone, Debug)]
pub struct DisplayState {
    pub status: TransportStatus,
    pub active_column: Option<usize>, // highlighted column, None when stopped
    pub columns: usize,
    pub bpm: f64,
    pub numerator: u32,
    pub denominator: u32,
    pub subdivision: u32,
    pub looping: bool,
    pub master_volume: f32,
    pub tracks: Vec<TrackRow>,
    pub cursor: (usize, usize), // (column, track row)
    pub display_text: String, // last diagnostic or confirmation
}

#[derive(Clone, Debug)]
pub struct TrackRow {
    pub id: String,
    pub volume: f32,
    pub muted: bool,
    pub cells: Vec<CellState>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellState {
    Empty,
    Single,
    Combined,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_gain_limits_range() {
        assert_eq!(clamp_gain(1.7), 1.0);
        assert_eq!(clamp_gain(-0.2), 0.0);
        assert_eq!(clamp_gain(0.6), 0.6);
        assert_eq!(clamp_gain(f32::NAN), 0.0);
    }
}
