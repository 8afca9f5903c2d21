//! Tempo and meter arithmetic.
//!
//! Everything here is pure and cheap; the scheduler re-derives it on every
//! tick instead of caching, so a configuration change can never leave a
//! stale cell length behind.

use crate::error::EngineError;

pub const SUPPORTED_SUBDIVISIONS: [u32; 4] = [4, 8, 16, 32];

/// Note value one grid cell represents (16 = sixteenth notes).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Subdivision(u32);

impl Subdivision {
    pub fn new(note_value: u32) -> Result<Self, EngineError> {
        if SUPPORTED_SUBDIVISIONS.contains(&note_value) {
            Ok(Self(note_value))
        } else {
            Err(EngineError::invalid_argument(format!(
                "subdivision must be one of {SUPPORTED_SUBDIVISIONS:?}, got {note_value}"
            )))
        }
    }

    pub fn value(self) -> u32 {
        self.0
    }

    // the next supported value, wrapping back to quarter notes
    pub fn next(self) -> Self {
        let idx = SUPPORTED_SUBDIVISIONS.iter().position(|s| *s == self.0).unwrap_or(0);
        Self(SUPPORTED_SUBDIVISIONS[(idx + 1) % SUPPORTED_SUBDIVISIONS.len()])
    }
}

impl Default for Subdivision {
    fn default() -> Self {
        Self(crate::shared::DEFAULT_SUBDIVISION)
    }
}

// Shortest grid cell allowed at any subdivision. Deadlines are sums of cells,
// so a cell this small still moves a deadline forward for any clock reading
// below roughly 1e11 seconds.
pub const MIN_CELL_SECONDS: f64 = 1e-4;

/// Accept a bpm only if every supported subdivision gives a finite cell of
/// at least `MIN_CELL_SECONDS`.
pub fn validate_bpm(bpm: f64) -> Result<f64, EngineError> {
    if !bpm.is_finite() || bpm <= 0.0 {
        return Err(EngineError::invalid_argument(format!("bpm must be positive, got {bpm}")));
    }
    for s in SUPPORTED_SUBDIVISIONS {
        let cell = cell_seconds(bpm, Subdivision(s));
        if !cell.is_finite() || cell < MIN_CELL_SECONDS {
            return Err(EngineError::invalid_argument(format!(
                "bpm {bpm} gives an unusable 1/{s} cell of {cell}s"
            )));
        }
    }
    Ok(bpm)
}

/// Seconds per grid cell: a whole note lasts 240/bpm seconds, split into
/// `subdivision` cells.
pub fn cell_seconds(bpm: f64, subdivision: Subdivision) -> f64 {
    (240.0 / bpm) / subdivision.value() as f64
}

/// Grid columns in one measure, `numerator * (subdivision / denominator)`.
///
/// Fractional results are rejected rather than truncated: the subdivision
/// has to be a whole multiple of the denominator.
pub fn columns_per_measure(
    numerator: u32,
    denominator: u32,
    subdivision: Subdivision,
) -> Result<usize, EngineError> {
    if numerator == 0 || denominator == 0 {
        return Err(EngineError::invalid_argument(format!(
            "time signature components must be positive, got {numerator}/{denominator}"
        )));
    }
    let s = subdivision.value();
    if s % denominator != 0 {
        return Err(EngineError::invalid_argument(format!(
            "subdivision 1/{s} does not divide a 1/{denominator} beat evenly"
        )));
    }
    Ok(numerator as usize * (s / denominator) as usize)
}

/// The tempo/meter settings the scheduler needs, copied out of the
/// transport at the top of each tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Meter {
    pub bpm: f64,
    pub numerator: u32,
    pub denominator: u32,
    pub subdivision: Subdivision,
}

impl Meter {
    pub fn cell_seconds(&self) -> f64 {
        cell_seconds(self.bpm, self.subdivision)
    }

    pub fn columns_per_measure(&self) -> Result<usize, EngineError> {
        columns_per_measure(self.numerator, self.denominator, self.subdivision)
    }

    pub fn measure_seconds(&self) -> Result<f64, EngineError> {
        Ok(self.columns_per_measure()? as f64 * self.cell_seconds())
    }
}
