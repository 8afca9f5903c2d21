// The look-ahead loop. Each tick dispatches every column whose deadline
// falls inside [now, now + lookahead), handing the output the exact deadline
// as the start time. How often tick() runs only has to beat the window; it
// never affects when a sound starts.

use crate::audio_api::{AudioOutput, TriggerRequest};
use crate::error::EngineError;
use crate::pipeline::project::{Placement, accent_level};
use crate::shared::TransportStatus;

use super::{Notification, Sequencer};

impl<O: AudioOutput> Sequencer<O> {
    /// Advance playback up to the look-ahead horizon. Returns how many
    /// columns were dispatched.
    ///
    /// An inconsistent meter halts playback: the transport is stopped and
    /// the error returned.
    pub fn tick(&mut self) -> Result<usize, EngineError> {
        self.reap_finished();
        if self.transport.status != TransportStatus::Playing {
            return Ok(0);
        }

        let meter = self.transport.meter();
        let cell = meter.cell_seconds();
        let columns = match meter.columns_per_measure() {
            Ok(n) if n > 0 && cell.is_finite() && cell > 0.0 => n as i64,
            Ok(n) => return Err(self.halt(format!("degenerate meter: {n} columns of {cell}s"))),
            Err(e) => return Err(self.halt(e.to_string())),
        };

        let now = self.output.now();
        self.transport.retire_started(now);

        if self.transport.next_deadline < now - cell {
            log::warn!(
                "scheduler fell {:.3}s behind, resyncing to the clock",
                now - self.transport.next_deadline
            );
            self.transport.next_deadline = now;
        }

        let horizon = now + self.lookahead;
        let mut dispatched = 0;

        while self.transport.next_deadline < horizon {
            let deadline = self.transport.next_deadline;
            // far enough out on the clock, adding a cell stops moving the deadline
            if deadline + cell <= deadline {
                return Err(self.halt(format!("a {cell}s cell no longer advances the deadline at {deadline}s")));
            }
            let mut column = self.transport.current_column + 1;

            if column >= columns {
                if self.transport.looping {
                    column = 0;
                } else {
                    // the last column keeps sounding until the measure is actually over
                    if now >= deadline {
                        log::debug!("end of measure, stopping");
                        self.stop();
                    }
                    return Ok(dispatched);
                }
            }

            self.transport.current_column = column;
            self.transport.upcoming.push_back((column, deadline));
            self.notifier.emit(Notification::GridCellChanged { column, deadline });
            self.dispatch_column(column as usize, deadline);

            self.transport.next_deadline = deadline + cell;
            dispatched += 1;
        }

        Ok(dispatched)
    }

    fn dispatch_column(&mut self, column: usize, deadline: f64) {
        let mut requests = Vec::new();
        for track in self.tracks.iter().filter(|t| !t.is_muted()) {
            let Some(placement) = track.placement(column) else {
                continue;
            };
            match *placement {
                Placement::Single(asset) => requests.push(TriggerRequest {
                    asset,
                    bus: track.bus,
                    level: 1.0,
                    start_at: deadline,
                }),
                Placement::Combined { primary, accent, accent_multiplier } => {
                    requests.push(TriggerRequest {
                        asset: primary,
                        bus: track.bus,
                        level: 1.0,
                        start_at: deadline,
                    });
                    requests.push(TriggerRequest {
                        asset: accent,
                        bus: track.bus,
                        level: accent_level(track.volume(), accent_multiplier),
                        start_at: deadline,
                    });
                }
            }
        }

        log::trace!("column {column} at {deadline:.4}s: {} trigger(s)", requests.len());
        for req in requests {
            let voice = self.output.trigger(req);
            self.in_flight.insert(voice);
        }
    }

    fn halt(&mut self, reason: String) -> EngineError {
        let err = EngineError::Invariant(reason);
        log::error!("{err}; halting playback");
        self.stop();
        err
    }
}
