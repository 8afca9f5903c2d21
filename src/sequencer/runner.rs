use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::Context;
use crossbeam_channel::{Sender, select};

use super::Sequencer;
use crate::audio_api::AudioOutput;

/// Drives `Sequencer::tick` from a dedicated thread on a fixed interval.
///
/// Dropping the runner stops the thread and the transport, cancelling
/// any voices still in flight.
pub struct Runner {
    shutdown_tx: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl Runner {
    pub fn spawn<O>(sequencer: Arc<Mutex<Sequencer<O>>>, interval: Duration) -> anyhow::Result<Self>
    where
        O: AudioOutput + Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);

        let handle = std::thread::Builder::new()
            .name("gridseq-scheduler".into())
            .spawn(move || {
                let ticker = crossbeam_channel::tick(interval);
                loop {
                    select! {
                        recv(ticker) -> _ => {
                            let Ok(mut seq) = sequencer.lock() else {
                                log::error!("sequencer lock poisoned, scheduler exiting");
                                return;
                            };
                            if let Err(e) = seq.tick() {
                                log::error!("scheduler tick failed: {e}");
                            }
                        }
                        recv(shutdown_rx) -> _ => break,
                    }
                }
                if let Ok(mut seq) = sequencer.lock() {
                    seq.shutdown();
                }
                log::debug!("scheduler thread finished");
            })
            .context("failed to spawn scheduler thread")?;

        log::debug!("scheduler ticking every {interval:?}");
        Ok(Self { shutdown_tx, handle: Some(handle) })
    }

    pub fn shutdown(mut self) {
        self.join();
    }

    fn join(&mut self) {
        let _ = self.shutdown_tx.try_send(());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("scheduler thread panicked");
            }
        }
    }
}

impl Drop for Runner {
    fn drop(&mut self) {
        self.join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::project::Placement;
    use crate::pipeline::test_fixture::{ManualClock, RecordingOutput, test_asset};
    use crate::shared::TransportStatus;

    #[test]
    fn runner_ticks_and_shuts_down_cleanly() {
        let clock = ManualClock::new(0.0);
        let mut seq = Sequencer::with_defaults(RecordingOutput::new(clock.clone()));
        seq.add_track("kick").unwrap();
        for col in 0..16 {
            seq.add_placement("kick", col, Placement::single(test_asset(1, 10.0))).unwrap();
        }
        seq.play().unwrap();
        let seq = Arc::new(Mutex::new(seq));

        let runner = Runner::spawn(seq.clone(), Duration::from_millis(5)).unwrap();
        // move time far enough for a few more columns, then let the thread catch up
        clock.set(0.2);
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while seq.lock().unwrap().current_column() < 2 && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(seq.lock().unwrap().current_column() >= 2);

        runner.shutdown();
        let seq = seq.lock().unwrap();
        assert_eq!(seq.status(), TransportStatus::Stopped);
        // long samples were still sounding, so shutdown cancelled them
        assert_eq!(seq.output().cancels().len(), seq.output().triggers().len());
        assert_eq!(seq.in_flight_count(), 0);
    }
}
