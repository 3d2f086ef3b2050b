use crossbeam_channel::{Sender, select, tick};
use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};
use tracing::{debug, warn};

/// Number of animation frames; frame `n` shows `n` dots
pub const FRAMES: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressTick {
    pub elapsed: Duration,
    pub frame: usize,
    pub entries_seen: u64,
}

/// Periodic liveness ticker for a running scan. Ticks go to `sink`; the UI
/// thread is the only consumer.
pub struct ProgressReporter {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ProgressReporter {
    pub fn spawn(interval: Duration, entries_seen: Arc<AtomicU64>, sink: Sender<ProgressTick>) -> std::io::Result<Self> {
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(0);
        let handle = thread::Builder::new()
            .name("dudrill-progress".to_string())
            .spawn(move || {
                let started = Instant::now();
                let ticker = tick(interval);
                let mut count = 0usize;
                loop {
                    select! {
                        recv(ticker) -> _ => {
                            count += 1;
                            let progress = ProgressTick {
                                elapsed: started.elapsed(),
                                frame: count % FRAMES,
                                entries_seen: entries_seen.load(Ordering::Relaxed),
                            };
                            if sink.send(progress).is_err() {
                                break;
                            }
                        }
                        // Fires when the stop sender is dropped
                        recv(stop_rx) -> _ => break,
                    }
                }
                debug!(ticks = count, "progress reporter stopped");
            })?;

        Ok(Self {
            stop: Some(stop_tx),
            handle: Some(handle),
        })
    }

    /// Stops ticking. No tick is sent once this returns.
    pub fn stop(&mut self) {
        drop(self.stop.take());
        if let Some(handle) = self.handle.take() {
            join_reporter(handle);
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }
}

/// Joins the ticker thread. Returns `false` if it panicked.
fn join_reporter(handle: JoinHandle<()>) -> bool {
    match handle.join() {
        Ok(()) => true,
        Err(_) => {
            warn!("progress reporter thread panicked");
            false
        }
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn ticks_until_stopped() -> std::io::Result<()> {
        let counter = Arc::new(AtomicU64::new(0));
        let (tx, rx) = unbounded();
        let interval = Duration::from_millis(10);
        let mut reporter = ProgressReporter::spawn(interval, counter, tx)?;

        let first = rx.recv_timeout(Duration::from_secs(2));
        assert!(first.is_ok());

        reporter.stop();
        assert!(!reporter.is_running());
        let delivered: Vec<ProgressTick> = rx.try_iter().collect();
        assert!(delivered.iter().all(|t| t.frame < FRAMES));

        thread::sleep(interval * 3);
        assert!(rx.try_recv().is_err());
        Ok(())
    }

    #[test]
    fn reports_entry_counter() -> std::io::Result<()> {
        let counter = Arc::new(AtomicU64::new(7));
        let (tx, rx) = unbounded();
        let _reporter = ProgressReporter::spawn(Duration::from_millis(5), counter, tx)?;
        let tick = rx.recv_timeout(Duration::from_secs(2));
        assert_eq!(tick.map(|t| t.entries_seen).ok(), Some(7));
        Ok(())
    }

    #[test]
    fn exits_when_sink_is_gone() -> std::io::Result<()> {
        let (tx, rx) = unbounded();
        let mut reporter = ProgressReporter::spawn(Duration::from_millis(5), Arc::new(AtomicU64::new(0)), tx)?;
        drop(rx);
        thread::sleep(Duration::from_millis(30));
        // Joins an already finished thread
        reporter.stop();
        assert!(!reporter.is_running());
        Ok(())
    }

    #[test]
    fn join_reports_a_panicked_thread() -> std::io::Result<()> {
        let crashed = thread::Builder::new().spawn(|| {
            std::panic::resume_unwind(Box::new("ticker failed"));
        })?;
        assert!(!join_reporter(crashed));

        let clean = thread::Builder::new().spawn(|| {})?;
        assert!(join_reporter(clean));
        Ok(())
    }
}
