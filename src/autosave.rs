//! Periodic background save of the document to a recovery file.
//!
//! The scheduler is polled from the tick loop. When the interval has elapsed and the document
//! is dirty, a snapshot is written on a spawned thread. Only one write is ever in flight; a
//! check that lands while one is running is skipped. Outcomes come back over a channel and
//! failures are logged, never escalated. Autosaving does not clear the dirty flag.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::session::Session;

/// Result of one background write.
#[derive(Debug, Clone, PartialEq)]
pub struct AutosaveOutcome {
    pub path: PathBuf,
    pub segments: usize,
    /// `None` on success.
    pub error: Option<String>,
}

impl AutosaveOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

pub struct Autosaver {
    path: PathBuf,
    interval: Duration,
    last_check: Instant,
    in_flight: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    tx: Sender<AutosaveOutcome>,
    rx: Receiver<AutosaveOutcome>,
}

impl Autosaver {
    pub fn new(path: impl Into<PathBuf>, interval: Duration) -> Self {
        Self::starting_at(path, interval, Instant::now())
    }

    /// Like [`Autosaver::new`] with an explicit start of the first interval.
    pub fn starting_at(path: impl Into<PathBuf>, interval: Duration, now: Instant) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            path: path.into(),
            interval,
            last_check: now,
            in_flight: Arc::new(AtomicBool::new(false)),
            handle: None,
            tx,
            rx,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Run the periodic check at `now`.
    ///
    /// `snapshot` is only called when a write will actually start. Returns whether a write was
    /// started.
    pub fn maybe_run(
        &mut self,
        now: Instant,
        dirty: bool,
        snapshot: impl FnOnce() -> Session,
    ) -> bool {
        if now.saturating_duration_since(self.last_check) < self.interval {
            return false;
        }
        self.last_check = now;

        if !dirty {
            return false;
        }
        self.start(snapshot())
    }

    /// Write `session` now, outside the schedule. Still respects the single in-flight rule and
    /// skips empty documents.
    pub fn start(&mut self, session: Session) -> bool {
        if session.segments.is_empty() {
            return false;
        }
        if self.in_flight.swap(true, Ordering::AcqRel) {
            debug!("autosave already in flight, skipping");
            return false;
        }

        self.reap();

        let path = self.path.clone();
        let tx = self.tx.clone();
        let guard = InFlightGuard(Arc::clone(&self.in_flight));

        self.handle = Some(thread::spawn(move || {
            let _guard = guard;
            let segments = session.segments.len();
            let error = match session.save(&path) {
                Ok(()) => {
                    debug!(path = %path.display(), segments, "autosaved");
                    None
                }
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "autosave failed");
                    Some(err.to_string())
                }
            };
            let _ = tx.send(AutosaveOutcome {
                path,
                segments,
                error,
            });
        }));
        true
    }

    /// Next finished outcome, if any.
    pub fn poll(&mut self) -> Option<AutosaveOutcome> {
        self.rx.try_recv().ok()
    }

    /// Block until the running write (if any) finishes, then return its outcome.
    pub fn wait(&mut self) -> Option<AutosaveOutcome> {
        self.reap();
        self.poll()
    }

    fn reap(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("autosave thread panicked");
            }
        }
    }
}

impl Drop for Autosaver {
    fn drop(&mut self) {
        self.reap();
    }
}

struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segments::Segment;

    fn doc() -> Session {
        Session::new("a.wav", vec![Segment::new(0.0, 1.0).with_text("x")])
    }

    #[test]
    fn waits_for_the_interval_and_the_dirty_flag() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let t0 = Instant::now();
        let mut saver =
            Autosaver::starting_at(dir.path().join("r.json"), Duration::from_secs(30), t0);

        assert!(!saver.maybe_run(t0 + Duration::from_secs(29), true, doc));
        assert!(!saver.maybe_run(t0 + Duration::from_secs(30), false, doc));
        assert!(!saver.maybe_run(t0 + Duration::from_secs(45), true, doc));
        assert!(saver.maybe_run(t0 + Duration::from_secs(60), true, doc));

        let outcome = saver.wait().expect("outcome");
        assert!(outcome.is_ok());
        assert_eq!(outcome.segments, 1);
        assert!(dir.path().join("r.json").is_file());
        assert!(!saver.is_in_flight());
        Ok(())
    }

    #[test]
    fn empty_documents_are_not_written() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let mut saver = Autosaver::new(dir.path().join("r.json"), Duration::ZERO);
        assert!(!saver.start(Session::default()));
        assert!(saver.wait().is_none());
        Ok(())
    }

    #[test]
    fn failures_are_reported_not_raised() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x")?;

        let mut saver = Autosaver::new(blocker.join("r.json"), Duration::ZERO);
        assert!(saver.start(doc()));
        let outcome = saver.wait().expect("outcome");
        assert!(!outcome.is_ok());
        assert!(!saver.is_in_flight());
        Ok(())
    }
}
