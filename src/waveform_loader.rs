//! Background waveform extraction with last-load-wins delivery.
//!
//! Each request bumps a generation counter and runs on its own thread. Results come back over
//! a channel tagged with the generation they were started under; [`WaveformLoader::poll`] hands
//! out only the result matching the current generation and drops anything older. In-flight
//! extractions are never cancelled, they just finish into the void.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use tracing::debug;

use crate::waveform::{WaveformEnvelope, extract_file};

/// Completed extraction.
#[derive(Debug, Clone)]
pub struct WaveformResult {
    pub generation: u64,
    pub path: PathBuf,
    pub envelope: WaveformEnvelope,
}

type Extractor = fn(&Path) -> WaveformEnvelope;

pub struct WaveformLoader {
    generation: u64,
    extractor: Extractor,
    tx: Sender<WaveformResult>,
    rx: Receiver<WaveformResult>,
}

impl Default for WaveformLoader {
    fn default() -> Self {
        Self::with_extractor(extract_file)
    }
}

impl WaveformLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom extraction function (tests, alternative decoders).
    pub fn with_extractor(extractor: Extractor) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            generation: 0,
            extractor,
            tx,
            rx,
        }
    }

    /// Generation of the most recent request.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Start extracting `path` in the background. Supersedes any earlier request.
    pub fn request(&mut self, path: impl Into<PathBuf>) -> u64 {
        self.generation += 1;
        let generation = self.generation;
        let path = path.into();
        let tx = self.tx.clone();
        let extractor = self.extractor;

        debug!(generation, path = %path.display(), "waveform extraction requested");
        thread::spawn(move || {
            let envelope = extractor(&path);
            // The loader may be gone by now; nothing to report to.
            let _ = tx.send(WaveformResult {
                generation,
                path,
                envelope,
            });
        });

        generation
    }

    /// Return the current generation's result if it has arrived, discarding stale ones.
    pub fn poll(&mut self) -> Option<WaveformResult> {
        let mut latest = None;
        while let Ok(result) = self.rx.try_recv() {
            if result.generation == self.generation {
                latest = Some(result);
            } else {
                debug!(
                    stale = result.generation,
                    current = self.generation,
                    "discarding superseded waveform"
                );
            }
        }
        latest
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;

    fn fake_extract(path: &Path) -> WaveformEnvelope {
        // Make the first request slower so it lands after the second.
        if path.ends_with("slow.wav") {
            thread::sleep(Duration::from_millis(150));
        }
        crate::waveform::extract_from_frames(&[0.5; 100], 100)
    }

    fn wait_for(loader: &mut WaveformLoader) -> Option<WaveformResult> {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if let Some(result) = loader.poll() {
                return Some(result);
            }
            thread::sleep(Duration::from_millis(5));
        }
        None
    }

    #[test]
    fn newest_request_wins() {
        let mut loader = WaveformLoader::with_extractor(fake_extract);
        loader.request("slow.wav");
        let second = loader.request("fast.wav");

        let result = wait_for(&mut loader).expect("result delivered");
        assert_eq!(result.generation, second);
        assert_eq!(result.path, PathBuf::from("fast.wav"));

        // The slow, superseded result is dropped once it arrives.
        thread::sleep(Duration::from_millis(300));
        assert!(loader.poll().is_none());
    }

    #[test]
    fn poll_without_request_is_empty() {
        let mut loader = WaveformLoader::with_extractor(fake_extract);
        assert_eq!(loader.generation(), 0);
        assert!(loader.poll().is_none());
    }
}
