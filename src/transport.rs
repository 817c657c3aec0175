//! Audio transport boundary.
//!
//! The core never decodes or renders audio itself. It drives an [`AudioTransport`] supplied by
//! the host (a platform media player, a sound-server client) and only consumes position,
//! duration and the `Opened`/`Ended` signals from it.
//!
//! [`VirtualTransport`] is a deterministic, clock-driven implementation used by tests and the
//! CLI simulator: time only moves when [`VirtualTransport::advance`] is called.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{Error, Result};

/// Asynchronous notifications raised by a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportSignal {
    /// Media finished opening; `natural_duration` is now valid.
    Opened,
    /// The source was played to its end.
    Ended,
}

/// Contract of the external audio playback facility.
pub trait AudioTransport {
    /// Start opening `source`. Completion is reported later via [`TransportSignal::Opened`].
    fn open(&mut self, source: &Path) -> Result<()>;

    fn play(&mut self);

    fn pause(&mut self);

    /// Stop playback and return to the transport's default position.
    fn stop(&mut self);

    fn has_media(&self) -> bool;

    /// Current position in seconds.
    fn position(&self) -> f64;

    fn set_position(&mut self, seconds: f64);

    /// Media duration in seconds; `None` until the media has opened.
    fn natural_duration(&self) -> Option<f64>;

    fn speed_ratio(&self) -> f64;

    fn set_speed_ratio(&mut self, ratio: f64);

    fn volume(&self) -> f64;

    fn set_volume(&mut self, volume: f64);

    /// Drain signals raised since the last call, oldest first.
    fn poll_signals(&mut self) -> Vec<TransportSignal>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Motion {
    Stopped,
    Playing,
    Paused,
}

/// An in-process transport with a manually advanced clock.
///
/// Media must be registered with a duration before it can be opened.
#[derive(Debug)]
pub struct VirtualTransport {
    catalog: HashMap<PathBuf, f64>,
    source: Option<PathBuf>,
    duration: f64,
    opened: bool,
    motion: Motion,
    position: f64,
    speed: f64,
    volume: f64,
    signals: VecDeque<TransportSignal>,
}

impl Default for VirtualTransport {
    fn default() -> Self {
        Self {
            catalog: HashMap::new(),
            source: None,
            duration: 0.0,
            opened: false,
            motion: Motion::Stopped,
            position: 0.0,
            speed: 1.0,
            volume: 1.0,
            signals: VecDeque::new(),
        }
    }
}

impl VirtualTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source and its duration.
    pub fn with_media(mut self, source: impl Into<PathBuf>, duration_seconds: f64) -> Self {
        self.register(source, duration_seconds);
        self
    }

    pub fn register(&mut self, source: impl Into<PathBuf>, duration_seconds: f64) {
        self.catalog.insert(source.into(), duration_seconds.max(0.0));
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn is_playing(&self) -> bool {
        self.motion == Motion::Playing
    }

    /// Move the clock forward by `elapsed` wall time, scaled by the speed ratio.
    ///
    /// Reaching the end of the media stops motion and raises [`TransportSignal::Ended`].
    pub fn advance(&mut self, elapsed: Duration) {
        if self.motion != Motion::Playing || !self.opened {
            return;
        }

        self.position += elapsed.as_secs_f64() * self.speed;
        if self.position >= self.duration {
            self.position = self.duration;
            self.motion = Motion::Paused;
            self.signals.push_back(TransportSignal::Ended);
        }
    }
}

impl AudioTransport for VirtualTransport {
    fn open(&mut self, source: &Path) -> Result<()> {
        let duration = *self
            .catalog
            .get(source)
            .ok_or_else(|| Error::msg(format!("no media registered for '{}'", source.display())))?;

        self.source = Some(source.to_path_buf());
        self.duration = duration;
        self.opened = false;
        self.motion = Motion::Stopped;
        self.position = 0.0;
        self.signals.push_back(TransportSignal::Opened);
        Ok(())
    }

    fn play(&mut self) {
        if self.source.is_some() {
            self.motion = Motion::Playing;
        }
    }

    fn pause(&mut self) {
        if self.motion == Motion::Playing {
            self.motion = Motion::Paused;
        }
    }

    fn stop(&mut self) {
        self.motion = Motion::Stopped;
        self.position = 0.0;
    }

    fn has_media(&self) -> bool {
        self.source.is_some()
    }

    fn position(&self) -> f64 {
        self.position
    }

    fn set_position(&mut self, seconds: f64) {
        self.position = seconds.max(0.0);
    }

    fn natural_duration(&self) -> Option<f64> {
        self.opened.then_some(self.duration)
    }

    fn speed_ratio(&self) -> f64 {
        self.speed
    }

    fn set_speed_ratio(&mut self, ratio: f64) {
        self.speed = ratio;
    }

    fn volume(&self) -> f64 {
        self.volume
    }

    fn set_volume(&mut self, volume: f64) {
        self.volume = volume;
    }

    fn poll_signals(&mut self) -> Vec<TransportSignal> {
        let signals: Vec<_> = self.signals.drain(..).collect();
        if signals.contains(&TransportSignal::Opened) {
            self.opened = true;
        }
        signals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_media_fails_to_open() {
        let mut transport = VirtualTransport::new();
        let err = transport.open(Path::new("missing.wav")).unwrap_err();
        assert!(err.to_string().contains("no media registered"));
        assert!(!transport.has_media());
    }

    #[test]
    fn duration_is_unknown_until_opened_signal_is_drained() -> anyhow::Result<()> {
        let mut transport = VirtualTransport::new().with_media("a.wav", 12.0);
        transport.open(Path::new("a.wav"))?;
        assert_eq!(transport.natural_duration(), None);

        assert_eq!(transport.poll_signals(), vec![TransportSignal::Opened]);
        assert_eq!(transport.natural_duration(), Some(12.0));
        Ok(())
    }

    #[test]
    fn advance_scales_by_speed_and_ends() -> anyhow::Result<()> {
        let mut transport = VirtualTransport::new().with_media("a.wav", 3.0);
        transport.open(Path::new("a.wav"))?;
        transport.poll_signals();
        transport.set_speed_ratio(1.5);
        transport.play();

        transport.advance(Duration::from_secs(1));
        assert!((transport.position() - 1.5).abs() < 1e-9);

        transport.advance(Duration::from_secs(5));
        assert_eq!(transport.position(), 3.0);
        assert!(!transport.is_playing());
        assert_eq!(transport.poll_signals(), vec![TransportSignal::Ended]);
        Ok(())
    }

    #[test]
    fn paused_clock_does_not_move() -> anyhow::Result<()> {
        let mut transport = VirtualTransport::new().with_media("a.wav", 10.0);
        transport.open(Path::new("a.wav"))?;
        transport.poll_signals();
        transport.advance(Duration::from_secs(2));
        assert_eq!(transport.position(), 0.0);
        Ok(())
    }
}
