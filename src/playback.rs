//! Playback state machine on top of an [`AudioTransport`].
//!
//! States are `Stopped`, `Playing` and `Paused`. The controller owns speed, volume, rewind
//! amount and the loop region, and publishes [`PlaybackEvent`]s to subscribers.
//!
//! The periodic tick is split in two: [`step`] is a pure function deciding loop wrap-around and
//! the events to emit, and [`PlaybackController::tick`] feeds it the transport's current
//! position and applies the outcome. All controller calls are expected on one sequential
//! context; nothing here locks.

use std::path::Path;
use std::sync::mpsc::Receiver;

use tracing::{debug, info};

use crate::Result;
use crate::events::Subscribers;
use crate::transport::{AudioTransport, TransportSignal};

pub const MIN_SPEED: f64 = 0.5;
pub const MAX_SPEED: f64 = 1.5;
pub const MIN_VOLUME: f64 = 0.0;
pub const MAX_VOLUME: f64 = 1.0;
pub const MIN_REWIND_SECONDS: f64 = 0.5;
pub const MAX_REWIND_SECONDS: f64 = 10.0;
pub const DEFAULT_REWIND_SECONDS: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

impl PlaybackState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Stopped => "Stopped",
            Self::Playing => "Playing",
            Self::Paused => "Paused",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaybackEvent {
    PositionChanged { position: f64 },
    /// Duration became authoritative (the transport finished opening media).
    DurationChanged { duration: f64 },
    StateChanged { state: PlaybackState },
    /// The source played to its end. Distinct from the `Stopped` state change.
    Ended,
}

/// A `[start, end)` range that playback wraps around while enabled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopRegion {
    pub start: f64,
    pub end: f64,
    pub enabled: bool,
}

/// Inputs and outputs of one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickState {
    pub state: PlaybackState,
    pub position: f64,
    pub loop_region: Option<LoopRegion>,
}

/// One tick of the playback clock.
///
/// Wraps the position back to the loop start when looping is enabled, playback is running and
/// the loop end has been reached. A position notification is produced on every tick.
pub fn step(input: TickState) -> (TickState, Vec<PlaybackEvent>) {
    let mut next = input;

    if let Some(region) = input.loop_region {
        if region.enabled && input.state == PlaybackState::Playing && input.position >= region.end
        {
            next.position = region.start;
        }
    }

    let events = vec![PlaybackEvent::PositionChanged {
        position: next.position,
    }];
    (next, events)
}

pub struct PlaybackController<T: AudioTransport> {
    transport: T,
    state: PlaybackState,
    duration: Option<f64>,
    loop_region: Option<LoopRegion>,
    rewind_amount: f64,
    subscribers: Subscribers<PlaybackEvent>,
}

impl<T: AudioTransport> PlaybackController<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            state: PlaybackState::Stopped,
            duration: None,
            loop_region: None,
            rewind_amount: DEFAULT_REWIND_SECONDS,
            subscribers: Subscribers::default(),
        }
    }

    pub fn subscribe(&mut self) -> Receiver<PlaybackEvent> {
        self.subscribers.subscribe()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn has_media(&self) -> bool {
        self.transport.has_media()
    }

    pub fn position(&self) -> f64 {
        self.transport.position()
    }

    /// Media duration; `None` until the transport has signalled that media opened.
    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    pub fn loop_region(&self) -> Option<LoopRegion> {
        self.loop_region
    }

    pub fn speed(&self) -> f64 {
        self.transport.speed_ratio()
    }

    /// Set the speed ratio, clamped to `[0.5, 1.5]`.
    pub fn set_speed(&mut self, ratio: f64) {
        self.transport.set_speed_ratio(clamp_or(ratio, MIN_SPEED, MAX_SPEED, 1.0));
    }

    pub fn volume(&self) -> f64 {
        self.transport.volume()
    }

    /// Set the volume, clamped to `[0, 1]`.
    pub fn set_volume(&mut self, volume: f64) {
        self.transport.set_volume(clamp_or(volume, MIN_VOLUME, MAX_VOLUME, MAX_VOLUME));
    }

    pub fn rewind_amount(&self) -> f64 {
        self.rewind_amount
    }

    /// Set the rewind amount in seconds, clamped to `[0.5, 10]`.
    pub fn set_rewind_amount(&mut self, seconds: f64) {
        self.rewind_amount = clamp_or(
            seconds,
            MIN_REWIND_SECONDS,
            MAX_REWIND_SECONDS,
            DEFAULT_REWIND_SECONDS,
        );
    }

    /// Open `source`, rewind to zero and stop. Duration is unknown until the next tick sees the
    /// transport's `Opened` signal.
    pub fn load(&mut self, source: &Path) -> Result<()> {
        self.transport.open(source)?;
        self.transport.set_position(0.0);
        self.duration = None;
        info!(source = %source.display(), "media loading");
        self.set_state(PlaybackState::Stopped);
        Ok(())
    }

    pub fn play(&mut self) {
        self.transport.play();
        self.set_state(PlaybackState::Playing);
    }

    /// Pause a running transport, optionally backing up by the rewind amount.
    ///
    /// Returns `false` (and does nothing) unless currently playing.
    pub fn pause(&mut self, rewind: bool) -> bool {
        if self.state != PlaybackState::Playing {
            return false;
        }

        self.transport.pause();
        if rewind {
            let back = (self.transport.position() - self.rewind_amount).max(0.0);
            self.transport.set_position(back);
        }
        self.set_state(PlaybackState::Paused);
        true
    }

    pub fn stop(&mut self) {
        self.transport.stop();
        self.set_state(PlaybackState::Stopped);
    }

    /// Jump back by the rewind amount, in any state.
    pub fn rewind(&mut self) {
        let target = self.transport.position() - self.rewind_amount;
        self.seek(target);
    }

    /// Jump forward by the rewind amount, in any state.
    pub fn forward(&mut self) {
        let target = self.transport.position() + self.rewind_amount;
        self.seek(target);
    }

    /// Move to `seconds`, clamped to `[0, duration]` (no upper bound while the duration is
    /// unknown), and notify immediately.
    pub fn seek(&mut self, seconds: f64) {
        let position = self.clamp_position(seconds);
        self.transport.set_position(position);
        self.subscribers.emit(PlaybackEvent::PositionChanged { position });
    }

    /// Store a loop region. It is enabled only when `end > start` after clamping.
    pub fn set_loop(&mut self, start: f64, end: f64) {
        let start = start.max(0.0);
        let end = match self.duration {
            Some(duration) => end.min(duration),
            None => end,
        };
        let enabled = end > start;
        self.loop_region = Some(LoopRegion {
            start,
            end,
            enabled,
        });
        debug!(start, end, enabled, "loop region set");
    }

    /// Disable looping, keeping the stored region.
    pub fn clear_loop(&mut self) {
        if let Some(region) = self.loop_region.as_mut() {
            region.enabled = false;
        }
    }

    pub fn is_looping(&self) -> bool {
        self.loop_region.is_some_and(|r| r.enabled)
    }

    /// Advance the controller by one tick: handle transport signals, then run [`step`].
    pub fn tick(&mut self) {
        for signal in self.transport.poll_signals() {
            match signal {
                TransportSignal::Opened => {
                    let duration = self.transport.natural_duration().unwrap_or(0.0);
                    self.duration = Some(duration);
                    debug!(duration, "media opened");
                    self.subscribers.emit(PlaybackEvent::DurationChanged { duration });
                }
                TransportSignal::Ended => {
                    info!("playback ended");
                    self.stop();
                    self.subscribers.emit(PlaybackEvent::Ended);
                }
            }
        }

        let position = self.transport.position();
        let (next, events) = step(TickState {
            state: self.state,
            position,
            loop_region: self.loop_region,
        });

        if next.position != position {
            self.transport.set_position(next.position);
        }
        for event in events {
            self.subscribers.emit(event);
        }
    }

    fn set_state(&mut self, state: PlaybackState) {
        if self.state == state {
            return;
        }
        debug!(from = self.state.label(), to = state.label(), "playback state changed");
        self.state = state;
        self.subscribers.emit(PlaybackEvent::StateChanged { state });
    }

    fn clamp_position(&self, seconds: f64) -> f64 {
        let lower = seconds.max(0.0);
        match self.duration {
            Some(duration) => lower.min(duration),
            None => lower,
        }
    }
}

fn clamp_or(value: f64, min: f64, max: f64, fallback: f64) -> f64 {
    if value.is_nan() { fallback } else { value.clamp(min, max) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn looping(start: f64, end: f64) -> Option<LoopRegion> {
        Some(LoopRegion {
            start,
            end,
            enabled: true,
        })
    }

    #[test]
    fn step_wraps_past_loop_end_while_playing() {
        let (next, events) = step(TickState {
            state: PlaybackState::Playing,
            position: 15.2,
            loop_region: looping(10.0, 15.0),
        });
        assert_eq!(next.position, 10.0);
        assert_eq!(events, vec![PlaybackEvent::PositionChanged { position: 10.0 }]);
    }

    #[test]
    fn step_wraps_exactly_at_loop_end() {
        let (next, _) = step(TickState {
            state: PlaybackState::Playing,
            position: 15.0,
            loop_region: looping(10.0, 15.0),
        });
        assert_eq!(next.position, 10.0);
    }

    #[test]
    fn step_ignores_loop_when_not_playing_or_disabled() {
        for state in [PlaybackState::Paused, PlaybackState::Stopped] {
            let (next, events) = step(TickState {
                state,
                position: 20.0,
                loop_region: looping(10.0, 15.0),
            });
            assert_eq!(next.position, 20.0);
            assert_eq!(events.len(), 1);
        }

        let disabled = Some(LoopRegion {
            start: 10.0,
            end: 15.0,
            enabled: false,
        });
        let (next, _) = step(TickState {
            state: PlaybackState::Playing,
            position: 20.0,
            loop_region: disabled,
        });
        assert_eq!(next.position, 20.0);
    }

    #[test]
    fn step_always_reports_position() {
        let (_, events) = step(TickState {
            state: PlaybackState::Stopped,
            position: 3.0,
            loop_region: None,
        });
        assert_eq!(events, vec![PlaybackEvent::PositionChanged { position: 3.0 }]);
    }

    #[test]
    fn clamp_or_falls_back_on_nan() {
        assert_eq!(clamp_or(f64::NAN, 0.5, 1.5, 1.0), 1.0);
        assert_eq!(clamp_or(9.0, 0.5, 1.5, 1.0), 1.5);
        assert_eq!(clamp_or(-1.0, 0.5, 1.5, 1.0), 0.5);
    }
}
