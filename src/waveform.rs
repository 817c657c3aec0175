//! Peak envelope extraction for waveform display.
//!
//! The envelope has `max(100, round(minutes * 3000))` points. Audio is partitioned into that
//! many contiguous windows of `floor(total_frames / points)` frames (at least one), and each
//! point is the largest absolute sample inside its window. Frames past the last full window are
//! ignored; windows that never receive frames stay at zero.
//!
//! Extraction never fails upward: a missing or undecodable source yields
//! [`WaveformEnvelope::empty`], which callers treat as "no waveform available".
//!
//! When the container declares its frame count the reduction streams straight into the final
//! windows. Otherwise frames go through a [`PeakDecimator`] holding at most
//! [`MAX_PENDING_BLOCKS`] block peaks, so memory stays bounded for any source length.

use std::io::Read;
use std::path::Path;

use tracing::{debug, warn};

use crate::decoder::{DecodeOpts, FrameSink, decode_file, decode_to_stream_from_read};
use crate::demux::StreamInfo;

/// Envelope resolution.
pub const POINTS_PER_MINUTE: f64 = 3000.0;

/// Lower bound on envelope resolution, regardless of duration.
pub const MIN_POINTS: usize = 100;

/// Block peaks kept while the source length is unknown (4 MiB of `f32`).
pub const MAX_PENDING_BLOCKS: usize = 1 << 20;

/// Immutable peak summary of an audio source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WaveformEnvelope {
    peaks: Vec<f32>,
    duration_seconds: f64,
}

impl WaveformEnvelope {
    /// The "no waveform available" envelope: zero peaks, zero duration.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty()
    }

    pub fn peaks(&self) -> &[f32] {
        &self.peaks
    }

    pub fn duration_seconds(&self) -> f64 {
        self.duration_seconds
    }

    /// Peak of the window covering `seconds`, if any.
    pub fn peak_at(&self, seconds: f64) -> Option<f32> {
        if self.is_empty()
            || self.duration_seconds <= 0.0
            || !(0.0..=self.duration_seconds).contains(&seconds)
        {
            return None;
        }
        let idx = (seconds / self.duration_seconds * self.peaks.len() as f64) as usize;
        self.peaks.get(idx.min(self.peaks.len() - 1)).copied()
    }
}

/// Number of envelope points for a source of the given duration.
pub fn point_count(duration_seconds: f64) -> usize {
    let minutes = duration_seconds.max(0.0) / 60.0;
    let wanted = (minutes * POINTS_PER_MINUTE).round() as usize;
    wanted.max(MIN_POINTS)
}

/// Single-pass reducer from frame magnitudes to fixed-count peaks.
#[derive(Debug)]
pub struct PeakAccumulator {
    peaks: Vec<f32>,
    window_len: usize,
    index: usize,
    filled: usize,
    current: f32,
}

impl PeakAccumulator {
    pub fn new(total_frames: u64, point_count: usize) -> Self {
        let window_len = (total_frames / point_count.max(1) as u64).max(1) as usize;
        Self {
            peaks: vec![0.0; point_count],
            window_len,
            index: 0,
            filled: 0,
            current: 0.0,
        }
    }

    pub fn window_len(&self) -> usize {
        self.window_len
    }

    /// Whether every window has been filled; further frames are ignored.
    pub fn is_full(&self) -> bool {
        self.index >= self.peaks.len()
    }

    pub fn push(&mut self, magnitudes: &[f32]) {
        for &m in magnitudes {
            if self.is_full() {
                return;
            }
            self.current = self.current.max(m.abs());
            self.filled += 1;
            if self.filled == self.window_len {
                self.peaks[self.index] = self.current;
                self.index += 1;
                self.filled = 0;
                self.current = 0.0;
            }
        }
    }

    /// Close a trailing partial window and return the peaks.
    pub fn finish(mut self) -> Vec<f32> {
        if self.filled > 0 && !self.is_full() {
            self.peaks[self.index] = self.current;
        }
        self.peaks
    }
}

/// Bounded pre-envelope for sources whose frame count is only known once decoding ends.
///
/// Frames are folded into blocks of `block_len` frames. When `cap` blocks are held, neighbours
/// are merged pairwise and `block_len` doubles. Until the first merge every block is one frame,
/// so short sources reduce exactly as [`PeakAccumulator`] would.
#[derive(Debug)]
pub struct PeakDecimator {
    blocks: Vec<f32>,
    block_len: u64,
    cap: usize,
    filled: u64,
    current: f32,
    frames: u64,
}

impl Default for PeakDecimator {
    fn default() -> Self {
        Self::new(MAX_PENDING_BLOCKS)
    }
}

impl PeakDecimator {
    /// `cap` is rounded up to an even count of at least two.
    pub fn new(cap: usize) -> Self {
        let cap = cap.max(2).next_multiple_of(2);
        Self {
            blocks: Vec::new(),
            block_len: 1,
            cap,
            filled: 0,
            current: 0.0,
            frames: 0,
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn block_len(&self) -> u64 {
        self.block_len
    }

    pub fn pending_blocks(&self) -> usize {
        self.blocks.len()
    }

    pub fn push(&mut self, magnitudes: &[f32]) {
        for &m in magnitudes {
            self.current = self.current.max(m.abs());
            self.filled += 1;
            self.frames += 1;
            if self.filled == self.block_len {
                self.blocks.push(self.current);
                self.filled = 0;
                self.current = 0.0;
                if self.blocks.len() >= self.cap {
                    self.merge_pairs();
                }
            }
        }
    }

    fn merge_pairs(&mut self) {
        self.blocks = self
            .blocks
            .chunks(2)
            .map(|pair| pair.iter().copied().fold(0.0, f32::max))
            .collect();
        self.block_len *= 2;
    }

    /// Re-window the blocks into the final envelope now that the length is known.
    pub fn finish(mut self, sample_rate: u32) -> WaveformEnvelope {
        if self.frames == 0 || sample_rate == 0 {
            return WaveformEnvelope::empty();
        }
        if self.filled > 0 {
            self.blocks.push(self.current);
        }

        let duration_seconds = self.frames as f64 / sample_rate as f64;
        let points = point_count(duration_seconds);
        let window_len = (self.frames / points as u64).max(1);

        // A block longer than a window lends its peak to every window it overlaps.
        let mut peaks = vec![0.0f32; points];
        for (i, &peak) in self.blocks.iter().enumerate() {
            let start = i as u64 * self.block_len;
            let end = (start + self.block_len).min(self.frames);
            let first = (start / window_len) as usize;
            let last = ((end - 1) / window_len) as usize;
            if first >= points {
                break;
            }
            for slot in &mut peaks[first..=last.min(points - 1)] {
                *slot = slot.max(peak);
            }
        }

        WaveformEnvelope {
            peaks,
            duration_seconds,
        }
    }
}

/// Reduce in-memory frame magnitudes (or mono samples) to an envelope.
pub fn extract_from_frames(frames: &[f32], sample_rate: u32) -> WaveformEnvelope {
    if frames.is_empty() || sample_rate == 0 {
        return WaveformEnvelope::empty();
    }

    let duration_seconds = frames.len() as f64 / sample_rate as f64;
    let mut acc = PeakAccumulator::new(frames.len() as u64, point_count(duration_seconds));
    acc.push(frames);

    WaveformEnvelope {
        peaks: acc.finish(),
        duration_seconds,
    }
}

/// Decode `path` and reduce it to an envelope. Any failure yields the empty envelope.
pub fn extract_file(path: &Path) -> WaveformEnvelope {
    if !path.is_file() {
        warn!(path = %path.display(), "waveform source missing");
        return WaveformEnvelope::empty();
    }

    let mut sink = EnvelopeSink::default();
    if let Err(err) = decode_file(path, DecodeOpts::default(), &mut sink) {
        warn!(path = %path.display(), error = %format!("{err:#}"), "waveform extraction failed");
        return WaveformEnvelope::empty();
    }

    let envelope = sink.finish();
    debug!(
        path = %path.display(),
        points = envelope.peaks().len(),
        duration_seconds = envelope.duration_seconds(),
        "waveform extracted"
    );
    envelope
}

/// Decode an unseekable stream (stdin, a pipe) and reduce it to an envelope.
///
/// `hint_extension` helps probing when the stream carries no usable magic bytes. Containers
/// that need seeking (MP4 with a trailing `moov`) come back empty; use [`extract_file`].
pub fn extract_reader<R>(reader: R, hint_extension: Option<&str>) -> WaveformEnvelope
where
    R: Read + Send + 'static,
{
    let opts = DecodeOpts {
        hint_extension: hint_extension.map(str::to_ascii_lowercase),
        ..DecodeOpts::default()
    };

    let mut sink = EnvelopeSink::default();
    if let Err(err) = decode_to_stream_from_read(reader, opts, &mut sink) {
        warn!(error = %format!("{err:#}"), "waveform extraction from stream failed");
        return WaveformEnvelope::empty();
    }

    let envelope = sink.finish();
    debug!(points = envelope.peaks().len(), "waveform extracted from stream");
    envelope
}

/// Streams into a [`PeakAccumulator`] when the frame count is declared up front, otherwise
/// into a [`PeakDecimator`].
#[derive(Default)]
struct EnvelopeSink {
    info: Option<StreamInfo>,
    streaming: Option<PeakAccumulator>,
    pending: PeakDecimator,
    frames_seen: u64,
}

impl EnvelopeSink {
    fn finish(self) -> WaveformEnvelope {
        let Some(info) = self.info else {
            return WaveformEnvelope::empty();
        };
        if self.frames_seen == 0 || info.sample_rate == 0 {
            return WaveformEnvelope::empty();
        }

        match self.streaming {
            Some(acc) => WaveformEnvelope {
                peaks: acc.finish(),
                duration_seconds: info
                    .duration_seconds()
                    .unwrap_or(self.frames_seen as f64 / info.sample_rate as f64),
            },
            None => self.pending.finish(info.sample_rate),
        }
    }
}

impl FrameSink for EnvelopeSink {
    fn on_stream_info(&mut self, info: &StreamInfo) -> anyhow::Result<()> {
        if let (Some(n_frames), Some(duration)) = (info.n_frames, info.duration_seconds()) {
            if n_frames > 0 {
                self.streaming = Some(PeakAccumulator::new(n_frames, point_count(duration)));
            }
        }
        self.info = Some(*info);
        Ok(())
    }

    fn on_frames(&mut self, magnitudes: &[f32]) -> anyhow::Result<bool> {
        self.frames_seen += magnitudes.len() as u64;
        match self.streaming.as_mut() {
            Some(acc) => {
                acc.push(magnitudes);
                Ok(!acc.is_full())
            }
            None => {
                self.pending.push(magnitudes);
                Ok(true)
            }
        }
    }
}
