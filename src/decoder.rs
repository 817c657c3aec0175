// src/decoder.rs

//! Stream-decode media into per-frame peak magnitudes, emitting fixed-size chunks via a sink.
//!
//! This module is orchestration only:
//! - `demux` handles probing + packet iteration
//! - `decode` handles codec decoding
//! - `audio_pipeline` folds PCM frames to magnitudes + chunking
//!
//! Two entry points:
//! - [`decode_file`] opens a seekable file (works with every container layout Symphonia reads)
//! - [`decode_to_stream_from_read`] accepts any unseekable `Read` (stdin, pipes)

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use symphonia::core::io::{MediaSource, ReadOnlySource};

use crate::audio_pipeline::AudioPipeline;
use crate::decode::{decode_packet_and_then, make_decoder_for_track};
use crate::demux::{StreamInfo, next_packet, probe_source_and_pick_default_track, stream_info};

/// Consumer of decoded frame magnitudes.
pub trait FrameSink {
    /// Called once, after probing and before any frames.
    fn on_stream_info(&mut self, _info: &StreamInfo) -> Result<()> {
        Ok(())
    }

    /// Receive per-frame peak magnitudes in `[0, 1]` (for well-formed input).
    ///
    /// Returning `Ok(false)` signals "stop decoding early".
    fn on_frames(&mut self, magnitudes: &[f32]) -> Result<bool>;
}

/// Streaming decode configuration.
#[derive(Debug, Clone)]
pub struct DecodeOpts {
    /// Number of frames handed to the sink per call.
    pub chunk_frames: usize,

    /// Optional container hint (e.g. "wav", "mp3", "m4a", "flac", "ogg").
    pub hint_extension: Option<String>,
}

impl Default for DecodeOpts {
    fn default() -> Self {
        Self {
            chunk_frames: 4096,
            hint_extension: None,
        }
    }
}

/// Decode a file on disk. The file extension is used as a probe hint unless one is given.
pub fn decode_file(path: &Path, mut opts: DecodeOpts, sink: &mut dyn FrameSink) -> Result<()> {
    let file = File::open(path).with_context(|| format!("failed to open '{}'", path.display()))?;

    if opts.hint_extension.is_none() {
        opts.hint_extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
    }

    decode_impl(Box::new(file), opts, sink)
}

/// Decode an unseekable input stream.
///
/// Some container layouts (notably MP4/M4A with the `moov` atom at the end) need seeking and
/// fail in this mode; use [`decode_file`] for those.
pub fn decode_to_stream_from_read<R>(
    reader: R,
    opts: DecodeOpts,
    sink: &mut dyn FrameSink,
) -> Result<()>
where
    R: Read + Send + 'static,
{
    // `MediaSource` requires `Sync`; the reader is only ever moved, so a mutex supplies it.
    let source = ReadOnlySource::new(LockedRead::new(reader));
    decode_impl(Box::new(source), opts, sink)
}

fn decode_impl(
    source: Box<dyn MediaSource>,
    opts: DecodeOpts,
    sink: &mut dyn FrameSink,
) -> Result<()> {
    let (mut format, track) =
        probe_source_and_pick_default_track(source, opts.hint_extension.as_deref())?;

    sink.on_stream_info(&stream_info(&track))?;

    let mut decoder = make_decoder_for_track(&track)?;
    let mut pipeline = AudioPipeline::new();

    while let Some(packet) = next_packet(&mut format)? {
        // Ignore packets from other tracks.
        if packet.track_id() != track.id {
            continue;
        }

        let verdict = decode_packet_and_then(&mut decoder, &packet, |decoded| {
            pipeline
                .push_decoded_and_emit(&decoded, opts.chunk_frames, |chunk| sink.on_frames(chunk))
                .context("audio pipeline failed while processing decoded samples")
        })?;

        if verdict == Some(false) {
            break;
        }
    }

    Ok(())
}

struct LockedRead<R> {
    inner: Mutex<R>,
}

impl<R> LockedRead<R> {
    fn new(inner: R) -> Self {
        Self {
            inner: Mutex::new(inner),
        }
    }
}

impl<R: Read> Read for LockedRead<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner
            .get_mut()
            .map_err(|_| std::io::Error::other("decoder input mutex poisoned"))?
            .read(buf)
    }
}
