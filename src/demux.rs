// src/demux.rs

//! Container probing for Symphonia.
//!
//! Responsibilities:
//! - Probe a `MediaSource` and select the audio track to analyse
//! - Describe that track (`StreamInfo`) so the waveform pass can size its windows up front
//! - Provide a `next_packet` helper that treats IO errors as end-of-stream

use anyhow::{Context, Result, anyhow};
use symphonia::core::codecs::CODEC_TYPE_NULL;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, Packet, Track};
use symphonia::core::io::{MediaSource, MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// What we know about the selected audio track before decoding it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamInfo {
    pub sample_rate: u32,
    pub channels: usize,

    /// Total frame count when the container declares it.
    pub n_frames: Option<u64>,
}

impl StreamInfo {
    /// Declared duration in seconds, when the frame count is known.
    pub fn duration_seconds(&self) -> Option<f64> {
        match (self.n_frames, self.sample_rate) {
            (Some(n), rate) if rate > 0 => Some(n as f64 / rate as f64),
            _ => None,
        }
    }
}

/// Probe the container and pick the first decodable audio track with a known sample rate.
///
/// `hint_extension` improves probe accuracy for ambiguous inputs (e.g. "mp3", "m4a", "ogg").
pub fn probe_source_and_pick_default_track(
    source: Box<dyn MediaSource>,
    hint_extension: Option<&str>,
) -> Result<(Box<dyn FormatReader>, Track)> {
    let mss_opts = MediaSourceStreamOptions {
        // Symphonia expects a power-of-two buffer > 32KiB for good probing behavior.
        buffer_len: 256 * 1024,
    };

    let mss = MediaSourceStream::new(source, mss_opts);

    let mut hint = Hint::new();
    if let Some(ext) = hint_extension {
        hint.with_extension(ext);
    }

    let format_opts: FormatOptions = Default::default();
    let metadata_opts: MetadataOptions = Default::default();

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &format_opts, &metadata_opts)
        .map_err(|e| anyhow!(e))
        .context("failed to probe media stream")?;

    let format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL && t.codec_params.sample_rate.is_some())
        .cloned()
        .ok_or_else(|| anyhow!("no audio track found"))?;

    Ok((format, track))
}

/// Describe a probed track.
pub fn stream_info(track: &Track) -> StreamInfo {
    let params = &track.codec_params;
    StreamInfo {
        sample_rate: params.sample_rate.unwrap_or(0),
        channels: params.channels.map(|c| c.count()).unwrap_or(0),
        n_frames: params.n_frames,
    }
}

/// Read the next packet, treating IO errors as "end of stream".
pub fn next_packet(format: &mut Box<dyn FormatReader>) -> Result<Option<Packet>> {
    match format.next_packet() {
        Ok(p) => Ok(Some(p)),
        Err(SymphoniaError::IoError(_)) => Ok(None),
        Err(e) => Err(anyhow!(e)).context("failed reading packet"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_requires_frames_and_rate() {
        let info = StreamInfo {
            sample_rate: 8_000,
            channels: 1,
            n_frames: Some(16_000),
        };
        assert_eq!(info.duration_seconds(), Some(2.0));

        let unknown = StreamInfo { n_frames: None, ..info };
        assert_eq!(unknown.duration_seconds(), None);

        let no_rate = StreamInfo { sample_rate: 0, ..info };
        assert_eq!(no_rate.duration_seconds(), None);
    }
}
