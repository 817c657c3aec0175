// src/decode.rs

//! Codec-level helpers built on top of Symphonia.
//!
//! Keeps Symphonia's error model in one place so the waveform pass only sees three outcomes:
//! a decoded buffer, a skipped packet, or a fatal error.

use anyhow::{Context, Result, anyhow};
use symphonia::core::audio::AudioBufferRef;
use symphonia::core::codecs::{Decoder, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{Packet, Track};

/// Create a decoder for the given audio track using Symphonia's default codec registry.
pub fn make_decoder_for_track(track: &Track) -> Result<Box<dyn Decoder>> {
    let decoder_opts: DecoderOptions = Default::default();

    symphonia::default::get_codecs()
        .make(&track.codec_params, &decoder_opts)
        .map_err(|e| anyhow!(e))
        .context("failed to create decoder for audio track")
}

/// Decode a packet and hand the decoded buffer to `on_decoded`.
///
/// Return value semantics:
/// - `Ok(Some(keep_going))` → a buffer was decoded; `keep_going` is the callback's verdict
/// - `Ok(None)`             → packet skipped (corrupt frame or truncated input)
/// - `Err(_)`               → fatal decoder error
pub fn decode_packet_and_then(
    decoder: &mut Box<dyn Decoder>,
    packet: &Packet,
    on_decoded: impl FnOnce(AudioBufferRef<'_>) -> Result<bool>,
) -> Result<Option<bool>> {
    match decoder.decode(packet) {
        Ok(buf) => on_decoded(buf).map(Some),

        // Recoverable: corrupted frame, but decoding can continue.
        Err(SymphoniaError::DecodeError(_)) => Ok(None),

        // Truncated input: treat as a skipped packet; the demuxer will report end-of-stream.
        Err(SymphoniaError::IoError(_)) => Ok(None),

        Err(e) => Err(anyhow!(e)).context("decoder failure"),
    }
}
