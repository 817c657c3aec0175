//! Frame-magnitude pipeline for waveform analysis.
//!
//! Responsibilities:
//! - Convert Symphonia-decoded PCM into interleaved `f32`
//! - Collapse each frame to its peak magnitude across channels
//! - Emit fixed-size chunks of magnitudes via a callback (incremental consumption)
//!
//! Folding by peak rather than averaging keeps out-of-phase channels from cancelling out,
//! which matters for a display envelope.

use anyhow::{Result, anyhow, bail};
use symphonia::core::audio::{AudioBufferRef, SampleBuffer};

/// A small stateful pipeline that converts decoded audio into per-frame magnitudes.
#[derive(Default)]
pub struct AudioPipeline {
    // Scratch buffer used to copy decoded PCM into an interleaved `Vec<f32>`.
    sample_buf_f32: Option<SampleBuffer<f32>>,

    // Reusable output buffer of per-frame magnitudes.
    frame_peaks: Vec<f32>,
}

impl AudioPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a decoded Symphonia buffer through the pipeline and emit frame magnitudes.
    ///
    /// Returning `Ok(false)` from `emit` signals "stop early"; the return value reports
    /// whether the caller should keep decoding.
    pub fn push_decoded_and_emit(
        &mut self,
        decoded: &AudioBufferRef<'_>,
        chunk_frames: usize,
        mut emit: impl FnMut(&[f32]) -> Result<bool>,
    ) -> Result<bool> {
        let channels = decoded.spec().channels.count();
        if channels == 0 {
            bail!("decoded audio had zero channels");
        }

        ensure_sample_buffer(decoded, &mut self.sample_buf_f32);
        let buf = self
            .sample_buf_f32
            .as_mut()
            .ok_or_else(|| anyhow!("sample buffer not initialized"))?;
        buf.copy_interleaved_ref(decoded.clone());

        fold_frames_to_peaks(buf.samples(), channels, &mut self.frame_peaks);
        emit_chunks(&self.frame_peaks, chunk_frames, &mut emit)
    }
}

fn ensure_sample_buffer(
    decoded: &AudioBufferRef<'_>,
    sample_buf_f32: &mut Option<SampleBuffer<f32>>,
) {
    let needed = decoded.capacity() * decoded.spec().channels.count();
    if let Some(buf) = sample_buf_f32.as_ref() {
        if buf.capacity() >= needed {
            return;
        }
    }

    let spec = *decoded.spec();
    *sample_buf_f32 = Some(SampleBuffer::<f32>::new(decoded.capacity() as u64, spec));
}

/// Replace `out` with the peak absolute value of each interleaved frame.
fn fold_frames_to_peaks(interleaved: &[f32], channels: usize, out: &mut Vec<f32>) {
    out.clear();
    out.extend(
        interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().fold(0.0f32, |acc, s| acc.max(s.abs()))),
    );
}

fn emit_chunks(
    frames: &[f32],
    chunk_frames: usize,
    emit: &mut impl FnMut(&[f32]) -> Result<bool>,
) -> Result<bool> {
    for chunk in frames.chunks(chunk_frames.max(1)) {
        if !emit(chunk)? {
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fold_single_channel_is_abs() {
        let mut out = Vec::new();
        fold_frames_to_peaks(&[0.5, -0.25, 0.0], 1, &mut out);
        assert_eq!(out, vec![0.5, 0.25, 0.0]);
    }

    #[test]
    fn fold_takes_loudest_channel_per_frame() {
        // Two stereo frames: (L=0.1, R=-0.9), (L=0.4, R=0.2)
        let mut out = Vec::new();
        fold_frames_to_peaks(&[0.1, -0.9, 0.4, 0.2], 2, &mut out);
        assert_eq!(out, vec![0.9, 0.4]);
    }

    #[test]
    fn fold_drops_incomplete_trailing_frame() {
        let mut out = Vec::new();
        fold_frames_to_peaks(&[0.1, 0.2, 0.3], 2, &mut out);
        assert_eq!(out, vec![0.2]);
    }

    #[test]
    fn emit_chunks_respects_early_stop() -> anyhow::Result<()> {
        let mut seen = Vec::new();
        let frames = vec![1.0; 10];
        let keep_going = emit_chunks(&frames, 4, &mut |chunk| {
            seen.push(chunk.len());
            Ok(false)
        })?;

        assert!(!keep_going);
        assert_eq!(seen, vec![4]);
        Ok(())
    }
}
