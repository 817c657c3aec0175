use std::cell::Cell;
use std::io::{Cursor, Read, Result as IoResult};

use hound::{SampleFormat, WavSpec, WavWriter};
use scriptsync::waveform::{MIN_POINTS, extract_reader};

/// A pipe-like reader: movable to another thread but not shareable.
struct PipeReader {
    inner: Cursor<Vec<u8>>,
    _not_sync: Cell<u8>,
}

impl PipeReader {
    fn new(bytes: Vec<u8>) -> Self {
        Self {
            inner: Cursor::new(bytes),
            _not_sync: Cell::new(0),
        }
    }
}

impl Read for PipeReader {
    fn read(&mut self, buf: &mut [u8]) -> IoResult<usize> {
        self.inner.read(buf)
    }
}

fn mono_wav(sample_rate: u32, samples: &[i16]) -> anyhow::Result<Vec<u8>> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    let mut writer = WavWriter::new(&mut cursor, spec)?;
    for sample in samples {
        writer.write_sample(*sample)?;
    }
    writer.finalize()?;
    Ok(cursor.into_inner())
}

#[test]
fn piped_wav_reduces_like_a_file() -> anyhow::Result<()> {
    // Two seconds at 4 kHz: quiet first half, loud second half.
    let samples: Vec<i16> = (0..8000).map(|i| if i < 4000 { 3277 } else { -16384 }).collect();
    let bytes = mono_wav(4000, &samples)?;

    let envelope = extract_reader(PipeReader::new(bytes), Some("WAV"));
    assert_eq!(envelope.peaks().len(), MIN_POINTS);
    assert!((envelope.duration_seconds() - 2.0).abs() < 1e-6);
    assert!((envelope.peaks()[0] - 0.1).abs() < 0.01);
    assert!((envelope.peaks()[MIN_POINTS - 1] - 0.5).abs() < 0.01);
    Ok(())
}

#[test]
fn unreadable_streams_are_empty() {
    assert!(extract_reader(PipeReader::new(Vec::new()), None).is_empty());
    assert!(extract_reader(PipeReader::new(b"not audio at all".to_vec()), Some("wav")).is_empty());
}
