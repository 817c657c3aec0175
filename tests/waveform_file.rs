use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};
use scriptsync::waveform::{MIN_POINTS, extract_file};

fn write_wav(
    path: &Path,
    sample_rate: u32,
    channels: u16,
    frames: &[Vec<i16>],
) -> anyhow::Result<()> {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec)?;
    for frame in frames {
        for sample in frame {
            writer.write_sample(*sample)?;
        }
    }
    writer.finalize()?;
    Ok(())
}

#[test]
fn short_wav_gets_minimum_resolution() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("beep.wav");

    // One second of stereo at 8 kHz; the right channel is louder in the first half.
    let frames: Vec<Vec<i16>> = (0..8000)
        .map(|i| if i < 4000 { vec![1000, 16384] } else { vec![-8192, 0] })
        .collect();
    write_wav(&path, 8000, 2, &frames)?;

    let envelope = extract_file(&path);
    assert_eq!(envelope.peaks().len(), MIN_POINTS);
    assert!((envelope.duration_seconds() - 1.0).abs() < 1e-6);

    let first = envelope.peaks()[0];
    let last = envelope.peaks()[MIN_POINTS - 1];
    assert!((first - 0.5).abs() < 0.01, "first = {first}");
    assert!((last - 0.25).abs() < 0.01, "last = {last}");
    assert!(envelope.peaks().iter().all(|p| (0.0..=1.0).contains(p)));
    Ok(())
}

#[test]
fn two_minutes_yields_six_thousand_points() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("long.wav");
    let frames: Vec<Vec<i16>> = (0..120 * 1000).map(|_| vec![3000]).collect();
    write_wav(&path, 1000, 1, &frames)?;

    let envelope = extract_file(&path);
    assert_eq!(envelope.peaks().len(), 6000);
    Ok(())
}

#[test]
fn missing_or_garbage_sources_are_empty() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    assert!(extract_file(&dir.path().join("nope.wav")).is_empty());

    let garbage = dir.path().join("garbage.wav");
    std::fs::write(&garbage, b"definitely not audio")?;
    let envelope = extract_file(&garbage);
    assert!(envelope.is_empty());
    assert_eq!(envelope.duration_seconds(), 0.0);
    Ok(())
}
