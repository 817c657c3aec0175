use scriptsync::export::write_segments;
use scriptsync::output_type::OutputType;
use scriptsync::segments::Segment;
use scriptsync::srt::{parse_srt, read_srt};

#[test]
fn srt_export_then_import_keeps_millisecond_timing() -> anyhow::Result<()> {
    let original = vec![
        Segment::new(0.0, 1.234).with_text("first cue"),
        Segment::new(61.5, 3599.999).with_text("second\nspans lines"),
        Segment::new(3600.0, 3725.007).with_text("third"),
    ];

    let mut out = Vec::new();
    write_segments(&mut out, &original, "", OutputType::Srt)?;
    let parsed = parse_srt(std::str::from_utf8(&out)?);

    assert_eq!(parsed.len(), original.len());
    for (a, b) in original.iter().zip(&parsed) {
        assert!((a.start() - b.start()).abs() < 5e-4, "{} vs {}", a.start(), b.start());
        assert!((a.end() - b.end()).abs() < 5e-4, "{} vs {}", a.end(), b.end());
        assert_eq!(a.text(), b.text());
    }
    Ok(())
}

#[test]
fn malformed_timestamps_import_as_zero() {
    let parsed = parse_srt("1\n00:00:xx,000 --> 00:00:04,000\nstill here\n");
    assert_eq!(parsed.len(), 1);
    assert_eq!(parsed[0].start(), 0.0);
    assert_eq!(parsed[0].end(), 4.0);
    assert_eq!(parsed[0].text(), "still here");
}

#[test]
fn inverted_cues_are_repaired_on_import() {
    let parsed = parse_srt("00:00:05,000 --> 00:00:02,000\nbackwards\n");
    assert_eq!(parsed[0].start(), 5.0);
    assert_eq!(parsed[0].end(), 5.0);
}

#[test]
fn read_srt_reports_missing_files() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    assert!(read_srt(&dir.path().join("missing.srt")).is_err());
    Ok(())
}

#[test]
fn vtt_export_uses_period_separator() -> anyhow::Result<()> {
    let mut out = Vec::new();
    write_segments(
        &mut out,
        &[Segment::new(1.5, 2.25).with_text(" padded ")],
        "",
        OutputType::Vtt,
    )?;
    assert_eq!(
        std::str::from_utf8(&out)?,
        "WEBVTT\n\n00:00:01.500 --> 00:00:02.250\npadded\n\n"
    );
    Ok(())
}
