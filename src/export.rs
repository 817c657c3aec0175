//! Writing a transcript out in one of the [`OutputType`] formats.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::{info, warn};

use crate::Result;
use crate::output_type::OutputType;
use crate::segment_encoder::SegmentEncoder;
use crate::segments::Segment;
use crate::session::Session;
use crate::srt::SrtEncoder;
use crate::text_encoder::TextEncoder;
use crate::vtt_encoder::VttEncoder;

/// Encode `segments` into `w`.
///
/// `audio_file` is only used by [`OutputType::Session`].
pub fn write_segments<W: Write>(
    w: W,
    segments: &[Segment],
    audio_file: &str,
    output_type: OutputType,
) -> Result<()> {
    match output_type {
        OutputType::Srt => encode_all(SrtEncoder::new(w), segments),
        OutputType::Vtt => encode_all(VttEncoder::new(w), segments),
        OutputType::Text => encode_all(TextEncoder::new(w), segments),
        OutputType::Session => {
            let mut w = w;
            let session = Session::new(audio_file, segments.to_vec());
            serde_json::to_writer_pretty(&mut w, &session)?;
            w.flush()?;
            Ok(())
        }
    }
}

/// Export to a file. Sessions go through the atomic session writer.
pub fn export_to_path(
    path: &Path,
    segments: &[Segment],
    audio_file: &str,
    output_type: OutputType,
) -> Result<()> {
    if output_type == OutputType::Session {
        Session::new(audio_file, segments.to_vec()).save(path)?;
    } else {
        let file = File::create(path)?;
        write_segments(BufWriter::new(file), segments, audio_file, output_type)?;
    }

    info!(path = %path.display(), format = output_type.extension(), "transcript exported");
    Ok(())
}

fn encode_all<E: SegmentEncoder>(mut encoder: E, segments: &[Segment]) -> Result<()> {
    let run_res = segments
        .iter()
        .try_for_each(|seg| encoder.write_segment(seg));
    merge_run_and_close(run_res, encoder.close())
}

fn merge_run_and_close(run_res: Result<()>, close_res: Result<()>) -> Result<()> {
    match (run_res, close_res) {
        (Ok(()), Ok(())) => Ok(()),
        (Ok(()), Err(close_err)) => Err(close_err),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(close_err)) => {
            warn!(error = %close_err, "encoder close failed after write error");
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Segment> {
        vec![
            Segment::new(0.0, 1.0).with_speaker("A").with_text("first"),
            Segment::new(1.0, 2.0).with_text("second"),
        ]
    }

    #[test]
    fn writes_each_format() -> anyhow::Result<()> {
        let segs = sample();

        let mut srt = Vec::new();
        write_segments(&mut srt, &segs, "", OutputType::Srt)?;
        assert!(std::str::from_utf8(&srt)?.starts_with("1\n00:00:00,000 --> 00:00:01,000\nfirst"));

        let mut vtt = Vec::new();
        write_segments(&mut vtt, &segs, "", OutputType::Vtt)?;
        assert!(std::str::from_utf8(&vtt)?.starts_with("WEBVTT\n\n"));

        let mut txt = Vec::new();
        write_segments(&mut txt, &segs, "", OutputType::Text)?;
        assert!(std::str::from_utf8(&txt)?.ends_with("[00:00:01 - 00:00:02]\nsecond"));

        let mut json = Vec::new();
        write_segments(&mut json, &segs, "a.wav", OutputType::Session)?;
        let session: Session = serde_json::from_slice(&json)?;
        assert_eq!(session.audio_file, "a.wav");
        assert_eq!(session.segments.len(), 2);
        Ok(())
    }

    #[test]
    fn exports_to_file() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("out.vtt");
        export_to_path(&path, &sample(), "", OutputType::Vtt)?;
        let written = std::fs::read_to_string(&path)?;
        assert!(written.contains("00:00:01.000 --> 00:00:02.000\nsecond\n"));
        Ok(())
    }
}
