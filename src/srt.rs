//! SubRip (`.srt`) export and import.
//!
//! Export numbers cues from 1 and writes `HH:MM:SS,mmm --> HH:MM:SS,mmm` timings with the
//! segment text (line endings normalized to `\n`). Import is lenient: the index line is
//! optional, blocks whose timing line has no `-->` are skipped, and malformed timestamps
//! read as zero.

use std::io::Write;
use std::path::Path;

use tracing::debug;

use crate::segment_encoder::SegmentEncoder;
use crate::segments::Segment;
use crate::timestamp::{format_srt, parse_srt_timestamp};
use crate::{Error, Result};

pub struct SrtEncoder<W: Write> {
    w: W,
    next_index: usize,
    closed: bool,
}

impl<W: Write> SrtEncoder<W> {
    pub fn new(w: W) -> Self {
        Self {
            w,
            next_index: 1,
            closed: false,
        }
    }
}

impl<W: Write> SegmentEncoder for SrtEncoder<W> {
    fn write_segment(&mut self, seg: &Segment) -> Result<()> {
        if self.closed {
            return Err(Error::msg("cannot write segment: encoder is already closed"));
        }

        writeln!(&mut self.w, "{}", self.next_index)?;
        writeln!(
            &mut self.w,
            "{} --> {}",
            format_srt(seg.start()),
            format_srt(seg.end())
        )?;
        writeln!(&mut self.w, "{}", normalize_line_endings(seg.text()))?;
        writeln!(&mut self.w)?;

        self.next_index += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.w.flush()?;
        self.closed = true;
        Ok(())
    }
}

fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Parse SubRip text into segments, in file order.
pub fn parse_srt(input: &str) -> Vec<Segment> {
    let lines: Vec<&str> = input.lines().collect();
    let mut segments = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i].trim();
        if line.is_empty() {
            i += 1;
            continue;
        }

        if line.parse::<i64>().is_ok() {
            i += 1;
            if i >= lines.len() {
                break;
            }
        }

        let timing = lines[i].trim();
        i += 1;
        let Some((start, end)) = timing.split_once("-->") else {
            debug!(line = timing, "skipping line without cue timing");
            continue;
        };

        let mut body: Vec<&str> = Vec::new();
        while i < lines.len() && !lines[i].trim().is_empty() {
            body.push(lines[i]);
            i += 1;
        }

        segments.push(
            Segment::new(parse_srt_timestamp(start), parse_srt_timestamp(end))
                .with_text(body.join("\n")),
        );
    }

    segments
}

/// Read and parse an `.srt` file.
pub fn read_srt(path: &Path) -> Result<Vec<Segment>> {
    let contents = std::fs::read_to_string(path)?;
    let segments = parse_srt(&contents);
    debug!(path = %path.display(), cues = segments.len(), "srt imported");
    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(segments: &[Segment]) -> anyhow::Result<String> {
        let mut out = Vec::new();
        let mut enc = SrtEncoder::new(&mut out);
        for seg in segments {
            enc.write_segment(seg)?;
        }
        enc.close()?;
        Ok(String::from_utf8(out)?)
    }

    #[test]
    fn encodes_numbered_cues() -> anyhow::Result<()> {
        let s = encode(&[
            Segment::new(0.0, 1.5).with_text("one"),
            Segment::new(3661.001, 3662.0).with_text("two\r\nlines"),
        ])?;
        assert_eq!(
            s,
            "1\n00:00:00,000 --> 00:00:01,500\none\n\n\
             2\n01:01:01,001 --> 01:01:02,000\ntwo\nlines\n\n"
        );
        Ok(())
    }

    #[test]
    fn parses_cues_with_and_without_index() {
        let input = "1\n00:00:01,000 --> 00:00:02,500\nhello\nthere\n\n\
                     00:00:03.000 --> 00:00:04.000\nno index\n";
        let segs = parse_srt(input);
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0].start(), 1.0);
        assert_eq!(segs[0].end(), 2.5);
        assert_eq!(segs[0].text(), "hello\nthere");
        assert_eq!(segs[1].start(), 3.0);
        assert_eq!(segs[1].text(), "no index");
    }

    #[test]
    fn skips_blocks_without_arrow_and_zeroes_bad_timestamps() {
        let input = "1\nnot a timing line\n\n2\nxx:yy --> 00:00:05,000\nkept\n";
        let segs = parse_srt(input);
        assert_eq!(segs.len(), 1);
        assert_eq!(segs[0].start(), 0.0);
        assert_eq!(segs[0].end(), 5.0);
        assert_eq!(segs[0].text(), "kept");
    }

    #[test]
    fn trailing_index_without_timing_is_ignored() {
        assert!(parse_srt("\n\n7\n").is_empty());
    }

    #[test]
    fn windows_line_endings_parse() {
        let segs = parse_srt("1\r\n00:00:01,000 --> 00:00:02,000\r\nhi\r\n\r\n");
        assert_eq!(segs.len(), 1);
        assert_eq!(segs[0].text(), "hi");
    }
}
