use std::io::Write;

use crate::segment_encoder::SegmentEncoder;
use crate::segments::Segment;
use crate::timestamp::format_vtt;
use crate::{Error, Result};

/// A `SegmentEncoder` that writes segments in WebVTT format.
///
/// The `WEBVTT` header is written lazily, so closing an encoder that never saw a segment
/// still produces a valid (header-only) file.
pub struct VttEncoder<W: Write> {
    w: W,
    started: bool,
    closed: bool,
}

impl<W: Write> VttEncoder<W> {
    pub fn new(w: W) -> Self {
        Self {
            w,
            started: false,
            closed: false,
        }
    }

    fn start_if_needed(&mut self) -> Result<()> {
        if !self.started {
            self.w.write_all(b"WEBVTT\n\n")?;
            self.started = true;
        }
        Ok(())
    }
}

impl<W: Write> SegmentEncoder for VttEncoder<W> {
    fn write_segment(&mut self, seg: &Segment) -> Result<()> {
        if self.closed {
            return Err(Error::msg("cannot write segment: encoder is already closed"));
        }

        self.start_if_needed()?;

        writeln!(
            &mut self.w,
            "{} --> {}",
            format_vtt(seg.start()),
            format_vtt(seg.end())
        )?;
        writeln!(&mut self.w, "{}", seg.text().trim())?;
        writeln!(&mut self.w)?;

        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }

        self.start_if_needed()?;
        self.w.flush()?;
        self.closed = true;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vtt_close_without_segments_emits_header_only() -> anyhow::Result<()> {
        let mut out = Vec::new();
        let mut enc = VttEncoder::new(&mut out);
        enc.close()?;
        enc.close()?;
        assert_eq!(std::str::from_utf8(&out)?, "WEBVTT\n\n");
        Ok(())
    }

    #[test]
    fn vtt_writes_header_once_and_trims_cue_text() -> anyhow::Result<()> {
        let mut out = Vec::new();
        let mut enc = VttEncoder::new(&mut out);

        enc.write_segment(&Segment::new(0.0, 1.2345).with_text("  hello \n"))?;
        enc.write_segment(&Segment::new(61.2, 62.0).with_text("world"))?;
        enc.close()?;

        let s = std::str::from_utf8(&out)?;
        assert_eq!(
            s,
            concat!(
                "WEBVTT\n\n",
                "00:00:00.000 --> 00:00:01.235\nhello\n\n",
                "00:01:01.200 --> 00:01:02.000\nworld\n\n",
            )
        );
        Ok(())
    }

    #[test]
    fn vtt_write_after_close_errors() -> anyhow::Result<()> {
        let mut out = Vec::new();
        let mut enc = VttEncoder::new(&mut out);
        enc.close()?;
        let err = enc.write_segment(&Segment::new(0.0, 1.0)).unwrap_err();
        assert!(err.to_string().contains("already closed"));
        Ok(())
    }
}
