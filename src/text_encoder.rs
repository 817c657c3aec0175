use std::io::Write;

use crate::segment_encoder::SegmentEncoder;
use crate::segments::Segment;
use crate::timestamp::format_clock;
use crate::{Error, Result};

/// A `SegmentEncoder` producing a readable plain-text transcript.
///
/// Each entry is a `[Speaker | hh:mm:ss - hh:mm:ss]` header (the speaker part is dropped when
/// blank) followed by the trimmed text and a blank line. Output is buffered until `close` so
/// trailing whitespace of the whole document can be trimmed.
pub struct TextEncoder<W: Write> {
    w: W,
    buf: String,
    closed: bool,
}

impl<W: Write> TextEncoder<W> {
    pub fn new(w: W) -> Self {
        Self {
            w,
            buf: String::new(),
            closed: false,
        }
    }
}

impl<W: Write> SegmentEncoder for TextEncoder<W> {
    fn write_segment(&mut self, seg: &Segment) -> Result<()> {
        if self.closed {
            return Err(Error::msg("cannot write segment: encoder is already closed"));
        }

        let start = format_clock(seg.start());
        let end = format_clock(seg.end());
        let speaker = seg.speaker().trim();
        if speaker.is_empty() {
            self.buf.push_str(&format!("[{start} - {end}]\n"));
        } else {
            self.buf.push_str(&format!("[{speaker} | {start} - {end}]\n"));
        }
        self.buf.push_str(seg.text().trim());
        self.buf.push_str("\n\n");
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.w.write_all(self.buf.trim_end().as_bytes())?;
        self.w.flush()?;
        self.buf.clear();
        self.closed = true;
        Ok(())
    }
}
