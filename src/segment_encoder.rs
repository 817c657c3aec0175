use crate::Result;
use crate::segments::Segment;

/// Streams segments into some output format, one at a time.
pub trait SegmentEncoder {
    fn write_segment(&mut self, seg: &Segment) -> Result<()>;

    /// Finish the output. Idempotent; writes after close fail.
    fn close(&mut self) -> Result<()>;
}
