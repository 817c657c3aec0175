//! Timed, speaker-attributed spans of transcript text.
//!
//! A [`Segment`] keeps `0 <= start <= end` at all times: every write goes through clamping
//! setters, including deserialization, so a malformed document is repaired on load rather
//! than rejected.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default length of a segment inserted at the playhead.
pub const DEFAULT_SEGMENT_SECONDS: f64 = 2.0;

/// Stable in-memory identity of a segment.
///
/// Ids are never persisted; a reloaded document gets fresh ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SegmentId(Uuid);

impl SegmentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SegmentId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "SegmentRecord", into = "SegmentRecord")]
pub struct Segment {
    id: SegmentId,
    start_seconds: f64,
    end_seconds: f64,
    speaker: String,
    body: String,
    flags: Vec<String>,
    active: bool,
}

impl Segment {
    /// Create a segment, clamping the bounds into a valid range.
    pub fn new(start_seconds: f64, end_seconds: f64) -> Self {
        let mut seg = Self {
            id: SegmentId::new(),
            start_seconds: 0.0,
            end_seconds: 0.0,
            speaker: String::new(),
            body: String::new(),
            flags: Vec::new(),
            active: false,
        };
        seg.set_start(start_seconds);
        seg.set_end(end_seconds);
        seg
    }

    /// A zero-length, empty segment at the origin.
    pub fn placeholder() -> Self {
        Self::new(0.0, 0.0)
    }

    pub fn with_speaker(mut self, speaker: impl Into<String>) -> Self {
        self.speaker = speaker.into();
        self
    }

    pub fn with_text(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn id(&self) -> SegmentId {
        self.id
    }

    pub fn start(&self) -> f64 {
        self.start_seconds
    }

    pub fn end(&self) -> f64 {
        self.end_seconds
    }

    pub fn duration(&self) -> f64 {
        self.end_seconds - self.start_seconds
    }

    pub fn speaker(&self) -> &str {
        &self.speaker
    }

    pub fn text(&self) -> &str {
        &self.body
    }

    pub fn flags(&self) -> &[String] {
        &self.flags
    }

    /// Whether the playback position currently falls inside this segment.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Set the start, pushing `end` forward if it would fall behind.
    pub fn set_start(&mut self, seconds: f64) {
        self.start_seconds = non_negative(seconds);
        if self.end_seconds < self.start_seconds {
            self.end_seconds = self.start_seconds;
        }
    }

    /// Set the end, clamping it to never precede `start`.
    pub fn set_end(&mut self, seconds: f64) {
        self.end_seconds = non_negative(seconds).max(self.start_seconds);
    }

    pub fn set_speaker(&mut self, speaker: impl Into<String>) {
        self.speaker = speaker.into();
    }

    pub fn set_text(&mut self, body: impl Into<String>) {
        self.body = body.into();
    }

    pub fn flags_mut(&mut self) -> &mut Vec<String> {
        &mut self.flags
    }

    /// Inclusive containment on both ends.
    pub fn contains(&self, seconds: f64) -> bool {
        seconds >= self.start_seconds && seconds <= self.end_seconds
    }

    // Transient; not a document edit.
    pub(crate) fn set_active(&mut self, active: bool) {
        self.active = active;
    }
}

fn non_negative(seconds: f64) -> f64 {
    if seconds.is_finite() { seconds.max(0.0) } else { 0.0 }
}

/// Wire shape of a segment inside a session document.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SegmentRecord {
    #[serde(default)]
    start: f64,
    #[serde(default)]
    end: f64,
    #[serde(default)]
    speaker: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    flags: Vec<String>,
}

impl From<SegmentRecord> for Segment {
    fn from(rec: SegmentRecord) -> Self {
        let mut seg = Segment::new(rec.start, rec.end);
        seg.speaker = rec.speaker;
        seg.body = rec.text;
        seg.flags = rec.flags;
        seg
    }
}

impl From<Segment> for SegmentRecord {
    fn from(seg: Segment) -> Self {
        Self {
            start: seg.start_seconds,
            end: seg.end_seconds,
            speaker: seg.speaker,
            text: seg.body,
            flags: seg.flags,
        }
    }
}
