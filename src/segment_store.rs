//! Ordered collection of segments.
//!
//! Insertion order is timeline order. The store never re-sorts: operations that mutate it
//! keep the order by construction (split inserts right after the original, merge removes the
//! following element), but arbitrary edits to bounds can leave it out of order. Callers that
//! need the stronger guarantee check [`SegmentStore::is_sorted`].
//!
//! Every document mutation is recorded as a [`StoreChange`]; the engine drains these to
//! drive dirty tracking. Toggling the transient active flag is not a change.

use tracing::debug;

use crate::segments::{DEFAULT_SEGMENT_SECONDS, Segment, SegmentId};
use crate::{Error, Result};

/// A document mutation performed by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreChange {
    Inserted(SegmentId),
    Removed(SegmentId),
    Split { original: SegmentId, created: SegmentId },
    Merged { kept: SegmentId, absorbed: SegmentId },
    Edited(SegmentId),
    Replaced,
    Cleared,
}

impl StoreChange {
    /// Human-readable reason, used for status display.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Inserted(_) => "Segment added",
            Self::Removed(_) => "Segment removed",
            Self::Split { .. } => "Segment split",
            Self::Merged { .. } => "Segments merged",
            Self::Edited(_) => "Edits pending",
            Self::Replaced => "Session loaded",
            Self::Cleared => "Document cleared",
        }
    }
}

#[derive(Debug, Default)]
pub struct SegmentStore {
    segments: Vec<Segment>,
    changes: Vec<StoreChange>,
}

impl SegmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding one zero-length placeholder, as every open document must.
    pub fn with_placeholder() -> Self {
        Self {
            segments: vec![Segment::placeholder()],
            changes: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter()
    }

    pub fn as_slice(&self) -> &[Segment] {
        &self.segments
    }

    pub fn get(&self, id: SegmentId) -> Option<&Segment> {
        self.segments.iter().find(|s| s.id() == id)
    }

    pub fn index_of(&self, id: SegmentId) -> Option<usize> {
        self.segments.iter().position(|s| s.id() == id)
    }

    pub fn first(&self) -> Option<&Segment> {
        self.segments.first()
    }

    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// Append a segment of the default length starting at `position`.
    ///
    /// Negative positions clamp to zero.
    pub fn insert_at(
        &mut self,
        position: f64,
        speaker: Option<&str>,
        text: Option<&str>,
    ) -> &Segment {
        let mut seg = Segment::new(position, 0.0);
        seg.set_end(seg.start() + DEFAULT_SEGMENT_SECONDS);
        if let Some(speaker) = speaker {
            seg.set_speaker(speaker);
        }
        if let Some(text) = text {
            seg.set_text(text);
        }
        self.push(seg)
    }

    /// Append an existing segment.
    pub fn push(&mut self, mut seg: Segment) -> &Segment {
        seg.set_active(false);
        self.changes.push(StoreChange::Inserted(seg.id()));
        self.segments.push(seg);
        let last = self.segments.len() - 1;
        &self.segments[last]
    }

    /// Remove a segment. No-op when absent.
    pub fn remove(&mut self, id: SegmentId) -> Option<Segment> {
        let idx = self.index_of(id)?;
        self.changes.push(StoreChange::Removed(id));
        Some(self.segments.remove(idx))
    }

    /// Split a segment at `at`, which must lie strictly inside it.
    ///
    /// The original keeps `[start, at)` and a new segment `[at, end)` with the same speaker
    /// and empty text is inserted right after it. Returns `(original, created)`.
    pub fn split(&mut self, id: SegmentId, at: f64) -> Result<(SegmentId, SegmentId)> {
        let idx = self.index_of(id).ok_or(Error::SegmentNotFound)?;
        let original = &self.segments[idx];
        if !(original.start() < at && at < original.end()) {
            return Err(Error::InvalidSplitPoint {
                at,
                start: original.start(),
                end: original.end(),
            });
        }

        let created = Segment::new(at, original.end()).with_speaker(original.speaker());
        let created_id = created.id();

        self.segments[idx].set_end(at);
        self.segments.insert(idx + 1, created);
        self.changes.push(StoreChange::Split {
            original: id,
            created: created_id,
        });
        debug!(at, index = idx, "segment split");

        Ok((id, created_id))
    }

    /// Absorb the following segment into `id`.
    ///
    /// No-op when `id` is absent or last. Returns the id of the absorbed segment.
    pub fn merge_with_next(&mut self, id: SegmentId) -> Option<SegmentId> {
        let idx = self.index_of(id)?;
        if idx + 1 >= self.segments.len() {
            return None;
        }

        let next = self.segments.remove(idx + 1);
        let kept = &mut self.segments[idx];
        kept.set_end(next.end());
        let merged = format!("{}\n{}", kept.text(), next.text());
        kept.set_text(merged.trim());

        self.changes.push(StoreChange::Merged {
            kept: id,
            absorbed: next.id(),
        });
        Some(next.id())
    }

    /// First segment whose inclusive `[start, end]` range contains `position`.
    ///
    /// When two segments touch at a shared boundary, the earlier one in sequence wins.
    pub fn active_for(&self, position: f64) -> Option<&Segment> {
        self.segments.iter().find(|s| s.contains(position))
    }

    /// First segment (in sequence order) that starts strictly after `position`.
    pub fn next_starting_after(&self, position: f64) -> Option<&Segment> {
        self.segments.iter().find(|s| s.start() > position)
    }

    /// Apply an edit to one segment. Returns `false` when the segment is absent.
    pub fn update(&mut self, id: SegmentId, edit: impl FnOnce(&mut Segment)) -> bool {
        let Some(seg) = self.segments.iter_mut().find(|s| s.id() == id) else {
            return false;
        };
        edit(seg);
        self.changes.push(StoreChange::Edited(id));
        true
    }

    /// Replace the whole document, keeping at least one placeholder segment.
    pub fn replace_all(&mut self, mut segments: Vec<Segment>) {
        for seg in &mut segments {
            seg.set_active(false);
        }
        self.segments = segments;
        self.ensure_not_empty();
        self.changes.push(StoreChange::Replaced);
    }

    /// Drop every segment, leaving a single placeholder.
    pub fn clear(&mut self) {
        self.segments.clear();
        self.ensure_not_empty();
        self.changes.push(StoreChange::Cleared);
    }

    /// Insert the placeholder if the store is empty, without recording a change.
    ///
    /// Returns whether a placeholder was inserted.
    pub fn ensure_placeholder(&mut self) -> bool {
        let was_empty = self.segments.is_empty();
        self.ensure_not_empty();
        was_empty
    }

    /// Whether segment starts are non-decreasing in sequence order.
    pub fn is_sorted(&self) -> bool {
        self.segments.windows(2).all(|w| w[0].start() <= w[1].start())
    }

    /// Drain the changes recorded since the last call.
    pub fn drain_changes(&mut self) -> Vec<StoreChange> {
        std::mem::take(&mut self.changes)
    }

    pub(crate) fn set_active(&mut self, id: SegmentId, active: bool) {
        if let Some(seg) = self.segments.iter_mut().find(|s| s.id() == id) {
            seg.set_active(active);
        }
    }

    fn ensure_not_empty(&mut self) {
        if self.segments.is_empty() {
            self.segments.push(Segment::placeholder());
        }
    }
}
