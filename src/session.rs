//! The persisted session document and its on-disk handling.
//!
//! ```json
//! {
//!   "audioFile": "/path/to/interview.mp3",
//!   "segments": [
//!     { "start": 0.0, "end": 2.0, "speaker": "Speaker 1", "text": "hello", "flags": [] }
//!   ]
//! }
//! ```
//!
//! Saves are atomic: the document is written to a temp file next to the destination and then
//! renamed over it, so a crash mid-write never leaves a truncated session behind.

use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::Result;
use crate::segments::Segment;
use crate::srt::read_srt;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Session {
    pub audio_file: String,
    pub segments: Vec<Segment>,
}

impl Session {
    pub fn new(audio_file: impl Into<String>, segments: Vec<Segment>) -> Self {
        Self {
            audio_file: audio_file.into(),
            segments,
        }
    }

    /// Audio path, if one is recorded.
    pub fn audio_path(&self) -> Option<&Path> {
        let trimmed = self.audio_file.trim();
        (!trimmed.is_empty()).then(|| Path::new(trimmed))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let session: Session = serde_json::from_str(&contents)?;
        debug!(path = %path.display(), segments = session.segments.len(), "session loaded");
        Ok(session)
    }

    /// Atomically write the session to `path`, creating the parent directory if needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let tmp = NamedTempFile::new_in(dir)?;
        {
            let mut w = BufWriter::new(tmp.as_file());
            serde_json::to_writer_pretty(&mut w, self)?;
            w.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(path)?;

        debug!(path = %path.display(), segments = self.segments.len(), "session saved");
        Ok(())
    }
}

/// Open any supported transcript document.
///
/// `.json` is a session, `.srt` is imported cue by cue, and anything else is read as plain
/// text into a single zero-length segment.
pub fn open_document(path: &Path) -> Result<Session> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("json") => Session::load(path),
        Some("srt") => Ok(Session::new(String::new(), read_srt(path)?)),
        _ => {
            let text = std::fs::read_to_string(path)?;
            Ok(Session::new(
                String::new(),
                vec![Segment::placeholder().with_text(text)],
            ))
        }
    }
}
