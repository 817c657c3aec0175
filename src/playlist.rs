//! Ordered list of audio sources with a current entry.

use std::path::{Path, PathBuf};

/// Extensions accepted from drag-and-drop style bulk adds (lowercase, no dot).
pub const SUPPORTED_EXTENSIONS: &[&str] = &["mp3", "wav", "m4a", "flac", "ogg"];

/// Whether `path` has one of [`SUPPORTED_EXTENSIONS`], case-insensitively.
pub fn is_supported_audio(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
        .unwrap_or(false)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Playlist {
    entries: Vec<PathBuf>,
    current: Option<usize>,
}

impl Playlist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.iter().any(|p| p == path)
    }

    /// Index of the entry currently loaded, if any.
    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current(&self) -> Option<&Path> {
        self.current.and_then(|i| self.entries.get(i)).map(PathBuf::as_path)
    }

    /// Append `path` unless already present. Returns whether it was added.
    pub fn add(&mut self, path: impl Into<PathBuf>) -> bool {
        let path = path.into();
        if self.contains(&path) {
            return false;
        }
        self.entries.push(path);
        true
    }

    /// Remove `path`, keeping the current entry pointing at the same source where possible.
    pub fn remove(&mut self, path: &Path) -> bool {
        let Some(idx) = self.entries.iter().position(|p| p == path) else {
            return false;
        };
        self.entries.remove(idx);
        self.current = match self.current {
            Some(cur) if cur == idx => None,
            Some(cur) if cur > idx => Some(cur - 1),
            other => other,
        };
        true
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.current = None;
    }

    /// Make `index` current. Returns the selected path, or `None` when out of range or
    /// already current.
    pub fn select(&mut self, index: usize) -> Option<&Path> {
        if index >= self.entries.len() || self.current == Some(index) {
            return None;
        }
        self.current = Some(index);
        Some(&self.entries[index])
    }

    /// Advance to the entry after the current one, if it exists.
    pub fn advance(&mut self) -> Option<&Path> {
        let next = self.current.map_or(0, |i| i + 1);
        self.select(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicates_are_suppressed() {
        let mut list = Playlist::new();
        assert!(list.add("a.wav"));
        assert!(!list.add("a.wav"));
        assert!(list.add("b.wav"));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn advance_walks_forward_and_stops_at_end() {
        let mut list = Playlist::new();
        list.add("a.wav");
        list.add("b.wav");
        assert_eq!(list.advance(), Some(Path::new("a.wav")));
        assert_eq!(list.advance(), Some(Path::new("b.wav")));
        assert_eq!(list.advance(), None);
        assert_eq!(list.current_index(), Some(1));
    }

    #[test]
    fn select_rejects_out_of_range_and_current() {
        let mut list = Playlist::new();
        list.add("a.wav");
        assert_eq!(list.select(3), None);
        assert!(list.select(0).is_some());
        assert_eq!(list.select(0), None);
    }

    #[test]
    fn remove_shifts_current_index() {
        let mut list = Playlist::new();
        for p in ["a.wav", "b.wav", "c.wav"] {
            list.add(p);
        }
        list.select(2);
        assert!(list.remove(Path::new("a.wav")));
        assert_eq!(list.current(), Some(Path::new("c.wav")));

        assert!(list.remove(Path::new("c.wav")));
        assert_eq!(list.current(), None);
        assert!(!list.remove(Path::new("zzz.wav")));
    }

    #[test]
    fn supported_extensions_ignore_case() {
        assert!(is_supported_audio(Path::new("talk.MP3")));
        assert!(is_supported_audio(Path::new("/x/y.flac")));
        assert!(!is_supported_audio(Path::new("notes.txt")));
        assert!(!is_supported_audio(Path::new("noext")));
    }
}
