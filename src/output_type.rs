use std::path::Path;

/// The formats a transcript can be exported to.
///
/// With the `cli` feature this doubles as a `clap` value enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum OutputType {
    /// SubRip subtitles.
    Srt,

    /// WebVTT subtitles.
    Vtt,

    /// Plain text with speaker and time headers.
    Text,

    /// The JSON session document.
    Session,
}

impl OutputType {
    /// Pick a format from a file extension; unknown extensions export as plain text.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        match ext.as_deref() {
            Some("srt") => Self::Srt,
            Some("vtt") => Self::Vtt,
            Some("json") => Self::Session,
            _ => Self::Text,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Srt => "srt",
            Self::Vtt => "vtt",
            Self::Text => "txt",
            Self::Session => "json",
        }
    }
}
