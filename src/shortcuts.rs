//! Keyboard shortcut profile: which key gesture triggers which [`InputAction`].
//!
//! The profile persists as a JSON object of action name to gesture string, for example
//! `{"Save": "Ctrl+S", "Export": "Ctrl+Shift+S"}`. Loading never fails: an unreadable file
//! yields the defaults, an unparseable gesture falls back to that action's default, and
//! actions missing from the file are filled in from the defaults.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{Error, Result};

/// A user-triggerable engine command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum InputAction {
    PlayPause,
    Rewind,
    SlowDown,
    SpeedUp,
    LoopLastFiveSeconds,
    OpenAudio,
    Save,
    Export,
    ZoomIn,
    ZoomOut,
    LoopSelection,
    Forward,
    NextSegment,
}

const NAMED_KEYS: &[&str] = &[
    "Space", "Plus", "Minus", "Enter", "Tab", "Escape", "Backspace", "Delete", "Insert", "Home",
    "End", "PageUp", "PageDown", "Left", "Right", "Up", "Down",
];

/// A key plus modifiers, written `Ctrl+Shift+Alt+Key` in canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyGesture {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub key: String,
}

impl KeyGesture {
    /// A gesture with no modifiers. `key` is not validated; use `parse` for that.
    pub fn key(key: impl Into<String>) -> Self {
        Self {
            ctrl: false,
            shift: false,
            alt: false,
            key: key.into(),
        }
    }

    pub fn ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn alt(mut self) -> Self {
        self.alt = true;
        self
    }
}

impl fmt::Display for KeyGesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ctrl {
            f.write_str("Ctrl+")?;
        }
        if self.shift {
            f.write_str("Shift+")?;
        }
        if self.alt {
            f.write_str("Alt+")?;
        }
        f.write_str(&self.key)
    }
}

impl FromStr for KeyGesture {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('+').map(str::trim).collect();
        let Some((key, modifiers)) = parts.split_last() else {
            return Err(Error::msg(format!("empty key gesture '{s}'")));
        };

        let mut gesture = KeyGesture::key(canonical_key(key).ok_or_else(|| {
            Error::msg(format!("unknown key '{key}' in gesture '{s}'"))
        })?);

        for modifier in modifiers {
            match modifier.to_ascii_lowercase().as_str() {
                "ctrl" | "control" => gesture.ctrl = true,
                "shift" => gesture.shift = true,
                "alt" => gesture.alt = true,
                _ => {
                    return Err(Error::msg(format!(
                        "unknown modifier '{modifier}' in gesture '{s}'"
                    )));
                }
            }
        }

        Ok(gesture)
    }
}

fn canonical_key(key: &str) -> Option<String> {
    if key.len() == 1 {
        let c = key.chars().next()?;
        return c.is_ascii_alphanumeric().then(|| c.to_ascii_uppercase().to_string());
    }

    if let Some(n) = key.strip_prefix(['F', 'f']) {
        if let Ok(n) = n.parse::<u8>() {
            return (1..=24).contains(&n).then(|| format!("F{n}"));
        }
    }

    NAMED_KEYS
        .iter()
        .find(|named| named.eq_ignore_ascii_case(key))
        .map(|named| (*named).to_owned())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortcutProfile {
    bindings: BTreeMap<InputAction, KeyGesture>,
}

impl Default for ShortcutProfile {
    fn default() -> Self {
        use InputAction::*;

        let bindings = [
            (PlayPause, KeyGesture::key("F1")),
            (Rewind, KeyGesture::key("F2")),
            (SlowDown, KeyGesture::key("F3")),
            (SpeedUp, KeyGesture::key("F4")),
            (LoopLastFiveSeconds, KeyGesture::key("Space").ctrl()),
            (OpenAudio, KeyGesture::key("O").ctrl()),
            (Save, KeyGesture::key("S").ctrl()),
            (Export, KeyGesture::key("S").ctrl().shift()),
            (ZoomIn, KeyGesture::key("Plus").ctrl()),
            (ZoomOut, KeyGesture::key("Minus").ctrl()),
            (LoopSelection, KeyGesture::key("L").ctrl()),
        ];
        Self {
            bindings: bindings.into_iter().collect(),
        }
    }
}

impl ShortcutProfile {
    /// A profile with no bindings.
    pub fn empty() -> Self {
        Self {
            bindings: BTreeMap::new(),
        }
    }

    pub fn gesture_for(&self, action: InputAction) -> Option<&KeyGesture> {
        self.bindings.get(&action)
    }

    pub fn action_for(&self, gesture: &KeyGesture) -> Option<InputAction> {
        self.bindings
            .iter()
            .find(|(_, g)| *g == gesture)
            .map(|(action, _)| *action)
    }

    /// Bind `gesture` to `action`, returning the previous binding.
    pub fn bind(&mut self, action: InputAction, gesture: KeyGesture) -> Option<KeyGesture> {
        self.bindings.insert(action, gesture)
    }

    pub fn iter(&self) -> impl Iterator<Item = (InputAction, &KeyGesture)> {
        self.bindings.iter().map(|(a, g)| (*a, g))
    }

    /// Load a profile, falling back to defaults for anything unusable.
    pub fn load(path: &Path) -> Self {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) => {
                debug!(path = %path.display(), error = %err, "no shortcut profile, using defaults");
                return Self::default();
            }
        };
        match serde_json::from_str::<BTreeMap<InputAction, String>>(&raw) {
            Ok(entries) => Self::from_entries(entries),
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "malformed shortcut profile, using defaults"
                );
                Self::default()
            }
        }
    }

    fn from_entries(entries: BTreeMap<InputAction, String>) -> Self {
        let defaults = Self::default();
        let mut profile = Self::empty();

        for (action, text) in entries {
            match text.parse::<KeyGesture>() {
                Ok(gesture) => {
                    profile.bind(action, gesture);
                }
                Err(err) => {
                    warn!(?action, error = %err, "bad shortcut, using default");
                    if let Some(default) = defaults.gesture_for(action) {
                        profile.bind(action, default.clone());
                    }
                }
            }
        }

        for (action, gesture) in defaults.bindings {
            profile.bindings.entry(action).or_insert(gesture);
        }
        profile
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let entries: BTreeMap<InputAction, String> = self
            .bindings
            .iter()
            .map(|(action, gesture)| (*action, gesture.to_string()))
            .collect();
        std::fs::write(path, serde_json::to_string_pretty(&entries)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gestures_parse_and_print_canonically() -> anyhow::Result<()> {
        let g: KeyGesture = "shift + control + s".parse()?;
        assert_eq!(g.to_string(), "Ctrl+Shift+S");
        assert_eq!("f12".parse::<KeyGesture>()?.to_string(), "F12");
        assert_eq!("Ctrl+plus".parse::<KeyGesture>()?, KeyGesture::key("Plus").ctrl());
        Ok(())
    }

    #[test]
    fn bad_gestures_are_rejected() {
        for bad in ["", "Ctrl+", "Hyper+S", "F25", "Ctrl+Banana"] {
            assert!(bad.parse::<KeyGesture>().is_err(), "{bad}");
        }
    }

    #[test]
    fn defaults_cover_the_function_keys() {
        let profile = ShortcutProfile::default();
        assert_eq!(
            profile.action_for(&KeyGesture::key("F1")),
            Some(InputAction::PlayPause)
        );
        assert_eq!(
            profile.gesture_for(InputAction::Export).map(ToString::to_string),
            Some("Ctrl+Shift+S".to_owned())
        );
        assert!(profile.gesture_for(InputAction::NextSegment).is_none());
    }

    #[test]
    fn load_falls_back_per_entry_and_fills_gaps() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("shortcuts.json");
        std::fs::write(&path, r#"{"Save": "Alt+W", "Rewind": "Ctrl+Nope", "Forward": "F6"}"#)?;

        let profile = ShortcutProfile::load(&path);
        assert_eq!(profile.gesture_for(InputAction::Save), Some(&KeyGesture::key("W").alt()));
        assert_eq!(profile.gesture_for(InputAction::Rewind), Some(&KeyGesture::key("F2")));
        assert_eq!(profile.gesture_for(InputAction::Forward), Some(&KeyGesture::key("F6")));
        assert_eq!(profile.gesture_for(InputAction::PlayPause), Some(&KeyGesture::key("F1")));
        Ok(())
    }

    #[test]
    fn unreadable_profiles_are_defaults() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        assert_eq!(
            ShortcutProfile::load(&dir.path().join("missing.json")),
            ShortcutProfile::default()
        );

        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{"NotAnAction": "F1"}"#)?;
        assert_eq!(ShortcutProfile::load(&path), ShortcutProfile::default());
        Ok(())
    }

    #[test]
    fn save_then_load_round_trips() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("cfg").join("shortcuts.json");

        let mut profile = ShortcutProfile::default();
        profile.bind(InputAction::NextSegment, KeyGesture::key("N").ctrl().alt());
        profile.save(&path)?;

        assert_eq!(ShortcutProfile::load(&path), profile);
        Ok(())
    }
}
