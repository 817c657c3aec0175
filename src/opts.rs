use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default directory name under the per-user data directory.
pub const APP_DIR_NAME: &str = "scriptsync";

/// Default file name of the autosave recovery document.
pub const DEFAULT_RECOVERY_FILE_NAME: &str = "autosave.json";

/// Default file name of the persisted shortcut profile.
pub const DEFAULT_SHORTCUTS_FILE_NAME: &str = "shortcuts.json";

/// Options that control how a [`crate::engine::SyncEngine`] behaves.
///
/// This struct represents *library-level configuration*, not CLI flags directly.
/// Frontends (a GUI, the CLI, tests) construct it explicitly and pass it in at
/// construction time, so the engine never looks up per-user paths on its own.
#[derive(Debug, Clone)]
pub struct EngineOpts {
    /// Directory holding the recovery file and shortcut profile.
    pub base_dir: PathBuf,

    /// File name of the autosave recovery document inside `base_dir`.
    pub recovery_file_name: String,

    /// Cadence of the playback tick.
    pub tick_interval: Duration,

    /// How often the autosave scheduler checks the dirty flag.
    pub autosave_interval: Duration,

    /// Initial rewind amount in seconds (used by pause-with-rewind, rewind and forward).
    pub rewind_seconds: f64,

    /// Initial playback speed ratio.
    pub speed: f64,

    /// Initial volume.
    pub volume: f64,

    /// Length of the "loop the last N seconds" region.
    pub loop_back_seconds: f64,

    /// Speaker assigned to segments inserted at the playhead.
    pub default_speaker: String,
}

impl Default for EngineOpts {
    fn default() -> Self {
        Self::in_dir(std::env::temp_dir().join(APP_DIR_NAME))
    }
}

impl EngineOpts {
    /// Options rooted at an explicit base directory.
    pub fn in_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            recovery_file_name: DEFAULT_RECOVERY_FILE_NAME.to_owned(),
            tick_interval: Duration::from_millis(120),
            autosave_interval: Duration::from_secs(30),
            rewind_seconds: 2.0,
            speed: 1.0,
            volume: 0.9,
            loop_back_seconds: 5.0,
            default_speaker: "Speaker 1".to_owned(),
        }
    }

    /// Options rooted at the per-user local data directory, if the platform has one.
    pub fn for_current_user() -> Option<Self> {
        dirs::data_local_dir().map(|dir| Self::in_dir(dir.join(APP_DIR_NAME)))
    }

    /// Full path of the autosave recovery document.
    pub fn recovery_path(&self) -> PathBuf {
        self.base_dir.join(&self.recovery_file_name)
    }

    /// Full path of the shortcut profile.
    pub fn shortcuts_path(&self) -> PathBuf {
        self.base_dir.join(DEFAULT_SHORTCUTS_FILE_NAME)
    }

    /// Whether a recovery document exists.
    ///
    /// Surrounding applications check this at startup to offer recovery.
    pub fn recovery_available(&self) -> bool {
        is_file(&self.recovery_path())
    }
}

fn is_file(path: &Path) -> bool {
    path.metadata().map(|m| m.is_file()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovery_path_joins_base_dir() {
        let opts = EngineOpts::in_dir("/data/app");
        assert_eq!(opts.recovery_path(), PathBuf::from("/data/app/autosave.json"));
        assert_eq!(opts.shortcuts_path(), PathBuf::from("/data/app/shortcuts.json"));
    }

    #[test]
    fn recovery_available_tracks_file_presence() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let opts = EngineOpts::in_dir(dir.path());
        assert!(!opts.recovery_available());

        std::fs::write(opts.recovery_path(), "{}")?;
        assert!(opts.recovery_available());
        Ok(())
    }
}
