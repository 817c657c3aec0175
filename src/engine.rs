//! The synchronization engine: one owner for the document, the playback controller, the
//! playlist, autosave and the waveform.
//!
//! Everything runs on the caller's context. [`SyncEngine::tick`] is expected roughly every
//! [`EngineOpts::tick_interval`]; it advances playback, resolves the active segment from the
//! playback position, folds segment-store changes into the dirty state, picks up finished
//! waveform extractions and drives the autosave schedule.
//!
//! Observers subscribe to [`EngineEvent`]s. Playback events are forwarded as they are
//! consumed, so a frontend needs only one receiver.

use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::autosave::{AutosaveOutcome, Autosaver};
use crate::events::Subscribers;
use crate::export::export_to_path;
use crate::opts::EngineOpts;
use crate::output_type::OutputType;
use crate::playback::{MAX_SPEED, MIN_SPEED, PlaybackController, PlaybackEvent, PlaybackState};
use crate::playlist::{Playlist, is_supported_audio};
use crate::segment_store::SegmentStore;
use crate::segments::{Segment, SegmentId};
use crate::session::{Session, open_document};
use crate::shortcuts::{InputAction, KeyGesture, ShortcutProfile};
use crate::timestamp::format_short_clock;
use crate::transport::AudioTransport;
use crate::waveform::WaveformEnvelope;
use crate::waveform_loader::WaveformLoader;
use crate::{Error, Result};

const SPEED_STEP: f64 = 0.1;
const ZOOM_STEP: f64 = 1.2;
const MIN_ZOOM: f64 = 1.0;
const MAX_ZOOM: f64 = 10.0;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Playback(PlaybackEvent),
    ActiveSegmentChanged {
        previous: Option<SegmentId>,
        current: Option<SegmentId>,
    },
    Status(String),
    WaveformReady {
        path: PathBuf,
        points: usize,
        duration_seconds: f64,
    },
    Autosaved(AutosaveOutcome),
}

/// What [`SyncEngine::dispatch`] did with an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Done,
    /// The action needs input only the host can provide (a file picker, a save dialog).
    NeedsHost(InputAction),
}

pub struct SyncEngine<T: AudioTransport> {
    opts: EngineOpts,
    playback: PlaybackController<T>,
    playback_rx: Receiver<PlaybackEvent>,
    store: SegmentStore,
    selected: Option<SegmentId>,
    active: Option<SegmentId>,
    playlist: Playlist,
    audio_file: Option<PathBuf>,
    session_path: Option<PathBuf>,
    waveform: WaveformEnvelope,
    waveform_loader: WaveformLoader,
    autosaver: Autosaver,
    shortcuts: ShortcutProfile,
    dirty: bool,
    status: String,
    seeking: bool,
    zoom: f64,
    subscribers: Subscribers<EngineEvent>,
}

impl<T: AudioTransport> SyncEngine<T> {
    /// Build an engine around `transport`. The shortcut profile is read from
    /// [`EngineOpts::shortcuts_path`], falling back to defaults.
    pub fn new(transport: T, opts: EngineOpts) -> Self {
        Self::with_waveform_loader(transport, opts, WaveformLoader::new())
    }

    pub fn with_waveform_loader(transport: T, opts: EngineOpts, loader: WaveformLoader) -> Self {
        let mut playback = PlaybackController::new(transport);
        playback.set_speed(opts.speed);
        playback.set_volume(opts.volume);
        playback.set_rewind_amount(opts.rewind_seconds);
        let playback_rx = playback.subscribe();

        let autosaver = Autosaver::new(opts.recovery_path(), opts.autosave_interval);
        let shortcuts = ShortcutProfile::load(&opts.shortcuts_path());

        Self {
            playback,
            playback_rx,
            store: SegmentStore::with_placeholder(),
            selected: None,
            active: None,
            playlist: Playlist::new(),
            audio_file: None,
            session_path: None,
            waveform: WaveformEnvelope::empty(),
            waveform_loader: loader,
            autosaver,
            shortcuts,
            dirty: false,
            status: "Ready".to_owned(),
            seeking: false,
            zoom: MIN_ZOOM,
            subscribers: Subscribers::default(),
            opts,
        }
    }

    pub fn subscribe(&mut self) -> Receiver<EngineEvent> {
        self.subscribers.subscribe()
    }

    pub fn opts(&self) -> &EngineOpts {
        &self.opts
    }

    pub fn playback(&self) -> &PlaybackController<T> {
        &self.playback
    }

    pub fn transport_mut(&mut self) -> &mut T {
        self.playback.transport_mut()
    }

    pub fn segments(&self) -> &SegmentStore {
        &self.store
    }

    pub fn selected(&self) -> Option<&Segment> {
        self.selected.and_then(|id| self.store.get(id))
    }

    pub fn active(&self) -> Option<&Segment> {
        self.active.and_then(|id| self.store.get(id))
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    pub fn audio_file(&self) -> Option<&Path> {
        self.audio_file.as_deref()
    }

    pub fn session_path(&self) -> Option<&Path> {
        self.session_path.as_deref()
    }

    pub fn waveform(&self) -> &WaveformEnvelope {
        &self.waveform
    }

    pub fn shortcuts(&self) -> &ShortcutProfile {
        &self.shortcuts
    }

    pub fn shortcuts_mut(&mut self) -> &mut ShortcutProfile {
        &mut self.shortcuts
    }

    pub fn save_shortcuts(&self) -> Result<()> {
        self.shortcuts.save(&self.opts.shortcuts_path())
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn position(&self) -> f64 {
        self.playback.position()
    }

    pub fn state(&self) -> PlaybackState {
        self.playback.state()
    }

    pub fn is_seeking(&self) -> bool {
        self.seeking
    }

    // ---- tick ----

    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    /// One engine tick with an explicit clock for the autosave schedule.
    pub fn tick_at(&mut self, now: Instant) {
        self.playback.tick();
        self.pump_playback();
        self.commit();

        if let Some(result) = self.waveform_loader.poll() {
            let points = result.envelope.peaks().len();
            let duration_seconds = result.envelope.duration_seconds();
            debug!(path = %result.path.display(), points, "waveform ready");
            self.waveform = result.envelope;
            self.subscribers.emit(EngineEvent::WaveformReady {
                path: result.path,
                points,
                duration_seconds,
            });
        }

        let store = &self.store;
        let audio_file = self.audio_file.as_deref();
        self.autosaver
            .maybe_run(now, self.dirty, || snapshot_of(store, audio_file));
        while let Some(outcome) = self.autosaver.poll() {
            self.on_autosaved(outcome);
        }
    }

    /// Block until a running autosave finishes and report it.
    pub fn flush_autosave(&mut self) -> Option<AutosaveOutcome> {
        let outcome = self.autosaver.wait()?;
        self.on_autosaved(outcome.clone());
        Some(outcome)
    }

    fn on_autosaved(&mut self, outcome: AutosaveOutcome) {
        if outcome.is_ok() {
            self.set_status("Autosaved");
        }
        self.subscribers.emit(EngineEvent::Autosaved(outcome));
    }

    fn pump_playback(&mut self) {
        while let Ok(event) = self.playback_rx.try_recv() {
            match event {
                // A drag in progress owns the position; the final one is reported by `end_seek`.
                PlaybackEvent::PositionChanged { .. } if self.seeking => {}
                PlaybackEvent::PositionChanged { position } => {
                    self.subscribers.emit(EngineEvent::Playback(event));
                    self.update_active(position);
                }
                PlaybackEvent::Ended => {
                    self.subscribers.emit(EngineEvent::Playback(event));
                    self.advance_playlist();
                }
                _ => self.subscribers.emit(EngineEvent::Playback(event)),
            }
        }
    }

    fn update_active(&mut self, position: f64) {
        let current = self.store.active_for(position).map(Segment::id);
        if current == self.active {
            return;
        }

        let previous = self.active;
        if let Some(old) = previous {
            self.store.set_active(old, false);
        }
        if let Some(new) = current {
            self.store.set_active(new, true);
        }
        self.active = current;
        self.subscribers
            .emit(EngineEvent::ActiveSegmentChanged { previous, current });
    }

    fn advance_playlist(&mut self) {
        let Some(next) = self.playlist.advance().map(Path::to_path_buf) else {
            debug!("end of playlist");
            return;
        };
        if let Err(err) = self.load_audio(next) {
            warn!(error = %err, "failed to load next playlist entry");
        }
    }

    // ---- dirty tracking ----

    fn commit(&mut self) {
        if let Some(last) = self.store.drain_changes().last() {
            self.mark_dirty(last.reason());
        }
    }

    fn mark_dirty(&mut self, reason: &str) {
        self.dirty = true;
        self.set_status(format!("{reason} (unsaved)"));
    }

    fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
        self.subscribers.emit(EngineEvent::Status(self.status.clone()));
    }

    // ---- selection and segment edits ----

    pub fn select(&mut self, id: SegmentId) -> Result<()> {
        if self.store.get(id).is_none() {
            return Err(Error::SegmentNotFound);
        }
        self.selected = Some(id);
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    fn require_selection(&self) -> Result<SegmentId> {
        self.selected
            .filter(|id| self.store.get(*id).is_some())
            .ok_or(Error::NoSelection)
    }

    fn require_media(&self) -> Result<()> {
        if self.playback.has_media() {
            Ok(())
        } else {
            Err(Error::NoMedia)
        }
    }

    /// Append a default-length segment at the playhead and select it.
    pub fn add_segment_at_playhead(&mut self) -> Result<SegmentId> {
        self.require_media()?;
        let position = self.position();
        let speaker = self.opts.default_speaker.clone();
        let id = self.store.insert_at(position, Some(speaker.as_str()), None).id();
        self.selected = Some(id);
        self.commit();
        Ok(id)
    }

    pub fn remove_selected(&mut self) -> Result<Segment> {
        let id = self.require_selection()?;
        let removed = self.store.remove(id).ok_or(Error::SegmentNotFound)?;
        self.selected = None;
        if self.active == Some(id) {
            self.active = None;
        }
        self.store.ensure_placeholder();
        self.commit();
        Ok(removed)
    }

    /// Split the selected segment at the playhead and select the new second half.
    pub fn split_selected(&mut self) -> Result<SegmentId> {
        let id = self.require_selection()?;
        let at = self.position();
        let (_, created) = self.store.split(id, at)?;
        self.selected = Some(created);
        self.commit();
        Ok(created)
    }

    /// Merge the selected segment with the one after it. `Ok(None)` when it is last.
    pub fn merge_selected(&mut self) -> Result<Option<SegmentId>> {
        let id = self.require_selection()?;
        let absorbed = self.store.merge_with_next(id);
        if absorbed.is_some() && absorbed == self.active {
            self.active = None;
        }
        self.commit();
        Ok(absorbed)
    }

    /// Edit one segment through its clamping setters.
    pub fn edit_segment(&mut self, id: SegmentId, edit: impl FnOnce(&mut Segment)) -> Result<()> {
        if !self.store.update(id, edit) {
            return Err(Error::SegmentNotFound);
        }
        self.commit();
        Ok(())
    }

    /// Append `marker` to the selected segment's text, separated by a space.
    pub fn add_marker(&mut self, marker: &str) -> Result<()> {
        let id = self.require_selection()?;
        let marker = marker.trim();
        if marker.is_empty() {
            return Ok(());
        }
        self.store.update(id, |seg| {
            let text = format!("{} {marker}", seg.text().trim_end());
            seg.set_text(text.trim());
        });
        self.store.drain_changes();
        self.mark_dirty("Marker inserted");
        Ok(())
    }

    /// Paste free text: it fills a lone empty segment, otherwise it is appended to the last one.
    ///
    /// Returns `false` for blank input.
    pub fn paste_text(&mut self, text: &str) -> bool {
        if text.trim().is_empty() {
            return false;
        }

        self.store.ensure_placeholder();
        let lone_empty = self.store.len() == 1
            && self.store.first().is_some_and(|s| s.text().trim().is_empty());
        let target = match lone_empty {
            true => self.store.first(),
            false => self.store.last(),
        }
        .map(Segment::id);

        if let Some(id) = target {
            self.store.update(id, |seg| {
                if lone_empty {
                    seg.set_text(text);
                } else {
                    let joined = format!("{}\n{text}", seg.text());
                    seg.set_text(joined.trim());
                }
            });
        }
        self.store.drain_changes();
        self.mark_dirty("Text pasted");
        true
    }

    /// `[mm:ss]` (or `[hh:mm:ss]`) for the current playhead, for inline timestamps.
    pub fn timestamp_label(&self) -> String {
        format!("[{}]", format_short_clock(self.position()))
    }

    // ---- transport ----

    pub fn play(&mut self) -> Result<()> {
        self.require_media()?;
        self.playback.play();
        self.pump_playback();
        Ok(())
    }

    /// Pause, backing up by the rewind amount.
    pub fn pause(&mut self) {
        self.playback.pause(true);
        self.pump_playback();
    }

    pub fn stop(&mut self) {
        self.playback.stop();
        self.pump_playback();
    }

    pub fn toggle_play(&mut self) -> Result<()> {
        self.require_media()?;
        if self.playback.is_playing() {
            self.playback.pause(true);
        } else {
            self.playback.play();
        }
        self.pump_playback();
        Ok(())
    }

    pub fn rewind(&mut self) -> Result<()> {
        self.require_media()?;
        self.playback.rewind();
        self.pump_playback();
        Ok(())
    }

    pub fn forward(&mut self) -> Result<()> {
        self.require_media()?;
        self.playback.forward();
        self.pump_playback();
        Ok(())
    }

    pub fn set_speed(&mut self, ratio: f64) {
        self.playback.set_speed(ratio);
    }

    pub fn slow_down(&mut self) -> f64 {
        self.step_speed(-SPEED_STEP)
    }

    pub fn speed_up(&mut self) -> f64 {
        self.step_speed(SPEED_STEP)
    }

    fn step_speed(&mut self, delta: f64) -> f64 {
        // Snap to a tenth so repeated steps land exactly on the bounds.
        let target = ((self.playback.speed() + delta) * 10.0).round() / 10.0;
        self.playback.set_speed(target.clamp(MIN_SPEED, MAX_SPEED));
        self.playback.speed()
    }

    pub fn set_volume(&mut self, volume: f64) {
        self.playback.set_volume(volume);
    }

    pub fn set_rewind_seconds(&mut self, seconds: f64) {
        self.playback.set_rewind_amount(seconds);
    }

    /// User seek. Position notifications raised by the seek itself do not move the active
    /// segment; it is resolved once at the destination.
    pub fn seek(&mut self, seconds: f64) {
        self.begin_seek();
        self.playback.seek(seconds);
        self.end_seek();
    }

    /// Start a user-driven seek (e.g. dragging a slider). Position notifications and
    /// active-segment tracking pause until [`SyncEngine::end_seek`].
    pub fn begin_seek(&mut self) {
        self.seeking = true;
    }

    /// Finish a user seek: report the final position once and resolve the active segment there.
    pub fn end_seek(&mut self) {
        self.pump_playback();
        self.seeking = false;
        let position = self.position();
        self.subscribers
            .emit(EngineEvent::Playback(PlaybackEvent::PositionChanged { position }));
        self.update_active(position);
    }

    /// Seek to the first segment starting after the playhead. Returns whether one was found.
    pub fn next_segment(&mut self) -> Result<bool> {
        self.require_media()?;
        match self
            .store
            .next_starting_after(self.position())
            .map(Segment::start)
        {
            Some(start) => {
                self.seek(start);
                self.set_status("Skipped to next segment");
                Ok(true)
            }
            None => {
                self.set_status("No next segment found");
                Ok(false)
            }
        }
    }

    /// Loop the selected segment's range. Playback state is left alone.
    pub fn loop_selection(&mut self) -> Result<()> {
        let id = self.require_selection()?;
        let (start, end) = self
            .store
            .get(id)
            .map(|s| (s.start(), s.end()))
            .ok_or(Error::SegmentNotFound)?;
        self.playback.set_loop(start, end);
        self.set_status("Looping selection");
        Ok(())
    }

    /// Loop the last [`EngineOpts::loop_back_seconds`] before the playhead and make sure
    /// playback is running.
    pub fn loop_last_seconds(&mut self) -> Result<()> {
        self.require_media()?;
        let end = self.position();
        let span = self.opts.loop_back_seconds;
        self.playback.set_loop((end - span).max(0.0), end);
        if !self.playback.is_playing() {
            self.playback.play();
        }
        self.pump_playback();
        self.set_status(format!("Looping last {span} seconds"));
        Ok(())
    }

    pub fn clear_loop(&mut self) {
        self.playback.clear_loop();
    }

    pub fn zoom_in(&mut self) -> f64 {
        self.step_zoom(ZOOM_STEP)
    }

    pub fn zoom_out(&mut self) -> f64 {
        self.step_zoom(1.0 / ZOOM_STEP)
    }

    fn step_zoom(&mut self, factor: f64) -> f64 {
        if !self.waveform.is_empty() {
            self.zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        }
        self.zoom
    }

    // ---- playlist ----

    /// Add audio sources. If nothing is loaded yet, the first of them is loaded and played.
    ///
    /// Returns how many entries were new.
    pub fn add_to_playlist<I, P>(&mut self, paths: I) -> Result<usize>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut first = None;
        let mut added = 0;
        for path in paths {
            let path = path.into();
            if first.is_none() {
                first = Some(path.clone());
            }
            if self.playlist.add(path) {
                added += 1;
            }
        }
        let Some(first) = first else {
            return Ok(0);
        };

        self.mark_dirty("Audio added to playlist");
        if self.playlist.current_index().is_none() {
            if let Some(index) = self.playlist.entries().iter().position(|p| *p == first) {
                self.select_playlist_entry(index)?;
            }
        }
        Ok(added)
    }

    /// Add dropped files, keeping only supported audio. When the playlist was empty the first
    /// entry is loaded and playback starts.
    pub fn add_dropped_files<I, P>(&mut self, paths: I) -> Result<usize>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let audio: Vec<PathBuf> = paths
            .into_iter()
            .map(Into::into)
            .filter(|p| is_supported_audio(p))
            .collect();
        if audio.is_empty() {
            return Ok(0);
        }

        let was_empty = self.playlist.is_empty();
        let count = audio.len();
        for path in audio {
            self.playlist.add(path);
        }

        if was_empty && !self.playlist.is_empty() {
            self.select_playlist_entry(0)?;
            if !self.playback.is_playing() {
                self.play()?;
            }
        }

        self.mark_dirty(&format!("{count} file(s) added via drag-and-drop"));
        Ok(count)
    }

    pub fn remove_from_playlist(&mut self, path: &Path) -> bool {
        let removed = self.playlist.remove(path);
        if removed {
            self.mark_dirty("Playlist changed");
        }
        removed
    }

    pub fn clear_playlist(&mut self) {
        if !self.playlist.is_empty() {
            self.playlist.clear();
            self.mark_dirty("Playlist changed");
        }
    }

    /// Make `index` current and load it. `Ok(false)` when out of range or already current.
    pub fn select_playlist_entry(&mut self, index: usize) -> Result<bool> {
        let Some(path) = self.playlist.select(index).map(Path::to_path_buf) else {
            return Ok(false);
        };
        self.load_audio(path)?;
        Ok(true)
    }

    /// Load a source, request its waveform and start playing.
    fn load_audio(&mut self, path: PathBuf) -> Result<()> {
        self.playback.load(&path)?;
        self.waveform = WaveformEnvelope::empty();
        self.waveform_loader.request(path.clone());
        info!(path = %path.display(), "audio loaded");
        self.audio_file = Some(path);
        self.playback.play();
        self.pump_playback();
        self.mark_dirty("Audio loaded");
        Ok(())
    }

    // ---- documents ----

    /// The current document as a session.
    pub fn snapshot(&self) -> Session {
        snapshot_of(&self.store, self.audio_file.as_deref())
    }

    /// Open a transcript by extension: `.json` session, `.srt` subtitles, anything else as
    /// plain text. Only sessions become the save target.
    pub fn open_document(&mut self, path: &Path) -> Result<()> {
        let session = open_document(path)?;
        let is_session = OutputType::from_path(path) == OutputType::Session;

        if is_session {
            self.load_recovered_session(session, Some(path.to_path_buf()));
        } else {
            self.replace_document(session.segments);
            self.session_path = None;
            self.commit();
        }
        Ok(())
    }

    /// Install a session (typically the recovery file). The document is considered unsaved.
    ///
    /// The session's audio is opened if present; failing to open it is logged, not returned.
    pub fn load_recovered_session(&mut self, session: Session, session_path: Option<PathBuf>) {
        let audio = session.audio_path().map(Path::to_path_buf);
        self.replace_document(session.segments);
        self.session_path = session_path;
        self.audio_file = audio.clone();

        if let Some(audio) = audio {
            match self.playback.load(&audio) {
                Ok(()) => {
                    self.waveform = WaveformEnvelope::empty();
                    self.waveform_loader.request(audio);
                }
                Err(err) => {
                    warn!(path = %audio.display(), error = %err, "session audio unavailable")
                }
            }
            self.pump_playback();
        }
        self.commit();
    }

    /// Load the recovery file if there is one. Returns whether a document was recovered.
    pub fn recover(&mut self) -> Result<bool> {
        if !self.opts.recovery_available() {
            return Ok(false);
        }
        let session = Session::load(&self.opts.recovery_path())?;
        self.load_recovered_session(session, None);
        Ok(true)
    }

    fn replace_document(&mut self, segments: Vec<Segment>) {
        self.store.replace_all(segments);
        self.selected = None;
        self.active = None;
    }

    pub fn save(&mut self) -> Result<()> {
        let path = self.session_path.clone().ok_or(Error::NoSavePath)?;
        self.save_to(&path)
    }

    pub fn save_as(&mut self, path: impl Into<PathBuf>) -> Result<()> {
        let path = path.into();
        self.save_to(&path)?;
        self.session_path = Some(path);
        Ok(())
    }

    fn save_to(&mut self, path: &Path) -> Result<()> {
        self.snapshot().save(path)?;
        self.dirty = false;
        info!(path = %path.display(), "session saved");
        self.set_status("Saved");
        Ok(())
    }

    pub fn export(&mut self, path: &Path, output_type: OutputType) -> Result<()> {
        let audio_file = self
            .audio_file
            .as_deref()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        export_to_path(path, self.store.as_slice(), &audio_file, output_type)?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.set_status(format!("Exported to {name}"));
        Ok(())
    }

    // ---- input ----

    /// Run the engine operation bound to `action`.
    pub fn dispatch(&mut self, action: InputAction) -> Result<Dispatch> {
        match action {
            InputAction::PlayPause => self.toggle_play()?,
            InputAction::Rewind => self.rewind()?,
            InputAction::Forward => self.forward()?,
            InputAction::SlowDown => {
                self.require_media()?;
                self.slow_down();
            }
            InputAction::SpeedUp => {
                self.require_media()?;
                self.speed_up();
            }
            InputAction::LoopLastFiveSeconds => self.loop_last_seconds()?,
            InputAction::LoopSelection => self.loop_selection()?,
            InputAction::NextSegment => {
                self.next_segment()?;
            }
            InputAction::ZoomIn => {
                self.zoom_in();
            }
            InputAction::ZoomOut => {
                self.zoom_out();
            }
            InputAction::Save if self.session_path.is_some() => self.save()?,
            InputAction::Save | InputAction::OpenAudio | InputAction::Export => {
                return Ok(Dispatch::NeedsHost(action));
            }
        }
        Ok(Dispatch::Done)
    }

    /// Look `gesture` up in the shortcut profile and dispatch it. `Ok(None)` when unbound.
    pub fn handle_key(&mut self, gesture: &KeyGesture) -> Result<Option<Dispatch>> {
        match self.shortcuts.action_for(gesture) {
            Some(action) => self.dispatch(action).map(Some),
            None => Ok(None),
        }
    }
}

fn snapshot_of(store: &SegmentStore, audio_file: Option<&Path>) -> Session {
    Session::new(
        audio_file
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default(),
        store.as_slice().to_vec(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::VirtualTransport;

    fn no_waveform(_: &Path) -> WaveformEnvelope {
        WaveformEnvelope::empty()
    }

    fn engine(dir: &Path) -> SyncEngine<VirtualTransport> {
        let transport = VirtualTransport::new().with_media("a.wav", 60.0);
        SyncEngine::with_waveform_loader(
            transport,
            EngineOpts::in_dir(dir),
            WaveformLoader::with_extractor(no_waveform),
        )
    }

    #[test]
    fn starts_with_clean_placeholder() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let engine = engine(dir.path());
        assert_eq!(engine.segments().len(), 1);
        assert!(!engine.is_dirty());
        assert_eq!(engine.status(), "Ready");
        Ok(())
    }

    #[test]
    fn user_errors_leave_state_alone() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let mut engine = engine(dir.path());
        assert!(matches!(engine.add_segment_at_playhead(), Err(Error::NoMedia)));
        assert!(matches!(engine.split_selected(), Err(Error::NoSelection)));
        assert!(matches!(engine.loop_selection(), Err(Error::NoSelection)));
        assert!(matches!(engine.save(), Err(Error::NoSavePath)));
        assert!(!engine.is_dirty());
        Ok(())
    }

    #[test]
    fn marker_is_appended_with_a_space() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let mut engine = engine(dir.path());
        let id = engine.segments().as_slice()[0].id();
        engine.edit_segment(id, |s| s.set_text("we agreed  "))?;
        engine.select(id)?;
        engine.add_marker("[inaudible]")?;
        assert_eq!(engine.selected().map(Segment::text), Some("we agreed [inaudible]"));
        assert_eq!(engine.status(), "Marker inserted (unsaved)");
        Ok(())
    }

    #[test]
    fn paste_fills_lone_empty_segment_then_appends() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let mut engine = engine(dir.path());
        assert!(!engine.paste_text("   "));
        assert!(engine.paste_text("first"));
        assert!(engine.paste_text("second"));
        assert_eq!(engine.segments().len(), 1);
        assert_eq!(engine.segments().as_slice()[0].text(), "first\nsecond");
        assert!(engine.is_dirty());
        Ok(())
    }

    #[test]
    fn speed_steps_snap_and_clamp() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let mut engine = engine(dir.path());
        assert_eq!(engine.speed_up(), 1.1);
        for _ in 0..10 {
            engine.speed_up();
        }
        assert_eq!(engine.playback().speed(), 1.5);
        for _ in 0..20 {
            engine.slow_down();
        }
        assert_eq!(engine.playback().speed(), 0.5);
        Ok(())
    }

    #[test]
    fn zoom_needs_a_waveform() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let mut engine = engine(dir.path());
        assert_eq!(engine.zoom_in(), 1.0);
        Ok(())
    }

    #[test]
    fn dispatch_defers_dialogs_to_the_host() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let mut engine = engine(dir.path());
        assert_eq!(
            engine.dispatch(InputAction::OpenAudio)?,
            Dispatch::NeedsHost(InputAction::OpenAudio)
        );
        assert_eq!(
            engine.dispatch(InputAction::Save)?,
            Dispatch::NeedsHost(InputAction::Save)
        );
        assert!(matches!(engine.dispatch(InputAction::PlayPause), Err(Error::NoMedia)));
        Ok(())
    }

    #[test]
    fn handle_key_uses_the_profile() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let mut engine = engine(dir.path());
        assert_eq!(engine.handle_key(&KeyGesture::key("F9"))?, None);
        assert_eq!(
            engine.handle_key(&KeyGesture::key("S").ctrl().shift())?,
            Some(Dispatch::NeedsHost(InputAction::Export))
        );
        Ok(())
    }
}
