//! `scriptsync`: the playback-and-synchronization core of a transcript editor.
//!
//! This crate provides:
//! - A segment store that keeps timed, speaker-attributed text consistent
//! - A playback state machine driving an external audio transport
//! - A synchronization engine mapping playback position onto segments, with dirty tracking,
//!   playlist advance and background autosave
//! - Waveform peak extraction for rendering
//! - Session persistence plus SRT, WebVTT and plain-text export
//!
//! Frontends own rendering and input. They construct a [`engine::SyncEngine`] with an
//! [`opts::EngineOpts`], call `tick` on a cadence and subscribe to its events.

mod error;
pub use error::{Error, Result};

// Engine and its configuration (most consumers should start here).
pub mod engine;
pub mod opts;

// Document model.
pub mod segment_store;
pub mod segments;

// Playback.
pub mod events;
pub mod playback;
pub mod playlist;
pub mod transport;

// Waveform extraction and audio decoding.
pub mod audio_pipeline;
pub mod decode;
pub mod decoder;
pub mod demux;
pub mod waveform;
pub mod waveform_loader;

// Persistence.
pub mod autosave;
pub mod session;
pub mod shortcuts;

// Output selection and encoder interfaces.
pub mod export;
pub mod output_type;
pub mod segment_encoder;
pub mod timestamp;

// Encoders that serialize segments into various formats.
pub mod srt;
pub mod text_encoder;
pub mod vtt_encoder;

// Logging configuration.
#[cfg(feature = "logging")]
pub mod logging;

#[cfg(feature = "logging")]
pub use logging::init as init_logging;

// Async tick driver.
#[cfg(feature = "runtime")]
pub mod driver;
