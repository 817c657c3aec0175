use std::io::{self, BufWriter, Write};
use std::ops::ControlFlow;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::oneshot;
use tracing::info;

use scriptsync::driver;
use scriptsync::engine::{EngineEvent, SyncEngine};
use scriptsync::export::{export_to_path, write_segments};
use scriptsync::opts::EngineOpts;
use scriptsync::output_type::OutputType;
use scriptsync::playback::PlaybackEvent;
use scriptsync::session::open_document;
use scriptsync::timestamp::format_vtt;
use scriptsync::transport::VirtualTransport;
use scriptsync::waveform::{extract_file, extract_reader};

#[derive(Parser, Debug)]
#[command(name = "scriptsync")]
#[command(about = "Transcript and audio synchronization tools")]
struct Params {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract the waveform peak envelope of an audio file.
    Waveform {
        /// Audio file, or `-` to read the stream from stdin.
        #[arg(short = 'a', long = "audio")]
        audio_path: PathBuf,

        /// Container hint for stdin input (e.g. "wav", "mp3", "flac").
        #[arg(long = "format")]
        format: Option<String>,

        /// Print every peak as JSON instead of a summary.
        #[arg(long = "json", default_value_t = false)]
        json: bool,
    },

    /// Convert a transcript (.json session, .srt or plain text) to another format.
    Convert {
        #[arg(short = 'i', long = "input")]
        input_path: PathBuf,

        /// Output file; stdout when omitted.
        #[arg(long = "out")]
        output_path: Option<PathBuf>,

        /// Output format; inferred from `--out` when omitted, plain text for stdout.
        #[arg(short = 'o', long = "output-type", value_enum)]
        output_type: Option<OutputType>,
    },

    /// Play a transcript against a simulated clock and print synchronization events.
    Simulate {
        #[arg(short = 'i', long = "input")]
        input_path: PathBuf,

        /// Length of the simulated media in seconds.
        #[arg(short = 'd', long = "duration")]
        duration_seconds: f64,

        /// Media time advanced per wall-clock second.
        #[arg(long = "time-scale", default_value_t = 10.0)]
        time_scale: f64,

        /// Playback speed ratio.
        #[arg(long = "speed", default_value_t = 1.0)]
        speed: f64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    scriptsync::init_logging();

    match Params::parse().command {
        Command::Waveform {
            audio_path,
            format,
            json,
        } => waveform(audio_path, format, json),
        Command::Convert {
            input_path,
            output_path,
            output_type,
        } => convert(input_path, output_path, output_type),
        Command::Simulate {
            input_path,
            duration_seconds,
            time_scale,
            speed,
        } => simulate(input_path, duration_seconds, time_scale, speed).await,
    }
}

fn waveform(audio_path: PathBuf, format: Option<String>, json: bool) -> Result<()> {
    let envelope = if audio_path.as_os_str() == "-" {
        extract_reader(io::stdin(), format.as_deref())
    } else {
        extract_file(&audio_path)
    };
    let stdout = io::stdout();
    let mut w = BufWriter::new(stdout.lock());

    if json {
        serde_json::to_writer(&mut w, envelope.peaks())?;
        writeln!(w)?;
    } else {
        let loudest = envelope.peaks().iter().copied().fold(0.0f32, f32::max);
        writeln!(
            w,
            "{}: {} points over {:.3}s, loudest peak {:.3}",
            audio_path.display(),
            envelope.peaks().len(),
            envelope.duration_seconds(),
            loudest
        )?;
    }
    w.flush()?;
    Ok(())
}

fn convert(
    input_path: PathBuf,
    output_path: Option<PathBuf>,
    output_type: Option<OutputType>,
) -> Result<()> {
    let session = open_document(&input_path)
        .with_context(|| format!("failed to open '{}'", input_path.display()))?;

    match output_path {
        Some(path) => {
            let output_type = output_type.unwrap_or_else(|| OutputType::from_path(&path));
            export_to_path(&path, &session.segments, &session.audio_file, output_type)?;
            info!(path = %path.display(), "converted");
        }
        None => {
            let stdout = io::stdout();
            let w = BufWriter::new(stdout.lock());
            write_segments(
                w,
                &session.segments,
                &session.audio_file,
                output_type.unwrap_or(OutputType::Text),
            )?;
        }
    }
    Ok(())
}

async fn simulate(
    input_path: PathBuf,
    duration_seconds: f64,
    time_scale: f64,
    speed: f64,
) -> Result<()> {
    let mut session = open_document(&input_path)
        .with_context(|| format!("failed to open '{}'", input_path.display()))?;
    let media = session
        .audio_path()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("simulated.wav"));
    session.audio_file = media.to_string_lossy().into_owned();

    let base_dir = tempfile::tempdir()?;
    let mut opts = EngineOpts::in_dir(base_dir.path());
    opts.speed = speed;

    let transport = VirtualTransport::new().with_media(media, duration_seconds);
    let mut engine = SyncEngine::new(transport, opts);
    let events = engine.subscribe();
    engine.load_recovered_session(session, None);
    engine.play()?;

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(());
        }
    });

    let stdout = io::stdout();
    let mut out = stdout.lock();
    driver::run(&mut engine, shutdown_rx, |engine, period| {
        engine
            .transport_mut()
            .advance(period.mul_f64(time_scale.max(0.0)));

        let mut finished = false;
        while let Ok(event) = events.try_recv() {
            finished |= event == EngineEvent::Playback(PlaybackEvent::Ended);
            print_event(&mut out, engine, &event);
        }
        if finished {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    })
    .await;

    Ok(())
}

fn print_event<W: Write>(
    out: &mut W,
    engine: &SyncEngine<VirtualTransport>,
    event: &EngineEvent,
) {
    let at = format_vtt(engine.position());
    let line = match event {
        EngineEvent::ActiveSegmentChanged {
            current: Some(id), ..
        } => engine.segments().get(*id).map(|seg| {
            format!(
                "{at} active [{} - {}] {}: {}",
                format_vtt(seg.start()),
                format_vtt(seg.end()),
                seg.speaker(),
                seg.text().trim()
            )
        }),
        EngineEvent::ActiveSegmentChanged { current: None, .. } => Some(format!("{at} gap")),
        EngineEvent::Playback(PlaybackEvent::StateChanged { state }) => {
            Some(format!("{at} {}", state.label()))
        }
        EngineEvent::Playback(PlaybackEvent::Ended) => Some(format!("{at} ended")),
        EngineEvent::Status(status) => Some(format!("{at} status: {status}")),
        _ => None,
    };

    if let Some(line) = line {
        let _ = writeln!(out, "{line}");
    }
}
