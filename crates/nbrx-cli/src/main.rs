//! Command-line multi-channel narrowband receiver.
//!
//! Reads raw interleaved-u8 I/Q samples from stdin, fans each batch out to
//! one demodulator worker per configured channel plus a spectrum scanner,
//! and records squelch-gated audio to WAV files grouped by frequency.

mod channel;
mod dispatcher;
mod registry;
mod scanner;

use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use clap::Parser;
use nbrx_core::config::{AUDIO_RATE, N_NOISE, THRESH_FACTOR};
use nbrx_core::{Config, Mode, Voter, VoterKind};
use nbrx_io::{IqIngest, SampleBatch, WavSink};

use channel::{run_channel_worker, ChannelInput, ChannelWorker};
use registry::{ChannelHandle, ChannelRegistry};
use scanner::Scanner;

/// Real-time narrowband multi-channel receiver: mixes, filters, decimates,
/// demodulates, and squelch-records one or more channels out of a wideband
/// I/Q stream read from stdin.
#[derive(Parser, Debug)]
#[command(name = "nbrx", author, version, about, long_about = None)]
struct Cli {
    /// Wideband front-end center frequency, in Hz.
    center: i64,

    /// Wideband input sample rate, in complex samples/sec.
    input_rate: i64,

    /// Frequency grid step; every channel frequency must be a multiple of
    /// this relative to `center`.
    step: i64,

    /// Initial channel frequencies (Hz), in order. A bare `.` ends the list
    /// early, letting the scanner discover every channel instead.
    #[arg(allow_hyphen_values = true)]
    freqs: Vec<String>,

    /// Per-channel IF bandwidth, in Hz.
    #[arg(long, default_value_t = 12_500)]
    if_bandwidth: i64,

    /// Demodulate as AM instead of the default narrowband FM.
    #[arg(long)]
    am: bool,

    /// Use the autocorrelation squelch voter instead of the default
    /// signal-strength voter.
    #[arg(long)]
    autocorrelation: bool,

    /// Log every channel's strength/hysteresis transition at info level.
    #[arg(long)]
    verbose_strength: bool,

    /// Log the raw autocorrelation metric at debug level.
    #[arg(long)]
    debug_autocorrelation: bool,

    /// Directory recordings are written under, one subdirectory per frequency.
    #[arg(long, default_value = "./out")]
    out_dir: PathBuf,
}

fn parse_initial_freqs(raw: &[String]) -> Vec<i64> {
    raw.iter()
        .take_while(|s| s.as_str() != ".")
        .map(|s| s.parse::<i64>().unwrap_or_else(|_| panic!("invalid frequency: {s}")))
        .collect()
}

enum ScannerInput {
    Batch(SampleBatch),
    Shutdown,
}

fn main() -> anyhow::Result<()> {
    use tracing_subscriber::EnvFilter;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let cli = Cli::parse();
    let initial_freqs = parse_initial_freqs(&cli.freqs);
    let mode = if cli.am { Mode::Am } else { Mode::Fm };
    let voter_kind = if cli.autocorrelation { VoterKind::Autocorrelation } else { VoterKind::Strength };

    let config = match Config::new(
        cli.center,
        cli.input_rate,
        cli.step,
        cli.if_bandwidth,
        mode,
        voter_kind,
        cli.verbose_strength,
        cli.debug_autocorrelation,
        initial_freqs,
    ) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(%err, "invalid configuration");
            anyhow::bail!(err);
        }
    };

    let voter = match config.voter {
        VoterKind::Strength => Voter::Strength,
        VoterKind::Autocorrelation => Voter::Autocorrelation,
    };

    let registry = ChannelRegistry::new();
    let sink = WavSink::new(cli.out_dir, AUDIO_RATE as u32);

    let mut workers: Vec<JoinHandle<()>> = Vec::new();
    for &freq in &config.initial_freqs {
        spawn_channel(freq, &config, mode, voter, sink.clone(), &registry, &mut workers);
    }

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        ctrlc::set_handler(move || {
            tracing::info!("Ctrl+C received, shutting down");
            running.store(false, Ordering::SeqCst);
        })?;
    }

    let (scanner_tx, scanner_rx) = crossbeam_channel::unbounded::<ScannerInput>();
    let scanner_handle = {
        let registry = registry.clone();
        let config = config.clone();
        let sink = sink.clone();
        std::thread::spawn(move || {
            run_scanner(scanner_rx, registry, config, mode, voter, sink);
        })
    };

    let ingest_size = config.ingest_size() as usize;
    let stdin = io::stdin();
    let mut ingest = IqIngest::new(stdin.lock());

    while running.load(Ordering::SeqCst) {
        let batch = ingest.read_batch(ingest_size)?;
        if batch.is_empty() {
            tracing::info!("input stream ended");
            break;
        }
        dispatcher::dispatch(&registry, &batch);
        let _ = scanner_tx.send(ScannerInput::Batch(batch));
    }

    dispatcher::shutdown_all(&registry);
    let _ = scanner_tx.send(ScannerInput::Shutdown);

    for handle in workers {
        let _ = handle.join();
    }
    let _ = scanner_handle.join();

    Ok(())
}

fn spawn_channel(
    freq_hz: i64,
    config: &Config,
    mode: Mode,
    voter: Voter,
    sink: WavSink,
    registry: &ChannelRegistry,
    workers: &mut Vec<JoinHandle<()>>,
) {
    let if_freq_hz = freq_hz - config.center;
    let worker = ChannelWorker::new(
        freq_hz,
        if_freq_hz,
        config.input_rate,
        config.if_bandwidth,
        mode,
        voter,
        sink,
        config.verbose_strength,
        config.debug_autocorrelation,
    );
    let (tx, rx) = crossbeam_channel::unbounded::<ChannelInput>();
    registry.insert(ChannelHandle { if_freq_hz, sender: tx });

    let handle = std::thread::spawn(move || {
        run_channel_worker(worker, rx);
    });
    workers.push(handle);
}

fn run_scanner(
    rx: crossbeam_channel::Receiver<ScannerInput>,
    registry: ChannelRegistry,
    config: Config,
    mode: Mode,
    voter: Voter,
    sink: WavSink,
) {
    let mut scanner = Scanner::new(config.center, config.input_rate, config.step, N_NOISE, THRESH_FACTOR);
    let mut workers: Vec<JoinHandle<()>> = Vec::new();

    for input in rx {
        match input {
            ScannerInput::Batch(batch) => {
                let candidates = scanner.observe(&batch);
                for freq_hz in candidates {
                    let if_freq_hz = freq_hz - config.center;
                    if registry.covers(if_freq_hz) {
                        continue;
                    }
                    tracing::info!(freq_hz, "scanner opening new channel");
                    spawn_channel(freq_hz, &config, mode, voter, sink.clone(), &registry, &mut workers);
                }
            }
            ScannerInput::Shutdown => break,
        }
    }

    for handle in workers {
        let _ = handle.join();
    }
}
