//! Per-channel demodulator worker.
//!
//! Each channel owns its entire DSP chain and runs on its own OS thread,
//! reading batches from a dedicated [`crossbeam_channel::Receiver`] fed by
//! the dispatcher. A panic partway through one batch is caught at the
//! worker's outer loop so a single channel's bad state can't take the rest
//! of the process down with it.

use std::panic::AssertUnwindSafe;

use chrono::{Duration, Utc};
use crossbeam_channel::Receiver;
use nbrx_core::{
    AmDiscriminator, CarrierMixer, Decimator, FirFilter, FmDiscriminator, Mode, SquelchEngine,
    SquelchEvent, Voter,
};
use nbrx_core::config::{AUDIO_BANDWIDTH, AUDIO_RATE, IF_RATE};
use nbrx_io::{SampleBatch, WavSink};
use num_complex::Complex;

/// Pre-roll length, in seconds, buffered while a channel's squelch is closed.
const PREROLL_SECS: f64 = 1.0;
/// DC-removal high-pass cutoff applied to every channel's audio, in Hz.
const DC_REMOVAL_CUTOFF_HZ: f64 = 100.0;

/// A message delivered to a channel worker over its input queue.
pub enum ChannelInput {
    /// A new wideband batch to mix, filter, and demodulate.
    Batch(SampleBatch),
    /// The receiver should finish any in-progress recording and exit.
    Shutdown,
}

enum Discriminator {
    Fm(FmDiscriminator),
    Am(AmDiscriminator),
}

/// Owns one channel's full DSP chain: mixer, IF filter/decimator,
/// discriminator, audio filter/decimator, DC-removal filter, squelch, and
/// recording sink.
pub struct ChannelWorker {
    freq_hz: i64,
    mixer: CarrierMixer,
    if_filter: FirFilter<Complex<f32>>,
    if_decimator: Decimator<Complex<f32>>,
    discriminator: Discriminator,
    audio_filter: FirFilter<f32>,
    audio_decimator: Decimator<f32>,
    dc_filter: FirFilter<f32>,
    squelch: SquelchEngine,
    sink: WavSink,
    recording: Vec<f32>,
    verbose_strength: bool,
    debug_autocorrelation: bool,
}

impl ChannelWorker {
    /// Builds the DSP chain for a channel at `freq_hz` (absolute RF
    /// frequency), whose IF offset from the wideband center is `if_freq_hz`.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        freq_hz: i64,
        if_freq_hz: i64,
        input_rate_hz: i64,
        if_bandwidth_hz: i64,
        mode: Mode,
        voter: Voter,
        sink: WavSink,
        verbose_strength: bool,
        debug_autocorrelation: bool,
    ) -> Self {
        let if_decimation = (input_rate_hz / IF_RATE) as usize;
        let audio_decimation = (IF_RATE / AUDIO_RATE) as usize;

        let if_taps = nbrx_core::design_lowpass(if_bandwidth_hz as f64 / 2.0, input_rate_hz as f64);
        let audio_taps = nbrx_core::design_lowpass(AUDIO_BANDWIDTH as f64, IF_RATE as f64);
        let dc_taps = nbrx_core::design_highpass(DC_REMOVAL_CUTOFF_HZ, AUDIO_RATE as f64);

        let discriminator = match mode {
            Mode::Fm => Discriminator::Fm(FmDiscriminator::new(IF_RATE, if_bandwidth_hz)),
            Mode::Am => Discriminator::Am(AmDiscriminator::new()),
        };

        let preroll_capacity = (PREROLL_SECS * AUDIO_RATE as f64) as usize;

        Self {
            freq_hz,
            mixer: CarrierMixer::new(if_freq_hz, input_rate_hz),
            if_filter: FirFilter::new(if_taps),
            if_decimator: Decimator::new(if_decimation),
            discriminator,
            audio_filter: FirFilter::new(audio_taps),
            audio_decimator: Decimator::new(audio_decimation),
            dc_filter: FirFilter::new(dc_taps),
            squelch: SquelchEngine::new(voter, preroll_capacity),
            sink,
            recording: Vec::new(),
            verbose_strength,
            debug_autocorrelation,
        }
    }

    /// Runs one batch through the full mix/filter/decimate/discriminate/
    /// filter/decimate/DC-remove/squelch pipeline, writing or extending a
    /// recording as the squelch state dictates.
    pub fn process_batch(&mut self, batch: &SampleBatch) {
        let mixed = self.mixer.mix_block(batch);
        let if_filtered = self.if_filter.process_block(&mixed);
        let if_decimated = self.if_decimator.process_block(&if_filtered);

        let audio = match &mut self.discriminator {
            Discriminator::Fm(fm) => fm.discriminate_block(&if_decimated),
            Discriminator::Am(am) => am.discriminate_block(&if_decimated),
        };

        let audio_filtered = self.audio_filter.process_block(&audio);
        let audio_decimated = self.audio_decimator.process_block(&audio_filtered);
        let audio_dc_removed = self.dc_filter.process_block(&audio_decimated);

        if audio_dc_removed.is_empty() {
            return;
        }

        let (event, metric) = self.squelch.process_block(&audio_dc_removed);
        match self.squelch.voter() {
            Voter::Strength if self.verbose_strength => {
                tracing::info!(
                    freq = self.freq_hz,
                    level_db = metric,
                    counter = self.squelch.counter(),
                    recording = self.squelch.is_recording(),
                    "strength vote"
                );
            }
            Voter::Autocorrelation if self.debug_autocorrelation => {
                tracing::debug!(
                    freq = self.freq_hz,
                    autocorrelation = metric,
                    counter = self.squelch.counter(),
                    "autocorrelation vote"
                );
            }
            _ => {}
        }
        match event {
            SquelchEvent::Start(audio) => {
                self.recording = audio;
            }
            SquelchEvent::Continue(audio) => {
                self.recording.extend(audio);
            }
            SquelchEvent::Stop => {
                self.finalize_recording();
            }
            SquelchEvent::Idle => {}
        }
    }

    /// Writes out the current recording, if any, stamping it with the
    /// recording's actual start time: `now`, backdated by the recording's
    /// own duration so the timestamp reflects when the squelch opened
    /// rather than when the last block was flushed.
    fn finalize_recording(&mut self) {
        if self.recording.is_empty() {
            return;
        }
        let audio = std::mem::take(&mut self.recording);
        let backdate = Duration::microseconds(
            (audio.len() as f64 * 1_000_000.0 / AUDIO_RATE as f64) as i64,
        );
        let started_at = Utc::now() - backdate;
        if let Err(err) = self.sink.write(self.freq_hz, started_at, &audio) {
            tracing::warn!(freq = self.freq_hz, error = %err, "failed to write recording");
        }
    }
}

/// Runs a channel worker to completion: pulls batches off `rx`, processes
/// each one inside [`std::panic::catch_unwind`] so a panic during one
/// batch is logged and skipped rather than unwinding past the thread
/// boundary, and finalizes any in-progress recording on shutdown.
pub fn run_channel_worker(mut worker: ChannelWorker, rx: Receiver<ChannelInput>) {
    for input in rx {
        match input {
            ChannelInput::Batch(batch) => {
                let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
                    worker.process_batch(&batch);
                }));
                if let Err(payload) = result {
                    let message = payload
                        .downcast_ref::<&str>()
                        .map(|s| (*s).to_string())
                        .or_else(|| payload.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic payload".to_string());
                    tracing::error!(freq = worker.freq_hz, %message, "channel worker panicked on batch, continuing");
                }
            }
            ChannelInput::Shutdown => break,
        }
    }
    worker.finalize_recording();
}
