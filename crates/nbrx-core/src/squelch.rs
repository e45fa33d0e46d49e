//! Hysteresis squelch with pre-roll buffering.
//!
//! Two voters decide, per audio batch, whether a channel currently carries
//! a signal: a signal-strength voter (RMS level above the channel's own
//! adaptive noise floor) and an autocorrelation voter (voice/tone energy
//! correlates with itself across lags; noise doesn't). Either vote feeds
//! the same hysteresis counter so a single channel momentarily dipping
//! below threshold doesn't chop a transmission into fragments.

use std::collections::VecDeque;

use crate::config::{
    DBFS_OFF_ALPHA_DOWN, DBFS_OFF_ALPHA_UP, HIST_HIGH, HIST_LOW, INITIAL_DBFS_OFF, THRESHOLD_AC,
    THRESHOLD_SNR_DB,
};
use crate::math::{clamp_i32, dbfs};

/// Which metric decides whether a channel is "open".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Voter {
    /// RMS signal strength compared against the channel's adaptive noise floor.
    Strength,
    /// Full-lag autocorrelation of the audio block.
    Autocorrelation,
}

impl Voter {
    /// Casts a vote for the given audio block, returning `(is_present, metric)`
    /// where `metric` is the raw value compared against the voter's threshold
    /// — useful for the `--debug-autocorrelation`/`--verbose-strength` logging.
    #[must_use]
    pub fn vote(&self, audio: &[f32], dbfs_off: f32) -> (bool, f32) {
        match self {
            Voter::Strength => {
                let rms = rms_level(audio);
                let level_db = dbfs(rms);
                (level_db > dbfs_off + THRESHOLD_SNR_DB, level_db)
            }
            Voter::Autocorrelation => {
                let ac = normalized_autocorrelation(audio);
                (ac > THRESHOLD_AC, ac)
            }
        }
    }
}

fn rms_level(audio: &[f32]) -> f32 {
    if audio.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = audio.iter().map(|s| s * s).sum();
    (sum_sq / audio.len() as f32).sqrt()
}

/// Autocorrelation of `audio` against itself, summed across every lag and
/// normalized by the peak (always the zero-lag energy, by Cauchy-Schwarz)
/// and block length. Periodic/tonal content keeps this ratio near 1;
/// decorrelated or impulsive content drives it toward 0. Returns 0 for an
/// empty or all-zero block.
fn normalized_autocorrelation(audio: &[f32]) -> f32 {
    let n = audio.len();
    if n == 0 {
        return 0.0;
    }
    let lag_product = |lag: usize| -> f32 {
        audio[..n - lag]
            .iter()
            .zip(&audio[lag..])
            .map(|(a, b)| a * b)
            .sum()
    };

    let r0 = lag_product(0).abs();
    if r0 <= 0.0 {
        return 0.0;
    }

    let mut sum_abs = r0;
    let mut max_abs = r0;
    for lag in 1..n {
        let rl = lag_product(lag).abs();
        sum_abs += 2.0 * rl;
        if rl > max_abs {
            max_abs = rl;
        }
    }

    sum_abs / max_abs / n as f32
}

/// Outcome of feeding one audio batch through a [`SquelchEngine`].
#[derive(Debug, Clone, PartialEq)]
pub enum SquelchEvent {
    /// The channel just opened; carries the buffered pre-roll audio followed
    /// by the current batch.
    Start(Vec<f32>),
    /// The channel is open and this batch should be appended to the
    /// in-progress recording.
    Continue(Vec<f32>),
    /// The channel just closed; the current recording should be finalized.
    Stop,
    /// The channel remains closed; nothing is recorded.
    Idle,
}

/// Per-channel squelch state machine: hysteresis counter, open/closed
/// latch, adaptive noise floor, and the pre-roll ring buffer captured
/// while closed.
#[derive(Debug, Clone)]
pub struct SquelchEngine {
    voter: Voter,
    counter: i32,
    recording: bool,
    dbfs_off: f32,
    preroll: VecDeque<f32>,
    preroll_capacity: usize,
}

impl SquelchEngine {
    /// Builds a squelch engine using `voter` to decide channel presence,
    /// buffering up to `preroll_capacity` audio samples while closed.
    #[must_use]
    pub fn new(voter: Voter, preroll_capacity: usize) -> Self {
        Self {
            voter,
            counter: HIST_LOW,
            recording: false,
            dbfs_off: INITIAL_DBFS_OFF,
            preroll: VecDeque::with_capacity(preroll_capacity),
            preroll_capacity,
        }
    }

    /// Whether the channel is currently latched open.
    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Current hysteresis counter value, exposed for `--verbose-strength`/
    /// `--debug-autocorrelation` logging.
    #[must_use]
    pub fn counter(&self) -> i32 {
        self.counter
    }

    /// Which voter this engine was built with.
    #[must_use]
    pub fn voter(&self) -> Voter {
        self.voter
    }

    /// Current adaptive noise floor, in dBFS.
    #[must_use]
    pub fn dbfs_off(&self) -> f32 {
        self.dbfs_off
    }

    /// Feeds one audio batch through the voter and hysteresis counter,
    /// returning what the caller should do with the batch.
    pub fn process_block(&mut self, audio: &[f32]) -> (SquelchEvent, f32) {
        let level_db = dbfs(rms_level(audio));
        let (present, metric) = self.voter.vote(audio, self.dbfs_off);
        let was_recording = self.recording;

        // The floor only tracks while the channel is closed and the block
        // looks like background: a loud transmission must never drag its
        // own squelch threshold up to meet it.
        if !was_recording && !present {
            if level_db < self.dbfs_off {
                self.dbfs_off = DBFS_OFF_ALPHA_DOWN * level_db + (1.0 - DBFS_OFF_ALPHA_DOWN) * self.dbfs_off;
            } else {
                self.dbfs_off = DBFS_OFF_ALPHA_UP * level_db + (1.0 - DBFS_OFF_ALPHA_UP) * self.dbfs_off;
            }
        }

        self.counter = clamp_i32(self.counter + if present { 1 } else { -1 }, HIST_LOW, HIST_HIGH);
        if !was_recording {
            if self.counter >= 0 {
                self.recording = true;
                self.counter = HIST_HIGH;
            }
        } else if self.counter <= 0 {
            self.recording = false;
            self.counter = HIST_LOW;
        }

        let event = if self.recording && !was_recording {
            let mut out: Vec<f32> = self.preroll.drain(..).collect();
            out.extend_from_slice(audio);
            SquelchEvent::Start(out)
        } else if self.recording {
            SquelchEvent::Continue(audio.to_vec())
        } else if was_recording {
            SquelchEvent::Stop
        } else {
            self.push_preroll(audio);
            SquelchEvent::Idle
        };

        (event, metric)
    }

    fn push_preroll(&mut self, audio: &[f32]) {
        for &sample in audio {
            if self.preroll.len() >= self.preroll_capacity {
                self.preroll.pop_front();
            }
            self.preroll.push_back(sample);
        }
    }
}
