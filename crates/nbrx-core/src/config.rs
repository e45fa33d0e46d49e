//! Immutable, validated receiver configuration.
//!
//! All tunable parameters live in one [`Config`], built once in `main` and
//! handed by value (it's `Clone` and cheap — a handful of scalars plus a
//! short frequency list) to every worker constructor. Validation happens
//! once, in [`Config::new`], instead of being scattered across call sites.

use thiserror::Error;

/// Intermediate-frequency sample rate after the first decimation stage.
pub const IF_RATE: i64 = 25_000;
/// Audio sample rate after the second decimation stage.
pub const AUDIO_RATE: i64 = 12_500;
/// Audio low-pass cutoff.
pub const AUDIO_BANDWIDTH: i64 = 4_000;
/// Half-open channel width used to test whether a detected carrier already
/// belongs to an existing channel.
pub const CHANNEL_SPACING: i64 = 12_500;
/// Strength-voter threshold above the noise floor, in dB.
pub const THRESHOLD_SNR_DB: f32 = 15.0;
/// Autocorrelation-voter threshold.
pub const THRESHOLD_AC: f32 = 0.4;
/// Lower hysteresis bound (recording -> not-recording boundary).
pub const HIST_LOW: i32 = -3;
/// Upper hysteresis bound (not-recording -> recording boundary).
pub const HIST_HIGH: i32 = 3;
/// Starting value of a channel's adaptive noise floor (`dbfs_off`), before
/// any batch has nudged it toward the channel's actual quiescent level.
pub const INITIAL_DBFS_OFF: f32 = 0.0;
/// Smoothing factor applied to `dbfs_off` when the current block is quieter
/// than the running estimate (tracks downward quickly).
pub const DBFS_OFF_ALPHA_DOWN: f32 = 0.05;
/// Smoothing factor applied to `dbfs_off` when the current block is louder
/// than the running estimate (tracks upward slowly, so a few noisy blocks
/// don't drag the floor up and desensitize the squelch).
pub const DBFS_OFF_ALPHA_UP: f32 = 0.005;
/// Number of PSD snapshots taken at startup to learn the scanner's threshold.
pub const N_NOISE: usize = 5;
/// Standard deviations above the mean used to set the scanner's detection threshold.
pub const THRESH_FACTOR: f32 = 9.0;
/// Fraction of `INPUT_RATE` a channel's IF offset must stay under.
pub const MAX_IF_FRACTION: f64 = 0.4;

/// Demodulation mode selected for every channel in the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Narrowband FM (phase-difference discriminator).
    Fm,
    /// Amplitude modulation (envelope discriminator).
    Am,
}

/// Which squelch voter is active for every channel in the process.
/// Only one voter runs at a time, selected by a command-line flag, so
/// this is a process-wide choice rather than per-channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoterKind {
    /// Signal-strength-above-noise-floor voter.
    Strength,
    /// Autocorrelation-of-baseband voter.
    Autocorrelation,
}

/// Validated, immutable configuration shared by every component.
#[derive(Debug, Clone)]
pub struct Config {
    /// Center (tuned) frequency of the wideband front end, in Hz.
    pub center: i64,
    /// Wideband input sample rate, in complex samples/sec.
    pub input_rate: i64,
    /// Frequency grid step; every channel's IF offset must be a multiple of this.
    pub step: i64,
    /// Per-channel IF bandwidth (full width), in Hz.
    pub if_bandwidth: i64,
    /// Demodulation mode (FM or AM).
    pub mode: Mode,
    /// Active squelch voter.
    pub voter: VoterKind,
    /// Log per-channel strength/hysteresis transitions at `info` level.
    pub verbose_strength: bool,
    /// Log raw autocorrelation metric at `debug` level.
    pub debug_autocorrelation: bool,
    /// RF frequencies (Hz) to demodulate from process start.
    pub initial_freqs: Vec<i64>,
}

/// A configuration value that violates one of the receiver's startup invariants.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// `INPUT_RATE` is not an integer multiple of `IF_RATE`.
    #[error("INPUT_RATE ({input_rate}) is not a multiple of IF_RATE ({if_rate})")]
    InputRateNotMultipleOfIfRate { input_rate: i64, if_rate: i64 },

    /// `IF_RATE` is not an integer multiple of `AUDIO_RATE`.
    #[error("IF_RATE ({if_rate}) is not a multiple of AUDIO_RATE ({audio_rate})")]
    IfRateNotMultipleOfAudioRate { if_rate: i64, audio_rate: i64 },

    /// `INPUT_RATE` is not an integer multiple of `STEP`.
    #[error("INPUT_RATE ({input_rate}) is not a multiple of STEP ({step})")]
    InputRateNotMultipleOfStep { input_rate: i64, step: i64 },

    /// A requested channel frequency is not on the `STEP` grid relative to `CENTER`.
    #[error("frequency {freq} is not aligned to the STEP ({step}) grid around CENTER ({center})")]
    FrequencyNotAligned { freq: i64, center: i64, step: i64 },

    /// A requested channel's IF offset exceeds the usable fraction of the input bandwidth.
    #[error(
        "frequency {freq} has |freq-center|={if_freq} >= {fraction}*INPUT_RATE ({limit})"
    )]
    FrequencyOutOfRange {
        freq: i64,
        if_freq: i64,
        fraction: f64,
        limit: i64,
    },
}

impl Config {
    /// Validates and constructs a `Config`. Every startup invariant is
    /// checked up front; any violation is reported here instead of
    /// panicking mid-process.
    pub fn new(
        center: i64,
        input_rate: i64,
        step: i64,
        if_bandwidth: i64,
        mode: Mode,
        voter: VoterKind,
        verbose_strength: bool,
        debug_autocorrelation: bool,
        initial_freqs: Vec<i64>,
    ) -> Result<Self, ConfigError> {
        if input_rate % IF_RATE != 0 {
            return Err(ConfigError::InputRateNotMultipleOfIfRate { input_rate, if_rate: IF_RATE });
        }
        if IF_RATE % AUDIO_RATE != 0 {
            return Err(ConfigError::IfRateNotMultipleOfAudioRate {
                if_rate: IF_RATE,
                audio_rate: AUDIO_RATE,
            });
        }
        if input_rate % step != 0 {
            return Err(ConfigError::InputRateNotMultipleOfStep { input_rate, step });
        }
        for &freq in &initial_freqs {
            Self::validate_frequency(freq, center, step, input_rate)?;
        }

        Ok(Self {
            center,
            input_rate,
            step,
            if_bandwidth,
            mode,
            voter,
            verbose_strength,
            debug_autocorrelation,
            initial_freqs,
        })
    }

    /// Validates a single candidate channel frequency against the grid and
    /// bandwidth constraints. Used both at startup and whenever the scanner
    /// proposes a new channel.
    pub fn validate_frequency(
        freq: i64,
        center: i64,
        step: i64,
        input_rate: i64,
    ) -> Result<(), ConfigError> {
        let if_freq = freq - center;
        if if_freq % step != 0 {
            return Err(ConfigError::FrequencyNotAligned { freq, center, step });
        }
        let limit = (MAX_IF_FRACTION * input_rate as f64) as i64;
        if if_freq.abs() >= limit {
            return Err(ConfigError::FrequencyOutOfRange {
                freq,
                if_freq: if_freq.abs(),
                fraction: MAX_IF_FRACTION,
                limit,
            });
        }
        Ok(())
    }

    /// Number of complex samples read from the input stream per ingest tick.
    #[must_use]
    pub fn ingest_size(&self) -> i64 {
        self.input_rate / 10
    }

    /// IF decimation ratio applied after the IF band-limiting filter.
    #[must_use]
    pub fn if_decimation(&self) -> i64 {
        self.input_rate / IF_RATE
    }

    /// Audio decimation ratio applied after the audio band-limiting filter.
    #[must_use]
    pub fn audio_decimation(&self) -> i64 {
        IF_RATE / AUDIO_RATE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok_config(freqs: Vec<i64>) -> Result<Config, ConfigError> {
        Config::new(100_000_000, 2_000_000, 1000, 12_500, Mode::Fm, VoterKind::Strength, false, false, freqs)
    }

    #[test]
    fn accepts_well_formed_config() {
        assert!(ok_config(vec![100_012_500, 100_025_000]).is_ok());
    }

    #[test]
    fn rejects_input_rate_not_multiple_of_if_rate() {
        let err = Config::new(0, 2_000_001, 1000, 12_500, Mode::Fm, VoterKind::Strength, false, false, vec![]);
        assert!(matches!(err, Err(ConfigError::InputRateNotMultipleOfIfRate { .. })));
    }

    #[test]
    fn rejects_input_rate_not_multiple_of_step() {
        let err = Config::new(0, 2_000_000, 777, 12_500, Mode::Fm, VoterKind::Strength, false, false, vec![]);
        assert!(matches!(err, Err(ConfigError::InputRateNotMultipleOfStep { .. })));
    }

    #[test]
    fn rejects_misaligned_frequency() {
        let err = ok_config(vec![100_000_333]);
        assert!(matches!(err, Err(ConfigError::FrequencyNotAligned { .. })));
    }

    #[test]
    fn rejects_out_of_range_frequency() {
        // 2_000_000 * 0.4 = 800_000; an 850_000 Hz offset (aligned to 1000) is out of range.
        let err = ok_config(vec![100_000_000 + 850_000]);
        assert!(matches!(err, Err(ConfigError::FrequencyOutOfRange { .. })));
    }

    #[test]
    fn ingest_and_decimation_ratios() {
        let cfg = ok_config(vec![]).unwrap();
        assert_eq!(cfg.ingest_size(), 200_000);
        assert_eq!(cfg.if_decimation(), 80);
        assert_eq!(cfg.audio_decimation(), 2);
    }
}
