//! WAV recording sink: one file per transmission, grouped by frequency.

use std::path::PathBuf;

use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc};
use hound::{SampleFormat, WavSpec, WavWriter};

use crate::Result;

/// Sentinel samples opening a timestamp watermark.
const WATERMARK_START: [i16; 2] = [0x81, 0x82];
/// Sentinel samples closing a timestamp watermark.
const WATERMARK_END: [i16; 2] = [0x83, 0x84];
/// Offset added to every encoded digit/field value so the watermark sits in
/// a small, easily-recognized band of the 16-bit PCM range.
const DIGIT_BASE: i32 = 127 - 5;
/// Total samples produced by [`encode_timestamp_watermark`]: 2 start
/// sentinels, 15 field values, 2 end sentinels.
const WATERMARK_LEN: usize = 19;

/// Encodes `now` as the fixed 19-sample timestamp watermark prefixed to
/// every recording: start sentinels, 4 year digits, the raw month, 2 each
/// of day/hour/minute/second digits, 2 fractional-second digits (tenths and
/// hundredths), and end sentinels. Every value is written as the raw PCM
/// sample `DIGIT_BASE + value`, not a float-scaled audio sample — this
/// exact byte layout is load-bearing for downstream tooling and must not
/// change.
#[must_use]
pub fn encode_timestamp_watermark(now: DateTime<Utc>) -> Vec<i16> {
    let year = now.year();
    let month = now.month() as i32;
    let day = now.day() as i32;
    let hour = now.hour() as i32;
    let minute = now.minute() as i32;
    let second = now.second() as i32;
    let micros = now.timestamp_subsec_micros() as i32;

    let field = |v: i32| -> i16 { (DIGIT_BASE + v) as i16 };

    let mut data = Vec::with_capacity(WATERMARK_LEN);
    data.extend_from_slice(&WATERMARK_START);
    data.push(field((year % 10_000) / 1_000));
    data.push(field((year % 1_000) / 100));
    data.push(field((year % 100) / 10));
    data.push(field(year % 10));
    data.push(field(month));
    data.push(field(day / 10));
    data.push(field(day % 10));
    data.push(field(hour / 10));
    data.push(field(hour % 10));
    data.push(field(minute / 10));
    data.push(field(minute % 10));
    data.push(field(second / 10));
    data.push(field(second % 10));
    data.push(field((micros % 1_000_000) / 100_000));
    data.push(field((micros % 100_000) / 10_000));
    data.extend_from_slice(&WATERMARK_END);
    data
}

/// Decodes a watermark produced by [`encode_timestamp_watermark`] back into
/// a timestamp, accurate to the nearest 10 milliseconds (the two fractional
/// digits the layout carries). Returns `None` if the buffer is too short or
/// the sentinels don't match.
#[must_use]
pub fn decode_timestamp_watermark(samples: &[i16]) -> Option<DateTime<Utc>> {
    if samples.len() < WATERMARK_LEN {
        return None;
    }
    if samples[0] != WATERMARK_START[0] || samples[1] != WATERMARK_START[1] {
        return None;
    }
    if samples[17] != WATERMARK_END[0] || samples[18] != WATERMARK_END[1] {
        return None;
    }

    let digit = |i: usize| -> i32 { i32::from(samples[i]) - DIGIT_BASE };

    let year = digit(2) * 1_000 + digit(3) * 100 + digit(4) * 10 + digit(5);
    let month = digit(6) as u32;
    let day = (digit(7) * 10 + digit(8)) as u32;
    let hour = (digit(9) * 10 + digit(10)) as u32;
    let minute = (digit(11) * 10 + digit(12)) as u32;
    let second = (digit(13) * 10 + digit(14)) as u32;
    let frac_hundredths = digit(15) * 10 + digit(16);

    let base = Utc.with_ymd_and_hms(year, month, day, hour, minute, second).single()?;
    Some(base + Duration::milliseconds(i64::from(frac_hundredths) * 10))
}

/// Writes one channel's recording to `<base_dir>/<freq_hz>/<timestamp>.wav`,
/// prefixed with a timestamp watermark.
#[derive(Clone)]
pub struct WavSink {
    base_dir: PathBuf,
    sample_rate_hz: u32,
}

impl WavSink {
    /// Builds a sink rooted at `base_dir`; per-frequency subdirectories are
    /// created lazily on first write.
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>, sample_rate_hz: u32) -> Self {
        Self { base_dir: base_dir.into(), sample_rate_hz }
    }

    /// Writes `audio` as a mono 16-bit PCM WAV file under this channel's
    /// frequency directory, naming the file from `started_at`.
    pub fn write(&self, freq_hz: i64, started_at: DateTime<Utc>, audio: &[f32]) -> Result<PathBuf> {
        let dir = self.base_dir.join(freq_hz.to_string());
        std::fs::create_dir_all(&dir)?;

        let filename = format!("{}.wav", started_at.format("%d-%m-%Y_%H-%M-%S%.3f"));
        let path = dir.join(filename);

        let spec = WavSpec {
            channels: 1,
            sample_rate: self.sample_rate_hz,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&path, spec)?;

        for sample in encode_timestamp_watermark(started_at) {
            writer.write_sample(sample)?;
        }
        for &sample in audio {
            let clamped = sample.clamp(-1.0, 1.0);
            writer.write_sample((clamped * i16::MAX as f32) as i16)?;
        }
        writer.finalize()?;

        tracing::info!(freq_hz, samples = audio.len(), path = %path.display(), "wrote recording");

        Ok(path)
    }

    /// The frequency directory a channel's recordings are written under.
    #[must_use]
    pub fn channel_dir(&self, freq_hz: i64) -> PathBuf {
        self.base_dir.join(freq_hz.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn watermark_round_trips() {
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 10, 30, 45).unwrap() + Duration::milliseconds(120);
        let encoded = encode_timestamp_watermark(now);
        assert_eq!(encoded.len(), WATERMARK_LEN);

        let decoded = decode_timestamp_watermark(&encoded).unwrap();
        assert_eq!(decoded.year(), now.year());
        assert_eq!(decoded.month(), now.month());
        assert_eq!(decoded.day(), now.day());
        assert_eq!(decoded.hour(), now.hour());
        assert_eq!(decoded.minute(), now.minute());
        assert_eq!(decoded.second(), now.second());
        assert_eq!(decoded.timestamp_subsec_millis(), now.timestamp_subsec_millis());
    }

    #[test]
    fn watermark_starts_and_ends_with_sentinels() {
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 10, 30, 45).unwrap();
        let encoded = encode_timestamp_watermark(now);
        assert_eq!(&encoded[..2], &WATERMARK_START);
        assert_eq!(&encoded[17..19], &WATERMARK_END);
    }

    #[test]
    fn short_buffer_fails_to_decode() {
        let short = vec![0x81, 0x82, 122, 122];
        assert!(decode_timestamp_watermark(&short).is_none());
    }

    #[test]
    fn write_creates_per_frequency_directory() {
        let dir = tempdir().unwrap();
        let sink = WavSink::new(dir.path(), 12_500);
        let started_at = Utc.with_ymd_and_hms(2024, 3, 5, 10, 30, 0).unwrap();

        let path = sink.write(145_500_000, started_at, &[0.1, -0.2, 0.3]).unwrap();
        assert!(path.starts_with(dir.path().join("145500000")));
        assert!(path.exists());
    }

    #[test]
    fn written_file_contains_watermark_plus_audio_sample_count() {
        let dir = tempdir().unwrap();
        let sink = WavSink::new(dir.path(), 12_500);
        let started_at = Utc.with_ymd_and_hms(2024, 3, 5, 10, 30, 0).unwrap();
        let audio = vec![0.0f32; 100];

        let path = sink.write(100_000_000, started_at, &audio).unwrap();
        let reader = hound::WavReader::open(path).unwrap();
        assert_eq!(reader.len() as usize, WATERMARK_LEN + audio.len());
    }
}
