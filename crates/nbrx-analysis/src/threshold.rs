//! Noise-floor threshold learning from a handful of startup PSD snapshots.

/// Learned scalar detection threshold plus the statistics it was derived
/// from, for logging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseFloor {
    /// Mean power level (dB) the threshold is offset from.
    pub mean_db: f32,
    /// Standard deviation (dB) of the final snapshot's bins.
    pub std_db: f32,
    /// `mean_db + factor * std_db`: anything above this is a candidate carrier.
    pub threshold_db: f32,
}

/// Accumulates a fixed number of PSD snapshots taken before any channel is
/// recording, then derives a single scalar threshold from them.
pub struct NoiseFloorLearner {
    snapshots: Vec<Vec<f32>>,
    required: usize,
    thresh_factor: f32,
}

impl NoiseFloorLearner {
    /// Builds a learner that needs `required` snapshots before it can
    /// compute a threshold, set `thresh_factor` standard deviations above
    /// the floor.
    #[must_use]
    pub fn new(required: usize, thresh_factor: f32) -> Self {
        Self { snapshots: Vec::with_capacity(required), required, thresh_factor }
    }

    /// Records one PSD snapshot (power in dB, one value per frequency bin).
    /// Snapshots past `required` are dropped rather than accepted.
    pub fn push_snapshot(&mut self, psd_db: Vec<f32>) {
        if self.snapshots.len() < self.required {
            self.snapshots.push(psd_db);
        }
    }

    /// Whether enough snapshots have been collected to learn a threshold.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.snapshots.len() >= self.required
    }

    /// Derives the noise floor from the collected snapshots.
    ///
    /// Both the mean and the standard deviation are taken only from the
    /// *last* snapshot's bins — the earlier snapshots exist only to give the
    /// estimator time to settle before the one that counts is drawn; they
    /// never contribute their own statistics.
    ///
    /// # Panics
    ///
    /// Panics if called before [`NoiseFloorLearner::is_ready`] returns true.
    #[must_use]
    pub fn learn(&self) -> NoiseFloor {
        assert!(self.is_ready(), "not enough snapshots collected yet");

        let last = self.snapshots.last().expect("is_ready guarantees at least one snapshot");
        let mean_db = last.iter().copied().sum::<f32>() / last.len() as f32;
        let variance = last.iter().map(|v| (v - mean_db).powi(2)).sum::<f32>() / last.len() as f32;
        let std_db = variance.sqrt();

        NoiseFloor { mean_db, std_db, threshold_db: mean_db + self.thresh_factor * std_db }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_ready_until_required_snapshots_collected() {
        let mut learner = NoiseFloorLearner::new(3, 9.0);
        assert!(!learner.is_ready());
        learner.push_snapshot(vec![-80.0, -81.0]);
        learner.push_snapshot(vec![-79.0, -80.0]);
        assert!(!learner.is_ready());
        learner.push_snapshot(vec![-80.0, -80.0]);
        assert!(learner.is_ready());
    }

    #[test]
    fn extra_snapshots_past_required_are_ignored() {
        let mut learner = NoiseFloorLearner::new(2, 9.0);
        learner.push_snapshot(vec![-80.0]);
        learner.push_snapshot(vec![-80.0]);
        learner.push_snapshot(vec![1000.0]); // would wreck the floor if accepted
        let floor = learner.learn();
        assert!((floor.mean_db - -80.0).abs() < 1e-4);
    }

    #[test]
    fn mean_and_std_come_from_final_snapshot_only() {
        let mut learner = NoiseFloorLearner::new(3, 0.0);
        learner.push_snapshot(vec![-100.0, -100.0]);
        learner.push_snapshot(vec![-100.0, -100.0]);
        learner.push_snapshot(vec![-50.0, -70.0]);
        let floor = learner.learn();
        assert!((floor.mean_db - -60.0).abs() < 1e-4, "mean_db was {}", floor.mean_db);
        // Final snapshot alone has std 10 ([-50,-70] around mean -60); a
        // pooled computation across all three snapshots would give a much
        // smaller value since the first two snapshots are identical.
        assert!((floor.std_db - 10.0).abs() < 1e-3, "std_db was {}", floor.std_db);
    }

    #[test]
    fn identical_snapshots_give_zero_std_and_threshold_equals_mean() {
        let mut learner = NoiseFloorLearner::new(2, 9.0);
        learner.push_snapshot(vec![-80.0, -80.0, -80.0]);
        learner.push_snapshot(vec![-80.0, -80.0, -80.0]);
        let floor = learner.learn();
        assert!(floor.std_db.abs() < 1e-5);
        assert!((floor.threshold_db - floor.mean_db).abs() < 1e-5);
    }
}
