use crate::models::{LearnerAverage, ThresholdStats};

pub const DEFAULT_THRESHOLD: f64 = 70.0;

/// Counts the learners whose weighted average is strictly above `threshold`.
/// Learners without an average count toward the total only.
pub fn threshold_stats(population: &[LearnerAverage], threshold: f64) -> ThresholdStats {
    let total_learners = population.len();
    let learners_above_threshold = population
        .iter()
        .filter(|learner| {
            learner
                .weighted_average
                .is_some_and(|average| average > threshold)
        })
        .count();

    ThresholdStats {
        total_learners,
        learners_above_threshold,
        percentage: percentage(learners_above_threshold, total_learners),
    }
}

pub fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round_to(part as f64 / total as f64 * 100.0, 2)
}

/// Rounds half away from zero at `places` decimals.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
