use tracing::{debug, info};

use crate::averages;
use crate::error::EngineError;
use crate::models::{parse_identifier, validate_threshold, ClassAverage, ThresholdStats};
use crate::stats;
use crate::store::{RecordSession, RecordStore};

/// Weighted average per class for one learner. An unknown learner yields an
/// empty vector, not an error.
pub async fn compute_class_averages<S: RecordStore>(
    store: &S,
    raw_learner_id: &str,
) -> Result<Vec<ClassAverage>, EngineError> {
    let learner_id = parse_identifier("learner_id", raw_learner_id)?;

    let records = {
        let mut session = store.acquire().await?;
        session.find_records_by_learner(learner_id).await?
    };
    debug!(learner_id, records = records.len(), "Loaded grade records");

    let averages = averages::class_averages(&records);
    info!(learner_id, classes = averages.len(), "Computed class averages");
    Ok(averages)
}

pub async fn compute_threshold_stats<S: RecordStore>(
    store: &S,
    threshold: f64,
    class_id: Option<i64>,
) -> Result<ThresholdStats, EngineError> {
    let threshold = validate_threshold(threshold)?;

    let population = {
        let mut session = store.acquire().await?;
        session.find_learners_with_average(class_id).await?
    };

    let result = stats::threshold_stats(&population, threshold);
    info!(
        ?class_id,
        threshold,
        total = result.total_learners,
        above = result.learners_above_threshold,
        "Computed threshold statistics"
    );
    Ok(result)
}

pub async fn compute_global_threshold_stats<S: RecordStore>(
    store: &S,
    threshold: f64,
) -> Result<ThresholdStats, EngineError> {
    compute_threshold_stats(store, threshold, None).await
}

/// Class-scoped statistics. The class id must be present and an integer.
pub async fn compute_class_threshold_stats<S: RecordStore>(
    store: &S,
    raw_class_id: Option<&str>,
    threshold: f64,
) -> Result<ThresholdStats, EngineError> {
    let class_id = match raw_class_id {
        Some(raw) => parse_identifier("class_id", raw)?,
        None => return Err(EngineError::invalid_input("class_id", "")),
    };
    compute_threshold_stats(store, threshold, Some(class_id)).await
}
