//! Status and body mapping for the three query operations.

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, info, warn, Instrument};
use uuid::Uuid;

use crate::engine;
use crate::error::EngineError;
use crate::models::ThresholdStats;
use crate::stats::DEFAULT_THRESHOLD;
use crate::store::RecordStore;

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    fn from_error(err: &EngineError) -> Self {
        let status = err.status_code();
        let body = match err {
            EngineError::InvalidInput { .. } => {
                warn!(error = %err, "Rejected request");
                json!({ "error": err.to_string() })
            }
            EngineError::RecordStoreUnavailable { .. } => {
                error!(error = %err, "Error fetching statistics");
                json!({ "error": "Internal Server Error" })
            }
        };
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> i32 {
        match self.status {
            200..=299 => 0,
            500..=599 => 2,
            _ => 1,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThresholdStatsBody {
    total_learners: usize,
    learners_above_threshold: usize,
    #[serde(rename = "percentageAbove70")]
    percentage: String,
    threshold: f64,
}

fn stats_body(stats: &ThresholdStats, threshold: f64) -> Value {
    json!(ThresholdStatsBody {
        total_learners: stats.total_learners,
        learners_above_threshold: stats.learners_above_threshold,
        percentage: stats.formatted_percentage(),
        threshold,
    })
}

fn request_span(operation: &'static str) -> tracing::Span {
    tracing::info_span!("request", operation, request_id = %Uuid::new_v4())
}

/// 200 with the averages, or 404 with an empty list when the learner has no
/// records.
pub async fn learner_class_averages<S: RecordStore>(
    store: &S,
    raw_learner_id: &str,
) -> ApiResponse {
    async {
        match engine::compute_class_averages(store, raw_learner_id).await {
            Ok(averages) if averages.is_empty() => {
                info!(learner_id = raw_learner_id, "No grade records found");
                ApiResponse {
                    status: 404,
                    body: json!([]),
                }
            }
            Ok(averages) => ApiResponse::ok(json!(averages)),
            Err(err) => ApiResponse::from_error(&err),
        }
    }
    .instrument(request_span("learner_class_averages"))
    .await
}

pub async fn global_threshold_stats<S: RecordStore>(
    store: &S,
    threshold: Option<f64>,
) -> ApiResponse {
    let threshold = threshold.unwrap_or(DEFAULT_THRESHOLD);
    async {
        match engine::compute_global_threshold_stats(store, threshold).await {
            Ok(stats) => ApiResponse::ok(stats_body(&stats, threshold)),
            Err(err) => ApiResponse::from_error(&err),
        }
    }
    .instrument(request_span("global_threshold_stats"))
    .await
}

pub async fn class_threshold_stats<S: RecordStore>(
    store: &S,
    raw_class_id: Option<&str>,
    threshold: Option<f64>,
) -> ApiResponse {
    let threshold = threshold.unwrap_or(DEFAULT_THRESHOLD);
    async {
        match engine::compute_class_threshold_stats(store, raw_class_id, threshold).await {
            Ok(stats) => ApiResponse::ok(stats_body(&stats, threshold)),
            Err(err) => ApiResponse::from_error(&err),
        }
    }
    .instrument(request_span("class_threshold_stats"))
    .await
}
