//! Access to persisted grade data.
//!
//! The engine never holds a connection between calls: each computation
//! acquires a [`RecordSession`], runs its query and lets the session drop,
//! which hands the underlying resource back on every exit path.

use async_trait::async_trait;

use crate::error::EngineError;
use crate::models::{GradeRecord, LearnerAverage};

#[async_trait]
pub trait RecordStore: Send + Sync {
    type Session: RecordSession;

    async fn acquire(&self) -> Result<Self::Session, EngineError>;
}

#[async_trait]
pub trait RecordSession: Send {
    /// All grade records for one learner, one per class.
    async fn find_records_by_learner(
        &mut self,
        learner_id: i64,
    ) -> Result<Vec<GradeRecord>, EngineError>;

    /// Every (learner, class) pair with its materialized weighted average,
    /// optionally restricted to one class.
    async fn find_learners_with_average(
        &mut self,
        class_id: Option<i64>,
    ) -> Result<Vec<LearnerAverage>, EngineError>;
}
