use anyhow::Context;
use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row};
use tracing::{debug, info};
use uuid::Uuid;

use crate::averages;
use crate::error::EngineError;
use crate::models::{GradeRecord, LearnerAverage, ScoreCategory, ScoreEntry};
use crate::store::{RecordSession, RecordStore};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Postgres-backed record store. Every session is a pooled connection that
/// goes back to the pool when the session is dropped.
#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub struct PgSession {
    conn: PoolConnection<Postgres>,
}

#[async_trait]
impl RecordStore for PgRecordStore {
    type Session = PgSession;

    async fn acquire(&self) -> Result<PgSession, EngineError> {
        let conn = self.pool.acquire().await?;
        Ok(PgSession { conn })
    }
}

#[async_trait]
impl RecordSession for PgSession {
    async fn find_records_by_learner(
        &mut self,
        learner_id: i64,
    ) -> Result<Vec<GradeRecord>, EngineError> {
        let rows = sqlx::query(
            r#"
            SELECT g.id AS grade_id, g.learner_id, g.class_id, s.score_type, s.score
            FROM grades_agg.grades g
            LEFT JOIN grades_agg.scores s ON s.grade_id = g.id
            WHERE g.learner_id = $1
            ORDER BY g.class_id, g.id, s.position
            "#,
        )
        .bind(learner_id)
        .fetch_all(&mut *self.conn)
        .await?;

        let records = group_rows(&rows)?;
        Ok(records.into_iter().map(|(_, record)| record).collect())
    }

    async fn find_learners_with_average(
        &mut self,
        class_id: Option<i64>,
    ) -> Result<Vec<LearnerAverage>, EngineError> {
        let rows = sqlx::query(
            r#"
            SELECT learner_id, class_id, weighted_average
            FROM grades_agg.grades
            WHERE $1::BIGINT IS NULL OR class_id = $1
            "#,
        )
        .bind(class_id)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| LearnerAverage {
                learner_id: row.get("learner_id"),
                class_id: row.get("class_id"),
                weighted_average: row.get("weighted_average"),
            })
            .collect())
    }
}

/// Folds joined grade/score rows, ordered by grade, into records keyed by
/// grade id.
fn group_rows(rows: &[PgRow]) -> Result<Vec<(i64, GradeRecord)>, EngineError> {
    let mut records: Vec<(i64, GradeRecord)> = Vec::new();

    for row in rows {
        let grade_id: i64 = row.get("grade_id");
        if records.last().map(|(id, _)| *id) != Some(grade_id) {
            records.push((
                grade_id,
                GradeRecord {
                    learner_id: row.get("learner_id"),
                    class_id: row.get("class_id"),
                    scores: Vec::new(),
                },
            ));
        }

        let score_type: Option<String> = row.get("score_type");
        let score: Option<f64> = row.get("score");
        if let (Some(score_type), Some(score), Some((_, record))) =
            (score_type, score, records.last_mut())
        {
            let category = score_type.parse::<ScoreCategory>().map_err(|_| {
                EngineError::store_unavailable(format!(
                    "grade {grade_id} has unrecognised score type {score_type:?}"
                ))
            })?;
            record.scores.push(ScoreEntry { category, score });
        }
    }

    Ok(records)
}

/// Recomputes the materialized weighted average of every grade row.
pub async fn refresh_weighted_averages(pool: &PgPool) -> anyhow::Result<usize> {
    let mut tx = pool.begin().await?;

    let rows = sqlx::query(
        r#"
        SELECT g.id AS grade_id, g.learner_id, g.class_id, s.score_type, s.score
        FROM grades_agg.grades g
        LEFT JOIN grades_agg.scores s ON s.grade_id = g.id
        ORDER BY g.id, s.position
        "#,
    )
    .fetch_all(&mut *tx)
    .await?;

    let records = group_rows(&rows)?;
    for (grade_id, record) in &records {
        let average = averages::weighted_average(&record.scores);
        debug!(
            grade_id,
            learner_id = record.learner_id,
            class_id = record.class_id,
            ?average,
            "Refreshing average"
        );
        sqlx::query("UPDATE grades_agg.grades SET weighted_average = $1 WHERE id = $2")
            .bind(average)
            .bind(*grade_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    info!(grades = records.len(), "Weighted averages refreshed");
    Ok(records.len())
}

async fn upsert_grade(pool: &PgPool, learner_id: i64, class_id: i64) -> anyhow::Result<i64> {
    let grade_id: i64 = sqlx::query(
        r#"
        INSERT INTO grades_agg.grades (learner_id, class_id)
        VALUES ($1, $2)
        ON CONFLICT (learner_id, class_id) DO UPDATE
        SET learner_id = EXCLUDED.learner_id
        RETURNING id
        "#,
    )
    .bind(learner_id)
    .bind(class_id)
    .fetch_one(pool)
    .await?
    .get("id");

    Ok(grade_id)
}

/// Appends a score to a grade row. Returns `false` when `source_key` was
/// already imported.
async fn insert_score(
    pool: &PgPool,
    grade_id: i64,
    entry: ScoreEntry,
    source_key: &str,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO grades_agg.scores (id, grade_id, position, score_type, score, source_key)
        SELECT $1, $2, COALESCE(MAX(position) + 1, 0), $3, $4, $5
        FROM grades_agg.scores
        WHERE grade_id = $2
        ON CONFLICT (source_key) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(grade_id)
    .bind(entry.category.as_str())
    .bind(entry.score)
    .bind(source_key)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    use ScoreCategory::{Exam, Homework, Quiz};

    let grades: Vec<(i64, i64, Vec<(ScoreCategory, f64)>)> = vec![
        (1, 10, vec![(Exam, 80.0), (Exam, 90.0), (Quiz, 70.0), (Homework, 100.0)]),
        (1, 4, vec![(Quiz, 80.0), (Quiz, 90.0), (Homework, 70.0)]),
        (2, 5, vec![(Exam, 60.0), (Quiz, 60.0), (Homework, 60.0)]),
        (3, 5, vec![(Exam, 71.0), (Quiz, 71.0), (Homework, 71.0)]),
        (4, 5, vec![(Exam, 72.0), (Quiz, 72.0), (Homework, 72.0)]),
        (5, 5, vec![(Exam, 95.0), (Quiz, 95.0), (Homework, 95.0)]),
    ];

    for (learner_id, class_id, scores) in grades {
        let grade_id = upsert_grade(pool, learner_id, class_id).await?;
        for (index, (category, score)) in scores.into_iter().enumerate() {
            let entry = ScoreEntry::new(category, score)?;
            let source_key = format!("seed-{learner_id}-{class_id}-{index}");
            insert_score(pool, grade_id, entry, &source_key).await?;
        }
    }

    refresh_weighted_averages(pool).await?;
    Ok(())
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        learner_id: i64,
        class_id: i64,
        score_type: String,
        score: f64,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut inserted = 0usize;

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result?;
        let category: ScoreCategory = row
            .score_type
            .parse()
            .with_context(|| format!("row {}: bad score type", line + 1))?;
        let entry = ScoreEntry::new(category, row.score)
            .with_context(|| format!("row {}: bad score", line + 1))?;

        let grade_id = upsert_grade(pool, row.learner_id, row.class_id).await?;
        let source_key = row
            .source_key
            .filter(|key| !key.is_empty())
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        if insert_score(pool, grade_id, entry, &source_key).await? {
            inserted += 1;
        }
    }

    refresh_weighted_averages(pool).await?;
    Ok(inserted)
}
