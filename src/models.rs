use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreCategory {
    Exam,
    Quiz,
    Homework,
}

/// Weight applied to each category's mean when combining a class average.
pub const CATEGORY_WEIGHTS: [(ScoreCategory, f64); 3] = [
    (ScoreCategory::Exam, 0.5),
    (ScoreCategory::Quiz, 0.3),
    (ScoreCategory::Homework, 0.2),
];

impl ScoreCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ScoreCategory::Exam => "exam",
            ScoreCategory::Quiz => "quiz",
            ScoreCategory::Homework => "homework",
        }
    }
}

impl FromStr for ScoreCategory {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "exam" => Ok(ScoreCategory::Exam),
            "quiz" => Ok(ScoreCategory::Quiz),
            "homework" => Ok(ScoreCategory::Homework),
            other => Err(EngineError::invalid_input("score_type", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    #[serde(rename = "type")]
    pub category: ScoreCategory,
    pub score: f64,
}

impl ScoreEntry {
    /// Builds an entry, rejecting scores outside `[0, 100]`.
    pub fn new(category: ScoreCategory, score: f64) -> Result<Self, EngineError> {
        if !score.is_finite() || !(0.0..=100.0).contains(&score) {
            return Err(EngineError::invalid_input("score", score));
        }
        Ok(Self { category, score })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeRecord {
    pub learner_id: i64,
    pub class_id: i64,
    pub scores: Vec<ScoreEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassAverage {
    pub class_id: i64,
    pub avg: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LearnerAverage {
    pub learner_id: i64,
    pub class_id: i64,
    pub weighted_average: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdStats {
    pub total_learners: usize,
    pub learners_above_threshold: usize,
    pub percentage: f64,
}

impl ThresholdStats {
    pub fn formatted_percentage(&self) -> String {
        format!("{:.2}", self.percentage)
    }
}

/// Parses a raw identifier, trimming surrounding whitespace.
pub fn parse_identifier(field: &'static str, raw: &str) -> Result<i64, EngineError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| EngineError::invalid_input(field, raw))
}

pub fn validate_threshold(threshold: f64) -> Result<f64, EngineError> {
    if threshold.is_finite() {
        Ok(threshold)
    } else {
        Err(EngineError::invalid_input("threshold", threshold))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_sum_to_one() {
        let total: f64 = CATEGORY_WEIGHTS.iter().map(|(_, weight)| weight).sum();
        assert!((total - 1.0).abs() < 1e-12);
        assert_eq!(CATEGORY_WEIGHTS[0], (ScoreCategory::Exam, 0.5));
        assert_eq!(CATEGORY_WEIGHTS[1], (ScoreCategory::Quiz, 0.3));
        assert_eq!(CATEGORY_WEIGHTS[2], (ScoreCategory::Homework, 0.2));
    }

    #[test]
    fn categories_parse_from_tags() {
        assert_eq!("exam".parse::<ScoreCategory>().unwrap(), ScoreCategory::Exam);
        assert_eq!("homework".parse::<ScoreCategory>().unwrap(), ScoreCategory::Homework);
        assert!("Exam".parse::<ScoreCategory>().is_err());
        assert!("project".parse::<ScoreCategory>().is_err());
    }

    #[test]
    fn score_entries_reject_out_of_range() {
        assert!(ScoreEntry::new(ScoreCategory::Quiz, 0.0).is_ok());
        assert!(ScoreEntry::new(ScoreCategory::Quiz, 100.0).is_ok());
        assert!(ScoreEntry::new(ScoreCategory::Quiz, 100.5).is_err());
        assert!(ScoreEntry::new(ScoreCategory::Quiz, -1.0).is_err());
        assert!(ScoreEntry::new(ScoreCategory::Quiz, f64::NAN).is_err());
    }

    #[test]
    fn score_entry_uses_type_tag_on_the_wire() {
        let entry: ScoreEntry =
            serde_json::from_str(r#"{"type":"exam","score":88.5}"#).unwrap();
        assert_eq!(entry.category, ScoreCategory::Exam);
        assert_eq!(entry.score, 88.5);
    }

    #[test]
    fn identifiers_must_be_integers() {
        assert_eq!(parse_identifier("learner_id", "42").unwrap(), 42);
        assert_eq!(parse_identifier("learner_id", " 7 ").unwrap(), 7);
        assert!(parse_identifier("learner_id", "abc").is_err());
        assert!(parse_identifier("learner_id", "1.5").is_err());
        assert!(parse_identifier("learner_id", "").is_err());
    }

    #[test]
    fn undefined_average_serializes_as_null() {
        let value = serde_json::to_value(ClassAverage {
            class_id: 3,
            avg: None,
        })
        .unwrap();
        assert_eq!(value, serde_json::json!({"class_id": 3, "avg": null}));
    }
}
