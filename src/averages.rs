use std::collections::BTreeMap;

use crate::models::{ClassAverage, GradeRecord, ScoreCategory, ScoreEntry, CATEGORY_WEIGHTS};

/// Groups a learner's records by class and computes one weighted average per
/// class, ordered by class id.
pub fn class_averages(records: &[GradeRecord]) -> Vec<ClassAverage> {
    let mut by_class: BTreeMap<i64, Vec<ScoreEntry>> = BTreeMap::new();

    for record in records {
        by_class
            .entry(record.class_id)
            .or_default()
            .extend(record.scores.iter().copied());
    }

    by_class
        .into_iter()
        .map(|(class_id, scores)| ClassAverage {
            class_id,
            avg: weighted_average(&scores),
        })
        .collect()
}

/// Combines per-category means with [`CATEGORY_WEIGHTS`]. Returns `None` as
/// soon as any category has no entries.
pub fn weighted_average(scores: &[ScoreEntry]) -> Option<f64> {
    CATEGORY_WEIGHTS
        .iter()
        .try_fold(0.0, |total, (category, weight)| {
            Some(total + category_mean(scores, *category)? * weight)
        })
}

/// Mean of one category's scores, summed in sorted order so the result does
/// not depend on the order entries were recorded in.
pub fn category_mean(scores: &[ScoreEntry], category: ScoreCategory) -> Option<f64> {
    let mut values: Vec<f64> = scores
        .iter()
        .filter(|entry| entry.category == category)
        .map(|entry| entry.score)
        .collect();

    if values.is_empty() {
        return None;
    }

    values.sort_by(f64::total_cmp);
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(category: ScoreCategory, score: f64) -> ScoreEntry {
        ScoreEntry::new(category, score).unwrap()
    }

    fn record(class_id: i64, scores: Vec<ScoreEntry>) -> GradeRecord {
        GradeRecord {
            learner_id: 1,
            class_id,
            scores,
        }
    }

    #[test]
    fn combines_category_means_with_weights() {
        let records = vec![record(
            10,
            vec![
                entry(ScoreCategory::Exam, 80.0),
                entry(ScoreCategory::Exam, 90.0),
                entry(ScoreCategory::Quiz, 70.0),
                entry(ScoreCategory::Homework, 100.0),
            ],
        )];

        let averages = class_averages(&records);
        assert_eq!(averages.len(), 1);
        assert_eq!(averages[0].class_id, 10);
        let avg = averages[0].avg.unwrap();
        assert!((avg - 83.5).abs() < 1e-9);
    }

    #[test]
    fn missing_category_leaves_average_undefined() {
        let records = vec![record(
            4,
            vec![
                entry(ScoreCategory::Quiz, 80.0),
                entry(ScoreCategory::Quiz, 90.0),
                entry(ScoreCategory::Homework, 70.0),
            ],
        )];

        let averages = class_averages(&records);
        assert_eq!(averages, vec![ClassAverage { class_id: 4, avg: None }]);
    }

    #[test]
    fn class_without_scores_is_undefined() {
        let averages = class_averages(&[record(2, Vec::new())]);
        assert_eq!(averages[0].avg, None);
    }

    #[test]
    fn result_ignores_entry_order() {
        let scores = vec![
            entry(ScoreCategory::Exam, 61.3),
            entry(ScoreCategory::Homework, 99.9),
            entry(ScoreCategory::Exam, 77.7),
            entry(ScoreCategory::Quiz, 12.1),
            entry(ScoreCategory::Exam, 88.8),
            entry(ScoreCategory::Quiz, 45.6),
            entry(ScoreCategory::Homework, 33.3),
        ];
        let mut reversed = scores.clone();
        reversed.reverse();
        let mut rotated = scores.clone();
        rotated.rotate_left(3);

        let expected = weighted_average(&scores).unwrap();
        assert_eq!(weighted_average(&reversed).unwrap(), expected);
        assert_eq!(weighted_average(&rotated).unwrap(), expected);

        let exam = (61.3 + 77.7 + 88.8) / 3.0;
        let quiz = (12.1 + 45.6) / 2.0;
        let homework = (99.9 + 33.3) / 2.0;
        assert!((expected - (exam * 0.5 + quiz * 0.3 + homework * 0.2)).abs() < 1e-9);
    }

    #[test]
    fn groups_records_per_class_in_class_order() {
        let full = |exam: f64| {
            vec![
                entry(ScoreCategory::Exam, exam),
                entry(ScoreCategory::Quiz, 50.0),
                entry(ScoreCategory::Homework, 50.0),
            ]
        };
        let records = vec![record(30, full(100.0)), record(12, full(50.0))];

        let averages = class_averages(&records);
        let ids: Vec<i64> = averages.iter().map(|a| a.class_id).collect();
        assert_eq!(ids, vec![12, 30]);
        assert!((averages[0].avg.unwrap() - 50.0).abs() < 1e-9);
        assert!((averages[1].avg.unwrap() - 75.0).abs() < 1e-9);
    }

    #[test]
    fn merges_duplicate_records_for_a_class() {
        let records = vec![
            record(8, vec![entry(ScoreCategory::Exam, 60.0)]),
            record(
                8,
                vec![
                    entry(ScoreCategory::Exam, 100.0),
                    entry(ScoreCategory::Quiz, 90.0),
                    entry(ScoreCategory::Homework, 80.0),
                ],
            ),
        ];

        let averages = class_averages(&records);
        assert_eq!(averages.len(), 1);
        let expected = 80.0 * 0.5 + 90.0 * 0.3 + 80.0 * 0.2;
        assert!((averages[0].avg.unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn no_records_means_no_averages() {
        assert!(class_averages(&[]).is_empty());
    }
}
