use std::fmt::Write;

use chrono::NaiveDate;

use crate::models::{ClassAverage, ThresholdStats};

pub fn build_report(
    learner_id: i64,
    generated_on: NaiveDate,
    averages: &[ClassAverage],
    scope: Option<i64>,
    threshold: f64,
    stats: &ThresholdStats,
) -> String {
    let mut output = String::new();
    let scope_label = match scope {
        Some(class_id) => format!("class {class_id}"),
        None => "all classes".to_string(),
    };

    let _ = writeln!(output, "# Learner Grade Report");
    let _ = writeln!(
        output,
        "Generated for learner {} on {}",
        learner_id, generated_on
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Weighted Averages by Class");

    if averages.is_empty() {
        let _ = writeln!(output, "No grade records found for this learner.");
    } else {
        for average in averages {
            match average.avg {
                Some(avg) => {
                    let _ = writeln!(output, "- Class {}: {:.2}", average.class_id, avg);
                }
                None => {
                    let _ = writeln!(
                        output,
                        "- Class {}: incomplete (missing a score category)",
                        average.class_id
                    );
                }
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Learners Above {} ({})", threshold, scope_label);

    if stats.total_learners == 0 {
        let _ = writeln!(output, "No learners recorded for this scope.");
    } else {
        let _ = writeln!(
            output,
            "- {} of {} learners ({}%)",
            stats.learners_above_threshold,
            stats.total_learners,
            stats.formatted_percentage()
        );
    }

    output
}
