use serde::Serialize;
use tracing::{debug, warn};

use crate::models::{GradeRecord, LetterGrade};

/// Row selection applied before aggregation. `None` or `"*"` matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GradeFilter {
    pub student_id: Option<String>,
    pub course_id: Option<String>,
    pub academic_year_id: Option<String>,
}

impl GradeFilter {
    pub fn matches(&self, record: &GradeRecord) -> bool {
        field_matches(&self.student_id, &record.student_id.to_string())
            && field_matches(&self.course_id, &record.course_id)
            && field_matches(&self.academic_year_id, &record.academic_year_id)
    }

    pub fn apply(&self, records: &[GradeRecord]) -> Vec<GradeRecord> {
        records
            .iter()
            .filter(|record| self.matches(record))
            .cloned()
            .collect()
    }
}

fn field_matches(wanted: &Option<String>, actual: &str) -> bool {
    match wanted.as_deref().map(str::trim) {
        None | Some("*") | Some("") => true,
        Some(value) => value == actual.trim(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeBucket {
    pub grade: LetterGrade,
    /// Holders of this grade in record order.
    pub student_ids: Vec<u64>,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeReport {
    pub records: Vec<GradeRecord>,
    /// One bucket per letter grade, A+ first.
    pub buckets: Vec<GradeBucket>,
    pub total: usize,
    pub pass_rate: f64,
    /// Students holding C+ or below, ascending and unique.
    pub at_risk: Vec<u64>,
    pub unrecognized: usize,
    pub retakes: usize,
}

impl GradeReport {
    pub fn bucket(&self, grade: LetterGrade) -> &GradeBucket {
        &self.buckets[grade as usize]
    }

    pub fn bucketed(&self) -> usize {
        self.buckets.iter().map(|bucket| bucket.count).sum()
    }
}

pub fn aggregate(records: &[GradeRecord]) -> GradeReport {
    let mut buckets: Vec<GradeBucket> = LetterGrade::ALL
        .into_iter()
        .map(|grade| GradeBucket {
            grade,
            student_ids: Vec::new(),
            count: 0,
            percentage: 0.0,
        })
        .collect();
    let mut unrecognized = 0usize;
    let mut passing = 0usize;
    let mut at_risk = Vec::new();

    for record in records {
        let Some(grade) = record.grade() else {
            warn!(
                student_id = record.student_id,
                grade = %record.final_grade,
                "unrecognized grade literal, left out of buckets"
            );
            unrecognized += 1;
            continue;
        };

        let bucket = &mut buckets[grade as usize];
        bucket.student_ids.push(record.student_id);
        bucket.count += 1;

        if grade.is_passing() {
            passing += 1;
        }
        if grade.is_at_risk() {
            at_risk.push(record.student_id);
        }
    }

    let total = records.len();
    for bucket in buckets.iter_mut() {
        bucket.percentage = percentage(bucket.count, total);
    }
    at_risk.sort_unstable();
    at_risk.dedup();

    let report = GradeReport {
        records: records.to_vec(),
        buckets,
        total,
        pass_rate: percentage(passing, total),
        at_risk,
        unrecognized,
        retakes: records.iter().filter(|record| record.retake).count(),
    };

    debug!(
        total,
        pass_rate = report.pass_rate,
        at_risk = report.at_risk.len(),
        unrecognized,
        "aggregated grades"
    );
    report
}

/// `part / total * 100`, or 0 when there is nothing to divide by.
pub fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        (part as f64 * 100.0) / total as f64
    }
}
