use std::fmt::Write;

use chrono::NaiveDate;
use serde::Serialize;

use crate::classify::QuestionBank;
use crate::cluster::ThematicClusterer;
use crate::config::{AnalyticsConfig, MAX_LIKERT_PRECISION};
use crate::error::Result;
use crate::grades::GradeReport;
use crate::models::{
    AnswerValue, EvaluationInstance, QuestionCategory, QuestionKind, TopicCluster,
};
use crate::normalize::is_placeholder;

const NO_THEMES: &str = "No themes could be identified for this question.";

/// A flat sheet: one header row plus data rows of the same width.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    fn new(headers: &[&str]) -> Self {
        Self {
            headers: headers.iter().map(|header| header.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    fn push<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut row: Vec<String> = cells.into_iter().map(Into::into).collect();
        row.resize(self.headers.len(), String::new());
        self.rows.push(row);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum QuestionResult {
    Likert {
        /// Rounded mean of the scale answers; absent when nobody used the scale.
        average: Option<f64>,
        answered: usize,
        /// Non-scale literals recorded against this question, kept verbatim.
        free_text: Vec<String>,
    },
    Open {
        clusters: Vec<TopicCluster>,
        no_content: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionReport {
    pub question_id: u32,
    pub text: String,
    pub result: QuestionResult,
}

impl QuestionReport {
    pub fn kind(&self) -> QuestionKind {
        match self.result {
            QuestionResult::Likert { .. } => QuestionKind::Likert,
            QuestionResult::Open { .. } => QuestionKind::Open,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub category: QuestionCategory,
    pub respondents: usize,
    pub questions: Vec<QuestionReport>,
}

pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places.min(MAX_LIKERT_PRECISION) as i32);
    (value * factor).round() / factor
}

/// Arithmetic mean of the scale answers, rounded to `precision` places.
pub fn likert_average<'a>(
    values: impl IntoIterator<Item = &'a AnswerValue>,
    precision: u32,
) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0u32, 0u32), |(sum, count), value| match value {
            AnswerValue::Likert(score) => (sum + u32::from(*score), count + 1),
            AnswerValue::Text(_) => (sum, count),
        });
    if count == 0 {
        None
    } else {
        Some(round_to(f64::from(sum) / f64::from(count), precision))
    }
}

/// Builds the per-question report for one category. Each question follows
/// exactly one path, chosen by its recorded kind: Likert questions are
/// averaged and open questions are clustered.
pub fn assemble_evaluation(
    bank: &QuestionBank,
    instances: &[EvaluationInstance],
    category: QuestionCategory,
    config: &AnalyticsConfig,
) -> Result<EvaluationReport> {
    let clusterer = ThematicClusterer::new(config.cluster)?;
    let instances: Vec<&EvaluationInstance> = instances
        .iter()
        .filter(|instance| instance.category == category)
        .collect();

    let questions = bank
        .in_category(category)
        .map(|question| {
            let values: Vec<&AnswerValue> = instances
                .iter()
                .flat_map(|instance| instance.answers.iter())
                .filter(|answer| answer.question_id == question.id)
                .map(|answer| &answer.value)
                .collect();

            let result = match question.kind {
                QuestionKind::Likert => QuestionResult::Likert {
                    average: likert_average(values.iter().copied(), config.likert_precision),
                    answered: values
                        .iter()
                        .filter(|value| matches!(value, AnswerValue::Likert(_)))
                        .count(),
                    free_text: values
                        .iter()
                        .filter_map(|value| match value {
                            AnswerValue::Text(text) if !is_placeholder(text) => Some(text.clone()),
                            _ => None,
                        })
                        .collect(),
                },
                QuestionKind::Open => {
                    let texts: Vec<&str> = values
                        .iter()
                        .filter_map(|value| match value {
                            AnswerValue::Text(text) => Some(text.as_str()),
                            AnswerValue::Likert(_) => None,
                        })
                        .collect();
                    let outcome = clusterer.cluster(&texts);
                    QuestionResult::Open {
                        clusters: outcome.clusters,
                        no_content: outcome.no_content + (values.len() - texts.len()),
                    }
                }
            };

            QuestionReport {
                question_id: question.id,
                text: question.text.clone(),
                result,
            }
        })
        .collect();

    Ok(EvaluationReport {
        category,
        respondents: instances.len(),
        questions,
    })
}

pub fn raw_grades_table(report: &GradeReport) -> Table {
    let mut table = Table::new(&[
        "student_id",
        "course_id",
        "semester_id",
        "academic_year_id",
        "retake",
        "final_grade",
    ]);
    for record in &report.records {
        table.push([
            record.student_id.to_string(),
            record.course_id.clone(),
            record.semester_id.clone(),
            record.academic_year_id.clone(),
            if record.retake { "yes" } else { "no" }.to_string(),
            record.final_grade.clone(),
        ]);
    }
    table
}

pub fn grade_metrics_table(report: &GradeReport) -> Table {
    let mut table = Table::new(&["grade", "count", "percentage", "student_ids"]);
    for bucket in &report.buckets {
        table.push([
            bucket.grade.as_str().to_string(),
            bucket.count.to_string(),
            format!("{:.2}%", bucket.percentage),
            join_ids(&bucket.student_ids),
        ]);
    }
    table.push(["total".to_string(), report.total.to_string()]);
    table.push(["pass rate".to_string(), String::new(), format!("{:.2}%", report.pass_rate)]);
    table.push(["unrecognized".to_string(), report.unrecognized.to_string()]);
    table.push(["retakes".to_string(), report.retakes.to_string()]);
    table.push([
        "C+ and below".to_string(),
        report.at_risk.len().to_string(),
        String::new(),
        join_ids(&report.at_risk),
    ]);
    table
}

pub fn evaluation_table(report: &EvaluationReport, precision: u32) -> Table {
    let mut table = Table::new(&[
        "question",
        "kind",
        "value",
        "summary",
        "keywords",
        "count",
        "responses",
    ]);
    for question in &report.questions {
        match &question.result {
            QuestionResult::Likert {
                average,
                answered,
                free_text,
            } => table.push([
                question.text.clone(),
                "likert".to_string(),
                format_average(*average, precision),
                String::new(),
                String::new(),
                answered.to_string(),
                free_text.join(" | "),
            ]),
            QuestionResult::Open { clusters, .. } if clusters.is_empty() => table.push([
                question.text.clone(),
                "open".to_string(),
                String::new(),
                NO_THEMES.to_string(),
                String::new(),
                "0".to_string(),
            ]),
            QuestionResult::Open { clusters, .. } => {
                for cluster in clusters {
                    table.push([
                        question.text.clone(),
                        "open".to_string(),
                        cluster.topic.clone(),
                        cluster.summary.clone(),
                        cluster.keywords.join(", "),
                        cluster.count.to_string(),
                        cluster.responses.join(" | "),
                    ]);
                }
            }
        }
    }
    table
}

pub fn render_grade_report(
    report: &GradeReport,
    scope: Option<&str>,
    generated: NaiveDate,
) -> String {
    let mut output = String::new();
    let scope_label = scope.unwrap_or("all students, courses and years");

    let _ = writeln!(output, "# Grade Report");
    let _ = writeln!(output, "Generated for {} on {}", scope_label, generated);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Summary");

    if report.total == 0 {
        let _ = writeln!(output, "No grade records matched this selection.");
    } else {
        let _ = writeln!(output, "- Records: {}", report.total);
        let _ = writeln!(output, "- Pass rate (C or better): {:.2}%", report.pass_rate);
        let _ = writeln!(output, "- Retakes: {}", report.retakes);
        if report.unrecognized > 0 {
            let _ = writeln!(
                output,
                "- Unrecognized grades left out of the distribution: {}",
                report.unrecognized
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Distribution");
    let _ = writeln!(output, "| Grade | Count | Percentage |");
    let _ = writeln!(output, "|---|---|---|");
    for bucket in &report.buckets {
        let _ = writeln!(
            output,
            "| {} | {} | {:.2}% |",
            bucket.grade.as_str(),
            bucket.count,
            bucket.percentage
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Students at C+ or Below");
    if report.at_risk.is_empty() {
        let _ = writeln!(output, "No students at C+ or below.");
    } else {
        for student_id in &report.at_risk {
            let _ = writeln!(output, "- {}", student_id);
        }
    }

    output
}

pub fn render_evaluation_report(
    report: &EvaluationReport,
    scope: &str,
    generated: NaiveDate,
    config: &AnalyticsConfig,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# {} Evaluation Report", title_case(report.category.label()));
    let _ = writeln!(
        output,
        "Generated for {} on {} ({} respondents)",
        scope, generated, report.respondents
    );

    if report.questions.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "No questions recorded for this evaluation.");
        return output;
    }

    for question in &report.questions {
        let _ = writeln!(output);
        let _ = writeln!(output, "## {}", question.text);

        match &question.result {
            QuestionResult::Likert {
                average,
                answered,
                free_text,
            } => {
                match average {
                    Some(_) => {
                        let _ = writeln!(
                            output,
                            "Average {} across {} answers",
                            format_average(*average, config.likert_precision),
                            answered
                        );
                    }
                    None => {
                        let _ = writeln!(output, "No scale answers recorded.");
                    }
                }
                for text in free_text.iter().take(config.response_sample) {
                    let _ = writeln!(output, "- {}", text);
                }
            }
            QuestionResult::Open { clusters, .. } if clusters.is_empty() => {
                let _ = writeln!(output, "{}", NO_THEMES);
            }
            QuestionResult::Open { clusters, .. } => {
                for cluster in clusters {
                    let _ = writeln!(output);
                    let _ = writeln!(output, "### {}", cluster.topic);
                    let _ = writeln!(output, "{}", cluster.summary);
                    let _ = writeln!(output, "Keywords: {}", cluster.keywords.join(", "));
                    for response in cluster.responses.iter().take(config.response_sample) {
                        let _ = writeln!(output, "- {}", response);
                    }
                    if cluster.count > config.response_sample {
                        let _ = writeln!(
                            output,
                            "- ... and {} more",
                            cluster.count - config.response_sample
                        );
                    }
                }
            }
        }
    }

    output
}

fn format_average(average: Option<f64>, precision: u32) -> String {
    average
        .map(|value| format!("{:.*}", precision as usize, value))
        .unwrap_or_default()
}

fn join_ids(ids: &[u64]) -> String {
    ids.iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grades::aggregate;
    use crate::models::{Answer, GradeRecord};
    use uuid::Uuid;

    fn instance(
        category: QuestionCategory,
        answers: Vec<(u32, AnswerValue)>,
    ) -> EvaluationInstance {
        EvaluationInstance {
            id: Uuid::new_v4(),
            category,
            respondent_id: "s1".to_string(),
            course_id: "NURS101".to_string(),
            semester_id: "fall".to_string(),
            academic_year_id: "2025-2026".to_string(),
            guest_id: None,
            answers: answers
                .into_iter()
                .map(|(question_id, value)| Answer { question_id, value })
                .collect(),
        }
    }

    fn text(value: &str) -> AnswerValue {
        AnswerValue::Text(value.to_string())
    }

    fn sample() -> (QuestionBank, Vec<EvaluationInstance>) {
        let mut bank = QuestionBank::new();
        let likert = [AnswerValue::Likert(5)];
        let open = [text("anything")];
        let prepared = bank
            .register(QuestionCategory::Course, "Well prepared", likert.iter())
            .id;
        let improve = bank
            .register(QuestionCategory::Course, "What could improve?", open.iter())
            .id;
        let guest = bank
            .register(QuestionCategory::Guest, "Speaker clarity", likert.iter())
            .id;

        let instances = vec![
            instance(
                QuestionCategory::Course,
                vec![(prepared, AnswerValue::Likert(5)), (improve, text("Great class"))],
            ),
            instance(
                QuestionCategory::Course,
                vec![(prepared, AnswerValue::Likert(4)), (improve, text("Really great class"))],
            ),
            instance(
                QuestionCategory::Course,
                vec![(prepared, AnswerValue::Likert(5)), (improve, text("Terrible pacing"))],
            ),
            instance(
                QuestionCategory::Course,
                vec![(prepared, text("Not sure")), (improve, text("N/A"))],
            ),
            instance(QuestionCategory::Guest, vec![(guest, AnswerValue::Likert(1))]),
        ];
        (bank, instances)
    }

    fn grade(student_id: u64, final_grade: &str) -> GradeRecord {
        GradeRecord {
            student_id,
            course_id: "NURS101".to_string(),
            semester_id: "fall".to_string(),
            academic_year_id: "2025-2026".to_string(),
            retake: false,
            final_grade: final_grade.to_string(),
        }
    }

    #[test]
    fn likert_average_rounds_to_precision() {
        let answers = [AnswerValue::Likert(5), AnswerValue::Likert(4), AnswerValue::Likert(5)];
        assert_eq!(likert_average(answers.iter(), 2), Some(4.67));
        assert_eq!(likert_average(answers.iter(), 0), Some(5.0));
        assert_eq!(likert_average([text("meh")].iter(), 2), None);
        assert_eq!(likert_average(answers.iter(), 400), likert_average(answers.iter(), 15));
        assert!(likert_average(answers.iter(), u32::MAX).is_some_and(f64::is_finite));
    }

    #[test]
    fn each_question_takes_one_path() {
        let (bank, instances) = sample();
        let config = AnalyticsConfig::default();
        let report =
            assemble_evaluation(&bank, &instances, QuestionCategory::Course, &config).unwrap();

        assert_eq!(report.respondents, 4);
        assert_eq!(report.questions.len(), 2);

        assert_eq!(report.questions[0].kind(), QuestionKind::Likert);
        match &report.questions[0].result {
            QuestionResult::Likert {
                average,
                answered,
                free_text,
            } => {
                assert_eq!(*average, Some(4.67));
                assert_eq!(*answered, 3);
                assert_eq!(free_text, &vec!["Not sure".to_string()]);
            }
            other => panic!("expected likert result, got {other:?}"),
        }

        match &report.questions[1].result {
            QuestionResult::Open {
                clusters,
                no_content,
            } => {
                assert_eq!(clusters.len(), 2);
                assert_eq!(clusters[0].count, 2);
                assert_eq!(clusters[1].count, 1);
                assert_eq!(*no_content, 1);
            }
            other => panic!("expected open result, got {other:?}"),
        }
    }

    #[test]
    fn likert_question_without_scale_answers_has_no_average() {
        let mut bank = QuestionBank::new();
        let likert = [AnswerValue::Likert(3)];
        bank.register(QuestionCategory::Guest, "Pacing", likert.iter());
        let report =
            assemble_evaluation(&bank, &[], QuestionCategory::Guest, &AnalyticsConfig::default())
                .unwrap();
        assert_eq!(
            report.questions[0].result,
            QuestionResult::Likert {
                average: None,
                answered: 0,
                free_text: Vec::new(),
            }
        );
    }

    #[test]
    fn invalid_cluster_config_fails_assembly() {
        let (bank, instances) = sample();
        let mut config = AnalyticsConfig::default();
        config.cluster.threshold = 2.0;
        assert!(assemble_evaluation(&bank, &instances, QuestionCategory::Course, &config).is_err());
    }

    #[test]
    fn evaluation_table_flattens_clusters() {
        let (bank, instances) = sample();
        let config = AnalyticsConfig::default();
        let report =
            assemble_evaluation(&bank, &instances, QuestionCategory::Course, &config).unwrap();
        let table = evaluation_table(&report, 2);

        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[0][2], "4.67");
        assert_eq!(table.rows[0][6], "Not sure");
        assert_eq!(table.rows[1][2], "Great class");
        assert_eq!(table.rows[1][6], "Great class | Really great class");
        assert_eq!(table.rows[2][5], "1");
        assert!(table.rows.iter().all(|row| row.len() == table.headers.len()));
    }

    #[test]
    fn open_question_without_themes_says_so() {
        let mut bank = QuestionBank::new();
        let open = [text("x")];
        let id = bank
            .register(QuestionCategory::Guest, "Comments", open.iter())
            .id;
        let instances = vec![instance(QuestionCategory::Guest, vec![(id, text("N/A"))])];
        let config = AnalyticsConfig::default();
        let report =
            assemble_evaluation(&bank, &instances, QuestionCategory::Guest, &config).unwrap();

        let table = evaluation_table(&report, 2);
        assert_eq!(table.rows[0][3], NO_THEMES);

        let generated = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let markdown = render_evaluation_report(&report, "guest DR-7", generated, &config);
        assert!(markdown.starts_with("# Guest Evaluation Report\n"));
        assert!(markdown.contains(NO_THEMES));
    }

    #[test]
    fn grade_tables_follow_bucket_order() {
        let report = aggregate(&[
            grade(5, "A"),
            grade(1, "A"),
            grade(2, "B"),
            grade(9, "C+"),
            grade(3, "F"),
        ]);

        let raw = raw_grades_table(&report);
        assert_eq!(raw.rows.len(), 5);
        assert_eq!(raw.rows[3], vec!["9", "NURS101", "fall", "2025-2026", "no", "C+"]);

        let metrics = grade_metrics_table(&report);
        assert_eq!(metrics.rows[0][0], "A+");
        assert_eq!(metrics.rows[1], vec!["A", "2", "40.00%", "5, 1"]);
        assert_eq!(metrics.rows[12][0], "F");
        let pass = metrics.rows.iter().find(|row| row[0] == "pass rate").unwrap();
        assert_eq!(pass[2], "60.00%");
        let at_risk = metrics.rows.last().unwrap();
        assert_eq!(at_risk, &vec!["C+ and below", "2", "", "3, 9"]);
        assert!(metrics.rows.iter().all(|row| row.len() == 4));
    }

    #[test]
    fn grade_markdown_lists_at_risk_students() {
        let report = aggregate(&[grade(12, "D"), grade(4, "A-")]);
        let generated = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let markdown = render_grade_report(&report, Some("course NURS101"), generated);

        assert!(markdown.contains("Generated for course NURS101 on 2026-03-02"));
        assert!(markdown.contains("- Pass rate (C or better): 50.00%"));
        assert!(markdown.contains("| A- | 1 | 50.00% |"));
        assert!(markdown.contains("## Students at C+ or Below\n- 12\n"));
    }

    #[test]
    fn empty_grade_markdown_reports_nothing_found() {
        let report = aggregate(&[]);
        let generated = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let markdown = render_grade_report(&report, None, generated);
        assert!(markdown.contains("No grade records matched this selection."));
        assert!(markdown.contains("No students at C+ or below."));
    }

    #[test]
    fn evaluation_markdown_samples_responses() {
        let mut bank = QuestionBank::new();
        let open = [text("x")];
        let id = bank
            .register(QuestionCategory::Course, "Comments", open.iter())
            .id;
        let instances: Vec<EvaluationInstance> = (0..5)
            .map(|_| instance(QuestionCategory::Course, vec![(id, text("More practice exams"))]))
            .collect();
        let config = AnalyticsConfig::default();
        let report =
            assemble_evaluation(&bank, &instances, QuestionCategory::Course, &config).unwrap();
        let generated = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let markdown = render_evaluation_report(&report, "NURS101", generated, &config);

        assert!(markdown.contains("### More practice exams"));
        assert_eq!(markdown.matches("- More practice exams").count(), 3);
        assert!(markdown.contains("- ... and 2 more"));
    }
}
