//! CSV boundary: grade and evaluation rows in, report tables out.

use std::io::{Read, Write};
use std::path::Path;

use anyhow::Context;
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use serde::Deserialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::classify::{parse_cell, QuestionBank};
use crate::config::SheetSchema;
use crate::error::AnalyticsError;
use crate::models::{Answer, AnswerValue, EvaluationInstance, GradeRecord, QuestionCategory};
use crate::report::Table;

pub fn read_grades<R: Read>(reader: R) -> anyhow::Result<Vec<GradeRecord>> {
    #[derive(Deserialize)]
    struct CsvRow {
        student_id: String,
        course_id: String,
        semester_id: String,
        academic_year_id: String,
        #[serde(default)]
        retake: String,
        final_grade: String,
    }

    let mut reader = ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut records = Vec::new();

    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = index + 1;
        let raw = result.with_context(|| format!("failed to read grade row {row}"))?;
        let student_id = raw
            .student_id
            .parse::<u64>()
            .map_err(|_| AnalyticsError::InvalidRecord {
                row,
                reason: format!("student id `{}` is not numeric", raw.student_id),
            })?;

        records.push(GradeRecord {
            student_id,
            course_id: raw.course_id,
            semester_id: raw.semester_id,
            academic_year_id: raw.academic_year_id,
            retake: parse_flag(&raw.retake).ok_or_else(|| AnalyticsError::InvalidRecord {
                row,
                reason: format!("retake flag `{}` is not yes/no", raw.retake),
            })?,
            final_grade: raw.final_grade,
        });
    }

    debug!(records = records.len(), "read grade rows");
    Ok(records)
}

pub fn read_grades_file(path: &Path) -> anyhow::Result<Vec<GradeRecord>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    read_grades(file).with_context(|| format!("failed to import grades from {}", path.display()))
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "0" | "false" | "no" | "n" => Some(false),
        "1" | "true" | "yes" | "y" => Some(true),
        _ => None,
    }
}

/// Where one evaluation export came from. Every row of the sheet shares it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationContext {
    pub category: QuestionCategory,
    pub course_id: String,
    pub semester_id: String,
    pub academic_year_id: String,
    pub guest_id: Option<String>,
}

/// Reads one survey export laid out as `schema` declares. Question columns
/// are registered in `bank` (first sight fixes their kind) and every data
/// row becomes an evaluation instance.
pub fn read_evaluations<R: Read>(
    reader: R,
    schema: &SheetSchema,
    context: &EvaluationContext,
    bank: &mut QuestionBank,
) -> anyhow::Result<Vec<EvaluationInstance>> {
    let mut reader = ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = reader.headers().context("failed to read header row")?.clone();

    let id_index = headers
        .iter()
        .position(|header| schema.is_id(header))
        .ok_or_else(|| {
            AnalyticsError::Schema(format!("no `{}` column in header", schema.id_column))
        })?;
    let question_columns: Vec<(usize, &str)> = headers
        .iter()
        .enumerate()
        .filter(|(_, header)| schema.is_question(header))
        .collect();
    if question_columns.is_empty() {
        return Err(AnalyticsError::Schema("no question columns in header".to_string()).into());
    }
    for (position, (_, text)) in question_columns.iter().enumerate() {
        let text = text.trim();
        if question_columns[..position]
            .iter()
            .any(|(_, earlier)| earlier.trim() == text)
        {
            return Err(AnalyticsError::Schema(format!("question `{text}` appears twice")).into());
        }
    }

    let rows: Vec<StringRecord> = reader
        .records()
        .collect::<Result<_, _>>()
        .context("failed to read evaluation rows")?;

    let mut question_ids = Vec::with_capacity(question_columns.len());
    for (column, text) in &question_columns {
        let values: Vec<AnswerValue> = rows
            .iter()
            .map(|row| parse_cell(row.get(*column).unwrap_or_default()))
            .collect();
        let question = bank.register(context.category, text, values.iter());
        question_ids.push(question.id);
    }

    let instances: Vec<EvaluationInstance> = rows
        .iter()
        .map(|row| EvaluationInstance {
            id: Uuid::new_v4(),
            category: context.category,
            respondent_id: row.get(id_index).unwrap_or_default().trim().to_string(),
            course_id: context.course_id.clone(),
            semester_id: context.semester_id.clone(),
            academic_year_id: context.academic_year_id.clone(),
            guest_id: context.guest_id.clone(),
            answers: question_columns
                .iter()
                .zip(&question_ids)
                .map(|((column, _), question_id)| Answer {
                    question_id: *question_id,
                    value: parse_cell(row.get(*column).unwrap_or_default()),
                })
                .collect(),
        })
        .collect();

    info!(
        questions = question_columns.len(),
        respondents = instances.len(),
        category = context.category.label(),
        "imported evaluation sheet"
    );
    Ok(instances)
}

pub fn read_evaluations_file(
    path: &Path,
    schema: &SheetSchema,
    context: &EvaluationContext,
    bank: &mut QuestionBank,
) -> anyhow::Result<Vec<EvaluationInstance>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    read_evaluations(file, schema, context, bank)
        .with_context(|| format!("failed to import evaluations from {}", path.display()))
}

pub fn write_table<W: Write>(writer: W, table: &Table) -> anyhow::Result<()> {
    let mut writer = WriterBuilder::new().flexible(true).from_writer(writer);
    writer.write_record(&table.headers)?;
    for row in &table.rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn export_table(path: &Path, table: &Table) -> anyhow::Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    write_table(file, table).with_context(|| format!("failed to write {}", path.display()))
}
