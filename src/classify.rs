use tracing::debug;

use crate::models::{Answer, AnswerValue, Question, QuestionCategory, QuestionKind};

const LIKERT_LABELS: [(&str, u8); 5] = [
    ("strongly agree", 5),
    ("agree", 4),
    ("neutral", 3),
    ("disagree", 2),
    ("strongly disagree", 1),
];

/// Reads one answer cell. Agreement labels and the integers 1..=5 become
/// Likert values; every other literal stays free text, even when the rest
/// of its column is Likert.
pub fn parse_cell(raw: &str) -> AnswerValue {
    let trimmed = raw.trim();

    if let Some((_, score)) = LIKERT_LABELS
        .iter()
        .find(|(label, _)| trimmed.eq_ignore_ascii_case(label))
    {
        return AnswerValue::Likert(*score);
    }

    match trimmed.parse::<u8>() {
        Ok(score @ 1..=5) => AnswerValue::Likert(score),
        _ => AnswerValue::Text(trimmed.to_string()),
    }
}

/// Likert when at least one recorded answer carries a scale value.
pub fn classify(answers: &[Answer]) -> QuestionKind {
    classify_values(answers.iter().map(|answer| &answer.value))
}

pub fn classify_values<'a>(values: impl IntoIterator<Item = &'a AnswerValue>) -> QuestionKind {
    let is_likert = values
        .into_iter()
        .any(|value| matches!(value, AnswerValue::Likert(_)));
    if is_likert {
        QuestionKind::Likert
    } else {
        QuestionKind::Open
    }
}

/// Questions recorded so far. A question's kind is decided from the first
/// batch of answers it is registered with and never revisited.
#[derive(Debug, Default)]
pub struct QuestionBank {
    questions: Vec<Question>,
}

impl QuestionBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<'a>(
        &mut self,
        category: QuestionCategory,
        text: &str,
        first_answers: impl IntoIterator<Item = &'a AnswerValue>,
    ) -> &Question {
        let text = text.trim();
        if let Some(index) = self.position(category, text) {
            return &self.questions[index];
        }

        let kind = classify_values(first_answers);
        let id = self.questions.len() as u32 + 1;
        debug!(id, ?kind, ?category, question = text, "registered question");
        self.questions.push(Question {
            id,
            text: text.to_string(),
            kind,
            category,
        });
        &self.questions[self.questions.len() - 1]
    }

    pub fn get(&self, id: u32) -> Option<&Question> {
        self.questions.iter().find(|question| question.id == id)
    }

    pub fn find(&self, category: QuestionCategory, text: &str) -> Option<&Question> {
        self.position(category, text.trim())
            .map(|index| &self.questions[index])
    }

    /// Questions of one category in registration order.
    pub fn in_category(&self, category: QuestionCategory) -> impl Iterator<Item = &Question> {
        self.questions
            .iter()
            .filter(move |question| question.category == category)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    fn position(&self, category: QuestionCategory, text: &str) -> Option<usize> {
        self.questions
            .iter()
            .position(|question| question.category == category && question.text == text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answers(cells: &[&str]) -> Vec<Answer> {
        cells
            .iter()
            .map(|cell| Answer {
                question_id: 1,
                value: parse_cell(cell),
            })
            .collect()
    }

    #[test]
    fn agreement_labels_map_to_scale() {
        assert_eq!(parse_cell("Strongly Agree"), AnswerValue::Likert(5));
        assert_eq!(parse_cell("Agree"), AnswerValue::Likert(4));
        assert_eq!(parse_cell(" Neutral "), AnswerValue::Likert(3));
        assert_eq!(parse_cell("Disagree"), AnswerValue::Likert(2));
        assert_eq!(parse_cell("strongly disagree"), AnswerValue::Likert(1));
    }

    #[test]
    fn numeric_cells_only_count_inside_scale() {
        assert_eq!(parse_cell("4"), AnswerValue::Likert(4));
        assert_eq!(parse_cell("0"), AnswerValue::Text("0".to_string()));
        assert_eq!(parse_cell("6"), AnswerValue::Text("6".to_string()));
        assert_eq!(parse_cell("4.5"), AnswerValue::Text("4.5".to_string()));
    }

    #[test]
    fn other_literals_stay_text() {
        assert_eq!(
            parse_cell("Somewhat agree"),
            AnswerValue::Text("Somewhat agree".to_string())
        );
        assert_eq!(parse_cell(""), AnswerValue::Text(String::new()));
    }

    #[test]
    fn one_scale_value_makes_question_likert() {
        assert_eq!(classify(&answers(&["N/A", "loved it", "Agree"])), QuestionKind::Likert);
        assert_eq!(classify(&answers(&["loved it", "too fast"])), QuestionKind::Open);
        assert_eq!(classify(&[]), QuestionKind::Open);
    }

    #[test]
    fn mixed_column_keeps_text_cells() {
        let mixed = answers(&["Agree", "it depends"]);
        assert_eq!(classify(&mixed), QuestionKind::Likert);
        assert_eq!(mixed[1].value, AnswerValue::Text("it depends".to_string()));
    }

    #[test]
    fn kind_is_fixed_at_first_registration() {
        let mut bank = QuestionBank::new();
        let open = [AnswerValue::Text("nice".to_string())];
        let likert = [AnswerValue::Likert(5)];

        let first = bank
            .register(QuestionCategory::Guest, "Comments", open.iter())
            .clone();
        let again = bank
            .register(QuestionCategory::Guest, " Comments ", likert.iter())
            .clone();

        assert_eq!(first.kind, QuestionKind::Open);
        assert_eq!(again, first);
        assert_eq!(bank.len(), 1);
    }

    #[test]
    fn categories_keep_separate_questions() {
        let mut bank = QuestionBank::new();
        let likert = [AnswerValue::Likert(3)];
        bank.register(QuestionCategory::Course, "Pacing", likert.iter());
        bank.register(QuestionCategory::Guest, "Pacing", likert.iter());
        bank.register(QuestionCategory::Course, "Clarity", likert.iter());

        let course: Vec<&str> = bank
            .in_category(QuestionCategory::Course)
            .map(|question| question.text.as_str())
            .collect();
        assert_eq!(course, vec!["Pacing", "Clarity"]);
        assert_eq!(bank.len(), 3);
        assert!(bank.find(QuestionCategory::Guest, "Pacing").is_some());
        assert_eq!(bank.get(3).map(|q| q.text.as_str()), Some("Clarity"));
    }
}
