use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    Likert,
    Open,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionCategory {
    Course,
    Guest,
}

impl QuestionCategory {
    pub fn label(self) -> &'static str {
        match self {
            QuestionCategory::Course => "course",
            QuestionCategory::Guest => "guest",
        }
    }
}

/// A survey item. The kind is fixed when the question is first recorded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Question {
    pub id: u32,
    pub text: String,
    pub kind: QuestionKind,
    pub category: QuestionCategory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerValue {
    /// A parsed agreement level in 1..=5.
    Likert(u8),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub question_id: u32,
    pub value: AnswerValue,
}

/// One completed survey for a course offering or guest lecture.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationInstance {
    pub id: Uuid,
    pub category: QuestionCategory,
    pub respondent_id: String,
    pub course_id: String,
    pub semester_id: String,
    pub academic_year_id: String,
    pub guest_id: Option<String>,
    pub answers: Vec<Answer>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum LetterGrade {
    #[serde(rename = "A+")]
    APlus,
    #[serde(rename = "A")]
    A,
    #[serde(rename = "A-")]
    AMinus,
    #[serde(rename = "B+")]
    BPlus,
    #[serde(rename = "B")]
    B,
    #[serde(rename = "B-")]
    BMinus,
    #[serde(rename = "C+")]
    CPlus,
    #[serde(rename = "C")]
    C,
    #[serde(rename = "C-")]
    CMinus,
    #[serde(rename = "D+")]
    DPlus,
    #[serde(rename = "D")]
    D,
    #[serde(rename = "D-")]
    DMinus,
    #[serde(rename = "F")]
    F,
}

impl LetterGrade {
    /// Bucket order used by every tabular rendering.
    pub const ALL: [LetterGrade; 13] = [
        LetterGrade::APlus,
        LetterGrade::A,
        LetterGrade::AMinus,
        LetterGrade::BPlus,
        LetterGrade::B,
        LetterGrade::BMinus,
        LetterGrade::CPlus,
        LetterGrade::C,
        LetterGrade::CMinus,
        LetterGrade::DPlus,
        LetterGrade::D,
        LetterGrade::DMinus,
        LetterGrade::F,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LetterGrade::APlus => "A+",
            LetterGrade::A => "A",
            LetterGrade::AMinus => "A-",
            LetterGrade::BPlus => "B+",
            LetterGrade::B => "B",
            LetterGrade::BMinus => "B-",
            LetterGrade::CPlus => "C+",
            LetterGrade::C => "C",
            LetterGrade::CMinus => "C-",
            LetterGrade::DPlus => "D+",
            LetterGrade::D => "D",
            LetterGrade::DMinus => "D-",
            LetterGrade::F => "F",
        }
    }

    /// Exact match on the standard literal after trimming; anything else is unrecognized.
    pub fn parse(literal: &str) -> Option<LetterGrade> {
        let literal = literal.trim();
        LetterGrade::ALL
            .into_iter()
            .find(|grade| grade.as_str() == literal)
    }

    /// A+ through B-, plus C. C+ does not pass.
    pub fn is_passing(self) -> bool {
        self <= LetterGrade::BMinus || self == LetterGrade::C
    }

    /// C+ or below.
    pub fn is_at_risk(self) -> bool {
        self >= LetterGrade::CPlus
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeRecord {
    pub student_id: u64,
    pub course_id: String,
    pub semester_id: String,
    pub academic_year_id: String,
    pub retake: bool,
    /// Raw literal as imported; may not be one of the 13 standard grades.
    pub final_grade: String,
}

impl GradeRecord {
    pub fn grade(&self) -> Option<LetterGrade> {
        LetterGrade::parse(&self.final_grade)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicCluster {
    pub topic: String,
    pub keywords: Vec<String>,
    pub count: usize,
    pub responses: Vec<String>,
    pub summary: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letter_grades_parse_only_standard_literals() {
        assert_eq!(LetterGrade::parse("A+"), Some(LetterGrade::APlus));
        assert_eq!(LetterGrade::parse(" c- "), None);
        assert_eq!(LetterGrade::parse(" C- "), Some(LetterGrade::CMinus));
        assert_eq!(LetterGrade::parse("E"), None);
        assert_eq!(LetterGrade::parse("Pass"), None);
    }

    #[test]
    fn c_plus_is_at_risk_and_not_passing() {
        let passing: Vec<&str> = LetterGrade::ALL
            .into_iter()
            .filter(|grade| grade.is_passing())
            .map(LetterGrade::as_str)
            .collect();
        assert_eq!(passing, vec!["A+", "A", "A-", "B+", "B", "B-", "C"]);

        let at_risk: Vec<&str> = LetterGrade::ALL
            .into_iter()
            .filter(|grade| grade.is_at_risk())
            .map(LetterGrade::as_str)
            .collect();
        assert_eq!(at_risk, vec!["C+", "C", "C-", "D+", "D", "D-", "F"]);
        assert!(!LetterGrade::CPlus.is_passing());
    }
}
