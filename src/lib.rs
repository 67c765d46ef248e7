//! Evaluation analytics: survey question classification, thematic grouping
//! of open-ended responses, and grade distribution reports.

pub mod classify;
pub mod cluster;
pub mod config;
pub mod error;
pub mod grades;
pub mod models;
pub mod normalize;
pub mod report;
pub mod sheet;
pub mod similarity;

pub use classify::{classify, QuestionBank};
pub use cluster::{cluster, ClusterOutcome, ThematicClusterer};
pub use config::{AnalyticsConfig, ClusterConfig, SheetSchema};
pub use error::AnalyticsError;
pub use grades::{aggregate, GradeFilter, GradeReport};
pub use normalize::{normalize, TermFrequencyVector};
pub use report::{assemble_evaluation, EvaluationReport};
pub use similarity::similarity;
