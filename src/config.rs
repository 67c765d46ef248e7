use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use crate::error::{AnalyticsError, Result};

pub const DEFAULT_THRESHOLD: f64 = 0.3;
pub const DEFAULT_TOP_KEYWORDS: usize = 4;
/// Beyond this many decimal places an f64 average has nothing left to round.
pub const MAX_LIKERT_PRECISION: u32 = 15;

/// Tuning for the thematic clusterer.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Minimum cosine similarity for a response to join an existing theme.
    pub threshold: f64,
    pub top_keywords: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            top_keywords: DEFAULT_TOP_KEYWORDS,
        }
    }
}

impl ClusterConfig {
    pub fn new(threshold: f64, top_keywords: usize) -> Result<Self> {
        let config = Self {
            threshold,
            top_keywords,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(AnalyticsError::InvalidArgument {
                name: "threshold",
                reason: format!("{} is outside [0, 1]", self.threshold),
            });
        }
        if self.top_keywords == 0 {
            return Err(AnalyticsError::InvalidArgument {
                name: "top_keywords",
                reason: "at least one keyword must be requested".to_string(),
            });
        }
        Ok(())
    }
}

/// Declared column roles of an evaluation export. Any header that is not
/// the id, the attempt marker or a marker column is a question.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SheetSchema {
    pub id_column: String,
    pub attempt_column: Option<String>,
    pub marker_columns: Vec<String>,
}

impl Default for SheetSchema {
    fn default() -> Self {
        Self {
            id_column: "id".to_string(),
            attempt_column: Some("attempt".to_string()),
            marker_columns: ["n correct", "n incorrect", "score", "submitted"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl SheetSchema {
    pub fn is_id(&self, header: &str) -> bool {
        header.trim().eq_ignore_ascii_case(self.id_column.trim())
    }

    pub fn is_question(&self, header: &str) -> bool {
        let header = header.trim();
        if header.is_empty() || self.is_id(header) {
            return false;
        }
        if let Some(attempt) = &self.attempt_column {
            if header.eq_ignore_ascii_case(attempt.trim()) {
                return false;
            }
        }
        !self
            .marker_columns
            .iter()
            .any(|marker| header.eq_ignore_ascii_case(marker.trim()))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub cluster: ClusterConfig,
    /// Decimal places kept on Likert averages.
    pub likert_precision: u32,
    /// Responses shown per theme in markdown output.
    pub response_sample: usize,
    pub schema: SheetSchema,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            cluster: ClusterConfig::default(),
            likert_precision: 2,
            response_sample: 3,
            schema: SheetSchema::default(),
        }
    }
}

impl AnalyticsConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: AnalyticsConfig = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.cluster.validate()?;
        if self.likert_precision > MAX_LIKERT_PRECISION {
            return Err(AnalyticsError::InvalidArgument {
                name: "likert_precision",
                reason: format!(
                    "{} exceeds the maximum of {} decimal places",
                    self.likert_precision, MAX_LIKERT_PRECISION
                ),
            });
        }
        Ok(())
    }

    /// Command-line values win over the file.
    pub fn with_overrides(
        mut self,
        threshold: Option<f64>,
        top_keywords: Option<usize>,
    ) -> Result<Self> {
        if let Some(value) = threshold {
            self.cluster.threshold = value;
        }
        if let Some(value) = top_keywords {
            self.cluster.top_keywords = value;
        }
        self.validate()?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_threshold_outside_unit_range() {
        assert!(ClusterConfig::new(1.2, 3).is_err());
        assert!(ClusterConfig::new(-0.1, 3).is_err());
        assert!(ClusterConfig::new(f64::NAN, 3).is_err());
        assert!(ClusterConfig::new(0.0, 3).is_ok());
        assert!(ClusterConfig::new(1.0, 3).is_ok());
    }

    #[test]
    fn rejects_zero_keywords() {
        let err = ClusterConfig::new(0.3, 0).unwrap_err();
        assert!(err.to_string().contains("top_keywords"));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let raw = r#"{"cluster": {"threshold": 0.25}, "schema": {"id_column": "Student"}}"#;
        let config: AnalyticsConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.cluster.threshold, 0.25);
        assert_eq!(config.cluster.top_keywords, DEFAULT_TOP_KEYWORDS);
        assert_eq!(config.likert_precision, 2);
        assert_eq!(config.schema.id_column, "Student");
        assert_eq!(config.schema.attempt_column.as_deref(), Some("attempt"));
    }

    #[test]
    fn overrides_replace_file_values() {
        let config = AnalyticsConfig::default()
            .with_overrides(Some(0.5), None)
            .unwrap();
        assert_eq!(config.cluster.threshold, 0.5);
        assert_eq!(config.cluster.top_keywords, DEFAULT_TOP_KEYWORDS);
        assert!(AnalyticsConfig::default()
            .with_overrides(None, Some(0))
            .is_err());
    }

    #[test]
    fn rejects_unbounded_likert_precision() {
        let config: AnalyticsConfig = serde_json::from_str(r#"{"likert_precision": 400}"#).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("likert_precision"));
        assert!(config.with_overrides(Some(0.3), None).is_err());

        let config: AnalyticsConfig =
            serde_json::from_str(r#"{"likert_precision": 15}"#).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn schema_separates_questions_from_markers() {
        let schema = SheetSchema::default();
        assert!(schema.is_id("ID"));
        assert!(!schema.is_question("id"));
        assert!(!schema.is_question("Attempt"));
        assert!(!schema.is_question("N Correct"));
        assert!(!schema.is_question("   "));
        assert!(schema.is_question("The lecturer was well prepared"));
    }
}
