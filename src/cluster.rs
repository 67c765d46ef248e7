//! Single-pass agglomerative grouping of open-ended responses into themes.
//!
//! Each response is compared against the running centroid (sum of member
//! vectors) of every theme formed so far. It joins the most similar theme
//! when that similarity reaches the threshold, the earliest theme winning
//! ties, and otherwise opens a new theme. Assignment of a response depends
//! on every response before it, so one call is strictly sequential.

use tracing::debug;

use crate::config::ClusterConfig;
use crate::error::Result;
use crate::models::TopicCluster;
use crate::normalize::{Normalizer, SnowballStemmer, Stem, TermFrequencyVector};
use crate::similarity::similarity;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClusterOutcome {
    /// Themes in creation order.
    pub clusters: Vec<TopicCluster>,
    /// Responses that normalized to nothing (blank, "N/A", digits only).
    pub no_content: usize,
}

impl ClusterOutcome {
    pub fn clustered(&self) -> usize {
        self.clusters.iter().map(|cluster| cluster.count).sum()
    }
}

struct Theme<'a> {
    centroid: TermFrequencyVector,
    members: Vec<&'a str>,
}

pub struct ThematicClusterer<S = SnowballStemmer> {
    normalizer: Normalizer<S>,
    config: ClusterConfig,
}

impl ThematicClusterer<SnowballStemmer> {
    pub fn new(config: ClusterConfig) -> Result<Self> {
        Self::with_normalizer(Normalizer::default(), config)
    }
}

impl<S: Stem> ThematicClusterer<S> {
    pub fn with_normalizer(normalizer: Normalizer<S>, config: ClusterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { normalizer, config })
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    pub fn cluster<T: AsRef<str>>(&self, responses: &[T]) -> ClusterOutcome {
        let mut themes: Vec<Theme<'_>> = Vec::new();
        let mut no_content = 0usize;

        for response in responses {
            let text = response.as_ref();
            let vector = self.normalizer.normalize(text);
            if vector.is_empty() {
                no_content += 1;
                continue;
            }

            let mut best: Option<(usize, f64)> = None;
            for (index, theme) in themes.iter().enumerate() {
                let score = similarity(&vector, &theme.centroid);
                if best.map_or(true, |(_, top)| score > top) {
                    best = Some((index, score));
                }
            }

            match best {
                Some((index, score)) if score >= self.config.threshold => {
                    let theme = &mut themes[index];
                    theme.centroid.absorb(&vector);
                    theme.members.push(text);
                }
                _ => themes.push(Theme {
                    centroid: vector,
                    members: vec![text],
                }),
            }
        }

        let clusters: Vec<TopicCluster> = themes
            .into_iter()
            .map(|theme| self.finish(theme))
            .collect();

        debug!(
            responses = responses.len(),
            clusters = clusters.len(),
            no_content,
            threshold = self.config.threshold,
            "clustered responses"
        );

        ClusterOutcome {
            clusters,
            no_content,
        }
    }

    fn finish(&self, theme: Theme<'_>) -> TopicCluster {
        let keywords = theme.centroid.top_terms(self.config.top_keywords);
        let count = theme.members.len();
        let topic = theme.members.first().copied().unwrap_or_default().to_string();
        let summary = summarize(&topic, count, &keywords);

        TopicCluster {
            topic,
            keywords,
            count,
            responses: theme.members.into_iter().map(String::from).collect(),
            summary,
        }
    }
}

/// Groups `responses` into themes with the default normalizer.
pub fn cluster<T: AsRef<str>>(
    responses: &[T],
    threshold: f64,
    top_keywords: usize,
) -> Result<Vec<TopicCluster>> {
    let clusterer = ThematicClusterer::new(ClusterConfig::new(threshold, top_keywords)?)?;
    Ok(clusterer.cluster(responses).clusters)
}

fn summarize(topic: &str, count: usize, keywords: &[String]) -> String {
    let noun = if count == 1 { "response" } else { "responses" };
    if keywords.is_empty() {
        format!("{count} {noun} centered on \"{topic}\"")
    } else {
        format!(
            "{count} {noun} centered on \"{topic}\" (key terms: {})",
            keywords.join(", ")
        )
    }
}
