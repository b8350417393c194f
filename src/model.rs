use chrono::{DateTime, FixedOffset};
use serde::Serialize;

use crate::error::FetchError;

/// One entry from the listing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArticleSummary {
    pub published_at: Option<DateTime<FixedOffset>>,
    pub title: String,
    pub url: String,
}

/// A listed article plus its flattened body text (empty when fetching failed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArticleRecord {
    pub published_at: Option<DateTime<FixedOffset>>,
    pub title: String,
    pub url: String,
    pub content: String,
}

impl ArticleRecord {
    pub fn new(summary: ArticleSummary, content: String) -> Self {
        ArticleRecord {
            published_at: summary.published_at,
            title: summary.title,
            url: summary.url,
            content,
        }
    }
}

/// An article whose body could not be produced, kept for the run summary.
#[derive(Debug)]
pub struct ArticleFailure {
    pub url: String,
    pub error: FetchError,
}

/// Records ordered ascending by `published_at`; undated records sort first.
#[derive(Debug, Default)]
pub struct ArticleCollection {
    records: Vec<ArticleRecord>,
    pub failures: Vec<ArticleFailure>,
    pub cache_hits: usize,
}

impl ArticleCollection {
    pub fn new(mut records: Vec<ArticleRecord>) -> Self {
        // Vec::sort_by_key is stable, so equal timestamps keep listing order.
        records.sort_by_key(|r| r.published_at);
        ArticleCollection {
            records,
            failures: Vec::new(),
            cache_hits: 0,
        }
    }

    pub fn records(&self) -> &[ArticleRecord] {
        &self.records
    }

    /// The most recent `n` records, still in ascending order.
    pub fn latest(&self, n: usize) -> &[ArticleRecord] {
        let start = self.records.len().saturating_sub(n);
        &self.records[start..]
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
