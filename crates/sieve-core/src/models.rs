use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::job::CrawlJob;
use crate::strategy::Strategy;

/// Out-of-band page metadata reported by the renderer (already parsed meta tags).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub title: Option<String>,
    pub og_title: Option<String>,
    pub description: Option<String>,
    pub og_description: Option<String>,
}

/// Output of a single render attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    /// URL the renderer ended up on.
    pub url: String,
    /// Fully rendered markup.
    pub html: String,
    pub metadata: PageMetadata,
}

impl RenderedPage {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
            metadata: PageMetadata::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: PageMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Structured fields pulled from one (url, strategy) attempt, before quality evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionCandidate {
    pub title: String,
    pub description: String,
    /// Main text, capped to the extractor's content limit.
    pub content: String,
    /// `"H1: ..."` lines joined by newlines.
    pub headings: String,
    /// Byte length of the raw markup.
    pub html_size: usize,
    /// Byte length of the extracted content before capping.
    pub text_size: usize,
    pub is_error_page: bool,
}

/// Outcome status carried by a result record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Success,
    Error,
    /// Requester-side only: no result arrived within the polling window.
    Pending,
}

impl ResultStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultStatus::Success => "success",
            ResultStatus::Error => "error",
            ResultStatus::Pending => "pending",
        }
    }
}

impl fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ResultStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "success" => Ok(ResultStatus::Success),
            "error" => Ok(ResultStatus::Error),
            "pending" => Ok(ResultStatus::Pending),
            _ => Err(format!("Unknown result status: {}", s)),
        }
    }
}

/// Result record exchanged over the result queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlResult {
    pub job_id: String,
    pub url: String,
    pub status: ResultStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<Strategy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headings: Option<String>,
    /// Truncated raw markup of the accepted render.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CrawlResult {
    fn bare(job_id: impl Into<String>, url: impl Into<String>, status: ResultStatus) -> Self {
        Self {
            job_id: job_id.into(),
            url: url.into(),
            status,
            strategy: None,
            title: None,
            description: None,
            content: None,
            headings: None,
            html: None,
            error: None,
            message: None,
        }
    }

    /// Success record built from an accepted candidate.
    pub fn success(
        job: &CrawlJob,
        strategy: Strategy,
        candidate: ExtractionCandidate,
        html_snapshot: String,
    ) -> Self {
        Self {
            strategy: Some(strategy),
            title: Some(candidate.title),
            description: Some(candidate.description),
            content: Some(candidate.content),
            headings: Some(candidate.headings),
            html: Some(html_snapshot),
            ..Self::bare(&job.job_id, &job.url, ResultStatus::Success)
        }
    }

    /// Terminal error record.
    pub fn failure(job: &CrawlJob, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::bare(&job.job_id, &job.url, ResultStatus::Error)
        }
    }

    /// Record handed back to a requester whose polling window elapsed.
    pub fn pending(job_id: impl Into<String>, url: impl Into<String>, waited_secs: u64) -> Self {
        Self {
            message: Some(format!(
                "Crawl job submitted but no result after {waited_secs}s"
            )),
            ..Self::bare(job_id, url, ResultStatus::Pending)
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ResultStatus::Success
    }
}

/// Truncate to at most `max_chars` characters on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
