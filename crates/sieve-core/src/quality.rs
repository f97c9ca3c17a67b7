//! Content-quality gate over extraction candidates.
//!
//! The ratio relaxation lets single-page applications through: they carry
//! large script/style payloads, so their text-to-markup ratio is low even
//! when the rendered text is perfectly usable.

use std::fmt;

use crate::models::ExtractionCandidate;

/// Default absolute floor on extracted text length.
pub const DEFAULT_MIN_CONTENT_LENGTH: usize = 200;

/// Default minimum text-to-markup ratio.
pub const DEFAULT_MIN_RATIO: f64 = 0.1;

/// Lowest ratio the relaxation will ever accept.
const RATIO_FLOOR: f64 = 0.02;

/// Characters of content scanned for error-page markers.
pub const ERROR_SCAN_CHARS: usize = 200;

/// Content shorter than this makes a bare "not found" count as an error page.
const SHORT_CONTENT_CHARS: usize = 500;

/// Why a candidate was accepted or rejected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    Accepted,
    ErrorPage,
    TooShort { text_size: usize, min: usize },
    LowRatio { ratio: f64, min_ratio: f64 },
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Accepted => write!(f, "accepted"),
            Verdict::ErrorPage => write!(f, "error page detected"),
            Verdict::TooShort { text_size, min } => {
                write!(f, "content too short ({text_size} < {min} bytes)")
            }
            Verdict::LowRatio { ratio, min_ratio } => {
                write!(f, "low text/html ratio ({ratio:.3} < {min_ratio})")
            }
        }
    }
}

/// Accept/reject policy over candidate statistics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityGate {
    pub min_content_length: usize,
    pub min_ratio: f64,
}

impl Default for QualityGate {
    fn default() -> Self {
        Self {
            min_content_length: DEFAULT_MIN_CONTENT_LENGTH,
            min_ratio: DEFAULT_MIN_RATIO,
        }
    }
}

impl QualityGate {
    pub fn new(min_content_length: usize, min_ratio: f64) -> Self {
        Self {
            min_content_length,
            min_ratio,
        }
    }

    pub fn evaluate(&self, candidate: &ExtractionCandidate) -> Verdict {
        if candidate.is_error_page {
            return Verdict::ErrorPage;
        }

        let text_size = candidate.text_size;
        if text_size < self.min_content_length {
            return Verdict::TooShort {
                text_size,
                min: self.min_content_length,
            };
        }

        let ratio = if candidate.html_size == 0 {
            1.0
        } else {
            text_size as f64 / candidate.html_size as f64
        };

        if ratio >= self.min_ratio {
            return Verdict::Accepted;
        }

        let min = self.min_content_length as f64;
        let relaxed_threshold = RATIO_FLOOR.max(self.min_ratio / 2.0);
        let long_enough = text_size as f64 >= 2.0 * min;
        let relaxed = ratio >= relaxed_threshold && text_size as f64 >= 1.2 * min;

        if long_enough || relaxed {
            Verdict::Accepted
        } else {
            Verdict::LowRatio {
                ratio,
                min_ratio: self.min_ratio,
            }
        }
    }

    pub fn accept(&self, candidate: &ExtractionCandidate) -> bool {
        self.evaluate(candidate).is_accepted()
    }
}

/// Pure accept/reject decision.
pub fn accept(candidate: &ExtractionCandidate, min_content_length: usize, min_ratio: f64) -> bool {
    QualityGate::new(min_content_length, min_ratio).accept(candidate)
}

fn head(text: &str) -> String {
    text.chars().take(ERROR_SCAN_CHARS).collect::<String>().to_lowercase()
}

/// Error-page flag computed at extraction time.
///
/// Strong markers in the title or content head always count; "404" counts in
/// the title or head; a bare "not found" only counts on short pages.
pub fn looks_like_error_page(title: &str, content: &str) -> bool {
    let title = title.to_lowercase();
    let head = head(content);

    let strong = ["page not found", "page does not exist", "broken link"];
    if strong.iter().any(|m| title.contains(m) || head.contains(m)) {
        return true;
    }

    if title.contains("404") || head.contains("404") {
        return true;
    }

    let short = content.chars().count() < SHORT_CONTENT_CHARS;
    short && (title.contains("not found") || head.contains("not found"))
}

/// Stricter keyword scan applied after the gate; any marker rejects.
pub fn contains_error_marker(title: &str, content: &str) -> bool {
    const MARKERS: [&str; 5] = [
        "page not found",
        "404",
        "not found",
        "page does not exist",
        "broken link",
    ];
    let title = title.to_lowercase();
    let head = head(content);
    MARKERS.iter().any(|m| title.contains(m) || head.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(text_size: usize, html_size: usize) -> ExtractionCandidate {
        ExtractionCandidate {
            title: "Pricing".into(),
            text_size,
            html_size,
            ..Default::default()
        }
    }

    #[test]
    fn rejects_below_absolute_floor_regardless_of_ratio() {
        assert!(!accept(&candidate(150, 1000), 200, 0.1));
        assert!(!accept(&candidate(150, 0), 200, 0.0));
        assert_eq!(
            QualityGate::default().evaluate(&candidate(150, 1000)),
            Verdict::TooShort {
                text_size: 150,
                min: 200
            }
        );
    }

    #[test]
    fn accepts_long_content_despite_markup_bloat() {
        // ratio 0.025 < 0.1, but 500 >= 2 * 200
        assert!(accept(&candidate(500, 20_000), 200, 0.1));
    }

    #[test]
    fn rejects_short_content_with_low_ratio() {
        // ratio 0.0125 < max(0.02, 0.05) and 250 < 400
        let verdict = QualityGate::new(200, 0.1).evaluate(&candidate(250, 20_000));
        assert!(matches!(verdict, Verdict::LowRatio { .. }));
        assert!(!accept(&candidate(250, 20_000), 200, 0.1));
    }

    #[test]
    fn relaxed_threshold_accepts_moderate_ratio() {
        // ratio 0.06 >= 0.05 and 300 >= 240
        assert!(accept(&candidate(300, 5_000), 200, 0.1));
        // ratio 0.06 but 230 < 240
        assert!(!accept(&candidate(230, 3_834), 200, 0.1));
    }

    #[test]
    fn relaxed_threshold_never_below_floor() {
        // min_ratio 0.03 -> relaxed = max(0.02, 0.015) = 0.02; ratio is 0.015
        assert!(!accept(&candidate(300, 20_000), 200, 0.03));
    }

    #[test]
    fn empty_markup_counts_as_full_ratio() {
        assert!(accept(&candidate(200, 0), 200, 0.1));
    }

    #[test]
    fn error_page_always_rejected() {
        let mut c = candidate(5_000, 6_000);
        c.is_error_page = true;
        assert_eq!(QualityGate::default().evaluate(&c), Verdict::ErrorPage);
    }

    #[test]
    fn error_page_detection_markers() {
        assert!(looks_like_error_page("404 Not Found", &"x".repeat(2000)));
        assert!(looks_like_error_page("Home", "Oops! Page not found. Try the menu."));
        assert!(looks_like_error_page("Docs", "This page does not exist anymore"));
        assert!(looks_like_error_page("Not Found", "Nothing here"));
        assert!(!looks_like_error_page("Pricing", "Plans for every team"));
    }

    #[test]
    fn bare_not_found_ignored_on_long_pages() {
        let content = format!("Search tips: results not found? {}", "y".repeat(600));
        assert!(!looks_like_error_page("Help", &content));
        assert!(contains_error_marker("Help", &content));
    }

    #[test]
    fn markers_past_scan_window_are_ignored() {
        let content = format!("{} page not found", "z".repeat(300));
        assert!(!looks_like_error_page("Blog", &content));
        assert!(!contains_error_marker("Blog", &content));
    }

    #[test]
    fn verdict_display() {
        let v = Verdict::LowRatio {
            ratio: 0.0125,
            min_ratio: 0.1,
        };
        assert_eq!(v.to_string(), "low text/html ratio (0.013 < 0.1)");
    }
}
