//! Bot-challenge detection on response bodies.

/// Substrings (matched case-insensitively) that mark an access-denied or
/// challenge page served in place of the listing.
pub const DEFAULT_BLOCK_INDICATORS: &[&str] = &[
    "cloudflare",
    "access denied",
    "captcha",
    "403 forbidden",
    "blocked",
    "security check",
];

/// Decides whether a response body is a blocking page.
///
/// Implementations are swapped into [`PageFetcher`](super::PageFetcher)
/// without touching its retry mechanics.
pub trait BlockDetector: Send + Sync {
    /// Returns the matched indicator when `body` is a blocking page.
    fn detect(&self, body: &str) -> Option<String>;
}

/// Case-insensitive substring matcher over a fixed indicator list.
#[derive(Debug, Clone)]
pub struct IndicatorBlockDetector {
    indicators: Vec<String>,
}

impl IndicatorBlockDetector {
    /// Creates a detector; indicators are lowercased once here.
    #[must_use]
    pub fn new<I, S>(indicators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            indicators: indicators
                .into_iter()
                .map(|i| i.as_ref().to_lowercase())
                .filter(|i| !i.is_empty())
                .collect(),
        }
    }
}

impl Default for IndicatorBlockDetector {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCK_INDICATORS)
    }
}

impl BlockDetector for IndicatorBlockDetector {
    fn detect(&self, body: &str) -> Option<String> {
        let lowered = body.to_lowercase();
        self.indicators
            .iter()
            .find(|indicator| lowered.contains(indicator.as_str()))
            .cloned()
    }
}
