//! Platform message length rules

use regex::Regex;

use crate::ports::{LengthValidator, ValidationError};

/// Code point ranges that count as a single unit; everything else counts double
const LIGHT_RANGES: [(u32, u32); 4] = [(0, 4351), (8192, 8205), (8208, 8223), (8242, 8247)];

/// Code points the platform rejects outright
const INVALID_CHARS: [char; 8] = [
    '\u{FFFE}', '\u{FEFF}', '\u{FFFF}', '\u{202A}', '\u{202B}', '\u{202C}', '\u{202D}', '\u{202E}',
];

/// Policy configuration
#[derive(Debug, Clone)]
pub struct PolicyConfig {
    /// Maximum weighted length of one message
    pub max_weighted_length: usize,
    /// Weighted length every URL counts as, regardless of its real length
    pub url_length: usize,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            max_weighted_length: 280,
            url_length: 23,
        }
    }
}

/// Weighted-length validator matching the platform's counting rules
pub struct TweetLengthPolicy {
    config: PolicyConfig,
    url_pattern: Regex,
}

impl TweetLengthPolicy {
    pub fn new(config: PolicyConfig) -> Self {
        let url_pattern = Regex::new(r"https?://\S+").expect("Valid regex");
        Self {
            config,
            url_pattern,
        }
    }

    /// Weighted length of `text`
    pub fn weighted_length(&self, text: &str) -> usize {
        let mut length = 0;
        let mut last = 0;
        for url in self.url_pattern.find_iter(text) {
            length += Self::weigh(&text[last..url.start()]);
            length += self.config.url_length;
            last = url.end();
        }
        length + Self::weigh(&text[last..])
    }

    fn weigh(text: &str) -> usize {
        text.chars()
            .map(|c| {
                let cp = c as u32;
                if LIGHT_RANGES
                    .iter()
                    .any(|(start, end)| (*start..=*end).contains(&cp))
                {
                    1
                } else {
                    2
                }
            })
            .sum()
    }
}

impl Default for TweetLengthPolicy {
    fn default() -> Self {
        Self::new(PolicyConfig::default())
    }
}

impl LengthValidator for TweetLengthPolicy {
    fn validate(&self, text: &str) -> Result<bool, ValidationError> {
        if text.chars().any(|c| INVALID_CHARS.contains(&c)) {
            return Err(ValidationError::InvalidCharacters);
        }
        if text.trim().is_empty() {
            return Ok(false);
        }
        Ok(self.weighted_length(text) <= self.config.max_weighted_length)
    }
}
