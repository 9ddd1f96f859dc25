//! Coarse, length-based request size estimate
//!
//! The remote model limits requests by tokens; we only know characters. One
//! token is roughly four characters of Russian or English text, and a fixed
//! overhead covers the bug-fix prompt whether or not it is injected.

use serde::{Deserialize, Serialize};

use crate::error::ChatError;

pub const DEFAULT_OVERHEAD_TOKENS: usize = 200;
pub const DEFAULT_CHARS_PER_TOKEN: usize = 4;
pub const DEFAULT_TOKEN_LIMIT: usize = 6000;

/// Calibration constants for the pre-flight size check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenBudget {
    pub overhead: usize,
    pub chars_per_token: usize,
    pub limit: usize,
}

impl Default for TokenBudget {
    fn default() -> Self {
        Self {
            overhead: DEFAULT_OVERHEAD_TOKENS,
            chars_per_token: DEFAULT_CHARS_PER_TOKEN,
            limit: DEFAULT_TOKEN_LIMIT,
        }
    }
}

impl TokenBudget {
    pub fn estimate(&self, user_text: &str, file_content: Option<&str>) -> usize {
        let file_tokens = file_content.map(|c| self.tokens_for(c)).unwrap_or(0);
        self.overhead + self.tokens_for(user_text) + file_tokens
    }

    /// Estimate and reject anything above the limit.
    pub fn check(&self, user_text: &str, file_content: Option<&str>) -> Result<usize, ChatError> {
        let estimated = self.estimate(user_text, file_content);
        if estimated > self.limit {
            return Err(ChatError::TokenBudgetExceeded {
                estimated,
                limit: self.limit,
            });
        }
        Ok(estimated)
    }

    fn tokens_for(&self, text: &str) -> usize {
        // Character count, not byte length, so Cyrillic isn't counted double
        text.chars().count().div_ceil(self.chars_per_token.max(1))
    }
}

/// Estimate with the default constants
pub fn estimate_tokens(user_text: &str, file_content: Option<&str>) -> usize {
    TokenBudget::default().estimate(user_text, file_content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_only() {
        let text = "a".repeat(4000);
        assert_eq!(estimate_tokens(&text, None), 1200);
    }

    #[test]
    fn test_text_and_max_file_exceeds_limit() {
        let text = "a".repeat(4000);
        let file = "b".repeat(21000);
        let budget = TokenBudget::default();
        assert_eq!(budget.estimate(&text, Some(&file)), 6450);

        match budget.check(&text, Some(&file)) {
            Err(ChatError::TokenBudgetExceeded { estimated, limit }) => {
                assert_eq!(estimated, 6450);
                assert_eq!(limit, 6000);
            }
            other => panic!("expected budget rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_partial_token_rounds_up() {
        assert_eq!(estimate_tokens("abcde", None), 202);
        assert_eq!(estimate_tokens("", Some("x")), 201);
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        // 4 Cyrillic characters, 8 bytes
        assert_eq!(estimate_tokens("баги", None), 201);
    }

    #[test]
    fn test_exactly_at_limit_passes() {
        let budget = TokenBudget {
            overhead: 0,
            chars_per_token: 1,
            limit: 3,
        };
        assert_eq!(budget.check("abc", None).unwrap(), 3);
        assert!(budget.check("abcd", None).is_err());
    }
}
