//! Dictionary - Payload tokens for injection and character fuzzers
//!
//! Catalogs are intentionally small: each category carries a handful of
//! representative payloads rather than an exhaustive wordlist.

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashMap;

/// Payload dictionary grouped by category
#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    categories: HashMap<TokenCategory, Vec<String>>,
}

/// Category of dictionary tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenCategory {
    /// SQL injection payloads
    SqlInjection,
    /// Script injection payloads, reflected verbatim by vulnerable services
    Xss,
    /// Shell command injection payloads
    CommandInjection,
    /// Invisible characters used to corrupt names and values
    ZeroWidth,
    /// Leading/trailing whitespace variants
    Whitespace,
}

impl Dictionary {
    /// Create a new empty dictionary
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the built-in payloads
    pub fn builtin() -> Self {
        let mut dict = Self::new();

        dict.add_tokens(
            TokenCategory::SqlInjection,
            vec![
                "' OR '1'='1",
                "'; DROP TABLE users; --",
                "1' AND '1'='1",
                "1 UNION SELECT NULL, table_name FROM information_schema.tables--",
                "' OR 1=1--",
                "admin'--",
                "1' AND SLEEP(5)--",
            ],
        );

        dict.add_tokens(
            TokenCategory::Xss,
            vec![
                "<script>alert(1)</script>",
                "<img src=x onerror=alert(1)>",
                "\"><svg/onload=alert(1)>",
                "javascript:alert(document.cookie)",
            ],
        );

        dict.add_tokens(
            TokenCategory::CommandInjection,
            vec![
                "$(whoami)",
                "; cat /etc/passwd",
                "| ls -la",
                "`id`",
                "& dir",
            ],
        );

        dict.add_tokens(
            TokenCategory::ZeroWidth,
            vec![
                "\u{200B}", // Zero-width space
                "\u{200C}", // Zero-width non-joiner
                "\u{200D}", // Zero-width joiner
                "\u{FEFF}", // BOM
            ],
        );

        dict.add_tokens(
            TokenCategory::Whitespace,
            vec![" ", "\t", "\u{00A0}", "\u{3000}"],
        );

        dict
    }

    /// Add tokens to a category
    pub fn add_tokens(&mut self, category: TokenCategory, tokens: Vec<&str>) {
        let entry = self.categories.entry(category).or_default();
        entry.extend(tokens.into_iter().map(str::to_string));
    }

    /// Get all tokens in a category
    pub fn tokens_in(&self, category: TokenCategory) -> &[String] {
        self.categories
            .get(&category)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Up to `limit` tokens of a category; all of them, in order, when the
    /// category is small enough, otherwise a random selection
    pub fn sample(
        &self,
        category: TokenCategory,
        limit: Option<usize>,
        rng: &mut impl Rng,
    ) -> Vec<String> {
        let tokens = self.tokens_in(category);
        match limit {
            Some(n) if n < tokens.len() => tokens.choose_multiple(rng, n).cloned().collect(),
            _ => tokens.to_vec(),
        }
    }

    /// Get total token count
    pub fn len(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }

    /// Check if dictionary is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
