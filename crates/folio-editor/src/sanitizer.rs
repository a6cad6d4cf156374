//! Markup sanitization applied during conversion.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::{Captures, Regex};

use crate::tools::SanitizeRules;

/// Cleans text before it is imported into a tool.
#[async_trait]
pub trait Sanitizer: Send + Sync {
    async fn clean(&self, text: String, rules: &SanitizeRules) -> String;
}

static TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"</?\s*([A-Za-z][A-Za-z0-9-]*)[^>]*>").expect("tag pattern is valid")
});

/// Strips every tag the rules do not allow. Text content is kept.
#[derive(Debug, Default, Clone, Copy)]
pub struct BasicSanitizer;

impl BasicSanitizer {
    pub fn clean_sync(text: &str, rules: &SanitizeRules) -> String {
        TAG.replace_all(text, |caps: &Captures<'_>| {
            if rules.allows(&caps[1]) {
                caps[0].to_string()
            } else {
                String::new()
            }
        })
        .into_owned()
    }
}

#[async_trait]
impl Sanitizer for BasicSanitizer {
    async fn clean(&self, text: String, rules: &SanitizeRules) -> String {
        Self::clean_sync(&text, rules)
    }
}
