//! Matching of trigger conditions, value keywords and template keys against
//! a query.
//!
//! Text is normalized once per decision into [`QueryTerms`]: lowercase,
//! split on anything that is not alphanumeric.  Keywords and phrases are
//! normalized the same way and must occur as whole-token runs, so `"offer"`
//! does not match `"offering"`.

use std::collections::BTreeSet;

use crate::spec::model::{TriggerCondition, ValueItem};

use super::query::QueryContext;

/// Split text into lowercase alphanumeric tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Normalize an intent label or pattern: trimmed, lowercase.
pub fn normalize_label(label: &str) -> String {
    label.trim().to_lowercase()
}

/// Glob matching with `*` wildcards.
pub fn pattern_matches(pattern: &str, text: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    if !pattern.contains('*') {
        return pattern == text;
    }

    let parts: Vec<&str> = pattern.split('*').collect();
    let last = parts.len() - 1;
    let mut pos = 0;

    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        if i == 0 {
            // Anchored at the start unless the pattern starts with `*`.
            if !text.starts_with(part) {
                return false;
            }
            pos = part.len();
        } else if i == last {
            // Anchored at the end unless the pattern ends with `*`.
            return text.len() >= pos + part.len() && text[pos..].ends_with(part);
        } else {
            match text[pos..].find(part) {
                Some(found) => pos += found + part.len(),
                None => return false,
            }
        }
    }
    true
}

/// A query normalized for matching.
#[derive(Debug, Clone)]
pub struct QueryTerms {
    /// Tokens joined with single spaces and padded, for phrase lookups.
    padded: String,
    tokens: BTreeSet<String>,
    intent: String,
    intent_tokens: BTreeSet<String>,
    channel: Option<crate::spec::model::Channel>,
}

impl QueryTerms {
    pub fn new(query: &QueryContext) -> Self {
        let tokens = tokenize(&query.text);
        let intent = normalize_label(&query.intent);
        Self {
            padded: format!(" {} ", tokens.join(" ")),
            tokens: tokens.into_iter().collect(),
            intent_tokens: tokenize(&intent).into_iter().collect(),
            intent,
            channel: query.channel,
        }
    }

    /// The normalized intent label.
    pub fn intent(&self) -> &str {
        &self.intent
    }

    /// Whether the text contains `phrase` as a whole-token run.
    pub fn contains_phrase(&self, phrase: &str) -> bool {
        let needle = tokenize(phrase);
        match needle.len() {
            0 => false,
            1 => self.tokens.contains(&needle[0]),
            _ => self.padded.contains(&format!(" {} ", needle.join(" "))),
        }
    }

    /// Whether `term` occurs in the text or among the intent's tokens.
    pub fn mentions(&self, term: &str) -> bool {
        if self.contains_phrase(term) {
            return true;
        }
        let needle = tokenize(term);
        !needle.is_empty() && needle.iter().all(|t| self.intent_tokens.contains(t))
    }

    /// Whether the intent label matches a glob pattern.
    pub fn intent_matches(&self, pattern: &str) -> bool {
        pattern_matches(&normalize_label(pattern), &self.intent)
    }
}

impl TriggerCondition {
    /// Evaluate against a normalized query.
    ///
    /// The channel restriction (if any) must hold, then at least one intent
    /// pattern or keyword must hit.  A query without a channel never
    /// satisfies a channel-restricted condition.
    pub fn matches(&self, terms: &QueryTerms) -> bool {
        if let Some(required) = self.channel {
            if terms.channel != Some(required) {
                return false;
            }
        }
        self.intents.iter().any(|p| terms.intent_matches(p))
            || self.keywords.iter().any(|k| terms.contains_phrase(k))
    }

    /// Human-readable list of what hit, for rationales.
    pub fn describe_hits(&self, terms: &QueryTerms) -> Vec<String> {
        let intents = self
            .intents
            .iter()
            .filter(|p| terms.intent_matches(p))
            .map(|p| format!("intent '{}'", p));
        let keywords = self
            .keywords
            .iter()
            .filter(|k| terms.contains_phrase(k))
            .map(|k| format!("keyword '{}'", k));
        intents.chain(keywords).collect()
    }
}

impl ValueItem {
    /// Whether the query touches this value.
    pub fn is_implicated_by(&self, terms: &QueryTerms) -> bool {
        self.match_terms().into_iter().any(|t| terms.mentions(t))
    }
}
