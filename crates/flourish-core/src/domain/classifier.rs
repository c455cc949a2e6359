//! Domain classifier: hostname -> productive / unproductive / neutral.
//!
//! Pure functions, no I/O. The scoring engine turns the result into a delta.

use serde::{Deserialize, Serialize};

/// Result of classifying a hostname against the two user lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Productive,
    Unproductive,
    Neutral,
}

impl Classification {
    /// Score delta for one tick spent on a site of this class.
    pub fn delta(self) -> i32 {
        match self {
            Classification::Productive => 1,
            Classification::Unproductive => -1,
            Classification::Neutral => 0,
        }
    }
}

/// Trim, strip one leading `www.`, lowercase.
pub fn normalize_domain(domain: &str) -> String {
    let lower = domain.trim().to_ascii_lowercase();
    match lower.strip_prefix("www.") {
        Some(rest) => rest.to_string(),
        None => lower,
    }
}

/// Does `candidate` belong to `pattern`?
///
/// Exact match, or `candidate` is a subdomain of `pattern`
/// (`a.b.example.com` matches `example.com`, `notexample.com` does not).
pub fn domain_matches(candidate: &str, pattern: &str) -> bool {
    let candidate = normalize_domain(candidate);
    let pattern = normalize_domain(pattern);

    if pattern.is_empty() {
        return false;
    }
    if candidate == pattern {
        return true;
    }
    candidate
        .strip_suffix(pattern.as_str())
        .is_some_and(|head| head.ends_with('.'))
}

/// Classify `domain` against the productive and unproductive lists.
///
/// The productive list is scanned completely before the unproductive list is
/// looked at, so a domain present in both lists is `Productive`.
pub fn classify<P, U>(domain: &str, productive: &[P], unproductive: &[U]) -> Classification
where
    P: AsRef<str>,
    U: AsRef<str>,
{
    let domain = normalize_domain(domain);
    if domain.is_empty() {
        return Classification::Neutral;
    }

    if productive.iter().any(|site| domain_matches(&domain, site.as_ref())) {
        return Classification::Productive;
    }
    if unproductive.iter().any(|site| domain_matches(&domain, site.as_ref())) {
        return Classification::Unproductive;
    }
    Classification::Neutral
}
