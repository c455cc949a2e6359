//! URL and site-input helpers.
//!
//! - `extract_host`: URL -> hostname（`url` crate）
//! - `is_internal_url`: ブラウザ内部ページの判定
//! - `parse_site_input`: ユーザー入力（URL or ドメイン）-> 正規化済みドメイン

use regex::Regex;
use std::sync::LazyLock;
use url::Url;

use super::classifier::normalize_domain;

const INTERNAL_PREFIXES: [&str; 3] = ["chrome://", "chrome-extension://", "about:"];

static DOMAIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z0-9][a-z0-9-]{0,61}[a-z0-9]$")
        .expect("valid domain regex")
});

/// Browser-internal or non-web page (skipped by the sampler).
pub fn is_internal_url(url: &str) -> bool {
    if INTERNAL_PREFIXES.iter().any(|p| url.starts_with(p)) {
        return true;
    }
    match Url::parse(url) {
        Ok(parsed) => !matches!(parsed.scheme(), "http" | "https"),
        Err(_) => false,
    }
}

/// Hostname of `url`, or `None` when it does not parse or has no host.
pub fn extract_host(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    if host.is_empty() {
        None
    } else {
        Some(host.to_string())
    }
}

/// Syntactic domain check (after normalization).
pub fn is_valid_domain(domain: &str) -> bool {
    DOMAIN_RE.is_match(&normalize_domain(domain))
}

/// Turn user input into a list entry.
///
/// `http(s)://` input is parsed as a URL and its host is used; anything else
/// must already look like a domain.
pub fn parse_site_input(input: &str) -> Option<String> {
    let trimmed = input.trim();

    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        return extract_host(trimmed).map(|host| normalize_domain(&host));
    }

    let normalized = normalize_domain(trimmed);
    if is_valid_domain(&normalized) {
        Some(normalized)
    } else {
        None
    }
}
