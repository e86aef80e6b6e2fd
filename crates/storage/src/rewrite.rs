//! Storage-origin to CDN URL rewriting.

use crate::types::CdnSettings;

/// Replaces a storage origin prefix with a CDN prefix.
///
/// Matching is a literal substring replacement; URLs that do not
/// contain the origin are returned unchanged.
#[derive(Debug, Clone, Default)]
pub struct UrlRewriter {
    rule: Option<CdnSettings>,
}

impl UrlRewriter {
    /// Rewrite `origin` to `cdn`.
    pub fn new(origin: impl Into<String>, cdn: impl Into<String>) -> Self {
        Self {
            rule: Some(CdnSettings {
                origin: origin.into(),
                cdn: cdn.into(),
            }),
        }
    }

    /// A rewriter that returns every URL unchanged.
    pub fn identity() -> Self {
        Self::default()
    }

    /// Build from optional settings.
    pub fn from_settings(settings: Option<&CdnSettings>) -> Self {
        Self {
            rule: settings.filter(|s| !s.origin.is_empty()).cloned(),
        }
    }

    /// Map a raw storage URL to its public URL.
    pub fn rewrite(&self, url: &str) -> String {
        match &self.rule {
            Some(rule) if url.contains(rule.origin.as_str()) => url.replace(&rule.origin, &rule.cdn),
            _ => url.to_string(),
        }
    }
}
