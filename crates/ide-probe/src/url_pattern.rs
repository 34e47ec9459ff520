//! URL matching for navigation waits.

use std::fmt;

use regex::Regex;

use crate::result::{ProbeError, ProbeResult};

/// Pattern a page URL is matched against
#[derive(Debug, Clone)]
pub enum UrlPattern {
    /// Exact URL match
    Exact(String),
    /// Prefix match
    Prefix(String),
    /// Contains substring
    Contains(String),
    /// Regex match
    Regex(Regex),
}

impl UrlPattern {
    /// Compile a regex pattern.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::InvalidConfig`] if the expression does not compile.
    pub fn regex(pattern: &str) -> ProbeResult<Self> {
        Regex::new(pattern)
            .map(Self::Regex)
            .map_err(|e| ProbeError::InvalidConfig {
                message: format!("invalid URL regex {pattern:?}: {e}"),
            })
    }

    /// Check if a URL matches this pattern
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        match self {
            Self::Exact(pattern) => url == pattern,
            Self::Prefix(pattern) => url.starts_with(pattern.as_str()),
            Self::Contains(pattern) => url.contains(pattern.as_str()),
            Self::Regex(re) => re.is_match(url),
        }
    }
}

impl From<&str> for UrlPattern {
    fn from(url: &str) -> Self {
        Self::Exact(url.to_string())
    }
}

impl fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(p) => write!(f, "URL {p}"),
            Self::Prefix(p) => write!(f, "URL starting with {p}"),
            Self::Contains(p) => write!(f, "URL containing {p}"),
            Self::Regex(re) => write!(f, "URL matching /{}/", re.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact() {
        let p = UrlPattern::from("http://localhost:8080");
        assert!(p.matches("http://localhost:8080"));
        assert!(!p.matches("http://localhost:8080/"));
    }

    #[test]
    fn test_prefix_and_contains() {
        let url = "https://che.example.com/dashboard/#/workspaces";
        assert!(UrlPattern::Prefix("https://che.example.com".into()).matches(url));
        assert!(UrlPattern::Contains("/dashboard/".into()).matches(url));
        assert!(!UrlPattern::Contains("/ide/".into()).matches(url));
    }

    #[test]
    fn test_regex() {
        let p = UrlPattern::regex(r"/workspace[0-9a-z]+$").unwrap();
        assert!(p.matches("https://che/workspaceabc123"));
        assert!(!p.matches("https://che/workspace-"));
    }

    #[test]
    fn test_invalid_regex_rejected() {
        let err = UrlPattern::regex("(unclosed").unwrap_err();
        assert!(matches!(err, ProbeError::InvalidConfig { .. }));
    }

    #[test]
    fn test_display() {
        assert_eq!(UrlPattern::from("http://a").to_string(), "URL http://a");
        assert_eq!(
            UrlPattern::regex("a+").unwrap().to_string(),
            "URL matching /a+/"
        );
    }
}
