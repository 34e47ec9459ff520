//! Locators: how to find an element.
//!
//! A [`Locator`] is an immutable description produced by page objects and
//! consumed by the wait engine and the driver. Each variant is one selector
//! strategy, so drivers (and mocks) can match on it explicitly instead of
//! receiving an opaque lookup object.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::result::{ProbeError, ProbeResult};

/// W3C WebDriver strategy for CSS selectors
pub const STRATEGY_CSS: &str = "css selector";

/// W3C WebDriver strategy for XPath expressions
pub const STRATEGY_XPATH: &str = "xpath";

/// W3C WebDriver strategy for link text
pub const STRATEGY_LINK_TEXT: &str = "link text";

/// Selector strategy plus selector string
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Locator {
    /// CSS selector (e.g., "div.theia-mini-browser")
    Css(String),
    /// XPath expression
    XPath(String),
    /// Element `id` attribute
    Id(String),
    /// Element `name` attribute
    Name(String),
    /// Exact text of an anchor element
    LinkText(String),
}

impl Locator {
    /// Create a CSS locator
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Create an XPath locator
    #[must_use]
    pub fn xpath(expression: impl Into<String>) -> Self {
        Self::XPath(expression.into())
    }

    /// Create an id locator
    #[must_use]
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    /// Create a name locator
    #[must_use]
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    /// Create a link text locator
    #[must_use]
    pub fn link_text(text: impl Into<String>) -> Self {
        Self::LinkText(text.into())
    }

    /// Short strategy label used in messages
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Css(_) => "css",
            Self::XPath(_) => "xpath",
            Self::Id(_) => "id",
            Self::Name(_) => "name",
            Self::LinkText(_) => "link",
        }
    }

    /// The raw selector string
    #[must_use]
    pub fn selector(&self) -> &str {
        match self {
            Self::Css(s) | Self::XPath(s) | Self::Id(s) | Self::Name(s) | Self::LinkText(s) => s,
        }
    }

    /// Convert to a W3C `(using, value)` pair.
    ///
    /// `Id` and `Name` have no W3C strategy of their own and are expressed as
    /// attribute CSS selectors.
    #[must_use]
    pub fn to_w3c(&self) -> (&'static str, String) {
        match self {
            Self::Css(s) => (STRATEGY_CSS, s.clone()),
            Self::XPath(s) => (STRATEGY_XPATH, s.clone()),
            Self::Id(s) => (STRATEGY_CSS, format!("[id=\"{}\"]", escape_css_string(s))),
            Self::Name(s) => (STRATEGY_CSS, format!("[name=\"{}\"]", escape_css_string(s))),
            Self::LinkText(s) => (STRATEGY_LINK_TEXT, s.clone()),
        }
    }

    /// Reject locators that can never match.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::InvalidLocator`] for an empty or blank selector.
    pub fn validate(&self) -> ProbeResult<()> {
        if self.selector().trim().is_empty() {
            return Err(ProbeError::InvalidLocator {
                locator: self.to_string(),
                message: "selector is empty".to_string(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.kind(), self.selector())
    }
}

fn escape_css_string(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if c == '"' || c == '\\' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    mod construction_tests {
        use super::*;

        #[test]
        fn test_constructors() {
            assert_eq!(Locator::css("div.a"), Locator::Css("div.a".into()));
            assert_eq!(Locator::xpath("//input"), Locator::XPath("//input".into()));
            assert_eq!(Locator::id("kc-login"), Locator::Id("kc-login".into()));
            assert_eq!(Locator::name("username"), Locator::Name("username".into()));
            assert_eq!(Locator::link_text("Open"), Locator::LinkText("Open".into()));
        }

        #[test]
        fn test_display() {
            assert_eq!(Locator::css("div.theia-mini-browser").to_string(), "css=div.theia-mini-browser");
            assert_eq!(Locator::id("kc-login").to_string(), "id=kc-login");
        }
    }

    mod w3c_tests {
        use super::*;

        #[test]
        fn test_css_and_xpath_pass_through() {
            assert_eq!(
                Locator::css("div iframe").to_w3c(),
                (STRATEGY_CSS, "div iframe".to_string())
            );
            assert_eq!(
                Locator::xpath("//div[@id='x']").to_w3c(),
                (STRATEGY_XPATH, "//div[@id='x']".to_string())
            );
            assert_eq!(
                Locator::link_text("Open").to_w3c(),
                (STRATEGY_LINK_TEXT, "Open".to_string())
            );
        }

        #[test]
        fn test_id_and_name_become_attribute_css() {
            assert_eq!(
                Locator::id("kc-form-login").to_w3c(),
                (STRATEGY_CSS, "[id=\"kc-form-login\"]".to_string())
            );
            assert_eq!(
                Locator::name("pass\"word").to_w3c(),
                (STRATEGY_CSS, "[name=\"pass\\\"word\"]".to_string())
            );
        }
    }

    mod validation_tests {
        use super::*;

        #[test]
        fn test_empty_selector_rejected() {
            let err = Locator::css("  ").validate().unwrap_err();
            assert!(matches!(err, ProbeError::InvalidLocator { .. }));
        }

        #[test]
        fn test_valid_selector_accepted() {
            assert!(Locator::xpath("//body").validate().is_ok());
        }
    }
}
