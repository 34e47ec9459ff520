//! Result and error types for ide-probe.
//!
//! Errors fall into three groups that the wait engine treats differently:
//!
//! - [`ProbeError::Timeout`]: a bounded wait ran out of budget. The failing
//!   test step decides what to do with it; recovery loops react to it.
//! - transient driver errors ([`ProbeError::StaleElement`],
//!   [`ProbeError::NotInteractable`], [`ProbeError::ClickIntercepted`]) and
//!   the engine's own [`ProbeError::NotReady`] signal: retried inside the
//!   remaining budget.
//! - everything else: propagated immediately, never retried.

use std::time::Duration;

use thiserror::Error;

/// Result type for ide-probe operations
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Errors that can occur while driving the browser
#[derive(Debug, Error)]
pub enum ProbeError {
    /// A bounded wait exhausted its timeout
    #[error("Timed out after {timeout_ms}ms waiting for {what}")]
    Timeout {
        /// Locator or condition that was waited for
        what: String,
        /// Timeout in milliseconds
        timeout_ms: u64,
    },

    /// Condition evaluated but is not satisfied yet
    #[error("Condition not met yet: {reason}")]
    NotReady {
        /// Why the condition is not satisfied
        reason: String,
    },

    /// Element reference no longer attached to the document
    #[error("Stale element reference for {locator}")]
    StaleElement {
        /// Locator the element was found with
        locator: String,
    },

    /// Element is present but cannot receive input
    #[error("Element {locator} is not interactable")]
    NotInteractable {
        /// Locator the element was found with
        locator: String,
    },

    /// Another element would receive the click
    #[error("Click on {locator} intercepted: {message}")]
    ClickIntercepted {
        /// Locator the element was found with
        locator: String,
        /// Driver message
        message: String,
    },

    /// Malformed locator
    #[error("Invalid locator {locator}: {message}")]
    InvalidLocator {
        /// Locator as displayed
        locator: String,
        /// Error message
        message: String,
    },

    /// Invalid configuration value
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Error message
        message: String,
    },

    /// Browser session is gone
    #[error("Browser session closed")]
    SessionClosed,

    /// Any other driver failure
    #[error("Driver error: {message}")]
    Driver {
        /// Error message
        message: String,
    },

    /// HTTP request failed
    #[error("HTTP error: {message}")]
    Http {
        /// Error message
        message: String,
    },

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProbeError {
    /// Create a timeout error for `what`
    #[must_use]
    pub fn timeout(what: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            what: what.into(),
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Create a "not yet" signal
    #[must_use]
    pub fn not_ready(reason: impl Into<String>) -> Self {
        Self::NotReady {
            reason: reason.into(),
        }
    }

    /// Create a generic driver error
    #[must_use]
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver {
            message: message.into(),
        }
    }

    /// Whether this is a timeout
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Whether this is the engine's "condition not met yet" signal
    #[must_use]
    pub const fn is_not_ready(&self) -> bool {
        matches!(self, Self::NotReady { .. })
    }

    /// Whether an element action failing with this error may succeed on retry
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::StaleElement { .. } | Self::NotInteractable { .. } | Self::ClickIntercepted { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message_names_condition() {
        let err = ProbeError::timeout("visibility of css=div.ready", Duration::from_secs(3));
        assert_eq!(
            err.to_string(),
            "Timed out after 3000ms waiting for visibility of css=div.ready"
        );
        assert!(err.is_timeout());
        assert!(!err.is_transient());
    }

    #[test]
    fn test_classification() {
        let stale = ProbeError::StaleElement {
            locator: "id=kc-login".into(),
        };
        assert!(stale.is_transient());
        assert!(!stale.is_timeout());

        let not_ready = ProbeError::not_ready("value is empty");
        assert!(not_ready.is_not_ready());
        assert!(!not_ready.is_transient());

        assert!(!ProbeError::SessionClosed.is_transient());
        assert!(!ProbeError::driver("boom").is_not_ready());
    }

    #[test]
    fn test_json_conversion() {
        let err: ProbeError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, ProbeError::Json(_)));
    }
}
