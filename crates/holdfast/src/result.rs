//! Result and error types for Holdfast.
//!
//! Errors fall into four groups: drift (expected, swallowed inside polls),
//! resolution failures (reported to the caller), interaction blocks
//! (converted to data by the interaction guard) and fatal faults.

use thiserror::Error;

/// Result type for Holdfast operations
pub type HoldfastResult<T> = Result<T, HoldfastError>;

/// Errors that can occur in Holdfast
#[derive(Debug, Error)]
pub enum HoldfastError {
    /// Handle refers to a node that is no longer attached to the document
    #[error("Stale element handle: {handle}")]
    StaleElement {
        /// Opaque handle id
        handle: String,
    },

    /// Element or its frame disappeared between lookup and use
    #[error("Element gone: {message}")]
    ElementGone {
        /// Error message
        message: String,
    },

    /// Script evaluation failed inside the page
    #[error("Script evaluation failed: {message}")]
    ScriptFailed {
        /// Error message
        message: String,
    },

    /// Click attempt was rejected by the page
    #[error("Click blocked: {message}")]
    ClickBlocked {
        /// Error message
        message: String,
    },

    /// Locator chain exhausted without a match
    #[error("No element matched any of: {attempted}")]
    NotFound {
        /// Attempted locators, in chain order
        attempted: String,
    },

    /// Operation timed out
    #[error("Timed out after {ms}ms waiting for {waited_for}")]
    Timeout {
        /// Timeout in milliseconds
        ms: u64,
        /// Description of the awaited condition
        waited_for: String,
    },

    /// Selector could not be executed by the query mechanism
    #[error("Invalid selector {selector}: {message}")]
    InvalidSelector {
        /// The offending selector
        selector: String,
        /// Error message
        message: String,
    },

    /// Browser session is unreachable or broken
    #[error("Browser session error: {message}")]
    Session {
        /// Error message
        message: String,
    },

    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunch {
        /// Error message
        message: String,
    },

    /// Scenario body failed
    #[error("Scenario {name} failed: {reason}")]
    ScenarioFailed {
        /// Scenario name
        name: String,
        /// Failure reason
        reason: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl HoldfastError {
    /// Create a session error
    #[must_use]
    pub fn session(message: impl Into<String>) -> Self {
        Self::Session {
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a click-blocked error
    #[must_use]
    pub fn click_blocked(message: impl Into<String>) -> Self {
        Self::ClickBlocked {
            message: message.into(),
        }
    }

    /// Whether this error is expected drift in an asynchronous UI.
    ///
    /// Drift is retried silently while polling and never surfaced on its own.
    #[must_use]
    pub const fn is_drift(&self) -> bool {
        matches!(
            self,
            Self::StaleElement { .. } | Self::ElementGone { .. } | Self::ScriptFailed { .. }
        )
    }

    /// Whether this error must abort the scenario immediately
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::InvalidSelector { .. }
                | Self::Session { .. }
                | Self::BrowserLaunch { .. }
                | Self::Io(_)
        )
    }
}
