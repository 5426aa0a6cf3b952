//! Error handling for geoguard.
//!
//! This module provides:
//! - A single error type carrying a stable machine-readable code
//! - Separate operator-facing (internal) and caller-facing messages
//! - Severity-driven logging with tracing integration
//! - Metrics integration for error tracking
//!
//! Configuration errors (bad patterns, duplicate chain names, attempts to
//! edit constant chains) are operator-facing. They are never meant to be
//! rendered to the end user whose request is being authorized.
//!
//! # Usage
//!
//! ```rust,ignore
//! use geoguard_core::error::{GuardError, Result, ErrorCode};
//!
//! fn lookup(name: &str) -> Result<()> {
//!     Err(GuardError::chain_not_found(name))
//! }
//! ```

use metrics::counter;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use tracing::{error, warn};

use crate::telemetry::metrics::ERRORS_TOTAL;

// ═══════════════════════════════════════════════════════════════════════════════
// Result Type Alias
// ═══════════════════════════════════════════════════════════════════════════════

/// A specialized Result type for geoguard operations.
pub type Result<T> = std::result::Result<T, GuardError>;

// ═══════════════════════════════════════════════════════════════════════════════
// Error Codes
// ═══════════════════════════════════════════════════════════════════════════════

/// Machine-readable error codes.
///
/// These codes are stable and can be used by callers for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Routing Errors (1000-1099)
    NoMatchingChain,

    // Filter Chain Errors (1100-1199)
    ImmutableChain,
    ChainNotRemovable,
    ChainNotFound,
    DuplicateChainName,
    ChainNameMandatory,
    EmptyPatternList,
    InvalidPattern,
    EmptyFilterChain,
    AnonymousNotLast,
    InvalidChainReference,
    PositionOutOfRange,

    // Access Rule Errors (1200-1299)
    InvalidRule,
    InvalidRoleName,

    // Configuration Errors (5000-5099)
    ConfigurationError,
    MissingConfiguration,
    InvalidConfiguration,
    SerializationError,

    // Internal Errors (9000-9099)
    InternalError,
}

impl ErrorCode {
    /// Get the numeric code for this error.
    pub const fn numeric_code(&self) -> u32 {
        match self {
            Self::NoMatchingChain => 1000,

            Self::ImmutableChain => 1100,
            Self::ChainNotRemovable => 1101,
            Self::ChainNotFound => 1102,
            Self::DuplicateChainName => 1103,
            Self::ChainNameMandatory => 1104,
            Self::EmptyPatternList => 1105,
            Self::InvalidPattern => 1106,
            Self::EmptyFilterChain => 1107,
            Self::AnonymousNotLast => 1108,
            Self::InvalidChainReference => 1109,
            Self::PositionOutOfRange => 1110,

            Self::InvalidRule => 1200,
            Self::InvalidRoleName => 1201,

            Self::ConfigurationError => 5000,
            Self::MissingConfiguration => 5001,
            Self::InvalidConfiguration => 5002,
            Self::SerializationError => 5003,

            Self::InternalError => 9000,
        }
    }

    /// Get the error category for grouping.
    pub const fn category(&self) -> &'static str {
        match self {
            Self::NoMatchingChain => "routing",

            Self::ImmutableChain
            | Self::ChainNotRemovable
            | Self::ChainNotFound
            | Self::DuplicateChainName
            | Self::ChainNameMandatory
            | Self::EmptyPatternList
            | Self::InvalidPattern
            | Self::EmptyFilterChain
            | Self::AnonymousNotLast
            | Self::InvalidChainReference
            | Self::PositionOutOfRange => "filter_chain",

            Self::InvalidRule | Self::InvalidRoleName => "access_rule",

            Self::ConfigurationError
            | Self::MissingConfiguration
            | Self::InvalidConfiguration
            | Self::SerializationError => "configuration",

            Self::InternalError => "internal",
        }
    }

    /// Whether this code denotes a rejected configuration mutation.
    ///
    /// Such mutations leave the routing table and rule set untouched.
    pub const fn is_configuration_rejection(&self) -> bool {
        !matches!(
            self,
            Self::NoMatchingChain
                | Self::ConfigurationError
                | Self::MissingConfiguration
                | Self::InvalidConfiguration
                | Self::SerializationError
                | Self::InternalError
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Error Severity
// ═══════════════════════════════════════════════════════════════════════════════

/// Severity level for errors (affects logging).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    /// Operator input errors (bad chain definitions, bad rules)
    Low,
    /// Operational issues (unroutable requests)
    Medium,
    /// Broken configuration sources
    High,
    /// Critical errors requiring immediate attention
    Critical,
}

impl ErrorSeverity {
    /// Get severity based on error code.
    pub const fn from_code(code: &ErrorCode) -> Self {
        match code {
            ErrorCode::ImmutableChain
            | ErrorCode::ChainNotRemovable
            | ErrorCode::ChainNotFound
            | ErrorCode::DuplicateChainName
            | ErrorCode::ChainNameMandatory
            | ErrorCode::EmptyPatternList
            | ErrorCode::InvalidPattern
            | ErrorCode::EmptyFilterChain
            | ErrorCode::AnonymousNotLast
            | ErrorCode::InvalidChainReference
            | ErrorCode::PositionOutOfRange
            | ErrorCode::InvalidRule
            | ErrorCode::InvalidRoleName => Self::Low,

            // A routing miss means the catch-all chain is missing.
            ErrorCode::NoMatchingChain => Self::Medium,

            ErrorCode::ConfigurationError
            | ErrorCode::MissingConfiguration
            | ErrorCode::InvalidConfiguration
            | ErrorCode::SerializationError => Self::High,

            ErrorCode::InternalError => Self::Critical,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Error Details
// ═══════════════════════════════════════════════════════════════════════════════

/// Additional structured details about an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Additional context key-value pairs
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,

    /// Related entity ID (chain name, rule key, etc.)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,

    /// Related entity type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,

    /// Suggested action for resolution
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
}

impl ErrorDetails {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entity(mut self, entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self.entity_id = Some(entity_id.into());
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggested_action = Some(suggestion.into());
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Main Error Type
// ═══════════════════════════════════════════════════════════════════════════════

/// The main error type for geoguard.
#[derive(Error, Debug)]
pub struct GuardError {
    /// Machine-readable error code
    code: ErrorCode,

    /// Caller-facing error message
    user_message: Cow<'static, str>,

    /// Detailed internal message (for logging only)
    internal_message: Option<String>,

    /// Additional structured details
    details: ErrorDetails,

    /// The source error that caused this error
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl fmt::Display for GuardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.user_message)?;
        if let Some(ref internal) = self.internal_message {
            write!(f, " (internal: {})", internal)?;
        }
        Ok(())
    }
}

impl GuardError {
    // ─────────────────────────────────────────────────────────────────────────
    // Constructors
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a new error with code and user message.
    pub fn new(code: ErrorCode, user_message: impl Into<Cow<'static, str>>) -> Self {
        let error = Self {
            code,
            user_message: user_message.into(),
            internal_message: None,
            details: ErrorDetails::default(),
            source: None,
        };
        error.record_metrics();
        error
    }

    /// Create an error with both user and internal messages.
    pub fn with_internal(
        code: ErrorCode,
        user_message: impl Into<Cow<'static, str>>,
        internal_message: impl Into<String>,
    ) -> Self {
        let mut error = Self::new(code, user_message);
        error.internal_message = Some(internal_message.into());
        error
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_internal(
            ErrorCode::InternalError,
            "An internal error occurred",
            message,
        )
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Builder Methods
    // ─────────────────────────────────────────────────────────────────────────

    /// Add a source error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Add error details.
    pub fn with_details(mut self, details: ErrorDetails) -> Self {
        self.details = details;
        self
    }

    /// Add context to details.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.details.context.insert(key.into(), v);
        }
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Get the caller-facing message.
    pub fn user_message(&self) -> &str {
        &self.user_message
    }

    /// Get the internal message (if any).
    pub fn internal_message(&self) -> Option<&str> {
        self.internal_message.as_deref()
    }

    /// Get the error details.
    pub fn details(&self) -> &ErrorDetails {
        &self.details
    }

    /// Get the error severity.
    pub fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::from_code(&self.code)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Logging
    // ─────────────────────────────────────────────────────────────────────────

    /// Log this error with appropriate severity.
    pub fn log(&self) {
        let code = self.code.to_string();
        let category = self.code.category();

        match self.severity() {
            ErrorSeverity::Critical => {
                error!(
                    error_code = %code,
                    category = category,
                    user_message = %self.user_message,
                    internal_message = ?self.internal_message,
                    details = ?self.details,
                    source = ?self.source,
                    "CRITICAL ERROR"
                );
            }
            ErrorSeverity::High => {
                error!(
                    error_code = %code,
                    category = category,
                    user_message = %self.user_message,
                    internal_message = ?self.internal_message,
                    "High severity error"
                );
            }
            ErrorSeverity::Medium => {
                warn!(
                    error_code = %code,
                    category = category,
                    user_message = %self.user_message,
                    "Medium severity error"
                );
            }
            ErrorSeverity::Low => {
                tracing::debug!(
                    error_code = %code,
                    category = category,
                    user_message = %self.user_message,
                    "Low severity error"
                );
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Metrics
    // ─────────────────────────────────────────────────────────────────────────

    fn record_metrics(&self) {
        counter!(
            ERRORS_TOTAL,
            "code" => self.code.to_string(),
            "category" => self.code.category().to_string(),
            "severity" => format!("{:?}", self.severity()),
        )
        .increment(1);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// From Implementations for Common Error Types
// ═══════════════════════════════════════════════════════════════════════════════

impl From<serde_json::Error> for GuardError {
    fn from(error: serde_json::Error) -> Self {
        Self::with_internal(
            ErrorCode::SerializationError,
            "Failed to process JSON data",
            error.to_string(),
        )
        .with_source(error)
    }
}

impl From<toml::de::Error> for GuardError {
    fn from(error: toml::de::Error) -> Self {
        Self::with_internal(
            ErrorCode::InvalidConfiguration,
            "Security configuration is not valid TOML",
            error.to_string(),
        )
        .with_source(error)
    }
}

impl From<regex::Error> for GuardError {
    fn from(error: regex::Error) -> Self {
        Self::with_internal(
            ErrorCode::InvalidPattern,
            "Path pattern could not be compiled",
            error.to_string(),
        )
        .with_source(error)
    }
}

impl From<config::ConfigError> for GuardError {
    fn from(error: config::ConfigError) -> Self {
        let (code, user_msg) = match &error {
            config::ConfigError::NotFound(_) => (
                ErrorCode::MissingConfiguration,
                "Required configuration not found",
            ),
            config::ConfigError::FileParse { .. } => (
                ErrorCode::InvalidConfiguration,
                "Configuration file is invalid",
            ),
            _ => (
                ErrorCode::ConfigurationError,
                "Configuration error occurred",
            ),
        };

        Self::with_internal(code, user_msg, error.to_string())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Convenience Constructors for Domain Errors
// ═══════════════════════════════════════════════════════════════════════════════

impl GuardError {
    // ─────────────────────────────────────────────────────────────────────────
    // Routing Errors
    // ─────────────────────────────────────────────────────────────────────────

    /// No chain in the table matches the request path.
    pub fn no_matching_chain(path: impl Into<String>) -> Self {
        let path = path.into();
        Self::new(
            ErrorCode::NoMatchingChain,
            format!("No filter chain matches request path {}", path),
        )
        .with_details(
            ErrorDetails::new()
                .with_entity("path", &path)
                .with_suggestion("Add a catch-all chain with pattern /** at the end of the table"),
        )
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Filter Chain Errors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn immutable_chain(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(
            ErrorCode::ImmutableChain,
            format!("Filter chain {} is constant and cannot be modified", name),
        )
        .with_details(ErrorDetails::new().with_entity("filter_chain", &name))
    }

    pub fn chain_not_removable(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(
            ErrorCode::ChainNotRemovable,
            format!("Filter chain {} cannot be removed", name),
        )
        .with_details(ErrorDetails::new().with_entity("filter_chain", &name))
    }

    pub fn chain_not_found(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(
            ErrorCode::ChainNotFound,
            format!("Filter chain not found: {}", name),
        )
        .with_details(ErrorDetails::new().with_entity("filter_chain", &name))
    }

    pub fn duplicate_chain_name(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(
            ErrorCode::DuplicateChainName,
            format!("Filter chain name {} is not unique", name),
        )
        .with_details(ErrorDetails::new().with_entity("filter_chain", &name))
    }

    pub fn chain_name_mandatory() -> Self {
        Self::new(ErrorCode::ChainNameMandatory, "Filter chain name is mandatory")
    }

    pub fn empty_pattern_list(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(
            ErrorCode::EmptyPatternList,
            format!("Filter chain {} has no path patterns", name),
        )
        .with_details(ErrorDetails::new().with_entity("filter_chain", &name))
    }

    pub fn invalid_pattern(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        let pattern = pattern.into();
        Self::with_internal(
            ErrorCode::InvalidPattern,
            format!("Invalid path pattern: {}", pattern),
            reason,
        )
        .with_context("pattern", &pattern)
    }

    pub fn empty_filter_chain(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(
            ErrorCode::EmptyFilterChain,
            format!("Filter chain {} is enabled but has no filters", name),
        )
        .with_details(ErrorDetails::new().with_entity("filter_chain", &name))
    }

    pub fn anonymous_not_last(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(
            ErrorCode::AnonymousNotLast,
            format!("The anonymous filter must be the last filter of chain {}", name),
        )
        .with_details(ErrorDetails::new().with_entity("filter_chain", &name))
    }

    pub fn invalid_chain_reference(chain: impl Into<String>, attribute: &'static str) -> Self {
        let chain = chain.into();
        Self::new(
            ErrorCode::InvalidChainReference,
            format!("Filter chain {} has an empty {}", chain, attribute),
        )
        .with_details(ErrorDetails::new().with_entity("filter_chain", &chain))
        .with_context("attribute", attribute)
    }

    pub fn position_out_of_range(position: usize, len: usize) -> Self {
        Self::new(
            ErrorCode::PositionOutOfRange,
            format!("Position {} is out of range for a table of {} chains", position, len),
        )
        .with_context("position", position)
        .with_context("len", len)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Access Rule Errors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn invalid_rule(rule: impl Into<String>, reason: impl Into<String>) -> Self {
        let rule = rule.into();
        Self::with_internal(
            ErrorCode::InvalidRule,
            format!("Invalid data access rule: {}", rule),
            reason,
        )
        .with_details(ErrorDetails::new().with_entity("rule", &rule))
    }

    pub fn invalid_role_name(role: impl Into<String>) -> Self {
        let role = role.into();
        Self::new(
            ErrorCode::InvalidRoleName,
            format!("Invalid role name: '{}'", role),
        )
        .with_details(
            ErrorDetails::new()
                .with_entity("role", &role)
                .with_suggestion("Role names must be non-empty and contain no whitespace or commas"),
        )
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigurationError, message.into())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
