//! Capability levels, catalog modes and the denial decision.
//!
//! The decision is a pure function of four inputs:
//!
//! | granted vs requested | mode      | direct access | outcome          |
//! |----------------------|-----------|---------------|------------------|
//! | granted >= requested | any       | any           | Permit           |
//! | granted <  requested | HIDE      | any           | Deny(HIDE)       |
//! | granted <  requested | CHALLENGE | any           | Deny(CHALLENGE)  |
//! | granted <  requested | MIXED     | false         | Deny(HIDE)       |
//! | granted <  requested | MIXED     | true          | Deny(CHALLENGE)  |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::error::{GuardError, Result};
use crate::telemetry::metrics::record_decision;

// ═══════════════════════════════════════════════════════════════════════════════
// AccessLevel
// ═══════════════════════════════════════════════════════════════════════════════

/// Capability granted on a catalog resource.
///
/// Variants are declared in ascending order so the derived `Ord` is the
/// capability order: `Hidden < Metadata < ReadOnly < ReadWrite`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessLevel {
    /// The resource does not exist as far as the caller can tell.
    Hidden,
    /// Descriptive metadata only (capabilities documents, listings). No data access.
    Metadata,
    /// Data can be read but not modified.
    ReadOnly,
    /// Full access.
    ReadWrite,
}

impl AccessLevel {
    pub const ALL: [AccessLevel; 4] = [
        Self::Hidden,
        Self::Metadata,
        Self::ReadOnly,
        Self::ReadWrite,
    ];

    /// Whether this grant satisfies a requested level.
    pub fn permits(self, requested: AccessLevel) -> bool {
        self >= requested
    }

    /// Whether the grant allows reading actual data, not only metadata.
    pub fn allows_data_access(self) -> bool {
        self >= Self::ReadOnly
    }

    /// Most permissive of a set of grants, `Hidden` for an empty set.
    pub fn most_permissive<I: IntoIterator<Item = AccessLevel>>(levels: I) -> AccessLevel {
        levels.into_iter().max().unwrap_or(Self::Hidden)
    }

    /// Least permissive of a set of grants, `ReadWrite` for an empty set.
    pub fn most_restrictive<I: IntoIterator<Item = AccessLevel>>(levels: I) -> AccessLevel {
        levels.into_iter().min().unwrap_or(Self::ReadWrite)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hidden => "HIDDEN",
            Self::Metadata => "METADATA",
            Self::ReadOnly => "READ_ONLY",
            Self::ReadWrite => "READ_WRITE",
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessLevel {
    type Err = GuardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "HIDDEN" => Ok(Self::Hidden),
            "METADATA" => Ok(Self::Metadata),
            "READ_ONLY" => Ok(Self::ReadOnly),
            "READ_WRITE" => Ok(Self::ReadWrite),
            other => Err(GuardError::configuration(format!(
                "Unknown access level: {}",
                other
            ))),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CatalogMode
// ═══════════════════════════════════════════════════════════════════════════════

/// How unauthorized access to a catalog resource is disclosed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CatalogMode {
    /// Unauthorized resources are omitted from listings and reported as not found.
    #[default]
    Hide,
    /// Hidden from listings, but direct access challenges for credentials.
    Mixed,
    /// Every unauthorized access challenges for credentials.
    Challenge,
}

impl CatalogMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hide => "HIDE",
            Self::Mixed => "MIXED",
            Self::Challenge => "CHALLENGE",
        }
    }
}

impl fmt::Display for CatalogMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CatalogMode {
    type Err = GuardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HIDE" => Ok(Self::Hide),
            "MIXED" => Ok(Self::Mixed),
            "CHALLENGE" => Ok(Self::Challenge),
            other => Err(GuardError::configuration(format!(
                "Unknown catalog mode: {}",
                other
            ))),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Response
// ═══════════════════════════════════════════════════════════════════════════════

/// The action taken when access is denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Response {
    /// Silently omit the resource, or answer not found.
    Hide,
    /// Ask the caller to (re-)authenticate.
    Challenge,
}

impl Response {
    /// Response for a catalog mode in enumeration or direct-access context.
    pub fn for_mode(mode: CatalogMode, direct_access: bool) -> Response {
        match mode {
            CatalogMode::Hide => Self::Hide,
            CatalogMode::Challenge => Self::Challenge,
            CatalogMode::Mixed if direct_access => Self::Challenge,
            CatalogMode::Mixed => Self::Hide,
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hide => f.write_str("HIDE"),
            Self::Challenge => f.write_str("CHALLENGE"),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Decision
// ═══════════════════════════════════════════════════════════════════════════════

/// Outcome of an access decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "response", rename_all = "snake_case")]
pub enum Decision {
    Permit,
    Deny(Response),
}

impl Decision {
    pub fn is_permitted(&self) -> bool {
        matches!(self, Self::Permit)
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, Self::Deny(_))
    }

    /// The denial response, `None` when permitted.
    pub fn response(&self) -> Option<Response> {
        match self {
            Self::Permit => None,
            Self::Deny(response) => Some(*response),
        }
    }

    pub(crate) fn outcome_label(&self) -> &'static str {
        match self {
            Self::Permit => "permit",
            Self::Deny(Response::Hide) => "deny_hide",
            Self::Deny(Response::Challenge) => "deny_challenge",
        }
    }
}

/// Decide whether a granted level satisfies a requested one.
///
/// `direct_access` is true when the caller asked for the resource by name or
/// id, false when it is being enumerated as part of a listing.
pub fn decide(
    requested: AccessLevel,
    granted: AccessLevel,
    mode: CatalogMode,
    direct_access: bool,
) -> Decision {
    let decision = if granted.permits(requested) {
        Decision::Permit
    } else {
        Decision::Deny(Response::for_mode(mode, direct_access))
    };

    debug!(
        requested = %requested,
        granted = %granted,
        mode = %mode,
        direct_access,
        outcome = decision.outcome_label(),
        "Access decision"
    );
    record_decision(&decision);

    decision
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
