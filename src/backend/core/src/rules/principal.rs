//! Principal identity as seen by rule evaluation.
//!
//! Authentication happens elsewhere; by the time a request reaches access
//! evaluation it carries a user name and a set of granted roles.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{GuardError, Result};

pub const ADMIN_ROLE: &str = "ROLE_ADMINISTRATOR";
pub const ANONYMOUS_ROLE: &str = "ROLE_ANONYMOUS";
pub const ANONYMOUS_USER: &str = "anonymous";

// ═══════════════════════════════════════════════════════════════════════════════
// Identifiers
// ═══════════════════════════════════════════════════════════════════════════════

/// Strongly-typed user identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Strongly-typed role identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RoleId(pub String);

impl RoleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The role granted to every principal, written `*` in rules.
    pub fn any() -> Self {
        Self("*".to_string())
    }

    pub fn is_any(&self) -> bool {
        self.0 == "*"
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RoleId {
    type Err = GuardError;

    fn from_str(s: &str) -> Result<Self> {
        let role = s.trim();
        if role.is_empty() || role.contains(|c: char| c.is_whitespace() || c == ',') {
            return Err(GuardError::invalid_role_name(s));
        }
        Ok(Self(role.to_string()))
    }
}

impl From<&str> for RoleId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Principal
// ═══════════════════════════════════════════════════════════════════════════════

/// An authenticated (or anonymous) caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user: UserId,
    pub roles: BTreeSet<RoleId>,
}

impl Principal {
    pub fn new(user: impl Into<String>, roles: impl IntoIterator<Item = RoleId>) -> Self {
        Self {
            user: UserId::new(user),
            roles: roles.into_iter().collect(),
        }
    }

    /// Caller that did not authenticate.
    pub fn anonymous() -> Self {
        Self::new(ANONYMOUS_USER, [RoleId::from(ANONYMOUS_ROLE)])
    }

    pub fn has_role(&self, role: &RoleId) -> bool {
        self.roles.contains(role)
    }

    pub fn is_anonymous(&self) -> bool {
        self.user.as_str() == ANONYMOUS_USER
    }
}
