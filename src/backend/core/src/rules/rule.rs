//! Data access rules in `workspace.layer.mode=ROLE[,ROLE...]` form.
//!
//! ```text
//! mode=HIDE
//! *.*.r=*
//! *.*.w=ROLE_EDITOR
//! topp.*.r=ROLE_TOPP
//! topp.secret.r=ROLE_SECRET
//! ```
//!
//! `*` in the workspace or layer position is a wildcard; a wildcard workspace
//! requires a wildcard layer. A role of `*` admits everyone. The reserved key
//! `mode` sets the catalog mode.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use super::principal::{RoleId, ADMIN_ROLE};
use crate::access::CatalogMode;
use crate::error::{GuardError, Result};

pub const ANY: &str = "*";
pub const MODE_KEY: &str = "mode";

/// Operation class a rule grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
    Read,
    Write,
    Admin,
}

impl AccessMode {
    pub const ALL: [AccessMode; 3] = [Self::Read, Self::Write, Self::Admin];

    pub fn alias(&self) -> &'static str {
        match self {
            Self::Read => "r",
            Self::Write => "w",
            Self::Admin => "a",
        }
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.alias())
    }
}

impl FromStr for AccessMode {
    type Err = GuardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "r" | "read" => Ok(Self::Read),
            "w" | "write" => Ok(Self::Write),
            "a" | "admin" => Ok(Self::Admin),
            other => Err(GuardError::invalid_rule(
                s,
                format!("unknown access mode '{}'", other),
            )),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DataAccessRule
// ═══════════════════════════════════════════════════════════════════════════════

/// One `workspace.layer.mode=roles` line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataAccessRule {
    pub workspace: String,
    pub layer: String,
    pub mode: AccessMode,
    pub roles: BTreeSet<RoleId>,
}

impl DataAccessRule {
    pub fn new(
        workspace: impl Into<String>,
        layer: impl Into<String>,
        mode: AccessMode,
        roles: impl IntoIterator<Item = RoleId>,
    ) -> Self {
        Self {
            workspace: workspace.into(),
            layer: layer.into(),
            mode,
            roles: roles.into_iter().collect(),
        }
    }

    /// Parse a key such as `topp.roads.r` and a value such as `ROLE_A, ROLE_B`.
    pub fn parse(key: &str, value: &str) -> Result<Self> {
        let parts: Vec<&str> = key.trim().split('.').map(str::trim).collect();
        let [workspace, layer, mode] = parts[..] else {
            return Err(GuardError::invalid_rule(
                key,
                "expected workspace.layer.mode",
            ));
        };

        if workspace.is_empty() || layer.is_empty() {
            return Err(GuardError::invalid_rule(key, "empty workspace or layer name"));
        }
        if workspace == ANY && layer != ANY {
            return Err(GuardError::invalid_rule(
                key,
                "a wildcard workspace requires a wildcard layer",
            ));
        }

        let mode = mode.parse::<AccessMode>().map_err(|_| {
            GuardError::invalid_rule(key, format!("unknown access mode '{}'", mode))
        })?;

        let roles = value
            .split(',')
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(RoleId::from_str)
            .collect::<Result<BTreeSet<_>>>()?;
        if roles.is_empty() {
            return Err(GuardError::invalid_rule(key, "no roles listed"));
        }

        Ok(Self {
            workspace: workspace.to_string(),
            layer: layer.to_string(),
            mode,
            roles,
        })
    }

    pub fn key(&self) -> String {
        format!("{}.{}.{}", self.workspace, self.layer, self.mode)
    }

    pub fn roles_value(&self) -> String {
        self.roles
            .iter()
            .map(RoleId::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Tree path for the rule: empty for `*.*`, one element for `ws.*`.
    pub fn path(&self) -> Vec<&str> {
        let mut path = Vec::with_capacity(2);
        if self.workspace != ANY {
            path.push(self.workspace.as_str());
            if self.layer != ANY {
                path.push(self.layer.as_str());
            }
        }
        path
    }
}

impl fmt::Display for DataAccessRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key(), self.roles_value())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// AccessRules
// ═══════════════════════════════════════════════════════════════════════════════

/// A complete rule set plus the catalog mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRules {
    pub mode: CatalogMode,
    pub rules: Vec<DataAccessRule>,
}

impl Default for AccessRules {
    fn default() -> Self {
        let any = || [RoleId::any()];
        Self {
            mode: CatalogMode::Hide,
            rules: vec![
                DataAccessRule::new(ANY, ANY, AccessMode::Read, any()),
                DataAccessRule::new(ANY, ANY, AccessMode::Write, any()),
                DataAccessRule::new(ANY, ANY, AccessMode::Admin, [RoleId::from(ADMIN_ROLE)]),
            ],
        }
    }
}

impl AccessRules {
    /// Parse a property map. A missing `mode` key means HIDE.
    pub fn from_properties(properties: &BTreeMap<String, String>) -> Result<Self> {
        let mut mode = CatalogMode::Hide;
        let mut rules = Vec::with_capacity(properties.len());

        for (key, value) in properties {
            if key.trim() == MODE_KEY {
                mode = value.parse()?;
            } else {
                rules.push(DataAccessRule::parse(key, value)?);
            }
        }

        Ok(Self { mode, rules })
    }

    /// Parse `key=value` lines. Blank lines and `#` comments are skipped.
    pub fn parse_text(text: &str) -> Result<Self> {
        let mut properties = BTreeMap::new();
        for line in text.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, value) = line
                .split_once('=')
                .ok_or_else(|| GuardError::invalid_rule(line, "expected key=value"))?;
            properties.insert(key.trim().to_string(), value.trim().to_string());
        }
        Self::from_properties(&properties)
    }

    pub fn to_properties(&self) -> BTreeMap<String, String> {
        let mut properties: BTreeMap<String, String> = self
            .rules
            .iter()
            .map(|rule| (rule.key(), rule.roles_value()))
            .collect();
        properties.insert(MODE_KEY.to_string(), self.mode.to_string());
        properties
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_parse_rule() {
        let rule = DataAccessRule::parse("topp.roads.w", "ROLE_A, ROLE_B").unwrap();
        assert_eq!(rule.workspace, "topp");
        assert_eq!(rule.layer, "roads");
        assert_eq!(rule.mode, AccessMode::Write);
        assert_eq!(rule.roles.len(), 2);
        assert_eq!(rule.path(), vec!["topp", "roads"]);
        assert_eq!(rule.to_string(), "topp.roads.w=ROLE_A,ROLE_B");
    }

    #[test]
    fn test_wildcard_paths() {
        assert!(DataAccessRule::parse("*.*.r", "*").unwrap().path().is_empty());
        assert_eq!(DataAccessRule::parse("topp.*.r", "*").unwrap().path(), vec!["topp"]);
    }

    #[test]
    fn test_invalid_rules() {
        for (key, value) in [
            ("topp.r", "*"),
            ("a.b.c.r", "*"),
            ("*.roads.r", "*"),
            ("topp.roads.x", "*"),
            ("topp.roads.r", " , "),
            (".roads.r", "*"),
        ] {
            let err = DataAccessRule::parse(key, value).unwrap_err();
            assert_eq!(err.code(), ErrorCode::InvalidRule, "{}", key);
        }
        let err = DataAccessRule::parse("topp.roads.r", "ROLE A").unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidRoleName);
    }

    #[test]
    fn test_parse_text() {
        let rules = AccessRules::parse_text(
            "# layer security\nmode=CHALLENGE\n*.*.r=*\n\ntopp.*.w=ROLE_EDITOR\n",
        )
        .unwrap();
        assert_eq!(rules.mode, CatalogMode::Challenge);
        assert_eq!(rules.len(), 2);

        assert!(AccessRules::parse_text("garbage").is_err());
        assert!(AccessRules::parse_text("mode=SOMETIMES").is_err());
    }

    #[test]
    fn test_default_rules_round_trip_properties() {
        let rules = AccessRules::default();
        let properties = rules.to_properties();
        assert_eq!(properties.get("*.*.a").map(String::as_str), Some(ADMIN_ROLE));
        assert_eq!(properties.get("mode").map(String::as_str), Some("HIDE"));
        assert_eq!(AccessRules::from_properties(&properties).unwrap().mode, CatalogMode::Hide);
    }
}
