//! Configuration management.
//!
//! Settings come from an optional file layered under `GEOGUARD__*`
//! environment variables, e.g. `GEOGUARD__SECURITY__CATALOG_MODE=CHALLENGE`.
//! Missing sections fall back to the built-in chain table and rules.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::access::CatalogMode;
use crate::chain::{default_chains, HttpMethod, RequestFilterChain};
use crate::chain::validation::validate_table;
use crate::error::{GuardError, Result};
use crate::rules::{AccessRules, DataAccessRule, RoleId, ADMIN_ROLE};
use crate::telemetry::LoggingConfig;

/// Main application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Deployment environment name, reported in logs
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Access rules and filter chains
    #[serde(default)]
    pub security: SecurityConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Overrides the mode given by the rule set
    #[serde(default)]
    pub catalog_mode: Option<CatalogMode>,

    /// Role that passes every rule
    #[serde(default = "default_admin_role")]
    pub admin_role: String,

    /// Routing table, in evaluation order. Empty means the built-in table.
    #[serde(default)]
    pub filter_chains: Vec<FilterChainConfig>,

    /// Inline data access rules
    #[serde(default)]
    pub rules: Vec<DataAccessRule>,

    /// `layers.properties` style rule file, used instead of inline rules
    #[serde(default)]
    pub rules_file: Option<PathBuf>,
}

/// One routing table entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterChainConfig {
    pub name: String,

    /// Built-in chain that cannot be edited or removed
    #[serde(default)]
    pub constant: bool,

    /// Ignored for constant chains
    #[serde(default = "default_true")]
    pub removable: bool,

    pub patterns: Vec<String>,

    #[serde(default)]
    pub filters: Vec<String>,

    #[serde(default)]
    pub disabled: bool,

    #[serde(default)]
    pub allow_session_creation: bool,

    #[serde(default)]
    pub require_ssl: bool,

    /// Restrict the chain to these methods. Empty means any method.
    #[serde(default)]
    pub http_methods: Vec<HttpMethod>,

    #[serde(default)]
    pub role_filter: Option<String>,

    #[serde(default)]
    pub interceptor: Option<String>,

    #[serde(default)]
    pub exception_translation: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            security: SecurityConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            catalog_mode: None,
            admin_role: default_admin_role(),
            filter_chains: Vec::new(),
            rules: Vec::new(),
            rules_file: None,
        }
    }
}

// Default value functions
fn default_environment() -> String { "development".to_string() }
fn default_admin_role() -> String { ADMIN_ROLE.to_string() }
fn default_true() -> bool { true }

impl FilterChainConfig {
    pub fn into_chain(self) -> Result<RequestFilterChain> {
        let mut chain = if self.constant {
            RequestFilterChain::constant(self.name, &self.patterns, self.filters)?
        } else {
            RequestFilterChain::variable(self.name, &self.patterns, self.filters)?
                .removable(self.removable)
        };

        chain = chain
            .disabled(self.disabled)
            .allow_session_creation(self.allow_session_creation)
            .require_ssl(self.require_ssl)
            .http_methods(self.http_methods);

        if let Some(role_filter) = self.role_filter {
            chain = chain.role_filter(role_filter);
        }
        if let Some(interceptor) = self.interceptor {
            chain = chain.interceptor(interceptor);
        }
        if let Some(exception_translation) = self.exception_translation {
            chain = chain.exception_translation(exception_translation);
        }
        Ok(chain)
    }

    pub fn from_chain(chain: &RequestFilterChain) -> Self {
        Self {
            name: chain.name().to_string(),
            constant: chain.is_constant(),
            removable: chain.can_be_removed(),
            patterns: chain.patterns().iter().map(|p| p.as_str().to_string()).collect(),
            filters: chain.filter_names().to_vec(),
            disabled: chain.is_disabled(),
            allow_session_creation: chain.is_allow_session_creation(),
            require_ssl: chain.is_require_ssl(),
            http_methods: chain.http_method_set().iter().copied().collect(),
            role_filter: chain.role_filter_name().map(str::to_string),
            interceptor: chain.interceptor_name().map(str::to_string),
            exception_translation: chain.exception_translation_name().map(str::to_string),
        }
    }
}

impl SecurityConfig {
    /// Parse a security section from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// The configured routing table, or the built-in one.
    pub fn filter_chains(&self) -> Result<Vec<RequestFilterChain>> {
        if self.filter_chains.is_empty() {
            return default_chains();
        }
        self.filter_chains
            .iter()
            .cloned()
            .map(FilterChainConfig::into_chain)
            .collect()
    }

    /// The configured rule set, or the built-in one.
    pub fn access_rules(&self) -> Result<AccessRules> {
        let mut rules = if let Some(path) = &self.rules_file {
            let text = std::fs::read_to_string(path).map_err(|e| {
                GuardError::configuration(format!(
                    "Cannot read rules file {}",
                    path.display()
                ))
                .with_source(e)
            })?;
            AccessRules::parse_text(&text)?
        } else if self.rules.is_empty() {
            AccessRules::default()
        } else {
            // Round-trip through the text form so inline rules get the same checks.
            let rules = self
                .rules
                .iter()
                .map(|r| DataAccessRule::parse(&r.key(), &r.roles_value()))
                .collect::<Result<Vec<_>>>()?;
            AccessRules {
                mode: CatalogMode::Hide,
                rules,
            }
        };

        if let Some(mode) = self.catalog_mode {
            rules.mode = mode;
        }
        Ok(rules)
    }

    pub fn admin_role(&self) -> Result<RoleId> {
        self.admin_role.parse()
    }

    /// Check the whole section without building anything long-lived.
    pub fn validate(&self) -> Result<()> {
        validate_table(&self.filter_chains()?)?;
        self.access_rules()?;
        self.admin_role()?;
        Ok(())
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("GEOGUARD").separator("__"))
            .build()?;

        let cfg: Config = config.try_deserialize()?;
        Ok(cfg)
    }

    /// Load from a specific file path, with environment overrides.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("GEOGUARD").separator("__"))
            .build()?;

        let cfg: Config = config.try_deserialize()?;
        Ok(cfg)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use std::io::Write;

    const SECURITY_TOML: &str = r#"
catalog_mode = "MIXED"

[[filter_chains]]
name = "login"
constant = true
patterns = ["/login"]
filters = ["form"]

[[filter_chains]]
name = "rest"
removable = false
patterns = ["/rest/**"]
filters = ["basic", "anonymous"]
http_methods = ["GET", "POST"]

[[filter_chains]]
name = "default"
patterns = ["/**"]
filters = ["basic"]

[[rules]]
workspace = "topp"
layer = "*"
mode = "write"
roles = ["ROLE_EDITOR"]
"#;

    #[test]
    fn test_defaults_when_empty() {
        let security = SecurityConfig::default();
        assert_eq!(security.filter_chains().unwrap().len(), 6);
        assert_eq!(security.access_rules().unwrap(), AccessRules::default());
        assert_eq!(security.admin_role().unwrap(), RoleId::from(ADMIN_ROLE));
        assert!(security.validate().is_ok());
    }

    #[test]
    fn test_parse_security_toml() {
        let security = SecurityConfig::from_toml_str(SECURITY_TOML).unwrap();
        assert_eq!(security.admin_role, ADMIN_ROLE);

        let chains = security.filter_chains().unwrap();
        assert_eq!(chains.len(), 3);
        assert!(chains[0].is_constant());
        assert!(!chains[1].can_be_removed());
        assert!(chains[1].is_match_http_method());
        assert!(chains[2].can_be_removed());

        let rules = security.access_rules().unwrap();
        assert_eq!(rules.mode, CatalogMode::Mixed);
        assert_eq!(rules.rules[0].key(), "topp.*.w");
        assert!(security.validate().is_ok());
    }

    #[test]
    fn test_invalid_sections() {
        let bad_rule = r#"
[[rules]]
workspace = "*"
layer = "roads"
mode = "read"
roles = ["*"]
"#;
        let err = SecurityConfig::from_toml_str(bad_rule)
            .unwrap()
            .access_rules()
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidRule);

        let bad_chain = r#"
[[filter_chains]]
name = "web"
patterns = ["/web/**"]
filters = ["anonymous", "form"]
"#;
        let err = SecurityConfig::from_toml_str(bad_chain).unwrap().validate().unwrap_err();
        assert_eq!(err.code(), ErrorCode::AnonymousNotLast);

        let err = SecurityConfig::from_toml_str("catalog_mode = 3").unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidConfiguration);
    }

    #[test]
    fn test_chain_config_round_trip() {
        for chain in default_chains().unwrap() {
            let rebuilt = FilterChainConfig::from_chain(&chain).into_chain().unwrap();
            assert_eq!(rebuilt, chain);
        }
    }

    #[test]
    fn test_rules_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "mode=CHALLENGE\n*.*.r=*\ntopp.secret.r=ROLE_SECRET").unwrap();

        let security = SecurityConfig {
            rules_file: Some(file.path().to_path_buf()),
            ..SecurityConfig::default()
        };
        let rules = security.access_rules().unwrap();
        assert_eq!(rules.mode, CatalogMode::Challenge);
        assert_eq!(rules.len(), 2);

        let missing = SecurityConfig {
            rules_file: Some(PathBuf::from("/nonexistent/layers.properties")),
            ..SecurityConfig::default()
        };
        assert_eq!(
            missing.access_rules().unwrap_err().code(),
            ErrorCode::ConfigurationError
        );
    }
}
