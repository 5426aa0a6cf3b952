//! Request filter chains: named filter sequences bound to path patterns.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use super::pattern::PathPattern;
use crate::error::{GuardError, Result};

pub const ANONYMOUS_FILTER: &str = "anonymous";
pub const DEFAULT_INTERCEPTOR: &str = "interceptor";
pub const DEFAULT_EXCEPTION_TRANSLATION: &str = "exception";

// ═══════════════════════════════════════════════════════════════════════════════
// HttpMethod
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Head,
    Options,
    Patch,
    Trace,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::Patch => "PATCH",
            Self::Trace => "TRACE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = GuardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            "HEAD" => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            "PATCH" => Ok(Self::Patch),
            "TRACE" => Ok(Self::Trace),
            other => Err(GuardError::configuration(format!(
                "Unknown HTTP method: {}",
                other
            ))),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RequestTarget
// ═══════════════════════════════════════════════════════════════════════════════

/// The parts of an inbound request that routing looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTarget<'a> {
    pub path: &'a str,
    pub method: Option<HttpMethod>,
}

impl<'a> RequestTarget<'a> {
    /// Target for `path`. Any query string is ignored.
    pub fn new(path: &'a str) -> Self {
        let path = path.split_once('?').map_or(path, |(p, _)| p);
        Self { path, method: None }
    }

    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = Some(method);
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RequestFilterChain
// ═══════════════════════════════════════════════════════════════════════════════

/// Whether a chain is built in or operator defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChainKind {
    /// System defined. Can neither be edited nor removed.
    Constant,
    Variable { removable: bool },
}

/// An ordered list of security filter names bound to a set of path patterns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestFilterChain {
    name: String,
    kind: ChainKind,
    patterns: Vec<PathPattern>,
    filter_names: Vec<String>,
    disabled: bool,
    allow_session_creation: bool,
    require_ssl: bool,
    match_http_method: bool,
    http_methods: BTreeSet<HttpMethod>,
    role_filter_name: Option<String>,
    interceptor_name: Option<String>,
    exception_translation_name: Option<String>,
}

impl RequestFilterChain {
    /// Operator-defined chain, removable by default.
    pub fn variable<P, F>(name: impl Into<String>, patterns: P, filters: F) -> Result<Self>
    where
        P: IntoIterator,
        P::Item: AsRef<str>,
        F: IntoIterator,
        F::Item: Into<String>,
    {
        Self::build(name.into(), ChainKind::Variable { removable: true }, patterns, filters)
    }

    /// Built-in chain.
    pub fn constant<P, F>(name: impl Into<String>, patterns: P, filters: F) -> Result<Self>
    where
        P: IntoIterator,
        P::Item: AsRef<str>,
        F: IntoIterator,
        F::Item: Into<String>,
    {
        Self::build(name.into(), ChainKind::Constant, patterns, filters)
    }

    fn build<P, F>(name: String, kind: ChainKind, patterns: P, filters: F) -> Result<Self>
    where
        P: IntoIterator,
        P::Item: AsRef<str>,
        F: IntoIterator,
        F::Item: Into<String>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| PathPattern::new(p.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        let variable = matches!(kind, ChainKind::Variable { .. });
        Ok(Self {
            name,
            kind,
            patterns,
            filter_names: filters.into_iter().map(Into::into).collect(),
            disabled: false,
            allow_session_creation: false,
            require_ssl: false,
            match_http_method: false,
            http_methods: BTreeSet::new(),
            role_filter_name: None,
            interceptor_name: variable.then(|| DEFAULT_INTERCEPTOR.to_string()),
            exception_translation_name: variable.then(|| DEFAULT_EXCEPTION_TRANSLATION.to_string()),
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Builders
    // ─────────────────────────────────────────────────────────────────────────

    /// Set whether a variable chain may be removed. No effect on constant chains.
    pub fn removable(mut self, removable: bool) -> Self {
        if let ChainKind::Variable { removable: r } = &mut self.kind {
            *r = removable;
        }
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn allow_session_creation(mut self, allow: bool) -> Self {
        self.allow_session_creation = allow;
        self
    }

    pub fn require_ssl(mut self, require: bool) -> Self {
        self.require_ssl = require;
        self
    }

    /// Restrict the chain to the given methods. An empty set lifts the restriction.
    pub fn http_methods(mut self, methods: impl IntoIterator<Item = HttpMethod>) -> Self {
        self.http_methods = methods.into_iter().collect();
        self.match_http_method = !self.http_methods.is_empty();
        self
    }

    pub fn role_filter(mut self, name: impl Into<String>) -> Self {
        self.role_filter_name = Some(name.into());
        self
    }

    pub fn interceptor(mut self, name: impl Into<String>) -> Self {
        self.interceptor_name = Some(name.into());
        self
    }

    pub fn exception_translation(mut self, name: impl Into<String>) -> Self {
        self.exception_translation_name = Some(name.into());
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ChainKind {
        self.kind
    }

    pub fn is_constant(&self) -> bool {
        matches!(self.kind, ChainKind::Constant)
    }

    pub fn can_be_removed(&self) -> bool {
        matches!(self.kind, ChainKind::Variable { removable: true })
    }

    pub fn patterns(&self) -> &[PathPattern] {
        &self.patterns
    }

    pub fn filter_names(&self) -> &[String] {
        &self.filter_names
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn is_allow_session_creation(&self) -> bool {
        self.allow_session_creation
    }

    pub fn is_require_ssl(&self) -> bool {
        self.require_ssl
    }

    pub fn is_match_http_method(&self) -> bool {
        self.match_http_method
    }

    pub fn http_method_set(&self) -> &BTreeSet<HttpMethod> {
        &self.http_methods
    }

    pub fn role_filter_name(&self) -> Option<&str> {
        self.role_filter_name.as_deref()
    }

    pub fn interceptor_name(&self) -> Option<&str> {
        self.interceptor_name.as_deref()
    }

    pub fn exception_translation_name(&self) -> Option<&str> {
        self.exception_translation_name.as_deref()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Matching
    // ─────────────────────────────────────────────────────────────────────────

    /// Whether this chain applies to the request.
    ///
    /// A method-restricted chain never matches a request of unknown method.
    pub fn matches(&self, target: &RequestTarget<'_>) -> bool {
        if self.match_http_method {
            match target.method {
                Some(method) if self.http_methods.contains(&method) => {}
                _ => return false,
            }
        }
        self.patterns.iter().any(|p| p.matches(target.path))
    }

    /// Filters to run for a matched request. Disabled chains run none.
    pub fn effective_filters(&self) -> Vec<String> {
        if self.disabled {
            Vec::new()
        } else {
            self.filter_names.clone()
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Defaults
// ═══════════════════════════════════════════════════════════════════════════════

/// The built-in routing table, most specific chains first, catch-all last.
pub fn default_chains() -> Result<Vec<RequestFilterChain>> {
    Ok(vec![
        RequestFilterChain::constant(
            "webLogin",
            ["/j_spring_security_check", "/j_spring_security_check/"],
            ["form"],
        )?,
        RequestFilterChain::constant(
            "webLogout",
            ["/j_spring_security_logout", "/j_spring_security_logout/"],
            ["formLogout"],
        )?,
        RequestFilterChain::variable(
            "web",
            ["/web/**", "/gwc/rest/web/**", "/"],
            ["rememberme", "form", ANONYMOUS_FILTER],
        )?
        .removable(false)
        .allow_session_creation(true),
        RequestFilterChain::variable("rest", ["/rest/**"], ["basic", ANONYMOUS_FILTER])?
            .removable(false),
        RequestFilterChain::variable("gwc", ["/gwc/rest/**"], ["basic"])?.removable(false),
        RequestFilterChain::variable("default", ["/**"], ["basic", ANONYMOUS_FILTER])?
            .removable(false),
    ])
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_flags() {
        let chain = RequestFilterChain::constant("login", ["/login"], ["form"]).unwrap();
        assert!(chain.is_constant());
        assert!(!chain.can_be_removed());
        assert!(!chain.clone().removable(true).can_be_removed());
        assert!(chain.interceptor_name().is_none());
    }

    #[test]
    fn test_variable_flags() {
        let chain = RequestFilterChain::variable("rest", ["/rest/**"], ["basic"]).unwrap();
        assert!(!chain.is_constant());
        assert!(chain.can_be_removed());
        assert!(!chain.clone().removable(false).can_be_removed());
        assert_eq!(chain.interceptor_name(), Some(DEFAULT_INTERCEPTOR));
        assert_eq!(chain.exception_translation_name(), Some(DEFAULT_EXCEPTION_TRANSLATION));
    }

    #[test]
    fn test_bad_pattern_fails_construction() {
        assert!(RequestFilterChain::variable("x", ["rest"], ["basic"]).is_err());
    }

    #[test]
    fn test_method_restriction() {
        let chain = RequestFilterChain::variable("writes", ["/rest/**"], ["basic"])
            .unwrap()
            .http_methods([HttpMethod::Post, HttpMethod::Put]);

        assert!(chain.is_match_http_method());
        assert!(chain.matches(&RequestTarget::new("/rest/x").with_method(HttpMethod::Post)));
        assert!(!chain.matches(&RequestTarget::new("/rest/x").with_method(HttpMethod::Get)));
        assert!(!chain.matches(&RequestTarget::new("/rest/x")));

        let unrestricted = chain.http_methods([]);
        assert!(unrestricted.matches(&RequestTarget::new("/rest/x")));
    }

    #[test]
    fn test_query_string_ignored() {
        let chain = RequestFilterChain::variable("web", ["/web/*"], ["form"]).unwrap();
        assert!(chain.matches(&RequestTarget::new("/web/home?lang=en")));
    }

    #[test]
    fn test_disabled_chain_yields_no_filters() {
        let chain = RequestFilterChain::variable("open", ["/public/**"], ["basic"])
            .unwrap()
            .disabled(true);
        assert!(chain.matches(&RequestTarget::new("/public/a")));
        assert!(chain.effective_filters().is_empty());
        assert_eq!(chain.filter_names(), ["basic".to_string()]);
    }

    #[test]
    fn test_default_table() {
        let chains = default_chains().unwrap();
        let names: Vec<&str> = chains.iter().map(|c| c.name()).collect();
        assert_eq!(names, ["webLogin", "webLogout", "web", "rest", "gwc", "default"]);
        assert!(chains.iter().all(|c| !c.can_be_removed()));
        assert!(chains[0].is_constant() && chains[1].is_constant());
        assert!(chains[2].is_allow_session_creation());
        assert!(chains.last().unwrap().matches(&RequestTarget::new("/anything/at/all")));
    }

    #[test]
    fn test_method_parse() {
        assert_eq!("get".parse::<HttpMethod>().unwrap(), HttpMethod::Get);
        assert!("FETCH".parse::<HttpMethod>().is_err());
    }
}
