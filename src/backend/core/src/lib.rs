#![allow(clippy::result_large_err)]
//! # GeoGuard Core
//!
//! Authorization decisions and security filter chain routing for a
//! geospatial catalog.
//!
//! ## Architecture
//!
//! - **Access**: Access levels, catalog modes and the per-object wrapper policy
//! - **Rules**: Layer rule sets compiled into a secure tree of role grants
//! - **Catalog**: Lightweight catalog references and composable visibility filters
//! - **Chain**: Ordered request filter chains with copy-on-write routing
//! - **Admin**: Thread-scoped marker for administrative requests
//! - **Listener**: Notification of committed security configuration changes
//! - **Manager**: Facade tying routing, rules, filters and listeners together
//! - **Telemetry**: Structured logging and decision counters

pub mod access;
pub mod admin;
pub mod catalog;
pub mod chain;
pub mod config;
pub mod error;
pub mod listener;
pub mod manager;
pub mod rules;
pub mod telemetry;

pub use error::{ErrorCode, ErrorDetails, ErrorSeverity, GuardError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::access::{
        AccessContext, AccessLevel, AccessLimits, CatalogMode, DataFilter, Decision, Response,
        Restriction, WrapperPolicy,
    };
    pub use crate::admin::{AdminRequest, AdminRequestGuard};
    pub use crate::catalog::{
        CatalogFilter, CatalogFilters, CatalogTarget, LayerGroupRef, LayerRef, PredicateFilter,
        ResourceKind, ResourceRef, StyleRef, WorkspaceRef, WorkspaceScopeFilter,
    };
    pub use crate::chain::{
        ChainKind, FilterChainRouter, HttpMethod, PathPattern, RequestFilterChain, RequestTarget,
        ResolvedChain,
    };
    pub use crate::config::{Config, FilterChainConfig, SecurityConfig};
    pub use crate::error::{ErrorCode, ErrorDetails, ErrorSeverity, GuardError, Result};
    pub use crate::listener::{
        ListenerId, NotificationReport, SecurityChange, SecurityManagerListener,
    };
    pub use crate::manager::SecurityManager;
    pub use crate::rules::{
        AccessMode, AccessRules, DataAccessRule, Principal, RoleId, RuleAccessManager, UserId,
    };
}
