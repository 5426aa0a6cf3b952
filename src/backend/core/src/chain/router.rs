//! Filter chain router.
//!
//! The routing table is an ordered list of chains, evaluated first match wins.
//! Readers take an `Arc` snapshot of the whole table and never hold the lock
//! while matching. Writers build a complete new table, validate it, and swap
//! it in, so a rejected change leaves the published table untouched.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::request::{default_chains, RequestFilterChain, RequestTarget};
use super::validation::{validate_chain, validate_replacement, validate_table};
use crate::error::{GuardError, Result};
use crate::telemetry::metrics::{record_resolution, record_routing_miss};

/// An immutable version of the routing table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainTable {
    version: u64,
    committed_at: DateTime<Utc>,
    chains: Vec<RequestFilterChain>,
}

impl ChainTable {
    fn new(version: u64, chains: Vec<RequestFilterChain>) -> Self {
        Self {
            version,
            committed_at: Utc::now(),
            chains,
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// When this version was published.
    pub fn committed_at(&self) -> DateTime<Utc> {
        self.committed_at
    }

    pub fn chains(&self) -> &[RequestFilterChain] {
        &self.chains
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&RequestFilterChain> {
        self.chains.iter().find(|c| c.name() == name)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.chains.iter().position(|c| c.name() == name)
    }

    /// First chain matching the target, in table order.
    pub fn find(&self, target: &RequestTarget<'_>) -> Option<&RequestFilterChain> {
        self.chains.iter().find(|c| c.matches(target))
    }
}

/// Outcome of routing one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedChain {
    pub chain: String,
    pub filters: Vec<String>,
    pub allow_session_creation: bool,
    pub require_ssl: bool,
    pub role_filter: Option<String>,
    pub interceptor: Option<String>,
    pub exception_translation: Option<String>,
    pub table_version: u64,
}

/// Ordered, pattern-matched routing table with copy-on-write updates.
#[derive(Debug)]
pub struct FilterChainRouter {
    table: RwLock<Arc<ChainTable>>,
    write_lock: Mutex<()>,
}

impl FilterChainRouter {
    /// Router over `chains`, in the given order.
    pub fn new(chains: Vec<RequestFilterChain>) -> Result<Self> {
        validate_table(&chains)?;
        Ok(Self {
            table: RwLock::new(Arc::new(ChainTable::new(0, chains))),
            write_lock: Mutex::new(()),
        })
    }

    /// Router over the built-in table.
    pub fn with_defaults() -> Result<Self> {
        Self::new(default_chains()?)
    }

    /// The current table. Later changes never affect a snapshot already taken.
    pub fn snapshot(&self) -> Arc<ChainTable> {
        self.table.read().clone()
    }

    pub fn chains(&self) -> Vec<RequestFilterChain> {
        self.snapshot().chains.clone()
    }

    pub fn get(&self, name: &str) -> Option<RequestFilterChain> {
        self.snapshot().get(name).cloned()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Resolution
    // ─────────────────────────────────────────────────────────────────────────

    /// Filter names to run for `path`.
    pub fn resolve(&self, path: &str) -> Result<Vec<String>> {
        self.resolve_request(&RequestTarget::new(path))
            .map(|resolved| resolved.filters)
    }

    /// Resolve a request, honouring method restrictions.
    pub fn resolve_request(&self, target: &RequestTarget<'_>) -> Result<ResolvedChain> {
        let table = self.snapshot();

        let Some(chain) = table.find(target) else {
            record_routing_miss();
            debug!(path = target.path, "No filter chain matches request");
            return Err(GuardError::no_matching_chain(target.path));
        };

        record_resolution(chain.name());
        debug!(
            path = target.path,
            method = ?target.method,
            chain = chain.name(),
            disabled = chain.is_disabled(),
            "Resolved filter chain"
        );

        Ok(ResolvedChain {
            chain: chain.name().to_string(),
            filters: chain.effective_filters(),
            allow_session_creation: chain.is_allow_session_creation(),
            require_ssl: chain.is_require_ssl(),
            role_filter: chain.role_filter_name().map(str::to_string),
            interceptor: chain.interceptor_name().map(str::to_string),
            exception_translation: chain.exception_translation_name().map(str::to_string),
            table_version: table.version,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutation
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert `chain` at `position` (`0..=len`).
    pub fn add(&self, chain: RequestFilterChain, position: usize) -> Result<()> {
        let name = chain.name().to_string();
        self.commit("add", &name, |chains| {
            if position > chains.len() {
                return Err(GuardError::position_out_of_range(position, chains.len()));
            }
            if chains.iter().any(|c| c.name() == chain.name()) {
                return Err(GuardError::duplicate_chain_name(chain.name()));
            }
            validate_chain(&chain)?;
            chains.insert(position, chain);
            Ok(())
        })
    }

    /// Replace the chain called `name`. With `position` the replacement is
    /// also moved there (`0..len`).
    ///
    /// A chain that cannot be removed keeps that flag across the replacement.
    pub fn update(
        &self,
        name: &str,
        chain: RequestFilterChain,
        position: Option<usize>,
    ) -> Result<()> {
        self.commit("update", name, |chains| {
            let index = chains
                .iter()
                .position(|c| c.name() == name)
                .ok_or_else(|| GuardError::chain_not_found(name))?;
            let current = &chains[index];

            if current.is_constant() {
                return Err(GuardError::immutable_chain(name));
            }
            if chain.name() != name && !current.can_be_removed() {
                return Err(GuardError::chain_not_removable(name));
            }
            if let Some(position) = position {
                if position >= chains.len() {
                    return Err(GuardError::position_out_of_range(position, chains.len()));
                }
            }

            let chain = if current.can_be_removed() {
                chain
            } else {
                chain.removable(false)
            };
            chains.remove(index);
            chains.insert(position.unwrap_or(index), chain);
            Ok(())
        })
    }

    /// Remove the chain called `name`.
    pub fn remove(&self, name: &str) -> Result<()> {
        self.commit("remove", name, |chains| {
            let index = chains
                .iter()
                .position(|c| c.name() == name)
                .ok_or_else(|| GuardError::chain_not_found(name))?;
            if !chains[index].can_be_removed() {
                return Err(GuardError::chain_not_removable(name));
            }
            chains.remove(index);
            Ok(())
        })
    }

    /// Move the chain called `name` to `position` (`0..len`).
    pub fn move_to(&self, name: &str, position: usize) -> Result<()> {
        self.commit("move", name, |chains| {
            let index = chains
                .iter()
                .position(|c| c.name() == name)
                .ok_or_else(|| GuardError::chain_not_found(name))?;
            if position >= chains.len() {
                return Err(GuardError::position_out_of_range(position, chains.len()));
            }
            let chain = chains.remove(index);
            chains.insert(position, chain);
            Ok(())
        })
    }

    /// Replace the whole table.
    ///
    /// Fails if a non-removable chain would be dropped or made removable, or
    /// if a constant chain changed.
    pub fn replace_all(&self, chains: Vec<RequestFilterChain>) -> Result<()> {
        let _writer = self.write_lock.lock();
        let current = self.snapshot();

        if let Err(err) = validate_replacement(&current.chains, &chains) {
            warn!(
                operation = "replace_all",
                code = %err.code(),
                reason = err.user_message(),
                "Rejected filter chain change"
            );
            return Err(err);
        }

        let version = current.version + 1;
        *self.table.write() = Arc::new(ChainTable::new(version, chains));
        info!(operation = "replace_all", version, "Filter chain table replaced");
        Ok(())
    }

    /// Apply `change` to a copy of the table and publish it if the result is
    /// a valid table. Writers are serialized.
    fn commit<F>(&self, operation: &'static str, chain: &str, change: F) -> Result<()>
    where
        F: FnOnce(&mut Vec<RequestFilterChain>) -> Result<()>,
    {
        let _writer = self.write_lock.lock();
        let current = self.snapshot();
        let mut chains = current.chains.clone();

        let outcome = change(&mut chains).and_then(|()| validate_table(&chains));
        if let Err(err) = outcome {
            warn!(
                operation,
                chain,
                code = %err.code(),
                reason = err.user_message(),
                "Rejected filter chain change"
            );
            return Err(err);
        }

        let version = current.version + 1;
        *self.table.write() = Arc::new(ChainTable::new(version, chains));
        info!(operation, chain, version, "Filter chain table updated");
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::request::HttpMethod;
    use crate::error::ErrorCode;

    fn chain(name: &str, pattern: &str, filters: &[&str]) -> RequestFilterChain {
        RequestFilterChain::variable(name, [pattern], filters.iter().copied()).unwrap()
    }

    fn router() -> FilterChainRouter {
        FilterChainRouter::new(vec![
            chain("web", "/web/**", &["anonymous"]),
            chain("rest", "/rest/**", &["basic", "rest"]),
        ])
        .unwrap()
    }

    #[test]
    fn test_first_match_wins() {
        let router = router();
        assert_eq!(router.resolve("/rest/workspaces").unwrap(), vec!["basic", "rest"]);
        assert_eq!(router.resolve("/web/").unwrap(), vec!["anonymous"]);
    }

    #[test]
    fn test_no_match() {
        let err = router().resolve("/wfs").unwrap_err();
        assert_eq!(err.code(), ErrorCode::NoMatchingChain);
    }

    #[test]
    fn test_order_decides_overlap() {
        let router = router();
        router.add(chain("all", "/**", &["basic"]), 0).unwrap();
        assert_eq!(router.resolve("/rest/x").unwrap(), vec!["basic"]);

        router.move_to("all", 2).unwrap();
        assert_eq!(router.resolve("/rest/x").unwrap(), vec!["basic", "rest"]);
        assert_eq!(router.resolve("/wfs").unwrap(), vec!["basic"]);
    }

    #[test]
    fn test_add_position_bounds() {
        let router = router();
        router.add(chain("tail", "/tail", &["basic"]), 2).unwrap();
        assert_eq!(router.snapshot().chains().last().unwrap().name(), "tail");

        let err = router.add(chain("far", "/far", &["basic"]), 9).unwrap_err();
        assert_eq!(err.code(), ErrorCode::PositionOutOfRange);

        let err = router.add(chain("web", "/other", &["basic"]), 0).unwrap_err();
        assert_eq!(err.code(), ErrorCode::DuplicateChainName);
    }

    #[test]
    fn test_update_and_move() {
        let router = router();
        router
            .update("rest", chain("rest", "/rest/**", &["digest"]), Some(0))
            .unwrap();
        assert_eq!(router.snapshot().chains()[0].name(), "rest");
        assert_eq!(router.resolve("/rest/a").unwrap(), vec!["digest"]);

        let err = router.move_to("rest", 2).unwrap_err();
        assert_eq!(err.code(), ErrorCode::PositionOutOfRange);
        let err = router.update("missing", chain("missing", "/m", &["basic"]), None).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ChainNotFound);
    }

    #[test]
    fn test_constant_chain_rejects_update_and_remove() {
        let router = FilterChainRouter::with_defaults().unwrap();
        let before = router.snapshot();

        let replacement = RequestFilterChain::constant("webLogin", ["/login"], ["form"]).unwrap();
        let err = router.update("webLogin", replacement, None).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ImmutableChain);

        let err = router.remove("webLogin").unwrap_err();
        assert_eq!(err.code(), ErrorCode::ChainNotRemovable);

        assert_eq!(*router.snapshot(), *before);
    }

    #[test]
    fn test_non_removable_chain() {
        let router = FilterChainRouter::with_defaults().unwrap();
        let err = router.remove("rest").unwrap_err();
        assert_eq!(err.code(), ErrorCode::ChainNotRemovable);

        let renamed = chain("api", "/rest/**", &["basic"]);
        let err = router.update("rest", renamed, None).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ChainNotRemovable);
    }

    #[test]
    fn test_update_keeps_chain_locked() {
        let router = FilterChainRouter::with_defaults().unwrap();
        router
            .update("rest", chain("rest", "/rest/**", &["basic"]), None)
            .unwrap();
        assert!(!router.get("rest").unwrap().can_be_removed());
        assert_eq!(router.resolve("/rest/x").unwrap(), vec!["basic"]);

        let err = router.remove("rest").unwrap_err();
        assert_eq!(err.code(), ErrorCode::ChainNotRemovable);

        router
            .update("default", chain("default", "/**", &["basic"]), Some(0))
            .unwrap();
        let err = router.remove("default").unwrap_err();
        assert_eq!(err.code(), ErrorCode::ChainNotRemovable);
        assert!(router.snapshot().chains().iter().any(|c| c.name() == "default"));
    }

    #[test]
    fn test_replace_all_cannot_unlock_chain() {
        let router = FilterChainRouter::with_defaults().unwrap();
        let before = router.snapshot();
        let chains: Vec<_> = router
            .chains()
            .into_iter()
            .map(|c| if c.name() == "rest" { chain("rest", "/rest/**", &["basic"]) } else { c })
            .collect();
        let err = router.replace_all(chains).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ChainNotRemovable);
        assert_eq!(*router.snapshot(), *before);

        let err = router.remove("rest").unwrap_err();
        assert_eq!(err.code(), ErrorCode::ChainNotRemovable);
    }

    #[test]
    fn test_invalid_change_leaves_table() {
        let router = router();
        let before = router.snapshot();
        let bad = chain("bad", "/bad", &["anonymous", "basic"]);
        assert!(router.add(bad, 0).is_err());
        assert_eq!(router.snapshot(), before);
        assert_eq!(router.snapshot().version(), 0);
    }

    #[test]
    fn test_snapshot_is_stable() {
        let router = router();
        let snapshot = router.snapshot();
        router.remove("web").unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(router.snapshot().len(), 1);
        assert_eq!(router.snapshot().version(), 1);
    }

    #[test]
    fn test_replace_all() {
        let router = FilterChainRouter::with_defaults().unwrap();
        let mut chains = router.chains();
        chains.retain(|c| c.name() != "gwc");
        let err = router.replace_all(chains).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ChainNotRemovable);

        let mut chains = router.chains();
        chains.insert(0, chain("ows", "/ows/**", &["basic"]));
        router.replace_all(chains).unwrap();
        assert_eq!(router.resolve("/ows/x").unwrap(), vec!["basic"]);
    }

    #[test]
    fn test_resolve_request_details() {
        let router = FilterChainRouter::new(vec![
            chain("writes", "/rest/**", &["basic"]).http_methods([HttpMethod::Post]),
            chain("reads", "/rest/**", &["anonymous"]),
            chain("open", "/open/**", &["basic"]).disabled(true).require_ssl(true),
        ])
        .unwrap();

        let post = RequestTarget::new("/rest/x").with_method(HttpMethod::Post);
        assert_eq!(router.resolve_request(&post).unwrap().chain, "writes");
        assert_eq!(router.resolve("/rest/x").unwrap(), vec!["anonymous"]);

        let open = router.resolve_request(&RequestTarget::new("/open/a")).unwrap();
        assert_eq!(open.chain, "open");
        assert!(open.filters.is_empty());
        assert!(open.require_ssl);
    }
}
