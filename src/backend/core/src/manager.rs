//! Security manager facade.
//!
//! Owns the routing table, the active rule set, the catalog filters and the
//! listener registry. Every configuration change goes through here so that
//! listeners hear about it once it is committed.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use crate::access::{AccessContext, AccessLevel, CatalogMode, Decision, Response, WrapperPolicy};
use crate::catalog::{
    CatalogFilter, CatalogFilters, CatalogTarget, LayerGroupRef, LayerRef, StyleRef, WorkspaceRef,
};
use crate::chain::{FilterChainRouter, RequestFilterChain, RequestTarget, ResolvedChain};
use crate::config::Config;
use crate::error::Result;
use crate::listener::{
    ListenerId, ListenerRegistry, NotificationReport, SecurityChange, SecurityManagerListener,
};
use crate::rules::{AccessRules, Principal, RuleAccessManager};

pub struct SecurityManager {
    router: FilterChainRouter,
    access: RwLock<Arc<RuleAccessManager>>,
    filters: RwLock<CatalogFilters>,
    listeners: ListenerRegistry,
}

impl SecurityManager {
    pub fn new(router: FilterChainRouter, access: RuleAccessManager) -> Self {
        Self {
            router,
            access: RwLock::new(Arc::new(access)),
            filters: RwLock::new(CatalogFilters::new()),
            listeners: ListenerRegistry::new(),
        }
    }

    /// Built-in chain table and rules.
    pub fn with_defaults() -> Result<Self> {
        Ok(Self::new(FilterChainRouter::with_defaults()?, RuleAccessManager::default()))
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let security = &config.security;
        let router = FilterChainRouter::new(security.filter_chains()?)?;
        let access = RuleAccessManager::new(security.access_rules()?, security.admin_role()?);
        info!(
            chains = router.snapshot().len(),
            rules = access.rules().len(),
            mode = %access.mode(),
            "Security manager configured"
        );
        Ok(Self::new(router, access))
    }

    pub fn router(&self) -> &FilterChainRouter {
        &self.router
    }

    /// Current rule set. Later rule changes do not affect the returned value.
    pub fn access_manager(&self) -> Arc<RuleAccessManager> {
        self.access.read().clone()
    }

    pub fn catalog_mode(&self) -> CatalogMode {
        self.access.read().mode()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Listeners and filters
    // ─────────────────────────────────────────────────────────────────────────

    pub fn add_listener(&self, listener: Arc<dyn SecurityManagerListener>) -> ListenerId {
        self.listeners.add(listener)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    pub fn add_catalog_filter(&self, filter: Arc<dyn CatalogFilter>) {
        self.filters.write().push(filter);
    }

    fn notify(&self, change: SecurityChange) -> NotificationReport {
        info!(change = %change, "Security configuration changed");
        self.listeners.fire(change)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Routing
    // ─────────────────────────────────────────────────────────────────────────

    pub fn resolve(&self, path: &str) -> Result<Vec<String>> {
        self.router.resolve(path)
    }

    pub fn resolve_request(&self, target: &RequestTarget<'_>) -> Result<ResolvedChain> {
        self.router.resolve_request(target)
    }

    pub fn add_chain(&self, chain: RequestFilterChain, position: usize) -> Result<NotificationReport> {
        let name = chain.name().to_string();
        self.router.add(chain, position)?;
        Ok(self.notify(SecurityChange::ChainAdded { name, position }))
    }

    pub fn update_chain(
        &self,
        name: &str,
        chain: RequestFilterChain,
        position: Option<usize>,
    ) -> Result<NotificationReport> {
        let new_name = chain.name().to_string();
        self.router.update(name, chain, position)?;
        Ok(self.notify(SecurityChange::ChainUpdated { name: new_name }))
    }

    pub fn remove_chain(&self, name: &str) -> Result<NotificationReport> {
        self.router.remove(name)?;
        Ok(self.notify(SecurityChange::ChainRemoved {
            name: name.to_string(),
        }))
    }

    pub fn move_chain(&self, name: &str, position: usize) -> Result<NotificationReport> {
        self.router.move_to(name, position)?;
        Ok(self.notify(SecurityChange::ChainMoved {
            name: name.to_string(),
            position,
        }))
    }

    pub fn replace_chains(&self, chains: Vec<RequestFilterChain>) -> Result<NotificationReport> {
        let count = chains.len();
        self.router.replace_all(chains)?;
        Ok(self.notify(SecurityChange::ChainsReplaced { count }))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Rules
    // ─────────────────────────────────────────────────────────────────────────

    pub fn set_rules(&self, rules: AccessRules) -> NotificationReport {
        let count = rules.len();
        {
            let mut access = self.access.write();
            let admin_role = access.admin_role().clone();
            *access = Arc::new(RuleAccessManager::new(rules, admin_role));
        }
        self.notify(SecurityChange::RulesReplaced { count })
    }

    pub fn set_catalog_mode(&self, mode: CatalogMode) -> NotificationReport {
        {
            let mut access = self.access.write();
            *access = Arc::new(access.with_mode(mode));
        }
        self.notify(SecurityChange::CatalogModeChanged { mode })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Access evaluation
    // ─────────────────────────────────────────────────────────────────────────

    pub fn policy(&self, principal: &Principal, target: CatalogTarget<'_>, ctx: AccessContext) -> WrapperPolicy {
        self.access_manager().policy(principal, target, ctx)
    }

    pub fn workspace_policy(&self, principal: &Principal, workspace: &WorkspaceRef, ctx: AccessContext) -> WrapperPolicy {
        self.policy(principal, CatalogTarget::Workspace(workspace), ctx)
    }

    pub fn layer_policy(&self, principal: &Principal, layer: &LayerRef, ctx: AccessContext) -> WrapperPolicy {
        self.policy(principal, CatalogTarget::Layer(layer), ctx)
    }

    pub fn layer_group_policy(&self, principal: &Principal, group: &LayerGroupRef, ctx: AccessContext) -> WrapperPolicy {
        self.policy(principal, CatalogTarget::LayerGroup(group), ctx)
    }

    pub fn style_policy(&self, principal: &Principal, style: &StyleRef, ctx: AccessContext) -> WrapperPolicy {
        self.policy(principal, CatalogTarget::Style(style), ctx)
    }

    fn filtered(&self, target: CatalogTarget<'_>) -> bool {
        let filters = self.filters.read();
        match target {
            CatalogTarget::Workspace(ws) => filters.hide_workspace(ws),
            CatalogTarget::Layer(layer) => filters.hide_layer(layer),
            CatalogTarget::Resource(resource) => filters.hide_resource(resource),
            CatalogTarget::LayerGroup(group) => filters.hide_layer_group(group),
            CatalogTarget::Style(style) => filters.hide_style(style),
        }
    }

    /// Whether `target` is left out of listings for `principal`.
    ///
    /// Uses the calling thread's admin request state.
    pub fn is_hidden(&self, principal: &Principal, target: CatalogTarget<'_>) -> bool {
        self.filtered(target) || self.policy(principal, target, AccessContext::current(false)).is_hidden()
    }

    /// Layers `principal` can see in a listing, in input order.
    pub fn visible_layers<'a, I>(&self, principal: &Principal, layers: I) -> Vec<&'a LayerRef>
    where
        I: IntoIterator<Item = &'a LayerRef>,
    {
        layers
            .into_iter()
            .filter(|l| !self.is_hidden(principal, CatalogTarget::Layer(l)))
            .collect()
    }

    /// Decide a requested level on `target`. Filtered entities are treated as
    /// nonexistent.
    pub fn check(
        &self,
        principal: &Principal,
        target: CatalogTarget<'_>,
        requested: AccessLevel,
        direct_access: bool,
    ) -> Decision {
        if self.filtered(target) {
            return Decision::Deny(Response::Hide);
        }
        let ctx = AccessContext::current(direct_access);
        self.policy(principal, target, ctx).check(requested, ctx)
    }
}

impl std::fmt::Debug for SecurityManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityManager")
            .field("router", &self.router)
            .field("mode", &self.catalog_mode())
            .field("listeners", &self.listeners)
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
