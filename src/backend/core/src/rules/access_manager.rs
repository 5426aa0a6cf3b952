//! Rule-based access manager.
//!
//! Turns the rule tree into [`AccessLimits`] per catalog entity, and limits
//! into wrapper policies. `None` limits mean unrestricted access.

use std::iter;

use tracing::debug;

use super::principal::{Principal, RoleId, ADMIN_ROLE};
use super::rule::{AccessMode, AccessRules};
use super::tree::SecureTree;
use crate::access::{
    AccessContext, AccessLevel, AccessLimits, CatalogMode, DataFilter, Decision, WrapperPolicy,
};
use crate::catalog::{
    CatalogTarget, LayerGroupRef, LayerRef, ResourceKind, ResourceRef, StyleRef, WorkspaceRef,
};

/// Access manager backed by a [`SecureTree`].
#[derive(Debug, Clone)]
pub struct RuleAccessManager {
    rules: AccessRules,
    tree: SecureTree,
    admin_role: RoleId,
}

impl Default for RuleAccessManager {
    fn default() -> Self {
        Self::new(AccessRules::default(), RoleId::from(ADMIN_ROLE))
    }
}

impl RuleAccessManager {
    pub fn new(rules: AccessRules, admin_role: RoleId) -> Self {
        let tree = SecureTree::build(&rules);
        debug!(
            rules = rules.len(),
            mode = %rules.mode,
            admin_role = %admin_role,
            "Built access rule tree"
        );
        Self {
            rules,
            tree,
            admin_role,
        }
    }

    pub fn mode(&self) -> CatalogMode {
        self.rules.mode
    }

    pub fn rules(&self) -> &AccessRules {
        &self.rules
    }

    pub fn admin_role(&self) -> &RoleId {
        &self.admin_role
    }

    /// Copy with a different catalog mode.
    pub fn with_mode(&self, mode: CatalogMode) -> Self {
        let mut rules = self.rules.clone();
        rules.mode = mode;
        Self::new(rules, self.admin_role.clone())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Rule checks
    // ─────────────────────────────────────────────────────────────────────────

    /// Workspace access. Read is also granted when anything inside the
    /// workspace is readable.
    pub fn can_access_workspace(&self, principal: &Principal, workspace: &str, mode: AccessMode) -> bool {
        let node = self.tree.deepest_node(&[workspace]);
        if node.can_access(principal, mode, &self.admin_role) {
            return true;
        }
        mode == AccessMode::Read
            && node.depth() == 1
            && node.can_access_any_descendant(principal, mode, &self.admin_role)
    }

    pub fn can_access_resource(&self, principal: &Principal, resource: &ResourceRef, mode: AccessMode) -> bool {
        self.tree
            .deepest_node(&[resource.workspace.as_str(), resource.name.as_str()])
            .can_access(principal, mode, &self.admin_role)
    }

    fn can_read_group(&self, principal: &Principal, group: &LayerGroupRef) -> bool {
        let node = match &group.workspace {
            Some(ws) => self.tree.deepest_node(&[ws.as_str(), group.name.as_str()]),
            None => self.tree.deepest_node(&[group.name.as_str()]),
        };
        node.can_access(principal, AccessMode::Read, &self.admin_role)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Limits
    // ─────────────────────────────────────────────────────────────────────────

    pub fn workspace_limits(
        &self,
        principal: &Principal,
        workspace: &WorkspaceRef,
        ctx: AccessContext,
    ) -> Option<AccessLimits> {
        let readable = self.can_access_workspace(principal, &workspace.name, AccessMode::Read);
        let writable = self.can_access_workspace(principal, &workspace.name, AccessMode::Write);
        let adminable = self.can_access_workspace(principal, &workspace.name, AccessMode::Admin);

        if readable && writable && !adminable && !ctx.admin {
            return None;
        }
        Some(AccessLimits::workspace(self.mode(), readable, writable, adminable))
    }

    pub fn resource_limits(&self, principal: &Principal, resource: &ResourceRef) -> Option<AccessLimits> {
        let read = self.can_access_resource(principal, resource, AccessMode::Read);
        let write = self.can_access_resource(principal, resource, AccessMode::Write);
        self.build_data_limits(resource.kind, read, write)
    }

    pub fn layer_limits(&self, principal: &Principal, layer: &LayerRef) -> Option<AccessLimits> {
        self.resource_limits(principal, &layer.resource)
    }

    /// Limits for a layer group.
    ///
    /// A refused group carries no member list. A readable group with hidden
    /// members lists the members that stay visible.
    pub fn layer_group_limits(
        &self,
        principal: &Principal,
        group: &LayerGroupRef,
        ctx: AccessContext,
    ) -> Option<AccessLimits> {
        if !self.can_read_group(principal, group) {
            return Some(AccessLimits::layer_group(self.mode(), None));
        }
        let allowed: Vec<String> = group
            .layers
            .iter()
            .filter(|l| !self.layer_policy(principal, l, ctx).is_hidden())
            .map(|l| l.name.clone())
            .collect();
        if allowed.len() == group.layers.len() {
            return None;
        }
        Some(AccessLimits::layer_group(self.mode(), Some(allowed)))
    }

    /// Styles carry no rules of their own.
    pub fn style_limits(&self, _principal: &Principal, _style: &StyleRef) -> Option<AccessLimits> {
        None
    }

    fn build_data_limits(&self, kind: ResourceKind, read: bool, write: bool) -> Option<AccessLimits> {
        let write_irrelevant = matches!(
            kind,
            ResourceKind::Coverage | ResourceKind::WmsLayer | ResourceKind::WmtsLayer
        );
        if read && (write || write_irrelevant) {
            return None;
        }

        let mode = self.mode();
        let read_filter = DataFilter::from_allowed(read);
        Some(match kind {
            ResourceKind::FeatureType => {
                AccessLimits::vector(mode, read_filter, DataFilter::from_allowed(write))
            }
            ResourceKind::Coverage => AccessLimits::coverage(mode, read_filter),
            ResourceKind::WmsLayer => AccessLimits::wms(mode, read_filter),
            ResourceKind::WmtsLayer => AccessLimits::wmts(mode, read_filter),
            ResourceKind::Other => AccessLimits::data(mode, read_filter),
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Policies
    // ─────────────────────────────────────────────────────────────────────────

    fn enclosing_workspace_limits(
        &self,
        principal: &Principal,
        workspace: Option<&str>,
        ctx: AccessContext,
    ) -> Option<AccessLimits> {
        workspace.and_then(|ws| self.workspace_limits(principal, &WorkspaceRef::new(ws), ctx))
    }

    pub fn workspace_policy(&self, principal: &Principal, workspace: &WorkspaceRef, ctx: AccessContext) -> WrapperPolicy {
        let limits = self.workspace_limits(principal, workspace, ctx);
        WrapperPolicy::for_workspace(limits.as_ref(), ctx)
    }

    pub fn resource_policy(&self, principal: &Principal, resource: &ResourceRef, ctx: AccessContext) -> WrapperPolicy {
        let limits = self.resource_limits(principal, resource);
        let ws = self.enclosing_workspace_limits(principal, Some(&resource.workspace), ctx);
        WrapperPolicy::for_resource(limits.as_ref(), ws.as_ref(), ctx)
    }

    pub fn layer_policy(&self, principal: &Principal, layer: &LayerRef, ctx: AccessContext) -> WrapperPolicy {
        self.resource_policy(principal, &layer.resource, ctx)
    }

    /// The group's own policy, tightened to its most restrictive visible
    /// member. Hidden members drop out of the group instead of hiding it.
    pub fn layer_group_policy(&self, principal: &Principal, group: &LayerGroupRef, ctx: AccessContext) -> WrapperPolicy {
        let limits = self.layer_group_limits(principal, group, ctx);
        let ws = self.enclosing_workspace_limits(principal, group.workspace.as_deref(), ctx);
        let own = WrapperPolicy::for_style_or_group(limits.as_ref(), ws.as_ref(), ctx);
        if own.is_hidden() {
            return own;
        }

        let members = group
            .layers
            .iter()
            .map(|l| self.layer_policy(principal, l, ctx))
            .filter(|p| !p.is_hidden());
        let tightest = WrapperPolicy::most_restrictive(iter::once(own.clone()).chain(members));
        WrapperPolicy {
            limits: own.limits,
            ..tightest
        }
    }

    pub fn style_policy(&self, principal: &Principal, style: &StyleRef, ctx: AccessContext) -> WrapperPolicy {
        let limits = self.style_limits(principal, style);
        let ws = self.enclosing_workspace_limits(principal, style.workspace.as_deref(), ctx);
        WrapperPolicy::for_style_or_group(limits.as_ref(), ws.as_ref(), ctx)
    }

    pub fn policy(&self, principal: &Principal, target: CatalogTarget<'_>, ctx: AccessContext) -> WrapperPolicy {
        match target {
            CatalogTarget::Workspace(ws) => self.workspace_policy(principal, ws, ctx),
            CatalogTarget::Layer(layer) => self.layer_policy(principal, layer, ctx),
            CatalogTarget::Resource(resource) => self.resource_policy(principal, resource, ctx),
            CatalogTarget::LayerGroup(group) => self.layer_group_policy(principal, group, ctx),
            CatalogTarget::Style(style) => self.style_policy(principal, style, ctx),
        }
    }

    /// Level granted to `principal` on `target`.
    pub fn granted_level(&self, principal: &Principal, target: CatalogTarget<'_>, ctx: AccessContext) -> AccessLevel {
        self.policy(principal, target, ctx).level
    }

    /// Decide a requested level for `principal` on `target`.
    pub fn check(
        &self,
        principal: &Principal,
        target: CatalogTarget<'_>,
        requested: AccessLevel,
        ctx: AccessContext,
    ) -> Decision {
        self.policy(principal, target, ctx).check(requested, ctx)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::Response;
    use crate::rules::principal::ANONYMOUS_ROLE;

    const RULES: &str = "\
mode=HIDE
*.*.r=*
*.*.w=ROLE_EDITOR
*.*.a=ROLE_ADMINISTRATOR
topp.*.a=ROLE_TOPP_ADMIN
topp.secret.r=ROLE_SECRET
topp.secret.w=ROLE_SECRET
";

    fn manager(text: &str) -> RuleAccessManager {
        RuleAccessManager::new(AccessRules::parse_text(text).unwrap(), RoleId::from(ADMIN_ROLE))
    }

    fn user(roles: &[&str]) -> Principal {
        Principal::new("user", roles.iter().map(|r| RoleId::from(*r)))
    }

    #[test]
    fn test_default_rules_grant_everyone_read_write() {
        let manager = RuleAccessManager::default();
        let roads = LayerRef::feature_type("topp", "roads");
        let ctx = AccessContext::direct();
        assert_eq!(
            manager.granted_level(&Principal::anonymous(), CatalogTarget::Layer(&roads), ctx),
            AccessLevel::ReadWrite
        );
        assert!(manager.layer_limits(&Principal::anonymous(), &roads).is_none());
    }

    #[test]
    fn test_read_only_and_hidden_layers() {
        let manager = manager(RULES);
        let ctx = AccessContext::direct();
        let roads = LayerRef::feature_type("topp", "roads");
        let secret = LayerRef::feature_type("topp", "secret");

        assert_eq!(manager.layer_policy(&user(&[]), &roads, ctx).level, AccessLevel::ReadOnly);
        assert_eq!(
            manager.layer_policy(&user(&["ROLE_EDITOR"]), &roads, ctx).level,
            AccessLevel::ReadWrite
        );

        let hidden = manager.layer_policy(&user(&["ROLE_EDITOR"]), &secret, ctx);
        assert_eq!((hidden.level, hidden.response), (AccessLevel::Hidden, Response::Hide));
        assert_eq!(
            manager.layer_policy(&user(&["ROLE_SECRET"]), &secret, ctx).level,
            AccessLevel::ReadWrite
        );
        assert_eq!(
            manager.layer_policy(&user(&[ADMIN_ROLE]), &secret, ctx).level,
            AccessLevel::ReadWrite
        );
    }

    #[test]
    fn test_challenge_mode_exposes_metadata() {
        let manager = manager(RULES).with_mode(CatalogMode::Challenge);
        let secret = LayerRef::feature_type("topp", "secret");
        let decision = manager.check(
            &user(&[ANONYMOUS_ROLE]),
            CatalogTarget::Layer(&secret),
            AccessLevel::ReadOnly,
            AccessContext::enumeration(),
        );
        assert_eq!(decision, Decision::Deny(Response::Challenge));
        assert_eq!(
            manager.granted_level(&user(&[]), CatalogTarget::Layer(&secret), AccessContext::enumeration()),
            AccessLevel::Metadata
        );
    }

    #[test]
    fn test_raster_read_is_full_access() {
        let manager = manager(RULES);
        let dem = ResourceRef::new("topp", "dem", ResourceKind::Coverage);
        assert!(manager.resource_limits(&user(&[]), &dem).is_none());
    }

    #[test]
    fn test_admin_request_requires_adminable_workspace() {
        let manager = manager(RULES);
        let admin_ctx = AccessContext::direct().with_admin(true);
        let topp = WorkspaceRef::new("topp");
        let roads = LayerRef::feature_type("topp", "roads");

        let editor = user(&["ROLE_EDITOR"]);
        assert!(manager.workspace_policy(&editor, &topp, admin_ctx).is_hidden());
        assert!(manager.layer_policy(&editor, &roads, admin_ctx).is_hidden());
        assert_eq!(
            manager.workspace_policy(&editor, &topp, AccessContext::direct()).level,
            AccessLevel::ReadWrite
        );

        let topp_admin = user(&["ROLE_TOPP_ADMIN"]);
        assert_eq!(
            manager.workspace_policy(&topp_admin, &topp, admin_ctx).level,
            AccessLevel::ReadWrite
        );
        assert!(!manager.layer_policy(&topp_admin, &roads, admin_ctx).is_hidden());
    }

    #[test]
    fn test_workspace_read_drills_down() {
        let manager = manager("*.*.r=ROLE_NOBODY\n*.*.w=ROLE_NOBODY\ntopp.open.r=*");
        let anon = Principal::anonymous();
        assert!(manager.can_access_workspace(&anon, "topp", AccessMode::Read));
        assert!(!manager.can_access_workspace(&anon, "sf", AccessMode::Read));
        assert!(!manager.can_access_workspace(&anon, "topp", AccessMode::Write));
    }

    #[test]
    fn test_layer_group_takes_most_restrictive_member() {
        let manager = manager(RULES);
        let ctx = AccessContext::enumeration();
        let editor = user(&["ROLE_EDITOR"]);

        let open = LayerGroupRef::new(
            Some("topp".into()),
            "basemap",
            vec![LayerRef::feature_type("topp", "roads"), LayerRef::feature_type("topp", "rivers")],
        );
        assert_eq!(manager.layer_group_policy(&editor, &open, ctx).level, AccessLevel::ReadWrite);
        assert_eq!(manager.layer_group_policy(&user(&[]), &open, ctx).level, AccessLevel::ReadOnly);

        let mixed = LayerGroupRef::new(
            None,
            "everything",
            vec![LayerRef::feature_type("topp", "roads"), LayerRef::feature_type("topp", "secret")],
        );
        let policy = manager.layer_group_policy(&editor, &mixed, ctx);
        assert_eq!(policy.level, AccessLevel::ReadWrite);
        let limits = policy.limits.unwrap();
        assert_eq!(limits.allowed_layers(), Some(&["roads".to_string()][..]));
    }

    #[test]
    fn test_hidden_member_drops_out_of_visible_group() {
        let manager = manager("*.*.r=*\n*.*.w=*\ntopp.secret.r=ROLE_SECRET");
        let ctx = AccessContext::enumeration();
        let basemap = LayerGroupRef::new(
            Some("topp".into()),
            "basemap",
            vec![LayerRef::feature_type("topp", "roads"), LayerRef::feature_type("topp", "secret")],
        );

        let anon = Principal::anonymous();
        let policy = manager.layer_group_policy(&anon, &basemap, ctx);
        assert!(!policy.is_hidden());
        assert_eq!(policy.level, AccessLevel::ReadWrite);
        let limits = manager.layer_group_limits(&anon, &basemap, ctx).unwrap();
        assert!(limits.can_read());
        assert_eq!(limits.allowed_layers(), Some(&["roads".to_string()][..]));
        assert_eq!(policy.limits, Some(limits));

        let spy = user(&["ROLE_SECRET"]);
        assert!(manager.layer_group_limits(&spy, &basemap, ctx).is_none());
        assert!(manager.layer_group_policy(&spy, &basemap, ctx).limits.is_none());
    }

    #[test]
    fn test_challenge_mode_keeps_unreadable_members() {
        let manager = manager(RULES).with_mode(CatalogMode::Challenge);
        let ctx = AccessContext::enumeration();
        let group = LayerGroupRef::new(
            Some("topp".into()),
            "basemap",
            vec![LayerRef::feature_type("topp", "roads"), LayerRef::feature_type("topp", "secret")],
        );
        assert!(manager.layer_group_limits(&user(&[]), &group, ctx).is_none());
        assert_eq!(
            manager.layer_group_policy(&user(&[]), &group, ctx).level,
            AccessLevel::Metadata
        );
    }

    #[test]
    fn test_denied_group_is_hidden() {
        let manager = manager("*.*.r=*\ntopp.restricted.r=ROLE_X\ntopp.secret.r=ROLE_X");
        let group = LayerGroupRef::new(
            Some("topp".into()),
            "restricted",
            vec![LayerRef::feature_type("topp", "roads"), LayerRef::feature_type("topp", "secret")],
        );
        let ctx = AccessContext::direct();
        let limits = manager.layer_group_limits(&user(&[]), &group, ctx).unwrap();
        assert!(!limits.can_read());
        assert_eq!(limits.allowed_layers(), None);
        assert!(manager.layer_group_policy(&user(&[]), &group, ctx).is_hidden());
    }

    #[test]
    fn test_styles_are_visible() {
        let manager = manager(RULES);
        let style = StyleRef::new(Some("topp".into()), "roads_style");
        assert!(manager.style_limits(&user(&[]), &style).is_none());
        assert!(!manager.style_policy(&user(&[]), &style, AccessContext::enumeration()).is_hidden());
    }
}
