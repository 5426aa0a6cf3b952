//! Wrapper policies: the granted level and denial response for one catalog
//! object, derived from its access limits.

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::context::AccessContext;
use super::level::{decide, AccessLevel, CatalogMode, Decision, Response};
use super::limits::AccessLimits;

/// Granted level, denial response and the limits they were derived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrapperPolicy {
    pub level: AccessLevel,
    pub response: Response,
    pub limits: Option<AccessLimits>,
}

impl WrapperPolicy {
    pub fn hide(limits: Option<AccessLimits>) -> Self {
        Self {
            level: AccessLevel::Hidden,
            response: Response::Hide,
            limits,
        }
    }

    pub fn metadata(limits: Option<AccessLimits>) -> Self {
        Self {
            level: AccessLevel::Metadata,
            response: Response::Challenge,
            limits,
        }
    }

    pub fn read_only(response: Response, limits: Option<AccessLimits>) -> Self {
        Self {
            level: AccessLevel::ReadOnly,
            response,
            limits,
        }
    }

    pub fn read_write(limits: Option<AccessLimits>) -> Self {
        Self {
            level: AccessLevel::ReadWrite,
            response: Response::Hide,
            limits,
        }
    }

    /// Policy for a workspace.
    pub fn for_workspace(limits: Option<&AccessLimits>, ctx: AccessContext) -> Self {
        let (mut can_read, mut can_write) = match limits {
            Some(l) => (l.can_read(), l.can_write()),
            None => (true, true),
        };

        if ctx.admin && !limits.and_then(AccessLimits::adminable).unwrap_or(false) {
            can_read = false;
            can_write = false;
        }

        Self::from_flags(limits, can_read, can_write, ctx)
    }

    /// Policy for a layer or the resource it publishes.
    ///
    /// `workspace` is the limits of the enclosing workspace, if any.
    pub fn for_resource(
        limits: Option<&AccessLimits>,
        workspace: Option<&AccessLimits>,
        ctx: AccessContext,
    ) -> Self {
        let (mut can_read, can_write) = match limits {
            Some(l) => (l.can_read(), l.can_write()),
            None => (true, true),
        };

        if ctx.admin && workspace.and_then(AccessLimits::adminable) == Some(false) {
            can_read = false;
        }

        Self::from_flags(limits, can_read, can_write, ctx)
    }

    /// Policy for a style or layer group.
    pub fn for_style_or_group(
        limits: Option<&AccessLimits>,
        workspace: Option<&AccessLimits>,
        ctx: AccessContext,
    ) -> Self {
        let mut can_read = limits.map_or(true, AccessLimits::can_read);

        if ctx.admin && workspace.and_then(AccessLimits::adminable) == Some(false) {
            can_read = false;
        }

        Self::from_flags(limits, can_read, true, ctx)
    }

    /// Most restrictive of the member policies of a layer group.
    ///
    /// The first hidden member wins outright. An empty group is read-write.
    pub fn most_restrictive<I>(members: I) -> Self
    where
        I: IntoIterator<Item = WrapperPolicy>,
    {
        let mut result = Self::read_write(None);
        for policy in members {
            if policy.level == AccessLevel::Hidden {
                return policy;
            }
            if policy.level < result.level {
                result = policy;
            }
        }
        result
    }

    fn from_flags(
        limits: Option<&AccessLimits>,
        can_read: bool,
        can_write: bool,
        ctx: AccessContext,
    ) -> Self {
        let mode = limits.map_or(CatalogMode::Hide, |l| l.mode);
        let owned = limits.cloned();

        let policy = if !can_read {
            match mode {
                CatalogMode::Hide => Self::hide(owned),
                CatalogMode::Mixed => Self {
                    level: AccessLevel::Hidden,
                    response: Response::for_mode(mode, ctx.direct_access),
                    limits: owned,
                },
                CatalogMode::Challenge => Self::metadata(owned),
            }
        } else if !can_write {
            let response = match mode {
                CatalogMode::Hide => Response::Hide,
                _ => Response::Challenge,
            };
            Self::read_only(response, owned)
        } else {
            Self::read_write(owned)
        };

        trace!(
            level = %policy.level,
            response = %policy.response,
            mode = %mode,
            can_read,
            can_write,
            "Built wrapper policy"
        );
        policy
    }

    /// Whether the object should disappear from listings.
    pub fn is_hidden(&self) -> bool {
        self.level == AccessLevel::Hidden
    }

    /// Check a requested level against this policy.
    ///
    /// The stored response is used on denial; it already reflects the mode.
    pub fn check(&self, requested: AccessLevel, ctx: AccessContext) -> Decision {
        let mode = match (self.response, &self.limits) {
            (_, Some(limits)) => limits.mode,
            (Response::Challenge, None) => CatalogMode::Challenge,
            (Response::Hide, None) => CatalogMode::Hide,
        };
        decide(requested, self.level, mode, ctx.direct_access)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::limits::DataFilter;

    fn vector(mode: CatalogMode, read: bool, write: bool) -> AccessLimits {
        AccessLimits::vector(mode, DataFilter::from_allowed(read), DataFilter::from_allowed(write))
    }

    #[test]
    fn test_no_limits_is_read_write() {
        let policy = WrapperPolicy::for_resource(None, None, AccessContext::enumeration());
        assert_eq!(policy.level, AccessLevel::ReadWrite);
        assert!(policy.limits.is_none());
    }

    #[test]
    fn test_unreadable_by_mode() {
        let hide = WrapperPolicy::for_resource(
            Some(&vector(CatalogMode::Hide, false, false)),
            None,
            AccessContext::direct(),
        );
        assert_eq!((hide.level, hide.response), (AccessLevel::Hidden, Response::Hide));

        let mixed_listing = WrapperPolicy::for_resource(
            Some(&vector(CatalogMode::Mixed, false, false)),
            None,
            AccessContext::enumeration(),
        );
        assert_eq!(
            (mixed_listing.level, mixed_listing.response),
            (AccessLevel::Hidden, Response::Hide)
        );

        let mixed_direct = WrapperPolicy::for_resource(
            Some(&vector(CatalogMode::Mixed, false, false)),
            None,
            AccessContext::direct(),
        );
        assert_eq!(
            (mixed_direct.level, mixed_direct.response),
            (AccessLevel::Hidden, Response::Challenge)
        );

        let challenge = WrapperPolicy::for_resource(
            Some(&vector(CatalogMode::Challenge, false, false)),
            None,
            AccessContext::enumeration(),
        );
        assert_eq!(
            (challenge.level, challenge.response),
            (AccessLevel::Metadata, Response::Challenge)
        );
    }

    #[test]
    fn test_read_only_response() {
        let hide = WrapperPolicy::for_resource(
            Some(&vector(CatalogMode::Hide, true, false)),
            None,
            AccessContext::direct(),
        );
        assert_eq!((hide.level, hide.response), (AccessLevel::ReadOnly, Response::Hide));

        let mixed = WrapperPolicy::for_resource(
            Some(&vector(CatalogMode::Mixed, true, false)),
            None,
            AccessContext::enumeration(),
        );
        assert_eq!((mixed.level, mixed.response), (AccessLevel::ReadOnly, Response::Challenge));
    }

    #[test]
    fn test_admin_request_needs_adminable_workspace() {
        let ws_limits = AccessLimits::workspace(CatalogMode::Hide, true, true, false);
        let admin = AccessContext::enumeration().with_admin(true);

        assert!(WrapperPolicy::for_workspace(Some(&ws_limits), admin).is_hidden());
        assert!(WrapperPolicy::for_workspace(None, admin).is_hidden());
        assert!(WrapperPolicy::for_resource(None, Some(&ws_limits), admin).is_hidden());
        assert!(WrapperPolicy::for_style_or_group(None, Some(&ws_limits), admin).is_hidden());

        let adminable = AccessLimits::workspace(CatalogMode::Hide, false, false, true);
        assert_eq!(
            WrapperPolicy::for_workspace(Some(&adminable), admin).level,
            AccessLevel::ReadWrite
        );
        assert_eq!(
            WrapperPolicy::for_resource(None, Some(&adminable), admin).level,
            AccessLevel::ReadWrite
        );
    }

    #[test]
    fn test_group_limits_hide() {
        let limits = AccessLimits::layer_group(CatalogMode::Challenge, None);
        let policy = WrapperPolicy::for_style_or_group(Some(&limits), None, AccessContext::direct());
        assert_eq!(policy.level, AccessLevel::Metadata);
        assert_eq!(
            WrapperPolicy::for_style_or_group(None, None, AccessContext::direct()).level,
            AccessLevel::ReadWrite
        );
    }

    #[test]
    fn test_most_restrictive_member() {
        let members = vec![
            WrapperPolicy::read_write(None),
            WrapperPolicy::read_only(Response::Hide, None),
            WrapperPolicy::metadata(None),
        ];
        assert_eq!(WrapperPolicy::most_restrictive(members).level, AccessLevel::Metadata);

        let with_hidden = vec![
            WrapperPolicy::read_only(Response::Hide, None),
            WrapperPolicy::hide(Some(AccessLimits::style(CatalogMode::Hide))),
            WrapperPolicy::hide(None),
        ];
        let policy = WrapperPolicy::most_restrictive(with_hidden);
        assert!(policy.is_hidden());
        assert!(policy.limits.is_some());

        assert_eq!(WrapperPolicy::most_restrictive(Vec::new()).level, AccessLevel::ReadWrite);
    }

    #[test]
    fn test_check_uses_policy_mode() {
        let policy = WrapperPolicy::for_resource(
            Some(&vector(CatalogMode::Mixed, true, false)),
            None,
            AccessContext::enumeration(),
        );
        assert!(policy.check(AccessLevel::ReadOnly, AccessContext::enumeration()).is_permitted());
        assert_eq!(
            policy.check(AccessLevel::ReadWrite, AccessContext::direct()),
            Decision::Deny(Response::Challenge)
        );
        assert_eq!(
            policy.check(AccessLevel::ReadWrite, AccessContext::enumeration()),
            Decision::Deny(Response::Hide)
        );
    }
}
