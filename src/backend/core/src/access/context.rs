use serde::{Deserialize, Serialize};

use crate::admin::AdminRequest;

/// Per-call context for access evaluation.
///
/// `direct_access` distinguishes a lookup by name or id from enumeration.
/// `admin` marks a privileged management operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccessContext {
    pub direct_access: bool,
    pub admin: bool,
}

impl AccessContext {
    /// Enumeration context (listings, capabilities documents).
    pub fn enumeration() -> Self {
        Self {
            direct_access: false,
            admin: false,
        }
    }

    /// Direct lookup of a single resource.
    pub fn direct() -> Self {
        Self {
            direct_access: true,
            admin: false,
        }
    }

    /// Snapshot of the calling thread's admin request state.
    pub fn current(direct_access: bool) -> Self {
        Self {
            direct_access,
            admin: AdminRequest::is_active(),
        }
    }

    pub fn with_admin(mut self, admin: bool) -> Self {
        self.admin = admin;
        self
    }
}
