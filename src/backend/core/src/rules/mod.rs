//! Role-based data access rules.

pub mod access_manager;
pub mod principal;
pub mod rule;
pub mod tree;

pub use access_manager::RuleAccessManager;
pub use principal::{Principal, RoleId, UserId, ADMIN_ROLE, ANONYMOUS_ROLE};
pub use rule::{AccessMode, AccessRules, DataAccessRule};
pub use tree::{SecureTree, SecureTreeNode};
