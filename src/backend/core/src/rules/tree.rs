//! Hierarchical rule index.
//!
//! The root holds `*.*` rules, its children are workspaces and their children
//! are layers (or workspace-scoped layer groups). A node without a rule for
//! some access mode inherits the roles authorized by its parent.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::warn;

use super::principal::{Principal, RoleId};
use super::rule::{AccessMode, AccessRules};

#[derive(Debug, Clone, Default)]
pub struct SecureTreeNode {
    children: BTreeMap<String, SecureTreeNode>,
    explicit: HashMap<AccessMode, BTreeSet<RoleId>>,
    effective: HashMap<AccessMode, BTreeSet<RoleId>>,
    depth: usize,
}

impl SecureTreeNode {
    /// 0 for the root, 1 for a workspace, 2 for a layer.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn child(&self, name: &str) -> Option<&SecureTreeNode> {
        self.children.get(name)
    }

    pub fn children(&self) -> impl Iterator<Item = (&str, &SecureTreeNode)> {
        self.children.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn authorized_roles(&self, mode: AccessMode) -> Option<&BTreeSet<RoleId>> {
        self.effective.get(&mode)
    }

    /// Whether `principal` may perform `mode` at this node.
    pub fn can_access(&self, principal: &Principal, mode: AccessMode, admin_role: &RoleId) -> bool {
        if principal.has_role(admin_role) {
            return true;
        }
        match self.effective.get(&mode) {
            None => false,
            Some(roles) => roles.iter().any(|r| r.is_any() || principal.has_role(r)),
        }
    }

    /// True if this node or any node below it grants `mode`.
    pub fn can_access_any_descendant(
        &self,
        principal: &Principal,
        mode: AccessMode,
        admin_role: &RoleId,
    ) -> bool {
        self.can_access(principal, mode, admin_role)
            || self
                .children
                .values()
                .any(|c| c.can_access_any_descendant(principal, mode, admin_role))
    }

    fn propagate(&mut self, inherited: &HashMap<AccessMode, BTreeSet<RoleId>>, depth: usize) {
        self.depth = depth;
        self.effective = inherited.clone();
        for (mode, roles) in &self.explicit {
            self.effective.insert(*mode, roles.clone());
        }
        let effective = self.effective.clone();
        for child in self.children.values_mut() {
            child.propagate(&effective, depth + 1);
        }
    }
}

/// Rule tree built from an [`AccessRules`] set.
#[derive(Debug, Clone, Default)]
pub struct SecureTree {
    root: SecureTreeNode,
}

impl SecureTree {
    pub fn build(rules: &AccessRules) -> Self {
        let mut root = SecureTreeNode::default();

        for rule in &rules.rules {
            let mut node = &mut root;
            for segment in rule.path() {
                node = node.children.entry(segment.to_string()).or_default();
            }
            if node.explicit.contains_key(&rule.mode) {
                warn!(rule = %rule, "Rule overrides an earlier rule for the same resource");
            }
            node.explicit.insert(rule.mode, rule.roles.clone());
        }

        // Unconfigured read and write at the root mean "everyone".
        for mode in [AccessMode::Read, AccessMode::Write] {
            root.explicit
                .entry(mode)
                .or_insert_with(|| BTreeSet::from([RoleId::any()]));
        }
        root.explicit.entry(AccessMode::Admin).or_default();

        root.propagate(&HashMap::new(), 0);
        Self { root }
    }

    pub fn root(&self) -> &SecureTreeNode {
        &self.root
    }

    /// The most specific node along `path`.
    pub fn deepest_node(&self, path: &[&str]) -> &SecureTreeNode {
        let mut node = &self.root;
        for segment in path {
            match node.children.get(*segment) {
                Some(child) => node = child,
                None => break,
            }
        }
        node
    }
}
