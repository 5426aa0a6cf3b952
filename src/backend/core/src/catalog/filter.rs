//! Catalog visibility filters.
//!
//! A filter decides whether an entity is hidden from enumeration. Every
//! predicate defaults to "not hidden", so implementations override only what
//! they restrict. A [`CatalogFilters`] list hides an entity as soon as any of
//! its members does.

use std::fmt;
use std::sync::Arc;

use super::{LayerGroupRef, LayerRef, ResourceRef, StyleRef, WorkspaceRef};

// ═══════════════════════════════════════════════════════════════════════════════
// CatalogFilter
// ═══════════════════════════════════════════════════════════════════════════════

/// Visibility predicates over catalog entities. Predicates must be pure.
pub trait CatalogFilter: Send + Sync {
    fn hide_workspace(&self, _workspace: &WorkspaceRef) -> bool {
        false
    }

    fn hide_layer(&self, _layer: &LayerRef) -> bool {
        false
    }

    fn hide_resource(&self, _resource: &ResourceRef) -> bool {
        false
    }

    fn hide_layer_group(&self, _group: &LayerGroupRef) -> bool {
        false
    }

    fn hide_style(&self, _style: &StyleRef) -> bool {
        false
    }
}

type Predicate<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;

// ═══════════════════════════════════════════════════════════════════════════════
// PredicateFilter
// ═══════════════════════════════════════════════════════════════════════════════

/// Filter assembled from closures. Unset predicates hide nothing.
#[derive(Default)]
pub struct PredicateFilter {
    workspace: Option<Predicate<WorkspaceRef>>,
    layer: Option<Predicate<LayerRef>>,
    resource: Option<Predicate<ResourceRef>>,
    layer_group: Option<Predicate<LayerGroupRef>>,
    style: Option<Predicate<StyleRef>>,
}

impl PredicateFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_workspace(mut self, f: impl Fn(&WorkspaceRef) -> bool + Send + Sync + 'static) -> Self {
        self.workspace = Some(Box::new(f));
        self
    }

    pub fn on_layer(mut self, f: impl Fn(&LayerRef) -> bool + Send + Sync + 'static) -> Self {
        self.layer = Some(Box::new(f));
        self
    }

    pub fn on_resource(mut self, f: impl Fn(&ResourceRef) -> bool + Send + Sync + 'static) -> Self {
        self.resource = Some(Box::new(f));
        self
    }

    pub fn on_layer_group(
        mut self,
        f: impl Fn(&LayerGroupRef) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.layer_group = Some(Box::new(f));
        self
    }

    pub fn on_style(mut self, f: impl Fn(&StyleRef) -> bool + Send + Sync + 'static) -> Self {
        self.style = Some(Box::new(f));
        self
    }
}

fn eval<T>(predicate: &Option<Predicate<T>>, value: &T) -> bool {
    predicate.as_ref().map_or(false, |p| p(value))
}

impl CatalogFilter for PredicateFilter {
    fn hide_workspace(&self, workspace: &WorkspaceRef) -> bool {
        eval(&self.workspace, workspace)
    }

    fn hide_layer(&self, layer: &LayerRef) -> bool {
        eval(&self.layer, layer)
    }

    fn hide_resource(&self, resource: &ResourceRef) -> bool {
        eval(&self.resource, resource)
    }

    fn hide_layer_group(&self, group: &LayerGroupRef) -> bool {
        eval(&self.layer_group, group)
    }

    fn hide_style(&self, style: &StyleRef) -> bool {
        eval(&self.style, style)
    }
}

impl fmt::Debug for PredicateFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredicateFilter")
            .field("workspace", &self.workspace.is_some())
            .field("layer", &self.layer.is_some())
            .field("resource", &self.resource.is_some())
            .field("layer_group", &self.layer_group.is_some())
            .field("style", &self.style.is_some())
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// WorkspaceScopeFilter
// ═══════════════════════════════════════════════════════════════════════════════

/// Hides everything outside one workspace, as when a request is addressed to
/// a workspace-specific virtual service. Global groups and styles stay
/// visible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceScopeFilter {
    workspace: String,
}

impl WorkspaceScopeFilter {
    pub fn new(workspace: impl Into<String>) -> Self {
        Self {
            workspace: workspace.into(),
        }
    }

    pub fn workspace(&self) -> &str {
        &self.workspace
    }

    fn outside(&self, workspace: Option<&str>) -> bool {
        workspace.map_or(false, |ws| ws != self.workspace)
    }
}

impl CatalogFilter for WorkspaceScopeFilter {
    fn hide_workspace(&self, workspace: &WorkspaceRef) -> bool {
        workspace.name != self.workspace
    }

    fn hide_layer(&self, layer: &LayerRef) -> bool {
        self.outside(Some(layer.workspace()))
    }

    fn hide_resource(&self, resource: &ResourceRef) -> bool {
        self.outside(Some(&resource.workspace))
    }

    fn hide_layer_group(&self, group: &LayerGroupRef) -> bool {
        self.outside(group.workspace.as_deref())
    }

    fn hide_style(&self, style: &StyleRef) -> bool {
        self.outside(style.workspace.as_deref())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CatalogFilters
// ═══════════════════════════════════════════════════════════════════════════════

/// Ordered list of filters combined with a short-circuit OR.
#[derive(Clone, Default)]
pub struct CatalogFilters {
    filters: Vec<Arc<dyn CatalogFilter>>,
}

impl CatalogFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, filter: Arc<dyn CatalogFilter>) {
        self.filters.push(filter);
    }

    pub fn with(mut self, filter: impl CatalogFilter + 'static) -> Self {
        self.filters.push(Arc::new(filter));
        self
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Layers not hidden by any filter, in input order.
    pub fn visible_layers<'a, I>(&self, layers: I) -> Vec<&'a LayerRef>
    where
        I: IntoIterator<Item = &'a LayerRef>,
    {
        layers.into_iter().filter(|l| !self.hide_layer(l)).collect()
    }

    /// Workspaces not hidden by any filter, in input order.
    pub fn visible_workspaces<'a, I>(&self, workspaces: I) -> Vec<&'a WorkspaceRef>
    where
        I: IntoIterator<Item = &'a WorkspaceRef>,
    {
        workspaces
            .into_iter()
            .filter(|ws| !self.hide_workspace(ws))
            .collect()
    }
}

impl CatalogFilter for CatalogFilters {
    fn hide_workspace(&self, workspace: &WorkspaceRef) -> bool {
        self.filters.iter().any(|f| f.hide_workspace(workspace))
    }

    fn hide_layer(&self, layer: &LayerRef) -> bool {
        self.filters.iter().any(|f| f.hide_layer(layer))
    }

    fn hide_resource(&self, resource: &ResourceRef) -> bool {
        self.filters.iter().any(|f| f.hide_resource(resource))
    }

    fn hide_layer_group(&self, group: &LayerGroupRef) -> bool {
        self.filters.iter().any(|f| f.hide_layer_group(group))
    }

    fn hide_style(&self, style: &StyleRef) -> bool {
        self.filters.iter().any(|f| f.hide_style(style))
    }
}

impl fmt::Debug for CatalogFilters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogFilters")
            .field("len", &self.filters.len())
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
