//! Catalog descriptors and visibility filters.
//!
//! The catalog itself lives elsewhere. These are the identity-only views of
//! its entities that access evaluation needs.

pub mod filter;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use filter::{CatalogFilter, CatalogFilters, PredicateFilter, WorkspaceScopeFilter};

/// Kind of published resource. Determines which access limits apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    #[default]
    FeatureType,
    Coverage,
    WmsLayer,
    WmtsLayer,
    Other,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::FeatureType => "feature_type",
            Self::Coverage => "coverage",
            Self::WmsLayer => "wms_layer",
            Self::WmtsLayer => "wmts_layer",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkspaceRef {
    pub name: String,
}

impl WorkspaceRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A published resource (feature type, coverage, cascaded layer).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceRef {
    pub workspace: String,
    pub name: String,
    #[serde(default)]
    pub kind: ResourceKind,
}

impl ResourceRef {
    pub fn new(workspace: impl Into<String>, name: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            workspace: workspace.into(),
            name: name.into(),
            kind,
        }
    }

    /// `workspace:name`
    pub fn prefixed_name(&self) -> String {
        format!("{}:{}", self.workspace, self.name)
    }
}

/// A layer publishing one resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerRef {
    pub name: String,
    pub resource: ResourceRef,
}

impl LayerRef {
    pub fn new(name: impl Into<String>, resource: ResourceRef) -> Self {
        Self {
            name: name.into(),
            resource,
        }
    }

    /// Layer named after a feature type in `workspace`.
    pub fn feature_type(workspace: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(name.clone(), ResourceRef::new(workspace, name, ResourceKind::FeatureType))
    }

    pub fn workspace(&self) -> &str {
        &self.resource.workspace
    }
}

/// A named group of layers. Global groups have no workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerGroupRef {
    pub workspace: Option<String>,
    pub name: String,
    #[serde(default)]
    pub layers: Vec<LayerRef>,
}

impl LayerGroupRef {
    pub fn new(workspace: Option<String>, name: impl Into<String>, layers: Vec<LayerRef>) -> Self {
        Self {
            workspace,
            name: name.into(),
            layers,
        }
    }
}

/// A style. Global styles have no workspace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StyleRef {
    pub workspace: Option<String>,
    pub name: String,
}

impl StyleRef {
    pub fn new(workspace: Option<String>, name: impl Into<String>) -> Self {
        Self {
            workspace,
            name: name.into(),
        }
    }
}

/// Any catalog entity access can be evaluated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogTarget<'a> {
    Workspace(&'a WorkspaceRef),
    Layer(&'a LayerRef),
    Resource(&'a ResourceRef),
    LayerGroup(&'a LayerGroupRef),
    Style(&'a StyleRef),
}

impl CatalogTarget<'_> {
    pub fn name(&self) -> &str {
        match self {
            Self::Workspace(ws) => &ws.name,
            Self::Layer(layer) => &layer.name,
            Self::Resource(resource) => &resource.name,
            Self::LayerGroup(group) => &group.name,
            Self::Style(style) => &style.name,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Workspace(_) => "workspace",
            Self::Layer(_) => "layer",
            Self::Resource(_) => "resource",
            Self::LayerGroup(_) => "layer_group",
            Self::Style(_) => "style",
        }
    }
}
