//! Per-resource access limits.
//!
//! An [`AccessLimits`] value pairs the catalog mode with a restriction payload
//! whose shape depends on the kind of resource it guards. Limits are built
//! fresh for each decision and never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::level::CatalogMode;

// ═══════════════════════════════════════════════════════════════════════════════
// DataFilter
// ═══════════════════════════════════════════════════════════════════════════════

/// Row-level filter attached to data limits.
///
/// Expressions are opaque to this crate; the serving layer interprets them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataFilter {
    #[default]
    Include,
    Exclude,
    Expression(String),
}

impl DataFilter {
    pub fn from_allowed(allowed: bool) -> Self {
        if allowed {
            Self::Include
        } else {
            Self::Exclude
        }
    }

    /// Whether any data at all can pass this filter.
    pub fn admits_any(&self) -> bool {
        !matches!(self, Self::Exclude)
    }

    pub fn is_include(&self) -> bool {
        matches!(self, Self::Include)
    }
}

impl fmt::Display for DataFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Include => f.write_str("INCLUDE"),
            Self::Exclude => f.write_str("EXCLUDE"),
            Self::Expression(expr) => f.write_str(expr),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Restriction
// ═══════════════════════════════════════════════════════════════════════════════

/// Resource-kind specific restriction payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Restriction {
    Workspace {
        readable: bool,
        writable: bool,
        adminable: bool,
    },
    /// Resource of a kind with no dedicated payload.
    Data { read_filter: DataFilter },
    Vector {
        read_filter: DataFilter,
        write_filter: DataFilter,
        /// `None` means every attribute.
        read_attributes: Option<Vec<String>>,
        write_attributes: Option<Vec<String>>,
    },
    Coverage {
        read_filter: DataFilter,
        raster_filter: Option<String>,
    },
    Wms {
        read_filter: DataFilter,
        allow_feature_info: bool,
    },
    Wmts { read_filter: DataFilter },
    LayerGroup {
        /// Members left in a readable group. `None` when the group itself
        /// was refused.
        allowed_layers: Option<Vec<String>>,
    },
    /// Style access is binary; the mode is the whole story.
    Style,
}

impl Restriction {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Workspace { .. } => "workspace",
            Self::Data { .. } => "data",
            Self::Vector { .. } => "vector",
            Self::Coverage { .. } => "coverage",
            Self::Wms { .. } => "wms",
            Self::Wmts { .. } => "wmts",
            Self::LayerGroup { .. } => "layer_group",
            Self::Style => "style",
        }
    }

    fn read_filter(&self) -> Option<&DataFilter> {
        match self {
            Self::Data { read_filter }
            | Self::Vector { read_filter, .. }
            | Self::Coverage { read_filter, .. }
            | Self::Wms { read_filter, .. }
            | Self::Wmts { read_filter } => Some(read_filter),
            _ => None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// AccessLimits
// ═══════════════════════════════════════════════════════════════════════════════

/// Catalog mode plus the restriction payload for one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessLimits {
    pub mode: CatalogMode,
    pub restriction: Restriction,
}

impl AccessLimits {
    pub fn new(mode: CatalogMode, restriction: Restriction) -> Self {
        Self { mode, restriction }
    }

    pub fn workspace(mode: CatalogMode, readable: bool, writable: bool, adminable: bool) -> Self {
        Self::new(
            mode,
            Restriction::Workspace {
                readable,
                writable,
                adminable,
            },
        )
    }

    pub fn data(mode: CatalogMode, read_filter: DataFilter) -> Self {
        Self::new(mode, Restriction::Data { read_filter })
    }

    pub fn vector(mode: CatalogMode, read_filter: DataFilter, write_filter: DataFilter) -> Self {
        Self::new(
            mode,
            Restriction::Vector {
                read_filter,
                write_filter,
                read_attributes: None,
                write_attributes: None,
            },
        )
    }

    pub fn coverage(mode: CatalogMode, read_filter: DataFilter) -> Self {
        Self::new(
            mode,
            Restriction::Coverage {
                read_filter,
                raster_filter: None,
            },
        )
    }

    pub fn wms(mode: CatalogMode, read_filter: DataFilter) -> Self {
        Self::new(
            mode,
            Restriction::Wms {
                read_filter,
                allow_feature_info: true,
            },
        )
    }

    pub fn wmts(mode: CatalogMode, read_filter: DataFilter) -> Self {
        Self::new(mode, Restriction::Wmts { read_filter })
    }

    pub fn layer_group(mode: CatalogMode, allowed_layers: Option<Vec<String>>) -> Self {
        Self::new(mode, Restriction::LayerGroup { allowed_layers })
    }

    pub fn style(mode: CatalogMode) -> Self {
        Self::new(mode, Restriction::Style)
    }

    /// Whether the limits leave anything readable.
    ///
    /// A layer group is readable when it carries its remaining members. Style
    /// limits only exist when access was refused.
    pub fn can_read(&self) -> bool {
        match &self.restriction {
            Restriction::Workspace {
                readable,
                adminable,
                ..
            } => *readable || *adminable,
            Restriction::LayerGroup { allowed_layers } => allowed_layers.is_some(),
            Restriction::Style => false,
            other => other.read_filter().map_or(true, DataFilter::admits_any),
        }
    }

    /// Whether the limits allow modification. Only vector data is writable.
    pub fn can_write(&self) -> bool {
        match &self.restriction {
            Restriction::Workspace {
                writable,
                adminable,
                ..
            } => *writable || *adminable,
            Restriction::Vector { write_filter, .. } => write_filter.admits_any(),
            _ => false,
        }
    }

    /// Adminable flag for workspace limits, `None` for every other kind.
    pub fn adminable(&self) -> Option<bool> {
        match &self.restriction {
            Restriction::Workspace { adminable, .. } => Some(*adminable),
            _ => None,
        }
    }

    pub fn allowed_layers(&self) -> Option<&[String]> {
        match &self.restriction {
            Restriction::LayerGroup {
                allowed_layers: Some(layers),
            } => Some(layers),
            _ => None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_limits() {
        let ro = AccessLimits::vector(CatalogMode::Hide, DataFilter::Include, DataFilter::Exclude);
        assert!(ro.can_read());
        assert!(!ro.can_write());

        let none = AccessLimits::vector(CatalogMode::Hide, DataFilter::Exclude, DataFilter::Exclude);
        assert!(!none.can_read());

        let filtered = AccessLimits::vector(
            CatalogMode::Challenge,
            DataFilter::Expression("owner = 'me'".into()),
            DataFilter::Expression("owner = 'me'".into()),
        );
        assert!(filtered.can_read());
        assert!(filtered.can_write());
    }

    #[test]
    fn test_non_vector_data_is_never_writable() {
        for limits in [
            AccessLimits::data(CatalogMode::Hide, DataFilter::Include),
            AccessLimits::coverage(CatalogMode::Hide, DataFilter::Include),
            AccessLimits::wms(CatalogMode::Hide, DataFilter::Include),
            AccessLimits::wmts(CatalogMode::Hide, DataFilter::Include),
        ] {
            assert!(limits.can_read(), "{}", limits.restriction.kind_name());
            assert!(!limits.can_write(), "{}", limits.restriction.kind_name());
        }
    }

    #[test]
    fn test_workspace_admin_implies_read_write() {
        let limits = AccessLimits::workspace(CatalogMode::Mixed, false, false, true);
        assert!(limits.can_read());
        assert!(limits.can_write());
        assert_eq!(limits.adminable(), Some(true));

        let read_only = AccessLimits::workspace(CatalogMode::Mixed, true, false, false);
        assert!(read_only.can_read());
        assert!(!read_only.can_write());
    }

    #[test]
    fn test_group_and_style_limits_read() {
        let trimmed = AccessLimits::layer_group(CatalogMode::Hide, Some(vec!["roads".into()]));
        assert!(trimmed.can_read());
        assert_eq!(trimmed.allowed_layers(), Some(&["roads".to_string()][..]));

        let refused = AccessLimits::layer_group(CatalogMode::Hide, None);
        assert!(!refused.can_read());
        assert_eq!(refused.allowed_layers(), None);
        assert!(!AccessLimits::style(CatalogMode::Hide).can_read());
        assert_eq!(AccessLimits::style(CatalogMode::Hide).adminable(), None);
    }

    #[test]
    fn test_mode_is_carried_unchanged() {
        let limits = AccessLimits::wms(CatalogMode::Challenge, DataFilter::Exclude);
        assert_eq!(limits.mode, CatalogMode::Challenge);
        let json = serde_json::to_value(&limits).unwrap();
        assert_eq!(json["mode"], "CHALLENGE");
        assert_eq!(json["restriction"]["kind"], "wms");
    }
}
