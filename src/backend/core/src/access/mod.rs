//! Access levels, limits and the decision function.

pub mod context;
pub mod level;
pub mod limits;
pub mod policy;

pub use context::AccessContext;
pub use level::{decide, AccessLevel, CatalogMode, Decision, Response};
pub use limits::{AccessLimits, DataFilter, Restriction};
pub use policy::WrapperPolicy;
