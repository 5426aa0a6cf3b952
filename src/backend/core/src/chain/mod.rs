//! Request filter chains and the path-to-chain router.

pub mod pattern;
pub mod request;
pub mod router;
pub mod validation;

pub use pattern::PathPattern;
pub use request::{
    default_chains, ChainKind, HttpMethod, RequestFilterChain, RequestTarget, ANONYMOUS_FILTER,
};
pub use router::{ChainTable, FilterChainRouter, ResolvedChain};
pub use validation::{validate_chain, validate_replacement, validate_table};
