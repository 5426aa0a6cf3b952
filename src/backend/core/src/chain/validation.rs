//! Validation of filter chains and routing tables.
//!
//! Runs before any change reaches the router, so a rejected change leaves
//! the table as it was.

use std::collections::HashSet;

use super::request::{RequestFilterChain, ANONYMOUS_FILTER};
use crate::error::{GuardError, Result};

/// Check a single chain definition.
pub fn validate_chain(chain: &RequestFilterChain) -> Result<()> {
    if chain.name().trim().is_empty() {
        return Err(GuardError::chain_name_mandatory());
    }

    if chain.patterns().is_empty() {
        return Err(GuardError::empty_pattern_list(chain.name()));
    }

    if let Some(role_filter) = chain.role_filter_name() {
        if role_filter.trim().is_empty() {
            return Err(GuardError::invalid_chain_reference(chain.name(), "role_filter_name"));
        }
    }

    if chain.is_constant() {
        return Ok(());
    }

    if !chain.is_disabled() && chain.filter_names().is_empty() {
        return Err(GuardError::empty_filter_chain(chain.name()));
    }

    if chain.interceptor_name().map_or(true, |n| n.trim().is_empty()) {
        return Err(GuardError::invalid_chain_reference(chain.name(), "interceptor_name"));
    }

    if chain
        .exception_translation_name()
        .map_or(true, |n| n.trim().is_empty())
    {
        return Err(GuardError::invalid_chain_reference(
            chain.name(),
            "exception_translation_name",
        ));
    }

    let filters = chain.filter_names();
    if let Some(index) = filters.iter().position(|f| f == ANONYMOUS_FILTER) {
        if index != filters.len() - 1 {
            return Err(GuardError::anonymous_not_last(chain.name()));
        }
    }

    Ok(())
}

/// Check every chain in a table and that chain names are unique.
pub fn validate_table(chains: &[RequestFilterChain]) -> Result<()> {
    let mut names = HashSet::with_capacity(chains.len());
    for chain in chains {
        validate_chain(chain)?;
        if !names.insert(chain.name()) {
            return Err(GuardError::duplicate_chain_name(chain.name()));
        }
    }
    Ok(())
}

/// Check that replacing `current` with `proposed` keeps every non-removable
/// chain present and non-removable, and leaves constant chains untouched.
pub fn validate_replacement(
    current: &[RequestFilterChain],
    proposed: &[RequestFilterChain],
) -> Result<()> {
    for old in current {
        match proposed.iter().find(|c| c.name() == old.name()) {
            None if !old.can_be_removed() => {
                return Err(GuardError::chain_not_removable(old.name()));
            }
            Some(new) if old.is_constant() && new != old => {
                return Err(GuardError::immutable_chain(old.name()));
            }
            Some(new) if !old.can_be_removed() && new.can_be_removed() => {
                return Err(GuardError::chain_not_removable(old.name()));
            }
            _ => {}
        }
    }
    validate_table(proposed)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::request::default_chains;
    use crate::error::ErrorCode;

    fn chain(name: &str, patterns: &[&str], filters: &[&str]) -> RequestFilterChain {
        RequestFilterChain::variable(name, patterns.iter().copied(), filters.iter().copied()).unwrap()
    }

    #[test]
    fn test_valid_chain() {
        assert!(validate_chain(&chain("rest", &["/rest/**"], &["basic", "anonymous"])).is_ok());
    }

    #[test]
    fn test_name_mandatory() {
        let err = validate_chain(&chain("  ", &["/a"], &["basic"])).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ChainNameMandatory);
    }

    #[test]
    fn test_patterns_mandatory() {
        let err = validate_chain(&chain("empty", &[], &["basic"])).unwrap_err();
        assert_eq!(err.code(), ErrorCode::EmptyPatternList);
    }

    #[test]
    fn test_filters_mandatory_unless_disabled() {
        let err = validate_chain(&chain("bare", &["/a"], &[])).unwrap_err();
        assert_eq!(err.code(), ErrorCode::EmptyFilterChain);
        assert!(validate_chain(&chain("bare", &["/a"], &[]).disabled(true)).is_ok());
    }

    #[test]
    fn test_anonymous_must_be_last() {
        let err = validate_chain(&chain("web", &["/web/**"], &["anonymous", "form"])).unwrap_err();
        assert_eq!(err.code(), ErrorCode::AnonymousNotLast);
    }

    #[test]
    fn test_blank_references_rejected() {
        let err = validate_chain(&chain("a", &["/a"], &["basic"]).interceptor(" ")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidChainReference);
        let err = validate_chain(&chain("a", &["/a"], &["basic"]).role_filter("")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidChainReference);
    }

    #[test]
    fn test_unique_names() {
        let table = vec![chain("a", &["/a"], &["basic"]), chain("a", &["/b"], &["basic"])];
        let err = validate_table(&table).unwrap_err();
        assert_eq!(err.code(), ErrorCode::DuplicateChainName);
    }

    #[test]
    fn test_replacement_keeps_non_removable() {
        let current = default_chains().unwrap();
        let proposed: Vec<_> = current.iter().filter(|c| c.name() != "rest").cloned().collect();
        let err = validate_replacement(&current, &proposed).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ChainNotRemovable);

        assert!(validate_replacement(&current, &current).is_ok());
    }

    #[test]
    fn test_replacement_keeps_lock_flag() {
        let current = default_chains().unwrap();
        let mut proposed = current.clone();
        let index = proposed.iter().position(|c| c.name() == "default").unwrap();
        proposed[index] = chain("default", &["/**"], &["basic"]);
        let err = validate_replacement(&current, &proposed).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ChainNotRemovable);

        proposed[index] = chain("default", &["/**"], &["basic"]).removable(false);
        assert!(validate_replacement(&current, &proposed).is_ok());
    }

    #[test]
    fn test_replacement_cannot_edit_constant() {
        let current = default_chains().unwrap();
        let mut proposed = current.clone();
        proposed[0] = RequestFilterChain::constant("webLogin", ["/login"], ["form"]).unwrap();
        let err = validate_replacement(&current, &proposed).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ImmutableChain);
    }
}
