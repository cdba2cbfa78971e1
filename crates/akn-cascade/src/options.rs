//! Options for expansion and generation

use serde::{Deserialize, Serialize};

/// How recursion treats element types met more than once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePolicy {
    /// Each type is processed at most once per expansion
    #[default]
    OncePerExpansion,
    /// Types may be revisited along different paths up to this depth
    MaxDepth(usize),
}

/// Options for [`crate::expand_element`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpansionOptions {
    /// Identity attributes added to every inserted element that supports them
    pub identity_attributes: Vec<String>,

    /// Mark automatically added identity attributes as required
    pub identity_required: bool,

    /// Depth past which an element with unmet requirements is an error
    pub max_depth: usize,

    pub cycle_policy: CyclePolicy,

    /// Also add optional attributes to inserted elements
    pub include_optional_attributes: bool,
}

impl Default for ExpansionOptions {
    fn default() -> Self {
        Self {
            identity_attributes: Vec::new(),
            identity_required: false,
            max_depth: 64,
            cycle_policy: CyclePolicy::OncePerExpansion,
            include_optional_attributes: false,
        }
    }
}

/// Options for [`crate::generate`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateOptions {
    pub expansion: ExpansionOptions,

    /// Also list optional attributes on every generated element
    pub include_optional_attributes: bool,

    /// Re-expansion passes before giving up on a fixed point
    pub max_passes: usize,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            expansion: ExpansionOptions::default(),
            include_optional_attributes: false,
            max_passes: 16,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_from_yaml() {
        let options: ExpansionOptions =
            serde_yaml::from_str("identity_attributes: [eId]\ncycle_policy:\n  max_depth: 8\n")
                .unwrap();
        assert_eq!(options.identity_attributes, vec!["eId"]);
        assert_eq!(options.cycle_policy, CyclePolicy::MaxDepth(8));
        assert_eq!(options.max_depth, 64);

        let options: ExpansionOptions = serde_yaml::from_str("cycle_policy: once_per_expansion\n").unwrap();
        assert_eq!(options.cycle_policy, CyclePolicy::OncePerExpansion);
    }
}
