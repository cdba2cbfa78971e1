//! Rule modules
//!
//! Each module is a plain function from a document and a schema to a list of
//! diagnostics. Modules never depend on each other's output.

pub mod choice;
pub mod datatype;
pub mod identity;
pub mod strictness;
pub mod structure;
pub mod vocabulary;

use akn_profile::{ElementNode, ProfileDocument, SourceRange};
use akn_schema::SchemaModel;

pub type RuleFn = fn(&ProfileDocument, &SchemaModel) -> Vec<akn_profile::Diagnostic>;

/// A named rule module
#[derive(Debug, Clone, Copy)]
pub struct RuleModule {
    /// Family name, also the prefix of every code it emits
    pub name: &'static str,

    /// Tiebreak when diagnostics share a position; parse diagnostics use 0
    pub priority: u8,

    pub check: RuleFn,
}

/// The six rule modules in execution order
#[must_use]
pub fn builtin() -> Vec<RuleModule> {
    vec![
        RuleModule {
            name: "vocabulary",
            priority: 1,
            check: vocabulary::check,
        },
        RuleModule {
            name: "structure",
            priority: 2,
            check: structure::check,
        },
        RuleModule {
            name: "datatype",
            priority: 3,
            check: datatype::check,
        },
        RuleModule {
            name: "identity",
            priority: 4,
            check: identity::check,
        },
        RuleModule {
            name: "strictness",
            priority: 5,
            check: strictness::check,
        },
        RuleModule {
            name: "choice",
            priority: 6,
            check: choice::check,
        },
    ]
}

pub(crate) fn element_path(element: &str) -> String {
    format!("profile.elements.{element}")
}

pub(crate) fn children_path(element: &str) -> String {
    format!("profile.elements.{element}.children")
}

pub(crate) fn child_path(element: &str, child: &str) -> String {
    format!("profile.elements.{element}.children.{child}")
}

pub(crate) fn choice_path(element: &str, child: &str) -> String {
    format!("profile.elements.{element}.children.choice.{child}")
}

pub(crate) fn attributes_path(element: &str) -> String {
    format!("profile.elements.{element}.attributes")
}

pub(crate) fn attribute_path(element: &str, attribute: &str) -> String {
    format!("profile.elements.{element}.attributes.{attribute}")
}

pub(crate) fn structure_path(element: &str, index: usize) -> String {
    format!("profile.elements.{element}.structure[{index}]")
}

/// Where block-level findings about an element's children are reported
pub(crate) fn children_range(element: &ElementNode) -> SourceRange {
    element
        .children_range
        .or(element.choice_range)
        .unwrap_or(element.range)
}

/// Whether the element declares a children or choice block
pub(crate) fn declares_children(element: &ElementNode) -> bool {
    !element.children.is_empty() || !element.choice.is_empty()
}
