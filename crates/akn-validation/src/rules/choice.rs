//! Choice groups: mandatory groups need a member, exclusive groups need a
//! `choice` block

use super::{child_path, children_path, children_range, choice_path};
use akn_profile::{Diagnostic, ElementNode, Fix, ProfileDocument};
use akn_schema::{ChoiceGroup, SchemaModel};

pub const REQUIRED_GROUP_EMPTY: &str = "choice.required-group-empty";
pub const INCOMPLETE_BRANCHES: &str = "choice.incomplete-branches";
pub const BRANCH_INVALID_CHILD: &str = "choice.branch-invalid-child";
pub const BRANCH_OVERLAP: &str = "choice.branch-overlap";
pub const EXCLUSIVE_BRANCH_CONFLICT: &str = "choice.exclusive-branch-conflict";

/// Members listed per branch in messages
const EXAMPLES_PER_BRANCH: usize = 5;

pub fn check(document: &ProfileDocument, schema: &SchemaModel) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    for element in &document.elements {
        check_incomplete(element, &mut out);
        check_overlap(element, &mut out);
        if !schema.has_element(&element.name) {
            continue;
        }
        check_required_groups(element, schema, &mut out);
        check_branch_children(element, schema, &mut out);
        check_exclusive(element, schema, &mut out);
    }
    out
}

fn describe(group: &ChoiceGroup) -> String {
    group
        .branches
        .iter()
        .map(|branch| {
            let label = branch.label.as_deref().unwrap_or(&branch.id);
            let mut members: Vec<&str> = branch.members.iter().map(String::as_str).collect();
            members.sort_unstable();
            let more = members.len().saturating_sub(EXAMPLES_PER_BRANCH);
            members.truncate(EXAMPLES_PER_BRANCH);
            if more > 0 {
                format!("{label}: {} (+{more} more)", members.join(", "))
            } else {
                format!("{label}: {}", members.join(", "))
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}

fn check_required_groups(element: &ElementNode, schema: &SchemaModel, out: &mut Vec<Diagnostic>) {
    for usage in schema.choice_groups(&element.name) {
        if !usage.is_mandatory() || usage.group.members().any(|m| element.references(m)) {
            continue;
        }
        let mut diagnostic = Diagnostic::error(
            REQUIRED_GROUP_EMPTY,
            format!(
                "<{}> requires at least one child from choice group '{}' but none are declared. Available: [{}]",
                element.name,
                usage.group.id,
                describe(&usage.group)
            ),
            children_path(&element.name),
            children_range(element),
        );
        if let Some(first) = usage.group.members().next() {
            diagnostic = diagnostic.with_fix(Fix::AddChild {
                parent: element.name.clone(),
                child: first.to_string(),
            });
        }
        out.push(diagnostic);
    }
}

fn check_incomplete(element: &ElementNode, out: &mut Vec<Diagnostic>) {
    let Some(range) = element.choice_range else {
        return;
    };
    let count = element.choice.len();
    if count >= 2 {
        return;
    }
    let message = if count == 0 {
        format!(
            "<{}> has a 'choice' with no children. Add at least 2 exclusive child elements.",
            element.name
        )
    } else {
        format!(
            "<{}> has a 'choice' with only 1 child. A choice requires at least 2 exclusive children.",
            element.name
        )
    };
    out.push(Diagnostic::error(
        INCOMPLETE_BRANCHES,
        message,
        format!("{}.choice", children_path(&element.name)),
        range,
    ));
}

fn check_branch_children(element: &ElementNode, schema: &SchemaModel, out: &mut Vec<Diagnostic>) {
    let parent = element.name.as_str();
    for entry in &element.choice {
        if !schema.has_element(&entry.name) || schema.is_valid_child(parent, &entry.name) {
            continue;
        }
        out.push(
            Diagnostic::error(
                BRANCH_INVALID_CHILD,
                format!("<{}> is not a valid child of <{parent}>.", entry.name),
                choice_path(parent, &entry.name),
                entry.range,
            )
            .with_fix(Fix::RemoveEntry {
                name: entry.name.clone(),
            }),
        );
    }
}

fn check_overlap(element: &ElementNode, out: &mut Vec<Diagnostic>) {
    for entry in &element.choice {
        if element.child(&entry.name).is_none() {
            continue;
        }
        out.push(Diagnostic::error(
            BRANCH_OVERLAP,
            format!(
                "<{}> appears in both 'children' and 'choice' of <{}>. An element cannot be both always present and exclusive.",
                entry.name, element.name
            ),
            choice_path(&element.name, &entry.name),
            entry.range,
        ));
    }
}

fn check_exclusive(element: &ElementNode, schema: &SchemaModel, out: &mut Vec<Diagnostic>) {
    if element.children.is_empty() {
        return;
    }
    for usage in schema.choice_groups(&element.name) {
        if !usage.is_exclusive() {
            continue;
        }
        let active: Vec<(&str, Vec<&str>)> = usage
            .group
            .branches
            .iter()
            .filter_map(|branch| {
                let mut present: Vec<&str> = branch
                    .members
                    .iter()
                    .map(String::as_str)
                    .filter(|m| element.child(m).is_some())
                    .collect();
                if present.is_empty() {
                    return None;
                }
                present.sort_unstable();
                Some((branch.label.as_deref().unwrap_or(&branch.id), present))
            })
            .collect();

        let Some(((first_label, _), rest)) = active.split_first() else {
            continue;
        };
        for (label, present) in rest {
            let conflict = present[0];
            let range = element.child(conflict).map_or(element.range, |c| c.range);
            out.push(Diagnostic::error(
                EXCLUSIVE_BRANCH_CONFLICT,
                format!(
                    "<{}> has an exclusive choice group: '{first_label}' and '{label}' cannot both appear in 'children'. Use 'choice' to express exclusive branches. Conflicting: {}",
                    element.name,
                    present.join(", ")
                ),
                child_path(&element.name, conflict),
                range,
            ));
        }
    }
}
