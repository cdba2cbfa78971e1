//! Choice normalization
//!
//! Turns every `xs:choice` reachable from a complex type into a
//! [`ChoiceGroup`]. Groups are memoized per owning type or named group, so a
//! named group referenced from several places yields a single shared
//! instance.

use crate::model::{ChoiceBranch, ChoiceGroup, ChoiceUse, Occurs};
use crate::xsd::{Derivation, Particle, QName, RawComplexType, RawSchema};
use crate::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{trace, warn};

pub(crate) struct ChoiceNormalizer<'a> {
    raw: &'a RawSchema,
    by_type: HashMap<String, Vec<ChoiceUse>>,
    by_group: HashMap<String, Vec<ChoiceUse>>,
    group_members: HashMap<String, Vec<String>>,
    groups_in_progress: HashSet<String>,
    types_in_progress: HashSet<String>,
}

impl<'a> ChoiceNormalizer<'a> {
    pub(crate) fn new(raw: &'a RawSchema) -> Self {
        Self {
            raw,
            by_type: HashMap::new(),
            by_group: HashMap::new(),
            group_members: HashMap::new(),
            groups_in_progress: HashSet::new(),
            types_in_progress: HashSet::new(),
        }
    }

    /// Choice groups of a named complex type, including inherited ones
    pub(crate) fn for_type(&mut self, name: &str) -> Result<Vec<ChoiceUse>> {
        if let Some(cached) = self.by_type.get(name) {
            return Ok(cached.clone());
        }
        let raw = self.raw;
        let Some(ct) = raw.complex_types.get(name) else {
            // simple types have no content model
            return Ok(Vec::new());
        };
        if !self.types_in_progress.insert(name.to_string()) {
            return Err(Error::Derivation(format!(
                "type '{name}' derives from itself"
            )));
        }
        let uses = self.for_complex_type(name, ct);
        self.types_in_progress.remove(name);
        let uses = uses?;
        self.by_type.insert(name.to_string(), uses.clone());
        Ok(uses)
    }

    /// Choice groups of an anonymous complex type owned by `owner`
    pub(crate) fn for_complex_type(
        &mut self,
        owner: &str,
        ct: &RawComplexType,
    ) -> Result<Vec<ChoiceUse>> {
        let mut uses = Vec::new();
        if let Some((QName::Local(base), Derivation::Extension)) = &ct.base {
            uses.extend(self.for_type(base)?);
        }
        if let Some(content) = &ct.content {
            let mut counter = 0;
            self.discover(owner, content, Occurs::ONCE, &mut counter, &mut uses)?;
        }
        Ok(merge_uses(uses))
    }

    fn for_group(&mut self, name: &str) -> Result<Vec<ChoiceUse>> {
        if let Some(cached) = self.by_group.get(name) {
            return Ok(cached.clone());
        }
        let raw = self.raw;
        let Some(particle) = raw.groups.get(name) else {
            return Err(Error::unresolved("group", name, "content model"));
        };
        if !self.groups_in_progress.insert(name.to_string()) {
            warn!("Circular group reference through '{}'", name);
            return Ok(Vec::new());
        }
        let mut uses = Vec::new();
        let mut counter = 0;
        let result = self.discover(name, particle, Occurs::ONCE, &mut counter, &mut uses);
        self.groups_in_progress.remove(name);
        result?;

        let uses = merge_uses(uses);
        self.by_group.insert(name.to_string(), uses.clone());
        Ok(uses)
    }

    fn discover(
        &mut self,
        owner: &str,
        particle: &Particle,
        factor: Occurs,
        counter: &mut usize,
        out: &mut Vec<ChoiceUse>,
    ) -> Result<()> {
        match particle {
            Particle::Sequence { items, occurs } | Particle::All { items, occurs } => {
                let factor = factor.times(*occurs);
                for item in items {
                    self.discover(owner, item, factor, counter, out)?;
                }
            }
            Particle::Choice { items, occurs } => {
                let group = self.build_group(owner, *counter, items, *occurs)?;
                *counter += 1;
                if group.branches.is_empty() {
                    return Ok(());
                }
                trace!("Discovered choice group {}", group.id);
                out.push(ChoiceUse {
                    group: Arc::new(group),
                    occurs: factor.times(*occurs),
                });
            }
            Particle::Group { name, occurs } => {
                let factor = factor.times(*occurs);
                for usage in self.for_group(name)? {
                    out.push(ChoiceUse {
                        group: usage.group,
                        occurs: factor.times(usage.occurs),
                    });
                }
            }
            Particle::Element { .. } | Particle::Any => {}
        }
        Ok(())
    }

    fn build_group(
        &mut self,
        owner: &str,
        index: usize,
        items: &[Particle],
        occurs: Occurs,
    ) -> Result<ChoiceGroup> {
        let mut claimed = HashSet::new();
        let mut branches = Vec::new();

        for item in items {
            let mut members = Vec::new();
            let mut parts = Vec::new();
            self.branch_members(item, &mut members, &mut parts)?;

            let mut seen = HashSet::new();
            members.retain(|m| seen.insert(m.clone()) && !claimed.contains(m));
            if members.is_empty() {
                continue;
            }
            claimed.extend(members.iter().cloned());
            branches.push(ChoiceBranch {
                id: format!("branch_{}", branches.len()),
                label: if parts.is_empty() {
                    None
                } else {
                    Some(parts.join(" + "))
                },
                members,
            });
        }

        Ok(ChoiceGroup {
            id: format!("{owner}:choice_{index}"),
            owner: owner.to_string(),
            occurs,
            branches,
        })
    }

    fn branch_members(
        &mut self,
        particle: &Particle,
        members: &mut Vec<String>,
        parts: &mut Vec<String>,
    ) -> Result<()> {
        match particle {
            Particle::Element { name, .. } => {
                members.push(name.clone());
                parts.push(name.clone());
            }
            Particle::Group { name, .. } => {
                members.extend(self.members_of_group(name)?);
                parts.push(name.clone());
            }
            Particle::Sequence { items, .. }
            | Particle::Choice { items, .. }
            | Particle::All { items, .. } => {
                for item in items {
                    self.branch_members(item, members, parts)?;
                }
            }
            Particle::Any => {}
        }
        Ok(())
    }

    /// Element names reachable inside a named group, transitively
    fn members_of_group(&mut self, name: &str) -> Result<Vec<String>> {
        if let Some(cached) = self.group_members.get(name) {
            return Ok(cached.clone());
        }
        let mut visited = HashSet::new();
        let mut members = Vec::new();
        collect_group_members(self.raw, name, &mut visited, &mut members)?;
        self.group_members.insert(name.to_string(), members.clone());
        Ok(members)
    }
}

fn collect_group_members(
    raw: &RawSchema,
    name: &str,
    visited: &mut HashSet<String>,
    members: &mut Vec<String>,
) -> Result<()> {
    if !visited.insert(name.to_string()) {
        return Ok(());
    }
    let particle = raw
        .groups
        .get(name)
        .ok_or_else(|| Error::unresolved("group", name, "choice branch"))?;
    collect_particle_members(raw, particle, visited, members)
}

fn collect_particle_members(
    raw: &RawSchema,
    particle: &Particle,
    visited: &mut HashSet<String>,
    members: &mut Vec<String>,
) -> Result<()> {
    match particle {
        Particle::Element { name, .. } => {
            if !members.contains(name) {
                members.push(name.clone());
            }
        }
        Particle::Group { name, .. } => collect_group_members(raw, name, visited, members)?,
        Particle::Sequence { items, .. }
        | Particle::Choice { items, .. }
        | Particle::All { items, .. } => {
            for item in items {
                collect_particle_members(raw, item, visited, members)?;
            }
        }
        Particle::Any => {}
    }
    Ok(())
}

/// Collapse repeated uses of the same group into one, summing occurrences
fn merge_uses(uses: Vec<ChoiceUse>) -> Vec<ChoiceUse> {
    let mut merged: Vec<ChoiceUse> = Vec::with_capacity(uses.len());
    for usage in uses {
        if let Some(existing) = merged.iter_mut().find(|u| u.group.id == usage.group.id) {
            existing.occurs = existing.occurs.plus(usage.occurs);
        } else {
            merged.push(usage);
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(xsd: &str) -> RawSchema {
        let mut raw = RawSchema::default();
        raw.add_document("test.xsd", xsd).unwrap();
        raw
    }

    const NESTED: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:group name="inner">
    <xs:sequence>
      <xs:element ref="c"/>
      <xs:element ref="d"/>
    </xs:sequence>
  </xs:group>
  <xs:complexType name="t">
    <xs:choice>
      <xs:element ref="a"/>
      <xs:group ref="inner"/>
      <xs:sequence>
        <xs:element ref="e"/>
        <xs:element ref="a"/>
      </xs:sequence>
      <xs:any/>
    </xs:choice>
  </xs:complexType>
  <xs:element name="a" type="xs:string"/>
  <xs:element name="c" type="xs:string"/>
  <xs:element name="d" type="xs:string"/>
  <xs:element name="e" type="xs:string"/>
</xs:schema>"#;

    #[test]
    fn test_branches_from_element_group_and_sequence() {
        let raw = raw(NESTED);
        let mut normalizer = ChoiceNormalizer::new(&raw);
        let uses = normalizer.for_type("t").unwrap();
        assert_eq!(uses.len(), 1);

        let group = &uses[0].group;
        assert_eq!(group.id, "t:choice_0");
        assert_eq!(group.branches.len(), 3);
        assert_eq!(group.branches[0].members, vec!["a"]);
        assert_eq!(group.branches[1].members, vec!["c", "d"]);
        assert_eq!(group.branches[1].label.as_deref(), Some("inner"));
        // `a` is already claimed by the first branch
        assert_eq!(group.branches[2].members, vec!["e"]);
        assert_eq!(group.branches[2].label.as_deref(), Some("e + a"));
        assert!(uses[0].is_mandatory());
        assert!(uses[0].is_exclusive());
    }

    #[test]
    fn test_group_cycle_is_guarded() {
        let raw = raw(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:group name="g1"><xs:choice><xs:element ref="a"/><xs:group ref="g2"/></xs:choice></xs:group>
  <xs:group name="g2"><xs:choice><xs:element ref="b"/><xs:group ref="g1"/></xs:choice></xs:group>
  <xs:complexType name="t"><xs:sequence><xs:group ref="g1"/></xs:sequence></xs:complexType>
  <xs:element name="a" type="xs:string"/>
  <xs:element name="b" type="xs:string"/>
</xs:schema>"#,
        );
        let mut normalizer = ChoiceNormalizer::new(&raw);
        let uses = normalizer.for_type("t").unwrap();
        let group = &uses[0].group;
        assert_eq!(group.id, "g1:choice_0");
        assert_eq!(group.branches[0].members, vec!["a"]);
        assert_eq!(group.branches[1].members, vec!["b"]);
    }
}
