use std::collections::{BTreeMap, HashMap};

use crate::error::{RefineError, Result};
use crate::types::{Identifier, Sex};

use super::graph::RecordGraph;
use super::xref::{XrefRule, XrefScope};

/// Inferred sex of every identifier used as a parent.
#[derive(Debug, Clone, Default)]
pub struct SexMap {
    sexes: HashMap<String, Sex>,
}

impl SexMap {
    /// Sex of `id`, [`Sex::Unknown`] if it never appears as a parent.
    pub fn sex_of(&self, id: &str) -> Sex {
        self.sexes.get(id).copied().unwrap_or(Sex::Unknown)
    }

    pub fn len(&self) -> usize {
        self.sexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sexes.is_empty()
    }
}

/// How often each identifier is used in the sire and dam columns.
#[derive(Debug, Clone, Default)]
pub struct ParentTally {
    sire: BTreeMap<String, usize>,
    dam: BTreeMap<String, usize>,
}

impl ParentTally {
    pub fn from_graph(graph: &RecordGraph) -> Self {
        let mut tally = Self::default();
        for (_, link) in graph.iter() {
            if let Some(sire) = link.sire.as_known() {
                *tally.sire.entry(sire.to_string()).or_insert(0) += 1;
            }
            if let Some(dam) = link.dam.as_known() {
                *tally.dam.entry(dam.to_string()).or_insert(0) += 1;
            }
        }
        tally
    }

    pub fn sire_count(&self, id: &str) -> usize {
        self.sire.get(id).copied().unwrap_or(0)
    }

    pub fn dam_count(&self, id: &str) -> usize {
        self.dam.get(id).copied().unwrap_or(0)
    }

    /// Identifiers used both as a sire and as a dam, sorted.
    pub fn collisions(&self) -> Vec<&str> {
        self.sire
            .keys()
            .filter(|id| self.dam.contains_key(*id))
            .map(String::as_str)
            .collect()
    }

    /// Xref rule that removes the less frequent usage of `id`: dam-side
    /// when it is mostly a sire, sire-side when mostly a dam, everywhere
    /// when the counts are equal.
    pub fn suggest(&self, id: &str) -> XrefRule {
        let scope = match self.sire_count(id).cmp(&self.dam_count(id)) {
            std::cmp::Ordering::Equal => XrefScope::Any,
            std::cmp::Ordering::Greater => XrefScope::Dam,
            std::cmp::Ordering::Less => XrefScope::Sire,
        };
        XrefRule::new(scope, id, Identifier::Unknown)
    }

    fn into_sex_map(self) -> SexMap {
        let mut sexes = HashMap::with_capacity(self.sire.len() + self.dam.len());
        for id in self.sire.into_keys() {
            sexes.insert(id, Sex::Male);
        }
        for id in self.dam.into_keys() {
            sexes.insert(id, Sex::Female);
        }
        SexMap { sexes }
    }
}

/// Check that no identifier is recorded as both a sire and a dam.
///
/// On success returns the inferred sex of every parent.
///
/// # Errors
/// Returns [`RefineError::StructuralCollision`] listing one suggested xref
/// correction per colliding identifier, sorted by identifier.
pub fn check_structure(graph: &RecordGraph) -> Result<SexMap> {
    let tally = ParentTally::from_graph(graph);
    let collisions = tally.collisions();
    if !collisions.is_empty() {
        let suggestions: Vec<XrefRule> = collisions
            .iter()
            .map(|id| {
                log::warn!(
                    "ID {} appeared in both sire ({}) and dam ({}) columns",
                    id,
                    tally.sire_count(id),
                    tally.dam_count(id)
                );
                tally.suggest(id)
            })
            .collect();
        return Err(RefineError::StructuralCollision { suggestions });
    }
    log::debug!(
        "structure ok: {} sires, {} dams",
        tally.sire.len(),
        tally.dam.len()
    );
    Ok(tally.into_sex_map())
}
