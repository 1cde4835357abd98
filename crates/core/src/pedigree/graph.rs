use std::collections::{BTreeSet, HashMap};

use indexmap::IndexMap;

use crate::types::{Identifier, ParentLink, RecordFormat};

/// Individual -> (sire, dam) links of a pedigree, held entirely in memory.
///
/// Identifiers keep the order in which they were first stored. An
/// identifier that was never stored is treated as having unknown parents
/// on lookup rather than as an error.
///
/// When built with [`RecordGraph::with_offspring_index`], the graph also
/// maintains parent -> offspring sets, which descendant traversal needs.
#[derive(Debug, Clone, Default)]
pub struct RecordGraph {
    /// Stored links, keyed by known individual ID.
    links: IndexMap<String, ParentLink>,
    /// Parent ID -> offspring IDs; `None` when indexing is disabled.
    offspring: Option<HashMap<String, BTreeSet<String>>>,
}

impl RecordGraph {
    /// Create an empty graph without an offspring index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty graph that maintains an offspring index.
    pub fn with_offspring_index() -> Self {
        Self {
            links: IndexMap::new(),
            offspring: Some(HashMap::new()),
        }
    }

    /// Number of stored individuals.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.links.contains_key(id)
    }

    /// Whether this graph maintains an offspring index.
    pub fn has_offspring_index(&self) -> bool {
        self.offspring.is_some()
    }

    /// Stored link for `id`, or `None` if it was never stored.
    pub fn get(&self, id: &str) -> Option<&ParentLink> {
        self.links.get(id)
    }

    /// Stored link for `id`, or a link with both parents unknown.
    pub fn lookup(&self, id: &str) -> ParentLink {
        self.links.get(id).cloned().unwrap_or_default()
    }

    /// Store the link for `id`, returning the link it replaced.
    ///
    /// With an offspring index, `id` is registered as an offspring of its
    /// new known parents and dropped from the previous link's parents, so
    /// the index always agrees with the stored links.
    pub fn upsert(&mut self, id: &str, link: ParentLink) -> Option<ParentLink> {
        if let Some(index) = self.offspring.as_mut() {
            if let Some(previous) = self.links.get(id) {
                for parent in previous.known_parents() {
                    if let Some(children) = index.get_mut(parent) {
                        children.remove(id);
                    }
                }
            }
            for parent in link.known_parents() {
                index
                    .entry(parent.to_string())
                    .or_default()
                    .insert(id.to_string());
            }
        }
        self.links.insert(id.to_string(), link)
    }

    /// Iterate stored individuals in first-insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParentLink)> {
        self.links.iter().map(|(id, link)| (id.as_str(), link))
    }

    /// Stored IDs in first-insertion order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.links.keys().map(String::as_str)
    }

    /// Render `id,sire,dam` with the default format.
    pub fn record_text(&self, id: &str) -> String {
        self.render_record(id, &RecordFormat::default())
    }

    /// Render `id<d>sire<d>dam`, using the format's token for unknown parents.
    pub fn render_record(&self, id: &str, format: &RecordFormat) -> String {
        format.render(id, &self.lookup(id))
    }

    /// Recorded offspring of `id`.
    ///
    /// Returns `None` if `id` was never registered as a parent (or the
    /// graph has no offspring index); an empty set means offspring were
    /// registered and later withdrawn by a replaced record.
    pub fn offspring_of(&self, id: &str) -> Option<&BTreeSet<String>> {
        self.offspring.as_ref()?.get(id)
    }
}

impl FromIterator<(String, Identifier, Identifier)> for RecordGraph {
    fn from_iter<I: IntoIterator<Item = (String, Identifier, Identifier)>>(iter: I) -> Self {
        let mut graph = RecordGraph::new();
        for (id, sire, dam) in iter {
            graph.upsert(&id, ParentLink::new(sire, dam));
        }
        graph
    }
}
