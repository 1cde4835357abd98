use std::collections::HashMap;

use crate::pedigree::RecordGraph;
use crate::types::{Identifier, ParentLink};

use super::GenerationCap;

/// All ancestors of a set of seeds, with the links needed to order them.
///
/// The closure is shared across seeds. Each member keeps the generation
/// budget it was expanded with, and is only walked again when a later path
/// reaches it with a larger budget, so a seed's result never depends on
/// which seeds came before it. Individuals cut off by the generation cap
/// are stored with unknown parents and a budget of 0 (truncated).
#[derive(Debug, Clone, Default)]
pub struct AncestorClosure {
    links: RecordGraph,
    /// Remaining generations each member was expanded with.
    budget: HashMap<String, usize>,
    loop_stems: Vec<String>,
}

/// Per-seed walk state.
struct AncestorWalk<'a> {
    graph: &'a RecordGraph,
    cap: GenerationCap,
    stem: &'a str,
    stem_fault: bool,
}

impl AncestorClosure {
    pub fn new() -> Self {
        Self::default()
    }

    /// Closure of all `seeds`, processed in order.
    pub fn from_seeds<'s, I>(graph: &RecordGraph, seeds: I, cap: GenerationCap) -> Self
    where
        I: IntoIterator<Item = &'s str>,
    {
        let mut closure = Self::new();
        for seed in seeds {
            closure.add_seed(graph, seed, cap);
        }
        log::debug!(
            "{} individuals in the ancestor closure ({} truncated)",
            closure.len(),
            closure.truncated_count()
        );
        closure
    }

    /// Add `seed` and its ancestors.
    ///
    /// Returns `true` if the walk found the seed among its own ancestors
    /// (a stem fault). The fault is logged and recorded; it does not carry
    /// over to the next seed.
    pub fn add_seed(&mut self, graph: &RecordGraph, seed: &str, cap: GenerationCap) -> bool {
        let Identifier::Known(seed) = Identifier::parse(seed) else {
            return false;
        };
        let mut walk = AncestorWalk {
            graph,
            cap,
            stem: &seed,
            stem_fault: false,
        };
        self.visit(&mut walk, &seed, 0);
        if walk.stem_fault {
            log::warn!(
                "pedigree loop detected while filling result set, stem = {}",
                seed
            );
            self.loop_stems.push(seed.clone());
        }
        walk.stem_fault
    }

    fn visit(&mut self, walk: &mut AncestorWalk<'_>, id: &str, depth: usize) {
        let remaining = walk.cap.remaining(depth);
        if self.budget.get(id).is_some_and(|&had| had >= remaining) {
            return;
        }
        if remaining == 0 {
            self.links.upsert(id, ParentLink::unknown());
            self.budget.insert(id.to_string(), 0);
            return;
        }

        // Stored before recursing so a loop back to `id` stops here.
        let link = walk.graph.lookup(id);
        self.budget.insert(id.to_string(), remaining);
        self.links.upsert(id, link.clone());

        for parent in link.known_parents() {
            self.visit(walk, parent, depth + 1);
        }
        if link.has_parent(walk.stem) {
            walk.stem_fault = true;
        }
    }

    /// Links of every individual in the closure, in discovery order.
    pub fn links(&self) -> &RecordGraph {
        &self.links
    }

    pub fn into_links(self) -> RecordGraph {
        self.links
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.links.contains(id)
    }

    /// Whether `id` was recorded only because the generation cap stopped
    /// the walk there.
    pub fn is_truncated(&self, id: &str) -> bool {
        self.budget.get(id) == Some(&0)
    }

    pub fn truncated_count(&self) -> usize {
        self.budget.values().filter(|&&left| left == 0).count()
    }

    /// Seeds whose walk hit a stem fault, in seed order.
    pub fn loop_stems(&self) -> &[String] {
        &self.loop_stems
    }
}
