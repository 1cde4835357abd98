use std::collections::{HashMap, HashSet};

use indexmap::IndexSet;

use crate::pedigree::RecordGraph;
use crate::types::Identifier;

use super::sort::CycleReport;
use super::GenerationCap;

/// All descendants of a set of seeds, seeds included.
///
/// Each member keeps the generation budget it was expanded with; a later
/// path reaching it with no more budget than that stops there, a path with
/// more budget walks its offspring again. Offspring are added only after
/// their own descendants. Members added with no budget left are truncated.
///
/// Requires a graph built with [`RecordGraph::with_offspring_index`];
/// without one only the seeds themselves are collected.
#[derive(Debug, Clone, Default)]
pub struct DescendantClosure {
    members: IndexSet<String>,
    /// Remaining generations each member was expanded with.
    budget: HashMap<String, usize>,
    cycles: Vec<CycleReport>,
}

struct DescendantWalk<'a> {
    graph: &'a RecordGraph,
    cap: GenerationCap,
    root: &'a str,
    live: HashSet<String>,
}

impl DescendantClosure {
    pub fn new() -> Self {
        Self::default()
    }

    /// Closure of all `seeds`, processed in order.
    pub fn from_seeds<'s, I>(graph: &RecordGraph, seeds: I, cap: GenerationCap) -> Self
    where
        I: IntoIterator<Item = &'s str>,
    {
        if !graph.has_offspring_index() {
            log::warn!("descendant closure requested on a graph without an offspring index");
        }
        let mut closure = Self::new();
        for seed in seeds {
            closure.add_seed(graph, seed, cap);
        }
        log::debug!(
            "{} individuals in the descendant closure ({} truncated)",
            closure.len(),
            closure.truncated_count()
        );
        closure
    }

    /// Add `seed` and its descendants.
    pub fn add_seed(&mut self, graph: &RecordGraph, seed: &str, cap: GenerationCap) {
        let Identifier::Known(seed) = Identifier::parse(seed) else {
            return;
        };
        let mut walk = DescendantWalk {
            graph,
            cap,
            root: &seed,
            live: HashSet::new(),
        };
        self.visit(&mut walk, &seed, 0);
    }

    fn visit(&mut self, walk: &mut DescendantWalk<'_>, id: &str, depth: usize) {
        let remaining = walk.cap.remaining(depth);
        if self.budget.get(id).is_some_and(|&had| had >= remaining) {
            return;
        }
        if remaining == 0 {
            self.members.insert(id.to_string());
            self.budget.insert(id.to_string(), 0);
            return;
        }

        let graph = walk.graph;
        walk.live.insert(id.to_string());
        if let Some(children) = graph.offspring_of(id) {
            for child in children {
                if walk.live.contains(child) {
                    log::warn!("loop detected under {}: {} -> {}", walk.root, child, id);
                    self.cycles.push(CycleReport {
                        root: walk.root.to_string(),
                        individual: child.clone(),
                        parent: id.to_string(),
                    });
                    continue;
                }
                self.visit(walk, child, depth + 1);
                self.members.insert(child.clone());
            }
        }
        walk.live.remove(id);

        self.budget.insert(id.to_string(), remaining);
        self.members.insert(id.to_string());
    }

    /// Members in the order they were completed.
    pub fn members(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(String::as_str)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.members.contains(id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_truncated(&self, id: &str) -> bool {
        self.budget.get(id) == Some(&0)
    }

    pub fn truncated_count(&self) -> usize {
        self.budget.values().filter(|&&left| left == 0).count()
    }

    /// Offspring links found to loop back onto the walk path.
    pub fn cycles(&self) -> &[CycleReport] {
        &self.cycles
    }
}
