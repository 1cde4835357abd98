use std::collections::HashSet;

use serde::Serialize;

use crate::pedigree::RecordGraph;

/// A parent link that closed a loop: `parent` was already on the path of
/// individuals being ordered when it was reached again from `individual`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// Walk root under which the loop was found.
    pub root: String,
    pub individual: String,
    pub parent: String,
}

/// Individuals ordered so parents precede their offspring.
#[derive(Debug, Clone, Default)]
pub struct Sequence {
    pub order: Vec<String>,
    pub cycles: Vec<CycleReport>,
}

impl Sequence {
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Whether any walk hit a loop. The order is then only partially
    /// parent-first.
    pub fn has_cycles(&self) -> bool {
        !self.cycles.is_empty()
    }
}

struct SortWalk<'g> {
    graph: &'g RecordGraph,
    order: Vec<String>,
    placed: HashSet<String>,
    /// Individuals on the current recursion path.
    live: HashSet<String>,
    fault: bool,
    cycles: Vec<CycleReport>,
}

impl<'g> SortWalk<'g> {
    fn visit(&mut self, id: &str, root: &str) {
        if self.placed.contains(id) {
            return;
        }
        self.live.insert(id.to_string());

        let link = self.graph.lookup(id);
        for parent in link.known_parents() {
            if self.fault {
                break;
            }
            if self.live.contains(parent) {
                log::warn!("loop detected under {}: {} -> {}", root, id, parent);
                self.fault = true;
                self.cycles.push(CycleReport {
                    root: root.to_string(),
                    individual: id.to_string(),
                    parent: parent.to_string(),
                });
                self.place(id);
                return;
            }
            self.visit(parent, root);
        }

        self.place(id);
        self.live.remove(id);
    }

    fn place(&mut self, id: &str) {
        if self.placed.insert(id.to_string()) {
            self.order.push(id.to_string());
        }
    }
}

/// Order every individual stored in `graph`, parents first.
pub fn sequence(graph: &RecordGraph) -> Sequence {
    sequence_from(graph, graph.ids())
}

/// Order the individuals reachable upward from `roots`, parents first.
///
/// Each individual appears exactly once. On a loop the walk for that root
/// stops descending into further parents, so the loop's members are still
/// emitted once each and the loop is reported in [`Sequence::cycles`].
pub fn sequence_from<'a, I>(graph: &RecordGraph, roots: I) -> Sequence
where
    I: IntoIterator<Item = &'a str>,
{
    let mut walk = SortWalk {
        graph,
        order: Vec::with_capacity(graph.len()),
        placed: HashSet::with_capacity(graph.len()),
        live: HashSet::new(),
        fault: false,
        cycles: Vec::new(),
    };
    for root in roots {
        walk.fault = false;
        walk.live.clear();
        walk.visit(root, root);
        if walk.fault {
            log::warn!("pedigree loop detected while sorting, stem = {}", root);
        }
    }
    Sequence {
        order: walk.order,
        cycles: walk.cycles,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pedigree::{PedigreeLoader, XrefRules};

    fn graph(text: &str) -> RecordGraph {
        let xref = XrefRules::new();
        let mut graph = RecordGraph::new();
        PedigreeLoader::new(&xref, ',')
            .load(&mut graph, text.as_bytes())
            .unwrap();
        graph
    }

    fn position(seq: &Sequence, id: &str) -> usize {
        seq.order.iter().position(|x| x == id).unwrap()
    }

    #[test]
    fn test_parents_before_offspring() {
        let g = graph("C1,S1,D1\nS1,GS,0\nD1,0,GD\nGS,0,0\nGD,0,0\n");
        let seq = sequence(&g);
        assert_eq!(seq.len(), 5);
        assert!(!seq.has_cycles());
        assert!(position(&seq, "S1") < position(&seq, "C1"));
        assert!(position(&seq, "D1") < position(&seq, "C1"));
        assert!(position(&seq, "GS") < position(&seq, "S1"));
        assert!(position(&seq, "GD") < position(&seq, "D1"));
    }

    #[test]
    fn test_sire_side_first() {
        let g = graph("C1,S1,D1\nS1,0,0\nD1,0,0\n");
        let seq = sequence(&g);
        assert_eq!(seq.order, vec!["S1", "D1", "C1"]);
    }

    #[test]
    fn test_parent_outside_graph_is_still_emitted() {
        let g = graph("C1,S1,0\n");
        let seq = sequence(&g);
        assert_eq!(seq.order, vec!["S1", "C1"]);
    }

    #[test]
    fn test_three_cycle_detected_once_each() {
        let g = graph("XX,YY,0\nYY,ZZ,0\nZZ,XX,0\n");
        let seq = sequence(&g);
        assert!(seq.has_cycles());
        assert_eq!(seq.cycles.len(), 1);
        assert_eq!(seq.cycles[0].root, "XX");
        assert_eq!(seq.cycles[0].individual, "ZZ");
        assert_eq!(seq.cycles[0].parent, "XX");

        let mut ids = seq.order.clone();
        ids.sort();
        assert_eq!(ids, vec!["XX", "YY", "ZZ"]);
    }

    #[test]
    fn test_fault_resets_between_roots() {
        // Loop on one side, an ordinary family on the other.
        let g = graph("XX,YY,0\nYY,XX,0\nC1,S1,D1\nS1,0,0\nD1,0,0\n");
        let seq = sequence(&g);
        assert_eq!(seq.cycles.len(), 1);
        assert_eq!(seq.len(), 5);
        assert!(position(&seq, "S1") < position(&seq, "C1"));
        assert!(position(&seq, "D1") < position(&seq, "C1"));
    }

    #[test]
    fn test_sequence_from_selected_roots() {
        let g = graph("C1,S1,0\nC2,S2,0\n");
        let seq = sequence_from(&g, ["C1"]);
        assert_eq!(seq.order, vec!["S1", "C1"]);
    }
}
