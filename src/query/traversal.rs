//! Graph walks over `outgoing` and `incoming` links.

use std::collections::{BTreeMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::atom::{Atom, AtomId, AtomType};
use crate::query::engine::HypergraphQueryEngine;
use crate::query::pattern::HypergraphPattern;

/// Default depth bound for [`HypergraphQueryEngine::traverse_graph`].
pub const DEFAULT_TRAVERSAL_DEPTH: usize = 3;

/// Default depth bound for [`HypergraphQueryEngine::find_paths`].
pub const DEFAULT_PATH_DEPTH: usize = 10;

/// Which links a walk follows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// From a link to the atoms it references.
    #[default]
    Outgoing,
    /// From an atom to the links referencing it.
    Incoming,
    /// Both ways.
    Both,
}

/// Breadth-first walk request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TraversalQuery {
    /// Atoms the walk starts from.
    pub start_ids: Vec<AtomId>,
    /// Maximum number of hops from a start atom.
    pub max_depth: usize,
    /// Links to follow.
    pub direction: Direction,
    /// Non-start atoms must match this pattern to be collected or expanded.
    pub filter: Option<HypergraphPattern>,
    /// Whether start atoms appear in the result.
    pub include_start_nodes: bool,
}

impl Default for TraversalQuery {
    fn default() -> Self {
        Self {
            start_ids: Vec::new(),
            max_depth: DEFAULT_TRAVERSAL_DEPTH,
            direction: Direction::Outgoing,
            filter: None,
            include_start_nodes: true,
        }
    }
}

impl TraversalQuery {
    /// Walk from `start_ids` with default settings.
    #[must_use]
    pub fn from_starts(start_ids: Vec<AtomId>) -> Self {
        Self {
            start_ids,
            ..Self::default()
        }
    }

    /// Sets the hop bound.
    #[must_use]
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Sets the direction.
    #[must_use]
    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Only collect and expand atoms matching `filter`.
    ///
    /// Start atoms bypass the filter: they are always expanded and, unless
    /// excluded, always returned.
    #[must_use]
    pub fn filter(mut self, filter: HypergraphPattern) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Leave start atoms out of the result.
    #[must_use]
    pub fn exclude_start_nodes(mut self) -> Self {
        self.include_start_nodes = false;
        self
    }
}

/// Path search request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathQuery {
    /// First atom of every path.
    pub start_id: AtomId,
    /// Last atom of every path.
    pub end_id: AtomId,
    /// Maximum number of hops per path.
    #[serde(default = "default_path_depth")]
    pub max_depth: usize,
    /// Links to follow.
    #[serde(default)]
    pub direction: Direction,
}

const fn default_path_depth() -> usize {
    DEFAULT_PATH_DEPTH
}

impl PathQuery {
    /// Paths from `start_id` to `end_id` over outgoing links.
    #[must_use]
    pub const fn new(start_id: AtomId, end_id: AtomId) -> Self {
        Self {
            start_id,
            end_id,
            max_depth: DEFAULT_PATH_DEPTH,
            direction: Direction::Outgoing,
        }
    }

    /// Sets the hop bound.
    #[must_use]
    pub const fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Sets the direction.
    #[must_use]
    pub const fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }
}

/// Neighborhood extraction request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubgraphQuery {
    /// Centers of the neighborhood.
    pub center_ids: Vec<AtomId>,
    /// Hops from any center.
    #[serde(default = "default_radius")]
    pub radius: usize,
    /// Links to follow.
    #[serde(default = "default_subgraph_direction")]
    pub direction: Direction,
}

const fn default_radius() -> usize {
    1
}

const fn default_subgraph_direction() -> Direction {
    Direction::Both
}

impl SubgraphQuery {
    /// Radius-1 neighborhood in both directions.
    #[must_use]
    pub fn new(center_ids: Vec<AtomId>) -> Self {
        Self {
            center_ids,
            radius: default_radius(),
            direction: default_subgraph_direction(),
        }
    }

    /// Sets the radius.
    #[must_use]
    pub fn radius(mut self, radius: usize) -> Self {
        self.radius = radius;
        self
    }

    /// Sets the direction.
    #[must_use]
    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }
}

/// Atoms of a neighborhood and the outgoing links among them.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Subgraph {
    /// Included atoms in discovery order.
    pub atoms: Vec<Atom>,
    /// `(source, target)` pairs where both ends are included.
    pub edges: Vec<(AtomId, AtomId)>,
}

impl Subgraph {
    /// Returns true if `id` is part of the subgraph.
    #[must_use]
    pub fn contains(&self, id: AtomId) -> bool {
        self.atoms.iter().any(|a| a.id == id)
    }
}

/// Whole-graph summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphStatistics {
    /// Number of atoms.
    pub node_count: usize,
    /// Sum of outgoing arities.
    pub edge_count: usize,
    /// `edge_count / node_count`, zero for an empty graph.
    pub average_degree: f64,
    /// Largest `|outgoing| + |incoming|`.
    pub max_degree: usize,
    /// Atom count per type.
    pub type_distribution: BTreeMap<AtomType, usize>,
}

impl HypergraphQueryEngine<'_> {
    /// Breadth-first walk from the start atoms.
    ///
    /// Start atoms are visited first. Atoms found at `max_depth` hops are
    /// collected but not expanded. Atoms rejected by the filter are neither
    /// collected nor expanded, and stay eligible through other paths.
    #[must_use]
    pub fn traverse_graph(&self, query: &TraversalQuery) -> Vec<Atom> {
        let mut visited: HashSet<AtomId> = HashSet::new();
        let mut queue: VecDeque<(AtomId, usize)> = VecDeque::new();
        let mut result = Vec::new();

        for &id in &query.start_ids {
            let Some(atom) = self.space.get_atom(id) else {
                continue;
            };
            if !visited.insert(id) {
                continue;
            }
            if query.include_start_nodes {
                result.push(atom.clone());
            }
            queue.push_back((id, 0));
        }

        while let Some((id, depth)) = queue.pop_front() {
            if depth >= query.max_depth {
                continue;
            }
            for neighbor in self.neighbor_ids(id, query.direction) {
                if visited.contains(&neighbor) {
                    continue;
                }
                let Some(atom) = self.space.get_atom(neighbor) else {
                    continue;
                };
                if let Some(filter) = &query.filter {
                    if !self.matches(atom, filter) {
                        continue;
                    }
                }
                visited.insert(neighbor);
                result.push(atom.clone());
                queue.push_back((neighbor, depth + 1));
            }
        }

        tracing::trace!(
            starts = query.start_ids.len(),
            collected = result.len(),
            "graph traversal"
        );
        result
    }

    /// Every simple path from `start_id` to `end_id` with at most `max_depth` hops.
    ///
    /// The search is exhaustive, so its cost grows exponentially with depth
    /// on densely linked graphs.
    #[must_use]
    pub fn find_paths(&self, query: &PathQuery) -> Vec<Vec<Atom>> {
        if !self.space.contains(query.start_id) || !self.space.contains(query.end_id) {
            return Vec::new();
        }

        let mut found: Vec<Vec<AtomId>> = Vec::new();
        let mut path = vec![query.start_id];
        let mut on_path: HashSet<AtomId> = HashSet::from([query.start_id]);
        self.extend_paths(query, &mut path, &mut on_path, &mut found);

        found
            .into_iter()
            .map(|ids| {
                ids.into_iter()
                    .filter_map(|id| self.space.get_atom(id).cloned())
                    .collect()
            })
            .collect()
    }

    fn extend_paths(
        &self,
        query: &PathQuery,
        path: &mut Vec<AtomId>,
        on_path: &mut HashSet<AtomId>,
        found: &mut Vec<Vec<AtomId>>,
    ) {
        let Some(&current) = path.last() else {
            return;
        };
        if current == query.end_id {
            found.push(path.clone());
            return;
        }
        if path.len() > query.max_depth {
            return;
        }
        for neighbor in self.neighbor_ids(current, query.direction) {
            if on_path.contains(&neighbor) || !self.space.contains(neighbor) {
                continue;
            }
            path.push(neighbor);
            on_path.insert(neighbor);
            self.extend_paths(query, path, on_path, found);
            on_path.remove(&neighbor);
            path.pop();
        }
    }

    /// Everything within `radius` hops of the centers.
    #[must_use]
    pub fn get_subgraph(&self, query: &SubgraphQuery) -> Subgraph {
        let atoms = self.traverse_graph(&TraversalQuery {
            start_ids: query.center_ids.clone(),
            max_depth: query.radius,
            direction: query.direction,
            filter: None,
            include_start_nodes: true,
        });

        let included: HashSet<AtomId> = atoms.iter().map(|a| a.id).collect();
        let mut seen = HashSet::new();
        let edges = atoms
            .iter()
            .flat_map(|atom| atom.outgoing.iter().map(move |target| (atom.id, *target)))
            .filter(|(_, target)| included.contains(target))
            .filter(|edge| seen.insert(*edge))
            .collect();

        Subgraph { atoms, edges }
    }

    /// Atoms one hop away from `id`, without duplicates.
    #[must_use]
    pub fn get_neighbors(&self, id: AtomId, direction: Direction) -> Vec<Atom> {
        self.neighbor_ids(id, direction)
            .into_iter()
            .filter_map(|n| self.space.get_atom(n).cloned())
            .collect()
    }

    /// Counts, degrees and the type histogram of the whole store.
    #[must_use]
    pub fn get_graph_statistics(&self) -> GraphStatistics {
        let mut stats = GraphStatistics::default();
        for atom in self.space.iter() {
            stats.node_count += 1;
            stats.edge_count += atom.outgoing.len();
            stats.max_degree = stats
                .max_degree
                .max(atom.outgoing.len() + atom.incoming.len());
            *stats.type_distribution.entry(atom.atom_type).or_insert(0) += 1;
        }
        if stats.node_count > 0 {
            #[allow(clippy::cast_precision_loss)]
            let average = stats.edge_count as f64 / stats.node_count as f64;
            stats.average_degree = average;
        }
        stats
    }

    fn neighbor_ids(&self, id: AtomId, direction: Direction) -> Vec<AtomId> {
        let Some(atom) = self.space.get_atom(id) else {
            return Vec::new();
        };
        let outgoing = matches!(direction, Direction::Outgoing | Direction::Both)
            .then_some(atom.outgoing.iter())
            .into_iter()
            .flatten();
        let incoming = matches!(direction, Direction::Incoming | Direction::Both)
            .then_some(atom.incoming.iter())
            .into_iter()
            .flatten();

        let mut seen = HashSet::new();
        outgoing
            .chain(incoming)
            .copied()
            .filter(|n| seen.insert(*n))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::AtomSpec;
    use crate::space::AtomSpace;

    struct Chain {
        space: AtomSpace,
        a: AtomId,
        b: AtomId,
        c: AtomId,
        ab: AtomId,
        bc: AtomId,
    }

    /// `a <- ab -> b <- bc -> c`, where links point at their members.
    fn chain() -> Chain {
        let mut space = AtomSpace::new();
        let a = space.add_atom(AtomSpec::concept("a")).id;
        let b = space.add_atom(AtomSpec::concept("b")).id;
        let c = space.add_atom(AtomSpec::concept("c")).id;
        let ab = space.add_atom(AtomSpec::link(AtomType::Implication, vec![a, b])).id;
        let bc = space.add_atom(AtomSpec::link(AtomType::Implication, vec![b, c])).id;
        Chain { space, a, b, c, ab, bc }
    }

    fn ids(atoms: &[Atom]) -> Vec<AtomId> {
        atoms.iter().map(|a| a.id).collect()
    }

    #[test]
    fn traversal_defaults() {
        let q = TraversalQuery::default();
        assert_eq!(q.max_depth, 3);
        assert_eq!(q.direction, Direction::Outgoing);
        assert!(q.include_start_nodes);

        let p = PathQuery::new(AtomId::new(), AtomId::new());
        assert_eq!(p.max_depth, 10);

        let s = SubgraphQuery::new(vec![]);
        assert_eq!(s.radius, 1);
        assert_eq!(s.direction, Direction::Both);
    }

    #[test]
    fn outgoing_walk_from_link() {
        let g = chain();
        let engine = g.space.query_engine();
        let atoms = engine.traverse_graph(&TraversalQuery::from_starts(vec![g.ab]));
        assert_eq!(ids(&atoms), vec![g.ab, g.a, g.b]);
    }

    #[test]
    fn both_directions_respect_depth() {
        let g = chain();
        let engine = g.space.query_engine();

        let one = engine.traverse_graph(
            &TraversalQuery::from_starts(vec![g.a])
                .direction(Direction::Both)
                .max_depth(1),
        );
        assert_eq!(ids(&one), vec![g.a, g.ab]);

        let two = engine.traverse_graph(
            &TraversalQuery::from_starts(vec![g.a])
                .direction(Direction::Both)
                .max_depth(2),
        );
        assert_eq!(ids(&two), vec![g.a, g.ab, g.b]);

        let all = engine.traverse_graph(&TraversalQuery::from_starts(vec![g.a]).direction(Direction::Both));
        assert_eq!(all.len(), 4);
        assert!(!ids(&all).contains(&g.c));

        let zero = engine.traverse_graph(&TraversalQuery::from_starts(vec![g.a]).max_depth(0));
        assert_eq!(ids(&zero), vec![g.a]);
    }

    #[test]
    fn start_nodes_can_be_excluded() {
        let g = chain();
        let engine = g.space.query_engine();
        let atoms = engine.traverse_graph(&TraversalQuery::from_starts(vec![g.ab]).exclude_start_nodes());
        assert_eq!(ids(&atoms), vec![g.a, g.b]);
    }

    #[test]
    fn filter_blocks_expansion() {
        let g = chain();
        let engine = g.space.query_engine();
        let query = TraversalQuery::from_starts(vec![g.a])
            .direction(Direction::Both)
            .max_depth(10)
            .filter(HypergraphPattern::new().of_type(AtomType::Concept));
        let atoms = engine.traverse_graph(&query);
        assert_eq!(ids(&atoms), vec![g.a]);
    }

    #[test]
    fn start_atoms_bypass_the_filter() {
        let g = chain();
        let engine = g.space.query_engine();
        let query = TraversalQuery::from_starts(vec![g.ab])
            .direction(Direction::Both)
            .filter(HypergraphPattern::new().of_type(AtomType::Concept));
        let atoms = engine.traverse_graph(&query);
        assert_eq!(ids(&atoms), vec![g.ab, g.a, g.b]);
    }

    #[test]
    fn unknown_start_is_skipped() {
        let g = chain();
        let engine = g.space.query_engine();
        let atoms = engine.traverse_graph(&TraversalQuery::from_starts(vec![AtomId::new()]));
        assert!(atoms.is_empty());
    }

    #[test]
    fn finds_all_simple_paths() {
        let g = chain();
        let engine = g.space.query_engine();

        let paths = engine.find_paths(&PathQuery::new(g.a, g.c).direction(Direction::Both));
        assert_eq!(paths.len(), 1);
        assert_eq!(ids(&paths[0]), vec![g.a, g.ab, g.b, g.bc, g.c]);

        let short = engine.find_paths(&PathQuery::new(g.a, g.c).direction(Direction::Both).max_depth(3));
        assert!(short.is_empty());

        let none = engine.find_paths(&PathQuery::new(g.a, g.c));
        assert!(none.is_empty());

        let trivial = engine.find_paths(&PathQuery::new(g.b, g.b));
        assert_eq!(trivial.len(), 1);
        assert_eq!(ids(&trivial[0]), vec![g.b]);
    }

    #[test]
    fn finds_parallel_paths() {
        let mut space = AtomSpace::new();
        let x = space.add_atom(AtomSpec::concept("x")).id;
        let y = space.add_atom(AtomSpec::concept("y")).id;
        let xy = space.add_atom(AtomSpec::link(AtomType::Similarity, vec![x, y])).id;
        let xy2 = space.add_atom(AtomSpec::link(AtomType::Inheritance, vec![x, y])).id;

        let engine = space.query_engine();
        let paths = engine.find_paths(&PathQuery::new(x, y).direction(Direction::Both));
        let mut middles: Vec<AtomId> = paths.iter().map(|p| p[1].id).collect();
        middles.sort();
        let mut expected = vec![xy, xy2];
        expected.sort();
        assert_eq!(middles, expected);
    }

    #[test]
    fn subgraph_edges_stay_inside() {
        let g = chain();
        let engine = g.space.query_engine();
        let sub = engine.get_subgraph(&SubgraphQuery::new(vec![g.ab]));

        assert!(sub.contains(g.a) && sub.contains(g.b) && sub.contains(g.ab));
        assert!(!sub.contains(g.c));
        assert_eq!(sub.edges, vec![(g.ab, g.a), (g.ab, g.b)]);

        let wider = engine.get_subgraph(&SubgraphQuery::new(vec![g.ab]).radius(2));
        assert!(wider.contains(g.bc));
        assert!(wider.edges.contains(&(g.bc, g.b)));
        assert!(!wider.edges.iter().any(|(_, t)| *t == g.c));
    }

    #[test]
    fn neighbors_are_deduplicated() {
        let mut space = AtomSpace::new();
        let a = space.add_atom(AtomSpec::concept("a")).id;
        let pair = space.add_atom(AtomSpec::link(AtomType::Similarity, vec![a, a])).id;

        let engine = space.query_engine();
        assert_eq!(ids(&engine.get_neighbors(pair, Direction::Outgoing)), vec![a]);
        assert_eq!(ids(&engine.get_neighbors(a, Direction::Incoming)), vec![pair]);
        assert!(engine.get_neighbors(a, Direction::Outgoing).is_empty());
        assert!(engine.get_neighbors(AtomId::new(), Direction::Both).is_empty());
    }

    #[test]
    fn graph_statistics() {
        let g = chain();
        let stats = g.space.query_engine().get_graph_statistics();
        assert_eq!(stats.node_count, 5);
        assert_eq!(stats.edge_count, 4);
        assert!((stats.average_degree - 0.8).abs() < 1e-12);
        assert_eq!(stats.max_degree, 2);
        assert_eq!(stats.type_distribution[&AtomType::Concept], 3);
        assert_eq!(stats.type_distribution[&AtomType::Implication], 2);

        let empty = AtomSpace::new().query_engine().get_graph_statistics();
        assert_eq!(empty.node_count, 0);
        assert!(empty.average_degree.abs() < f64::EPSILON);
    }
}
