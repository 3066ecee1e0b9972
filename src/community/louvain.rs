//! Louvain community detection over the undirected simple projection of a
//! festival graph.
//!
//! Each level shuffles its vertices once with a seeded `StdRng`, then moves
//! vertices to the neighboring community with the largest positive modularity
//! gain until a full pass makes no move. Communities are then folded into
//! super-vertices and the process repeats while modularity improves by more
//! than `MODULARITY_THRESHOLD`.

use std::collections::{HashMap, HashSet};

use log::{debug, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::graph::FestivalGraph;

const MODULARITY_THRESHOLD: f64 = 1e-7;

/// Disjoint vertex-index sets covering the whole graph, plus their modularity.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    /// Each community lists `FestivalGraph::nodes` positions in ascending order.
    pub communities: Vec<Vec<usize>>,
    pub modularity: f64,
}

/// Undirected weighted graph over dense indices. Self loops are kept in
/// `edges` and count twice towards the degree, as in networkx.
#[derive(Debug, Clone)]
pub(crate) struct WeightedGraph {
    /// Original vertices folded into each vertex.
    members: Vec<Vec<usize>>,
    edges: Vec<(usize, usize, f64)>,
    neighbors: Vec<Vec<(usize, f64)>>,
    degrees: Vec<f64>,
    total_weight: f64,
}

impl WeightedGraph {
    fn from_edges(members: Vec<Vec<usize>>, edges: Vec<(usize, usize, f64)>) -> Self {
        let node_count = members.len();
        let mut neighbors = vec![Vec::new(); node_count];
        let mut degrees = vec![0.0; node_count];
        let mut total_weight = 0.0;
        for &(u, v, weight) in &edges {
            total_weight += weight;
            if u == v {
                degrees[u] += 2.0 * weight;
                continue;
            }
            neighbors[u].push((v, weight));
            neighbors[v].push((u, weight));
            degrees[u] += weight;
            degrees[v] += weight;
        }
        Self {
            members,
            edges,
            neighbors,
            degrees,
            total_weight,
        }
    }

    /// Collapses parallel links and drops self links. Links naming unknown ids are skipped.
    pub(crate) fn simple_projection(graph: &FestivalGraph) -> Self {
        let index = graph.index_by_id();
        let mut seen: HashSet<(usize, usize)> = HashSet::new();
        let mut edges = Vec::new();
        for link in &graph.links {
            let (Some(&source), Some(&target)) = (
                index.get(link.source.as_str()),
                index.get(link.target.as_str()),
            ) else {
                warn!(
                    "Ignoring link {} -> {} with an unknown endpoint",
                    link.source, link.target
                );
                continue;
            };
            if source == target {
                continue;
            }
            let key = (source.min(target), source.max(target));
            if seen.insert(key) {
                edges.push((key.0, key.1, 1.0));
            }
        }
        let members = (0..graph.nodes.len()).map(|node| vec![node]).collect();
        Self::from_edges(members, edges)
    }

    fn node_count(&self) -> usize {
        self.members.len()
    }

    /// Folds each community of `inner` into one vertex; internal weight becomes a self loop.
    fn aggregate(&self, inner: &[Vec<usize>]) -> Self {
        let mut node_to_community = vec![0usize; self.node_count()];
        let mut members = Vec::with_capacity(inner.len());
        for (community, nodes) in inner.iter().enumerate() {
            let mut folded = Vec::new();
            for &node in nodes {
                node_to_community[node] = community;
                folded.extend_from_slice(&self.members[node]);
            }
            members.push(folded);
        }

        let mut edge_slots: HashMap<(usize, usize), usize> = HashMap::new();
        let mut edges: Vec<(usize, usize, f64)> = Vec::new();
        for &(u, v, weight) in &self.edges {
            let (a, b) = (node_to_community[u], node_to_community[v]);
            let key = (a.min(b), a.max(b));
            match edge_slots.get(&key) {
                Some(&slot) => edges[slot].2 += weight,
                None => {
                    edge_slots.insert(key, edges.len());
                    edges.push((key.0, key.1, weight));
                }
            }
        }
        Self::from_edges(members, edges)
    }
}

/// Q = sum over communities of `L_c / m - (D_c / 2m)^2`; zero for an edgeless graph.
pub(crate) fn modularity(graph: &WeightedGraph, communities: &[Vec<usize>]) -> f64 {
    let m = graph.total_weight;
    if m <= 0.0 {
        return 0.0;
    }
    let mut community_of = vec![usize::MAX; graph.node_count()];
    for (community, nodes) in communities.iter().enumerate() {
        for &node in nodes {
            community_of[node] = community;
        }
    }

    let mut internal = vec![0.0; communities.len()];
    for &(u, v, weight) in &graph.edges {
        if community_of[u] == community_of[v] && community_of[u] != usize::MAX {
            internal[community_of[u]] += weight;
        }
    }

    communities
        .iter()
        .enumerate()
        .map(|(community, nodes)| {
            let degree_sum: f64 = nodes.iter().map(|&node| graph.degrees[node]).sum();
            internal[community] / m - (degree_sum / (2.0 * m)).powi(2)
        })
        .sum()
}

/// One local-moving phase. Returns communities of this level's vertices and
/// whether any vertex moved.
fn one_level(graph: &WeightedGraph, m: f64, rng: &mut StdRng) -> (Vec<Vec<usize>>, bool) {
    let node_count = graph.node_count();
    let mut node_to_community: Vec<usize> = (0..node_count).collect();
    let mut community_degree = graph.degrees.clone();
    let mut order: Vec<usize> = (0..node_count).collect();
    order.shuffle(rng);

    let mut weight_to_community = vec![0.0; node_count];
    let mut touched: Vec<usize> = Vec::new();
    let mut improvement = false;

    loop {
        let mut moves = 0usize;
        for &node in &order {
            let current = node_to_community[node];
            let degree = graph.degrees[node];

            for &(neighbor, weight) in &graph.neighbors[node] {
                let community = node_to_community[neighbor];
                if weight_to_community[community] == 0.0 && !touched.contains(&community) {
                    touched.push(community);
                }
                weight_to_community[community] += weight;
            }

            community_degree[current] -= degree;
            let remove_cost = -weight_to_community[current] / m
                + (community_degree[current] * degree) / (2.0 * m * m);
            let mut best_gain = 0.0;
            let mut best_community = current;
            for &community in &touched {
                let gain = remove_cost + weight_to_community[community] / m
                    - (community_degree[community] * degree) / (2.0 * m * m);
                if gain > best_gain {
                    best_gain = gain;
                    best_community = community;
                }
            }
            community_degree[best_community] += degree;

            for &community in &touched {
                weight_to_community[community] = 0.0;
            }
            touched.clear();

            if best_community != current {
                node_to_community[node] = best_community;
                improvement = true;
                moves += 1;
            }
        }
        if moves == 0 {
            break;
        }
    }

    let mut inner: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    for node in 0..node_count {
        inner[node_to_community[node]].push(node);
    }
    inner.retain(|nodes| !nodes.is_empty());
    (inner, improvement)
}

fn original_members(graph: &WeightedGraph, inner: &[Vec<usize>]) -> Vec<Vec<usize>> {
    inner
        .iter()
        .map(|nodes| {
            let mut members: Vec<usize> = nodes
                .iter()
                .flat_map(|&node| graph.members[node].iter().copied())
                .collect();
            members.sort_unstable();
            members
        })
        .collect()
}

/// Multi-level Louvain with resolution 1. Same graph and seed give the same communities.
pub(crate) fn louvain(graph: &WeightedGraph, seed: u64) -> Vec<Vec<usize>> {
    let singletons: Vec<Vec<usize>> = (0..graph.node_count()).map(|node| vec![node]).collect();
    if graph.total_weight <= 0.0 {
        return singletons;
    }

    let m = graph.total_weight;
    let mut rng = StdRng::seed_from_u64(seed);
    let mut best_modularity = modularity(graph, &singletons);
    let mut level_graph = graph.clone();
    let (mut inner, _) = one_level(&level_graph, m, &mut rng);
    let mut level = 0usize;

    loop {
        let partition = original_members(&level_graph, &inner);
        let level_modularity = modularity(&level_graph, &inner);
        debug!(
            "Louvain level {}: {} communities, modularity {:.6}",
            level,
            partition.len(),
            level_modularity
        );
        if level_modularity - best_modularity <= MODULARITY_THRESHOLD {
            return partition;
        }
        best_modularity = level_modularity;
        level_graph = level_graph.aggregate(&inner);
        let (next_inner, improvement) = one_level(&level_graph, m, &mut rng);
        if !improvement {
            return partition;
        }
        inner = next_inner;
        level += 1;
    }
}

/// Partitions `graph` with Louvain and scores the result on the simple projection.
pub fn detect_communities(graph: &FestivalGraph, seed: u64) -> Partition {
    let projection = WeightedGraph::simple_projection(graph);
    let communities = louvain(&projection, seed);
    let modularity = modularity(&projection, &communities);
    Partition {
        communities,
        modularity,
    }
}

/// Communities sorted by descending size; equal sizes are ordered by the
/// lexicographically smallest member id.
pub fn rank_by_size(graph: &FestivalGraph, partition: &Partition) -> Vec<Vec<usize>> {
    let smallest_id = |members: &Vec<usize>| -> String {
        members
            .iter()
            .map(|&node| graph.nodes[node].id.as_str())
            .min()
            .unwrap_or_default()
            .to_string()
    };
    let mut ranked: Vec<(String, Vec<usize>)> = partition
        .communities
        .iter()
        .map(|members| (smallest_id(members), members.clone()))
        .collect();
    ranked.sort_by(|(left_id, left), (right_id, right)| {
        right.len().cmp(&left.len()).then_with(|| left_id.cmp(right_id))
    });
    ranked.into_iter().map(|(_, members)| members).collect()
}

/// Seed drawn from OS entropy for runs without a configured seed.
pub fn entropy_seed() -> u64 {
    let mut bytes = [0u8; 8];
    match getrandom::fill(&mut bytes) {
        Ok(()) => u64::from_le_bytes(bytes),
        Err(err) => {
            warn!("Failed to draw random seed ({err}); falling back to clock seed");
            crate::enrichment::article_cache::now_unix_ms() as u64
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::{detect_communities, modularity, rank_by_size, Partition, WeightedGraph};
    use crate::graph::{FestivalGraph, GraphLink, GraphNode, NodeKind};

    fn graph_from(nodes: &[(&str, NodeKind)], links: &[(&str, &str)]) -> FestivalGraph {
        FestivalGraph {
            nodes: nodes
                .iter()
                .map(|(id, kind)| GraphNode::new(*id, *kind))
                .collect(),
            links: links
                .iter()
                .map(|(source, target)| GraphLink::new(*source, *target))
                .collect(),
            ..FestivalGraph::default()
        }
    }

    fn two_festival_graph() -> FestivalGraph {
        use NodeKind::{Artist, FestivalYear};
        graph_from(
            &[
                ("fest-1971", FestivalYear),
                ("A1", Artist),
                ("A2", Artist),
                ("A3", Artist),
                ("fest-1972", FestivalYear),
                ("B1", Artist),
                ("B2", Artist),
                ("B3", Artist),
                ("Shared", Artist),
            ],
            &[
                ("fest-1971", "A1"),
                ("fest-1971", "A2"),
                ("fest-1971", "A3"),
                ("fest-1971", "Shared"),
                ("fest-1972", "B1"),
                ("fest-1972", "B2"),
                ("fest-1972", "B3"),
                ("fest-1972", "Shared"),
            ],
        )
    }

    fn community_of(partition: &Partition, node: usize) -> usize {
        partition
            .communities
            .iter()
            .position(|members| members.contains(&node))
            .expect("every vertex belongs to a community")
    }

    fn assert_covers_disjointly(partition: &Partition, node_count: usize) {
        let mut seen = HashSet::new();
        for members in &partition.communities {
            assert!(!members.is_empty());
            for &node in members {
                assert!(seen.insert(node), "vertex {node} appears twice");
            }
        }
        assert_eq!(seen.len(), node_count);
    }

    #[test]
    fn test_modularity_of_two_disjoint_triangles() {
        let graph = graph_from(
            &[
                ("a", NodeKind::Artist),
                ("b", NodeKind::Artist),
                ("c", NodeKind::Artist),
                ("d", NodeKind::Artist),
                ("e", NodeKind::Artist),
                ("f", NodeKind::Artist),
            ],
            &[
                ("a", "b"),
                ("b", "c"),
                ("a", "c"),
                ("d", "e"),
                ("e", "f"),
                ("d", "f"),
            ],
        );
        let projection = WeightedGraph::simple_projection(&graph);

        let split = modularity(&projection, &[vec![0, 1, 2], vec![3, 4, 5]]);
        let merged = modularity(&projection, &[vec![0, 1, 2, 3, 4, 5]]);

        assert!((split - 0.5).abs() < 1e-12);
        assert!(merged.abs() < 1e-12);
    }

    #[test]
    fn test_detect_separates_festival_stars() {
        let graph = two_festival_graph();

        let partition = detect_communities(&graph, 0);

        assert_covers_disjointly(&partition, graph.nodes.len());
        let first = community_of(&partition, 0);
        let second = community_of(&partition, 4);
        assert_ne!(first, second);
        for artist in 1..=3 {
            assert_eq!(community_of(&partition, artist), first);
        }
        for artist in 5..=7 {
            assert_eq!(community_of(&partition, artist), second);
        }
        assert!(partition.modularity > 0.3);
    }

    #[test]
    fn test_detect_is_deterministic_per_seed() {
        let graph = two_festival_graph();
        for seed in [0u64, 1, 42, u64::MAX] {
            let first = detect_communities(&graph, seed);
            let second = detect_communities(&graph, seed);
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_parallel_links_are_collapsed() {
        let mut doubled = two_festival_graph();
        let extra = doubled.links.clone();
        doubled.links.extend(extra);

        let projection = WeightedGraph::simple_projection(&doubled);

        assert_eq!(projection.edges.len(), 8);
        assert_eq!(
            detect_communities(&doubled, 3),
            detect_communities(&two_festival_graph(), 3)
        );
    }

    #[test]
    fn test_edgeless_graph_yields_singletons_with_zero_modularity() {
        let graph = graph_from(
            &[("solo", NodeKind::Artist), ("fest", NodeKind::FestivalYear)],
            &[],
        );

        let partition = detect_communities(&graph, 9);

        assert_eq!(partition.communities, vec![vec![0], vec![1]]);
        assert_eq!(partition.modularity, 0.0);
    }

    #[test]
    fn test_rank_by_size_breaks_ties_by_smallest_member_id() {
        let graph = graph_from(
            &[
                ("zeta", NodeKind::Artist),
                ("alpha", NodeKind::Artist),
                ("mid", NodeKind::Artist),
                ("big-1", NodeKind::Artist),
                ("big-2", NodeKind::Artist),
                ("big-3", NodeKind::Artist),
            ],
            &[],
        );
        let partition = Partition {
            communities: vec![vec![0], vec![2, 1], vec![3, 4, 5]],
            modularity: 0.0,
        };

        let ranked = rank_by_size(&graph, &partition);

        assert_eq!(ranked, vec![vec![3, 4, 5], vec![2, 1], vec![0]]);

        let tied = Partition {
            communities: vec![vec![0], vec![2], vec![1]],
            modularity: 0.0,
        };
        assert_eq!(rank_by_size(&graph, &tied), vec![vec![1], vec![2], vec![0]]);
    }
}
