//! Builds the bipartite festival graph from raw `(festival, artist)` pairs.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use log::{debug, info};

use crate::graph::{FestivalGraph, GraphLink, GraphNode, NodeKind};

/// Turns a raw artist slug into the graph id used for lookups.
///
/// Spaces and hyphens become `_`, then each letter run is title-cased:
/// `tom-bailey` becomes `Tom_Bailey` and `c-sar` becomes `C_Sar`.
pub fn normalize_artist_slug(raw: &str) -> String {
    let mut normalized = String::with_capacity(raw.len());
    let mut previous_is_letter = false;
    for ch in raw.trim().chars() {
        let ch = if ch == ' ' || ch == '-' { '_' } else { ch };
        if ch.is_alphabetic() {
            if previous_is_letter {
                normalized.extend(ch.to_lowercase());
            } else {
                normalized.extend(ch.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            normalized.push(ch);
            previous_is_letter = false;
        }
    }
    normalized
}

/// Parses a JSON array of `[festival, artist]` pairs.
pub fn parse_pairs(text: &str) -> Result<Vec<(String, String)>, String> {
    serde_json::from_str::<Vec<(String, String)>>(text)
        .map_err(|err| format!("Invalid festival/artist pair list: {err}"))
}

pub fn load_pairs(path: &Path) -> Result<Vec<(String, String)>, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|err| format!("Failed to read pair list {}: {}", path.display(), err))?;
    parse_pairs(&text).map_err(|err| format!("{}: {}", path.display(), err))
}

/// Creates one vertex per festival and per normalized artist, and one link per pair.
///
/// Vertices keep first-appearance order. Repeated pairs produce repeated links,
/// which the community detector collapses.
pub fn build_festival_graph(pairs: &[(String, String)]) -> FestivalGraph {
    let mut graph = FestivalGraph::default();
    let mut seen: HashSet<String> = HashSet::new();
    let mut festival_order: Vec<String> = Vec::new();
    let mut artists_per_festival: HashMap<String, usize> = HashMap::new();

    for (festival, raw_artist) in pairs {
        let festival = festival.trim().to_string();
        let artist = normalize_artist_slug(raw_artist);
        if festival.is_empty() || artist.is_empty() {
            debug!("Skipping incomplete pair ({festival:?}, {raw_artist:?})");
            continue;
        }

        if seen.insert(festival.clone()) {
            festival_order.push(festival.clone());
            graph
                .nodes
                .push(GraphNode::new(festival.clone(), NodeKind::FestivalYear));
        }
        if seen.insert(artist.clone()) {
            graph.nodes.push(GraphNode::new(artist.clone(), NodeKind::Artist));
        }

        *artists_per_festival.entry(festival.clone()).or_insert(0) += 1;
        graph.links.push(GraphLink::new(festival, artist));
    }

    info!("Festivals processed: {}", festival_order.len());
    for festival in &festival_order {
        info!(
            "{}: {} artists",
            festival,
            artists_per_festival.get(festival).copied().unwrap_or(0)
        );
    }
    graph
}

#[cfg(test)]
mod tests {
    use super::{build_festival_graph, normalize_artist_slug, parse_pairs};

    #[test]
    fn test_normalize_artist_slug_title_cases_each_word() {
        assert_eq!(normalize_artist_slug("tom-bailey"), "Tom_Bailey");
        assert_eq!(normalize_artist_slug("c-sar"), "C_Sar");
        assert_eq!(normalize_artist_slug("v8"), "V8");
        assert_eq!(
            normalize_artist_slug("culpepper-s-orchard"),
            "Culpepper_S_Orchard"
        );
        assert_eq!(normalize_artist_slug("sha na-na"), "Sha_Na_Na");
    }

    #[test]
    fn test_parse_pairs_reads_json_tuples() {
        let pairs = parse_pairs(r#"[["roskilde-festival-1971", "gasolin"]]"#)
            .expect("pairs should parse");
        assert_eq!(
            pairs,
            vec![(
                "roskilde-festival-1971".to_string(),
                "gasolin".to_string()
            )]
        );
        assert!(parse_pairs(r#"{"not": "a list"}"#).is_err());
    }

    #[test]
    fn test_build_festival_graph_shares_artists_between_festivals() {
        let pairs = vec![
            ("roskilde-festival-1971".to_string(), "gasolin".to_string()),
            ("roskilde-festival-1971".to_string(), "strawbs".to_string()),
            ("roskilde-festival-1972".to_string(), "gasolin".to_string()),
        ];

        let graph = build_festival_graph(&pairs);

        let ids: Vec<&str> = graph.nodes.iter().map(|node| node.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "roskilde-festival-1971",
                "Gasolin",
                "Strawbs",
                "roskilde-festival-1972"
            ]
        );
        assert_eq!(graph.artist_count(), 2);
        assert_eq!(graph.links.len(), 3);
        assert_eq!(graph.links[2].source, "roskilde-festival-1972");
        assert_eq!(graph.links[2].target, "Gasolin");
    }
}
