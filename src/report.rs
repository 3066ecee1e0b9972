//! Community summaries and the human-readable / JSON analysis report.

use std::fmt::Write as _;
use std::path::Path;

use crate::graph::FestivalGraph;

/// One ranked term with its rounded TF-IDF weight.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TermWeight {
    pub term: String,
    pub weight: f64,
}

/// Per-community facts gathered for the report.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CommunitySummary {
    /// 0-based position in the size ranking.
    pub rank: usize,
    pub size: usize,
    /// Festival-year ids in graph order.
    pub festivals: Vec<String>,
    /// Mean over artists that carry a sentiment.
    pub mean_sentiment: Option<f64>,
    /// Artists that had article text when the summary was taken.
    pub text_contributors: usize,
    pub top_terms: Vec<TermWeight>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CommunityReport {
    pub seed: u64,
    pub modularity: f64,
    pub community_count: usize,
    pub communities: Vec<CommunitySummary>,
}

/// Summaries of the first `top_k` ranked communities, without terms.
pub fn summarize_communities(
    graph: &FestivalGraph,
    ranked: &[Vec<usize>],
    top_k: usize,
) -> Vec<CommunitySummary> {
    ranked
        .iter()
        .take(top_k)
        .enumerate()
        .map(|(rank, members)| {
            let mut ordered = members.clone();
            ordered.sort_unstable();
            let nodes: Vec<_> = ordered
                .iter()
                .filter_map(|&node| graph.nodes.get(node))
                .collect();

            let festivals = nodes
                .iter()
                .filter(|node| node.is_festival())
                .map(|node| node.id.clone())
                .collect();
            let sentiments: Vec<f64> = nodes
                .iter()
                .filter(|node| node.is_artist())
                .filter_map(|node| node.sentiment)
                .collect();
            let mean_sentiment = if sentiments.is_empty() {
                None
            } else {
                Some(sentiments.iter().sum::<f64>() / sentiments.len() as f64)
            };
            let text_contributors = nodes
                .iter()
                .filter(|node| node.is_artist() && node.article_text.is_some())
                .count();

            CommunitySummary {
                rank,
                size: members.len(),
                festivals,
                mean_sentiment,
                text_contributors,
                top_terms: Vec::new(),
            }
        })
        .collect()
}

pub fn render_report(report: &CommunityReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Found {} communities (modularity {:.4}, seed {})",
        report.community_count, report.modularity, report.seed
    );
    for community in &report.communities {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "Community {} ({} members, {} with text)",
            community.rank + 1,
            community.size,
            community.text_contributors
        );
        let festivals = if community.festivals.is_empty() {
            "none".to_string()
        } else {
            community.festivals.join(", ")
        };
        let _ = writeln!(out, "  Festivals: {festivals}");
        match community.mean_sentiment {
            Some(mean) => {
                let _ = writeln!(out, "  Mean sentiment: {mean:.3}");
            }
            None => {
                let _ = writeln!(out, "  Mean sentiment: no sentiment data");
            }
        }
        let terms = if community.top_terms.is_empty() {
            "none".to_string()
        } else {
            community
                .top_terms
                .iter()
                .map(|term| format!("{} ({:.3})", term.term, term.weight))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let _ = writeln!(out, "  Top terms: {terms}");
    }
    out
}

pub fn write_report_json(report: &CommunityReport, path: &Path) -> Result<(), String> {
    let text = serde_json::to_string_pretty(report)
        .map_err(|err| format!("Failed to serialize report: {err}"))?;
    std::fs::write(path, text)
        .map_err(|err| format!("Failed to write report {}: {}", path.display(), err))
}

#[cfg(test)]
mod tests {
    use super::{render_report, summarize_communities, CommunityReport, TermWeight};
    use crate::graph::{FestivalGraph, GraphNode, LanguageTier, NodeKind};

    fn scored_artist(id: &str, sentiment: Option<f64>) -> GraphNode {
        let mut node = GraphNode::new(id, NodeKind::Artist);
        node.sentiment = sentiment;
        if sentiment.is_some() {
            node.article_text = Some("text".to_string());
            node.source_language = Some(LanguageTier::Primary);
        }
        node
    }

    fn sample_graph() -> FestivalGraph {
        FestivalGraph {
            nodes: vec![
                GraphNode::new("fest-1972", NodeKind::FestivalYear),
                scored_artist("A", Some(6.0)),
                scored_artist("B", Some(8.0)),
                GraphNode::new("fest-1971", NodeKind::FestivalYear),
                scored_artist("C", None),
            ],
            ..FestivalGraph::default()
        }
    }

    #[test]
    fn test_summaries_collect_festivals_and_mean_sentiment() {
        let graph = sample_graph();
        let ranked = vec![vec![2, 0, 1], vec![4, 3]];

        let summaries = summarize_communities(&graph, &ranked, 10);

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].festivals, vec!["fest-1972".to_string()]);
        assert_eq!(summaries[0].mean_sentiment, Some(7.0));
        assert_eq!(summaries[0].text_contributors, 2);
        assert_eq!(summaries[1].size, 2);
        assert_eq!(summaries[1].mean_sentiment, None);
        assert_eq!(summaries[1].text_contributors, 0);
    }

    #[test]
    fn test_render_report_lists_terms_and_missing_sentiment() {
        let graph = sample_graph();
        let mut communities = summarize_communities(&graph, &[vec![0, 1, 2], vec![3, 4]], 10);
        communities[0].top_terms = vec![TermWeight {
            term: "rock".to_string(),
            weight: 0.935,
        }];
        let report = CommunityReport {
            seed: 7,
            modularity: 0.3671875,
            community_count: 2,
            communities,
        };

        let text = render_report(&report);

        assert!(text.starts_with("Found 2 communities (modularity 0.3672, seed 7)"));
        assert!(text.contains("Community 1 (3 members, 2 with text)"));
        assert!(text.contains("Mean sentiment: 7.000"));
        assert!(text.contains("Top terms: rock (0.935)"));
        assert!(text.contains("Mean sentiment: no sentiment data"));
        assert!(text.contains("Top terms: none"));
    }
}
