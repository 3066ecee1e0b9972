//! Builds one plain-text document per top community from member article markup.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use log::debug;
use regex::Regex;

use crate::graph::FestivalGraph;

static SELF_CLOSING_REF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<ref[^>]*/>").expect("valid ref pattern"));
static REF_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<ref[^>]*>.*?</ref>").expect("valid ref block pattern"));
static HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"==.*?==").expect("valid header pattern"));
static MARKUP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[|\]\]|\{|\}|==|''+").expect("valid markup pattern"));
static URL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"http\S+").expect("valid url pattern"));
static NON_ALPHANUMERIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9\s]").expect("valid character pattern"));
static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

/// Drops balanced `{{ ... }}` blocks, nested ones included. An unclosed block is kept.
fn strip_templates(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    let mut depth = 0usize;
    let mut block_start = 0usize;
    let mut rest = text;
    let mut offset = 0usize;

    while !rest.is_empty() {
        if rest.starts_with("{{") {
            if depth == 0 {
                block_start = offset;
            }
            depth += 1;
            rest = &rest[2..];
            offset += 2;
            continue;
        }
        if depth > 0 && rest.starts_with("}}") {
            depth -= 1;
            rest = &rest[2..];
            offset += 2;
            continue;
        }
        let Some(ch) = rest.chars().next() else {
            break;
        };
        if depth == 0 {
            output.push(ch);
        }
        rest = &rest[ch.len_utf8()..];
        offset += ch.len_utf8();
    }

    if depth > 0 {
        output.push_str(&text[block_start..]);
    }
    output
}

/// Reduces wiki markup to lowercase ASCII words separated by single spaces.
pub fn clean_wikitext(text: &str) -> String {
    let text = strip_templates(text);
    let text = SELF_CLOSING_REF_RE.replace_all(&text, "");
    let text = REF_BLOCK_RE.replace_all(&text, "");
    let text = HEADER_RE.replace_all(&text, "");
    let text = MARKUP_RE.replace_all(&text, "");
    let text = URL_RE.replace_all(&text, "");
    let text = NON_ALPHANUMERIC_RE.replace_all(&text, " ");
    let text = WHITESPACE_RE.replace_all(&text, " ");
    text.trim().to_lowercase()
}

/// One document per community among the first `top_k` of `ranked`, keyed by
/// 0-based rank. Communities without usable text map to an empty document.
pub fn aggregate(
    graph: &FestivalGraph,
    ranked: &[Vec<usize>],
    top_k: usize,
) -> BTreeMap<usize, String> {
    ranked
        .iter()
        .take(top_k)
        .enumerate()
        .map(|(rank, members)| {
            let mut ordered = members.clone();
            ordered.sort_unstable();
            let parts: Vec<String> = ordered
                .iter()
                .filter_map(|&node| graph.nodes.get(node))
                .filter(|node| node.is_artist())
                .filter_map(|node| node.article_text.as_deref())
                .map(clean_wikitext)
                .filter(|cleaned| !cleaned.is_empty())
                .collect();
            debug!(
                "Community {}: {} members, {} text contributions",
                rank,
                members.len(),
                parts.len()
            );
            (rank, parts.join(" "))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{aggregate, clean_wikitext, strip_templates};
    use crate::graph::{FestivalGraph, GraphNode, NodeKind};

    fn artist_with_text(id: &str, text: Option<&str>) -> GraphNode {
        let mut node = GraphNode::new(id, NodeKind::Artist);
        node.article_text = text.map(str::to_string);
        node
    }

    #[test]
    fn test_strip_templates_handles_nesting() {
        assert_eq!(
            strip_templates("a {{Infobox|x={{birth date|1950}}}} b"),
            "a  b"
        );
        assert_eq!(strip_templates("keep {{open"), "keep {{open");
        assert_eq!(strip_templates("stray }} brace"), "stray }} brace");
    }

    #[test]
    fn test_clean_wikitext_removes_markup() {
        let raw = "{{Infobox band|name=X}}'''Gasolin''' was a [[Denmark|Danish]] rock band.\
                   <ref name=\"a\"/>Formed 1969.<ref>Some cite http://x.dk</ref>\n\
                   == History ==\nSee https://example.org/page now!";

        assert_eq!(
            clean_wikitext(raw),
            "gasolin was a denmark danish rock band formed 1969 see now"
        );
    }

    #[test]
    fn test_clean_wikitext_turns_non_ascii_into_spaces() {
        assert_eq!(clean_wikitext("Sk\u{f8}nne   R\u{e5}b"), "sk nne r b");
    }

    #[test]
    fn test_aggregate_joins_member_documents_with_single_space() {
        let graph = FestivalGraph {
            nodes: vec![
                artist_with_text("A", Some("ab cd")),
                GraphNode::new("fest", NodeKind::FestivalYear),
                artist_with_text("B", Some("ef")),
                artist_with_text("C", None),
                artist_with_text("D", Some("{{only template}}")),
            ],
            ..FestivalGraph::default()
        };
        let ranked = vec![vec![4, 2, 1, 0]];

        let documents = aggregate(&graph, &ranked, 10);

        assert_eq!(documents.len(), 1);
        assert_eq!(documents[&0], "ab cd ef");
    }

    #[test]
    fn test_aggregate_keeps_empty_communities_and_respects_top_k() {
        let graph = FestivalGraph {
            nodes: vec![
                artist_with_text("A", Some("rock")),
                artist_with_text("B", None),
                artist_with_text("C", Some("folk")),
            ],
            ..FestivalGraph::default()
        };
        let ranked = vec![vec![0], vec![1], vec![2]];

        let documents = aggregate(&graph, &ranked, 2);

        assert_eq!(documents.len(), 2);
        assert_eq!(documents[&0], "rock");
        assert_eq!(documents[&1], "");
    }
}
