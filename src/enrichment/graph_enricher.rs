//! Attaches article text, source tier and sentiment to every artist vertex.

use log::info;

use super::article_resolver::ArticleResolver;
use super::article_source::ArticleSource;
use crate::graph::{FestivalGraph, GraphNode, LanguageTier};
use crate::sentiment::SentimentScorer;

const PROGRESS_LOG_EVERY: usize = 10;

/// Counts gathered during one enrichment pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichmentSummary {
    pub artists: usize,
    pub resolved_primary: usize,
    pub resolved_fallback: usize,
    pub unresolved: usize,
    pub scored: usize,
}

impl EnrichmentSummary {
    pub fn resolved(&self) -> usize {
        self.resolved_primary + self.resolved_fallback
    }
}

fn apply_article<S: ArticleSource>(
    node: &mut GraphNode,
    resolver: &mut ArticleResolver<S>,
    scorer: &SentimentScorer,
) {
    match resolver.resolve(&node.id) {
        Some(article) => {
            node.article_text = Some(article.text);
            node.source_language = Some(article.tier);
        }
        None => {
            node.article_text = None;
            node.source_language = None;
        }
    }
    node.sentiment = scorer.score_article(node.article_text.as_deref(), node.source_language);

    match (node.source_language, node.sentiment) {
        (Some(tier), Some(sentiment)) => info!(
            "Enrichment[artist:{}]: {} article, sentiment {:.3}",
            node.id,
            tier.label(),
            sentiment
        ),
        (Some(tier), None) => info!(
            "Enrichment[artist:{}]: {} article, no sentiment data",
            node.id,
            tier.label()
        ),
        (None, _) => info!("Enrichment[artist:{}]: skipped, no article found", node.id),
    }
}

/// Resolves and scores every artist vertex; other vertices are left untouched.
pub fn enrich_graph<S: ArticleSource>(
    mut graph: FestivalGraph,
    resolver: &mut ArticleResolver<S>,
    scorer: &SentimentScorer,
) -> (FestivalGraph, EnrichmentSummary) {
    let total_artists = graph.artist_count();
    let mut summary = EnrichmentSummary::default();

    for node in graph.nodes.iter_mut().filter(|node| node.is_artist()) {
        apply_article(node, resolver, scorer);

        summary.artists += 1;
        match node.source_language {
            Some(LanguageTier::Primary) => summary.resolved_primary += 1,
            Some(LanguageTier::Fallback) => summary.resolved_fallback += 1,
            None => summary.unresolved += 1,
        }
        if node.sentiment.is_some() {
            summary.scored += 1;
        }
        if summary.artists % PROGRESS_LOG_EVERY == 0 {
            info!("Enriched {}/{} artists", summary.artists, total_artists);
        }
    }

    info!(
        "Enrichment finished: {} artists, {} primary, {} fallback, {} unresolved, {} scored",
        summary.artists,
        summary.resolved_primary,
        summary.resolved_fallback,
        summary.unresolved,
        summary.scored
    );
    (graph, summary)
}

/// Clears fallback-tier article text and recomputes the now-invalid sentiment.
///
/// Returns the number of purged artists.
pub fn purge_fallback_articles(graph: &mut FestivalGraph, scorer: &SentimentScorer) -> usize {
    let mut purged = 0;
    for node in graph.nodes.iter_mut().filter(|node| node.is_artist()) {
        if node.source_language != Some(LanguageTier::Fallback) || node.article_text.is_none() {
            continue;
        }
        node.article_text = None;
        node.sentiment = scorer.score_article(None, node.source_language);
        purged += 1;
        info!("Purged fallback article for {}", node.id);
    }
    purged
}
